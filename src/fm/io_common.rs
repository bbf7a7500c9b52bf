// Encoding detection for the NHI export files.
//
// The exports come out of hospital systems as either UTF-8 or Big-5 with no
// marker beyond an occasional BOM, so the whole file is sniffed: BOM first,
// then strict UTF-8, then Big-5 as the fallback.

use std::fs;

use encoding_rs::Encoding;
use log::{debug, info};
use snafu::prelude::*;

use crate::fm::{DetectEncodingSnafu, FmResult, OpeningSourceSnafu};

/// Reads a file and decodes it to UTF-8, detecting the source encoding.
pub fn decode_file(path: &str) -> FmResult<String> {
    let raw = fs::read(path).context(OpeningSourceSnafu { path })?;
    decode_bytes(&raw, path)
}

fn decode_bytes(raw: &[u8], path: &str) -> FmResult<String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(raw) {
        debug!("{}: found {} BOM", path, encoding.name());
        let (text, had_errors) = encoding.decode_without_bom_handling(&raw[bom_len..]);
        if had_errors {
            return DetectEncodingSnafu { path }.fail();
        }
        return Ok(text.into_owned());
    }

    if let Ok(text) = std::str::from_utf8(raw) {
        debug!("{}: valid UTF-8", path);
        return Ok(text.to_string());
    }

    let (text, _, had_errors) = encoding_rs::BIG5.decode(raw);
    if had_errors {
        return DetectEncodingSnafu { path }.fail();
    }
    info!("{}: decoded as Big-5", path);
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        let p = path.display().to_string();
        (dir, p)
    }

    #[test]
    fn utf8_file() {
        let (_dir, path) = write_temp("姓名,生日\n王小明,85/12/01\n".as_bytes());
        let text = decode_file(&path).unwrap();
        assert!(text.starts_with("姓名"));
    }

    #[test]
    fn big5_file() {
        let (encoded, _, had_errors) = encoding_rs::BIG5.encode("姓名,生日\n王小明,85/12/01\n");
        assert!(!had_errors);
        let (_dir, path) = write_temp(&encoded);
        let text = decode_file(&path).unwrap();
        assert!(text.starts_with("姓名"));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice("姓名\n".as_bytes());
        let (_dir, path) = write_temp(&bytes);
        let text = decode_file(&path).unwrap();
        assert_eq!(text, "姓名\n");
    }

    #[test]
    fn undecodable_file_is_an_error() {
        // 0x80 is not a valid UTF-8 start byte nor a Big-5 lead byte.
        let (_dir, path) = write_temp(&[0x80, 0x80]);
        let err = decode_file(&path).unwrap_err();
        assert!(matches!(err, crate::fm::FmError::DetectEncoding { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = decode_file("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, crate::fm::FmError::OpeningSource { .. }));
    }
}
