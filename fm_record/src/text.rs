// ********* Text and date helpers **********

use crate::{OutputEncoding, RecordError};
use crate::layout::{FieldSpec, Overflow};

/// Converts a ROC date (year 2-3 digits, `/` or `-` separators accepted)
/// to a Gregorian `YYYYMMDD` string.
///
/// The NHI exports use Republic-of-China years, e.g. `112/03/05` for
/// 2023-03-05.
pub fn roc_to_gregorian(roc_date: &str) -> Result<String, RecordError> {
    let digits: String = roc_date
        .trim()
        .chars()
        .filter(|c| *c != '/' && *c != '-')
        .collect();
    if !(digits.len() == 6 || digits.len() == 7) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(RecordError::InvalidRocDate {
            value: roc_date.to_string(),
        });
    }
    let split = digits.len() - 4;
    // The length check above guarantees 1-3 year digits, so this cannot overflow.
    let year: u32 = digits[..split]
        .parse::<u32>()
        .map_err(|_| RecordError::InvalidRocDate {
            value: roc_date.to_string(),
        })?
        + 1911;
    Ok(format!("{:04}{}", year, &digits[split..]))
}

/// Checks that a string is a plausible Gregorian `YYYYMMDD` date.
pub fn is_gregorian_date(s: &str) -> bool {
    if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let month: u32 = s[4..6].parse().unwrap_or(0);
    let day: u32 = s[6..8].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// Encodes one field value and pads or truncates it to the declared width.
///
/// The width is counted in bytes of the selected output encoding. Truncation
/// never splits a multi-byte character; rejection reports the field name.
pub fn pad_field(
    spec: &FieldSpec,
    value: &str,
    encoding: OutputEncoding,
) -> Result<Vec<u8>, RecordError> {
    let mut encoded = encode_value(spec.name, value, encoding)?;
    if encoded.len() > spec.width {
        match spec.overflow {
            Overflow::Reject => {
                return Err(RecordError::FieldOverflow {
                    field: spec.name,
                    width: spec.width,
                    value: value.to_string(),
                });
            }
            Overflow::Truncate => {
                encoded = truncate_encoded(value, spec.width, encoding)?;
            }
        }
    }
    encoded.resize(spec.width, b' ');
    Ok(encoded)
}

fn encode_value(
    field: &'static str,
    value: &str,
    encoding: OutputEncoding,
) -> Result<Vec<u8>, RecordError> {
    match encoding {
        OutputEncoding::Utf8 => Ok(value.as_bytes().to_vec()),
        OutputEncoding::Big5 => {
            let (bytes, _, had_errors) = encoding_rs::BIG5.encode(value);
            if had_errors {
                // encoding_rs would substitute numeric character references,
                // which the upload system cannot parse.
                return Err(RecordError::Unencodable {
                    field,
                    value: value.to_string(),
                });
            }
            Ok(bytes.into_owned())
        }
    }
}

// Re-encodes the longest prefix that fits in `width` bytes, one character at
// a time so a double-byte character is dropped rather than split.
fn truncate_encoded(
    value: &str,
    width: usize,
    encoding: OutputEncoding,
) -> Result<Vec<u8>, RecordError> {
    let mut out: Vec<u8> = Vec::with_capacity(width);
    for (idx, c) in value.char_indices() {
        let encoded = encode_value("", &value[idx..idx + c.len_utf8()], encoding)?;
        if out.len() + encoded.len() > width {
            break;
        }
        out.extend_from_slice(&encoded);
    }
    Ok(out)
}
