use log::{debug, info};

use snafu::{prelude::*, Snafu};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fm_record::{
    case_type_code, encode_record, roc_to_gregorian, sex_from_id, OutputEncoding, RecordValues,
    Segment,
};

pub mod io_common;
pub mod io_csv;
pub mod params_reader;

use crate::fm::io_csv::SourceTable;
use crate::fm::params_reader::FmParams;

// Column names of the two NHI export layouts. The long list carries the
// demographics, the short list the case metadata.
const LONG_ID: &str = "身分證字號";
const LONG_BIRTHDAY: &str = "生日";
const LONG_NAME: &str = "姓名";
const LONG_ADDR: &str = "住址";
const LONG_TEL: &str = "電話";
const SHORT_ID: &str = "身分證號";
const SHORT_CASE_TYPE: &str = "個案類別";

// The upload system accepts at most this many records per file.
const CHUNK_SIZE: usize = 9999;

#[derive(Debug, Snafu)]
pub enum FmError {
    #[snafu(display("Error opening source file {path}"))]
    OpeningSource {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not detect the encoding of {path}: neither UTF-8 nor Big-5"))]
    DetectEncoding { path: String },
    #[snafu(display("Error parsing CSV file {path}"))]
    CsvParse { source: csv::Error, path: String },
    #[snafu(display("Missing required column {column:?} in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Line {lineno} of {path} has no value for column {column:?}"))]
    MissingValue {
        column: String,
        lineno: usize,
        path: String,
    },
    #[snafu(display(
        "No demographics found in the long list for ID {id} (line {lineno} of the short list)"
    ))]
    UnmatchedId { id: String, lineno: usize },
    #[snafu(display("Line {lineno} of the short list: {source}"))]
    BadRow {
        source: fm_record::RecordError,
        lineno: usize,
    },
    #[snafu(display("Invalid parameter {name}: {value:?}"))]
    InvalidParam { name: &'static str, value: String },
    #[snafu(display("Error opening parameter file {path}"))]
    OpeningParams {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing parameter file {path}"))]
    ParsingParams {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error reading operator input"))]
    Prompt { source: std::io::Error },
    #[snafu(display("No valid rows, nothing to write"))]
    NoRows {},
    #[snafu(display(
        "Output would need sequence number {seq}, past the 2-digit limit of the file name scheme"
    ))]
    SequenceOverflow { seq: u32 },
    #[snafu(display("Error writing output file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
}

pub type FmResult<T> = Result<T, FmError>;

/// Everything one conversion run needs: the two source files, the constant
/// parameters and the output selection.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub long_path: String,
    pub short_path: String,
    pub params: FmParams,
    pub encoding: OutputEncoding,
    pub outdir: PathBuf,
}

/// Converts the two CSV exports and writes the FM.txt file(s).
///
/// Returns the paths of the written files, in sequence order.
pub fn run_conversion(req: &ConversionRequest) -> FmResult<Vec<PathBuf>> {
    let long = SourceTable::open(&req.long_path)?;
    let short = SourceTable::open(&req.short_path)?;
    info!(
        "long list: {} rows, short list: {} rows",
        long.row_count(),
        short.row_count()
    );

    let records = build_records(&long, &short, &req.params, req.encoding)?;
    if records.is_empty() {
        return NoRowsSnafu {}.fail();
    }
    write_chunks(&records, &req.params, &req.outdir)
}

// Joins the short list against the long list and encodes every row.
// Any malformed or missing value aborts the whole run: a partially written
// upload batch is worse than no batch.
fn build_records(
    long: &SourceTable,
    short: &SourceTable,
    params: &FmParams,
    encoding: OutputEncoding,
) -> FmResult<Vec<Vec<u8>>> {
    long.require_columns(&[LONG_ID, LONG_BIRTHDAY, LONG_NAME, LONG_ADDR, LONG_TEL])?;
    short.require_columns(&[SHORT_ID, SHORT_CASE_TYPE])?;

    // Index the long list by national ID. On duplicates the last row wins,
    // like the left merge of the original converter.
    let mut by_id: HashMap<String, usize> = HashMap::new();
    for row in 0..long.row_count() {
        let id = long.required_value(row, LONG_ID)?;
        by_id.insert(id.to_string(), row);
    }

    let segment = params.segment()?;
    let mut keyed: Vec<(String, usize, RecordValues)> = Vec::new();
    for row in 0..short.row_count() {
        let lineno = short.lineno(row);
        let id = short.required_value(row, SHORT_ID)?.to_string();
        let case_raw = short.required_value(row, SHORT_CASE_TYPE)?;

        let long_row = *by_id.get(&id).context(UnmatchedIdSnafu {
            id: id.clone(),
            lineno,
        })?;

        let values = RecordValues {
            segment,
            plan_no: params.plan_no.clone(),
            branch_code: params.branch_code.clone(),
            hosp_id: params.hosp_id.clone(),
            id: id.clone(),
            birthday: roc_to_gregorian(long.required_value(long_row, LONG_BIRTHDAY)?)
                .context(BadRowSnafu { lineno })?,
            name: long.required_value(long_row, LONG_NAME)?.to_string(),
            sex: sex_from_id(&id).context(BadRowSnafu { lineno })?,
            inform_addr: long.required_value(long_row, LONG_ADDR)?.to_string(),
            tel: long.required_value(long_row, LONG_TEL)?.to_string(),
            prsn_id: params.prsn_id.clone(),
            case_type: case_type_code(case_raw)
                .context(BadRowSnafu { lineno })?
                .to_string(),
            case_date: params.case_start_date.clone(),
            close_date: match segment {
                Segment::ClosedCase => params.case_end_date.clone(),
                Segment::NewCase => String::new(),
            },
            close_rsn: match segment {
                Segment::ClosedCase => params.close_reason.clone(),
                Segment::NewCase => String::new(),
            },
        };
        debug!("line {}: {:?}", lineno, values);
        keyed.push((id, lineno, values));
    }

    // Sort by ID for deterministic output files.
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut records: Vec<Vec<u8>> = Vec::with_capacity(keyed.len());
    for (_, lineno, values) in keyed.iter() {
        let record = encode_record(values, encoding).context(BadRowSnafu { lineno: *lineno })?;
        records.push(record);
    }
    Ok(records)
}

// Writes the records in chunks of CHUNK_SIZE, one file per chunk, named
// [BRANCH][HOSP_ID][MM][NN]FM.txt with NN starting at the configured
// sequence number. Records are terminated with CRLF per the layout document.
fn write_chunks(records: &[Vec<u8>], params: &FmParams, outdir: &Path) -> FmResult<Vec<PathBuf>> {
    let n_chunks = (records.len() + CHUNK_SIZE - 1) / CHUNK_SIZE;
    let last_seq = params.seq_start + n_chunks as u32 - 1;
    if last_seq > 99 {
        return SequenceOverflowSnafu { seq: last_seq }.fail();
    }

    fs::create_dir_all(outdir).context(WritingOutputSnafu {
        path: outdir.display().to_string(),
    })?;

    let mut written: Vec<PathBuf> = Vec::new();
    for (idx, chunk) in records.chunks(CHUNK_SIZE).enumerate() {
        let seq = params.seq_start + idx as u32;
        let fname = format!(
            "{}{}{}{:02}FM.txt",
            params.branch_code, params.hosp_id, params.upload_month, seq
        );
        let fpath = outdir.join(&fname);

        let mut buf: Vec<u8> = Vec::with_capacity(chunk.len() * (fm_record::RECORD_LEN + 2));
        for record in chunk {
            buf.extend_from_slice(record);
            buf.extend_from_slice(b"\r\n");
        }
        fs::write(&fpath, &buf).context(WritingOutputSnafu {
            path: fpath.display().to_string(),
        })?;
        info!("wrote {} rows to {}", chunk.len(), fname);
        written.push(fpath);
    }
    Ok(written)
}
