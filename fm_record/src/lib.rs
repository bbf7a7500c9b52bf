mod layout;
mod text;

use log::warn;

use std::error::Error;
use std::fmt::Display;

pub use crate::layout::{field_range, FieldSpec, Overflow, FIELD_SPECS, RECORD_LEN};
pub use crate::text::{is_gregorian_date, pad_field, roc_to_gregorian};

// **** Input data structures ****

/// Output byte serialization for the assembled record.
///
/// Big-5 is what the upload system historically expects; UTF-8 is available
/// for the newer intake path. The choice affects only how each field is
/// turned into bytes — the byte widths of the layout stay the same.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum OutputEncoding {
    Big5,
    Utf8,
}

impl OutputEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            OutputEncoding::Big5 => "big5",
            OutputEncoding::Utf8 => "utf-8",
        }
    }
}

/// Record segment, the first byte of every record.
///
/// `A` opens or continues a case; `B` closes one and requires a close date
/// and a close reason.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Segment {
    NewCase,
    ClosedCase,
}

impl Segment {
    pub fn code(&self) -> &'static str {
        match self {
            Segment::NewCase => "A",
            Segment::ClosedCase => "B",
        }
    }
}

/// The values of one record, one per field of the layout.
///
/// All strings are expected in their final form (dates already Gregorian,
/// constants already zero-filled); `encode_record` only lays them out.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RecordValues {
    pub segment: Segment,
    pub plan_no: String,
    pub branch_code: String,
    pub hosp_id: String,
    pub id: String,
    pub birthday: String,
    pub name: String,
    pub sex: String,
    pub inform_addr: String,
    pub tel: String,
    pub prsn_id: String,
    pub case_type: String,
    pub case_date: String,
    pub close_date: String,
    pub close_rsn: String,
}

impl RecordValues {
    fn field_value(&self, name: &str) -> &str {
        match name {
            "SEGMENT" => self.segment.code(),
            "PLAN_NO" => &self.plan_no,
            "BRANCH_CODE" => &self.branch_code,
            "HOSP_ID" => &self.hosp_id,
            "ID" => &self.id,
            "BIRTHDAY" => &self.birthday,
            "NAME" => &self.name,
            "SEX" => &self.sex,
            "INFORM_ADDR" => &self.inform_addr,
            "TEL" => &self.tel,
            "PRSN_ID" => &self.prsn_id,
            "CASE_TYPE" => &self.case_type,
            "CASE_DATE" => &self.case_date,
            "CLOSE_DATE" => &self.close_date,
            "CLOSE_RSN" => &self.close_rsn,
            // FIELD_SPECS is the only caller and lists exactly these names.
            _ => unreachable!("unknown field {}", name),
        }
    }
}

/// Errors that prevent a row from being encoded.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RecordError {
    InvalidRocDate { value: String },
    InvalidCaseType { value: String },
    InvalidId { value: String },
    Unencodable { field: &'static str, value: String },
    FieldOverflow {
        field: &'static str,
        width: usize,
        value: String,
    },
}

impl Error for RecordError {}

impl Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::InvalidRocDate { value } => {
                write!(f, "unexpected ROC date format: {:?}", value)
            }
            RecordError::InvalidCaseType { value } => {
                write!(f, "case type is not numeric: {:?}", value)
            }
            RecordError::InvalidId { value } => {
                write!(f, "national ID must be 10 characters: {:?}", value)
            }
            RecordError::Unencodable { field, value } => {
                write!(
                    f,
                    "field {} cannot be represented in the output encoding: {:?}",
                    field, value
                )
            }
            RecordError::FieldOverflow { field, width, value } => {
                write!(
                    f,
                    "field {} exceeds its width of {} bytes: {:?}",
                    field, width, value
                )
            }
        }
    }
}

// **** Encoding procedure ****

/// Assembles one fixed-width record.
///
/// Each field is encoded with the selected output encoding, left-aligned and
/// space-padded to its declared byte width, then concatenated in layout
/// order. The result is always [RECORD_LEN] bytes (without line terminator).
pub fn encode_record(
    values: &RecordValues,
    encoding: OutputEncoding,
) -> Result<Vec<u8>, RecordError> {
    let mut record: Vec<u8> = Vec::with_capacity(RECORD_LEN);
    for spec in FIELD_SPECS.iter() {
        let part = pad_field(spec, values.field_value(spec.name), encoding)?;
        record.extend_from_slice(&part);
    }
    debug_assert_eq!(record.len(), RECORD_LEN);
    Ok(record)
}

/// Maps the numeric NHI case category to the upload code.
///
/// Categories 1-5 and 7 map to `A`, 6 maps to `C`. Anything else is rare and
/// maps to `B` with a logged warning, matching the historical behavior.
pub fn case_type_code(raw: &str) -> Result<&'static str, RecordError> {
    let cleaned = raw.trim().trim_end_matches(".0");
    let n: i64 = cleaned
        .parse()
        .map_err(|_| RecordError::InvalidCaseType {
            value: raw.to_string(),
        })?;
    match n {
        1..=5 | 7 => Ok("A"),
        6 => Ok("C"),
        other => {
            warn!("unknown case category {}, mapping to B", other);
            Ok("B")
        }
    }
}

/// Derives the SEX field from the second character of the national ID
/// (1 = male, 2 = female in the ROC numbering scheme).
pub fn sex_from_id(id: &str) -> Result<String, RecordError> {
    let trimmed = id.trim();
    if trimmed.chars().count() != 10 {
        return Err(RecordError::InvalidId {
            value: id.to_string(),
        });
    }
    // Guaranteed present by the length check.
    let c = trimmed.chars().nth(1).unwrap();
    Ok(c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_values() -> RecordValues {
        RecordValues {
            segment: Segment::NewCase,
            plan_no: "09".to_string(),
            branch_code: "3".to_string(),
            hosp_id: "0000012345".to_string(),
            id: "A123456789".to_string(),
            birthday: "19961201".to_string(),
            name: "王小明".to_string(),
            sex: "1".to_string(),
            inform_addr: "台北市中正區仁愛路一段1號".to_string(),
            tel: "0223456789".to_string(),
            prsn_id: "B987654321".to_string(),
            case_type: "A".to_string(),
            case_date: "20230101".to_string(),
            close_date: "".to_string(),
            close_rsn: "".to_string(),
        }
    }

    #[test]
    fn record_is_fixed_width_in_big5() {
        let rec = encode_record(&sample_values(), OutputEncoding::Big5).unwrap();
        assert_eq!(rec.len(), RECORD_LEN);
    }

    #[test]
    fn record_is_fixed_width_in_utf8() {
        let rec = encode_record(&sample_values(), OutputEncoding::Utf8).unwrap();
        assert_eq!(rec.len(), RECORD_LEN);
    }

    #[test]
    fn constants_at_declared_offsets() {
        let rec = encode_record(&sample_values(), OutputEncoding::Big5).unwrap();
        assert_eq!(&rec[field_range("SEGMENT").unwrap()], b"A");
        assert_eq!(&rec[field_range("PLAN_NO").unwrap()], b"09");
        assert_eq!(&rec[field_range("BRANCH_CODE").unwrap()], b"3");
        // The line starts with segment, then plan and branch back to back.
        assert!(rec.starts_with(b"A093"));
    }

    #[test]
    fn fields_recoverable_by_offset() {
        let values = sample_values();
        let rec = encode_record(&values, OutputEncoding::Big5).unwrap();
        for (field, expected) in [
            ("ID", values.id.as_str()),
            ("BIRTHDAY", values.birthday.as_str()),
            ("TEL", values.tel.as_str()),
            ("CASE_DATE", values.case_date.as_str()),
        ] {
            let slice = &rec[field_range(field).unwrap()];
            let (decoded, _, _) = encoding_rs::BIG5.decode(slice);
            assert_eq!(decoded.trim_end(), expected, "field {}", field);
        }
        let name = &rec[field_range("NAME").unwrap()];
        let (decoded, _, _) = encoding_rs::BIG5.decode(name);
        assert_eq!(decoded.trim_end(), values.name);
    }

    #[test]
    fn closed_case_fills_close_fields() {
        let mut values = sample_values();
        values.segment = Segment::ClosedCase;
        values.close_date = "20231231".to_string();
        values.close_rsn = "2".to_string();
        let rec = encode_record(&values, OutputEncoding::Big5).unwrap();
        assert_eq!(&rec[field_range("CLOSE_DATE").unwrap()], b"20231231");
        assert_eq!(&rec[field_range("CLOSE_RSN").unwrap()], b"2");
    }

    #[test]
    fn big5_incompatible_name_is_an_error() {
        let mut values = sample_values();
        values.name = "王😀".to_string();
        let err = encode_record(&values, OutputEncoding::Big5).unwrap_err();
        assert!(matches!(err, RecordError::Unencodable { field: "NAME", .. }));
    }

    #[test]
    fn overflowing_date_is_rejected() {
        let mut values = sample_values();
        values.case_date = "202301011".to_string();
        let err = encode_record(&values, OutputEncoding::Big5).unwrap_err();
        assert!(matches!(
            err,
            RecordError::FieldOverflow {
                field: "CASE_DATE",
                ..
            }
        ));
    }

    #[test]
    fn case_type_mapping() {
        for n in ["1", "2", "3", "4", "5", "7"] {
            assert_eq!(case_type_code(n).unwrap(), "A");
        }
        assert_eq!(case_type_code("6").unwrap(), "C");
        assert_eq!(case_type_code("9").unwrap(), "B");
        assert_eq!(case_type_code(" 6.0 ").unwrap(), "C");
        assert!(case_type_code("x").is_err());
        assert!(case_type_code("").is_err());
    }

    #[test]
    fn sex_derived_from_id() {
        assert_eq!(sex_from_id("A123456789").unwrap(), "1");
        assert_eq!(sex_from_id("A223456789").unwrap(), "2");
        assert!(sex_from_id("A12345").is_err());
    }
}
