// ********* Record layout **********

// The field table follows the QM upload format document for the FM plan:
// 15 fields, 208 bytes per record. The consuming system parses by byte
// offset, so the widths here are the contract.

use std::ops::Range;

/// Total length in bytes of one encoded record.
pub const RECORD_LEN: usize = 208;

/// What to do when a value does not fit in its field.
///
/// Free-text fields (name, address, telephone) get truncated. Structured
/// fields (identifiers, dates, codes) are rejected instead: a truncated
/// hospital ID or date would still look valid to the upload system.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Overflow {
    Truncate,
    Reject,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Width in bytes of the selected output encoding.
    pub width: usize,
    pub overflow: Overflow,
}

const fn field(name: &'static str, width: usize, overflow: Overflow) -> FieldSpec {
    FieldSpec {
        name,
        width,
        overflow,
    }
}

pub const FIELD_SPECS: [FieldSpec; 15] = [
    field("SEGMENT", 1, Overflow::Reject),
    field("PLAN_NO", 2, Overflow::Reject),
    field("BRANCH_CODE", 1, Overflow::Reject),
    field("HOSP_ID", 10, Overflow::Reject),
    field("ID", 10, Overflow::Reject),
    field("BIRTHDAY", 8, Overflow::Reject),
    field("NAME", 12, Overflow::Truncate),
    field("SEX", 1, Overflow::Reject),
    field("INFORM_ADDR", 120, Overflow::Truncate),
    field("TEL", 15, Overflow::Truncate),
    field("PRSN_ID", 10, Overflow::Reject),
    field("CASE_TYPE", 1, Overflow::Reject),
    field("CASE_DATE", 8, Overflow::Reject),
    field("CLOSE_DATE", 8, Overflow::Reject),
    field("CLOSE_RSN", 1, Overflow::Reject),
];

/// Byte range of a field within the encoded record.
///
/// Useful for parsing a record back by offset, which is how the upload
/// system reads it.
pub fn field_range(name: &str) -> Option<Range<usize>> {
    let mut offset: usize = 0;
    for spec in FIELD_SPECS.iter() {
        if spec.name == name {
            return Some(offset..offset + spec.width);
        }
        offset += spec.width;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_sum_to_record_len() {
        let total: usize = FIELD_SPECS.iter().map(|s| s.width).sum();
        assert_eq!(total, RECORD_LEN);
    }

    #[test]
    fn ranges_are_contiguous() {
        let mut expected_start = 0;
        for spec in FIELD_SPECS.iter() {
            let r = field_range(spec.name).unwrap();
            assert_eq!(r.start, expected_start, "field {}", spec.name);
            assert_eq!(r.end - r.start, spec.width, "field {}", spec.name);
            expected_start = r.end;
        }
        assert_eq!(expected_start, RECORD_LEN);
    }

    #[test]
    fn first_fields_at_expected_offsets() {
        assert_eq!(field_range("SEGMENT"), Some(0..1));
        assert_eq!(field_range("PLAN_NO"), Some(1..3));
        assert_eq!(field_range("BRANCH_CODE"), Some(3..4));
        assert_eq!(field_range("CLOSE_RSN"), Some(207..208));
    }

    #[test]
    fn unknown_field_has_no_range() {
        assert_eq!(field_range("NOT_A_FIELD"), None);
    }
}
