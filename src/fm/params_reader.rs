// Reading and validation of the constant parameters.
//
// These apply uniformly to every record of a run: either loaded from a JSON
// parameter file or prompted for interactively, the way the historical
// converter asked its operator.

use std::fs;
use std::io::{BufRead, Write};

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use fm_record::{is_gregorian_date, Segment};

use crate::fm::{
    FmResult, InvalidParamSnafu, OpeningParamsSnafu, ParsingParamsSnafu, PromptSnafu,
};

fn default_seq_start() -> u32 {
    1
}

fn default_segment() -> String {
    "A".to_string()
}

/// The constant parameters of a conversion run.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FmParams {
    /// Plan number, zero-filled to 2 digits (e.g. "09").
    #[serde(rename = "planNo")]
    pub plan_no: String,
    /// NHI branch code, a single character 1-6.
    #[serde(rename = "branchCode")]
    pub branch_code: String,
    /// Hospital ID, zero-filled to 10 digits.
    #[serde(rename = "hospId")]
    pub hosp_id: String,
    /// Physician national ID, zero-filled to 10 characters.
    #[serde(rename = "prsnId")]
    pub prsn_id: String,
    /// Upload month MM, 01-12.
    #[serde(rename = "uploadMonth")]
    pub upload_month: String,
    /// First NN sequence number of the output file names, 1-99.
    #[serde(rename = "seqStart", default = "default_seq_start")]
    pub seq_start: u32,
    /// "A" for new/open cases, "B" for closed cases.
    #[serde(default = "default_segment")]
    pub segment: String,
    /// Case start date, Gregorian YYYYMMDD.
    #[serde(rename = "caseStartDate")]
    pub case_start_date: String,
    /// Case end date, Gregorian YYYYMMDD. Required for segment B.
    #[serde(rename = "caseEndDate", default)]
    pub case_end_date: String,
    /// Close reason 1-3. Required for segment B.
    #[serde(rename = "closeReason", default)]
    pub close_reason: String,
}

impl FmParams {
    pub fn segment(&self) -> FmResult<Segment> {
        match self.segment.trim() {
            "A" => Ok(Segment::NewCase),
            "B" => Ok(Segment::ClosedCase),
            other => InvalidParamSnafu {
                name: "segment",
                value: other.to_string(),
            }
            .fail(),
        }
    }

    /// Zero-fills the fixed-width identifiers, like the operator prompts of
    /// the historical converter did.
    pub fn normalize(&mut self) {
        self.plan_no = zfill(&self.plan_no, 2);
        self.hosp_id = zfill(&self.hosp_id, 10);
        self.prsn_id = zfill(&self.prsn_id, 10);
        self.upload_month = zfill(&self.upload_month, 2);
        self.branch_code = self.branch_code.trim().to_string();
        self.segment = self.segment.trim().to_string();
        self.case_start_date = self.case_start_date.trim().to_string();
        self.case_end_date = self.case_end_date.trim().to_string();
        self.close_reason = self.close_reason.trim().to_string();
    }

    pub fn validate(&self) -> FmResult<()> {
        ensure!(
            self.branch_code.len() == 1 && self.branch_code.chars().all(|c| c.is_ascii_digit()),
            InvalidParamSnafu {
                name: "branchCode",
                value: self.branch_code.clone(),
            }
        );
        let month: u32 = self.upload_month.parse().unwrap_or(0);
        ensure!(
            (1..=12).contains(&month),
            InvalidParamSnafu {
                name: "uploadMonth",
                value: self.upload_month.clone(),
            }
        );
        ensure!(
            (1..=99).contains(&self.seq_start),
            InvalidParamSnafu {
                name: "seqStart",
                value: self.seq_start.to_string(),
            }
        );
        ensure!(
            is_gregorian_date(&self.case_start_date),
            InvalidParamSnafu {
                name: "caseStartDate",
                value: self.case_start_date.clone(),
            }
        );
        if self.segment()? == Segment::ClosedCase {
            ensure!(
                is_gregorian_date(&self.case_end_date),
                InvalidParamSnafu {
                    name: "caseEndDate",
                    value: self.case_end_date.clone(),
                }
            );
            ensure!(
                matches!(self.close_reason.as_str(), "1" | "2" | "3"),
                InvalidParamSnafu {
                    name: "closeReason",
                    value: self.close_reason.clone(),
                }
            );
        }
        Ok(())
    }
}

/// Loads, normalizes and validates a JSON parameter file.
pub fn read_params(path: &str) -> FmResult<FmParams> {
    let contents = fs::read_to_string(path).context(OpeningParamsSnafu { path })?;
    let mut params: FmParams =
        serde_json::from_str(&contents).context(ParsingParamsSnafu { path })?;
    params.normalize();
    params.validate()?;
    debug!("parameters: {:?}", params);
    Ok(params)
}

/// Asks the operator for each parameter in turn.
///
/// Generic over the input/output streams so the flow is testable; `main`
/// passes stdin and stdout.
pub fn prompt_params(input: &mut impl BufRead, output: &mut impl Write) -> FmResult<FmParams> {
    let mut ask = |question: &str| -> FmResult<String> {
        write!(output, "{}", question).context(PromptSnafu {})?;
        output.flush().context(PromptSnafu {})?;
        let mut line = String::new();
        input.read_line(&mut line).context(PromptSnafu {})?;
        Ok(line.trim().to_string())
    };

    let plan_no = ask("Enter PLAN_NO (e.g. 09): ")?;
    let branch_code = ask("Enter BRANCH_CODE (1-6): ")?;
    let hosp_id = ask("Enter HOSP_ID (10 digits): ")?;
    let prsn_id = ask("Enter PRSN_ID (10 digits physician ID): ")?;
    let upload_month = ask("Enter upload month MM (01-12): ")?;
    let seq_raw = ask("Start sequence NN (01-99) [default 1]: ")?;
    let seq_start = if seq_raw.is_empty() {
        1
    } else {
        seq_raw.parse::<u32>().ok().context(InvalidParamSnafu {
            name: "seqStart",
            value: seq_raw.clone(),
        })?
    };
    let segment_raw = ask("Segment, A new/open or B closed [default A]: ")?;
    let segment = if segment_raw.is_empty() {
        "A".to_string()
    } else {
        segment_raw
    };
    let case_start_date = ask("Case start date (YYYYMMDD): ")?;
    let (case_end_date, close_reason) = if segment == "B" {
        (
            ask("Case end date (YYYYMMDD): ")?,
            ask("Close reason (1-3): ")?,
        )
    } else {
        (String::new(), String::new())
    };

    let mut params = FmParams {
        plan_no,
        branch_code,
        hosp_id,
        prsn_id,
        upload_month,
        seq_start,
        segment,
        case_start_date,
        case_end_date,
        close_reason,
    };
    params.normalize();
    params.validate()?;
    Ok(params)
}

fn zfill(s: &str, width: usize) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= width {
        trimmed.to_string()
    } else {
        format!("{}{}", "0".repeat(width - trimmed.len()), trimmed)
    }
}
