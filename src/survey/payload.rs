//! Callback payload codec.
//!
//! List choices are encoded as `"{step}:{item_id}"`, binary choices as the
//! literals `"yes"`/`"no"`, and the opening question as `"q1_yes"`/`"q1_no"`.

use crate::error::SurveyError;

use super::steps::StepName;

pub const Q1_YES: &str = "q1_yes";
pub const Q1_NO: &str = "q1_no";
pub const YES: &str = "yes";
pub const NO: &str = "no";

/// A yes/no answer to either the opening question or a binary step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    /// Decode a binary-step answer.
    pub fn from_binary(data: &str) -> Result<Self, SurveyError> {
        match data {
            YES => Ok(Self::Yes),
            NO => Ok(Self::No),
            other => Err(SurveyError::UnknownAnswer {
                payload: other.to_string(),
            }),
        }
    }

    /// Decode an answer to the opening question.
    pub fn from_q1(data: &str) -> Result<Self, SurveyError> {
        match data {
            Q1_YES => Ok(Self::Yes),
            Q1_NO => Ok(Self::No),
            other => Err(SurveyError::UnknownAnswer {
                payload: other.to_string(),
            }),
        }
    }
}

/// Encode a list choice.
pub fn selection(step: StepName, item_id: i64) -> String {
    format!("{step}:{item_id}")
}

/// Decode a list choice made while `expected` is the current step.
///
/// A payload naming another step comes from a stale keyboard and is
/// rejected the same way as an unparsable one.
pub fn parse_selection(data: &str, expected: StepName) -> Result<i64, SurveyError> {
    let malformed = || SurveyError::MalformedSelection {
        payload: data.to_string(),
    };

    let (step, id) = data.split_once(':').ok_or_else(malformed)?;
    if step != expected.as_str() {
        return Err(malformed());
    }
    id.trim().parse::<i64>().map_err(|_| malformed())
}
