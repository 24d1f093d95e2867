//! Classification labels: one of the fixed food classes, or a sentinel
//! that marks why no class could be produced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::enums::FoodClass;
use crate::db::DatabaseError;

pub const ANALYSIS_FAILED: &str = "Analysis Failed";
pub const MODEL_ERROR: &str = "Model Error";

const UNKNOWN_CLASS_PREFIX: &str = "Unknown Class (";

/// Output of the inference engine. Never a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Label {
    Food(FoodClass),
    /// Photo could not be decoded or the forward pass failed.
    AnalysisFailed,
    /// Engine has no model loaded.
    ModelError,
    /// Argmax landed outside the class list.
    UnknownClass(usize),
}

impl Label {
    /// Map an output index to a label, guarding the class-list bounds.
    pub fn from_index(index: usize) -> Self {
        match FoodClass::from_index(index) {
            Some(class) => Label::Food(class),
            None => Label::UnknownClass(index),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Label::Food(_))
    }

    /// Lower-cased, space-free form used in storage file names.
    pub fn file_stem(&self) -> String {
        self.to_string().replace(' ', "_").to_lowercase()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Food(class) => f.write_str(class.as_str()),
            Label::AnalysisFailed => f.write_str(ANALYSIS_FAILED),
            Label::ModelError => f.write_str(MODEL_ERROR),
            Label::UnknownClass(index) => write!(f, "{UNKNOWN_CLASS_PREFIX}{index})"),
        }
    }
}

impl FromStr for Label {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ANALYSIS_FAILED => return Ok(Label::AnalysisFailed),
            MODEL_ERROR => return Ok(Label::ModelError),
            _ => {}
        }
        if let Some(index) = s
            .strip_prefix(UNKNOWN_CLASS_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|digits| digits.parse::<usize>().ok())
            .filter(|&index| FoodClass::from_index(index).is_none())
        {
            return Ok(Label::UnknownClass(index));
        }
        s.parse::<FoodClass>()
            .map(Label::Food)
            .map_err(|_| DatabaseError::InvalidEnum {
                field: "Label".into(),
                value: s.into(),
            })
    }
}

impl TryFrom<String> for Label {
    type Error = DatabaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}
