use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DialogueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Expense,
    Goal,
}

impl RecordType {
    /// Label used on summary cards.
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Expense => "Gasto",
            Self::Goal => "Meta",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::Goal => "GOAL",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulator filled across turns: type, then amount, then category.
///
/// Setters refuse to fill a field before its predecessor and never overwrite
/// a field that is already set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedRecord {
    record_type: Option<RecordType>,
    amount: Option<f64>,
    category: Option<String>,
}

impl CollectedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(&self) -> Option<RecordType> {
        self.record_type
    }

    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn set_record_type(&mut self, record_type: RecordType) -> Result<(), DialogueError> {
        if self.record_type.is_some() {
            return Err(DialogueError::OutOfOrder("record_type"));
        }
        self.record_type = Some(record_type);
        Ok(())
    }

    pub fn set_amount(&mut self, amount: f64) -> Result<(), DialogueError> {
        if self.record_type.is_none() || self.amount.is_some() {
            return Err(DialogueError::OutOfOrder("amount"));
        }
        self.amount = Some(amount);
        Ok(())
    }

    pub fn set_category(&mut self, category: impl Into<String>) -> Result<(), DialogueError> {
        if self.amount.is_none() || self.category.is_some() {
            return Err(DialogueError::OutOfOrder("category"));
        }
        self.category = Some(category.into());
        Ok(())
    }

    /// Returns the finished record once every field is populated.
    pub fn complete(&self) -> Option<CompletedRecord> {
        Some(CompletedRecord {
            record_type: self.record_type?,
            amount: self.amount?,
            category: self.category.clone()?,
        })
    }
}

/// A fully populated record, the only shape handed to completion callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRecord {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub amount: f64,
    pub category: String,
}

impl CompletedRecord {
    /// "$amount - category", as shown on the summary card.
    pub fn summary_value(&self) -> String {
        format!("${} - {}", self.amount, self.category)
    }
}
