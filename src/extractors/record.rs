// src/extractors/record.rs
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extractors::segmenter::RowSpan;
use crate::utils::error::ExtractError;

/// Typed fields of one exhibit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    pub label: String,
    pub amount: Decimal,
    pub percent: Option<Decimal>,
}

/// A parsed row together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub section: String,
    pub label: String,
    pub amount: Decimal,
    pub percent: Option<Decimal>,
    /// Fund type shared by every row of the section.
    pub category: Option<String>,
}

impl Record {
    pub fn from_fields(fields: FieldSet, section: &str, category: Option<&str>) -> Self {
        Self {
            section: section.to_string(),
            label: fields.label,
            amount: fields.amount,
            percent: fields.percent,
            category: category.map(str::to_string),
        }
    }
}

fn malformed(reason: &str, raw_token: &str) -> ExtractError {
    ExtractError::MalformedRow {
        reason: reason.to_string(),
        raw_token: raw_token.to_string(),
    }
}

/// Splits a row on `field_separator` and types its fields.
///
/// Rows hold a label, an amount and an optional percent. When `max_fields`
/// is 4 a trailing descriptive token is folded back into the label.
pub fn parse(row: &RowSpan<'_>, field_separator: char, max_fields: usize) -> Result<FieldSet, ExtractError> {
    let tokens: Vec<&str> = row.text.split(field_separator).map(str::trim).collect();

    if tokens.len() < 2 {
        return Err(malformed("missing amount", row.text));
    }
    if tokens.len() > max_fields {
        return Err(malformed("unexpected field count", row.text));
    }

    let mut label = tokens[0].to_string();
    if label.is_empty() {
        return Err(malformed("empty label", row.text));
    }

    let amount = Decimal::from_str(tokens[1]).map_err(|_| malformed("non-numeric amount", tokens[1]))?;

    let percent = match tokens.get(2) {
        Some(token) if !token.is_empty() => {
            Some(Decimal::from_str(token).map_err(|_| malformed("non-numeric percent", token))?)
        }
        _ => None,
    };

    if let Some(extra) = tokens.get(3).filter(|t| !t.is_empty()) {
        label.push(' ');
        label.push_str(extra);
    }

    Ok(FieldSet { label, amount, percent })
}
