// src/extractors/section.rs

// --- Imports ---
use crate::utils::error::ExtractError;

// --- Data Structures ---
/// A span of the searched text lying between a start and an end anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub name: String,
    /// Byte offset just past the start anchor.
    pub start: usize,
    /// Byte offset of the end anchor.
    pub end: usize,
    pub text: &'a str,
}

/// Finds the text between `start_anchor` and `end_anchor`.
///
/// Anchors are literal strings and only their first occurrence counts. The
/// section exists only when the end anchor starts at or after the end of the
/// start anchor and the span between them is non-empty.
pub fn locate<'a>(
    text: &'a str,
    name: &str,
    start_anchor: &str,
    end_anchor: &str,
) -> Result<Section<'a>, ExtractError> {
    let not_found = || ExtractError::SectionNotFound {
        section: name.to_string(),
        start_anchor: start_anchor.to_string(),
        end_anchor: end_anchor.to_string(),
    };

    let anchor_pos = text.find(start_anchor).ok_or_else(|| {
        tracing::debug!("Start anchor {:?} for '{}' not present", start_anchor, name);
        not_found()
    })?;
    let end = text.find(end_anchor).ok_or_else(|| {
        tracing::debug!("End anchor {:?} for '{}' not present", end_anchor, name);
        not_found()
    })?;

    let start = anchor_pos + start_anchor.len();
    if start >= end {
        tracing::debug!(
            "Anchors for '{}' out of order: content starts at {}, end anchor at {}",
            name,
            start,
            end
        );
        return Err(not_found());
    }

    tracing::debug!("Located section '{}' at {}..{}", name, start, end);
    Ok(Section {
        name: name.to_string(),
        start,
        end,
        text: &text[start..end],
    })
}
