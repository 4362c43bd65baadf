// src/utils/text_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::extractors::normalizer::{FIELD_SEPARATOR, ROW_BREAK};
use crate::utils::error::AppError;

/// Saves text to a file with `[[type>>` ... `<<type]]` markers around each highlight
pub fn save_debug_text(text: &str, filename: &Path, highlights: &[(usize, usize, &str)]) -> Result<(), AppError> {
    let mut file = File::create(filename)?;

    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| h.0); // Sort by position

    let mut debug_text = String::with_capacity(text.len() + highlights.len() * 16);
    let mut last_pos = 0;
    for (start, end, highlight_type) in sorted_highlights {
        // Overlapping highlights are skipped rather than nested
        if start < last_pos {
            continue;
        }
        debug_text.push_str(&text[last_pos..start]);
        debug_text.push_str(&format!("[[{}@{}>>", highlight_type, start));
        debug_text.push_str(&text[start..end]);
        debug_text.push_str(&format!("<<{}]]", highlight_type));
        last_pos = end;
    }
    debug_text.push_str(&text[last_pos..]);

    file.write_all(debug_text.as_bytes())?;

    tracing::info!("Saved debug text to {}", filename.display());
    Ok(())
}

/// Creates a debug copy of `text` with every occurrence of each anchor marked.
/// Repeated anchors show up as more than one marker.
pub fn create_debug_text(text: &str, filename: &Path, anchors: &[(&str, &str)]) -> Result<(), AppError> {
    let mut highlights = Vec::new();

    for (anchor, highlight_type) in anchors {
        if anchor.is_empty() {
            continue;
        }
        let mut found = 0;
        for (pos, matched) in text.match_indices(anchor) {
            highlights.push((pos, pos + matched.len(), *highlight_type));
            found += 1;
        }
        if found > 1 {
            tracing::warn!("Anchor {:?} occurs {} times; only the first is used", anchor, found);
        }
    }

    save_debug_text(text, filename, &highlights)
}

/// Makes synthetic row and field markers visible.
pub fn render_markers(normalized: &str) -> String {
    normalized
        .replace(ROW_BREAK, "\n")
        .replace(FIELD_SEPARATOR, " | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_every_anchor_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotated.txt");
        let text = "General Receipts:Tax...1Total General Receipts";
        create_debug_text(text, &path, &[("General Receipts", "gf")]).unwrap();
        let out = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            out,
            "[[gf@0>>General Receipts<<gf]]:Tax...1Total [[gf@30>>General Receipts<<gf]]"
        );
    }

    #[test]
    fn renders_markers_readably() {
        let text = format!("Tax{FIELD_SEPARATOR}1{ROW_BREAK}Fees{FIELD_SEPARATOR}2");
        assert_eq!(render_markers(&text), "Tax | 1\nFees | 2");
    }
}
