// src/extractors/segmenter.rs
use crate::extractors::normalizer::ROW_BREAK;

/// One row of a normalized section, borrowed from the section text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan<'a> {
    /// Position among the non-empty rows of the section.
    pub index: usize,
    pub text: &'a str,
}

/// Iterator over the rows of a normalized section.
///
/// Splits on row-break markers and on any newline still present. Blank
/// spans are skipped. Cloning the iterator restarts from the same point.
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    rest: Option<&'a str>,
    index: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = RowSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = self.rest?;
            let (piece, remainder) = match rest.find(is_row_boundary) {
                Some(pos) => {
                    // Both boundary characters are a single byte wide.
                    (&rest[..pos], Some(&rest[pos + 1..]))
                }
                None => (rest, None),
            };
            self.rest = remainder;

            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row = RowSpan {
                index: self.index,
                text: trimmed,
            };
            self.index += 1;
            return Some(row);
        }
    }
}

fn is_row_boundary(c: char) -> bool {
    c == ROW_BREAK || c == '\n'
}

/// Splits normalized section text into rows.
pub fn segment(text: &str) -> Rows<'_> {
    Rows {
        rest: Some(text),
        index: 0,
    }
}
