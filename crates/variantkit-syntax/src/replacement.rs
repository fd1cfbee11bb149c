use thiserror::Error;

/// A single text substitution over a byte range, applied by descending-`start`
/// splice so that earlier edits don't shift the offsets of later ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

impl Replacement {
    pub fn new(start: u32, end: u32, text: impl Into<String>) -> Self {
        Self { start, end, text: text.into() }
    }

    /// A replacement that deletes the covered range entirely.
    pub fn delete(start: u32, end: u32) -> Self {
        Self::new(start, end, "")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplacementError {
    #[error("replacement [{a_start}, {a_end}) overlaps replacement [{b_start}, {b_end})")]
    Overlapping { a_start: u32, a_end: u32, b_start: u32, b_end: u32 },
}

/// Applies a set of non-overlapping replacements to `text`: deduplicate,
/// sort by `start` descending, then splice each region in turn so that
/// earlier (larger-offset) replacements are applied before offsets shift
/// under them.
pub fn apply_replacements(text: &str, mut replacements: Vec<Replacement>) -> Result<String, ReplacementError> {
    replacements.sort_by(|a, b| b.start.cmp(&a.start).then_with(|| b.end.cmp(&a.end)));
    replacements.dedup_by(|a, b| a.start == b.start && a.end == b.end && a.text == b.text);

    for window in replacements.windows(2) {
        let [later, earlier] = window else { unreachable!() };
        if earlier.end > later.start {
            return Err(ReplacementError::Overlapping {
                a_start: earlier.start,
                a_end: earlier.end,
                b_start: later.start,
                b_end: later.end,
            });
        }
    }

    let mut out = text.to_string();
    for replacement in &replacements {
        let start = replacement.start as usize;
        let end = replacement.end as usize;
        out.replace_range(start..end, &replacement.text);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_in_descending_order_and_preserves_other_bytes() {
        let text = "const a = FOO; const b = BAR;";
        let replacements =
            vec![Replacement::new(10, 13, "1"), Replacement::new(26, 29, "2")];

        let out = apply_replacements(text, replacements).unwrap();
        assert_eq!(out, "const a = 1; const b = 2;");
    }

    #[test]
    fn empty_replacement_deletes_range() {
        let text = "keep(DROP_ME);";
        let out = apply_replacements(text, vec![Replacement::delete(5, 12)]).unwrap();
        assert_eq!(out, "keep();");
    }

    #[test]
    fn rejects_overlapping_replacements() {
        let replacements = vec![Replacement::new(0, 5, "a"), Replacement::new(3, 8, "b")];
        assert!(apply_replacements("0123456789", replacements).is_err());
    }

    #[test]
    fn deduplicates_identical_replacements() {
        let text = "abc";
        let replacements = vec![Replacement::new(0, 1, "X"), Replacement::new(0, 1, "X")];
        let out = apply_replacements(text, replacements).unwrap();
        assert_eq!(out, "Xbc");
    }
}
