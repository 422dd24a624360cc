//! Request planning and output checks
//!
//! Texts are split into contiguous batches that respect a provider's
//! [`UsageLimit`]. A single text longer than `max_chars` cannot be split, so
//! it travels alone and the provider decides.

use std::ops::Range;

use crate::error::{MtError, MtResult};
use crate::translator::UsageLimit;

/// Split `texts` into index ranges, in order, each within `limit`
pub fn plan_batches(texts: &[String], limit: UsageLimit) -> Vec<Range<usize>> {
    let max_items = limit.max_items.max(1);
    let mut batches = Vec::new();
    let mut start = 0;
    let mut chars = 0;

    for (i, text) in texts.iter().enumerate() {
        let len = text.chars().count();
        let count = i - start;
        let full = count >= max_items
            || limit
                .max_chars
                .is_some_and(|max| count > 0 && chars + len > max);
        if full {
            batches.push(start..i);
            start = i;
            chars = 0;
        }
        chars += len;

        if limit.max_chars.is_some_and(|max| len > max) {
            batches.push(start..i + 1);
            start = i + 1;
            chars = 0;
        }
    }
    if start < texts.len() {
        batches.push(start..texts.len());
    }
    batches
}

/// Reject provider output that cannot be a translation of `inputs`.
///
/// Fails on a count mismatch, an empty output for a non-empty input, or a
/// batch that came back unchanged although it contains words.
pub fn check_quality(inputs: &[String], outputs: &[String]) -> MtResult<()> {
    if inputs.len() != outputs.len() {
        return Err(MtError::QualityLow(format!(
            "expected {} translations, got {}",
            inputs.len(),
            outputs.len()
        )));
    }
    for (input, output) in inputs.iter().zip(outputs) {
        if !input.trim().is_empty() && output.trim().is_empty() {
            return Err(MtError::QualityLow(format!("empty translation for '{}'", input)));
        }
    }
    let unchanged = inputs.iter().zip(outputs).all(|(input, output)| input == output);
    let has_words = inputs
        .iter()
        .any(|input| input.chars().any(char::is_alphabetic));
    if unchanged && has_words {
        return Err(MtError::QualityLow(
            "provider returned the input unchanged".to_string(),
        ));
    }
    Ok(())
}
