//! Text normalization shared by the document builder.

use crate::catalog_source::MultiValue;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[\W_]+").expect("valid non-word regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace regex");
    static ref SEPARATORS: Regex = Regex::new(r"[|,/;]+|\s+").expect("valid separator regex");
}

/// Lower-cases, collapses every run of non-word characters (underscore
/// included) to a single space and trims.
pub fn clean_text(s: &str) -> String {
    let lowered = s.to_lowercase();
    let spaced = NON_WORD.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&spaced, " ").trim().to_string()
}

/// `clean_text` for optional columns; missing input yields `""`.
pub fn clean_optional(s: Option<&str>) -> String {
    s.map(clean_text).unwrap_or_default()
}

/// Splits a multi-valued field into cleaned, non-empty pieces, keeping order
/// and duplicates.
pub fn split_multi_value(field: Option<&MultiValue>) -> Vec<String> {
    match field {
        None => Vec::new(),
        Some(MultiValue::List(values)) => values
            .iter()
            .map(|v| clean_text(v.as_str()))
            .filter(|v| !v.is_empty())
            .collect(),
        Some(MultiValue::Delimited(s)) => split_delimited(s),
    }
}

/// Splits on any of `| , ; /` or whitespace runs, then cleans each piece.
pub fn split_delimited(s: &str) -> Vec<String> {
    SEPARATORS
        .split(s)
        .map(clean_text)
        .filter(|v| !v.is_empty())
        .collect()
}
