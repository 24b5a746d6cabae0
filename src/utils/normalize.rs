//! Field normalization helpers shared by all source adapters.
//!
//! Providers disagree on how they spell "missing": empty strings, `null`,
//! `"N/A"`, free-text dates, DOIs wrapped in resolver URLs. These helpers fold
//! all of that into the sentinels used by [`Record`](crate::models::Record).

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{Doi, Year, NOT_AVAILABLE};

/// Title prefixes some providers prepend to related notices.
const TITLE_PREFIXES: &[&str] = &[
    "author response for ",
    "correction to ",
    "retraction of ",
    "expression of concern: ",
    "reply to ",
    "erratum for ",
];

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid year regex"))
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

fn is_missing(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case(NOT_AVAILABLE)
}

/// Normalize free text: strip notice prefixes and surrounding quotes, collapse whitespace.
///
/// Returns [`NOT_AVAILABLE`] for empty input.
pub fn normalize_string(text: &str) -> String {
    if is_missing(text) {
        return NOT_AVAILABLE.to_string();
    }

    let mut text = text.trim();
    for prefix in TITLE_PREFIXES {
        if text.len() >= prefix.len()
            && text.is_char_boundary(prefix.len())
            && text[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            text = text[prefix.len()..].trim();
        }
    }

    if text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')))
    {
        text = text[1..text.len() - 1].trim();
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        collapsed
    }
}

/// Extract a four-digit publication year from free text.
pub fn normalize_year(raw: &str) -> Year {
    if is_missing(raw) {
        return Year::Undated;
    }

    if let Some(found) = year_pattern().find(raw) {
        if let Ok(year) = found.as_str().parse() {
            return Year::Dated(year);
        }
    }

    let raw = raw.trim();
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(year) = raw.parse() {
            return Year::Dated(year);
        }
    }

    Year::Undated
}

/// Validate a DOI. Resolver prefixes are stripped; the result must start with `10.`.
pub fn validate_doi(raw: &str) -> Doi {
    if is_missing(raw) {
        return Doi::Absent;
    }

    let mut doi = raw.trim();
    for prefix in DOI_PREFIXES {
        if doi.len() >= prefix.len()
            && doi.is_char_boundary(prefix.len())
            && doi[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            doi = doi[prefix.len()..].trim();
            break;
        }
    }

    if doi.starts_with("10.") && doi.len() > 3 {
        Doi::Valid(doi.to_string())
    } else {
        Doi::Absent
    }
}

/// Join author names into one display string, dropping blanks.
pub fn clean_author_list<I, S>(authors: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<String> = authors
        .into_iter()
        .map(|name| name.as_ref().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        names.join(", ")
    }
}

/// Parse the first integer found in a citation count field; anything else is 0.
pub fn normalize_citation_count(raw: &str) -> u32 {
    if is_missing(raw) {
        return 0;
    }
    digits_pattern()
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
