//! Slug normalization: turns a missing slug into a search term.
//!
//! The result is only ever used to look venues up, never as a key into the
//! store. `normalize` is total and idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{EVENT_SEPARATOR, MIN_DISAMBIGUATION_DIGITS};

static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]+").expect("valid separator pattern"));

// One or more trailing system-generated ids, e.g. `-1759813035`. Shorter
// numerals such as years and unit numbers are kept.
static DISAMBIGUATION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?:-[0-9]{{{},}})+-?$", MIN_DISAMBIGUATION_DIGITS))
        .expect("valid suffix pattern")
});

/// Separators are collapsed before the suffix strip and the `-at-` split, so
/// underscore-joined input normalizes like its hyphenated form:
/// `foo_1234567` gives `foo` and `quiz_at_the_crown` gives `the-crown`.
/// Collapsing last would leave those as `foo-1234567` and
/// `quiz-at-the-crown`, which a second pass would change.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();

    let canonical = SEPARATOR_RUN.replace_all(&lowered, "-");

    let stripped = DISAMBIGUATION_SUFFIX.replace(&canonical, "");

    let venue_part = match stripped.rfind(EVENT_SEPARATOR) {
        Some(pos) => &stripped[pos + EVENT_SEPARATOR.len()..],
        None => &stripped[..],
    };

    venue_part.trim_matches('-').to_string()
}
