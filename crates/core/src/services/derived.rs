//! Fields derived from a post's title, excerpt and content.

use regex::Regex;
use std::sync::LazyLock;

/// Characters of content used for a generated excerpt.
pub const EXCERPT_SOURCE_CHARS: usize = 150;

/// Maximum length of a meta description.
pub const META_DESCRIPTION_CHARS: usize = 160;

/// Reading speed used for read-time estimates.
pub const WORDS_PER_MINUTE: usize = 200;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

/// URL slug for a title or name.
///
/// `"Hello,  World -- 2025!"` becomes `"hello-world-2025"`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lower, "");
    let hyphenated = WHITESPACE_RUNS.replace_all(stripped.trim(), "-");
    let collapsed = HYPHEN_RUNS.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The caller's excerpt when present, otherwise the start of the content.
#[must_use]
pub fn derive_excerpt(excerpt: Option<&str>, content: &str) -> String {
    match excerpt.map(str::trim).filter(|e| !e.is_empty()) {
        Some(excerpt) => excerpt.to_string(),
        None => format!("{}...", truncate_chars(content.trim(), EXCERPT_SOURCE_CHARS)),
    }
}

/// Meta description for an excerpt.
#[must_use]
pub fn meta_description(excerpt: &str) -> String {
    truncate_chars(excerpt, META_DESCRIPTION_CHARS).to_string()
}

/// Estimated reading time in whole minutes, at least one.
#[must_use]
pub fn read_time_minutes(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Trim, lowercase and de-duplicate tag names, keeping first-seen order.
#[must_use]
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Whether a colour is in `#RRGGBB` form.
#[must_use]
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
