//! Bullet-line extraction and keyword-overlap filtering for rewritten prompts.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of rewritten prompts kept from one rewriter reply.
pub const MAX_IMPROVED_PROMPTS: usize = 2;

/// Leading characters that mark a bullet line.
const BULLET_MARKERS: [char; 2] = ['•', '-'];

/// Characters stripped from the front of a bullet line.
const BULLET_PREFIX: [char; 3] = ['•', '-', ' '];

/// Line boundaries recognised in model replies, including lone `\r`,
/// form feeds and the Unicode line/paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Pull bullet lines out of a model reply.
///
/// A line is a bullet if its first non-whitespace character is `•` or `-`.
/// The marker (and any run of markers and spaces) is removed.
pub fn extract_bullets(text: &str) -> Vec<String> {
    text.split(is_line_break)
        .filter(|line| line.trim_start().starts_with(BULLET_MARKERS))
        .map(|line| line.trim_start_matches(BULLET_PREFIX).trim().to_string())
        .collect()
}

/// Lowercased ASCII words of four or more letters in `prompt`.
pub fn prompt_keywords(prompt: &str) -> Vec<String> {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[A-Za-z]{4,}").expect("valid regex"));

    WORD_RE
        .find_iter(prompt)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}

/// Bullets from `reply` that still mention a keyword of `original_prompt`.
///
/// Matching is a case-insensitive substring test. Only the first
/// [`MAX_IMPROVED_PROMPTS`] survivors are returned; the result is empty when
/// the model misbehaves or the prompt has no qualifying keyword.
pub fn select_bullets(reply: &str, original_prompt: &str) -> Vec<String> {
    let keywords = prompt_keywords(original_prompt);

    extract_bullets(reply)
        .into_iter()
        .filter(|bullet| {
            let lower = bullet.to_lowercase();
            keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .take(MAX_IMPROVED_PROMPTS)
        .collect()
}
