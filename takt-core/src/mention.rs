//! `@takt` mention detection

use lazy_static::lazy_static;
use regex::Regex;

/// The literal token that activates the action in a comment
pub const MENTION: &str = "@takt";

lazy_static! {
    // ASCII boundary: `@taktこれ` is a mention, `@takt_bot` is not
    pub(crate) static ref MENTION_RE: Regex =
        Regex::new(r"(?i)@takt(?-u:\b)").expect("mention regex");
}

/// Whether `text` mentions `@takt` as a whole word, in any letter case
///
/// Only ASCII letters, digits and `_` continue the word.
pub fn is_mention(text: &str) -> bool {
    MENTION_RE.is_match(text)
}

/// Drop the first `@takt` mention and trim the ends of what is left
///
/// Whitespace inside the text is kept as-is, so a mention in the middle of a
/// sentence leaves two spaces behind.
pub fn extract_instruction(text: &str) -> String {
    MENTION_RE.replace(text, "").trim().to_string()
}
