//! Review findings embedded in runner output
//!
//! A review workflow reports inline findings in a delimited block:
//!
//! ```text
//! <!-- takt-review -->
//! src/file.rs:42: Review comment here.
//! <!-- /takt-review -->
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref REVIEW_BLOCK_RE: Regex =
        Regex::new(r"(?s)<!-- takt-review -->(.*?)<!-- /takt-review -->")
            .expect("review block regex");
    static ref REVIEW_LINE_RE: Regex =
        Regex::new(r"^(.+?):(\d+):\s*(.+)$").expect("review line regex");
}

/// An inline comment on one line of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub path: String,
    /// 1-based line in the new version of the file
    pub line: u32,
    pub body: String,
}

/// Extract review comments from the first review block in `output`
///
/// Lines that are not `path:line: message` are skipped. Order follows the
/// block; duplicates are kept.
pub fn parse_review_output(output: &str) -> Vec<ReviewComment> {
    let Some(block) = REVIEW_BLOCK_RE.captures(output).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    block
        .as_str()
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_review_line)
        .collect()
}

fn parse_review_line(line: &str) -> Option<ReviewComment> {
    let caps = REVIEW_LINE_RE.captures(line)?;
    Some(ReviewComment {
        path: caps.get(1)?.as_str().to_string(),
        line: caps.get(2)?.as_str().parse().ok()?,
        body: caps.get(3)?.as_str().to_string(),
    })
}
