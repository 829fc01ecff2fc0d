//! GitHub Actions workflow commands and job outputs

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Ask the runner to redact `value` from all further log output
pub fn mask(value: &str) {
    for line in value.lines().filter(|l| !l.trim().is_empty()) {
        println!("::add-mask::{}", line);
    }
}

/// Emit an error annotation for the job
pub fn error(message: &str) {
    println!("::error::{}", escape_data(message));
}

/// Set a job output, appending to `$GITHUB_OUTPUT`
///
/// Outside of Actions there is no output file, so the value is only logged.
pub fn set_output(name: &str, value: &str) -> std::io::Result<()> {
    match std::env::var("GITHUB_OUTPUT") {
        Ok(path) if !path.is_empty() => write_output(Path::new(&path), name, value),
        _ => {
            debug!(name, len = value.len(), "GITHUB_OUTPUT not set; output not recorded");
            Ok(())
        }
    }
}

/// Append `name<<DELIM\nvalue\nDELIM` to the output file
pub(crate) fn write_output(path: &Path, name: &str, value: &str) -> std::io::Result<()> {
    let delimiter = unique_delimiter(value);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}<<{}", name, delimiter)?;
    writeln!(file, "{}", value)?;
    writeln!(file, "{}", delimiter)?;
    Ok(())
}

fn unique_delimiter(value: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    delimiter_for(value, &format!("{}_{}", std::process::id(), nanos))
}

fn delimiter_for(value: &str, seed: &str) -> String {
    let mut delimiter = format!("ghadelimiter_{}", seed);
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    delimiter
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("50% done\nnext"), "50%25 done%0Anext");
        assert_eq!(escape_data("a\r\nb"), "a%0D%0Ab");
    }

    #[test]
    fn test_write_output_multiline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");

        write_output(&path, "pr_context", "## PR #1: t\n\n### Diff").unwrap();
        write_output(&path, "exit_code", "0").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 8);

        let (name, delimiter) = lines[0].split_once("<<").unwrap();
        assert_eq!(name, "pr_context");
        assert_eq!(&lines[1..4], &["## PR #1: t", "", "### Diff"]);
        assert_eq!(lines[4], delimiter);
        assert!(lines[5].starts_with("exit_code<<"));
        assert_eq!(lines[6], "0");
    }

    #[test]
    fn test_delimiter_avoids_value() {
        assert_eq!(delimiter_for("plain", "1"), "ghadelimiter_1");
        assert_eq!(delimiter_for("a ghadelimiter_1 b", "1"), "ghadelimiter_1_");
        assert_eq!(
            delimiter_for("ghadelimiter_1 and ghadelimiter_1_", "1"),
            "ghadelimiter_1__"
        );
    }
}
