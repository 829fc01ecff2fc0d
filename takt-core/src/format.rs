//! Markdown rendering of contexts and run results

use crate::context::{IssueCommentContext, PrContext};
use crate::runner::RunResult;

/// Upper bound on each output section in a posted comment, in characters
///
/// GitHub rejects comment bodies above 65536 characters.
pub const MAX_COMMENT_LENGTH: usize = 60_000;

pub const CHANGED_FILES_HEADING: &str = "### Changed Files";
pub const DIFF_HEADING: &str = "### Diff";
pub const ADDITIONAL_INSTRUCTIONS_HEADING: &str = "## Additional Instructions";

/// Render a pull request as the Markdown document reviewers receive
pub fn format_pr_context(ctx: &PrContext) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let heading = format!("## PR #{}: {}", ctx.pr_number, ctx.title);

    lines.push(&heading);
    lines.push("");

    if !ctx.body.is_empty() {
        lines.push(&ctx.body);
        lines.push("");
    }

    lines.push(CHANGED_FILES_HEADING);
    let bullets: Vec<String> = ctx.changed_files.iter().map(|f| format!("- {}", f)).collect();
    lines.extend(bullets.iter().map(String::as_str));
    lines.push("");

    lines.push(DIFF_HEADING);
    lines.push(&ctx.diff);

    lines.join("\n")
}

/// Task body for a run triggered from an issue comment
pub fn build_issue_task_content(ctx: &IssueCommentContext, instruction: &str) -> String {
    let mut lines = vec![
        format!("## Issue #{}: {}", ctx.issue_number, ctx.issue_title),
        String::new(),
    ];

    if !ctx.issue_body.is_empty() {
        lines.push(ctx.issue_body.clone());
        lines.push(String::new());
    }

    push_instruction(&mut lines, instruction);
    lines.join("\n")
}

/// Task body for a run triggered from a pull request comment
pub fn build_pr_task_content(ctx: &PrContext, instruction: &str) -> String {
    let mut lines = vec![format_pr_context(ctx), String::new()];
    push_instruction(&mut lines, instruction);
    lines.join("\n")
}

fn push_instruction(lines: &mut Vec<String>, instruction: &str) {
    if instruction.is_empty() {
        return;
    }
    lines.push(ADDITIONAL_INSTRUCTIONS_HEADING.to_string());
    lines.push(String::new());
    lines.push(instruction.to_string());
    lines.push(String::new());
}

/// Render a runner result as an issue/PR comment
///
/// Output sections longer than [`MAX_COMMENT_LENGTH`] keep only their tail.
/// stdout is omitted when empty; stderr only appears for failed runs.
pub fn format_run_result(result: &RunResult, workflow: &str) -> String {
    let status = if result.success() {
        "✅ Completed"
    } else {
        "❌ Failed"
    };

    let mut lines = vec![
        format!("## TAKT {}", status),
        String::new(),
        format!("**Workflow**: `{}`", workflow),
        String::new(),
    ];

    if !result.stdout.is_empty() {
        let (output, truncated) = tail_chars(&result.stdout, MAX_COMMENT_LENGTH);
        let summary = if truncated { "Output (truncated)" } else { "Output" };
        push_details(&mut lines, summary, output);
    }

    if !result.success() && !result.stderr.is_empty() {
        let (errors, truncated) = tail_chars(&result.stderr, MAX_COMMENT_LENGTH);
        let summary = if truncated {
            "Error Output (truncated)"
        } else {
            "Error Output"
        };
        lines.push(String::new());
        push_details(&mut lines, summary, errors);
    }

    lines.join("\n")
}

fn push_details(lines: &mut Vec<String>, summary: &str, body: &str) {
    lines.push(format!("<details><summary>{}</summary>", summary));
    lines.push(String::new());
    lines.push("```".to_string());
    lines.push(body.to_string());
    lines.push("```".to_string());
    lines.push(String::new());
    lines.push("</details>".to_string());
}

/// Last `max` characters of `s`, and whether anything was cut
pub fn tail_chars(s: &str, max: usize) -> (&str, bool) {
    let count = s.chars().count();
    if count <= max {
        return (s, false);
    }
    match s.char_indices().nth(count - max) {
        Some((start, _)) => (&s[start..], true),
        None => ("", true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(body: &str, files: &[&str]) -> PrContext {
        PrContext {
            owner: "owner".to_string(),
            repo: "repo".to_string(),
            pr_number: 42,
            head_sha: "abc".to_string(),
            title: "Add login".to_string(),
            body: body.to_string(),
            diff: "diff --git a/src/a.rs b/src/a.rs\n+fn a() {}".to_string(),
            changed_files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn issue(body: &str) -> IssueCommentContext {
        IssueCommentContext {
            owner: "owner".to_string(),
            repo: "repo".to_string(),
            issue_number: 7,
            comment_body: "@takt run".to_string(),
            comment_id: 1,
            is_mention: true,
            issue_title: "Login fails".to_string(),
            issue_body: body.to_string(),
        }
    }

    /// Read the bullet list back out of a formatted PR context
    fn extract_files(formatted: &str) -> Vec<String> {
        formatted
            .lines()
            .skip_while(|l| *l != CHANGED_FILES_HEADING)
            .skip(1)
            .take_while(|l| !l.is_empty())
            .filter_map(|l| l.strip_prefix("- "))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_format_pr_context_with_body() {
        let out = format_pr_context(&pr("Adds a login form.", &["src/a.rs", "src/b.rs"]));
        assert_eq!(
            out,
            "## PR #42: Add login\n\
             \n\
             Adds a login form.\n\
             \n\
             ### Changed Files\n\
             - src/a.rs\n\
             - src/b.rs\n\
             \n\
             ### Diff\n\
             diff --git a/src/a.rs b/src/a.rs\n\
             +fn a() {}"
        );
    }

    #[test]
    fn test_format_pr_context_without_body() {
        let out = format_pr_context(&pr("", &["src/a.rs"]));
        assert!(out.starts_with("## PR #42: Add login\n\n### Changed Files\n- src/a.rs\n"));
    }

    #[test]
    fn test_format_pr_context_without_files() {
        let out = format_pr_context(&pr("", &[]));
        assert!(out.contains("### Changed Files\n\n### Diff\n"));
        assert!(out.ends_with("+fn a() {}"));
    }

    #[test]
    fn test_file_list_round_trip() {
        let files = ["src/z.rs", "README.md", "src/a.rs", "README.md"];
        let out = format_pr_context(&pr("body", &files));
        assert_eq!(extract_files(&out), files);
    }

    #[test]
    fn test_issue_task_content_full() {
        let out = build_issue_task_content(&issue("Steps to reproduce"), "add tests");
        assert_eq!(
            out,
            "## Issue #7: Login fails\n\nSteps to reproduce\n\n## Additional Instructions\n\nadd tests\n"
        );
    }

    #[test]
    fn test_issue_task_content_no_instruction() {
        let out = build_issue_task_content(&issue("Steps"), "");
        assert_eq!(out, "## Issue #7: Login fails\n\nSteps\n");
        assert!(!out.contains(ADDITIONAL_INSTRUCTIONS_HEADING));
    }

    #[test]
    fn test_issue_task_content_empty_body() {
        let out = build_issue_task_content(&issue(""), "");
        assert_eq!(out, "## Issue #7: Login fails\n");
    }

    #[test]
    fn test_pr_task_content_appends_instruction() {
        let out = build_pr_task_content(&pr("", &["a"]), "focus on errors");
        assert!(out.starts_with("## PR #42: Add login"));
        assert!(out.ends_with("## Additional Instructions\n\nfocus on errors\n"));
    }

    #[test]
    fn test_run_result_success() {
        let result = RunResult {
            exit_code: 0,
            stdout: "Workflow completed successfully.".to_string(),
            stderr: "Warning: something".to_string(),
        };
        let out = format_run_result(&result, "review");
        assert!(out.contains("## TAKT ✅ Completed"));
        assert!(out.contains("**Workflow**: `review`"));
        assert!(out.contains("<details><summary>Output</summary>"));
        assert!(out.contains("Workflow completed successfully."));
        assert!(!out.contains("Error Output"));
    }

    #[test]
    fn test_run_result_failure_with_stderr() {
        let result = RunResult {
            exit_code: 1,
            stdout: "Partial output".to_string(),
            stderr: "Error: something went wrong".to_string(),
        };
        let out = format_run_result(&result, "default");
        assert!(out.contains("## TAKT ❌ Failed"));
        assert!(out.contains("Partial output"));
        assert!(out.contains("<details><summary>Error Output</summary>"));
        assert!(out.contains("Error: something went wrong"));
    }

    #[test]
    fn test_run_result_failure_without_stderr() {
        let result = RunResult {
            exit_code: 1,
            stdout: "Some output".to_string(),
            stderr: String::new(),
        };
        assert!(!format_run_result(&result, "default").contains("Error Output"));
    }

    #[test]
    fn test_run_result_empty_stdout_omits_section() {
        let out = format_run_result(&RunResult::default(), "review");
        assert!(out.contains("## TAKT ✅ Completed"));
        assert!(!out.contains("<details>"));
    }

    #[test]
    fn test_run_result_at_limit_is_not_truncated() {
        let result = RunResult {
            exit_code: 0,
            stdout: "é".repeat(MAX_COMMENT_LENGTH),
            stderr: String::new(),
        };
        let out = format_run_result(&result, "review");
        assert!(out.contains("<details><summary>Output</summary>"));
        assert!(!out.contains("truncated"));
    }

    #[test]
    fn test_tail_chars_keeps_exactly_max() {
        let text = format!("ab{}", "é".repeat(MAX_COMMENT_LENGTH - 1));
        let (tail, truncated) = tail_chars(&text, MAX_COMMENT_LENGTH);
        assert!(truncated);
        assert_eq!(tail.chars().count(), MAX_COMMENT_LENGTH);
        assert!(tail.starts_with('b'));

        let (tail, truncated) = tail_chars("abc", 3);
        assert_eq!((tail, truncated), ("abc", false));
        assert_eq!(tail_chars("abc", 0), ("", true));
    }

    #[test]
    fn test_run_result_truncates_to_tail() {
        let stdout = format!("HEAD{}TAIL", "x".repeat(MAX_COMMENT_LENGTH));
        let result = RunResult {
            exit_code: 0,
            stdout: stdout.clone(),
            stderr: String::new(),
        };
        let out = format_run_result(&result, "review");
        assert!(out.contains("<details><summary>Output (truncated)</summary>"));
        assert!(!out.contains("HEAD"));
        assert!(out.contains("TAIL"));
        assert!(out.len() < stdout.len() + 200);
    }

    #[test]
    fn test_tail_chars_multibyte() {
        let (tail, truncated) = tail_chars("あいうえお", 2);
        assert!(truncated);
        assert_eq!(tail, "えお");

        let (all, truncated) = tail_chars("あい", 2);
        assert!(!truncated);
        assert_eq!(all, "あい");
    }
}
