//! takt core - mention parsing and context assembly for the takt GitHub Action
//!
//! This crate turns `@takt` comments and webhook payloads into structured
//! commands and Markdown task descriptions, invokes the `takt` CLI, and
//! parses review findings out of its output. All subprocess and API access
//! goes through traits ([`Exec`], [`PrSource`], [`ToolRunner`],
//! [`Publisher`]) so the logic can be driven by fakes.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod exec;
pub mod format;
pub mod mention;
pub mod publish;
pub mod review;
pub mod runner;
pub mod setup;

pub use command::{parse_command, CommandKind, CommandOptions, KnownOption, MentionCommand};
pub use config::{Config, ConfigOverrides};
pub use context::{
    build_comment_context, build_issue_comment_context, build_pr_context, parse_changed_files,
    CommentContext, IssueCommentContext, PrContext, PrMetadata, PrSource,
};
pub use error::{Error, Result};
pub use event::{detect_event_type, EventContext, EventPayload, EventType};
pub use exec::{Exec, ExecOutput, ExecRequest, SystemExec};
pub use format::{
    build_issue_task_content, build_pr_task_content, format_pr_context, format_run_result,
    MAX_COMMENT_LENGTH,
};
pub use mention::{extract_instruction, is_mention, MENTION};
pub use publish::{post_issue_comment, post_review_comments, Publisher};
pub use review::{parse_review_output, ReviewComment};
pub use runner::{RunOptions, RunResult, TaktRunner, ToolRunner};
pub use setup::{ensure_gh_authenticated, ensure_takt_installed, GhEnv, InstallSource};
