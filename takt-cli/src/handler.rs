//! Event dispatch: decide what one webhook event should do and do it

use async_trait::async_trait;
use takt_core::{
    build_comment_context, build_issue_comment_context, build_issue_task_content,
    build_pr_context, build_pr_task_content, format_pr_context, format_run_result,
    parse_command, parse_review_output, post_issue_comment, post_review_comments, Config,
    Error, EventContext, EventType, MentionCommand, PrContext, PrSource, Publisher, RunOptions,
    RunResult, ToolRunner, MENTION,
};
use tracing::info;

/// Per-run values that come from action inputs rather than config
#[derive(Clone, Default)]
pub struct RunSettings {
    /// Explicit `pr_number` input
    pub pr_number: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub auto_pr: bool,
}

/// How a run ended, short of a collaborator error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Completed,
    /// Nothing to do; not a failure
    Skipped(String),
    Failed(String),
}

/// Result of handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    /// Job outputs to record, in order
    pub outputs: Vec<(&'static str, String)>,
}

impl Outcome {
    fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: Status::Skipped(message.into()),
            outputs: Vec::new(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failed(message.into()),
            outputs: Vec::new(),
        }
    }
}

/// Preparation the runner needs before its first invocation
///
/// Called only once an event is known to run a workflow.
#[async_trait]
pub trait ToolSetup: Send + Sync {
    async fn prepare(&self) -> takt_core::Result<()>;
}

/// Sequences context building, the runner and publishing for one event
pub struct Handler<'a> {
    pub event: &'a EventContext,
    pub config: &'a Config,
    pub settings: &'a RunSettings,
    pub source: &'a dyn PrSource,
    pub setup: &'a dyn ToolSetup,
    pub runner: &'a dyn ToolRunner,
    pub publisher: &'a dyn Publisher,
}

impl Handler<'_> {
    pub async fn handle(&self) -> takt_core::Result<Outcome> {
        let event_type = self.event.event_type();
        info!(
            event = %self.event.event_name,
            event_type = %event_type,
            repo = %self.event.full_name(),
            "Handling event"
        );

        match event_type {
            EventType::PullRequest => self.handle_pull_request().await,
            EventType::IssueComment => self.handle_issue_comment().await,
            EventType::Unknown => Ok(Outcome::failed(format!(
                "Unsupported event type: {}",
                self.event.event_name
            ))),
        }
    }

    async fn handle_pull_request(&self) -> takt_core::Result<Outcome> {
        let Some(pr_number) = self.event.resolve_pr_number(self.settings.pr_number.as_deref())
        else {
            return Ok(Outcome::failed(
                "Could not determine PR number from event or inputs.",
            ));
        };

        info!(pr_number, "Processing pull request");
        let ctx = build_pr_context(self.event, self.source, pr_number).await?;
        let formatted = format_pr_context(&ctx);

        info!(
            title = %ctx.title,
            changed_files = ctx.changed_files.len(),
            diff_len = ctx.diff.len(),
            "Pull request context ready"
        );

        let mut outcome = Outcome {
            status: Status::Completed,
            outputs: vec![("pr_context", formatted.clone())],
        };

        if !self.config.review.post_review {
            return Ok(outcome);
        }

        let workflow = self.config.review.workflow.clone();
        let result = self
            .run_tool(&self.run_options(&workflow, None, formatted))
            .await?;

        self.post_findings(&ctx, &result).await?;
        self.finish(&mut outcome, &result, &workflow);
        Ok(outcome)
    }

    async fn handle_issue_comment(&self) -> takt_core::Result<Outcome> {
        if let Some(comment) = build_comment_context(self.event) {
            if !comment.is_mention {
                return Ok(Outcome::skipped(format!(
                    "Comment does not mention {}. Skipping.",
                    MENTION
                )));
            }

            info!(pr_number = comment.pr_number, "Processing mention on pull request");
            let Some(command) = self.run_command(&comment.comment_body) else {
                return Ok(self.unknown_subcommand(&comment.comment_body));
            };

            let ctx = build_pr_context(self.event, self.source, comment.pr_number).await?;
            let workflow = self.workflow_for(&command);
            let task = build_pr_task_content(&ctx, &command.instruction);
            let result = self
                .run_tool(&self.run_options(&workflow, Some(&command), task))
                .await?;

            post_issue_comment(
                self.publisher,
                &comment.owner,
                &comment.repo,
                comment.pr_number,
                &format_run_result(&result, &workflow),
            )
            .await?;
            self.post_findings(&ctx, &result).await?;

            let mut outcome = Outcome {
                status: Status::Completed,
                outputs: Vec::new(),
            };
            self.finish(&mut outcome, &result, &workflow);
            return Ok(outcome);
        }

        if let Some(issue) = build_issue_comment_context(self.event) {
            if !issue.is_mention {
                return Ok(Outcome::skipped(format!(
                    "Comment does not mention {}. Skipping.",
                    MENTION
                )));
            }

            info!(
                issue_number = issue.issue_number,
                title = %issue.issue_title,
                "Processing mention on issue"
            );
            let Some(command) = self.run_command(&issue.comment_body) else {
                return Ok(self.unknown_subcommand(&issue.comment_body));
            };

            let workflow = self.workflow_for(&command);
            let task = build_issue_task_content(&issue, &command.instruction);
            info!(
                workflow = %workflow,
                issue_number = issue.issue_number,
                "Running takt workflow"
            );
            let result = self
                .run_tool(&self.run_options(&workflow, Some(&command), task))
                .await?;

            post_issue_comment(
                self.publisher,
                &issue.owner,
                &issue.repo,
                issue.issue_number,
                &format_run_result(&result, &workflow),
            )
            .await?;

            let mut outcome = Outcome {
                status: Status::Completed,
                outputs: Vec::new(),
            };
            self.finish(&mut outcome, &result, &workflow);
            return Ok(outcome);
        }

        Ok(Outcome::skipped(
            "Could not build context from issue_comment event. Skipping.",
        ))
    }

    /// Check credentials, prepare the tool, then run it
    async fn run_tool(&self, options: &RunOptions) -> takt_core::Result<RunResult> {
        if options.anthropic_api_key.is_none() && options.openai_api_key.is_none() {
            return Err(Error::Config(
                "anthropic_api_key or openai_api_key is required to run takt".to_string(),
            ));
        }

        self.setup.prepare().await?;
        let result = self.runner.run(options).await?;
        info!(exit_code = result.exit_code, "takt exited");
        Ok(result)
    }

    fn run_command(&self, body: &str) -> Option<MentionCommand> {
        let command = parse_command(body);
        command.is_run().then_some(command)
    }

    fn unknown_subcommand(&self, body: &str) -> Outcome {
        let command = parse_command(body);
        Outcome::skipped(format!(
            "Unknown subcommand: \"{}\". Only \"run\" is supported.",
            command.subcommand_word()
        ))
    }

    fn workflow_for(&self, command: &MentionCommand) -> String {
        command
            .target
            .clone()
            .unwrap_or_else(|| self.config.defaults.workflow.clone())
    }

    fn run_options(&self, workflow: &str, command: Option<&MentionCommand>, task: String) -> RunOptions {
        let options = command.map(|c| &c.options);
        let pick = |from_command: Option<&str>, fallback: &Option<String>| {
            from_command
                .map(str::to_string)
                .or_else(|| fallback.clone())
        };

        RunOptions {
            workflow: Some(workflow.to_string()),
            task: Some(task),
            issue_number: None,
            repo: self.settings.auto_pr.then(|| self.event.full_name()),
            model: pick(options.and_then(|o| o.model()), &self.config.defaults.model),
            provider: pick(
                options.and_then(|o| o.provider()),
                &self.config.defaults.provider,
            ),
            auto_pr: self.settings.auto_pr,
            anthropic_api_key: self.settings.anthropic_api_key.clone(),
            openai_api_key: self.settings.openai_api_key.clone(),
            log_output: self.config.takt.log_output,
        }
    }

    async fn post_findings(&self, ctx: &PrContext, result: &RunResult) -> takt_core::Result<()> {
        let comments = parse_review_output(&result.stdout);
        info!(count = comments.len(), "Parsed review comments");
        post_review_comments(
            self.publisher,
            &ctx.owner,
            &ctx.repo,
            ctx.pr_number,
            &ctx.head_sha,
            &comments,
        )
        .await
    }

    fn finish(&self, outcome: &mut Outcome, result: &RunResult, workflow: &str) {
        outcome
            .outputs
            .push(("exit_code", result.exit_code.to_string()));
        if !result.success() {
            outcome.status = Status::Failed(format!(
                "takt workflow \"{}\" failed with exit code {}",
                workflow, result.exit_code
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use takt_core::{EventPayload, PrMetadata, ReviewComment};

    use super::*;

    struct StubSource;

    #[async_trait]
    impl PrSource for StubSource {
        async fn fetch_diff(&self, _: u64) -> takt_core::Result<String> {
            Ok("diff --git a/src/a.rs b/src/a.rs".to_string())
        }

        async fn fetch_changed_files(&self, _: u64) -> takt_core::Result<Vec<String>> {
            Ok(vec!["src/a.rs".to_string()])
        }

        async fn fetch_metadata(&self, _: u64) -> takt_core::Result<PrMetadata> {
            Ok(PrMetadata {
                title: "Add a".to_string(),
                body: String::new(),
                head_sha: "sha1".to_string(),
            })
        }
    }

    struct StubRunner {
        result: RunResult,
        calls: Mutex<Vec<RunOptions>>,
    }

    impl StubRunner {
        fn new(exit_code: i32, stdout: &str) -> Self {
            Self {
                result: RunResult {
                    exit_code,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<RunOptions> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ToolRunner for StubRunner {
        async fn run(&self, options: &RunOptions) -> takt_core::Result<RunResult> {
            self.calls.lock().unwrap().push(options.clone());
            Ok(self.result.clone())
        }
    }

    #[derive(Default)]
    struct StubSetup {
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubSetup {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolSetup for StubSetup {
        async fn prepare(&self) -> takt_core::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::CommandFailed {
                    program: "npm".to_string(),
                    code: 1,
                    stderr: "npm ERR! network".to_string(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubPublisher {
        comments: Mutex<Vec<(u64, String)>>,
        reviews: Mutex<Vec<(u64, String, Vec<ReviewComment>)>>,
    }

    #[async_trait]
    impl Publisher for StubPublisher {
        async fn create_issue_comment(
            &self,
            _: &str,
            _: &str,
            number: u64,
            body: &str,
        ) -> takt_core::Result<()> {
            self.comments
                .lock()
                .unwrap()
                .push((number, body.to_string()));
            Ok(())
        }

        async fn create_review(
            &self,
            _: &str,
            _: &str,
            pr_number: u64,
            commit_id: &str,
            comments: &[ReviewComment],
        ) -> takt_core::Result<()> {
            self.reviews
                .lock()
                .unwrap()
                .push((pr_number, commit_id.to_string(), comments.to_vec()));
            Ok(())
        }
    }

    fn event(name: &str, payload: &str) -> EventContext {
        let payload: EventPayload = serde_json::from_str(payload).unwrap();
        EventContext::new(name, "owner", "repo", payload)
    }

    fn settings() -> RunSettings {
        RunSettings {
            anthropic_api_key: Some("sk-ant".to_string()),
            ..Default::default()
        }
    }

    async fn handle_with(
        event: &EventContext,
        config: &Config,
        settings: &RunSettings,
        setup: &StubSetup,
        runner: &StubRunner,
        publisher: &StubPublisher,
    ) -> takt_core::Result<Outcome> {
        Handler {
            event,
            config,
            settings,
            source: &StubSource,
            setup,
            runner,
            publisher,
        }
        .handle()
        .await
    }

    async fn handle(
        event: &EventContext,
        config: &Config,
        runner: &StubRunner,
        publisher: &StubPublisher,
    ) -> Outcome {
        handle_with(event, config, &settings(), &StubSetup::default(), runner, publisher)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_pull_request_sets_context_output() {
        let ev = event("pull_request", r#"{"pull_request":{"number":4}}"#);
        let runner = StubRunner::new(0, "");
        let publisher = StubPublisher::default();

        let outcome = handle(&ev, &Config::default(), &runner, &publisher).await;

        assert_eq!(outcome.status, Status::Completed);
        assert_eq!(outcome.outputs.len(), 1);
        assert_eq!(outcome.outputs[0].0, "pr_context");
        assert!(outcome.outputs[0].1.starts_with("## PR #4: Add a\n"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_without_number_fails() {
        let ev = event("pull_request", "{}");
        let runner = StubRunner::new(0, "");
        let outcome = handle(&ev, &Config::default(), &runner, &StubPublisher::default()).await;
        assert!(matches!(outcome.status, Status::Failed(_)));
    }

    #[tokio::test]
    async fn test_pull_request_review_posts_findings() {
        let ev = event("pull_request", r#"{"pull_request":{"number":4}}"#);
        let mut config = Config::default();
        config.review.post_review = true;
        let runner = StubRunner::new(
            0,
            "<!-- takt-review -->\nsrc/a.rs:3: Missing check.\n<!-- /takt-review -->",
        );
        let publisher = StubPublisher::default();

        let outcome = handle(&ev, &config, &runner, &publisher).await;

        assert_eq!(outcome.status, Status::Completed);
        assert_eq!(runner.calls()[0].workflow.as_deref(), Some("review"));
        let reviews = publisher.reviews.lock().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].0, 4);
        assert_eq!(reviews[0].1, "sha1");
        assert_eq!(reviews[0].2[0].line, 3);
    }

    #[tokio::test]
    async fn test_issue_comment_runs_workflow_and_comments() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":9,"title":"Bug","body":"Broken"},
                "comment":{"id":1,"body":"@takt run fix --model opus please hurry"}}"#,
        );
        let runner = StubRunner::new(0, "All done");
        let publisher = StubPublisher::default();

        let outcome = handle(&ev, &Config::default(), &runner, &publisher).await;

        assert_eq!(outcome.status, Status::Completed);
        assert_eq!(outcome.outputs, vec![("exit_code", "0".to_string())]);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].workflow.as_deref(), Some("fix"));
        assert_eq!(calls[0].model.as_deref(), Some("opus"));
        assert_eq!(calls[0].anthropic_api_key.as_deref(), Some("sk-ant"));
        let task = calls[0].task.as_deref().unwrap();
        assert!(task.starts_with("## Issue #9: Bug\n\nBroken\n"));
        assert!(task.ends_with("please hurry\n"));

        let comments = publisher.comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, 9);
        assert!(comments[0].1.contains("**Workflow**: `fix`"));
        assert!(comments[0].1.contains("All done"));
    }

    #[tokio::test]
    async fn test_issue_comment_default_workflow_and_failure() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":9,"title":"Bug"},"comment":{"id":1,"body":"@takt run"}}"#,
        );
        let runner = StubRunner::new(2, "");
        let publisher = StubPublisher::default();

        let outcome = handle(&ev, &Config::default(), &runner, &publisher).await;

        assert_eq!(runner.calls()[0].workflow.as_deref(), Some("default"));
        assert!(matches!(outcome.status, Status::Failed(ref m) if m.contains("exit code 2")));
        assert_eq!(publisher.comments.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_comment_without_mention_is_skipped() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":9,"title":"Bug"},"comment":{"id":1,"body":"thanks!"}}"#,
        );
        let runner = StubRunner::new(0, "");
        let publisher = StubPublisher::default();

        let outcome = handle(&ev, &Config::default(), &runner, &publisher).await;

        assert!(matches!(outcome.status, Status::Skipped(_)));
        assert!(runner.calls().is_empty());
        assert!(publisher.comments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_subcommand_is_skipped() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":9,"title":"Bug"},"comment":{"id":1,"body":"@takt explain this"}}"#,
        );
        let runner = StubRunner::new(0, "");

        let outcome = handle(&ev, &Config::default(), &runner, &StubPublisher::default()).await;

        assert_eq!(
            outcome.status,
            Status::Skipped("Unknown subcommand: \"explain\". Only \"run\" is supported.".to_string())
        );
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pr_comment_runs_with_pr_context() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":4,"pull_request":{"url":"u"}},
                "comment":{"id":1,"body":"@takt run review focus on errors"}}"#,
        );
        let runner = StubRunner::new(
            0,
            "<!-- takt-review -->\nsrc/a.rs:1: Nit.\n<!-- /takt-review -->",
        );
        let publisher = StubPublisher::default();

        let outcome = handle(&ev, &Config::default(), &runner, &publisher).await;

        assert_eq!(outcome.status, Status::Completed);
        let task = runner.calls()[0].task.clone().unwrap();
        assert!(task.starts_with("## PR #4: Add a"));
        assert!(task.contains("focus on errors"));
        assert_eq!(publisher.comments.lock().unwrap()[0].0, 4);
        assert_eq!(publisher.reviews.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_event_fails() {
        let ev = event("push", "{}");
        let runner = StubRunner::new(0, "");
        let outcome = handle(&ev, &Config::default(), &runner, &StubPublisher::default()).await;
        assert_eq!(
            outcome.status,
            Status::Failed("Unsupported event type: push".to_string())
        );
    }

    #[tokio::test]
    async fn test_comment_without_mention_skips_setup() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":9,"title":"Bug"},"comment":{"id":1,"body":"thanks!"}}"#,
        );
        let setup = StubSetup::failing();
        let runner = StubRunner::new(0, "");

        let outcome = handle_with(
            &ev,
            &Config::default(),
            &settings(),
            &setup,
            &runner,
            &StubPublisher::default(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome.status, Status::Skipped(_)));
        assert_eq!(setup.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_subcommand_skips_setup() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":4,"pull_request":{}},"comment":{"id":1,"body":"@takt help"}}"#,
        );
        let setup = StubSetup::failing();
        let runner = StubRunner::new(0, "");

        let outcome = handle_with(
            &ev,
            &Config::default(),
            &settings(),
            &setup,
            &runner,
            &StubPublisher::default(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome.status, Status::Skipped(_)));
        assert_eq!(setup.calls(), 0);
    }

    #[tokio::test]
    async fn test_setup_failure_stops_run() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":9,"title":"Bug"},"comment":{"id":1,"body":"@takt run"}}"#,
        );
        let setup = StubSetup::failing();
        let runner = StubRunner::new(0, "");
        let publisher = StubPublisher::default();

        let err = handle_with(&ev, &Config::default(), &settings(), &setup, &runner, &publisher)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(setup.calls(), 1);
        assert!(runner.calls().is_empty());
        assert!(publisher.comments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_requires_api_key() {
        let ev = event(
            "issue_comment",
            r#"{"issue":{"number":9,"title":"Bug"},"comment":{"id":1,"body":"@takt run"}}"#,
        );
        let setup = StubSetup::default();
        let runner = StubRunner::new(0, "");

        let err = handle_with(
            &ev,
            &Config::default(),
            &RunSettings::default(),
            &setup,
            &runner,
            &StubPublisher::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert_eq!(setup.calls(), 0);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pull_request_without_review_needs_no_setup() {
        let ev = event("pull_request", r#"{"pull_request":{"number":4}}"#);
        let setup = StubSetup::failing();
        let runner = StubRunner::new(0, "");

        let outcome = handle_with(
            &ev,
            &Config::default(),
            &RunSettings::default(),
            &setup,
            &runner,
            &StubPublisher::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.status, Status::Completed);
        assert_eq!(setup.calls(), 0);
    }
}
