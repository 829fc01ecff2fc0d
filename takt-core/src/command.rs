//! Command grammar for `@takt` mention comments
//!
//! ```text
//! @takt run [<workflow>] [--<key> <value>]... [<instruction>...]
//! @takt <anything else>
//! ```
//!
//! Parsing is total: malformed flags degrade into instruction text instead of
//! producing an error.

use lazy_static::lazy_static;
use regex::Regex;

use crate::mention::MENTION_RE;

lazy_static! {
    static ref RUN_RE: Regex = Regex::new(r"(?i)^run(?-u:\b)").expect("run subcommand regex");
}

const FLAG_PREFIX: &str = "--";

/// Recognized subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Run,
    Unknown,
}

/// Option keys with a defined meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownOption {
    Workflow,
    Model,
    Provider,
}

impl KnownOption {
    pub const ALL: [KnownOption; 3] = [Self::Workflow, Self::Model, Self::Provider];

    pub fn key(self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Model => "model",
            Self::Provider => "provider",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }
}

/// Flag options in order of first appearance
///
/// Keys are unique; inserting an existing key replaces its value but keeps
/// its position. Keys outside [`KnownOption`] are carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    entries: Vec<(String, String)>,
}

impl CommandOptions {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn known(&self, option: KnownOption) -> Option<&str> {
        self.get(option.key()).filter(|v| !v.is_empty())
    }

    pub fn workflow(&self) -> Option<&str> {
        self.known(KnownOption::Workflow)
    }

    pub fn model(&self) -> Option<&str> {
        self.known(KnownOption::Model)
    }

    pub fn provider(&self) -> Option<&str> {
        self.known(KnownOption::Provider)
    }

    /// Options without a defined meaning, in order of appearance
    pub fn extra(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| KnownOption::from_key(k).is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Structured form of a mention comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionCommand {
    pub kind: CommandKind,
    /// Workflow to execute; `--workflow` wins over the positional name
    pub target: Option<String>,
    pub options: CommandOptions,
    /// Free text after the parsed part, trimmed
    pub instruction: String,
}

impl MentionCommand {
    fn unknown(instruction: String) -> Self {
        Self {
            kind: CommandKind::Unknown,
            target: None,
            options: CommandOptions::default(),
            instruction,
        }
    }

    pub fn is_run(&self) -> bool {
        self.kind == CommandKind::Run
    }

    /// The first word of the comment, for "unknown subcommand" messages
    pub fn subcommand_word(&self) -> &str {
        match self.kind {
            CommandKind::Run => "run",
            CommandKind::Unknown => self.instruction.split_whitespace().next().unwrap_or(""),
        }
    }
}

/// Parse a mention comment into a [`MentionCommand`]
pub fn parse_command(body: &str) -> MentionCommand {
    let stripped = MENTION_RE.replace(body, "");
    let stripped = stripped.trim();

    let Some(run) = RUN_RE.find(stripped) else {
        return MentionCommand::unknown(stripped.to_string());
    };

    let tokens: Vec<&str> = stripped[run.end()..].split_whitespace().collect();

    let mut options = CommandOptions::default();
    let mut positional = None;
    let mut instruction = String::new();
    let mut idx = 0;

    if let Some(first) = tokens.first() {
        if !first.starts_with(FLAG_PREFIX) {
            positional = Some(first.to_string());
            idx = 1;
        }
    }

    while idx < tokens.len() {
        let token = tokens[idx];
        let Some(key) = token.strip_prefix(FLAG_PREFIX) else {
            instruction = tokens[idx..].join(" ");
            break;
        };

        let key = key.to_lowercase();
        if key.is_empty() {
            idx += 1;
            continue;
        }

        match tokens.get(idx + 1) {
            Some(value) if !value.starts_with(FLAG_PREFIX) => {
                options.insert(key, *value);
                idx += 2;
            }
            // A flag without a value ends option parsing
            _ => {
                instruction = tokens[idx..].join(" ");
                break;
            }
        }
    }

    let target = options.workflow().map(str::to_string).or(positional);

    MentionCommand {
        kind: CommandKind::Run,
        target,
        options,
        instruction: instruction.trim().to_string(),
    }
}
