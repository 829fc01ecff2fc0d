//! Parse command - Show how a mention comment is interpreted

use clap::Args;
use takt_core::{is_mention, parse_command};

/// Arguments for the parse command
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Comment body, e.g. "@takt run review --model opus check errors"
    #[arg(required = true)]
    pub comment: String,
}

impl ParseArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        println!("{}", self.render());
        Ok(())
    }

    fn render(&self) -> String {
        let command = parse_command(&self.comment);
        let mut lines = vec![
            format!("mention: {}", is_mention(&self.comment)),
            format!("kind: {:?}", command.kind),
            format!("target: {}", command.target.as_deref().unwrap_or("(default)")),
        ];

        if command.options.is_empty() {
            lines.push("options: (none)".to_string());
        } else {
            lines.push("options:".to_string());
            lines.extend(command.options.iter().map(|(k, v)| format!("  {}: {}", k, v)));
        }

        lines.push(format!("instruction: {}", command.instruction));
        lines.join("\n")
    }
}
