//! Output and terminal commands: `help`, `echo`, `history`, `clear`.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::exec::{ArgCount, CommandAction, CommandSpec, ExecOutcome, FlagSpec, Invocation};

use super::Command;

static HELP_SPEC: CommandSpec = CommandSpec {
    name: "help",
    summary: "list commands or show one command's usage",
    usage: "help [COMMAND]",
    flags: &[],
    args: ArgCount::Between(0, 1),
    paths: &[],
};

/// `help` - command listing and per-command usage.
pub struct Help;

#[async_trait]
impl Command for Help {
    fn spec(&self) -> &'static CommandSpec {
        &HELP_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let registry = invocation.exec.registry();
        if let Some(name) = invocation.args.first() {
            let Some(spec) = registry.specs().find(|spec| spec.name == name.as_str()) else {
                return Err(Error::validation("help", format!("no such command: {name}")));
            };
            return Ok(CommandAction::done(ExecOutcome::ok(format!(
                "{}\n    {}\n",
                spec.usage, spec.summary
            ))));
        }
        let width = registry
            .specs()
            .map(|spec| spec.name.len())
            .max()
            .unwrap_or(0);
        let mut listing = String::new();
        for spec in registry.specs() {
            listing.push_str(&format!("{:<width$}  {}\n", spec.name, spec.summary));
        }
        Ok(CommandAction::done(ExecOutcome::ok(listing)))
    }
}

static ECHO_SPEC: CommandSpec = CommandSpec {
    name: "echo",
    summary: "write arguments to output",
    usage: "echo [-n] [TEXT...]",
    flags: &[FlagSpec {
        long: "no-newline",
        short: Some('n'),
        takes_value: false,
    }],
    args: ArgCount::Any,
    paths: &[],
};

/// `echo` - prints its arguments joined by single spaces.
pub struct Echo;

#[async_trait]
impl Command for Echo {
    fn spec(&self) -> &'static CommandSpec {
        &ECHO_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let text = invocation.args.join(" ");
        let output = if invocation.has_flag("no-newline") {
            text
        } else {
            format!("{text}\n")
        };
        Ok(CommandAction::done(ExecOutcome::ok(output)))
    }
}

static HISTORY_SPEC: CommandSpec = CommandSpec {
    name: "history",
    summary: "show previously submitted lines",
    usage: "history",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `history` - numbered list of recorded input lines, oldest first.
pub struct History;

#[async_trait]
impl Command for History {
    fn spec(&self) -> &'static CommandSpec {
        &HISTORY_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let mut listing = String::new();
        for (index, line) in invocation.world().history_lines().iter().enumerate() {
            listing.push_str(&format!("{:>5}  {}\n", index + 1, line));
        }
        Ok(CommandAction::done(ExecOutcome::ok(listing)))
    }
}

static CLEAR_SPEC: CommandSpec = CommandSpec {
    name: "clear",
    summary: "erase the terminal contents",
    usage: "clear",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `clear` - wipes the transcript and tells the caller to clear.
pub struct Clear;

#[async_trait]
impl Command for Clear {
    fn spec(&self) -> &'static CommandSpec {
        &CLEAR_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        invocation.world().screen_clear();
        Ok(CommandAction::done(ExecOutcome::cleared()))
    }
}
