//! Text filters: `cat`, `head`, `tail`, `grep`, `wc`.
//!
//! All of them read named files when paths were given and fall back to
//! piped input otherwise, so they compose on either side of a pipe.

use async_trait::async_trait;
use regex::RegexBuilder;

use crate::error::{Error, Result};
use crate::exec::{
    ArgCount, CommandAction, CommandSpec, ExecOutcome, FlagSpec, Invocation, PathSpec,
};
use crate::vfs::Access;

use super::Command;

const DEFAULT_HEAD_LINES: usize = 10;

/// Named files concatenated, or piped input when no paths were given.
fn gather_input(invocation: &Invocation, name: &'static str) -> Result<String> {
    if invocation.paths.is_empty() {
        return match &invocation.stdin {
            Some(stdin) => Ok(stdin.clone()),
            None => Err(Error::validation(name, "missing operand")),
        };
    }
    let mut text = String::new();
    for path in &invocation.paths {
        text.push_str(&invocation.vfs().read_file(&path.abs, &invocation.user)?);
    }
    Ok(text)
}

fn line_count_flag(invocation: &Invocation, name: &'static str) -> Result<usize> {
    match invocation.flag_value("lines") {
        None => Ok(DEFAULT_HEAD_LINES),
        Some(value) => value
            .parse()
            .map_err(|_| Error::validation(name, format!("invalid line count: {value}"))),
    }
}

fn join_lines(lines: &[&str]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

static CAT_SPEC: CommandSpec = CommandSpec {
    name: "cat",
    summary: "concatenate files to output",
    usage: "cat [FILE...]",
    flags: &[],
    args: ArgCount::Any,
    paths: &[PathSpec::existing_file(0, &[Access::Read]).rest()],
};

/// `cat` - file contents, or piped input, verbatim.
pub struct Cat;

#[async_trait]
impl Command for Cat {
    fn spec(&self) -> &'static CommandSpec {
        &CAT_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let text = gather_input(&invocation, "cat")?;
        Ok(CommandAction::done(ExecOutcome::ok(text)))
    }
}

static HEAD_SPEC: CommandSpec = CommandSpec {
    name: "head",
    summary: "first lines of a file or input",
    usage: "head [-n COUNT] [FILE]",
    flags: &[FlagSpec {
        long: "lines",
        short: Some('n'),
        takes_value: true,
    }],
    args: ArgCount::Between(0, 1),
    paths: &[PathSpec::existing_file(0, &[Access::Read]).optional()],
};

/// `head` - keeps the first `-n` lines (default 10).
pub struct Head;

#[async_trait]
impl Command for Head {
    fn spec(&self) -> &'static CommandSpec {
        &HEAD_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let count = line_count_flag(&invocation, "head")?;
        let text = gather_input(&invocation, "head")?;
        let kept: Vec<&str> = text.lines().take(count).collect();
        Ok(CommandAction::done(ExecOutcome::ok(join_lines(&kept))))
    }
}

static TAIL_SPEC: CommandSpec = CommandSpec {
    name: "tail",
    summary: "last lines of a file or input",
    usage: "tail [-n COUNT] [FILE]",
    flags: &[FlagSpec {
        long: "lines",
        short: Some('n'),
        takes_value: true,
    }],
    args: ArgCount::Between(0, 1),
    paths: &[PathSpec::existing_file(0, &[Access::Read]).optional()],
};

/// `tail` - keeps the last `-n` lines (default 10).
pub struct Tail;

#[async_trait]
impl Command for Tail {
    fn spec(&self) -> &'static CommandSpec {
        &TAIL_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let count = line_count_flag(&invocation, "tail")?;
        let text = gather_input(&invocation, "tail")?;
        let all: Vec<&str> = text.lines().collect();
        let kept = &all[all.len().saturating_sub(count)..];
        Ok(CommandAction::done(ExecOutcome::ok(join_lines(kept))))
    }
}

static GREP_SPEC: CommandSpec = CommandSpec {
    name: "grep",
    summary: "print lines matching a pattern",
    usage: "grep [-i] [-n] PATTERN [FILE...]",
    flags: &[
        FlagSpec {
            long: "ignore-case",
            short: Some('i'),
            takes_value: false,
        },
        FlagSpec {
            long: "line-number",
            short: Some('n'),
            takes_value: false,
        },
    ],
    args: ArgCount::AtLeast(1),
    paths: &[PathSpec::existing_file(1, &[Access::Read]).rest()],
};

/// `grep` - regex match per line; files are labeled when more than one
/// is searched.
pub struct Grep;

#[async_trait]
impl Command for Grep {
    fn spec(&self) -> &'static CommandSpec {
        &GREP_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let pattern = &invocation.args[0];
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(invocation.has_flag("ignore-case"))
            .build()
            .map_err(|_| Error::validation("grep", format!("invalid pattern: {pattern}")))?;
        let number = invocation.has_flag("line-number");
        let label_files = invocation.paths.len() > 1;

        let mut matched = Vec::new();
        let mut search = |label: Option<&str>, text: &str| {
            for (index, line) in text.lines().enumerate() {
                if !regex.is_match(line) {
                    continue;
                }
                let mut rendered = String::new();
                if let Some(label) = label {
                    rendered.push_str(label);
                    rendered.push(':');
                }
                if number {
                    rendered.push_str(&(index + 1).to_string());
                    rendered.push(':');
                }
                rendered.push_str(line);
                matched.push(rendered);
            }
        };

        if invocation.paths.is_empty() {
            let stdin = invocation
                .stdin
                .as_deref()
                .ok_or_else(|| Error::validation("grep", "missing operand"))?;
            search(None, stdin);
        } else {
            for path in &invocation.paths {
                let text = invocation.vfs().read_file(&path.abs, &invocation.user)?;
                let label = label_files.then_some(path.raw.as_str());
                search(label, &text);
            }
        }

        let lines: Vec<&str> = matched.iter().map(String::as_str).collect();
        Ok(CommandAction::done(ExecOutcome::ok(join_lines(&lines))))
    }
}

static WC_SPEC: CommandSpec = CommandSpec {
    name: "wc",
    summary: "count lines, words, and bytes",
    usage: "wc [-l] [-w] [-c] [FILE...]",
    flags: &[
        FlagSpec {
            long: "lines",
            short: Some('l'),
            takes_value: false,
        },
        FlagSpec {
            long: "words",
            short: Some('w'),
            takes_value: false,
        },
        FlagSpec {
            long: "bytes",
            short: Some('c'),
            takes_value: false,
        },
    ],
    args: ArgCount::Any,
    paths: &[PathSpec::existing_file(0, &[Access::Read]).rest()],
};

struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

fn count_text(text: &str) -> Counts {
    Counts {
        lines: text.matches('\n').count(),
        words: text.split_whitespace().count(),
        bytes: text.len(),
    }
}

/// `wc` - per-file counts plus a total when more than one file.
pub struct Wc;

#[async_trait]
impl Command for Wc {
    fn spec(&self) -> &'static CommandSpec {
        &WC_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let mut show_lines = invocation.has_flag("lines");
        let mut show_words = invocation.has_flag("words");
        let mut show_bytes = invocation.has_flag("bytes");
        if !show_lines && !show_words && !show_bytes {
            show_lines = true;
            show_words = true;
            show_bytes = true;
        }
        let render = |counts: &Counts, label: Option<&str>| {
            let mut row = String::new();
            if show_lines {
                row.push_str(&format!("{:>8}", counts.lines));
            }
            if show_words {
                row.push_str(&format!("{:>8}", counts.words));
            }
            if show_bytes {
                row.push_str(&format!("{:>8}", counts.bytes));
            }
            if let Some(label) = label {
                row.push(' ');
                row.push_str(label);
            }
            row.push('\n');
            row
        };

        if invocation.paths.is_empty() {
            let stdin = invocation
                .stdin
                .as_deref()
                .ok_or_else(|| Error::validation("wc", "missing operand"))?;
            let counts = count_text(stdin);
            return Ok(CommandAction::done(ExecOutcome::ok(render(&counts, None))));
        }

        let mut output = String::new();
        let mut total = Counts {
            lines: 0,
            words: 0,
            bytes: 0,
        };
        for path in &invocation.paths {
            let text = invocation.vfs().read_file(&path.abs, &invocation.user)?;
            let counts = count_text(&text);
            total.lines += counts.lines;
            total.words += counts.words;
            total.bytes += counts.bytes;
            output.push_str(&render(&counts, Some(path.raw.as_str())));
        }
        if invocation.paths.len() > 1 {
            output.push_str(&render(&total, Some("total")));
        }
        Ok(CommandAction::done(ExecOutcome::ok(output)))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::{run_err, run_ok, sandbox};

    #[tokio::test]
    async fn cat_reads_files_and_pipes() {
        let exec = sandbox();
        run_ok(&exec, "echo alpha > notes.txt").await;
        assert_eq!(run_ok(&exec, "cat notes.txt").await, "alpha\n");
        assert_eq!(run_ok(&exec, "echo beta | cat").await, "beta\n");
    }

    #[tokio::test]
    async fn cat_missing_file_is_scoped() {
        let exec = sandbox();
        assert_eq!(
            run_err(&exec, "cat absent.txt").await,
            "cat: no such file or directory: absent.txt"
        );
    }

    #[tokio::test]
    async fn head_and_tail_slice_lines() {
        let exec = sandbox();
        run_ok(&exec, "echo one > lines.txt").await;
        run_ok(&exec, "echo two >> lines.txt").await;
        run_ok(&exec, "echo three >> lines.txt").await;
        assert_eq!(run_ok(&exec, "head -n 2 lines.txt").await, "one\ntwo\n");
        assert_eq!(run_ok(&exec, "tail -n 2 lines.txt").await, "two\nthree\n");
        assert_eq!(run_ok(&exec, "head lines.txt").await, "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn head_rejects_a_bad_count() {
        let exec = sandbox();
        assert_eq!(
            run_err(&exec, "head -n many").await,
            "head: invalid line count: many"
        );
    }

    #[tokio::test]
    async fn grep_matches_with_flags() {
        let exec = sandbox();
        run_ok(&exec, "echo Apple > fruit.txt").await;
        run_ok(&exec, "echo banana >> fruit.txt").await;
        run_ok(&exec, "echo cherry >> fruit.txt").await;
        assert_eq!(run_ok(&exec, "grep an fruit.txt").await, "banana\n");
        assert_eq!(run_ok(&exec, "grep -i apple fruit.txt").await, "Apple\n");
        assert_eq!(run_ok(&exec, "grep -n err fruit.txt").await, "3:cherry\n");
        assert_eq!(run_ok(&exec, "cat fruit.txt | grep ban").await, "banana\n");
    }

    #[tokio::test]
    async fn grep_rejects_a_bad_pattern() {
        let exec = sandbox();
        assert_eq!(
            run_err(&exec, "echo x | grep (").await,
            "grep: invalid pattern: ("
        );
    }

    #[tokio::test]
    async fn wc_counts_lines_words_bytes() {
        let exec = sandbox();
        run_ok(&exec, "echo one two > counted.txt").await;
        assert_eq!(
            run_ok(&exec, "wc counted.txt").await,
            "       1       2       8 counted.txt\n"
        );
        assert_eq!(run_ok(&exec, "echo hi | wc -c").await, "       3\n");
        assert_eq!(run_ok(&exec, "echo -n hi | wc -c").await, "       2\n");
    }
}
