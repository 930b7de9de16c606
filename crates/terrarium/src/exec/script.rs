//! Script preprocessing and the single-script guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cut a line at the first `#` that sits outside quotes. A leading
/// shebang is just a comment to us.
pub(crate) fn strip_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    for (at, ch) in line.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => return &line[..at],
            _ => {}
        }
    }
    line
}

/// Replace `$1`..`$N`, `$@`, and `$#` with the invocation arguments.
/// Purely textual, before lexing; `$` without a recognized suffix is
/// left alone, and positionals past the end become empty.
pub(crate) fn substitute_args(line: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('@') => {
                chars.next();
                out.push_str(&args.join(" "));
            }
            Some('#') => {
                chars.next();
                out.push_str(&args.len().to_string());
            }
            Some(d) if d.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(*d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // $1 is the first argument; $0 and out-of-range
                // positionals expand to nothing.
                if let Ok(n) = digits.parse::<usize>() {
                    if n >= 1 {
                        if let Some(arg) = args.get(n - 1) {
                            out.push_str(arg);
                        }
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

/// Holds the one-script-at-a-time flag; dropping releases it on every
/// exit path, including early errors.
pub(crate) struct ScriptGuard {
    flag: Arc<AtomicBool>,
}

impl ScriptGuard {
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<ScriptGuard> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ScriptGuard {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for ScriptGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_cut_outside_quotes() {
        assert_eq!(strip_comment("echo hi # trailing"), "echo hi ");
        assert_eq!(strip_comment("echo \"a # b\""), "echo \"a # b\"");
        assert_eq!(strip_comment("echo 'a # b' # real"), "echo 'a # b' ");
        assert_eq!(strip_comment("#!/bin/run"), "");
    }

    #[test]
    fn positionals_substitute_textually() {
        let args = vec!["one".to_string(), "two words".to_string()];
        assert_eq!(substitute_args("echo $1", &args), "echo one");
        assert_eq!(substitute_args("echo \"$2\"", &args), "echo \"two words\"");
        assert_eq!(substitute_args("echo $@ ($#)", &args), "echo one two words (2)");
        assert_eq!(substitute_args("echo $5", &args), "echo ");
        assert_eq!(substitute_args("cost: 5$", &args), "cost: 5$");
        assert_eq!(substitute_args("echo $0", &args), "echo ");
    }

    #[test]
    fn guard_admits_one_holder() {
        let flag = Arc::new(AtomicBool::new(false));
        let first = ScriptGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(ScriptGuard::acquire(&flag).is_none());
        drop(first);
        assert!(ScriptGuard::acquire(&flag).is_some());
    }
}
