//! Command-line front end: lexer, token types, AST, parser.
//!
//! Implements a recursive descent parser over the token stream. The
//! grammar is one pipeline per line:
//!
//! ```text
//! line     := pipeline? EOI
//! pipeline := segment ('|' segment)* redirect? '&'?
//! segment  := WORD (WORD | STR)*
//! redirect := ('>' | '>>') (WORD | STR)
//! ```

mod ast;
mod lexer;
mod token;

pub use ast::{Pipeline, Redirect, RedirectMode, Segment};
pub use lexer::{tokenize, Lexer};
pub use token::Token;

use crate::error::{Error, Result};

/// Parse one submitted line into pipelines. Empty input parses to an
/// empty list, which executes as a successful no-op.
pub fn parse_line(input: &str) -> Result<Vec<Pipeline>> {
    Parser::new(tokenize(input)?).parse()
}

/// Parser over a lexed token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the stream. At most one pipeline per line; the list shape
    /// keeps empty input trivially representable.
    pub fn parse(mut self) -> Result<Vec<Pipeline>> {
        let mut pipelines = Vec::new();
        if matches!(self.peek(), Token::Eoi) {
            return Ok(pipelines);
        }
        pipelines.push(self.parse_pipeline()?);
        match self.peek() {
            Token::Eoi => Ok(pipelines),
            other => Err(Error::Parse(format!("unexpected {}", other.describe()))),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eoi)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eoi);
        self.pos += 1;
        token
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline> {
        let mut segments = vec![self.parse_segment()?];
        while matches!(self.peek(), Token::Pipe) {
            self.advance();
            segments.push(self.parse_segment()?);
        }

        let redirect = match self.peek() {
            Token::RedirectOut => Some(self.parse_redirect(RedirectMode::Overwrite)?),
            Token::RedirectAppend => Some(self.parse_redirect(RedirectMode::Append)?),
            _ => None,
        };

        let background = if matches!(self.peek(), Token::Background) {
            self.advance();
            true
        } else {
            false
        };

        Ok(Pipeline {
            segments,
            redirect,
            background,
        })
    }

    fn parse_redirect(&mut self, mode: RedirectMode) -> Result<Redirect> {
        self.advance();
        match self.advance() {
            Token::Word(target) | Token::Str(target) => Ok(Redirect { mode, target }),
            other => Err(Error::Parse(format!(
                "expected a path after redirection, found {}",
                other.describe()
            ))),
        }
    }

    fn parse_segment(&mut self) -> Result<Segment> {
        let name = match self.advance() {
            Token::Word(name) => name,
            Token::Str(_) => {
                return Err(Error::Parse(
                    "command name must be a bare word".to_string(),
                ));
            }
            other => {
                return Err(Error::Parse(format!(
                    "expected a command, found {}",
                    other.describe()
                )));
            }
        };
        let mut args = Vec::new();
        loop {
            match self.peek() {
                Token::Word(w) => {
                    args.push(w.clone());
                    self.advance();
                }
                Token::Str(s) => {
                    args.push(s.clone());
                    self.advance();
                }
                _ => break,
            }
        }
        Ok(Segment { name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Vec<Pipeline>> {
        parse_line(input)
    }

    #[test]
    fn single_command_with_args() {
        let pipelines = parse("echo hello world").unwrap();
        assert_eq!(pipelines.len(), 1);
        let p = &pipelines[0];
        assert_eq!(p.segments.len(), 1);
        assert_eq!(p.segments[0].name, "echo");
        assert_eq!(p.segments[0].args, vec!["hello", "world"]);
        assert!(p.redirect.is_none());
        assert!(!p.background);
    }

    #[test]
    fn empty_input_parses_to_no_pipelines() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   ").unwrap().is_empty());
    }

    #[test]
    fn pipes_chain_segments() {
        let pipelines = parse("cat notes | grep x | wc -l").unwrap();
        let p = &pipelines[0];
        assert_eq!(p.segments.len(), 3);
        assert_eq!(p.segments[1].name, "grep");
        assert_eq!(p.segments[2].args, vec!["-l"]);
    }

    #[test]
    fn quoted_strings_become_arguments() {
        let pipelines = parse(r#"echo "two words" 'and more'"#).unwrap();
        assert_eq!(
            pipelines[0].segments[0].args,
            vec!["two words", "and more"]
        );
    }

    #[test]
    fn redirect_then_background() {
        let pipelines = parse("echo hi > out.txt &").unwrap();
        let p = &pipelines[0];
        assert_eq!(
            p.redirect,
            Some(Redirect {
                mode: RedirectMode::Overwrite,
                target: "out.txt".into()
            })
        );
        assert!(p.background);
    }

    #[test]
    fn append_redirect_mode() {
        let pipelines = parse("echo hi >> log").unwrap();
        assert_eq!(pipelines[0].redirect.as_ref().unwrap().mode, RedirectMode::Append);
    }

    #[test]
    fn quoted_redirect_target_is_accepted() {
        let pipelines = parse(r#"echo hi > "a file""#).unwrap();
        assert_eq!(pipelines[0].redirect.as_ref().unwrap().target, "a file");
    }

    #[test]
    fn command_name_cannot_be_quoted() {
        let err = parse(r#""echo" hi"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn missing_redirect_target_is_a_parse_error() {
        let err = parse("echo hi >").unwrap_err();
        assert!(err.to_string().contains("path after redirection"));
        assert!(parse("echo hi > | cat").is_err());
    }

    #[test]
    fn dangling_pipe_is_a_parse_error() {
        assert!(parse("echo hi |").is_err());
        assert!(parse("| cat").is_err());
    }

    #[test]
    fn tokens_after_background_are_rejected() {
        let err = parse("delay 10 & echo no").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("unexpected"));
    }

    #[test]
    fn second_redirect_is_rejected() {
        assert!(parse("echo hi > a > b").is_err());
    }
}
