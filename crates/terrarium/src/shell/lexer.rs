//! Lexer for submitted command lines.
//!
//! Splits one line into words, quoted strings, and the four operators,
//! and always terminates the stream with [`Token::Eoi`]. Quoting is
//! flat: single and double quotes behave identically, nothing nests,
//! and there is no escape character. Control characters are rejected
//! outside quotes; inside quotes they pass through literally.

use super::token::Token;
use crate::error::{Error, Result};

/// Lexer over one input line.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    /// 1-based column of the next unread character.
    column: usize,
}

/// Tokenize a whole line.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).tokenize()
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            column: 1,
        }
    }

    /// Consume the input and produce the full token stream.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek_char() else {
                tokens.push(Token::Eoi);
                return Ok(tokens);
            };
            let token = match ch {
                '|' => {
                    self.advance();
                    Token::Pipe
                }
                '>' => {
                    self.advance();
                    if self.peek_char() == Some('>') {
                        self.advance();
                        Token::RedirectAppend
                    } else {
                        Token::RedirectOut
                    }
                }
                '&' => {
                    self.advance();
                    Token::Background
                }
                '\'' | '"' => self.read_quoted(ch)?,
                c if c.is_control() => {
                    return Err(Error::Lex(format!(
                        "unexpected control character at column {}",
                        self.column
                    )));
                }
                _ => self.read_word(),
            };
            tokens.push(token);
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch.is_some() {
            self.column += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    /// Read a quoted string. The opening quote has not been consumed
    /// yet; the closing quote must match it.
    fn read_quoted(&mut self, quote: char) -> Result<Token> {
        let start = self.column;
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => return Ok(Token::Str(value)),
                Some(c) => value.push(c),
                None => {
                    return Err(Error::Lex(format!(
                        "unterminated string starting at column {start}"
                    )));
                }
            }
        }
    }

    /// Read a bare word: everything up to whitespace, an operator, a
    /// quote, or a control character.
    fn read_word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek_char() {
            if c == ' ' || c == '\t' || matches!(c, '|' | '>' | '&' | '\'' | '"') || c.is_control()
            {
                break;
            }
            word.push(c);
            self.advance();
        }
        Token::Word(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Word(w) | Token::Str(w) => Some(w.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn splits_words_on_whitespace() {
        let tokens = tokenize("echo  hello\tworld").unwrap();
        assert_eq!(words(&tokens), vec!["echo", "hello", "world"]);
        assert_eq!(tokens.last(), Some(&Token::Eoi));
    }

    #[test]
    fn empty_input_is_just_eoi() {
        assert_eq!(tokenize("").unwrap(), vec![Token::Eoi]);
        assert_eq!(tokenize("   \t ").unwrap(), vec![Token::Eoi]);
    }

    #[test]
    fn operators_need_no_surrounding_space() {
        let tokens = tokenize("a|b>c").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("a".into()),
                Token::Pipe,
                Token::Word("b".into()),
                Token::RedirectOut,
                Token::Word("c".into()),
                Token::Eoi,
            ]
        );
    }

    #[test]
    fn append_operator_wins_over_two_redirects() {
        let tokens = tokenize("x >> y").unwrap();
        assert!(tokens.contains(&Token::RedirectAppend));
        assert!(!tokens.contains(&Token::RedirectOut));
    }

    #[test]
    fn quotes_preserve_spaces_and_operators() {
        let tokens = tokenize("echo 'a | b' \"c > d\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("echo".into()),
                Token::Str("a | b".into()),
                Token::Str("c > d".into()),
                Token::Eoi,
            ]
        );
    }

    #[test]
    fn quote_types_do_not_nest_across_each_other() {
        let tokens = tokenize(r#"echo 'he said "hi"'"#).unwrap();
        assert_eq!(tokens[1], Token::Str(r#"he said "hi""#.into()));
        let tokens = tokenize(r#"echo "it's""#).unwrap();
        assert_eq!(tokens[1], Token::Str("it's".into()));
    }

    #[test]
    fn unterminated_quote_is_a_lex_error() {
        let err = tokenize("echo 'oops").unwrap_err();
        assert!(matches!(err, Error::Lex(_)));
        assert!(err.to_string().contains("unterminated"));
        assert!(tokenize("echo \"oops").is_err());
    }

    #[test]
    fn control_characters_error_outside_quotes() {
        assert!(matches!(tokenize("echo a\u{1}b"), Err(Error::Lex(_))));
        assert!(matches!(tokenize("echo hi\n"), Err(Error::Lex(_))));
        // Inside quotes they are data.
        let tokens = tokenize("echo 'a\nb'").unwrap();
        assert_eq!(tokens[1], Token::Str("a\nb".into()));
    }

    #[test]
    fn background_marker_is_a_token() {
        let tokens = tokenize("delay 100 &").unwrap();
        assert_eq!(tokens[tokens.len() - 2], Token::Background);
    }
}
