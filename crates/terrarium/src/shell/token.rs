//! Token types for the command-line lexer.

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word (command name, argument, flag, path).
    Word(String),

    /// A quoted string (single or double quotes, taken literally).
    Str(String),

    /// Pipe (|)
    Pipe,

    /// Redirect output (>)
    RedirectOut,

    /// Redirect output append (>>)
    RedirectAppend,

    /// Run in background (&)
    Background,

    /// End of input marker; always the final token.
    Eoi,
}

impl Token {
    /// Short rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("word '{w}'"),
            Token::Str(_) => "quoted string".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::RedirectOut => "'>'".to_string(),
            Token::RedirectAppend => "'>>'".to_string(),
            Token::Background => "'&'".to_string(),
            Token::Eoi => "end of input".to_string(),
        }
    }
}
