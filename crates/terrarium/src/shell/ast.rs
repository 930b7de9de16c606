//! AST for submitted command lines.

/// One command plus its arguments, as written.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub args: Vec<String>,
}

/// Where a pipeline's final output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Overwrite,
    Append,
}

/// Trailing output redirection.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub mode: RedirectMode,
    pub target: String,
}

/// One parsed line: segments joined by pipes, an optional trailing
/// redirect, and an optional background marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub segments: Vec<Segment>,
    pub redirect: Option<Redirect>,
    pub background: bool,
}
