//! Permission bits for tree nodes.
//!
//! A mode is one integer whose two octal digits are (owner, other).
//! There is no group class; listings render the middle triplet as
//! dashes so the familiar nine-character layout survives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access kinds checked against a node's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Execute,
}

impl Access {
    /// Bit within a single rwx triplet.
    fn bit(self) -> u8 {
        match self {
            Access::Read => 0o4,
            Access::Write => 0o2,
            Access::Execute => 0o1,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::Execute => "execute",
        };
        write!(f, "{name}")
    }
}

/// Two-digit octal permission mode: high digit for the owner, low digit
/// for everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mode(u8);

impl Mode {
    /// Default mode for newly created files: rw- / r--.
    pub const FILE_DEFAULT: Mode = Mode(0o64);
    /// Default mode for newly created directories: rwx / r-x.
    pub const DIR_DEFAULT: Mode = Mode(0o75);
    /// Mode for shared scratch space: rwx / rwx.
    pub const SHARED: Mode = Mode(0o77);

    /// Build a mode from raw bits. Only the two low octal digits are
    /// meaningful; anything above 0o77 is rejected.
    pub fn new(bits: u8) -> Option<Mode> {
        (bits <= 0o77).then_some(Mode(bits))
    }

    /// Parse a mode argument as given to `chmod`: one or two octal
    /// digits, e.g. `"7"` or `"75"`.
    pub fn parse(s: &str) -> Option<Mode> {
        if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return None;
        }
        u8::from_str_radix(s, 8).ok().map(Mode)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn owner_bits(self) -> u8 {
        (self.0 >> 3) & 0o7
    }

    fn other_bits(self) -> u8 {
        self.0 & 0o7
    }

    /// Does this mode grant `access` to the owner class?
    pub fn owner_allows(self, access: Access) -> bool {
        self.owner_bits() & access.bit() != 0
    }

    /// Does this mode grant `access` to everyone else?
    pub fn other_allows(self, access: Access) -> bool {
        self.other_bits() & access.bit() != 0
    }

    /// Nine-character permission string with the group triplet dashed
    /// out, e.g. 0o75 renders as `rwx---r-x`.
    pub fn render(self) -> String {
        let triplet = |bits: u8| {
            format!(
                "{}{}{}",
                if bits & 0o4 != 0 { 'r' } else { '-' },
                if bits & 0o2 != 0 { 'w' } else { '-' },
                if bits & 0o1 != 0 { 'x' } else { '-' },
            )
        };
        format!("{}---{}", triplet(self.owner_bits()), triplet(self.other_bits()))
    }
}

impl fmt::Display for Mode {
    /// Displays as the two octal digits users type into chmod.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02o}", self.0)
    }
}
