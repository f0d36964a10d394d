use std::ops::Range;

/// One classified line of assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank or comment-only line.
    None,
    /// `@xxx`, where `xxx` is a decimal literal or a symbol.
    Address(String),
    /// `(xxx)`, binds `xxx` to the address of the next instruction.
    Label(String),
    /// `dest=comp;jump`. Absent `dest` and `jump` are `None`.
    Compute {
        dest: Option<String>,
        comp: String,
        jump: Option<String>,
    },
}

impl Command {
    /// Whether this command occupies an instruction address.
    pub fn is_instruction(&self) -> bool {
        matches!(self, Command::Address(_) | Command::Compute { .. })
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Command::Address(symbol) | Command::Label(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn dest(&self) -> Option<&str> {
        match self {
            Command::Compute { dest, .. } => dest.as_deref(),
            _ => None,
        }
    }

    pub fn comp(&self) -> Option<&str> {
        match self {
            Command::Compute { comp, .. } => Some(comp),
            _ => None,
        }
    }

    pub fn jump(&self) -> Option<&str> {
        match self {
            Command::Compute { jump, .. } => jump.as_deref(),
            _ => None,
        }
    }
}

/// A command together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number
    pub number: usize,
    /// Untrimmed line text, without the line terminator
    pub text: String,
    /// Char range of `text` inside the whole input
    pub span: Range<usize>,
    pub command: Command,
}
