use std::{fmt, ops::Range, rc::Rc};

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use derive_more::Deref;

use crate::{analyze::scan::Line, synthesize::encode::Field};

pub mod scan;
pub mod symbols;

pub type Span = (Rc<String>, Range<usize>);

/// What went wrong while assembling a line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("syntax error")]
    Syntax,
    #[error("unknown {field} mnemonic \"{text}\"")]
    UnknownMnemonic { field: Field, text: String },
    #[error("value out of range")]
    Range,
    #[error("i/o error")]
    Io,
}

impl ErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            ErrorKind::Syntax => ErrorCode::Syntax,
            ErrorKind::UnknownMnemonic { .. } => ErrorCode::UnknownMnemonic,
            ErrorKind::Range => ErrorCode::Range,
            ErrorKind::Io => ErrorCode::Io,
        }
    }
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax = 1,
    UnknownMnemonic = 2,
    Range = 3,
    Io = 4,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:02}", *self as u32)
    }
}

/// A diagnostic tied to one line of input.
///
/// `line` is 1-based and `text` is the line exactly as it appeared in the input. `span` is the
/// char range of that line inside the whole input and is only used when rendering reports.
/// Errors that are not tied to a line (an unreadable file) use line 0 and an empty span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub line: usize,
    pub text: String,
    pub reason: String,
    pub span: Range<usize>,
}

impl Error {
    pub fn new(
        kind: ErrorKind,
        line: usize,
        text: impl Into<String>,
        span: Range<usize>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            line,
            text: text.into(),
            reason: reason.into(),
            span,
        }
    }

    /// Error on an already scanned line.
    pub fn on(line: &Line, kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self::new(kind, line.number, line.text.clone(), line.span.clone(), reason)
    }

    pub fn io(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, 0, String::new(), 0..0, reason)
    }

    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Builds a printable report pointing at the offending line.
    pub fn report(
        &self,
        source_name: Rc<String>,
        color_gen: &mut ColorGenerator,
    ) -> Report<'static, Span> {
        let label = Label::new((source_name.clone(), self.span.clone()))
            .with_color(color_gen.next())
            .with_message(&self.reason);

        Report::build(ReportKind::Error, (source_name, self.span.clone()))
            .with_code(self.code())
            .with_message(format!("{} on line {}", self.kind, self.line))
            .with_label(label)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            return write!(f, "{}", self.reason);
        }

        write!(
            f,
            "Line {}: {}\n\tin \"{}\"",
            self.line,
            self.reason,
            self.text.trim()
        )
    }
}

impl std::error::Error for Error {}

/// Collects errors so a pass can keep going after a bad line.
#[derive(Default)]
pub struct ErrorContext {
    errors: Vec<Error>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn report(&mut self, error: Error) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> ErrorVec {
        ErrorVec(std::mem::take(&mut self.errors))
    }
}

#[derive(Debug, Deref)]
pub struct ErrorVec(Vec<Error>);

impl ErrorVec {
    /// Prints all errors to stderr
    pub fn dump(&self, source_name: Rc<String>, source: &str) {
        let mut color_gen = ColorGenerator::new();

        for error in &self.0 {
            let printed = error
                .report(source_name.clone(), &mut color_gen)
                .eprint((source_name.clone(), Source::from(source)));

            if printed.is_err() {
                eprintln!("{error}");
            }

            eprintln!();
        }
    }

    pub fn into_inner(self) -> Vec<Error> {
        self.0
    }
}

impl From<Error> for ErrorVec {
    fn from(error: Error) -> Self {
        Self(vec![error])
    }
}
