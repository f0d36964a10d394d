use std::ops::Range;

use tracing::trace;

use crate::analyze::{Error, ErrorKind};

pub mod command;

pub use command::{Command, Line};

const COMMENT: &str = "//";

/// Line-by-line scanner over assembly source.
///
/// Every call to [advance()](Self::advance) classifies one line and hands back a fresh [Line];
/// the scanner keeps no state about previous commands beyond its position.
pub struct Scanner<'s> {
    rest: &'s str,
    number: usize,
    offset: usize,
}

impl<'s> Scanner<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            rest: source,
            number: 0,
            offset: 0,
        }
    }

    pub fn has_more_lines(&self) -> bool {
        !self.rest.is_empty()
    }

    /// Move on to the next line and classify it.
    ///
    /// Returns `None` once the input is exhausted.
    pub fn advance(&mut self) -> Option<Result<Line, Error>> {
        if !self.has_more_lines() {
            return None;
        }

        let (raw, rest, consumed) = match self.rest.split_once('\n') {
            Some((raw, rest)) => (raw, rest, raw.chars().count() + 1),
            None => (self.rest, "", self.rest.chars().count()),
        };
        self.rest = rest;
        self.number += 1;

        let text = raw.strip_suffix('\r').unwrap_or(raw);
        let span = self.offset..(self.offset + text.chars().count());
        self.offset += consumed;

        let cleaned = clean(text);
        trace!(line = self.number, cleaned = %cleaned, "scanned");

        let result = match parse(&cleaned) {
            Ok(command) => Ok(Line {
                number: self.number,
                text: text.to_owned(),
                span,
                command,
            }),
            Err(reason) => Err(self.error(text, span, reason)),
        };

        Some(result)
    }

    fn error(&self, text: &str, span: Range<usize>, reason: impl Into<String>) -> Error {
        Error::new(ErrorKind::Syntax, self.number, text, span, reason)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Line, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

/// Drops the comment (found in the raw text), then every whitespace character.
fn clean(raw: &str) -> String {
    let code = raw.find(COMMENT).map_or(raw, |idx| &raw[..idx]);
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

fn parse(line: &str) -> Result<Command, String> {
    match line.chars().next() {
        None => Ok(Command::None),
        Some('@') => parse_address(&line[1..]),
        Some('(') => parse_label(&line[1..]),
        Some(_) => parse_compute(line),
    }
}

fn parse_address(symbol: &str) -> Result<Command, String> {
    if symbol.is_empty() {
        return Err(String::from(
            "address instruction needs a symbol or a number",
        ));
    }

    Ok(Command::Address(symbol.to_owned()))
}

fn parse_label(rest: &str) -> Result<Command, String> {
    let Some(symbol) = rest.strip_suffix(')') else {
        return Err(String::from("')' expected"));
    };

    Ok(Command::Label(symbol.to_owned()))
}

fn parse_compute(line: &str) -> Result<Command, String> {
    let (dest, rest) = match line.split_once('=') {
        Some((dest, rest)) => {
            if !(1..=3).contains(&dest.chars().count()) {
                return Err(String::from(
                    "expected 1 to 3 letter destination mnemonic",
                ));
            }
            (Some(dest.to_owned()), rest)
        }
        None => (None, line),
    };

    let (comp, jump) = match rest.split_once(';') {
        Some((comp, jump)) => {
            if jump.chars().count() != 3 {
                return Err(String::from("expected 3 letter jump mnemonic"));
            }
            (comp, Some(jump.to_owned()))
        }
        None => (rest, None),
    };

    Ok(Command::Compute {
        dest,
        comp: comp.to_owned(),
        jump,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> Command {
        Scanner::new(line).advance().unwrap().unwrap().command
    }

    fn reason(line: &str) -> String {
        Scanner::new(line).advance().unwrap().unwrap_err().reason
    }

    fn compute(dest: Option<&str>, comp: &str, jump: Option<&str>) -> Command {
        Command::Compute {
            dest: dest.map(String::from),
            comp: comp.to_owned(),
            jump: jump.map(String::from),
        }
    }

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(command("   \t "), Command::None);
        assert_eq!(command("// just a comment"), Command::None);
        assert_eq!(command("    // indented comment"), Command::None);
    }

    #[test]
    fn whitespace_is_insignificant() {
        assert_eq!(command("  D = D + 1 ; JGT "), compute(Some("D"), "D+1", Some("JGT")));
        assert_eq!(command("@ LOOP"), Command::Address(String::from("LOOP")));
        assert_eq!(command(" ( END ) "), Command::Label(String::from("END")));
    }

    #[test]
    fn trailing_comments_are_dropped() {
        assert_eq!(command("M=D // store"), compute(Some("M"), "D", None));
        assert_eq!(command("@i// counter"), Command::Address(String::from("i")));
    }

    #[test]
    fn compute_fields() {
        assert_eq!(command("0;JMP"), compute(None, "0", Some("JMP")));
        assert_eq!(command("AMD=M-1"), compute(Some("AMD"), "M-1", None));
        assert_eq!(command("D"), compute(None, "D", None));
        assert_eq!(command("@@"), Command::Address(String::from("@")));
    }

    #[test]
    fn field_accessors() {
        let full = command("AM=M+1;JNE");
        assert_eq!(full.dest(), Some("AM"));
        assert_eq!(full.comp(), Some("M+1"));
        assert_eq!(full.jump(), Some("JNE"));
        assert_eq!(full.symbol(), None);

        let bare = command("0");
        assert_eq!((bare.dest(), bare.jump()), (None, None));

        assert_eq!(command("@R2").symbol(), Some("R2"));
        assert_eq!(command("(LOOP)").symbol(), Some("LOOP"));
        assert_eq!(command("(LOOP)").comp(), None);
        assert_eq!(command("// nothing").symbol(), None);
    }

    #[test]
    fn malformed_lines() {
        assert_eq!(reason("@"), "address instruction needs a symbol or a number");
        assert_eq!(reason("(LOOP"), "')' expected");
        assert_eq!(reason("=D"), "expected 1 to 3 letter destination mnemonic");
        assert_eq!(reason("AMDM=D"), "expected 1 to 3 letter destination mnemonic");
        assert_eq!(reason("0;JM"), "expected 3 letter jump mnemonic");
        assert_eq!(reason("D;"), "expected 3 letter jump mnemonic");
    }

    #[test]
    fn tracks_line_numbers_and_text() {
        let source = "// header\r\n  @17  \n\nD=A";
        let lines: Vec<Line> = Scanner::new(source).map(Result::unwrap).collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].text, "  @17  ");
        assert_eq!(lines[1].span, 11..18);
        assert_eq!(lines[3].number, 4);
        assert!(lines[3].command.is_instruction());
        assert!(!lines[2].command.is_instruction());
    }

    #[test]
    fn errors_carry_line_context() {
        let mut scanner = Scanner::new("@1\n  (LOOP  \n");
        assert!(scanner.advance().unwrap().is_ok());

        let error = scanner.advance().unwrap().unwrap_err();
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert_eq!(error.line, 2);
        assert_eq!(error.text, "  (LOOP  ");
        assert!(!scanner.has_more_lines());
        assert!(scanner.advance().is_none());
    }
}
