use std::{collections::HashMap, fs, path::Path};

use strum::{Display, EnumIter};
use tracing::debug;
use ux::{u3, u7};

use crate::analyze::{Error, ErrorKind, symbols::Address};

/// Key used in the dest and jump tables for a field missing from the source.
pub const ABSENT: &str = "null";

/// Width of the operand of an address instruction.
pub const ADDRESS_BITS: u32 = 15;

/// The three mnemonic fields of a compute instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Field {
    Comp,
    Dest,
    Jump,
}

impl Field {
    /// Number of bits a mnemonic of this field encodes to.
    pub const fn width(self) -> usize {
        match self {
            Field::Comp => 7,
            Field::Dest | Field::Jump => 3,
        }
    }

    /// Whether the table must map [ABSENT].
    pub const fn has_absent(self) -> bool {
        !matches!(self, Field::Comp)
    }

    pub fn file_name(self) -> String {
        format!("{self}.table")
    }
}

#[rustfmt::skip]
const COMP: [(&str, u8); 28] = [
    ("0",   0b0101010), ("1",   0b0111111), ("-1",  0b0111010),
    ("D",   0b0001100), ("A",   0b0110000), ("!D",  0b0001101),
    ("!A",  0b0110001), ("-D",  0b0001111), ("-A",  0b0110011),
    ("D+1", 0b0011111), ("A+1", 0b0110111), ("D-1", 0b0001110),
    ("A-1", 0b0110010), ("D+A", 0b0000010), ("D-A", 0b0010011),
    ("A-D", 0b0000111), ("D&A", 0b0000000), ("D|A", 0b0010101),
    ("M",   0b1110000), ("!M",  0b1110001), ("-M",  0b1110011),
    ("M+1", 0b1110111), ("M-1", 0b1110010), ("D+M", 0b1000010),
    ("D-M", 0b1010011), ("M-D", 0b1000111), ("D&M", 0b1000000),
    ("D|M", 0b1010101),
];

#[rustfmt::skip]
const DEST: [(&str, u8); 8] = [
    (ABSENT, 0b000), ("M",  0b001), ("D",  0b010), ("MD",  0b011),
    ("A",    0b100), ("AM", 0b101), ("AD", 0b110), ("AMD", 0b111),
];

#[rustfmt::skip]
const JUMP: [(&str, u8); 8] = [
    (ABSENT, 0b000), ("JGT", 0b001), ("JEQ", 0b010), ("JGE", 0b011),
    ("JLT",  0b100), ("JNE", 0b101), ("JLE", 0b110), ("JMP", 0b111),
];

/// Mnemonic to bit pattern lookup for one field.
#[derive(Debug, Clone)]
pub struct Table {
    field: Field,
    codes: HashMap<String, u8>,
}

impl Table {
    fn builtin(field: Field, entries: &[(&str, u8)]) -> Self {
        let codes = entries
            .iter()
            .map(|(mnemonic, bits)| ((*mnemonic).to_owned(), *bits))
            .collect();

        Self { field, codes }
    }

    /// Reads `<dir>/<field>.table`.
    pub fn load(dir: &Path, field: Field) -> Result<Self, Error> {
        let path = dir.join(field.file_name());
        let text = fs::read_to_string(&path).map_err(|err| {
            Error::io(format!(
                "could not read {} table {}: {err}",
                field,
                path.display()
            ))
        })?;

        let table = Self::parse(field, &path, &text)?;
        debug!(%field, path = %path.display(), entries = table.len(), "loaded mnemonic table");

        Ok(table)
    }

    /// Parses `mnemonic=bits` lines. Blank lines and lines starting with `#` are skipped.
    pub fn parse(field: Field, path: &Path, text: &str) -> Result<Self, Error> {
        let mut codes = HashMap::new();

        for (idx, line) in text.lines().enumerate() {
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            let fail = |reason: String| {
                Error::new(
                    ErrorKind::Io,
                    idx + 1,
                    line,
                    0..0,
                    format!("{}: {reason}", path.display()),
                )
            };

            let Some((mnemonic, bits)) = entry.split_once('=') else {
                return Err(fail(String::from("expected `mnemonic=bits`")));
            };
            let (mnemonic, bits) = (mnemonic.trim(), bits.trim());

            if mnemonic.is_empty() {
                return Err(fail(String::from("missing mnemonic")));
            }

            if bits.len() != field.width() || !bits.chars().all(|c| c == '0' || c == '1') {
                return Err(fail(format!(
                    "{field} code for \"{mnemonic}\" must be {} binary digits",
                    field.width()
                )));
            }

            let value = u8::from_str_radix(bits, 2)
                .map_err(|err| fail(format!("bad code \"{bits}\": {err}")))?;

            if codes.insert(mnemonic.to_owned(), value).is_some() {
                return Err(fail(format!("duplicate {field} mnemonic \"{mnemonic}\"")));
            }
        }

        if field.has_absent() && !codes.contains_key(ABSENT) {
            return Err(Error::io(format!(
                "{}: {field} table has no entry for \"{ABSENT}\"",
                path.display()
            )));
        }

        Ok(Self { field, codes })
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn get(&self, mnemonic: &str) -> Option<u8> {
        self.codes.get(mnemonic).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Translates compute mnemonics to their bit patterns.
#[derive(Debug, Clone)]
pub struct Encoder {
    comp: Table,
    dest: Table,
    jump: Table,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            comp: Table::builtin(Field::Comp, &COMP),
            dest: Table::builtin(Field::Dest, &DEST),
            jump: Table::builtin(Field::Jump, &JUMP),
        }
    }
}

impl Encoder {
    /// Loads all three tables from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref();

        Ok(Self {
            comp: Table::load(dir, Field::Comp)?,
            dest: Table::load(dir, Field::Dest)?,
            jump: Table::load(dir, Field::Jump)?,
        })
    }

    pub fn table(&self, field: Field) -> &Table {
        match field {
            Field::Comp => &self.comp,
            Field::Dest => &self.dest,
            Field::Jump => &self.jump,
        }
    }

    pub fn comp(&self, mnemonic: &str) -> Option<u7> {
        self.comp.get(mnemonic).map(u7::new)
    }

    /// `None` looks up the absent entry.
    pub fn dest(&self, mnemonic: Option<&str>) -> Option<u3> {
        self.dest.get(mnemonic.unwrap_or(ABSENT)).map(u3::new)
    }

    /// `None` looks up the absent entry.
    pub fn jump(&self, mnemonic: Option<&str>) -> Option<u3> {
        self.jump.get(mnemonic.unwrap_or(ABSENT)).map(u3::new)
    }
}

/// Big-endian 15 character bit string of `value`. Bits above the 15th are dropped.
pub fn to_fixed_binary(value: Address) -> String {
    (0..ADDRESS_BITS)
        .rev()
        .map(|pos| if (value >> pos) & 1 == 1 { '1' } else { '0' })
        .collect()
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn parse(field: Field, text: &str) -> Result<Table, Error> {
        Table::parse(field, Path::new("codes"), text)
    }

    #[test]
    fn fixed_binary() {
        assert_eq!(to_fixed_binary(0), "000000000000000");
        assert_eq!(to_fixed_binary(2), "000000000000010");
        assert_eq!(to_fixed_binary(24576), "110000000000000");
        assert_eq!(to_fixed_binary(32767), "111111111111111");
        // truncated, not rejected
        assert_eq!(to_fixed_binary(32768), "000000000000000");
        assert_eq!(to_fixed_binary(65535), "111111111111111");
    }

    #[test]
    fn standard_lookups() {
        let encoder = Encoder::default();

        assert_eq!(encoder.comp("A"), Some(u7::new(0b0110000)));
        assert_eq!(encoder.comp("D+1"), Some(u7::new(0b0011111)));
        assert_eq!(encoder.comp("@"), None);
        assert_eq!(encoder.dest(None), Some(u3::new(0)));
        assert_eq!(encoder.dest(Some("AMD")), Some(u3::new(0b111)));
        assert_eq!(encoder.dest(Some("X")), None);
        assert_eq!(encoder.jump(Some("JGT")), Some(u3::new(0b001)));
        assert_eq!(encoder.jump(None), Some(u3::new(0)));
    }

    #[test]
    fn builtin_tables_fit_their_widths() {
        let encoder = Encoder::default();

        for field in Field::iter() {
            let table = encoder.table(field);
            assert_eq!(table.field(), field);
            assert!(!table.is_empty());
            assert_eq!(table.get(ABSENT).is_some(), field.has_absent());

            for code in table.codes.values() {
                assert!(u32::from(*code) < (1 << field.width()));
            }
        }
    }

    #[test]
    fn parses_table_files() {
        let table = parse(Field::Jump, "# jumps\nnull=000\n\n JMP = 111 \n").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("JMP"), Some(0b111));
    }

    #[test]
    fn rejects_malformed_tables() {
        let error = parse(Field::Comp, "D+1=001111\n").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Io);
        assert_eq!(error.line, 1);

        let error = parse(Field::Dest, "null=000\nM 001\n").unwrap_err();
        assert_eq!(error.line, 2);

        assert!(parse(Field::Dest, "null=000\nM=001\nM=010\n").is_err());
        assert!(parse(Field::Dest, "null=00x\n").is_err());
        assert!(parse(Field::Jump, "JMP=111\n").is_err());
        assert!(parse(Field::Comp, "0=0101010\n").is_ok());
    }

    #[test]
    fn missing_directory_is_fatal() {
        let error = Encoder::load("definitely/not/here").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Io);
        assert!(error.reason.contains("comp.table"));
    }
}
