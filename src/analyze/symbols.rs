use std::{collections::HashMap, fmt};

/// An instruction (ROM) or data (RAM) address.
pub type Address = u32;

const PREDEFINED: [(&str, Address); 7] = [
    ("SP", 0),
    ("LCL", 1),
    ("ARG", 2),
    ("THIS", 3),
    ("THAT", 4),
    ("SCREEN", 16384),
    ("KBD", 24576),
];

const REGISTERS: Address = 16;

/// Why a symbol name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("symbol name is empty")]
    Empty,
    #[error(
        "symbol cannot start with '{ch}', the first character must be a letter, '_', '.', '$' or ':'"
    )]
    FirstChar { ch: char },
    #[error(
        "invalid character '{ch}' at position {position} of symbol, only letters, digits, '_', '.', '$' and ':' are allowed"
    )]
    LaterChar { ch: char, position: usize },
}

fn is_first_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '_' | '.' | '$' | ':')
}

fn is_later_char(c: char) -> bool {
    is_first_char(c) || c.is_ascii_digit()
}

/// Checks `symbol` against the naming rules.
///
/// The first character may be a letter or one of `_ . $ :`, every following character may
/// additionally be a digit.
pub fn validate_name(symbol: &str) -> Result<(), NameError> {
    let mut chars = symbol.chars();

    let Some(first) = chars.next() else {
        return Err(NameError::Empty);
    };

    if !is_first_char(first) {
        return Err(NameError::FirstChar { ch: first });
    }

    if let Some((idx, ch)) = chars.enumerate().find(|(_, c)| !is_later_char(*c)) {
        return Err(NameError::LaterChar {
            ch,
            position: idx + 2,
        });
    }

    Ok(())
}

/// Maps symbol names to addresses. Once a name is bound its address never changes.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    table: HashMap<String, Address>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates a table seeded with `R0`..`R15`, `SP`, `LCL`, `ARG`, `THIS`, `THAT`, `SCREEN` and
    /// `KBD`.
    pub fn new() -> Self {
        let mut table = HashMap::with_capacity(REGISTERS as usize + PREDEFINED.len() + 16);

        for reg in 0..REGISTERS {
            table.insert(format!("R{reg}"), reg);
        }

        for (name, address) in PREDEFINED {
            table.insert(name.to_owned(), address);
        }

        Self { table }
    }

    /// Binds `symbol` to `address`.
    ///
    /// Returns `Ok(false)` without touching the table if `symbol` is already bound. Whether that
    /// is a problem is up to the caller.
    pub fn add(&mut self, symbol: &str, address: Address) -> Result<bool, NameError> {
        validate_name(symbol)?;

        if self.table.contains_key(symbol) {
            return Ok(false);
        }

        self.table.insert(symbol.to_owned(), address);
        Ok(true)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.table.contains_key(symbol)
    }

    /// Address bound to `symbol`.
    ///
    /// # Panics
    /// If `symbol` is not bound. Check [contains()](Self::contains) first.
    pub fn lookup(&self, symbol: &str) -> Address {
        self.table[symbol]
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.table.iter().collect();
        entries.sort_by(|(a_name, a_addr), (b_name, b_addr)| {
            a_addr.cmp(b_addr).then_with(|| a_name.cmp(b_name))
        });

        for (name, address) in entries {
            writeln!(f, "{name}={address}")?;
        }

        Ok(())
    }
}
