use std::io::{self, Write};

use tracing::{debug, trace};

use crate::{
    analyze::{
        Error, ErrorContext, ErrorKind, ErrorVec,
        scan::{Command, Line, Scanner},
        symbols::{Address, SymbolTable},
    },
    synthesize::{
        encode::{ABSENT, Encoder, Field},
        instr::Instruction,
    },
};

pub mod encode;
pub mod instr;

/// First RAM address handed out to variables.
pub const FIRST_VARIABLE: Address = 16;

/// Largest decimal literal accepted in an address instruction.
pub const MAX_LITERAL: Address = 65535;

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct MachineCode {
    pub instructions: Vec<Instruction>,
}

impl MachineCode {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// One 16 character bit string per instruction.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.instructions.iter().map(Instruction::to_string)
    }

    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        self.instructions.iter().map(Instruction::encode)
    }

    pub fn write_to(&self, mut out: impl Write) -> io::Result<()> {
        for instr in &self.instructions {
            writeln!(out, "{instr}")?;
        }

        out.flush()
    }
}

/// Two pass translator from assembly to [MachineCode].
///
/// The first pass binds every label to the address of the instruction following it. The
/// second pass rescans the source, allocates variables and encodes each instruction.
pub struct HackAssembler<'e> {
    encoder: &'e Encoder,
    symbols: SymbolTable,
    code: MachineCode,
    next_variable: Address,
}

impl<'e> HackAssembler<'e> {
    pub fn new(encoder: &'e Encoder) -> Self {
        Self {
            encoder,
            symbols: SymbolTable::new(),
            code: MachineCode::new(),
            next_variable: FIRST_VARIABLE,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Runs both passes. The second pass only runs if the first one found no errors.
    pub fn assemble(mut self, source: &str) -> Result<MachineCode, ErrorVec> {
        self.first_pass(source)?;
        self.second_pass(source)?;

        trace!("symbol table:\n{}", self.symbols);
        Ok(self.code)
    }

    /// Binds labels to instruction addresses.
    ///
    /// Keeps scanning after a bad line so every label still gets bound, and reports all errors
    /// together at the end.
    pub fn first_pass(&mut self, source: &str) -> Result<(), ErrorVec> {
        let mut err_ctx = ErrorContext::new();
        let mut rom: Address = 0;
        let mut labels = 0;

        for line in Scanner::new(source) {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    err_ctx.report(err);
                    continue;
                }
            };

            if line.command.is_instruction() {
                rom += 1;
                continue;
            }

            let Command::Label(symbol) = &line.command else {
                continue;
            };
            // first definition wins
            if self.symbols.contains(symbol) {
                continue;
            }

            match self.symbols.add(symbol, rom) {
                Ok(_) => {
                    trace!(label = %symbol, address = rom, "bound label");
                    labels += 1;
                }
                Err(err) => err_ctx.report(Error::on(&line, ErrorKind::Syntax, err.to_string())),
            }
        }

        if !err_ctx.is_empty() {
            let errors = err_ctx.take_errors();
            debug!(errors = errors.len(), "first pass failed");
            return Err(errors);
        }

        debug!(labels, instructions = rom, "first pass done");
        Ok(())
    }

    /// Resolves symbols and encodes every instruction. Stops at the first error.
    pub fn second_pass(&mut self, source: &str) -> Result<(), Error> {
        for line in Scanner::new(source) {
            let line = line?;

            let instr = match &line.command {
                Command::Address(symbol) => self.resolve(&line, symbol)?,
                Command::Compute { .. } => self.compute(&line)?,
                Command::Label(_) | Command::None => continue,
            };

            self.code.instructions.push(instr);
        }

        debug!(
            instructions = self.code.instructions.len(),
            variables = self.next_variable - FIRST_VARIABLE,
            "second pass done"
        );
        Ok(())
    }

    fn resolve(&mut self, line: &Line, symbol: &str) -> Result<Instruction, Error> {
        if symbol.chars().all(|c| c.is_ascii_digit()) {
            return match symbol.parse::<Address>() {
                Ok(value) if value <= MAX_LITERAL => Ok(Instruction::address(value)),
                _ => Err(Error::on(
                    line,
                    ErrorKind::Range,
                    format!("literal {symbol} is outside 0 to {MAX_LITERAL}"),
                )),
            };
        }

        if self.symbols.contains(symbol) {
            return Ok(Instruction::address(self.symbols.lookup(symbol)));
        }

        let address = self.next_variable;
        self.symbols
            .add(symbol, address)
            .map_err(|err| Error::on(line, ErrorKind::Syntax, err.to_string()))?;
        self.next_variable += 1;

        trace!(variable = %symbol, address, "allocated variable");
        Ok(Instruction::address(address))
    }

    fn compute(&self, line: &Line) -> Result<Instruction, Error> {
        let command = &line.command;
        let (dest, jump) = (command.dest(), command.jump());
        let comp = command.comp().unwrap_or_default();

        let unknown = |field: Field, text: Option<&str>| {
            let text = text.unwrap_or(ABSENT).to_owned();
            let reason = format!("unknown {field} mnemonic \"{text}\"");
            Error::on(line, ErrorKind::UnknownMnemonic { field, text }, reason)
        };

        let comp_bits = self
            .encoder
            .comp(comp)
            .ok_or_else(|| unknown(Field::Comp, Some(comp)))?;
        let dest_bits = self
            .encoder
            .dest(dest)
            .ok_or_else(|| unknown(Field::Dest, dest))?;
        let jump_bits = self
            .encoder
            .jump(jump)
            .ok_or_else(|| unknown(Field::Jump, jump))?;

        Ok(Instruction::Compute {
            comp: comp_bits,
            dest: dest_bits,
            jump: jump_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(source: &str) -> Result<MachineCode, ErrorVec> {
        HackAssembler::new(&Encoder::default()).assemble(source)
    }

    #[test]
    fn first_pass_counts_only_instructions() {
        let encoder = Encoder::default();
        let mut asm = HackAssembler::new(&encoder);

        asm.first_pass("// start\n(START)\n@1\n\n(MID)\nD=A\n(MID)\n(END)\n0;JMP\n")
            .unwrap();

        assert_eq!(asm.symbols().lookup("START"), 0);
        assert_eq!(asm.symbols().lookup("MID"), 1);
        assert_eq!(asm.symbols().lookup("END"), 2);
    }

    #[test]
    fn first_pass_collects_every_error() {
        let encoder = Encoder::default();
        let mut asm = HackAssembler::new(&encoder);

        let errors = asm.first_pass("(1BAD)\n@\n(OK)\nD=\n").unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 2);
        assert!(asm.symbols().contains("OK"));
    }

    #[test]
    fn second_pass_allocates_variables_in_order() {
        let code = assemble("@i\n@sum\n@i\n@R3\n@j\n").unwrap();
        let words: Vec<u16> = code.words().collect();

        assert_eq!(words, [16, 17, 16, 3, 18]);
    }

    #[test]
    fn literal_range() {
        assert_eq!(assemble("@65535").unwrap().words().next(), Some(0x7fff));

        let errors = assemble("@65536").unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Range);

        let errors = assemble("@99999999999999999999").unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Range);
    }

    #[test]
    fn unknown_mnemonics_name_their_field() {
        let kind = |source: &str| assemble(source).unwrap_err()[0].kind.clone();

        assert_eq!(
            kind("X=D;JMP"),
            ErrorKind::UnknownMnemonic {
                field: Field::Dest,
                text: String::from("X")
            }
        );
        assert_eq!(
            kind("D;JXX"),
            ErrorKind::UnknownMnemonic {
                field: Field::Jump,
                text: String::from("JXX")
            }
        );
        // comp is checked before dest
        assert_eq!(
            kind("X=Q"),
            ErrorKind::UnknownMnemonic {
                field: Field::Comp,
                text: String::from("Q")
            }
        );
    }

    #[test]
    fn invalid_variable_name() {
        let errors = assemble("@1\n@x-y\n").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Syntax);
        assert_eq!(errors[0].line, 2);
        assert!(errors[0].reason.contains("position 2"));
    }
}
