use std::fmt;

use ux::{u3, u7, u15};

use crate::{analyze::symbols::Address, synthesize::encode::to_fixed_binary};

const ADDRESS_MASK: Address = 0x7fff;

/// One 16 bit machine word.
///
/// Encoding:
/// 15 14 13 12 11 10 9  8  7  6  5  4  3  2  1  0
/// 0  value
/// 1  1  1  comp                 dest     jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Address(u15),
    Compute { comp: u7, dest: u3, jump: u3 },
}

impl Instruction {
    /// Address instruction loading the low 15 bits of `value`.
    pub fn address(value: Address) -> Self {
        Self::Address(u15::new((value & ADDRESS_MASK) as u16))
    }

    pub fn encode(&self) -> u16 {
        match *self {
            Instruction::Address(value) => u16::from(value),
            Instruction::Compute { comp, dest, jump } => {
                let comp = u16::from(u8::from(comp));
                let dest = u16::from(u8::from(dest));
                let jump = u16::from(u8::from(jump));

                (0b111 << 13) | (comp << 6) | (dest << 3) | jump
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Address(value) => {
                write!(f, "0{}", to_fixed_binary(Address::from(u16::from(value))))
            }
            Instruction::Compute { comp, dest, jump } => write!(
                f,
                "111{:07b}{:03b}{:03b}",
                u8::from(comp),
                u8::from(dest),
                u8::from(jump)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_words() {
        let instr = Instruction::address(2);
        assert_eq!(instr.to_string(), "0000000000000010");
        assert_eq!(instr.encode(), 2);

        assert_eq!(Instruction::address(65535).encode(), 0x7fff);
    }

    #[test]
    fn compute_words() {
        let instr = Instruction::Compute {
            comp: u7::new(0b0011111),
            dest: u3::new(0b010),
            jump: u3::new(0b001),
        };

        assert_eq!(instr.to_string(), "1110011111010001");
        assert_eq!(instr.encode(), 0b1110011111010001);
    }
}
