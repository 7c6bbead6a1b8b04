pub mod buffer;
pub mod encode;

use quick_error::quick_error;
use std::fmt;
use std::ops::{Deref, DerefMut};

pub use buffer::CodeBuffer;

quick_error! {
    #[derive(Debug, PartialEq, Eq)]
    pub enum Error {
        UnencodableImmediate(value: u32) {
            display("Immediate {:#x} cannot be encoded as a rotated 8-bit constant", value)
        }
        OffsetOutOfRange(offset: u32) {
            display("Load/store offset {} does not fit in 12 bits", offset)
        }
        BufferOverflow(needed: usize, available: usize) {
            display("Output buffer overflow: {} bytes needed, {} available", needed, available)
        }
    }
}

/// An ARM core register. Only `r0`-`r7`, `sp`, `lr` and `pc` are ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(u8);

impl Register {
    pub const R0: Register = Register(0);
    pub const R1: Register = Register(1);
    pub const R2: Register = Register(2);
    pub const R3: Register = Register(3);
    pub const R4: Register = Register(4);
    pub const R5: Register = Register(5);
    pub const R6: Register = Register(6);
    pub const R7: Register = Register(7);
    pub const SP: Register = Register(13);
    pub const LR: Register = Register(14);
    pub const PC: Register = Register(15);

    /// Registers carrying the first four call arguments under the AAPCS, in argument order
    pub const ARGUMENTS: [Register; 4] = [Self::R0, Self::R1, Self::R2, Self::R3];

    /// A general purpose register `r0`-`r7`
    pub fn general(index: u8) -> Option<Register> {
        (index < 8).then_some(Register(index))
    }

    pub fn index(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Register::SP => write!(f, "sp"),
            Register::LR => write!(f, "lr"),
            Register::PC => write!(f, "pc"),
            Register(r) => write!(f, "r{}", r),
        }
    }
}

/// A single A32 instruction of the subset the code generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `str rt, [sp, #-4]!`
    Push(Register),
    /// `ldr rt, [sp], #4`
    Pop(Register),
    /// `mov rd, rm`
    Move(Register, Register),
    /// `add rd, rn, #imm`
    AddImmediate(Register, Register, u32),
    /// `sub rd, rn, #imm`
    SubImmediate(Register, Register, u32),
    /// `ldr rt, [rn, #offset]`
    Load(Register, Register, u32),
    /// `str rt, [rn, #offset]`
    Store(Register, Register, u32),
    /// `bx rm`
    BranchExchange(Register),
    /// `blx rm`
    BranchLinkExchange(Register),
    /// `b .+8`, jumps over the word that follows it
    Skip,
}

impl Instruction {
    /// Net number of words this instruction pushes onto the native stack
    pub fn stack_effect(&self) -> isize {
        match *self {
            Instruction::Push(_) => 1,
            Instruction::Pop(_) => -1,
            Instruction::SubImmediate(Register::SP, Register::SP, imm) => (imm / 4) as isize,
            Instruction::AddImmediate(Register::SP, Register::SP, imm) => -((imm / 4) as isize),
            _ => 0,
        }
    }

    /// Encodes the instruction into its 32-bit word
    pub fn encode(&self) -> Result<u32, Error> {
        use encode::*;
        match *self {
            Instruction::Push(rt) => Ok(push(rt)),
            Instruction::Pop(rt) => Ok(pop(rt)),
            Instruction::Move(rd, Register::PC) => Ok(mov_pc(rd)),
            Instruction::Move(rd, rm) => Ok(mov(rd, rm)),
            Instruction::AddImmediate(rd, rn, imm) => add_immediate(rd, rn, imm),
            Instruction::SubImmediate(rd, rn, imm) => sub_immediate(rd, rn, imm),
            Instruction::Load(rt, rn, offset) => load(rt, rn, offset),
            Instruction::Store(rt, rn, offset) => store(rt, rn, offset),
            Instruction::BranchExchange(Register::LR) => Ok(bx_lr()),
            Instruction::BranchExchange(rm) => Ok(bx(rm)),
            Instruction::BranchLinkExchange(rm) => Ok(blx(rm)),
            Instruction::Skip => Ok(skip()),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(rt) => write!(f, "push {{{}}}", rt),
            Instruction::Pop(rt) => write!(f, "pop {{{}}}", rt),
            Instruction::Move(rd, rm) => write!(f, "mov {}, {}", rd, rm),
            Instruction::AddImmediate(rd, rn, imm) => write!(f, "add {}, {}, #{}", rd, rn, imm),
            Instruction::SubImmediate(rd, rn, imm) => write!(f, "sub {}, {}, #{}", rd, rn, imm),
            Instruction::Load(rt, rn, 0) => write!(f, "ldr {}, [{}]", rt, rn),
            Instruction::Load(rt, rn, offset) => write!(f, "ldr {}, [{}, #{}]", rt, rn, offset),
            Instruction::Store(rt, rn, 0) => write!(f, "str {}, [{}]", rt, rn),
            Instruction::Store(rt, rn, offset) => write!(f, "str {}, [{}, #{}]", rt, rn, offset),
            Instruction::BranchExchange(rm) => write!(f, "bx {}", rm),
            Instruction::BranchLinkExchange(rm) => write!(f, "blx {}", rm),
            Instruction::Skip => write!(f, "b .+8"),
        }
    }
}

/// One 32-bit slot of the emitted routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    Instruction(Instruction),
    /// Inline data, always preceded by a `Skip` and never executed
    Literal(u32),
}

impl Word {
    pub fn encode(&self) -> Result<u32, Error> {
        match self {
            Word::Instruction(instruction) => instruction.encode(),
            Word::Literal(value) => Ok(*value),
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Instruction(instruction) => write!(f, "{}", instruction),
            Word::Literal(value) => write!(f, ".word {:#010x}", value),
        }
    }
}

impl From<Instruction> for Word {
    fn from(instruction: Instruction) -> Self {
        Word::Instruction(instruction)
    }
}

/// The generated routine, in emission order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Instructions(Vec<Word>);

impl Deref for Instructions {
    type Target = Vec<Word>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Instructions {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Instructions {
    pub fn new(words: Vec<Word>) -> Self {
        Self(words)
    }

    pub fn into_inner(self) -> Vec<Word> {
        self.0
    }

    /// Size of the encoded routine in bytes
    pub fn byte_len(&self) -> usize {
        self.0.len() * 4
    }

    /// Encodes every word into `buffer`, starting at its current position.
    ///
    /// Nothing is written unless the whole routine fits and every instruction encodes.
    pub fn encode_into(&self, buffer: &mut CodeBuffer<'_>) -> Result<usize, Error> {
        let encoded = self
            .0
            .iter()
            .map(Word::encode)
            .collect::<Result<Vec<u32>, Error>>()?;

        buffer.reserve(encoded.len() * 4)?;
        for word in encoded {
            buffer.write_word(word)?;
        }

        Ok(self.byte_len())
    }

    /// Net stack effect of the whole sequence, in words
    pub fn stack_effect(&self) -> isize {
        self.0
            .iter()
            .map(|word| match word {
                Word::Instruction(instruction) => instruction.stack_effect(),
                Word::Literal(_) => 0,
            })
            .sum()
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in &self.0 {
            writeln!(f, "{word}")?;
        }
        Ok(())
    }
}
