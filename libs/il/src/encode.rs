//! Bit-level A32 encodings. Every function returns exactly one 32-bit word, always the same word
//! for the same operands, with the condition field set to `AL`.

use crate::{Error, Register};

const COND_AL: u32 = 0xE000_0000;

/// `str rt, [sp, #-4]!`
pub fn push(rt: Register) -> u32 {
    0xE52D_0004 | rt.index() << 12
}

/// `ldr rt, [sp], #4`
pub fn pop(rt: Register) -> u32 {
    0xE49D_0004 | rt.index() << 12
}

/// `mov rd, rm`
pub fn mov(rd: Register, rm: Register) -> u32 {
    0xE1A0_0000 | rd.index() << 12 | rm.index()
}

/// `mov rd, pc`. The value read is the address of this instruction plus 8.
pub fn mov_pc(rd: Register) -> u32 {
    mov(rd, Register::PC)
}

/// `add rd, rn, #imm`
pub fn add_immediate(rd: Register, rn: Register, imm: u32) -> Result<u32, Error> {
    Ok(COND_AL | 0x0280_0000 | rn.index() << 16 | rd.index() << 12 | modified_immediate(imm)?)
}

/// `sub rd, rn, #imm`
pub fn sub_immediate(rd: Register, rn: Register, imm: u32) -> Result<u32, Error> {
    Ok(COND_AL | 0x0240_0000 | rn.index() << 16 | rd.index() << 12 | modified_immediate(imm)?)
}

/// `ldr rt, [rn, #offset]`
pub fn load(rt: Register, rn: Register, offset: u32) -> Result<u32, Error> {
    Ok(0xE590_0000 | rn.index() << 16 | rt.index() << 12 | offset_12(offset)?)
}

/// `str rt, [rn, #offset]`
pub fn store(rt: Register, rn: Register, offset: u32) -> Result<u32, Error> {
    Ok(0xE580_0000 | rn.index() << 16 | rt.index() << 12 | offset_12(offset)?)
}

/// `bx rm`
pub fn bx(rm: Register) -> u32 {
    0xE12F_FF10 | rm.index()
}

/// `blx rm`
pub fn blx(rm: Register) -> u32 {
    0xE12F_FF30 | rm.index()
}

/// `bx lr`
pub fn bx_lr() -> u32 {
    bx(Register::LR)
}

/// `b .+8`: a branch with a zero offset lands two words past itself (the pc reads 8 ahead),
/// skipping the single word that follows.
pub fn skip() -> u32 {
    0xEA00_0000
}

/// Encodes `value` as an 8-bit constant rotated right by an even amount
fn modified_immediate(value: u32) -> Result<u32, Error> {
    (0..16)
        .find_map(|rotation: u32| {
            let imm8 = value.rotate_left(rotation * 2);
            (imm8 <= 0xFF).then_some(rotation << 8 | imm8)
        })
        .ok_or(Error::UnencodableImmediate(value))
}

fn offset_12(offset: u32) -> Result<u32, Error> {
    if offset > 0xFFF {
        return Err(Error::OffsetOutOfRange(offset));
    }
    Ok(offset)
}
