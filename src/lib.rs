//! Just-in-time compilation of integer arithmetic expressions to 32-bit ARM machine code.
//!
//! The generated routine takes no arguments and returns an `int` in `r0`. Before executing it the
//! caller must synchronize the instruction cache with the freshly written buffer.

use compiler::{Compiler, SymbolTable};
use il::Instructions;
use log::debug;
use safer_ffi::prelude::*;
use thiserror::Error;

pub use compiler::{CompilerConfig, Extern, Primitives};
pub use il::CodeBuffer;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lex(tokenizer::Error),

    #[error(transparent)]
    Parse(parser::Error),

    #[error(transparent)]
    Codegen(#[from] compiler::Error),

    #[error(transparent)]
    Emit(#[from] il::Error),
}

impl From<tokenizer::Error> for Error {
    fn from(value: tokenizer::Error) -> Self {
        Self::Lex(value)
    }
}

impl From<parser::Error> for Error {
    fn from(value: parser::Error) -> Self {
        match value {
            parser::Error::TokenizerError(e) => Self::Lex(e),
            e => Self::Parse(e),
        }
    }
}

/// Parses `source` and generates its routine without encoding it
pub fn generate(
    source: &str,
    externs: &[Extern<'_>],
    config: Option<CompilerConfig>,
) -> Result<Instructions, Error> {
    let tokens = tokenizer::tokenize(source)?;
    let expr = parser::parse_tokens(&tokens)?;
    let symbols = SymbolTable::new(externs);

    Ok(Compiler::new(&symbols, config).compile(&expr)?)
}

/// Compiles `source` into `out`, starting at its current position, and returns the number of
/// bytes written. On failure nothing is written.
pub fn compile(
    source: &str,
    externs: &[Extern<'_>],
    out: &mut CodeBuffer<'_>,
) -> Result<usize, Error> {
    compile_with(source, externs, out, None)
}

/// [`compile`] with explicit operator entry points
pub fn compile_with(
    source: &str,
    externs: &[Extern<'_>],
    out: &mut CodeBuffer<'_>,
    config: Option<CompilerConfig>,
) -> Result<usize, Error> {
    let instructions = generate(source, externs, config)?;
    let written = instructions.encode_into(out)?;

    debug!("wrote {written} bytes, {} of {} used", out.position(), out.capacity());
    Ok(written)
}

/// A named native address handed over by a C caller
#[derive_ReprC]
#[repr(C)]
pub struct Symbol<'a> {
    pub name: char_p::Ref<'a>,
    pub pointer: usize,
}

/// Compiles `expression` into `out_buffer`. Returns the number of bytes written, or -1 if the
/// expression does not compile or the code does not fit.
#[ffi_export]
pub fn jit_compile_expression_to_arm(
    expression: char_p::Ref<'_>,
    externs: c_slice::Ref<'_, Symbol<'_>>,
    out_buffer: c_slice::Mut<'_, u8>,
) -> i32 {
    let externs = externs
        .as_slice()
        .iter()
        .map(|symbol| Extern::new(symbol.name.to_str(), symbol.pointer))
        .collect::<Vec<_>>();
    let mut out = CodeBuffer::new(out_buffer.as_slice());

    match compile(expression.to_str(), &externs, &mut out) {
        Ok(written) => i32::try_from(written).unwrap_or(-1),
        Err(e) => {
            debug!("`{}` failed to compile: {e}", expression.to_str());
            -1
        }
    }
}

#[cfg(feature = "headers")]
pub fn generate_headers() -> std::io::Result<()> {
    ::safer_ffi::headers::builder()
        .to_file("armjit.h")?
        .generate()
}
