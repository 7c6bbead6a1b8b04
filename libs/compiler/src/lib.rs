pub mod primitives;
pub mod symbols;
mod v1;

pub use primitives::Primitives;
pub use symbols::{Extern, SymbolTable};
pub use v1::{Compiler, CompilerConfig, Error};
