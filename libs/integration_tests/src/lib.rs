//! End-to-end tests for the expression compiler
//!
//! Every test compiles an expression to A32 machine code and executes the emitted bytes in an
//! emulator, checking the value the routine returns and the calls it makes into the host.

#[cfg(test)]
mod common;
