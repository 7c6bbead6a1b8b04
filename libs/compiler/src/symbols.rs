use crate::Error;
use log::debug;
use std::collections::HashMap;

/// A caller-supplied name bound to a native address. Variables name the address of a 32-bit
/// memory cell, functions name an entry point; both share one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extern<'a> {
    pub name: &'a str,
    pub address: usize,
}

impl<'a> Extern<'a> {
    pub fn new(name: &'a str, address: usize) -> Self {
        Self { name, address }
    }
}

impl<'a> From<(&'a str, usize)> for Extern<'a> {
    fn from((name, address): (&'a str, usize)) -> Self {
        Self::new(name, address)
    }
}

/// Name to address lookup built once per compilation. When a name is listed more than once the
/// last entry wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolTable(HashMap<String, usize>);

impl SymbolTable {
    pub fn new(externs: &[Extern<'_>]) -> Self {
        externs.iter().copied().collect()
    }

    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<Extern<'a>> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = Extern<'a>>>(iter: T) -> Self {
        let mut table = HashMap::new();

        for Extern { name, address } in iter {
            if let Some(previous) = table.insert(name.to_string(), address) {
                debug!("extern `{name}` rebound from {previous:#x} to {address:#x}");
            }
        }

        Self(table)
    }
}

/// Turns a native address into the 32-bit literal embedded in the generated code.
///
/// This is the only place an address is narrowed. The generated code is 32-bit, so an address
/// that does not fit (possible when the host is 64-bit) is rejected rather than truncated.
pub fn literal_address(name: &str, address: usize) -> Result<u32, Error> {
    u32::try_from(address).map_err(|_| Error::AddressOutOfRange(name.to_string(), address))
}
