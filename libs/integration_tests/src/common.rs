//! A small A32 interpreter for the instruction subset the code generator emits.
//!
//! Generated bytes are decoded and executed word by word against simulated registers and memory.
//! Calls into host functions are serviced in Rust, following the AAPCS: arguments come from
//! `r0`-`r3` and then the stack, the result goes to `r0`, and `r1`-`r3` and `r12` are clobbered.

use anyhow::{Result, anyhow, bail};
use armjit::{CodeBuffer, CompilerConfig, Extern, Primitives};
use compiler::primitives;
use std::collections::{BTreeMap, HashMap};

/// Where the emulated primitives live
pub const PRIMITIVES: Primitives = Primitives {
    add: 0x1000,
    sub: 0x1004,
    mul: 0x1008,
    negate: 0x100c,
};

const VARIABLE_BASE: u32 = 0x2000;
const FUNCTION_BASE: u32 = 0x3000;
const CODE_BASE: u32 = 0x0001_0000;
const CODE_CAPACITY: usize = 1 << 20;
const STACK_TOP: u32 = 0x0080_0000;
const STACK_SIZE: u32 = 0x0001_0000;
/// Loaded into lr before entry; branching here ends the run
const RETURN_ADDRESS: u32 = 0x00de_ad00;
const CLOBBERED: u32 = 0xbad0_bad0;
const STEP_LIMIT: usize = 1_000_000;

const SP: usize = 13;
const LR: usize = 14;
const PC: usize = 15;

type Body = Box<dyn Fn(&[i32]) -> i32>;

struct Function {
    name: String,
    arity: usize,
    body: Body,
}

/// A call the routine made into the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub callee: String,
    pub arguments: Vec<i32>,
}

#[derive(Debug)]
pub struct Run {
    pub result: i32,
    pub calls: Vec<Call>,
}

/// The environment a compiled routine runs in: its variables and the functions it may call
pub struct Host {
    externs: Vec<(String, u32)>,
    cells: HashMap<u32, u32>,
    functions: BTreeMap<u32, Function>,
}

impl Host {
    pub fn new() -> Self {
        let mut host = Self {
            externs: Vec::new(),
            cells: HashMap::new(),
            functions: BTreeMap::new(),
        };

        host.install(PRIMITIVES.add as u32, "add", 2, |a| primitives::add(a[0], a[1]));
        host.install(PRIMITIVES.sub as u32, "sub", 2, |a| primitives::sub(a[0], a[1]));
        host.install(PRIMITIVES.mul as u32, "mul", 2, |a| primitives::mul(a[0], a[1]));
        host.install(PRIMITIVES.negate as u32, "negate", 1, |a| primitives::negate(a[0]));

        host
    }

    fn install(
        &mut self,
        address: u32,
        name: &str,
        arity: usize,
        body: impl Fn(&[i32]) -> i32 + 'static,
    ) {
        self.functions.insert(
            address,
            Function {
                name: name.to_string(),
                arity,
                body: Box::new(body),
            },
        );
    }

    /// Binds `name` to a fresh memory cell holding `value`
    pub fn variable(mut self, name: &str, value: i32) -> Self {
        let address = VARIABLE_BASE + 4 * self.cells.len() as u32;
        self.cells.insert(address, value as u32);
        self.externs.push((name.to_string(), address));
        self
    }

    /// Binds `name` to a host function reading `arity` arguments
    pub fn function(
        mut self,
        name: &str,
        arity: usize,
        body: impl Fn(&[i32]) -> i32 + 'static,
    ) -> Self {
        let address = FUNCTION_BASE + 4 * self.externs.len() as u32;
        self.install(address, name, arity, body);
        self.externs.push((name.to_string(), address));
        self
    }

    /// Compiles `source` against this host's bindings, then executes the routine
    pub fn run(&self, source: &str) -> Result<Run> {
        let externs = self
            .externs
            .iter()
            .map(|(name, address)| Extern::new(name, *address as usize))
            .collect::<Vec<_>>();

        let mut bytes = vec![0u8; CODE_CAPACITY];
        let mut out = CodeBuffer::new(&mut bytes);
        let written = armjit::compile_with(
            source,
            &externs,
            &mut out,
            Some(CompilerConfig {
                primitives: PRIMITIVES,
            }),
        )?;

        let code = bytes[..written]
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect();

        Machine::new(self, code).run()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

struct Machine<'h> {
    host: &'h Host,
    registers: [u32; 16],
    code: Vec<u32>,
    memory: HashMap<u32, u32>,
    calls: Vec<Call>,
}

impl<'h> Machine<'h> {
    fn new(host: &'h Host, code: Vec<u32>) -> Self {
        let mut registers = [0u32; 16];
        for (index, register) in registers.iter_mut().enumerate() {
            *register = callee_saved_pattern(index);
        }
        registers[SP] = STACK_TOP;
        registers[LR] = RETURN_ADDRESS;
        registers[PC] = CODE_BASE;

        Self {
            host,
            registers,
            code,
            memory: host.cells.clone(),
            calls: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Run> {
        for _ in 0..STEP_LIMIT {
            let pc = self.registers[PC];
            if pc == RETURN_ADDRESS {
                return self.finish();
            }

            let word = self.fetch(pc)?;
            self.step(word)?;
        }

        bail!("no return after {STEP_LIMIT} instructions")
    }

    fn finish(self) -> Result<Run> {
        if self.registers[SP] != STACK_TOP {
            bail!("returned with sp {:#x}, expected {STACK_TOP:#x}", self.registers[SP]);
        }
        for index in 4..=11 {
            if self.registers[index] != callee_saved_pattern(index) {
                bail!("r{index} was not preserved");
            }
        }

        Ok(Run {
            result: self.registers[0] as i32,
            calls: self.calls,
        })
    }

    /// Reads a register as an operand; `pc` reads as the current instruction plus 8
    fn read(&self, register: usize) -> u32 {
        match register {
            PC => self.registers[PC].wrapping_add(8),
            _ => self.registers[register],
        }
    }

    fn code_index(&self, address: u32) -> Option<usize> {
        let offset = address.checked_sub(CODE_BASE)? as usize;
        (offset / 4 < self.code.len()).then_some(offset / 4)
    }

    fn fetch(&self, pc: u32) -> Result<u32> {
        match self.code_index(pc) {
            Some(index) if pc % 4 == 0 => Ok(self.code[index]),
            _ => bail!("pc {pc:#x} left the generated code"),
        }
    }

    fn load(&self, address: u32) -> Result<u32> {
        if address % 4 != 0 {
            bail!("unaligned load from {address:#x}");
        }
        if let Some(index) = self.code_index(address) {
            return Ok(self.code[index]);
        }

        self.memory
            .get(&address)
            .copied()
            .ok_or_else(|| anyhow!("load from unmapped or unwritten {address:#x}"))
    }

    fn store(&mut self, address: u32, value: u32) -> Result<()> {
        if address % 4 != 0 {
            bail!("unaligned store to {address:#x}");
        }
        if !(STACK_TOP - STACK_SIZE..STACK_TOP).contains(&address) {
            bail!("store outside the stack at {address:#x}");
        }

        self.memory.insert(address, value);
        Ok(())
    }

    fn step(&mut self, word: u32) -> Result<()> {
        let pc = self.registers[PC];
        let rn = ((word >> 16) & 0xF) as usize;
        let rd = ((word >> 12) & 0xF) as usize;
        let rm = (word & 0xF) as usize;
        let mut next = pc.wrapping_add(4);

        match word {
            // str rd, [sp, #-4]!
            w if w & 0xFFFF_0FFF == 0xE52D_0004 => {
                let sp = self.registers[SP].wrapping_sub(4);
                self.store(sp, self.read(rd))?;
                self.registers[SP] = sp;
            }
            // ldr rd, [sp], #4
            w if w & 0xFFFF_0FFF == 0xE49D_0004 => {
                let sp = self.registers[SP];
                self.registers[rd] = self.load(sp)?;
                self.registers[SP] = sp.wrapping_add(4);
            }
            w if w & 0xFFFF_0FF0 == 0xE1A0_0000 => self.registers[rd] = self.read(rm),
            w if w & 0xFFF0_0000 == 0xE280_0000 => {
                self.registers[rd] = self.read(rn).wrapping_add(immediate(w));
            }
            w if w & 0xFFF0_0000 == 0xE240_0000 => {
                self.registers[rd] = self.read(rn).wrapping_sub(immediate(w));
            }
            w if w & 0xFFF0_0000 == 0xE590_0000 => {
                self.registers[rd] = self.load(self.read(rn).wrapping_add(w & 0xFFF))?;
            }
            w if w & 0xFFF0_0000 == 0xE580_0000 => {
                self.store(self.read(rn).wrapping_add(w & 0xFFF), self.read(rd))?;
            }
            w if w & 0xFFFF_FFF0 == 0xE12F_FF10 => next = self.read(rm),
            w if w & 0xFFFF_FFF0 == 0xE12F_FF30 => {
                self.registers[LR] = next;
                self.call(self.read(rm))?;
            }
            w if w & 0xFF00_0000 == 0xEA00_0000 => {
                let offset = (((w & 0x00FF_FFFF) << 8) as i32 >> 6) as u32;
                next = pc.wrapping_add(8).wrapping_add(offset);
            }
            w => bail!("undefined instruction {w:#010x} at {pc:#x}"),
        }

        self.registers[PC] = next;
        Ok(())
    }

    /// Services a `blx` into the host. The callee returns straight to lr.
    fn call(&mut self, target: u32) -> Result<()> {
        let sp = self.registers[SP];
        if sp % 8 != 0 {
            bail!("call to {target:#x} with misaligned sp {sp:#x}");
        }

        let host = self.host;
        let function = host
            .functions
            .get(&target)
            .ok_or_else(|| anyhow!("call to unmapped address {target:#x}"))?;

        let arguments = (0..function.arity)
            .map(|index| match index {
                0..4 => Ok(self.registers[index] as i32),
                _ => self.load(sp + 4 * (index as u32 - 4)).map(|v| v as i32),
            })
            .collect::<Result<Vec<_>>>()?;

        self.registers[0] = (function.body)(&arguments) as u32;
        for index in [1, 2, 3, 12] {
            self.registers[index] = CLOBBERED;
        }

        self.calls.push(Call {
            callee: function.name.clone(),
            arguments,
        });
        Ok(())
    }
}

/// Decodes an A32 modified immediate
fn immediate(word: u32) -> u32 {
    let rotation = (word >> 8) & 0xF;
    (word & 0xFF).rotate_right(rotation * 2)
}

/// Initial value of each register, distinct so that a clobbered callee-saved register shows
fn callee_saved_pattern(index: usize) -> u32 {
    0xC0DE_0000 | index as u32
}
