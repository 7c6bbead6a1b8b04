use crate::{
    primitives::Primitives,
    symbols::{self, SymbolTable},
};
use il::{Instruction, Instructions, Register, Word};
use log::{debug, trace};
use parser::tree_node::{BinaryExpression, Expression, InvocationExpression, Operator};
use quick_error::quick_error;

quick_error! {
    #[derive(Debug, PartialEq, Eq)]
    pub enum Error {
        VariableNotFound(name: String) {
            display("Variable `{name}` is not defined by any extern")
        }
        MissingFunction(name: String) {
            display("Function `{name}` is not defined by any extern")
        }
        AddressOutOfRange(name: String, address: usize) {
            display("Address {address:#x} of `{name}` does not fit in 32 bits")
        }
        TooManyArguments(name: String, count: usize) {
            display("`{name}` is called with {count} arguments, more than can be addressed on the stack")
        }
    }
}

/// Largest `ldr`/`str` immediate offset
const MAX_OFFSET: usize = 0xFFF;
/// Largest stack adjustment, in words, made by one `add`/`sub`. `#0x3fc` is always encodable.
const MAX_STACK_ADJUST: usize = 255;
/// Words the prologue pushes: r4, r5 and lr
const SAVED_REGISTERS: isize = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct CompilerConfig {
    /// Entry points of the operator primitives
    pub primitives: Primitives,
}

/// Stack-machine code generator.
///
/// Every node leaves exactly one word on the native stack. The routine saves r4, r5 and lr on
/// entry, pops the final result into r0 and returns through lr. Callees are reached with
/// `blx r4` and always see an 8-byte aligned stack.
pub struct Compiler<'a> {
    symbols: &'a SymbolTable,
    config: CompilerConfig,
    instructions: Instructions,
    /// Words pushed since routine entry, where sp was 8-byte aligned
    depth: isize,
}

impl<'a> Compiler<'a> {
    pub fn new(symbols: &'a SymbolTable, config: Option<CompilerConfig>) -> Self {
        Self {
            symbols,
            config: config.unwrap_or_default(),
            instructions: Instructions::default(),
            depth: 0,
        }
    }

    /// Generates the complete routine for `expr`
    pub fn compile(mut self, expr: &Expression) -> Result<Instructions, Error> {
        self.prologue();
        self.expression(expr)?;
        self.epilogue();

        debug_assert_eq!(0, self.depth, "routine leaves the stack unbalanced");
        debug!(
            "generated {} words for {} nodes",
            self.instructions.len(),
            expr.node_count()
        );

        Ok(self.instructions)
    }

    fn emit(&mut self, instruction: Instruction) {
        self.depth += instruction.stack_effect();
        self.instructions.push(instruction.into());
    }

    fn prologue(&mut self) {
        self.emit(Instruction::Push(Register::R4));
        self.emit(Instruction::Push(Register::R5));
        self.emit(Instruction::Push(Register::LR));
        debug_assert_eq!(SAVED_REGISTERS, self.depth);
    }

    fn epilogue(&mut self) {
        self.emit(Instruction::Pop(Register::R0));
        self.emit(Instruction::Pop(Register::LR));
        self.emit(Instruction::Pop(Register::R5));
        self.emit(Instruction::Pop(Register::R4));
        self.emit(Instruction::BranchExchange(Register::LR));
    }

    /// Loads `value` into r0 from a word placed inline and branched over
    fn load_literal(&mut self, value: u32) {
        self.emit(Instruction::Move(Register::R0, Register::PC));
        self.emit(Instruction::AddImmediate(Register::R0, Register::R0, 8));
        self.emit(Instruction::Load(Register::R0, Register::R0, 0));
        self.emit(Instruction::Skip);
        self.instructions.push(Word::Literal(value));
    }

    fn expression(&mut self, expr: &Expression) -> Result<(), Error> {
        trace!("{expr}");
        let depth = self.depth;

        match expr {
            Expression::Literal(value) => self.literal(*value),
            Expression::Variable(name) => self.variable(name)?,
            Expression::Invocation(InvocationExpression { name, arguments }) => {
                let callee = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| Error::MissingFunction(name.clone()))?;
                let arguments = arguments.iter().collect::<Vec<_>>();
                self.callable(name, &arguments, callee)?;
            }
            Expression::Binary(binary) => self.binary(binary)?,
            Expression::Negation(inner) => {
                self.expression(inner)?;
                self.primitive(Operator::Negate)?;
            }
        }

        debug_assert_eq!(depth + 1, self.depth, "a node must push exactly one word");
        Ok(())
    }

    fn literal(&mut self, value: u32) {
        self.load_literal(value);
        self.emit(Instruction::Push(Register::R0));
    }

    fn variable(&mut self, name: &str) -> Result<(), Error> {
        let address = self
            .symbols
            .resolve(name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))?;

        self.load_literal(symbols::literal_address(name, address)?);
        self.emit(Instruction::Load(Register::R0, Register::R0, 0));
        self.emit(Instruction::Push(Register::R0));
        Ok(())
    }

    /// Walks a chain of left-nested binary nodes from the innermost one outwards. Only right
    /// operands recurse.
    fn binary(&mut self, binary: &BinaryExpression) -> Result<(), Error> {
        let (first, spine) = binary.left_spine();
        self.expression(first)?;

        for node in spine {
            let [_, rhs] = node.operands();
            self.expression(rhs)?;
            self.primitive(node.operator())?;
        }

        Ok(())
    }

    /// Calls the primitive for `operator` on the operands on top of the stack
    fn primitive(&mut self, operator: Operator) -> Result<(), Error> {
        let callee = self.config.primitives.address(operator);
        self.call(Primitives::name(operator), operator.arity(), callee)
    }

    /// Evaluates `arguments` left to right, calls `callee` with them and pushes its result
    fn callable(
        &mut self,
        name: &str,
        arguments: &[&Expression],
        callee: usize,
    ) -> Result<(), Error> {
        for argument in arguments {
            self.expression(argument)?;
        }

        self.call(name, arguments.len(), callee)
    }

    /// Calls `callee` with the top `count` stack words as arguments, the deepest one first,
    /// and replaces them with its result
    fn call(&mut self, name: &str, count: usize, callee: usize) -> Result<(), Error> {
        self.load_literal(symbols::literal_address(name, callee)?);
        self.emit(Instruction::Move(Register::R4, Register::R0));

        if count <= Register::ARGUMENTS.len() {
            for register in Register::ARGUMENTS[..count].iter().rev() {
                self.emit(Instruction::Pop(*register));
            }
            self.aligned_call();
        } else {
            self.spill_call(name, count)?;
        }

        self.emit(Instruction::Push(Register::R0));
        Ok(())
    }

    fn aligned_call(&mut self) {
        if self.depth % 2 == 0 {
            self.emit(Instruction::BranchLinkExchange(Register::R4));
        } else {
            self.emit(Instruction::SubImmediate(Register::SP, Register::SP, 4));
            self.emit(Instruction::BranchLinkExchange(Register::R4));
            self.emit(Instruction::AddImmediate(Register::SP, Register::SP, 4));
        }
    }

    /// Calls r4 with more arguments than there are argument registers.
    ///
    /// All `count` values are on the stack, the last one on top. Below them an outgoing area is
    /// reserved and filled with arguments five onwards in ascending order, padded to keep sp
    /// aligned. The first four are then loaded into r0-r3 from their slots, and the call is
    /// followed by releasing both the outgoing area and the evaluated values.
    fn spill_call(&mut self, name: &str, count: usize) -> Result<(), Error> {
        let stacked = count - Register::ARGUMENTS.len();
        let padding = (self.depth as usize + stacked) % 2;
        let reserved = stacked + padding;

        // The first argument sits deepest
        if (reserved + count - 1) * 4 > MAX_OFFSET {
            return Err(Error::TooManyArguments(name.to_string(), count));
        }
        let slot = |words: usize| (words * 4) as u32;

        self.grow_stack(reserved);
        for j in 0..stacked {
            self.emit(Instruction::Load(
                Register::R5,
                Register::SP,
                slot(reserved + count - 5 - j),
            ));
            self.emit(Instruction::Store(Register::R5, Register::SP, slot(j)));
        }
        for (i, register) in Register::ARGUMENTS.iter().enumerate() {
            self.emit(Instruction::Load(
                *register,
                Register::SP,
                slot(reserved + count - 1 - i),
            ));
        }

        debug_assert_eq!(0, self.depth % 2);
        self.emit(Instruction::BranchLinkExchange(Register::R4));
        self.shrink_stack(reserved + count);

        Ok(())
    }

    fn grow_stack(&mut self, words: usize) {
        for chunk in stack_chunks(words) {
            self.emit(Instruction::SubImmediate(Register::SP, Register::SP, chunk));
        }
    }

    fn shrink_stack(&mut self, words: usize) {
        for chunk in stack_chunks(words) {
            self.emit(Instruction::AddImmediate(Register::SP, Register::SP, chunk));
        }
    }
}

/// Splits a stack adjustment into byte immediates that each encode in one instruction
fn stack_chunks(words: usize) -> impl Iterator<Item = u32> {
    let full = words / MAX_STACK_ADJUST;
    let rest = words % MAX_STACK_ADJUST;

    std::iter::repeat_n(MAX_STACK_ADJUST, full)
        .chain((rest > 0).then_some(rest))
        .map(|chunk| (chunk * 4) as u32)
}
