//! The native callees behind the arithmetic operators.

use parser::tree_node::Operator;

/// `x + y`, wrapping
pub extern "C" fn add(x: i32, y: i32) -> i32 {
    x.wrapping_add(y)
}

/// `x - y`, wrapping
pub extern "C" fn sub(x: i32, y: i32) -> i32 {
    x.wrapping_sub(y)
}

/// `x * y`, wrapping
pub extern "C" fn mul(x: i32, y: i32) -> i32 {
    x.wrapping_mul(y)
}

/// `-x`, wrapping
pub extern "C" fn negate(x: i32) -> i32 {
    x.wrapping_neg()
}

type Binary = extern "C" fn(i32, i32) -> i32;
type Unary = extern "C" fn(i32) -> i32;

/// Entry points called for each operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitives {
    pub add: usize,
    pub sub: usize,
    pub mul: usize,
    pub negate: usize,
}

impl Primitives {
    /// The functions above, as linked into this process
    pub fn native() -> Self {
        Self {
            add: add as Binary as usize,
            sub: sub as Binary as usize,
            mul: mul as Binary as usize,
            negate: negate as Unary as usize,
        }
    }

    pub fn address(&self, operator: Operator) -> usize {
        match operator {
            Operator::Plus => self.add,
            Operator::Minus => self.sub,
            Operator::Mul => self.mul,
            Operator::Negate => self.negate,
        }
    }

    /// Name reported when the primitive's address cannot be embedded
    pub fn name(operator: Operator) -> &'static str {
        match operator {
            Operator::Plus => "add",
            Operator::Minus => "sub",
            Operator::Mul => "mul",
            Operator::Negate => "negate",
        }
    }
}

impl Default for Primitives {
    fn default() -> Self {
        Self::native()
    }
}
