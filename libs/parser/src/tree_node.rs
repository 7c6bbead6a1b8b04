/// The operation an [`Expression::Binary`] or [`Expression::Negation`] node performs.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Mul,
    Negate,
}

impl Operator {
    /// Number of operands the operator consumes
    pub fn arity(self) -> usize {
        match self {
            Operator::Negate => 1,
            Operator::Plus | Operator::Minus | Operator::Mul => 2,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Plus => write!(f, "+"),
            Operator::Minus | Operator::Negate => write!(f, "-"),
            Operator::Mul => write!(f, "*"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BinaryExpression {
    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
}

impl BinaryExpression {
    pub fn operator(&self) -> Operator {
        match self {
            BinaryExpression::Add(..) => Operator::Plus,
            BinaryExpression::Subtract(..) => Operator::Minus,
            BinaryExpression::Multiply(..) => Operator::Mul,
        }
    }

    /// The left and right operands, in evaluation order
    pub fn operands(&self) -> [&Expression; 2] {
        match self {
            BinaryExpression::Add(l, r)
            | BinaryExpression::Subtract(l, r)
            | BinaryExpression::Multiply(l, r) => [&**l, &**r],
        }
    }

    /// Follows left operands down through nested binary nodes.
    ///
    /// Returns the first left operand that is not binary, and the binary nodes passed on the
    /// way, innermost first. A chain of `+`/`-` or `*` folds is as long as the input, so walkers
    /// iterate over it instead of recursing.
    pub fn left_spine(&self) -> (&Expression, Vec<&BinaryExpression>) {
        let mut spine = vec![self];
        let [mut lhs, _] = self.operands();

        while let Expression::Binary(binary) = lhs {
            spine.push(binary);
            lhs = binary.operands()[0];
        }
        spine.reverse();

        (lhs, spine)
    }

    fn operands_mut(&mut self) -> [&mut Box<Expression>; 2] {
        match self {
            BinaryExpression::Add(l, r)
            | BinaryExpression::Subtract(l, r)
            | BinaryExpression::Multiply(l, r) => [l, r],
        }
    }
}

impl std::fmt::Display for BinaryExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (first, spine) = self.left_spine();

        write!(f, "{}{}", "(".repeat(spine.len()), first)?;
        for binary in spine {
            write!(f, " {} {})", binary.operator(), binary.operands()[1])?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InvocationExpression {
    pub name: String,
    pub arguments: Vec<Expression>,
}

impl std::fmt::Display for InvocationExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({})",
            self.name,
            self.arguments
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

/// A node of the expression tree. Every node owns its children.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Expression {
    /// An integer literal, kept as its 32-bit pattern
    Literal(u32),
    /// A named memory cell, resolved against the extern table during code generation
    Variable(String),
    /// A call to a named extern function
    Invocation(InvocationExpression),
    Binary(BinaryExpression),
    /// Unary minus
    Negation(Box<Expression>),
}

impl Expression {
    /// Counts every node of the tree, this one included
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];

        while let Some(node) = pending.pop() {
            count += 1;
            match node {
                Expression::Literal(_) | Expression::Variable(_) => {}
                Expression::Invocation(call) => pending.extend(call.arguments.iter()),
                Expression::Binary(expr) => pending.extend(expr.operands()),
                Expression::Negation(inner) => pending.push(&**inner),
            }
        }

        count
    }

    /// Moves the children of this node into `pending`, leaving literals in their place
    fn detach_children(&mut self, pending: &mut Vec<Expression>) {
        let placeholder = || Expression::Literal(0);

        match self {
            Expression::Literal(_) | Expression::Variable(_) => {}
            Expression::Invocation(call) => pending.append(&mut call.arguments),
            Expression::Binary(expr) => {
                for operand in expr.operands_mut() {
                    pending.push(std::mem::replace(&mut **operand, placeholder()));
                }
            }
            Expression::Negation(inner) => {
                pending.push(std::mem::replace(&mut **inner, placeholder()))
            }
        }
    }
}

/// Tears the tree down with an explicit work list, so dropping a long chain of folds does not
/// recurse once per node.
impl Drop for Expression {
    fn drop(&mut self) {
        if matches!(self, Expression::Literal(_) | Expression::Variable(_)) {
            return;
        }

        let mut pending = Vec::new();
        self.detach_children(&mut pending);

        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Literal(n) => write!(f, "{}", n),
            Expression::Variable(id) => write!(f, "{}", id),
            Expression::Invocation(e) => write!(f, "{}", e),
            Expression::Binary(e) => write!(f, "{}", e),
            Expression::Negation(e) => write!(f, "(-{})", e),
        }
    }
}
