#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    /// The type of the token
    pub token_type: TokenType,
    /// The column (1-based) where the token starts
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, column: usize) -> Self {
        Self { token_type, column }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token_type)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenType {
    /// Unsigned decimal integer literal
    Number(u32),
    /// `(`, `)` or `,`
    Punctuation(Punctuation),
    /// `+`, `-` or `*`
    Operator(Operator),
    /// A run of ASCII letters
    Identifier(String),
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Number(n) => write!(f, "{}", n),
            TokenType::Punctuation(p) => write!(f, "{}", p),
            TokenType::Operator(o) => write!(f, "{}", o),
            TokenType::Identifier(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Punctuation {
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `,`
    Comma,
}

impl std::fmt::Display for Punctuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Punctuation::OpenParen => write!(f, "("),
            Punctuation::CloseParen => write!(f, ")"),
            Punctuation::Comma => write!(f, ","),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operator {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Mul,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Plus => write!(f, "+"),
            Operator::Minus => write!(f, "-"),
            Operator::Mul => write!(f, "*"),
        }
    }
}
