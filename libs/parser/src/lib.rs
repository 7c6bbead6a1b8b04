#[cfg(test)]
mod test;

pub mod tree_node;

use log::debug;
use quick_error::quick_error;
use tokenizer::{
    self, Tokenizer,
    token::{Operator, Punctuation, Token, TokenType},
};
use tree_node::{BinaryExpression, Expression, InvocationExpression};

/// Deepest nesting of parenthesized expressions and call arguments the parser accepts.
pub const MAX_NESTING: usize = 256;

#[macro_export]
/// A macro to create a boxed value.
macro_rules! boxed {
    ($e:expr) => {
        Box::new($e)
    };
}

quick_error! {
    #[derive(Debug, PartialEq, Eq)]
    pub enum Error {
        TokenizerError(err: tokenizer::Error) {
            from()
            display("Tokenizer Error: {}", err)
            source(err)
        }
        UnexpectedToken(token: Token) {
            display("Unexpected token `{}` at column {}", token, token.column)
        }
        TrailingToken(token: Token) {
            display("Unexpected token `{}` after the end of the expression at column {}", token, token.column)
        }
        UnclosedParenthesis(open: Token) {
            display("Parenthesis opened at column {} is never closed", open.column)
        }
        UnterminatedArguments(name: Token) {
            display("Expected `,` or `)` in the arguments of `{}` (column {})", name, name.column)
        }
        NestingTooDeep {
            display("Expression is nested deeper than {} levels", MAX_NESTING)
        }
        UnexpectedEOF {
            display("Unexpected EOF")
        }
    }
}

macro_rules! token_matches {
    ($token:expr, $pattern:pat) => {
        matches!($token, Some(Token { token_type: $pattern, .. }))
    };
}

/// Recursive descent parser. Every production takes the index of its first token and returns
/// the built subtree together with the index of the first token it did not consume.
pub struct Parser {
    tokenizer: Tokenizer,
    tokens: Vec<Token>,
}

impl Parser {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Parser {
            tokenizer,
            tokens: Vec::new(),
        }
    }

    /// Parses the whole input into a single expression. Every token must be consumed.
    pub fn parse(&mut self) -> Result<Expression, Error> {
        self.tokens = self.tokenizer.by_ref().collect::<Result<Vec<_>, _>>()?;
        let expression = parse_tokens(&self.tokens)?;

        debug!(
            "parsed {} tokens into {} nodes: {}",
            self.tokens.len(),
            expression.node_count(),
            expression
        );

        Ok(expression)
    }
}

/// Parses an already tokenized expression
pub fn parse_tokens(tokens: &[Token]) -> Result<Expression, Error> {
    let (expression, next) = Productions { tokens }.additive(0, 0)?;

    match tokens.get(next) {
        Some(token) => Err(Error::TrailingToken(token.clone())),
        None => Ok(expression),
    }
}

/// Tokenizes and parses `source`
pub fn parse(source: &str) -> Result<Expression, Error> {
    Parser::new(Tokenizer::from(source)).parse()
}

struct Productions<'a> {
    tokens: &'a [Token],
}

impl<'a> Productions<'a> {
    fn token(&self, index: usize) -> Option<&'a Token> {
        self.tokens.get(index)
    }

    /// Fails with `UnexpectedEOF` when a production starts past the last token
    fn expect_token(&self, index: usize) -> Result<&'a Token, Error> {
        self.token(index).ok_or(Error::UnexpectedEOF)
    }

    /// `['-'] MulExpr (('+' | '-') MulExpr)*`
    ///
    /// The leading minus is only recognized here, once, and negates the first term only.
    fn additive(&self, index: usize, depth: usize) -> Result<(Expression, usize), Error> {
        if depth > MAX_NESTING {
            return Err(Error::NestingTooDeep);
        }

        let mut index = index;
        let negate = token_matches!(
            Some(self.expect_token(index)?),
            TokenType::Operator(Operator::Minus)
        );
        if negate {
            index += 1;
        }

        let (mut lhs, next) = self.multiplicative(index, depth)?;
        index = next;
        if negate {
            lhs = Expression::Negation(boxed!(lhs));
        }

        loop {
            let token = self.token(index);
            if !token_matches!(token, TokenType::Operator(Operator::Plus | Operator::Minus)) {
                break;
            }

            let (rhs, next) = self.multiplicative(index + 1, depth)?;
            lhs = match token {
                Some(Token {
                    token_type: TokenType::Operator(Operator::Plus),
                    ..
                }) => Expression::Binary(BinaryExpression::Add(boxed!(lhs), boxed!(rhs))),
                _ => Expression::Binary(BinaryExpression::Subtract(boxed!(lhs), boxed!(rhs))),
            };
            index = next;
        }

        Ok((lhs, index))
    }

    /// `Primary ('*' Primary)*`
    fn multiplicative(&self, index: usize, depth: usize) -> Result<(Expression, usize), Error> {
        let (mut lhs, mut index) = self.primary(index, depth)?;

        while token_matches!(self.token(index), TokenType::Operator(Operator::Mul)) {
            let (rhs, next) = self.primary(index + 1, depth)?;
            lhs = Expression::Binary(BinaryExpression::Multiply(boxed!(lhs), boxed!(rhs)));
            index = next;
        }

        Ok((lhs, index))
    }

    /// `NUMBER | IDENT '(' [AddExpr (',' AddExpr)*] ')' | IDENT | '(' AddExpr ')'`
    fn primary(&self, index: usize, depth: usize) -> Result<(Expression, usize), Error> {
        let current_token = self.expect_token(index)?;

        match current_token.token_type {
            TokenType::Number(value) => Ok((Expression::Literal(value), index + 1)),

            // an identifier directly followed by `(` is an invocation
            TokenType::Identifier(_)
                if token_matches!(
                    self.token(index + 1),
                    TokenType::Punctuation(Punctuation::OpenParen)
                ) =>
            {
                self.invocation(current_token, index + 2, depth)
            }

            TokenType::Identifier(ref name) => Ok((Expression::Variable(name.clone()), index + 1)),

            TokenType::Punctuation(Punctuation::OpenParen) => {
                let (expression, next) = self.additive(index + 1, depth + 1)?;

                if !token_matches!(
                    self.token(next),
                    TokenType::Punctuation(Punctuation::CloseParen)
                ) {
                    return Err(Error::UnclosedParenthesis(current_token.clone()));
                }

                Ok((expression, next + 1))
            }

            _ => Err(Error::UnexpectedToken(current_token.clone())),
        }
    }

    /// Parses the argument list of `name`, starting at the first token after `(`
    fn invocation(
        &self,
        name: &Token,
        index: usize,
        depth: usize,
    ) -> Result<(Expression, usize), Error> {
        let TokenType::Identifier(ref identifier) = name.token_type else {
            return Err(Error::UnexpectedToken(name.clone()));
        };

        let mut arguments = Vec::<Expression>::new();
        let mut index = index;

        if token_matches!(
            self.token(index),
            TokenType::Punctuation(Punctuation::CloseParen)
        ) {
            index += 1;
        } else {
            loop {
                let (argument, next) = self.additive(index, depth + 1)?;
                arguments.push(argument);

                match self.token(next) {
                    Some(Token {
                        token_type: TokenType::Punctuation(Punctuation::CloseParen),
                        ..
                    }) => {
                        index = next + 1;
                        break;
                    }
                    Some(Token {
                        token_type: TokenType::Punctuation(Punctuation::Comma),
                        ..
                    }) => index = next + 1,
                    _ => return Err(Error::UnterminatedArguments(name.clone())),
                }
            }
        }

        Ok((
            Expression::Invocation(InvocationExpression {
                name: identifier.clone(),
                arguments,
            }),
            index,
        ))
    }
}
