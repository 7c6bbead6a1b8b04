pub mod token;

use log::debug;
use quick_error::quick_error;
use std::{iter::Peekable, vec::IntoIter};
use token::{Operator, Punctuation, Token, TokenType};

quick_error! {
    #[derive(Debug, PartialEq, Eq)]
    pub enum Error {
        UnknownSymbolError(char: char, column: usize) {
            display("Unknown Symbol: {:?}\nColumn: {}", char, column)
        }
        NumberOverflowError(digits: String, column: usize) {
            display("Number literal does not fit in 32 bits: {}\nColumn: {}", digits, column)
        }
    }
}

/// Splits an expression into tokens in a single left-to-right pass.
pub struct Tokenizer {
    chars: Peekable<IntoIter<char>>,
    column: usize,
}

impl From<String> for Tokenizer {
    fn from(input: String) -> Self {
        Self::from(input.as_str())
    }
}

impl From<&str> for Tokenizer {
    fn from(input: &str) -> Self {
        Self {
            chars: input.chars().collect::<Vec<_>>().into_iter().peekable(),
            column: 0,
        }
    }
}

impl Tokenizer {
    /// Consumes the next character, advancing the column counter
    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.column += 1;
        Some(c)
    }

    /// Peeks the next character without consuming it
    ///
    /// # Important
    /// This does not increment the column counter
    fn peek_next_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Returns the next token in the stream, or `None` once the input is exhausted
    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        while let Some(next_char) = self.next_char() {
            // whitespace only separates tokens
            if next_char.is_ascii_whitespace() {
                continue;
            }

            return match next_char {
                '0'..='9' => self.tokenize_number(next_char).map(Some),
                c if c.is_ascii_alphabetic() => Ok(Some(self.tokenize_identifier(next_char))),
                _ => self.tokenize_symbol(next_char).map(Some),
            };
        }

        Ok(None)
    }

    fn tokenize_symbol(&mut self, symbol: char) -> Result<Token, Error> {
        macro_rules! symbol {
            ($kind:ident :: $variant:ident) => {
                Ok(Token::new(TokenType::$kind($kind::$variant), self.column))
            };
        }

        match symbol {
            '(' => symbol!(Punctuation::OpenParen),
            ')' => symbol!(Punctuation::CloseParen),
            ',' => symbol!(Punctuation::Comma),
            '+' => symbol!(Operator::Plus),
            '-' => symbol!(Operator::Minus),
            '*' => symbol!(Operator::Mul),
            _ => Err(Error::UnknownSymbolError(symbol, self.column)),
        }
    }

    /// Accumulates a run of decimal digits. Any non-digit ends the literal and is left for the
    /// next call to `next_token`.
    fn tokenize_number(&mut self, first_digit: char) -> Result<Token, Error> {
        let column = self.column;
        let mut digits = String::from(first_digit);
        let mut value = Some(digit_value(first_digit));

        while let Some(next_char) = self.peek_next_char() {
            if !next_char.is_ascii_digit() {
                break;
            }
            self.next_char();
            digits.push(next_char);

            value = value
                .and_then(|v| v.checked_mul(10))
                .and_then(|v| v.checked_add(digit_value(next_char)));
        }

        match value {
            Some(value) => Ok(Token::new(TokenType::Number(value), column)),
            None => Err(Error::NumberOverflowError(digits, column)),
        }
    }

    /// Accumulates a run of ASCII letters. Digits are not part of identifiers.
    fn tokenize_identifier(&mut self, first_char: char) -> Token {
        let column = self.column;
        let mut buffer = String::from(first_char);

        while let Some(next_char) = self.peek_next_char() {
            if !next_char.is_ascii_alphabetic() {
                break;
            }
            self.next_char();
            buffer.push(next_char);
        }

        Token::new(TokenType::Identifier(buffer), column)
    }
}

fn digit_value(c: char) -> u32 {
    c as u32 - '0' as u32
}

impl Iterator for Tokenizer {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Tokenizes the whole input, stopping at the first error
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let tokens = Tokenizer::from(source).collect::<Result<Vec<_>, _>>()?;
    debug!("tokenized {} characters into {} tokens", source.len(), tokens.len());
    Ok(tokens)
}
