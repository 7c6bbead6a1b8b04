#[macro_export]
macro_rules! parser {
    ($input:expr) => {
        Parser::new(Tokenizer::from($input))
    };
}


use super::Parser;
use super::Tokenizer;
use crate::Error;
use crate::tree_node::{BinaryExpression, Expression};
use anyhow::Result;
use pretty_assertions::assert_eq;

#[test]
fn test_literal() -> Result<()> {
    let mut parser = parser!("42");

    assert_eq!(Expression::Literal(42), parser.parse()?);

    Ok(())
}

#[test]
fn test_variable() -> Result<()> {
    let mut parser = parser!("value");

    assert_eq!(Expression::Variable(String::from("value")), parser.parse()?);

    Ok(())
}

#[test]
fn test_multiplication_binds_tighter() -> Result<()> {
    let mut parser = parser!("2+3*4");

    let expression = parser.parse()?;

    assert_eq!("(2 + (3 * 4))", expression.to_string());

    let Expression::Binary(BinaryExpression::Add(_, rhs)) = &expression else {
        panic!("Expected an addition at the root, got {:?}", expression);
    };
    assert_eq!(
        **rhs,
        Expression::Binary(BinaryExpression::Multiply(
            Box::new(Expression::Literal(3)),
            Box::new(Expression::Literal(4)),
        ))
    );

    Ok(())
}

#[test]
fn test_left_associativity() -> Result<()> {
    assert_eq!("((10 - 3) - 2)", parser!("10-3-2").parse()?.to_string());
    assert_eq!("((1 + 2) - 3)", parser!("1 + 2 - 3").parse()?.to_string());
    assert_eq!("((2 * 3) * 4)", parser!("2 * 3 * 4").parse()?.to_string());

    Ok(())
}

#[test]
fn test_leading_minus_negates_first_term() -> Result<()> {
    assert_eq!("((-3) + 4)", parser!("-3+4").parse()?.to_string());
    assert_eq!("((-(2 * x)) + 1)", parser!("-2*x+1").parse()?.to_string());

    let expression = parser!("3-4").parse()?;
    assert_eq!(
        expression,
        Expression::Binary(BinaryExpression::Subtract(
            Box::new(Expression::Literal(3)),
            Box::new(Expression::Literal(4)),
        ))
    );

    Ok(())
}

#[test]
fn test_leading_minus_inside_parentheses() -> Result<()> {
    assert_eq!("(2 * (-x))", parser!("2*(-x)").parse()?.to_string());
    assert_eq!("(-(1 - 2))", parser!("-(1-2)").parse()?.to_string());

    Ok(())
}

#[test]
fn test_parentheses_override_precedence() -> Result<()> {
    assert_eq!("((2 + 3) * 4)", parser!("(2+3)*4").parse()?.to_string());
    assert_eq!("(a * (b - c))", parser!("a * (b - c)").parse()?.to_string());
    assert_eq!("7", parser!("(((7)))").parse()?.to_string());

    Ok(())
}

#[test]
fn test_every_token_consumed() -> Result<()> {
    for source in ["(1 + 2 * 3 - 4)", "(-(a) * f(x, 2))", "(g(1, (2)))", "-(4)"] {
        let tokens = tokenizer::tokenize(source)?;
        assert_eq!(
            crate::parse(source)?.to_string(),
            crate::parse_tokens(&tokens)?.to_string()
        );

        // no proper prefix of these is a complete expression
        for end in 0..tokens.len() {
            let error = crate::parse_tokens(&tokens[..end]).err();

            assert!(
                matches!(
                    error,
                    Some(
                        Error::UnexpectedEOF
                            | Error::UnclosedParenthesis(_)
                            | Error::UnterminatedArguments(_)
                    )
                ),
                "`{source}` cut after {end} tokens: {error:?}"
            );
        }

        for extra in ["7", "y", ")", ","] {
            let error = crate::parse(&format!("{source} {extra}")).err();

            assert!(
                matches!(
                    error,
                    Some(Error::TrailingToken(ref token)) if token.column == source.len() + 2
                ),
                "`{source} {extra}`: {error:?}"
            );
        }
    }

    Ok(())
}

#[test]
fn test_long_chains_of_folds() -> Result<()> {
    let sum = crate::parse(&vec!["1"; 50_000].join("+"))?;
    let product = crate::parse(&vec!["x"; 50_000].join(" * "))?;
    let mixed = crate::parse(&format!("-{}", vec!["2*y"; 20_000].join("-")))?;

    assert_eq!(99_999, sum.node_count());
    assert_eq!(99_999, product.node_count());
    // 20000 products of three nodes, 19999 subtractions and the leading negation
    assert_eq!(80_000, mixed.node_count());

    let printed = sum.to_string();
    assert!(printed.starts_with(&format!("{}1 + 1)", "(".repeat(49_999))));
    assert!(printed.ends_with(" + 1) + 1)"));

    Ok(())
}
