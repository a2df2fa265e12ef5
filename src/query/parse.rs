//! Filter expression parsing for the shell.
//!
//! Grammar is deliberately small because filters compose conjunctively
//! and nothing else: `<column> <op> <value>` terms separated by `,` or
//! `and`. Operators: `=`, `!=` (`<>`), `<`, `<=`, `>`, `>=`, `like`,
//! `is [not] null`. Values: numbers, quoted or bare strings, `null`,
//! `true`/`false`.

use std::fmt;

use anyhow::{Result, bail};

use super::{Filter, FilterOp, Value};

/// Parse a conjunctive filter expression like
/// `label = "good", score > 0.5 and target is not null`.
pub fn parse_filters(input: &str) -> Result<Vec<Filter>> {
    let mut tokens = tokenize(input)?.into_iter().peekable();
    if tokens.peek().is_none() {
        bail!("empty filter expression");
    }

    let mut filters = Vec::new();
    loop {
        let column = match tokens.next() {
            Some(Token::Ident(name)) => name,
            Some(tok) => bail!("expected a column name, found {tok}"),
            None => bail!("expected a column name"),
        };

        let filter = match tokens.next() {
            Some(Token::Op(op)) => {
                let op = comparison_op(&op);
                let value = parse_value(tokens.next())?;
                match (op, &value) {
                    (FilterOp::Eq, Value::Null) => Filter::is_null(&column)?,
                    (FilterOp::Ne, Value::Null) => Filter::is_not_null(&column)?,
                    (_, Value::Null) => {
                        bail!("null can only be compared with = or !=")
                    }
                    _ => Filter::new(&column, op, value)?,
                }
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("like") => {
                match tokens.next() {
                    Some(Token::Str(pattern)) | Some(Token::Ident(pattern)) => {
                        Filter::like(&column, pattern)?
                    }
                    _ => bail!("like requires a pattern"),
                }
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("is") => {
                match tokens.next() {
                    Some(Token::Ident(w)) if w.eq_ignore_ascii_case("null") => {
                        Filter::is_null(&column)?
                    }
                    Some(Token::Ident(w)) if w.eq_ignore_ascii_case("not") => {
                        match tokens.next() {
                            Some(Token::Ident(w)) if w.eq_ignore_ascii_case("null") => {
                                Filter::is_not_null(&column)?
                            }
                            _ => bail!("expected null after `is not`"),
                        }
                    }
                    _ => bail!("expected null after `is`"),
                }
            }
            Some(tok) => bail!("expected an operator after {column}, found {tok}"),
            None => bail!("expected an operator after {column}"),
        };
        filters.push(filter);

        match tokens.next() {
            None => break,
            Some(Token::Comma) => {}
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("and") => {}
            Some(tok) => bail!("expected ',' or 'and' between filters, found {tok}"),
        }
    }
    Ok(filters)
}

fn comparison_op(op: &str) -> FilterOp {
    match op {
        "=" | "==" => FilterOp::Eq,
        "!=" | "<>" => FilterOp::Ne,
        "<" => FilterOp::Lt,
        "<=" => FilterOp::Le,
        ">" => FilterOp::Gt,
        ">=" => FilterOp::Ge,
        // The tokenizer only produces the operators above.
        other => unreachable!("unknown operator token {other:?}"),
    }
}

fn parse_value(token: Option<Token>) -> Result<Value> {
    match token {
        Some(Token::Str(s)) => Ok(Value::Text(s)),
        Some(Token::Number(n)) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Integer(i))
            } else if let Ok(f) = n.parse::<f64>() {
                Ok(Value::Real(f))
            } else {
                bail!("invalid number: {n}")
            }
        }
        Some(Token::Ident(word)) => match word.to_ascii_lowercase().as_str() {
            "null" => Ok(Value::Null),
            "true" => Ok(Value::Integer(1)),
            "false" => Ok(Value::Integer(0)),
            _ => Ok(Value::Text(word)),
        },
        Some(tok) => bail!("expected a value, found {tok}"),
        None => bail!("expected a value"),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    Op(String),
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "`{s}`"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Number(s) => write!(f, "`{s}`"),
            Self::Op(s) => write!(f, "`{s}`"),
            Self::Comma => f.write_str("','"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => s.push(c),
                        None => bail!("unterminated string literal"),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Op("=".to_string()));
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    bail!("expected = after !");
                }
                tokens.push(Token::Op("!=".to_string()));
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Op("<=".to_string()));
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Op("<>".to_string()));
                    }
                    _ => tokens.push(Token::Op("<".to_string())),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(">=".to_string()));
                } else {
                    tokens.push(Token::Op(">".to_string()));
                }
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut s = String::new();
                s.push(c);
                chars.next();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(s));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(s));
            }
            other => bail!("unexpected character {other:?} in filter expression"),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FilterOp;

    #[test]
    fn single_equality() {
        let filters = parse_filters("label = \"good\"").unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].column.as_str(), "label");
        assert_eq!(filters[0].op, FilterOp::Eq);
        assert_eq!(filters[0].value, Value::text("good"));
    }

    #[test]
    fn double_equals_and_single_quotes() {
        let filters = parse_filters("label == 'good'").unwrap();
        assert_eq!(filters[0].op, FilterOp::Eq);
        assert_eq!(filters[0].value, Value::text("good"));
    }

    #[test]
    fn comma_and_word_separators() {
        let filters = parse_filters("a = 1, b > 2 and c < 3").unwrap();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[1].op, FilterOp::Gt);
        assert_eq!(filters[2].op, FilterOp::Lt);
    }

    #[test]
    fn numbers_integer_and_real() {
        let filters = parse_filters("n = 42, score >= 0.5, delta > -3").unwrap();
        assert_eq!(filters[0].value, Value::Integer(42));
        assert_eq!(filters[1].value, Value::Real(0.5));
        assert_eq!(filters[2].value, Value::Integer(-3));
    }

    #[test]
    fn null_comparisons_become_is_null() {
        let filters = parse_filters("target = null, target != null").unwrap();
        assert_eq!(filters[0].op, FilterOp::IsNull);
        assert_eq!(filters[1].op, FilterOp::IsNotNull);
    }

    #[test]
    fn is_null_forms() {
        let filters = parse_filters("target is null and target is not null").unwrap();
        assert_eq!(filters[0].op, FilterOp::IsNull);
        assert_eq!(filters[1].op, FilterOp::IsNotNull);
    }

    #[test]
    fn like_with_pattern() {
        let filters = parse_filters("data like \"%question%\"").unwrap();
        assert_eq!(filters[0].op, FilterOp::Like);
        assert_eq!(filters[0].value, Value::text("%question%"));
    }

    #[test]
    fn bare_word_is_text() {
        let filters = parse_filters("label = good").unwrap();
        assert_eq!(filters[0].value, Value::text("good"));
    }

    #[test]
    fn booleans_map_to_integers() {
        let filters = parse_filters("done = true, failed = false").unwrap();
        assert_eq!(filters[0].value, Value::Integer(1));
        assert_eq!(filters[1].value, Value::Integer(0));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_filters("").is_err());
        assert!(parse_filters("label").is_err());
        assert!(parse_filters("label =").is_err());
        assert!(parse_filters("= 3").is_err());
        assert!(parse_filters("a = 1 b = 2").is_err());
        assert!(parse_filters("a ~ 1").is_err());
        assert!(parse_filters("a = \"unterminated").is_err());
        assert!(parse_filters("a ! b").is_err());
    }

    #[test]
    fn rejects_null_with_range_operator() {
        assert!(parse_filters("a > null").is_err());
    }

    #[test]
    fn rejects_invalid_column_names() {
        assert!(parse_filters("1st = 2").is_err());
    }
}
