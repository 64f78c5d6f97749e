//! Entry rule DSL parser.
//!
//! The input is first split into tokens carrying their byte offset, then a
//! recursive descent over the tokens builds the AST. Errors point at the
//! offending token.
//!
//! ```text
//! rule     := CMP '(' operand ',' operand ')'
//!           | BETWEEN '(' operand ',' number ',' number ')'
//!           | (AND | OR) '(' rule (',' rule)+ ')'
//!           | NOT '(' rule ')'
//!           | (CONSECUTIVE | ANY_OF) '(' rule ',' integer ')'
//! CMP      := ABOVE | BELOW | EQUALS | CROSS_ABOVE | CROSS_BELOW
//! operand  := number | open | high | low | close | volatility | fear_and_greed | change
//! ```

use crate::domain::error::ParseError;
use crate::domain::rule::{Operand, Rule};

const FIELDS: &str = "open, high, low, close, volatility, fear_and_greed, change";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind<'a> {
    Word(&'a str),
    Number(&'a str),
    Open,
    Close,
    Comma,
    End,
}

impl Kind<'_> {
    fn describe(&self) -> String {
        match self {
            Kind::Word(text) | Kind::Number(text) => format!("'{text}'"),
            Kind::Open => "'('".to_string(),
            Kind::Close => "')'".to_string(),
            Kind::Comma => "','".to_string(),
            Kind::End => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: Kind<'a>,
    position: usize,
}

fn error(message: impl Into<String>, position: usize) -> ParseError {
    ParseError {
        message: message.into(),
        position,
    }
}

fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        let kind = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => Kind::Open,
            ')' => Kind::Close,
            ',' => Kind::Comma,
            c if c.is_alphabetic() || c == '_' => {
                let end = scan(&mut chars, input.len(), |c| c.is_alphanumeric() || c == '_');
                tokens.push(Token {
                    kind: Kind::Word(&input[start..end]),
                    position: start,
                });
                continue;
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                chars.next();
                let end = scan(&mut chars, input.len(), |c| c.is_ascii_digit() || c == '.');
                let text = &input[start..end];
                if text.parse::<f64>().is_err() {
                    return Err(error(format!("invalid number: {text}"), start));
                }
                tokens.push(Token {
                    kind: Kind::Number(text),
                    position: start,
                });
                continue;
            }
            other => return Err(error(format!("unexpected character '{other}'"), start)),
        };
        chars.next();
        tokens.push(Token {
            kind,
            position: start,
        });
    }

    tokens.push(Token {
        kind: Kind::End,
        position: input.len(),
    });
    Ok(tokens)
}

/// Consumes characters while `accept` holds; returns the end offset.
fn scan(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    len: usize,
    accept: impl Fn(char) -> bool,
) -> usize {
    while let Some(&(i, c)) = chars.peek() {
        if !accept(c) {
            return i;
        }
        chars.next();
    }
    len
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    next: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token<'a> {
        self.tokens[self.next.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token<'a> {
        let token = self.peek();
        if token.kind != Kind::End {
            self.next += 1;
        }
        token
    }

    fn expect(&mut self, kind: Kind<'static>) -> Result<(), ParseError> {
        let token = self.bump();
        if token.kind == kind {
            Ok(())
        } else {
            Err(error(
                format!("expected {}, found {}", kind.describe(), token.kind.describe()),
                token.position,
            ))
        }
    }

    fn operand(&mut self) -> Result<Operand, ParseError> {
        let token = self.bump();
        let operand = match token.kind {
            Kind::Number(text) => Operand::Constant(number_value(text, token.position)?),
            Kind::Word("open") => Operand::Open,
            Kind::Word("high") => Operand::High,
            Kind::Word("low") => Operand::Low,
            Kind::Word("close") => Operand::Close,
            Kind::Word("volatility") => Operand::Volatility,
            Kind::Word("fear_and_greed") => Operand::FearAndGreed,
            Kind::Word("change") => Operand::Change,
            other => {
                return Err(error(
                    format!("expected field ({FIELDS}), found {}", other.describe()),
                    token.position,
                ));
            }
        };
        Ok(operand)
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let token = self.bump();
        match token.kind {
            Kind::Number(text) => number_value(text, token.position),
            other => Err(error(
                format!("expected number, found {}", other.describe()),
                token.position,
            )),
        }
    }

    fn count(&mut self, keyword: &str) -> Result<usize, ParseError> {
        let token = self.bump();
        let count = match token.kind {
            Kind::Number(text) => text.parse::<usize>().ok(),
            _ => None,
        };
        match count {
            Some(0) => Err(error(
                format!("{keyword} count must be at least 1"),
                token.position,
            )),
            Some(count) => Ok(count),
            None => Err(error(
                format!("expected integer, found {}", token.kind.describe()),
                token.position,
            )),
        }
    }

    fn pair(&mut self) -> Result<(Operand, Operand), ParseError> {
        let left = self.operand()?;
        self.expect(Kind::Comma)?;
        let right = self.operand()?;
        Ok((left, right))
    }

    fn rule(&mut self) -> Result<Rule, ParseError> {
        let token = self.bump();
        let Kind::Word(keyword) = token.kind else {
            return Err(error(
                format!("expected rule, found {}", token.kind.describe()),
                token.position,
            ));
        };
        if !is_keyword(keyword) {
            return Err(error(format!("expected rule, found '{keyword}'"), token.position));
        }
        self.expect(Kind::Open)?;

        let rule = match keyword {
            "ABOVE" | "BELOW" | "EQUALS" | "CROSS_ABOVE" | "CROSS_BELOW" => {
                let (left, right) = self.pair()?;
                match keyword {
                    "ABOVE" => Rule::Above { left, right },
                    "BELOW" => Rule::Below { left, right },
                    "EQUALS" => Rule::Equals { left, right },
                    "CROSS_ABOVE" => Rule::CrossAbove { left, right },
                    _ => Rule::CrossBelow { left, right },
                }
            }
            "BETWEEN" => {
                let operand = self.operand()?;
                self.expect(Kind::Comma)?;
                let lower = self.number()?;
                self.expect(Kind::Comma)?;
                let upper = self.number()?;
                Rule::Between {
                    operand,
                    lower,
                    upper,
                }
            }
            "AND" | "OR" => {
                let mut rules = vec![self.rule()?];
                while self.peek().kind == Kind::Comma {
                    self.bump();
                    rules.push(self.rule()?);
                }
                if rules.len() < 2 {
                    return Err(error(
                        format!("{keyword} requires at least 2 rules"),
                        self.peek().position,
                    ));
                }
                if keyword == "AND" {
                    Rule::And(rules)
                } else {
                    Rule::Or(rules)
                }
            }
            "NOT" => Rule::Not(Box::new(self.rule()?)),
            _ => {
                let rule = Box::new(self.rule()?);
                self.expect(Kind::Comma)?;
                let count = self.count(keyword)?;
                if keyword == "CONSECUTIVE" {
                    Rule::Consecutive { rule, count }
                } else {
                    Rule::AnyOf { rule, count }
                }
            }
        };

        self.expect(Kind::Close)?;
        Ok(rule)
    }
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "ABOVE"
            | "BELOW"
            | "EQUALS"
            | "CROSS_ABOVE"
            | "CROSS_BELOW"
            | "BETWEEN"
            | "AND"
            | "OR"
            | "NOT"
            | "CONSECUTIVE"
            | "ANY_OF"
    )
}

fn number_value(text: &str, position: usize) -> Result<f64, ParseError> {
    text.parse::<f64>()
        .map_err(|_| error(format!("invalid number: {text}"), position))
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        next: 0,
    };
    let rule = parser.rule()?;

    let rest = parser.peek();
    if rest.kind != Kind::End {
        return Err(error(
            format!(
                "unexpected input after rule: '{}'",
                parser.input[rest.position..].trim_end()
            ),
            rest.position,
        ));
    }
    Ok(rule)
}
