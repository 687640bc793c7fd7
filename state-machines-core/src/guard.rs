//! Boolean guard expressions (`cond="a and (b or not c)"`).
//!
//! The source lets a transition's `cond`/`unless` be either a single callable name
//! or a small boolean expression over callable names (`validators.py`'s
//! `BooleanExpression`, built on `pyparsing`). This module re-implements the same
//! grammar with a tiny hand-written recursive-descent parser instead of pulling in
//! a parser-combinator crate for four productions.
//!
//! Grammar (lowest to highest precedence):
//! ```text
//! expr   := or_expr
//! or_expr  := and_expr (("or" | "|") and_expr)*
//! and_expr := not_expr (("and" | "&") not_expr)*
//! not_expr := ("not" | "!")? atom
//! atom     := identifier | "(" expr ")"
//! ```

use crate::errors::InvalidDefinition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardExpr {
    Ident(String),
    Not(Box<GuardExpr>),
    And(Box<GuardExpr>, Box<GuardExpr>),
    Or(Box<GuardExpr>, Box<GuardExpr>),
}

impl GuardExpr {
    /// Parse a guard expression. A bare identifier with no operators parses to
    /// `GuardExpr::Ident` directly, so callers can special-case the common
    /// single-guard case without walking a tree (see SPEC_FULL.md §4.5/§9).
    pub fn parse(source: &str) -> Result<Self, InvalidDefinition> {
        let tokens = tokenize(source)
            .ok_or_else(|| InvalidDefinition::MalformedGuard(source.to_string(), "invalid token".into()))?;
        if tokens.is_empty() {
            return Err(InvalidDefinition::MalformedGuard(source.to_string(), "empty expression".into()));
        }
        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let expr = parser.parse_or(source)?;
        if parser.pos != parser.tokens.len() {
            return Err(InvalidDefinition::MalformedGuard(
                source.to_string(),
                format!("unexpected token '{}'", parser.tokens[parser.pos]),
            ));
        }
        Ok(expr)
    }

    /// Every identifier referenced by this expression, in left-to-right order
    /// (duplicates included), for build-time resolution against a registry.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            GuardExpr::Ident(name) => out.push(name),
            GuardExpr::Not(inner) => inner.collect_identifiers(out),
            GuardExpr::And(lhs, rhs) | GuardExpr::Or(lhs, rhs) => {
                lhs.collect_identifiers(out);
                rhs.collect_identifiers(out);
            }
        }
    }

    /// Evaluate the expression, resolving each identifier through `lookup`.
    pub fn eval(&self, lookup: &mut impl FnMut(&str) -> bool) -> bool {
        match self {
            GuardExpr::Ident(name) => lookup(name),
            GuardExpr::Not(inner) => !inner.eval(lookup),
            GuardExpr::And(lhs, rhs) => lhs.eval(lookup) && rhs.eval(lookup),
            GuardExpr::Or(lhs, rhs) => lhs.eval(lookup) || rhs.eval(lookup),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::Not => write!(f, "not"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(source: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '&' => {
                tokens.push(Token::And);
                chars.next();
            }
            '|' => {
                tokens.push(Token::Or);
                chars.next();
            }
            '!' => {
                tokens.push(Token::Not);
                chars.next();
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match ident.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(ident),
                });
            }
            _ => return None,
        }
    }

    Some(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn parse_or(&mut self, source: &str) -> Result<GuardExpr, InvalidDefinition> {
        let mut lhs = self.parse_and(source)?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let rhs = self.parse_and(source)?;
            lhs = GuardExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self, source: &str) -> Result<GuardExpr, InvalidDefinition> {
        let mut lhs = self.parse_not(source)?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let rhs = self.parse_not(source)?;
            lhs = GuardExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self, source: &str) -> Result<GuardExpr, InvalidDefinition> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_not(source)?;
            return Ok(GuardExpr::Not(Box::new(inner)));
        }
        self.parse_atom(source)
    }

    fn parse_atom(&mut self, source: &str) -> Result<GuardExpr, InvalidDefinition> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(GuardExpr::Ident(name.clone())),
            Some(Token::LParen) => {
                let inner = self.parse_or(source)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(InvalidDefinition::MalformedGuard(source.to_string(), "unmatched '('".into())),
                }
            }
            Some(other) => Err(InvalidDefinition::MalformedGuard(
                source.to_string(),
                format!("unexpected token '{other}'"),
            )),
            None => Err(InvalidDefinition::MalformedGuard(source.to_string(), "unexpected end of expression".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(expr: &str, true_names: &[&str]) -> bool {
        let parsed = GuardExpr::parse(expr).unwrap();
        let mut lookup = |name: &str| true_names.contains(&name);
        parsed.eval(&mut lookup)
    }

    #[test]
    fn single_identifier_short_circuits_to_ident() {
        let parsed = GuardExpr::parse("is_ready").unwrap();
        assert_eq!(parsed, GuardExpr::Ident("is_ready".to_string()));
    }

    #[test]
    fn and_or_not_precedence() {
        assert!(eval_str("a and not b or c", &["a", "c"]));
        assert!(!eval_str("a and (b or c)", &["a"]));
        assert!(eval_str("a and (b or c)", &["a", "c"]));
    }

    #[test]
    fn symbolic_aliases_match_keywords() {
        assert_eq!(
            GuardExpr::parse("a & b").unwrap(),
            GuardExpr::parse("a and b").unwrap()
        );
        assert_eq!(GuardExpr::parse("!a").unwrap(), GuardExpr::parse("not a").unwrap());
    }

    #[test]
    fn malformed_expression_is_rejected() {
        assert!(GuardExpr::parse("a and").is_err());
        assert!(GuardExpr::parse("(a or b").is_err());
        assert!(GuardExpr::parse("").is_err());
    }

    #[test]
    fn identifiers_collects_in_order_with_duplicates() {
        let parsed = GuardExpr::parse("a and (b or a)").unwrap();
        assert_eq!(parsed.identifiers(), vec!["a", "b", "a"]);
    }
}
