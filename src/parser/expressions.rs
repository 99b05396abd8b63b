//! Expression parsing implementation
//!
//! Precedence climbing over the token stream inside a tag, lowest to
//! highest: `or`, `and`, `not`, comparisons, `+ -`, `* / %`, unary `-`,
//! postfix chains, primary. Comparisons are left-associative; there is
//! no chained-comparison special case.
//!
//! A primary is a literal, a list `[a, b]`, a dict `[k: v]` (empty dict
//! `[:]`), a parenthesized expression, or a variable chain. Chain steps
//! are `.name` (attribute), `[expr]` (item), and `(args)` (call).
//!
//! Constant subexpressions fold at parse time: a list or dict literal
//! whose members are all literals becomes a single [`Expr::Value`], and
//! unary minus folds into number literals.

use rustc_hash::FxHashMap;

use crate::parser::ast::{BinOp, Expr, UnOp};
use crate::parser::lexer::TokenKind;
use crate::parser::parser::Parser;
use crate::render::errors::TemplateError;
use crate::value::Value;

impl Parser {
    /// Parse an expression (top-level entry point).
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, TemplateError> {
        self.parse_or()
    }

    /// Parse a comma-separated expression list.
    pub(crate) fn parse_multi_expr(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.match_kind(&TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_or(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_and()?;

        while self.peek_kind() == Some(&TokenKind::Or) {
            let line = self.current_line();
            self.next_token("'or'")?;
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_not()?;

        while self.peek_kind() == Some(&TokenKind::And) {
            let line = self.current_line();
            self.next_token("'and'")?;
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, TemplateError> {
        if self.peek_kind() == Some(&TokenKind::Not) {
            let line = self.current_line();
            self.next_token("'not'")?;
            let expr = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                expr: Box::new(expr),
                line,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Eq) => BinOp::Eq,
                Some(TokenKind::Ne) => BinOp::Ne,
                Some(TokenKind::Lt) => BinOp::Lt,
                Some(TokenKind::Le) => BinOp::Le,
                Some(TokenKind::Gt) => BinOp::Gt,
                Some(TokenKind::Ge) => BinOp::Ge,
                _ => break,
            };
            let line = self.current_line();
            self.next_token("comparison operator")?;
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            let line = self.current_line();
            self.next_token("operator")?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Mod,
                _ => break,
            };
            let line = self.current_line();
            self.next_token("operator")?;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, TemplateError> {
        if self.peek_kind() == Some(&TokenKind::Minus) {
            let line = self.current_line();
            self.next_token("'-'")?;
            let expr = self.parse_unary()?;

            // Fold negation into number literals
            match expr {
                Expr::Value {
                    value: Value::Int(n),
                    line,
                } if n.checked_neg().is_some() => {
                    return Ok(Expr::Value {
                        value: Value::Int(-n),
                        line,
                    });
                }
                Expr::Value {
                    value: Value::Float(f),
                    line,
                } => {
                    return Ok(Expr::Value {
                        value: Value::Float(-f),
                        line,
                    });
                }
                expr => {
                    return Ok(Expr::Unary {
                        op: UnOp::Neg,
                        expr: Box::new(expr),
                        line,
                    });
                }
            }
        }
        self.parse_postfix()
    }

    /// Parse postfix chain steps: `.name`, `[expr]`, `(args)`.
    fn parse_postfix(&mut self) -> Result<Expr, TemplateError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    let line = self.current_line();
                    self.next_token("'.'")?;
                    let name = self.parse_plain_name()?;
                    expr = Expr::Attr {
                        base: Box::new(expr),
                        name,
                        line,
                    };
                }
                Some(TokenKind::OpenBracket) => {
                    let line = self.current_line();
                    self.next_token("'['")?;
                    let index = self.parse_expr()?;
                    self.expect_kind(&TokenKind::CloseBracket, "']'")?;
                    expr = Expr::Item {
                        base: Box::new(expr),
                        index: Box::new(index),
                        line,
                    };
                }
                Some(TokenKind::OpenParen) => {
                    let line = self.current_line();
                    self.next_token("'('")?;
                    let args = if self.peek_kind() == Some(&TokenKind::CloseParen) {
                        Vec::new()
                    } else {
                        self.parse_multi_expr()?
                    };
                    self.expect_kind(&TokenKind::CloseParen, "')'")?;
                    expr = Expr::Call {
                        base: Box::new(expr),
                        args,
                        line,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, TemplateError> {
        let token = self.next_token("expression")?;
        let line = token.line;

        match token.kind {
            TokenKind::Int(n) => Ok(Expr::Value {
                value: Value::Int(n),
                line,
            }),
            TokenKind::Float(f) => Ok(Expr::Value {
                value: Value::Float(f),
                line,
            }),
            TokenKind::Str(s) => Ok(Expr::Value {
                value: Value::Str(s),
                line,
            }),
            TokenKind::OpenParen => {
                let expr = self.parse_expr()?;
                self.expect_kind(&TokenKind::CloseParen, "')'")?;
                Ok(expr)
            }
            TokenKind::OpenBracket => self.parse_bracket_literal(line),
            TokenKind::Word(word) => {
                let target = self.make_target(&word, line)?;
                let compartment = target.resolve_inferred();
                Ok(Expr::Var {
                    compartment,
                    name: target.name,
                    line,
                })
            }
            other => Err(self.syntax_error(
                format!("expected expression, found {}", other.describe()),
                line,
            )),
        }
    }

    /// Parse a list literal `[a, b]` or dict literal `[k: v]`; `[]` is
    /// the empty list and `[:]` the empty dict.
    fn parse_bracket_literal(&mut self, line: usize) -> Result<Expr, TemplateError> {
        if self.match_kind(&TokenKind::CloseBracket) {
            return Ok(Expr::Value {
                value: Value::List(Vec::new()),
                line,
            });
        }
        if self.match_kind(&TokenKind::Colon) {
            self.expect_kind(&TokenKind::CloseBracket, "']'")?;
            return Ok(Expr::Value {
                value: Value::Dict(FxHashMap::default()),
                line,
            });
        }

        let first = self.parse_expr()?;

        if self.match_kind(&TokenKind::Colon) {
            // Dict literal
            let mut pairs = vec![(first, self.parse_expr()?)];
            while self.match_kind(&TokenKind::Comma) {
                let key = self.parse_expr()?;
                self.expect_kind(&TokenKind::Colon, "':'")?;
                pairs.push((key, self.parse_expr()?));
            }
            self.expect_kind(&TokenKind::CloseBracket, "']'")?;
            Ok(fold_dict(pairs, line))
        } else {
            // List literal
            let mut items = vec![first];
            while self.match_kind(&TokenKind::Comma) {
                items.push(self.parse_expr()?);
            }
            self.expect_kind(&TokenKind::CloseBracket, "']'")?;
            Ok(fold_list(items, line))
        }
    }
}

/// Fold a list literal of constants into a constant.
fn fold_list(items: Vec<Expr>, line: usize) -> Expr {
    if items
        .iter()
        .all(|item| matches!(item, Expr::Value { .. }))
    {
        let values = items
            .into_iter()
            .map(|item| match item {
                Expr::Value { value, .. } => value,
                _ => Value::None,
            })
            .collect();
        Expr::Value {
            value: Value::List(values),
            line,
        }
    } else {
        Expr::List { items, line }
    }
}

/// Fold a dict literal of constant string keys and constant values into
/// a constant.
fn fold_dict(pairs: Vec<(Expr, Expr)>, line: usize) -> Expr {
    let constant = pairs.iter().all(|(key, value)| {
        matches!(
            key,
            Expr::Value {
                value: Value::Str(_),
                ..
            }
        ) && matches!(value, Expr::Value { .. })
    });

    if constant {
        let mut map = FxHashMap::default();
        for (key, value) in pairs {
            if let (
                Expr::Value {
                    value: Value::Str(key),
                    ..
                },
                Expr::Value { value, .. },
            ) = (key, value)
            {
                map.insert(key, value);
            }
        }
        Expr::Value {
            value: Value::Dict(map),
            line,
        }
    } else {
        Expr::Dict { pairs, line }
    }
}
