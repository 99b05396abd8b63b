//! Expression evaluation
//!
//! Evaluates [`Expr`] trees against the render scope. Logical `and` and
//! `or` short-circuit here rather than in the binary operator table, and
//! both produce a boolean. All other operators evaluate both operands
//! first and dispatch through the `ops` implementations.

use rustc_hash::FxHashMap;

use crate::parser::ast::{BinOp, Expr, UnOp};
use crate::render::engine::Renderer;
use crate::render::errors::{ErrorKind, TemplateError};
use crate::value::Value;

impl Renderer<'_> {
    /// Evaluate an expression and return its value.
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, TemplateError> {
        match expr {
            Expr::Value { value, .. } => Ok(value.clone()),

            Expr::List { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::List(values))
            }

            Expr::Dict { pairs, .. } => {
                let mut map = FxHashMap::default();
                for (key_expr, value_expr) in pairs {
                    let key = self.eval(key_expr)?;
                    let key = match key {
                        Value::Str(s) => s,
                        other => {
                            return Err(self.error(
                                ErrorKind::Type,
                                format!("dict key must be a string, got {}", other.type_name()),
                                key_expr.line(),
                            ));
                        }
                    };
                    map.insert(key, self.eval(value_expr)?);
                }
                Ok(Value::Dict(map))
            }

            Expr::Var {
                compartment,
                name,
                line,
            } => self
                .scope
                .get(name, *compartment)
                .cloned()
                .ok_or_else(|| {
                    self.error(ErrorKind::UnknownVariable, name.clone(), *line)
                }),

            Expr::Attr { base, name, line } => {
                let base = self.eval(base)?;
                self.access_attr(&base, name, *line)
            }

            Expr::Item { base, index, line } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                self.access_item(&base, &index, *line)
            }

            Expr::Call { base, args, line } => {
                let callee = self.eval(base)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_value(callee, values, *line)
            }

            Expr::Binary {
                op: BinOp::And,
                left,
                right,
                ..
            } => {
                if !self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }

            Expr::Binary {
                op: BinOp::Or,
                left,
                right,
                ..
            } => {
                if self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }

            Expr::Binary {
                op,
                left,
                right,
                line,
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary_op(*op, &left, &right, *line)
            }

            Expr::Unary { op, expr, line } => {
                let value = self.eval(expr)?;
                match op {
                    UnOp::Neg => self.negate_value(&value, *line),
                    UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
        }
    }
}
