//! Binary operators on values
//!
//! All arithmetic on integers is checked; overflow surfaces as an
//! arithmetic error rather than wrapping. Mixed int/float operands
//! promote to float. `+` concatenates strings and extends lists.
//! Equality is by value for scalars and structural for containers;
//! comparing values of incompatible types is a type error, except that
//! `none` compares equal only to `none` and unequal to everything else.

use std::cmp::Ordering;

use crate::parser::ast::BinOp;
use crate::render::engine::Renderer;
use crate::render::errors::{ErrorKind, TemplateError};
use crate::value::Value;

impl Renderer<'_> {
    pub(crate) fn binary_op(
        &self,
        op: BinOp,
        left: &Value,
        right: &Value,
        line: usize,
    ) -> Result<Value, TemplateError> {
        match op {
            BinOp::Add => self.add_values(left, right, line),
            BinOp::Sub => self.sub_values(left, right, line),
            BinOp::Mul => self.mul_values(left, right, line),
            BinOp::Div => self.div_values(left, right, line),
            BinOp::Mod => self.mod_values(left, right, line),

            BinOp::Eq => Ok(Value::Bool(self.values_equal(left, right, line)?)),
            BinOp::Ne => Ok(Value::Bool(!self.values_equal(left, right, line)?)),
            BinOp::Lt => Ok(Value::Bool(
                self.compare_values(left, right, line)? == Ordering::Less,
            )),
            BinOp::Le => Ok(Value::Bool(
                self.compare_values(left, right, line)? != Ordering::Greater,
            )),
            BinOp::Gt => Ok(Value::Bool(
                self.compare_values(left, right, line)? == Ordering::Greater,
            )),
            BinOp::Ge => Ok(Value::Bool(
                self.compare_values(left, right, line)? != Ordering::Less,
            )),

            BinOp::And | BinOp::Or => Err(self.error(
                ErrorKind::Internal,
                "logical operators must short-circuit in eval",
                line,
            )),
        }
    }

    #[inline]
    fn add_values(&self, left: &Value, right: &Value, line: usize) -> Result<Value, TemplateError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| self.overflow(format!("{} + {}", a, b), line)),
            (Value::Str(a), Value::Str(b)) => {
                let mut result = a.clone();
                result.push_str(b);
                Ok(Value::Str(result))
            }
            (Value::List(a), Value::List(b)) => {
                let mut result = a.clone();
                result.extend(b.iter().cloned());
                Ok(Value::List(result))
            }
            _ => self
                .float_operands(left, right)
                .map(|(a, b)| Value::Float(a + b))
                .ok_or_else(|| self.bad_operands("+", left, right, line)),
        }
    }

    #[inline]
    fn sub_values(&self, left: &Value, right: &Value, line: usize) -> Result<Value, TemplateError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| self.overflow(format!("{} - {}", a, b), line)),
            _ => self
                .float_operands(left, right)
                .map(|(a, b)| Value::Float(a - b))
                .ok_or_else(|| self.bad_operands("-", left, right, line)),
        }
    }

    #[inline]
    fn mul_values(&self, left: &Value, right: &Value, line: usize) -> Result<Value, TemplateError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_mul(*b)
                .map(Value::Int)
                .ok_or_else(|| self.overflow(format!("{} * {}", a, b), line)),
            _ => self
                .float_operands(left, right)
                .map(|(a, b)| Value::Float(a * b))
                .ok_or_else(|| self.bad_operands("*", left, right, line)),
        }
    }

    /// `/` on two integers is integer division truncating toward zero;
    /// any float operand promotes the division to float.
    #[inline]
    fn div_values(&self, left: &Value, right: &Value, line: usize) -> Result<Value, TemplateError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(self.error(ErrorKind::Arithmetic, "division by zero", line));
                }
                a.checked_div(*b)
                    .map(Value::Int)
                    .ok_or_else(|| self.overflow(format!("{} / {}", a, b), line))
            }
            _ => {
                let (a, b) = self
                    .float_operands(left, right)
                    .ok_or_else(|| self.bad_operands("/", left, right, line))?;
                if b == 0.0 {
                    return Err(self.error(ErrorKind::Arithmetic, "division by zero", line));
                }
                Ok(Value::Float(a / b))
            }
        }
    }

    #[inline]
    fn mod_values(&self, left: &Value, right: &Value, line: usize) -> Result<Value, TemplateError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Err(self.error(ErrorKind::Arithmetic, "modulus by zero", line));
                }
                a.checked_rem(*b)
                    .map(Value::Int)
                    .ok_or_else(|| self.overflow(format!("{} % {}", a, b), line))
            }
            _ => {
                let (a, b) = self
                    .float_operands(left, right)
                    .ok_or_else(|| self.bad_operands("%", left, right, line))?;
                if b == 0.0 {
                    return Err(self.error(ErrorKind::Arithmetic, "modulus by zero", line));
                }
                Ok(Value::Float(a % b))
            }
        }
    }

    /// Equality per the value model. Container comparison recurses, so a
    /// type mismatch deep inside a list still raises.
    pub(crate) fn values_equal(
        &self,
        left: &Value,
        right: &Value,
        line: usize,
    ) -> Result<bool, TemplateError> {
        match (left, right) {
            (Value::None, Value::None) => Ok(true),
            (Value::None, _) | (_, Value::None) => Ok(false),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.values_equal(x, y, line)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (key, x) in a {
                    match b.get(key) {
                        Some(y) => {
                            if !self.values_equal(x, y, line)? {
                                return Ok(false);
                            }
                        }
                        None => return Ok(false),
                    }
                }
                Ok(true)
            }
            (Value::Callable(a), Value::Callable(b)) => Ok(a == b),
            (Value::Opaque(a), Value::Opaque(b)) => Ok(std::rc::Rc::ptr_eq(a, b)),
            _ => match self.float_operands(left, right) {
                // Numeric widening
                Some((a, b)) => Ok(a == b),
                None => Err(self.error(
                    ErrorKind::Type,
                    format!(
                        "cannot compare {} and {}",
                        left.type_name(),
                        right.type_name()
                    ),
                    line,
                )),
            },
        }
    }

    /// Ordering for the relational operators: numeric pairs widen,
    /// strings order lexicographically, everything else is a type error.
    pub(crate) fn compare_values(
        &self,
        left: &Value,
        right: &Value,
        line: usize,
    ) -> Result<Ordering, TemplateError> {
        match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            _ => {
                let ordered = self
                    .float_operands(left, right)
                    .and_then(|(a, b)| a.partial_cmp(&b));
                ordered.ok_or_else(|| {
                    self.error(
                        ErrorKind::Type,
                        format!(
                            "cannot order {} and {}",
                            left.type_name(),
                            right.type_name()
                        ),
                        line,
                    )
                })
            }
        }
    }

    /// Widen a numeric operand pair to floats.
    #[inline]
    fn float_operands(&self, left: &Value, right: &Value) -> Option<(f64, f64)> {
        Some((left.as_float()?, right.as_float()?))
    }

    fn overflow(&self, operation: String, line: usize) -> TemplateError {
        self.error(
            ErrorKind::Arithmetic,
            format!("integer overflow in {}", operation),
            line,
        )
    }

    fn bad_operands(
        &self,
        op: &str,
        left: &Value,
        right: &Value,
        line: usize,
    ) -> TemplateError {
        self.error(
            ErrorKind::Type,
            format!(
                "unsupported operands for {}: {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ),
            line,
        )
    }
}
