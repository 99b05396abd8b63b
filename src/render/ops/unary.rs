//! Unary operators on values

use crate::render::engine::Renderer;
use crate::render::errors::{ErrorKind, TemplateError};
use crate::value::Value;

impl Renderer<'_> {
    pub(crate) fn negate_value(&self, value: &Value, line: usize) -> Result<Value, TemplateError> {
        match value {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| {
                self.error(
                    ErrorKind::Arithmetic,
                    format!("integer overflow in -{}", n),
                    line,
                )
            }),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(self.error(
                ErrorKind::Type,
                format!("cannot negate {}", other.type_name()),
                line,
            )),
        }
    }
}
