//! Attribute and item access steps
//!
//! Dot access on a dict tries the item of that name; bracket access
//! requires a dict or list. Negative or out-of-range list indices are
//! index errors with no wraparound. Opaque host values delegate both
//! forms through their capability trait.

use crate::render::engine::Renderer;
use crate::render::errors::{ErrorKind, TemplateError};
use crate::value::Value;

impl Renderer<'_> {
    pub(crate) fn access_attr(
        &self,
        base: &Value,
        name: &str,
        line: usize,
    ) -> Result<Value, TemplateError> {
        match base {
            Value::Dict(map) => map
                .get(name)
                .cloned()
                .ok_or_else(|| self.error(ErrorKind::UnknownVariable, name, line)),
            Value::Opaque(handle) => handle
                .get_attr(name)
                .ok_or_else(|| self.error(ErrorKind::UnknownVariable, name, line)),
            other => Err(self.error(
                ErrorKind::Type,
                format!(
                    "attribute access requires a dict or object, got {}",
                    other.type_name()
                ),
                line,
            )),
        }
    }

    pub(crate) fn access_item(
        &self,
        base: &Value,
        index: &Value,
        line: usize,
    ) -> Result<Value, TemplateError> {
        match base {
            Value::List(items) => {
                let i = index.as_int().ok_or_else(|| {
                    self.error(
                        ErrorKind::Type,
                        format!("list index must be an integer, got {}", index.type_name()),
                        line,
                    )
                })?;
                if i < 0 || i as usize >= items.len() {
                    return Err(self.error(
                        ErrorKind::Index,
                        format!("list index {} out of range for length {}", i, items.len()),
                        line,
                    ));
                }
                Ok(items[i as usize].clone())
            }
            Value::Dict(map) => {
                let key = index.as_str().ok_or_else(|| {
                    self.error(
                        ErrorKind::Type,
                        format!("dict key must be a string, got {}", index.type_name()),
                        line,
                    )
                })?;
                map.get(key)
                    .cloned()
                    .ok_or_else(|| self.error(ErrorKind::Index, format!("unknown key: {}", key), line))
            }
            Value::Opaque(handle) => handle.get_item(index).ok_or_else(|| {
                self.error(
                    ErrorKind::Index,
                    format!("unknown index: {}", index.to_display()),
                    line,
                )
            }),
            other => Err(self.error(
                ErrorKind::Type,
                format!(
                    "indexing requires a dict or list, got {}",
                    other.type_name()
                ),
                line,
            )),
        }
    }
}
