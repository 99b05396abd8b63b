//! Variable statement rendering
//!
//! The set family (`set`/`global`/`template`/`private`) evaluates every
//! right-hand side before committing any binding, so a failing
//! assignment leaves the scope untouched. With an `else` segment the
//! failure is recovered by binding the else assignments instead; without
//! one the error propagates. Abort errors are never recovered. `save`
//! records named variables around its body and writes them back even
//! when the body fails.

use crate::parser::ast::{Assign, Expr, NodeList, SetWhere, Target};
use crate::render::engine::{Renderer, Signal};
use crate::render::errors::{ErrorKind, TemplateError};
use crate::scope::Compartment;
use crate::value::Value;

impl Renderer<'_> {
    /// Evaluate and bind assignments one at a time (loop init/incr,
    /// scope-tag seeds).
    pub(crate) fn apply_assigns(
        &mut self,
        assigns: &[Assign],
        default: Compartment,
    ) -> Result<(), TemplateError> {
        for assign in assigns {
            let value = self.eval(&assign.expr)?;
            self.scope
                .set(assign.target.name.clone(), assign.target.resolve(default), value);
        }
        Ok(())
    }

    pub(crate) fn render_set(
        &mut self,
        where_: SetWhere,
        assigns: &[Assign],
        else_assigns: Option<&[Assign]>,
    ) -> Result<Signal, TemplateError> {
        match self.eval_assign_values(assigns) {
            Ok(values) => self.commit_set(where_, values),
            Err(err) if err.kind != ErrorKind::Abort => match else_assigns {
                Some(else_assigns) => {
                    let values = self.eval_assign_values(else_assigns)?;
                    self.commit_set(where_, values)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Evaluate all right-hand sides in source order without binding.
    fn eval_assign_values<'a>(
        &mut self,
        assigns: &'a [Assign],
    ) -> Result<Vec<(&'a Target, Value)>, TemplateError> {
        let mut values = Vec::with_capacity(assigns.len());
        for assign in assigns {
            values.push((&assign.target, self.eval(&assign.expr)?));
        }
        Ok(values)
    }

    fn commit_set(
        &mut self,
        where_: SetWhere,
        values: Vec<(&Target, Value)>,
    ) -> Result<Signal, TemplateError> {
        for (target, value) in values {
            match (where_, target.compartment) {
                // An explicit prefix on the target wins over the action
                (_, Some(compartment)) => {
                    self.scope.set(target.name.clone(), compartment, value);
                }
                (SetWhere::Local, None) => {
                    self.scope.set(target.name.clone(), Compartment::Local, value);
                }
                (SetWhere::Global, None) => {
                    self.scope.set(target.name.clone(), Compartment::Global, value);
                }
                (SetWhere::Private, None) => {
                    self.scope
                        .set(target.name.clone(), Compartment::Private, value);
                }
                (SetWhere::Template, None) => {
                    self.scope.set_template_root(target.name.clone(), value);
                }
            }
        }
        Ok(Signal::Normal)
    }

    pub(crate) fn render_unset(&mut self, targets: &[Target]) -> Result<Signal, TemplateError> {
        for target in targets {
            self.scope.unset(&target.name, target.resolve_inferred());
        }
        Ok(Signal::Normal)
    }

    /// `save` snapshots its named variables before the body and binds
    /// the snapshots back afterward. The restore also runs when the
    /// body errors, so the error unwinds past an unchanged scope.
    pub(crate) fn render_save(
        &mut self,
        targets: &[Target],
        body: &NodeList,
        line: usize,
    ) -> Result<Signal, TemplateError> {
        let mut saved = Vec::with_capacity(targets.len());
        for target in targets {
            let compartment = target.resolve_inferred();
            let value = self
                .scope
                .get(&target.name, compartment)
                .cloned()
                .ok_or_else(|| {
                    self.error(ErrorKind::UnknownVariable, target.name.clone(), line)
                })?;
            saved.push((target.name.clone(), compartment, value));
        }

        let result = self.render_nodes(body);
        for (name, compartment, value) in saved {
            self.scope.set(name, compartment, value);
        }
        result
    }

    pub(crate) fn render_return(&mut self, assigns: &[Assign]) -> Result<Signal, TemplateError> {
        for assign in assigns {
            let value = self.eval(&assign.expr)?;
            self.scope
                .set(assign.target.name.clone(), Compartment::Return, value);
        }
        Ok(Signal::Normal)
    }

    pub(crate) fn render_expand(
        &mut self,
        expr: &Expr,
        compartment: Compartment,
        line: usize,
    ) -> Result<Signal, TemplateError> {
        let value = self.eval(expr)?;
        match value {
            Value::Dict(map) => {
                for (name, value) in map {
                    self.scope.set(name, compartment, value);
                }
                Ok(Signal::Normal)
            }
            other => Err(self.error(
                ErrorKind::Type,
                format!("expand requires a dict, got {}", other.type_name()),
                line,
            )),
        }
    }

    pub(crate) fn render_import(&mut self, assigns: &[Assign]) -> Result<Signal, TemplateError> {
        for assign in assigns {
            let line = assign.expr.line();
            let name_value = self.eval(&assign.expr)?;
            let library_name = match name_value {
                Value::Str(s) => s,
                other => {
                    return Err(self.error(
                        ErrorKind::Type,
                        format!("library name must be a string, got {}", other.type_name()),
                        line,
                    ));
                }
            };

            let library = self.env.library(&library_name).ok_or_else(|| {
                self.error(
                    ErrorKind::NotFound,
                    format!("unknown library: {}", library_name),
                    line,
                )
            })?;
            self.scope.set(
                assign.target.name.clone(),
                assign.target.resolve_inferred(),
                library,
            );
        }
        Ok(Signal::Normal)
    }
}
