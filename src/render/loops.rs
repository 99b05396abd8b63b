//! Loop and switch rendering
//!
//! `foreach` iterates lists, dicts (by key, sorted so renders are
//! deterministic), and strings (by character). `for` is the counter
//! form: init assignments, a test expression, and incr assignments run
//! after each body pass. Both render their `else` body when the loop
//! body never ran. `switch` evaluates its subject once and renders the
//! first case whose relational test matches, falling back to the
//! default body.

use crate::parser::ast::{Assign, CaseOp, Expr, NodeList, SwitchCase, Target};
use crate::render::engine::{Renderer, Signal};
use crate::render::errors::{ErrorKind, TemplateError};
use crate::scope::Compartment;
use crate::value::Value;

impl Renderer<'_> {
    pub(crate) fn render_foreach(
        &mut self,
        var: &Target,
        index_var: Option<&Target>,
        iterable: &Expr,
        body: &NodeList,
        else_body: Option<&NodeList>,
        line: usize,
    ) -> Result<Signal, TemplateError> {
        let value = self.eval(iterable)?;
        let items: Vec<Value> = match value {
            Value::List(items) => items,
            Value::Dict(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                keys.into_iter().map(|k| Value::Str(k.clone())).collect()
            }
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            other => {
                return Err(self.error(
                    ErrorKind::Type,
                    format!(
                        "foreach requires a list, dict, or string, got {}",
                        other.type_name()
                    ),
                    line,
                ));
            }
        };

        if items.is_empty() {
            if let Some(body) = else_body {
                return self.render_nodes(body);
            }
            return Ok(Signal::Normal);
        }

        let var_compartment = var.resolve_inferred();
        for (index, item) in items.into_iter().enumerate() {
            self.scope.set(var.name.clone(), var_compartment, item);
            if let Some(index_var) = index_var {
                self.scope.set(
                    index_var.name.clone(),
                    index_var.resolve_inferred(),
                    Value::Int(index as i64),
                );
            }

            match self.render_nodes(body)? {
                Signal::Break => break,
                Signal::Normal | Signal::Continue => {}
            }
        }

        Ok(Signal::Normal)
    }

    pub(crate) fn render_for_counter(
        &mut self,
        init: &[Assign],
        test: &Expr,
        incr: &[Assign],
        body: &NodeList,
        else_body: Option<&NodeList>,
    ) -> Result<Signal, TemplateError> {
        self.apply_assigns(init, Compartment::Local)?;

        let mut entered = false;
        loop {
            if !self.eval(test)?.is_truthy() {
                break;
            }
            entered = true;

            match self.render_nodes(body)? {
                Signal::Break => break,
                Signal::Normal | Signal::Continue => {}
            }

            self.apply_assigns(incr, Compartment::Local)?;
        }

        if !entered {
            if let Some(body) = else_body {
                return self.render_nodes(body);
            }
        }
        Ok(Signal::Normal)
    }

    pub(crate) fn render_switch(
        &mut self,
        subject: &Expr,
        cases: &[SwitchCase],
        default: &NodeList,
        line: usize,
    ) -> Result<Signal, TemplateError> {
        let subject = self.eval(subject)?;

        for case in cases {
            let mut args = Vec::with_capacity(case.args.len());
            for arg in &case.args {
                args.push(self.eval(arg)?);
            }

            if self.case_matches(case.op, &subject, &args, line)? {
                return self.render_nodes(&case.body);
            }
        }

        self.render_nodes(default)
    }

    fn case_matches(
        &self,
        op: CaseOp,
        subject: &Value,
        args: &[Value],
        line: usize,
    ) -> Result<bool, TemplateError> {
        use std::cmp::Ordering;

        let first = args.first().ok_or_else(|| {
            self.error(ErrorKind::Internal, "switch case missing argument", line)
        })?;

        match op {
            CaseOp::Eq => self.values_equal(subject, first, line),
            CaseOp::Ne => Ok(!self.values_equal(subject, first, line)?),
            CaseOp::Lt => Ok(self.compare_values(subject, first, line)? == Ordering::Less),
            CaseOp::Le => Ok(self.compare_values(subject, first, line)? != Ordering::Greater),
            CaseOp::Gt => Ok(self.compare_values(subject, first, line)? == Ordering::Greater),
            CaseOp::Ge => Ok(self.compare_values(subject, first, line)? != Ordering::Less),
            CaseOp::Between => {
                let second = args.get(1).ok_or_else(|| {
                    self.error(ErrorKind::Internal, "switch case missing argument", line)
                })?;
                Ok(self.compare_values(subject, first, line)? != Ordering::Less
                    && self.compare_values(subject, second, line)? != Ordering::Greater)
            }
        }
    }
}
