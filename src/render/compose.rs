//! Composition rendering: includes, template functions, sections,
//! capture blocks, and hooks
//!
//! Include pushes an include frame (copied LOCAL, fresh PRIVATE),
//! renders the loaded template's tree in place, then restores the
//! caller's frame; a `return` variable harvests the RETURN compartment
//! into a dict and clears it. Errors crossing an include record the
//! outer template and include line on their chain.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::env::HookArgs;
use crate::parser::ast::{Assign, Expr, NodeList, Target};
use crate::render::engine::{Renderer, Signal};
use crate::render::errors::{ErrorKind, TemplateError};
use crate::render::Sink;
use crate::scope::Compartment;
use crate::value::{Callable, TemplateFn, Value};

impl Renderer<'_> {
    pub(crate) fn render_include(
        &mut self,
        path: &Expr,
        assigns: &[Assign],
        return_var: Option<&Target>,
        line: usize,
    ) -> Result<Signal, TemplateError> {
        let path_value = self.eval(path)?;
        let name = resolve_path(&self.template, &path_value.to_display());

        let template = self.env.get_template(&name).map_err(|mut err| {
            if err.template.is_empty() {
                err.template = self.template.clone();
                err.line = line;
            }
            err
        })?;

        // Seed values are evaluated in the caller's scope
        let mut seeds = Vec::with_capacity(assigns.len());
        for assign in assigns {
            seeds.push((
                assign.target.name.clone(),
                assign.target.resolve(Compartment::Local),
                self.eval(&assign.expr)?,
            ));
        }

        self.scope.push_include();
        for (name, compartment, value) in seeds {
            self.scope.set(name, compartment, value);
        }

        let saved_template = std::mem::replace(&mut self.template, template.name.clone());
        let nodes = Rc::clone(&template.nodes);
        let result = self.render_nodes(&nodes);
        self.template = saved_template;
        self.scope.pop_include();

        result.map_err(|err| err.included_from(&self.template, line))?;

        if let Some(return_var) = return_var {
            let returns = self.scope.take_returns();
            self.scope.set(
                return_var.name.clone(),
                return_var.resolve_inferred(),
                Value::Dict(returns),
            );
        }

        Ok(Signal::Normal)
    }

    /// `def` builds a template-function value closing over the current
    /// frame and binds it.
    pub(crate) fn render_def(
        &mut self,
        target: &Target,
        params: &[String],
        body: &Rc<NodeList>,
    ) -> Result<Signal, TemplateError> {
        let function = TemplateFn {
            params: params.to_vec(),
            body: Rc::clone(body),
            captured: Rc::new(self.scope.capture()),
        };
        self.scope.set(
            target.name.clone(),
            target.resolve_inferred(),
            Value::Callable(Callable::Template(Rc::new(function))),
        );
        Ok(Signal::Normal)
    }

    /// `call` evaluates its expression and discards the result; a bare
    /// callable is invoked with no arguments.
    pub(crate) fn render_call(&mut self, expr: &Expr, line: usize) -> Result<Signal, TemplateError> {
        let value = self.eval(expr)?;
        if let Value::Callable(_) = value {
            self.call_value(value, Vec::new(), line)?;
        }
        Ok(Signal::Normal)
    }

    /// Invoke a callable value with evaluated arguments.
    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, TemplateError> {
        match callee {
            Value::Callable(Callable::Host(function)) => {
                function(&args).map_err(|err| self.locate(err, line))
            }

            Value::Callable(Callable::Template(function)) => {
                if args.len() != function.params.len() {
                    return Err(self.error(
                        ErrorKind::Type,
                        format!(
                            "function takes {} argument{}, got {}",
                            function.params.len(),
                            if function.params.len() == 1 { "" } else { "s" },
                            args.len()
                        ),
                        line,
                    ));
                }

                self.scope.push_captured(&function.captured);
                for (param, value) in function.params.iter().zip(args) {
                    self.scope.set(param.clone(), Compartment::Local, value);
                }
                let result = self.render_nodes(&function.body);
                self.scope.pop_block();
                result?;
                Ok(Value::None)
            }

            Value::Opaque(handle) => match handle.call(&args) {
                Some(result) => result.map_err(|err| self.locate(err, line)),
                None => Err(self.error(ErrorKind::Type, "object is not callable", line)),
            },

            other => Err(self.error(
                ErrorKind::Type,
                format!("'{}' is not callable", other.type_name()),
                line,
            )),
        }
    }

    /// `section` captures its body into a named buffer on the render
    /// result, replacing any prior buffer of the same name.
    pub(crate) fn render_section(
        &mut self,
        name: &Expr,
        body: &NodeList,
    ) -> Result<Signal, TemplateError> {
        let name = self.eval(name)?.to_display();

        self.captures.push(String::new());
        let result = self.render_nodes(body);
        let text = self.captures.pop().unwrap_or_default();
        let signal = result?;

        self.sections.insert(name, text);
        Ok(signal)
    }

    /// `use` replays a previously captured section; an unknown name
    /// emits nothing.
    pub(crate) fn render_use(&mut self, name: &Expr) -> Result<Signal, TemplateError> {
        let name = self.eval(name)?.to_display();
        if let Some(text) = self.sections.get(&name).cloned() {
            self.emit(&text);
        }
        Ok(Signal::Normal)
    }

    /// `var` captures its rendered body into a variable.
    pub(crate) fn render_var(
        &mut self,
        target: &Target,
        body: &NodeList,
    ) -> Result<Signal, TemplateError> {
        self.captures.push(String::new());
        let result = self.render_nodes(body);
        let text = self.captures.pop().unwrap_or_default();
        let signal = result?;

        self.scope
            .set(target.name.clone(), target.resolve_inferred(), Value::Str(text));
        Ok(signal)
    }

    /// `hook`/`rhook`: invoke a host-registered hook; absent hooks are
    /// silently skipped. `rhook` captures the hook's output into the
    /// reserved result path, which is currently discarded.
    pub(crate) fn render_hook(
        &mut self,
        name: &Expr,
        assigns: &[Assign],
        capture: bool,
        line: usize,
    ) -> Result<Signal, TemplateError> {
        let hook_name = self.eval(name)?.to_display();
        let hook = match self.env.hook(&hook_name) {
            Some(hook) => hook,
            None => return Ok(Signal::Normal),
        };

        let mut params = FxHashMap::default();
        for assign in assigns {
            params.insert(assign.target.name.clone(), self.eval(&assign.expr)?);
        }

        if capture {
            self.captures.push(String::new());
        }
        let result = self.invoke_hook(hook, params, line);
        if capture {
            self.captures.pop();
        }
        result?;

        Ok(Signal::Normal)
    }

    fn invoke_hook(
        &mut self,
        hook: crate::env::HookFn,
        params: FxHashMap<String, Value>,
        line: usize,
    ) -> Result<(), TemplateError> {
        let template = self.template.clone();
        let Renderer {
            env,
            scope,
            out,
            captures,
            userdata,
            ..
        } = self;
        let sink: &mut dyn Sink = match captures.last_mut() {
            Some(buffer) => buffer,
            None => &mut **out,
        };

        let mut args = HookArgs {
            env,
            template: &template,
            line,
            out: sink,
            scope,
            params,
            userdata,
        };
        hook(&mut args).map_err(|err| {
            let mut err = err;
            if err.template.is_empty() {
                err.template = template.clone();
                err.line = line;
            }
            err
        })
    }

    /// Fill in location context on errors coming back from host code.
    fn locate(&self, mut err: TemplateError, line: usize) -> TemplateError {
        if err.template.is_empty() {
            err.template = self.template.clone();
            err.line = line;
        }
        err
    }
}

/// Resolve an include path against the canonical name of the including
/// template: a leading `/` is root-relative, anything else is relative
/// to the includer's directory, and `.`/`..` segments normalize away.
pub(crate) fn resolve_path(current: &str, name: &str) -> String {
    let (relative, mut segments): (&str, Vec<&str>) = match name.strip_prefix('/') {
        Some(rest) => (rest, Vec::new()),
        None => {
            let dir = current.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            (name, dir.split('/').filter(|s| !s.is_empty()).collect())
        }
    };

    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    segments.join("/")
}
