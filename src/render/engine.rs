//! Rendering engine
//!
//! [`Renderer`] walks a parsed node tree and emits output. Node families
//! are implemented across this module's siblings as further `impl`
//! blocks: loops in `loops.rs`, variable statements in `statements.rs`,
//! and composition (include, functions, sections, hooks) in
//! `compose.rs`. This file holds the dispatch plus the structurally
//! simple nodes.
//!
//! Each node render returns a [`Signal`]. `Break` and `Continue` exist
//! for the loop plumbing; the reserved `break`/`continue` actions do not
//! currently emit them, so the variants only flow when a future revision
//! turns them on.

use rustc_hash::FxHashMap;

use crate::env::Environment;
use crate::parser::ast::{Node, NodeList};
use crate::render::errors::{ErrorKind, TemplateError};
use crate::render::Sink;
use crate::scope::{Compartment, Scope};
use crate::value::Value;

/// Control signal returned from rendering a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Normal,
    /// Reserved: nothing emits this while the break action is inert
    #[allow(dead_code)]
    Break,
    /// Reserved: nothing emits this while the continue action is inert
    #[allow(dead_code)]
    Continue,
}

/// One render invocation walking a node tree.
pub(crate) struct Renderer<'r> {
    pub(crate) env: Environment,
    pub(crate) scope: &'r mut Scope,
    pub(crate) out: &'r mut dyn Sink,
    /// Capture buffers pushed by section/var/rhook bodies; the top one
    /// receives all emission while present.
    pub(crate) captures: Vec<String>,
    pub(crate) sections: FxHashMap<String, String>,
    pub(crate) userdata: Value,
    pub(crate) abort_fn: Option<&'r dyn Fn() -> bool>,
    /// Canonical name of the template currently being walked.
    pub(crate) template: String,
}

impl<'r> Renderer<'r> {
    pub(crate) fn new(
        env: Environment,
        template: String,
        scope: &'r mut Scope,
        out: &'r mut dyn Sink,
        userdata: Value,
        abort_fn: Option<&'r dyn Fn() -> bool>,
    ) -> Self {
        Renderer {
            env,
            scope,
            out,
            captures: Vec::new(),
            sections: FxHashMap::default(),
            userdata,
            abort_fn,
            template,
        }
    }

    /// The section buffers captured so far.
    pub(crate) fn into_sections(self) -> FxHashMap<String, String> {
        self.sections
    }

    /// Append text to the active output: the innermost capture buffer
    /// if one is open, otherwise the caller's sink.
    pub(crate) fn emit(&mut self, text: &str) {
        match self.captures.last_mut() {
            Some(buffer) => buffer.push_str(text),
            None => self.out.append(text),
        }
    }

    pub(crate) fn error(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        line: usize,
    ) -> TemplateError {
        TemplateError::new(kind, message, &self.template, line)
    }

    /// Render a node list, propagating the first non-normal signal.
    pub(crate) fn render_nodes(&mut self, list: &NodeList) -> Result<Signal, TemplateError> {
        for node in &list.nodes {
            match self.render_node(node)? {
                Signal::Normal => {}
                signal => return Ok(signal),
            }
        }
        Ok(Signal::Normal)
    }

    /// Render one node. The abort predicate is polled at every entry.
    fn render_node(&mut self, node: &Node) -> Result<Signal, TemplateError> {
        if let Some(abort) = self.abort_fn {
            if abort() {
                return Err(self.error(
                    ErrorKind::Abort,
                    "render aborted by caller",
                    node.line(),
                ));
            }
        }

        match node {
            Node::Text { text, .. } => {
                self.emit(text);
                Ok(Signal::Normal)
            }

            Node::Emit { expr, .. } => {
                let value = self.eval(expr)?;
                let text = value.to_display();
                self.emit(&text);
                Ok(Signal::Normal)
            }

            Node::If {
                branches,
                else_body,
                ..
            } => self.render_if(branches, else_body.as_ref()),

            Node::Scope { assigns, body, .. } => self.render_scope(assigns, body),

            Node::ForEach {
                var,
                index_var,
                iterable,
                body,
                else_body,
                line,
            } => self.render_foreach(var, index_var.as_ref(), iterable, body, else_body.as_ref(), *line),

            Node::ForCounter {
                init,
                test,
                incr,
                body,
                else_body,
                ..
            } => self.render_for_counter(init, test, incr, body, else_body.as_ref()),

            Node::Switch {
                subject,
                cases,
                default,
                line,
            } => self.render_switch(subject, cases, default, *line),

            Node::Set {
                where_,
                assigns,
                else_assigns,
                ..
            } => self.render_set(*where_, assigns, else_assigns.as_deref()),

            Node::Unset { targets, .. } => self.render_unset(targets),

            Node::Save {
                targets,
                body,
                line,
            } => self.render_save(targets, body, *line),

            Node::Clear { compartment, .. } => {
                self.scope.clear(*compartment);
                Ok(Signal::Normal)
            }

            Node::Include {
                path,
                assigns,
                return_var,
                line,
            } => self.render_include(path, assigns, return_var.as_ref(), *line),

            Node::Expand {
                expr,
                compartment,
                line,
            } => self.render_expand(expr, *compartment, *line),

            Node::Return { assigns, .. } => self.render_return(assigns),

            Node::Def {
                target,
                params,
                body,
                ..
            } => self.render_def(target, params, body),

            Node::Call { expr, line } => self.render_call(expr, *line),

            Node::Section { name, body, .. } => self.render_section(name, body),

            Node::Use { name, .. } => self.render_use(name),

            Node::Var { target, body, .. } => self.render_var(target, body),

            Node::Error { expr, line } => {
                let value = self.eval(expr)?;
                Err(self.error(ErrorKind::User, value.to_display(), *line))
            }

            Node::Import { assigns, .. } => self.render_import(assigns),

            Node::Do { exprs, .. } => {
                for expr in exprs {
                    self.eval(expr)?;
                }
                Ok(Signal::Normal)
            }

            Node::Hook {
                name,
                assigns,
                capture,
                line,
            } => self.render_hook(name, assigns, *capture, *line),

            // Whitespace handling happened at parse time; the strip node
            // only keeps its body's structure
            Node::Strip { body, .. } => self.render_nodes(body),

            Node::Autostrip { .. } => Ok(Signal::Normal),

            // Reserved keywords: parsed, but no signal is emitted
            Node::Break { .. } | Node::Continue { .. } => Ok(Signal::Normal),
        }
    }

    fn render_if(
        &mut self,
        branches: &[(crate::parser::ast::Expr, NodeList)],
        else_body: Option<&NodeList>,
    ) -> Result<Signal, TemplateError> {
        for (condition, body) in branches {
            if self.eval(condition)?.is_truthy() {
                return self.render_nodes(body);
            }
        }
        if let Some(body) = else_body {
            return self.render_nodes(body);
        }
        Ok(Signal::Normal)
    }

    fn render_scope(
        &mut self,
        assigns: &[crate::parser::ast::Assign],
        body: &NodeList,
    ) -> Result<Signal, TemplateError> {
        self.scope.push_block();
        let result = self
            .apply_assigns(assigns, Compartment::Local)
            .and_then(|()| self.render_nodes(body));
        self.scope.pop_block();
        result
    }
}
