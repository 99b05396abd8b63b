//! Template environment and render façade
//!
//! [`Environment`] owns the parse cache, the hook and library
//! registries, the loader, and the seed variables every render starts
//! its GLOBAL compartment from. It is a cheap handle over shared state;
//! parsed [`Template`]s point back at it weakly, the way a template
//! belongs to the environment that loaded it.
//!
//! [`Template::render`] is the public entry point; [`Template::render_nested`]
//! is the reentrant form for hooks that render other templates into an
//! ongoing render's scope.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::loader::Loader;
use crate::parser;
use crate::parser::ast::NodeList;
use crate::render::engine::Renderer;
use crate::render::errors::{ErrorKind, TemplateError};
use crate::render::Sink;
use crate::scope::Scope;
use crate::value::Value;

/// A host hook invoked by the `hook`/`rhook` actions.
pub type HookFn = Rc<dyn Fn(&mut HookArgs) -> Result<(), TemplateError>>;

/// Arguments passed to a hook invocation.
pub struct HookArgs<'a> {
    pub env: &'a Environment,
    /// Canonical name of the template containing the hook tag
    pub template: &'a str,
    /// Line of the hook tag
    pub line: usize,
    /// The active output sink (capture-aware)
    pub out: &'a mut dyn Sink,
    /// The live render scope
    pub scope: &'a mut Scope,
    /// Evaluated `with` assignments
    pub params: FxHashMap<String, Value>,
    pub userdata: &'a Value,
}

/// Everything produced by a render besides the emitted text: the RETURN
/// and APP compartments and the named section buffers.
#[derive(Debug, Default)]
pub struct RenderResult {
    pub returns: FxHashMap<String, Value>,
    pub app: FxHashMap<String, Value>,
    pub sections: FxHashMap<String, String>,
}

struct EnvInner {
    loader: Box<dyn Loader>,
    globals: RefCell<FxHashMap<String, Value>>,
    cache: RefCell<FxHashMap<String, Rc<Template>>>,
    hooks: RefCell<FxHashMap<String, HookFn>>,
    libraries: RefCell<FxHashMap<String, Value>>,
}

/// A template environment: loader, parse cache, registries, and the
/// GLOBAL seed. Clones share the same underlying state.
#[derive(Clone)]
pub struct Environment {
    inner: Rc<EnvInner>,
}

impl Environment {
    /// Create an environment with seed variables (the GLOBAL
    /// compartment of every render) and a loader.
    pub fn new(globals: FxHashMap<String, Value>, loader: Box<dyn Loader>) -> Environment {
        Environment {
            inner: Rc::new(EnvInner {
                loader,
                globals: RefCell::new(globals),
                cache: RefCell::new(FxHashMap::default()),
                hooks: RefCell::new(FxHashMap::default()),
                libraries: RefCell::new(FxHashMap::default()),
            }),
        }
    }

    /// Set a seed variable for subsequent renders.
    pub fn set_global(&self, name: impl Into<String>, value: Value) {
        self.inner.globals.borrow_mut().insert(name.into(), value);
    }

    /// Register a hook callable. Re-registering a name replaces it.
    pub fn register_hook(&self, name: impl Into<String>, hook: HookFn) {
        self.inner.hooks.borrow_mut().insert(name.into(), hook);
    }

    /// Register a function library importable with the `import` action.
    /// The value is typically a callable or a dict of callables.
    pub fn register_library(&self, name: impl Into<String>, library: Value) {
        self.inner
            .libraries
            .borrow_mut()
            .insert(name.into(), library);
    }

    /// Load, parse, and cache a template by logical name.
    pub fn get_template(&self, name: &str) -> Result<Rc<Template>, TemplateError> {
        let cached = self.inner.cache.borrow().get(name).cloned();
        if let Some(template) = cached {
            return Ok(template);
        }

        let (text, canonical) = self.inner.loader.load(name)?;

        let cached = self.inner.cache.borrow().get(&canonical).cloned();
        if let Some(template) = cached {
            self.inner
                .cache
                .borrow_mut()
                .insert(name.to_string(), Rc::clone(&template));
            return Ok(template);
        }

        let nodes = parser::parse(&canonical, &text)?;
        let template = Rc::new(Template {
            env: Rc::downgrade(&self.inner),
            name: canonical.clone(),
            nodes: Rc::new(nodes),
        });

        let mut cache = self.inner.cache.borrow_mut();
        cache.insert(canonical, Rc::clone(&template));
        if template.name != name {
            cache.insert(name.to_string(), Rc::clone(&template));
        }
        Ok(template)
    }

    /// Parse template text directly and cache it under `name`, without
    /// going through the loader.
    pub fn parse_str(&self, name: &str, text: &str) -> Result<Rc<Template>, TemplateError> {
        let nodes = parser::parse(name, text)?;
        let template = Rc::new(Template {
            env: Rc::downgrade(&self.inner),
            name: name.to_string(),
            nodes: Rc::new(nodes),
        });
        self.inner
            .cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&template));
        Ok(template)
    }

    pub(crate) fn hook(&self, name: &str) -> Option<HookFn> {
        self.inner.hooks.borrow().get(name).cloned()
    }

    pub(crate) fn library(&self, name: &str) -> Option<Value> {
        self.inner.libraries.borrow().get(name).cloned()
    }

    pub(crate) fn globals_seed(&self) -> FxHashMap<String, Value> {
        self.inner.globals.borrow().clone()
    }
}

/// A parsed template owned by its environment.
pub struct Template {
    env: Weak<EnvInner>,
    /// Canonical name, used for error reporting and relative includes
    pub name: String,
    pub(crate) nodes: Rc<NodeList>,
}

impl Template {
    fn environment(&self) -> Result<Environment, TemplateError> {
        self.env
            .upgrade()
            .map(|inner| Environment { inner })
            .ok_or_else(|| {
                TemplateError::new(
                    ErrorKind::Internal,
                    "environment dropped before render",
                    &self.name,
                    0,
                )
            })
    }

    /// Render the template.
    ///
    /// `locals` seeds the root LOCAL frame, `userdata` is passed through
    /// to hooks and host callables untouched, and the abort predicate is
    /// polled at every node entry. Output already emitted before an
    /// abort stays in the sink.
    pub fn render(
        &self,
        out: &mut dyn Sink,
        locals: Option<FxHashMap<String, Value>>,
        userdata: Value,
        abort_fn: Option<&dyn Fn() -> bool>,
    ) -> Result<RenderResult, TemplateError> {
        let env = self.environment()?;

        let mut scope = Scope::new(env.globals_seed());
        if let Some(locals) = locals {
            scope.update_local(locals);
        }

        let mut renderer = Renderer::new(
            env,
            self.name.clone(),
            &mut scope,
            out,
            userdata,
            abort_fn,
        );
        let nodes = Rc::clone(&self.nodes);
        renderer.render_nodes(&nodes)?;
        let sections = renderer.into_sections();

        Ok(RenderResult {
            returns: scope.take_returns(),
            app: scope.take_app(),
            sections,
        })
    }

    /// Reentrant render into an existing scope, used by hooks. Pushes
    /// one include frame for the duration and returns a snapshot of the
    /// RETURN compartment.
    pub fn render_nested(
        &self,
        out: &mut dyn Sink,
        scope: &mut Scope,
        userdata: Value,
    ) -> Result<FxHashMap<String, Value>, TemplateError> {
        let env = self.environment()?;

        scope.push_include();
        let mut renderer = Renderer::new(env, self.name.clone(), scope, out, userdata, None);
        let nodes = Rc::clone(&self.nodes);
        let result = renderer.render_nodes(&nodes);
        drop(renderer);
        scope.pop_include();

        result?;
        Ok(scope.snapshot_returns())
    }
}
