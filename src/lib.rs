//! # Introduction
//!
//! Stencil is a text templating engine. A template is literal text
//! interleaved with tagged directives controlling substitution,
//! iteration, conditionals, scoping, and composition of other
//! templates.
//!
//! ## Rendering pipeline
//!
//! ```text
//! Source → Lexer → Parser → Node tree → Renderer → Sink
//! ```
//!
//! 1. [`parser`] — tokenises the source and builds the node tree,
//!    resolving whitespace-control border flags along the way.
//! 2. [`render`] — walks the tree against a compartmented [`scope::Scope`],
//!    emitting text into a caller-provided [`Sink`].
//! 3. [`env`] — the [`Environment`] façade owning parsed templates,
//!    hook and library registries, and the loader.
//!
//! ## Tag syntax
//!
//! Comments `{# ... #}`, actions `{% ... %}`, emitters `{{ ... }}`.
//! Border flags `- ^ + *` just inside an opener or closer control the
//! whitespace of the adjacent text. Variables live in compartments
//! (local, global, private, return, app) selected by a `x@name` prefix
//! or inferred from the name.
//!
//! ## Example
//!
//! ```
//! use stencil::{Environment, MemoryLoader, Value};
//!
//! let mut loader = MemoryLoader::new();
//! loader.insert("hello", "Hello {{ name }}!");
//!
//! let env = Environment::new(Default::default(), Box::new(loader));
//! env.set_global("name", Value::Str("World".to_string()));
//!
//! let template = env.get_template("hello").unwrap();
//! let mut out = String::new();
//! template.render(&mut out, None, Value::None, None).unwrap();
//! assert_eq!(out, "Hello World!");
//! ```

pub mod env;
pub mod json;
pub mod loader;
pub mod parser;
pub mod render;
pub mod scope;
pub mod value;

pub use env::{Environment, HookArgs, HookFn, RenderResult, Template};
pub use loader::{Loader, MemoryLoader};
pub use render::errors::{ErrorKind, TemplateError};
pub use render::{Sink, WriteSink};
pub use scope::{Compartment, Scope};
pub use value::{Callable, HostFn, OpaqueValue, Value};
