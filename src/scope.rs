//! Variable scope implementation
//!
//! This module provides the compartmented variable store used during a
//! render:
//! - [`Scope`]: a stack of frames plus the per-render singleton maps
//! - [`Frame`]: one stack entry holding a LOCAL and a PRIVATE map
//! - [`Compartment`]: the namespace a variable lives in
//!
//! # Compartments
//!
//! LOCAL and PRIVATE live in the current frame. GLOBAL, RETURN, and APP
//! are single maps shared by the whole render. A block push (`scope`
//! action) copies LOCAL and PRIVATE shallowly into the new frame; an
//! include push copies LOCAL but starts PRIVATE empty, which is what
//! keeps a caller's private variables invisible to included templates.
//!
//! Reads from LOCAL fall back to the GLOBAL map, so a plain name finds
//! global writes without a `g@` prefix.

use rustc_hash::FxHashMap;

use crate::value::Value;

/// The namespace a variable name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compartment {
    Local,
    Global,
    Private,
    Return,
    App,
}

impl Compartment {
    /// Map an explicit prefix character (`l@x`, `g@x`, ...) to its
    /// compartment.
    pub fn from_prefix(ch: char) -> Option<Compartment> {
        match ch {
            'l' => Some(Compartment::Local),
            'g' => Some(Compartment::Global),
            'p' => Some(Compartment::Private),
            'r' => Some(Compartment::Return),
            'a' => Some(Compartment::App),
            _ => None,
        }
    }

    /// Map a compartment keyword (as used by `clear` and `expand`).
    pub fn from_keyword(word: &str) -> Option<Compartment> {
        match word {
            "local" => Some(Compartment::Local),
            "global" => Some(Compartment::Global),
            "private" => Some(Compartment::Private),
            "return" => Some(Compartment::Return),
            "app" => Some(Compartment::App),
            _ => None,
        }
    }

    /// Infer the default compartment from a bare name: `_` alone or a
    /// leading underscore means PRIVATE, a leading and trailing
    /// underscore (`_x_`) means GLOBAL, anything else is LOCAL.
    pub fn infer(name: &str) -> Compartment {
        if name == "_" {
            Compartment::Private
        } else if name.starts_with('_') {
            if name.ends_with('_') {
                Compartment::Global
            } else {
                Compartment::Private
            }
        } else {
            Compartment::Local
        }
    }
}

/// One entry on the scope stack.
#[derive(Debug, Clone, Default)]
struct Frame {
    local: FxHashMap<String, Value>,
    private: FxHashMap<String, Value>,
    /// Marked on include pushes; `template` assignments resolve to the
    /// nearest marked frame's LOCAL map.
    template_root: bool,
}

/// Snapshot of a frame taken when a template function is defined.
#[derive(Debug, Clone, Default)]
pub struct CapturedScope {
    pub local: FxHashMap<String, Value>,
    pub private: FxHashMap<String, Value>,
}

/// The variable store for one render invocation.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
    globals: FxHashMap<String, Value>,
    returns: FxHashMap<String, Value>,
    app: FxHashMap<String, Value>,
}

impl Scope {
    /// Create a scope for a new render, seeded with the environment's
    /// global variables.
    pub fn new(globals: FxHashMap<String, Value>) -> Self {
        Scope {
            frames: vec![Frame {
                template_root: true,
                ..Frame::default()
            }],
            globals,
            returns: FxHashMap::default(),
            app: FxHashMap::default(),
        }
    }

    /// Current stack depth, in frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Look a name up in a compartment. LOCAL lookups fall back to the
    /// GLOBAL map when the current frame has no binding.
    pub fn get(&self, name: &str, compartment: Compartment) -> Option<&Value> {
        match compartment {
            Compartment::Local => self
                .frames
                .last()
                .and_then(|f| f.local.get(name))
                .or_else(|| self.globals.get(name)),
            Compartment::Private => self.frames.last().and_then(|f| f.private.get(name)),
            Compartment::Global => self.globals.get(name),
            Compartment::Return => self.returns.get(name),
            Compartment::App => self.app.get(name),
        }
    }

    /// Bind a name in a compartment.
    pub fn set(&mut self, name: impl Into<String>, compartment: Compartment, value: Value) {
        let name = name.into();
        match compartment {
            Compartment::Local => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.local.insert(name, value);
                }
            }
            Compartment::Private => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.private.insert(name, value);
                }
            }
            Compartment::Global => {
                self.globals.insert(name, value);
            }
            Compartment::Return => {
                self.returns.insert(name, value);
            }
            Compartment::App => {
                self.app.insert(name, value);
            }
        }
    }

    /// Bind a name in the LOCAL map of the enclosing template root
    /// frame (the frame pushed by the innermost include).
    pub fn set_template_root(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.template_root) {
            frame.local.insert(name.into(), value);
        }
    }

    /// Remove a name from a compartment. LOCAL and PRIVATE affect the
    /// current frame only.
    pub fn unset(&mut self, name: &str, compartment: Compartment) {
        match compartment {
            Compartment::Local => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.local.remove(name);
                }
            }
            Compartment::Private => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.private.remove(name);
                }
            }
            Compartment::Global => {
                self.globals.remove(name);
            }
            Compartment::Return => {
                self.returns.remove(name);
            }
            Compartment::App => {
                self.app.remove(name);
            }
        }
    }

    /// Empty a compartment. LOCAL and PRIVATE clear the current frame's
    /// map only.
    pub fn clear(&mut self, compartment: Compartment) {
        match compartment {
            Compartment::Local => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.local.clear();
                }
            }
            Compartment::Private => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.private.clear();
                }
            }
            Compartment::Global => self.globals.clear(),
            Compartment::Return => self.returns.clear(),
            Compartment::App => self.app.clear(),
        }
    }

    /// Enter a `scope` block: the new frame inherits shallow copies of
    /// the caller's LOCAL and PRIVATE maps.
    pub fn push_block(&mut self) {
        let frame = match self.frames.last() {
            Some(current) => Frame {
                local: current.local.clone(),
                private: current.private.clone(),
                template_root: false,
            },
            None => Frame::default(),
        };
        self.frames.push(frame);
    }

    /// Leave a `scope` block.
    pub fn pop_block(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Enter an included template: LOCAL is copied from the caller,
    /// PRIVATE starts empty, and the frame becomes the template root for
    /// `template` assignments.
    pub fn push_include(&mut self) {
        let local = self
            .frames
            .last()
            .map(|f| f.local.clone())
            .unwrap_or_default();
        self.frames.push(Frame {
            local,
            private: FxHashMap::default(),
            template_root: true,
        });
    }

    /// Leave an included template, restoring the caller's maps.
    pub fn pop_include(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Push a frame seeded from a template function's captured scope.
    pub fn push_captured(&mut self, captured: &CapturedScope) {
        self.frames.push(Frame {
            local: captured.local.clone(),
            private: captured.private.clone(),
            template_root: false,
        });
    }

    /// Snapshot the current frame for a template function definition.
    pub fn capture(&self) -> CapturedScope {
        match self.frames.last() {
            Some(frame) => CapturedScope {
                local: frame.local.clone(),
                private: frame.private.clone(),
            },
            None => CapturedScope::default(),
        }
    }

    /// Merge values into the current LOCAL map.
    pub fn update_local(&mut self, values: FxHashMap<String, Value>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.local.extend(values);
        }
    }

    /// Take the RETURN map, leaving it empty.
    pub fn take_returns(&mut self) -> FxHashMap<String, Value> {
        std::mem::take(&mut self.returns)
    }

    /// A copy of the RETURN map.
    pub fn snapshot_returns(&self) -> FxHashMap<String, Value> {
        self.returns.clone()
    }

    /// Take the APP map, leaving it empty.
    pub fn take_app(&mut self) -> FxHashMap<String, Value> {
        std::mem::take(&mut self.app)
    }
}
