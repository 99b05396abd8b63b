//! AST definitions for parsed templates
//!
//! A parsed template is a [`NodeList`] of action [`Node`]s; expressions
//! inside tags become [`Expr`] trees. Every node and expression records
//! the source line of its opening tag for error reporting. Parsed trees
//! are never mutated by the renderer, so one tree can back many renders.

use std::rc::Rc;

use crate::scope::Compartment;
use crate::value::Value;

/// Binary operators in expression position. `And` and `Or` short-circuit
/// during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value
    Value { value: Value, line: usize },

    /// A list literal `[a, b, c]`
    List { items: Vec<Expr>, line: usize },

    /// A dict literal `[k: v, ...]`; keys must evaluate to strings
    Dict { pairs: Vec<(Expr, Expr)>, line: usize },

    /// A variable reference with its resolved compartment
    Var {
        compartment: Compartment,
        name: String,
        line: usize,
    },

    /// Attribute lookup `base.name`
    Attr {
        base: Box<Expr>,
        name: String,
        line: usize,
    },

    /// Item lookup `base[index]`
    Item {
        base: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },

    /// Call `base(args)`
    Call {
        base: Box<Expr>,
        args: Vec<Expr>,
        line: usize,
    },

    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        line: usize,
    },

    Unary {
        op: UnOp,
        expr: Box<Expr>,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Value { line, .. }
            | Expr::List { line, .. }
            | Expr::Dict { line, .. }
            | Expr::Var { line, .. }
            | Expr::Attr { line, .. }
            | Expr::Item { line, .. }
            | Expr::Call { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Unary { line, .. } => *line,
        }
    }
}

/// An assignment target: a name plus an optional explicit compartment
/// prefix. When no prefix is present the binding site decides the
/// default (the action's compartment for the set family, name inference
/// elsewhere).
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub name: String,
    pub compartment: Option<Compartment>,
}

impl Target {
    /// Resolve against a site default compartment.
    pub fn resolve(&self, default: Compartment) -> Compartment {
        self.compartment.unwrap_or(default)
    }

    /// Resolve using name inference as the default.
    pub fn resolve_inferred(&self) -> Compartment {
        self.compartment
            .unwrap_or_else(|| Compartment::infer(&self.name))
    }
}

/// One `target = expr` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: Target,
    pub expr: Expr,
}

/// Compartment family of a set-style action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetWhere {
    Local,
    Global,
    Template,
    Private,
}

/// Relational operator of a switch case tag. All take one argument
/// except `Between`, which takes two and matches inclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOp {
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
    Eq,
    Between,
}

impl CaseOp {
    pub fn from_word(word: &str) -> Option<CaseOp> {
        match word {
            "lt" => Some(CaseOp::Lt),
            "le" => Some(CaseOp::Le),
            "gt" => Some(CaseOp::Gt),
            "ge" => Some(CaseOp::Ge),
            "ne" => Some(CaseOp::Ne),
            "eq" => Some(CaseOp::Eq),
            "bt" => Some(CaseOp::Between),
            _ => None,
        }
    }

    pub fn arg_count(&self) -> usize {
        match self {
            CaseOp::Between => 2,
            _ => 1,
        }
    }
}

/// One case of a switch segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub op: CaseOp,
    pub args: Vec<Expr>,
    pub body: NodeList,
}

/// Text-strip mode set by `strip`/`autostrip` actions. The mode is
/// consumed at parse time when text buffers are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripMode {
    #[default]
    None,
    Strip,
    Trim,
}

/// An ordered list of nodes forming a template body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeList {
    pub nodes: Vec<Node>,
}

impl NodeList {
    pub fn new() -> Self {
        NodeList::default()
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A parsed action node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, already whitespace-resolved
    Text { text: String, line: usize },

    /// `{{ expr }}`
    Emit { expr: Expr, line: usize },

    /// `if` / `elif` chain with optional `else`
    If {
        branches: Vec<(Expr, NodeList)>,
        else_body: Option<NodeList>,
        line: usize,
    },

    /// `foreach VAR[, IVAR] in EXPR`
    ForEach {
        var: Target,
        index_var: Option<Target>,
        iterable: Expr,
        body: NodeList,
        else_body: Option<NodeList>,
        line: usize,
    },

    /// `for INIT ; TEST ; INCR`
    ForCounter {
        init: Vec<Assign>,
        test: Expr,
        incr: Vec<Assign>,
        body: NodeList,
        else_body: Option<NodeList>,
        line: usize,
    },

    /// `switch EXPR` with case segments; the default body is the run of
    /// nodes before the first case tag
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: NodeList,
        line: usize,
    },

    /// `set` / `global` / `template` / `private` multi-assignment with
    /// optional `; else` recovery assignments
    Set {
        where_: SetWhere,
        assigns: Vec<Assign>,
        else_assigns: Option<Vec<Assign>>,
        line: usize,
    },

    /// `unset VARS`
    Unset { targets: Vec<Target>, line: usize },

    /// `save VARS` ... `endsave`; the saved values are written back
    /// when the block ends, whether or not the body succeeded
    Save {
        targets: Vec<Target>,
        body: NodeList,
        line: usize,
    },

    /// `clear [compartment]`
    Clear {
        compartment: Compartment,
        line: usize,
    },

    /// `scope [ASSIGNS]` ... `endscope`
    Scope {
        assigns: Vec<Assign>,
        body: NodeList,
        line: usize,
    },

    /// `include PATH [; return VAR] [; with ASSIGNS]`
    Include {
        path: Expr,
        assigns: Vec<Assign>,
        return_var: Option<Target>,
        line: usize,
    },

    /// `expand EXPR [; compartment]`
    Expand {
        expr: Expr,
        compartment: Compartment,
        line: usize,
    },

    /// `return ASSIGNS`
    Return { assigns: Vec<Assign>, line: usize },

    /// `def NAME(PARAMS)` ... `enddef`
    Def {
        target: Target,
        params: Vec<String>,
        body: Rc<NodeList>,
        line: usize,
    },

    /// `call EXPR`
    Call { expr: Expr, line: usize },

    /// `section NAME-EXPR` ... `endsection`
    Section {
        name: Expr,
        body: NodeList,
        line: usize,
    },

    /// `use NAME-EXPR`
    Use { name: Expr, line: usize },

    /// `var NAME` ... `endvar`
    Var {
        target: Target,
        body: NodeList,
        line: usize,
    },

    /// `error EXPR`
    Error { expr: Expr, line: usize },

    /// `import NAME = LIB, ...`
    Import { assigns: Vec<Assign>, line: usize },

    /// `do EXPR, ...`
    Do { exprs: Vec<Expr>, line: usize },

    /// `hook EXPR [; with ASSIGNS]`; `capture` is set for `rhook`
    Hook {
        name: Expr,
        assigns: Vec<Assign>,
        capture: bool,
        line: usize,
    },

    /// `strip [mode]` ... `endstrip`; the mode applied to child text at
    /// parse time
    Strip { body: NodeList, line: usize },

    /// `autostrip` / `autotrim` / `no_autostrip`; consumed at parse time
    Autostrip { mode: StripMode, line: usize },

    /// Reserved: parsed but renders as a no-op
    Break { line: usize },

    /// Reserved: parsed but renders as a no-op
    Continue { line: usize },
}

impl Node {
    /// Returns the source line of the node's opening tag.
    pub fn line(&self) -> usize {
        match self {
            Node::Text { line, .. }
            | Node::Emit { line, .. }
            | Node::If { line, .. }
            | Node::ForEach { line, .. }
            | Node::ForCounter { line, .. }
            | Node::Switch { line, .. }
            | Node::Set { line, .. }
            | Node::Unset { line, .. }
            | Node::Save { line, .. }
            | Node::Clear { line, .. }
            | Node::Scope { line, .. }
            | Node::Include { line, .. }
            | Node::Expand { line, .. }
            | Node::Return { line, .. }
            | Node::Def { line, .. }
            | Node::Call { line, .. }
            | Node::Section { line, .. }
            | Node::Use { line, .. }
            | Node::Var { line, .. }
            | Node::Error { line, .. }
            | Node::Import { line, .. }
            | Node::Do { line, .. }
            | Node::Hook { line, .. }
            | Node::Strip { line, .. }
            | Node::Autostrip { line, .. }
            | Node::Break { line }
            | Node::Continue { line } => *line,
        }
    }
}
