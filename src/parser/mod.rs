//! Template parsing
//!
//! This module turns template source text into a tree of typed nodes:
//! - [`lexer`]: splits the source into text spans and tag tokens and
//!   tokenizes expression syntax inside tags
//! - [`ast`]: the node and expression tree types
//! - The parser itself, spread across `parser.rs` (driver and
//!   whitespace controller), `expressions.rs` (precedence climbing),
//!   and `actions.rs` (action tags and nesting validation)
//!
//! Parsing either returns a complete tree or a [`TemplateError`] with
//! the failing source line; no partial trees escape.
//!
//! [`TemplateError`]: crate::render::errors::TemplateError

pub mod ast;
pub mod lexer;

mod actions;
mod expressions;
#[allow(clippy::module_inception)]
mod parser;

pub use parser::parse;

#[cfg(test)]
mod tests {
    use super::ast::{Node, SetWhere};
    use super::parse;
    use crate::render::errors::ErrorKind;
    use crate::scope::Compartment;

    #[test]
    fn test_parse_idempotence() {
        let source = r#"Hello {{ name }}!
{% if a == 1 %}one{% elif a == 2 %}two{% else %}other{% endif %}
{% foreach x, i in xs %}{{ i }}:{{ x }}{% endforeach %}
{% set a = 1, b = [1, 2], c = [k: "v"] ; else a = 0 %}
{% include "part" ; return r ; with x = 1 %}"#;
        let first = parse("test", source).unwrap();
        let second = parse("test", source).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_and_emit() {
        let nodes = parse("test", "Hello {{ name }}!").unwrap();
        assert_eq!(nodes.nodes.len(), 3);
        assert!(matches!(&nodes.nodes[0], Node::Text { text, .. } if text == "Hello "));
        assert!(matches!(&nodes.nodes[1], Node::Emit { .. }));
        assert!(matches!(&nodes.nodes[2], Node::Text { text, .. } if text == "!"));
    }

    #[test]
    fn test_constant_emit_folds_to_text() {
        let nodes = parse("test", "{{ \"hi\" }}").unwrap();
        assert_eq!(nodes.nodes.len(), 1);
        assert!(matches!(&nodes.nodes[0], Node::Text { text, .. } if text == "hi"));
    }

    #[test]
    fn test_if_chain() {
        let nodes = parse(
            "test",
            "{% if a %}1{% elif b %}2{% elif c %}3{% else %}4{% endif %}",
        )
        .unwrap();
        match &nodes.nodes[0] {
            Node::If {
                branches,
                else_body,
                ..
            } => {
                assert_eq!(branches.len(), 3);
                assert!(else_body.is_some());
            }
            other => panic!("expected if node, got {:?}", other),
        }
    }

    #[test]
    fn test_set_with_else_segment() {
        let nodes = parse("test", "{% global x = 1 ; else x = 0 %}").unwrap();
        match &nodes.nodes[0] {
            Node::Set {
                where_,
                assigns,
                else_assigns,
                ..
            } => {
                assert_eq!(*where_, SetWhere::Global);
                assert_eq!(assigns.len(), 1);
                assert_eq!(else_assigns.as_ref().map(|a| a.len()), Some(1));
            }
            other => panic!("expected set node, got {:?}", other),
        }
    }

    #[test]
    fn test_switch_default_and_cases() {
        let nodes = parse(
            "test",
            "{% switch x %}none{% eq 1 %}one{% bt 2, 5 %}some{% endswitch %}",
        )
        .unwrap();
        match &nodes.nodes[0] {
            Node::Switch { cases, default, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(!default.is_empty());
            }
            other => panic!("expected switch node, got {:?}", other),
        }
    }

    #[test]
    fn test_compartment_prefix_target() {
        let nodes = parse("test", "{% set g@x = 1 %}").unwrap();
        match &nodes.nodes[0] {
            Node::Set { assigns, .. } => {
                assert_eq!(assigns[0].target.name, "x");
                assert_eq!(assigns[0].target.compartment, Some(Compartment::Global));
            }
            other => panic!("expected set node, got {:?}", other),
        }
    }

    #[test]
    fn test_node_lines() {
        let nodes = parse("test", "line one\n{% if x %}\n{% endif %}").unwrap();
        let if_node = nodes
            .nodes
            .iter()
            .find(|n| matches!(n, Node::If { .. }))
            .unwrap();
        assert_eq!(if_node.line(), 2);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = parse("test", "{% frobnicate x %}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert!(err.message.contains("unknown action tag"));
    }

    #[test]
    fn test_orphan_elif_rejected() {
        let err = parse("test", "{% elif x %}").unwrap_err();
        assert!(err.message.contains("mismatched elif"));
    }

    #[test]
    fn test_elif_after_else_rejected() {
        let err = parse(
            "test",
            "{% if a %}1{% else %}2{% elif b %}3{% endif %}",
        )
        .unwrap_err();
        assert!(err.message.contains("mismatched elif"));
    }

    #[test]
    fn test_mismatched_end_rejected() {
        let err = parse("test", "{% if a %}1{% endfor %}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_unclosed_segment_rejected() {
        let err = parse("test", "{% if a %}1").unwrap_err();
        assert!(err.message.contains("unmatched action tag"));
    }

    #[test]
    fn test_case_outside_switch_rejected() {
        let err = parse("test", "{% eq 1 %}").unwrap_err();
        assert!(err.message.contains("can only occur in switch"));
    }

    #[test]
    fn test_empty_action_tag_is_whitespace_control() {
        let nodes = parse("test", "A{%- -%}B").unwrap();
        assert_eq!(nodes.nodes.len(), 2);
        assert!(matches!(&nodes.nodes[0], Node::Text { text, .. } if text == "A"));
        assert!(matches!(&nodes.nodes[1], Node::Text { text, .. } if text == "B"));
    }

    #[test]
    fn test_comment_produces_no_nodes() {
        let nodes = parse("test", "a{# note #}b").unwrap();
        assert_eq!(nodes.nodes.len(), 2);
    }
}
