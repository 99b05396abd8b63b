// Integration tests for border-flag whitespace control and the
// autostrip/autotrim modes

use rustc_hash::FxHashMap;

use stencil::{Environment, MemoryLoader, Value};

fn render(source: &str) -> String {
    let env = Environment::new(FxHashMap::default(), Box::new(MemoryLoader::new()));
    let template = env.parse_str("test", source).expect("parse failed");
    let mut out = String::new();
    template
        .render(&mut out, None, Value::None, None)
        .expect("render failed");
    out
}

#[test]
fn test_no_flags_preserve_text() {
    assert_eq!(render("a \n {% set x = 1 %} \n b"), "a \n  \n b");
}

#[test]
fn test_strip_flag_consumes_newline() {
    assert_eq!(render("a\n  {%- set x = 1 -%}  \nb"), "ab");
}

#[test]
fn test_strip_flag_stops_past_newline() {
    // Stripping eats up to and including the nearest newline, no further
    assert_eq!(render("a  \n  {%- set x = 1 -%}  \n  b"), "a    b");
}

#[test]
fn test_caret_flag_keeps_newline() {
    assert_eq!(render("a  \n  {%^ set x = 1 ^%}  \n  b"), "a  \n\n  b");
}

#[test]
fn test_strip_without_newline_takes_whole_run() {
    assert_eq!(render("a  {%- set x = 1 -%}  b"), "ab");
}

#[test]
fn test_strip_stops_at_content() {
    // Only the whitespace run adjacent to the tag is affected
    assert_eq!(render("a b\n c {%- set x = 1 %}"), "a b\n c");
}

#[test]
fn test_add_newline_flag() {
    assert_eq!(render("A{%+ set x = 1 +%}B"), "A\n\nB");
}

#[test]
fn test_add_space_flag() {
    assert_eq!(render("A{%* set x = 1 *%}B"), "A  B");
}

#[test]
fn test_add_flags_synthesize_text_between_adjacent_tags() {
    // No literal text exists between the tags; the flags create it
    assert_eq!(render("{% set x = 1 +%}{%+ set y = 2 %}"), "\n\n");
}

#[test]
fn test_flags_on_emitters_and_comments() {
    assert_eq!(render("x  {{- \"v\" -}}  y"), "xvy");
    assert_eq!(render("x  {#- note -#}  y"), "xy");
}

#[test]
fn test_autostrip_strips_unflagged_spans() {
    assert_eq!(render("{% autostrip %}  a  {% set x = 1 %}  b  "), "ab");
}

#[test]
fn test_autostrip_suppresses_strip_flags_but_not_add_flags() {
    assert_eq!(
        render("{% autostrip %}  a  {%^ set x = 1 +%}  b  "),
        "a\nb"
    );
}

#[test]
fn test_no_autostrip_restores_default() {
    assert_eq!(
        render("{% autostrip %} a {% no_autostrip %} b "),
        "a b "
    );
}

#[test]
fn test_autotrim_drops_blank_lines_and_indent() {
    assert_eq!(
        render("{% autotrim %}\n  one\n   \n  two\n{% set x = 1 %}"),
        "one\ntwo"
    );
}

#[test]
fn test_strip_block_scopes_the_mode() {
    assert_eq!(
        render("{% strip on %}  a  {% endstrip %}|  b  "),
        "a|  b  "
    );
}

#[test]
fn test_strip_off_inside_autostrip() {
    assert_eq!(
        render("{% autostrip %} a {% strip off %} b {% endstrip %} c "),
        "a b c"
    );
}

#[test]
fn test_whitespace_output_is_deterministic() {
    let source = "a  \n  {%- if x %}  y  {%^ endif ^%}  \n  b";
    let env = Environment::new(FxHashMap::default(), Box::new(MemoryLoader::new()));
    let template = env.parse_str("test", source).expect("parse failed");

    let mut locals = FxHashMap::default();
    locals.insert("x".to_string(), Value::Bool(true));

    let mut first = String::new();
    template
        .render(&mut first, Some(locals.clone()), Value::None, None)
        .unwrap();
    let mut second = String::new();
    template
        .render(&mut second, Some(locals), Value::None, None)
        .unwrap();
    assert_eq!(first, second);
}
