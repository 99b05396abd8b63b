// Integration tests for template composition: includes, compartment
// discipline across templates, and nested renders

use rustc_hash::FxHashMap;

use stencil::{Environment, ErrorKind, MemoryLoader, Scope, Value};

fn env_with(templates: &[(&str, &str)]) -> Environment {
    let mut loader = MemoryLoader::new();
    for (name, text) in templates {
        loader.insert(*name, *text);
    }
    Environment::new(FxHashMap::default(), Box::new(loader))
}

fn render_template(env: &Environment, name: &str) -> (String, stencil::RenderResult) {
    let template = env.get_template(name).expect("load failed");
    let mut out = String::new();
    let result = template
        .render(&mut out, None, Value::None, None)
        .expect("render failed");
    (out, result)
}

#[test]
fn test_basic_include() {
    let env = env_with(&[
        ("outer.tmpl", "a[{% include \"inner.tmpl\" %}]b"),
        ("inner.tmpl", "inner"),
    ]);
    let (out, _) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "a[inner]b");
}

#[test]
fn test_include_with_assignments_seed_callee_locals() {
    let env = env_with(&[
        ("outer.tmpl", "{% include \"inner.tmpl\" ; with n = 6 * 7 %}"),
        ("inner.tmpl", "n={{ n }}"),
    ]);
    let (out, _) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "n=42");
}

#[test]
fn test_local_copy_on_include() {
    // The callee sees the caller's locals but writes to its own copy
    let env = env_with(&[
        (
            "outer.tmpl",
            "{% set x = 1 %}{% include \"inner.tmpl\" %}:{{ x }}",
        ),
        ("inner.tmpl", "{{ x }}{% set x = 2 %}{{ x }}"),
    ]);
    let (out, _) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "12:1");
}

#[test]
fn test_private_isolation_across_include() {
    let env = env_with(&[
        (
            "outer.tmpl",
            "{% private _p = 1 %}{% include \"inner.tmpl\" %}{{ _p }}",
        ),
        ("inner.tmpl", "{% private _p = 99 %}"),
    ]);
    let (out, _) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "1");
}

#[test]
fn test_callee_cannot_read_caller_private() {
    let env = env_with(&[
        (
            "outer.tmpl",
            "{% private _p = 1 %}{% include \"inner.tmpl\" %}",
        ),
        ("inner.tmpl", "{% set seen = _p ; else seen = \"hidden\" %}{{ seen }}"),
    ]);
    let (out, _) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "hidden");
}

#[test]
fn test_global_write_in_include_persists() {
    let env = env_with(&[
        ("outer.tmpl", "{% include \"inner.tmpl\" %}{{ gg }}"),
        ("inner.tmpl", "{% global gg = 5 %}"),
    ]);
    let (out, _) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "5");
}

#[test]
fn test_include_return_variable_harvests_and_clears() {
    let env = env_with(&[
        (
            "outer.tmpl",
            "{% include \"inner.tmpl\" ; return r %}{{ r.x }},{{ r.y }}",
        ),
        ("inner.tmpl", "{% return x = 1, y = \"two\" %}"),
    ]);
    let (out, result) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "1,two");
    // Harvesting emptied the RETURN compartment
    assert!(result.returns.is_empty());
}

#[test]
fn test_include_without_return_var_leaves_return_map() {
    let env = env_with(&[
        ("outer.tmpl", "{% include \"inner.tmpl\" %}"),
        ("inner.tmpl", "{% return x = 1 %}"),
    ]);
    let (_, result) = render_template(&env, "outer.tmpl");
    assert_eq!(result.returns.get("x"), Some(&Value::Int(1)));
}

#[test]
fn test_relative_include_resolution() {
    let env = env_with(&[
        ("pages/home.tmpl", "{% include \"part.tmpl\" %}"),
        ("pages/part.tmpl", "sibling"),
    ]);
    let (out, _) = render_template(&env, "pages/home.tmpl");
    assert_eq!(out, "sibling");
}

#[test]
fn test_root_relative_include_resolution() {
    let env = env_with(&[
        ("pages/home.tmpl", "{% include \"/shared/nav.tmpl\" %}"),
        ("shared/nav.tmpl", "nav"),
    ]);
    let (out, _) = render_template(&env, "pages/home.tmpl");
    assert_eq!(out, "nav");
}

#[test]
fn test_missing_include_is_not_found() {
    let env = env_with(&[("outer.tmpl", "{% include \"gone.tmpl\" %}")]);
    let template = env.get_template("outer.tmpl").unwrap();
    let mut out = String::new();
    let err = template.render(&mut out, None, Value::None, None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[test]
fn test_error_chain_lists_include_frames() {
    let env = env_with(&[
        ("outer.tmpl", "line1\n{% include \"inner.tmpl\" %}"),
        ("inner.tmpl", "{{ missing }}"),
    ]);
    let template = env.get_template("outer.tmpl").unwrap();
    let mut out = String::new();
    let err = template.render(&mut out, None, Value::None, None).unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnknownVariable);
    assert_eq!(err.template, "inner.tmpl");
    assert_eq!(err.line, 1);
    assert_eq!(err.chain, vec![("outer.tmpl".to_string(), 2)]);

    let text = err.to_string();
    assert!(text.contains("inner.tmpl:1"));
    assert!(text.contains("included from outer.tmpl:2"));
}

#[test]
fn test_sections_captured_in_includes_surface_in_result() {
    let env = env_with(&[
        ("outer.tmpl", "{% include \"inner.tmpl\" %}{% use \"head\" %}"),
        ("inner.tmpl", "{% section \"head\" %}TITLE{% endsection %}"),
    ]);
    let (out, result) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "TITLE");
    assert_eq!(result.sections.get("head").map(String::as_str), Some("TITLE"));
}

#[test]
fn test_parsed_template_is_reused() {
    let env = env_with(&[
        (
            "outer.tmpl",
            "{% include \"inner.tmpl\" %}{% include \"inner.tmpl\" %}",
        ),
        ("inner.tmpl", "x"),
    ]);
    let (out, _) = render_template(&env, "outer.tmpl");
    assert_eq!(out, "xx");

    let first = env.get_template("inner.tmpl").unwrap();
    let second = env.get_template("inner.tmpl").unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, &second));
}

#[test]
fn test_scope_depth_restored_by_nested_render() {
    let env = env_with(&[
        (
            "outer.tmpl",
            "{% scope %}{% include \"inner.tmpl\" %}{% endscope %}",
        ),
        ("inner.tmpl", "{% scope %}deep{% endscope %}"),
    ]);
    let template = env.get_template("outer.tmpl").unwrap();

    let mut scope = Scope::new(FxHashMap::default());
    let depth_before = scope.depth();

    let mut out = String::new();
    template
        .render_nested(&mut out, &mut scope, Value::None)
        .unwrap();

    assert_eq!(out, "deep");
    assert_eq!(scope.depth(), depth_before);
}

#[test]
fn test_save_restores_even_when_body_fails() {
    let env = env_with(&[]);
    let template = env
        .parse_str(
            "test",
            "{% save g@gg %}{% global gg = 9 %}{% error \"boom\" %}{% endsave %}",
        )
        .unwrap();

    let mut globals = FxHashMap::default();
    globals.insert("gg".to_string(), Value::Int(1));
    let mut scope = Scope::new(globals);

    let mut out = String::new();
    let err = template
        .render_nested(&mut out, &mut scope, Value::None)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::User);

    // The error unwound through the save block, which put the old
    // value back before propagating
    assert_eq!(
        scope.get("gg", stencil::Compartment::Global),
        Some(&Value::Int(1))
    );
}

#[test]
fn test_globals_seed_from_environment() {
    let mut globals = FxHashMap::default();
    globals.insert("site".to_string(), Value::Str("Example".to_string()));
    let mut loader = MemoryLoader::new();
    loader.insert("page.tmpl", "{{ site }}");
    let env = Environment::new(globals, Box::new(loader));

    let (out, _) = render_template(&env, "page.tmpl");
    assert_eq!(out, "Example");
}

#[test]
fn test_render_does_not_mutate_environment_globals() {
    let mut globals = FxHashMap::default();
    globals.insert("n".to_string(), Value::Int(1));
    let mut loader = MemoryLoader::new();
    loader.insert("page.tmpl", "{% global n = 99 %}{{ n }}");
    let env = Environment::new(globals, Box::new(loader));

    let (out, _) = render_template(&env, "page.tmpl");
    assert_eq!(out, "99");

    // A fresh render starts from the seed again
    let (out, _) = render_template(&env, "page.tmpl");
    assert_eq!(out, "99");

    let page = env.parse_str("check.tmpl", "{{ n }}").unwrap();
    let mut check = String::new();
    page.render(&mut check, None, Value::None, None).unwrap();
    assert_eq!(check, "1");
}
