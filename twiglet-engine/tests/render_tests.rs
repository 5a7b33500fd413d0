//! End-to-end rendering through the public `Environment` API.

use std::any::Any;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use twiglet_engine::{
    map_from_json, Environment, MemoryLoader, Node, Scope, SyntaxError, Tag, TagInstance,
    TemplateError, Value,
};

fn render(source: &str, context: serde_json::Value) -> Result<String, TemplateError> {
    let env = Environment::new();
    let template = env.parse("inline.twig", source)?;
    env.render_template(&template, &mut Scope::new(map_from_json(context)))
}

// ---------------------------------------------------------------------------
// 1. Expressions
// ---------------------------------------------------------------------------

#[rstest]
#[case("{{ 1 + 2 * 3 }}", "7")]
#[case("{{ (1 + 2) * 3 }}", "9")]
#[case("{{ 7 / 2 }}", "3.5")]
#[case("{{ 7 % 4 }}", "3")]
#[case("{{ -n + 1 }}", "-3")]
#[case("{{ 'a' ~ n ~ 'b' }}", "a4b")]
#[case("{{ n > 3 and not missing ? 'yes' : 'no' }}", "yes")]
#[case("{{ 'x' in list ? 1 : 0 }}", "1")]
#[case("{{ 'z' not in list ? 1 : 0 }}", "1")]
#[case("{{ user.name }}/{{ user['age'] }}/{{ list[-1] }}", "Ana/30/y")]
#[case("{{ missing.deeply.nested }}", "")]
#[case("{{ {a: 1, 'b': n}|json_encode }}", r#"{"a":1,"b":4}"#)]
fn evaluates_expressions(#[case] source: &str, #[case] expected: &str) {
    let context = json!({"n": 4, "list": ["x", "y"], "user": {"name": "Ana", "age": 30}});
    assert_eq!(render(source, context).unwrap(), expected);
}

#[test]
fn negating_the_smallest_integer_widens_to_float() {
    let out = render("{{ -n > 0 ? 'positive' : 'negative' }}", json!({"n": i64::MIN})).unwrap();
    assert_eq!(out, "positive");
}

#[rstest]
#[case("{{ user is defined ? 1 : 0 }}", "1")]
#[case("{{ user.name is defined ? 1 : 0 }}", "1")]
#[case("{{ user.email is defined ? 1 : 0 }}", "0")]
#[case("{{ nothing is not defined ? 1 : 0 }}", "1")]
#[case("{{ empty_list is empty ? 1 : 0 }}", "1")]
#[case("{{ nil is null ? 1 : 0 }}", "1")]
#[case("{{ 3 is odd ? 1 : 0 }}{{ 4 is even ? 1 : 0 }}", "11")]
fn evaluates_tests(#[case] source: &str, #[case] expected: &str) {
    let context = json!({"user": {"name": "Ana"}, "empty_list": [], "nil": null});
    assert_eq!(render(source, context).unwrap(), expected);
}

#[rstest]
#[case("{{ 'hello world'|capitalize }}", "Hello world")]
#[case("{{ '  pad  '|trim|upper }}", "PAD")]
#[case("{{ items|length }}:{{ items|join(', ') }}", "3:a, b, c")]
#[case("{{ items|first }}{{ items|last }}", "ac")]
#[case("{{ missing|default('fallback') }}", "fallback")]
#[case("{{ {a: 1}|merge({b: 2})|keys|join }}", "ab")]
#[case("{{ [1]|merge([2, 3])|join('-') }}", "1-2-3")]
#[case("{{ '<b>'|e }}{{ '<i>'|raw }}", "&lt;b&gt;<i>")]
#[case("{{ range(1, 3)|join }}{{ range(3, 1)|join }}", "123321")]
fn applies_builtin_filters(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(render(source, json!({"items": ["a", "b", "c"]})).unwrap(), expected);
}

// ---------------------------------------------------------------------------
// 2. Statements
// ---------------------------------------------------------------------------

#[test]
fn for_loop_exposes_loop_variable() {
    let out = render(
        "{% for item in items %}{{ loop.index }}{{ item }}{% if not loop.last %},{% endif %}{% endfor %}",
        json!({"items": ["a", "b", "c"]}),
    )
    .unwrap();
    assert_eq!(out, "1a,2b,3c");
}

#[test]
fn for_loop_over_mapping_with_else() {
    let out = render(
        "{% for k, v in map %}{{ k }}={{ v }};{% endfor %}{% for x in none %}x{% else %}empty{% endfor %}",
        json!({"map": {"b": 1, "a": 2}}),
    )
    .unwrap();
    assert_eq!(out, "b=1;a=2;empty");
}

#[test]
fn set_and_whitespace_control() {
    let out = render(
        "{% set greeting = 'Hi ' ~ name %}\n  {{- greeting -}}  \n{% set block %}<{{ name }}>{% endset %}{{ block }}",
        json!({"name": "Ana"}),
    )
    .unwrap();
    assert_eq!(out, "Hi Ana<Ana>");
}

#[test]
fn loop_variables_do_not_leak() {
    let out = render("{% for x in [1, 2] %}{% set y = x %}{% endfor %}[{{ x }}{{ y }}]", json!({})).unwrap();
    assert_eq!(out, "[]");
}

// ---------------------------------------------------------------------------
// 3. Extension points
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Shout;

impl TagInstance for Shout {
    fn render(&self, env: &Environment, scope: &mut Scope<'_>, body: &[Node]) -> Result<String, TemplateError> {
        Ok(env.render_nodes(body, scope)?.to_uppercase())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ShoutTag;

impl Tag for ShoutTag {
    fn name(&self) -> &str {
        "shout"
    }

    fn end_tag(&self) -> Option<&str> {
        Some("endshout")
    }

    fn compile(&self, source: &str) -> Result<Arc<dyn TagInstance>, SyntaxError> {
        if source.trim() != "shout" {
            return Err(SyntaxError::new("shout takes no arguments"));
        }
        Ok(Arc::new(Shout))
    }
}

#[test]
fn block_tags_receive_their_body() {
    let mut env = Environment::new();
    env.add_tag(ShoutTag);
    let template = env.parse("t", "a{% shout %}b{{ x }}{% endshout %}c").unwrap();
    let mut scope = Scope::new(map_from_json(json!({"x": "y"})));
    assert_eq!(env.render_template(&template, &mut scope).unwrap(), "aBYc");

    let err = env.parse("t", "{% shout loud %}{% endshout %}").unwrap_err();
    assert_eq!(err.to_string(), "syntax error in t at line 1: shout takes no arguments");
}

#[test]
fn custom_filters_and_functions() {
    let mut env = Environment::with_loader(MemoryLoader::new().with("page", "{{ greet(name)|wrap('*') }}"));
    env.add_filter("wrap", |v, args| {
        let edge = args.first().map(Value::to_string).unwrap_or_default();
        Ok(Value::String(format!("{edge}{v}{edge}")))
    });
    env.add_function("greet", |_, args| {
        Ok(Value::String(format!("hi {}", args.first().cloned().unwrap_or_default())))
    });
    let out = env.render("page", map_from_json(json!({"name": "Ana"}))).unwrap();
    assert_eq!(out, "*hi Ana*");
}

#[test]
fn unknown_filter_and_function_fail_at_render() {
    let err = render("{{ x|nope }}", json!({})).unwrap_err();
    assert!(matches!(err, TemplateError::UnknownFilter(ref n) if n == "nope"));
    let err = render("{{ nope() }}", json!({})).unwrap_err();
    assert!(matches!(err, TemplateError::UnknownFunction(_)));
}

#[test]
fn template_from_string_yields_a_template_value() {
    let env = Environment::new();
    let value = env
        .call_function("template_from_string", &[Value::from("{{ 1 + 1 }}")])
        .unwrap();
    let Value::Template(template) = value else {
        panic!("expected a template");
    };
    assert_eq!(env.render_template(&template, &mut Scope::default()).unwrap(), "2");
}
