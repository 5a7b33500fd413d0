use std::path::Path;
use std::sync::Arc;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use twiglet_adapter::{
    AdapterConfig, AdapterError, Catalog, ChangeEvent, ChangeKind, RenderMeta, TwigAdapter,
};
use twiglet_core::{ComponentSource, Library};
use twiglet_engine::map_from_json;

const CATALOG: &str = r#"msgid "Hello %name%"
msgstr "Bonjour %name%"

msgid "one item"
msgid_plural "%count% items"
msgstr[0] "un article"
msgstr[1] "%count% articles"
"#;

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("button/button.twig")
        .write_str("<button{{ attributes }}>{{ label }}</button>")
        .unwrap();
    dir.child("button/button.config.yml")
        .write_str(
            "context:\n  label: Click\n  attributes:\n    class: \"a b\"\n    type: button\nvariants:\n  - name: primary\n    context:\n      attributes:\n        class: c\n",
        )
        .unwrap();
    dir.child("card/card.twig")
        .write_str("<div{{ attributes }}>{{ title }}|{{ foo }}</div>")
        .unwrap();
    dir.child("card/card.config.yml")
        .write_str("context:\n  title: Card\n  foo: bar\n  attributes:\n    class: card\n")
        .unwrap();
    dir
}

fn adapter(dir: &Path, catalog: Option<&str>) -> TwigAdapter {
    let library = Library::load_at(dir).unwrap();
    let catalog = catalog.map(|po| Catalog::parse(po).unwrap());
    TwigAdapter::with_catalog(Arc::new(library), AdapterConfig::default(), catalog)
}

fn render(adapter: &TwigAdapter, dir: &Path, source: &str, context: serde_json::Value) -> Result<String, AdapterError> {
    adapter.render(
        &dir.join("pages/page.twig"),
        source,
        map_from_json(context),
        &RenderMeta::default(),
    )
}

// ---------------------------------------------------------------------------
// render tag
// ---------------------------------------------------------------------------

#[test]
fn render_tag_uses_the_component_defaults() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let out = render(&adapter, dir.path(), "{% render '@card' %}", json!({})).unwrap();
    assert_eq!(out, r#"<div class="card">Card|bar</div>"#);
}

#[test]
fn variant_classes_follow_the_parent_classes() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let out = render(&adapter, dir.path(), "{% render '@button--primary' only %}", json!({})).unwrap();
    assert_eq!(out, r#"<button class="a b c" type="button">Click</button>"#);
}

#[test]
fn null_overrides_keep_the_component_default() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let out = render(
        &adapter,
        dir.path(),
        "{% render '@card' with {foo: null, title: 'Mine', unknown: 1} %}",
        json!({}),
    )
    .unwrap();
    assert_eq!(out, r#"<div class="card">Mine|bar</div>"#);
}

#[test]
fn attribute_overrides_merge_classes() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let out = render(
        &adapter,
        dir.path(),
        "{% render '@card' with {attributes: {class: 'card wide', id: 'x'}} %}",
        json!({}),
    )
    .unwrap();
    assert_eq!(out, r#"<div class="card wide" id="x">Card|bar</div>"#);
}

#[test]
fn variant_class_lists_hold_each_parent_class_once() {
    let dir = fixture();
    dir.child("chip/chip.twig")
        .write_str("{{ attributes.class|join(',') }}")
        .unwrap();
    dir.child("chip/chip.config.yml")
        .write_str("context:\n  attributes:\n    class: \"a b\"\nvariants:\n  - name: alt\n    context:\n      attributes:\n        class: c\n")
        .unwrap();
    let adapter = adapter(dir.path(), None);
    let out = render(&adapter, dir.path(), "{% render '@chip--alt' only %}|{% render '@chip--alt' %}", json!({})).unwrap();
    assert_eq!(out, "a,b,c|a,b,c");
}

#[test]
fn missing_component_with_only_fails() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let err = render(&adapter, dir.path(), "{% render '@nope' only %}", json!({})).unwrap_err();
    assert_eq!(err.missing_component(), Some("@nope"));
    assert!(err.to_string().contains("Unable to render '@nope' - component not found."));

    // Sibling renders on the same adapter are unaffected.
    let out = render(&adapter, dir.path(), "{% render '@card' only %}", json!({})).unwrap();
    assert_eq!(out, r#"<div class="card">Card|bar</div>"#);
}

#[test]
fn ignored_missing_component_leaves_sibling_tags_alone() {
    let dir = fixture();
    let adapter = adapter(dir.path(), Some(CATALOG));
    let out = render(
        &adapter,
        dir.path(),
        "{% render ignore missing '@nope' only %}{% render '@card' only %}|{% trans %}Hello {{ name }}{% endtrans %}",
        json!({"name": "Ana"}),
    )
    .unwrap();
    assert_eq!(out, r#"<div class="card">Card|bar</div>|Bonjour Ana"#);
}

#[rstest]
#[case("{% render ignore missing '@nope' only %}")]
#[case("{% render ignore missing 'nope/nope.twig' %}")]
fn ignore_missing_renders_nothing(#[case] source: &str) {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    assert_eq!(render(&adapter, dir.path(), source, json!({})).unwrap(), "");
}

#[test]
fn without_only_the_caller_scope_is_visible() {
    let dir = fixture();
    dir.child("partials/greeting.twig").write_str("Hi {{ who }}").unwrap();
    let adapter = adapter(dir.path(), None);
    let out = render(
        &adapter,
        dir.path(),
        "{% render 'partials/greeting.twig' %}",
        json!({"who": "Ana"}),
    )
    .unwrap();
    assert_eq!(out, "Hi Ana");
}

#[test]
fn self_describes_the_nested_component() {
    let dir = fixture();
    dir.child("badge/badge.twig").write_str("{{ _self.handle }}").unwrap();
    let adapter = adapter(dir.path(), None);
    let meta = RenderMeta {
        self_entity: Some(json!({"handle": "page"})),
        ..RenderMeta::default()
    };
    let out = adapter
        .render(
            &dir.path().join("pages/page.twig"),
            "{{ _self.handle }}/{% render '@badge' %}",
            map_from_json(json!({})),
            &meta,
        )
        .unwrap();
    assert_eq!(out, "page/badge");
}

#[test]
fn render_handle_applies_overrides() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let out = adapter
        .render_handle("@button--primary", map_from_json(json!({"label": "Buy"})))
        .unwrap();
    assert_eq!(out, r#"<button class="a b c" type="button">Buy</button>"#);
    assert!(matches!(
        adapter.render_handle("@ghost", Default::default()),
        Err(AdapterError::ComponentNotFound { .. })
    ));
}

// ---------------------------------------------------------------------------
// attribute sets in templates
// ---------------------------------------------------------------------------

#[rstest]
#[case("{% set x = attributes.addClass('z') %}<div{{ attributes }}>", r#"<div class="a z">"#)]
#[case("{% set x = attributes.setAttribute('id', 'i').removeClass('a') %}<div{{ attributes }}>", r#"<div id="i">"#)]
#[case("{% set x = attributes.merge({class: 'm', role: 'nav'}) %}<div{{ x }}>", r#"<div class="a m" role="nav">"#)]
#[case("<div{{ attributes.addClass('z') }}>|<div{{ attributes }}>", r#"<div class="a z">|<div class="a z">"#)]
fn attribute_methods_edit_the_set_in_place(#[case] source: &str, #[case] expected: &str) {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let out = render(&adapter, dir.path(), source, json!({"attributes": {"class": "a"}})).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn edits_do_not_leak_into_later_renders() {
    let dir = fixture();
    dir.child("tag/tag.twig")
        .write_str("<span{{ attributes.addClass('on') }}></span>")
        .unwrap();
    dir.child("tag/tag.config.yml")
        .write_str("context:\n  attributes:\n    class: t\n")
        .unwrap();
    let adapter = adapter(dir.path(), None);
    for _ in 0..2 {
        assert_eq!(
            adapter.render_handle("@tag", Default::default()).unwrap(),
            r#"<span class="t on"></span>"#
        );
    }
    let out = render(&adapter, dir.path(), "{% render '@tag' %}{% render '@tag' %}", json!({})).unwrap();
    assert_eq!(out, r#"<span class="t on"></span><span class="t on"></span>"#);
}

#[test]
fn pristine_adapters_have_no_extensions() {
    let dir = fixture();
    let library = Library::load_at(dir.path()).unwrap();
    let config = AdapterConfig {
        pristine: true,
        ..AdapterConfig::default()
    };
    let adapter = TwigAdapter::new(Arc::new(library), config).unwrap();
    assert!(!adapter.env().has_tag("render"));
    assert!(!adapter.env().has_filter("without"));
    let out = render(&adapter, dir.path(), "[{{ _config }}]", json!({})).unwrap();
    assert_eq!(out, "[]");
}

// ---------------------------------------------------------------------------
// trans tag
// ---------------------------------------------------------------------------

#[test]
fn translates_with_placeholders() {
    let dir = fixture();
    let adapter = adapter(dir.path(), Some(CATALOG));
    let out = render(
        &adapter,
        dir.path(),
        "{% trans %}Hello {{ name }}{% endtrans %}",
        json!({"name": "Ana"}),
    )
    .unwrap();
    assert_eq!(out, "Bonjour Ana");
}

#[rstest]
#[case(json!({"name": ""}))]
#[case(json!({}))]
fn empty_placeholders_still_translate(#[case] context: serde_json::Value) {
    let dir = fixture();
    let adapter = adapter(dir.path(), Some(CATALOG));
    let out = render(
        &adapter,
        dir.path(),
        "{% trans %}Hello {{ name }}{% endtrans %}",
        context,
    )
    .unwrap();
    assert_eq!(out, "Bonjour ");
}

#[rstest]
#[case(1, "un article")]
#[case(5, "5 articles")]
fn plural_branch_follows_the_count(#[case] count: i64, #[case] expected: &str) {
    let dir = fixture();
    let adapter = adapter(dir.path(), Some(CATALOG));
    let out = render(
        &adapter,
        dir.path(),
        "{% trans %}one item{% plural count %}{{ count }} items{% endtrans %}",
        json!({"count": count}),
    )
    .unwrap();
    assert_eq!(out, expected);
}

#[rstest]
#[case(1, "one thing")]
#[case(3, "3 things")]
fn plural_branch_without_catalog_entry(#[case] count: i64, #[case] expected: &str) {
    let dir = fixture();
    let adapter = adapter(dir.path(), Some(CATALOG));
    let out = render(
        &adapter,
        dir.path(),
        "{% trans %}one thing{% plural count %}{{ count }} things{% endtrans %}",
        json!({"count": count}),
    )
    .unwrap();
    assert_eq!(out, expected);
}

#[test]
fn missing_entry_renders_the_source_text() {
    let dir = fixture();
    let adapter = adapter(dir.path(), Some(CATALOG));
    let out = render(
        &adapter,
        dir.path(),
        "{% trans %}Goodbye {{ name }}{% endtrans %}",
        json!({"name": "Ana"}),
    )
    .unwrap();
    assert_eq!(out, "Goodbye Ana");
}

#[test]
fn malformed_tags_fail_at_compile_time() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    let err = render(&adapter, dir.path(), "{% render %}", json!({})).unwrap_err();
    assert!(matches!(err, AdapterError::Template(_)));
}

// ---------------------------------------------------------------------------
// cache eviction
// ---------------------------------------------------------------------------

#[test]
fn change_events_evict_cached_views() {
    let dir = fixture();
    let adapter = adapter(dir.path(), None);
    assert_eq!(adapter.render_handle("@card", Default::default()).unwrap(), r#"<div class="card">Card|bar</div>"#);
    assert!(adapter.env().cache().contains("@card"));

    dir.child("card/card.twig").write_str("<p>{{ title }}</p>").unwrap();
    let event = ChangeEvent {
        kind: ChangeKind::ViewUpdated,
        path: dir.path().join("card/card.twig"),
    };
    assert!(adapter.on_change(&event) >= 1);
    assert!(!adapter.env().cache().contains("@card"));
    assert_eq!(adapter.render_handle("@card", Default::default()).unwrap(), "<p>Card</p>");
}

#[test]
fn library_views_cover_variants() {
    let dir = fixture();
    let library = Library::load_at(dir.path()).unwrap();
    let handles: Vec<&str> = library.views().iter().map(|v| v.handle.as_str()).collect();
    assert!(handles.contains(&"@button--primary"));
    assert!(handles.contains(&"@card"));
}
