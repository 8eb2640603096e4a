use super::UriTemplate;
use crate::template::TemplateError;

#[test]
fn literal_template_matches_itself_only() {
    let tpl = UriTemplate::compile("/items").unwrap();
    assert!(tpl.matches_exactly("/items"));
    assert!(tpl.matches_exactly("/items/"));
    assert!(tpl.match_prefix("/items123").is_none());
    assert!(tpl.match_prefix("/item").is_none());
}

#[test]
fn root_template_consumes_nothing() {
    let tpl = UriTemplate::compile("/").unwrap();
    assert!(tpl.matches_exactly("/"));
    let m = tpl.match_prefix("/a/b").unwrap();
    assert_eq!(m.remainder, "/a/b");
}

#[test]
fn default_parameter_captures_one_segment() {
    let tpl = UriTemplate::compile("/items/{id}").unwrap();
    let m = tpl.match_prefix("/items/42").unwrap();
    assert_eq!(m.get("id"), Some("42"));
    assert_eq!(m.remainder, "");

    let m = tpl.match_prefix("/items/42/history").unwrap();
    assert_eq!(m.get("id"), Some("42"));
    assert_eq!(m.remainder, "/history");
}

#[test]
fn custom_regex_restricts_match() {
    let tpl = UriTemplate::compile("/items/{id: \\d+}").unwrap();
    assert!(tpl.match_prefix("/items/42").is_some());
    assert!(tpl.match_prefix("/items/abc").is_none());
}

#[test]
fn custom_regex_may_span_segments() {
    let tpl = UriTemplate::compile("/files/{path: .+}").unwrap();
    let m = tpl.match_prefix("/files/a/b/c").unwrap();
    assert_eq!(m.get("path"), Some("a/b/c"));
    assert_eq!(m.remainder, "");
}

#[test]
fn nested_braces_in_custom_regex() {
    let tpl = UriTemplate::compile("/codes/{code: \\d{3}}").unwrap();
    assert!(tpl.match_prefix("/codes/404").is_some());
    assert!(tpl.match_prefix("/codes/42").is_none());
    assert!(tpl.match_prefix("/codes/4045").is_none());
}

#[test]
fn inner_capture_groups_do_not_shift_parameters() {
    let tpl = UriTemplate::compile("/v/{ver: (\\d+)\\.(\\d+)}/items/{id}").unwrap();
    let m = tpl.match_prefix("/v/1.2/items/9").unwrap();
    assert_eq!(m.get("ver"), Some("1.2"));
    assert_eq!(m.get("id"), Some("9"));
}

#[test]
fn parentheses_inside_character_classes_do_not_shift_parameters() {
    let tpl = UriTemplate::compile("/v/{sym: [(]+}/{id}").unwrap();
    let m = tpl.match_prefix("/v/(((/9").unwrap();
    assert_eq!(m.get("sym"), Some("((("));
    assert_eq!(m.get("id"), Some("9"));
}

#[test]
fn captured_values_are_percent_decoded() {
    let tpl = UriTemplate::compile("/tags/{name}").unwrap();
    let m = tpl.match_prefix("/tags/caf%C3%A9%20au%20lait").unwrap();
    assert_eq!(m.get("name"), Some("café au lait"));
}

#[test]
fn unbalanced_braces_fail_compilation() {
    assert!(matches!(
        UriTemplate::compile("/items/{id"),
        Err(TemplateError::UnbalancedBraces { .. })
    ));
    assert!(matches!(
        UriTemplate::compile("/items/id}"),
        Err(TemplateError::UnbalancedBraces { .. })
    ));
}

#[test]
fn duplicate_parameter_fails_compilation() {
    assert!(matches!(
        UriTemplate::compile("/a/{x}/b/{x}"),
        Err(TemplateError::DuplicateParameter { .. })
    ));
}

#[test]
fn empty_parameter_name_fails_compilation() {
    assert!(matches!(
        UriTemplate::compile("/a/{}"),
        Err(TemplateError::EmptyParameterName { .. })
    ));
    assert!(matches!(
        UriTemplate::compile("/a/{: \\d+}"),
        Err(TemplateError::EmptyParameterName { .. })
    ));
}

#[test]
fn invalid_custom_regex_fails_compilation() {
    assert!(matches!(
        UriTemplate::compile("/a/{x: [unclosed}"),
        Err(TemplateError::InvalidRegex { .. })
    ));
}

#[test]
fn literal_sorts_before_parameterized() {
    let mut templates = vec![
        UriTemplate::compile("/a/{x}").unwrap(),
        UriTemplate::compile("/a/b").unwrap(),
    ];
    templates.sort();
    assert_eq!(templates[0].raw(), "/a/b");
}

#[test]
fn ordering_is_insertion_order_independent() {
    let a = UriTemplate::compile("/items/special").unwrap();
    let b = UriTemplate::compile("/items/{id}").unwrap();
    let c = UriTemplate::compile("/items/{id: \\d+}").unwrap();

    let mut one = vec![b.clone(), a.clone(), c.clone()];
    let mut two = vec![c, a, b];
    one.sort();
    two.sort();
    let one: Vec<_> = one.iter().map(|t| t.raw().to_string()).collect();
    let two: Vec<_> = two.iter().map(|t| t.raw().to_string()).collect();
    assert_eq!(one, two);
    assert_eq!(one[0], "/items/special");
}

#[test]
fn explicit_regex_wins_literal_tie() {
    // Same literal count and group count; the constrained group is more specific.
    let mut templates = vec![
        UriTemplate::compile("/a/{x}").unwrap(),
        UriTemplate::compile("/a/{x: \\d+}").unwrap(),
    ];
    templates.sort();
    assert_eq!(templates[0].raw(), "/a/{x: \\d+}");
}
