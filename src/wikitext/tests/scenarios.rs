use super::*;

#[track_caller]
fn single(input: &str) -> Node {
    let mut result = run_test(input);
    assert_eq!(result.nodes.len(), 1, "{result:#?}");
    result.nodes.remove(0)
}

#[test]
fn plain_text() {
    assert_eq!(single("plain text"), Node::Text("plain text".into()));
}

#[test]
fn named_parameter() {
    let Node::Template(template) = single("{{foo|bar=baz}}") else {
        panic!("expected a template");
    };
    assert_eq!(template.name.nodes, [Node::Text("foo".into())]);
    assert_eq!(template.params.len(), 1);
    let param = &template.params[0];
    assert!(param.showkey);
    assert_eq!(param.name.to_string(), "bar");
    assert_eq!(param.value.to_string(), "baz");
}

#[test]
fn wikilink() {
    let Node::Wikilink(link) = single("[[Page|Shown]]") else {
        panic!("expected a wikilink");
    };
    assert_eq!(link.title.to_string(), "Page");
    assert_eq!(link.text.map(|text| text.to_string()).as_deref(), Some("Shown"));
}

#[test]
fn external_link() {
    let Node::ExternalLink(link) = single("[http://example.com Example]") else {
        panic!("expected an external link");
    };
    assert_eq!(link.url.to_string(), "http://example.com");
    assert_eq!(
        link.title.map(|title| title.to_string()).as_deref(),
        Some("Example")
    );
    assert!(link.brackets);
    assert!(!link.suppress_space);
}

#[test]
fn heading() {
    let Node::Heading(heading) = single("== Title ==") else {
        panic!("expected a heading");
    };
    assert_eq!(u8::from(heading.level), 2);
    assert_eq!(heading.title.to_string(), " Title ");
    assert_eq!(heading.title.strip_code().trim(), "Title");
}

#[test]
fn nested_template() {
    let Node::Template(template) = single("{{a|{{b}}}}") else {
        panic!("expected a template");
    };
    assert_eq!(template.name.to_string(), "a");
    assert_eq!(template.params.len(), 1);
    let param = &template.params[0];
    assert!(!param.showkey);
    assert_eq!(param.name.to_string(), "1");
    let [Node::Template(inner)] = param.value.nodes.as_slice() else {
        panic!("expected a nested template, got {:?}", param.value);
    };
    assert_eq!(inner.name.to_string(), "b");
    assert!(inner.params.is_empty());
}

#[test]
fn unclosed_template() {
    assert_eq!(single("{{unclosed"), Node::Text("{{unclosed".into()));
}

#[test]
fn skip_style_tags() {
    let mut parser = Parser::default();
    let skipped = parser.parse("''bold?''", Context::empty(), true).unwrap();
    assert_eq!(skipped.nodes, [Node::Text("''bold?''".into())]);

    let styled = parser.parse("''bold?''", Context::empty(), false).unwrap();
    let [Node::Style(style)] = styled.nodes.as_slice() else {
        panic!("expected a style, got {styled:?}");
    };
    assert_eq!(style.style, TextStyle::Italic);
    assert_eq!(style.contents.to_string(), "bold?");
}

#[test]
fn external_link_url_is_not_relinked() {
    let Node::ExternalLink(link) = single("[http://example.com/path Example]") else {
        panic!("expected an external link");
    };
    let url = link.url.to_string();
    let reparsed = Parser::default()
        .parse(&url, Context::EXT_LINK_URI, false)
        .unwrap();
    assert_eq!(reparsed.nodes, [Node::Text(url)]);
}

#[test]
fn argument() {
    let Node::Argument(argument) = single("{{{1|default}}}") else {
        panic!("expected an argument");
    };
    assert_eq!(argument.name.to_string(), "1");
    assert_eq!(
        argument.default.map(|default| default.to_string()).as_deref(),
        Some("default")
    );
}

#[test]
fn html_tag() {
    let Node::Tag(tag) = single("<ref name='a b' group=x>cite</ref>") else {
        panic!("expected a tag");
    };
    assert_eq!(tag.tag.to_string(), "ref");
    assert_eq!(tag.attributes.len(), 2);
    assert_eq!(tag.attributes[0].quotes, Some('\''));
    assert_eq!(
        tag.get("group")
            .and_then(|attr| attr.value.as_ref())
            .map(ToString::to_string)
            .as_deref(),
        Some("x")
    );
    assert_eq!(tag.contents.map(|c| c.to_string()).as_deref(), Some("cite"));
}

#[test]
fn void_tags() {
    let result = run_test("a<br>b<br />c</br>");
    let tags = result
        .filter(|node| matches!(node, Node::Tag(_)))
        .into_iter()
        .map(|node| match node {
            Node::Tag(tag) => (tag.self_closing, tag.implicit, tag.invalid),
            _ => unreachable!(),
        })
        .collect::<Vec<_>>();
    assert_eq!(
        tags,
        [(true, true, false), (true, false, false), (true, true, true)]
    );
}

#[test]
fn entities() {
    let result = run_test("&nbsp;&#107;&#x6B;&#X6b;&bogus;");
    let decoded = result
        .iter()
        .filter_map(|node| match node {
            Node::HtmlEntity(entity) => Some(entity.normalize()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(decoded, ["\u{a0}", "k", "k", "k"]);
    assert_eq!(result.nodes.last(), Some(&Node::Text("&bogus;".into())));
}

#[test]
fn set_url() {
    let Node::ExternalLink(mut link) = single("[http://a.example b]") else {
        panic!("expected an external link");
    };
    link.set_url("http://c.example/[d]").unwrap();
    assert_eq!(link.to_string(), "[http://c.example/[d] b]");
}
