use super::*;

#[test]
fn malformed_round_trip() {
    for input in [
        "",
        "{{unclosed",
        "[[a|b",
        "{{{x",
        "]]}}}|",
        "<ref name=\"a>",
        "'''''",
        "''a'''b''c'''",
        "{|\n|",
        "== a",
        "=",
        "&bogus; &#; &#x110000; &#0000000065;",
        "<!-- x",
        "[http://x",
        "{{a|{{b}}",
        "<br/></br></br >",
        "* [[a]]\n#: b\n;c:d",
        "{{{{{a}}}}}",
        "{{{{{{{a}}}}}}}",
        "[[a|[http://b c]]]",
        "[[[[a]]]]",
        "<table><tr><td>x</table>",
        "http://a.b/c?d=e. (http://f.g/h) i",
        "{{a|b=c=d|e}}",
        "{|\n|-\n! h !! i\n|-\n| a || b\n| class=x | c\n|}",
        "{| class=\"wide\nx",
        "<span class=\"a\" 'b'>c</SPAN >",
        "<nowiki>{{a}} &amp; [[b]]</nowiki>",
        "----\n-----x",
        "a\n\n\n\nb",
        "{{a\n|b}} {{a\nb|c}}",
        "[[a\nb]] [[a<!-- c -->b]]",
        "\u{1f600}{{\u{e9}|\u{1f600}}}",
    ] {
        run_test(input);
    }
}

#[test]
fn depth_limit() {
    let nested = format!("{}x{}", "{{a|".repeat(150), "}}".repeat(150));
    let result = run_test(&nested);
    let templates = result.templates().len();
    assert!(templates > 0 && templates <= MAX_DEPTH, "{templates}");

    let links = format!("{}x{}", "[[".repeat(300), "]]".repeat(300));
    run_test(&links);
}

#[test]
fn balanced_tokens() {
    let mut tokenizer = CheckedTokenizer::new(Tokenizer::new());
    for input in [
        "{{a|b=[[c|''d'']]}}",
        "<div style=\"x\">{{a}}</div>",
        "{|\n|-\n| a\n|}",
        "== [[a]] ==\n* b",
    ] {
        Tokenize::tokenize(&mut tokenizer, input, Context::empty(), false).unwrap();
    }
}

#[test]
fn unbalanced_tokens() {
    #[derive(Debug)]
    struct Broken;

    impl Tokenize for Broken {
        fn tokenize(
            &mut self,
            text: &str,
            _context: Context,
            _skip_style_tags: bool,
        ) -> Result<Vec<Token>, TokenizerError> {
            Ok(vec![Token::TemplateOpen, Token::text(text)])
        }
    }

    let err = CheckedTokenizer::new(Broken)
        .tokenize("a", Context::empty(), false)
        .unwrap_err();
    assert!(matches!(err, TokenizerError::Unbalanced(_)));

    let err = Parser::with_tokenizer(Box::new(Broken))
        .parse("a", Context::empty(), false)
        .unwrap_err();
    assert!(matches!(err, ParseError::Build(BuildError::Unclosed(_))));
    assert!(
        err.to_string()
            .starts_with("This is a bug and should be reported. Info: ")
    );
}

#[test]
fn failing_initial_context() {
    let err = Parser::default()
        .parse("a", Context::TEMPLATE_NAME, false)
        .unwrap_err();
    assert!(matches!(
        err,
        ParseError::Tokenizer(TokenizerError::ExitedWithBadRoute(_))
    ));
}

#[test]
fn round_trip_mismatch() {
    let tree = parse("ab\ncd").unwrap();
    assert!(check_round_trip("ab\ncd", &tree).is_ok());
    let err = check_round_trip("ab\nce", &tree).unwrap_err();
    assert_eq!(err.at.to_string(), "2:2");
    let err = check_round_trip("ab\ncde", &tree).unwrap_err();
    assert_eq!(err.at.offset, 5);
}
