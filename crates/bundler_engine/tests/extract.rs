use bundler_core::CONTENT_UNAVAILABLE;
use bundler_engine::{decode_html, ContentOrigin, Extractor, SelectorExtractor};
use pretty_assertions::assert_eq;

#[test]
fn first_matching_candidate_wins() {
    let html = r#"<html><head><title> Chord Post </title></head><body>
        <article><p>article body</p></article>
        <div class="post-body"><p>post body</p></div>
    </body></html>"#;

    let extracted = SelectorExtractor::default().extract(html);
    assert_eq!(
        extracted.origin,
        ContentOrigin::Selector("div.post-body".to_string())
    );
    assert_eq!(extracted.content_html, "<p>post body</p>");
    assert_eq!(extracted.title.as_deref(), Some("Chord Post"));
}

#[test]
fn candidate_order_is_respected() {
    let html = r#"<html><body><div class="a">A</div><div class="b">B</div></body></html>"#;
    let extracted = SelectorExtractor::new(&["div.b", "div.a"]).extract(html);
    assert_eq!(extracted.content_html, "B");
}

#[test]
fn falls_back_to_body_when_no_candidate_matches() {
    let html = "<html><body><p>plain page</p></body></html>";
    let extracted = SelectorExtractor::default().extract(html);
    assert_eq!(extracted.origin, ContentOrigin::Body);
    assert_eq!(extracted.content_html, "<p>plain page</p>");
    assert_eq!(extracted.title, None);
}

#[test]
fn document_without_body_is_unavailable() {
    let html = r#"<html><frameset><frame src="a.html"></frameset></html>"#;
    let extracted = SelectorExtractor::default().extract(html);
    assert_eq!(extracted.origin, ContentOrigin::Unavailable);
    assert_eq!(extracted.content_html, CONTENT_UNAVAILABLE);
}

#[test]
fn invalid_candidates_are_skipped() {
    bundler_logging::initialize_for_tests();
    let html = r#"<html><body><article>kept</article></body></html>"#;
    let extracted = SelectorExtractor::new(&["div[", "article"]).extract(html);
    assert_eq!(
        extracted.origin,
        ContentOrigin::Selector("article".to_string())
    );
}

#[test]
fn declared_charset_is_used_for_decoding() {
    // "café" in windows-1252
    let bytes = b"<html><body><div class=\"post-body\">caf\xe9</div></body></html>";
    let decoded = decode_html(bytes, Some("text/html; charset=windows-1252"));
    assert!(!decoded.had_errors);

    let extracted = SelectorExtractor::default().extract(&decoded.html);
    assert_eq!(extracted.content_html, "café");
}
