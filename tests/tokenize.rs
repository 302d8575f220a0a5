use pdf_trio::tokenize::{
    extract_domain, extract_uri, remove_wayback_prefix, tokenize, tokenize_url, trim,
    url_model_input,
};

fn toks(s: &[&str]) -> Vec<String> {
    s.iter().map(|t| t.to_string()).collect()
}

#[test]
fn clean_text_round_trips() {
    let text = "Deep residual learning for image recognition 2016";
    let tokens = tokenize(text);
    assert_eq!(
        tokens,
        toks(&["Deep", "residual", "learning", "for", "image", "recognition", "2016"])
    );
}

#[test]
fn punctuation_is_stripped_not_split() {
    assert_eq!(tokenize("don't stop"), toks(&["dont", "stop"]));
    assert_eq!(tokenize("«quoted»—dash …"), toks(&["«quoted»dash", ""]));
}

#[test]
fn control_chars_become_separators_and_empty_tokens_survive() {
    let tokens = tokenize("Title\x0cAbstract\r\nBody -- end");
    assert_eq!(tokens, toks(&["Title", "Abstract", "Body", "", "end"]));
}

#[test]
fn trim_leaves_short_sequences_alone() {
    let tokens = toks(&["a", "b", "c"]);
    assert_eq!(trim(&tokens, 3), tokens);
    assert_eq!(trim(&tokens, 10), tokens);
}

#[test]
fn trim_keeps_head_and_tail() {
    let tokens: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let out = trim(&tokens, 5);
    assert_eq!(out, toks(&["0", "1", "7", "8", "9"]));

    let long: Vec<String> = (0..2000).map(|i| i.to_string()).collect();
    let out = trim(&long, 512);
    assert_eq!(out.len(), 512);
    assert_eq!(out[..256], long[..256]);
    assert_eq!(out[256..], long[2000 - 256..]);
}

#[test]
fn wayback_prefix_and_domain() {
    let bare =
        remove_wayback_prefix("https://web.archive.org/web/20200102030405/http://fatcat.wiki/one.pdf");
    assert_eq!(bare, "http://fatcat.wiki/one.pdf");
    assert_eq!(extract_domain(bare), "fatcat.wiki");
    assert_eq!(remove_wayback_prefix("http://fatcat.wiki/one.pdf"), "http://fatcat.wiki/one.pdf");
}

#[test]
fn url_tokens_are_directory_segments_then_domain() {
    let url = "https://arxiv.org/pdf/cs/1607.01759.pdf";
    assert_eq!(extract_uri(url), "/pdf/cs");
    assert_eq!(tokenize_url(url), toks(&["", "pdf", "cs", "arxiv.org"]));
    assert_eq!(
        url_model_input(&tokenize_url(url)),
        " U_pdf U_cs U_arxiv.org"
    );
}

#[test]
fn query_string_is_dropped_from_uri() {
    let url = "http://example.com/maps?x=1/y/foo.pdf";
    assert_eq!(extract_uri(url), "/maps");
}

#[test]
fn wayback_url_tokens() {
    let tokens =
        tokenize_url("https://web.archive.org/web/20200102030405/http://fatcat.wiki/one.pdf");
    assert_eq!(tokens, toks(&["", "fatcat.wiki"]));
}

#[test]
fn ftp_and_bare_host() {
    assert_eq!(extract_domain("ftp://ftp.example.org/pub/x.pdf"), "ftp.example.org");
    assert_eq!(extract_domain("http://example.org"), "example.org");
    assert_eq!(extract_uri("http://example.org"), "");
}
