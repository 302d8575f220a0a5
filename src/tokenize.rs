//! Token streams for the text and URL classifiers.
//!
//! Tokens are produced the same way the models were trained: control
//! characters become spaces, whitespace splits, and punctuation is stripped
//! from inside each token (`don't` -> `dont`). Tokens that were nothing but
//! punctuation survive as empty strings.

use regex::Regex;
use std::sync::OnceLock;

/// Prefix of a web-archive capture URL; the timestamp segment follows.
pub const WAYBACK_PREFIX: &str = "https://web.archive.org/web/";

/// Separator used when feeding URL tokens to the URL model.
pub const URL_TOKEN_JOIN: &str = " U_";

fn control_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x00-\x1F]+").expect("static regex"))
}

/// ASCII punctuation, a few Latin-1 marks, the Arabic question mark and the
/// General Punctuation block U+2000..=U+206E minus the unassigned U+2065.
pub fn is_stripped_punct(c: char) -> bool {
    if c.is_ascii_punctuation() {
        return true;
    }
    matches!(
        c,
        '\u{00BF}' | '\u{061F}' | '\u{00A1}' | '\u{00A2}' | '\u{00A3}' | '\u{00A5}'
            | '\u{00A9}' | '\u{00AE}' | '\u{00A7}'
    ) || (('\u{2000}'..='\u{206E}').contains(&c) && c != '\u{2065}')
}

pub fn tokenize(text: &str) -> Vec<String> {
    let spaced = control_chars().replace_all(text, " ");
    spaced
        .split_whitespace()
        .map(|w| w.chars().filter(|c| !is_stripped_punct(*c)).collect())
        .collect()
}

/// Keep the head and tail of `tokens`, dropping a contiguous middle slice so
/// that exactly `max_tokens` remain.
pub fn trim(tokens: &[String], max_tokens: usize) -> Vec<String> {
    if tokens.len() <= max_tokens {
        return tokens.to_vec();
    }
    let cut = tokens.len() - max_tokens;
    let front_keep = max_tokens / 2;
    let back_start = front_keep + cut;
    let mut out = Vec::with_capacity(max_tokens);
    out.extend_from_slice(&tokens[..front_keep]);
    out.extend_from_slice(&tokens[back_start..]);
    out
}

/// Strip `https://web.archive.org/web/<timestamp>/` if present.
pub fn remove_wayback_prefix(url: &str) -> &str {
    match url.strip_prefix(WAYBACK_PREFIX) {
        Some(rest) => match rest.find('/') {
            Some(i) => &rest[i + 1..],
            None => rest,
        },
        None => url,
    }
}

fn strip_scheme(url: &str) -> &str {
    let mut p = url;
    for scheme in ["http://", "https://", "ftp://"] {
        if let Some(rest) = p.strip_prefix(scheme) {
            p = rest;
        }
    }
    p
}

/// Host part of `url`, without scheme or port.
pub fn extract_domain(url: &str) -> &str {
    let p = strip_scheme(url);
    let host = match p.find('/') {
        Some(i) => &p[..i],
        None => p,
    };
    match host.find(':') {
        Some(i) if i > 1 => &host[..i],
        _ => host,
    }
}

/// Directory part of the path: no domain, no port, no file name, no query.
pub fn extract_uri(url: &str) -> &str {
    let domain = extract_domain(url);
    let mut rest = match url.find(domain) {
        Some(i) => &url[i + domain.len()..],
        None => url,
    };
    if rest.starts_with(':') {
        rest = match rest.find('/') {
            Some(i) => &rest[i + 1..],
            None => "",
        };
    }
    let dir = match rest.rfind('/') {
        Some(i) => &rest[..i],
        None => "",
    };
    match dir.find('?') {
        Some(i) => &dir[..i],
        None => dir,
    }
}

/// Path segments in order, then the domain. Segments may be empty.
pub fn tokenize_url(url: &str) -> Vec<String> {
    let bare = remove_wayback_prefix(url);
    let domain = extract_domain(bare);
    let mut tokens: Vec<String> = extract_uri(bare).split('/').map(str::to_string).collect();
    tokens.push(domain.to_string());
    tokens
}

/// Model input for the URL classifier: `a U_b U_c`.
pub fn url_model_input(tokens: &[String]) -> String {
    tokens.join(URL_TOKEN_JOIN)
}
