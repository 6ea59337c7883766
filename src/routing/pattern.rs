//! Route pattern compilation.
//!
//! # Responsibilities
//! - Parse the pattern mini-language (`{name}`, `{name:regex}`,
//!   `{name:shorthand}`, bare `(...)` and `(?P<name>...)` groups,
//!   `/:controller` style placeholders), each optionally followed by a
//!   quantifier
//! - Escape literal text so it matches verbatim
//! - Produce one anchored regex per pattern, or a plain literal when the
//!   pattern has no dynamic segment
//!
//! # Design Decisions
//! - Every parameter becomes exactly one capture group, in pattern order.
//!   Groups inside user fragments are rewritten as non-capturing so the
//!   capture count always equals the number of parameters.
//! - Literal patterns never touch the regex engine
//! - All failures happen here, at registration time

use regex::{Regex, RegexBuilder};

use crate::routing::error::RouterError;

/// Shorthand character classes accepted after `{name:`.
pub const SHORTHANDS: &[(&str, &str)] = &[
    ("int", "[0-9]+"),
    ("alpha", "[a-zA-Z]+"),
    ("alnum", "[a-zA-Z0-9]+"),
    ("slug", "[a-zA-Z0-9-]+"),
    (
        "uuid",
        "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    ),
];

/// `/:name` placeholders and the fragment each one expands to.
const COLON_PLACEHOLDERS: &[(&str, &str)] = &[
    ("module", r"[\w-]+"),
    ("namespace", r"[\w-]+"),
    ("controller", r"[\w-]+"),
    ("action", r"[\w-]+"),
    ("int", "[0-9]+"),
];

/// Default fragment for `{name}` in a path: one segment.
const PATH_SEGMENT: &str = "[^/]+";

/// Default fragment for `{name}` in a hostname: one label.
const HOST_LABEL: &str = "[^.]+";

/// Look up the regex fragment for a shorthand class.
pub fn shorthand(name: &str) -> Option<&'static str> {
    SHORTHANDS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, fragment)| *fragment)
}

/// Process-wide matching options, fixed when the registry is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Strip trailing `/` from patterns and request paths (except `/`).
    pub remove_extra_slashes: bool,
    /// Compare paths case-sensitively. Hostnames are always insensitive.
    pub case_sensitive: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            remove_extra_slashes: true,
            case_sensitive: true,
        }
    }
}

/// What a pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Path,
    Host,
}

#[derive(Debug, Clone)]
enum MatchForm {
    /// Equality match. `folded` is set when the comparison ignores case.
    Literal { text: String, folded: Option<String> },
    Regex(Regex),
}

/// A compiled pattern. Immutable once built.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    kind: PatternKind,
    form: MatchForm,
    param_names: Vec<Option<String>>,
    accepts_port: bool,
}

impl RoutePattern {
    /// The pattern as written (after prefixing and slash normalization).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Whether the pattern has any dynamic segment.
    pub fn is_regex(&self) -> bool {
        matches!(self.form, MatchForm::Regex(_))
    }

    /// Parameter name per capture, `None` for positional groups.
    pub fn param_names(&self) -> &[Option<String>] {
        &self.param_names
    }

    /// The compiled regex source, if any.
    pub fn regex_source(&self) -> Option<&str> {
        match &self.form {
            MatchForm::Regex(re) => Some(re.as_str()),
            MatchForm::Literal { .. } => None,
        }
    }

    /// Match `subject` and return one entry per capture in pattern order.
    ///
    /// Returns `None` when the subject does not match. Every capture sits
    /// at the top level of the regex, so all of them take part in a match.
    pub fn captures(&self, subject: &str) -> Option<Vec<String>> {
        match &self.form {
            MatchForm::Literal { text, folded } => {
                let subject = if self.accepts_port {
                    strip_port(subject)
                } else {
                    subject
                };
                let equal = match folded {
                    Some(folded) => subject.to_lowercase() == *folded,
                    None => subject == text,
                };
                equal.then(Vec::new)
            }
            MatchForm::Regex(re) => {
                let caps = re.captures(subject)?;
                Some(
                    (1..=self.param_names.len())
                        .map(|i| caps.get(i).map_or_else(String::new, |m| m.as_str().to_string()))
                        .collect(),
                )
            }
        }
    }

    /// Convenience for callers that only need a yes/no answer.
    pub fn is_match(&self, subject: &str) -> bool {
        match &self.form {
            MatchForm::Regex(re) => re.is_match(subject),
            MatchForm::Literal { .. } => self.captures(subject).is_some(),
        }
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Strip a trailing `:port` from a hostname.
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Normalize a request path the same way patterns are normalized.
pub fn normalize_path<'a>(path: &'a str, options: &MatchOptions) -> &'a str {
    if path.is_empty() {
        return "/";
    }
    if options.remove_extra_slashes && path != "/" {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return "/";
        }
        return trimmed;
    }
    path
}

#[derive(Debug)]
enum Piece {
    Literal(String),
    /// Regex text copied as-is, e.g. a top-level `(?:...)`.
    Raw(String),
    Capture {
        name: Option<String>,
        fragment: String,
    },
}

/// Compiles pattern strings into [`RoutePattern`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternCompiler {
    options: MatchOptions,
}

impl PatternCompiler {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Compile a path pattern.
    pub fn compile(&self, pattern: &str) -> Result<RoutePattern, RouterError> {
        let mut raw = if pattern.is_empty() { "/" } else { pattern };
        if self.options.remove_extra_slashes && raw != "/" {
            raw = raw.trim_end_matches('/');
            if raw.is_empty() {
                raw = "/";
            }
        }
        self.build(raw, PatternKind::Path)
    }

    /// Compile a hostname pattern.
    pub fn compile_hostname(&self, pattern: &str) -> Result<RoutePattern, RouterError> {
        if pattern.is_empty() {
            return Err(RouterError::invalid(pattern, "empty hostname"));
        }
        self.build(pattern, PatternKind::Host)
    }

    fn build(&self, raw: &str, kind: PatternKind) -> Result<RoutePattern, RouterError> {
        let pieces = tokenize(raw, kind).map_err(|reason| RouterError::invalid(raw, reason))?;
        let case_insensitive = kind == PatternKind::Host || !self.options.case_sensitive;
        let accepts_port = kind == PatternKind::Host && !raw.contains(':');

        let dynamic = pieces
            .iter()
            .any(|p| matches!(p, Piece::Capture { .. } | Piece::Raw(_)));

        if !dynamic {
            let text: String = pieces
                .into_iter()
                .map(|p| match p {
                    Piece::Literal(s) => s,
                    _ => String::new(),
                })
                .collect();
            let folded = case_insensitive.then(|| text.to_lowercase());
            tracing::trace!(pattern = %raw, "compiled literal pattern");
            return Ok(RoutePattern {
                raw: raw.to_string(),
                kind,
                form: MatchForm::Literal { text, folded },
                param_names: Vec::new(),
                accepts_port,
            });
        }

        let mut source = String::from("^");
        let mut param_names = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Literal(text) => source.push_str(&regex::escape(&text)),
                Piece::Raw(text) => source.push_str(&text),
                Piece::Capture { name, fragment } => {
                    if let Some(name) = &name {
                        if param_names.iter().flatten().any(|n: &String| n == name) {
                            return Err(RouterError::invalid(
                                raw,
                                format!("duplicate parameter `{}`", name),
                            ));
                        }
                    }
                    source.push('(');
                    source.push_str(&fragment);
                    source.push(')');
                    param_names.push(name);
                }
            }
        }
        if accepts_port {
            source.push_str("(?::[0-9]+)?");
        }
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| RouterError::invalid(raw, e.to_string()))?;
        debug_assert_eq!(regex.captures_len() - 1, param_names.len());

        tracing::trace!(pattern = %raw, regex = %source, "compiled dynamic pattern");
        Ok(RoutePattern {
            raw: raw.to_string(),
            kind,
            form: MatchForm::Regex(regex),
            param_names,
            accepts_port,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Find the index of the delimiter closing the one at `open`, skipping
/// escapes and character classes.
fn find_close(bytes: &[u8], open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if in_class {
            if b == b']' {
                in_class = false;
            }
        } else if b == b'[' {
            in_class = true;
        } else if b == open_ch {
            depth += 1;
        } else if b == close_ch {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

fn flush(literal: &mut String, pieces: &mut Vec<Piece>) {
    if !literal.is_empty() {
        pieces.push(Piece::Literal(std::mem::take(literal)));
    }
}

fn tokenize(pattern: &str, kind: PatternKind) -> Result<Vec<Piece>, String> {
    let bytes = pattern.as_bytes();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let end = find_close(bytes, i, b'{', b'}').ok_or("unbalanced `{`")?;
                let body = &pattern[i + 1..end];
                let (name, spec) = match body.split_once(':') {
                    Some((name, spec)) => (name, Some(spec)),
                    None => (body, None),
                };
                if !is_identifier(name) {
                    return Err(format!("invalid parameter name `{}`", name));
                }
                let fragment = match spec {
                    None if kind == PatternKind::Host => HOST_LABEL.to_string(),
                    None => PATH_SEGMENT.to_string(),
                    Some("") => return Err(format!("empty expression for `{}`", name)),
                    Some(spec) => match shorthand(spec) {
                        Some(fragment) => fragment.to_string(),
                        None => sanitize_fragment(spec)?,
                    },
                };
                let q = quantifier(pattern, end + 1);
                flush(&mut literal, &mut pieces);
                pieces.push(Piece::Capture {
                    name: Some(name.to_string()),
                    fragment: quantified(fragment, q),
                });
                i = end + 1 + q.len();
            }
            b'(' => {
                let end = find_close(bytes, i, b'(', b')').ok_or("unbalanced `(`")?;
                let inner = &pattern[i + 1..end];
                let q = quantifier(pattern, end + 1);
                flush(&mut literal, &mut pieces);
                if let Some((name, body)) = named_group(inner) {
                    if !is_identifier(name) {
                        return Err(format!("invalid parameter name `{}`", name));
                    }
                    pieces.push(Piece::Capture {
                        name: Some(name.to_string()),
                        fragment: quantified(sanitize_fragment(body)?, q),
                    });
                } else if inner.starts_with('?') {
                    let mut raw = sanitize_fragment(&pattern[i..=end])?;
                    raw.push_str(q);
                    pieces.push(Piece::Raw(raw));
                } else {
                    pieces.push(Piece::Capture {
                        name: None,
                        fragment: quantified(sanitize_fragment(inner)?, q),
                    });
                }
                i = end + 1 + q.len();
            }
            b'}' => return Err("unbalanced `}`".to_string()),
            b')' => return Err("unbalanced `)`".to_string()),
            b'\\' => {
                let next = pattern[i + 1..]
                    .chars()
                    .next()
                    .ok_or("trailing backslash")?;
                literal.push(next);
                i += 1 + next.len_utf8();
            }
            b'/' if kind == PatternKind::Path && bytes.get(i + 1) == Some(&b':') => {
                let tail = &pattern[i + 2..];
                let len = tail
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(tail.len());
                let word = &tail[..len];
                if word == "params" {
                    flush(&mut literal, &mut pieces);
                    pieces.push(Piece::Capture {
                        name: None,
                        fragment: "(?:/.*)?".to_string(),
                    });
                } else if let Some((_, fragment)) =
                    COLON_PLACEHOLDERS.iter().find(|(key, _)| *key == word)
                {
                    let q = quantifier(pattern, i + 2 + len);
                    literal.push('/');
                    flush(&mut literal, &mut pieces);
                    pieces.push(Piece::Capture {
                        name: None,
                        fragment: quantified(fragment.to_string(), q),
                    });
                    i += q.len();
                } else {
                    literal.push_str("/:");
                    literal.push_str(word);
                }
                i += 2 + len;
            }
            _ => {
                let ch = pattern[i..].chars().next().ok_or("unexpected end of pattern")?;
                literal.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    flush(&mut literal, &mut pieces);
    Ok(pieces)
}

/// The regex quantifier (`?`, `*`, `+`, `{m}`, `{m,}`, `{m,n}`, each
/// optionally lazy) starting at byte `at`, or `""`.
fn quantifier(pattern: &str, at: usize) -> &str {
    let bytes = pattern.as_bytes();
    let len = match bytes.get(at) {
        Some(b'?' | b'*' | b'+') => 1,
        Some(b'{') => match pattern[at..].find('}') {
            Some(close) => {
                let body = &pattern[at + 1..at + close];
                let (min, max) = body.split_once(',').unwrap_or((body, ""));
                let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
                if !min.is_empty() && digits(min) && digits(max) {
                    close + 1
                } else {
                    0
                }
            }
            None => 0,
        },
        _ => 0,
    };
    if len > 0 && bytes.get(at + len) == Some(&b'?') {
        &pattern[at..at + len + 1]
    } else {
        &pattern[at..at + len]
    }
}

/// Apply a quantifier inside the capture so the group count is unchanged
/// and an absent optional part captures `""`.
fn quantified(fragment: String, quantifier: &str) -> String {
    if quantifier.is_empty() {
        fragment
    } else {
        format!("(?:{}){}", fragment, quantifier)
    }
}

/// Split `?P<name>body` or `?<name>body` into name and body.
fn named_group(inner: &str) -> Option<(&str, &str)> {
    let rest = inner.strip_prefix("?P<").or_else(|| {
        inner
            .strip_prefix("?<")
            .filter(|r| !r.starts_with('=') && !r.starts_with('!'))
    })?;
    rest.split_once('>')
}

/// Validate a user regex fragment and make all of its groups
/// non-capturing.
fn sanitize_fragment(fragment: &str) -> Result<String, String> {
    let mut out = String::with_capacity(fragment.len() + 8);
    let mut chars = fragment.chars().peekable();
    let mut depth = 0usize;
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let next = chars.next().ok_or("trailing backslash")?;
                out.push('\\');
                out.push(next);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            _ if in_class => out.push(c),
            '[' => {
                in_class = true;
                out.push(c);
                // a leading `]` (or `^]`) is a literal member of the class
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            '(' => {
                depth += 1;
                if chars.peek() == Some(&'?') {
                    chars.next();
                    let mut lookahead = chars.clone();
                    let named = match lookahead.next() {
                        Some('P') => lookahead.next() == Some('<'),
                        Some('<') => !matches!(lookahead.next(), Some('=') | Some('!')),
                        _ => false,
                    };
                    if named {
                        for skipped in chars.by_ref() {
                            if skipped == '>' {
                                break;
                            }
                        }
                        out.push_str("(?:");
                    } else {
                        out.push_str("(?");
                    }
                } else {
                    out.push_str("(?:");
                }
            }
            ')' => {
                if depth == 0 {
                    return Err("unbalanced `)`".to_string());
                }
                depth -= 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if in_class {
        return Err("unterminated character class".to_string());
    }
    if depth != 0 {
        return Err("unbalanced `(`".to_string());
    }
    Ok(out)
}
