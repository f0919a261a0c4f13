//! Tag grammar reader.
//!
//! Turns one doc comment block into a sequence of recognised `@Tag value`
//! lines. Lines that do not start with a known tag are free prose and are
//! skipped. Interpretation of a tag (document, controller or method level)
//! is left to the caller.

use crate::error::Error;
use anyhow::Result;

/// Separator used when a `@Summary` or `@Description` spans several lines.
pub const LINE_JOIN: &str = "<br>";

/// Recognised tag keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Title,
    Summary,
    Description,
    Param,
    Success,
    Failure,
    Deprecated,
    Consumes,
    Produces,
    Router,
    Name,
    Private,
    Permission,
    Version,
    Host,
    BasePath,
    Schemes,
    Contact,
    License,
    LicenseUrl,
    TermsOfServiceUrl,
    Url,
}

const KEYWORDS: &[(&str, Tag)] = &[
    ("@TermsOfServiceUrl", Tag::TermsOfServiceUrl),
    ("@Description", Tag::Description),
    ("@Deprecated", Tag::Deprecated),
    ("@Permission", Tag::Permission),
    ("@LicenseUrl", Tag::LicenseUrl),
    ("@BasePath", Tag::BasePath),
    ("@Consumes", Tag::Consumes),
    ("@Produces", Tag::Produces),
    ("@Produce", Tag::Produces),
    ("@Summary", Tag::Summary),
    ("@Success", Tag::Success),
    ("@Failure", Tag::Failure),
    ("@Version", Tag::Version),
    ("@Private", Tag::Private),
    ("@License", Tag::License),
    ("@Contact", Tag::Contact),
    ("@Schemes", Tag::Schemes),
    ("@Accept", Tag::Consumes),
    ("@Router", Tag::Router),
    ("@Title", Tag::Title),
    ("@Param", Tag::Param),
    ("@Name", Tag::Name),
    ("@Host", Tag::Host),
    ("@URL", Tag::Url),
];

/// One recognised logical line of a comment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLine {
    pub tag: Tag,
    /// Text after the keyword, trimmed.
    pub value: String,
    /// The full line, for error messages.
    pub raw: String,
}

impl Tag {
    /// Matches the longest keyword that is followed by whitespace or the end of the line.
    fn match_line(line: &str) -> Option<(Tag, &str)> {
        KEYWORDS.iter().find_map(|(keyword, tag)| {
            let rest = line.strip_prefix(keyword)?;
            match rest.chars().next() {
                None => Some((*tag, rest)),
                Some(c) if c.is_whitespace() => Some((*tag, rest)),
                _ => None,
            }
        })
    }
}

/// Reads every recognised tag line from a comment block's text.
pub fn read_tags(text: &str) -> Vec<TagLine> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let (tag, rest) = Tag::match_line(line)?;
            Some(TagLine {
                tag,
                value: rest.trim().to_string(),
                raw: line.to_string(),
            })
        })
        .collect()
}

/// True when at least one line of the block begins with `@`.
pub fn is_doc_block(text: &str) -> bool {
    text.lines().any(|line| line.trim_start().starts_with('@'))
}

/// Appends one line of a multi-line `@Summary`/`@Description`.
pub fn join_line(acc: &mut String, value: &str) {
    if !acc.is_empty() {
        acc.push_str(LINE_JOIN);
    }
    acc.push_str(value);
}

/// Splits a tag argument list on whitespace, keeping double-quoted spans
/// together and dropping the quote characters.
///
/// ```
/// use openapi_from_annotations::annotation::split_args;
///
/// assert_eq!(
///     split_args(r#"some_id path int true "Some ID" 123"#),
///     vec!["some_id", "path", "int", "true", "Some ID", "123"],
/// );
/// ```
pub fn split_args(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut quoted = false;

    for c in s.chars() {
        if c.is_whitespace() && !quoted {
            if started {
                tokens.push(std::mem::take(&mut current));
                started = false;
            }
            continue;
        }
        started = true;
        if c == '"' {
            quoted = !quoted;
            continue;
        }
        current.push(c);
    }
    if started {
        tokens.push(current);
    }
    tokens
}

/// Maps a comma list of short content-type names to media types.
pub fn content_types(value: &str) -> Result<Vec<String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|short| {
            let media = match short {
                "json" => "application/json",
                "xml" => "application/xml",
                "plain" => "text/plain",
                "html" => "text/html",
                "form" => "application/x-www-form-urlencoded",
                "formData" => "multipart/form-data",
                "stream" => "application/octet-stream",
                other if other.contains('/') => other,
                other => return Err(Error::UnknownContentType(other.to_string()).into()),
            };
            Ok(media.to_string())
        })
        .collect()
}

/// Parses a boolean the way Go's `strconv.ParseBool` accepts it.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Converts raw comment node texts (`// ...` or `/* ... */`) into the text of
/// the comment group: markers and the first space of line comments stripped,
/// trailing spaces trimmed, leading and trailing blank lines removed.
pub fn comment_text<S: AsRef<str>>(comments: &[S]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for comment in comments {
        let comment = comment.as_ref();
        if let Some(body) = comment.strip_prefix("//") {
            // Tool directives like `//go:generate` are not documentation.
            if body.starts_with("go:") || body.starts_with("line ") {
                continue;
            }
            let body = body.strip_prefix(' ').unwrap_or(body);
            lines.push(body.trim_end().to_string());
        } else if let Some(body) = comment.strip_prefix("/*") {
            let body = body.strip_suffix("*/").unwrap_or(body);
            lines.extend(body.lines().map(|l| l.trim_end().to_string()));
        }
    }

    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
