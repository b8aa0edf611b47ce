//! Identifier paths for SQL-like query languages.
//!
//! Query services that speak SQL++ address data as `bucket.scope.collection`, where any segment may be quoted with
//! backticks (which may in turn contain dots). These helpers split such paths without allocating, and only unquote
//! identifiers once the caller decides what to keep.

use std::borrow::Cow;

const BACKTICK: u8 = b'`';
const SEPARATOR: u8 = b'.';
const DEFAULT_NAMESPACE_PREFIX: &str = "default:";

/// A table path split into its bucket and collection parts.
///
/// Both parts borrow from the original input and keep their original quoting.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TablePath<'a> {
    /// Top-level container.
    pub bucket: &'a str,

    /// Nested path below the bucket.
    pub collection: &'a str,
}

/// Splits a table path into its bucket and collection.
///
/// - an empty input yields two empty parts
/// - a single segment is the collection when a query context is present (the bucket then comes from the query
///   context), and the bucket otherwise
/// - three segments are split into the first segment and the remaining text after the first separator
/// - any other number of segments is ambiguous, and the input is returned unmodified as the collection
pub fn parse_table_path(raw: &str, has_query_context: bool) -> TablePath<'_> {
    if raw.is_empty() {
        return TablePath::default();
    }

    let (separators, first_separator) = top_level_separators(raw);
    match separators {
        0 if has_query_context => TablePath {
            bucket: "",
            collection: raw,
        },
        0 => TablePath {
            bucket: raw,
            collection: "",
        },
        2 => TablePath {
            bucket: &raw[..first_separator],
            collection: &raw[first_separator + 1..],
        },
        _ => TablePath {
            bucket: "",
            collection: raw,
        },
    }
}

/// Extracts the namespace (bucket) from a SQL++ query context.
///
/// Query contexts look like `default:bucket.scope`, where the `default:` prefix is optional and any segment may be
/// backtick-quoted. The returned namespace is unquoted.
pub fn extract_query_context_namespace(query_context: &str) -> Cow<'_, str> {
    let query_context = query_context
        .strip_prefix(DEFAULT_NAMESPACE_PREFIX)
        .unwrap_or(query_context);

    let (separators, first_separator) = top_level_separators(query_context);
    let bucket = if separators == 0 {
        query_context
    } else {
        &query_context[..first_separator]
    };

    unquote_identifier(bucket)
}

/// Removes backtick quoting from an identifier path.
///
/// Inside a quoted run, a doubled backtick stands for a literal backtick.
pub fn unquote_identifier(identifier: &str) -> Cow<'_, str> {
    if memchr::memchr(BACKTICK, identifier.as_bytes()).is_none() {
        return Cow::Borrowed(identifier);
    }

    let mut unquoted = String::with_capacity(identifier.len());
    let mut in_quotes = false;
    let mut chars = identifier.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '`' {
            unquoted.push(c);
            continue;
        }

        if in_quotes && chars.peek() == Some(&'`') {
            chars.next();
            unquoted.push('`');
        } else {
            in_quotes = !in_quotes;
        }
    }

    Cow::Owned(unquoted)
}

/// Finds the first table identifier in a statement.
///
/// The identifier is the token following the first `FROM` or `INTO` keyword that isn't the start of a sub-query.
/// Quoted runs (backticks, single and double quotes) are never split, so keywords inside string literals are ignored.
pub fn find_table_identifier(statement: &str) -> Option<&str> {
    let mut words = Words::new(statement);
    while let Some(word) = words.next() {
        if !word.eq_ignore_ascii_case("FROM") && !word.eq_ignore_ascii_case("INTO") {
            continue;
        }

        let identifier = trim_identifier(words.next()?);
        if !identifier.is_empty() {
            return Some(identifier);
        }
    }

    None
}

/// Counts unquoted separators, returning the count (capped at three) and the position of the first one.
fn top_level_separators(raw: &str) -> (usize, usize) {
    let mut count = 0;
    let mut first = raw.len();
    let mut in_quotes = false;

    for (i, b) in raw.bytes().enumerate() {
        match b {
            BACKTICK => in_quotes = !in_quotes,
            SEPARATOR if !in_quotes => {
                if count == 0 {
                    first = i;
                }
                count += 1;
                if count > 2 {
                    break;
                }
            }
            _ => {}
        }
    }

    (count, first)
}

/// Cuts an identifier token at the first unquoted punctuation that can't be part of a path.
///
/// Sub-queries (tokens starting with `(`) yield an empty identifier.
fn trim_identifier(token: &str) -> &str {
    let mut in_quotes = false;
    for (i, b) in token.bytes().enumerate() {
        match b {
            BACKTICK => in_quotes = !in_quotes,
            b'(' | b')' | b',' | b';' if !in_quotes => return &token[..i],
            _ => {}
        }
    }
    token
}

/// Whitespace-delimited words of a statement, keeping quoted runs intact.
struct Words<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Words<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }
}

impl<'a> Iterator for Words<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        let mut quote: Option<u8> = None;
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == BACKTICK || b == b'\'' || b == b'"' => quote = Some(b),
                None if b.is_ascii_whitespace() => break,
                None => {}
            }
            self.pos += 1;
        }

        // Splitting only happens on ASCII bytes, so both ends are always on character boundaries.
        Some(&self.input[start..self.pos])
    }
}
