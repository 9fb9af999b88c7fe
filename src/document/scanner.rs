//! Structural scanner for flat `key = value` blocks.
//!
//! The grammar is one assignment per line: a bare key, `=`, and a value that
//! is a quoted string, a boolean, or anything else kept verbatim up to a
//! trailing `# comment`. Comment lines, table headers and blank lines are
//! skipped. Every entry carries the byte spans needed to patch the block
//! without re-serializing it.

use std::borrow::Cow;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Quoted string, unescaped.
    Str(String),
    Bool(bool),
    /// Numbers, arrays, unterminated strings: kept as written.
    Raw(String),
}

impl Value {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Str(s) => Cow::Borrowed(s.as_str()),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::Raw(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Str(s) => s.is_empty(),
            Value::Bool(_) => false,
            Value::Raw(s) => s.is_empty(),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
    pub line_start: usize,
    /// Index of the terminating `\n`, or the block length for the last line.
    pub line_end: usize,
    pub value_start: usize,
    pub value_end: usize,
}

impl Entry {
    pub fn value_span(&self) -> Range<usize> {
        self.value_start..self.value_end
    }
}

/// Scans `block` into its ordered list of assignments.
pub fn scan(block: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut line_start = 0;

    while line_start <= block.len() {
        let line_end = block[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(block.len());

        if let Some(entry) = scan_line(block, line_start, line_end) {
            entries.push(entry);
        }

        if line_end == block.len() {
            break;
        }
        line_start = line_end + 1;
    }

    entries
}

/// First entry for `key`; later duplicates are never consulted.
pub fn find<'a>(entries: &'a [Entry], key: &str) -> Option<&'a Entry> {
    entries.iter().find(|e| e.key == key)
}

fn scan_line(block: &str, line_start: usize, line_end: usize) -> Option<Entry> {
    let line = &block[line_start..line_end];
    let bytes = line.as_bytes();
    let mut pos = skip_blanks(bytes, 0);

    let key_start = pos;
    while pos < bytes.len() && is_key_byte(bytes[pos]) {
        pos += 1;
    }
    if pos == key_start {
        // Blank line, comment, table header or other non-assignment.
        return None;
    }
    let key = &line[key_start..pos];

    pos = skip_blanks(bytes, pos);
    if bytes.get(pos) != Some(&b'=') {
        return None;
    }
    pos = skip_blanks(bytes, pos + 1);

    let (value, len) = scan_value(&line[pos..]);
    Some(Entry {
        key: key.to_string(),
        value,
        line_start,
        line_end,
        value_start: line_start + pos,
        value_end: line_start + pos + len,
    })
}

/// Returns the value and the byte length of its token.
fn scan_value(rest: &str) -> (Value, usize) {
    if rest.starts_with('"') {
        if let Some((text, len)) = scan_basic_string(rest) {
            return (Value::Str(text), len);
        }
    } else if let Some(stripped) = rest.strip_prefix('\'') {
        if let Some(close) = stripped.find('\'') {
            return (Value::Str(stripped[..close].to_string()), close + 2);
        }
    } else {
        for (word, flag) in [("true", true), ("false", false)] {
            if rest.starts_with(word) && ends_token(&rest[word.len()..]) {
                return (Value::Bool(flag), word.len());
            }
        }
    }

    let raw = rest[..raw_token_end(rest)].trim_end();
    (Value::Raw(raw.to_string()), raw.len())
}

/// End of an unquoted value: the first `#` outside quotes that starts the
/// line remainder or follows a blank, else the end of the line.
fn raw_token_end(rest: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut prev_blank = true;

    for (idx, c) in rest.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' && prev_blank => return idx,
            None => {}
        }
        prev_blank = c == ' ' || c == '\t';
    }

    rest.len()
}

fn scan_basic_string(rest: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = rest.char_indices().skip(1);

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((out, idx + 1)),
            '\\' => match chars.next()?.1 {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                other => out.push(other),
            },
            _ => out.push(c),
        }
    }

    None
}

fn ends_token(after: &str) -> bool {
    after
        .chars()
        .next()
        .map_or(true, |c| c.is_whitespace() || c == '#')
}

fn skip_blanks(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
        pos += 1;
    }
    pos
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Renders `value` as a quoted string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
