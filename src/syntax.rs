//! Lossless Line Tree
//!
//! A concrete-syntax view of an indentation-structured schema document.
//! Every line is classified once and keeps byte spans for its key and
//! scalar value, so symbols can be renamed by splicing spans in place.
//! Rendering an unedited tree reproduces the input byte for byte,
//! including comments, blank lines and line terminators.
//!
//! Only the subset the engine needs is recognized: `key:` / `key: value`
//! entries, `- value` sequence items and single-line flow sequences
//! (`[a, b]`). Anything else is kept verbatim as [`LineKind::Other`].

use std::ops::Range;

use tracing::warn;

// =============================================================================
// Spans
// =============================================================================

/// Byte range within one line's content (terminator excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The text covered by this span
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// =============================================================================
// Lines
// =============================================================================

/// Structural role of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment,
    /// `key:` or `key: value`
    Entry { key: Span, value: Option<Span> },
    /// `- value`
    Item { value: Option<Span> },
    /// Continuation text or anything not recognized above
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnding {
    None,
    Lf,
    CrLf,
}

impl LineEnding {
    fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// One physical line of the document
#[derive(Debug, Clone)]
pub struct SourceLine {
    content: String,
    ending: LineEnding,
    indent: usize,
    kind: LineKind,
}

impl SourceLine {
    fn new(content: String, ending: LineEnding) -> Self {
        let (indent, kind) = classify(&content);
        Self {
            content,
            ending,
            indent,
            kind,
        }
    }

    /// Line text without its terminator
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of leading spaces
    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    /// Blank lines and comments carry no structure
    pub fn is_significant(&self) -> bool {
        !matches!(self.kind, LineKind::Blank | LineKind::Comment)
    }

    pub fn key_span(&self) -> Option<Span> {
        match self.kind {
            LineKind::Entry { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key_span().map(|span| span.slice(&self.content))
    }

    /// Value span of an entry or item
    pub fn value_span(&self) -> Option<Span> {
        match self.kind {
            LineKind::Entry { value, .. } | LineKind::Item { value } => value,
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value_span().map(|span| span.slice(&self.content))
    }

    /// Item spans of a single-line flow sequence value such as `[id, name]`.
    ///
    /// Returns `None` when the value is not a flow sequence or nests
    /// further collections.
    pub fn flow_items(&self) -> Option<Vec<Span>> {
        let value = self.value_span()?;
        let text = value.slice(&self.content);
        if text.len() < 2 || !text.starts_with('[') || !text.ends_with(']') {
            return None;
        }
        let inner = &text[1..text.len() - 1];
        if inner.contains(['[', ']', '{', '}']) {
            return None;
        }

        let base = value.start + 1;
        let mut items = Vec::new();
        let mut offset = 0;
        for piece in inner.split(',') {
            let start = base + offset;
            let end = start + piece.len();
            if let Some(span) = scalar_span(&self.content, start, end) {
                items.push(span);
            }
            offset += piece.len() + 1;
        }
        Some(items)
    }

    fn splice(&mut self, span: Span, replacement: &str) {
        self.content.replace_range(span.start..span.end, replacement);
        let (indent, kind) = classify(&self.content);
        self.indent = indent;
        self.kind = kind;
    }
}

// =============================================================================
// Document
// =============================================================================

/// A span replacement on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Zero-based line index
    pub line: usize,
    pub span: Span,
    pub replacement: String,
}

/// The full document as an ordered list of classified lines
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    lines: Vec<SourceLine>,
}

impl SourceDocument {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .split_inclusive('\n')
            .map(|raw| {
                if let Some(content) = raw.strip_suffix("\r\n") {
                    SourceLine::new(content.to_string(), LineEnding::CrLf)
                } else if let Some(content) = raw.strip_suffix('\n') {
                    SourceLine::new(content.to_string(), LineEnding::Lf)
                } else {
                    SourceLine::new(raw.to_string(), LineEnding::None)
                }
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Reassemble the text, terminators included
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.content);
            out.push_str(line.ending.as_str());
        }
        out
    }

    /// Body lines of the first top-level entry named `key`
    pub fn top_level_section(&self, key: &str) -> Option<Range<usize>> {
        let header = self
            .lines
            .iter()
            .position(|line| line.indent == 0 && line.key() == Some(key))?;
        Some(header + 1..self.block_end(header, 0))
    }

    /// Index of the first significant line after `header` indented at or
    /// below `parent_indent`, or the document length.
    pub fn block_end(&self, header: usize, parent_indent: usize) -> usize {
        self.lines
            .iter()
            .enumerate()
            .skip(header + 1)
            .find(|(_, line)| line.is_significant() && line.indent <= parent_indent)
            .map(|(index, _)| index)
            .unwrap_or(self.lines.len())
    }

    /// Apply span replacements. Edits sharing a line are applied from the
    /// rightmost span leftwards so earlier spans stay valid.
    pub fn apply(&mut self, mut edits: Vec<Edit>) {
        edits.sort_by(|a, b| a.line.cmp(&b.line).then(b.span.start.cmp(&a.span.start)));
        for edit in edits {
            if edit.replacement.contains(['\n', '\r']) {
                warn!(line = edit.line + 1, "skipping edit that would break a line");
                continue;
            }
            let Some(line) = self.lines.get_mut(edit.line) else {
                warn!(line = edit.line + 1, "skipping edit past end of document");
                continue;
            };
            if edit.span.end > line.content.len()
                || !line.content.is_char_boundary(edit.span.start)
                || !line.content.is_char_boundary(edit.span.end)
            {
                warn!(line = edit.line + 1, "skipping edit with stale span");
                continue;
            }
            line.splice(edit.span, &edit.replacement);
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

fn classify(content: &str) -> (usize, LineKind) {
    let indent = content.len() - content.trim_start_matches(' ').len();
    let rest = &content[indent..];

    if rest.trim().is_empty() {
        return (indent, LineKind::Blank);
    }
    if rest.starts_with('#') {
        return (indent, LineKind::Comment);
    }
    if rest == "-" || rest.starts_with("- ") {
        let value = scalar_span(content, indent + 1, content.len());
        return (indent, LineKind::Item { value });
    }

    match key_span(content, indent) {
        Some((key, after_colon)) => {
            let value = scalar_span(content, after_colon, content.len());
            (indent, LineKind::Entry { key, value })
        }
        None => (indent, LineKind::Other),
    }
}

/// Locate `key:` starting at `start`; returns the key span (quotes
/// excluded) and the offset just past the colon.
fn key_span(line: &str, start: usize) -> Option<(Span, usize)> {
    let rest = &line[start..];
    let is_separator = |colon: usize| {
        rest[colon + 1..]
            .chars()
            .next()
            .map_or(true, |c| c == ' ' || c == '\t')
    };

    if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close = rest[1..].find(quote)? + 1;
        let colon = close + 1;
        if !rest[colon..].starts_with(':') || !is_separator(colon) {
            return None;
        }
        return Some((Span::new(start + 1, start + close), start + colon + 1));
    }

    for (index, c) in rest.char_indices() {
        if c == '#' && index > 0 && rest[..index].ends_with([' ', '\t']) {
            return None;
        }
        if c == ':' && is_separator(index) {
            let key = rest[..index].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some((Span::new(start, start + key.len()), start + index + 1));
        }
    }
    None
}

/// Span of the scalar between `start` and `end`, without surrounding
/// whitespace, quotes or a trailing comment.
fn scalar_span(line: &str, start: usize, end: usize) -> Option<Span> {
    let raw = &line[start..end];
    let begin = start + (raw.len() - raw.trim_start().len());
    let text = &line[begin..end];

    if text.is_empty() || text.starts_with('#') {
        return None;
    }

    if let Some(quote) = text.chars().next().filter(|c| *c == '"' || *c == '\'') {
        if let Some(close) = text[1..].find(quote) {
            return Some(Span::new(begin + 1, begin + 1 + close));
        }
    }

    let mut stop = end;
    if let Some(comment) = text.find(" #").or_else(|| text.find("\t#")) {
        stop = begin + comment;
    }
    let value = line[begin..stop].trim_end();
    if value.is_empty() {
        None
    } else {
        Some(Span::new(begin, begin + value.len()))
    }
}
