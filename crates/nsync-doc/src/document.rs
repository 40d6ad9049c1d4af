//! In-memory document model: an ordered header block plus a body.

use nsync_types::PageId;

use crate::error::DocResult;

/// Header key holding the remote page id.
pub const PAGE_ID_KEY: &str = "notion_id";
/// Older documents used this key for the same value.
pub const LEGACY_PAGE_ID_KEY: &str = "notion_page_id";

/// One line of the header block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderLine {
    /// A `key: value` line. `value` is kept exactly as written (quotes
    /// included) so re-serialization is lossless.
    Field { key: String, value: String },
    /// Anything else inside the block (comments, list items, blank lines).
    Raw(String),
}

/// The ordered metadata block at the top of a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    lines: Vec<HeaderLine>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_lines(lines: Vec<HeaderLine>) -> Self {
        Self { lines }
    }

    /// All lines in original order.
    pub fn lines(&self) -> &[HeaderLine] {
        &self.lines
    }

    /// Returns `true` if the block has no lines at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Value of the first field named `key`, with surrounding quotes removed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            HeaderLine::Field { key: k, value } if k == key => Some(unquote(value)),
            _ => None,
        })
    }

    /// Set `key` to `value`, replacing the first existing field in place or
    /// appending a new one.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        for line in &mut self.lines {
            if let HeaderLine::Field { key: k, value: v } = line {
                if k == key {
                    *v = value;
                    return;
                }
            }
        }
        self.lines.push(HeaderLine::Field {
            key: key.to_string(),
            value,
        });
    }

    /// Remove every field named `key`. Returns `true` if any was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, HeaderLine::Field { key: k, .. } if k == key));
        before != self.lines.len()
    }

    /// The raw remote page id, preferring `notion_id` over the legacy key.
    /// Empty values count as absent.
    pub fn notion_id(&self) -> Option<&str> {
        [PAGE_ID_KEY, LEGACY_PAGE_ID_KEY]
            .into_iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.trim().is_empty())
    }

    /// The remote page id, parsed.
    pub fn page_id(&self) -> DocResult<Option<PageId>> {
        match self.notion_id() {
            Some(raw) => Ok(Some(PageId::parse(raw)?)),
            None => Ok(None),
        }
    }
}

/// A parsed document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Metadata block; empty when the file has none.
    pub header: Header,
    /// Everything after the closing delimiter.
    pub body: String,
    /// Whether the source text had a header block at all.
    pub(crate) had_header: bool,
}

impl Document {
    /// A document with no header block.
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            header: Header::new(),
            body: body.into(),
            had_header: false,
        }
    }

    /// A document with the given header and body.
    pub fn new(header: Header, body: impl Into<String>) -> Self {
        Self {
            header,
            body: body.into(),
            had_header: true,
        }
    }

    /// Returns `true` if a header block will be written on serialization.
    pub fn has_header(&self) -> bool {
        self.had_header || !self.header.is_empty()
    }

    /// Shortcut for [`Header::notion_id`].
    pub fn notion_id(&self) -> Option<&str> {
        self.header.notion_id()
    }

    /// Record the remote page id under the current key.
    pub fn set_page_id(&mut self, id: &PageId) {
        self.header.set(PAGE_ID_KEY, id.simple());
    }

    /// Title from the `title` field, else the first `# ` heading.
    pub fn title(&self) -> Option<String> {
        if let Some(title) = self.header.get("title") {
            if !title.trim().is_empty() {
                return Some(title.trim().to_string());
            }
        }
        self.body
            .lines()
            .find_map(|line| line.strip_prefix("# "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(fields: &[(&str, &str)]) -> Header {
        Header::from_lines(
            fields
                .iter()
                .map(|(k, v)| HeaderLine::Field {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn get_strips_quotes() {
        let h = header(&[("title", "\"Quoted\""), ("tag", "'single'")]);
        assert_eq!(h.get("title"), Some("Quoted"));
        assert_eq!(h.get("tag"), Some("single"));
        assert_eq!(h.get("missing"), None);
    }

    #[test]
    fn notion_id_prefers_current_key() {
        let h = header(&[("notion_page_id", "legacy"), ("notion_id", "current")]);
        assert_eq!(h.notion_id(), Some("current"));
    }

    #[test]
    fn notion_id_falls_back_to_legacy_key() {
        let h = header(&[("notion_page_id", "legacy")]);
        assert_eq!(h.notion_id(), Some("legacy"));
    }

    #[test]
    fn empty_notion_id_counts_as_absent() {
        let h = header(&[("notion_id", "\"\"")]);
        assert_eq!(h.notion_id(), None);
    }

    #[test]
    fn set_replaces_in_place() {
        let mut h = header(&[("a", "1"), ("notion_id", "old"), ("b", "2")]);
        h.set("notion_id", "new");
        assert_eq!(h.lines()[1], HeaderLine::Field { key: "notion_id".into(), value: "new".into() });
        h.set("c", "3");
        assert_eq!(h.lines().len(), 4);
    }

    #[test]
    fn remove_drops_all_matches() {
        let mut h = header(&[("a", "1"), ("a", "2"), ("b", "3")]);
        assert!(h.remove("a"));
        assert!(!h.remove("a"));
        assert_eq!(h.lines().len(), 1);
    }

    #[test]
    fn title_from_header_or_heading() {
        let doc = Document::new(header(&[("title", "From header")]), "# From body\n");
        assert_eq!(doc.title().as_deref(), Some("From header"));

        let doc = Document::from_body("intro\n# From body\ntext\n");
        assert_eq!(doc.title().as_deref(), Some("From body"));

        assert_eq!(Document::from_body("no heading").title(), None);
    }

    #[test]
    fn page_id_parses_header_value() {
        let doc = Document::new(
            header(&[("notion_id", "0123456789abcdef0123456789abcdef")]),
            "",
        );
        let id = doc.header.page_id().unwrap().unwrap();
        assert_eq!(id.simple(), "0123456789abcdef0123456789abcdef");

        let bad = header(&[("notion_id", "nope")]);
        assert!(bad.page_id().is_err());
    }
}
