//! Parsing and serialization of the `---` delimited header block.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::document::{Document, Header, HeaderLine};
use crate::error::{DocError, DocResult};

/// Header block delimiter line.
const DELIMITER: &str = "---";

/// Parse/serialize contract for document header blocks.
pub trait HeaderCodec: Send + Sync {
    /// Split `text` into header and body. Text without a well-formed block
    /// yields an empty header and the whole text as body.
    fn parse(&self, text: &str) -> Document;

    /// Render a document back to text.
    fn serialize(&self, doc: &Document) -> String;

    /// Read and parse the document at `path`.
    fn read_file(&self, path: &Path) -> DocResult<Document> {
        let bytes = fs::read(path).map_err(|source| DocError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|_| DocError::NotUtf8(path.to_path_buf()))?;
        Ok(self.parse(&text))
    }

    /// Serialize and atomically replace the document at `path`.
    fn write_file(&self, path: &Path, doc: &Document) -> DocResult<()> {
        let io_err = |source| DocError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(self.serialize(doc).as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        debug!(path = %path.display(), "document written");
        Ok(())
    }
}

/// The `---` / `key: value` / `---` header format.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrontMatterCodec;

impl HeaderCodec for FrontMatterCodec {
    fn parse(&self, text: &str) -> Document {
        let source = text.strip_prefix('\u{feff}').unwrap_or(text);

        let Some(after_open) = strip_delimiter_line(source) else {
            return Document::from_body(text);
        };

        let mut lines = Vec::new();
        let mut rest = after_open;
        loop {
            if rest.is_empty() {
                // No closing delimiter: not a header block.
                return Document::from_body(text);
            }
            let (line, next) = split_line(rest);
            if line.trim_end() == DELIMITER {
                return Document::new(Header::from_lines(lines), next);
            }
            lines.push(parse_line(line.trim_end_matches('\r')));
            rest = next;
        }
    }

    fn serialize(&self, doc: &Document) -> String {
        if !doc.has_header() {
            return doc.body.clone();
        }

        let mut out = String::with_capacity(doc.body.len() + 64);
        out.push_str(DELIMITER);
        out.push('\n');
        for line in doc.header.lines() {
            match line {
                HeaderLine::Field { key, value } => {
                    out.push_str(key);
                    out.push(':');
                    if !value.is_empty() {
                        out.push(' ');
                        out.push_str(value);
                    }
                }
                HeaderLine::Raw(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out.push('\n');
        out.push_str(&doc.body);
        out
    }
}

/// If `text` opens with a delimiter line, return what follows it.
fn strip_delimiter_line(text: &str) -> Option<&str> {
    let (first, rest) = split_line(text);
    (first.trim_end() == DELIMITER).then_some(rest)
}

/// Split off the first line (without its `\n`).
fn split_line(text: &str) -> (&str, &str) {
    match text.find('\n') {
        Some(idx) => (&text[..idx], &text[idx + 1..]),
        None => (text, ""),
    }
}

fn parse_line(line: &str) -> HeaderLine {
    if line.starts_with(char::is_whitespace) || line.starts_with('#') {
        return HeaderLine::Raw(line.to_string());
    }
    match line.split_once(':') {
        Some((key, value)) if is_key(key) => HeaderLine::Field {
            key: key.to_string(),
            value: value.trim().to_string(),
        },
        _ => HeaderLine::Raw(line.to_string()),
    }
}

fn is_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\ntitle: Notes\nnotion_id: abc\ntags:\n  - one\n# comment\n---\n# Heading\n\nBody text.\n";

    #[test]
    fn parses_fields_and_body() {
        let doc = FrontMatterCodec.parse(DOC);
        assert_eq!(doc.header.get("title"), Some("Notes"));
        assert_eq!(doc.notion_id(), Some("abc"));
        assert_eq!(doc.body, "# Heading\n\nBody text.\n");
    }

    #[test]
    fn unknown_lines_pass_through_untouched() {
        let codec = FrontMatterCodec;
        let doc = codec.parse(DOC);
        assert!(doc
            .header
            .lines()
            .contains(&HeaderLine::Raw("  - one".into())));
        assert_eq!(codec.serialize(&doc), DOC);
    }

    #[test]
    fn text_without_header_is_all_body() {
        let text = "# Just markdown\n";
        let doc = FrontMatterCodec.parse(text);
        assert!(doc.header.is_empty());
        assert!(!doc.has_header());
        assert_eq!(doc.body, text);
        assert_eq!(FrontMatterCodec.serialize(&doc), text);
    }

    #[test]
    fn unterminated_header_is_all_body() {
        let text = "---\ntitle: open\nno closing line\n";
        let doc = FrontMatterCodec.parse(text);
        assert!(doc.header.is_empty());
        assert_eq!(doc.body, text);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let doc = FrontMatterCodec.parse("---\r\nnotion_id: xyz\r\n---\r\nbody\r\n");
        assert_eq!(doc.notion_id(), Some("xyz"));
        assert_eq!(doc.body, "body\r\n");
    }

    #[test]
    fn setting_page_id_on_headerless_document_adds_block() {
        let codec = FrontMatterCodec;
        let mut doc = codec.parse("# Title\n");
        doc.header.set("notion_id", "0123");
        assert_eq!(codec.serialize(&doc), "---\nnotion_id: 0123\n---\n# Title\n");
    }

    #[test]
    fn empty_header_block_is_preserved() {
        let text = "---\n---\nbody\n";
        let doc = FrontMatterCodec.parse(text);
        assert!(doc.has_header());
        assert_eq!(FrontMatterCodec.serialize(&doc), text);
    }

    #[test]
    fn write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("doc.md");
        let codec = FrontMatterCodec;
        let doc = codec.parse(DOC);

        codec.write_file(&path, &doc).unwrap();
        let back = codec.read_file(&path).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FrontMatterCodec
            .read_file(&dir.path().join("missing.md"))
            .unwrap_err();
        assert!(matches!(err, DocError::Io { .. }));
    }
}
