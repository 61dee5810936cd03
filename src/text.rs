//! Citation-addressed source text
//!
//! [`TextSource`] is the seam the corpus builder reads through. [`TeiText`]
//! implements it for EpiDoc-style TEI editions, where each citation level
//! is a nested `div` carrying an `n` attribute:
//!
//! ```xml
//! <div type="edition">
//!   <div type="textpart" subtype="book" n="1">
//!     <div type="textpart" subtype="chapter" n="1">
//!       <div type="textpart" subtype="section" n="1"><p>Θουκυδίδης ...</p></div>
//! ```

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::LocalName;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Elements whose text is left out of passages by default
pub const DEFAULT_EXCLUDED: &[&str] = &["note"];

/// Elements that separate words: their boundaries read as whitespace
const WORD_BREAKS: &[&str] = &["p", "l", "lg", "lb", "ab", "head", "div", "sp", "speaker", "note"];

/// A text whose passages are addressed by hierarchical references
pub trait TextSource {
    /// Number of citation levels (3 for book.chapter.section)
    fn citation_depth(&self) -> usize;

    /// Every reference at `level` (1-based), in document order
    fn references(&self, level: usize) -> Result<Vec<String>>;

    /// Plain text of the passage at `reference`
    fn plain_text(&self, reference: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
struct TextPart {
    n: String,
    text: String,
    children: Vec<usize>,
}

/// What an open element contributes while its content is read
enum Open {
    Part(usize),
    Excluded,
    Body,
    Other,
}

/// A TEI edition held in memory as a tree of citable parts
#[derive(Debug, Clone)]
pub struct TeiText {
    parts: Vec<TextPart>,
    roots: Vec<usize>,
    depth: usize,
}

impl TeiText {
    pub fn from_file(path: impl AsRef<Path>, excluded: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io("opening source text", path, e))?;
        let text = Self::from_reader(BufReader::new(file), excluded)?;
        info!(
            path = %path.display(),
            depth = text.depth,
            parts = text.parts.len(),
            "loaded TEI text"
        );
        Ok(text)
    }

    pub fn from_string(xml: &str, excluded: &[String]) -> Result<Self> {
        Self::from_reader(xml.as_bytes(), excluded)
    }

    pub fn from_reader<R: BufRead>(reader: R, excluded: &[String]) -> Result<Self> {
        let mut reader = Reader::from_reader(reader);
        let mut buf = Vec::new();

        let mut parts: Vec<TextPart> = Vec::new();
        let mut roots = Vec::new();
        let mut open: Vec<Open> = Vec::new();
        // Indices of the parts currently open, outermost first
        let mut part_stack: Vec<usize> = Vec::new();
        let mut body_depth = 0usize;
        let mut excluded_depth = 0usize;
        let mut cref_patterns = 0usize;
        let mut max_depth = 0usize;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let name = local_name(e.local_name());
                    let is_excluded = excluded.iter().any(|x| *x == name);
                    if is_excluded || WORD_BREAKS.contains(&name.as_str()) {
                        push_text(&mut parts, &part_stack, " ");
                    }
                    let entry = if name == "cRefPattern" {
                        cref_patterns += 1;
                        Open::Other
                    } else if is_excluded {
                        excluded_depth += 1;
                        Open::Excluded
                    } else if name == "body" {
                        body_depth += 1;
                        Open::Body
                    } else if body_depth > 0 && excluded_depth == 0 && name == "div" {
                        match citable_n(&e)? {
                            Some(n) => {
                                let idx = parts.len();
                                parts.push(TextPart {
                                    n,
                                    text: String::new(),
                                    children: Vec::new(),
                                });
                                match part_stack.last() {
                                    Some(&parent) => parts[parent].children.push(idx),
                                    None => roots.push(idx),
                                }
                                part_stack.push(idx);
                                max_depth = max_depth.max(part_stack.len());
                                Open::Part(idx)
                            }
                            None => Open::Other,
                        }
                    } else {
                        Open::Other
                    };
                    open.push(entry);
                }
                Event::Empty(e) => {
                    let name = local_name(e.local_name());
                    if name == "cRefPattern" {
                        cref_patterns += 1;
                    } else if WORD_BREAKS.contains(&name.as_str()) {
                        push_text(&mut parts, &part_stack, " ");
                    }
                }
                Event::End(e) => {
                    match open.pop() {
                        Some(Open::Part(idx)) => {
                            part_stack.pop();
                            parts[idx].text = normalize_space(&parts[idx].text);
                        }
                        Some(Open::Excluded) => excluded_depth -= 1,
                        Some(Open::Body) => body_depth -= 1,
                        Some(Open::Other) | None => {}
                    }
                    let name = local_name(e.local_name());
                    if excluded.iter().any(|x| *x == name) || WORD_BREAKS.contains(&name.as_str()) {
                        push_text(&mut parts, &part_stack, " ");
                    }
                }
                Event::Text(e) => {
                    if excluded_depth == 0 {
                        push_text(&mut parts, &part_stack, &e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if excluded_depth == 0 {
                        push_text(&mut parts, &part_stack, &String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let depth = if cref_patterns > 0 { cref_patterns } else { max_depth };
        debug!(cref_patterns, max_depth, "citation depth");

        Ok(Self { parts, roots, depth })
    }

    fn lookup(&self, reference: &str) -> Option<&TextPart> {
        let mut candidates = &self.roots;
        let mut found = None;
        for n in reference.split('.') {
            let idx = *candidates.iter().find(|&&i| self.parts[i].n == n)?;
            found = Some(&self.parts[idx]);
            candidates = &self.parts[idx].children;
        }
        found
    }

    fn collect_references(&self, idx: usize, prefix: &str, remaining: usize, out: &mut Vec<String>) {
        let part = &self.parts[idx];
        let reference = if prefix.is_empty() {
            part.n.clone()
        } else {
            format!("{}.{}", prefix, part.n)
        };
        if remaining == 1 {
            out.push(reference);
            return;
        }
        for &child in &part.children {
            self.collect_references(child, &reference, remaining - 1, out);
        }
    }
}

impl TextSource for TeiText {
    fn citation_depth(&self) -> usize {
        self.depth
    }

    fn references(&self, level: usize) -> Result<Vec<String>> {
        let mut out = Vec::new();
        if level == 0 {
            return Ok(out);
        }
        for &root in &self.roots {
            self.collect_references(root, "", level, &mut out);
        }
        Ok(out)
    }

    fn plain_text(&self, reference: &str) -> Result<String> {
        self.lookup(reference)
            .map(|part| part.text.clone())
            .ok_or_else(|| Error::UnknownReference(reference.to_string()))
    }
}

fn local_name(name: LocalName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

/// Append `text` to every part that is currently open
fn push_text(parts: &mut [TextPart], open_parts: &[usize], text: &str) {
    for &idx in open_parts {
        parts[idx].text.push_str(text);
    }
}

/// The `n` of a citable `div`; edition-level and other wrapper divs are skipped
fn citable_n(e: &BytesStart<'_>) -> Result<Option<String>> {
    if let Some(kind) = attribute(e, "type")? {
        if kind != "textpart" {
            return Ok(None);
        }
    }
    attribute(e, "n")
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match e.try_get_attribute(name).map_err(quick_xml::Error::from)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends
fn normalize_space(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDITION: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <encodingDesc>
      <refsDecl n="CTS">
        <cRefPattern n="section" matchPattern="(\w+).(\w+).(\w+)" replacementPattern="#xpath(...)"/>
        <cRefPattern n="chapter" matchPattern="(\w+).(\w+)" replacementPattern="#xpath(...)"/>
        <cRefPattern n="book" matchPattern="(\w+)" replacementPattern="#xpath(...)"/>
      </refsDecl>
    </encodingDesc>
  </teiHeader>
  <text>
    <body>
      <div type="edition" n="urn:cts:greekLit:tlg0003.tlg001.perseus-grc2">
        <div type="textpart" subtype="book" n="1">
          <head>Α</head>
          <div type="textpart" subtype="chapter" n="1">
            <div type="textpart" subtype="section" n="1">
              <p>Θουκυδίδης Ἀθηναῖος <note>editorial remark</note>ξυνέγραψε
              τὸν πόλεμον &amp; τὰ ἄλλα</p>
            </div>
            <div type="textpart" subtype="section" n="2">
              <p>κίνησις γὰρ αὕτη <note>more <hi>nested</hi> notes</note>μεγίστη</p>
            </div>
          </div>
          <div type="textpart" subtype="chapter" n="2">
            <div type="textpart" subtype="section" n="1"><p>φαίνεται γὰρ</p></div>
          </div>
        </div>
      </div>
    </body>
  </text>
</TEI>"##;

    fn notes() -> Vec<String> {
        DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_declared_depth() {
        let text = TeiText::from_string(EDITION, &notes()).unwrap();
        assert_eq!(text.citation_depth(), 3);
    }

    #[test]
    fn test_references_in_document_order() {
        let text = TeiText::from_string(EDITION, &notes()).unwrap();
        assert_eq!(text.references(3).unwrap(), vec!["1.1.1", "1.1.2", "1.2.1"]);
        assert_eq!(text.references(2).unwrap(), vec!["1.1", "1.2"]);
        assert_eq!(text.references(1).unwrap(), vec!["1"]);
    }

    #[test]
    fn test_plain_text_excludes_notes() {
        let text = TeiText::from_string(EDITION, &notes()).unwrap();
        assert_eq!(
            text.plain_text("1.1.1").unwrap(),
            "Θουκυδίδης Ἀθηναῖος ξυνέγραψε τὸν πόλεμον & τὰ ἄλλα"
        );
        assert_eq!(text.plain_text("1.1.2").unwrap(), "κίνησις γὰρ αὕτη μεγίστη");
    }

    #[test]
    fn test_plain_text_keeps_notes_when_not_excluded() {
        let text = TeiText::from_string(EDITION, &[]).unwrap();
        assert_eq!(
            text.plain_text("1.1.2").unwrap(),
            "κίνησις γὰρ αὕτη more nested notes μεγίστη"
        );
    }

    #[test]
    fn test_element_boundaries_separate_words() {
        let xml = r#"<TEI><text><body><div type="edition">
            <div type="textpart" n="1"><p>λέγοιμι<note>v.l.</note>ἄν</p></div>
            <div type="textpart" n="2"><lg><l>εἴη</l><l>ἄν</l></lg></div>
            <div type="textpart" n="3"><p>ἔχοι<lb/>ἄν</p></div>
            <div type="textpart" n="4"><p>λ<hi>ό</hi>γος</p></div>
        </div></body></text></TEI>"#;
        let text = TeiText::from_string(xml, &notes()).unwrap();
        assert_eq!(text.plain_text("1").unwrap(), "λέγοιμι ἄν");
        assert_eq!(text.plain_text("2").unwrap(), "εἴη ἄν");
        assert_eq!(text.plain_text("3").unwrap(), "ἔχοι ἄν");
        // Inline highlighting does not split a word
        assert_eq!(text.plain_text("4").unwrap(), "λόγος");
    }

    #[test]
    fn test_higher_level_text_spans_children() {
        let text = TeiText::from_string(EDITION, &notes()).unwrap();
        let chapter = text.plain_text("1.1").unwrap();
        assert!(chapter.starts_with("Θουκυδίδης"));
        assert!(chapter.ends_with("μεγίστη"));
        // Heading sits in the book but outside any chapter
        assert!(text.plain_text("1").unwrap().starts_with("Α "));
    }

    #[test]
    fn test_unknown_reference() {
        let text = TeiText::from_string(EDITION, &notes()).unwrap();
        let err = text.plain_text("9.9.9").unwrap_err();
        assert!(err.is_collaborator_error());
    }

    #[test]
    fn test_depth_without_refs_decl() {
        let xml = r#"<TEI><text><body><div type="edition">
            <div n="1"><div n="1"><p>a</p></div><div n="2"><p>b</p></div></div>
        </div></body></text></TEI>"#;
        let text = TeiText::from_string(xml, &notes()).unwrap();
        assert_eq!(text.citation_depth(), 2);
        assert_eq!(text.references(2).unwrap(), vec!["1.1", "1.2"]);
        assert_eq!(text.plain_text("1.2").unwrap(), "b");
    }

    #[test]
    fn test_malformed_xml() {
        let xml = "<TEI><text><body><div n=\"1\"><p>a</div></body></text></TEI>";
        let err = TeiText::from_string(xml, &notes()).unwrap_err();
        assert!(err.is_collaborator_error());
    }

    #[test]
    fn test_missing_file() {
        let err = TeiText::from_file("/nonexistent/edition.xml", &notes()).unwrap_err();
        assert!(err.is_not_found());
    }
}
