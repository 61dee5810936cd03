//! CoNLL-U reading and writing
//!
//! Parser output arrives as CoNLL-U; this module turns it into [`Tree`]s
//! and writes trees back out for inspection. Multiword tokens and empty
//! nodes are skipped: the counters only look at syntactic words.
//!
//! CoNLL-U format: https://universaldependencies.org/format.html

use crate::tree::{Features, Node, NodeId, Tree};
use flate2::read::MultiGzDecoder;
use memchr::memchr_iter;
use rustc_hash::FxHashMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::Path;

/// Error during CoNLL-U parsing
#[derive(Debug)]
pub struct ParseError {
    pub line_num: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at line {}: {}", self.line_num, self.message)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn new(line_num: usize, message: impl Into<String>) -> Self {
        Self {
            line_num,
            message: message.into(),
        }
    }
}

/// CoNLL-U reader that iterates over sentences
pub struct CoNLLUReader<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
}

impl CoNLLUReader<BufReader<Box<dyn Read>>> {
    /// Create a reader from a file path; `.gz` files are decompressed
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let inner: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self::new(BufReader::new(inner)))
    }
}

impl<'a> CoNLLUReader<&'a [u8]> {
    /// Create a reader over in-memory text
    pub fn from_string(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> CoNLLUReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for CoNLLUReader<R> {
    type Item = Result<Tree, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut tree_lines = Vec::new();
        let mut metadata = FxHashMap::default();
        let mut sentence_text = None;

        // Read lines until we hit a blank line (sentence boundary) or EOF
        loop {
            match self.lines.next() {
                None => {
                    if tree_lines.is_empty() {
                        return None;
                    }
                    // Last sentence without trailing blank line
                    break;
                }
                Some(Err(e)) => {
                    self.line_num += 1;
                    return Some(Err(ParseError::new(self.line_num, format!("IO error: {}", e))));
                }
                Some(Ok(line)) => {
                    self.line_num += 1;
                    let line = line.trim_end_matches(['\r', '\n']);

                    if line.trim().is_empty() {
                        if !tree_lines.is_empty() {
                            break;
                        }
                        continue;
                    }

                    if let Some(comment) = line.strip_prefix('#') {
                        parse_comment(comment, &mut metadata, &mut sentence_text);
                        continue;
                    }

                    tree_lines.push((self.line_num, line.to_string()));
                }
            }
        }

        Some(parse_tree(tree_lines, sentence_text, metadata))
    }
}

/// Parse a whole CoNLL-U document into trees
pub fn parse_document(text: &str) -> Result<Vec<Tree>, ParseError> {
    CoNLLUReader::from_string(text).collect()
}

/// Parse a comment line (starts with #)
fn parse_comment(
    comment: &str,
    metadata: &mut FxHashMap<String, String>,
    sentence_text: &mut Option<String>,
) {
    if let Some((key, value)) = comment.split_once('=') {
        let key = key.trim();
        let value = value.trim();

        if key == "text" {
            *sentence_text = Some(value.to_string());
        } else {
            metadata.insert(key.to_string(), value.to_string());
        }
    }
}

/// Parse accumulated lines into a Tree
fn parse_tree(
    lines: Vec<(usize, String)>,
    sentence_text: Option<String>,
    metadata: FxHashMap<String, String>,
) -> Result<Tree, ParseError> {
    let mut tree = Tree::with_metadata(sentence_text, metadata);
    // CoNLL-U word ID -> node position, since skipped lines shift positions
    let mut positions: FxHashMap<usize, NodeId> = FxHashMap::default();
    let mut heads = Vec::new();

    for (line_num, line) in lines {
        if let Some((word_id, node, head)) = parse_line(&line, line_num, tree.nodes.len())? {
            positions.insert(word_id, node.id);
            heads.push((node.id, head, line_num));
            tree.add_node(node);
        }
    }

    for (node_id, head, line_num) in heads {
        match head {
            Some(0) | None => {
                if tree.root_id.is_none() {
                    tree.root_id = Some(node_id);
                }
            }
            Some(word_id) => {
                let parent_id = *positions
                    .get(&word_id)
                    .ok_or_else(|| ParseError::new(line_num, format!("HEAD {} does not exist", word_id)))?;
                tree.set_parent(node_id, parent_id);
            }
        }
    }

    Ok(tree)
}

/// Split a line on tabs
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(10);
    let mut start = 0;
    for tab in memchr_iter(b'\t', line.as_bytes()) {
        fields.push(&line[start..tab]);
        start = tab + 1;
    }
    fields.push(&line[start..]);
    fields
}

/// Parse a single CoNLL-U line into its word ID, node and raw HEAD.
/// Returns None for multiword tokens and empty nodes.
fn parse_line(
    line: &str,
    line_num: usize,
    node_id: NodeId,
) -> Result<Option<(usize, Node, Option<usize>)>, ParseError> {
    let fields = split_fields(line);

    if fields.len() != 10 {
        return Err(ParseError::new(
            line_num,
            format!("Expected 10 fields, found {}", fields.len()),
        ));
    }

    // Multiword token (1-2) or empty node (2.1)
    if fields[0].contains(['-', '.']) {
        return Ok(None);
    }
    let word_id: usize = fields[0]
        .parse()
        .map_err(|_| ParseError::new(line_num, format!("Invalid ID: {}", fields[0])))?;

    let form = fields[1];
    let lemma = if fields[2] == "_" { form } else { fields[2] };

    let mut node = Node::new(node_id, form, lemma, fields[3], fields[7]);
    node.xpos = (fields[4] != "_").then(|| fields[4].to_string());
    node.feats = parse_pairs(fields[5]);
    node.misc = parse_pairs(fields[9]);

    let head = if fields[6] == "_" {
        None
    } else {
        Some(
            fields[6]
                .parse()
                .map_err(|_| ParseError::new(line_num, format!("Invalid HEAD: {}", fields[6])))?,
        )
    };

    Ok(Some((word_id, node, head)))
}

/// Parse FEATS or MISC (key=value|key=value)
fn parse_pairs(s: &str) -> Features {
    let mut feats = Features::new();

    if s == "_" {
        return feats;
    }

    for pair in s.split('|') {
        if let Some((key, value)) = pair.split_once('=') {
            feats.insert(key, value);
        }
    }

    feats
}

fn format_pairs(feats: &Features) -> String {
    if feats.is_empty() {
        return "_".to_string();
    }
    feats
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("|")
}

/// Write a tree as a CoNLL-U sentence block (terminated by a blank line)
pub fn write_tree(tree: &Tree) -> String {
    let mut out = String::new();

    let mut keys: Vec<_> = tree.metadata.keys().collect();
    keys.sort();
    for key in keys {
        let _ = writeln!(out, "# {} = {}", key, tree.metadata[key]);
    }
    if let Some(text) = &tree.sentence_text {
        let _ = writeln!(out, "# text = {}", text);
    }

    for node in &tree.nodes {
        let head = node.parent.map_or(0, |p| p + 1);
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t_\t{}",
            node.id + 1,
            node.form,
            node.lemma,
            node.upos,
            node.xpos.as_deref().unwrap_or("_"),
            format_pairs(&node.feats),
            head,
            node.deprel,
            format_pairs(&node.misc),
        );
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "# sent_id = thuc-1.22.1-1\n\
# text = οὐκ ἂν λέγοιμι.\n\
1\tοὐκ\tοὐ\tADV\tDf\tPolarity=Neg\t3\tadvmod\t_\t_\n\
2\tἂν\tἄν\tADV\tDf\t_\t3\tadvmod\t_\t_\n\
3\tλέγοιμι\tλέγω\tVERB\tV-\tMood=Opt|Number=Sing|Person=1|Tense=Pres|VerbForm=Fin|Voice=Act\t0\troot\t_\tSpaceAfter=No\n\
4\t.\t.\tPUNCT\tu-\t_\t3\tpunct\t_\t_\n\
\n";

    #[test]
    fn test_parse_simple_sentence() {
        let mut reader = CoNLLUReader::from_string(SENTENCE);
        let tree = reader.next().unwrap().unwrap();
        assert!(reader.next().is_none());

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.sentence_text.as_deref(), Some("οὐκ ἂν λέγοιμι."));
        assert_eq!(tree.metadata.get("sent_id").map(String::as_str), Some("thuc-1.22.1-1"));
        assert_eq!(tree.root_id, Some(2));

        let verb = &tree.nodes[2];
        assert_eq!(verb.lemma, "λέγω");
        assert_eq!(verb.upos, "VERB");
        assert_eq!(verb.feats.get("Mood"), Some("Opt"));
        assert_eq!(verb.children, vec![0, 1, 3]);
        assert!(!verb.space_after());
        assert_eq!(tree.nodes[1].parent, Some(2));
        assert_eq!(tree.nodes[0].xpos.as_deref(), Some("Df"));
    }

    #[test]
    fn test_lemma_defaults_to_form() {
        let text = "1\tκαί\t_\tCCONJ\t_\t_\t0\troot\t_\t_\n";
        let tree = parse_document(text).unwrap().remove(0);
        assert_eq!(tree.nodes[0].lemma, "καί");
        assert_eq!(tree.nodes[0].xpos, None);
    }

    #[test]
    fn test_skips_multiword_and_empty_nodes() {
        let text = "1-2\tκἄν\t_\t_\t_\t_\t_\t_\t_\t_\n\
1\tκαί\tκαί\tCCONJ\t_\t_\t3\tcc\t_\t_\n\
2\tἄν\tἄν\tADV\t_\t_\t3\tadvmod\t_\t_\n\
3\tεἴη\tεἰμί\tVERB\t_\tMood=Opt\t0\troot\t_\t_\n\
3.1\tἐστί\tεἰμί\tAUX\t_\t_\t_\t_\t3:cop\t_\n";
        let tree = parse_document(text).unwrap().remove(0);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.nodes[2].children, vec![0, 1]);
    }

    #[test]
    fn test_multiple_sentences() {
        let text = format!("{}{}", SENTENCE, SENTENCE);
        let trees = parse_document(&text).unwrap();
        assert_eq!(trees.len(), 2);
    }

    #[test]
    fn test_wrong_field_count() {
        let err = parse_document("# text = x\n1\tx\tx\n").unwrap_err();
        assert_eq!(err.line_num, 2);
        assert!(err.message.contains("Expected 10 fields"));
    }

    #[test]
    fn test_dangling_head() {
        let err = parse_document("1\tx\tx\tX\t_\t_\t5\tdep\t_\t_\n").unwrap_err();
        assert!(err.message.contains("HEAD 5"));
    }

    #[test]
    fn test_write_then_read() {
        let tree = parse_document(SENTENCE).unwrap().remove(0);
        let written = write_tree(&tree);
        assert!(written.contains("3\tλέγοιμι\tλέγω\tVERB\tV-\tMood=Opt|Number=Sing"));
        assert!(written.ends_with("\n\n"));
        let reread = parse_document(&written).unwrap().remove(0);
        assert_eq!(reread, tree);
    }

    #[test]
    fn test_read_gzip_file() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed.conllu.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(SENTENCE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let trees: Vec<_> = CoNLLUReader::from_file(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].len(), 4);
    }
}
