//! End-to-end run: speech table → corpus → parse cache → counts
//!
//! 1. Load the speech table
//! 2. Read the TEI edition and build one row per leaf passage
//! 3. Parse every passage (or restore the parses from the cache)
//! 4. Count potential optatives per passage
//!
//! Parses can also be exported as CoNLL-U for inspection in other tools.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::annotate::{Annotator, CommandAnnotator};
use crate::cache::{ParsedPassageRow, load_or_populate, populate};
use crate::config::PipelineConfig;
use crate::conllu::{CoNLLUReader, write_tree};
use crate::corpus::{PassageRow, align_speeches, build_corpus};
use crate::counters::{Counts, count_potential_optatives};
use crate::error::{Error, Result};
use crate::speeches::SpeechTable;
use crate::table::{AnalysisTable, analyze};
use crate::text::TeiText;
use crate::tree::ParsedPassage;

/// Load the speech table named by `config`
pub fn load_speeches(config: &PipelineConfig) -> Result<SpeechTable> {
    Ok(SpeechTable::from_file(&config.speeches_path)?.with_range_mode(config.range_mode))
}

/// Build passage rows from the files named by `config`
pub fn corpus_from_config(config: &PipelineConfig) -> Result<Vec<PassageRow>> {
    let speeches = load_speeches(config)?;
    corpus_with_speeches(config, &speeches)
}

fn corpus_with_speeches(config: &PipelineConfig, speeches: &SpeechTable) -> Result<Vec<PassageRow>> {
    let text = TeiText::from_file(&config.text_path, &config.excluded_elements)?;
    build_corpus(&text, speeches)
}

pub fn annotator_from_config(config: &PipelineConfig) -> CommandAnnotator {
    CommandAnnotator::from_command(&config.parser_command, config.model.clone())
}

/// Parse the corpus and overwrite the cache
pub fn repopulate(config: &PipelineConfig, annotator: &mut impl Annotator) -> Result<Vec<ParsedPassageRow>> {
    let rows = corpus_from_config(config)?;
    populate(rows, annotator, &config.cache_path)
}

/// Restore parses from the cache, parsing first if there is none.
///
/// Speech columns always come from the current speech table and range
/// mode, whatever the cache recorded.
pub fn parsed_rows(config: &PipelineConfig, annotator: &mut impl Annotator) -> Result<Vec<ParsedPassageRow>> {
    let speeches = load_speeches(config)?;
    let mut parsed = load_or_populate(&config.cache_path, annotator, || corpus_with_speeches(config, &speeches))?;
    align_speeches(parsed.iter_mut().map(|r| &mut r.row), &speeches);
    Ok(parsed)
}

/// Restore or parse the corpus and count every passage
pub fn run(config: &PipelineConfig, annotator: &mut impl Annotator) -> Result<AnalysisTable> {
    info!(cache = %config.cache_path.display(), model = annotator.model(), "starting run");
    Ok(analyze(parsed_rows(config, annotator)?))
}

/// Write parsed rows as CoNLL-U, one `sent_id` per sentence
/// (`<reference>-<n>`); `.gz` paths are gzip-compressed. Returns the number
/// of sentences written.
pub fn export_conllu(rows: &[ParsedPassageRow], path: &Path) -> Result<usize> {
    let file = File::create(path).map_err(|e| Error::io("creating CoNLL-U export", path, e))?;
    let written = if path.extension().is_some_and(|ext| ext == "gz") {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_sentences(rows, &mut encoder).and_then(|n| encoder.finish()?.flush().map(|_| n))
    } else {
        let mut writer = BufWriter::new(file);
        write_sentences(rows, &mut writer).and_then(|n| writer.flush().map(|_| n))
    }
    .map_err(|e| Error::io("writing CoNLL-U export", path, e))?;

    info!(path = %path.display(), sentences = written, "exported CoNLL-U");
    Ok(written)
}

fn write_sentences(rows: &[ParsedPassageRow], out: &mut impl Write) -> io::Result<usize> {
    let mut written = 0;
    for row in rows {
        for (i, sentence) in row.parsed_passage.sentences.iter().enumerate() {
            let mut sentence = sentence.clone();
            sentence
                .metadata
                .insert("sent_id".to_string(), format!("{}-{}", row.row.reference, i + 1));
            if let Some(id) = row.row.speech_id {
                sentence.metadata.insert("speech_id".to_string(), id.to_string());
            }
            out.write_all(write_tree(&sentence).as_bytes())?;
            written += 1;
        }
    }
    Ok(written)
}

/// Count potential optatives over every sentence of a CoNLL-U file
pub fn count_conllu_file(path: &Path) -> Result<Counts> {
    let reader = CoNLLUReader::from_file(path).map_err(|e| Error::io("opening CoNLL-U file", path, e))?;
    let sentences = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), sentences = sentences.len(), "read CoNLL-U");
    Ok(count_potential_optatives(&ParsedPassage::new(sentences)))
}
