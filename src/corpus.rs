//! Corpus building: one row per leaf passage, aligned to speeches

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::citation::Citation;
use crate::error::Result;
use crate::speeches::SpeechTable;
use crate::text::TextSource;

/// One citable passage with the speech (if any) it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageRow {
    pub reference: Citation,
    pub passage: String,
    pub speaker: Option<String>,
    pub speech_id: Option<u32>,
    pub location: Option<String>,
}

impl PassageRow {
    pub fn is_speech(&self) -> bool {
        self.speech_id.is_some()
    }
}

/// Enumerate every leaf passage of `text` in document order and attach
/// speech metadata from `speeches`.
pub fn build_corpus(text: &impl TextSource, speeches: &SpeechTable) -> Result<Vec<PassageRow>> {
    let depth = text.citation_depth();
    let references = text.references(depth)?;
    let mut rows = Vec::with_capacity(references.len());

    for reference in references {
        let passage = text.plain_text(&reference)?;
        let reference: Citation = reference.parse()?;
        if passage.is_empty() {
            warn!(%reference, "empty passage");
        }

        let mut row = PassageRow {
            reference,
            passage,
            speaker: None,
            speech_id: None,
            location: None,
        };
        assign_speech(&mut row, speeches);
        debug!(reference = %row.reference, speech = row.speech_id, "passage");
        rows.push(row);
    }

    info!(
        passages = rows.len(),
        in_speeches = rows.iter().filter(|r| r.is_speech()).count(),
        depth,
        "built corpus"
    );
    Ok(rows)
}

/// Set the speech columns of `row` from `speeches`; returns whether they changed
pub fn assign_speech(row: &mut PassageRow, speeches: &SpeechTable) -> bool {
    let speech = speeches.find(&row.reference);
    let speech_id = speech.map(|s| s.index);
    let speaker = speech.map(|s| s.speaker.clone());
    let location = speech.map(|s| s.location.clone());

    let changed = row.speech_id != speech_id || row.speaker != speaker || row.location != location;
    row.speech_id = speech_id;
    row.speaker = speaker;
    row.location = location;
    changed
}

/// Re-run speech lookup over existing rows, e.g. rows restored from a cache
/// written with another speech table or range mode. Returns how many rows
/// changed.
pub fn align_speeches<'a>(rows: impl IntoIterator<Item = &'a mut PassageRow>, speeches: &SpeechTable) -> usize {
    let changed = rows
        .into_iter()
        .map(|row| assign_speech(row, speeches))
        .filter(|&changed| changed)
        .count();
    if changed > 0 {
        info!(changed, "speech assignments updated from the current speech table");
    }
    changed
}
