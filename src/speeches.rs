//! Speech table loading and citation-range lookup
//!
//! The speech table is a tab-separated file with (at least) the columns
//! `start`, `end`, `speaker` and `location`. Each data row becomes a
//! [`SpeechRecord`] whose index is its zero-based row position.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::citation::{Citation, RangeMode};
use crate::error::{Error, Result};

const REQUIRED_COLUMNS: [&str; 4] = ["start", "end", "speaker", "location"];

/// One speech: who spoke, where, and which passages it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRecord {
    pub index: u32,
    pub speaker: String,
    pub location: String,
    pub start: Citation,
    pub end: Citation,
}

impl SpeechRecord {
    pub fn contains(&self, reference: &Citation, mode: RangeMode) -> bool {
        reference.within(&self.start, &self.end, mode)
    }
}

/// Speech records in load order
#[derive(Debug, Clone, Default)]
pub struct SpeechTable {
    records: Vec<SpeechRecord>,
    mode: RangeMode,
}

impl SpeechTable {
    pub fn new(records: Vec<SpeechRecord>) -> Self {
        Self {
            records,
            mode: RangeMode::default(),
        }
    }

    pub fn with_range_mode(mut self, mode: RangeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Load a speech table from a TSV file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io("opening speech table", path, e))?;
        let table = Self::from_reader(BufReader::new(file))?;
        info!(path = %path.display(), speeches = table.len(), "loaded speech table");
        Ok(table)
    }

    /// Load a speech table from in-memory TSV text
    pub fn from_string(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut columns: Option<[usize; 4]> = None;
        let mut records = Vec::new();

        for (line_idx, line) in reader.lines().enumerate() {
            let line_num = line_idx + 1;
            let line = line.map_err(|e| Error::Io {
                context: format!("reading speech table line {}", line_num),
                source: e,
            })?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            let Some(columns) = columns else {
                columns = Some(parse_header(&fields, line_num)?);
                continue;
            };

            let field = |col: usize| {
                fields.get(columns[col]).copied().ok_or_else(|| Error::Parse {
                    line: line_num,
                    message: format!(
                        "missing {} column (expected at least {} fields, found {})",
                        REQUIRED_COLUMNS[col],
                        columns[col] + 1,
                        fields.len()
                    ),
                })
            };

            let citation = |col: usize| -> Result<Citation> {
                field(col)?.parse::<Citation>().map_err(|e| Error::Parse {
                    line: line_num,
                    message: format!("{} column: {}", REQUIRED_COLUMNS[col], e),
                })
            };

            let record = SpeechRecord {
                index: records.len() as u32,
                start: citation(0)?,
                end: citation(1)?,
                speaker: field(2)?.trim().to_string(),
                location: field(3)?.trim().to_string(),
            };
            debug!(index = record.index, start = %record.start, end = %record.end, "speech");
            records.push(record);
        }

        if columns.is_none() {
            return Err(Error::Parse {
                line: 0,
                message: "speech table has no header row".to_string(),
            });
        }

        Ok(Self::new(records))
    }

    /// Find the first speech containing `reference`
    pub fn find(&self, reference: &Citation) -> Option<&SpeechRecord> {
        self.records.iter().find(|r| r.contains(reference, self.mode))
    }

    pub fn get(&self, index: u32) -> Option<&SpeechRecord> {
        self.records.get(index as usize)
    }

    pub fn records(&self) -> &[SpeechRecord] {
        &self.records
    }

    pub fn range_mode(&self) -> RangeMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Locate the required columns in the header row
fn parse_header(fields: &[&str], line_num: usize) -> Result<[usize; 4]> {
    let mut positions = [0usize; 4];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = fields
            .iter()
            .position(|f| f.trim() == name)
            .ok_or_else(|| Error::Parse {
                line: line_num,
                message: format!("speech table header lacks a {} column", name),
            })?;
    }
    Ok(positions)
}
