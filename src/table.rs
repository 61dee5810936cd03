//! Counted rows and filter-then-sum queries over them

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::ops::Add;
use tracing::info;

use crate::cache::ParsedPassageRow;
use crate::counters::{Counts, count_potential_optatives};

/// A parsed passage with its counts
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedRow {
    pub parsed: ParsedPassageRow,
    pub counts: Counts,
}

/// Totals over a set of rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub passages: usize,
    pub tokens: usize,
    pub counts: Counts,
}

impl Add for Summary {
    type Output = Summary;

    fn add(self, other: Summary) -> Summary {
        Summary {
            passages: self.passages + other.passages,
            tokens: self.tokens + other.tokens,
            counts: self.counts + other.counts,
        }
    }
}

impl Summary {
    fn of(row: &AnalyzedRow) -> Self {
        Summary {
            passages: 1,
            tokens: row.parsed.parsed_passage.len(),
            counts: row.counts,
        }
    }
}

/// Every passage of the corpus with its counts, in document order
#[derive(Debug, Clone, Default)]
pub struct AnalysisTable {
    rows: Vec<AnalyzedRow>,
}

/// Count potential optatives in every row
pub fn analyze(rows: Vec<ParsedPassageRow>) -> AnalysisTable {
    let rows: Vec<AnalyzedRow> = rows
        .into_iter()
        .map(|parsed| {
            let counts = count_potential_optatives(&parsed.parsed_passage);
            AnalyzedRow { parsed, counts }
        })
        .collect();

    let total: Counts = rows.iter().map(|r| r.counts).sum();
    info!(
        passages = rows.len(),
        n_pot_opt = total.n_pot_opt,
        n_part_opt_candidate = total.n_part_opt_candidate,
        n_inf_opt_candidate = total.n_inf_opt_candidate,
        "counted potential optatives"
    );
    AnalysisTable { rows }
}

impl AnalysisTable {
    pub fn new(rows: Vec<AnalyzedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[AnalyzedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filter<'a, P>(&'a self, mut pred: P) -> impl Iterator<Item = &'a AnalyzedRow>
    where
        P: FnMut(&AnalyzedRow) -> bool + 'a,
    {
        self.rows.iter().filter(move |row| pred(*row))
    }

    /// Sum the rows matching `pred`
    pub fn sum_where<P>(&self, pred: P) -> Summary
    where
        P: FnMut(&AnalyzedRow) -> bool,
    {
        let mut pred = pred;
        self.rows
            .iter()
            .filter(|row| pred(*row))
            .map(Summary::of)
            .fold(Summary::default(), Add::add)
    }

    /// Totals for one speech
    pub fn speech(&self, speech_id: u32) -> Summary {
        self.sum_where(|row| row.parsed.row.speech_id == Some(speech_id))
    }

    /// Totals for narrative passages outside any speech
    pub fn narrative(&self) -> Summary {
        self.sum_where(|row| row.parsed.row.speech_id.is_none())
    }

    /// Totals per speech, keyed by speech id
    pub fn by_speech(&self) -> BTreeMap<u32, Summary> {
        let mut groups: BTreeMap<u32, Summary> = BTreeMap::new();
        for row in &self.rows {
            if let Some(id) = row.parsed.row.speech_id {
                let entry = groups.entry(id).or_default();
                *entry = *entry + Summary::of(row);
            }
        }
        groups
    }

    /// Per-speech totals as TSV, one line per speech plus a header
    pub fn speech_report(&self) -> String {
        let mut out = String::from(
            "speech_id\tspeaker\tlocation\tstart\tend\tpassages\ttokens\tn_pot_opt\tn?_part_opt\tn?_inf_opt\n",
        );
        for (id, summary) in self.by_speech() {
            let first = self.filter(move |r| r.parsed.row.speech_id == Some(id)).next();
            let last = self.filter(move |r| r.parsed.row.speech_id == Some(id)).last();
            let (Some(first), Some(last)) = (first, last) else {
                continue;
            };
            let row = &first.parsed.row;
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                id,
                row.speaker.as_deref().unwrap_or(""),
                row.location.as_deref().unwrap_or(""),
                row.reference,
                last.parsed.row.reference,
                summary.passages,
                summary.tokens,
                summary.counts.n_pot_opt,
                summary.counts.n_part_opt_candidate,
                summary.counts.n_inf_opt_candidate,
            );
        }
        out
    }
}
