//! Hedges: potential optatives in the speeches of Thucydides
//!
//! Aligns the passages of a TEI edition with a table of speeches, parses
//! each passage with an external dependency parser, caches the parses, and
//! counts optatives (and candidate participles and infinitives) governing ἄν.

pub mod annotate; // Parser seam and the command-line parser adapter
pub mod cache; // Parse cache file
pub mod citation; // Hierarchical references and range containment
pub mod config;
pub mod conllu; // CoNLL-U file parsing
pub mod corpus; // Passage rows aligned to speeches
pub mod counters; // Potential optative counters
pub mod error;
pub mod pipeline;
pub mod speeches; // Speech table and lookup
pub mod table; // Filter-then-sum over counted rows
pub mod text; // TEI source text
pub mod tree; // Dependency parse data structures

// Python bindings
#[cfg(feature = "pyo3")]
pub mod python;

// Re-exports for convenience
pub use annotate::{Annotator, CommandAnnotator};
pub use cache::{ParsedPassageRow, load_or_populate, populate, restore, restore_for_model};
pub use citation::{Citation, RangeMode};
pub use config::PipelineConfig;
pub use conllu::CoNLLUReader;
pub use corpus::{PassageRow, align_speeches, build_corpus};
pub use counters::{Counts, count_potential_optatives};
pub use error::{Error, Result};
pub use speeches::{SpeechRecord, SpeechTable};
pub use table::{AnalysisTable, AnalyzedRow, Summary, analyze};
pub use text::{TeiText, TextSource};
pub use tree::{Features, Node, NodeId, ParsedPassage, Tree};
