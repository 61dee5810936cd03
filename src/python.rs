//! Python bindings for hedges
//!
//! Exposes the speech matcher, the counters and the parse cache so the
//! analysis can continue in a notebook.

use pyo3::exceptions::{PyFileNotFoundError, PyIOError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

use crate::cache::restore;
use crate::citation::{Citation, RangeMode};
use crate::conllu::parse_document;
use crate::counters::count_potential_optatives;
use crate::error::Error;
use crate::speeches::SpeechTable as RustSpeechTable;
use crate::tree::ParsedPassage;

/// Convert a pipeline error to a Python exception
impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        if err.is_not_found() {
            PyFileNotFoundError::new_err(err.to_string())
        } else if err.is_parse_error() || err.is_collaborator_error() {
            PyValueError::new_err(err.to_string())
        } else {
            PyIOError::new_err(err.to_string())
        }
    }
}

#[pyclass(name = "SpeechTable")]
pub struct PySpeechTable {
    inner: RustSpeechTable,
}

#[pymethods]
impl PySpeechTable {
    /// Load a speech table from a TSV file.
    ///
    /// Args:
    ///     path: TSV with start, end, speaker and location columns
    ///     ordered: If True, compare references in document order rather
    ///         than level by level.
    #[staticmethod]
    #[pyo3(signature = (path, ordered=false))]
    fn from_file(path: PathBuf, ordered: bool) -> PyResult<Self> {
        let mode = if ordered {
            RangeMode::Ordered
        } else {
            RangeMode::Componentwise
        };
        Ok(Self {
            inner: RustSpeechTable::from_file(path)?.with_range_mode(mode),
        })
    }

    /// Find the speech containing a reference such as "2.35.1".
    ///
    /// Returns (speech_id, speaker, location) or None for narrative.
    fn find(&self, reference: &str) -> PyResult<Option<(u32, String, String)>> {
        let reference: Citation = reference.parse().map_err(Error::from)?;
        Ok(self
            .inner
            .find(&reference)
            .map(|s| (s.index, s.speaker.clone(), s.location.clone())))
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("<SpeechTable ({} speeches)>", self.inner.len())
    }
}

/// Count (n_pot_opt, n?_part_opt, n?_inf_opt) in a CoNLL-U document
#[pyfunction]
fn count_conllu(conllu: &str) -> PyResult<(u64, u64, u64)> {
    let sentences = parse_document(conllu).map_err(Error::from)?;
    let counts = count_potential_optatives(&ParsedPassage::new(sentences));
    Ok((
        counts.n_pot_opt,
        counts.n_part_opt_candidate,
        counts.n_inf_opt_candidate,
    ))
}

/// Restore a parse cache and count every passage.
///
/// Returns a list of (reference, speech_id, n_pot_opt, n?_part_opt, n?_inf_opt).
#[pyfunction]
fn count_cache(path: PathBuf) -> PyResult<Vec<(String, Option<u32>, u64, u64, u64)>> {
    let rows = restore(path)?;
    Ok(rows
        .iter()
        .map(|r| {
            let counts = count_potential_optatives(&r.parsed_passage);
            (
                r.row.reference.to_string(),
                r.row.speech_id,
                counts.n_pot_opt,
                counts.n_part_opt_candidate,
                counts.n_inf_opt_candidate,
            )
        })
        .collect())
}

#[pymodule]
fn hedges(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySpeechTable>()?;
    m.add_function(wrap_pyfunction!(count_conllu, m)?)?;
    m.add_function(wrap_pyfunction!(count_cache, m)?)?;
    Ok(())
}
