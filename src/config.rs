use std::path::PathBuf;

use crate::citation::RangeMode;
use crate::text::DEFAULT_EXCLUDED;

/// Inputs and settings for one analysis run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub text_path: PathBuf,
    pub speeches_path: PathBuf,
    pub cache_path: PathBuf,
    /// Model name recorded in (and checked against) the parse cache
    pub model: String,
    /// Parser command and its arguments; reads text, writes CoNLL-U
    pub parser_command: Vec<String>,
    pub range_mode: RangeMode,
    /// TEI elements whose text is left out of passages
    pub excluded_elements: Vec<String>,
}

impl PipelineConfig {
    pub const DEFAULT_TEXT_PATH: &'static str =
        "./tei_primary_sources/tlg0003.tlg001.perseus-grc2.xml";
    pub const DEFAULT_SPEECHES_PATH: &'static str = "./thuc-speeches.tsv";
    pub const DEFAULT_CACHE_PATH: &'static str = "thucydides.cache";
    pub const DEFAULT_MODEL: &'static str = "grc_proiel_trf";
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_path: PathBuf::from(Self::DEFAULT_TEXT_PATH),
            speeches_path: PathBuf::from(Self::DEFAULT_SPEECHES_PATH),
            cache_path: PathBuf::from(Self::DEFAULT_CACHE_PATH),
            model: Self::DEFAULT_MODEL.to_string(),
            parser_command: Vec::new(),
            range_mode: RangeMode::Componentwise,
            excluded_elements: DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect(),
        }
    }
}
