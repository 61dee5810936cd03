//! Parse cache
//!
//! Parsing is by far the slowest step, so parses are written once to a
//! Parquet file and restored on later runs. The file has one row per
//! passage:
//!
//! | Column           | Type          | Nullable |
//! |------------------|---------------|----------|
//! | `reference`      | `Utf8`        | no       |
//! | `passage`        | `Utf8`        | no       |
//! | `speaker`        | `Utf8`        | yes      |
//! | `speech_id`      | `UInt32`      | yes      |
//! | `location`       | `Utf8`        | yes      |
//! | `parsed_passage` | `Binary`      | no       |
//!
//! Each `parsed_passage` value is a bincode blob of one [`ParsedPassage`].
//! The parser model and the cache format version are stored as key/value
//! metadata in the Parquet footer.

use arrow_array::{Array, ArrayRef, BinaryArray, RecordBatch, StringArray, UInt32Array};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::annotate::Annotator;
use crate::corpus::PassageRow;
use crate::error::{Error, Result};
use crate::tree::ParsedPassage;

pub const FORMAT_VERSION: u32 = 1;
pub const MODEL_KEY: &str = "hedges.model";
pub const VERSION_KEY: &str = "hedges.format_version";

/// A passage row together with its parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPassageRow {
    pub row: PassageRow,
    pub parsed_passage: ParsedPassage,
}

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("reference", DataType::Utf8, false),
        Field::new("passage", DataType::Utf8, false),
        Field::new("speaker", DataType::Utf8, true),
        Field::new("speech_id", DataType::UInt32, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("parsed_passage", DataType::Binary, false),
    ]))
}

/// Serialize one parse to a blob
pub fn encode_parse(parse: &ParsedPassage) -> Result<Vec<u8>> {
    bincode::serialize(parse).map_err(|e| Error::cache(format!("encoding parse: {}", e)))
}

/// Deserialize one blob back into its parse
pub fn decode_parse(blob: &[u8]) -> Result<ParsedPassage> {
    bincode::deserialize(blob).map_err(|e| Error::cache(format!("decoding parse: {}", e)))
}

/// Parse every row and write the result to `path`, replacing any existing
/// cache.
pub fn populate(
    rows: Vec<PassageRow>,
    annotator: &mut impl Annotator,
    path: impl AsRef<Path>,
) -> Result<Vec<ParsedPassageRow>> {
    let total = rows.len();
    let mut parsed = Vec::with_capacity(total);

    for (i, row) in rows.into_iter().enumerate() {
        let parsed_passage = annotator.annotate(&row.passage)?;
        debug!(reference = %row.reference, tokens = parsed_passage.len(), "parsed {}/{}", i + 1, total);
        parsed.push(ParsedPassageRow {
            row,
            parsed_passage,
        });
    }

    write_cache(&parsed, annotator.model(), path)?;
    Ok(parsed)
}

/// Write parsed rows to a cache file
pub fn write_cache(rows: &[ParsedPassageRow], model: &str, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let references: Vec<String> = rows.iter().map(|r| r.row.reference.to_string()).collect();
    let blobs = rows
        .iter()
        .map(|r| encode_parse(&r.parsed_passage))
        .collect::<Result<Vec<_>>>()?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(&references)),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.row.passage.as_str()))),
        Arc::new(rows.iter().map(|r| r.row.speaker.as_deref()).collect::<StringArray>()),
        Arc::new(rows.iter().map(|r| r.row.speech_id).collect::<UInt32Array>()),
        Arc::new(rows.iter().map(|r| r.row.location.as_deref()).collect::<StringArray>()),
        Arc::new(BinaryArray::from_iter_values(&blobs)),
    ];
    let batch = RecordBatch::try_new(schema(), columns).map_err(Error::cache)?;

    let metadata = vec![
        KeyValue::new(MODEL_KEY.to_string(), model.to_string()),
        KeyValue::new(VERSION_KEY.to_string(), FORMAT_VERSION.to_string()),
    ];
    write_batch(&batch, metadata, path)?;

    info!(path = %path.display(), rows = rows.len(), model, "wrote parse cache");
    Ok(())
}

fn write_batch(batch: &RecordBatch, metadata: Vec<KeyValue>, path: &Path) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(metadata))
        .build();
    let file = File::create(path).map_err(|e| Error::io("creating parse cache", path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).map_err(Error::cache)?;
    writer.write(batch).map_err(Error::cache)?;
    writer.close().map_err(Error::cache)?;
    Ok(())
}

/// Read the model name and rows from a cache file
pub fn read_cache(path: impl AsRef<Path>) -> Result<(String, Vec<ParsedPassageRow>)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io("opening parse cache", path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::cache(format!("{} is not a parse cache: {}", path.display(), e)))?;

    let metadata = builder.metadata().file_metadata().key_value_metadata();
    let lookup = |key: &str| {
        metadata
            .and_then(|kvs| kvs.iter().find(|kv| kv.key == key))
            .and_then(|kv| kv.value.clone())
            .ok_or_else(|| Error::cache(format!("{} has no {} entry", path.display(), key)))
    };
    let version = lookup(VERSION_KEY)?;
    if version != FORMAT_VERSION.to_string() {
        return Err(Error::cache(format!(
            "unsupported format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    let model = lookup(MODEL_KEY)?;

    let mut rows = Vec::new();
    for batch in builder.build().map_err(Error::cache)? {
        let batch = batch.map_err(Error::cache)?;
        read_batch(&batch, &mut rows)?;
    }

    info!(path = %path.display(), rows = rows.len(), model = %model, "restored parse cache");
    Ok((model, rows))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::cache(format!("missing or mistyped column {}", name)))
}

fn read_batch(batch: &RecordBatch, rows: &mut Vec<ParsedPassageRow>) -> Result<()> {
    let reference = column::<StringArray>(batch, "reference")?;
    let passage = column::<StringArray>(batch, "passage")?;
    let speaker = column::<StringArray>(batch, "speaker")?;
    let speech_id = column::<UInt32Array>(batch, "speech_id")?;
    let location = column::<StringArray>(batch, "location")?;
    let parsed_passage = column::<BinaryArray>(batch, "parsed_passage")?;

    let optional = |col: &StringArray, i: usize| (!col.is_null(i)).then(|| col.value(i).to_string());

    for i in 0..batch.num_rows() {
        rows.push(ParsedPassageRow {
            row: PassageRow {
                reference: reference.value(i).parse()?,
                passage: passage.value(i).to_string(),
                speaker: optional(speaker, i),
                speech_id: (!speech_id.is_null(i)).then(|| speech_id.value(i)),
                location: optional(location, i),
            },
            parsed_passage: decode_parse(parsed_passage.value(i))?,
        });
    }
    Ok(())
}

/// Restore parsed rows without re-running the parser
pub fn restore(path: impl AsRef<Path>) -> Result<Vec<ParsedPassageRow>> {
    read_cache(path).map(|(_, rows)| rows)
}

/// Restore parsed rows, rejecting a cache written by a different model
pub fn restore_for_model(path: impl AsRef<Path>, model: &str) -> Result<Vec<ParsedPassageRow>> {
    let (found, rows) = read_cache(path)?;
    if found != model {
        return Err(Error::ModelMismatch {
            expected: model.to_string(),
            found,
        });
    }
    Ok(rows)
}

/// Restore from `path` when it exists; otherwise build the corpus, parse it
/// and write the cache.
pub fn load_or_populate<F>(
    path: impl AsRef<Path>,
    annotator: &mut impl Annotator,
    build: F,
) -> Result<Vec<ParsedPassageRow>>
where
    F: FnOnce() -> Result<Vec<PassageRow>>,
{
    let path = path.as_ref();
    if path.exists() {
        return restore_for_model(path, annotator.model());
    }
    info!(path = %path.display(), "no parse cache, parsing corpus");
    populate(build()?, annotator, path)
}
