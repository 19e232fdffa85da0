//! Reading sample series from delimited text files.
//!
//! Samples are streamed through the counter in chunks, so a series never has
//! to fit in memory.
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context};
use tracing::debug;

use crate::alloc::Allocator;
use crate::config::ValidationError;
use crate::counter::RainflowCounter;

/// Layout of a sample file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParseConfig {
    /// Leading lines to skip.
    #[serde(default)]
    pub header: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Zero-based column holding the samples.
    #[serde(default)]
    pub column: usize,
    /// Samples handed to the counter per call.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_delimiter() -> String {
    ",".to_owned()
}

fn default_chunk_size() -> usize {
    4096
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            header: 0,
            delimiter: default_delimiter(),
            column: 0,
            chunk_size: default_chunk_size(),
        }
    }
}

impl ParseConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.delimiter.is_empty() {
            return Err(ValidationError::new("delimiter must not be empty"));
        }
        if self.delimiter.len() != 1 {
            return Err(ValidationError::new(&format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        if self.chunk_size == 0 {
            return Err(ValidationError::new("chunk_size must be greater than 0"));
        }
        Ok(())
    }

    fn is_whitespace_delimited(&self) -> bool {
        self.delimiter == " " || self.delimiter == "\t"
    }

    fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// Iterator over the samples of one column.
///
/// With a blank or tab delimiter, empty fields are skipped before the column
/// is selected, so runs of blanks act as one delimiter. With any other
/// delimiter an empty field is an error. Lines starting with `#` are
/// comments.
pub struct SeriesReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    column: usize,
    skip: usize,
    collapse_blanks: bool,
}

impl<R: Read> SeriesReader<R> {
    pub fn new(reader: R, parse_config: &ParseConfig) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .delimiter(parse_config.delimiter_byte())
            .from_reader(reader)
            .into_records();
        SeriesReader {
            records,
            column: parse_config.column,
            skip: parse_config.header,
            collapse_blanks: parse_config.is_whitespace_delimited(),
        }
    }
}

impl SeriesReader<File> {
    pub fn open<P: AsRef<Path>>(path: P, parse_config: &ParseConfig) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open series {}", path.display()))?;
        Ok(SeriesReader::new(file, parse_config))
    }
}

impl<R: Read> Iterator for SeriesReader<R> {
    type Item = anyhow::Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            let field = if self.collapse_blanks {
                record.iter().filter(|f| !f.is_empty()).nth(self.column)
            } else {
                record.get(self.column)
            };
            let field = match field {
                Some(field) if !field.is_empty() => field,
                Some(_) => return Some(Err(anyhow!("line {}: empty sample in column {}", line, self.column))),
                None => return Some(Err(anyhow!("line {}: no column {}", line, self.column))),
            };
            return Some(
                field
                    .parse::<f64>()
                    .with_context(|| format!("line {}: invalid sample {:?}", line, field)),
            );
        }
    }
}

/// Reads a complete series into memory.
pub fn read_series<P: AsRef<Path>>(path: P, parse_config: &ParseConfig) -> anyhow::Result<Vec<f64>> {
    SeriesReader::open(path, parse_config)?.collect()
}

/// `(max, min)` of a series, `None` when it holds no samples.
pub fn value_range<I>(samples: I) -> anyhow::Result<Option<(f64, f64)>>
where
    I: IntoIterator<Item = anyhow::Result<f64>>,
{
    let mut range: Option<(f64, f64)> = None;
    for sample in samples {
        let v = sample?;
        range = Some(match range {
            None => (v, v),
            Some((max, min)) => (max.max(v), min.min(v)),
        });
    }
    Ok(range)
}

/// Streams all samples of `reader` into `counter`, `chunk_size` at a time.
///
/// Returns the number of samples fed. The counter must already be
/// initialized; finalizing is left to the caller.
pub fn feed_reader<A, R>(
    counter: &mut RainflowCounter<A>,
    reader: R,
    parse_config: &ParseConfig,
) -> anyhow::Result<u64>
where
    A: Allocator,
    R: Read,
{
    let chunk_size = parse_config.chunk_size.max(1);
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut fed = 0u64;
    for sample in SeriesReader::new(reader, parse_config) {
        chunk.push(sample?);
        if chunk.len() == chunk_size {
            counter.feed(&chunk)?;
            fed += chunk.len() as u64;
            chunk.clear();
        }
    }
    if !chunk.is_empty() {
        counter.feed(&chunk)?;
        fed += chunk.len() as u64;
    }
    debug!(samples = fed, "series consumed");
    Ok(fed)
}

/// Opens `path` and streams it into `counter`.
pub fn feed_file<A, P>(counter: &mut RainflowCounter<A>, path: P, parse_config: &ParseConfig) -> anyhow::Result<u64>
where
    A: Allocator,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open series {}", path.display()))?;
    feed_reader(counter, file, parse_config).with_context(|| format!("failed to count {}", path.display()))
}
