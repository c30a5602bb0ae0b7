//! GloVe text format loader.

use crate::models::WordEmbedding;
use crate::observability::LOAD_ROWS_TOTAL;
use crate::storage::EmbeddingSink;
use crate::{Error, Result};
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Options for a vectors-file load.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Expected vector width. Lines with a different width are skipped.
    pub dimensions: usize,
    /// Rows per insert batch; each batch is one transaction.
    pub batch_size: usize,
    /// Leading lines to ignore (for files with a header line).
    pub skip_lines: usize,
}

impl LoadOptions {
    /// Creates options for `dimensions`-wide vectors with default batching.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            batch_size: 10_000,
            skip_lines: 0,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of leading lines to ignore.
    #[must_use]
    pub const fn with_skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = skip_lines;
        self
    }
}

/// Outcome of a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines read, excluding skipped header lines.
    pub processed: u64,
    /// Rows written to the sink.
    pub inserted: u64,
    /// Well-formed rows whose word already existed.
    pub skipped_duplicates: u64,
    /// Lines rejected by [`parse_line`].
    pub skipped_malformed: u64,
}

/// Parses one line into an embedding.
///
/// Returns `None` for lines that do not hold exactly `dimensions` numbers
/// after the word, for unparseable numbers, and for words starting with `.`
/// (tokenizer debris such as `. . .` rows in the Common Crawl files).
#[must_use]
pub fn parse_line(line: &str, dimensions: usize) -> Option<WordEmbedding> {
    let mut tokens = line.split_whitespace();
    let word = tokens.next()?;
    if word.starts_with('.') {
        return None;
    }

    let mut embedding = Vec::with_capacity(dimensions);
    for token in tokens {
        if embedding.len() == dimensions {
            return None;
        }
        embedding.push(token.parse::<f32>().ok().filter(|v| v.is_finite())?);
    }

    (embedding.len() == dimensions).then(|| WordEmbedding::new(word, embedding))
}

/// Loads vectors from a buffered reader into `sink`.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
///
/// # Errors
///
/// Returns an error if options are invalid, reading fails, or the sink
/// rejects a batch. Batches committed before the failure stay committed.
pub async fn load<R, S>(reader: R, sink: &S, options: LoadOptions) -> Result<LoadReport>
where
    R: AsyncBufRead + Unpin,
    S: EmbeddingSink + ?Sized,
{
    if options.dimensions == 0 || options.batch_size == 0 {
        return Err(Error::InvalidInput(
            "dimensions and batch size must be at least 1".to_string(),
        ));
    }

    let mut reader = reader;
    let mut report = LoadReport::default();
    let mut batch = Vec::with_capacity(options.batch_size);
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| Error::operation("read_vectors_file", e))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        if line_no <= options.skip_lines {
            continue;
        }
        report.processed += 1;

        let line = String::from_utf8_lossy(&buf);
        match parse_line(&line, options.dimensions) {
            Some(entry) => batch.push(entry),
            None => {
                report.skipped_malformed += 1;
                tracing::trace!(line = line_no, "Skipping malformed line");
            },
        }

        if batch.len() >= options.batch_size {
            flush(sink, &mut batch, &mut report).await?;
        }
    }
    flush(sink, &mut batch, &mut report).await?;

    metrics::counter!(LOAD_ROWS_TOTAL, "outcome" => "inserted").increment(report.inserted);
    metrics::counter!(LOAD_ROWS_TOTAL, "outcome" => "duplicate").increment(report.skipped_duplicates);
    metrics::counter!(LOAD_ROWS_TOTAL, "outcome" => "malformed").increment(report.skipped_malformed);
    tracing::info!(
        processed = report.processed,
        inserted = report.inserted,
        skipped_duplicates = report.skipped_duplicates,
        skipped_malformed = report.skipped_malformed,
        "Vectors loaded"
    );
    Ok(report)
}

/// Loads vectors from a file path.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or [`load`] fails.
pub async fn load_file<S>(path: &Path, sink: &S, options: LoadOptions) -> Result<LoadReport>
where
    S: EmbeddingSink + ?Sized,
{
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::operation("open_vectors_file", format!("{}: {e}", path.display())))?;
    load(BufReader::new(file), sink, options).await
}

async fn flush<S>(sink: &S, batch: &mut Vec<WordEmbedding>, report: &mut LoadReport) -> Result<()>
where
    S: EmbeddingSink + ?Sized,
{
    if batch.is_empty() {
        return Ok(());
    }
    let inserted = sink.insert_batch(batch).await?;
    report.inserted += inserted;
    report.skipped_duplicates += (batch.len() as u64).saturating_sub(inserted);
    tracing::debug!(batch = batch.len(), inserted, total = report.inserted, "Inserted batch");
    batch.clear();
    Ok(())
}
