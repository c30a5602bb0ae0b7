//! In-process embedding store.
//!
//! Keeps every embedding in memory and answers queries with an exact
//! brute-force scan, computing distances the way the pgvector operators do.
//! Suitable for small vocabularies, local runs and tests.

use crate::models::{
    DistanceQuery, QueryVector, RankedQuery, ResultRow, WordEmbedding,
};
use crate::query::dedupe_preserving_order;
use crate::storage::traits::{EmbeddingSink, EmbeddingStore};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Table contents, in insertion order.
#[derive(Debug, Default)]
struct Table {
    entries: Vec<WordEmbedding>,
    index: HashMap<String, usize>,
}

impl Table {
    fn get(&self, word: &str) -> Option<&[f32]> {
        self.index
            .get(word)
            .map(|&i| self.entries[i].embedding.as_slice())
    }

    /// Sums the embeddings of the distinct known words in `words`.
    fn sum_into(&self, words: &[String], acc: &mut [f32], sign: f32) {
        for word in dedupe_preserving_order(words) {
            if let Some(embedding) = self.get(&word) {
                for (a, x) in acc.iter_mut().zip(embedding) {
                    *a += sign * x;
                }
            }
        }
    }
}

/// In-memory embedding store.
#[derive(Debug)]
pub struct MemoryStore {
    dimensions: usize,
    table: RwLock<Table>,
}

impl MemoryStore {
    /// Creates an empty store for vectors of the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            table: RwLock::new(Table::default()),
        }
    }

    /// Creates a store from `(word, embedding)` pairs.
    ///
    /// Later duplicates of a word are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if an embedding has the wrong length.
    pub fn from_pairs<I, S>(dimensions: usize, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let store = Self::new(dimensions);
        for (word, embedding) in pairs {
            store.insert(WordEmbedding::new(word, embedding))?;
        }
        Ok(store)
    }

    /// Returns the configured dimensionality.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns the number of stored words.
    ///
    /// # Errors
    ///
    /// Returns an error if the table lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    /// Returns `true` if no words are stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the table lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.entries.is_empty())
    }

    /// Inserts an embedding unless the word is already present.
    ///
    /// Returns `true` if the row was inserted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the embedding has the wrong length.
    pub fn insert(&self, entry: WordEmbedding) -> Result<bool> {
        if entry.dimensions() != self.dimensions {
            return Err(Error::InvalidInput(format!(
                "embedding for '{}' has {} dimensions, expected {}",
                entry.word,
                entry.dimensions(),
                self.dimensions
            )));
        }
        let mut table = self.write()?;
        if table.index.contains_key(&entry.word) {
            return Ok(false);
        }
        let position = table.entries.len();
        table.index.insert(entry.word.clone(), position);
        table.entries.push(entry);
        Ok(true)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table>> {
        self.table
            .read()
            .map_err(|e| Error::operation("memory_store_read", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table>> {
        self.table
            .write()
            .map_err(|e| Error::operation("memory_store_write", e))
    }

    fn resolve(&self, table: &Table, vector: &QueryVector) -> Option<Vec<f32>> {
        match vector {
            QueryVector::Word(word) => table.get(word).map(<[f32]>::to_vec),
            QueryVector::Composite { add, sub } => {
                if table.entries.is_empty() {
                    return None;
                }
                let mut acc = vec![0.0_f32; self.dimensions];
                table.sum_into(add, &mut acc, 1.0);
                table.sum_into(sub, &mut acc, -1.0);
                Some(acc)
            },
        }
    }
}

#[async_trait]
impl EmbeddingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn embedding(&self, word: &str) -> Result<Option<Vec<f32>>> {
        Ok(self.read()?.get(word).map(<[f32]>::to_vec))
    }

    async fn query_vector(&self, vector: &QueryVector) -> Result<Option<Vec<f32>>> {
        let table = self.read()?;
        Ok(self.resolve(&table, vector))
    }

    async fn ranked_search(&self, query: &RankedQuery) -> Result<Vec<ResultRow>> {
        let table = self.read()?;
        let Some(qvec) = self.resolve(&table, &query.vector) else {
            return Ok(Vec::new());
        };
        let query_word = match &query.vector {
            QueryVector::Word(word) => Some(word.as_str()),
            QueryVector::Composite { .. } => None,
        };

        let mut scored: Vec<(&str, f64)> = table
            .entries
            .iter()
            .filter(|e| Some(e.word.as_str()) != query_word)
            .filter(|e| !query.exclusion.excludes(&e.word))
            .map(|e| (e.word.as_str(), query.metric.distance(&e.embedding, &qvec)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(query.limit)
            .map(|(word, distance)| {
                if query.include_distance {
                    ResultRow::with_distance(word, distance)
                } else {
                    ResultRow::word(word)
                }
            })
            .collect())
    }

    async fn distances(&self, query: &DistanceQuery) -> Result<Vec<ResultRow>> {
        let table = self.read()?;
        let Some(qvec) = table.get(&query.word) else {
            return Ok(Vec::new());
        };

        Ok(query
            .targets
            .iter()
            .filter(|target| !(query.exclude_self && **target == query.word))
            .filter_map(|target| {
                table
                    .get(target)
                    .map(|embedding| ResultRow::with_distance(target, query.measure.compute(embedding, qvec)))
            })
            .collect())
    }

    async fn health_check(&self) -> Result<()> {
        self.read().map(|_| ())
    }
}

#[async_trait]
impl EmbeddingSink for MemoryStore {
    async fn insert_batch(&self, batch: &[WordEmbedding]) -> Result<u64> {
        let mut inserted = 0;
        for entry in batch {
            if self.insert(entry.clone())? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
