//! Chunked reader over submitted variants that still need clustering.

use std::collections::VecDeque;

use tracing::debug;

use super::traits::{ChunkedReader, VariantStore};
use crate::variant::SubmittedVariant;
use crate::{LodestoneError, Result};

/// Streams the submitted variants of one assembly that do not yet carry a
/// clustered accession, one bounded batch at a time.
///
/// The set of matching ids is snapshotted when the reader is opened, so
/// writes performed while iterating do not disturb the cursor; variants
/// clustered before `open` never appear at all, which is what lets a
/// repeated run skip completed work.
pub struct ClusteringStoreReader<'a, S: VariantStore + ?Sized> {
    store: &'a S,
    assembly: String,
    chunk_size: usize,
    cursor: Option<Vec<String>>,
    position: usize,
    buffer: VecDeque<SubmittedVariant>,
}

impl<'a, S: VariantStore + ?Sized> ClusteringStoreReader<'a, S> {
    pub fn new(store: &'a S, assembly: &str, chunk_size: usize) -> Self {
        Self {
            store,
            assembly: assembly.to_string(),
            chunk_size: chunk_size.max(1),
            cursor: None,
            position: 0,
            buffer: VecDeque::new(),
        }
    }

    fn fill_buffer(&mut self) -> Result<()> {
        let Some(ids) = &self.cursor else {
            return Err(LodestoneError::Store(
                "reader used before open or after close".to_string(),
            ));
        };
        if self.position >= ids.len() {
            return Ok(());
        }
        let end = (self.position + self.chunk_size).min(ids.len());
        let batch = &ids[self.position..end];
        self.position = end;
        self.buffer.extend(self.store.get_submitted(batch)?);
        Ok(())
    }
}

impl<'a, S: VariantStore + ?Sized> ChunkedReader for ClusteringStoreReader<'a, S> {
    type Item = SubmittedVariant;

    fn open(&mut self) -> Result<()> {
        let ids = self.store.unclustered_submitted_ids(&self.assembly)?;
        debug!(
            assembly = %self.assembly,
            pending = ids.len(),
            "opened clustering reader"
        );
        self.cursor = Some(ids);
        self.position = 0;
        self.buffer.clear();
        Ok(())
    }

    fn read(&mut self) -> Result<Option<SubmittedVariant>> {
        while self.buffer.is_empty() {
            let before = self.position;
            self.fill_buffer()?;
            if self.position == before {
                break;
            }
        }
        Ok(self.buffer.pop_front())
    }

    fn close(&mut self) {
        self.cursor = None;
        self.position = 0;
        self.buffer.clear();
    }
}
