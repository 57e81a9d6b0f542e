// ============================================================
// Layer 4 — Dataset Iterator
// ============================================================
// One cursor over two independent data sources:
//
//   reset(Training)   → fresh permutation of the training split
//   next_batch() ×N   → full batches in that order
//   reset(Validation) → identity order over the validation split
//   next_batch() ×M   → full batches, identical every epoch
//
// The two sources never share cursor state; `reset` throws away
// whatever was left of the previous pass. Only full batches are
// produced: with 100 samples and batch_size 32 there are exactly
// 3 batches and the last 4 samples are dropped for that pass.
// Reading past the last full batch is an orchestration bug and
// fails with `FinetuneError::Exhausted`.

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::batcher::{ImageBatch, ImageBatcher};
use crate::data::dataset::ImageSample;
use crate::domain::errors::{FinetuneError, FinetuneResult};
use crate::domain::parameter::Source;

struct SourceSlot<D> {
    dataset: D,
    shuffle: bool,
}

struct Cursor {
    source:   Source,
    order:    Vec<usize>,
    position: usize,
    consumed: usize,
}

pub struct DatasetIterator<B: Backend, D: Dataset<ImageSample>> {
    training:   SourceSlot<D>,
    validation: SourceSlot<D>,
    batcher:    ImageBatcher<B>,
    batch_size: usize,
    rng:        StdRng,
    cursor:     Option<Cursor>,
}

impl<B: Backend, D: Dataset<ImageSample>> DatasetIterator<B, D> {
    /// Training shuffles on every reset, validation keeps file order.
    /// A `seed` makes the training permutations reproducible.
    pub fn new(
        training:   D,
        validation: D,
        batcher:    ImageBatcher<B>,
        batch_size: usize,
        seed:       Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None    => StdRng::from_entropy(),
        };
        Self {
            training:   SourceSlot { dataset: training,   shuffle: true  },
            validation: SourceSlot { dataset: validation, shuffle: false },
            batcher,
            batch_size,
            rng,
            cursor: None,
        }
    }

    #[cfg(test)]
    pub fn with_shuffle(mut self, source: Source, shuffle: bool) -> Self {
        self.slot_mut(source).shuffle = shuffle;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn source_len(&self, source: Source) -> usize {
        self.slot(source).dataset.len()
    }

    /// floor(len / batch_size): the number of `next_batch` calls one
    /// pass over `source` may make.
    pub fn batches_per_epoch(&self, source: Source) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.source_len(source) / self.batch_size
    }

    #[cfg(test)]
    pub fn current_source(&self) -> Option<Source> {
        self.cursor.as_ref().map(|c| c.source)
    }

    /// Reposition at the first batch of `source`.
    pub fn reset(&mut self, source: Source) {
        let len = self.source_len(source);
        let mut order: Vec<usize> = (0..len).collect();
        if self.slot(source).shuffle {
            order.shuffle(&mut self.rng);
        }
        tracing::debug!("Iterator reset to {} ({} samples)", source, len);
        self.cursor = Some(Cursor { source, order, position: 0, consumed: 0 });
    }

    pub fn next_batch(&mut self) -> FinetuneResult<ImageBatch<B>> {
        let cursor = self.cursor.as_mut().ok_or(FinetuneError::NotReset)?;

        let end = cursor.position + self.batch_size;
        if self.batch_size == 0 || end > cursor.order.len() {
            return Err(FinetuneError::Exhausted {
                origin:   cursor.source,
                consumed: cursor.consumed,
            });
        }

        let dataset = match cursor.source {
            Source::Training   => &self.training.dataset,
            Source::Validation => &self.validation.dataset,
        };

        let mut items = Vec::with_capacity(self.batch_size);
        for &index in &cursor.order[cursor.position..end] {
            let sample = dataset.get(index).ok_or_else(|| FinetuneError::Data {
                index,
                reason: format!("{} sample could not be loaded", cursor.source),
            })?;
            items.push(sample);
        }

        cursor.position = end;
        cursor.consumed += 1;
        Ok(self.batcher.batch(items))
    }

    fn slot(&self, source: Source) -> &SourceSlot<D> {
        match source {
            Source::Training   => &self.training,
            Source::Validation => &self.validation,
        }
    }

    fn slot_mut(&mut self, source: Source) -> &mut SourceSlot<D> {
        match source {
            Source::Training   => &mut self.training,
            Source::Validation => &mut self.validation,
        }
    }
}
