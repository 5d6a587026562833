use std::thread;

use tracing::{debug, warn};

use crate::{ArcError, Archive, Result};

/// Trait for types that encode chunks into parts on worker threads.
///
/// This is implemented by the **encoder** not by the **archive**.
/// For the **archive**, see the [`ParallelWriter`] trait.
///
/// Each worker thread receives its own clone of the encoder.
pub trait PartEncoder: Send + Clone {
    /// Encodes `chunk` into `out` (which arrives empty) and returns the
    /// metadata word stored alongside the part.
    fn encode(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<u64>;

    /// Set the thread ID for this encoder
    ///
    /// Each thread calls this method with its own unique ID before encoding.
    #[allow(unused_variables)]
    fn set_tid(&mut self, _tid: usize) {
        // Default implementation does nothing
    }

    /// Get the thread ID for this encoder
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// Trait for archives that accept parts produced in parallel.
///
/// This is implemented by the **archive** not by the **encoder**.
/// For the **encoder**, see the [`PartEncoder`] trait.
pub trait ParallelWriter {
    /// Encodes `chunks` on `num_threads` threads (0 = all available cores) and
    /// appends them to the stream.
    ///
    /// One slot per chunk is reserved up front, in input order, so the parts
    /// read back in input order no matter which worker finishes first.
    /// Returns the reserved part indices.
    ///
    /// If an encoder fails or a worker panics, every slot of this call that
    /// did not receive its data is filled with an empty part and the error
    /// comes back as [`ArcError::PartsAbandoned`] listing those slots. The
    /// archive stays closable.
    fn add_parts_parallel<E, C>(
        &self,
        stream_id: usize,
        chunks: &[C],
        encoder: E,
        num_threads: usize,
    ) -> Result<Vec<usize>>
    where
        E: PartEncoder,
        C: AsRef<[u8]> + Sync;
}

impl ParallelWriter for Archive {
    fn add_parts_parallel<E, C>(
        &self,
        stream_id: usize,
        chunks: &[C],
        encoder: E,
        num_threads: usize,
    ) -> Result<Vec<usize>>
    where
        E: PartEncoder,
        C: AsRef<[u8]> + Sync,
    {
        let num_threads = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads.min(num_cpus::get())
        };
        let num_threads = num_threads.clamp(1, chunks.len().max(1));

        let slots = chunks
            .iter()
            .map(|_| self.add_part_prepare(stream_id))
            .collect::<Result<Vec<_>>>()?;
        if chunks.is_empty() {
            return Ok(slots);
        }
        debug!(
            stream = stream_id,
            parts = chunks.len(),
            threads = num_threads,
            "encoding parts in parallel"
        );

        let chunks_per_thread = chunks.len() / num_threads;
        let remainder = chunks.len() % num_threads; // for last thread

        let outcome = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(num_threads);
            for tid in 0..num_threads {
                let start = tid * chunks_per_thread;
                let end = if tid == num_threads - 1 {
                    start + chunks_per_thread + remainder
                } else {
                    start + chunks_per_thread
                };
                let thread_chunks = &chunks[start..end];
                let thread_slots = &slots[start..end];
                let mut thread_encoder = encoder.clone();
                let handle = scope.spawn(move || -> Result<()> {
                    thread_encoder.set_tid(tid);
                    let mut out = Vec::new();
                    for (chunk, &slot) in thread_chunks.iter().zip(thread_slots) {
                        out.clear();
                        let metadata = thread_encoder.encode(chunk.as_ref(), &mut out)?;
                        self.add_part_complete(stream_id, slot, &out, metadata)?;
                    }
                    Ok(())
                });
                handles.push(handle);
            }

            // join every worker, keeping the first failure
            let mut outcome = Ok(());
            for handle in handles {
                let result = handle
                    .join()
                    .map_err(|_| ArcError::WorkerPanic)
                    .and_then(|r| r);
                if let Err(e) = result {
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
            outcome
        });

        if let Err(source) = outcome {
            let parts = self.abandon_reserved(stream_id, &slots)?;
            warn!(
                stream = stream_id,
                error = %source,
                abandoned = parts.len(),
                "parallel encoding failed"
            );
            return Err(ArcError::PartsAbandoned {
                stream: stream_id,
                parts,
                source: Box::new(source),
            });
        }
        Ok(slots)
    }
}
