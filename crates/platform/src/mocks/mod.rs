//! Mock implementations for testing
//!
//! In-memory versions of the platform traits for unit and integration tests
//! and for host tooling. Not available on `no_std` targets.

#![cfg(any(test, feature = "std"))]

extern crate std;

use std::boxed::Box;
use std::collections::VecDeque;
use std::string::{String, ToString};
use std::vec;
use std::vec::Vec;

use crate::audio::{AudioBlock, AudioOutput};
use crate::input::AnalogControl;
use crate::storage::{File, Storage};

/// Error returned by the mocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// No file registered under the requested path.
    NotFound,
    /// Injected read failure.
    ReadFailed,
    /// Every block is held by the test; a real transport would wait forever.
    PoolEmpty,
    /// Injected transport failure.
    Rejected,
}

impl core::fmt::Display for MockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => f.write_str("file not found"),
            Self::ReadFailed => f.write_str("injected read failure"),
            Self::PoolEmpty => f.write_str("no free block and nothing will release one"),
            Self::Rejected => f.write_str("injected transport failure"),
        }
    }
}

// ── Storage ──────────────────────────────────────────────────────────────────

/// In-memory storage keyed by path.
///
/// Reads hand out at most `chunk` bytes per call so callers are exercised
/// against short reads the way a block device delivers them.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Vec<(String, Vec<u8>)>,
    chunk: Option<usize>,
    fail_at: Option<u64>,
    opened: usize,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under `path` (replacing an existing entry).
    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.retain(|(p, _)| p != path);
        self.files.push((path.to_string(), data));
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.insert(path, data);
        self
    }

    /// Limit every read to `chunk` bytes (0 is treated as 1).
    #[must_use]
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = Some(chunk.max(1));
        self
    }

    /// Make reads fail once the file position reaches `offset`.
    #[must_use]
    pub fn fail_reads_at(mut self, offset: u64) -> Self {
        self.fail_at = Some(offset);
        self
    }

    /// Number of successful `open_file` calls.
    pub fn opened(&self) -> usize {
        self.opened
    }
}

impl Storage for MemoryStorage {
    type Error = MockError;
    type File = MemoryFile;

    async fn open_file(&mut self, path: &str) -> Result<Self::File, Self::Error> {
        let data = self
            .files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, d)| d.clone())
            .ok_or(MockError::NotFound)?;
        self.opened = self.opened.saturating_add(1);
        Ok(MemoryFile {
            data,
            pos: 0,
            chunk: self.chunk,
            fail_at: self.fail_at,
        })
    }

    async fn exists(&mut self, path: &str) -> Result<bool, Self::Error> {
        Ok(self.files.iter().any(|(p, _)| p == path))
    }
}

/// File handle handed out by [`MemoryStorage`].
#[derive(Debug, Clone)]
pub struct MemoryFile {
    data: Vec<u8>,
    pos: usize,
    chunk: Option<usize>,
    fail_at: Option<u64>,
}

impl MemoryFile {
    /// Wrap a byte vector directly.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0, chunk: None, fail_at: None }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl File for MemoryFile {
    type Error = MockError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_at.is_some_and(|at| self.pos as u64 >= at) {
            return Err(MockError::ReadFailed);
        }
        let rest = self.data.get(self.pos..).unwrap_or(&[]);
        let mut n = rest.len().min(buf.len());
        if let Some(chunk) = self.chunk {
            n = n.min(chunk);
        }
        if let Some(at) = self.fail_at {
            let until_fail = usize::try_from(at).unwrap_or(usize::MAX).saturating_sub(self.pos);
            n = n.min(until_fail);
        }
        if let (Some(dst), Some(src)) = (buf.get_mut(..n), rest.get(..n)) {
            dst.copy_from_slice(src);
        }
        self.pos = self.pos.saturating_add(n);
        Ok(n)
    }

    async fn seek_forward(&mut self, n: u64) -> Result<u64, Self::Error> {
        let step = usize::try_from(n).unwrap_or(usize::MAX);
        self.pos = self.pos.saturating_add(step).min(self.data.len());
        Ok(self.pos as u64)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

// ── Audio output ─────────────────────────────────────────────────────────────

/// Output transport that records what was submitted.
///
/// By default a submitted block is "transmitted" instantly and returned to
/// the pool, so a single-threaded test never waits on backpressure.
/// [`hold_submitted`](Self::hold_submitted) keeps blocks out of the pool to
/// model a transmit side that has not caught up yet.
#[derive(Debug)]
pub struct RecordingOutput {
    free: Vec<AudioBlock>,
    held: Vec<AudioBlock>,
    pool_size: usize,
    hold: bool,
    fail_submit: bool,
    submitted: Vec<Vec<i16>>,
    starts: usize,
    drains: usize,
    running: bool,
}

impl RecordingOutput {
    /// Pool of `blocks` blocks, each `capacity` samples, leaked for `'static`.
    pub fn new(blocks: usize, capacity: usize) -> Self {
        let free = (0..blocks)
            .map(|_| AudioBlock::new(Box::leak(vec![0i16; capacity].into_boxed_slice())))
            .collect();
        Self {
            free,
            held: Vec::new(),
            pool_size: blocks,
            hold: false,
            fail_submit: false,
            submitted: Vec::new(),
            starts: 0,
            drains: 0,
            running: false,
        }
    }

    /// Keep submitted blocks out of the pool until [`release_all`](Self::release_all).
    pub fn hold_submitted(&mut self, hold: bool) {
        self.hold = hold;
    }

    /// Make every later submit fail.
    pub fn fail_submits(&mut self, fail: bool) {
        self.fail_submit = fail;
    }

    /// Return held blocks to the pool.
    pub fn release_all(&mut self) {
        for mut block in self.held.drain(..) {
            block.set_len(0);
            self.free.push(block);
        }
    }

    /// Valid samples of every submitted block, in order.
    pub fn submitted(&self) -> &[Vec<i16>] {
        &self.submitted
    }

    /// Submitted blocks from index `skip` on (past a known pre-fill).
    pub fn submitted_after(&self, skip: usize) -> &[Vec<i16>] {
        self.submitted.get(skip..).unwrap_or(&[])
    }

    /// All submitted samples concatenated.
    pub fn samples(&self) -> Vec<i16> {
        self.submitted.iter().flatten().copied().collect()
    }

    /// Number of `start` calls.
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Number of `drain` calls.
    pub fn drains(&self) -> usize {
        self.drains
    }

    /// `true` between `start` and `drain`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Blocks currently free.
    pub fn free_blocks(&self) -> usize {
        self.free.len()
    }
}

impl AudioOutput for RecordingOutput {
    type Error = MockError;

    fn pool_size(&self) -> usize {
        self.pool_size
    }

    async fn acquire_block(&mut self) -> Result<AudioBlock, Self::Error> {
        self.free.pop().ok_or(MockError::PoolEmpty)
    }

    fn try_acquire_block(&mut self) -> Result<Option<AudioBlock>, Self::Error> {
        Ok(self.free.pop())
    }

    async fn submit(&mut self, mut block: AudioBlock) -> Result<(), Self::Error> {
        if self.fail_submit {
            self.free.push(block);
            return Err(MockError::Rejected);
        }
        self.submitted.push(block.samples().to_vec());
        if self.hold {
            self.held.push(block);
        } else {
            block.set_len(0);
            self.free.push(block);
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        self.starts = self.starts.saturating_add(1);
        self.running = true;
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), Self::Error> {
        self.drains = self.drains.saturating_add(1);
        self.running = false;
        Ok(())
    }
}

// ── Analog input ─────────────────────────────────────────────────────────────

/// Scripted analog control. Replays queued readings, then repeats the last one.
#[derive(Debug)]
pub struct ScriptedAnalog {
    readings: VecDeque<u16>,
    last: u16,
    full_scale: u16,
}

impl ScriptedAnalog {
    /// Control with the given full-scale value, resting at 0.
    pub fn new(full_scale: u16) -> Self {
        Self { readings: VecDeque::new(), last: 0, full_scale }
    }

    /// Queue readings to be returned in order.
    #[must_use]
    pub fn with_readings(mut self, readings: &[u16]) -> Self {
        self.readings.extend(readings.iter().copied());
        self
    }
}

impl AnalogControl for ScriptedAnalog {
    type Error = core::convert::Infallible;

    fn full_scale(&self) -> u16 {
        self.full_scale
    }

    async fn read(&mut self) -> Result<u16, Self::Error> {
        if let Some(next) = self.readings.pop_front() {
            self.last = next;
        }
        Ok(self.last)
    }
}
