//! Bounded PCM block pool shared between the decode task and the transmit side.
//!
//! ```text
//!            acquire_block()            submit()
//!  [free] ──────────────────▶ decoder ───────────▶ [queued] ──▶ transmit (DMA)
//!    ▲                                                               │
//!    └──────────────────────────── release() ◀───────────────────────┘
//! ```
//!
//! Both queues are `embassy_sync` channels sized to the pool, so a submit can
//! never find the transmit queue full and an acquire waits exactly until the
//! transmit side hands a block back. The same `BlockQueue` works from a
//! `static` with `CriticalSectionRawMutex` (DMA completion interrupt releases
//! blocks) or as a local with `NoopRawMutex` in single-threaded tests.
//!
//! # Usage
//! ```ignore
//! static POOL: BlockQueue<CriticalSectionRawMutex, 2> = BlockQueue::new();
//! POOL.provision(BLOCK_A.init([0; 11_520]))?;
//! POOL.provision(BLOCK_B.init([0; 11_520]))?;
//! let output = POOL.output();          // handed to the playback session
//! // DMA half-complete ISR / task:
//! let block = POOL.next_transmit().await;
//! /* clock block.samples() out */
//! POOL.release(block);
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::audio::{AudioBlock, AudioOutput};

/// Transport run state as seen by the transmit side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportState {
    /// Not clocking samples out.
    Stopped,
    /// Clocking queued blocks out.
    Running,
    /// Playing out what is queued, then stopping.
    Draining,
}

/// Errors returned by [`BlockQueue`] and its [`QueueOutput`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockQueueError {
    /// More blocks were provisioned than the pool can hold.
    PoolFull,
    /// The transmit queue had no room for a submitted block.
    QueueFull,
}

impl core::fmt::Display for BlockQueueError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PoolFull => f.write_str("block pool already holds its capacity"),
            Self::QueueFull => f.write_str("transmit queue full"),
        }
    }
}

/// Fixed pool of `N` PCM blocks with a transmit queue.
pub struct BlockQueue<M: RawMutex, const N: usize> {
    free: Channel<M, AudioBlock, N>,
    queued: Channel<M, AudioBlock, N>,
    state: Mutex<M, Cell<TransportState>>,
    provisioned: Mutex<M, Cell<usize>>,
}

impl<M: RawMutex, const N: usize> BlockQueue<M, N> {
    /// Create an empty pool. `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            free: Channel::new(),
            queued: Channel::new(),
            state: Mutex::new(Cell::new(TransportState::Stopped)),
            provisioned: Mutex::new(Cell::new(0)),
        }
    }

    /// Hand a buffer to the pool as a free block.
    ///
    /// # Errors
    ///
    /// Returns [`BlockQueueError::PoolFull`] once `N` blocks are provisioned.
    pub fn provision(&self, buffer: &'static mut [i16]) -> Result<(), BlockQueueError> {
        let count = self.provisioned.lock(Cell::get);
        if count >= N {
            return Err(BlockQueueError::PoolFull);
        }
        self.free
            .try_send(AudioBlock::new(buffer))
            .map_err(|_| BlockQueueError::PoolFull)?;
        self.provisioned.lock(|c| c.set(count.saturating_add(1)));
        Ok(())
    }

    /// Producer handle implementing [`AudioOutput`].
    pub fn output(&self) -> QueueOutput<'_, M, N> {
        QueueOutput { queue: self }
    }

    /// Wait for the next submitted block (transmit side).
    pub async fn next_transmit(&self) -> AudioBlock {
        self.queued.receive().await
    }

    /// Take the next submitted block if one is queued (transmit side).
    pub fn try_next_transmit(&self) -> Option<AudioBlock> {
        self.queued.try_receive().ok() // ok: Empty maps to None
    }

    /// Return a transmitted block to the free list (transmit side).
    ///
    /// When the transport is draining and nothing is left queued, it stops.
    pub fn release(&self, mut block: AudioBlock) {
        block.set_len(0);
        // Cannot be full: at most N blocks exist and this one was not free.
        let _ = self.free.try_send(block);
        if self.state() == TransportState::Draining && self.queued.is_empty() {
            self.set_state(TransportState::Stopped);
        }
    }

    /// Current transport state.
    pub fn state(&self) -> TransportState {
        self.state.lock(Cell::get)
    }

    /// Blocks currently available to the producer.
    pub fn free_blocks(&self) -> usize {
        self.free.len()
    }

    /// Blocks waiting to be transmitted.
    pub fn queued_blocks(&self) -> usize {
        self.queued.len()
    }

    fn set_state(&self, state: TransportState) {
        self.state.lock(|c| c.set(state));
    }
}

impl<M: RawMutex, const N: usize> Default for BlockQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of a [`BlockQueue`].
pub struct QueueOutput<'a, M: RawMutex, const N: usize> {
    queue: &'a BlockQueue<M, N>,
}

impl<M: RawMutex, const N: usize> AudioOutput for QueueOutput<'_, M, N> {
    type Error = BlockQueueError;

    fn pool_size(&self) -> usize {
        self.queue.provisioned.lock(Cell::get)
    }

    async fn acquire_block(&mut self) -> Result<AudioBlock, Self::Error> {
        Ok(self.queue.free.receive().await)
    }

    fn try_acquire_block(&mut self) -> Result<Option<AudioBlock>, Self::Error> {
        Ok(self.queue.free.try_receive().ok())
    }

    async fn submit(&mut self, block: AudioBlock) -> Result<(), Self::Error> {
        match self.queue.queued.try_send(block) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(block)) => {
                // Keep the block in circulation even though it was not queued.
                let _ = self.queue.free.try_send(block);
                Err(BlockQueueError::QueueFull)
            }
        }
    }

    async fn start(&mut self) -> Result<(), Self::Error> {
        self.queue.set_state(TransportState::Running);
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), Self::Error> {
        let next = if self.queue.queued.is_empty() {
            TransportState::Stopped
        } else {
            TransportState::Draining
        };
        self.queue.set_state(next);
        Ok(())
    }
}
