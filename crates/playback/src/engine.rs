//! Playback state machine.
//!
//! `PlaybackEngine` is a pure, `no_std`, allocation-free state machine that
//! tracks the session's state and the rendered position within the active
//! track. It has no I/O: the session drives storage, decoder and output, and
//! asks the engine which transitions are legal.
//!
//! ```text
//!          open()           opened()
//!  Idle ───────────▶ Opening ─────────▶ Streaming ◀──┐
//!   ▲                   │                 │  pause()  │ resume()
//!   │                   │                 ▼           │
//!   │                   │               Paused ───────┘
//!   └───── finish(Completed | Failed | Superseded) ◀──┘ (from any active state)
//! ```

use crate::error::PlaybackError;

/// Current session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    /// No track open.
    Idle,
    /// Opening a track: headers, pre-fill, transport start.
    Opening,
    /// Decoding and queueing blocks.
    Streaming,
    /// Track open, stream not advancing, commands still serviced.
    Paused,
}

/// How the last track ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackOutcome {
    /// Reached the end of the stream.
    Completed,
    /// Stopped on an error.
    Failed(PlaybackError),
    /// Replaced by a new `Play` before finishing.
    Superseded,
}

/// Illegal transition requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateError {
    /// The operation needs an open track.
    NotActive,
    /// A track is already open; finish it first.
    AlreadyActive,
    /// The operation is only valid while opening.
    NotOpening,
}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotActive => f.write_str("no active track"),
            Self::AlreadyActive => f.write_str("a track is already active"),
            Self::NotOpening => f.write_str("no track is being opened"),
        }
    }
}

/// Pure state machine for the playback session.
///
/// All fields are private; state is mutated only through the method API.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    state: PlaybackState,
    frames: u64,
    sample_rate: u32,
    last_outcome: Option<TrackOutcome>,
}

impl PlaybackEngine {
    /// Create an idle engine counting position at `sample_rate` frames per second.
    pub const fn new(sample_rate: u32) -> Self {
        Self {
            state: PlaybackState::Idle,
            frames: 0,
            sample_rate,
            last_outcome: None,
        }
    }

    /// Begin opening a track.
    ///
    /// # Errors
    ///
    /// [`StateError::AlreadyActive`] unless idle.
    pub fn open(&mut self) -> Result<(), StateError> {
        match self.state {
            PlaybackState::Idle => {
                self.state = PlaybackState::Opening;
                self.frames = 0;
                Ok(())
            }
            _ => Err(StateError::AlreadyActive),
        }
    }

    /// Track opened; start streaming.
    ///
    /// # Errors
    ///
    /// [`StateError::NotOpening`] unless opening.
    pub fn opened(&mut self) -> Result<(), StateError> {
        match self.state {
            PlaybackState::Opening => {
                self.state = PlaybackState::Streaming;
                Ok(())
            }
            _ => Err(StateError::NotOpening),
        }
    }

    /// Pause streaming. Idempotent while paused.
    ///
    /// # Errors
    ///
    /// [`StateError::NotActive`] when idle or still opening.
    pub fn pause(&mut self) -> Result<(), StateError> {
        match self.state {
            PlaybackState::Streaming | PlaybackState::Paused => {
                self.state = PlaybackState::Paused;
                Ok(())
            }
            PlaybackState::Idle | PlaybackState::Opening => Err(StateError::NotActive),
        }
    }

    /// Resume streaming. Idempotent while streaming.
    ///
    /// # Errors
    ///
    /// [`StateError::NotActive`] when idle or still opening.
    pub fn resume(&mut self) -> Result<(), StateError> {
        match self.state {
            PlaybackState::Streaming | PlaybackState::Paused => {
                self.state = PlaybackState::Streaming;
                Ok(())
            }
            PlaybackState::Idle | PlaybackState::Opening => Err(StateError::NotActive),
        }
    }

    /// End the track and return to idle. Always succeeds.
    pub fn finish(&mut self, outcome: TrackOutcome) {
        self.state = PlaybackState::Idle;
        self.last_outcome = Some(outcome);
    }

    /// Count `frames` rendered frames toward the position.
    pub fn advance(&mut self, frames: usize) {
        self.frames = self.frames.saturating_add(frames as u64);
    }

    /// Return the current [`PlaybackState`].
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// A track is open (opening, streaming or paused).
    pub fn is_active(&self) -> bool {
        self.state != PlaybackState::Idle
    }

    /// Frames rendered for the current (or last) track.
    pub fn position_frames(&self) -> u64 {
        self.frames
    }

    /// Rendered position in milliseconds.
    pub fn position_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames.saturating_mul(1000) / u64::from(self.sample_rate)
    }

    /// Outcome of the most recently finished track.
    pub fn last_outcome(&self) -> Option<TrackOutcome> {
        self.last_outcome
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(48_000)
    }
}
