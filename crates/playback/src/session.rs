//! Playback session: owns one track at a time and drives it from storage to
//! the output pool.
//!
//! # Iteration
//!
//! ```text
//!  storage ──▶ DemuxState::next_packet ──▶ OpusDecoder::decode ──▶ discard ──▶ volume ──▶ AudioOutput::submit
//!                  (packet buffer)             (output block)       (once)
//! ```
//!
//! Each streaming iteration turns exactly one packet into one output block.
//! [`step`](PlaybackSession::step) waits for a free block (backpressure);
//! [`try_step`](PlaybackSession::try_step) takes the block first and reports
//! [`PlaybackError::ResourceExhausted`] without touching the stream when the
//! pool is empty.
//!
//! Every fatal error, the end of the stream and a superseding `Play` all run
//! the same teardown: drop the file handle, reset the decoder, drain the
//! transport, return to [`PlaybackState::Idle`].

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::with_timeout;
use platform::{AudioBlock, AudioOutput, Storage};

use crate::config::{ConfigError, PlaybackConfig};
use crate::control::{ControlMessage, ControlReceiver, TrackPath};
use crate::decoder::OpusDecoder;
use crate::demux::{DemuxState, PacketOutcome};
use crate::engine::{PlaybackEngine, PlaybackState, TrackOutcome};
use crate::error::{FormatError, PlaybackError};
use crate::opus_header::{verify_headers, OpusStreamInfo};

/// Default packet buffer size. Opus packets from common encoders stay well
/// below 1500 bytes; 4 KB leaves room for 120 ms frames at high bitrates.
pub const DEFAULT_PACKET_BUFFER: usize = 4096;

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Nothing to do: idle or paused.
    Waiting,
    /// One block of this many frames was queued.
    Queued(usize),
    /// The track reached its end and was torn down.
    Completed,
}

/// Counters across the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    /// Tracks that reached `Streaming`.
    pub tracks_started: u32,
    /// Tracks that played to the end.
    pub tracks_completed: u32,
    /// Tracks stopped by an error, including during opening.
    pub tracks_failed: u32,
    /// Tracks replaced by a newer `Play`.
    pub tracks_superseded: u32,
    /// Packets decoded and rendered.
    pub packets_decoded: u32,
    /// Blocks handed to the output, pre-fill included.
    pub blocks_submitted: u32,
    /// Interleaved samples dropped by pre-skip.
    pub samples_discarded: u64,
}

struct ActiveTrack<F> {
    file: F,
    demux: DemuxState,
    info: OpusStreamInfo,
    pending_discard: usize,
    path: TrackPath,
}

/// Decode-render loop for one output.
///
/// `P` is the packet buffer size in bytes; packets longer than that fail the
/// track with [`FormatError::PacketTooLarge`].
pub struct PlaybackSession<S, D, O, const P: usize = DEFAULT_PACKET_BUFFER>
where
    S: Storage,
    D: OpusDecoder,
    O: AudioOutput,
{
    storage: S,
    decoder: D,
    output: O,
    config: PlaybackConfig,
    engine: PlaybackEngine,
    track: Option<ActiveTrack<S::File>>,
    // Block taken from the pool but not submitted; used before the pool.
    spare: Option<AudioBlock>,
    volume: u32,
    packet: [u8; P],
    stats: SessionStats,
}

impl<S, D, O, const P: usize> PlaybackSession<S, D, O, P>
where
    S: Storage,
    D: OpusDecoder,
    O: AudioOutput,
{
    /// Build an idle session.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when `config` does not validate.
    pub fn new(storage: S, decoder: D, output: O, config: PlaybackConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            storage,
            decoder,
            output,
            engine: PlaybackEngine::new(config.sample_rate),
            track: None,
            spare: None,
            volume: config.initial_volume,
            packet: [0; P],
            stats: SessionStats::default(),
            config,
        })
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Apply one control message.
    ///
    /// `Play` failures are recorded in [`last_outcome`](Self::last_outcome)
    /// rather than returned; the session is idle again afterwards.
    pub async fn handle(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::Play { path } => {
                let _ = self.open(&path).await;
            }
            ControlMessage::Pause => match self.engine.pause() {
                Ok(()) => debug!("paused at {} ms", self.engine.position_ms()),
                Err(e) => debug!("pause ignored: {}", e),
            },
            ControlMessage::Resume => match self.engine.resume() {
                Ok(()) => debug!("resumed at {} ms", self.engine.position_ms()),
                Err(e) => debug!("resume ignored: {}", e),
            },
            ControlMessage::SetVolume { value } => {
                trace!("volume {}", value);
                self.volume = value;
            }
            ControlMessage::Idle => {}
        }
    }

    /// Open `path` and start streaming it, tearing down any active track first.
    ///
    /// # Errors
    ///
    /// The error that stopped the track while opening. The session is idle
    /// and the failure is recorded as the last outcome.
    pub async fn open(&mut self, path: &str) -> Result<(), PlaybackError> {
        if self.engine.is_active() {
            self.finish(TrackOutcome::Superseded).await;
        }
        // Idle after the teardown above, so this cannot be rejected.
        let _ = self.engine.open();
        info!("opening {}", path);

        match self.open_track(path).await {
            Ok(track) => {
                info!(
                    "streaming {}: {} ch, pre-skip {}, source {} Hz",
                    path,
                    track.info.channels,
                    track.info.pre_skip,
                    track.info.input_sample_rate
                );
                self.track = Some(track);
                let _ = self.engine.opened();
                self.stats.tracks_started = self.stats.tracks_started.saturating_add(1);
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn open_track(&mut self, path: &str) -> Result<ActiveTrack<S::File>, PlaybackError> {
        let mut owned = TrackPath::new();
        owned.push_str(path).map_err(|_| PlaybackError::OpenFailed)?;

        let mut file = self.storage.open_file(path).await.map_err(|_| {
            warn!("cannot open {}", path);
            PlaybackError::OpenFailed
        })?;
        let info = verify_headers(&mut file).await?;
        for comment in &info.comments {
            debug!("tag {}", comment.as_str());
        }
        let pending_discard = info.discard_samples(usize::from(self.config.channels));

        self.prefill().await?;
        self.output.start().await.map_err(|_| PlaybackError::OutputFailed)?;

        Ok(ActiveTrack {
            file,
            demux: DemuxState::new(self.config.continuation),
            info,
            pending_discard,
            path: owned,
        })
    }

    /// Queue up to `prefill_blocks` silent blocks, only those free right now.
    async fn prefill(&mut self) -> Result<(), PlaybackError> {
        for _ in 0..self.config.prefill_blocks {
            let Some(mut block) = self.try_acquire()? else {
                break;
            };
            block.fill_silence();
            block.set_len(self.config.block_samples());
            self.submit(block).await?;
        }
        Ok(())
    }

    // ── Streaming ────────────────────────────────────────────────────────

    /// Run one streaming iteration, waiting for a free block.
    ///
    /// Returns [`Step::Waiting`] unless streaming.
    ///
    /// # Errors
    ///
    /// The error that ended the track; the session is idle again.
    pub async fn step(&mut self) -> Result<Step, PlaybackError> {
        if self.engine.state() != PlaybackState::Streaming {
            return Ok(Step::Waiting);
        }
        let outcome = match self.next_packet().await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e).await),
        };
        let Some(len) = outcome.len() else {
            self.complete().await;
            return Ok(Step::Completed);
        };
        let block = match self.acquire().await {
            Ok(block) => block,
            Err(e) => return Err(self.fail(e).await),
        };
        self.render_packet(block, len, outcome.is_last()).await
    }

    /// Run one streaming iteration without waiting for the pool.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::ResourceExhausted`] when no block is free; nothing
    /// changed and the call can be retried. Any other error ended the track.
    pub async fn try_step(&mut self) -> Result<Step, PlaybackError> {
        if self.engine.state() != PlaybackState::Streaming {
            return Ok(Step::Waiting);
        }
        let block = match self.try_acquire() {
            Ok(Some(block)) => block,
            Ok(None) => return Err(PlaybackError::ResourceExhausted),
            Err(e) => return Err(self.fail(e).await),
        };
        let outcome = match self.next_packet().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.spare = Some(block);
                return Err(self.fail(e).await);
            }
        };
        let Some(len) = outcome.len() else {
            self.spare = Some(block);
            self.complete().await;
            return Ok(Step::Completed);
        };
        self.render_packet(block, len, outcome.is_last()).await
    }

    /// Service the control channel once, then advance the stream.
    ///
    /// While streaming the receive waits at most `poll_timeout`; idle or
    /// paused, it waits for the next message.
    ///
    /// # Errors
    ///
    /// As [`step`](Self::step).
    pub async fn poll<M: RawMutex>(&mut self, rx: &ControlReceiver<'_, M>) -> Result<Step, PlaybackError> {
        if self.engine.state() == PlaybackState::Streaming {
            if let Ok(msg) = with_timeout(self.config.poll_timeout, rx.receive()).await {
                self.handle(msg).await;
            }
            self.step().await
        } else {
            let msg = rx.receive().await;
            self.handle(msg).await;
            Ok(Step::Waiting)
        }
    }

    /// Session task body.
    pub async fn run<M: RawMutex>(&mut self, rx: ControlReceiver<'_, M>) -> ! {
        info!("playback session ready");
        loop {
            // Errors are logged and recorded by the teardown.
            let _ = self.poll(&rx).await;
        }
    }

    /// Open `path` and stream it to the end without servicing commands.
    ///
    /// Returns how the track ended.
    pub async fn play_to_end(&mut self, path: &str) -> TrackOutcome {
        if let Err(e) = self.open(path).await {
            return TrackOutcome::Failed(e);
        }
        while self.engine.state() == PlaybackState::Streaming {
            if let Err(e) = self.step().await {
                return TrackOutcome::Failed(e);
            }
        }
        self.engine.last_outcome().unwrap_or(TrackOutcome::Completed)
    }

    async fn next_packet(&mut self) -> Result<PacketOutcome, PlaybackError> {
        let Some(track) = self.track.as_mut() else {
            return Ok(PacketOutcome::End);
        };
        Ok(track.demux.next_packet(&mut track.file, &mut self.packet).await?)
    }

    async fn render_packet(&mut self, block: AudioBlock, len: usize, last: bool) -> Result<Step, PlaybackError> {
        match self.render(block, len).await {
            Ok(frames) => {
                self.engine.advance(frames);
                self.stats.packets_decoded = self.stats.packets_decoded.saturating_add(1);
                if last {
                    self.complete().await;
                    Ok(Step::Completed)
                } else {
                    Ok(Step::Queued(frames))
                }
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Decode the buffered packet into `block`, trim pre-skip, shape volume
    /// and submit. Returns the frames queued.
    async fn render(&mut self, mut block: AudioBlock, len: usize) -> Result<usize, PlaybackError> {
        let channels = usize::from(self.config.channels);
        let max_frames = self
            .config
            .frame_capacity
            .min(block.capacity().checked_div(channels).unwrap_or(0));
        if max_frames == 0 {
            self.spare = Some(block);
            return Err(PlaybackError::OutputFailed);
        }

        let Some(packet) = self.packet.get(..len) else {
            self.spare = Some(block);
            return Err(FormatError::PacketTooLarge.into());
        };
        let frames = match self.decoder.decode(packet, block.buffer_mut(), max_frames) {
            Ok(frames) if frames <= max_frames => frames,
            Ok(_) | Err(_) => {
                warn!("decoder rejected a {} byte packet", len);
                self.spare = Some(block);
                return Err(PlaybackError::DecodeFailed);
            }
        };

        let mut samples = frames.saturating_mul(channels);
        if let Some(track) = self.track.as_mut() {
            let discard = track.pending_discard;
            if discard > 0 {
                if discard > samples {
                    self.spare = Some(block);
                    return Err(FormatError::DiscardExceedsFrame.into());
                }
                // `samples` ≤ capacity: frames ≤ max_frames ≤ capacity / channels.
                block.buffer_mut().copy_within(discard..samples, 0);
                samples = samples.saturating_sub(discard);
                track.pending_discard = 0;
                self.stats.samples_discarded = self.stats.samples_discarded.saturating_add(discard as u64);
                trace!("pre-skip dropped {} samples", discard);
            }
        }

        block.set_len(samples);
        self.config.volume_policy.apply(self.volume, block.samples_mut());

        if block.is_empty() {
            self.spare = Some(block);
            return Ok(0);
        }
        self.submit(block).await?;
        Ok(samples.checked_div(channels).unwrap_or(0))
    }

    // ── Output pool ──────────────────────────────────────────────────────

    async fn acquire(&mut self) -> Result<AudioBlock, PlaybackError> {
        if let Some(block) = self.spare.take() {
            return Ok(block);
        }
        self.output.acquire_block().await.map_err(|_| PlaybackError::OutputFailed)
    }

    fn try_acquire(&mut self) -> Result<Option<AudioBlock>, PlaybackError> {
        if let Some(block) = self.spare.take() {
            return Ok(Some(block));
        }
        self.output.try_acquire_block().map_err(|_| PlaybackError::OutputFailed)
    }

    async fn submit(&mut self, block: AudioBlock) -> Result<(), PlaybackError> {
        self.output.submit(block).await.map_err(|_| PlaybackError::OutputFailed)?;
        self.stats.blocks_submitted = self.stats.blocks_submitted.saturating_add(1);
        Ok(())
    }

    // ── Teardown ─────────────────────────────────────────────────────────

    async fn complete(&mut self) {
        info!("track complete at {} ms", self.engine.position_ms());
        self.finish(TrackOutcome::Completed).await;
    }

    async fn fail(&mut self, e: PlaybackError) -> PlaybackError {
        error!("track failed: {}", e);
        self.finish(TrackOutcome::Failed(e)).await;
        e
    }

    async fn finish(&mut self, outcome: TrackOutcome) {
        if let Some(track) = self.track.take() {
            debug!("closing {}", track.path.as_str());
        }
        self.decoder.reset();
        if self.output.drain().await.is_err() {
            warn!("transport drain failed");
        }
        match outcome {
            TrackOutcome::Completed => {
                self.stats.tracks_completed = self.stats.tracks_completed.saturating_add(1);
            }
            TrackOutcome::Failed(_) => {
                self.stats.tracks_failed = self.stats.tracks_failed.saturating_add(1);
            }
            TrackOutcome::Superseded => {
                self.stats.tracks_superseded = self.stats.tracks_superseded.saturating_add(1);
            }
        }
        self.engine.finish(outcome);
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    /// Volume level applied to the next block.
    pub fn volume(&self) -> u32 {
        self.volume
    }

    /// Lifetime counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// How the most recent track ended.
    pub fn last_outcome(&self) -> Option<TrackOutcome> {
        self.engine.last_outcome()
    }

    /// Rendered position of the current (or last) track in milliseconds.
    pub fn position_ms(&self) -> u64 {
        self.engine.position_ms()
    }

    /// Header info of the active track.
    pub fn stream_info(&self) -> Option<&OpusStreamInfo> {
        self.track.as_ref().map(|t| &t.info)
    }

    /// Path of the active track.
    pub fn current_path(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.path.as_str())
    }

    /// Interleaved samples still to drop from the start of the active track.
    pub fn pending_discard(&self) -> Option<usize> {
        self.track.as_ref().map(|t| t.pending_discard)
    }

    /// Session configuration.
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Output transport.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Output transport, mutable (test harnesses release blocks through it).
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Storage backend.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}
