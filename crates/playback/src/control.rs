//! Control channel between producers (UI flow, volume pot) and the session.
//!
//! Commands travel through a bounded `embassy_sync` channel so producers never
//! touch session state. The session is the single consumer and applies
//! commands in order.
//!
//! # Wire record
//!
//! For links that carry commands as bytes (debug UART, host tooling) each
//! message is a fixed 72-byte record:
//!
//! ```text
//!  0      tag: 0 PLAY, 1 PAUSE, 2 RESUME, 3 VOLUME, 4 IDLE
//!  1..4   padding (zero)
//!  4..8   volume, u32 LE (VOLUME only)
//!  8..72  path, UTF-8, NUL-padded (PLAY only)
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Duration, Timer};
use heapless::String;
use platform::AnalogControl;

/// Queue depth of the control channel.
pub const CONTROL_DEPTH: usize = 8;
/// Longest track path a message can carry, in bytes.
pub const PATH_CAPACITY: usize = 64;
/// Size of one encoded control record.
pub const WIRE_LEN: usize = 8 + PATH_CAPACITY;

const TAG_PLAY: u8 = 0;
const TAG_PAUSE: u8 = 1;
const TAG_RESUME: u8 = 2;
const TAG_VOLUME: u8 = 3;
const TAG_IDLE: u8 = 4;

/// Track path carried by [`ControlMessage::Play`].
pub type TrackPath = String<PATH_CAPACITY>;

/// Channel carrying [`ControlMessage`]s.
pub type ControlChannel<M> = Channel<M, ControlMessage, CONTROL_DEPTH>;
/// Producer end of a [`ControlChannel`].
pub type ControlSender<'a, M> = Sender<'a, M, ControlMessage, CONTROL_DEPTH>;
/// Consumer end of a [`ControlChannel`].
pub type ControlReceiver<'a, M> = Receiver<'a, M, ControlMessage, CONTROL_DEPTH>;

/// Errors building or decoding a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Path does not fit in [`PATH_CAPACITY`] bytes.
    PathTooLong,
    /// Path is empty or not UTF-8.
    InvalidPath,
    /// Record tag is not a known command.
    UnknownTag(u8),
}

impl core::fmt::Display for ControlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PathTooLong => write!(f, "path longer than {PATH_CAPACITY} bytes"),
            Self::InvalidPath => f.write_str("path empty or not UTF-8"),
            Self::UnknownTag(t) => write!(f, "unknown control tag {t}"),
        }
    }
}

/// Command for the playback session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMessage {
    /// Start the track at `path`, replacing any active track.
    Play {
        /// Path relative to the storage root.
        path: TrackPath,
    },
    /// Stop advancing the stream; keep the track open.
    Pause,
    /// Continue a paused track.
    Resume,
    /// New volume level for subsequent blocks.
    SetVolume {
        /// Level in the configured policy's units.
        value: u32,
    },
    /// No-op; wakes the session without changing anything.
    Idle,
}

impl ControlMessage {
    /// Build a `Play` message.
    ///
    /// # Errors
    ///
    /// [`ControlError::InvalidPath`] for an empty path,
    /// [`ControlError::PathTooLong`] beyond [`PATH_CAPACITY`] bytes.
    pub fn play(path: &str) -> Result<Self, ControlError> {
        if path.is_empty() || path.contains('\0') {
            return Err(ControlError::InvalidPath);
        }
        let mut owned = TrackPath::new();
        owned.push_str(path).map_err(|_| ControlError::PathTooLong)?;
        Ok(Self::Play { path: owned })
    }

    fn tag(&self) -> u8 {
        match self {
            Self::Play { .. } => TAG_PLAY,
            Self::Pause => TAG_PAUSE,
            Self::Resume => TAG_RESUME,
            Self::SetVolume { .. } => TAG_VOLUME,
            Self::Idle => TAG_IDLE,
        }
    }

    /// Encode as a fixed wire record.
    pub fn encode(&self) -> [u8; WIRE_LEN] {
        let mut out = [0u8; WIRE_LEN];
        let (head, path_field) = out.split_at_mut(8);
        if let Some(tag) = head.first_mut() {
            *tag = self.tag();
        }
        match self {
            Self::SetVolume { value } => {
                if let Some(field) = head.get_mut(4..8) {
                    field.copy_from_slice(&value.to_le_bytes());
                }
            }
            Self::Play { path } => {
                let bytes = path.as_bytes();
                if let Some(field) = path_field.get_mut(..bytes.len()) {
                    field.copy_from_slice(bytes);
                }
            }
            Self::Pause | Self::Resume | Self::Idle => {}
        }
        out
    }

    /// Decode a wire record.
    ///
    /// # Errors
    ///
    /// [`ControlError::UnknownTag`] for an unknown tag,
    /// [`ControlError::InvalidPath`] for an empty or non-UTF-8 `PLAY` path.
    pub fn decode(raw: &[u8; WIRE_LEN]) -> Result<Self, ControlError> {
        let (head, path_field) = raw.split_at(8);
        let [tag, _, _, _, v0, v1, v2, v3] = <[u8; 8]>::try_from(head)
            .map_err(|_| ControlError::UnknownTag(0))?;
        match tag {
            TAG_PLAY => {
                let end = path_field
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(path_field.len());
                let text = path_field
                    .get(..end)
                    .and_then(|b| core::str::from_utf8(b).ok())
                    .ok_or(ControlError::InvalidPath)?;
                Self::play(text)
            }
            TAG_PAUSE => Ok(Self::Pause),
            TAG_RESUME => Ok(Self::Resume),
            TAG_VOLUME => Ok(Self::SetVolume {
                value: u32::from_le_bytes([v0, v1, v2, v3]),
            }),
            TAG_IDLE => Ok(Self::Idle),
            other => Err(ControlError::UnknownTag(other)),
        }
    }
}

/// Enqueue `msg` without waiting.
///
/// Returns `false` (and logs) when the channel is full and the message was
/// dropped. Producers that sample continuously use this so a busy session
/// never stalls them.
pub fn try_send_control<M: RawMutex>(tx: &ControlSender<'_, M>, msg: ControlMessage) -> bool {
    match tx.try_send(msg) {
        Ok(()) => true,
        Err(_) => {
            warn!("control channel full, message dropped");
            false
        }
    }
}

/// Turns raw pot readings into `SetVolume` levels only when they move.
///
/// ADC readings jitter by a few counts; without hysteresis every sample would
/// become a message. The ends of the range always pass so the pot can reach
/// silence and full volume exactly.
#[derive(Debug, Clone, Copy)]
pub struct VolumeFilter {
    threshold: u16,
    full_scale: u16,
    last: Option<u16>,
}

impl VolumeFilter {
    /// Filter that reports changes of at least `threshold` counts.
    pub const fn new(threshold: u16, full_scale: u16) -> Self {
        Self { threshold, full_scale, last: None }
    }

    /// Feed one reading; returns the level to send, if any.
    pub fn update(&mut self, reading: u16) -> Option<u32> {
        let reading = reading.min(self.full_scale);
        let report = match self.last {
            None => true,
            Some(last) if last == reading => false,
            Some(last) => {
                last.abs_diff(reading) >= self.threshold
                    || reading == 0
                    || reading == self.full_scale
            }
        };
        if report {
            self.last = Some(reading);
            Some(u32::from(reading))
        } else {
            None
        }
    }
}

/// Take one reading and enqueue a `SetVolume` if the filter lets it through.
///
/// Returns `true` when a message was enqueued.
pub async fn sample_volume<A: AnalogControl, M: RawMutex>(
    pot: &mut A,
    filter: &mut VolumeFilter,
    tx: &ControlSender<'_, M>,
) -> bool {
    match pot.read().await {
        Ok(reading) => match filter.update(reading) {
            Some(value) => try_send_control(tx, ControlMessage::SetVolume { value }),
            None => false,
        },
        Err(_) => {
            warn!("volume pot read failed");
            false
        }
    }
}

/// Volume sampling task: read the pot every `period` forever.
pub async fn volume_sampler<A: AnalogControl, M: RawMutex>(
    mut pot: A,
    mut filter: VolumeFilter,
    tx: ControlSender<'_, M>,
    period: Duration,
) -> ! {
    loop {
        sample_volume(&mut pot, &mut filter, &tx).await;
        Timer::after(period).await;
    }
}
