//! Error types for the playback core.
//!
//! Every error ends the current track; none is retried.

/// Container or stream-format problem found while reading a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FormatError {
    /// Fewer bytes than required were available (or the read failed).
    Truncated,
    /// Page capture pattern is not `OggS` or the stream version is not 0.
    NotOgg,
    /// Identification header magic is not `OpusHead`.
    NotOpus,
    /// Comment header magic is not `OpusTags`.
    MissingTags,
    /// Lacing produced a zero-length packet.
    EmptyPacket,
    /// Packet longer than 65535 bytes or than the caller's buffer.
    PacketTooLarge,
    /// Pre-skip exceeds the samples produced by the first decode.
    DiscardExceedsFrame,
    /// Identification header declares 0 or more than 2 channels.
    UnsupportedChannels(u8),
    /// A page continuing a packet lacks the continuation flag (or vice versa).
    BrokenContinuation,
}

impl core::fmt::Display for FormatError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated => f.write_str("stream truncated"),
            Self::NotOgg => f.write_str("not an Ogg stream"),
            Self::NotOpus => f.write_str("missing OpusHead identification header"),
            Self::MissingTags => f.write_str("missing OpusTags comment header"),
            Self::EmptyPacket => f.write_str("zero-length packet"),
            Self::PacketTooLarge => f.write_str("packet exceeds buffer"),
            Self::DiscardExceedsFrame => f.write_str("pre-skip larger than first decoded frame"),
            Self::UnsupportedChannels(n) => write!(f, "unsupported channel count {n}"),
            Self::BrokenContinuation => f.write_str("page continuation flag mismatch"),
        }
    }
}

/// Why a track stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackError {
    /// The Ogg/Opus stream is malformed or truncated.
    Format(FormatError),
    /// Storage could not open the path.
    OpenFailed,
    /// The external decoder rejected a packet.
    DecodeFailed,
    /// Block acquisition, submission or a transport trigger failed.
    OutputFailed,
    /// No output block was free (non-blocking step only).
    ResourceExhausted,
}

impl PlaybackError {
    /// `true` when the error ends the track; `ResourceExhausted` only asks
    /// the caller to try again later.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ResourceExhausted)
    }
}

impl From<FormatError> for PlaybackError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

impl core::fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Format(e) => write!(f, "format error: {e}"),
            Self::OpenFailed => f.write_str("could not open track"),
            Self::DecodeFailed => f.write_str("decoder error"),
            Self::OutputFailed => f.write_str("audio output error"),
            Self::ResourceExhausted => f.write_str("no free output block"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}

#[cfg(feature = "std")]
impl std::error::Error for PlaybackError {}
