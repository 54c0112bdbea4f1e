//! Packet assembler: rebuilds Opus packets from Ogg lacing.
//!
//! Lacing values are summed until one below 255 ends the packet. When a page
//! runs out mid-packet, the fragment already on that page is copied into the
//! caller's buffer, the next page header is read, and accumulation continues
//! into the same packet. The caller's buffer is the only packet storage.

use platform::File;

use crate::error::FormatError;
use crate::ogg::{read_exact, OggPageCursor, GRANULE_NONE, LACING_CONTINUE};

/// Largest packet the assembler will produce.
pub const MAX_PACKET_LEN: usize = 65_535;

/// How a page that continues a packet is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContinuationPolicy {
    /// Merge lacing across page boundaries without looking at header flags.
    #[default]
    Lenient,
    /// The page's continuation flag must agree with whether a packet is open.
    Strict,
}

impl ContinuationPolicy {
    /// Decide whether a freshly loaded page may follow the current packet state.
    ///
    /// # Errors
    ///
    /// [`FormatError::BrokenContinuation`] under `Strict` when the flag disagrees.
    pub fn accept(self, packet_open: bool, page_continued: bool) -> Result<(), FormatError> {
        match self {
            Self::Lenient => Ok(()),
            Self::Strict if packet_open == page_continued => Ok(()),
            Self::Strict => Err(FormatError::BrokenContinuation),
        }
    }
}

/// Result of one [`DemuxState::next_packet`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketOutcome {
    /// A packet of this many bytes; more follow.
    Packet(usize),
    /// The last packet of the stream, of this many bytes.
    Done(usize),
    /// The stream ended on an empty last page; no packet was produced.
    End,
}

impl PacketOutcome {
    /// Packet length, if a packet was produced.
    pub fn len(self) -> Option<usize> {
        match self {
            Self::Packet(n) | Self::Done(n) => Some(n),
            Self::End => None,
        }
    }

    /// `true` when the caller must stop asking for packets.
    pub fn is_last(self) -> bool {
        !matches!(self, Self::Packet(_))
    }
}

/// Demux state carried between packets of one track.
#[derive(Debug, Clone)]
pub struct DemuxState {
    page: OggPageCursor,
    policy: ContinuationPolicy,
    pages: u32,
    packets: u32,
    granule: u64,
}

impl DemuxState {
    /// Fresh state; the first call loads a page.
    pub const fn new(policy: ContinuationPolicy) -> Self {
        Self {
            page: OggPageCursor::new(),
            policy,
            pages: 0,
            packets: 0,
            granule: 0,
        }
    }

    /// Current page cursor.
    pub fn page(&self) -> &OggPageCursor {
        &self.page
    }

    /// Pages read so far.
    pub fn pages_read(&self) -> u32 {
        self.pages
    }

    /// Packets produced so far.
    pub fn packets_read(&self) -> u32 {
        self.packets
    }

    /// Granule position of the latest page on which a packet ended.
    pub fn granule_position(&self) -> u64 {
        self.granule
    }

    /// Assemble the next packet into `out`.
    ///
    /// # Errors
    ///
    /// - [`FormatError::EmptyPacket`] for a zero-length packet
    /// - [`FormatError::PacketTooLarge`] when the packet exceeds `out` or 65535 bytes
    /// - [`FormatError::Truncated`] on a short read, including a last page that
    ///   ends mid-packet
    /// - page reader errors and [`FormatError::BrokenContinuation`] (strict mode)
    pub async fn next_packet<F: File>(
        &mut self,
        file: &mut F,
        out: &mut [u8],
    ) -> Result<PacketOutcome, FormatError> {
        let limit = out.len().min(MAX_PACKET_LEN);
        let mut len = 0usize;
        let mut copied = 0usize;

        if self.page.remaining() == 0 {
            self.load_page(file, false).await?;
        }

        loop {
            if let Some(value) = self.page.next_lacing() {
                len = len.saturating_add(usize::from(value));
                if len > limit {
                    return Err(FormatError::PacketTooLarge);
                }
                if value < LACING_CONTINUE {
                    break;
                }
                continue;
            }

            // Page exhausted without a terminating lacing value.
            if len == 0 && self.page.is_eos() {
                debug!("stream ended on an empty last page");
                return Ok(PacketOutcome::End);
            }
            if len > 0 {
                if self.page.is_eos() {
                    return Err(FormatError::Truncated);
                }
                let fragment = out.get_mut(copied..len).ok_or(FormatError::PacketTooLarge)?;
                read_exact(file, fragment).await?;
                copied = len;
            }
            self.load_page(file, len > 0).await?;
        }

        if len == 0 {
            return Err(FormatError::EmptyPacket);
        }
        let rest = out.get_mut(copied..len).ok_or(FormatError::PacketTooLarge)?;
        read_exact(file, rest).await?;
        self.packets = self.packets.saturating_add(1);

        if self.page.remaining() == 0 && self.page.is_eos() {
            Ok(PacketOutcome::Done(len))
        } else {
            Ok(PacketOutcome::Packet(len))
        }
    }

    async fn load_page<F: File>(&mut self, file: &mut F, packet_open: bool) -> Result<(), FormatError> {
        self.page.load(file).await?;
        self.pages = self.pages.saturating_add(1);
        let header = self.page.header();
        self.policy.accept(packet_open, header.is_continued())?;
        if header.granule_position != GRANULE_NONE {
            self.granule = header.granule_position;
        }
        Ok(())
    }
}
