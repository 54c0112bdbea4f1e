//! Opus stream header verification.
//!
//! Every Ogg Opus stream opens with two header packets, each on its own page:
//!
//! ```text
//! OpusHead (19 bytes + optional channel mapping table)
//!   0..8   "OpusHead"
//!   8      version
//!   9      output channel count
//!  10..12  pre-skip (u16 LE, samples per channel at 48 kHz)
//!  12..16  input sample rate (u32 LE, informational)
//!  16..18  output gain (i16 LE, Q7.8 dB)
//!  18      channel mapping family
//!
//! OpusTags
//!   0..8   "OpusTags"
//!   u32 LE vendor length, vendor bytes
//!   u32 LE comment count, then per comment: u32 LE length, bytes
//! ```
//!
//! Comment data is informational. Only a bounded prefix of the comment packet
//! is parsed; the remainder (cover art and the like) is skipped, including
//! pages the packet continues onto.

use heapless::{String, Vec};
use platform::File;

use crate::error::FormatError;
use crate::ogg::{read_exact, skip, OggPageCursor};

/// Size of the fixed identification header.
pub const ID_HEADER_LEN: usize = 19;
/// Identification header magic.
pub const OPUS_HEAD: &[u8; 8] = b"OpusHead";
/// Comment header magic.
pub const OPUS_TAGS: &[u8; 8] = b"OpusTags";
/// Bytes of the comment packet that are parsed; the rest is skipped.
pub const TAGS_PREFIX_LEN: usize = 512;
/// Comments kept in [`OpusStreamInfo::comments`].
pub const MAX_COMMENTS: usize = 8;
/// Bytes kept per comment.
pub const COMMENT_CAPACITY: usize = 96;
/// Bytes kept of the vendor string.
pub const VENDOR_CAPACITY: usize = 64;

/// One `key=value` comment, possibly shortened to [`COMMENT_CAPACITY`].
pub type Comment = String<COMMENT_CAPACITY>;

/// Parameters of one Opus stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpusStreamInfo {
    /// Encapsulation version.
    pub version: u8,
    /// Channel count.
    pub channels: u8,
    /// Samples per channel to drop at the start of decoding.
    pub pre_skip: u16,
    /// Sample rate of the original input (informational).
    pub input_sample_rate: u32,
    /// Output gain, Q7.8 dB (not applied).
    pub output_gain: i16,
    /// Channel mapping family.
    pub mapping_family: u8,
    /// Encoder vendor string.
    pub vendor: String<VENDOR_CAPACITY>,
    /// User comments in stream order.
    pub comments: Vec<Comment, MAX_COMMENTS>,
    /// Comments present in the stream but not kept.
    pub comments_dropped: u32,
}

impl OpusStreamInfo {
    /// Interleaved samples to discard from the first decoded block.
    pub fn discard_samples(&self, output_channels: usize) -> usize {
        usize::from(self.pre_skip).saturating_mul(output_channels)
    }

    /// Value of the first comment whose key matches `key` (ASCII case-insensitive).
    pub fn comment(&self, key: &str) -> Option<&str> {
        self.comments.iter().find_map(|c| {
            let (k, v) = c.split_once('=')?;
            k.eq_ignore_ascii_case(key).then_some(v)
        })
    }

    /// Parse the fixed 19-byte identification header.
    ///
    /// # Errors
    ///
    /// [`FormatError::NotOpus`] on a bad magic,
    /// [`FormatError::UnsupportedChannels`] for 0 or more than 2 channels.
    pub fn parse_id_header(raw: &[u8; ID_HEADER_LEN]) -> Result<Self, FormatError> {
        let [m0, m1, m2, m3, m4, m5, m6, m7, version, channels, p0, p1, r0, r1, r2, r3, g0, g1, mapping_family] =
            *raw;
        if [m0, m1, m2, m3, m4, m5, m6, m7] != *OPUS_HEAD {
            return Err(FormatError::NotOpus);
        }
        if channels == 0 || channels > 2 {
            return Err(FormatError::UnsupportedChannels(channels));
        }
        Ok(Self {
            version,
            channels,
            pre_skip: u16::from_le_bytes([p0, p1]),
            input_sample_rate: u32::from_le_bytes([r0, r1, r2, r3]),
            output_gain: i16::from_le_bytes([g0, g1]),
            mapping_family,
            ..Self::default()
        })
    }

    /// Parse vendor and comments from the start of a comment packet.
    ///
    /// `prefix` may be cut short anywhere; parsing stops quietly at the cut.
    /// Fields that do not fit their storage are shortened or dropped.
    ///
    /// # Errors
    ///
    /// [`FormatError::MissingTags`] if `prefix` does not start with `OpusTags`.
    pub fn parse_comments(&mut self, prefix: &[u8]) -> Result<(), FormatError> {
        if prefix.get(..OPUS_TAGS.len()) != Some(OPUS_TAGS.as_slice()) {
            return Err(FormatError::MissingTags);
        }
        let mut reader = LeReader::new(prefix.get(OPUS_TAGS.len()..).unwrap_or(&[]));

        let Some(vendor) = reader.length_prefixed() else {
            debug!("comment header ends before vendor string");
            return Ok(());
        };
        push_utf8_prefix(&mut self.vendor, vendor);
        debug!("opus vendor: {}", self.vendor.as_str());

        let Some(count) = reader.u32() else {
            return Ok(());
        };
        for index in 0..count {
            let Some(bytes) = reader.length_prefixed() else {
                debug!("comment parsing stopped at {} of {}", index, count);
                self.comments_dropped = count.saturating_sub(index);
                break;
            };
            let mut comment = Comment::new();
            if !push_utf8_prefix(&mut comment, bytes) {
                self.comments_dropped = self.comments_dropped.saturating_add(1);
                continue;
            }
            debug!("opus tag: {}", comment.as_str());
            if self.comments.push(comment).is_err() {
                self.comments_dropped = self.comments_dropped.saturating_add(1);
            }
        }
        Ok(())
    }
}

/// Read and check both header packets. The stream is left at the first audio page.
///
/// # Errors
///
/// [`FormatError::Truncated`], [`FormatError::NotOgg`], [`FormatError::NotOpus`],
/// [`FormatError::UnsupportedChannels`] or [`FormatError::MissingTags`].
pub async fn verify_headers<F: File>(file: &mut F) -> Result<OpusStreamInfo, FormatError> {
    let mut page = OggPageCursor::new();

    // Identification header: the whole first page.
    page.load(file).await?;
    let id_len = page.payload_len();
    let mut raw = [0u8; ID_HEADER_LEN];
    read_exact(file, &mut raw).await?;
    let mut info = OpusStreamInfo::parse_id_header(&raw)?;
    skip(file, id_len.saturating_sub(ID_HEADER_LEN)).await?;
    info!(
        "OpusHead: channels={} pre_skip={} rate={} gain={}",
        info.channels,
        info.pre_skip,
        info.input_sample_rate,
        info.output_gain
    );

    // Comment header: parse a bounded prefix, skip the rest.
    page.load(file).await?;
    let tags_len = page.payload_len();
    let mut prefix = [0u8; TAGS_PREFIX_LEN];
    let head_len = tags_len.min(TAGS_PREFIX_LEN);
    let head = prefix.get_mut(..head_len).ok_or(FormatError::Truncated)?;
    read_exact(file, head).await?;
    info.parse_comments(head)?;
    skip(file, tags_len.saturating_sub(head_len)).await?;

    // Comment packets carrying cover art run over several pages.
    while page.ends_mid_packet() {
        page.load(file).await?;
        skip(file, page.payload_len()).await?;
    }

    Ok(info)
}

/// Push as much of `bytes` as is valid UTF-8 and fits. `false` if nothing fit.
fn push_utf8_prefix<const N: usize>(dst: &mut String<N>, bytes: &[u8]) -> bool {
    let take = bytes.len().min(N);
    let candidate = bytes.get(..take).unwrap_or(&[]);
    let text = match core::str::from_utf8(candidate) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(candidate.get(..e.valid_up_to()).unwrap_or(&[]))
            .unwrap_or(""),
    };
    if text.is_empty() && !bytes.is_empty() {
        return false;
    }
    dst.push_str(text).is_ok()
}

/// Little-endian field reader over a byte slice.
struct LeReader<'a> {
    buf: &'a [u8],
}

impl<'a> LeReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.buf.len() {
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    fn u32(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    fn length_prefixed(&mut self) -> Option<&'a [u8]> {
        let len = usize::try_from(self.u32()?).ok()?;
        self.take(len)
    }
}
