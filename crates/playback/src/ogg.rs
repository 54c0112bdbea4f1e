//! Ogg page reader.
//!
//! Reads one page header and its lacing table from a byte stream and keeps a
//! cursor into the lacing values. Payload bytes are left in the stream for the
//! packet assembler to pull.
//!
//! Page header layout (27 bytes, little-endian):
//!
//! ```text
//!  0..4   "OggS" capture pattern
//!  4      stream structure version (0)
//!  5      header type: 0x01 continued, 0x02 first page, 0x04 last page
//!  6..14  granule position
//! 14..18  bitstream serial number
//! 18..22  page sequence number
//! 22..26  CRC32 checksum
//! 26      segment count
//! ```

use platform::File;

use crate::error::FormatError;

/// Fixed size of an Ogg page header.
pub const PAGE_HEADER_LEN: usize = 27;
/// Page capture pattern.
pub const CAPTURE_PATTERN: &[u8; 4] = b"OggS";
/// Lacing value meaning "packet continues in the next segment".
pub const LACING_CONTINUE: u8 = 255;
/// Maximum lacing entries on one page.
pub const MAX_SEGMENTS: usize = 255;

const FLAG_CONTINUED: u8 = 0x01;
const FLAG_BOS: u8 = 0x02;
const FLAG_EOS: u8 = 0x04;

/// Granule position of a page on which no packet ends.
pub const GRANULE_NONE: u64 = u64::MAX;

/// Parsed fields of one page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PageHeader {
    /// Raw header type byte.
    pub header_type: u8,
    /// Granule position (PCM sample position at 48 kHz for Opus).
    pub granule_position: u64,
    /// Bitstream serial number.
    pub serial: u32,
    /// Page sequence number.
    pub sequence: u32,
    /// Stored CRC32 (carried, not verified).
    pub checksum: u32,
    /// Number of lacing entries.
    pub segment_count: u8,
}

impl PageHeader {
    /// Parse a raw 27-byte header.
    ///
    /// # Errors
    ///
    /// [`FormatError::NotOgg`] if the capture pattern or version is wrong.
    pub fn parse(raw: &[u8; PAGE_HEADER_LEN]) -> Result<Self, FormatError> {
        let [p0, p1, p2, p3, version, header_type, rest @ ..] = raw;
        if [*p0, *p1, *p2, *p3] != *CAPTURE_PATTERN || *version != 0 {
            return Err(FormatError::NotOgg);
        }
        let [g0, g1, g2, g3, g4, g5, g6, g7, s0, s1, s2, s3, q0, q1, q2, q3, c0, c1, c2, c3, segment_count] =
            *rest;
        Ok(Self {
            header_type: *header_type,
            granule_position: u64::from_le_bytes([g0, g1, g2, g3, g4, g5, g6, g7]),
            serial: u32::from_le_bytes([s0, s1, s2, s3]),
            sequence: u32::from_le_bytes([q0, q1, q2, q3]),
            checksum: u32::from_le_bytes([c0, c1, c2, c3]),
            segment_count,
        })
    }

    /// First lacing value continues a packet from the previous page.
    pub fn is_continued(&self) -> bool {
        self.header_type & FLAG_CONTINUED != 0
    }

    /// First page of the logical stream.
    pub fn is_bos(&self) -> bool {
        self.header_type & FLAG_BOS != 0
    }

    /// Last page of the logical stream.
    pub fn is_eos(&self) -> bool {
        self.header_type & FLAG_EOS != 0
    }
}

/// Current page: header plus a cursor into its lacing table.
#[derive(Debug, Clone)]
pub struct OggPageCursor {
    header: PageHeader,
    lacing: [u8; MAX_SEGMENTS],
    cursor: usize,
}

impl OggPageCursor {
    /// An exhausted cursor; the first use loads a page.
    pub const fn new() -> Self {
        Self {
            header: PageHeader {
                header_type: 0,
                granule_position: 0,
                serial: 0,
                sequence: 0,
                checksum: 0,
                segment_count: 0,
            },
            lacing: [0; MAX_SEGMENTS],
            cursor: 0,
        }
    }

    /// Read the next page header and lacing table from `file`.
    ///
    /// On success the stream sits at the first payload byte of the page.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`] on a short read, [`FormatError::NotOgg`] on a
    /// bad capture pattern.
    pub async fn load<F: File>(&mut self, file: &mut F) -> Result<(), FormatError> {
        let mut raw = [0u8; PAGE_HEADER_LEN];
        read_exact(file, &mut raw).await?;
        let header = PageHeader::parse(&raw)?;
        let table = self
            .lacing
            .get_mut(..usize::from(header.segment_count))
            .ok_or(FormatError::Truncated)?;
        read_exact(file, table).await?;
        self.header = header;
        self.cursor = 0;
        trace!(
            "ogg page seq={} segments={} flags={}",
            header.sequence,
            header.segment_count,
            header.header_type
        );
        Ok(())
    }

    /// Header of the current page.
    pub fn header(&self) -> &PageHeader {
        &self.header
    }

    /// Lacing entries not yet consumed.
    pub fn remaining(&self) -> usize {
        usize::from(self.header.segment_count).saturating_sub(self.cursor)
    }

    /// Current page is the last of the stream.
    pub fn is_eos(&self) -> bool {
        self.header.is_eos()
    }

    /// Consume the next lacing value.
    pub fn next_lacing(&mut self) -> Option<u8> {
        if self.remaining() == 0 {
            return None;
        }
        let value = self.lacing.get(self.cursor).copied()?;
        self.cursor = self.cursor.saturating_add(1);
        Some(value)
    }

    /// Lacing values of the whole page.
    pub fn lacing(&self) -> &[u8] {
        self.lacing
            .get(..usize::from(self.header.segment_count))
            .unwrap_or(&[])
    }

    /// Total payload bytes declared by the page's lacing table.
    pub fn payload_len(&self) -> usize {
        self.lacing().iter().map(|&v| usize::from(v)).sum()
    }

    /// The page's last packet continues onto the next page.
    pub fn ends_mid_packet(&self) -> bool {
        self.lacing().last() == Some(&LACING_CONTINUE)
    }

    /// Mark every lacing entry as consumed.
    pub fn exhaust(&mut self) {
        self.cursor = usize::from(self.header.segment_count);
    }
}

impl Default for OggPageCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill `buf` completely from `file`, looping over short reads.
///
/// # Errors
///
/// [`FormatError::Truncated`] when the file ends first or the read fails.
pub async fn read_exact<F: File>(file: &mut F, buf: &mut [u8]) -> Result<(), FormatError> {
    let mut filled = 0;
    while filled < buf.len() {
        let dst = buf.get_mut(filled..).ok_or(FormatError::Truncated)?;
        match file.read(dst).await {
            Ok(0) => return Err(FormatError::Truncated),
            Ok(n) => filled = filled.saturating_add(n),
            Err(_) => {
                warn!("storage read failed after {} bytes", filled);
                return Err(FormatError::Truncated);
            }
        }
    }
    Ok(())
}

/// Skip `n` bytes, failing if that runs past the end of the file.
///
/// # Errors
///
/// [`FormatError::Truncated`] if the seek fails or lands beyond the end.
pub async fn skip<F: File>(file: &mut F, n: usize) -> Result<(), FormatError> {
    if n == 0 {
        return Ok(());
    }
    let pos = file
        .seek_forward(n as u64)
        .await
        .map_err(|_| FormatError::Truncated)?;
    if pos > file.size() {
        return Err(FormatError::Truncated);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::mocks::MemoryFile;

    fn header_bytes(header_type: u8, granule: u64, lacing: &[u8]) -> Vec<u8> {
        let mut page = Vec::new();
        page.extend_from_slice(b"OggS");
        page.push(0);
        page.push(header_type);
        page.extend_from_slice(&granule.to_le_bytes());
        page.extend_from_slice(&0x1234_5678u32.to_le_bytes());
        page.extend_from_slice(&7u32.to_le_bytes());
        page.extend_from_slice(&0u32.to_le_bytes());
        page.push(lacing.len() as u8);
        page.extend_from_slice(lacing);
        page
    }

    #[tokio::test]
    async fn load_reads_header_and_lacing() {
        let mut file = MemoryFile::new(header_bytes(0x04, 960, &[255, 10, 3]));
        let mut cursor = OggPageCursor::new();
        cursor.load(&mut file).await.unwrap();

        assert!(cursor.is_eos());
        assert!(!cursor.header().is_continued());
        assert_eq!(cursor.header().granule_position, 960);
        assert_eq!(cursor.header().serial, 0x1234_5678);
        assert_eq!(cursor.header().sequence, 7);
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.payload_len(), 268);
        assert_eq!(file.position(), PAGE_HEADER_LEN + 3);
    }

    #[tokio::test]
    async fn cursor_walks_lacing_in_order() {
        let mut file = MemoryFile::new(header_bytes(0, 0, &[1, 2]));
        let mut cursor = OggPageCursor::new();
        cursor.load(&mut file).await.unwrap();
        assert_eq!(cursor.next_lacing(), Some(1));
        assert_eq!(cursor.next_lacing(), Some(2));
        assert_eq!(cursor.next_lacing(), None);
        assert_eq!(cursor.remaining(), 0);
    }

    #[tokio::test]
    async fn bad_capture_pattern_is_not_ogg() {
        let mut bytes = header_bytes(0, 0, &[]);
        bytes[0] = b'X';
        let mut cursor = OggPageCursor::new();
        let err = cursor.load(&mut MemoryFile::new(bytes)).await.unwrap_err();
        assert_eq!(err, FormatError::NotOgg);
    }

    #[tokio::test]
    async fn nonzero_version_is_not_ogg() {
        let mut bytes = header_bytes(0, 0, &[]);
        bytes[4] = 1;
        let mut cursor = OggPageCursor::new();
        let err = cursor.load(&mut MemoryFile::new(bytes)).await.unwrap_err();
        assert_eq!(err, FormatError::NotOgg);
    }

    #[tokio::test]
    async fn short_header_is_truncated() {
        let bytes = header_bytes(0, 0, &[])[..20].to_vec();
        let mut cursor = OggPageCursor::new();
        let err = cursor.load(&mut MemoryFile::new(bytes)).await.unwrap_err();
        assert_eq!(err, FormatError::Truncated);
    }

    #[tokio::test]
    async fn short_lacing_table_is_truncated() {
        let mut bytes = header_bytes(0, 0, &[10, 10, 10]);
        bytes.truncate(PAGE_HEADER_LEN + 1);
        let mut cursor = OggPageCursor::new();
        let err = cursor.load(&mut MemoryFile::new(bytes)).await.unwrap_err();
        assert_eq!(err, FormatError::Truncated);
    }

    #[tokio::test]
    async fn ends_mid_packet_tracks_last_lacing() {
        let mut file = MemoryFile::new(header_bytes(0x01, GRANULE_NONE, &[255, 255]));
        let mut cursor = OggPageCursor::new();
        cursor.load(&mut file).await.unwrap();
        assert!(cursor.ends_mid_packet());
        assert!(cursor.header().is_continued());
        cursor.exhaust();
        assert_eq!(cursor.remaining(), 0);
    }
}
