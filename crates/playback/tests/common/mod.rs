//! Shared fixtures: an Ogg page builder and a scripted decoder.
#![allow(dead_code)]
#![allow(clippy::cast_possible_truncation, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use playback::OpusDecoder;

pub const FLAG_CONTINUED: u8 = 0x01;
pub const FLAG_BOS: u8 = 0x02;
pub const FLAG_EOS: u8 = 0x04;

pub const SERIAL: u32 = 0x0D0C_0B0A;

/// One Ogg page under construction.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub flags: u8,
    pub granule: u64,
    pub lacing: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole packet, terminated on this page.
    pub fn packet(mut self, data: &[u8]) -> Self {
        self.lacing.extend(lacing_for(data.len()));
        self.payload.extend_from_slice(data);
        self
    }

    /// Unterminated fragment; `data.len()` must be a multiple of 255.
    pub fn fragment(mut self, data: &[u8]) -> Self {
        assert_eq!(data.len() % 255, 0, "fragment must be whole 255-byte segments");
        self.lacing.extend(std::iter::repeat(255u8).take(data.len() / 255));
        self.payload.extend_from_slice(data);
        self
    }

    /// Raw lacing values and payload, no checks.
    pub fn raw(mut self, lacing: &[u8], payload: &[u8]) -> Self {
        self.lacing.extend_from_slice(lacing);
        self.payload.extend_from_slice(payload);
        self
    }

    pub fn bos(mut self) -> Self {
        self.flags |= FLAG_BOS;
        self
    }

    pub fn eos(mut self) -> Self {
        self.flags |= FLAG_EOS;
        self
    }

    pub fn continued(mut self) -> Self {
        self.flags |= FLAG_CONTINUED;
        self
    }

    pub fn granule(mut self, granule: u64) -> Self {
        self.granule = granule;
        self
    }

    pub fn encode(&self, sequence: u32) -> Vec<u8> {
        assert!(self.lacing.len() <= 255, "too many segments on one page");
        let mut out = Vec::with_capacity(27 + self.lacing.len() + self.payload.len());
        out.extend_from_slice(b"OggS");
        out.push(0);
        out.push(self.flags);
        out.extend_from_slice(&self.granule.to_le_bytes());
        out.extend_from_slice(&SERIAL.to_le_bytes());
        out.extend_from_slice(&sequence.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.push(self.lacing.len() as u8);
        out.extend_from_slice(&self.lacing);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Lacing values for one packet of `len` bytes.
pub fn lacing_for(len: usize) -> Vec<u8> {
    let mut values = vec![255u8; len / 255];
    values.push((len % 255) as u8);
    values
}

/// Concatenate pages with consecutive sequence numbers.
pub fn ogg(pages: &[Page]) -> Vec<u8> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(seq, page)| page.encode(seq as u32))
        .collect()
}

pub fn opus_head(channels: u8, pre_skip: u16) -> Vec<u8> {
    let mut out = b"OpusHead".to_vec();
    out.push(1);
    out.push(channels);
    out.extend_from_slice(&pre_skip.to_le_bytes());
    out.extend_from_slice(&48_000u32.to_le_bytes());
    out.extend_from_slice(&0i16.to_le_bytes());
    out.push(0);
    out
}

pub fn opus_tags(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut out = b"OpusTags".to_vec();
    out.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    out.extend_from_slice(vendor.as_bytes());
    out.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for c in comments {
        out.extend_from_slice(&(c.len() as u32).to_le_bytes());
        out.extend_from_slice(c.as_bytes());
    }
    out
}

/// The two header pages of a stereo-capable stream.
pub fn header_pages(channels: u8, pre_skip: u16) -> Vec<Page> {
    vec![
        Page::new().bos().packet(&opus_head(channels, pre_skip)),
        Page::new().packet(&opus_tags("test encoder", &["TITLE=Fixture", "ARTIST=Suite"])),
    ]
}

/// Audio packet whose first byte identifies it to [`ScriptedDecoder`].
pub fn audio_packet(id: u8, len: usize) -> Vec<u8> {
    let mut data = vec![0xA5u8; len.max(1)];
    data[0] = id;
    data
}

/// Headers plus one page per audio packet; the last page carries EOS.
pub fn opus_file(channels: u8, pre_skip: u16, packets: &[Vec<u8>]) -> Vec<u8> {
    let mut pages = header_pages(channels, pre_skip);
    let last = packets.len().saturating_sub(1);
    for (i, packet) in packets.iter().enumerate() {
        let mut page = Page::new().packet(packet).granule(960 * (i as u64 + 1));
        if i == last {
            page = page.eos();
        }
        pages.push(page);
    }
    ogg(&pages)
}

/// Decoder producing a recognisable ramp per packet.
///
/// Sample `i` of the packet whose first byte is `id` decodes to
/// `id * 2000 + i`. Packets whose first byte is [`ScriptedDecoder::POISON`]
/// fail to decode.
#[derive(Debug)]
pub struct ScriptedDecoder {
    pub channels: usize,
    pub frames_per_packet: usize,
    pub decoded: usize,
    pub resets: usize,
}

impl ScriptedDecoder {
    pub const POISON: u8 = 0xEE;

    pub fn new(channels: usize, frames_per_packet: usize) -> Self {
        Self {
            channels,
            frames_per_packet,
            decoded: 0,
            resets: 0,
        }
    }

    /// Expected output of packet `id`, before discard and volume.
    pub fn ramp(&self, id: u8) -> Vec<i16> {
        (0..self.frames_per_packet * self.channels)
            .map(|i| i16::from(id) * 2000 + i as i16)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corrupt;

impl OpusDecoder for ScriptedDecoder {
    type Error = Corrupt;

    fn decode(&mut self, packet: &[u8], pcm: &mut [i16], max_frames: usize) -> Result<usize, Corrupt> {
        let id = *packet.first().ok_or(Corrupt)?;
        if id == Self::POISON || self.frames_per_packet > max_frames {
            return Err(Corrupt);
        }
        let samples = self.frames_per_packet * self.channels;
        for (i, s) in pcm[..samples].iter_mut().enumerate() {
            *s = i16::from(id) * 2000 + i as i16;
        }
        self.decoded += 1;
        Ok(self.frames_per_packet)
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}
