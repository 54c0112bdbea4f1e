//! `File` adapter for any `embedded-io-async` reader.
//!
//! Block-device stacks on the hardware target (SDMMC + FAT) expose their open
//! files through the `embedded_io_async::{Read, Seek}` traits. Wrapping such a
//! handle in [`IoFile`] makes it usable by the playback core without a
//! dedicated driver type per filesystem.

use embedded_io_async::{Read, Seek, SeekFrom};

use crate::storage::File;

/// Error type for [`IoFile`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoFileError<E> {
    /// The underlying reader reported an error.
    Io(E),
    /// A forward seek distance does not fit the signed offset of `SeekFrom`.
    SeekOutOfRange,
}

#[allow(clippy::use_debug)] // embedded-io errors only guarantee Debug
impl<E: core::fmt::Debug> core::fmt::Display for IoFileError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e:?}"),
            Self::SeekOutOfRange => f.write_str("seek distance out of range"),
        }
    }
}

/// A [`File`] backed by an `embedded-io-async` reader with seek support.
pub struct IoFile<T> {
    inner: T,
    size: u64,
}

impl<T> IoFile<T> {
    /// Wrap `inner`, whose total length is `size` bytes.
    pub fn new(inner: T, size: u64) -> Self {
        Self { inner, size }
    }

    /// Release the wrapped reader.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> File for IoFile<T> {
    type Error = IoFileError<T::Error>;

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.read(buf).await.map_err(IoFileError::Io)
    }

    async fn seek_forward(&mut self, n: u64) -> Result<u64, Self::Error> {
        let offset = i64::try_from(n).map_err(|_| IoFileError::SeekOutOfRange)?;
        self.inner
            .seek(SeekFrom::Current(offset))
            .await
            .map_err(IoFileError::Io)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_io_async::ErrorType;

    /// Minimal in-memory reader implementing the embedded-io-async traits.
    struct SliceReader {
        data: &'static [u8],
        pos: usize,
    }

    impl ErrorType for SliceReader {
        type Error = Infallible;
    }

    impl Read for SliceReader {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let rest = &self.data[self.pos.min(self.data.len())..];
            let n = rest.len().min(buf.len());
            buf[..n].copy_from_slice(&rest[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl Seek for SliceReader {
        async fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
            self.pos = match pos {
                SeekFrom::Start(p) => p as usize,
                SeekFrom::Current(d) => (self.pos as i64 + d) as usize,
                SeekFrom::End(d) => (self.data.len() as i64 + d) as usize,
            };
            Ok(self.pos as u64)
        }
    }

    #[tokio::test]
    async fn io_file_reads_and_skips() {
        let mut file = IoFile::new(SliceReader { data: b"OggSxxxxPAYLOAD", pos: 0 }, 15);
        let mut magic = [0u8; 4];
        assert_eq!(file.read(&mut magic).await.unwrap(), 4);
        assert_eq!(&magic, b"OggS");
        assert_eq!(file.seek_forward(4).await.unwrap(), 8);
        let mut payload = [0u8; 7];
        file.read(&mut payload).await.unwrap();
        assert_eq!(&payload, b"PAYLOAD");
        assert_eq!(file.size(), 15);
    }

    #[tokio::test]
    async fn io_file_rejects_unrepresentable_seek() {
        let mut file = IoFile::new(SliceReader { data: b"", pos: 0 }, 0);
        let err = file.seek_forward(u64::MAX).await.unwrap_err();
        assert_eq!(err, IoFileError::SeekOutOfRange);
    }
}
