//! Storage abstraction for file systems
//!
//! The playback core only needs forward, sequential access: read from the
//! current position, skip forward, and learn the size for diagnostics.
//! Closing a file is dropping its handle.

/// Storage trait for file system access
pub trait Storage {
    /// Error type
    type Error: core::fmt::Debug;
    /// File type
    type File: File;

    /// Open file for reading
    fn open_file(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<Self::File, Self::Error>>;

    /// Check if path exists
    fn exists(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<bool, Self::Error>>;
}

/// File trait for reading files
pub trait File {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read from current position.
    ///
    /// May return fewer bytes than `buf.len()`; `Ok(0)` means end of file.
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;

    /// Advance the read position by `n` bytes without reading them.
    ///
    /// Returns the new absolute position.
    fn seek_forward(
        &mut self,
        n: u64,
    ) -> impl core::future::Future<Output = Result<u64, Self::Error>>;

    /// Get file size
    fn size(&self) -> u64;
}
