//! Sequential reader over a file fetched into a native buffer.

use std::io;

use crate::traits::{CameraError, NativeFile, Result};

/// Largest number of bytes handed out by a single read.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Outcome of a single [`FileReader::read_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Bytes copied into the caller's buffer.
    pub len: usize,
    /// Whether this read consumed the last byte of the file.
    pub eof: bool,
}

/// Reads a camera file that has been pulled entirely into a native buffer.
///
/// The native file is released by [`FileReader::close`] or on drop,
/// whichever comes first.
pub struct FileReader<F: NativeFile> {
    file: Option<F>,
    folder: String,
    name: String,
    size: usize,
    offset: usize,
}

impl<F: NativeFile> FileReader<F> {
    pub(crate) fn new(file: F, folder: &str, name: &str) -> Self {
        let size = file.bytes().len();
        Self {
            file: Some(file),
            folder: folder.to_owned(),
            name: name.to_owned(),
            size,
            offset: 0,
        }
    }

    /// Folder the file was fetched from.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Name of the file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full size of the file in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Bytes not yet read.
    pub const fn remaining(&self) -> usize {
        self.size - self.offset
    }

    /// Whether [`FileReader::close`] has been called.
    pub const fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Copy the next chunk into `buf`.
    ///
    /// At most `min(buf.len(), CHUNK_SIZE, remaining)` bytes are copied.
    /// The read that reaches the end of the file reports `eof` alongside
    /// its data. An empty `buf` copies nothing and never reports `eof`.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Chunk> {
        let file = self.file.as_ref().ok_or(CameraError::StreamClosed)?;

        if buf.is_empty() {
            return Ok(Chunk { len: 0, eof: false });
        }

        // The native buffer never shrinks while we own it. If it somehow
        // holds less than `size`, hand out what is there and stop.
        let rest = file.bytes().get(self.offset..).unwrap_or_default();
        let len = buf.len().min(CHUNK_SIZE).min(rest.len());

        if let (Some(dst), Some(src)) = (buf.get_mut(..len), rest.get(..len)) {
            dst.copy_from_slice(src);
        }
        self.offset += len;

        let eof = len == rest.len();
        if eof {
            self.offset = self.size;
        }
        Ok(Chunk { len, eof })
    }

    /// Release the native file. Further calls do nothing.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            tracing::debug!(folder = %self.folder, name = %self.name, "released camera file");
        }
    }
}

impl<F: NativeFile> io::Read for FileReader<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_chunk(buf) {
            Ok(chunk) => Ok(chunk.len),
            Err(CameraError::StreamClosed) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                CameraError::StreamClosed,
            )),
            Err(err) => Err(io::Error::other(err)),
        }
    }
}

impl<F: NativeFile> std::fmt::Debug for FileReader<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("folder", &self.folder)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFile;
    use proptest::prelude::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn reader(data: Vec<u8>) -> (FileReader<MockFile>, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let file = MockFile::new(data, Arc::clone(&released));
        (FileReader::new(file, "/DCIM", "IMG_0001.JPG"), released)
    }

    fn drain(reader: &mut FileReader<MockFile>, request: usize) -> (Vec<u8>, Vec<Chunk>) {
        let mut out = Vec::new();
        let mut chunks = Vec::new();
        let mut buf = vec![0u8; request];
        loop {
            let chunk = reader.read_chunk(&mut buf).expect("read should succeed");
            out.extend_from_slice(&buf[..chunk.len]);
            chunks.push(chunk);
            if chunk.eof {
                return (out, chunks);
            }
        }
    }

    #[test]
    fn test_reads_whole_buffer_in_request_sized_pieces() {
        let data: Vec<u8> = (0..=255).cycle().take(1000).collect();
        let (mut reader, _) = reader(data.clone());

        let (out, chunks) = drain(&mut reader, 300);

        assert_eq!(out, data);
        let lens: Vec<_> = chunks.iter().map(|chunk| chunk.len).collect();
        assert_eq!(lens, [300, 300, 300, 100]);
        assert!(chunks[..3].iter().all(|chunk| !chunk.eof));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_chunk_size_caps_large_requests() {
        let data = vec![7u8; CHUNK_SIZE + 10];
        let (mut reader, _) = reader(data);
        let mut buf = vec![0u8; CHUNK_SIZE * 2];

        let first = reader.read_chunk(&mut buf).expect("read should succeed");
        assert_eq!(first, Chunk { len: CHUNK_SIZE, eof: false });

        let second = reader.read_chunk(&mut buf).expect("read should succeed");
        assert_eq!(second, Chunk { len: 10, eof: true });
    }

    #[test]
    fn test_zero_length_read() {
        let (mut reader, _) = reader(vec![1, 2, 3]);
        let chunk = reader.read_chunk(&mut []).expect("read should succeed");
        assert_eq!(chunk, Chunk { len: 0, eof: false });
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_empty_file_reports_eof_immediately() {
        let (mut reader, _) = reader(Vec::new());
        let mut buf = [0u8; 16];
        let chunk = reader.read_chunk(&mut buf).expect("read should succeed");
        assert_eq!(chunk, Chunk { len: 0, eof: true });
    }

    #[test]
    fn test_close_is_idempotent_and_releases_once() {
        let (mut reader, released) = reader(vec![1, 2, 3]);

        reader.close();
        reader.close();
        assert!(reader.is_closed());
        assert_eq!(released.load(Ordering::SeqCst), 1);

        drop(reader);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_after_close_fails() {
        let (mut reader, _) = reader(vec![1, 2, 3]);
        reader.close();

        let mut buf = [0u8; 4];
        assert!(matches!(
            reader.read_chunk(&mut buf),
            Err(CameraError::StreamClosed)
        ));

        let err = reader.read(&mut buf).expect_err("io read should fail");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    /// Reports its full contents once, then only the first half.
    struct TruncatingFile {
        data: Vec<u8>,
        calls: std::cell::Cell<usize>,
    }

    impl NativeFile for TruncatingFile {
        fn bytes(&self) -> &[u8] {
            let calls = self.calls.get();
            self.calls.set(calls + 1);
            if calls == 0 {
                &self.data
            } else {
                &self.data[..self.data.len() / 2]
            }
        }
    }

    #[test]
    fn test_short_native_buffer_ends_stream_instead_of_failing() {
        let file = TruncatingFile {
            data: (0..8).collect(),
            calls: std::cell::Cell::new(0),
        };
        let mut reader = FileReader::new(file, "/DCIM", "IMG_0001.JPG");
        assert_eq!(reader.size(), 8);

        let mut buf = [0u8; 16];
        let chunk = reader.read_chunk(&mut buf).expect("read should succeed");

        assert_eq!(chunk, Chunk { len: 4, eof: true });
        assert_eq!(&buf[..4], &[0, 1, 2, 3]);
        assert_eq!(reader.remaining(), 0);
        assert!(!reader.is_closed());
    }

    #[test]
    fn test_drop_releases_native_file() {
        let (reader, released) = reader(vec![1]);
        drop(reader);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_io_read_to_end() {
        let data: Vec<u8> = (0..50).collect();
        let (mut reader, _) = reader(data.clone());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).expect("read_to_end should succeed");
        assert_eq!(out, data);
    }

    proptest! {
        #[test]
        fn chunked_reads_concatenate_to_source(
            data in proptest::collection::vec(any::<u8>(), 0..4096),
            request in 1usize..700,
        ) {
            let (mut reader, _) = reader(data.clone());
            let (out, chunks) = drain(&mut reader, request);

            prop_assert_eq!(out, data);
            let eofs = chunks.iter().filter(|chunk| chunk.eof).count();
            prop_assert_eq!(eofs, 1);
            prop_assert!(chunks.last().is_some_and(|chunk| chunk.eof));
        }
    }
}
