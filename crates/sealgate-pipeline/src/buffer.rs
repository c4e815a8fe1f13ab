//! Scoped temporary buffers for staged ciphertext
//!
//! The encrypter owns one spool buffer for the duration of one message. The
//! lifecycle is write → finish → read back: a [`SpoolBuffer`] only becomes
//! readable by turning into a [`SealedBuffer`], so reading before the
//! artifact is complete is unrepresentable.

use std::{
    fs::File,
    io::{Cursor, Read, Seek, SeekFrom, Write},
    sync::Arc,
};

/// Supplies spool buffers plus the chunk size the pipeline digests with.
pub trait BufferFactory {
    /// Create a fresh, empty spool buffer.
    fn create(&self) -> std::io::Result<Box<dyn SpoolBuffer>>;

    /// Chunk window size (bytes) for the artifact's chunk digests.
    fn chunk_size(&self) -> usize;
}

/// Write-side staging buffer for one ciphertext artifact.
pub trait SpoolBuffer: Write + Send {
    /// Close the buffer for writing and seal it for read-back.
    fn finish(self: Box<Self>) -> std::io::Result<Box<dyn SealedBuffer>>;
}

/// A fully written, closed artifact: sized and readable.
pub trait SealedBuffer: Send {
    /// Total bytes written before sealing.
    fn size(&self) -> u64;

    /// Open a reader over the sealed bytes.
    ///
    /// Buffers are single-consumer: open one reader at a time and read it
    /// sequentially.
    fn reader(&self) -> std::io::Result<Box<dyn Read + Send>>;
}

/// Spill-to-disk factory backed by unlinked temporary files.
///
/// The file is removed by the OS once the last handle drops, so the
/// ciphertext staging never outlives the message.
pub struct TempSpoolFactory {
    chunk_size: usize,
}

impl TempSpoolFactory {
    /// Factory producing temp-file spools digested with `chunk_size`
    /// windows. `chunk_size` must be non-zero.
    pub fn new(chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk size must be non-zero");
        Self { chunk_size }
    }
}

impl BufferFactory for TempSpoolFactory {
    fn create(&self) -> std::io::Result<Box<dyn SpoolBuffer>> {
        Ok(Box::new(TempSpool { file: tempfile::tempfile()? }))
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

struct TempSpool {
    file: File,
}

impl Write for TempSpool {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl SpoolBuffer for TempSpool {
    fn finish(mut self: Box<Self>) -> std::io::Result<Box<dyn SealedBuffer>> {
        self.file.flush()?;
        let size = self.file.metadata()?.len();
        Ok(Box::new(TempSealed { file: self.file, size }))
    }
}

struct TempSealed {
    file: File,
    size: u64,
}

impl SealedBuffer for TempSealed {
    fn size(&self) -> u64 {
        self.size
    }

    fn reader(&self) -> std::io::Result<Box<dyn Read + Send>> {
        let mut handle = self.file.try_clone()?;
        handle.seek(SeekFrom::Start(0))?;
        Ok(Box::new(handle))
    }
}

/// In-memory factory for tests and small payloads.
pub struct MemorySpoolFactory {
    chunk_size: usize,
}

impl MemorySpoolFactory {
    /// Factory producing in-memory spools digested with `chunk_size`
    /// windows. `chunk_size` must be non-zero.
    pub fn new(chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk size must be non-zero");
        Self { chunk_size }
    }
}

impl BufferFactory for MemorySpoolFactory {
    fn create(&self) -> std::io::Result<Box<dyn SpoolBuffer>> {
        Ok(Box::new(MemorySpool { bytes: Vec::new() }))
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

struct MemorySpool {
    bytes: Vec<u8>,
}

impl Write for MemorySpool {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SpoolBuffer for MemorySpool {
    fn finish(self: Box<Self>) -> std::io::Result<Box<dyn SealedBuffer>> {
        let size = self.bytes.len() as u64;
        Ok(Box::new(MemorySealed { bytes: Arc::from(self.bytes.into_boxed_slice()), size }))
    }
}

struct MemorySealed {
    bytes: Arc<[u8]>,
    size: u64,
}

impl SealedBuffer for MemorySealed {
    fn size(&self) -> u64 {
        self.size
    }

    fn reader(&self) -> std::io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }
}
