//! Record source stream: length-prefixed feature record frames.
//!
//! Each frame is an 8-byte little-endian `u64` byte count followed by that many
//! bytes of a bincode-encoded [`Record`]. A stream ends at a clean EOF or at a
//! length prefix that cannot be read completely. Oversized, truncated or
//! undecodable frames are reported as [`IndexError::Corrupt`] and end iteration.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::config::MAX_FRAME_BYTES;
use crate::error::{IndexError, Result};
use crate::record::Record;

const LENGTH_PREFIX_BYTES: usize = 8;

/// Streaming decoder over a frame source.
pub struct RecordReader<R> {
    inner: R,
    frames: u64,
    done: bool,
}

impl RecordReader<BufReader<File>> {
    /// Open a feature file with a read buffer sized for the largest frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "failed to open feature file");
            IndexError::Io(e)
        })?;
        Ok(Self::new(BufReader::with_capacity(
            MAX_FRAME_BYTES as usize,
            file,
        )))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            frames: 0,
            done: false,
        }
    }

    /// Number of frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    /// Read the next length prefix. `None` means end of stream.
    fn read_length(&mut self) -> Result<Option<u64>> {
        let mut buf = [0u8; LENGTH_PREFIX_BYTES];
        let mut filled = 0;
        while filled < LENGTH_PREFIX_BYTES {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(IndexError::Io(e)),
            }
        }
        match filled {
            0 => Ok(None),
            LENGTH_PREFIX_BYTES => Ok(Some(u64::from_le_bytes(buf))),
            partial => {
                tracing::warn!(
                    bytes = partial,
                    frames = self.frames,
                    "incomplete length prefix, treating as end of stream"
                );
                Ok(None)
            }
        }
    }

    fn read_frame(&mut self) -> Result<Option<Record>> {
        let Some(len) = self.read_length()? else {
            return Ok(None);
        };
        if len >= MAX_FRAME_BYTES {
            return Err(IndexError::Corrupt(format!(
                "frame {} announces {} bytes, limit is {}",
                self.frames, len, MAX_FRAME_BYTES
            )));
        }

        let mut body = vec![0u8; len as usize];
        self.inner.read_exact(&mut body).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => IndexError::Corrupt(format!(
                "frame {} truncated: expected {} bytes",
                self.frames, len
            )),
            _ => IndexError::Io(e),
        })?;

        let record: Record = bincode::deserialize(&body).map_err(|e| {
            IndexError::Corrupt(format!("frame {} failed to decode: {}", self.frames, e))
        })?;
        self.frames += 1;
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Frame encoder.
pub struct RecordWriter<W: Write> {
    inner: W,
    frames: u64,
}

impl RecordWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, frames: 0 }
    }

    pub fn write(&mut self, record: &Record) -> Result<()> {
        let body = bincode::serialize(record)
            .map_err(|e| IndexError::Io(io::Error::other(e.to_string())))?;
        self.inner.write_all(&(body.len() as u64).to_le_bytes())?;
        self.inner.write_all(&body)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Decode every record in a feature file.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    RecordReader::open(path)?.collect()
}
