use std::io::{Error, ErrorKind};

use crate::archive::FileData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Data(Vec<u8>),
    /// The position has reached the end of the file. Not an error.
    EndOfData,
}

/// Sequential, seekable reads over one file's content.
pub struct StreamReader {
    data: Box<dyn FileData>,
    size: u64,
    position: u64,
    chunk_size: usize,
}

impl std::fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("size", &self.size)
            .field("position", &self.position)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl StreamReader {
    /// Positions `data` at its start. Fails when the store cannot seek there.
    pub fn open(mut data: Box<dyn FileData>, chunk_size: usize) -> std::io::Result<StreamReader> {
        data.seek(0)?;
        Ok(StreamReader {
            size: data.size(),
            data,
            position: 0,
            chunk_size: chunk_size.max(1),
        })
    }

    #[inline(always)]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move to `offset`, which may be anything in `0..=size`.
    pub fn seek(&mut self, offset: u64) -> std::io::Result<u64> {
        if offset > self.size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("offset {} is past the end of a {} byte file", offset, self.size),
            ));
        }
        self.data.seek(offset)?;
        self.position = offset;
        Ok(offset)
    }

    /// Read at most `max` bytes, or at most one internal chunk when `max` is
    /// `None`.
    pub fn read(&mut self, max: Option<usize>) -> std::io::Result<ReadOutcome> {
        if self.position >= self.size {
            return Ok(ReadOutcome::EndOfData);
        }

        let remaining = self.size - self.position;
        let limit = max
            .unwrap_or(self.chunk_size)
            .min(self.chunk_size)
            .min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if limit == 0 {
            return Ok(ReadOutcome::Data(vec![]));
        }

        let chunk = self.data.read(limit)?;
        if chunk.is_empty() {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "store ended at {} of {} bytes",
                    self.position, self.size
                ),
            ));
        }
        if chunk.len() > limit {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "store returned more bytes than requested",
            ));
        }

        self.position += chunk.len() as u64;
        tracing::trace!(position = self.position, len = chunk.len(), "read chunk");
        Ok(ReadOutcome::Data(chunk))
    }
}
