//! The response side of a request.
//!
//! A [`Session`](crate::Session) pushes everything it has to say through a
//! [`Reply`]. Completion is not a reply event: `Ok(())` from the session call
//! means finished, `Err` means the response ends with that error.

use crate::entry::Entry;

pub trait Reply {
    fn mime_type(&mut self, mime_type: &str);
    fn total_size(&mut self, size: u64);
    /// The requested resume offset was honoured.
    fn can_resume(&mut self);
    /// A chunk of file content. An empty chunk marks the end of the data.
    fn data(&mut self, chunk: &[u8]);
    fn processed_size(&mut self, size: u64);
    fn position(&mut self, offset: u64);
    fn opened(&mut self);
    fn list_entry(&mut self, entry: &Entry);
    fn stat_entry(&mut self, entry: &Entry);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MimeType(String),
    TotalSize(u64),
    CanResume,
    Data(Vec<u8>),
    ProcessedSize(u64),
    Position(u64),
    Opened,
    ListEntry(Entry),
    StatEntry(Entry),
}

/// Records every reply event in order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub events: Vec<Event>,
}

impl Transcript {
    pub fn new() -> Transcript {
        Transcript::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// All data chunks concatenated.
    pub fn data(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Data(chunk) => Some(chunk.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Data chunks as emitted, including the empty end marker.
    pub fn chunks(&self) -> Vec<&[u8]> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Data(chunk) => Some(chunk.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn processed_sizes(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::ProcessedSize(size) => Some(*size),
                _ => None,
            })
            .collect()
    }

    pub fn entries(&self) -> Vec<&Entry> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::ListEntry(entry) | Event::StatEntry(entry) => Some(entry),
                _ => None,
            })
            .collect()
    }
}

impl Reply for Transcript {
    fn mime_type(&mut self, mime_type: &str) {
        self.events.push(Event::MimeType(mime_type.to_string()));
    }

    fn total_size(&mut self, size: u64) {
        self.events.push(Event::TotalSize(size));
    }

    fn can_resume(&mut self) {
        self.events.push(Event::CanResume);
    }

    fn data(&mut self, chunk: &[u8]) {
        self.events.push(Event::Data(chunk.to_vec()));
    }

    fn processed_size(&mut self, size: u64) {
        self.events.push(Event::ProcessedSize(size));
    }

    fn position(&mut self, offset: u64) {
        self.events.push(Event::Position(offset));
    }

    fn opened(&mut self) {
        self.events.push(Event::Opened);
    }

    fn list_entry(&mut self, entry: &Entry) {
        self.events.push(Event::ListEntry(entry.clone()));
    }

    fn stat_entry(&mut self, entry: &Entry) {
        self.events.push(Event::StatEntry(entry.clone()));
    }
}
