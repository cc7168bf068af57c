//! Envelope construction and serialisation.
//!
//! An envelope is the static headers object with one extra key holding
//! the ordered record array. Size-triggered flushing measures the same
//! bytes that would be sent.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::log_record::LogRecord;

/// Content type attached to every payload.
pub const CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Borrowed view of an envelope, serialised without cloning records.
pub struct Envelope<'a> {
    headers: &'a Map<String, Value>,
    data_key: &'a str,
    records: &'a [LogRecord],
}

impl<'a> Envelope<'a> {
    pub fn new(headers: &'a Map<String, Value>, data_key: &'a str, records: &'a [LogRecord]) -> Self {
        Self {
            headers,
            data_key,
            records,
        }
    }

    /// Serialise to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// UTF-8 byte length of the serialised envelope.
    pub fn byte_len(&self) -> serde_json::Result<usize> {
        let mut counter = ByteCounter(0);
        serde_json::to_writer(&mut counter, self)?;
        Ok(counter.0)
    }
}

impl Serialize for Envelope<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // A header sharing the data key is shadowed by the records.
        let shadowed = usize::from(self.headers.contains_key(self.data_key));
        let mut map = serializer.serialize_map(Some(self.headers.len() + 1 - shadowed))?;
        for (key, value) in self.headers {
            if key != self.data_key {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry(self.data_key, self.records)?;
        map.end()
    }
}

struct ByteCounter(usize);

impl std::io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
