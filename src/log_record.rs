//! Log record representation for the beacon buffer.
//!
//! A [`LogRecord`] is the caller's JSON object with a `timestamp` injected
//! at append time. Records serialise transparently as that object, so the
//! persisted buffer and the wire envelope share one shape.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name carrying the injected ISO-8601 timestamp.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Caller-supplied key/value mapping for a record.
pub type LogFields = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord {
    fields: LogFields,
}

impl LogRecord {
    /// Stamp `fields` with the current UTC time.
    ///
    /// An existing `timestamp` key supplied by the caller is replaced.
    pub fn new(fields: LogFields) -> Self {
        Self::with_timestamp(fields, Utc::now())
    }

    /// Stamp `fields` with an explicit instant.
    pub fn with_timestamp(mut fields: LogFields, at: DateTime<Utc>) -> Self {
        fields.insert(
            TIMESTAMP_FIELD.to_owned(),
            Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Self { fields }
    }

    /// The injected timestamp, if the record carries a string one.
    ///
    /// Records read back from storage that were written by another
    /// producer may lack it.
    pub fn timestamp(&self) -> Option<&str> {
        self.fields.get(TIMESTAMP_FIELD).and_then(Value::as_str)
    }

    /// Look up a single field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields, including the timestamp.
    pub fn fields(&self) -> &LogFields {
        &self.fields
    }

    pub fn into_fields(self) -> LogFields {
        self.fields
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("<unserialisable record>"),
        }
    }
}
