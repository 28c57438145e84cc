// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `record` module defines the decoded-frame record and the sinks that deliver records
//! to the user. Records are the *data* channel; diagnostics go through the `log` facade and
//! never through a sink. A record is only ever submitted for a frame that passed its
//! integrity checks, unless the user explicitly requested partial output.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use smallvec::SmallVec;

/// A decoded text frame.
pub struct Record {
    /// Name of the demodulator that produced the frame.
    pub demod: &'static str,
    /// Wall-clock time at record creation. The clock is read exactly once per record.
    pub timestamp: DateTime<Utc>,
    /// The rendered text line for this record.
    pub text: String,
    /// The same content as named fields, for structured output.
    pub fields: SmallVec<[(&'static str, String); 8]>,
}

impl Record {
    pub fn new(demod: &'static str) -> Record {
        Record { demod, timestamp: Utc::now(), text: String::new(), fields: SmallVec::new() }
    }

    /// The record timestamp in the `YYYY-MM-DD HH:MM:SS` form used by text output.
    pub fn timestamp_str(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn push_field(&mut self, key: &'static str, value: impl Into<String>) {
        self.fields.push((key, value.into()));
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("demod", self.demod)?;
        map.serialize_entry(
            "time",
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        )?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        if self.fields.is_empty() {
            map.serialize_entry("text", &self.text)?;
        }
        map.end()
    }
}

/// Destination for decoded records.
pub trait RecordSink {
    fn submit(&mut self, record: Record);
}

/// Writes the text form of each record to standard output, one line per record, flushing
/// after each one unless `no_flush` was requested (then line buffering is relied upon).
pub struct ConsoleSink {
    flush: bool,
}

impl ConsoleSink {
    pub fn new(flush: bool) -> ConsoleSink {
        ConsoleSink { flush }
    }
}

impl RecordSink for ConsoleSink {
    fn submit(&mut self, record: Record) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        // A failed write to a closed pipe is not an error worth unwinding for.
        let _ = writeln!(out, "{}", record.text);
        if self.flush {
            let _ = out.flush();
        }
    }
}

/// Writes one JSON object per record to standard output.
pub struct JsonSink {
    flush: bool,
}

impl JsonSink {
    pub fn new(flush: bool) -> JsonSink {
        JsonSink { flush }
    }
}

impl RecordSink for JsonSink {
    fn submit(&mut self, record: Record) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if let Ok(line) = serde_json::to_string(&record) {
            let _ = writeln!(out, "{}", line);
        }
        if self.flush {
            let _ = out.flush();
        }
    }
}

/// Collects records in memory. Used by the test suites.
#[derive(Default)]
pub struct VecSink {
    pub records: Vec<Record>,
}

impl VecSink {
    pub fn new() -> VecSink {
        VecSink { records: Vec::new() }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.text.as_str()).collect()
    }
}

impl RecordSink for VecSink {
    fn submit(&mut self, record: Record) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::Record;

    #[test]
    fn verify_json_shape() {
        let mut record = Record::new("POCSAG512");
        record.push_field("address", "1234567".to_string());
        record.push_field("function", "0".to_string());

        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(json["demod"], "POCSAG512");
        assert_eq!(json["address"], "1234567");
        assert_eq!(json["function"], "0");
        assert!(json["time"].is_string());
    }
}
