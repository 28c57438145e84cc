// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::io;
use std::result;

/// `MonitorError` provides an enumeration of all possible errors reported by Sigmon.
#[derive(Debug)]
pub enum MonitorError {
    /// An IO error occurred while reading the sample stream.
    IoError(io::Error),
    /// The stream contained malformed data and a frame could not be decoded.
    DecodeError(&'static str),
    /// An unsupported demodulator or option was requested.
    Unsupported(&'static str),
    /// A default or user-defined limit was reached while decoding. Limits are used to prevent
    /// denial-of-service by malformed streams.
    LimitError(&'static str),
    /// The end of the sample stream was reached unexpectedly.
    EndOfStream,
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MonitorError::IoError(ref err) => {
                write!(f, "io error: {}", err)
            }
            MonitorError::DecodeError(msg) => {
                write!(f, "malformed stream: {}", msg)
            }
            MonitorError::Unsupported(feature) => {
                write!(f, "unsupported feature: {}", feature)
            }
            MonitorError::LimitError(constraint) => {
                write!(f, "limit reached: {}", constraint)
            }
            MonitorError::EndOfStream => {
                write!(f, "unexpected end of stream")
            }
        }
    }
}

impl error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            MonitorError::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MonitorError {
    fn from(err: io::Error) -> MonitorError {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => MonitorError::EndOfStream,
            _ => MonitorError::IoError(err),
        }
    }
}

pub type Result<T> = result::Result<T, MonitorError>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(MonitorError::DecodeError(desc))
}

/// Convenience function to create an unsupported feature error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(MonitorError::Unsupported(feature))
}

/// Convenience function to create a limit error.
pub fn limit_error<T>(constraint: &'static str) -> Result<T> {
    Err(MonitorError::LimitError(constraint))
}

/// Convenience function to create an end-of-stream error.
pub fn end_of_stream_error<T>() -> Result<T> {
    Err(MonitorError::EndOfStream)
}
