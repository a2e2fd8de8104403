use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;
use std::str;

use tablecsv_core::Malformed;

use crate::reader::Position;

/// A type alias for `Result<T, tablecsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing CSV data.
///
/// This error can happen when writing or reading CSV data. Use `kind` to
/// tell the different failures apart.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// A crate private constructor for `Error`.
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    pub(crate) fn disposed() -> Error {
        Error::new(ErrorKind::Disposed)
    }

    /// Return the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns true if this is an I/O error.
    ///
    /// If this is true, the underlying `ErrorKind` is guaranteed to be
    /// `ErrorKind::Io`.
    pub fn is_io_error(&self) -> bool {
        match *self.0 {
            ErrorKind::Io(_) => true,
            _ => false,
        }
    }

    /// Return the position in the input at which this error occurred, if
    /// one is available.
    pub fn position(&self) -> Option<&Position> {
        match *self.0 {
            ErrorKind::Format { ref pos, .. } => Some(pos),
            ErrorKind::Utf8 { ref pos, .. } => Some(pos),
            _ => None,
        }
    }
}

/// The specific type of an error.
#[derive(Debug)]
pub enum ErrorKind {
    /// An I/O error that occurred while reading or writing CSV data.
    Io(io::Error),
    /// The input is not well formed CSV: a quoted field was never closed, or
    /// a closing quote was followed by something other than a delimiter or a
    /// newline.
    ///
    /// The reader is finished after this error; every later read reports
    /// the end of the data.
    Format {
        /// The position of the field in which the error occurred.
        pos: Position,
        /// What was wrong with the field.
        err: Malformed,
    },
    /// A field read from the input is not valid UTF-8.
    Utf8 {
        /// The position of the field in which the error occurred.
        pos: Position,
        /// The corresponding UTF-8 error.
        err: str::Utf8Error,
    },
    /// An operation was attempted on a reader or writer that has been
    /// closed.
    Disposed,
    /// The column count of a reader was requested before the first record
    /// had been read in full.
    ColumnCountUnknown,
    /// A writer was asked to write more fields into a record than the first
    /// record had.
    ///
    /// Nothing is written when this error occurs. The writer remains usable:
    /// the caller may end the record and carry on with the next one.
    ColumnOverflow {
        /// The index of the record being written.
        record: u64,
        /// The number of fields in the first record.
        expected_len: u64,
    },
    /// A writer was asked to end a record that has fewer fields than the
    /// first record.
    ///
    /// The record is left open, so the caller may complete it. This error
    /// is never returned by a writer configured to be flexible.
    UnequalLengths {
        /// The index of the record being written.
        record: u64,
        /// The number of fields in the first record.
        expected_len: u64,
        /// The number of fields in the short record.
        len: u64,
    },
    /// An error of this kind occurs only when using the Serde serializer.
    Serialize(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::new(ErrorKind::Io(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, err)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            ErrorKind::Utf8 { ref err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::Format { ref pos, ref err } => write!(
                f,
                "CSV parse error: record {} \
                 (byte {}, line {}, field {}): {}",
                pos.record(),
                pos.byte(),
                pos.line(),
                pos.field(),
                err
            ),
            ErrorKind::Utf8 { ref pos, ref err } => write!(
                f,
                "CSV parse error: record {} \
                 (byte {}, line {}, field {}): invalid UTF-8: {}",
                pos.record(),
                pos.byte(),
                pos.line(),
                pos.field(),
                err
            ),
            ErrorKind::Disposed => {
                write!(f, "CSV error: the reader or writer has been closed")
            }
            ErrorKind::ColumnCountUnknown => write!(
                f,
                "CSV error: the column count is not known until the first \
                 record has been read"
            ),
            ErrorKind::ColumnOverflow { record, expected_len } => write!(
                f,
                "CSV write error: record {}: records are limited to {} \
                 fields, the length of the first record",
                record, expected_len
            ),
            ErrorKind::UnequalLengths { record, expected_len, len } => {
                write!(
                    f,
                    "CSV write error: record {}: found record with {} \
                     fields, but the first record has {} fields",
                    record, len, expected_len
                )
            }
            ErrorKind::Serialize(ref err) => {
                write!(f, "CSV write error: {}", err)
            }
        }
    }
}

/// `IntoInnerError` occurs when consuming a `Writer` fails.
///
/// Consuming the `Writer` causes a flush to happen. If the flush fails, then
/// this error is returned, which contains both the original `Writer` and
/// the error that occurred.
///
/// The type parameter `W` is the unconsumed writer.
pub struct IntoInnerError<W> {
    wtr: W,
    err: Error,
}

impl<W> IntoInnerError<W> {
    /// Creates a new `IntoInnerError`.
    ///
    /// (This is a visibility hack. It's public in this module, but not in
    /// the crate.)
    pub fn new(wtr: W, err: Error) -> IntoInnerError<W> {
        IntoInnerError { wtr, err }
    }

    /// Returns the error which caused the call to `into_inner` to fail.
    pub fn error(&self) -> &Error {
        &self.err
    }

    /// Returns the underlying writer which generated the error.
    ///
    /// The returned value can be used for error recovery, such as
    /// re-inspecting the buffer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W: std::any::Any> StdError for IntoInnerError<W> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.err)
    }
}

impl<W> fmt::Display for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl<W> fmt::Debug for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use tablecsv_core::Malformed;

    use super::{Error, ErrorKind};
    use crate::reader::Position;

    #[test]
    fn format_error_message() {
        let mut pos = Position::new();
        pos.set_byte(14).set_line(3).set_record(2).set_field(1);
        let err = Error::new(ErrorKind::Format {
            pos,
            err: Malformed::UnclosedQuote,
        });
        assert_eq!(
            err.to_string(),
            "CSV parse error: record 2 (byte 14, line 3, field 1): \
             quoted field is not closed before end of input"
        );
        assert_eq!(err.position().map(|p| p.byte()), Some(14));
    }

    #[test]
    fn overflow_message() {
        let err = Error::new(ErrorKind::ColumnOverflow {
            record: 1,
            expected_len: 3,
        });
        assert_eq!(
            err.to_string(),
            "CSV write error: record 1: records are limited to 3 fields, \
             the length of the first record"
        );
        assert!(err.position().is_none());
    }

    #[test]
    fn io_errors_round_trip() {
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.is_io_error());
        let ioerr = io::Error::from(err);
        assert_eq!(ioerr.kind(), io::ErrorKind::Other);
        assert!(!Error::disposed().is_io_error());
    }
}
