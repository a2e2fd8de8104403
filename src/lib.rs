/*!
The `tablecsv` crate reads and writes comma separated tables as streams,
one field at a time.

The format is fixed: fields are separated by `,` and records by `\n`, with
no terminator after the last record. A field is wrapped in `"` when it
starts or ends with a space or tab, or contains `,`, `"` or `\n`, and a
literal `"` inside a quoted field is written as `""`.

The [`Writer`](struct.Writer.html) enforces a rectangular shape. The number
of fields in the first record becomes the column count, and no later record
may have more (or, unless the writer is flexible, fewer). The
[`Reader`](struct.Reader.html) learns the column count from the first record
too, but accepts ragged records.

# Example: writing

Values other than text are rendered by the writer's
[`FormatProvider`](trait.FormatProvider.html).

```
use std::error::Error;
use tablecsv::Writer;

# fn main() { example().unwrap(); }
fn example() -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(&["city", "note"])?;
    wtr.write_field("Boston")?;
    wtr.write_field(" trailing and \"quoted\"")?;
    wtr.end_record()?;
    wtr.write_record(vec![Some(1), None])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    assert_eq!(data, "\
city,note
Boston,\" trailing and \"\"quoted\"\"\"
1,");
    Ok(())
}
```

# Example: reading

```
use std::error::Error;
use tablecsv::Reader;

# fn main() { example().unwrap(); }
fn example() -> Result<(), Box<dyn Error>> {
    let data = "city,note\nBoston,\"a, b\"\nConcord,";
    let mut rdr = Reader::from_reader(data.as_bytes());

    assert_eq!(rdr.read_field()?.as_deref(), Some("city"));
    assert_eq!(rdr.read_field()?.as_deref(), Some("note"));
    assert_eq!(rdr.column_count()?, 2);

    for result in rdr.records() {
        let record = result?;
        assert_eq!(record.len(), 2);
    }
    Ok(())
}
```

# Serde

With the `serde` feature (enabled by default), `Writer::serialize` writes
one record from a struct, tuple or sequence of scalars.
*/

#![deny(missing_docs)]

pub use tablecsv_core::Malformed;

pub use crate::error::{Error, ErrorKind, IntoInnerError, Result};
pub use crate::reader::{
    Position, Reader, ReaderBuilder, StringRecordsIntoIter, StringRecordsIter,
};
pub use crate::string_record::{StringRecord, StringRecordIter};
pub use crate::value::{FormatProvider, Invariant, ToField, Value};
pub use crate::writer::{Writer, WriterBuilder};

mod error;
mod reader;
#[cfg(feature = "serde")]
mod serializer;
mod string_record;
mod value;
mod writer;

/// The buffer capacity of readers and writers over arbitrary streams.
const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// The buffer capacity of readers and writers opened on a file path.
const DEFAULT_FILE_BUFFER_CAPACITY: usize = 4 * 1024;

/// The character encoding of CSV data.
///
/// Both variants are UTF-8. They differ only in whether a writer starts its
/// output with a byte order mark. A reader skips a leading byte order mark
/// whatever its setting.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Encoding {
    /// UTF-8 without a byte order mark. This is the default.
    Utf8,
    /// UTF-8 preceded by the byte order mark `EF BB BF`.
    Utf8Bom,
}

impl Encoding {
    /// Return a human readable name for this encoding.
    pub fn name(&self) -> &'static str {
        match *self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf8Bom => "UTF-8 with BOM",
        }
    }

    /// Return the bytes a writer emits before any data.
    pub fn preamble(&self) -> &'static [u8] {
        match *self {
            Encoding::Utf8 => b"",
            Encoding::Utf8Bom => b"\xEF\xBB\xBF",
        }
    }
}

impl Default for Encoding {
    fn default() -> Encoding {
        Encoding::Utf8
    }
}

#[cfg(test)]
mod tests {
    use super::Encoding;

    #[test]
    fn encoding_preamble() {
        assert_eq!(Encoding::default(), Encoding::Utf8);
        assert!(Encoding::Utf8.preamble().is_empty());
        assert_eq!(Encoding::Utf8Bom.preamble(), b"\xEF\xBB\xBF");
        assert_eq!(Encoding::Utf8Bom.name(), "UTF-8 with BOM");
    }
}
