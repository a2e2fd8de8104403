use std::fmt;
use std::fs::File;
use std::io;
use std::mem;
use std::path::Path;
use std::result;
use std::sync::Arc;

use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::Serialize;
use tablecsv_core::{Emitter, WriteResult};

use crate::error::{Error, ErrorKind, IntoInnerError, Result};
#[cfg(feature = "serde")]
use crate::serializer::{serialize, serialize_header};
use crate::value::{render, FormatProvider, Invariant, ToField, Value};
use crate::{Encoding, DEFAULT_BUFFER_CAPACITY, DEFAULT_FILE_BUFFER_CAPACITY};

/// The smallest buffer a writer will work with. A byte order mark must fit
/// in an empty buffer.
const MIN_BUFFER_CAPACITY: usize = 4;

/// Builds a CSV writer with various configuration knobs.
///
/// This builder can be used to tweak the buffering, the record shape rules
/// and the text rendering of non-text values. Once a `Writer` is built, its
/// configuration cannot be changed.
#[derive(Debug)]
pub struct WriterBuilder {
    capacity: Option<usize>,
    encoding: Encoding,
    leave_open: bool,
    flexible: bool,
    has_headers: bool,
    provider: Arc<dyn FormatProvider + Send + Sync>,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            capacity: None,
            encoding: Encoding::default(),
            leave_open: false,
            flexible: false,
            has_headers: false,
            provider: Arc::new(Invariant),
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// To convert a builder into a writer, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use tablecsv::WriterBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = WriterBuilder::new().from_writer(vec![]);
    ///     wtr.write_record(&["a", "b", "c"])?;
    ///     wtr.write_record(&["x", "y", "z"])?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "a,b,c\nx,y,z");
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes data to `wtr`.
    ///
    /// Note that the CSV writer is buffered automatically, so you should not
    /// wrap `wtr` in a buffered writer like `io::BufWriter`. Pass `&mut wtr`
    /// to lend a stream to the writer instead of handing it over.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        let capacity = self.capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY);
        Writer::new(self, capacity, wtr)
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// given file path. The file is truncated if it already exists.
    ///
    /// If there was a problem opening the file at the given path, then this
    /// returns the corresponding error.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let capacity = self.capacity.unwrap_or(DEFAULT_FILE_BUFFER_CAPACITY);
        Ok(Writer::new(self, capacity, File::create(path)?))
    }

    /// Set the capacity (in bytes) of the internal buffer used in the CSV
    /// writer.
    ///
    /// The default is 1024 bytes for writers built with `from_writer` and
    /// 4096 bytes for writers built with `from_path`. Capacities below 4 are
    /// rounded up to 4.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = Some(capacity);
        self
    }

    /// The character encoding of the CSV data.
    ///
    /// With `Encoding::Utf8Bom`, a byte order mark is written before
    /// anything else. The default, `Encoding::Utf8`, writes none.
    pub fn encoding(&mut self, encoding: Encoding) -> &mut WriterBuilder {
        self.encoding = encoding;
        self
    }

    /// Whether `Writer::close` hands the underlying stream back to the
    /// caller (`true`) or drops it (`false`).
    ///
    /// This is disabled by default.
    pub fn leave_open(&mut self, yes: bool) -> &mut WriterBuilder {
        self.leave_open = yes;
        self
    }

    /// Whether records after the first may have fewer fields than the
    /// first.
    ///
    /// When disabled (the default), ending a record that is shorter than the
    /// first record returns an `UnequalLengths` error. Records may never be
    /// longer than the first, whatever this setting.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use tablecsv::WriterBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = WriterBuilder::new()
    ///         .flexible(true)
    ///         .from_writer(vec![]);
    ///     wtr.write_record(&["a", "b", "c"])?;
    ///     wtr.write_record(&["x", "y"])?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "a,b,c\nx,y");
    ///     Ok(())
    /// }
    /// ```
    pub fn flexible(&mut self, yes: bool) -> &mut WriterBuilder {
        self.flexible = yes;
        self
    }

    /// Whether `Writer::serialize` writes a header row of struct field names
    /// before the first record.
    ///
    /// The header is only written when the first record is serialized from a
    /// struct and nothing has been written yet. This is disabled by default.
    pub fn has_headers(&mut self, yes: bool) -> &mut WriterBuilder {
        self.has_headers = yes;
        self
    }

    /// Set the provider that renders booleans, numbers and characters as
    /// text.
    ///
    /// The default is `Invariant`.
    pub fn format_provider<P>(&mut self, provider: P) -> &mut WriterBuilder
    where
        P: FormatProvider + Send + Sync + 'static,
    {
        self.provider = Arc::new(provider);
        self
    }
}

/// A push based CSV writer.
///
/// Fields are written one at a time with `write_field` (or a record at a
/// time with `write_record`), and records are ended with `end_record`. The
/// writer quotes fields that need it and separates fields with `,` and
/// records with `\n`. No terminator follows the last record.
///
/// The first record fixes the shape of the table: no later record may have
/// more fields, and unless the writer is flexible, none may have fewer.
/// A field that would overflow the record is rejected before anything is
/// written, and the writer remains usable.
///
/// Output is buffered. Call `flush` to push it to the underlying writer.
/// Dropping a `Writer` flushes it, ignoring any error; use `close` or
/// `into_inner` to observe flush errors.
pub struct Writer<W: io::Write> {
    core: Emitter,
    wtr: Option<W>,
    buf: Buffer,
    state: WriterState,
}

struct WriterState {
    encoding: Encoding,
    leave_open: bool,
    flexible: bool,
    provider: Arc<dyn FormatProvider + Send + Sync>,
    /// Whether a header row is still due before the first serialized
    /// record.
    header_pending: bool,
    /// The index of the record being written.
    record: u64,
    /// The number of fields written to the current record.
    field: u64,
    shape: Shape,
    /// Whether the first field of the current record was empty.
    first_field_empty: bool,
    /// While set, the buffer grows instead of being flushed, so that the
    /// record being serialized can be taken back.
    holding: bool,
    /// Whether a write to the underlying writer is in progress. Drop must
    /// not flush again after a panic in the underlying writer.
    panicked: bool,
    /// Reused for rendering non-text values.
    scratch: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Shape {
    AwaitingFirstRecord,
    Locked(u64),
}

/// A simple internal buffer for buffering writes.
///
/// We need this because the `Emitter` writes into caller provided slices.
/// A field is always staged in full. When it does not fit, the buffer grows
/// past `capacity` until the next flush.
#[derive(Debug)]
struct Buffer {
    /// The contents of the buffer.
    buf: Vec<u8>,
    /// The number of bytes written to the buffer.
    len: usize,
    /// The size the buffer is flushed at, and shrinks back to.
    capacity: usize,
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.wtr.is_some() && !self.state.panicked {
            let _ = self.flush();
        }
    }
}

impl<W: io::Write> fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Writer")
            .field("core", &self.core)
            .field("open", &self.wtr.is_some())
            .field("buffered", &self.buf.len)
            .field("record", &self.state.record)
            .field("field", &self.state.field)
            .field("shape", &self.state.shape)
            .field("encoding", &self.state.encoding)
            .field("flexible", &self.state.flexible)
            .field("provider", &self.state.provider)
            .finish()
    }
}

impl Writer<File> {
    /// Build a CSV writer with a default configuration that writes data to
    /// the given file path. The file is truncated if it already exists.
    ///
    /// If there was a problem opening the file at the given path, then this
    /// returns the corresponding error.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    fn new(builder: &WriterBuilder, capacity: usize, wtr: W) -> Writer<W> {
        let capacity = capacity.max(MIN_BUFFER_CAPACITY);
        let mut buf = Buffer { buf: vec![0; capacity], len: 0, capacity };
        let preamble = builder.encoding.preamble();
        buf.writable()[..preamble.len()].copy_from_slice(preamble);
        buf.written(preamble.len());
        Writer {
            core: Emitter::new(),
            wtr: Some(wtr),
            buf,
            state: WriterState {
                encoding: builder.encoding,
                leave_open: builder.leave_open,
                flexible: builder.flexible,
                provider: builder.provider.clone(),
                header_pending: builder.has_headers,
                record: 0,
                field: 0,
                shape: Shape::AwaitingFirstRecord,
                first_field_empty: false,
                holding: false,
                panicked: false,
                scratch: String::new(),
            },
        }
    }

    /// Build a CSV writer with a default configuration that writes data to
    /// `wtr`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use tablecsv::Writer;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = Writer::from_writer(vec![]);
    ///     wtr.write_field("  Field1")?;
    ///     wtr.write_field(42)?;
    ///     wtr.write_field("He said \"hi\"")?;
    ///     wtr.end_record()?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "\"  Field1\",42,\"He said \"\"hi\"\"\"");
    ///     Ok(())
    /// }
    /// ```
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// Write a single field to the current record.
    ///
    /// Text is written as is, quoted when it starts or ends with a space or
    /// tab, or contains `,`, `"` or `\n`. Other values are rendered by the
    /// writer's `FormatProvider` first, and `None` is an empty field.
    ///
    /// # Errors
    ///
    /// If the first record has already been written and the current record
    /// is full, this returns `ErrorKind::ColumnOverflow` without writing
    /// anything. After `close`, this returns `ErrorKind::Disposed`.
    pub fn write_field<T: ToField>(&mut self, field: T) -> Result<()> {
        let mut scratch = mem::replace(&mut self.state.scratch, String::new());
        scratch.clear();
        let value = field.to_field();
        let text = match value {
            Value::Text(text) => text,
            ref value => {
                render(&*self.state.provider, value, &mut scratch);
                scratch.as_str()
            }
        };
        let result = self.write_bytes_field(text.as_bytes());
        self.state.scratch = scratch;
        result
    }

    /// Write a single field given as raw bytes.
    pub(crate) fn write_bytes_field(&mut self, field: &[u8]) -> Result<()> {
        if self.wtr.is_none() {
            return Err(Error::disposed());
        }
        if let Shape::Locked(expected_len) = self.state.shape {
            if self.state.field >= expected_len {
                return Err(Error::new(ErrorKind::ColumnOverflow {
                    record: self.state.record,
                    expected_len,
                }));
            }
        }
        // The only I/O happens here, before any part of the field is staged.
        if self.buf.is_full() && !self.state.holding {
            self.flush_buf()?;
        }
        if self.state.field > 0 {
            self.write_delimiter();
        } else if self.state.record > 0 {
            self.write_terminator();
        }

        let mut input = field;
        loop {
            let (res, nin, nout) = self.core.field(input, self.buf.writable());
            input = &input[nin..];
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => break,
                WriteResult::OutputFull => self.buf.grow(),
            }
        }
        loop {
            let (res, nout) = self.core.end_field(self.buf.writable());
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => break,
                WriteResult::OutputFull => self.buf.grow(),
            }
        }
        if self.state.field == 0 {
            self.state.first_field_empty = field.is_empty();
        }
        self.state.field += 1;
        Ok(())
    }

    /// Write every field in `record`, then end the record.
    ///
    /// An empty iterator writes nothing, and the record index stays put.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use tablecsv::Writer;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = Writer::from_writer(vec![]);
    ///     wtr.write_record(&["a", "", "c"])?;
    ///     wtr.write_record(vec![Some(1.5), None, Some(-2.0)])?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "a,,c\n1.5,,-2.0");
    ///     Ok(())
    /// }
    /// ```
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: ToField,
    {
        for field in record {
            self.write_field(field)?;
        }
        self.end_record()
    }

    /// End the current record.
    ///
    /// This does nothing if no field has been written to the current record.
    /// Ending the first record fixes the number of fields of every later
    /// record.
    ///
    /// # Errors
    ///
    /// Unless the writer is flexible, ending a record with fewer fields than
    /// the first returns `ErrorKind::UnequalLengths` and leaves the record
    /// open, so that more fields can be written to it.
    pub fn end_record(&mut self) -> Result<()> {
        if self.wtr.is_none() {
            return Err(Error::disposed());
        }
        if self.state.field == 0 {
            return Ok(());
        }
        match self.state.shape {
            Shape::AwaitingFirstRecord => {
                debug!("CSV column count locked at {}", self.state.field);
                self.state.shape = Shape::Locked(self.state.field);
            }
            Shape::Locked(expected_len)
                if self.state.field < expected_len && !self.state.flexible =>
            {
                return Err(Error::new(ErrorKind::UnequalLengths {
                    record: self.state.record,
                    expected_len,
                    len: self.state.field,
                }));
            }
            Shape::Locked(_) => {}
        }
        if self.state.field == 1 && self.state.first_field_empty {
            loop {
                let (res, nout) = self.core.empty_quoted(self.buf.writable());
                self.buf.written(nout);
                match res {
                    WriteResult::InputEmpty => break,
                    WriteResult::OutputFull => self.buf.grow(),
                }
            }
        }
        trace!(
            "wrote CSV record {} with {} fields",
            self.state.record,
            self.state.field
        );
        self.state.record += 1;
        self.state.field = 0;
        Ok(())
    }

    /// Serialize a single record using Serde.
    ///
    /// A struct, tuple or sequence becomes one record, with each of its
    /// members a field. A scalar becomes a record with one field. Members
    /// must themselves be scalars (or `Option`s, newtypes and unit enum
    /// variants of scalars): nested containers, maps and enum variants with
    /// data are rejected with `ErrorKind::Serialize`. Fields go through
    /// `write_field`, so the writer's `FormatProvider` renders numbers.
    ///
    /// If the writer was built with `has_headers(true)`, nothing has been
    /// written yet and `record` is a struct, a header row of its field names
    /// is written first.
    ///
    /// This is all or nothing: on error, the fields of `record` already
    /// written (and the header row, if any) are taken back, and the writer
    /// is left as it was before the call.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    ///
    /// use serde::Serialize;
    /// use tablecsv::WriterBuilder;
    ///
    /// #[derive(Serialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     population: Option<u64>,
    /// }
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = WriterBuilder::new()
    ///         .has_headers(true)
    ///         .from_writer(vec![]);
    ///     wtr.serialize(Row { city: "Boston", population: Some(4628910) })?;
    ///     wtr.serialize(Row { city: "Concord", population: None })?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "city,population\nBoston,4628910\nConcord,");
    ///     Ok(())
    /// }
    /// ```
    #[cfg(feature = "serde")]
    pub fn serialize<S: Serialize>(&mut self, record: S) -> Result<()> {
        if self.state.record > 0 || self.state.field > 0 {
            self.state.header_pending = false;
        }
        let header = self.state.header_pending;
        self.staged(|wtr| {
            if header {
                serialize_header(wtr, &record)?;
                wtr.end_record()?;
            }
            serialize(wtr, &record)?;
            wtr.end_record()
        })?;
        self.state.header_pending = false;
        Ok(())
    }

    /// Run `write` without flushing, and undo everything it wrote if it
    /// fails.
    #[cfg(feature = "serde")]
    fn staged<F>(&mut self, write: F) -> Result<()>
    where
        F: FnOnce(&mut Writer<W>) -> Result<()>,
    {
        if self.buf.is_full() {
            self.flush_buf()?;
        }
        let len = self.buf.len;
        let (record, field) = (self.state.record, self.state.field);
        let (shape, first_field_empty) =
            (self.state.shape, self.state.first_field_empty);
        self.state.holding = true;
        let result = write(self);
        self.state.holding = false;
        if result.is_err() {
            self.buf.len = len;
            self.state.record = record;
            self.state.field = field;
            self.state.shape = shape;
            self.state.first_field_empty = first_field_empty;
        }
        result
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// If there was a problem writing to the underlying writer, then an error
    /// is returned. After `close`, this returns `ErrorKind::Disposed`.
    ///
    /// Note that this also flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        if self.wtr.is_none() {
            return Err(Error::disposed());
        }
        self.flush_buf()?;
        if let Some(ref mut wtr) = self.wtr {
            wtr.flush()?;
        }
        Ok(())
    }

    /// Flush the contents of the internal buffer to the underlying writer,
    /// without flushing the underlying writer.
    fn flush_buf(&mut self) -> io::Result<()> {
        let wtr = match self.wtr {
            Some(ref mut wtr) => wtr,
            None => return Ok(()),
        };
        self.state.panicked = true;
        let result = wtr.write_all(self.buf.readable());
        self.state.panicked = false;
        result?;
        self.buf.clear();
        Ok(())
    }

    /// Flush this writer and close it.
    ///
    /// If the writer was built with `leave_open(true)`, the underlying writer
    /// is returned. Otherwise it is dropped and `None` is returned. Every
    /// later operation on this writer fails with `ErrorKind::Disposed`, and
    /// closing it again does nothing.
    ///
    /// An open record is not ended, and no record terminator is written. If
    /// the flush fails, the error is returned and the writer stays open.
    pub fn close(&mut self) -> Result<Option<W>> {
        if self.wtr.is_none() {
            return Ok(None);
        }
        self.flush()?;
        debug!(
            "closing CSV writer after {} records",
            self.state.record
        );
        let wtr = self.wtr.take();
        if self.state.leave_open {
            Ok(wtr)
        } else {
            Ok(None)
        }
    }

    /// Flush the contents of the internal buffer and return the underlying
    /// writer.
    ///
    /// This ignores the `leave_open` setting. If the flush fails, or the
    /// writer has been closed, the writer is handed back inside the error.
    pub fn into_inner(
        mut self,
    ) -> result::Result<W, IntoInnerError<Writer<W>>> {
        match self.flush() {
            Ok(()) => match self.wtr.take() {
                Some(wtr) => Ok(wtr),
                None => Err(IntoInnerError::new(self, Error::disposed())),
            },
            Err(err) => Err(IntoInnerError::new(self, err)),
        }
    }

    /// Return a reference to the underlying writer, or `None` after `close`.
    pub fn get_ref(&self) -> Option<&W> {
        self.wtr.as_ref()
    }

    /// Return the index of the record being written.
    pub fn current_record(&self) -> u64 {
        self.state.record
    }

    /// Return the number of fields written to the current record, which is
    /// also the index of the next field.
    pub fn current_field(&self) -> u64 {
        self.state.field
    }

    /// Return the number of fields in the first record, or `None` if the
    /// first record has not been ended yet.
    pub fn column_count(&self) -> Option<u64> {
        match self.state.shape {
            Shape::AwaitingFirstRecord => None,
            Shape::Locked(n) => Some(n),
        }
    }

    /// Return the character encoding this writer was configured with.
    pub fn encoding(&self) -> Encoding {
        self.state.encoding
    }

    /// Return the provider used to render non-text values.
    pub fn format_provider(&self) -> &dyn FormatProvider {
        &*self.state.provider
    }

    /// Returns true if and only if `close` has not been called.
    pub fn is_open(&self) -> bool {
        self.wtr.is_some()
    }

    fn write_delimiter(&mut self) {
        loop {
            let (res, nout) = self.core.delimiter(self.buf.writable());
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => return,
                WriteResult::OutputFull => self.buf.grow(),
            }
        }
    }

    fn write_terminator(&mut self) {
        loop {
            let (res, nout) = self.core.terminator(self.buf.writable());
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => return,
                WriteResult::OutputFull => self.buf.grow(),
            }
        }
    }
}

impl Buffer {
    /// Returns a slice of the buffer's current contents.
    ///
    /// The slice returned may be empty.
    #[inline]
    fn readable(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Returns a mutable slice of the remaining space in this buffer.
    ///
    /// The slice returned may be empty.
    #[inline]
    fn writable(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Indicates that `n` bytes have been written to this buffer.
    #[inline]
    fn written(&mut self, n: usize) {
        self.len += n;
    }

    /// Returns true when the buffer holds at least `capacity` bytes.
    #[inline]
    fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Double the space available to the buffer.
    fn grow(&mut self) {
        let size = self.buf.len() * 2;
        self.buf.resize(size, 0);
    }

    /// Clear the buffer.
    #[inline]
    fn clear(&mut self) {
        self.len = 0;
        if self.buf.len() > self.capacity {
            self.buf.truncate(self.capacity);
            self.buf.shrink_to_fit();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::{Writer, WriterBuilder};
    use crate::error::ErrorKind;
    use crate::value::{FormatProvider, Value};
    use crate::Encoding;

    fn wtr_as_string(wtr: Writer<Vec<u8>>) -> String {
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn two_fields() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_field("Field1").unwrap();
        wtr.write_field("Field2").unwrap();
        assert_eq!(wtr_as_string(wtr), "Field1,Field2");
    }

    #[test]
    fn escaped_whitespace() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_field("  Field1").unwrap();
        assert_eq!(wtr_as_string(wtr), "\"  Field1\"");
    }

    #[test]
    fn escaping_rules() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&[
            "Field2  ", "Field3\n", "\nField4", "Field5\t", "\tField6", "a b",
        ])
        .unwrap();
        assert_eq!(
            wtr_as_string(wtr),
            "\"Field2  \",\"Field3\n\",\"\nField4\",\"Field5\t\",\
             \"\tField6\",a b"
        );
    }

    #[test]
    fn quotes_are_doubled() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_field("He said \"hi\"").unwrap();
        assert_eq!(wtr_as_string(wtr), "\"He said \"\"hi\"\"\"");
    }

    #[test]
    fn records() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["a", "b"]).unwrap();
        wtr.write_record(&["c", "d"]).unwrap();
        assert_eq!(wtr_as_string(wtr), "a,b\nc,d");
    }

    #[test]
    fn empty_middle_field() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["a", "", "c"]).unwrap();
        assert_eq!(wtr_as_string(wtr), "a,,c");
    }

    #[test]
    fn single_empty_field_is_quoted() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["a"]).unwrap();
        wtr.write_record(&[""]).unwrap();
        wtr.write_record(&["b"]).unwrap();
        assert_eq!(wtr_as_string(wtr), "a\n\"\"\nb");
    }

    #[test]
    fn empty_record_is_noop() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(Vec::<&str>::new()).unwrap();
        assert_eq!(wtr.current_record(), 0);
        assert_eq!(wtr.column_count(), None);
        wtr.end_record().unwrap();
        assert_eq!(wtr.current_record(), 0);
        assert_eq!(wtr_as_string(wtr), "");
    }

    #[test]
    fn typed_fields() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_field(true).unwrap();
        wtr.write_field('x').unwrap();
        wtr.write_field(-12i8).unwrap();
        wtr.write_field(7u16).unwrap();
        wtr.write_field(i64::MIN).unwrap();
        wtr.write_field(u128::MAX).unwrap();
        wtr.write_field(1.5f32).unwrap();
        wtr.write_field(0.1f64).unwrap();
        wtr.write_field(None::<i32>).unwrap();
        wtr.write_field(String::from("s")).unwrap();
        wtr.write_field(Value::Null).unwrap();
        wtr.write_field(Value::Decimal("-3.50")).unwrap();
        assert_eq!(
            wtr_as_string(wtr),
            "true,x,-12,7,-9223372036854775808,\
             340282366920938463463374607431768211455,1.5,0.1,,s,,-3.50"
        );
    }

    #[test]
    fn tracks_fields_and_records() {
        let mut wtr = Writer::from_writer(vec![]);
        for record in 0..10u64 {
            for field in 0..5u64 {
                assert_eq!(wtr.current_record(), record);
                assert_eq!(wtr.current_field(), field);
                wtr.write_field(record * 5 + field).unwrap();
            }
            assert_eq!(wtr.current_field(), 5);
            wtr.end_record().unwrap();
            assert_eq!(wtr.column_count(), Some(5));
        }
        assert_eq!(wtr.current_record(), 10);
        assert_eq!(wtr.current_field(), 0);
        let data = wtr_as_string(wtr);
        assert_eq!(data.lines().count(), 10);
        assert!(data.starts_with("0,1,2,3,4\n5,6"));
        assert!(data.ends_with("45,46,47,48,49"));
    }

    #[test]
    fn overflow_writes_nothing() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["a", "b"]).unwrap();
        wtr.write_field("c").unwrap();
        wtr.write_field("d").unwrap();

        let err = wtr.write_field("overflow").unwrap_err();
        match *err.kind() {
            ErrorKind::ColumnOverflow { record: 1, expected_len: 2 } => {}
            ref x => panic!("expected ColumnOverflow but got {:?}", x),
        }
        assert_eq!(wtr.current_field(), 2);

        // Still usable.
        wtr.end_record().unwrap();
        wtr.write_record(&["e", "f"]).unwrap();
        assert_eq!(wtr_as_string(wtr), "a,b\nc,d\ne,f");
    }

    #[test]
    fn short_record_is_rejected() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["a", "b", "c"]).unwrap();
        let err = wtr.write_record(&["x"]).unwrap_err();
        match *err.kind() {
            ErrorKind::UnequalLengths { record, expected_len, len } => {
                assert_eq!((record, expected_len, len), (1, 3, 1));
            }
            ref x => panic!("expected UnequalLengths but got {:?}", x),
        }
        // The record is still open and can be completed.
        assert_eq!(wtr.current_record(), 1);
        wtr.write_field("y").unwrap();
        wtr.write_field("z").unwrap();
        wtr.end_record().unwrap();
        assert_eq!(wtr_as_string(wtr), "a,b,c\nx,y,z");
    }

    #[test]
    fn flexible_allows_short_records() {
        let mut wtr = WriterBuilder::new().flexible(true).from_writer(vec![]);
        wtr.write_record(&["a", "b", "c"]).unwrap();
        wtr.write_record(&[""]).unwrap();
        wtr.write_record(&["d"]).unwrap();
        assert!(wtr.write_record(&["1", "2", "3", "4"]).is_err());
        assert_eq!(wtr_as_string(wtr), "a,b,c\n\"\"\nd\n1,2,3");
    }

    #[test]
    fn flush_makes_output_visible() {
        let mut buf = vec![];
        {
            let mut wtr = Writer::from_writer(&mut buf);
            wtr.write_field("a,b").unwrap();
            assert_eq!(wtr.get_ref().map(|w| w.len()), Some(0));
            wtr.flush().unwrap();
            assert_eq!(wtr.get_ref().map(|w| w.len()), Some(5));
            // Nothing more is written on drop.
        }
        assert_eq!(buf, b"\"a,b\"");
    }

    #[test]
    fn drop_flushes() {
        let mut buf = vec![];
        {
            let mut wtr = Writer::from_writer(&mut buf);
            wtr.write_record(&["x", "y"]).unwrap();
        }
        assert_eq!(buf, b"x,y");
    }

    #[test]
    fn closed_writer_is_disposed() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_field("a").unwrap();
        assert!(wtr.close().unwrap().is_none());
        assert!(!wtr.is_open());
        for err in vec![
            wtr.write_field("b").unwrap_err(),
            wtr.end_record().unwrap_err(),
            wtr.flush().unwrap_err(),
        ] {
            match *err.kind() {
                ErrorKind::Disposed => {}
                ref x => panic!("expected Disposed but got {:?}", x),
            }
        }
        assert!(wtr.close().unwrap().is_none());
        assert!(wtr.into_inner().is_err());
    }

    #[test]
    fn leave_open_returns_stream() {
        let mut buf = vec![];
        {
            let mut wtr =
                WriterBuilder::new().leave_open(true).from_writer(&mut buf);
            wtr.write_record(&["a"]).unwrap();
            let inner = wtr.close().unwrap().unwrap();
            inner.write_all(b"!").unwrap();
        }
        assert_eq!(buf, b"a!");
    }

    #[test]
    fn tiny_buffer() {
        let mut wtr =
            WriterBuilder::new().buffer_capacity(1).from_writer(vec![]);
        wtr.write_record(&["\"\"\"", "abcdef", " x "]).unwrap();
        wtr.write_record(&["1", "2", "3"]).unwrap();
        assert_eq!(
            wtr_as_string(wtr),
            "\"\"\"\"\"\"\"\",abcdef,\" x \"\n1,2,3"
        );
    }

    #[test]
    fn byte_order_mark() {
        let mut wtr = WriterBuilder::new()
            .encoding(Encoding::Utf8Bom)
            .from_writer(vec![]);
        assert_eq!(wtr.encoding(), Encoding::Utf8Bom);
        wtr.write_field("a").unwrap();
        assert_eq!(wtr.into_inner().unwrap(), b"\xEF\xBB\xBFa");

        let wtr = Writer::from_writer(vec![]);
        assert_eq!(wtr.encoding(), Encoding::Utf8);
        assert_eq!(wtr.into_inner().unwrap(), b"");
    }

    #[test]
    fn custom_format_provider() {
        #[derive(Debug)]
        struct DecimalComma;

        impl FormatProvider for DecimalComma {
            fn format_f64(&self, value: f64, out: &mut String) {
                out.push_str(&value.to_string().replace('.', ","));
            }
        }

        let mut wtr = WriterBuilder::new()
            .format_provider(DecimalComma)
            .from_writer(vec![]);
        wtr.write_record(vec![Value::Float64(1.25), Value::Int(3)]).unwrap();
        let provider = format!("{:?}", wtr.format_provider());
        assert!(provider.contains("DecimalComma"));
        assert_eq!(wtr_as_string(wtr), "\"1,25\",3");
    }

    #[derive(Debug)]
    struct FailingWriter;

    impl io::Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn flush_errors_are_reported() {
        let mut wtr = Writer::from_writer(FailingWriter);
        wtr.write_field("a").unwrap();
        assert!(wtr.flush().unwrap_err().is_io_error());
        assert!(wtr.close().is_err());
        assert!(wtr.is_open());

        let err = wtr.into_inner().unwrap_err();
        assert!(err.error().is_io_error());
    }

    #[derive(Debug, Default)]
    struct FailsOnce {
        failed: bool,
        data: Vec<u8>,
    }

    impl io::Write for FailsOnce {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::new(io::ErrorKind::Other, "busy"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_partial_field() {
        let mut wtr = WriterBuilder::new()
            .buffer_capacity(4)
            .from_writer(FailsOnce::default());
        wtr.write_field("a").unwrap();
        wtr.write_field("b,cdefgh").unwrap();
        assert_eq!(wtr.current_field(), 2);

        let err = wtr.write_field("x").unwrap_err();
        assert!(err.is_io_error());
        assert_eq!(wtr.current_field(), 2);

        wtr.write_field("x").unwrap();
        wtr.end_record().unwrap();
        wtr.write_record(&["\"quoted\"", "", "y"]).unwrap();
        let sink = wtr.into_inner().unwrap();
        assert_eq!(
            String::from_utf8(sink.data).unwrap(),
            "a,\"b,cdefgh\",x\n\"\"\"quoted\"\"\",,y"
        );
    }

    #[test]
    fn oversized_field_is_staged_whole() {
        let mut buf = vec![];
        {
            let mut wtr =
                WriterBuilder::new().buffer_capacity(4).from_writer(&mut buf);
            wtr.write_field("0123456789 ").unwrap();
            assert_eq!(wtr.get_ref().map(|w| w.len()), Some(0));
            wtr.write_field("z").unwrap();
            assert_eq!(wtr.get_ref().map(|w| w.len()), Some(13));
        }
        assert_eq!(buf, b"\"0123456789 \",z");
    }
}
