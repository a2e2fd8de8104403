use std::fmt;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::str;

use log::{debug, trace};
use tablecsv_core::{ReadFieldResult, Scanner};

use crate::error::{Error, ErrorKind, Result};
use crate::string_record::StringRecord;
use crate::{
    Encoding, DEFAULT_BUFFER_CAPACITY, DEFAULT_FILE_BUFFER_CAPACITY,
};

/// Builds a CSV reader with various configuration knobs.
///
/// This builder can be used to tweak the buffer size and stream handling
/// of a CSV reader. Once a `Reader` is built, its configuration cannot be
/// changed.
#[derive(Debug)]
pub struct ReaderBuilder {
    capacity: Option<usize>,
    encoding: Encoding,
    leave_open: bool,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            capacity: None,
            encoding: Encoding::default(),
            leave_open: false,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use tablecsv::ReaderBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let data = "city,country\nBoston,United States";
    ///     let mut rdr = ReaderBuilder::new()
    ///         .buffer_capacity(64)
    ///         .from_reader(data.as_bytes());
    ///     while let Some(record) = rdr.read_record()? {
    ///         assert_eq!(record.len(), 2);
    ///     }
    ///     assert_eq!(rdr.column_count()?, 2);
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV parser from this configuration that reads data from
    /// `rdr`.
    ///
    /// Note that the CSV reader is buffered automatically, so you should not
    /// wrap `rdr` in a buffered reader like `io::BufReader`. Pass `&mut rdr`
    /// to lend a stream to the reader instead of handing it over.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        let capacity = self.capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY);
        Reader::new(self, capacity, rdr)
    }

    /// Build a CSV parser from this configuration that reads data from the
    /// given file path.
    ///
    /// If there was a problem opening the file at the given path, then this
    /// returns the corresponding error.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        let capacity = self.capacity.unwrap_or(DEFAULT_FILE_BUFFER_CAPACITY);
        Ok(Reader::new(self, capacity, File::open(path)?))
    }

    /// Set the capacity (in bytes) of the buffer used in the CSV reader.
    ///
    /// The default is 1024 bytes for readers built with `from_reader` and
    /// 4096 bytes for readers built with `from_path`.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = Some(capacity);
        self
    }

    /// The character encoding of the CSV data.
    ///
    /// Only UTF-8 is supported. A leading byte order mark is skipped in
    /// either case; the setting is reported back by `Reader::encoding`.
    pub fn encoding(&mut self, encoding: Encoding) -> &mut ReaderBuilder {
        self.encoding = encoding;
        self
    }

    /// Whether `Reader::close` hands the underlying stream back to the
    /// caller (`true`) or drops it (`false`).
    ///
    /// This is disabled by default.
    pub fn leave_open(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.leave_open = yes;
        self
    }
}

/// A pull based CSV reader.
///
/// The reader hands out one field (`read_field`) or one record
/// (`read_record`) at a time, reading just enough of the underlying stream
/// to do so. It keeps track of the current record and field, and learns
/// the table's column count from the length of the first record.
///
/// The reader is tolerant of ragged data: records after the first may have
/// any number of fields.
///
/// # Format
///
/// Fields are separated by `,` and records by `\n`. Whitespace around
/// fields is data. A field starting with `"` runs until the next lone `"`,
/// with `""` standing for a literal quote; a closing quote must be followed
/// by `,`, `\n` or the end of the data. A `\r` is data, so CRLF terminated
/// input leaves a `\r` at the end of each record's last field.
///
/// # Errors
///
/// A malformed quoted field is reported as `ErrorKind::Format` when the
/// field containing it is read, and not before. After such an error the
/// reader is finished.
pub struct Reader<R> {
    core: Scanner,
    rdr: Option<io::BufReader<R>>,
    state: ReaderState,
}

#[derive(Debug)]
struct ReaderState {
    /// The configured character encoding.
    encoding: Encoding,
    /// Whether `close` returns the stream instead of dropping it.
    leave_open: bool,
    /// The position of the next field to be read.
    pos: Position,
    /// The number of fields in the first record, once it has been read.
    column_count: Option<u64>,
    /// Scratch space holding the contents of the most recent field.
    field: Vec<u8>,
    /// Where the field in `field` starts.
    field_start: Position,
    /// The length of a field cut short by an I/O error, which the next read
    /// resumes.
    partial: Option<usize>,
    /// Whether a leading byte order mark has been looked for.
    bom_checked: bool,
    /// Whether the scanner has reported the end of the data.
    eof: bool,
}

impl<R> fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reader")
            .field("core", &self.core)
            .field("open", &self.rdr.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl Reader<File> {
    /// Create a new CSV reader using a default configuration for the file
    /// path given.
    ///
    /// If there was a problem opening the file at the given path, then this
    /// returns the corresponding error.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

impl<R: io::Read> Reader<R> {
    fn new(builder: &ReaderBuilder, capacity: usize, rdr: R) -> Reader<R> {
        Reader {
            core: Scanner::new(),
            rdr: Some(io::BufReader::with_capacity(capacity, rdr)),
            state: ReaderState {
                encoding: builder.encoding,
                leave_open: builder.leave_open,
                pos: Position::new(),
                column_count: None,
                field: vec![0; 64],
                field_start: Position::new(),
                partial: None,
                bom_checked: false,
                eof: false,
            },
        }
    }

    /// Create a new CSV reader using a default configuration for the
    /// reader given.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use tablecsv::Reader;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let data = "a,\"b,c\"\nd,e";
    ///     let mut rdr = Reader::from_reader(data.as_bytes());
    ///     assert_eq!(rdr.read_field()?.as_deref(), Some("a"));
    ///     assert_eq!(rdr.read_field()?.as_deref(), Some("b,c"));
    ///     assert_eq!(rdr.current_record(), 1);
    ///     assert_eq!(rdr.read_record()?.unwrap(), vec!["d", "e"]);
    ///     assert!(rdr.is_done()?);
    ///     Ok(())
    /// }
    /// ```
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }

    /// Read the next field of the current record.
    ///
    /// Returns `None` once all CSV data has been read. If the field is the
    /// last of its record, the reader moves on to the next record: the
    /// record index increases and the field index goes back to `0`.
    ///
    /// # Errors
    ///
    /// `ErrorKind::Format` if the field is malformed, `ErrorKind::Utf8` if
    /// it is not valid UTF-8 and `ErrorKind::Disposed` after `close`.
    pub fn read_field(&mut self) -> Result<Option<String>> {
        let record_end = match self.read_field_impl()? {
            None => return Ok(None),
            Some(record_end) => record_end,
        };
        let field = self.state.field.as_slice();
        let result = match str::from_utf8(field) {
            Ok(field) => Ok(Some(field.to_string())),
            Err(err) => Err(utf8_error(self.state.field_start.clone(), err)),
        };
        self.state.advance(record_end);
        result
    }

    /// Read the rest of the current record.
    ///
    /// When called at a record boundary (the usual case), this returns the
    /// whole next record. If some of the record's fields have already been
    /// taken with `read_field`, only the remaining ones are returned.
    /// Returns `None` once all CSV data has been read.
    ///
    /// The first record read determines the column count. Later records are
    /// returned whatever their length.
    pub fn read_record(&mut self) -> Result<Option<StringRecord>> {
        let mut record = StringRecord::new();
        if self.read_record_into(&mut record)? {
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    /// Read the rest of the current record into the record given, replacing
    /// its contents.
    ///
    /// This behaves like `read_record`, but reuses the record's memory.
    /// Returns `false` once all CSV data has been read.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use tablecsv::{Reader, StringRecord};
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut rdr = Reader::from_reader("a,b\nc,d\ne,f".as_bytes());
    ///     let mut record = StringRecord::new();
    ///     let mut count = 0;
    ///     while rdr.read_record_into(&mut record)? {
    ///         count += 1;
    ///     }
    ///     assert_eq!(count, 3);
    ///     Ok(())
    /// }
    /// ```
    pub fn read_record_into(
        &mut self,
        record: &mut StringRecord,
    ) -> Result<bool> {
        record.clear();
        loop {
            let record_end = match self.read_field_impl()? {
                None => return Ok(!record.is_empty()),
                Some(record_end) => record_end,
            };
            let result = match str::from_utf8(&self.state.field) {
                Ok(field) => {
                    record.push_field(field);
                    Ok(())
                }
                Err(err) => {
                    Err(utf8_error(self.state.field_start.clone(), err))
                }
            };
            self.state.advance(record_end);
            result?;
            if record_end {
                return Ok(true);
            }
        }
    }

    /// Returns a borrowed iterator over all records as `StringRecord`s.
    ///
    /// Iteration stops after the first error.
    pub fn records(&mut self) -> StringRecordsIter<R> {
        StringRecordsIter { rdr: self, done: false }
    }

    /// Returns an owned iterator over all records as `StringRecord`s.
    pub fn into_records(self) -> StringRecordsIntoIter<R> {
        StringRecordsIntoIter { rdr: self, done: false }
    }

    /// Returns true if and only if there is nothing left to read.
    ///
    /// This peeks at the underlying stream, so it may block and it may fail
    /// with an I/O error. A record that has been partly read with
    /// `read_field` is never done, even if its remaining field is an empty
    /// one at the very end of the data.
    pub fn is_done(&mut self) -> Result<bool> {
        let rdr = self.rdr.as_mut().ok_or_else(Error::disposed)?;
        if self.state.eof {
            return Ok(true);
        }
        if !self.core.is_record_start() {
            return Ok(false);
        }
        skip_bom(rdr, &mut self.state)?;
        Ok(rdr.fill_buf()?.is_empty())
    }

    /// Return the number of fields in the first record.
    ///
    /// # Errors
    ///
    /// `ErrorKind::ColumnCountUnknown` if the first record has not been read
    /// in full yet, and `ErrorKind::Disposed` after `close`.
    pub fn column_count(&self) -> Result<u64> {
        if self.rdr.is_none() {
            return Err(Error::disposed());
        }
        self.state
            .column_count
            .ok_or_else(|| Error::new(ErrorKind::ColumnCountUnknown))
    }

    /// Return the position of the next field to be read.
    pub fn position(&self) -> &Position {
        &self.state.pos
    }

    /// Return the index of the record the reader is positioned at.
    pub fn current_record(&self) -> u64 {
        self.state.pos.record()
    }

    /// Return the index, within the current record, of the next field to be
    /// read.
    pub fn current_field(&self) -> u64 {
        self.state.pos.field()
    }

    /// Return the character encoding this reader was configured with.
    pub fn encoding(&self) -> Encoding {
        self.state.encoding
    }

    /// Returns true if and only if `close` has not been called.
    pub fn is_open(&self) -> bool {
        self.rdr.is_some()
    }

    /// Close this reader.
    ///
    /// If the reader was built with `leave_open(true)`, the underlying
    /// stream is returned. Otherwise it is dropped and `None` is returned.
    /// Any data buffered but not yet read is discarded either way. Every
    /// later operation on this reader fails with `ErrorKind::Disposed`.
    /// Closing a reader twice does nothing.
    pub fn close(&mut self) -> Option<R> {
        let rdr = self.rdr.take()?;
        debug!(
            "closing CSV reader at record {} (byte {})",
            self.state.pos.record(),
            self.state.pos.byte()
        );
        if self.state.leave_open {
            Some(rdr.into_inner())
        } else {
            None
        }
    }

    /// Scan the next field into `self.state.field`, without advancing the
    /// field or record index. Returns whether the field ended its record, or
    /// `None` at the end of the data.
    fn read_field_impl(&mut self) -> Result<Option<bool>> {
        let rdr = self.rdr.as_mut().ok_or_else(Error::disposed)?;
        if self.state.eof {
            return Ok(None);
        }
        skip_bom(rdr, &mut self.state)?;

        let mut outlen = match self.state.partial.take() {
            Some(outlen) => outlen,
            None => {
                self.state.field_start = self.state.pos.clone();
                0
            }
        };
        let field = &mut self.state.field;
        field.resize(field.capacity(), 0);
        loop {
            let (res, nin, nout) = {
                let input = match rdr.fill_buf() {
                    Ok(input) => input,
                    Err(err) => {
                        self.state.partial = Some(outlen);
                        return Err(err.into());
                    }
                };
                self.core.read_field(input, &mut field[outlen..])
            };
            rdr.consume(nin);
            self.state.pos.byte += nin as u64;
            self.state.pos.line = self.core.line();
            outlen += nout;
            match res {
                ReadFieldResult::InputEmpty => continue,
                ReadFieldResult::OutputFull => {
                    let new_len = field.len().saturating_mul(2).max(64);
                    field.resize(new_len, 0);
                    continue;
                }
                ReadFieldResult::Field { record_end } => {
                    field.truncate(outlen);
                    return Ok(Some(record_end));
                }
                ReadFieldResult::End => {
                    field.truncate(0);
                    self.state.eof = true;
                    return Ok(None);
                }
                ReadFieldResult::Malformed(err) => {
                    field.truncate(0);
                    self.state.eof = true;
                    return Err(Error::new(ErrorKind::Format {
                        pos: self.state.field_start.clone(),
                        err,
                    }));
                }
            }
        }
    }
}

impl ReaderState {
    /// Move past the field just read.
    fn advance(&mut self, record_end: bool) {
        self.pos.field += 1;
        if !record_end {
            return;
        }
        if self.column_count.is_none() {
            debug!("CSV column count locked at {}", self.pos.field);
            self.column_count = Some(self.pos.field);
        }
        trace!(
            "read CSV record {} with {} fields",
            self.pos.record,
            self.pos.field
        );
        self.pos.record += 1;
        self.pos.field = 0;
    }
}

fn skip_bom<R: io::Read>(
    rdr: &mut io::BufReader<R>,
    state: &mut ReaderState,
) -> io::Result<()> {
    if state.bom_checked {
        return Ok(());
    }
    state.bom_checked = true;
    let bom = Encoding::Utf8Bom.preamble();
    if rdr.fill_buf()?.starts_with(bom) {
        rdr.consume(bom.len());
        state.pos.byte += bom.len() as u64;
    }
    Ok(())
}

fn utf8_error(pos: Position, err: str::Utf8Error) -> Error {
    Error::new(ErrorKind::Utf8 { pos, err })
}

/// A position in CSV data.
///
/// `record` and `field` are zero based indices of a record and of a field
/// within it. `byte` is the offset into the underlying stream and `line` is
/// one based.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    record: u64,
    field: u64,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// Returns a new position at the start of the data: byte `0`, line `1`,
    /// record `0`, field `0`.
    pub fn new() -> Position {
        Position { byte: 0, line: 1, record: 0, field: 0 }
    }

    /// The byte offset, starting at `0`, of this position.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`, of this position.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The record index, starting at `0`, of this position.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// The field index, starting at `0`, within the record.
    pub fn field(&self) -> u64 {
        self.field
    }

    /// Set the byte offset of this position.
    pub fn set_byte(&mut self, byte: u64) -> &mut Position {
        self.byte = byte;
        self
    }

    /// Set the line number of this position.
    ///
    /// If the line number is less than `1`, then this method panics.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        assert!(line > 0);
        self.line = line;
        self
    }

    /// Set the record index of this position.
    pub fn set_record(&mut self, record: u64) -> &mut Position {
        self.record = record;
        self
    }

    /// Set the field index of this position.
    pub fn set_field(&mut self, field: u64) -> &mut Position {
        self.field = field;
        self
    }
}

/// A borrowed iterator over records as strings.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying
/// CSV `Reader`.
pub struct StringRecordsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    done: bool,
}

impl<'r, R: io::Read> StringRecordsIter<'r, R> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Return a mutable reference to the underlying CSV reader.
    pub fn reader_mut(&mut self) -> &mut Reader<R> {
        &mut self.rdr
    }
}

impl<'r, R: io::Read> Iterator for StringRecordsIter<'r, R> {
    type Item = Result<StringRecord>;

    fn next(&mut self) -> Option<Result<StringRecord>> {
        if self.done {
            return None;
        }
        match self.rdr.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// An owned iterator over records as strings.
pub struct StringRecordsIntoIter<R> {
    rdr: Reader<R>,
    done: bool,
}

impl<R: io::Read> StringRecordsIntoIter<R> {
    /// Drop this iterator and return the underlying CSV reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for StringRecordsIntoIter<R> {
    type Item = Result<StringRecord>;

    fn next(&mut self) -> Option<Result<StringRecord>> {
        if self.done {
            return None;
        }
        match self.rdr.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use tablecsv_core::Malformed;

    use super::{Position, Reader, ReaderBuilder};
    use crate::error::ErrorKind;
    use crate::{Encoding, StringRecord};

    fn b(s: &str) -> &[u8] {
        s.as_bytes()
    }

    fn read_all(data: &str) -> Vec<Vec<String>> {
        Reader::from_reader(b(data))
            .into_records()
            .map(|r| r.unwrap().to_vec())
            .collect()
    }

    #[test]
    fn read_records() {
        let got = read_all("foo,bar\n\"a\nb\",\"x\"\"y\"\n ,\t");
        assert_eq!(
            got,
            vec![
                vec!["foo", "bar"],
                vec!["a\nb", "x\"y"],
                vec![" ", "\t"],
            ]
        );
    }

    #[test]
    fn read_ragged_records() {
        let got = read_all("a,b,c\nd\ne,f");
        assert_eq!(got, vec![vec!["a", "b", "c"], vec!["d"], vec!["e", "f"]]);
    }

    #[test]
    fn read_empty() {
        let mut rdr = Reader::from_reader(b(""));
        assert!(rdr.is_done().unwrap());
        assert_eq!(rdr.read_field().unwrap(), None);
        assert_eq!(rdr.read_record().unwrap(), None);
        match *rdr.column_count().unwrap_err().kind() {
            ErrorKind::ColumnCountUnknown => {}
            ref x => panic!("expected ColumnCountUnknown but got {:?}", x),
        }
    }

    #[test]
    fn read_field_positions() {
        let mut rdr = Reader::from_reader(b("a,b,c\nd,e,f"));
        for (record, expected) in
            vec![vec!["a", "b", "c"], vec!["d", "e", "f"]].iter().enumerate()
        {
            for (field, value) in expected.iter().enumerate() {
                assert_eq!(rdr.current_record(), record as u64);
                assert_eq!(rdr.current_field(), field as u64);
                assert_eq!(rdr.read_field().unwrap().unwrap(), *value);
            }
        }
        assert_eq!(rdr.current_record(), 2);
        assert_eq!(rdr.current_field(), 0);
        assert_eq!(rdr.read_field().unwrap(), None);
    }

    #[test]
    fn column_count_from_first_record() {
        let mut rdr = Reader::from_reader(b("a,b,c\nd\ne,f,g,h"));
        assert!(rdr.column_count().is_err());

        rdr.read_field().unwrap();
        rdr.read_field().unwrap();
        // Still in the middle of the first record.
        assert!(rdr.column_count().is_err());

        rdr.read_field().unwrap();
        assert_eq!(rdr.column_count().unwrap(), 3);

        assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["d"]);
        assert_eq!(rdr.read_record().unwrap().unwrap().len(), 4);
        assert_eq!(rdr.column_count().unwrap(), 3);
    }

    #[test]
    fn read_record_after_partial_fields() {
        let mut rdr = Reader::from_reader(b("a,b,c\nd,e,f"));
        assert_eq!(rdr.read_field().unwrap().unwrap(), "a");
        assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["b", "c"]);
        assert_eq!(rdr.column_count().unwrap(), 3);
        assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["d", "e", "f"]);
    }

    #[test]
    fn trailing_newline_has_no_record() {
        assert_eq!(read_all("a,b\n"), vec![vec!["a", "b"]]);
    }

    #[test]
    fn trailing_delimiter_has_empty_field() {
        let mut rdr = Reader::from_reader(b("a,"));
        assert_eq!(rdr.read_field().unwrap().unwrap(), "a");
        assert!(!rdr.is_done().unwrap());
        assert_eq!(rdr.read_field().unwrap().unwrap(), "");
        assert!(rdr.is_done().unwrap());
        assert_eq!(rdr.column_count().unwrap(), 2);
    }

    #[test]
    fn is_done_after_last_record() {
        let mut rdr = Reader::from_reader(b("a\nb"));
        assert!(!rdr.is_done().unwrap());
        rdr.read_record().unwrap();
        assert!(!rdr.is_done().unwrap());
        rdr.read_record().unwrap();
        assert!(rdr.is_done().unwrap());
    }

    #[test]
    fn unterminated_quote_is_reported_late() {
        let mut rdr = Reader::from_reader(b("a,b\nc,\"d"));
        assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["a", "b"]);
        assert_eq!(rdr.read_field().unwrap().unwrap(), "c");

        let err = rdr.read_field().unwrap_err();
        match *err.kind() {
            ErrorKind::Format { ref pos, err: Malformed::UnclosedQuote } => {
                assert_eq!(pos.record(), 1);
                assert_eq!(pos.field(), 1);
                assert_eq!(pos.byte(), 6);
                assert_eq!(pos.line(), 2);
            }
            ref x => panic!("expected Format error but got {:?}", x),
        }
        // The reader is finished after a format error.
        assert_eq!(rdr.read_field().unwrap(), None);
        assert!(rdr.is_done().unwrap());
    }

    #[test]
    fn data_after_closing_quote() {
        let mut rdr = Reader::from_reader(b("\"a\"b,c"));
        match rdr.read_record().unwrap_err().into_kind() {
            ErrorKind::Format { err, .. } => {
                assert_eq!(err, Malformed::DataAfterQuote(b'b'));
            }
            x => panic!("expected Format error but got {:?}", x),
        }
    }

    #[test]
    fn invalid_utf8() {
        let mut rdr = Reader::from_reader(&b"ok,\xFF\xFE\nnext"[..]);
        assert_eq!(rdr.read_field().unwrap().unwrap(), "ok");
        match rdr.read_field().unwrap_err().into_kind() {
            ErrorKind::Utf8 { pos, .. } => {
                assert_eq!(pos.record(), 0);
                assert_eq!(pos.field(), 1);
            }
            x => panic!("expected Utf8 error but got {:?}", x),
        }
        // Unlike a format error, a bad field can be skipped.
        assert_eq!(rdr.current_record(), 1);
        assert_eq!(rdr.read_field().unwrap().unwrap(), "next");
    }

    #[test]
    fn long_fields_with_tiny_buffer() {
        let long = "x".repeat(5000);
        let data = format!("{},\"{}\"\"\"\nshort", long, long);
        let mut rdr = ReaderBuilder::new()
            .buffer_capacity(3)
            .from_reader(data.as_bytes());
        let rec = rdr.read_record().unwrap().unwrap();
        assert_eq!(rec.get(0), Some(long.as_str()));
        assert_eq!(rec.get(1), Some(format!("{}\"", long).as_str()));
        assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["short"]);
    }

    #[test]
    fn skips_byte_order_mark() {
        let mut rdr = Reader::from_reader(&b"\xEF\xBB\xBF\"a\",b"[..]);
        assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["a", "b"]);
        assert_eq!(rdr.position().byte(), 8);

        let mut rdr = Reader::from_reader(&b"\xEF\xBB\xBF"[..]);
        assert!(rdr.is_done().unwrap());
        assert_eq!(rdr.read_record().unwrap(), None);
    }

    #[test]
    fn records_iter_stops_after_error() {
        let mut rdr = Reader::from_reader(b("a\n\"b"));
        let results: Vec<_> = rdr.records().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn read_record_into_reuses() {
        let mut rdr = Reader::from_reader(b("a,b\nc"));
        let mut rec = StringRecord::new();
        assert!(rdr.read_record_into(&mut rec).unwrap());
        assert_eq!(rec, vec!["a", "b"]);
        assert!(rdr.read_record_into(&mut rec).unwrap());
        assert_eq!(rec, vec!["c"]);
        assert!(!rdr.read_record_into(&mut rec).unwrap());
        assert!(rec.is_empty());
    }

    #[test]
    fn closed_reader_is_disposed() {
        let mut rdr = Reader::from_reader(b("a,b"));
        assert!(rdr.close().is_none());
        assert!(!rdr.is_open());
        for err in vec![
            rdr.read_field().unwrap_err(),
            rdr.read_record().unwrap_err(),
            rdr.is_done().unwrap_err(),
            rdr.column_count().unwrap_err(),
        ] {
            match *err.kind() {
                ErrorKind::Disposed => {}
                ref x => panic!("expected Disposed but got {:?}", x),
            }
        }
        assert!(rdr.close().is_none());
    }

    #[test]
    fn leave_open_returns_stream() {
        let mut src = io::Cursor::new(b("a\nb").to_vec());
        {
            let mut rdr = ReaderBuilder::new()
                .leave_open(true)
                .from_reader(&mut src);
            assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["a"]);
            assert!(rdr.close().is_some());
        }
        // The stream outlives the reader.
        assert_eq!(src.get_ref().len(), 3);
    }

    #[test]
    fn encoding_is_reported() {
        let rdr = ReaderBuilder::new()
            .encoding(Encoding::Utf8Bom)
            .from_reader(b(""));
        assert_eq!(rdr.encoding(), Encoding::Utf8Bom);
        assert_eq!(Reader::from_reader(b("")).encoding(), Encoding::Utf8);
    }

    /// Hands out `data` a few bytes at a time, failing once with
    /// `Interrupted` when `interrupt_at` bytes have been read.
    struct Interrupting {
        data: &'static [u8],
        pos: usize,
        interrupt_at: Option<usize>,
    }

    impl io::Read for Interrupting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_at == Some(self.pos) {
                self.interrupt_at = None;
                let kind = io::ErrorKind::Interrupted;
                return Err(io::Error::new(kind, "signal"));
            }
            let rest = &self.data[self.pos..];
            let n = rest.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&rest[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn interrupting(data: &'static str, at: usize) -> Reader<Interrupting> {
        Reader::from_reader(Interrupting {
            data: data.as_bytes(),
            pos: 0,
            interrupt_at: Some(at),
        })
    }

    #[test]
    fn interrupted_field_is_resumed() {
        let mut rdr = interrupting("abcdef,g", 3);
        let err = rdr.read_field().unwrap_err();
        assert!(err.is_io_error());
        assert_eq!(rdr.current_field(), 0);
        assert_eq!(rdr.read_field().unwrap().as_deref(), Some("abcdef"));
        assert_eq!(rdr.read_field().unwrap().as_deref(), Some("g"));
        assert_eq!(rdr.read_field().unwrap(), None);
    }

    #[test]
    fn interrupted_quoted_field_is_resumed() {
        let mut rdr = interrupting("x\n\"a,\"\"b\nc\",y", 6);
        assert_eq!(rdr.read_record().unwrap().unwrap(), vec!["x"]);
        assert!(rdr.read_field().is_err());
        assert_eq!(
            rdr.read_record().unwrap().unwrap(),
            vec!["a,\"b\nc", "y"]
        );
        assert_eq!(rdr.read_record().unwrap(), None);
    }

    #[test]
    fn interrupted_malformed_field_keeps_its_start() {
        let mut rdr = interrupting("a,\"bcdef\"g", 6);
        assert_eq!(rdr.read_field().unwrap().as_deref(), Some("a"));
        assert!(rdr.read_field().unwrap_err().is_io_error());
        let err = rdr.read_field().unwrap_err();
        match *err.kind() {
            ErrorKind::Format { ref pos, .. } => {
                assert_eq!((pos.byte(), pos.field()), (2, 1));
            }
            ref x => panic!("expected Format but got {:?}", x),
        }
    }

    #[test]
    fn position_setters() {
        let mut pos = Position::new();
        pos.set_byte(5).set_line(2).set_record(1).set_field(3);
        assert_eq!(
            (pos.byte(), pos.line(), pos.record(), pos.field()),
            (5, 2, 1, 3)
        );
        assert_eq!(Position::default(), Position::new());
    }
}
