use core::cmp;
use core::fmt;

use memchr::{memchr, memchr2, memchr_iter};

use crate::{DELIMITER, NEWLINE, QUOTE};

/// The ways in which CSV input can be malformed.
///
/// Once a scanner reports one of these, it stays in its final state and
/// reports `ReadFieldResult::End` on every later call until it is `reset`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Malformed {
    /// The input ended while a quoted field was still open.
    UnclosedQuote,
    /// A closing quote was followed by something other than a delimiter,
    /// a record terminator or the end of input. The offending byte is
    /// included.
    DataAfterQuote(u8),
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Malformed::UnclosedQuote => {
                write!(f, "quoted field is not closed before end of input")
            }
            Malformed::DataAfterQuote(b) => write!(
                f,
                "unexpected byte 0x{:02X} after closing quote \
                 (expected ',' or newline)",
                b
            ),
        }
    }
}

/// The result of scanning at most one field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadFieldResult {
    /// All of the caller provided input was consumed before the end of a
    /// field was found.
    InputEmpty,
    /// The caller provided output buffer filled up before the end of a field
    /// was found.
    OutputFull,
    /// The end of a field was found.
    ///
    /// When `record_end` is true, the field was also the last one of its
    /// record.
    Field {
        /// Whether this field ended its record.
        record_end: bool,
    },
    /// All CSV data has been read.
    ///
    /// This is only returned when the caller passes an empty input.
    End,
    /// The input is not well formed CSV.
    Malformed(Malformed),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    StartRecord,
    StartField,
    InField,
    InQuotedField,
    QuoteInQuotedField,
    End,
}

/// A pull based CSV field scanner.
///
/// The scanner is a small state machine. Callers feed it input a chunk at a
/// time and it copies unescaped field contents into an output buffer,
/// reporting each field boundary as it finds one. State carries over between
/// calls, so a field may span any number of input chunks.
///
/// The rules it implements:
///
/// * Leading and trailing whitespace is data.
/// * A field starting with `"` is quoted. It runs until a lone `"`; inside
///   it, `""` stands for one literal quote and `,` and `\n` are data. A
///   closing quote must be followed by `,`, `\n` or the end of input.
/// * Any other field runs until `,`, `\n` or the end of input. A `"` in the
///   middle of such a field is data.
/// * `\n` ends both the field and the record. The input may end right after
///   a record terminator without starting another record. An input ending
///   right after `,` yields one final empty field.
#[derive(Clone, Debug)]
pub struct Scanner {
    state: State,
    line: u64,
}

impl Default for Scanner {
    fn default() -> Scanner {
        Scanner { state: State::StartRecord, line: 1 }
    }
}

impl Scanner {
    /// Create a new scanner positioned at the start of the input.
    pub fn new() -> Scanner {
        Scanner::default()
    }

    /// Reset the scanner such that it behaves as if it had never been used.
    pub fn reset(&mut self) {
        *self = Scanner::default();
    }

    /// Return the current line number, counting every `\n` consumed so far,
    /// including the ones inside quoted fields.
    ///
    /// Line numbers start at `1`.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns true if and only if the scanner sits at the boundary between
    /// two records (or at the very start of the input).
    pub fn is_record_start(&self) -> bool {
        self.state == State::StartRecord
    }

    /// Returns true if and only if the scanner has reached its final state,
    /// either because all input was read or because the input was malformed.
    pub fn is_done(&self) -> bool {
        self.state == State::End
    }

    /// Scan at most one field from `input`, copying its unescaped contents
    /// into `output`.
    ///
    /// Returns the result along with the number of bytes read from `input`
    /// and written to `output`. Field contents accumulate across calls that
    /// return `InputEmpty` or `OutputFull`; it is up to the caller to
    /// concatenate them.
    ///
    /// # Termination
    ///
    /// An empty `input` tells the scanner there is no data left. Callers
    /// should keep calling with an empty input until `End` is returned, since
    /// the end of input may complete a pending field first.
    pub fn read_field(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> (ReadFieldResult, usize, usize) {
        if input.is_empty() {
            return (self.finish(), 0, 0);
        }
        let (mut nin, mut nout) = (0, 0);
        loop {
            match self.state {
                State::End => return (ReadFieldResult::End, nin, nout),
                State::StartRecord => self.state = State::StartField,
                State::StartField => {
                    if nin >= input.len() {
                        return (ReadFieldResult::InputEmpty, nin, nout);
                    }
                    match input[nin] {
                        QUOTE => {
                            nin += 1;
                            self.state = State::InQuotedField;
                        }
                        DELIMITER => {
                            return (self.end_field(false), nin + 1, nout);
                        }
                        NEWLINE => {
                            self.line += 1;
                            return (self.end_field(true), nin + 1, nout);
                        }
                        _ => self.state = State::InField,
                    }
                }
                State::InField => {
                    let n = copy_until(
                        &input[nin..],
                        &mut output[nout..],
                        |s| memchr2(DELIMITER, NEWLINE, s),
                    );
                    nin += n;
                    nout += n;
                    if nin >= input.len() {
                        return (ReadFieldResult::InputEmpty, nin, nout);
                    }
                    match input[nin] {
                        DELIMITER => {
                            return (self.end_field(false), nin + 1, nout);
                        }
                        NEWLINE => {
                            self.line += 1;
                            return (self.end_field(true), nin + 1, nout);
                        }
                        _ => return (ReadFieldResult::OutputFull, nin, nout),
                    }
                }
                State::InQuotedField => {
                    let n = copy_until(
                        &input[nin..],
                        &mut output[nout..],
                        |s| memchr(QUOTE, s),
                    );
                    self.line +=
                        memchr_iter(NEWLINE, &input[nin..nin + n]).count()
                            as u64;
                    nin += n;
                    nout += n;
                    if nin >= input.len() {
                        return (ReadFieldResult::InputEmpty, nin, nout);
                    }
                    if input[nin] != QUOTE {
                        return (ReadFieldResult::OutputFull, nin, nout);
                    }
                    nin += 1;
                    self.state = State::QuoteInQuotedField;
                }
                State::QuoteInQuotedField => {
                    if nin >= input.len() {
                        return (ReadFieldResult::InputEmpty, nin, nout);
                    }
                    match input[nin] {
                        QUOTE => {
                            if nout >= output.len() {
                                return (
                                    ReadFieldResult::OutputFull,
                                    nin,
                                    nout,
                                );
                            }
                            output[nout] = QUOTE;
                            nin += 1;
                            nout += 1;
                            self.state = State::InQuotedField;
                        }
                        DELIMITER => {
                            return (self.end_field(false), nin + 1, nout);
                        }
                        NEWLINE => {
                            self.line += 1;
                            return (self.end_field(true), nin + 1, nout);
                        }
                        b => {
                            self.state = State::End;
                            return (
                                ReadFieldResult::Malformed(
                                    Malformed::DataAfterQuote(b),
                                ),
                                nin + 1,
                                nout,
                            );
                        }
                    }
                }
            }
        }
    }

    fn end_field(&mut self, record_end: bool) -> ReadFieldResult {
        self.state =
            if record_end { State::StartRecord } else { State::StartField };
        ReadFieldResult::Field { record_end }
    }

    fn finish(&mut self) -> ReadFieldResult {
        match self.state {
            State::StartRecord | State::End => {
                self.state = State::End;
                ReadFieldResult::End
            }
            State::StartField
            | State::InField
            | State::QuoteInQuotedField => self.end_field(true),
            State::InQuotedField => {
                self.state = State::End;
                ReadFieldResult::Malformed(Malformed::UnclosedQuote)
            }
        }
    }
}

/// Copy bytes from `input` to `output` up to (not including) the first
/// position reported by `find`, or as much as fits. Returns the number of
/// bytes copied.
#[inline(always)]
fn copy_until<F>(input: &[u8], output: &mut [u8], find: F) -> usize
where
    F: Fn(&[u8]) -> Option<usize>,
{
    let limit = cmp::min(input.len(), output.len());
    let n = find(&input[..limit]).unwrap_or(limit);
    output[..n].copy_from_slice(&input[..n]);
    n
}
