use core::cmp;

use memchr::{memchr, memchr3};

use crate::{DELIMITER, NEWLINE, QUOTE};

/// The result of emitting CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteResult {
    /// All of the input was written and the caller may continue with the
    /// next piece of data.
    InputEmpty,
    /// The output buffer filled up before all of the input could be written.
    /// The caller should drain the output buffer and try again with the
    /// input that was not consumed.
    OutputFull,
}

/// Returns true if and only if `field` must be wrapped in quotes.
///
/// A field is quoted when it starts or ends with a space or tab, or when it
/// contains a delimiter, a quote or a newline anywhere. (Quoting leading and
/// trailing blanks goes beyond what RFC 4180 asks for.)
pub fn should_quote(field: &[u8]) -> bool {
    match (field.first(), field.last()) {
        (Some(&first), Some(&last)) => {
            is_blank(first)
                || is_blank(last)
                || memchr3(DELIMITER, QUOTE, NEWLINE, field).is_some()
        }
        _ => false,
    }
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// A push based CSV field emitter.
///
/// The emitter writes fields, delimiters and record terminators into caller
/// provided output buffers. It decides whether a field needs quotes, writes
/// the quotes and doubles every quote inside the field. It does not decide
/// *when* delimiters or terminators are due; that bookkeeping belongs to the
/// caller.
///
/// # Quoting decisions
///
/// The quoting decision is made on the first call to `field` for a given
/// field, so that call must receive the field's complete contents. If the
/// output buffer fills up, later calls pass only the unconsumed remainder.
/// A field is finished with `end_field`, which writes the closing quote when
/// one is needed.
#[derive(Clone, Debug, Default)]
pub struct Emitter {
    in_field: bool,
    quoting: bool,
}

impl Emitter {
    /// Create a new emitter.
    pub fn new() -> Emitter {
        Emitter::default()
    }

    /// Returns true if and only if a field is in progress and it is being
    /// quoted.
    pub fn is_quoting(&self) -> bool {
        self.in_field && self.quoting
    }

    /// Write the contents of a field to `output`.
    ///
    /// Returns the result along with the number of bytes read from `input`
    /// and written to `output`.
    ///
    /// A doubled quote is never split across two output buffers: if only one
    /// byte of room is left when a quote comes up, `OutputFull` is returned
    /// without consuming it.
    pub fn field(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> (WriteResult, usize, usize) {
        let mut nout = 0;
        if !self.in_field {
            let quoting = should_quote(input);
            if quoting {
                if output.is_empty() {
                    return (WriteResult::OutputFull, 0, 0);
                }
                output[0] = QUOTE;
                nout += 1;
            }
            self.quoting = quoting;
            self.in_field = true;
        }
        let (res, nin, o) = if self.quoting {
            quote(input, &mut output[nout..])
        } else {
            let (res, n) = copy(input, &mut output[nout..]);
            (res, n, n)
        };
        (res, nin, nout + o)
    }

    /// Finish the current field, writing a closing quote if the field was
    /// quoted.
    ///
    /// This is a no-op if no field is in progress.
    pub fn end_field(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        if self.is_quoting() {
            if output.is_empty() {
                return (WriteResult::OutputFull, 0);
            }
            output[0] = QUOTE;
            self.in_field = false;
            self.quoting = false;
            return (WriteResult::InputEmpty, 1);
        }
        self.in_field = false;
        self.quoting = false;
        (WriteResult::InputEmpty, 0)
    }

    /// Write a field delimiter.
    ///
    /// The previous field must have been finished with `end_field`.
    pub fn delimiter(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        debug_assert!(!self.in_field, "delimiter written inside a field");
        write_all(&[DELIMITER], output)
    }

    /// Write a record terminator.
    ///
    /// The previous field must have been finished with `end_field`.
    pub fn terminator(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        debug_assert!(!self.in_field, "terminator written inside a field");
        write_all(&[NEWLINE], output)
    }

    /// Write an empty quoted field, `""`.
    ///
    /// A record made of a single empty field would otherwise be an empty
    /// line, which is indistinguishable from no record at all at the end of
    /// the data.
    pub fn empty_quoted(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        debug_assert!(!self.in_field, "empty field written inside a field");
        write_all(&[QUOTE, QUOTE], output)
    }
}

/// Copy `input` into `output`, doubling every quote. Unlike `copy`, a quote
/// is only consumed once both of its output bytes fit.
fn quote(input: &[u8], output: &mut [u8]) -> (WriteResult, usize, usize) {
    let (mut nin, mut nout) = (0, 0);
    loop {
        let rest = &input[nin..];
        match memchr(QUOTE, rest) {
            None => {
                let (res, n) = copy(rest, &mut output[nout..]);
                return (res, nin + n, nout + n);
            }
            Some(next) => {
                let (res, n) = copy(&rest[..next], &mut output[nout..]);
                nin += n;
                nout += n;
                if res == WriteResult::OutputFull || output.len() - nout < 2 {
                    return (WriteResult::OutputFull, nin, nout);
                }
                output[nout] = QUOTE;
                output[nout + 1] = QUOTE;
                nin += 1;
                nout += 2;
            }
        }
    }
}

/// Copy as much of `input` into `output` as fits.
fn copy(input: &[u8], output: &mut [u8]) -> (WriteResult, usize) {
    let n = cmp::min(input.len(), output.len());
    output[..n].copy_from_slice(&input[..n]);
    if n < input.len() {
        (WriteResult::OutputFull, n)
    } else {
        (WriteResult::InputEmpty, n)
    }
}

/// Write all of `data` to `output`, or nothing at all.
fn write_all(data: &[u8], output: &mut [u8]) -> (WriteResult, usize) {
    if data.len() > output.len() {
        (WriteResult::OutputFull, 0)
    } else {
        output[..data.len()].copy_from_slice(data);
        (WriteResult::InputEmpty, data.len())
    }
}
