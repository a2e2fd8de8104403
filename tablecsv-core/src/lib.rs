/*!
`tablecsv-core` provides the two state machines at the heart of `tablecsv`:
a [`Scanner`](struct.Scanner.html) that splits CSV text into fields and
records, and an [`Emitter`](struct.Emitter.html) that writes fields back out
with the right quoting.

Neither type performs I/O or allocates. Callers hand them input and output
buffers, and they report how much of each was used. This makes the crate
usable in `no_std` environments and leaves buffering policy to the caller.

The format is fixed: fields are separated by `,`, records by `\n`, fields
are quoted with `"` and a literal `"` inside a quoted field is written as
`""`.

# Example: scanning

This counts fields and records in an in-memory buffer. The entire input is
handed over at once, followed by an empty input to signal the end of the
data.

```
use tablecsv_core::{ReadFieldResult, Scanner};

let data = b"foo,bar\n\"a,b\",baz";
let mut scanner = Scanner::new();
let mut out = [0; 64];
let (mut input, mut fields, mut records) = (&data[..], 0, 0);
loop {
    let (res, nin, _) = scanner.read_field(input, &mut out);
    input = &input[nin..];
    match res {
        ReadFieldResult::InputEmpty => {}
        ReadFieldResult::OutputFull => panic!("field too big"),
        ReadFieldResult::Field { record_end } => {
            fields += 1;
            if record_end {
                records += 1;
            }
        }
        ReadFieldResult::End => break,
        ReadFieldResult::Malformed(err) => panic!("{}", err),
    }
}
assert_eq!((fields, records), (4, 2));
```

# Example: emitting

```
use tablecsv_core::{Emitter, WriteResult};

let mut emitter = Emitter::new();
let mut out = [0; 64];
let mut n = 0;

let (res, _, nout) = emitter.field(b"say \"hi\"", &mut out[n..]);
assert_eq!(res, WriteResult::InputEmpty);
n += nout;
n += emitter.end_field(&mut out[n..]).1;
n += emitter.delimiter(&mut out[n..]).1;
n += emitter.field(b"plain", &mut out[n..]).2;
n += emitter.end_field(&mut out[n..]).1;

assert_eq!(&out[..n], &b"\"say \"\"hi\"\"\",plain"[..]);
```
*/

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

pub use crate::emitter::{should_quote, Emitter, WriteResult};
pub use crate::scanner::{Malformed, ReadFieldResult, Scanner};

mod emitter;
mod scanner;

/// The byte that separates fields within a record.
pub const DELIMITER: u8 = b',';

/// The byte that terminates a record.
pub const NEWLINE: u8 = b'\n';

/// The byte that opens and closes a quoted field.
pub const QUOTE: u8 = b'"';
