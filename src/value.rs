use std::borrow::Cow;
use std::fmt;

/// A single field value handed to a `Writer`.
///
/// Text is written as is. Every other variant is first turned into text by
/// the writer's [`FormatProvider`](trait.FormatProvider.html). `Null` is an
/// empty field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<'a> {
    /// An empty field.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer of at most 64 bits.
    Int(i64),
    /// An unsigned integer of at most 64 bits.
    Uint(u64),
    /// A 128-bit signed integer.
    Int128(i128),
    /// A 128-bit unsigned integer.
    Uint128(u128),
    /// A single precision float.
    Float32(f32),
    /// A double precision float.
    Float64(f64),
    /// A single character.
    Char(char),
    /// A decimal number in its invariant text form, such as `-1234.50`.
    ///
    /// Decimal types render themselves, so this carries their text exactly
    /// and leaves the provider only the choice of presentation.
    Decimal(&'a str),
    /// Arbitrary text.
    Text(&'a str),
}

/// Types that can be written as a single CSV field.
///
/// This is implemented for the primitive types, strings, `Option` (where
/// `None` is an empty field), `Value` and references to any of those.
/// Implement it for your own types to write them with
/// `Writer::write_field`.
pub trait ToField {
    /// Describe this value as a field.
    fn to_field(&self) -> Value<'_>;
}

impl<'a> ToField for Value<'a> {
    fn to_field(&self) -> Value<'_> {
        *self
    }
}

impl ToField for str {
    fn to_field(&self) -> Value<'_> {
        Value::Text(self)
    }
}

impl ToField for String {
    fn to_field(&self) -> Value<'_> {
        Value::Text(self)
    }
}

impl<'a> ToField for Cow<'a, str> {
    fn to_field(&self) -> Value<'_> {
        Value::Text(self)
    }
}

impl ToField for bool {
    fn to_field(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl ToField for char {
    fn to_field(&self) -> Value<'_> {
        Value::Char(*self)
    }
}

impl ToField for f32 {
    fn to_field(&self) -> Value<'_> {
        Value::Float32(*self)
    }
}

impl ToField for f64 {
    fn to_field(&self) -> Value<'_> {
        Value::Float64(*self)
    }
}

impl ToField for i128 {
    fn to_field(&self) -> Value<'_> {
        Value::Int128(*self)
    }
}

impl ToField for u128 {
    fn to_field(&self) -> Value<'_> {
        Value::Uint128(*self)
    }
}

macro_rules! int_to_field {
    ($variant:ident, $wide:ty, $($ty:ty),*) => {
        $(
            impl ToField for $ty {
                fn to_field(&self) -> Value<'_> {
                    Value::$variant(*self as $wide)
                }
            }
        )*
    };
}

int_to_field!(Int, i64, i8, i16, i32, i64, isize);
int_to_field!(Uint, u64, u8, u16, u32, u64, usize);

impl<T: ToField> ToField for Option<T> {
    fn to_field(&self) -> Value<'_> {
        match *self {
            Some(ref value) => value.to_field(),
            None => Value::Null,
        }
    }
}

impl<'a, T: ToField + ?Sized> ToField for &'a T {
    fn to_field(&self) -> Value<'_> {
        (**self).to_field()
    }
}

impl<'a, T: ToField + ?Sized> ToField for &'a mut T {
    fn to_field(&self) -> Value<'_> {
        (**self).to_field()
    }
}

impl<T: ToField + ?Sized> ToField for Box<T> {
    fn to_field(&self) -> Value<'_> {
        (**self).to_field()
    }
}

/// Turns non-text values into text.
///
/// Every method appends to `out` and must not fail. The provided methods
/// produce the canonical Rust rendering: `true`/`false`, plain decimal
/// integers and the shortest float text that reads back to the same value.
/// Override any of them to change the format, e.g. for a decimal comma.
/// Bear in mind that output containing `,` will be quoted.
pub trait FormatProvider: fmt::Debug {
    /// Format a boolean.
    fn format_bool(&self, value: bool, out: &mut String) {
        out.push_str(if value { "true" } else { "false" });
    }

    /// Format a signed integer.
    fn format_i64(&self, value: i64, out: &mut String) {
        out.push_str(itoa::Buffer::new().format(value));
    }

    /// Format an unsigned integer.
    fn format_u64(&self, value: u64, out: &mut String) {
        out.push_str(itoa::Buffer::new().format(value));
    }

    /// Format a 128-bit signed integer.
    fn format_i128(&self, value: i128, out: &mut String) {
        out.push_str(itoa::Buffer::new().format(value));
    }

    /// Format a 128-bit unsigned integer.
    fn format_u128(&self, value: u128, out: &mut String) {
        out.push_str(itoa::Buffer::new().format(value));
    }

    /// Format a single precision float.
    fn format_f32(&self, value: f32, out: &mut String) {
        out.push_str(ryu::Buffer::new().format(value));
    }

    /// Format a double precision float.
    fn format_f64(&self, value: f64, out: &mut String) {
        out.push_str(ryu::Buffer::new().format(value));
    }

    /// Format a character.
    fn format_char(&self, value: char, out: &mut String) {
        out.push(value);
    }

    /// Format a decimal number given in invariant form (`-` sign, `.`
    /// point).
    fn format_decimal(&self, value: &str, out: &mut String) {
        out.push_str(value);
    }
}

/// The default `FormatProvider`, which keeps every provided method.
#[derive(Clone, Copy, Debug, Default)]
pub struct Invariant;

impl FormatProvider for Invariant {}

/// Render `value` as text using `provider`, appending to `out`.
pub(crate) fn render(
    provider: &dyn FormatProvider,
    value: &Value<'_>,
    out: &mut String,
) {
    match *value {
        Value::Null => {}
        Value::Bool(v) => provider.format_bool(v, out),
        Value::Int(v) => provider.format_i64(v, out),
        Value::Uint(v) => provider.format_u64(v, out),
        Value::Int128(v) => provider.format_i128(v, out),
        Value::Uint128(v) => provider.format_u128(v, out),
        Value::Float32(v) => provider.format_f32(v, out),
        Value::Float64(v) => provider.format_f64(v, out),
        Value::Char(v) => provider.format_char(v, out),
        Value::Decimal(v) => provider.format_decimal(v, out),
        Value::Text(v) => out.push_str(v),
    }
}
