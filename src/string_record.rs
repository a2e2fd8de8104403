use std::fmt;
use std::iter::FromIterator;
use std::ops::{self, Range};

/// A single CSV record stored as valid UTF-8.
///
/// All fields share one contiguous buffer, with a list of the offsets at
/// which each field ends. Reusing a `StringRecord` across reads (see
/// `Reader::read_record_into`) therefore avoids an allocation per field.
#[derive(Clone, Default, Eq)]
pub struct StringRecord {
    fields: String,
    ends: Vec<usize>,
}

impl StringRecord {
    /// Create a new empty `StringRecord`.
    pub fn new() -> StringRecord {
        StringRecord::default()
    }

    /// Create a new empty `StringRecord` with room for `buffer` bytes of
    /// field data and `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> StringRecord {
        StringRecord {
            fields: String::with_capacity(buffer),
            ends: Vec::with_capacity(fields),
        }
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> StringRecordIter {
        self.into_iter()
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.range(i).map(|range| &self.fields[range])
    }

    /// Returns true if and only if this record is empty.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Clear this record so that it has zero fields.
    ///
    /// This does not release any memory held by the record.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.ends.clear();
    }

    /// Add a new field to this record.
    pub fn push_field(&mut self, field: &str) {
        self.fields.push_str(field);
        self.ends.push(self.fields.len());
    }

    /// Return all fields of this record concatenated, without separators.
    pub fn as_str(&self) -> &str {
        &self.fields
    }

    /// Copy the fields of this record into a vector of owned strings.
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(|field| field.to_string()).collect()
    }

    fn range(&self, i: usize) -> Option<Range<usize>> {
        let end = *self.ends.get(i)?;
        let start = if i == 0 { 0 } else { self.ends[i - 1] };
        Some(start..end)
    }
}

impl ops::Index<usize> for StringRecord {
    type Output = str;

    #[inline]
    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "field index {} out of bounds for record of length {}",
                i,
                self.len()
            ),
        }
    }
}

impl fmt::Debug for StringRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&str> = self.iter().collect();
        f.debug_tuple("StringRecord").field(&fields).finish()
    }
}

impl PartialEq for StringRecord {
    fn eq(&self, other: &StringRecord) -> bool {
        self.ends == other.ends && self.fields == other.fields
    }
}

impl<T: AsRef<str>> PartialEq<[T]> for StringRecord {
    fn eq(&self, other: &[T]) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a == b.as_ref())
    }
}

impl<'a, T: AsRef<str>> PartialEq<[T]> for &'a StringRecord {
    fn eq(&self, other: &[T]) -> bool {
        (**self).eq(other)
    }
}

impl<T: AsRef<str>> PartialEq<Vec<T>> for StringRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.eq(other.as_slice())
    }
}

impl<'a, T: AsRef<str>> PartialEq<Vec<T>> for &'a StringRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        (**self).eq(other.as_slice())
    }
}

impl<T: AsRef<str>> From<Vec<T>> for StringRecord {
    fn from(fields: Vec<T>) -> StringRecord {
        StringRecord::from_iter(fields)
    }
}

impl<'a, T: AsRef<str>> From<&'a [T]> for StringRecord {
    fn from(fields: &'a [T]) -> StringRecord {
        StringRecord::from_iter(fields)
    }
}

impl<T: AsRef<str>> FromIterator<T> for StringRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> StringRecord {
        let mut record = StringRecord::new();
        record.extend(iter);
        record
    }
}

impl<T: AsRef<str>> Extend<T> for StringRecord {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for field in iter {
            self.push_field(field.as_ref());
        }
    }
}

impl<'r> IntoIterator for &'r StringRecord {
    type IntoIter = StringRecordIter<'r>;
    type Item = &'r str;

    fn into_iter(self) -> StringRecordIter<'r> {
        StringRecordIter { r: self, i_forward: 0, i_reverse: self.len() }
    }
}

/// An iterator over the fields in a string record.
///
/// The `'r` lifetime variable refers to the lifetime of the `StringRecord`
/// that is being iterated over.
#[derive(Clone)]
pub struct StringRecordIter<'r> {
    r: &'r StringRecord,
    i_forward: usize,
    i_reverse: usize,
}

impl<'r> Iterator for StringRecordIter<'r> {
    type Item = &'r str;

    #[inline]
    fn next(&mut self) -> Option<&'r str> {
        if self.i_forward == self.i_reverse {
            return None;
        }
        let field = self.r.get(self.i_forward);
        self.i_forward += 1;
        field
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let x = self.i_reverse - self.i_forward;
        (x, Some(x))
    }

    #[inline]
    fn count(self) -> usize {
        self.len()
    }
}

impl<'r> DoubleEndedIterator for StringRecordIter<'r> {
    #[inline]
    fn next_back(&mut self) -> Option<&'r str> {
        if self.i_forward == self.i_reverse {
            return None;
        }
        self.i_reverse -= 1;
        self.r.get(self.i_reverse)
    }
}

impl<'r> ExactSizeIterator for StringRecordIter<'r> {}

#[cfg(test)]
mod tests {
    use super::StringRecord;

    #[test]
    fn push_and_get() {
        let mut rec = StringRecord::new();
        rec.push_field("foo");
        rec.push_field("");
        rec.push_field("quux");

        assert_eq!(rec.len(), 3);
        assert_eq!(rec.get(0), Some("foo"));
        assert_eq!(rec.get(1), Some(""));
        assert_eq!(rec.get(2), Some("quux"));
        assert_eq!(rec.get(3), None);
        assert_eq!(&rec[2], "quux");
        assert_eq!(rec.as_str(), "fooquux");
    }

    #[test]
    fn empty_record() {
        let rec = StringRecord::new();
        assert!(rec.is_empty());
        assert_eq!(rec.get(0), None);
        assert_eq!(rec.iter().count(), 0);
    }

    #[test]
    fn single_empty_field() {
        let rec = StringRecord::from(vec![""]);
        assert!(!rec.is_empty());
        assert_eq!(rec.len(), 1);
        assert_eq!(rec.get(0), Some(""));
    }

    #[test]
    fn clear_keeps_nothing() {
        let mut rec = StringRecord::from(vec!["a", "b"]);
        rec.clear();
        assert!(rec.is_empty());
        rec.push_field("c");
        assert_eq!(rec, vec!["c"]);
    }

    #[test]
    fn iter_both_ends() {
        let rec = StringRecord::from(vec!["a", "b", "c"]);
        let mut it = rec.iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next(), Some("a"));
        assert_eq!(it.next_back(), Some("c"));
        assert_eq!(it.next(), Some("b"));
        assert_eq!(it.next(), None);
        assert_eq!(it.next_back(), None);
    }

    #[test]
    fn compare_with_slices() {
        let rec = StringRecord::from(vec!["a", "b"]);
        assert_eq!(rec, vec!["a", "b"]);
        assert_eq!(rec, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(&rec, &["a", "b"][..]);
        assert!(rec != vec!["a"]);
        assert!(rec != vec!["ab", ""]);
        assert_eq!(rec.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn debug_lists_fields() {
        let rec = StringRecord::from(vec!["x", "y z"]);
        assert_eq!(format!("{:?}", rec), "StringRecord([\"x\", \"y z\"])");
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds() {
        let rec = StringRecord::from(vec!["a"]);
        let _ = &rec[1];
    }
}
