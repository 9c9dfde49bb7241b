//! Contains data structures to deal with field paths inside documents.
use std::{
    borrow::Borrow,
    fmt::{self, Debug, Display},
    mem,
    ops::Deref,
    str::FromStr,
};

use crate::Error;

/// The separator between the individual components of a [FieldPath].
const SEPARATOR: char = '.';

/// Represents a dot-delimited path to a field inside a document, for example
/// `children.0.children.3.deleted_at`.
///
/// Components consisting only of ASCII digits address array positions when
/// the value they're applied to is an array, all other components address
/// object keys. The empty path refers to the document itself.
#[derive(Eq, Hash, PartialEq)]
#[repr(transparent)] // SAFETY: Representation has to match str
pub struct FieldPath {
    // As field names cannot contain dots, we use them as separators here.
    inner: str,
}

/// A single component of a [FieldPath].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment<'a>(&'a str);

impl<'a> Segment<'a> {
    /// The component as an object key.
    pub fn as_key(&self) -> &'a str {
        self.0
    }

    /// The component as an array position, if it is numeric.
    pub fn as_index(&self) -> Option<usize> {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            self.0.parse().ok()
        } else {
            None
        }
    }
}

impl Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Checks a single component for validity.
/// We disallow the separator, null bytes and the empty string.
fn is_valid_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR) && !name.contains('\0')
}

impl FieldPath {
    // SAFETY: The empty path is valid.
    pub const ROOT: &'static FieldPath = unsafe { FieldPath::from_str_unchecked("") };

    /// Convert a string slice to a path, without checking validity.
    const unsafe fn from_str_unchecked(s: &str) -> &FieldPath {
        // SAFETY: &str and &FieldPath have the same representation.
        unsafe { mem::transmute(s) }
    }

    fn from_str_checked(s: &str) -> Option<&FieldPath> {
        if !s.is_empty() && !s.split(SEPARATOR).all(is_valid_segment) {
            return None;
        }

        // SAFETY: We have verified that the path contains no empty components.
        Some(unsafe { FieldPath::from_str_unchecked(s) })
    }

    /// Returns the path without its final component, if there is one.
    ///
    /// Note that the parent of a single field name is [FieldPath::ROOT].
    /// [FieldPath::ROOT] is the only path without a parent.
    pub fn parent(&self) -> Option<&FieldPath> {
        if self.inner.is_empty() {
            return None;
        }

        Some(
            if let Some((parent, _field_name)) = self.inner.rsplit_once(SEPARATOR) {
                // SAFETY: The parent of a valid FieldPath is a valid FieldPath.
                unsafe { FieldPath::from_str_unchecked(parent) }
            } else {
                FieldPath::ROOT
            },
        )
    }

    /// Creates a [FieldPathBuf] with `name` adjoined to self.
    pub fn try_join(&self, name: &str) -> Result<FieldPathBuf, Error> {
        let mut v = FieldPathBuf::with_capacity(self.inner.len() + name.len() + 1);
        v.inner.push_str(&self.inner);
        v.try_push(name)?;

        Ok(v)
    }

    /// Creates a [FieldPathBuf] with the array position `index` adjoined to self.
    pub fn join_index(&self, index: usize) -> FieldPathBuf {
        let mut v = self.to_owned();
        v.push_index(index);
        v
    }

    /// Provides an iterator over the components of the path.
    /// In case the path is empty, an empty iterator is returned.
    pub fn components(&self) -> impl DoubleEndedIterator<Item = Segment<'_>> + '_ {
        let mut iter = self.inner.split(SEPARATOR);

        // We don't want to return an empty element, consume it if it's the only one.
        if self.inner.is_empty() {
            let _ = iter.next();
        }

        iter.map(Segment)
    }

    /// Returns the final component of the path, if there is one.
    pub fn last(&self) -> Option<Segment<'_>> {
        self.components().next_back()
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&self.inner, f)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl AsRef<FieldPath> for FieldPath {
    fn as_ref(&self) -> &FieldPath {
        self
    }
}

/// Represents an owned [FieldPath].
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct FieldPathBuf {
    inner: String,
}

impl Deref for FieldPathBuf {
    type Target = FieldPath;

    fn deref(&self) -> &Self::Target {
        // SAFETY: FieldPathBuf always contains a valid FieldPath.
        unsafe { FieldPath::from_str_unchecked(&self.inner) }
    }
}

impl AsRef<FieldPath> for FieldPathBuf {
    fn as_ref(&self) -> &FieldPath {
        self
    }
}

impl ToOwned for FieldPath {
    type Owned = FieldPathBuf;

    fn to_owned(&self) -> Self::Owned {
        FieldPathBuf {
            inner: self.inner.to_owned(),
        }
    }
}

impl Borrow<FieldPath> for FieldPathBuf {
    fn borrow(&self) -> &FieldPath {
        self
    }
}

impl From<&FieldPath> for FieldPathBuf {
    fn from(value: &FieldPath) -> Self {
        value.to_owned()
    }
}

impl FromStr for FieldPathBuf {
    type Err = Error;

    fn from_str(s: &str) -> Result<FieldPathBuf, Self::Err> {
        Ok(FieldPath::from_str_checked(s)
            .ok_or_else(|| Error::InvalidRequest(format!("invalid field path: {:?}", s)))?
            .to_owned())
    }
}

impl Debug for FieldPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&**self, f)
    }
}

impl Display for FieldPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&**self, f)
    }
}

impl FieldPathBuf {
    pub fn new() -> FieldPathBuf {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> FieldPathBuf {
        Self {
            inner: String::with_capacity(capacity),
        }
    }

    /// Adjoins `name` to self.
    pub fn try_push(&mut self, name: &str) -> Result<(), Error> {
        if !is_valid_segment(name) {
            return Err(Error::InvalidRequest(format!(
                "invalid field name: {:?}",
                name
            )));
        }

        if !self.inner.is_empty() {
            self.inner.push(SEPARATOR);
        }

        self.inner.push_str(name);

        Ok(())
    }

    /// Adjoins the array position `index` to self.
    pub fn push_index(&mut self, index: usize) {
        if !self.inner.is_empty() {
            self.inner.push(SEPARATOR);
        }

        self.inner.push_str(&index.to_string());
    }
}
