/// UTF-8 string for descriptor fields and native API boundaries
///
/// The payload is stored without a terminator. The trailing NUL only exists
/// in the values produced by [`Utf8String::as_bytes_with_nul`] and
/// [`Utf8String::to_cstring`], so no mutator has to maintain it.

use std::cmp::Ordering;
use std::ffi::CString;
use std::fmt;
use std::ops::{Add, AddAssign, Deref};

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Utf8String {
    text: String,
}

impl Utf8String {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode UTF-16 input
    ///
    /// Surrogate pairs are combined into one code point; unpaired surrogates
    /// become U+FFFD.
    pub fn from_utf16(units: &[u16]) -> Self {
        Self {
            text: char::decode_utf16(units.iter().copied())
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
        }
    }

    /// Payload length in bytes, without terminator
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Payload followed by a single NUL byte
    pub fn as_bytes_with_nul(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text.len() + 1);
        bytes.extend_from_slice(self.text.as_bytes());
        bytes.push(0);
        bytes
    }

    /// C string for native APIs, truncated at the first interior NUL
    pub fn to_cstring(&self) -> CString {
        let bytes = self.text.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        // No NUL in bytes[..end]
        CString::new(&bytes[..end]).unwrap_or_default()
    }

    /// Resize to `len` characters, padding with `fill`
    ///
    /// Shrinking drops whole characters from the end.
    pub fn resize(&mut self, len: usize, fill: char) {
        let count = self.text.chars().count();
        if len < count {
            let cut = self.text.char_indices().nth(len).map(|(i, _)| i).unwrap_or(self.text.len());
            self.text.truncate(cut);
        } else {
            self.text.extend(std::iter::repeat(fill).take(len - count));
        }
    }

    pub fn push(&mut self, ch: char) {
        self.text.push(ch);
    }

    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn push_utf16(&mut self, units: &[u16]) {
        self.text.push_str(Self::from_utf16(units).as_str());
    }

    /// Byte-indexed substring, `count` clipped to the end
    ///
    /// # Panics
    ///
    /// If `pos > len()` or a bound is not on a character boundary.
    pub fn substr(&self, pos: usize, count: usize) -> Utf8String {
        let end = pos.saturating_add(count).min(self.text.len());
        Utf8String::from(&self.text[pos..end.max(pos)])
    }

    /// Three-way comparison like `strcmp`: negative, zero or positive
    pub fn compare(&self, other: &str) -> i32 {
        match self.text.as_str().cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// UTF-16 code units followed by a terminating zero
    pub fn to_utf16(&self) -> Vec<u16> {
        let mut units: Vec<u16> = self.text.encode_utf16().collect();
        units.push(0);
        units
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl Deref for Utf8String {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Utf8String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Utf8String {
    fn from(text: &str) -> Self {
        Self { text: text.to_string() }
    }
}

impl From<String> for Utf8String {
    fn from(text: String) -> Self {
        Self { text }
    }
}

impl From<&[u16]> for Utf8String {
    fn from(units: &[u16]) -> Self {
        Self::from_utf16(units)
    }
}

impl AddAssign<&str> for Utf8String {
    fn add_assign(&mut self, rhs: &str) {
        self.text.push_str(rhs);
    }
}

impl AddAssign<&Utf8String> for Utf8String {
    fn add_assign(&mut self, rhs: &Utf8String) {
        self.text.push_str(&rhs.text);
    }
}

impl AddAssign<char> for Utf8String {
    fn add_assign(&mut self, rhs: char) {
        self.text.push(rhs);
    }
}

impl Add<&str> for Utf8String {
    type Output = Utf8String;

    fn add(mut self, rhs: &str) -> Utf8String {
        self.text.push_str(rhs);
        self
    }
}

impl PartialEq<str> for Utf8String {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Utf8String {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl PartialOrd<str> for Utf8String {
    fn partial_cmp(&self, other: &str) -> Option<Ordering> {
        Some(self.text.as_str().cmp(other))
    }
}

impl PartialOrd<&str> for Utf8String {
    fn partial_cmp(&self, other: &&str) -> Option<Ordering> {
        Some(self.text.as_str().cmp(*other))
    }
}

#[cfg(test)]
#[path = "utf8_string_tests.rs"]
mod tests;
