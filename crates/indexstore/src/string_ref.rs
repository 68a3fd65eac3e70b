use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use crate::engine::RawStr;
use crate::error::MalformedRecordError;

/// Bytes owned by the index store engine, borrowed for `'a`.
///
/// Nothing is copied until one of the `to_*` methods is called; those are
/// the only places where text moves from engine memory into caller memory.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StringRef<'a> {
    bytes: &'a [u8],
}

impl<'a> StringRef<'a> {
    /// # Safety
    ///
    /// `raw` must point at `raw.length` initialised bytes that stay valid and
    /// unmodified for `'a`.
    pub(crate) unsafe fn from_raw(raw: RawStr) -> Self {
        if raw.data.is_null() || raw.length == 0 {
            return Self::default();
        }
        Self {
            bytes: unsafe { std::slice::from_raw_parts(raw.data, raw.length) },
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn as_str(&self) -> Result<&'a str, std::str::Utf8Error> {
        std::str::from_utf8(self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn starts_with(&self, prefix: impl AsRef<[u8]>) -> bool {
        self.bytes.starts_with(prefix.as_ref())
    }

    pub fn ends_with(&self, suffix: impl AsRef<[u8]>) -> bool {
        self.bytes.ends_with(suffix.as_ref())
    }

    /// The final `/`- or `\`-separated component.
    pub fn file_name(&self) -> StringRef<'a> {
        let start = self
            .bytes
            .iter()
            .rposition(|&b| b == b'/' || b == b'\\')
            .map_or(0, |i| i + 1);
        StringRef {
            bytes: &self.bytes[start..],
        }
    }

    pub fn to_owned_string(&self) -> Result<String, MalformedRecordError> {
        Ok(self.as_str()?.to_owned())
    }

    pub fn to_string_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.bytes)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.to_string_lossy().into_owned())
    }
}

impl PartialEq<str> for StringRef<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for StringRef<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<[u8]> for StringRef<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

impl AsRef<[u8]> for StringRef<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl fmt::Display for StringRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for StringRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(s: &str) -> StringRef<'_> {
        unsafe { StringRef::from_raw(RawStr::from_str(s)) }
    }

    #[test]
    fn test_null_raw_string_is_empty() {
        let s = unsafe { StringRef::from_raw(RawStr::EMPTY) };
        assert!(s.is_empty());
        assert_eq!(s, "");
    }

    #[test]
    fn test_view_borrows_without_copying() {
        let owned = String::from("/src/main.c");
        let s = view(&owned);
        assert_eq!(s.as_bytes().as_ptr(), owned.as_ptr());
    }

    #[test]
    fn test_comparison_is_bytewise() {
        assert!(view("a/B.h") < view("a/a.h"));
        assert_eq!(view("é.h"), "é.h");
        assert_ne!(view("e\u{301}.h"), "é.h");
    }

    #[test]
    fn test_file_name_handles_both_separators() {
        assert_eq!(view("/src/util.h").file_name(), "util.h");
        assert_eq!(view("C:\\src\\util.h").file_name(), "util.h");
        assert_eq!(view("util.h").file_name(), "util.h");
    }

    #[test]
    fn test_invalid_utf8_is_reported_on_materialization() {
        let bytes = [b'a', 0xff, b'b'];
        let raw = RawStr {
            data: bytes.as_ptr(),
            length: bytes.len(),
        };
        let s = unsafe { StringRef::from_raw(raw) };
        assert!(matches!(
            s.to_owned_string(),
            Err(MalformedRecordError::InvalidUtf8(_))
        ));
        assert_eq!(s.to_string_lossy(), "a\u{fffd}b");
    }
}
