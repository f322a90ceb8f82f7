//! Lookups in the interned property-name pool.

use crate::{
    FdtError, Result,
    blob::Fdt,
    types::ByteStr,
    util,
};

impl Fdt {
    /// Resolves a strings-block offset to the null-terminated string
    /// starting there.
    pub fn string(&self, offset: usize) -> Result<&ByteStr> {
        let bytes = self
            .strings_block()
            .get(offset..)
            .ok_or(FdtError::BadOffset)?;
        let (name, _) = util::slice_split_once(bytes, |&b| b == 0).ok_or(FdtError::BadOffset)?;
        Ok(ByteStr::new(name))
    }

    /// Scans the strings block for an exact null-terminated match.
    ///
    /// A match may start inside a longer string: any offset at the start of
    /// a null-terminated run names a string, so `"bar"` is found in the
    /// tail of an interned `"foobar"`.
    pub fn find_string<S>(&self, s: &S) -> Option<usize>
    where
        S: AsRef<[u8]> + ?Sized,
    {
        find_in_block(self.strings_block(), s.as_ref())
    }
}

/// Position of `s` followed by a null byte anywhere in `block`.
pub(crate) fn find_in_block(block: &[u8], s: &[u8]) -> Option<usize> {
    block
        .windows(s.len() + 1)
        .position(|window| &window[..s.len()] == s && window[s.len()] == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BlobBuilder;

    #[test]
    fn test_string_resolution() {
        let buffer = BlobBuilder::new()
            .extend_strings_block_from_slice(b"reg\0compatible\0")
            .build();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.string(0).unwrap(), "reg");
        assert_eq!(fdt.string(4).unwrap(), "compatible");
        assert_eq!(fdt.string(6).unwrap(), "mpatible");
    }

    #[test]
    fn test_string_out_of_bounds() {
        let buffer = BlobBuilder::new()
            .extend_strings_block_from_slice(b"reg\0")
            .build();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.string(100).unwrap_err(), FdtError::BadOffset);
    }

    #[test]
    fn test_string_unterminated() {
        let buffer = BlobBuilder::new()
            .extend_strings_block_from_slice(b"reg\0junk")
            .build();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.string(4).unwrap_err(), FdtError::BadOffset);
    }

    #[test]
    fn test_find_string() {
        let buffer = BlobBuilder::new()
            .extend_strings_block_from_slice(b"reg\0compatible\0")
            .build();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.find_string("reg"), Some(0));
        assert_eq!(fdt.find_string("compatible"), Some(4));
        assert_eq!(fdt.find_string("missing"), None);
    }

    #[test]
    fn test_find_string_suffix_sharing() {
        assert_eq!(find_in_block(b"devicetree\0", b"tree"), Some(6));
        assert_eq!(find_in_block(b"devicetree\0", b"device"), None);
        assert_eq!(find_in_block(b"", b"x"), None);
    }
}
