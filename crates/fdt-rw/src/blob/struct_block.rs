use dataview::Pod;
use endian::Be;

pub(crate) const TAG_SIZE: usize = size_of::<RawToken>();

/// A structure-block token kind.
///
/// The discriminants are the on-disk token values, so encoding a tag is a
/// plain numeric cast.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Opens a node; followed by its null-terminated name.
    BeginNode = 0x0000_0001,
    /// Closes the most recently opened node.
    EndNode = 0x0000_0002,
    /// Introduces a property record.
    Prop = 0x0000_0003,
    /// Skipped by readers; used to erase records in place.
    Nop = 0x0000_0004,
    /// Terminates the structure block.
    End = 0x0000_0009,
}

const ALL_TAGS: [Tag; 5] = [Tag::BeginNode, Tag::EndNode, Tag::Prop, Tag::Nop, Tag::End];

/// One 32-bit token slot in its on-disk big-endian form.
///
/// Not every raw value names a defined token; [`decode`](Self::decode)
/// rejects the rest.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod)]
pub struct RawToken(Be<u32>);

impl RawToken {
    #[must_use]
    pub fn new(raw: u32) -> Self {
        Self(Be::new(&raw))
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        self.0.read()
    }

    /// The token kind, when the raw value is one of the defined tokens.
    #[must_use]
    pub fn decode(self) -> Option<Tag> {
        ALL_TAGS.into_iter().find(|&tag| tag as u32 == self.raw())
    }
}

impl From<Tag> for RawToken {
    fn from(tag: Tag) -> Self {
        Self::new(tag as u32)
    }
}

/// The pair following a `PROP` token: the value's byte length and the
/// strings-block offset of the interned name.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod)]
pub struct PropDescriptor {
    value_len: Be<u32>,
    name_offset: Be<u32>,
}

impl PropDescriptor {
    #[must_use]
    pub fn new(value_len: u32, name_offset: u32) -> Self {
        Self {
            value_len: Be::new(&value_len),
            name_offset: Be::new(&name_offset),
        }
    }

    /// Declared length of the value bytes, without tag padding.
    #[must_use]
    pub fn value_len(&self) -> u32 {
        self.value_len.read()
    }

    #[must_use]
    pub fn name_offset(&self) -> u32 {
        self.name_offset.read()
    }
}

#[cfg(test)]
mod tests {
    use dataview::PodMethods as _;

    use super::*;

    #[test]
    fn test_tag_discriminants_match_the_format() {
        assert_eq!(Tag::BeginNode as u32, 1);
        assert_eq!(Tag::EndNode as u32, 2);
        assert_eq!(Tag::Prop as u32, 3);
        assert_eq!(Tag::Nop as u32, 4);
        assert_eq!(Tag::End as u32, 9);
    }

    #[test]
    fn test_raw_token_encodes_big_endian() {
        assert_eq!(RawToken::from(Tag::End).as_bytes(), &[0, 0, 0, 9]);
        assert_eq!(RawToken::new(0x0102_0304).as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_raw_token_decode_roundtrip() {
        for tag in ALL_TAGS {
            assert_eq!(RawToken::from(tag).decode(), Some(tag));
        }
    }

    #[test]
    fn test_undefined_raw_tokens_do_not_decode() {
        for raw in [0, 5, 8, 10, 0x1234_5678] {
            assert_eq!(RawToken::new(raw).decode(), None, "raw: {raw:#x}");
        }
    }

    #[test]
    fn test_prop_descriptor_layout() {
        let descriptor = PropDescriptor::new(12, 0x44);
        assert_eq!(descriptor.value_len(), 12);
        assert_eq!(descriptor.name_offset(), 0x44);
        assert_eq!(descriptor.as_bytes(), &[0, 0, 0, 12, 0, 0, 0, 0x44]);
    }
}
