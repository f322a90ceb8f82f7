extern crate alloc;

use alloc::{collections::btree_map::BTreeMap, vec::Vec};
use core::iter;

use dataview::PodMethods as _;

use crate::blob::{PropDescriptor, RawToken, TAG_SIZE, Tag};

/// Builds a raw structure block and its matching strings block, token by
/// token, including deliberately malformed streams.
#[derive(Debug, Clone, Default)]
pub struct BlockBuilder {
    struct_block: Vec<u8>,
    strings_block: Vec<u8>,
    name_offset: BTreeMap<&'static [u8], u32>,
}

impl BlockBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend_struct_block_from_slice(&mut self, slice: &[u8]) -> &mut Self {
        self.struct_block.extend_from_slice(slice);
        self
    }

    pub fn extend_strings_block_from_slice(&mut self, slice: &[u8]) -> &mut Self {
        self.strings_block.extend_from_slice(slice);
        self
    }

    /// Appends a raw token value, 4-aligning first. Accepts values that
    /// are not defined tokens, for corrupt-stream cases.
    pub fn token(&mut self, raw: u32) -> &mut Self {
        self.pad_to(TAG_SIZE)
            .extend_struct_block_from_slice(RawToken::new(raw).as_bytes())
    }

    pub fn tag(&mut self, tag: Tag) -> &mut Self {
        self.token(tag as u32)
    }

    pub fn pad_to(&mut self, align: usize) -> &mut Self {
        let rem = self.struct_block.len() % align;
        if rem != 0 {
            self.struct_block.extend(iter::repeat_n(0, align - rem));
        }
        self
    }

    pub fn begin_node(&mut self, name: &[u8]) -> &mut Self {
        self.tag(Tag::BeginNode).extend_struct_block_from_slice(name);
        self.struct_block.push(0);
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.tag(Tag::EndNode)
    }

    /// Appends a property record with an explicit name offset.
    pub fn prop_raw(&mut self, name_offset: u32, value: &[u8]) -> &mut Self {
        let len = u32::try_from(value.len()).unwrap();
        self.tag(Tag::Prop)
            .extend_struct_block_from_slice(PropDescriptor::new(len, name_offset).as_bytes())
            .extend_struct_block_from_slice(value)
    }

    /// Appends a property record, interning the name in the strings
    /// block.
    pub fn prop(&mut self, name: &'static [u8], value: &[u8]) -> &mut Self {
        let name_offset = *self.name_offset.entry(name).or_insert_with(|| {
            let name_offset = u32::try_from(self.strings_block.len()).unwrap();
            self.strings_block.extend_from_slice(name);
            self.strings_block.push(0);
            name_offset
        });
        self.prop_raw(name_offset, value)
    }

    pub fn nop(&mut self) -> &mut Self {
        self.tag(Tag::Nop)
    }

    pub fn end(&mut self) -> &mut Self {
        self.tag(Tag::End)
    }

    /// The accumulated structure block (4-aligned) and strings block.
    #[must_use]
    pub fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let mut struct_block = self.struct_block.clone();
        while !struct_block.len().is_multiple_of(TAG_SIZE) {
            struct_block.push(0);
        }
        (struct_block, self.strings_block.clone())
    }
}
