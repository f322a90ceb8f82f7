//! Finding properties within a node.

use platform_cast::CastFrom as _;

use crate::{
    FdtError, Result,
    blob::{Fdt, PropDescriptor, Property, TAG_SIZE, Tag},
    types::ByteStr,
};

/// Location of a property record within the structure block.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PropPosition {
    /// Offset of the `PROP` token.
    pub(crate) offset: usize,
    /// Declared value length, without tag padding.
    pub(crate) len: usize,
    /// Strings-block offset of the interned name.
    pub(crate) name_offset: u32,
}

impl PropPosition {
    /// Offset of the first value byte.
    pub(crate) fn value_offset(&self) -> usize {
        self.offset + TAG_SIZE + size_of::<PropDescriptor>()
    }
}

impl Fdt {
    /// Looks up a property of the node at `node_offset` as a name/value
    /// view.
    pub fn property<N>(&self, node_offset: usize, name: &N) -> Result<Property<'_>>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        let pos = self.prop_position(node_offset, name.as_ref())?;
        let value = self
            .struct_bytes(pos.value_offset(), pos.len)
            .ok_or(FdtError::BadStructure)?;
        let name = self.string(usize::cast_from(pos.name_offset))?;
        Ok(Property::new(name, value))
    }

    /// Looks up a property and returns its raw value bytes.
    ///
    /// The slice stays valid until the next mutating call.
    pub fn property_value<N>(&self, node_offset: usize, name: &N) -> Result<&[u8]>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.property_value_impl(node_offset, name.as_ref())
    }

    pub(crate) fn property_value_impl(&self, node_offset: usize, name: &[u8]) -> Result<&[u8]> {
        let pos = self.prop_position(node_offset, name)?;
        self.struct_bytes(pos.value_offset(), pos.len)
            .ok_or(FdtError::BadStructure)
    }

    /// Walks the node's span and returns the location of the named
    /// property. Properties of subnodes are skipped over, not matched.
    pub(crate) fn prop_position(&self, node_offset: usize, name: &[u8]) -> Result<PropPosition> {
        let mut offset = self.check_node_offset(node_offset)?;
        let mut depth = 0_usize;
        loop {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::End => bail!(FdtError::Truncated),
                Tag::BeginNode => depth += 1,
                Tag::EndNode => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Tag::Prop if depth == 0 => {
                    let descriptor: PropDescriptor = self
                        .struct_read(offset + TAG_SIZE)
                        .ok_or(FdtError::BadStructure)?;
                    let Ok(prop_name) = self.string(usize::cast_from(descriptor.name_offset()))
                    else {
                        bail!(FdtError::BadStructure);
                    };
                    if prop_name == ByteStr::new(name) {
                        return Ok(PropPosition {
                            offset,
                            len: usize::cast_from(descriptor.value_len()),
                            name_offset: descriptor.name_offset(),
                        });
                    }
                }
                Tag::Prop | Tag::Nop => {}
            }
            offset = next;
        }
        bail!(FdtError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::vec::Vec;

    use super::*;
    use crate::testing::{BlobBuilder, BlockBuilder};

    fn sample_blob() -> Vec<u8> {
        let (struct_block, strings_block) = BlockBuilder::new()
            .begin_node(b"")
            .prop(b"model", b"test-board\0")
            .prop(b"reg", &[0, 0, 0x10, 0])
            .begin_node(b"child")
            .prop(b"reg", &[0, 0, 0x20, 0])
            .end_node()
            .end_node()
            .end()
            .build();
        BlobBuilder::new()
            .extend_struct_block_from_slice(&struct_block)
            .extend_strings_block_from_slice(&strings_block)
            .build()
    }

    #[test]
    fn test_property_view() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let prop = fdt.property(0, "model").unwrap();
        assert_eq!(prop.name(), "model");
        assert_eq!(prop.value(), b"test-board\0");
    }

    #[test]
    fn test_property_value() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.property_value(0, "reg").unwrap(), &[0, 0, 0x10, 0]);
    }

    #[test]
    fn test_subnode_properties_not_matched_on_parent() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        // The root's "reg" is found, not the child's.
        assert_eq!(fdt.property_value(0, "reg").unwrap(), &[0, 0, 0x10, 0]);
        let child = fdt.subnode_offset(0, "child").unwrap();
        assert_eq!(fdt.property_value(child, "reg").unwrap(), &[0, 0, 0x20, 0]);
    }

    #[test]
    fn test_missing_property() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(
            fdt.property_value(0, "status").unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_parent_property_not_found_on_child() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let child = fdt.subnode_offset(0, "child").unwrap();
        assert_eq!(
            fdt.property_value(child, "model").unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_bad_node_offset() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(
            fdt.property_value(8, "model").unwrap_err(),
            FdtError::BadOffset
        );
    }

    #[test]
    fn test_empty_value() {
        let (struct_block, strings_block) = BlockBuilder::new()
            .begin_node(b"")
            .prop(b"ranges", b"")
            .end_node()
            .end()
            .build();
        let buffer = BlobBuilder::new()
            .extend_struct_block_from_slice(&struct_block)
            .extend_strings_block_from_slice(&strings_block)
            .build();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.property_value(0, "ranges").unwrap(), b"");
    }
}
