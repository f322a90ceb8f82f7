//! Edits that never move a byte: same-size value overwrites and NOP
//! erasure. `totalsize` and every node offset stay valid across these.

use crate::{
    FdtError, Result,
    blob::{Fdt, PropDescriptor, RawToken, TAG_SIZE, Tag},
};

impl Fdt {
    /// Overwrites a property value without resizing it.
    ///
    /// The existing value must have exactly `value.len()` bytes;
    /// [`FdtError::NoSpace`] otherwise.
    pub fn setprop_inplace<N>(&mut self, node_offset: usize, name: &N, value: &[u8]) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        let pos = self.prop_position(node_offset, name.as_ref())?;
        ensure!(pos.len == value.len(), FdtError::NoSpace);
        let start = self.header().struct_block_offset() + pos.value_offset();
        self.buf_mut()[start..start + value.len()].copy_from_slice(value);
        Ok(())
    }

    /// Same-size overwrite with a big-endian u32 cell.
    pub fn setprop_inplace_u32<N>(&mut self, node_offset: usize, name: &N, value: u32) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.setprop_inplace(node_offset, name, &value.to_be_bytes())
    }

    /// Erases a property by overwriting its record with `NOP` tokens.
    pub fn nop_property<N>(&mut self, node_offset: usize, name: &N) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        let pos = self.prop_position(node_offset, name.as_ref())?;
        let record =
            TAG_SIZE + size_of::<PropDescriptor>() + pos.len.next_multiple_of(TAG_SIZE);
        self.nop_region(pos.offset, record);
        Ok(())
    }

    /// Erases a node and its whole subtree, `BEGIN_NODE` through the
    /// matching `END_NODE`, with `NOP` tokens.
    pub fn nop_node(&mut self, node_offset: usize) -> Result<()> {
        let end = self.node_end_offset(node_offset)?;
        self.nop_region(node_offset, end - node_offset);
        Ok(())
    }

    /// Fills a tag-aligned structure-block range with `NOP` tokens.
    fn nop_region(&mut self, struct_offset: usize, len: usize) {
        debug_assert!(len.is_multiple_of(TAG_SIZE));
        let nop = RawToken::from(Tag::Nop);
        let mut offset = struct_offset;
        while offset < struct_offset + len {
            self.struct_write(offset, &nop);
            offset += TAG_SIZE;
        }
    }
}
