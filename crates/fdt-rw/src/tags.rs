//! Stepping over the structure block one token at a time.

use platform_cast::CastFrom as _;

use crate::{
    FdtError, Result,
    blob::{Fdt, PropDescriptor, RawToken, TAG_SIZE, Tag},
    util,
};

impl Fdt {
    /// Decodes the token at a structure-block offset.
    ///
    /// Returns the token kind and the offset of the token after it,
    /// skipping the node name or property record in between. The offset
    /// must be 4-aligned ([`FdtError::BadOffset`] otherwise); an
    /// unrecognized token yields [`FdtError::BadStructure`] and running off
    /// the block [`FdtError::Truncated`].
    pub fn next_tag(&self, offset: usize) -> Result<(Tag, usize)> {
        ensure!(offset.is_multiple_of(TAG_SIZE), FdtError::BadOffset);
        let token: RawToken = self.struct_read(offset).ok_or(FdtError::Truncated)?;
        let tag = token.decode().ok_or(FdtError::BadStructure)?;
        let mut next = offset + TAG_SIZE;
        match tag {
            Tag::BeginNode => {
                let name = self.node_name_bytes(next).ok_or(FdtError::Truncated)?;
                next += name.len() + 1;
            }
            Tag::Prop => {
                let descriptor: PropDescriptor =
                    self.struct_read(next).ok_or(FdtError::Truncated)?;
                next += size_of::<PropDescriptor>();
                let len = usize::cast_from(descriptor.value_len());
                ensure!(self.struct_bytes(next, len).is_some(), FdtError::Truncated);
                next += len;
            }
            Tag::EndNode | Tag::Nop | Tag::End => {}
        }
        Ok((tag, next.next_multiple_of(TAG_SIZE)))
    }

    /// The null-terminated run starting at a structure-block offset,
    /// without its terminator.
    pub(crate) fn node_name_bytes(&self, offset: usize) -> Option<&[u8]> {
        let bytes = self.struct_block().get(offset..)?;
        util::slice_split_once(bytes, |&b| b == 0).map(|(name, _)| name)
    }

    /// Verifies that `node_offset` sits on a `BEGIN_NODE` token and
    /// returns the offset of the node's first interior token.
    pub(crate) fn check_node_offset(&self, node_offset: usize) -> Result<usize> {
        let (tag, next) = self.next_tag(node_offset)?;
        ensure!(tag == Tag::BeginNode, FdtError::BadOffset);
        Ok(next)
    }

    /// The offset just past the `END_NODE` matching the node's
    /// `BEGIN_NODE`.
    pub(crate) fn node_end_offset(&self, node_offset: usize) -> Result<usize> {
        let mut offset = self.check_node_offset(node_offset)?;
        let mut depth = 1_usize;
        while depth > 0 {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::BeginNode => depth += 1,
                Tag::EndNode => depth -= 1,
                Tag::Prop | Tag::Nop => {}
                Tag::End => bail!(FdtError::Truncated),
            }
            offset = next;
        }
        Ok(offset)
    }
}
