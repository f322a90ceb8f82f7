//! Tree navigation: subnode and path lookup, depth and parent queries,
//! whole-tree searches.

use crate::{
    FdtError, Result,
    blob::{Fdt, PATH_SEPARATOR, TAG_SIZE, Tag, UNIT_ADDRESS_SEPARATOR},
    types::ByteStr,
};

/// Whether a child's full name satisfies a requested name.
///
/// A request that carries a unit address must match in full; one without
/// matches any child whose name up to the `@` equals it.
fn node_name_eq(full: &[u8], requested: &[u8]) -> bool {
    if !full.starts_with(requested) {
        return false;
    }
    match full.get(requested.len()) {
        None => true,
        Some(&b) if b == UNIT_ADDRESS_SEPARATOR => !requested.contains(&UNIT_ADDRESS_SEPARATOR),
        Some(_) => false,
    }
}

impl Fdt {
    /// The full name (with unit address) of the node at `node_offset`.
    ///
    /// The root node's name is empty.
    pub fn node_name(&self, node_offset: usize) -> Result<&ByteStr> {
        self.check_node_offset(node_offset)?;
        let name = self
            .node_name_bytes(node_offset + TAG_SIZE)
            .ok_or(FdtError::Truncated)?;
        Ok(ByteStr::new(name))
    }

    /// Finds a direct child of the node at `parent_offset` by name.
    ///
    /// When several children differ only by unit address and the requested
    /// name has none, the first in stream order wins.
    pub fn subnode_offset<N>(&self, parent_offset: usize, name: &N) -> Result<usize>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.subnode_offset_impl(parent_offset, name.as_ref())
    }

    pub(crate) fn subnode_offset_impl(&self, parent_offset: usize, name: &[u8]) -> Result<usize> {
        let mut offset = self.check_node_offset(parent_offset)?;
        let mut depth = 0_usize;
        loop {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::End => bail!(FdtError::Truncated),
                Tag::BeginNode => {
                    depth += 1;
                    if depth == 1 {
                        let full = self
                            .node_name_bytes(offset + TAG_SIZE)
                            .ok_or(FdtError::Truncated)?;
                        if node_name_eq(full, name) {
                            return Ok(offset);
                        }
                    }
                }
                Tag::EndNode => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Tag::Prop | Tag::Nop => {}
            }
            offset = next;
        }
        bail!(FdtError::NotFound)
    }

    /// Resolves an absolute path to a node offset.
    ///
    /// The path must begin with `/`; empty components (repeated or
    /// trailing slashes) are tolerated.
    pub fn path_offset<P>(&self, path: &P) -> Result<usize>
    where
        P: AsRef<[u8]> + ?Sized,
    {
        let path = path.as_ref();
        ensure!(path.first() == Some(&PATH_SEPARATOR), FdtError::BadPath);
        let mut offset = 0;
        for component in path.split(|&b| b == PATH_SEPARATOR) {
            if component.is_empty() {
                continue;
            }
            offset = self.subnode_offset_impl(offset, component)?;
        }
        Ok(offset)
    }

    /// Reconstructs the absolute path of the node at `node_offset` into
    /// `buf` and returns the written prefix.
    pub fn node_path<'a>(&self, node_offset: usize, buf: &'a mut [u8]) -> Result<&'a ByteStr> {
        ensure!(!buf.is_empty(), FdtError::NoSpace);
        let depth = self.node_depth(node_offset)?;
        if depth == 0 {
            buf[0] = PATH_SEPARATOR;
            return Ok(ByteStr::new(&buf[..1]));
        }
        let mut len = 0_usize;
        for ancestor_depth in 1..=depth {
            let ancestor = self.supernode_at_depth(node_offset, ancestor_depth)?;
            let name = self
                .node_name_bytes(ancestor + TAG_SIZE)
                .ok_or(FdtError::Truncated)?;
            ensure!(len + 1 + name.len() <= buf.len(), FdtError::NoSpace);
            buf[len] = PATH_SEPARATOR;
            buf[len + 1..len + 1 + name.len()].copy_from_slice(name);
            len += 1 + name.len();
        }
        Ok(ByteStr::new(&buf[..len]))
    }

    /// Depth of the node at `node_offset`; the root is at depth 0.
    pub fn node_depth(&self, node_offset: usize) -> Result<usize> {
        self.supernode_walk(node_offset, 0).map(|(_, depth)| depth)
    }

    /// The ancestor of the node at `node_offset` sitting at
    /// `supernode_depth`; the node itself when the depths are equal.
    pub fn supernode_at_depth(&self, node_offset: usize, supernode_depth: usize) -> Result<usize> {
        self.supernode_walk(node_offset, supernode_depth)
            .map(|(offset, _)| offset)
    }

    /// Offset of the parent of the node at `node_offset`; the root has
    /// none ([`FdtError::NotFound`]).
    pub fn parent_offset(&self, node_offset: usize) -> Result<usize> {
        let depth = self.node_depth(node_offset)?;
        ensure!(depth > 0, FdtError::NotFound);
        self.supernode_at_depth(node_offset, depth - 1)
    }

    /// Re-walks the tree from the root up to and including the node's
    /// `BEGIN_NODE`, recording the last open node at `supernode_depth`.
    /// Returns that ancestor's offset and the node's own depth.
    fn supernode_walk(
        &self,
        node_offset: usize,
        supernode_depth: usize,
    ) -> Result<(usize, usize)> {
        self.check_node_offset(node_offset)?;
        let wanted = isize::try_from(supernode_depth).unwrap_or(isize::MAX);
        let mut offset = 0_usize;
        let mut level = -1_isize;
        let mut supernode = None;
        loop {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::End => bail!(FdtError::BadOffset),
                Tag::BeginNode => {
                    level += 1;
                    if level == wanted {
                        supernode = Some(offset);
                    }
                }
                Tag::EndNode => level -= 1,
                Tag::Prop | Tag::Nop => {}
            }
            if offset == node_offset {
                break;
            }
            offset = next;
        }
        let depth = usize::try_from(level).or(Err(FdtError::Internal))?;
        ensure!(supernode_depth <= depth, FdtError::NotFound);
        supernode.map(|offset| (offset, depth)).ok_or(FdtError::Internal)
    }

    /// Finds the next node after `start` (or the first node, `start` =
    /// `None`) whose property `name` equals `value` byte-for-byte.
    ///
    /// Pass the previous match back as `start` to continue a search.
    pub fn node_offset_by_prop_value<N>(
        &self,
        start: Option<usize>,
        name: &N,
        value: &[u8],
    ) -> Result<usize>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        let name = name.as_ref();
        let mut offset = 0_usize;
        loop {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::End => bail!(FdtError::NotFound),
                Tag::BeginNode if start.is_none_or(|s| offset > s) => {
                    match self.property_value_impl(offset, name) {
                        Ok(found) if found == value => return Ok(offset),
                        Ok(_) | Err(FdtError::NotFound) => {}
                        Err(err) => return Err(err),
                    }
                }
                _ => {}
            }
            offset = next;
        }
    }

    /// Whether the node's `compatible` list contains `compatible`
    /// byte-exactly; [`FdtError::NotFound`] when the node has no
    /// `compatible` property.
    pub fn node_check_compatible<S>(&self, node_offset: usize, compatible: &S) -> Result<bool>
    where
        S: AsRef<[u8]> + ?Sized,
    {
        let value = self.property_value_impl(node_offset, b"compatible")?;
        Ok(stringlist_contains(value, compatible.as_ref()))
    }

    /// Finds the next node after `start` compatible with `compatible`.
    pub fn node_offset_by_compatible<S>(
        &self,
        start: Option<usize>,
        compatible: &S,
    ) -> Result<usize>
    where
        S: AsRef<[u8]> + ?Sized,
    {
        let compatible = compatible.as_ref();
        let mut offset = 0_usize;
        loop {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::End => bail!(FdtError::NotFound),
                Tag::BeginNode if start.is_none_or(|s| offset > s) => {
                    match self.node_check_compatible(offset, compatible) {
                        Ok(true) => return Ok(offset),
                        Ok(false) | Err(FdtError::NotFound) => {}
                        Err(err) => return Err(err),
                    }
                }
                _ => {}
            }
            offset = next;
        }
    }
}

/// Membership test over a property value holding null-terminated strings.
fn stringlist_contains(list: &[u8], s: &[u8]) -> bool {
    let mut rest = list;
    while rest.len() > s.len() {
        if &rest[..s.len()] == s && rest[s.len()] == 0 {
            return true;
        }
        match rest.iter().position(|&b| b == 0) {
            Some(pos) => rest = &rest[pos + 1..],
            None => return false,
        }
    }
    false
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
            .prop(b"compatible", b"acme,board\0acme,board-compat\0")
            .begin_node(b"serial@1000")
            .prop(b"reg", &[0, 0, 0x10, 0])
            .end_node()
            .begin_node(b"serial@2000")
            .prop(b"reg", &[0, 0, 0x20, 0])
            .end_node()
            .begin_node(b"bus")
            .begin_node(b"eth@0")
            .prop(b"compatible", b"acme,eth\0")
            .end_node()
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
    fn test_node_name_eq_policy() {
        assert!(node_name_eq(b"serial@1000", b"serial@1000"));
        assert!(node_name_eq(b"serial@1000", b"serial"));
        assert!(node_name_eq(b"serial", b"serial"));
        assert!(!node_name_eq(b"serial@1000", b"serial@2000"));
        assert!(!node_name_eq(b"serial@1000", b"seri"));
        assert!(!node_name_eq(b"serial", b"serial@1000"));
        // A request with a unit address never matches on the base alone.
        assert!(!node_name_eq(b"serial@1000@x", b"serial@1000"));
    }

    #[test]
    fn test_subnode_offset() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let s1 = fdt.subnode_offset(0, "serial@1000").unwrap();
        let s2 = fdt.subnode_offset(0, "serial@2000").unwrap();
        assert_ne!(s1, s2);
        assert_eq!(fdt.node_name(s2).unwrap(), "serial@2000");
        // Without a unit address the first match in stream order wins.
        assert_eq!(fdt.subnode_offset(0, "serial").unwrap(), s1);
        assert_eq!(
            fdt.subnode_offset(0, "missing").unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_grandchild_not_found_as_child() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(
            fdt.subnode_offset(0, "eth@0").unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_path_offset() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.path_offset("/").unwrap(), 0);
        let eth = fdt.path_offset("/bus/eth@0").unwrap();
        assert_eq!(fdt.node_name(eth).unwrap(), "eth@0");
        // Trailing and doubled separators are tolerated.
        assert_eq!(fdt.path_offset("/bus/").unwrap(), fdt.path_offset("/bus").unwrap());
        assert_eq!(fdt.path_offset("//bus//eth@0").unwrap(), eth);
    }

    #[test]
    fn test_path_offset_requires_leading_slash() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert_eq!(fdt.path_offset("bus").unwrap_err(), FdtError::BadPath);
        assert_eq!(fdt.path_offset("").unwrap_err(), FdtError::BadPath);
    }

    #[test]
    fn test_node_path_roundtrip() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let mut buf = [0_u8; 64];
        for path in ["/", "/serial@1000", "/bus", "/bus/eth@0"] {
            let offset = fdt.path_offset(path).unwrap();
            assert_eq!(fdt.node_path(offset, &mut buf).unwrap(), path);
        }
    }

    #[test]
    fn test_node_path_no_space() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let eth = fdt.path_offset("/bus/eth@0").unwrap();
        let mut buf = [0_u8; 6];
        assert_eq!(fdt.node_path(eth, &mut buf).unwrap_err(), FdtError::NoSpace);
    }

    #[test]
    fn test_depth_and_parent() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let bus = fdt.path_offset("/bus").unwrap();
        let eth = fdt.path_offset("/bus/eth@0").unwrap();
        assert_eq!(fdt.node_depth(0).unwrap(), 0);
        assert_eq!(fdt.node_depth(bus).unwrap(), 1);
        assert_eq!(fdt.node_depth(eth).unwrap(), 2);
        assert_eq!(fdt.parent_offset(eth).unwrap(), bus);
        assert_eq!(fdt.parent_offset(bus).unwrap(), 0);
        assert_eq!(fdt.parent_offset(0).unwrap_err(), FdtError::NotFound);
    }

    #[test]
    fn test_supernode_at_depth() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let bus = fdt.path_offset("/bus").unwrap();
        let eth = fdt.path_offset("/bus/eth@0").unwrap();
        assert_eq!(fdt.supernode_at_depth(eth, 0).unwrap(), 0);
        assert_eq!(fdt.supernode_at_depth(eth, 1).unwrap(), bus);
        assert_eq!(fdt.supernode_at_depth(eth, 2).unwrap(), eth);
        assert_eq!(
            fdt.supernode_at_depth(eth, 3).unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_search_by_prop_value() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let s2 = fdt.path_offset("/serial@2000").unwrap();
        let found = fdt
            .node_offset_by_prop_value(None, "reg", &[0, 0, 0x20, 0])
            .unwrap();
        assert_eq!(found, s2);
        assert_eq!(
            fdt.node_offset_by_prop_value(Some(found), "reg", &[0, 0, 0x20, 0])
                .unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_compatible() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        assert!(fdt.node_check_compatible(0, "acme,board").unwrap());
        assert!(fdt.node_check_compatible(0, "acme,board-compat").unwrap());
        assert!(!fdt.node_check_compatible(0, "acme,other").unwrap());
        // Entries only match whole: no prefix or substring hits.
        assert!(!fdt.node_check_compatible(0, "acme,boa").unwrap());

        let bus = fdt.path_offset("/bus").unwrap();
        assert_eq!(
            fdt.node_check_compatible(bus, "acme,board").unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_search_by_compatible() {
        let buffer = sample_blob();
        let fdt = Fdt::from_bytes(&buffer).unwrap();
        let eth = fdt.path_offset("/bus/eth@0").unwrap();
        assert_eq!(
            fdt.node_offset_by_compatible(None, "acme,eth").unwrap(),
            eth
        );
        assert_eq!(
            fdt.node_offset_by_compatible(Some(eth), "acme,eth")
                .unwrap_err(),
            FdtError::NotFound
        );
    }

    #[test]
    fn test_stringlist_contains() {
        assert!(stringlist_contains(b"a\0bc\0", b"a"));
        assert!(stringlist_contains(b"a\0bc\0", b"bc"));
        assert!(!stringlist_contains(b"a\0bc\0", b"b"));
        assert!(!stringlist_contains(b"abc", b"abc"));
        assert!(!stringlist_contains(b"", b"a"));
    }
}
