//! Resizing mutations, built on a single buffer-splice primitive, plus the
//! normalizer (`open_into` / `open_in_place`) and `pack`.
//!
//! Every operation here requires the canonical sub-block order (reserve
//! map, structure, strings, each directly after the one before) and a
//! version 0x11 header. A blob from any other producer goes through
//! [`Fdt::open_into`] first. Any operation that grows or shrinks a block
//! may invalidate node offsets at or after the edit point; callers re-run
//! their lookups afterwards.

use platform_cast::CastFrom as _;

use crate::{
    FdtError, Result,
    blob::{
        Fdt, FIRST_SUPPORTED_VERSION, Header, LAST_SUPPORTED_VERSION, MAGIC,
        MEM_RSVMAP_ALIGNMENT, PropDescriptor, RawToken, ReserveEntry, TAG_SIZE, Tag,
    },
    util,
};

/// A header field after `old_len` bytes became `new_len` at some point
/// before it.
fn shifted(value: usize, old_len: usize, new_len: usize) -> usize {
    value + new_len - old_len
}

impl Fdt {
    /// Layout preconditions for the resizing operations.
    fn rw_check(&self) -> Result<()> {
        let header = self.header();
        header.check()?;
        ensure!(
            header.version() >= LAST_SUPPORTED_VERSION,
            FdtError::BadVersion
        );
        let rsv_offset = header.memory_reservation_block_offset();
        ensure!(
            rsv_offset >= size_of::<Header>().next_multiple_of(MEM_RSVMAP_ALIGNMENT),
            FdtError::BadLayout
        );
        ensure!(
            header.struct_block_offset() >= rsv_offset + size_of::<ReserveEntry>(),
            FdtError::BadLayout
        );
        ensure!(
            header.strings_block_offset()
                >= header.struct_block_offset() + header.struct_block_size(),
            FdtError::BadLayout
        );
        ensure!(
            header.total_size()
                >= header.strings_block_offset() + header.strings_block_size(),
            FdtError::BadLayout
        );
        Ok(())
    }

    /// Replaces `old_len` bytes at blob offset `start` with `new_len`
    /// bytes of unspecified content, shifting everything up to `totalsize`
    /// behind it. Header fields are the caller's to fix up.
    fn splice(&mut self, start: usize, old_len: usize, new_len: usize) -> Result<()> {
        let data_end = self.total_size();
        ensure!(start + old_len <= data_end, FdtError::BadOffset);
        let new_end = shifted(data_end, old_len, new_len);
        ensure!(
            new_end <= self.capacity() && new_end <= usize::cast_from(u32::MAX),
            FdtError::NoSpace
        );
        self.buf_mut()
            .copy_within(start + old_len..data_end, start + new_len);
        Ok(())
    }

    /// Splice inside the reserve map: structure and strings shift together.
    fn splice_mem_rsv(&mut self, start: usize, old_len: usize, new_len: usize) -> Result<()> {
        self.splice(start, old_len, new_len)?;
        let mut header = self.header();
        header.set_struct_block_offset(util::to_u32(shifted(
            header.struct_block_offset(),
            old_len,
            new_len,
        )));
        header.set_strings_block_offset(util::to_u32(shifted(
            header.strings_block_offset(),
            old_len,
            new_len,
        )));
        header.set_total_size(util::to_u32(shifted(header.total_size(), old_len, new_len)));
        self.write_header(&header);
        Ok(())
    }

    /// Splice inside the structure block: the strings block shifts.
    fn splice_struct(&mut self, start: usize, old_len: usize, new_len: usize) -> Result<()> {
        self.splice(start, old_len, new_len)?;
        let mut header = self.header();
        header.set_struct_block_size(util::to_u32(shifted(
            header.struct_block_size(),
            old_len,
            new_len,
        )));
        header.set_strings_block_offset(util::to_u32(shifted(
            header.strings_block_offset(),
            old_len,
            new_len,
        )));
        header.set_total_size(util::to_u32(shifted(header.total_size(), old_len, new_len)));
        self.write_header(&header);
        Ok(())
    }

    /// Splice at the end of the strings block.
    fn splice_strings(&mut self, start: usize, old_len: usize, new_len: usize) -> Result<()> {
        self.splice(start, old_len, new_len)?;
        let mut header = self.header();
        header.set_strings_block_size(util::to_u32(shifted(
            header.strings_block_size(),
            old_len,
            new_len,
        )));
        header.set_total_size(util::to_u32(shifted(header.total_size(), old_len, new_len)));
        self.write_header(&header);
        Ok(())
    }

    /// Looks up `s` in the strings block, interning it at the end when
    /// absent. Interned names are never removed, even by [`pack`](Self::pack).
    fn find_add_string(&mut self, s: &[u8]) -> Result<u32> {
        if let Some(offset) = self.find_string(s) {
            return Ok(util::to_u32(offset));
        }
        let header = self.header();
        let end = header.strings_block_offset() + header.strings_block_size();
        self.splice_strings(end, 0, s.len() + 1)?;
        let buf = self.buf_mut();
        buf[end..end + s.len()].copy_from_slice(s);
        buf[end + s.len()] = 0;
        Ok(util::to_u32(header.strings_block_size()))
    }

    /// Creates or resizes a property.
    ///
    /// An existing value is spliced to the new length in place; a new
    /// property record lands after the node's existing properties, just
    /// ahead of its first subnode or its `END_NODE`.
    pub fn setprop<N>(&mut self, node_offset: usize, name: &N, value: &[u8]) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.setprop_impl(node_offset, name.as_ref(), value)
    }

    /// Sets a single-cell property in big-endian form.
    pub fn setprop_u32<N>(&mut self, node_offset: usize, name: &N, value: u32) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.setprop_impl(node_offset, name.as_ref(), &value.to_be_bytes())
    }

    fn setprop_impl(&mut self, node_offset: usize, name: &[u8], value: &[u8]) -> Result<()> {
        self.rw_check()?;
        let struct_base = self.header().struct_block_offset();
        match self.prop_position(node_offset, name) {
            Ok(pos) => {
                self.splice_struct(
                    struct_base + pos.value_offset(),
                    pos.len.next_multiple_of(TAG_SIZE),
                    value.len().next_multiple_of(TAG_SIZE),
                )?;
                let descriptor = PropDescriptor::new(util::to_u32(value.len()), pos.name_offset);
                self.struct_write(pos.offset + TAG_SIZE, &descriptor);
                self.write_struct_bytes(
                    pos.value_offset(),
                    value,
                    value.len().next_multiple_of(TAG_SIZE),
                );
            }
            Err(FdtError::NotFound) => {
                let name_offset = self.find_add_string(name)?;
                let insert = self.prop_insert_offset(node_offset)?;
                let record =
                    TAG_SIZE + size_of::<PropDescriptor>() + value.len().next_multiple_of(TAG_SIZE);
                self.splice_struct(struct_base + insert, 0, record)?;
                self.struct_write(insert, &RawToken::from(Tag::Prop));
                let descriptor = PropDescriptor::new(util::to_u32(value.len()), name_offset);
                self.struct_write(insert + TAG_SIZE, &descriptor);
                self.write_struct_bytes(
                    insert + TAG_SIZE + size_of::<PropDescriptor>(),
                    value,
                    value.len().next_multiple_of(TAG_SIZE),
                );
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// Removes a property record entirely.
    pub fn delprop<N>(&mut self, node_offset: usize, name: &N) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.rw_check()?;
        let pos = self.prop_position(node_offset, name.as_ref())?;
        let record = TAG_SIZE + size_of::<PropDescriptor>() + pos.len.next_multiple_of(TAG_SIZE);
        let start = self.header().struct_block_offset() + pos.offset;
        self.splice_struct(start, record, 0)
    }

    /// Creates an empty subnode and returns its offset.
    ///
    /// The new node goes at the end of the parent, just ahead of the
    /// parent's `END_NODE`; a child by the same name is rejected with
    /// [`FdtError::Exists`].
    pub fn add_subnode<N>(&mut self, parent_offset: usize, name: &N) -> Result<usize>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.add_subnode_impl(parent_offset, name.as_ref())
    }

    fn add_subnode_impl(&mut self, parent_offset: usize, name: &[u8]) -> Result<usize> {
        self.rw_check()?;
        match self.subnode_offset_impl(parent_offset, name) {
            Ok(_) => bail!(FdtError::Exists),
            Err(FdtError::NotFound) => {}
            Err(err) => return Err(err),
        }
        let insert = self.node_end_offset(parent_offset)? - TAG_SIZE;
        let name_span = (name.len() + 1).next_multiple_of(TAG_SIZE);
        let record = TAG_SIZE + name_span + TAG_SIZE;
        let start = self.header().struct_block_offset() + insert;
        self.splice_struct(start, 0, record)?;
        self.struct_write(insert, &RawToken::from(Tag::BeginNode));
        self.write_struct_bytes(insert + TAG_SIZE, name, name_span);
        self.struct_write(insert + TAG_SIZE + name_span, &RawToken::from(Tag::EndNode));
        Ok(insert)
    }

    /// Removes a node and its whole subtree.
    pub fn del_node(&mut self, node_offset: usize) -> Result<()> {
        self.rw_check()?;
        let end = self.node_end_offset(node_offset)?;
        let start = self.header().struct_block_offset() + node_offset;
        self.splice_struct(start, end - node_offset, 0)
    }

    /// Inserts a reservation ahead of the map terminator, shifting the
    /// structure and strings blocks up.
    pub fn add_mem_rsv(&mut self, address: u64, size: u64) -> Result<()> {
        self.rw_check()?;
        let n = self.num_mem_rsv()?;
        let offset = self.mem_rsv_offset(n);
        self.splice_mem_rsv(offset, 0, size_of::<ReserveEntry>())?;
        self.data_mut().write(offset, &ReserveEntry::new(address, size));
        Ok(())
    }

    /// Removes the `n`-th reservation.
    pub fn del_mem_rsv(&mut self, n: usize) -> Result<()> {
        self.rw_check()?;
        ensure!(n < self.num_mem_rsv()?, FdtError::NotFound);
        let offset = self.mem_rsv_offset(n);
        self.splice_mem_rsv(offset, size_of::<ReserveEntry>(), 0)
    }

    /// Drops slack ahead of the structure block and trims `totalsize` to
    /// the end of the strings block. Unused interned names stay.
    pub fn pack(&mut self) -> Result<()> {
        self.rw_check()?;
        let header = self.header();
        let rsv_size = (self.num_mem_rsv()? + 1) * size_of::<ReserveEntry>();
        let rsv_offset = header.memory_reservation_block_offset();
        let region = header.struct_block_offset() - rsv_offset;
        self.splice_mem_rsv(rsv_offset, region, rsv_size)?;
        let mut header = self.header();
        header.set_total_size(util::to_u32(
            header.strings_block_offset() + header.strings_block_size(),
        ));
        self.write_header(&header);
        Ok(())
    }

    /// Copies the blob into `dst` in canonical sub-block order, zeroing
    /// the free tail and stamping the destination with version 0x11.
    ///
    /// The result is what every other read-write operation requires;
    /// version 0x10 sources are upgraded along the way.
    pub fn open_into<'a>(&self, dst: &'a mut [u8]) -> Result<&'a mut Fdt> {
        let plan = self.reorg_plan()?;
        ensure!(
            plan.total <= dst.len() && plan.total <= usize::cast_from(u32::MAX),
            FdtError::NoSpace
        );

        let src_header = self.header();
        let src = self.buf();
        dst.fill(0);
        dst[plan.rsv_offset..plan.rsv_offset + plan.rsv_copy_len].copy_from_slice(
            &src[src_header.memory_reservation_block_offset()..][..plan.rsv_copy_len],
        );
        let src_struct = self.struct_block();
        ensure!(src_struct.len() >= plan.struct_size, FdtError::Truncated);
        dst[plan.struct_offset..plan.struct_offset + plan.struct_size]
            .copy_from_slice(&src_struct[..plan.struct_size]);
        let src_strings = self.strings_block();
        ensure!(src_strings.len() >= plan.strings_size, FdtError::Truncated);
        dst[plan.strings_offset..plan.strings_offset + plan.strings_size]
            .copy_from_slice(&src_strings[..plan.strings_size]);

        plan.write_header(src_header.boot_cpuid_phys(), dst);
        Fdt::from_bytes_mut(dst)
    }

    /// In-place variant of [`open_into`](Self::open_into) for the buffer
    /// the blob already lives in.
    ///
    /// Already-ordered sub-blocks are slid down directly. A misordered
    /// blob is first staged at the top of the buffer, which additionally
    /// needs room for a full copy of the source; without it the call fails
    /// with [`FdtError::NoSpace`].
    pub fn open_in_place(buf: &mut [u8]) -> Result<&mut Fdt> {
        let fdt = Fdt::from_bytes(buf)?;
        let plan = fdt.reorg_plan()?;
        let src_header = fdt.header();
        let boot_cpuid_phys = src_header.boot_cpuid_phys();
        let src_total = src_header.total_size();
        let src_rsv = src_header.memory_reservation_block_offset();
        let src_struct = src_header.struct_block_offset();
        let src_strings = src_header.strings_block_offset();
        let ordered = src_rsv >= plan.rsv_offset
            && src_struct >= src_rsv + plan.rsv_copy_len + size_of::<ReserveEntry>()
            && src_strings >= src_struct + plan.struct_size;
        ensure!(
            src_struct + plan.struct_size <= src_total
                && src_strings + plan.strings_size <= src_total,
            FdtError::Truncated
        );
        ensure!(
            plan.total <= buf.len() && plan.total <= usize::cast_from(u32::MAX),
            FdtError::NoSpace
        );

        // When sliding down in ascending order every destination starts at
        // or before its source, so the moves cannot clobber pending data;
        // otherwise work from a staged copy at the top of the buffer.
        let base = if ordered {
            0
        } else {
            let stage = buf.len() - src_total;
            ensure!(plan.total <= stage, FdtError::NoSpace);
            buf.copy_within(0..src_total, stage);
            stage
        };
        buf.copy_within(
            base + src_rsv..base + src_rsv + plan.rsv_copy_len,
            plan.rsv_offset,
        );
        buf.copy_within(
            base + src_struct..base + src_struct + plan.struct_size,
            plan.struct_offset,
        );
        buf.copy_within(
            base + src_strings..base + src_strings + plan.strings_size,
            plan.strings_offset,
        );
        // Rewrite the terminator slot and clear everything past the data.
        buf[plan.rsv_offset + plan.rsv_copy_len..plan.struct_offset].fill(0);
        buf[plan.total..].fill(0);

        plan.write_header(boot_cpuid_phys, buf);
        Fdt::from_bytes_mut(buf)
    }

    /// Canonical layout for this blob's content.
    fn reorg_plan(&self) -> Result<ReorgPlan> {
        let header = self.header();
        let rsv_entries = self.num_mem_rsv()?;
        let rsv_copy_len = rsv_entries * size_of::<ReserveEntry>();
        let struct_size = self.struct_extent()?;
        let strings_size = header.strings_block_size();
        let rsv_offset = size_of::<Header>().next_multiple_of(MEM_RSVMAP_ALIGNMENT);
        let struct_offset = rsv_offset + rsv_copy_len + size_of::<ReserveEntry>();
        let strings_offset = struct_offset + struct_size;
        Ok(ReorgPlan {
            rsv_offset,
            rsv_copy_len,
            struct_offset,
            struct_size,
            strings_offset,
            strings_size,
            total: strings_offset + strings_size,
        })
    }

    /// Byte length of the structure block up to and including the `END`
    /// tag; version 0x10 blobs lack the header field and are walked.
    fn struct_extent(&self) -> Result<usize> {
        if self.header().version() >= LAST_SUPPORTED_VERSION {
            return Ok(self.header().struct_block_size());
        }
        let mut offset = 0;
        loop {
            let (tag, next) = self.next_tag(offset)?;
            if tag == Tag::End {
                return Ok(next);
            }
            offset = next;
        }
    }

    /// Skips past the node's properties and returns the offset of the
    /// first tag after them, where a new property record belongs.
    fn prop_insert_offset(&self, node_offset: usize) -> Result<usize> {
        let mut offset = self.check_node_offset(node_offset)?;
        loop {
            let (tag, next) = self.next_tag(offset)?;
            match tag {
                Tag::Prop => offset = next,
                Tag::End => bail!(FdtError::Truncated),
                Tag::BeginNode | Tag::EndNode | Tag::Nop => return Ok(offset),
            }
        }
    }

    /// Copies `bytes` to a structure offset and zero-fills up to
    /// `padded_len`.
    fn write_struct_bytes(&mut self, struct_offset: usize, bytes: &[u8], padded_len: usize) {
        let start = self.header().struct_block_offset() + struct_offset;
        let buf = self.buf_mut();
        buf[start..start + bytes.len()].copy_from_slice(bytes);
        buf[start + bytes.len()..start + padded_len].fill(0);
    }
}

/// Canonical block placement computed ahead of a reorganization.
struct ReorgPlan {
    rsv_offset: usize,
    /// Entry bytes ahead of the terminator.
    rsv_copy_len: usize,
    struct_offset: usize,
    struct_size: usize,
    strings_offset: usize,
    strings_size: usize,
    total: usize,
}

impl ReorgPlan {
    fn write_header(&self, boot_cpuid_phys: u32, buf: &mut [u8]) {
        let mut header = Header::zeroed();
        header.set_magic(MAGIC);
        header.set_total_size(util::to_u32(self.total));
        header.set_memory_reservation_block_offset(util::to_u32(self.rsv_offset));
        header.set_struct_block_offset(util::to_u32(self.struct_offset));
        header.set_struct_block_size(util::to_u32(self.struct_size));
        header.set_strings_block_offset(util::to_u32(self.strings_offset));
        header.set_strings_block_size(util::to_u32(self.strings_size));
        header.set_version(LAST_SUPPORTED_VERSION);
        header.set_last_comp_version(FIRST_SUPPORTED_VERSION);
        header.set_boot_cpuid_phys(boot_cpuid_phys);
        dataview::DataView::from_mut(buf).write(0, &header);
    }
}
