//! The forward-only blob builder.
//!
//! Structure tokens are laid down from the low end of the buffer while
//! interned property names grow down from the high end; neither may cross
//! the other. Until [`finish`](SequentialWriter::finish) the header carries
//! an inverted magic number, so a half-built buffer is rejected by the
//! readers with [`FdtError::BadState`].

use dataview::DataView;

use crate::{
    FdtError, Result,
    blob::{
        Fdt, FIRST_SUPPORTED_VERSION, Header, LAST_SUPPORTED_VERSION, MAGIC,
        MEM_RSVMAP_ALIGNMENT, PropDescriptor, RawToken, ReserveEntry, SW_MAGIC, TAG_SIZE, Tag,
    },
    strings, util,
};

/// Build phase. The finished phase has no variant: `finish` consumes the
/// writer, so a spent writer cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header written, no reservation yet.
    Empty,
    /// At least one reservation written, map not yet closed.
    HaveRsv,
    /// Reserve map closed; building the structure block.
    InStruct,
}

/// One-shot builder producing a blob strictly front to back.
///
/// Legal call order: [`create`](Self::create), any number of
/// [`add_reservemap_entry`](Self::add_reservemap_entry),
/// [`finish_reservemap`](Self::finish_reservemap), then balanced
/// [`begin_node`](Self::begin_node) / [`end_node`](Self::end_node) pairs
/// with each node's [`property`](Self::property) calls ahead of its
/// subnodes, and finally [`finish`](Self::finish). Anything else yields
/// [`FdtError::BadState`].
#[derive(Debug)]
pub struct SequentialWriter<'buf> {
    buf: &'buf mut [u8],
    state: State,
    depth: usize,
    prop_allowed: bool,
}

impl<'buf> SequentialWriter<'buf> {
    /// Starts a blob in `buf`, zeroing it and writing the in-progress
    /// header.
    pub fn create(buf: &'buf mut [u8]) -> Result<Self> {
        ensure!(buf.len() >= size_of::<Header>(), FdtError::NoSpace);
        ensure!(u32::try_from(buf.len()).is_ok(), FdtError::NoSpace);
        buf.fill(0);

        let rsv_offset = size_of::<Header>().next_multiple_of(MEM_RSVMAP_ALIGNMENT);
        ensure!(buf.len() >= rsv_offset, FdtError::NoSpace);

        let mut header = Header::zeroed();
        header.set_magic(SW_MAGIC);
        header.set_version(LAST_SUPPORTED_VERSION);
        header.set_last_comp_version(FIRST_SUPPORTED_VERSION);
        header.set_total_size(util::to_u32(buf.len()));
        header.set_memory_reservation_block_offset(util::to_u32(rsv_offset));
        // The structure offset doubles as the reserve-map write cursor
        // until the map is closed; the strings offset marks the (empty)
        // high-end strings region.
        header.set_struct_block_offset(util::to_u32(rsv_offset));
        header.set_strings_block_offset(util::to_u32(buf.len()));
        DataView::from_mut(buf).write(0, &header);

        Ok(Self {
            buf,
            state: State::Empty,
            depth: 0,
            prop_allowed: false,
        })
    }

    fn header(&self) -> Header {
        DataView::from(&*self.buf).read(0)
    }

    fn write_header(&mut self, header: &Header) {
        DataView::from_mut(self.buf).write(0, header);
    }

    /// Appends one reservation to the map.
    pub fn add_reservemap_entry(&mut self, address: u64, size: u64) -> Result<()> {
        ensure!(
            matches!(self.state, State::Empty | State::HaveRsv),
            FdtError::BadState
        );
        self.push_reserve_entry(ReserveEntry::new(address, size))?;
        self.state = State::HaveRsv;
        Ok(())
    }

    /// Closes the reserve map with its terminator and opens the structure
    /// block right after it.
    pub fn finish_reservemap(&mut self) -> Result<()> {
        ensure!(
            matches!(self.state, State::Empty | State::HaveRsv),
            FdtError::BadState
        );
        self.push_reserve_entry(ReserveEntry::terminator())?;
        self.state = State::InStruct;
        self.depth = 0;
        self.prop_allowed = false;
        Ok(())
    }

    fn push_reserve_entry(&mut self, entry: ReserveEntry) -> Result<()> {
        let mut header = self.header();
        let offset = header.struct_block_offset();
        ensure!(
            offset + size_of::<ReserveEntry>() <= header.total_size(),
            FdtError::NoSpace
        );
        DataView::from_mut(self.buf).write(offset, &entry);
        header.set_struct_block_offset(util::to_u32(offset + size_of::<ReserveEntry>()));
        self.write_header(&header);
        Ok(())
    }

    /// Opens a node. The first node is the root and must have an empty
    /// name.
    pub fn begin_node<N>(&mut self, name: &N) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        ensure!(self.state == State::InStruct, FdtError::BadState);
        let name = name.as_ref();
        let record = TAG_SIZE + (name.len() + 1).next_multiple_of(TAG_SIZE);
        let offset = self.grab_space(record)?;
        self.write_token(offset, Tag::BeginNode);
        self.write_struct_bytes(offset + TAG_SIZE, name, record - TAG_SIZE);
        self.depth += 1;
        self.prop_allowed = true;
        Ok(())
    }

    /// Closes the most recently opened node.
    pub fn end_node(&mut self) -> Result<()> {
        ensure!(
            self.state == State::InStruct && self.depth >= 1,
            FdtError::BadState
        );
        let offset = self.grab_space(TAG_SIZE)?;
        self.write_token(offset, Tag::EndNode);
        self.depth -= 1;
        self.prop_allowed = false;
        Ok(())
    }

    /// Writes a property of the currently open node.
    ///
    /// Properties must precede the node's subnodes: once a subnode has
    /// been closed inside the current node, further properties are
    /// rejected with [`FdtError::BadState`].
    pub fn property<N>(&mut self, name: &N, value: &[u8]) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        ensure!(
            self.state == State::InStruct && self.depth >= 1 && self.prop_allowed,
            FdtError::BadState
        );
        let name_offset = self.find_add_string(name.as_ref())?;
        let record = TAG_SIZE + size_of::<PropDescriptor>() + value.len().next_multiple_of(TAG_SIZE);
        let offset = self.grab_space(record)?;
        self.write_token(offset, Tag::Prop);
        let descriptor = PropDescriptor::new(util::to_u32(value.len()), name_offset);
        let base = self.header().struct_block_offset() + offset;
        DataView::from_mut(self.buf).write(base + TAG_SIZE, &descriptor);
        self.write_struct_bytes(
            offset + TAG_SIZE + size_of::<PropDescriptor>(),
            value,
            value.len().next_multiple_of(TAG_SIZE),
        );
        Ok(())
    }

    /// Writes a single-cell property in big-endian form.
    pub fn property_u32<N>(&mut self, name: &N, value: u32) -> Result<()>
    where
        N: AsRef<[u8]> + ?Sized,
    {
        self.property(name, &value.to_be_bytes())
    }

    /// Terminates the structure block, relocates the interned names to
    /// just after it, stamps the real magic, and hands the finished blob
    /// back.
    pub fn finish(mut self) -> Result<&'buf mut Fdt> {
        ensure!(
            self.state == State::InStruct && self.depth == 0,
            FdtError::BadState
        );
        let offset = self.grab_space(TAG_SIZE)?;
        self.write_token(offset, Tag::End);

        // Slide the strings down from the buffer top to their final home.
        let mut header = self.header();
        let strings_size = header.strings_block_size();
        let old_offset = header.total_size() - strings_size;
        let new_offset = header.struct_block_offset() + header.struct_block_size();
        self.buf.copy_within(old_offset..old_offset + strings_size, new_offset);
        header.set_strings_block_offset(util::to_u32(new_offset));
        header.set_total_size(util::to_u32(new_offset + strings_size));
        header.set_magic(MAGIC);
        self.write_header(&header);

        // Interned names were recorded relative to the buffer end; shift
        // every descriptor to be strings-block-relative.
        let Self { buf, .. } = self;
        let fdt = Fdt::from_bytes_mut(buf)?;
        let strings_size = util::to_u32(fdt.header().strings_block_size());
        let mut offset = 0;
        loop {
            let (tag, next) = fdt.next_tag(offset)?;
            match tag {
                Tag::End => break,
                Tag::Prop => {
                    let descriptor: PropDescriptor = fdt
                        .struct_read(offset + TAG_SIZE)
                        .ok_or(FdtError::Internal)?;
                    let fixed = PropDescriptor::new(
                        descriptor.value_len(),
                        descriptor.name_offset().wrapping_add(strings_size),
                    );
                    fdt.struct_write(offset + TAG_SIZE, &fixed);
                }
                Tag::BeginNode | Tag::EndNode | Tag::Nop => {}
            }
            offset = next;
        }
        Ok(fdt)
    }

    /// Reserves `len` bytes at the structure block's write cursor,
    /// refusing to run into the strings region.
    fn grab_space(&mut self, len: usize) -> Result<usize> {
        let mut header = self.header();
        let offset = header.struct_block_size();
        let space = header
            .total_size()
            .saturating_sub(header.struct_block_offset() + header.strings_block_size());
        ensure!(offset + len <= space, FdtError::NoSpace);
        header.set_struct_block_size(util::to_u32(offset + len));
        self.write_header(&header);
        Ok(offset)
    }

    /// Interns a property name in the high-end strings region and returns
    /// its buffer-end-relative offset in two's-complement form.
    fn find_add_string(&mut self, s: &[u8]) -> Result<u32> {
        let header = self.header();
        let total = header.total_size();
        let tab_size = header.strings_block_size();
        let table = &self.buf[total - tab_size..total];
        if let Some(pos) = strings::find_in_block(table, s) {
            return Ok(0_u32.wrapping_sub(util::to_u32(tab_size - pos)));
        }

        let len = s.len() + 1;
        let struct_top = header.struct_block_offset() + header.struct_block_size();
        let start = total
            .checked_sub(tab_size + len)
            .filter(|&start| start >= struct_top)
            .ok_or(FdtError::NoSpace)?;
        self.buf[start..start + s.len()].copy_from_slice(s);
        self.buf[start + s.len()] = 0;
        let mut header = header;
        header.set_strings_block_size(util::to_u32(tab_size + len));
        self.write_header(&header);
        Ok(0_u32.wrapping_sub(util::to_u32(tab_size + len)))
    }

    fn write_token(&mut self, struct_offset: usize, tag: Tag) {
        let base = self.header().struct_block_offset() + struct_offset;
        DataView::from_mut(self.buf).write(base, &RawToken::from(tag));
    }

    /// Copies `bytes` to a structure offset and zero-fills up to
    /// `padded_len`.
    fn write_struct_bytes(&mut self, struct_offset: usize, bytes: &[u8], padded_len: usize) {
        let start = self.header().struct_block_offset() + struct_offset;
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        self.buf[start + bytes.len()..start + padded_len].fill(0);
    }
}
