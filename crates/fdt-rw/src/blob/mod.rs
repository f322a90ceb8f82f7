pub use self::{header::*, property::*, reserved_memory::*, struct_block::*};

mod header;
mod property;
mod reserved_memory;
mod struct_block;

use core::{fmt, ptr, slice};

use dataview::{DataView, Pod};

use crate::{FdtError, Result};

pub(crate) static UNIT_ADDRESS_SEPARATOR: u8 = b'@';
pub(crate) static PATH_SEPARATOR: u8 = b'/';

/// A flattened devicetree blob in a caller-supplied byte buffer.
///
/// The wrapped slice is the whole buffer; bytes past
/// [`total_size`](Self::total_size) are spare capacity that resizing
/// mutations may grow into. Node offsets handed out by the lookup methods
/// are relative to the start of the structure block (the root node is at
/// offset 0) and stay valid until a resizing mutation touches the blob.
#[repr(transparent)]
pub struct Fdt {
    bytes: [u8],
}

impl Fdt {
    /// Wraps a byte buffer after validating the header.
    ///
    /// The buffer may be longer than the blob's `totalsize`; the excess is
    /// treated as free capacity. A buffer shorter than `totalsize` is
    /// reported as [`FdtError::Truncated`].
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::check_buffer(bytes)?;
        // SAFETY: Fdt is #[repr(transparent)] over [u8]
        Ok(unsafe { &*(ptr::from_ref(bytes) as *const Self) })
    }

    /// Mutable variant of [`from_bytes`](Self::from_bytes); required for
    /// the write-in-place and read-write operations.
    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        Self::check_buffer(bytes)?;
        // SAFETY: Fdt is #[repr(transparent)] over [u8]
        Ok(unsafe { &mut *(ptr::from_mut(bytes) as *mut Self) })
    }

    /// Wraps the blob at `ptr`, taking the buffer length from its header.
    ///
    /// # Safety
    ///
    /// `ptr` must point to readable memory of at least `totalsize` bytes
    /// that outlives the returned reference and is not mutated while it is
    /// live.
    pub unsafe fn from_ptr(ptr: *const u8) -> Result<&'static Self> {
        ensure!(!ptr.is_null(), FdtError::BadMagic);
        let header = unsafe { ptr.cast::<Header>().read_unaligned() };
        header.check()?;
        let bytes = unsafe { slice::from_raw_parts(ptr, header.total_size()) };
        Self::from_bytes(bytes)
    }

    fn check_buffer(bytes: &[u8]) -> Result<()> {
        ensure!(bytes.len() >= size_of::<Header>(), FdtError::Truncated);
        let header: Header = DataView::from(bytes).read(0);
        header.check()?;
        ensure!(header.total_size() >= size_of::<Header>(), FdtError::Truncated);
        ensure!(header.total_size() <= bytes.len(), FdtError::Truncated);
        Ok(())
    }

    /// The blob bytes: the buffer prefix covered by `totalsize`.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.total_size()]
    }

    /// Length of the whole underlying buffer, including free capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn total_size(&self) -> usize {
        self.header().total_size()
    }

    /// A copy of the blob header.
    #[must_use]
    pub fn header(&self) -> Header {
        self.data().read(0)
    }

    pub(crate) fn write_header(&mut self, header: &Header) {
        self.data_mut().write(0, header);
    }

    pub(crate) fn data(&self) -> &DataView {
        DataView::from(&self.bytes)
    }

    pub(crate) fn data_mut(&mut self) -> &mut DataView {
        DataView::from_mut(&mut self.bytes)
    }

    pub(crate) fn buf(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// The structure block, bounded by `size_dt_struct` for version 0x11
    /// blobs and by `totalsize` for 0x10 blobs (which lack the size
    /// field).
    pub(crate) fn struct_block(&self) -> &[u8] {
        let header = self.header();
        let offset = header.struct_block_offset();
        let limit = if header.version() >= LAST_SUPPORTED_VERSION {
            header.struct_block_size()
        } else {
            header.total_size().saturating_sub(offset)
        };
        self.bytes
            .get(offset..)
            .map(|block| &block[..block.len().min(limit)])
            .unwrap_or_default()
    }

    /// The strings block; empty when the header bounds are inconsistent,
    /// which makes every name lookup fail cleanly.
    pub(crate) fn strings_block(&self) -> &[u8] {
        let header = self.header();
        self.bytes
            .get(header.strings_block_offset()..)
            .and_then(|block| block.get(..header.strings_block_size()))
            .unwrap_or_default()
    }

    /// Bounds-checked read of `len` bytes at a structure-block offset.
    pub(crate) fn struct_bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.struct_block().get(offset..)?.get(..len)
    }

    /// Bounds-checked typed read at a structure-block offset.
    pub(crate) fn struct_read<T>(&self, offset: usize) -> Option<T>
    where
        T: Pod + Copy,
    {
        let block = self.struct_block();
        (offset.checked_add(size_of::<T>())? <= block.len())
            .then(|| DataView::from(block).read(offset))
    }

    /// Typed write at a structure-block offset; the caller has already
    /// established the bounds.
    pub(crate) fn struct_write<T>(&mut self, offset: usize, value: &T)
    where
        T: Pod,
    {
        let base = self.header().struct_block_offset();
        self.data_mut().write(base + offset, value);
    }

    /// Relocates the blob into `dst` by bitwise copy.
    ///
    /// Offsets are blob-relative, so the copy is byte-identical; fails with
    /// [`FdtError::NoSpace`] when `dst` cannot hold `totalsize` bytes.
    pub fn copy_to<'a>(&self, dst: &'a mut [u8]) -> Result<&'a mut Self> {
        let total = self.total_size();
        ensure!(dst.len() >= total, FdtError::NoSpace);
        dst[..total].copy_from_slice(&self.bytes[..total]);
        Self::from_bytes_mut(dst)
    }
}

impl AsRef<[u8]> for Fdt {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for Fdt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fdt")
            .field("header", &self.header())
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}
