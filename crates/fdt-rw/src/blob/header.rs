use dataview::Pod;
use endian::Be;
use platform_cast::CastFrom as _;

use crate::{FdtError, Result};

/// The value every finished blob starts with.
pub const MAGIC: u32 = 0xd00d_feed;
/// The marker a partially built sequential-write blob carries in place of
/// [`MAGIC`] until [`finish`](crate::SequentialWriter::finish).
pub(crate) const SW_MAGIC: u32 = !MAGIC;

/// Oldest blob version this library reads.
pub const FIRST_SUPPORTED_VERSION: u32 = 0x10;
/// Newest blob version this library reads; the version it writes.
pub const LAST_SUPPORTED_VERSION: u32 = 0x11;

pub(crate) const MEM_RSVMAP_ALIGNMENT: usize = 8;
pub(crate) const STRUCTURE_ALIGNMENT: usize = 4;

/// The fixed 40-byte header at the start of every blob.
///
/// All fields are stored big-endian. The `size_dt_struct` field only
/// exists for version 0x11 blobs; accessors that depend on it take the
/// version into account.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod)]
pub struct Header {
    magic: Be<u32>,
    total_size: Be<u32>,
    off_dt_struct: Be<u32>,
    off_dt_strings: Be<u32>,
    off_mem_rsvmap: Be<u32>,
    version: Be<u32>,
    last_comp_version: Be<u32>,
    boot_cpuid_phys: Be<u32>,
    size_dt_strings: Be<u32>,
    size_dt_struct: Be<u32>,
}

impl Header {
    pub(crate) fn zeroed() -> Self {
        Self {
            magic: Be::new(&0),
            total_size: Be::new(&0),
            off_dt_struct: Be::new(&0),
            off_dt_strings: Be::new(&0),
            off_mem_rsvmap: Be::new(&0),
            version: Be::new(&0),
            last_comp_version: Be::new(&0),
            boot_cpuid_phys: Be::new(&0),
            size_dt_strings: Be::new(&0),
            size_dt_struct: Be::new(&0),
        }
    }

    #[must_use]
    pub fn magic(&self) -> u32 {
        self.magic.read()
    }

    #[must_use]
    pub fn total_size(&self) -> usize {
        usize::cast_from(self.total_size.read())
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version.read()
    }

    #[must_use]
    pub fn last_comp_version(&self) -> u32 {
        self.last_comp_version.read()
    }

    #[must_use]
    pub fn boot_cpuid_phys(&self) -> u32 {
        self.boot_cpuid_phys.read()
    }

    #[must_use]
    pub fn memory_reservation_block_offset(&self) -> usize {
        usize::cast_from(self.off_mem_rsvmap.read())
    }

    #[must_use]
    pub fn struct_block_offset(&self) -> usize {
        usize::cast_from(self.off_dt_struct.read())
    }

    #[must_use]
    pub fn struct_block_size(&self) -> usize {
        usize::cast_from(self.size_dt_struct.read())
    }

    #[must_use]
    pub fn strings_block_offset(&self) -> usize {
        usize::cast_from(self.off_dt_strings.read())
    }

    #[must_use]
    pub fn strings_block_size(&self) -> usize {
        usize::cast_from(self.size_dt_strings.read())
    }

    pub(crate) fn set_magic(&mut self, value: u32) {
        self.magic.write(&value);
    }

    pub(crate) fn set_total_size(&mut self, value: u32) {
        self.total_size.write(&value);
    }

    pub(crate) fn set_struct_block_offset(&mut self, value: u32) {
        self.off_dt_struct.write(&value);
    }

    pub(crate) fn set_struct_block_size(&mut self, value: u32) {
        self.size_dt_struct.write(&value);
    }

    pub(crate) fn set_strings_block_offset(&mut self, value: u32) {
        self.off_dt_strings.write(&value);
    }

    pub(crate) fn set_strings_block_size(&mut self, value: u32) {
        self.size_dt_strings.write(&value);
    }

    pub(crate) fn set_memory_reservation_block_offset(&mut self, value: u32) {
        self.off_mem_rsvmap.write(&value);
    }

    pub(crate) fn set_version(&mut self, value: u32) {
        self.version.write(&value);
    }

    pub(crate) fn set_last_comp_version(&mut self, value: u32) {
        self.last_comp_version.write(&value);
    }

    pub(crate) fn set_boot_cpuid_phys(&mut self, value: u32) {
        self.boot_cpuid_phys.write(&value);
    }

    /// Checks the magic number and version range.
    ///
    /// An unfinished sequential-write blob (inverted magic) is reported as
    /// [`FdtError::BadState`]; anything else that is not an FDT at all as
    /// [`FdtError::BadMagic`]; a version outside the supported range as
    /// [`FdtError::BadVersion`].
    pub fn check(&self) -> Result<()> {
        match self.magic() {
            MAGIC => {}
            SW_MAGIC => bail!(FdtError::BadState),
            _ => bail!(FdtError::BadMagic),
        }
        ensure!(
            self.version() >= FIRST_SUPPORTED_VERSION,
            FdtError::BadVersion
        );
        ensure!(
            self.last_comp_version() <= LAST_SUPPORTED_VERSION,
            FdtError::BadVersion
        );
        Ok(())
    }
}

const _: () = assert!(size_of::<Header>() == 40);
