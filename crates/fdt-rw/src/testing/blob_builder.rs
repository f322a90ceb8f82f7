extern crate alloc;

use alloc::{vec, vec::Vec};

use dataview::DataView;

use crate::{
    blob::{
        FIRST_SUPPORTED_VERSION, Header, LAST_SUPPORTED_VERSION, MAGIC, MEM_RSVMAP_ALIGNMENT,
        ReserveEntry, STRUCTURE_ALIGNMENT,
    },
    util,
};

/// Assembles a whole blob from raw blocks, with control over the header
/// fields, block order, and spare tail capacity.
///
/// The reserve map terminator is appended automatically.
#[derive(Debug, Clone)]
pub struct BlobBuilder {
    magic: u32,
    version: u32,
    last_comp_version: u32,
    boot_cpuid_phys: u32,
    mem_rsvmap: Vec<ReserveEntry>,
    struct_block: Vec<u8>,
    strings_block: Vec<u8>,
    free_space: usize,
    strings_before_struct: bool,
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            magic: MAGIC,
            version: LAST_SUPPORTED_VERSION,
            last_comp_version: FIRST_SUPPORTED_VERSION,
            boot_cpuid_phys: 0,
            mem_rsvmap: Vec::new(),
            struct_block: Vec::new(),
            strings_block: Vec::new(),
            free_space: 0,
            strings_before_struct: false,
        }
    }

    pub fn magic(&mut self, magic: u32) -> &mut Self {
        self.magic = magic;
        self
    }

    pub fn version(&mut self, version: u32) -> &mut Self {
        self.version = version;
        self
    }

    pub fn last_comp_version(&mut self, last_comp_version: u32) -> &mut Self {
        self.last_comp_version = last_comp_version;
        self
    }

    pub fn boot_cpuid_phys(&mut self, boot_cpuid_phys: u32) -> &mut Self {
        self.boot_cpuid_phys = boot_cpuid_phys;
        self
    }

    /// Appends zeroed spare capacity past `totalsize`.
    pub fn free_space(&mut self, free_space: usize) -> &mut Self {
        self.free_space = free_space;
        self
    }

    /// Emits the strings block ahead of the structure block, an order the
    /// read-write operations refuse.
    pub fn strings_before_struct(&mut self, yes: bool) -> &mut Self {
        self.strings_before_struct = yes;
        self
    }

    pub fn extend_mem_rsvmap_from_slice(&mut self, slice: &[ReserveEntry]) -> &mut Self {
        self.mem_rsvmap.extend_from_slice(slice);
        self
    }

    pub fn extend_struct_block_from_slice(&mut self, slice: &[u8]) -> &mut Self {
        self.struct_block.extend_from_slice(slice);
        self
    }

    pub fn extend_strings_block_from_slice(&mut self, slice: &[u8]) -> &mut Self {
        self.strings_block.extend_from_slice(slice);
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let rsv_offset = size_of::<Header>().next_multiple_of(MEM_RSVMAP_ALIGNMENT);
        let rsv_end = rsv_offset + (self.mem_rsvmap.len() + 1) * size_of::<ReserveEntry>();
        let (struct_offset, strings_offset) = if self.strings_before_struct {
            let strings_offset = rsv_end;
            let struct_offset =
                (strings_offset + self.strings_block.len()).next_multiple_of(STRUCTURE_ALIGNMENT);
            (struct_offset, strings_offset)
        } else {
            let struct_offset = rsv_end;
            (struct_offset, struct_offset + self.struct_block.len())
        };
        let data_end = if self.strings_before_struct {
            struct_offset + self.struct_block.len()
        } else {
            strings_offset + self.strings_block.len()
        };

        let mut header = Header::zeroed();
        header.set_magic(self.magic);
        header.set_total_size(util::to_u32(data_end));
        header.set_memory_reservation_block_offset(util::to_u32(rsv_offset));
        header.set_struct_block_offset(util::to_u32(struct_offset));
        header.set_struct_block_size(util::to_u32(self.struct_block.len()));
        header.set_strings_block_offset(util::to_u32(strings_offset));
        header.set_strings_block_size(util::to_u32(self.strings_block.len()));
        header.set_version(self.version);
        header.set_last_comp_version(self.last_comp_version);
        header.set_boot_cpuid_phys(self.boot_cpuid_phys);

        let mut blob = vec![0_u8; data_end + self.free_space];
        let data = DataView::from_mut(&mut blob[..]);
        data.write(0, &header);
        for (n, entry) in self.mem_rsvmap.iter().enumerate() {
            data.write(rsv_offset + n * size_of::<ReserveEntry>(), entry);
        }
        blob[struct_offset..struct_offset + self.struct_block.len()]
            .copy_from_slice(&self.struct_block);
        blob[strings_offset..strings_offset + self.strings_block.len()]
            .copy_from_slice(&self.strings_block);
        blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Fdt;

    #[test]
    fn test_default_blob_is_valid() {
        let blob = BlobBuilder::new().build();
        let fdt = Fdt::from_bytes(&blob).unwrap();
        assert_eq!(fdt.header().magic(), MAGIC);
        assert_eq!(fdt.num_mem_rsv().unwrap(), 0);
    }

    #[test]
    fn test_terminator_is_appended() {
        let blob = BlobBuilder::new()
            .extend_mem_rsvmap_from_slice(&[ReserveEntry::new(1, 2)])
            .build();
        let fdt = Fdt::from_bytes(&blob).unwrap();
        assert_eq!(fdt.num_mem_rsv().unwrap(), 1);
    }

    #[test]
    fn test_free_space_extends_buffer_only() {
        let tight = BlobBuilder::new().build();
        let roomy = BlobBuilder::new().free_space(100).build();
        assert_eq!(roomy.len(), tight.len() + 100);
        assert_eq!(
            Fdt::from_bytes(&roomy).unwrap().total_size(),
            Fdt::from_bytes(&tight).unwrap().total_size()
        );
    }

    #[test]
    fn test_strings_before_struct_layout() {
        let blob = BlobBuilder::new()
            .extend_struct_block_from_slice(&[0, 0, 0, 9])
            .extend_strings_block_from_slice(b"x\0")
            .strings_before_struct(true)
            .build();
        let fdt = Fdt::from_bytes(&blob).unwrap();
        let header = fdt.header();
        assert!(header.strings_block_offset() < header.struct_block_offset());
        assert_eq!(fdt.string(0).unwrap(), "x");
    }
}
