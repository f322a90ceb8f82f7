use dataview::Pod;
use endian::Be;

/// One memory reservation: a physical range the kernel must leave alone.
///
/// The on-disk form is the format's fixed 16-byte big-endian
/// address/size pair; the map is a run of these, closed by the all-zero
/// terminator.
#[repr(C)]
#[derive(Debug, Pod, Clone, Copy, PartialEq, Eq)]
pub struct ReserveEntry {
    address: Be<u64>,
    size: Be<u64>,
}

impl ReserveEntry {
    #[must_use]
    pub fn new(address: u64, size: u64) -> Self {
        Self {
            address: Be::new(&address),
            size: Be::new(&size),
        }
    }

    /// The all-zero entry closing the map.
    #[must_use]
    pub fn terminator() -> Self {
        Self::new(0, 0)
    }

    /// Whether this entry is the map's closing `(0, 0)` marker.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.address() == 0 && self.size() == 0
    }

    #[must_use]
    pub fn address(&self) -> u64 {
        self.address.read()
    }

    /// Length of the reserved range in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size.read()
    }
}
