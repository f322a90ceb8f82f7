//! Reading the memory reservation map.

use crate::{
    FdtError, Result,
    blob::{Fdt, ReserveEntry},
};

impl Fdt {
    /// Number of reservation entries ahead of the `(0, 0)` terminator.
    pub fn num_mem_rsv(&self) -> Result<usize> {
        let mut n = 0;
        loop {
            if self.mem_rsv_raw(n)?.is_terminator() {
                return Ok(n);
            }
            n += 1;
        }
    }

    /// The `n`-th reservation entry; [`FdtError::NotFound`] past the end of
    /// the map.
    pub fn mem_rsv(&self, n: usize) -> Result<ReserveEntry> {
        ensure!(n < self.num_mem_rsv()?, FdtError::NotFound);
        self.mem_rsv_raw(n)
    }

    /// Blob-relative byte offset of the `n`-th map slot.
    pub(crate) fn mem_rsv_offset(&self, n: usize) -> usize {
        self.header().memory_reservation_block_offset() + n * size_of::<ReserveEntry>()
    }

    /// Reads slot `n` without looking for the terminator; a map running
    /// past `totalsize` is reported as [`FdtError::Truncated`].
    fn mem_rsv_raw(&self, n: usize) -> Result<ReserveEntry> {
        let offset = self.mem_rsv_offset(n);
        ensure!(
            offset + size_of::<ReserveEntry>() <= self.total_size(),
            FdtError::Truncated
        );
        Ok(self.data().read(offset))
    }
}
