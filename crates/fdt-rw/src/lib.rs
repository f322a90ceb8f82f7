//! In-place manipulation of flattened devicetree (FDT) blobs.
//!
//! A blob is a single contiguous byte buffer: header, memory reservation
//! map, structure block, strings block. This crate reads, edits, and
//! builds such buffers without allocating: every operation works inside
//! memory the caller supplies, which makes it usable before an allocator
//! exists.
//!
//! Three surfaces share the [`Fdt`] view:
//!
//! - **Read-only**: header access, node and path lookup, property reads,
//!   tree searches. Multiple readers of an unchanging buffer are safe.
//! - **Write-in-place**: same-size value overwrites and `NOP` erasure,
//!   which never move a byte or disturb node offsets.
//! - **Read-write**: resizing edits (`setprop`, `delprop`, `add_subnode`,
//!   `del_node`, reserve-map changes) against a blob in canonical block
//!   order, normally obtained through [`Fdt::open_into`]. A resizing edit
//!   may invalidate node offsets behind the edit point; re-run lookups
//!   after one.
//!
//! [`SequentialWriter`] is the fourth surface: a forward-only builder
//! producing a fresh blob from an empty buffer.

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

pub use self::{
    blob::{
        FIRST_SUPPORTED_VERSION, Fdt, Header, LAST_SUPPORTED_VERSION, MAGIC, PropDescriptor,
        Property, RawToken, ReserveEntry, Tag,
    },
    error::FdtError,
    writer::SequentialWriter,
};

#[macro_use]
mod macros;

pub mod blob;
pub mod error;
mod nav;
mod props;
mod rsv;
mod rw;
mod strings;
mod tags;
#[cfg(feature = "alloc")]
pub mod testing;
pub mod types;
mod util;
mod wip;
pub mod writer;

/// Alias used by every fallible operation in this crate.
pub type Result<T, E = FdtError> = core::result::Result<T, E>;
