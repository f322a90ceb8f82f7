//! Construction helpers for tests: build blobs and raw blocks without
//! going through the sequential writer.

pub use self::{blob_builder::*, block_builder::*};

mod blob_builder;
mod block_builder;
