//! Shared value types.
//!
//! Node and property names are byte strings: the format does not require
//! them to be UTF-8, so they are exposed as [`bstr::BStr`] rather than
//! `str`.

pub use bstr::BStr as ByteStr;
