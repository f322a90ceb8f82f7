//! Big-endian storage types.
//!
//! Devicetree blobs keep every multi-byte integer in big-endian byte order.
//! This crate provides the [`Be`] wrapper that holds a value in its on-disk
//! representation and converts on access, so in-buffer structures can carry
//! typed fields without caring about host byte order.

#![cfg_attr(not(test), no_std)]

use core::fmt;

use dataview::Pod;

/// Trait for converting values between host and big-endian byte order.
pub trait ByteOrder {
    /// Converts a value from big-endian to native endianness.
    #[must_use]
    fn from_be(be: &Self) -> Self;

    /// Converts a value from native endianness to big-endian.
    #[must_use]
    fn to_be(&self) -> Self;
}

macro_rules! impl_byte_order {
    ($($t:ty),+) => {
        $(
            impl ByteOrder for $t {
                fn from_be(be: &Self) -> Self {
                    Self::from_be(*be)
                }

                fn to_be(&self) -> Self {
                    Self::to_be(*self)
                }
            }
        )+
    };
}

impl_byte_order!(u16, u32, u64);

/// Wrapper type for values stored in big-endian byte order.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Be<T>(T);

impl<T> Be<T>
where
    T: ByteOrder,
{
    /// Stores a native-endian value in big-endian form.
    #[must_use]
    pub fn new(value: &T) -> Self {
        Self(T::to_be(value))
    }

    /// Reads the value, converting from big-endian to native endianness.
    pub fn read(&self) -> T {
        T::from_be(&self.0)
    }

    /// Writes a value, converting from native endianness to big-endian.
    pub fn write(&mut self, value: &T) {
        self.0 = T::to_be(value);
    }
}

impl<T> From<T> for Be<T>
where
    T: ByteOrder,
{
    fn from(value: T) -> Self {
        Self::new(&value)
    }
}

unsafe impl<T> Pod for Be<T> where T: Pod {}

macro_rules! impl_fmt_traits {
    ($($trait:tt),+) => {
        $(
            impl<T> fmt::$trait for Be<T>
            where
                T: ByteOrder + fmt::$trait
            {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::$trait::fmt(&self.read(), f)
                }
            }
        )+
    };
}

impl_fmt_traits!(Debug, Binary, Octal, Display, LowerHex, UpperHex);
