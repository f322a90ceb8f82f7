use core::fmt;

use crate::types::ByteStr;

/// A borrowed view of one property: its resolved name and raw value.
///
/// The view stays valid until the next mutating call on the blob it was
/// read from.
#[derive(Clone, PartialEq, Eq)]
pub struct Property<'blob> {
    name: &'blob ByteStr,
    value: &'blob [u8],
}

impl<'blob> Property<'blob> {
    pub(crate) fn new(name: &'blob ByteStr, value: &'blob [u8]) -> Self {
        Self { name, value }
    }

    #[must_use]
    pub fn name(&self) -> &'blob ByteStr {
        self.name
    }

    /// The raw value bytes, without trailing tag padding.
    #[must_use]
    pub fn value(&self) -> &'blob [u8] {
        self.value
    }
}

impl fmt::Debug for Property<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("value", &ByteStr::new(self.value))
            .finish()
    }
}
