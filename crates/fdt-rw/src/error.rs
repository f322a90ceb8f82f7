/// The closed set of failures a blob operation can report.
///
/// Every fallible operation returns one of these kinds; no error is
/// recovered internally. Mutating operations leave the blob unchanged when
/// they fail, except that a failed [`setprop`] may leave a freshly
/// interned, unreferenced property name behind; the strings block is never
/// collected.
///
/// [`setprop`]: crate::Fdt::setprop
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    derive_more::Display,
    derive_more::Error,
    derive_more::IsVariant,
)]
pub enum FdtError {
    /// The requested node or property does not exist.
    #[display("requested node or property not found")]
    NotFound,
    /// Attempted to create a node or property which already exists.
    #[display("node or property already exists")]
    Exists,
    /// The operation would exceed the buffer capacity.
    #[display("buffer too small for the requested operation")]
    NoSpace,
    /// The given offset is out of bounds or does not sit at the expected
    /// tag.
    #[display("offset out of bounds or not at the expected tag")]
    BadOffset,
    /// The given path is malformed (e.g. missing its leading `/`).
    #[display("badly formatted path")]
    BadPath,
    /// A sequential-write operation was issued outside its legal state, or
    /// an unfinished sequential-write blob was opened.
    #[display("sequential-write state does not permit the operation")]
    BadState,
    /// The structure block ends without a terminating `END` tag.
    #[display("structure block ends without an END tag")]
    Truncated,
    /// The buffer does not carry the flattened devicetree magic number.
    #[display("missing flattened devicetree magic number")]
    BadMagic,
    /// The blob's version cannot be handled by the requested operation.
    #[display("unsupported devicetree version")]
    BadVersion,
    /// The structure block is corrupt (unknown tag, misnesting, ...).
    #[display("corrupt structure block")]
    BadStructure,
    /// The sub-blocks are not in the order the read-write operations
    /// require (reserve map, then structure, then strings).
    #[display("sub-blocks are not in read-write order")]
    BadLayout,
    /// An internal consistency check failed; indicates a bug.
    #[display("internal consistency check failed")]
    Internal,
}

impl FdtError {
    /// The fixed diagnostic message for this error kind.
    ///
    /// Identical to the [`Display`](core::fmt::Display) rendering, exposed
    /// as a `&'static str` for front-ends that cannot format.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "requested node or property not found",
            Self::Exists => "node or property already exists",
            Self::NoSpace => "buffer too small for the requested operation",
            Self::BadOffset => "offset out of bounds or not at the expected tag",
            Self::BadPath => "badly formatted path",
            Self::BadState => "sequential-write state does not permit the operation",
            Self::Truncated => "structure block ends without an END tag",
            Self::BadMagic => "missing flattened devicetree magic number",
            Self::BadVersion => "unsupported devicetree version",
            Self::BadStructure => "corrupt structure block",
            Self::BadLayout => "sub-blocks are not in read-write order",
            Self::Internal => "internal consistency check failed",
        }
    }
}
