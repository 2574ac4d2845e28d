/// Errors produced while decoding, condensing, or verifying a pack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serialized bytes fail a structural check (wrong byte count, header
    /// mismatch, truncated section).
    #[error("malformed pack: {0}")]
    Malformed(&'static str),

    /// A re-derived row hash disagreed with the one carried in the pack.
    #[error("hash conflict at row {0}")]
    HashConflict(u64),

    /// The stitch of the requested targets references a row absent from
    /// this pack's `inputs`.
    #[error("row {0} is not present in this pack")]
    MissingTarget(u64),

    /// A caller-supplied `Bundle` section name used the reserved `crums/`
    /// prefix.
    #[error("section name {0:?} uses the reserved crums/ prefix")]
    ReservedSectionName(String),

    #[error(transparent)]
    Core(#[from] skipledger_core::Error),
}
