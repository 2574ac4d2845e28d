/// Core error taxonomy. Every mutator is transactional: on failure, no
/// partial rows become visible and `size()` is unchanged. Errors are never
/// substituted with a sentinel or a partial result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A row number fell outside `[1, size]`. `SkipLedger::get_path` also
    /// reports this when a stitched row is absent ("NotContained" in the
    /// distilled spec, folded into this kind since the observable condition
    /// is identical — see DESIGN.md).
    #[error("row {0} is out of range")]
    OutOfRange(u64),

    /// Serialized bytes failed a structural check.
    #[error("malformed data: {0}")]
    Malformed(&'static str),

    /// A re-derived hash disagreed with the carried or stored one. Always
    /// fatal to the current operation; never retried.
    #[error("hash conflict: {0}")]
    HashConflict(&'static str),

    /// A mutator was invoked while another mutator was already active.
    #[error("concurrent mutation of ledger state")]
    Concurrent,

    /// Operation attempted on a closed ledger or backend.
    #[error("ledger is closed")]
    Closed,

    /// Opaque wrap of a storage backend failure.
    #[error("storage backend error: {0}")]
    StorageIo(String),
}
