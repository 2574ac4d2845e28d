/// Error kinds surfaced by [`crate::Salter`] and [`crate::EpochedSalter`].
///
/// These are the digest-layer members of the core error taxonomy (see the
/// workspace-level design notes): every mutator is transactional and every
/// error is surfaced to the caller intact.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation attempted on a salter whose seed has already been zeroized.
    #[error("salter is closed")]
    Closed,

    /// A mutator was invoked while another mutator was active.
    #[error("concurrent mutation of salter state")]
    Concurrent,

    /// `EpochedSalter` invariant violated: epochs must start at row 1 and
    /// every seed must share byte length with its siblings.
    #[error("invalid salter epoch: {0}")]
    InvalidEpoch(&'static str),

    /// `EpochedSalter::row_salt` was asked for a row no registered epoch
    /// covers yet.
    #[error("no epoch is active at row {0}")]
    NoActiveEpoch(u64),
}
