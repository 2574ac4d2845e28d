#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unsupported object offered to `classify` (e.g. arbitrary-precision
    /// numerics), or a `DOUBLE` cell placed under a salted scheme that
    /// forbids floats.
    #[error("unsupported cell type: {0}")]
    BadType(&'static str),

    /// A `STRING` or `BYTES` cell exceeded the 65,535-byte limit.
    #[error("cell of {len} bytes exceeds the 65535-byte limit")]
    Oversize { len: usize },

    /// A `Salter` used to derive a cell salt has been closed.
    #[error("salter closed while hashing row")]
    SalterClosed(#[from] skipledger_digest::Error),
}
