//! 32-byte cryptographic digest primitive, and secret-seeded per-row/per-cell
//! salting (`TableSalt`), for the skipledger hash engine.
//!
//! The digest algorithm is fixed at SHA-256 for wire compatibility; there is
//! no runtime selection of hash algorithms (see the workspace design notes
//! on global mutable state becoming compile-time constants).

mod error;
mod salter;

pub use error::Error;
pub use salter::{EpochedSalter, Salter};

use sha2::{Digest as _, Sha256};

/// Width, in bytes, of every hash in the system.
pub const HASH_LEN: usize = 32;

/// A 32-byte cryptographic hash.
pub type Hash = [u8; HASH_LEN];

/// Reusable scratch state for computing [`Hash`]es.
///
/// `Digest::hash` takes `&mut self` so the borrow checker statically rules
/// out the reentrant-misuse scenario a dynamically-checked "concurrent
/// access" guard would otherwise exist to catch: two overlapping calls on
/// the same scratch object cannot be expressed in safe Rust. Callers that
/// want to hash concurrently should give each thread (or each row) its own
/// `Digest`; the type is cheap to construct.
#[derive(Default)]
pub struct Digest {
    state: Sha256,
}

impl Digest {
    /// Construct fresh scratch state.
    pub fn new() -> Self {
        Self { state: Sha256::new() }
    }

    /// Hash the concatenation of `parts`, resetting scratch state first.
    pub fn hash(&mut self, parts: &[&[u8]]) -> Hash {
        self.state = Sha256::new();
        for part in parts {
            self.state.update(part);
        }
        let digest = std::mem::take(&mut self.state).finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        out
    }

    /// The sentinel hash: 32 zero bytes, representing the abstract row 0.
    pub const fn sentinel() -> Hash {
        [0u8; HASH_LEN]
    }
}
