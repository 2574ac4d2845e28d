//! Skip-pointer row-hash algebra and the append-only [`SkipLedger`].
//!
//! This crate owns the hash-only view of a ledger: `rowHash`/`inputHash`,
//! the skip-count/stitch/coverage algebra, the [`HashFrontier`] append
//! state, and the [`backend::SkipTable`]/[`backend::WitnessRepo`] traits a
//! storage backend implements. It does not know about typed cells (see
//! `skipledger-row`) or wire path/pack encodings (see `skipledger-pack`).

pub mod algebra;
pub mod backend;
pub mod companions;
mod error;
pub mod frontier;
mod ledger;
pub mod row;
pub mod rowhash;

pub use backend::{SkipTable, WitnessRepo, ROW_WIDTH};
pub use error::Error;
pub use frontier::HashFrontier;
pub use ledger::{reconstruct_frontier, SkipLedger};
pub use row::{Path, Row};
