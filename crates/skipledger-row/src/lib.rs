//! Typed source-row cells and the deterministic input-hash rollup that
//! feeds the skipledger hash engine (`skipledger-core`).

mod cell;
mod error;
mod source_row;

pub use cell::{Cell, SaltScheme, MAX_VARIABLE_LEN};
pub use error::Error;
pub use source_row::SourceRow;
