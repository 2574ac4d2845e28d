//! Reference `SkipTable`/`WitnessRepo` implementations: in-memory for tests
//! and scripting, flat-file for anything that needs to persist.

mod file;
mod mem;

pub use file::{FileSkipTable, FileWitnessRepo};
pub use mem::{MemSkipTable, MemWitnessRepo};
