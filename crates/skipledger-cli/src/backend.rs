use skipledger_core::{Error, SkipTable, WitnessRepo, ROW_WIDTH};
use skipledger_storage::{FileSkipTable, FileWitnessRepo, MemSkipTable, MemWitnessRepo};

/// Either storage backend named in `skipledger.toml`'s `backend` key,
/// behind one concrete type so `SkipLedger<AnyTable>` has a single
/// monomorphization regardless of which one a run selects.
pub enum AnyTable {
    Mem(MemSkipTable),
    File(FileSkipTable),
}

impl SkipTable for AnyTable {
    fn size(&self) -> u64 {
        match self {
            AnyTable::Mem(t) => t.size(),
            AnyTable::File(t) => t.size(),
        }
    }

    fn add_rows(&mut self, bytes: &[u8], at_index: u64) -> Result<u64, Error> {
        match self {
            AnyTable::Mem(t) => t.add_rows(bytes, at_index),
            AnyTable::File(t) => t.add_rows(bytes, at_index),
        }
    }

    fn read_row(&self, index: u64) -> Result<[u8; ROW_WIDTH], Error> {
        match self {
            AnyTable::Mem(t) => t.read_row(index),
            AnyTable::File(t) => t.read_row(index),
        }
    }

    fn trim_size(&mut self, new_size: u64) -> Result<(), Error> {
        match self {
            AnyTable::Mem(t) => t.trim_size(new_size),
            AnyTable::File(t) => t.trim_size(new_size),
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        match self {
            AnyTable::Mem(t) => t.close(),
            AnyTable::File(t) => t.close(),
        }
    }
}

pub enum AnyWitness {
    Mem(MemWitnessRepo),
    File(FileWitnessRepo),
}

impl WitnessRepo for AnyWitness {
    fn ids(&self) -> Vec<u64> {
        match self {
            AnyWitness::Mem(w) => w.ids(),
            AnyWitness::File(w) => w.ids(),
        }
    }

    fn put_trail(&mut self, row_no: u64, trail: Vec<u8>) -> Result<(), Error> {
        match self {
            AnyWitness::Mem(w) => w.put_trail(row_no, trail),
            AnyWitness::File(w) => w.put_trail(row_no, trail),
        }
    }

    fn trail(&self, row_no: u64) -> Result<Option<Vec<u8>>, Error> {
        match self {
            AnyWitness::Mem(w) => w.trail(row_no),
            AnyWitness::File(w) => w.trail(row_no),
        }
    }

    fn trim_by_row_number(&mut self, new_size: u64) -> Result<(), Error> {
        match self {
            AnyWitness::Mem(w) => w.trim_by_row_number(new_size),
            AnyWitness::File(w) => w.trim_by_row_number(new_size),
        }
    }
}
