use skipledger_core::{Error, SkipTable, WitnessRepo, ROW_WIDTH};
use std::collections::BTreeMap;

/// `Vec`-backed [`SkipTable`]: the default for tests and `skipledger-cli`'s
/// `--in-memory` mode.
#[derive(Default)]
pub struct MemSkipTable {
    rows: Vec<[u8; ROW_WIDTH]>,
}

impl MemSkipTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SkipTable for MemSkipTable {
    fn size(&self) -> u64 {
        self.rows.len() as u64
    }

    fn add_rows(&mut self, bytes: &[u8], at_index: u64) -> Result<u64, Error> {
        if at_index != self.rows.len() as u64 {
            return Err(Error::Concurrent);
        }
        if bytes.len() % ROW_WIDTH != 0 {
            return Err(Error::Malformed("add_rows length not a multiple of ROW_WIDTH"));
        }
        self.rows.reserve(bytes.len() / ROW_WIDTH);
        for chunk in bytes.chunks_exact(ROW_WIDTH) {
            let mut record = [0u8; ROW_WIDTH];
            record.copy_from_slice(chunk);
            self.rows.push(record);
        }
        Ok(self.rows.len() as u64)
    }

    fn read_row(&self, index: u64) -> Result<[u8; ROW_WIDTH], Error> {
        self.rows.get(index as usize).copied().ok_or(Error::OutOfRange(index + 1))
    }

    fn trim_size(&mut self, new_size: u64) -> Result<(), Error> {
        if new_size > self.rows.len() as u64 {
            return Err(Error::OutOfRange(new_size));
        }
        self.rows.truncate(new_size as usize);
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// `BTreeMap`-backed [`WitnessRepo`], preserving insertion order by row
/// number.
#[derive(Default)]
pub struct MemWitnessRepo {
    trails: BTreeMap<u64, Vec<u8>>,
}

impl MemWitnessRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WitnessRepo for MemWitnessRepo {
    fn ids(&self) -> Vec<u64> {
        self.trails.keys().copied().collect()
    }

    fn put_trail(&mut self, row_no: u64, trail: Vec<u8>) -> Result<(), Error> {
        if let Some(&last) = self.trails.keys().next_back() {
            if row_no <= last {
                return Err(Error::Malformed("witness rows must be strictly increasing"));
            }
        }
        self.trails.insert(row_no, trail);
        Ok(())
    }

    fn trail(&self, row_no: u64) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.trails.get(&row_no).cloned())
    }

    fn trim_by_row_number(&mut self, new_size: u64) -> Result<(), Error> {
        self.trails.retain(|&row, _| row <= new_size);
        Ok(())
    }
}
