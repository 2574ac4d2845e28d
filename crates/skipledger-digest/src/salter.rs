use crate::{Digest, Error, Hash};
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

/// Secret-seeded derivation of per-row and per-cell salts.
///
/// One seed yields one ledger (or one epoch of a multi-epoch ledger; see
/// [`EpochedSalter`]). `Salter` is cheap to clone: a clone is a "promotion"
/// that shares the same underlying secret buffer through an `Arc`, so
/// closing any handle zeroizes the seed for every handle that shares it,
/// and the `Zeroizing` wrapper guarantees zeroization runs exactly once —
/// when the last `Arc` reference is dropped — never double-zeroing a
/// parent's bytes from a promoted child's `Drop`.
#[derive(Clone)]
pub struct Salter {
    seed: Arc<RwLock<Option<Zeroizing<Vec<u8>>>>>,
}

impl Salter {
    /// Construct a salter from a secret seed of arbitrary length.
    pub fn new(seed: impl Into<Vec<u8>>) -> Self {
        Self { seed: Arc::new(RwLock::new(Some(Zeroizing::new(seed.into())))) }
    }

    /// The null salter: degrades every salt to an empty buffer. Used when a
    /// ledger is declared unsalted (`SaltScheme::NoSalt`).
    pub fn null() -> Self {
        Self::new(Vec::new())
    }

    fn with_seed<T>(&self, f: impl FnOnce(&[u8]) -> T) -> Result<T, Error> {
        let guard = self.seed.read();
        match guard.as_deref() {
            Some(seed) => Ok(f(seed)),
            None => Err(Error::Closed),
        }
    }

    /// `H( row ‖ seed ‖ ~row )`, big-endian 8-byte row number and its
    /// bitwise complement. Does not require the cell index, so redacted
    /// rows can still be verified from the row salt alone.
    pub fn row_salt(&self, row: u64) -> Result<Hash, Error> {
        let row_be = row.to_be_bytes();
        let not_row = complement(&row_be);
        self.with_seed(|seed| Digest::new().hash(&[&row_be, seed, &not_row]))
    }

    /// `H( cell ‖ rowSalt ‖ ~cell )`.
    ///
    /// `cellSalt(row, cell) = cellSalt(rowSalt(row), cell)`.
    pub fn cell_salt(&self, row_salt: Hash, cell: u16) -> Hash {
        let cell_be = (cell as u64).to_be_bytes();
        let not_cell = complement(&cell_be);
        Digest::new().hash(&[&cell_be, &row_salt, &not_cell])
    }

    /// Convenience composing `row_salt` and `cell_salt` in one call.
    pub fn cell_salt_for_row(&self, row: u64, cell: u16) -> Result<Hash, Error> {
        let row_salt = self.row_salt(row)?;
        Ok(self.cell_salt(row_salt, cell))
    }

    /// Number of seed bytes, used to validate epoch boundaries in
    /// [`EpochedSalter`]. Fails on a closed salter.
    pub fn seed_len(&self) -> Result<usize, Error> {
        self.with_seed(|seed| seed.len())
    }

    /// Zero the seed in place. Subsequent calls on this handle, and on any
    /// handle promoted from it, fail with [`Error::Closed`].
    pub fn close(&self) {
        *self.seed.write() = None;
    }

    /// Whether this salter (or a sibling sharing its buffer) has been closed.
    pub fn is_closed(&self) -> bool {
        self.seed.read().is_none()
    }
}

fn complement(bytes: &[u8; 8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    for (o, b) in out.iter_mut().zip(bytes) {
        *o = !b;
    }
    out
}

/// An ordered map `startRow -> Salter` supporting multi-epoch ledgers: a
/// contiguous range of rows sharing a single salter seed.
///
/// The active child for row `r` is the one with the greatest
/// `startRow <= r`. The first epoch must begin at row 1, and every epoch's
/// seed must share byte length with its siblings (so redacted-row
/// verification doesn't need to know which epoch produced a given salt).
pub struct EpochedSalter {
    epochs: BTreeMap<u64, Salter>,
    seed_len: Option<usize>,
}

impl EpochedSalter {
    /// An epoched salter with no epochs yet; insert the first with
    /// `insert(1, salter)`.
    pub fn new() -> Self {
        Self { epochs: BTreeMap::new(), seed_len: None }
    }

    /// Register the salter that becomes active at `start_row`.
    pub fn insert(&mut self, start_row: u64, salter: Salter) -> Result<(), Error> {
        if self.epochs.is_empty() && start_row != 1 {
            return Err(Error::InvalidEpoch("first epoch must begin at row 1"));
        }
        let len = salter.seed_len()?;
        match self.seed_len {
            Some(expected) if expected != len => {
                return Err(Error::InvalidEpoch("epoch seeds must share byte length"));
            }
            None => self.seed_len = Some(len),
            _ => {}
        }
        self.epochs.insert(start_row, salter);
        Ok(())
    }

    /// The salter active at row `r`, if any epoch has begun by then.
    pub fn active(&self, row: u64) -> Option<&Salter> {
        self.epochs.range(..=row).next_back().map(|(_, salter)| salter)
    }

    /// `rowSalt` via the epoch active at `row`.
    pub fn row_salt(&self, row: u64) -> Result<Hash, Error> {
        match self.active(row) {
            Some(salter) => salter.row_salt(row),
            None => Err(Error::NoActiveEpoch(row)),
        }
    }

    /// Close every child salter. Each handle zeros independently because
    /// distinct epochs hold distinct seeds; a promoted clone of one epoch's
    /// salter would still share that epoch's buffer and thus close with it.
    pub fn close(&self) {
        for salter in self.epochs.values() {
            salter.close();
        }
    }

    /// Ascending start rows of every registered epoch.
    pub fn epoch_starts(&self) -> impl Iterator<Item = u64> + '_ {
        self.epochs.keys().copied()
    }
}

impl Default for EpochedSalter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reproducible_for_same_seed() {
        let salter = Salter::new(b"seed".to_vec());
        let a = salter.cell_salt_for_row(11, 2).unwrap();
        let b = salter.cell_salt_for_row(11, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn closed_salter_fails() {
        let salter = Salter::new(b"seed".to_vec());
        salter.close();
        assert!(matches!(salter.row_salt(1), Err(Error::Closed)));
    }

    #[test]
    fn promotion_shares_and_does_not_double_zero() {
        let parent = Salter::new(b"seed".to_vec());
        let child = parent.clone();
        drop(child);
        // parent still usable: dropping the clone did not zero the shared seed
        assert!(parent.row_salt(1).is_ok());
        parent.close();
        assert!(parent.is_closed());
    }

    #[test]
    fn null_salter_is_stable() {
        let null = Salter::null();
        let a = null.row_salt(7).unwrap();
        let b = Salter::null().row_salt(7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn epoched_salter_requires_start_at_one() {
        let mut epoched = EpochedSalter::new();
        let err = epoched.insert(2, Salter::new(b"seed".to_vec())).unwrap_err();
        assert!(matches!(err, Error::InvalidEpoch(_)));
    }

    #[test]
    fn epoched_salter_rejects_mismatched_seed_length() {
        let mut epoched = EpochedSalter::new();
        epoched.insert(1, Salter::new(vec![0u8; 16])).unwrap();
        let err = epoched.insert(100, Salter::new(vec![0u8; 8])).unwrap_err();
        assert!(matches!(err, Error::InvalidEpoch(_)));
    }

    #[test]
    fn epoched_salter_picks_active_epoch() {
        let mut epoched = EpochedSalter::new();
        epoched.insert(1, Salter::new(vec![1u8; 8])).unwrap();
        epoched.insert(100, Salter::new(vec![2u8; 8])).unwrap();
        assert_eq!(epoched.active(1).unwrap().seed_len().unwrap(), 8);
        assert_eq!(epoched.active(99).unwrap().row_salt(99).unwrap(), {
            let first = Salter::new(vec![1u8; 8]);
            first.row_salt(99).unwrap()
        });
        assert_eq!(epoched.active(100).unwrap().row_salt(100).unwrap(), {
            let second = Salter::new(vec![2u8; 8]);
            second.row_salt(100).unwrap()
        });
    }

    #[test]
    fn row_salt_with_no_registered_epoch_is_an_error() {
        let epoched = EpochedSalter::new();
        assert!(matches!(epoched.row_salt(1), Err(Error::NoActiveEpoch(1))));
    }

    #[test]
    fn closing_epoched_salter_closes_all_children() {
        let mut epoched = EpochedSalter::new();
        epoched.insert(1, Salter::new(vec![1u8; 8])).unwrap();
        epoched.insert(50, Salter::new(vec![2u8; 8])).unwrap();
        epoched.close();
        assert!(epoched.active(1).unwrap().is_closed());
        assert!(epoched.active(50).unwrap().is_closed());
    }
}
