//! Coordinated trim across a [`SkipLedger`] and the collaborators that key
//! off row number: a [`WitnessRepo`] and, for salted ledgers, the salter's
//! epoch table.
//!
//! `SkipLedger` is generic only over its [`SkipTable`] backend — making it
//! also generic over a witness repo and a salter would tie every ledger
//! instantiation to both, even for callers that use neither. Trimming is the
//! one operation where the three must move together, so it lives here as a
//! free function instead of a method on `SkipLedger`.

use crate::{Error, SkipLedger, SkipTable, WitnessRepo};

/// Trim the ledger to `new_size`, then drop every witness trail whose row
/// number exceeds it. Not atomic across the two: if the witness trim fails
/// after the ledger trim succeeds, the ledger is left at `new_size` and the
/// caller should retry the witness trim alone (it is idempotent).
pub fn trim_with_witness<T: SkipTable>(
    ledger: &SkipLedger<T>,
    witness: &mut dyn WitnessRepo,
    new_size: u64,
) -> Result<(), Error> {
    ledger.trim(new_size)?;
    witness.trim_by_row_number(new_size)
}

/// Epoch start rows from an [`skipledger_digest::EpochedSalter`] that become
/// unreachable once the ledger is trimmed to `new_size`: every epoch whose
/// `start_row` exceeds it. The salter itself is never mutated here — an
/// epoch table is a historical record of which seed covered which rows, and
/// a later `append` past `new_size` may re-enter an epoch whose start row
/// this trim would otherwise have discarded.
pub fn orphaned_epoch_starts(
    salter: &skipledger_digest::EpochedSalter,
    new_size: u64,
) -> Vec<u64> {
    salter.epoch_starts().filter(|&start| start > new_size).collect()
}
