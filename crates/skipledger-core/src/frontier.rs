use crate::{algebra::skip_count, rowhash::row_hash};
use skipledger_digest::{Digest, Hash};

/// The minimum state required to extend a ledger by one row and verify the
/// extension, without rereading any previously written row hash.
///
/// Holds, for each level `ℓ`, the `(row number, row hash)` pair whose row
/// number is the largest `m` processed so far with `v2(m) ≥ ℓ`. The array
/// grows by one level exactly when a row first achieves that level (a
/// power-of-two row), and otherwise carries levels forward untouched —
/// this is the "survive, shifted upward" behavior the contract describes.
#[derive(Debug, Clone, PartialEq)]
pub struct HashFrontier {
    row_number: u64,
    levels: Vec<(u64, Hash)>,
}

impl HashFrontier {
    /// The frontier before any row has been appended: row number 0, no
    /// levels established. `next` from here produces `Frontier@1`.
    pub fn empty() -> Self {
        Self { row_number: 0, levels: Vec::new() }
    }

    /// The unique frontier after row 1, built from one input hash and the
    /// sentinel as its only reference.
    pub fn first(input_hash: Hash) -> Self {
        Self::empty().next(input_hash)
    }

    /// Advance from row `n` to `n+1`, consuming one input hash and this
    /// frontier's level hashes in order `0 .. skipCount(n+1)`. The unused
    /// "highest" level (when `n+1` is a power of two) pulls the sentinel.
    pub fn next(&self, input_hash: Hash) -> Self {
        let new_n = self.row_number + 1;
        let sc = skip_count(new_n) as usize;

        let mut refs = Vec::with_capacity(sc);
        for level in 0..sc {
            refs.push(self.levels.get(level).map(|(_, h)| *h).unwrap_or_else(Digest::sentinel));
        }
        let mut digest = Digest::new();
        let new_hash = row_hash(input_hash, &refs, &mut digest);

        let new_len = self.levels.len().max(sc);
        let mut new_levels = Vec::with_capacity(new_len);
        for level in 0..new_len {
            if level == 0 || new_n.trailing_zeros() as usize >= level {
                new_levels.push((new_n, new_hash));
            } else {
                new_levels.push(self.levels.get(level).copied().unwrap_or((0, Digest::sentinel())));
            }
        }
        Self { row_number: new_n, levels: new_levels }
    }

    pub fn row_number(&self) -> u64 {
        self.row_number
    }

    /// The row hash at level 0: `rowHash(rowNumber())`.
    pub fn row(&self) -> Hash {
        self.levels.first().map(|(_, h)| *h).unwrap_or_else(Digest::sentinel)
    }

    /// The `(row number, row hash)` carried at level `ℓ`, or the sentinel
    /// pair `(0, sentinel)` if that level has not yet been established.
    pub fn level(&self, level: usize) -> (u64, Hash) {
        self.levels.get(level).copied().unwrap_or((0, Digest::sentinel()))
    }

    pub fn level_row(&self, level: usize) -> Hash {
        self.level(level).1
    }

    /// Number of levels this frontier carries (established or not past the
    /// first gap — levels never shrink once created).
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl Default for HashFrontier {
    fn default() -> Self {
        Self::empty()
    }
}

/// `(row, level)` → the row number holding level `ℓ`'s entry at ledger size
/// `n`: the largest `m ≤ n` with `2^ℓ | m`. Used to reconstruct a frontier
/// from stored row hashes without replaying every append.
pub fn level_holder(n: u64, level: u32) -> u64 {
    if level >= u64::BITS {
        return 0;
    }
    (n >> level) << level
}

/// How many levels a frontier at row `n` has established: `1 + ⌊log2 n⌋`
/// for `n ≥ 1`, else `0`.
pub fn level_count_at(n: u64) -> u32 {
    if n == 0 {
        0
    } else {
        u64::BITS - n.leading_zeros()
    }
}

/// Build a [`HashFrontier`] directly from its `(row number, level holder,
/// level hash)` parts. Used by [`crate::ledger::reconstruct_frontier`] to
/// rebuild a frontier from stored row hashes without replaying `next`.
pub fn from_parts(row_number: u64, levels: Vec<(u64, Hash)>) -> HashFrontier {
    HashFrontier { row_number, levels }
}
