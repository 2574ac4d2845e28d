use crate::Error;
use skipledger_digest::Hash;

/// Width, in bytes, of one stored ledger row: a 32-byte input hash followed
/// by a 32-byte row hash, concatenated with no delimiter in storage.
pub const ROW_WIDTH: usize = 64;

/// Indexed, fixed-width row storage the core calls into. Implementations
/// (file-backed, SQL-backed, in-memory) are out-of-scope collaborators; the
/// core accepts any type offering this capability set.
///
/// The 0-based row index in the table corresponds to the 1-based ledger row
/// number (`index == row_number - 1`).
pub trait SkipTable: Send + Sync {
    /// Current number of stored rows.
    fn size(&self) -> u64;

    /// Append `bytes.len() / ROW_WIDTH` rows starting at `at_index`.
    /// `bytes.len()` must be a multiple of [`ROW_WIDTH`]. Returns the new size.
    fn add_rows(&mut self, bytes: &[u8], at_index: u64) -> Result<u64, Error>;

    /// Read the 64-byte wire record at `index`.
    fn read_row(&self, index: u64) -> Result<[u8; ROW_WIDTH], Error>;

    /// Truncate to `new_size` rows.
    fn trim_size(&mut self, new_size: u64) -> Result<(), Error>;

    /// Release any resources held by the backend.
    fn close(&mut self) -> Result<(), Error>;
}

/// Mapping from row number to an opaque crumtrail blob, preserving
/// insertion order. A witness repo and a skip table are independent
/// collaborators: the core coordinates trimming both (see
/// `skipledger_core::companions`), but never requires a witness repo to
/// exist.
pub trait WitnessRepo: Send + Sync {
    /// Row numbers with a recorded trail, ascending.
    fn ids(&self) -> Vec<u64>;

    /// Record `trail` for `row_no`. Requires `row_no` greater than every
    /// previously recorded row number.
    fn put_trail(&mut self, row_no: u64, trail: Vec<u8>) -> Result<(), Error>;

    /// The trail recorded at `row_no`, if any.
    fn trail(&self, row_no: u64) -> Result<Option<Vec<u8>>, Error>;

    /// Drop every recorded trail with row number `> new_size`.
    fn trim_by_row_number(&mut self, new_size: u64) -> Result<(), Error>;
}

/// Resolve `rowHash(n)` against a table directly, treating `n == 0` as the
/// sentinel without a storage read.
pub fn row_hash_at<T: SkipTable + ?Sized>(table: &T, n: u64) -> Result<Hash, Error> {
    if n == 0 {
        return Ok(skipledger_digest::Digest::sentinel());
    }
    if n > table.size() {
        return Err(Error::OutOfRange(n));
    }
    let record = table.read_row(n - 1)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&record[32..64]);
    Ok(hash)
}

/// Resolve `inputHash(n)` against a table directly.
pub fn input_hash_at<T: SkipTable + ?Sized>(table: &T, n: u64) -> Result<Hash, Error> {
    if n == 0 || n > table.size() {
        return Err(Error::OutOfRange(n));
    }
    let record = table.read_row(n - 1)?;
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&record[0..32]);
    Ok(hash)
}
