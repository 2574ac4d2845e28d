use skipledger_core::backend::{SkipTable, ROW_WIDTH};
use skipledger_core::{Error, SkipLedger};
use skipledger_digest::Hash;
use skipledger_pack::PathPack;

#[derive(Default)]
struct MemTable {
    rows: Vec<[u8; ROW_WIDTH]>,
}

impl SkipTable for MemTable {
    fn size(&self) -> u64 {
        self.rows.len() as u64
    }
    fn add_rows(&mut self, bytes: &[u8], at_index: u64) -> Result<u64, Error> {
        if at_index != self.rows.len() as u64 {
            return Err(Error::Concurrent);
        }
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
        self.rows.truncate(new_size as usize);
        Ok(())
    }
    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

fn input(b: u8) -> Hash {
    [b; 32]
}

/// S4-style scenario: a mid-sized ledger, a full pack over a multi-target
/// stitch, serialized and decoded by an independent `PathPack` instance.
#[test]
fn full_pack_round_trip_over_multi_target_stitch() {
    let ledger = SkipLedger::open(MemTable::default()).unwrap();
    let inputs: Vec<Hash> = (1u8..=100).map(input).collect();
    ledger.append(&inputs).unwrap();

    let targets = [1, 33, 77, 100];
    let path = ledger.get_path(&targets).unwrap();
    let pack = PathPack::for_path(&path, &targets);

    let wire = pack.to_bytes();
    let decoded = PathPack::from_bytes(&wire).unwrap();
    assert_eq!(decoded, pack);

    let rebuilt_path = decoded.path().unwrap();
    assert_eq!(rebuilt_path, path);
    assert!(decoded.verify().unwrap());
}

/// A pack's wire size tracks the caller's compact target list, not the
/// expanded stitch: a handful of targets over a 1,027-row ledger should
/// not serialize anywhere near 1,027 row numbers.
#[test]
fn pack_wire_size_tracks_targets_not_stitched_set() {
    let ledger = SkipLedger::open(MemTable::default()).unwrap();
    let inputs: Vec<Hash> = (0u32..1027).map(|i| input((i % 256) as u8)).collect();
    ledger.append(&inputs).unwrap();

    let targets = [1, 500, 1027];
    let path = ledger.get_path(&targets).unwrap();
    assert!(path.rows.len() > targets.len());

    let pack = PathPack::for_path(&path, &targets);
    assert_eq!(pack.targets(), &targets);
    assert!(pack.row_numbers().len() > targets.len());

    let wire = pack.to_bytes();
    let decoded = PathPack::from_bytes(&wire).unwrap();
    assert_eq!(decoded.targets(), &targets);
    assert_eq!(decoded.row_numbers(), pack.row_numbers());
    assert!(decoded.verify().unwrap());
}

/// S5-style scenario: condensing preserves the endpoints' row hashes and
/// still round-trips through the wire format.
#[test]
fn condensed_pack_round_trips_and_keeps_endpoint_hashes() {
    let ledger = SkipLedger::open(MemTable::default()).unwrap();
    let inputs: Vec<Hash> = (1u8..=64).map(input).collect();
    ledger.append(&inputs).unwrap();

    let targets = [1, 64];
    let path = ledger.get_path(&targets).unwrap();
    let full = PathPack::for_path(&path, &targets);
    let condensed = full.condense();

    let wire = condensed.to_bytes();
    let decoded = PathPack::from_bytes(&wire).unwrap();
    assert_eq!(decoded, condensed);

    let rebuilt = decoded.path().unwrap();
    assert_eq!(rebuilt.rows.first().unwrap().row_hash, path.rows.first().unwrap().row_hash);
    assert_eq!(rebuilt.rows.last().unwrap().row_hash, path.rows.last().unwrap().row_hash);
}

/// Tampering with a carried hash inside the wire block is caught on decode.
#[test]
fn corrupted_carried_hash_is_detected() {
    let ledger = SkipLedger::open(MemTable::default()).unwrap();
    let inputs: Vec<Hash> = (1u8..=10).map(input).collect();
    ledger.append(&inputs).unwrap();

    let targets = [1, 10];
    let path = ledger.get_path(&targets).unwrap();
    let pack = PathPack::for_path(&path, &targets);
    let mut wire = pack.to_bytes();

    // Flip a byte inside the carried-hashes section (after header, target
    // count, the target list, and the first `inputs` block).
    let row_count = path.rows.len();
    let offset = 1 + 4 + targets.len() * 8 + row_count * 32;
    wire[offset] ^= 0xFF;

    let decoded = PathPack::from_bytes(&wire).unwrap();
    assert!(!decoded.verify().unwrap());
}
