use crate::Error;
use skipledger_core::algebra::{skip_count, skip_refs, stitch};
use skipledger_core::rowhash::row_hash as rederive_row_hash;
use skipledger_core::{Path, Row};
use skipledger_digest::{Digest, Hash};
use std::collections::BTreeMap;

const HEADER_FULL: u8 = 0x00;
const HEADER_CONDENSED: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackKind {
    Full,
    Condensed,
}

/// An explicit `(row, level) -> referenced row hash` entry, carried for
/// references whose target is not itself a row in this pack's `R`.
#[derive(Debug, Clone, PartialEq)]
pub struct RefEntry {
    pub row: u64,
    pub level: u32,
    pub hash: Hash,
}

/// A condensed row's pruned references, aggregated into one hash by a
/// fixed, level-ordered reduction (see [`fold_funnel`]).
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelEntry {
    pub row: u64,
    pub hash: Hash,
}

/// Serialized, authenticated slice of a ledger over a stitched row set.
///
/// Carries the caller's original, compact target list (`targets`, wire
/// name `preStitchRowNos`) rather than the expanded stitched set `R` — a
/// decoder re-derives `R` by re-running `stitch()` over `targets`, so a
/// pack over a handful of targets stays small regardless of how many
/// intermediate rows the stitch passes through. Also carries, beyond the
/// wire sections named in the external wire-format description (`inputs`,
/// `funnels`, `refs`): a parallel `carried_hashes` section giving the
/// claimed `rowHash` for every row in `R`. Without it there is nothing for
/// a decoder to check a recomputed hash against — `verify()` would be
/// trivially true for any well-formed byte stream. See `DESIGN.md` for the
/// full rationale on both points.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPack {
    kind: PackKind,
    targets: Vec<u64>,
    row_numbers: Vec<u64>,
    inputs: Vec<Hash>,
    carried_hashes: Vec<Hash>,
    refs: Vec<RefEntry>,
    funnels: Vec<FunnelEntry>,
}

impl PathPack {
    /// Build a full pack from an already-resolved ledger `Path` and the
    /// caller's original ascending target list that produced it.
    pub fn for_path(path: &Path, targets: &[u64]) -> Self {
        let row_numbers = path.row_numbers();
        let in_r: std::collections::BTreeSet<u64> = row_numbers.iter().copied().collect();

        let mut inputs = Vec::with_capacity(path.rows.len());
        let mut carried_hashes = Vec::with_capacity(path.rows.len());
        let mut refs = Vec::new();

        for row in &path.rows {
            inputs.push(row.input_hash);
            carried_hashes.push(row.row_hash);
            for (level, target) in skip_refs(row.number).into_iter().enumerate() {
                if target == 0 || in_r.contains(&target) {
                    continue;
                }
                refs.push(RefEntry { row: row.number, level: level as u32, hash: row.refs[level] });
            }
        }

        Self {
            kind: PackKind::Full,
            targets: targets.to_vec(),
            row_numbers,
            inputs,
            carried_hashes,
            refs,
            funnels: Vec::new(),
        }
    }

    pub fn kind(&self) -> PackKind {
        self.kind
    }

    /// The caller's original ascending target list (`preStitchRowNos`).
    pub fn targets(&self) -> &[u64] {
        &self.targets
    }

    /// The full stitched row set `R`, derived from `targets`.
    pub fn row_numbers(&self) -> &[u64] {
        &self.row_numbers
    }

    /// Condense this pack: every row except the first and the last has its
    /// explicit references aggregated into one funnel hash. Endpoint rows
    /// keep full references, so their row hashes remain independently
    /// verifiable (property 4).
    pub fn condense(&self) -> Self {
        if self.kind == PackKind::Condensed || self.row_numbers.len() < 2 {
            return self.clone();
        }
        let first = self.row_numbers[0];
        let last = *self.row_numbers.last().unwrap();

        let mut grouped: BTreeMap<u64, Vec<&RefEntry>> = BTreeMap::new();
        for entry in &self.refs {
            grouped.entry(entry.row).or_default().push(entry);
        }

        let mut refs = Vec::new();
        let mut funnels = Vec::new();
        for (row, mut group) in grouped {
            if row == first || row == last {
                group.sort_by_key(|e| e.level);
                refs.extend(group.into_iter().cloned());
            } else {
                group.sort_by_key(|e| e.level);
                let hashes: Vec<Hash> = group.iter().map(|e| e.hash).collect();
                funnels.push(FunnelEntry { row, hash: fold_funnel(&hashes) });
            }
        }

        Self {
            kind: PackKind::Condensed,
            targets: self.targets.clone(),
            row_numbers: self.row_numbers.clone(),
            inputs: self.inputs.clone(),
            carried_hashes: self.carried_hashes.clone(),
            refs,
            funnels,
        }
    }

    /// Reconstruct the `Path` this pack describes, verifying every row
    /// whose references are carried explicitly (all rows in a full pack;
    /// only the endpoints in a condensed one).
    pub fn path(&self) -> Result<Path, Error> {
        if self.row_numbers.is_empty() {
            return Ok(Path { rows: Vec::new() });
        }
        if self.inputs.len() != self.row_numbers.len() || self.carried_hashes.len() != self.row_numbers.len() {
            return Err(Error::Malformed("inputs/carried_hashes length does not match row count"));
        }

        let first = self.row_numbers[0];
        let last = *self.row_numbers.last().unwrap();

        let explicit: BTreeMap<(u64, u32), Hash> =
            self.refs.iter().map(|e| ((e.row, e.level), e.hash)).collect();
        let funneled: BTreeMap<u64, Hash> = self.funnels.iter().map(|e| (e.row, e.hash)).collect();

        let mut computed: BTreeMap<u64, Hash> = BTreeMap::new();
        let mut digest = Digest::new();
        let mut rows = Vec::with_capacity(self.row_numbers.len());

        for (idx, &r) in self.row_numbers.iter().enumerate() {
            let input_hash = self.inputs[idx];
            let carried = self.carried_hashes[idx];

            if let Some(&funnel_hash) = funneled.get(&r) {
                if r == first || r == last {
                    return Err(Error::Malformed("endpoint row must not be funneled"));
                }
                computed.insert(r, carried);
                rows.push(Row { number: r, input_hash, row_hash: carried, refs: vec![funnel_hash] });
                continue;
            }

            let sc = skip_count(r);
            let mut resolved = Vec::with_capacity(sc as usize);
            for (level, target) in skip_refs(r).into_iter().enumerate() {
                let hash = if target == 0 {
                    Digest::sentinel()
                } else if let Some(h) = computed.get(&target) {
                    *h
                } else if let Some(h) = explicit.get(&(r, level as u32)) {
                    *h
                } else {
                    return Err(Error::MissingTarget(target));
                };
                resolved.push(hash);
            }

            let recomputed = rederive_row_hash(input_hash, &resolved, &mut digest);
            if recomputed != carried {
                return Err(Error::HashConflict(r));
            }
            computed.insert(r, recomputed);
            rows.push(Row { number: r, input_hash, row_hash: recomputed, refs: resolved });
        }

        Ok(Path { rows })
    }

    /// `true` iff every row this pack can independently verify reproduces
    /// its carried hash. `Malformed`/`MissingTarget` still propagate as
    /// errors — those indicate incomplete or corrupt data, not merely a
    /// failed check.
    pub fn verify(&self) -> Result<bool, Error> {
        match self.path() {
            Ok(_) => Ok(true),
            Err(Error::HashConflict(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Serialize the hash block: 1-byte header, then `preStitchRowNos`
    /// (the caller's compact target list), `inputs`, `carried_hashes`,
    /// `funnels`, `refs` sections. The full stitched row set `R` is not
    /// carried on the wire; a decoder re-derives it from
    /// `preStitchRowNos` via `stitch()`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(match self.kind {
            PackKind::Full => HEADER_FULL,
            PackKind::Condensed => HEADER_CONDENSED,
        });
        out.extend_from_slice(&(self.targets.len() as u32).to_be_bytes());
        for n in &self.targets {
            out.extend_from_slice(&n.to_be_bytes());
        }
        for h in &self.inputs {
            out.extend_from_slice(h);
        }
        for h in &self.carried_hashes {
            out.extend_from_slice(h);
        }
        out.extend_from_slice(&(self.funnels.len() as u32).to_be_bytes());
        for f in &self.funnels {
            out.extend_from_slice(&f.row.to_be_bytes());
            out.extend_from_slice(&f.hash);
        }
        out.extend_from_slice(&(self.refs.len() as u32).to_be_bytes());
        for r in &self.refs {
            out.extend_from_slice(&r.row.to_be_bytes());
            out.push(r.level as u8);
            out.extend_from_slice(&r.hash);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut cur = bytes;
        let kind = match take(&mut cur, 1)?[0] {
            HEADER_FULL => PackKind::Full,
            HEADER_CONDENSED => PackKind::Condensed,
            _ => return Err(Error::Malformed("unknown pack header byte")),
        };

        let target_count = u32::from_be_bytes(take(&mut cur, 4)?.try_into().unwrap()) as usize;
        let mut targets = Vec::with_capacity(target_count);
        for _ in 0..target_count {
            targets.push(u64::from_be_bytes(take(&mut cur, 8)?.try_into().unwrap()));
        }
        let row_numbers = stitch(&targets)?;
        let row_count = row_numbers.len();

        let mut inputs = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            inputs.push(take_hash(&mut cur)?);
        }
        let mut carried_hashes = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            carried_hashes.push(take_hash(&mut cur)?);
        }

        let funnel_count = u32::from_be_bytes(take(&mut cur, 4)?.try_into().unwrap()) as usize;
        let mut funnels = Vec::with_capacity(funnel_count);
        for _ in 0..funnel_count {
            let row = u64::from_be_bytes(take(&mut cur, 8)?.try_into().unwrap());
            let hash = take_hash(&mut cur)?;
            funnels.push(FunnelEntry { row, hash });
        }

        let ref_count = u32::from_be_bytes(take(&mut cur, 4)?.try_into().unwrap()) as usize;
        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let row = u64::from_be_bytes(take(&mut cur, 8)?.try_into().unwrap());
            let level = take(&mut cur, 1)?[0] as u32;
            let hash = take_hash(&mut cur)?;
            refs.push(RefEntry { row, level, hash });
        }

        if !cur.is_empty() {
            return Err(Error::Malformed("trailing bytes after pack sections"));
        }

        Ok(Self { kind, targets, row_numbers, inputs, carried_hashes, refs, funnels })
    }

    /// JSON encoding: `bnos` (`preStitchRowNos`, the caller's compact
    /// target list), `type` (0 full / 1 condensed), `hashes` (hex of the
    /// binary hash block).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "bnos": self.targets,
            "type": if self.kind == PackKind::Full { 0 } else { 1 },
            "hashes": hex::encode(self.to_bytes()),
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        let hex_str = value
            .get("hashes")
            .and_then(|v| v.as_str())
            .ok_or(Error::Malformed("missing hashes field"))?;
        let bytes = hex::decode(hex_str).map_err(|_| Error::Malformed("hashes field is not valid hex"))?;
        Self::from_bytes(&bytes)
    }
}

/// Fold a level-ordered slice of pruned reference hashes into a single
/// funnel hash. Fixed reduction order — an alternative (e.g. balanced-tree)
/// reduction would change every condensed pack's row hashes.
pub fn fold_funnel(hashes: &[Hash]) -> Hash {
    let mut iter = hashes.iter();
    let mut acc = *iter.next().unwrap_or(&Digest::sentinel());
    let mut digest = Digest::new();
    for h in iter {
        acc = digest.hash(&[&acc, h]);
    }
    acc
}

fn take<'a>(cur: &mut &'a [u8], n: usize) -> Result<&'a [u8], Error> {
    if cur.len() < n {
        return Err(Error::Malformed("unexpected end of pack bytes"));
    }
    let (head, tail) = cur.split_at(n);
    *cur = tail;
    Ok(head)
}

fn take_hash(cur: &mut &[u8]) -> Result<Hash, Error> {
    let slice = take(cur, 32)?;
    let mut h = [0u8; 32];
    h.copy_from_slice(slice);
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skipledger_core::backend::{SkipTable, ROW_WIDTH};
    use skipledger_core::SkipLedger;

    #[derive(Default)]
    struct MemTable {
        rows: Vec<[u8; ROW_WIDTH]>,
    }

    impl SkipTable for MemTable {
        fn size(&self) -> u64 {
            self.rows.len() as u64
        }
        fn add_rows(&mut self, bytes: &[u8], at_index: u64) -> Result<u64, skipledger_core::Error> {
            if at_index != self.rows.len() as u64 {
                return Err(skipledger_core::Error::Concurrent);
            }
            for chunk in bytes.chunks_exact(ROW_WIDTH) {
                let mut record = [0u8; ROW_WIDTH];
                record.copy_from_slice(chunk);
                self.rows.push(record);
            }
            Ok(self.rows.len() as u64)
        }
        fn read_row(&self, index: u64) -> Result<[u8; ROW_WIDTH], skipledger_core::Error> {
            self.rows.get(index as usize).copied().ok_or(skipledger_core::Error::OutOfRange(index + 1))
        }
        fn trim_size(&mut self, new_size: u64) -> Result<(), skipledger_core::Error> {
            self.rows.truncate(new_size as usize);
            Ok(())
        }
        fn close(&mut self) -> Result<(), skipledger_core::Error> {
            Ok(())
        }
    }

    fn build_ledger(n: u8) -> SkipLedger<MemTable> {
        let ledger = SkipLedger::open(MemTable::default()).unwrap();
        let inputs: Vec<Hash> = (1..=n).map(|b| [b; 32]).collect();
        ledger.append(&inputs).unwrap();
        ledger
    }

    #[test]
    fn full_pack_round_trips() {
        let ledger = build_ledger(40);
        let targets = [1, 17, 40];
        let path = ledger.get_path(&targets).unwrap();
        let pack = PathPack::for_path(&path, &targets);
        let rebuilt = pack.path().unwrap();
        assert_eq!(rebuilt, path);
        assert!(pack.verify().unwrap());
    }

    #[test]
    fn condensed_pack_preserves_endpoint_hashes() {
        let ledger = build_ledger(40);
        let targets = [1, 17, 40];
        let path = ledger.get_path(&targets).unwrap();
        let pack = PathPack::for_path(&path, &targets).condense();
        assert_eq!(pack.kind(), PackKind::Condensed);
        let rebuilt = pack.path().unwrap();
        assert_eq!(rebuilt.rows.first().unwrap().row_hash, path.rows.first().unwrap().row_hash);
        assert_eq!(rebuilt.rows.last().unwrap().row_hash, path.rows.last().unwrap().row_hash);
    }

    #[test]
    fn wire_round_trip() {
        let ledger = build_ledger(20);
        let targets = [1, 20];
        let path = ledger.get_path(&targets).unwrap();
        let pack = PathPack::for_path(&path, &targets);
        let bytes = pack.to_bytes();
        let decoded = PathPack::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, pack);
    }

    #[test]
    fn json_round_trip() {
        let ledger = build_ledger(20);
        let targets = [1, 20];
        let path = ledger.get_path(&targets).unwrap();
        let pack = PathPack::for_path(&path, &targets);
        let json = pack.to_json();
        let decoded = PathPack::from_json(&json).unwrap();
        assert_eq!(decoded, pack);
    }

    #[test]
    fn tampered_input_hash_trips_hash_conflict() {
        let ledger = build_ledger(10);
        let targets = [1, 10];
        let path = ledger.get_path(&targets).unwrap();
        let mut pack = PathPack::for_path(&path, &targets);
        pack.inputs[0] = [0xFF; 32];
        assert!(!pack.verify().unwrap());
    }
}
