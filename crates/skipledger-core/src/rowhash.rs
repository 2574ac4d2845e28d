use skipledger_digest::{Digest, Hash};

/// The row-hash rule: `H( inputHash ‖ ref[0] ‖ ref[1] ‖ … ‖ ref[skipCount-1] )`.
///
/// `refs` must already be resolved — the caller substitutes the sentinel
/// hash for any reference to the abstract row 0; this function never
/// special-cases that itself; it is the single place callers funnel through
/// so the rule is defined exactly once.
pub fn row_hash(input_hash: Hash, refs: &[Hash], digest: &mut Digest) -> Hash {
    let mut parts: Vec<&[u8]> = Vec::with_capacity(refs.len() + 1);
    parts.push(&input_hash);
    for r in refs {
        parts.push(r);
    }
    digest.hash(&parts)
}
