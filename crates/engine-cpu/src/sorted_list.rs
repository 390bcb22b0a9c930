//! Sorted-list witness: `nb_elements` generator draws, sorted, concatenated.

use challenge_core::{
    sha256, write_sequence, ChallengeRng, Digest, HexPrefix, SeedDeriver, SortOrder,
    SortedListParams, MAX_SORTED_ELEMENTS,
};

use crate::CandidatePredicate;

/// Handles both `sorted_list` (ascending) and `reverse_sorted_list`.
#[derive(Debug)]
pub struct SortedListPredicate {
    prefix: HexPrefix,
    params: SortedListParams,
    seeds: SeedDeriver,
    rng: ChallengeRng,
    values: Vec<u64>,
    text: String,
}

impl SortedListPredicate {
    pub fn new(previous_hash: &str, prefix: HexPrefix, params: SortedListParams) -> Self {
        let reserve = params.nb_elements.min(MAX_SORTED_ELEMENTS);
        Self {
            prefix,
            params,
            seeds: SeedDeriver::new(previous_hash),
            rng: ChallengeRng::new(0),
            values: Vec::with_capacity(reserve),
            // Up to 20 decimal digits per value.
            text: String::with_capacity(reserve.saturating_mul(20)),
        }
    }

    pub fn params(&self) -> &SortedListParams {
        &self.params
    }

    /// Regenerates and returns the sorted witness for `nonce`.
    pub fn witness(&mut self, nonce: u64) -> &[u64] {
        self.rng.reseed(self.seeds.derive(nonce));
        self.values.clear();
        for _ in 0..self.params.nb_elements {
            self.values.push(self.rng.next_u64());
        }
        match self.params.order {
            SortOrder::Ascending => self.values.sort_unstable(),
            SortOrder::Descending => self.values.sort_unstable_by(|a, b| b.cmp(a)),
        }
        &self.values
    }

    /// Canonical serialization of the last witness.
    pub fn serialized(&self) -> &str {
        &self.text
    }
}

impl CandidatePredicate for SortedListPredicate {
    fn name(&self) -> &'static str {
        self.params.kind().name()
    }

    fn prefix(&self) -> &HexPrefix {
        &self.prefix
    }

    fn witness_digest(&mut self, nonce: u64) -> Option<Digest> {
        self.witness(nonce);
        write_sequence(&mut self.text, &self.values);
        Some(sha256(self.text.as_bytes()))
    }
}
