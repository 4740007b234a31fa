//! SimHash fingerprinting and k-nearest candidate generation.
//!
//! Each `Line`'s fingerprint is a locality-sensitive 64-bit hash: feature
//! hashes are summed with ±1 weighting per bit, then sign-collapsed.
//! `SimHashIndex` holds the new side's fingerprint vector and answers
//! k-nearest (by Hamming distance) queries for any old-line fingerprint.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::BinaryHeap;
use std::hash::{Hash, Hasher};

use crate::types::{CandidateSet, LineSide};

/// Compute the 64-bit SimHash fingerprint of a single normalized line.
///
/// Features are word 3-gram shingles of the line; lines shorter than
/// three words fall back to a single whole-line shingle.
pub fn simhash(normalized_line: &str) -> u64 {
    let shingles = generate_shingles(normalized_line, 3);

    let mut v = [0i32; 64];
    for shingle in &shingles {
        let hash = hash_string(shingle);
        for (i, slot) in v.iter_mut().enumerate() {
            if (hash >> i) & 1 == 1 {
                *slot += 1;
            } else {
                *slot -= 1;
            }
        }
    }

    let mut result: u64 = 0;
    for (i, &weight) in v.iter().enumerate() {
        if weight > 0 {
            result |= 1 << i;
        }
    }
    result
}

fn generate_shingles(line: &str, n: usize) -> Vec<String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() >= n {
        words.windows(n).map(|w| w.join(" ")).collect()
    } else {
        vec![words.join(" ")]
    }
}

fn hash_string(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Hamming distance between two fingerprints: the number of differing bits.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Convert a Hamming distance into a [0,1] similarity score.
pub fn simhash_similarity(a: u64, b: u64) -> f64 {
    1.0 - (hamming_distance(a, b) as f64 / 64.0)
}

/// Index over one side's fingerprints supporting bounded k-nearest lookups.
pub struct SimHashIndex {
    fingerprints: Vec<u64>,
}

#[derive(PartialEq, Eq)]
struct Candidate {
    distance: u32,
    index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl SimHashIndex {
    /// Build an index over a side's fingerprints. Callers build one
    /// `SimHashIndex` per new side per run; rebuilding is not required.
    pub fn build(side: &LineSide) -> Self {
        let fingerprints = side.iter().map(|l| l.fingerprint).collect();
        Self { fingerprints }
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// The up-to-`k` indices nearest to `fingerprint` by Hamming distance,
    /// ordered ascending by distance then ascending by index.
    ///
    /// Uses a bounded max-heap of size `k`: the heap's top is always the
    /// worst (largest-distance, highest-tie-breaking-index) of the
    /// current best-k, so the heap never grows past size `k`.
    pub fn k_nearest(&self, fingerprint: u64, k: usize) -> Vec<usize> {
        if k == 0 || self.fingerprints.is_empty() {
            return Vec::new();
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (index, &fp) in self.fingerprints.iter().enumerate() {
            let candidate = Candidate {
                distance: hamming_distance(fingerprint, fp),
                index,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        let mut ordered: Vec<Candidate> = heap.into_vec();
        ordered.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.index.cmp(&b.index)));
        ordered.into_iter().map(|c| c.index).collect()
    }
}

/// For every old line, its up-to-`k` nearest new-line candidates by
/// SimHash distance. One `SimHashIndex` build over `new`, one lookup
/// per old line.
pub fn build_candidates(old: &LineSide, new: &LineSide, k: usize) -> CandidateSet {
    let index = SimHashIndex::build(new);
    let mut candidates = CandidateSet::new();
    for i in 0..old.len() {
        candidates.insert(i, index.k_nearest(old.fingerprint(i), k));
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(0, 0), 0);
        assert_eq!(hamming_distance(0, 1), 1);
        assert_eq!(hamming_distance(0b1111, 0b0000), 4);
    }

    #[test]
    fn test_simhash_similarity() {
        assert_eq!(simhash_similarity(0, 0), 1.0);
        assert!(simhash_similarity(0, u64::MAX) < 0.1);
    }

    #[test]
    fn test_simhash_deterministic() {
        let a = simhash("a = b + c");
        let b = simhash("a = b + c");
        assert_eq!(a, b);
    }

    #[test]
    fn test_simhash_similar_lines_closer_than_dissimilar() {
        let base = simhash("int count = 0");
        let similar = simhash("int count = 1");
        let different = simhash("return this.resolvedType");
        assert!(hamming_distance(base, similar) <= hamming_distance(base, different));
    }

    #[test]
    fn test_k_nearest_empty_index() {
        let index = SimHashIndex {
            fingerprints: Vec::new(),
        };
        assert!(index.k_nearest(42, 5).is_empty());
    }

    #[test]
    fn test_k_nearest_orders_by_distance_then_index() {
        let index = SimHashIndex {
            fingerprints: vec![0b1111, 0b1110, 0b0000, 0b1110],
        };
        let nearest = index.k_nearest(0b0000, 2);
        assert_eq!(nearest, vec![2, 1]);
    }

    #[test]
    fn test_build_candidates_one_entry_per_old_line() {
        use crate::config::NormalizeOptions;

        let old = LineSide::from_raw_lines(&["a = 1;".to_string(), "b = 2;".to_string()], NormalizeOptions::default());
        let new = LineSide::from_raw_lines(&["a = 1;".to_string(), "b = 2;".to_string()], NormalizeOptions::default());

        let candidates = build_candidates(&old, &new, 2);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates.get(&0).unwrap()[0], 0);
    }
}
