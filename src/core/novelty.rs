use std::collections::HashMap;

/// Identifier of an instrumented edge as reported by the coverage tool.
pub type EdgeId = u32;

/// The canonical coarse hit-count buckets, in ascending order.
pub const BUCKETS: [u32; 9] = [0, 1, 2, 3, 4, 8, 16, 32, 128];

/// Maps a raw edge hit count onto its coarse bucket. Counts up to 4 map to
/// themselves, higher counts collapse into power-of-two ranges the same way
/// AFL's bitmap classifier does.
pub fn bucket(hit_count: u32) -> u32 {
    match hit_count {
        0..=4 => hit_count,
        5..=7 => 4,
        8..=15 => 8,
        16..=31 => 16,
        32..=127 => 32,
        _ => 128,
    }
}

/// Set of buckets already seen for one edge, one bit per slot in `BUCKETS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BucketSet(u16);

impl BucketSet {
    /// Inserts a canonical bucket value. Returns true if it was absent.
    fn insert(&mut self, bucket: u32) -> bool {
        let Some(slot) = BUCKETS.iter().position(|&b| b == bucket) else {
            return false;
        };
        let bit = 1u16 << slot;
        let inserted = self.0 & bit == 0;
        self.0 |= bit;
        inserted
    }
}

/// Whether an observation advanced either novelty criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Novelty {
    /// Some edge produced a bucket not seen for it before.
    pub new_bucketed: bool,
    /// Some edge produced an exact hit count not seen for it before.
    pub new_raw: bool,
}

/// Tracks which (edge, bucket) and (edge, raw count) pairs a campaign has
/// produced so far, so each coverage observation can be classified as novel
/// or already-known under both criteria at once.
///
/// The raw criterion keeps every distinct count per edge, which on hot edges
/// can grow without bound; `with_raw_cap` bounds the per-edge history, after
/// which further counts on that edge no longer register as novel.
#[derive(Debug, Default)]
pub struct NoveltyTracker {
    buckets: HashMap<EdgeId, BucketSet>,
    raw: HashMap<EdgeId, Vec<u32>>,
    raw_cap: Option<usize>,
}

impl NoveltyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw_cap(cap: usize) -> Self {
        Self {
            raw_cap: Some(cap),
            ..Self::default()
        }
    }

    /// Folds one observation into the campaign history. The returned flags
    /// are ORed across all edges in the observation: a single novel edge is
    /// enough to mark the whole observation novel.
    pub fn observe(&mut self, hits: &[(EdgeId, u32)]) -> Novelty {
        let mut novelty = Novelty::default();

        for &(edge, count) in hits {
            if self.buckets.entry(edge).or_default().insert(bucket(count)) {
                novelty.new_bucketed = true;
            }

            let counts = self.raw.entry(edge).or_default();
            if !counts.contains(&count) {
                match self.raw_cap {
                    Some(cap) if counts.len() >= cap => {}
                    _ => {
                        counts.push(count);
                        novelty.new_raw = true;
                    }
                }
            }
        }

        novelty
    }

    /// Number of distinct edges observed so far, regardless of hit counts.
    pub fn covered_edges(&self) -> u64 {
        self.buckets.len() as u64
    }
}
