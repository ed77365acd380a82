use crate::SrvRecord;
use rand::Rng;

/// Picks one record per RFC 2782: only records of the lowest priority
/// present are considered, and among those each is chosen with probability
/// proportional to its weight. When every candidate has weight zero the
/// choice is uniform.
///
/// Returns `None` for an empty slice.
pub fn pick_one<'a, R: SrvRecord>(records: &'a [R], rng: &mut impl Rng) -> Option<&'a R> {
    let lowest = records.iter().map(|record| record.priority()).min()?;
    let candidates = records
        .iter()
        .filter(|record| record.priority() == lowest)
        .collect::<Vec<_>>();

    let total = candidates
        .iter()
        .map(|record| u32::from(record.weight()))
        .sum::<u32>();
    if total == 0 {
        return Some(candidates[rng.random_range(0..candidates.len())]);
    }

    let mut draw = rng.random_range(0..total);
    for &candidate in &candidates {
        let weight = u32::from(candidate.weight());
        if draw < weight {
            return Some(candidate);
        }
        draw -= weight;
    }

    // Unreachable since draw < total
    candidates.first().copied()
}

/// Sorts records by ascending priority, then descending weight. Records
/// that compare equal keep their relative order.
pub fn sort_all<R: SrvRecord>(records: &mut [R]) {
    records.sort_by_key(|record| record.sort_key());
}
