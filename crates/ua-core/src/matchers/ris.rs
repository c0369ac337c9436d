//! Reduction in string: longest common prefix by binary search.

use std::cmp::Ordering;

/// Length in bytes of the common prefix of `a` and `b`.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// Finds the entry of `sorted` sharing the longest prefix with `needle`.
///
/// The binary search only visits `log n` probes, so the result is the best
/// prefix among the probes, widened backwards to the first entry with the
/// same prefix length. Returns `None` unless that prefix is at least
/// `tolerance` bytes long.
pub fn prefix_match(sorted: &[String], needle: &str, tolerance: usize) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }

    let mut best = 0usize;
    let mut best_index = None;
    let mut low = 0isize;
    let mut high = sorted.len() as isize - 1;

    while low <= high {
        let mid = ((low + high) / 2) as usize;
        let probe = sorted[mid].as_str();
        let prefix = common_prefix_len(probe, needle);
        if prefix >= tolerance && prefix > best {
            best = prefix;
            best_index = Some(mid);
        }
        match probe.cmp(needle) {
            Ordering::Less => low = mid as isize + 1,
            Ordering::Greater => high = mid as isize - 1,
            Ordering::Equal => break,
        }
    }

    let mut idx = best_index?;
    while idx > 0 && common_prefix_len(&sorted[idx - 1], needle) == best {
        idx -= 1;
    }
    Some(idx)
}
