//! Levenshtein distance matching within a length window.

/// Finds the entry of `candidates` closest to `needle` by edit distance.
///
/// Only entries whose length differs from the needle by at most `tolerance`
/// are compared, and the distance must not exceed `tolerance`. Each accepted
/// candidate tightens the bound, so the last one recorded is strictly closer
/// than every earlier one.
pub fn levenshtein_match(candidates: &[String], needle: &str, tolerance: usize) -> Option<usize> {
    let needle_len = needle.chars().count();
    let mut bound = tolerance as isize;
    let mut found = None;

    for (idx, candidate) in candidates.iter().enumerate() {
        let len = candidate.chars().count();
        if len.abs_diff(needle_len) > tolerance {
            continue;
        }
        let distance = strsim::levenshtein(candidate, needle) as isize;
        if distance <= bound {
            bound = distance - 1;
            found = Some(idx);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_closest_within_tolerance() {
        let uas = owned(&["Nintendo Wii", "Nintendo DSi", "Nintendo Wii U"]);
        assert_eq!(levenshtein_match(&uas, "Nintendo Wiii", 7), Some(0));
    }

    #[test]
    fn rejects_distances_above_tolerance() {
        let uas = owned(&["MOT-V3/0E.41.0FR"]);
        assert_eq!(levenshtein_match(&uas, "MOT-V360/08.B7.DCR", 2), None);
        assert_eq!(levenshtein_match(&uas, "MOT-V3/0E.41.0FX", 2), Some(0));
    }

    #[test]
    fn length_window_skips_far_candidates() {
        let uas = owned(&["short", "a much longer user agent string"]);
        assert_eq!(levenshtein_match(&uas, "shirt", 1), Some(0));
        assert_eq!(levenshtein_match(&uas, "", 3), None);
    }

    #[test]
    fn first_of_equal_distances_is_kept() {
        let uas = owned(&["abcx", "abcy"]);
        assert_eq!(levenshtein_match(&uas, "abcz", 2), Some(0));
    }
}
