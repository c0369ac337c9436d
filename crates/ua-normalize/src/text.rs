//! Byte-index helpers that never split a UTF-8 sequence.

/// Finds `needle` in `haystack` starting at byte offset `start`.
pub(crate) fn find_from(haystack: &str, needle: &str, start: usize) -> Option<usize> {
    haystack
        .get(start..)
        .and_then(|tail| tail.find(needle))
        .map(|pos| start + pos)
}

/// Returns at most `count` characters starting at byte offset `start`.
pub(crate) fn take_chars(s: &str, start: usize, count: usize) -> &str {
    let Some(tail) = s.get(start..) else {
        return "";
    };
    match tail.char_indices().nth(count) {
        Some((end, _)) => &tail[..end],
        None => tail,
    }
}

pub(crate) fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_from_offsets_are_absolute() {
        assert_eq!(find_from("a/b/c", "/", 0), Some(1));
        assert_eq!(find_from("a/b/c", "/", 2), Some(3));
        assert_eq!(find_from("a/b/c", "/", 4), None);
        assert_eq!(find_from("a/b/c", "/", 99), None);
    }

    #[test]
    fn take_chars_respects_char_boundaries() {
        assert_eq!(take_chars("MSIE 7.0; Windows", 0, 8), "MSIE 7.0");
        assert_eq!(take_chars("xMSIE", 1, 8), "MSIE");
        assert_eq!(take_chars("ääää", 0, 2), "ää");
    }
}
