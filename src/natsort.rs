// Natural ("human") ordering of file names, so that `img2` sorts before
// `img10`. Folders are aligned by sorted position, which makes this ordering
// the thing that decides which files end up in the same item.

use std::cmp::Ordering;

/// One piece of a split name: either a run of non-digits or a run of ASCII
/// digits. Digit runs keep their raw text so a key can be turned back into
/// the original name; they compare by numeric value.
#[derive(Debug, Clone)]
pub enum Chunk {
    Text(String),
    Number(String),
}

impl Chunk {
    /// Raw text of the chunk as it appeared in the name.
    pub fn as_str(&self) -> &str {
        match self {
            Chunk::Text(s) | Chunk::Number(s) => s,
        }
    }
}

// Digit run without leading zeros, "0" for an all-zero run. Comparing by
// (length, text) on this form compares by magnitude for runs of any length.
fn significant(digits: &str) -> &str {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

impl Ord for Chunk {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
            (Chunk::Number(a), Chunk::Number(b)) => {
                let (a, b) = (significant(a), significant(b));
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            // Text always sorts before numbers.
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Less,
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Chunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Chunk {}

/// Sort key for a name. Always has an odd number of chunks: text, then
/// (number, text) pairs, with empty text chunks kept at the edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Chunk>);

impl NaturalKey {
    pub fn chunks(&self) -> &[Chunk] {
        &self.0
    }
}

/// Split `name` on maximal runs of ASCII digits.
///
/// `"z23a"` becomes `["z", 23, "a"]` and `"12a"` becomes `["", 12, "a"]`.
pub fn natural_key(name: &str) -> NaturalKey {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut in_digits = false;

    for (idx, ch) in name.char_indices() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != in_digits {
            let piece = name[start..idx].to_string();
            chunks.push(if in_digits {
                Chunk::Number(piece)
            } else {
                Chunk::Text(piece)
            });
            start = idx;
            in_digits = is_digit;
        }
    }

    let tail = name[start..].to_string();
    if in_digits {
        chunks.push(Chunk::Number(tail));
        chunks.push(Chunk::Text(String::new()));
    } else {
        chunks.push(Chunk::Text(tail));
    }
    NaturalKey(chunks)
}

/// Stable in-place natural sort.
pub fn natural_sort(names: &mut [String]) {
    names.sort_by_cached_key(|name| natural_key(name));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Chunk {
        Chunk::Text(s.into())
    }

    fn num(s: &str) -> Chunk {
        Chunk::Number(s.into())
    }

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        natural_sort(&mut v);
        v
    }

    #[test]
    fn splits_into_alternating_chunks() {
        assert_eq!(natural_key("z23a").chunks(), &[text("z"), num("23"), text("a")]);
        assert_eq!(natural_key("12a").chunks(), &[text(""), num("12"), text("a")]);
        assert_eq!(natural_key("a12").chunks(), &[text("a"), num("12"), text("")]);
        assert_eq!(natural_key("").chunks(), &[text("")]);
        assert_eq!(natural_key("plain").chunks(), &[text("plain")]);
    }

    #[test]
    fn chunks_concatenate_back_to_the_name() {
        for name in ["z23a", "007_bond", "img_0010.png", "", "a1b22c333", "ünï9cödé"] {
            let rebuilt: String = natural_key(name)
                .chunks()
                .iter()
                .map(Chunk::as_str)
                .collect();
            assert_eq!(rebuilt, name);
        }
    }

    #[test]
    fn numbers_compare_by_magnitude() {
        assert_eq!(sorted(&["img10", "img2"]), vec!["img2", "img10"]);
        assert_eq!(sorted(&["a10", "a2", "a", "a1"]), vec!["a", "a1", "a2", "a10"]);
        assert_eq!(
            sorted(&["f_100.png", "f_9.png", "f_10.png"]),
            vec!["f_9.png", "f_10.png", "f_100.png"]
        );
    }

    #[test]
    fn digit_runs_longer_than_any_integer_type_still_order() {
        let big = "x123456789012345678901234567890";
        let bigger = "x999999999999999999999999999999999";
        assert_eq!(sorted(&[bigger, big]), vec![big, bigger]);
    }

    #[test]
    fn equal_keys_keep_their_original_order() {
        assert_eq!(natural_key("a01"), natural_key("a1"));
        assert_eq!(sorted(&["a1", "a01", "a001"]), vec!["a1", "a01", "a001"]);
        assert_eq!(sorted(&["a01", "a1"]), vec!["a01", "a1"]);
    }

    #[test]
    fn text_sorts_before_numbers() {
        assert!(text("zzz") < num("0"));
        assert!(num("0") > text(""));
        // leading digits: "" prefix chunk is shared, then the number decides
        assert_eq!(sorted(&["10.png", "9.png"]), vec!["9.png", "10.png"]);
    }
}
