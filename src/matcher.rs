//! Name and ID matching over OCR output.
//!
//! Names are matched fuzzily, line by line, with a partial ratio: the shorter
//! string is slid across the longer one and the best indel similarity of any
//! alignment wins. ID numbers are matched verbatim against the full text.

/// A claimed name counts as found when its best score is strictly above this.
pub const NAME_MATCH_THRESHOLD: u8 = 85;

/// Indel similarity of two character slices on a 0-100 scale.
///
/// Equivalent to `2 * LCS / (len_a + len_b)`, where LCS is the longest
/// common subsequence.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    100.0 * (2 * lcs_len(a, b)) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Best ratio of `needle` against every alignment inside `haystack`.
///
/// Alignments include the windows hanging off either end of the haystack,
/// so a needle that is only partly present still scores.
fn best_alignment(needle: &[char], haystack: &[char]) -> f64 {
    let m = needle.len();
    let n = haystack.len();
    let mut best = 0.0f64;

    let prefixes = (1..m).map(|end| &haystack[..end]);
    let full = (0..=n - m).map(|start| &haystack[start..start + m]);
    let suffixes = (n - m + 1..n).map(|start| &haystack[start..]);

    for window in prefixes.chain(full).chain(suffixes) {
        best = best.max(ratio(needle, window));
        if best >= 100.0 {
            break;
        }
    }

    best
}

/// Substring-tolerant similarity between two strings, 0-100.
///
/// 100 means the shorter string occurs verbatim inside the longer one.
/// Either string being empty scores 0. Comparison is case-sensitive; callers
/// lowercase beforehand when they want otherwise.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let score = if a.len() < b.len() {
        best_alignment(&a, &b)
    } else if a.len() > b.len() {
        best_alignment(&b, &a)
    } else {
        best_alignment(&a, &b).max(best_alignment(&b, &a))
    };

    score.round_ties_even().clamp(0.0, 100.0) as u8
}

/// Best partial-ratio score of `claimed_name` across `lines`, ignoring case.
///
/// Returns 0 when there are no lines.
pub fn best_name_match<'a, I>(lines: I, claimed_name: &str) -> u8
where
    I: IntoIterator<Item = &'a str>,
{
    let name = claimed_name.to_lowercase();

    lines
        .into_iter()
        .map(|line| partial_ratio(&name, &line.to_lowercase()))
        .max()
        .unwrap_or(0)
}

/// Whether a name score clears the given threshold.
pub fn is_name_found(score: u8, threshold: u8) -> bool {
    score > threshold
}

/// Exact, case-sensitive containment of an ID number in a whole document.
///
/// An empty ID never matches.
pub fn contains_id(text: &str, claimed_id: &str) -> bool {
    !claimed_id.is_empty() && text.contains(claimed_id)
}
