use crate::models::observation::FuzzyDecision;
use std::collections::HashMap;

/// Similarity ratio between two strings, 0.0..=1.0.
///
/// Gestalt pattern matching: repeatedly take the longest common block,
/// recurse on both sides, and score 2*M/T where M is the number of matched
/// characters and T the combined length. Two empty strings score 1.0.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Compare OCR text with an expected phrase
/// Match iff ratio > threshold (boundary excluded)
pub fn fuzzy_match(text: &str, expected: &str, threshold: f64) -> FuzzyDecision {
    let ratio = similarity_ratio(text, expected);
    FuzzyDecision {
        ratio,
        matched: ratio > threshold,
    }
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    // Positions of every char in b, ascending
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }

        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of a[alo..ahi] and b[blo..bhi].
/// Ties go to the block starting earliest in a, then earliest in b.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    // Length of the block ending at (i - 1, j), keyed by j
    let mut prev: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut current: HashMap<usize, usize> = HashMap::new();

        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }

                let k = if j > 0 { prev.get(&(j - 1)).copied().unwrap_or(0) } else { 0 } + 1;
                current.insert(j, k);

                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }

        prev = current;
    }

    (best_i, best_j, best_size)
}
