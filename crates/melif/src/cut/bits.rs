use std::fmt;

use serde::{Serialize, Serializer};

const WORD: usize = 64;

/// Sorted set of feature indices backed by 64-bit words.
///
/// Invariants:
/// - No trailing zero words, so structural equality is set equality.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Cut {
    words: Vec<u64>,
}

impl Cut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut cut = Self::new();
        for i in indices {
            cut.insert(i);
        }
        cut
    }

    pub fn insert(&mut self, i: usize) {
        let w = i / WORD;
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1u64 << (i % WORD);
    }

    #[inline]
    pub fn contains(&self, i: usize) -> bool {
        self.words
            .get(i / WORD)
            .map_or(false, |w| w & (1u64 << (i % WORD)) != 0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Ascending indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            let mut rest = w;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * WORD + bit)
            })
        })
    }

    /// `self \ other`, written into `scratch` (reusing its allocation).
    pub fn diff_into<'s>(&self, other: &Cut, scratch: &'s mut Cut) -> &'s Cut {
        scratch.words.clear();
        scratch.words.extend(
            self.words
                .iter()
                .enumerate()
                .map(|(i, w)| w & !other.words.get(i).copied().unwrap_or(0)),
        );
        scratch.trim();
        scratch
    }

    /// `self \ other` as a fresh set.
    pub fn difference(&self, other: &Cut) -> Cut {
        let mut out = Cut::new();
        self.diff_into(other, &mut out);
        out
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl fmt::Debug for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Serialize for Cut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl FromIterator<usize> for Cut {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(iter)
    }
}
