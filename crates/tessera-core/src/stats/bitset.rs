/// Presence bits for small non-negative domains (byte/short values,
/// dictionary codes, string bytes). Words are allocated up to the highest
/// value marked, so a block that only sees small values stays small.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitset {
    words: Vec<u64>,
}

impl Bitset {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Sets bit `value`. Negative values are not tracked.
    #[inline]
    pub fn mark(&mut self, value: i64) {
        if value < 0 {
            return;
        }
        let index = value as usize;
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index % 64);
    }

    /// False for negative values: they are never marked.
    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        if value < 0 {
            return false;
        }
        let index = value as usize;
        self.words
            .get(index / 64)
            .is_some_and(|word| word & (1u64 << (index % 64)) != 0)
    }

    pub fn contains_any(&self, values: &[i64]) -> bool {
        values.iter().any(|v| self.contains(*v))
    }

    /// Whether any bit in `[low, high]` is set. Both bounds must be
    /// non-negative.
    pub fn any_in_range(&self, low: i64, high: i64) -> bool {
        if low > high || high < 0 {
            return false;
        }
        let low = low.max(0) as usize;
        let high = high as usize;
        let first_word = low / 64;
        if first_word >= self.words.len() {
            return false;
        }
        let last_word = (high / 64).min(self.words.len() - 1);

        for word_index in first_word..=last_word {
            let mut word = self.words[word_index];
            if word_index == first_word {
                word &= u64::MAX << (low % 64);
            }
            if word_index == high / 64 {
                let keep = high % 64;
                if keep < 63 {
                    word &= (1u64 << (keep + 1)) - 1;
                }
            }
            if word != 0 {
                return true;
            }
        }
        false
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn memory_estimate(&self) -> usize {
        self.words.capacity() * 8
    }
}
