/// Min/max bounds of the values seen in one block.
///
/// Starts inverted (`min = i64::MAX`, `max = i64::MIN`) so the first widen
/// sets both bounds and an untouched range overlaps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeStat {
    min: i64,
    max: i64,
}

impl Default for RangeStat {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeStat {
    pub fn new() -> Self {
        Self {
            min: i64::MAX,
            max: i64::MIN,
        }
    }

    #[inline]
    pub fn widen(&mut self, value: i64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn bounds(&self) -> Option<(i64, i64)> {
        (!self.is_empty()).then_some((self.min, self.max))
    }

    /// Whether `[low, high]` intersects the stored bounds.
    pub fn overlaps(&self, low: i64, high: i64) -> bool {
        low <= self.max && high >= self.min
    }

    /// Whether any of `sorted` falls inside the stored bounds.
    pub fn contains_any(&self, sorted: &[i64]) -> bool {
        let first = sorted.partition_point(|v| *v < self.min);
        sorted.get(first).is_some_and(|v| *v <= self.max)
    }
}
