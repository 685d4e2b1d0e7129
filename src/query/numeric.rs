//! Numerically stable accumulation helpers

/// Kahan summation for accurate floating point sums
///
/// Bucket means over thousands of readings lose precision with naive
/// summation; the compensation term keeps the error bounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    /// Create a new sum accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the sum
    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// Get the current sum
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }
}
