//! DPI scaling contract.
//!
//! Stored dimensions are kept unscaled; the header upscales them when it
//! reports pixel sizes and downscales pixel input before storing it.

/// Converts between unscaled dimensions and device pixels.
pub trait DpiConverter {
    fn upscale(&self, value: i32) -> i32;
    fn downscale(&self, value: i32) -> i32;
}

/// Scaling by a whole-number factor (1 = no scaling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerScale {
    factor: i32,
}

impl IntegerScale {
    /// Factors below 1 are treated as 1
    pub fn new(factor: i32) -> Self {
        Self { factor: factor.max(1) }
    }

    pub fn factor(&self) -> i32 {
        self.factor
    }
}

impl Default for IntegerScale {
    fn default() -> Self {
        Self::new(1)
    }
}

impl DpiConverter for IntegerScale {
    fn upscale(&self, value: i32) -> i32 {
        value.saturating_mul(self.factor)
    }

    fn downscale(&self, value: i32) -> i32 {
        value / self.factor
    }
}
