/// Per-cell library-size normalization, optionally followed by `ln(1 + x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub scale: f32,
    pub epsilon: f32,
    pub log1p: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            scale: 10_000.0,
            epsilon: 1e-8,
            log1p: true,
        }
    }
}

impl Normalization {
    pub fn log_normalize(scale: f32) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Fraction of the cell's library, no log. Used by the factorization.
    pub fn library_fraction() -> Self {
        Self {
            scale: 1.0,
            epsilon: 1e-8,
            log1p: false,
        }
    }

    pub fn apply(&self, count: u32, libsize: u64) -> f32 {
        let denom = libsize as f32 + self.epsilon;
        let scaled = count as f32 * (self.scale / denom);
        if self.log1p { scaled.ln_1p() } else { scaled }
    }
}
