//! Parameters shaping the confirmation window and the weighted walk.

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

/// Default number of milestones retained as the live walk window.
pub const DEFAULT_MAX_DEPTH: i64 = 5;

/// Default walk bias.
pub const DEFAULT_ALPHA: f64 = 0.001;

/// Window and walk parameters shared by the ingestor and the selector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalkParams {
    /// Number of milestones retained as the live walk window.
    pub max_depth: i64,
    /// Exponent of the walk's weight function. Larger values favour
    /// candidates with more approvers; values near zero approach a uniform walk.
    pub alpha: f64,
}

impl WalkParams {
    pub fn new(max_depth: i64, alpha: f64) -> Result<Self, ParamsError> {
        let params = Self { max_depth, alpha };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(ParamsError::InvalidAlpha(self.alpha));
        }
        if self.max_depth < 1 {
            return Err(ParamsError::InvalidMaxDepth(self.max_depth));
        }
        Ok(())
    }

    /// Number of tails collected before the walk asks the oracle about them.
    pub fn batch_size(depth: i64) -> usize {
        ((depth.max(0) + 1) * 4) as usize
    }
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            alpha: DEFAULT_ALPHA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = WalkParams::default();
        assert_eq!(params.max_depth, 5);
        assert_eq!(params.alpha, 0.001);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_alpha() {
        assert_eq!(
            WalkParams::new(5, 0.0),
            Err(ParamsError::InvalidAlpha(0.0))
        );
        assert!(WalkParams::new(5, -1.0).is_err());
        assert!(WalkParams::new(5, f64::NAN).is_err());
    }

    #[test]
    fn rejects_empty_window() {
        assert_eq!(WalkParams::new(0, 0.5), Err(ParamsError::InvalidMaxDepth(0)));
    }

    #[test]
    fn batch_size_grows_with_depth() {
        assert_eq!(WalkParams::batch_size(0), 4);
        assert_eq!(WalkParams::batch_size(3), 16);
    }
}
