//! Double-exponential level capacity policy.
//!
//! A forest sizes its levels with a pure function of the level index:
//!
//! ```text
//!   cap(level) = base^(base^level) * scale        scale = top_size * fill_factor / base
//! ```
//!
//! Level 0 holds `top_size * fill_factor` keys and capacity explodes quickly;
//! with the default base of 1.1 a handful of levels cover billions of keys.
//! Two instances are paired per forest: a `min` policy (smaller fill factor)
//! and a `max` policy (larger fill factor) bounding each level's steady-state
//! size band.
//!
//! ## Operations
//! - `at(level)`: capacity at a level, truncated to an integer count
//! - `cumulative(level)`: total capacity of levels `0..=level`
//!
//! Deep levels saturate to `usize::MAX` instead of overflowing.

use crate::error::ConfigError;

/// Default growth base.
pub const DEFAULT_BASE: f64 = 1.1;

/// Default size of level 0 at fill factor 1.0.
pub const DEFAULT_TOP_SIZE: usize = 256;

/// Pure double-exponential capacity policy.
///
/// Stateless and cheap to copy; forests hold one `min` and one `max`
/// instance. Construction validates its parameters and reports failures as
/// [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capacity {
    base: f64,
    scale: f64,
}

impl Capacity {
    /// Creates a policy from a fill factor, growth base, and top level size.
    ///
    /// Requires `fill_factor > 0`, `base > 1`, and `top_size > 0`; anything
    /// else yields a [`ConfigError`]. Fill factors above 1.0 are valid and
    /// used for `max` policies.
    ///
    /// # Example
    ///
    /// ```
    /// use forestkit::capacity::Capacity;
    ///
    /// let min = Capacity::try_new(1.0, 1.1, 256).unwrap();
    /// let max = Capacity::try_new(2.0, 1.1, 256).unwrap();
    /// assert_eq!(min.at(0), 256);
    /// assert_eq!(max.at(0), 512);
    /// ```
    pub fn try_new(fill_factor: f64, base: f64, top_size: usize) -> Result<Self, ConfigError> {
        if !fill_factor.is_finite() || fill_factor <= 0.0 {
            return Err(ConfigError::new(format!(
                "fill_factor must be a positive finite number, got {fill_factor}"
            )));
        }
        if !base.is_finite() || base <= 1.0 {
            return Err(ConfigError::new(format!(
                "base must be a finite number > 1, got {base}"
            )));
        }
        if top_size == 0 {
            return Err(ConfigError::new("top_size must be > 0"));
        }

        Ok(Self {
            base,
            scale: top_size as f64 * fill_factor,
        })
    }

    /// Creates a policy with the default base and top size.
    pub fn with_fill_factor(fill_factor: f64) -> Result<Self, ConfigError> {
        Self::try_new(fill_factor, DEFAULT_BASE, DEFAULT_TOP_SIZE)
    }

    /// Returns the capacity of `level`, truncated to an integer count.
    ///
    /// Equivalent to `base^(base^level) * scale` with
    /// `scale = top_size * fill_factor / base`, computed as
    /// `top_size * fill_factor * base^(base^level - 1)` so that level 0 is
    /// exact. Saturates at `usize::MAX` once the double exponential leaves
    /// the representable range.
    pub fn at(&self, level: usize) -> usize {
        let exponent = self.base.powf(level as f64) - 1.0;
        let value = self.scale * self.base.powf(exponent);
        if !value.is_finite() || value >= usize::MAX as f64 {
            usize::MAX
        } else {
            value as usize
        }
    }

    /// Returns the total capacity of levels `0..=level`, saturating.
    pub fn cumulative(&self, level: usize) -> usize {
        let mut total = 0usize;
        for i in 0..=level {
            total = total.saturating_add(self.at(i));
            if total == usize::MAX {
                break;
            }
        }
        total
    }

    /// Returns the growth base.
    pub fn base(&self) -> f64 {
        self.base
    }
}
