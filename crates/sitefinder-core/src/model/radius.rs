// ── Search radius selection ──

use std::sync::Arc;

use crate::error::CoreError;

/// Radius choices offered by the stepper, in kilometers.
pub const DEFAULT_RADIUS_OPTIONS_KM: [f64; 6] = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0];

/// Index into [`DEFAULT_RADIUS_OPTIONS_KM`] used on startup (1 km).
pub const DEFAULT_RADIUS_INDEX: usize = 1;

/// Selected search radius, constrained to a fixed ascending option list.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusSetting {
    options: Arc<[f64]>,
    index: usize,
}

impl RadiusSetting {
    /// Build a setting over `options`, which must be non-empty, positive,
    /// and strictly ascending.
    pub fn new(options: Vec<f64>, index: usize) -> Result<Self, CoreError> {
        if options.is_empty() {
            return Err(CoreError::Config {
                message: "radius options must not be empty".into(),
            });
        }
        if options.iter().any(|km| !km.is_finite() || *km <= 0.0) {
            return Err(CoreError::Config {
                message: "radius options must be positive".into(),
            });
        }
        if options.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::Config {
                message: "radius options must be strictly ascending".into(),
            });
        }
        if index >= options.len() {
            return Err(CoreError::InvalidRadius {
                index,
                len: options.len(),
            });
        }
        Ok(Self {
            options: options.into(),
            index,
        })
    }

    pub fn km(&self) -> f64 {
        self.options[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn options(&self) -> &[f64] {
        &self.options
    }

    pub fn set_index(&mut self, index: usize) -> Result<(), CoreError> {
        if index >= self.options.len() {
            return Err(CoreError::InvalidRadius {
                index,
                len: self.options.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    pub fn can_increase(&self) -> bool {
        self.index + 1 < self.options.len()
    }

    pub fn can_decrease(&self) -> bool {
        self.index > 0
    }

    /// Step one option up. Returns `false` at the top of the list.
    pub fn increase(&mut self) -> bool {
        if !self.can_increase() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Step one option down. Returns `false` at the bottom of the list.
    pub fn decrease(&mut self) -> bool {
        if !self.can_decrease() {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn label(&self) -> String {
        radius_label(self.km())
    }
}

impl Default for RadiusSetting {
    fn default() -> Self {
        Self {
            options: DEFAULT_RADIUS_OPTIONS_KM.to_vec().into(),
            index: DEFAULT_RADIUS_INDEX,
        }
    }
}

/// `500m` below one kilometer, `1.5km` otherwise.
pub fn radius_label(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0}m", km * 1000.0)
    } else {
        format!("{km}km")
    }
}
