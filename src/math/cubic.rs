//! Cubic polynomials.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cubic function.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CubicFn {
    coeffs: [f64; 4],
    offset: f64,
}

impl CubicFn {
    /// The cubic passing through `(x1, y1)` and `(x2, y2)` with zero slope at both ends.
    pub fn from_ends(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let (x, y) = (x2 - x1, y2 - y1);
        let a = -2.0 * y * x.powi(-3);
        let b = 3.0 * y * x.powi(-2);
        let coeffs = [a, b, 0.0, y1];
        let offset = -x1;
        Self { coeffs, offset }
    }

    pub fn y(&self, x: f64) -> f64 {
        self.y_and_dy(x).0
    }

    pub fn dy(&self, x: f64) -> f64 {
        self.y_and_dy(x).1
    }

    pub fn y_and_dy(&self, x: f64) -> (f64, f64) {
        let c = &self.coeffs;
        let x = x + self.offset;

        let y = c[0] * x * x * x + c[1] * x * x + c[2] * x + c[3];
        let dy = c[0] * 3. * x * x + c[1] * 2. * x + c[2];

        (y, dy)
    }
}
