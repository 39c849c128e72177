//! Stream functions of two-dimensional potential flow.

use std::f64::consts::PI;
use std::fmt;

use crate::expr::Expr;

/// Name of the horizontal coordinate symbol.
pub const X: &str = "x";
/// Name of the vertical coordinate symbol.
pub const Y: &str = "y";

/// Symbolic stream function ψ(x, y).
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFunction {
    psi: Expr,
}

impl StreamFunction {
    /// Uniform flow of speed `speed` along +x past a cylinder of radius
    /// `radius` centred at the origin:
    ///
    /// ψ = U·(r − R²/r)·sin θ, with r = √(x² + y²) and θ = atan2(y, x).
    pub fn cylinder(speed: f64, radius: f64) -> Self {
        let x = Expr::sym(X);
        let y = Expr::sym(Y);
        let r = (x.clone().powi(2) + y.clone().powi(2)).sqrt();
        let theta = Expr::atan2(y, x);
        let psi = Expr::from(speed)
            * (r.clone() - Expr::from(radius * radius) / r)
            * theta.sin();
        Self { psi }
    }

    /// Cylinder flow plus a point vortex of strength `circulation` at the
    /// centre (the lifting cylinder). Positive circulation turns clockwise.
    ///
    /// With zero circulation this is exactly [`StreamFunction::cylinder`].
    pub fn cylinder_with_circulation(speed: f64, radius: f64, circulation: f64) -> Self {
        let base = Self::cylinder(speed, radius);
        if circulation == 0.0 {
            return base;
        }
        let r = (Expr::sym(X).powi(2) + Expr::sym(Y).powi(2)).sqrt();
        let vortex = Expr::from(circulation / (2.0 * PI)) * r.ln();
        Self {
            psi: base.psi + vortex,
        }
    }

    /// Wraps an arbitrary expression in `x` and `y`.
    pub fn from_expr(psi: Expr) -> Self {
        Self { psi }
    }

    pub fn expr(&self) -> &Expr {
        &self.psi
    }
}

impl fmt::Display for StreamFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psi(x, y) = {}", self.psi)
    }
}
