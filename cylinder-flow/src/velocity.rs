//! Velocity components derived from a stream function.

use log::debug;
use ndarray::{Array2, Zip};

use crate::expr::{Expr, Lambda};
use crate::stream::{StreamFunction, X, Y};
use crate::{Error, Result};

/// A planar velocity field that can be evaluated on coordinate arrays.
pub trait VelocityField {
    /// Returns `(u, v)` at every point `(x[i, j], y[i, j])`.
    fn velocity_grid(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)>;
}

/// `u = ∂ψ/∂y` and `v = −∂ψ/∂x`, compiled for numeric evaluation.
///
/// Both components always come from the same ψ; the only way to build one
/// is [`VelocityFunctions::derive`].
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityFunctions {
    u_expr: Expr,
    v_expr: Expr,
    u: Lambda,
    v: Lambda,
}

impl VelocityFunctions {
    /// Differentiates ψ symbolically and compiles the result over `(x, y)`.
    ///
    /// Fails if ψ references a symbol other than `x` and `y` or carries a
    /// non-finite constant.
    pub fn derive(psi: &StreamFunction) -> Result<Self> {
        let args = [X, Y];
        // malformed psi must fail even where a derivative would hide it
        psi.expr().compile(&args)?;

        let u_expr = psi.expr().diff(Y);
        let v_expr = (-psi.expr().diff(X)).simplify();
        let u = u_expr.compile(&args)?;
        let v = v_expr.compile(&args)?;

        debug!("u(x, y) = {}", u_expr);
        debug!("v(x, y) = {}", v_expr);

        Ok(Self {
            u_expr,
            v_expr,
            u,
            v,
        })
    }

    pub fn u_expr(&self) -> &Expr {
        &self.u_expr
    }

    pub fn v_expr(&self) -> &Expr {
        &self.v_expr
    }

    /// Velocity at a single point.
    pub fn at(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        Ok((self.u.eval(&[x, y])?, self.v.eval(&[x, y])?))
    }

    /// Evaluates `u` over broadcast-compatible coordinate arrays.
    pub fn u(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<Array2<f64>> {
        self.u.eval_grid(x, y)
    }

    /// Evaluates `v` over broadcast-compatible coordinate arrays.
    pub fn v(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<Array2<f64>> {
        self.v.eval_grid(x, y)
    }
}

impl VelocityField for VelocityFunctions {
    fn velocity_grid(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        Ok((self.u(x, y)?, self.v(x, y)?))
    }
}

/// Hand-derived velocity of the (optionally lifting) cylinder flow.
///
/// Same field as differentiating [`StreamFunction::cylinder_with_circulation`],
/// without the symbolic step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedFormCylinder {
    pub speed: f64,
    pub radius: f64,
    pub circulation: f64,
}

impl ClosedFormCylinder {
    pub fn at(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let r2 = x * x + y * y;
        if r2 == 0.0 {
            return Err(Error::DivisionByZero);
        }
        let r4 = r2 * r2;
        let a2 = self.radius * self.radius;
        let k = self.circulation / (2.0 * std::f64::consts::PI);
        let u = self.speed * (1.0 - a2 * (x * x - y * y) / r4) + k * y / r2;
        let v = -self.speed * 2.0 * a2 * x * y / r4 - k * x / r2;
        Ok((u, v))
    }
}

impl VelocityField for ClosedFormCylinder {
    fn velocity_grid(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        if x.dim() != y.dim() {
            return Err(Error::ShapeMismatch {
                left: x.dim(),
                right: y.dim(),
            });
        }
        let mut u = Array2::<f64>::zeros(x.dim());
        let mut v = Array2::<f64>::zeros(x.dim());
        let mut fault = None;
        Zip::from(&mut u)
            .and(&mut v)
            .and(x)
            .and(y)
            .for_each(|u, v, &px, &py| match self.at(px, py) {
                Ok((pu, pv)) => {
                    *u = pu;
                    *v = pv;
                }
                Err(e) => {
                    fault.get_or_insert(e);
                }
            });
        match fault {
            Some(e) => Err(e),
            None => Ok((u, v)),
        }
    }
}
