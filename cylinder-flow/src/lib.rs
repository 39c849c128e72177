//! # cylinder-flow
//!
//! Ideal flow past a circular cylinder, from stream function to arrow plot.
//!
//! The pipeline runs strictly forward:
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | define ψ(x, y) | [`stream`] | [`StreamFunction`] |
//! | differentiate and compile | [`velocity`] | [`VelocityFunctions`] |
//! | sample on a grid | [`grid`] | [`SampleGrid`] plus raw `U`, `V` |
//! | hide samples inside the cylinder | [`mask`] | [`FieldSample`] |
//! | draw arrows and the obstacle | [`visualisation`] | image file |
//!
//! The symbolic half ([`expr`], [`stream`]) never sees an array, and the
//! numeric half only sees the [`VelocityField`] trait, so a hand-written
//! closed form ([`velocity::ClosedFormCylinder`]) can stand in for the
//! symbolic derivation.
//!
//! ## Quick Start
//!
//! ```rust
//! use cylinder_flow::{compute_field, Domain, StreamFunction, VelocityFunctions};
//!
//! let psi = StreamFunction::cylinder(1.0, 1.0);
//! let velocity = VelocityFunctions::derive(&psi).unwrap();
//! let domain = Domain::new(-2.5, 2.5, -2.5, 2.5);
//! let flow = compute_field(&velocity, domain, 19, 16, 1.0).unwrap();
//! assert_eq!(flow.grid.shape(), (19, 16));
//! ```

use thiserror::Error;

pub mod config;
pub mod expr;
pub mod grid;
pub mod mask;
pub mod stream;
pub mod velocity;
pub mod visualisation;

pub use config::Config;
pub use expr::{Expr, Lambda};
pub use grid::{Domain, SampleGrid};
pub use mask::{FieldSample, Mask, MaskedArray};
pub use stream::StreamFunction;
pub use velocity::{VelocityField, VelocityFunctions};
pub use visualisation::{Obstacle, QuiverRenderer, RenderContext, Style};

/// Errors raised while deriving, sampling or drawing a flow field.
#[derive(Debug, Error)]
pub enum Error {
    /// The expression uses a symbol that is not one of the compiled arguments.
    #[error("expression references unbound symbol `{0}`")]
    UnboundSymbol(String),

    /// The expression carries a NaN or infinite constant.
    #[error("expression contains non-finite constant {0}")]
    NonFiniteConstant(f64),

    /// A compiled function was called with the wrong number of arguments.
    #[error("expected {expected} argument(s), got {got}")]
    ArgumentCount { expected: usize, got: usize },

    /// A denominator evaluated to exactly zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A function was evaluated outside its real domain.
    #[error("{op} is undefined for argument {arg}")]
    Domain { op: &'static str, arg: f64 },

    /// Two arrays that must line up (or broadcast) do not.
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// Grid bounds or resolution are unusable.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A sample point coincides with the singular point of the stream function.
    #[error("sample ({row}, {col}) lies on the origin, where the stream function is singular")]
    SingularSample { row: usize, col: usize },

    /// The plotting backend failed.
    #[error("rendering failed: {0}")]
    Render(String),
}

/// Result type for flow field operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Sample grid together with the masked velocity components on it.
#[derive(Debug, Clone)]
pub struct FlowField {
    pub grid: SampleGrid,
    pub field: FieldSample,
}

/// Samples `velocity` over `domain` at `rows x cols` points and hides every
/// sample strictly inside the cylinder of the given radius.
pub fn compute_field<F: VelocityField + ?Sized>(
    velocity: &F,
    domain: Domain,
    rows: usize,
    cols: usize,
    radius: f64,
) -> Result<FlowField> {
    let grid = SampleGrid::new(domain, rows, cols)?;
    let (u, v) = grid.sample(velocity)?;
    let mask = Mask::inside_radius(&grid, radius);
    let field = FieldSample::new(u, v, &mask)?;
    Ok(FlowField { grid, field })
}
