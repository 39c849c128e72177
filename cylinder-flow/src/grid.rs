use ndarray::{Array1, Array2, Axis};

use crate::velocity::VelocityField;
use crate::{Error, Result};

/// Rectangular sampling domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Domain {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Domain {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    fn validate(&self) -> Result<()> {
        let finite = [self.xmin, self.xmax, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(Error::InvalidGrid(format!("bounds must be finite, got {:?}", self)));
        }
        if self.xmin >= self.xmax || self.ymin >= self.ymax {
            return Err(Error::InvalidGrid(format!(
                "bounds must satisfy min < max (x: {}..{}, y: {}..{})",
                self.xmin, self.xmax, self.ymin, self.ymax
            )));
        }
        Ok(())
    }
}

/// Sample coordinates: `x` varies along columns, `y` along rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    domain: Domain,
}

impl SampleGrid {
    /// Spans `domain` with `rows x cols` points, endpoints included.
    ///
    /// Fails if a sample would land on the origin, where the cylinder stream
    /// function is singular. That happens exactly when both axes cross zero
    /// at a sample, e.g. an odd count over a symmetric range on both axes.
    pub fn new(domain: Domain, rows: usize, cols: usize) -> Result<Self> {
        if rows < 2 || cols < 2 {
            return Err(Error::InvalidGrid(format!(
                "need at least 2x2 samples, got {}x{}",
                rows, cols
            )));
        }
        domain.validate()?;

        let xs = axis(domain.xmin, domain.xmax, cols);
        let ys = axis(domain.ymin, domain.ymax, rows);

        let col0 = xs.iter().position(|&v| near_zero(v, domain.width()));
        let row0 = ys.iter().position(|&v| near_zero(v, domain.height()));
        if let (Some(row), Some(col)) = (row0, col0) {
            return Err(Error::SingularSample { row, col });
        }

        // Both broadcasts are into a shape the vectors already fit.
        let x = xs
            .broadcast((rows, cols))
            .ok_or_else(|| Error::InvalidGrid("cannot broadcast x axis".to_string()))?
            .to_owned();
        let y = ys
            .insert_axis(Axis(1))
            .broadcast((rows, cols))
            .ok_or_else(|| Error::InvalidGrid("cannot broadcast y axis".to_string()))?
            .to_owned();

        Ok(SampleGrid { x, y, domain })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.x.dim()
    }

    pub fn rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn cols(&self) -> usize {
        self.x.ncols()
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Distance between neighbouring samples along x and y
    pub fn spacing(&self) -> (f64, f64) {
        (
            self.domain.width() / (self.cols() - 1) as f64,
            self.domain.height() / (self.rows() - 1) as f64,
        )
    }

    /// Physical coordinates of sample `(row, col)`
    pub fn point(&self, row: usize, col: usize) -> (f64, f64) {
        (self.x[[row, col]], self.y[[row, col]])
    }

    /// Raw `(U, V)` components at every sample.
    pub fn sample<F: VelocityField + ?Sized>(&self, field: &F) -> Result<(Array2<f64>, Array2<f64>)> {
        let (u, v) = field.velocity_grid(&self.x, &self.y)?;
        if u.dim() != self.shape() || v.dim() != self.shape() {
            return Err(Error::ShapeMismatch {
                left: self.shape(),
                right: u.dim(),
            });
        }
        Ok((u, v))
    }
}

// Computed as start + span * i / (n - 1) so a symmetric range with an odd
// count hits zero exactly.
fn axis(start: f64, end: f64, n: usize) -> Array1<f64> {
    let span = end - start;
    let last = (n - 1) as f64;
    Array1::from_shape_fn(n, |i| start + span * i as f64 / last)
}

fn near_zero(v: f64, span: f64) -> bool {
    v.abs() <= span * f64::EPSILON
}
