//! Hiding samples without discarding them.
//!
//! A [`MaskedArray`] keeps every raw value next to a boolean mask of the same
//! shape; `true` means the value is hidden from rendering.

use ndarray::{Array2, Zip};

use crate::grid::SampleGrid;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    hidden: Array2<bool>,
}

impl Mask {
    /// Hides every sample strictly inside the circle `x² + y² < radius²`.
    /// Samples on the circle stay visible.
    pub fn inside_radius(grid: &SampleGrid, radius: f64) -> Self {
        let r2 = radius * radius;
        let hidden = Zip::from(&grid.x)
            .and(&grid.y)
            .map_collect(|&x, &y| x * x + y * y < r2);
        Mask { hidden }
    }

    /// A mask of the given shape that hides nothing.
    pub fn none(shape: (usize, usize)) -> Self {
        Mask {
            hidden: Array2::from_elem(shape, false),
        }
    }

    pub fn from_array(hidden: Array2<bool>) -> Self {
        Mask { hidden }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.hidden.dim()
    }

    pub fn is_hidden(&self, row: usize, col: usize) -> bool {
        self.hidden[[row, col]]
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.iter().filter(|&&h| h).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.hidden
    }
}

/// Raw values plus a parallel hidden flag per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    data: Array2<f64>,
    mask: Array2<bool>,
}

impl MaskedArray {
    /// Wraps `data` with nothing hidden.
    pub fn new(data: Array2<f64>) -> Self {
        let mask = Array2::from_elem(data.dim(), false);
        MaskedArray { data, mask }
    }

    pub fn with_mask(data: Array2<f64>, mask: &Mask) -> Result<Self> {
        let mut out = Self::new(data);
        out.apply(mask)?;
        Ok(out)
    }

    /// Hides every cell the mask hides, on top of what is already hidden.
    /// Values stay in place. Applying the same mask again changes nothing.
    pub fn apply(&mut self, mask: &Mask) -> Result<()> {
        if mask.shape() != self.data.dim() {
            return Err(Error::ShapeMismatch {
                left: self.data.dim(),
                right: mask.shape(),
            });
        }
        Zip::from(&mut self.mask)
            .and(mask.as_array())
            .for_each(|m, &h| *m |= h);
        Ok(())
    }

    /// All values, hidden ones included.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// The value at `(row, col)` unless it is hidden.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if self.mask[[row, col]] {
            None
        } else {
            Some(self.data[[row, col]])
        }
    }

    pub fn visible_count(&self) -> usize {
        self.mask.iter().filter(|&&h| !h).count()
    }
}

/// Masked velocity components on a sample grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample {
    pub u: MaskedArray,
    pub v: MaskedArray,
}

impl FieldSample {
    pub fn new(u: Array2<f64>, v: Array2<f64>, mask: &Mask) -> Result<Self> {
        if u.dim() != v.dim() {
            return Err(Error::ShapeMismatch {
                left: u.dim(),
                right: v.dim(),
            });
        }
        Ok(FieldSample {
            u: MaskedArray::with_mask(u, mask)?,
            v: MaskedArray::with_mask(v, mask)?,
        })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.u.dim()
    }

    /// `(row, col, u, v)` for every sample visible in both components.
    pub fn visible(&self) -> impl Iterator<Item = (usize, usize, f64, f64)> + '_ {
        let (rows, cols) = self.dim();
        (0..rows)
            .flat_map(move |i| (0..cols).map(move |j| (i, j)))
            .filter_map(move |(i, j)| Some((i, j, self.u.get(i, j)?, self.v.get(i, j)?)))
    }

    /// Smallest and largest visible speed, `None` when everything is hidden.
    pub fn speed_range(&self) -> Option<(f64, f64)> {
        self.visible()
            .map(|(_, _, u, v)| u.hypot(v))
            .fold(None, |acc, s| match acc {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Domain;
    use ndarray::array;

    fn grid() -> SampleGrid {
        SampleGrid::new(Domain::new(-2.5, 2.5, -2.5, 2.5), 19, 16).unwrap()
    }

    #[test]
    fn mask_follows_strict_disc_test() {
        let g = grid();
        let mask = Mask::inside_radius(&g, 1.0);
        assert_eq!(mask.shape(), g.shape());
        for i in 0..g.rows() {
            for j in 0..g.cols() {
                let (x, y) = g.point(i, j);
                assert_eq!(mask.is_hidden(i, j), x * x + y * y < 1.0, "at ({x}, {y})");
            }
        }
        assert!(mask.hidden_count() > 0);
    }

    #[test]
    fn points_on_the_circle_stay_visible() {
        // (0, -1) here and (1, 0) below are samples lying on r = 1
        let g = SampleGrid::new(Domain::new(-1.0, 1.0, -1.0, 1.0), 2, 3).unwrap();
        let mask = Mask::inside_radius(&g, 1.0);
        assert_eq!(g.point(0, 1), (0.0, -1.0));
        assert!(!mask.is_hidden(0, 1));
        assert_eq!(g.point(1, 2), (1.0, 1.0));
        assert_eq!(mask.hidden_count(), 0);

        let g = SampleGrid::new(Domain::new(1.0, 3.0, -1.0, 1.0), 3, 2).unwrap();
        assert_eq!(g.point(1, 0), (1.0, 0.0));
        assert!(!Mask::inside_radius(&g, 1.0).is_hidden(1, 0));
    }

    #[test]
    fn masking_keeps_values() {
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let mask = Mask::from_array(array![[false, true], [true, false]]);
        let m = MaskedArray::with_mask(data.clone(), &mask).unwrap();
        assert_eq!(m.data(), &data);
        assert_eq!(m.get(0, 0), Some(1.0));
        assert_eq!(m.get(0, 1), None);
        assert_eq!(m.visible_count(), 2);
    }

    #[test]
    fn masking_is_idempotent() {
        let g = grid();
        let mask = Mask::inside_radius(&g, 1.0);
        let mut m = MaskedArray::new(g.x.clone());
        m.apply(&mask).unwrap();
        let once = m.clone();
        m.apply(&mask).unwrap();
        assert_eq!(m, once);
        assert_eq!(m.mask(), mask.as_array());
    }

    #[test]
    fn masks_accumulate() {
        let mut m = MaskedArray::new(array![[1.0, 2.0, 3.0]]);
        m.apply(&Mask::from_array(array![[true, false, false]])).unwrap();
        m.apply(&Mask::from_array(array![[false, false, true]])).unwrap();
        assert_eq!(m.mask(), &array![[true, false, true]]);
        m.apply(&Mask::none((1, 3))).unwrap();
        assert_eq!(m.visible_count(), 1);
    }

    #[test]
    fn mask_shape_must_match() {
        let mut m = MaskedArray::new(Array2::zeros((2, 2)));
        assert!(matches!(
            m.apply(&Mask::none((2, 3))),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn field_sample_visible_iteration() {
        let u = array![[1.0, 0.0], [3.0, 4.0]];
        let v = array![[0.0, 1.0], [4.0, 3.0]];
        let mask = Mask::from_array(array![[false, false], [true, false]]);
        let field = FieldSample::new(u, v, &mask).unwrap();
        let cells: Vec<_> = field.visible().map(|(i, j, _, _)| (i, j)).collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 1)]);
        assert_eq!(field.speed_range(), Some((1.0, 5.0)));
    }

    #[test]
    fn fully_masked_field_has_no_speed_range() {
        let field = FieldSample::new(
            Array2::zeros((1, 2)),
            Array2::zeros((1, 2)),
            &Mask::from_array(array![[true, true]]),
        )
        .unwrap();
        assert_eq!(field.visible().count(), 0);
        assert_eq!(field.speed_range(), None);
    }
}
