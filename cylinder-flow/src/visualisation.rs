use std::f64::consts::PI;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::grid::SampleGrid;
use crate::mask::FieldSample;
use crate::{Error, Result};

const DISC_SEGMENTS: usize = 128;
const HEAD_LENGTH: f64 = 0.3; // fraction of the arrow
const HEAD_HALF_WIDTH: f64 = 0.12;

/// Disc drawn over the field to show the obstacle. Not used for masking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: (f64, f64),
    pub radius: f64,
}

impl Obstacle {
    pub fn new(center: (f64, f64), radius: f64) -> Self {
        Self { center, radius }
    }

    fn outline(&self) -> Vec<(f64, f64)> {
        (0..=DISC_SEGMENTS)
            .map(|k| {
                let t = 2.0 * PI * k as f64 / DISC_SEGMENTS as f64;
                (
                    self.center.0 + self.radius * t.cos(),
                    self.center.1 + self.radius * t.sin(),
                )
            })
            .collect()
    }
}

/// How arrows are colored.
pub enum ArrowColor {
    Solid(RGBColor),
    /// Colored by speed over the visible range.
    Gradient(Box<dyn colorgrad::Gradient>),
}

/// Look of the figure. Text elements are skipped when `None`.
pub struct Style {
    pub background: RGBColor,
    pub foreground: RGBColor,
    pub arrows: ArrowColor,
    /// Longest visible arrow as a fraction of the smaller grid spacing
    pub arrow_scale: f64,
    pub obstacle_fill: RGBColor,
    pub obstacle_edge: RGBColor,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub footer: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            background: BLACK,
            foreground: WHITE,
            arrows: ArrowColor::Solid(RED),
            arrow_scale: 0.9,
            obstacle_fill: WHITE,
            obstacle_edge: BLACK,
            title: None,
            subtitle: None,
            footer: None,
        }
    }
}

/// Where and how large the figure is written. Passed explicitly to the
/// renderer instead of living in any global plotting state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl RenderContext {
    pub fn new<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            width,
            height,
        }
    }

    /// Figure size given in inches at `dpi` dots per inch.
    pub fn from_inches<P: AsRef<Path>>(path: P, width_in: f64, height_in: f64, dpi: u32) -> Self {
        let px = |inches: f64| (inches * dpi as f64).round().max(1.0) as u32;
        Self::new(path, px(width_in), px(height_in))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_svg(&self) -> bool {
        self.path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("svg"))
            .unwrap_or(false)
    }
}

/// One arrow in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Arrow {
    tail: (f64, f64),
    tip: (f64, f64),
    speed: f64,
}

impl Arrow {
    fn head(&self) -> Vec<(f64, f64)> {
        let (dx, dy) = (self.tip.0 - self.tail.0, self.tip.1 - self.tail.1);
        let base = (self.tip.0 - HEAD_LENGTH * dx, self.tip.1 - HEAD_LENGTH * dy);
        // perpendicular to the shaft
        let (px, py) = (-dy * HEAD_HALF_WIDTH, dx * HEAD_HALF_WIDTH);
        vec![
            self.tip,
            (base.0 + px, base.1 + py),
            (base.0 - px, base.1 - py),
        ]
    }
}

/// Quiver plot of a masked field with the obstacle on top.
pub struct QuiverRenderer {
    style: Style,
}

impl QuiverRenderer {
    pub fn new(style: Style) -> Self {
        Self { style }
    }

    /// Draws the figure and writes it to `ctx`'s path (SVG for `.svg`,
    /// bitmap otherwise).
    pub fn render(
        &self,
        ctx: &RenderContext,
        grid: &SampleGrid,
        field: &FieldSample,
        obstacle: &Obstacle,
    ) -> Result<()> {
        if field.dim() != grid.shape() {
            return Err(Error::ShapeMismatch {
                left: grid.shape(),
                right: field.dim(),
            });
        }
        if let Some(dir) = ctx.path().parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(render_err)?;
        }

        if ctx.is_svg() {
            let root = SVGBackend::new(ctx.path(), ctx.size()).into_drawing_area();
            self.draw(&root, grid, field, obstacle)?;
            root.present().map_err(render_err)?;
        } else {
            let root = BitMapBackend::new(ctx.path(), ctx.size()).into_drawing_area();
            self.draw(&root, grid, field, obstacle)?;
            root.present().map_err(render_err)?;
        }

        info!("Saved figure: {}", ctx.path().display());
        Ok(())
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        grid: &SampleGrid,
        field: &FieldSample,
        obstacle: &Obstacle,
    ) -> Result<()> {
        let style = &self.style;
        root.fill(&style.background).map_err(render_err)?;

        let (width, height) = root.dim_in_pixel();
        if let Some(footer) = &style.footer {
            let font = ("sans-serif", 12).into_font().color(&style.foreground);
            let pos = ((width as f64 * 0.82) as i32, height as i32 - 16);
            root.draw(&Text::new(footer.as_str(), pos, font))
                .map_err(render_err)?;
        }

        let area = match &style.subtitle {
            Some(text) => root
                .titled(text, ("sans-serif", 12).into_font().color(&style.foreground))
                .map_err(render_err)?,
            None => root.clone(),
        };

        let (x_range, y_range) = self.plot_bounds(grid);
        let mut builder = ChartBuilder::on(&area);
        builder.margin(10);
        if let Some(title) = &style.title {
            builder.caption(title, ("sans-serif", 20).into_font().color(&style.foreground));
        }
        let mut chart = builder
            .build_cartesian_2d(x_range, y_range)
            .map_err(render_err)?;

        let arrows = self.arrows(grid, field);
        let range = arrow_speed_range(&arrows);
        let colored: Vec<(Arrow, RGBColor)> = arrows
            .into_iter()
            .map(|a| (a, self.arrow_color(a.speed, range)))
            .collect();

        chart
            .draw_series(
                colored
                    .iter()
                    .map(|(a, c)| PathElement::new(vec![a.tail, a.tip], c.stroke_width(1))),
            )
            .map_err(render_err)?;
        chart
            .draw_series(
                colored
                    .iter()
                    .map(|(a, c)| Polygon::new(a.head(), c.filled())),
            )
            .map_err(render_err)?;

        // obstacle last so it sits on top of the arrows
        let outline = obstacle.outline();
        chart
            .draw_series(std::iter::once(Polygon::new(
                outline.clone(),
                style.obstacle_fill.filled(),
            )))
            .map_err(render_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                outline,
                style.obstacle_edge.stroke_width(2),
            )))
            .map_err(render_err)?;

        Ok(())
    }

    /// Data ranges of the plot. The padding is at least the longest arrow,
    /// and never less than half a cell.
    fn plot_bounds(&self, grid: &SampleGrid) -> (Range<f64>, Range<f64>) {
        let domain = grid.domain();
        let (dx, dy) = grid.spacing();
        let reach = self.style.arrow_scale * dx.min(dy);
        let (px, py) = (reach.max(dx / 2.0), reach.max(dy / 2.0));
        (
            (domain.xmin - px)..(domain.xmax + px),
            (domain.ymin - py)..(domain.ymax + py),
        )
    }

    /// Arrows for every visible, non-zero sample, scaled so the fastest
    /// spans `arrow_scale` of a grid cell.
    fn arrows(&self, grid: &SampleGrid, field: &FieldSample) -> Vec<Arrow> {
        let (dx, dy) = grid.spacing();
        let cell = dx.min(dy);
        let max_speed = field.speed_range().map(|(_, hi)| hi).unwrap_or(0.0);
        if max_speed <= 0.0 {
            return Vec::new();
        }
        let scale = self.style.arrow_scale * cell / max_speed;

        field
            .visible()
            .filter_map(|(i, j, u, v)| {
                let speed = u.hypot(v);
                if speed == 0.0 || !speed.is_finite() {
                    return None;
                }
                let tail = grid.point(i, j);
                Some(Arrow {
                    tail,
                    tip: (tail.0 + u * scale, tail.1 + v * scale),
                    speed,
                })
            })
            .collect()
    }

    fn arrow_color(&self, speed: f64, range: (f64, f64)) -> RGBColor {
        match &self.style.arrows {
            ArrowColor::Solid(color) => *color,
            ArrowColor::Gradient(gradient) => {
                let (lo, hi) = range;
                let normalized = if hi > lo { (speed - lo) / (hi - lo) } else { 0.5 };
                let rgba = gradient.at(normalized.clamp(0.0, 1.0) as f32).to_rgba8();
                RGBColor(rgba[0], rgba[1], rgba[2])
            }
        }
    }
}

fn arrow_speed_range(arrows: &[Arrow]) -> (f64, f64) {
    arrows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
        (lo.min(a.speed), hi.max(a.speed))
    })
}

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}
