use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::grid::Domain;
use crate::stream::StreamFunction;
use crate::visualisation::{ArrowColor, Obstacle, RenderContext, Style};

/// Free stream and obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub speed: f64,       // U, far-field speed along +x
    pub radius: f64,      // R, cylinder radius
    pub circulation: f64, // Gamma, 0 for the non-lifting cylinder
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            radius: 1.0,
            circulation: 0.0,
        }
    }
}

impl FlowConfig {
    fn validate(&self) -> Result<()> {
        if !(self.speed > 0.0 && self.speed.is_finite()) {
            return Err(anyhow!("Flow speed must be positive, got {}", self.speed));
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(anyhow!("Cylinder radius must be positive, got {}", self.radius));
        }
        if !self.circulation.is_finite() {
            return Err(anyhow!("Circulation must be finite, got {}", self.circulation));
        }
        Ok(())
    }

    pub fn stream_function(&self) -> StreamFunction {
        StreamFunction::cylinder_with_circulation(self.speed, self.radius, self.circulation)
    }

    pub fn obstacle(&self) -> Obstacle {
        Obstacle::new((0.0, 0.0), self.radius)
    }
}

/// Sampling domain and resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            xmin: -2.5,
            xmax: 2.5,
            ymin: -2.5,
            ymax: 2.5,
            rows: 19,
            cols: 16,
        }
    }
}

impl GridConfig {
    fn validate(&self) -> Result<()> {
        if self.rows < 2 || self.cols < 2 {
            return Err(anyhow!(
                "Grid needs at least 2x2 samples (rows={}, cols={})",
                self.rows,
                self.cols
            ));
        }
        if !(self.xmin < self.xmax) || !(self.ymin < self.ymax) {
            return Err(anyhow!(
                "Grid bounds must satisfy min < max (x: {}..{}, y: {}..{})",
                self.xmin,
                self.xmax,
                self.ymin,
                self.ymax
            ));
        }
        Ok(())
    }

    pub fn domain(&self) -> Domain {
        Domain::new(self.xmin, self.xmax, self.ymin, self.ymax)
    }
}

/// Image file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "myfig.png".to_string(),
            width_in: 3.641,
            height_in: 3.295,
            dpi: 200,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(anyhow!("Output path must not be empty"));
        }
        if !(self.width_in > 0.0) || !(self.height_in > 0.0) {
            return Err(anyhow!(
                "Figure size must be positive (width_in={}, height_in={})",
                self.width_in,
                self.height_in
            ));
        }
        if self.dpi == 0 {
            return Err(anyhow!("dpi must be positive"));
        }
        Ok(())
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext::from_inches(&self.path, self.width_in, self.height_in, self.dpi)
    }
}

/// Colors and text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub background: String,
    pub arrow_color: String,
    pub colormap: String, // empty for a single arrow color
    pub arrow_scale: f64,
    pub title: String,
    pub subtitle: String,
    pub footer: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: "black".to_string(),
            arrow_color: "red".to_string(),
            colormap: String::new(),
            arrow_scale: 0.9,
            title: "Vector Fields".to_string(),
            subtitle: "Vector fields are well-known to provide solutions of differential equations!"
                .to_string(),
            footer: String::new(),
        }
    }
}

const COLORMAPS: [&str; 3] = ["viridis", "turbo", "rd_yl_bu"];

impl StyleConfig {
    fn validate(&self) -> Result<()> {
        parse_color(&self.background)?;
        parse_color(&self.arrow_color)?;
        if !self.colormap.is_empty() && !COLORMAPS.contains(&self.colormap.as_str()) {
            return Err(anyhow!(
                "Invalid colormap '{}'. Must be one of: {:?}",
                self.colormap,
                COLORMAPS
            ));
        }
        if !(self.arrow_scale > 0.0 && self.arrow_scale.is_finite()) {
            return Err(anyhow!("arrow_scale must be positive, got {}", self.arrow_scale));
        }
        Ok(())
    }

    pub fn style(&self) -> Result<Style> {
        let background = parse_color(&self.background)?;
        let foreground = contrast(background);
        let arrows = match self.colormap.as_str() {
            "" => ArrowColor::Solid(parse_color(&self.arrow_color)?),
            "viridis" => ArrowColor::Gradient(Box::new(colorgrad::preset::viridis())),
            "turbo" => ArrowColor::Gradient(Box::new(colorgrad::preset::turbo())),
            "rd_yl_bu" => ArrowColor::Gradient(Box::new(colorgrad::preset::rd_yl_bu())),
            other => return Err(anyhow!("Invalid colormap '{}'", other)),
        };
        let text = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok(Style {
            background,
            foreground,
            arrows,
            arrow_scale: self.arrow_scale,
            obstacle_fill: RGBColor(255, 255, 255),
            obstacle_edge: RGBColor(0, 0, 0),
            title: text(&self.title),
            subtitle: text(&self.subtitle),
            footer: text(&self.footer),
        })
    }
}

/// CSS color name or hex code such as `#rrggbb`.
pub fn parse_color(name: &str) -> Result<RGBColor> {
    let color = colorgrad::Color::from_html(name)
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("Invalid color '{}'", name))?;
    let [r, g, b, _] = color.to_rgba8();
    Ok(RGBColor(r, g, b))
}

// Text color readable on the given background
fn contrast(bg: RGBColor) -> RGBColor {
    let luma = 0.299 * bg.0 as f64 + 0.587 * bg.1 as f64 + 0.114 * bg.2 as f64;
    if luma < 128.0 {
        RGBColor(255, 255, 255)
    } else {
        RGBColor(0, 0, 0)
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flow: FlowConfig,
    pub grid: GridConfig,
    pub output: OutputConfig,
    pub style: StyleConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.flow.validate()?;
        self.grid.validate()?;
        self.output.validate()?;
        self.style.validate()?;

        if self.disc_covers_domain() {
            warn!(
                "Cylinder radius {} covers the whole domain; every sample will be hidden",
                self.flow.radius
            );
        }
        Ok(())
    }

    /// True when every corner of the domain lies strictly inside the
    /// cylinder, so the mask hides every sample.
    pub fn disc_covers_domain(&self) -> bool {
        let g = &self.grid;
        let r2 = self.flow.radius * self.flow.radius;
        [(g.xmin, g.ymin), (g.xmin, g.ymax), (g.xmax, g.ymin), (g.xmax, g.ymax)]
            .iter()
            .all(|&(x, y)| x * x + y * y < r2)
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        info!(
            "Flow: U={}, R={}, Gamma={}",
            self.flow.speed, self.flow.radius, self.flow.circulation
        );
        info!(
            "Grid: {}x{} over x in [{}, {}], y in [{}, {}]",
            self.grid.rows, self.grid.cols, self.grid.xmin, self.grid.xmax, self.grid.ymin, self.grid.ymax
        );
        let ctx = self.output.render_context();
        let (w, h) = ctx.size();
        info!("Output: {} ({}x{} px at {} dpi)", self.output.path, w, h, self.output.dpi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.flow.speed, 1.0);
        assert_eq!(cfg.flow.radius, 1.0);
        assert_eq!(cfg.flow.circulation, 0.0);
        assert_eq!(cfg.grid.domain(), Domain::new(-2.5, 2.5, -2.5, 2.5));
        assert_eq!((cfg.grid.rows, cfg.grid.cols), (19, 16));
        assert_eq!(cfg.output.path, "myfig.png");
        assert_eq!(cfg.output.dpi, 200);
        assert_eq!(cfg.output.render_context().size(), (728, 659));
        assert_eq!(cfg.style.arrow_color, "red");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let toml = "[flow]\nradius = 0.5\n\n[grid]\nrows = 30\n";
        let cfg = Config::from_toml(toml).unwrap();
        assert_eq!(cfg.flow.radius, 0.5);
        assert_eq!(cfg.flow.speed, 1.0); // default
        assert_eq!(cfg.grid.rows, 30);
        assert_eq!(cfg.grid.cols, 16); // default
        assert_eq!(cfg.output.path, "myfig.png"); // default
    }

    #[test]
    fn test_full_toml() {
        let toml = r##"
[flow]
speed = 2.0
radius = 0.75
circulation = 1.5

[grid]
xmin = -3.0
xmax = 3.0
ymin = -2.0
ymax = 2.0
rows = 20
cols = 30

[output]
path = "out/flow.svg"
width_in = 4.0
height_in = 3.0
dpi = 100

[style]
background = "white"
arrow_color = "#1f77b4"
colormap = "viridis"
arrow_scale = 0.8
title = "Lifting cylinder"
subtitle = ""
footer = "demo"
"##;
        let cfg = Config::from_toml(toml).unwrap();
        assert_eq!(cfg.flow.circulation, 1.5);
        assert_eq!(cfg.grid.domain(), Domain::new(-3.0, 3.0, -2.0, 2.0));
        assert_eq!((cfg.grid.rows, cfg.grid.cols), (20, 30));
        assert_eq!(cfg.output.render_context().size(), (400, 300));
        assert_eq!(cfg.style.colormap, "viridis");

        let style = cfg.style.style().unwrap();
        assert_eq!(style.background, RGBColor(255, 255, 255));
        assert_eq!(style.foreground, RGBColor(0, 0, 0));
        assert!(matches!(style.arrows, ArrowColor::Gradient(_)));
        assert_eq!(style.title.as_deref(), Some("Lifting cylinder"));
        assert_eq!(style.subtitle, None);
        assert_eq!(style.footer.as_deref(), Some("demo"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml("[flow]\nradius = 0.0\n").is_err());
        assert!(Config::from_toml("[flow]\nspeed = -1.0\n").is_err());
        assert!(Config::from_toml("[grid]\nxmin = 3.0\n").is_err());
        assert!(Config::from_toml("[grid]\ncols = 1\n").is_err());
        assert!(Config::from_toml("[output]\ndpi = 0\n").is_err());
        assert!(Config::from_toml("[style]\ncolormap = \"rainbow\"\n").is_err());
        assert!(Config::from_toml("[style]\narrow_color = \"octarine\"\n").is_err());
        assert!(Config::from_toml("[flow]\nspeed = \"fast\"\n").is_err());
    }

    #[test]
    fn test_disc_covering_domain() {
        assert!(!Config::default().disc_covers_domain());

        // large radius over a domain far from the origin hides nothing
        let far = Config::from_toml(
            "[flow]\nradius = 6.0\n\n[grid]\nxmin = 10.0\nxmax = 15.0\nymin = 10.0\nymax = 15.0\n",
        )
        .unwrap();
        assert!(!far.disc_covers_domain());

        let covered = Config::from_toml("[flow]\nradius = 4.0\n").unwrap();
        assert!(covered.disc_covers_domain());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/cylinder-flow.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("Red").unwrap(), RGBColor(255, 0, 0));
        assert_eq!(parse_color("#ff8000").unwrap(), RGBColor(255, 128, 0));
        assert_eq!(parse_color("#1f77b4").unwrap(), RGBColor(31, 119, 180));
        // full CSS name table, not just the primaries
        assert_eq!(parse_color("steelblue").unwrap(), RGBColor(70, 130, 180));
        assert_eq!(parse_color("rebeccapurple").unwrap(), RGBColor(102, 51, 153));
        assert!(parse_color("#ff80f").is_err());
        assert!(parse_color("#gg0000").is_err());
        let err = parse_color("octarine").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid color 'octarine'"));
    }

    #[test]
    fn test_default_style_is_dark() {
        let style = StyleConfig::default().style().unwrap();
        assert_eq!(style.background, RGBColor(0, 0, 0));
        assert_eq!(style.foreground, RGBColor(255, 255, 255));
        assert!(matches!(style.arrows, ArrowColor::Solid(RGBColor(255, 0, 0))));
        assert_eq!(style.title.as_deref(), Some("Vector Fields"));
    }
}
