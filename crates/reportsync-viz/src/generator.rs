//! Fallback chart generator
//!
//! Draws one metric onto the shared surface and commits it as an SVG file.
//! Every call leaves a file behind: the chart, or a placeholder saying why
//! there is no chart.

use crate::classifier::{filename, ChartShape};
use crate::error::RenderError;
use crate::surface::DrawingSurface;
use reportsync_artifact::{SeriesPayload, SeriesPoint};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PALETTE: [&str; 2] = ["#1f77b4", "#ff7f0e"];
const GRID: &str = "#dddddd";
const AXIS: &str = "#333333";
const Y_TICKS: usize = 5;

/// Result of one generation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Chart written
    Rendered { path: PathBuf },
    /// Placeholder written in place of a chart
    Placeholder { path: PathBuf, reason: String },
    /// Not even a placeholder could be written
    Error { reason: String },
}

impl GenerationOutcome {
    /// File left on disk, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Rendered { path } | Self::Placeholder { path, .. } => Some(path),
            Self::Error { .. } => None,
        }
    }

    /// Whether a real chart was drawn
    #[inline]
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Figure geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 480.0,
            margin_left: 70.0,
            margin_right: 30.0,
            margin_top: 60.0,
            margin_bottom: 70.0,
        }
    }
}

impl ChartLayout {
    fn plot_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    fn baseline(&self) -> f64 {
        self.height - self.margin_bottom
    }
}

/// Vertical scale from data value to canvas y
#[derive(Debug, Clone, Copy)]
struct YScale {
    min: f64,
    max: f64,
    top: f64,
    bottom: f64,
}

impl YScale {
    fn fit(values: impl Iterator<Item = f64>, layout: &ChartLayout) -> Self {
        let (lo, hi) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let max = if hi - lo <= f64::EPSILON { lo + 1.0 } else { hi * 1.1 };
        let min = if lo < 0.0 { lo * 1.1 } else { 0.0 };
        Self {
            min,
            max,
            top: layout.margin_top,
            bottom: layout.baseline(),
        }
    }

    fn y(&self, value: f64) -> f64 {
        self.bottom - (value - self.min) / (self.max - self.min) * (self.bottom - self.top)
    }
}

/// Renders charts into an artifact directory
#[derive(Debug, Clone)]
pub struct ChartGenerator {
    artifact_dir: PathBuf,
    layout: ChartLayout,
}

impl ChartGenerator {
    /// Generator writing into `artifact_dir`
    #[must_use]
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            layout: ChartLayout::default(),
        }
    }

    /// Override the figure geometry
    #[must_use]
    pub fn with_layout(mut self, layout: ChartLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Directory artifacts are written to
    #[inline]
    #[must_use]
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Draw `metric` and write its artifact
    ///
    /// Never fails outward: malformed payloads and rendering failures yield
    /// a placeholder file. The surface has no open figure on return.
    pub async fn generate(
        &self,
        surface: &mut DrawingSurface,
        metric: &str,
        shape: ChartShape,
        payload: Option<&Value>,
    ) -> GenerationOutcome {
        let path = self.artifact_dir.join(filename(metric, shape));
        self.generate_at(surface, metric, shape, payload, path).await
    }

    /// [`generate`](Self::generate) into an explicit file
    pub(crate) async fn generate_at(
        &self,
        surface: &mut DrawingSurface,
        metric: &str,
        shape: ChartShape,
        payload: Option<&Value>,
        path: PathBuf,
    ) -> GenerationOutcome {
        let outcome = self.generate_inner(surface, metric, shape, payload, path).await;
        surface.close_all();
        outcome
    }

    /// Write a placeholder for `metric` stating `reason`
    pub async fn placeholder(
        &self,
        surface: &mut DrawingSurface,
        metric: &str,
        shape: ChartShape,
        reason: &str,
    ) -> GenerationOutcome {
        let path = self.artifact_dir.join(filename(metric, shape));
        let outcome = self.write_placeholder(surface, metric, reason, path).await;
        surface.close_all();
        outcome
    }

    async fn generate_inner(
        &self,
        surface: &mut DrawingSurface,
        metric: &str,
        shape: ChartShape,
        payload: Option<&Value>,
        path: PathBuf,
    ) -> GenerationOutcome {
        let resolved = match shape.series_keys() {
            Some((a, b)) => SeriesPayload::resolve_paired(payload, a, b),
            None => SeriesPayload::resolve_single(payload),
        };
        let series = match resolved {
            Ok(series) => series,
            Err(issue) => {
                debug!(metric, reason = issue.message(), "payload not chartable");
                return self.write_placeholder(surface, metric, issue.message(), path).await;
            }
        };

        let committed = match self.render(surface, metric, shape, &series) {
            Ok(svg) => commit(&path, svg).await,
            Err(e) => Err(e),
        };
        match committed {
            Ok(()) => {
                debug!(metric, path = %path.display(), "chart rendered");
                GenerationOutcome::Rendered { path }
            }
            Err(e) => {
                warn!(metric, error = %e, "chart generation failed");
                surface.close_all();
                self.write_placeholder(surface, metric, &format!("error generating {metric}"), path)
                    .await
            }
        }
    }

    async fn write_placeholder(
        &self,
        surface: &mut DrawingSurface,
        metric: &str,
        reason: &str,
        path: PathBuf,
    ) -> GenerationOutcome {
        let drawn = match self.draw_placeholder(surface, metric, reason) {
            Ok(svg) => commit(&path, svg).await,
            Err(e) => Err(e),
        };

        match drawn {
            Ok(()) => {
                warn!(metric, reason, "placeholder written");
                GenerationOutcome::Placeholder {
                    path,
                    reason: reason.to_string(),
                }
            }
            Err(e) => {
                warn!(metric, error = %e, "placeholder could not be written");
                GenerationOutcome::Error {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn draw_placeholder(
        &self,
        surface: &mut DrawingSurface,
        metric: &str,
        reason: &str,
    ) -> Result<String, RenderError> {
        let l = self.layout;
        surface.open_figure(l.width, l.height)?;
        surface.text(l.width / 2.0, l.margin_top / 2.0 + 8.0, 18.0, "middle", metric)?;
        surface.text(l.width / 2.0, l.height / 2.0, 24.0, "middle", reason)?;
        surface.finish()
    }

    fn render(
        &self,
        surface: &mut DrawingSurface,
        metric: &str,
        shape: ChartShape,
        series: &SeriesPayload,
    ) -> Result<String, RenderError> {
        let all: Vec<&SeriesPoint> = match series {
            SeriesPayload::Paired { a, b } => a.iter().chain(b).collect(),
            SeriesPayload::Single(points) => points.iter().collect(),
        };
        if all.iter().any(|p| !p.value.is_finite()) {
            return Err(RenderError::NonFinite { element: "series" });
        }

        let l = self.layout;
        let scale = YScale::fit(all.iter().map(|p| p.value), &l);
        let versions = series.versions();
        let band = l.plot_width() / versions.len() as f64;

        surface.open_figure(l.width, l.height)?;
        surface.text(l.width / 2.0, l.margin_top / 2.0 + 8.0, 18.0, "middle", metric)?;
        self.draw_axes(surface, &scale, &versions, band)?;

        match series {
            SeriesPayload::Paired { a, b } => {
                let (key_a, key_b) = shape.series_keys().unwrap_or(("A", "B"));
                let bar = band * 0.35;
                for (i, (pa, pb)) in a.iter().zip(b).enumerate() {
                    let left = l.margin_left + band * i as f64 + band * 0.15;
                    bar_at(surface, &scale, left, bar, pa.value, PALETTE[0])?;
                    bar_at(surface, &scale, left + bar, bar, pb.value, PALETTE[1])?;
                }
                self.draw_legend(surface, &[key_a, key_b])?;
            }
            SeriesPayload::Single(points) if shape == ChartShape::SingleLine => {
                let coords: Vec<(f64, f64)> = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (l.margin_left + band * (i as f64 + 0.5), scale.y(p.value)))
                    .collect();
                surface.polyline(&coords, PALETTE[0])?;
                for &(x, y) in &coords {
                    surface.circle(x, y, 4.0, PALETTE[0])?;
                }
            }
            SeriesPayload::Single(points) => {
                let bar = band * 0.6;
                for (i, p) in points.iter().enumerate() {
                    let left = l.margin_left + band * i as f64 + band * 0.2;
                    bar_at(surface, &scale, left, bar, p.value, PALETTE[0])?;
                }
            }
        }

        surface.finish()
    }

    fn draw_axes(
        &self,
        surface: &mut DrawingSurface,
        scale: &YScale,
        versions: &[&str],
        band: f64,
    ) -> Result<(), RenderError> {
        let l = self.layout;
        let right = l.width - l.margin_right;
        for tick in 0..=Y_TICKS {
            let value = scale.min + (scale.max - scale.min) * tick as f64 / Y_TICKS as f64;
            let y = scale.y(value);
            surface.line(l.margin_left, y, right, y, GRID)?;
            surface.text(l.margin_left - 8.0, y + 4.0, 11.0, "end", &format_tick(value))?;
        }
        surface.line(l.margin_left, l.margin_top, l.margin_left, l.baseline(), AXIS)?;
        surface.line(l.margin_left, scale.y(0.0), right, scale.y(0.0), AXIS)?;
        for (i, version) in versions.iter().enumerate() {
            let x = l.margin_left + band * (i as f64 + 0.5);
            surface.text(x, l.baseline() + 20.0, 12.0, "middle", version)?;
        }
        surface.text(l.margin_left + l.plot_width() / 2.0, l.height - 15.0, 13.0, "middle", "Version")?;
        Ok(())
    }

    fn draw_legend(&self, surface: &mut DrawingSurface, keys: &[&str]) -> Result<(), RenderError> {
        let l = self.layout;
        let x = l.width - l.margin_right - 110.0;
        for (i, key) in keys.iter().enumerate() {
            let y = l.margin_top + 18.0 * i as f64;
            surface.rect(x, y, 12.0, 12.0, PALETTE[i % PALETTE.len()])?;
            surface.text(x + 18.0, y + 10.0, 12.0, "start", key)?;
        }
        Ok(())
    }
}

fn bar_at(
    surface: &mut DrawingSurface,
    scale: &YScale,
    left: f64,
    width: f64,
    value: f64,
    fill: &str,
) -> Result<(), RenderError> {
    let zero = scale.y(0.0);
    let top = scale.y(value);
    surface.rect(left, top.min(zero), width, (zero - top).abs(), fill)
}

fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

async fn commit(path: &Path, svg: String) -> Result<(), RenderError> {
    tokio::fs::write(path, svg)
        .await
        .map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
}
