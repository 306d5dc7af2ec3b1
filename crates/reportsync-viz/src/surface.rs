//! The shared drawing surface and its guard
//!
//! Rendering is stateful: a figure is opened, elements are buffered into it,
//! and it is finished into SVG text. One [`DrawingSurface`] exists per
//! [`ConcurrencyGuard`]; holding a [`SurfaceLease`] is the only way to draw.

use crate::error::RenderError;
use once_cell::sync::Lazy;
use std::fmt::Write as _;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, TryLockError};
use tracing::trace;

static GLOBAL_GUARD: Lazy<Arc<ConcurrencyGuard>> = Lazy::new(|| Arc::new(ConcurrencyGuard::new()));

/// Escape text for SVG content and attributes
#[must_use]
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug)]
struct Figure {
    width: f64,
    height: f64,
    body: String,
}

/// Stateful SVG canvas
#[derive(Debug, Default)]
pub struct DrawingSurface {
    open: Option<Figure>,
    figures_drawn: u64,
}

fn finite(element: &'static str, values: &[f64]) -> Result<(), RenderError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(RenderError::NonFinite { element })
    }
}

impl DrawingSurface {
    /// Empty surface
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a figure
    ///
    /// # Errors
    /// [`RenderError::FigureAlreadyOpen`] if the previous figure was neither
    /// finished nor discarded.
    pub fn open_figure(&mut self, width: f64, height: f64) -> Result<(), RenderError> {
        if self.open.is_some() {
            return Err(RenderError::FigureAlreadyOpen);
        }
        finite("figure", &[width, height])?;
        self.open = Some(Figure {
            width,
            height,
            body: String::new(),
        });
        Ok(())
    }

    fn figure(&mut self) -> Result<&mut Figure, RenderError> {
        self.open.as_mut().ok_or(RenderError::NoOpenFigure)
    }

    /// Filled rectangle
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) -> Result<(), RenderError> {
        finite("rect", &[x, y, w, h])?;
        let fig = self.figure()?;
        let _ = write!(
            fig.body,
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{}"/>"#,
            xml_escape(fill)
        );
        Ok(())
    }

    /// Straight line
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str) -> Result<(), RenderError> {
        finite("line", &[x1, y1, x2, y2])?;
        let fig = self.figure()?;
        let _ = write!(
            fig.body,
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{}" stroke-width="1"/>"#,
            xml_escape(stroke)
        );
        Ok(())
    }

    /// Connected line through `points`
    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &str) -> Result<(), RenderError> {
        let flat: Vec<f64> = points.iter().flat_map(|&(x, y)| [x, y]).collect();
        finite("polyline", &flat)?;
        let fig = self.figure()?;
        let coords = points
            .iter()
            .map(|(x, y)| format!("{x:.2},{y:.2}"))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(
            fig.body,
            r#"<polyline points="{coords}" fill="none" stroke="{}" stroke-width="2"/>"#,
            xml_escape(stroke)
        );
        Ok(())
    }

    /// Filled circle
    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str) -> Result<(), RenderError> {
        finite("circle", &[cx, cy, r])?;
        let fig = self.figure()?;
        let _ = write!(
            fig.body,
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}"/>"#,
            xml_escape(fill)
        );
        Ok(())
    }

    /// Text anchored at `(x, y)`; `anchor` is an SVG `text-anchor` value
    pub fn text(&mut self, x: f64, y: f64, size: f64, anchor: &str, content: &str) -> Result<(), RenderError> {
        finite("text", &[x, y, size])?;
        let fig = self.figure()?;
        let _ = write!(
            fig.body,
            r#"<text x="{x:.2}" y="{y:.2}" font-size="{size:.1}" text-anchor="{anchor}">{}</text>"#,
            xml_escape(content)
        );
        Ok(())
    }

    /// Close the open figure and return its SVG document
    ///
    /// # Errors
    /// [`RenderError::NoOpenFigure`] if nothing is open.
    pub fn finish(&mut self) -> Result<String, RenderError> {
        let fig = self.open.take().ok_or(RenderError::NoOpenFigure)?;
        self.figures_drawn += 1;
        let mut svg = String::with_capacity(fig.body.len() + 256);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="sans-serif">"#,
            w = fig.width,
            h = fig.height
        );
        let _ = write!(
            svg,
            r#"<rect x="0" y="0" width="{:.0}" height="{:.0}" fill="white"/>"#,
            fig.width, fig.height
        );
        svg.push_str(&fig.body);
        svg.push_str("</svg>\n");
        Ok(svg)
    }

    /// Discard any open figure
    pub fn close_all(&mut self) {
        if self.open.take().is_some() {
            trace!("discarded open figure");
        }
    }

    /// Whether a figure is open
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Figures finished over this surface's lifetime
    #[inline]
    #[must_use]
    pub fn figures_drawn(&self) -> u64 {
        self.figures_drawn
    }
}

/// Serializes all drawing on one surface
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    surface: Mutex<DrawingSurface>,
}

impl ConcurrencyGuard {
    /// Guard over a fresh surface
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide guard
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_GUARD)
    }

    /// Wait for exclusive use of the surface
    ///
    /// The surface is handed over with no figure open.
    pub async fn acquire(&self) -> SurfaceLease<'_> {
        let mut guard = self.surface.lock().await;
        guard.close_all();
        SurfaceLease { guard }
    }

    /// Take the surface if it is free
    ///
    /// # Errors
    /// Returns [`TryLockError`] while another lease is held.
    pub fn try_acquire(&self) -> Result<SurfaceLease<'_>, TryLockError> {
        let mut guard = self.surface.try_lock()?;
        guard.close_all();
        Ok(SurfaceLease { guard })
    }
}

/// Exclusive, scoped access to the drawing surface
///
/// Dropping the lease discards any open figure and releases the surface.
#[derive(Debug)]
pub struct SurfaceLease<'a> {
    guard: MutexGuard<'a, DrawingSurface>,
}

impl Deref for SurfaceLease<'_> {
    type Target = DrawingSurface;

    fn deref(&self) -> &DrawingSurface {
        &self.guard
    }
}

impl DerefMut for SurfaceLease<'_> {
    fn deref_mut(&mut self) -> &mut DrawingSurface {
        &mut self.guard
    }
}

impl Drop for SurfaceLease<'_> {
    fn drop(&mut self) {
        self.guard.close_all();
    }
}
