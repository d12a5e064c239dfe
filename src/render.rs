//! SVG figure assembly for packed tracks.
//!
//! A figure is a fixed-size SVG document of stacked panels. Each panel maps
//! a track-space window (genomic x coordinates, 0..1 bottom-up lane space)
//! into its own pixel box, clips whatever falls outside, and draws every
//! rectangle it was handed filled black on the figure's white background.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::draw::Rect;
use crate::feature::Result;
use crate::region::Region;

/// Pixel size of the reference figure.
pub const REFERENCE_WIDTH: f64 = 1000.0;
pub const REFERENCE_HEIGHT: f64 = 500.0;

const REFERENCE_PANEL_HEIGHT: f64 = 125.0;
const REFERENCE_PANEL_TOPS: [f64; 3] = [50.0, 200.0, 350.0];

/// The track-space window a panel displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Viewport {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    /// The reference window onto a region: x covers the region plus one base
    /// on the right, y is the unit lane space.
    pub fn for_region(region: &Region) -> Self {
        Self {
            x_min: region.interval.start as f64,
            x_max: (region.interval.end + 1) as f64,
            y_min: 0.0,
            y_max: 1.0,
        }
    }
}

/// A pixel box inside the figure plus the window it displays and the
/// rectangles queued to draw in it. `x`/`y` are the top-left corner in
/// figure pixels.
#[derive(Debug, Clone)]
pub struct Panel {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub viewport: Viewport,
    rects: Vec<Rect>,
}

impl Panel {
    pub fn new(x: f64, y: f64, width: f64, height: f64, viewport: Viewport) -> Self {
        Self { x, y, width, height, viewport, rects: Vec::new() }
    }

    /// Queue one track-space rectangle.
    pub fn add_rect(&mut self, rect: Rect) {
        self.rects.push(rect);
    }

    /// Queue a whole track's rectangles.
    pub fn add_rects(&mut self, rects: &[Rect]) {
        self.rects.extend_from_slice(rects);
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Map a track-space rectangle into figure pixels, clipped to the
    /// window. Lane space grows upward while SVG y grows downward, so the
    /// projection flips y. Returns `None` for rectangles entirely outside
    /// the window.
    pub fn project(&self, rect: &Rect) -> Option<Rect> {
        let left = rect.x.max(self.viewport.x_min);
        let right = (rect.x + rect.width).min(self.viewport.x_max);
        let bottom = rect.y.max(self.viewport.y_min);
        let top = (rect.y + rect.height).min(self.viewport.y_max);
        if left > right || bottom > top {
            return None;
        }
        let sx = self.width / (self.viewport.x_max - self.viewport.x_min);
        let sy = self.height / (self.viewport.y_max - self.viewport.y_min);
        Some(Rect {
            x: self.x + (left - self.viewport.x_min) * sx,
            y: self.y + (self.viewport.y_max - top) * sy,
            width: (right - left) * sx,
            height: (top - bottom) * sy,
        })
    }
}

/// A fixed-size SVG document of stacked panels.
#[derive(Debug, Clone)]
pub struct Figure {
    width: f64,
    height: f64,
    panels: Vec<Panel>,
}

impl Figure {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, panels: Vec::new() }
    }

    /// The reference figure: 1000x500 px with three stacked full-width
    /// panels of 125 px each (transcript panel on top, two alignment panels
    /// below), all showing the same region window.
    pub fn reference(region: &Region) -> Self {
        let viewport = Viewport::for_region(region);
        let mut figure = Self::new(REFERENCE_WIDTH, REFERENCE_HEIGHT);
        for top in REFERENCE_PANEL_TOPS {
            figure.add_panel(Panel::new(
                0.0,
                top,
                REFERENCE_WIDTH,
                REFERENCE_PANEL_HEIGHT,
                viewport,
            ));
        }
        figure
    }

    /// Append a panel and return its index.
    pub fn add_panel(&mut self, panel: Panel) -> usize {
        self.panels.push(panel);
        self.panels.len() - 1
    }

    pub fn panel_mut(&mut self, index: usize) -> &mut Panel {
        &mut self.panels[index]
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Write the whole document as SVG.
    pub fn render<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = ryu::Buffer::new();

        writer.write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        writer.write_all(b"<svg width=\"")?;
        writer.write_all(buf.format(self.width).as_bytes())?;
        writer.write_all(b"\" height=\"")?;
        writer.write_all(buf.format(self.height).as_bytes())?;
        writer.write_all(b"\" viewBox=\"0 0 ")?;
        writer.write_all(buf.format(self.width).as_bytes())?;
        writer.write_all(b" ")?;
        writer.write_all(buf.format(self.height).as_bytes())?;
        writer.write_all(b"\" xmlns=\"http://www.w3.org/2000/svg\">\n")?;

        writer.write_all(b"  <rect width=\"")?;
        writer.write_all(buf.format(self.width).as_bytes())?;
        writer.write_all(b"\" height=\"")?;
        writer.write_all(buf.format(self.height).as_bytes())?;
        writer.write_all(b"\" fill=\"white\"/>\n")?;

        for panel in &self.panels {
            for rect in &panel.rects {
                if let Some(px) = panel.project(rect) {
                    write_rect(writer, &mut buf, &px)?;
                }
            }
        }

        writer.write_all(b"</svg>\n")?;
        Ok(())
    }

    /// Render straight into a file.
    pub fn write_svg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.render(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn write_rect<W: Write>(writer: &mut W, buf: &mut ryu::Buffer, rect: &Rect) -> io::Result<()> {
    writer.write_all(b"  <rect x=\"")?;
    writer.write_all(buf.format(rect.x).as_bytes())?;
    writer.write_all(b"\" y=\"")?;
    writer.write_all(buf.format(rect.y).as_bytes())?;
    writer.write_all(b"\" width=\"")?;
    writer.write_all(buf.format(rect.width).as_bytes())?;
    writer.write_all(b"\" height=\"")?;
    writer.write_all(buf.format(rect.height).as_bytes())?;
    writer.write_all(b"\" fill=\"black\"/>\n")?;
    Ok(())
}
