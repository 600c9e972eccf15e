//! Choropleth rendering of the regional ratios as SVG.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use geo::{BoundingRect, Coord, CoordsIter, LineString, MultiPolygon, Rect};
use snafu::prelude::*;

use crate::refmap::*;

const MARGIN: f64 = 20.0;
const TITLE_HEIGHT: f64 = 40.0;
const LEGEND_HEIGHT: f64 = 50.0;

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    /// Format as CSS: rgb(r,g,b)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Sequential ramp, from a low share of Choice A to a high one.
const RAMP: &[(f64, Rgb)] = &[
    (0.00, Rgb { r: 247, g: 251, b: 255 }),
    (0.25, Rgb { r: 198, g: 219, b: 239 }),
    (0.50, Rgb { r: 107, g: 174, b: 214 }),
    (0.75, Rgb { r: 33, g: 113, b: 181 }),
    (1.00, Rgb { r: 8, g: 48, b: 107 }),
];

/// The fill color of a defined ratio, interpolated along the ramp.
pub fn ratio_color(ratio: f64) -> Rgb {
    let x = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    for w in RAMP.windows(2) {
        let (lo, c0) = w[0];
        let (hi, c1) = w[1];
        if x <= hi {
            let t = (x - lo) / (hi - lo);
            let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
            return Rgb {
                r: mix(c0.r, c1.r),
                g: mix(c0.g, c1.g),
                b: mix(c0.b, c1.b),
            };
        }
    }
    RAMP[RAMP.len() - 1].1
}

/// Buffered SVG output to a file.
pub struct SvgWriter {
    writer: BufWriter<File>,
}

impl Write for SvgWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }
}

impl SvgWriter {
    pub fn create(path: &str) -> RefmapResult<SvgWriter> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path })?;
        }
        let file = File::create(path).context(WritingOutputSnafu { path })?;
        Ok(SvgWriter {
            writer: BufWriter::new(file),
        })
    }
}

/// Where the map is drawn: the lon/lat bounds and their scale in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayout {
    pub width: f64,
    pub height: f64,
    pub bounds: Rect<f64>,
    pub scale: f64,
}

impl MapLayout {
    /// Fits the bounding box of all the boundaries into the given width.
    /// The height follows from the aspect ratio of the box.
    pub fn fit(boundaries: &[&MultiPolygon<f64>], width: u32) -> MapLayout {
        let bounds = boundaries
            .iter()
            .filter_map(|mp| mp.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
            .unwrap_or_else(|| Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }));

        let width = (width as f64).max(4.0 * MARGIN);
        let inner = width - 2.0 * MARGIN;
        let span = bounds.width().max(bounds.height());
        let scale = if span > 0.0 { inner / span } else { 1.0 };
        let height = TITLE_HEIGHT + 2.0 * MARGIN + bounds.height() * scale + LEGEND_HEIGHT;
        MapLayout {
            width,
            height,
            bounds,
            scale,
        }
    }

    /// Equirectangular projection, with the Y axis pointing down.
    pub fn project(&self, c: &Coord<f64>) -> (f64, f64) {
        let x = MARGIN + (c.x - self.bounds.min().x) * self.scale;
        let y = TITLE_HEIGHT + MARGIN + (self.bounds.max().y - c.y) * self.scale;
        (x, y)
    }

    fn legend_top(&self) -> f64 {
        self.height - LEGEND_HEIGHT
    }
}

/// Writes the whole map. Returns the number of regions drawn.
pub fn render_map(
    writer: &mut impl Write,
    ratios: &[RegionRatio],
    title: &str,
    width: u32,
) -> io::Result<usize> {
    let boundaries: Vec<&MultiPolygon<f64>> = ratios.iter().map(|r| &r.boundary).collect();
    let layout = MapLayout::fit(&boundaries, width);

    write_header(writer, &layout)?;
    write_styles(writer)?;
    writeln!(
        writer,
        r#"<text class="title" x="{:.1}" y="{:.1}">{}</text>"#,
        layout.width / 2.0,
        TITLE_HEIGHT * 0.7,
        escape_xml(title)
    )?;
    for rr in ratios.iter() {
        write_region(writer, rr, &layout)?;
    }
    write_legend(writer, &layout)?;
    writeln!(writer, "</svg>")?;
    Ok(ratios.len())
}

/// Renders the map into a file, creating the parent directories if needed.
pub fn write_map_file(
    path: &str,
    ratios: &[RegionRatio],
    settings: &OutputSettings,
) -> RefmapResult<()> {
    let mut writer = SvgWriter::create(path)?;
    let count = render_map(&mut writer, ratios, settings.title(), settings.map_width())
        .context(WritingOutputSnafu { path })?;
    writer.flush().context(WritingOutputSnafu { path })?;
    info!("Wrote map of {} regions to {}", count, path);
    Ok(())
}

fn write_header(writer: &mut impl Write, layout: &MapLayout) -> io::Result<()> {
    writeln!(
        writer,
        r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"##
    )?;
    writeln!(
        writer,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" data-lon-min="{lon_min}" data-lon-max="{lon_max}" data-lat-min="{lat_min}" data-lat-max="{lat_max}" data-scale="{scale}">"##,
        w = layout.width,
        h = layout.height,
        lon_min = layout.bounds.min().x,
        lon_max = layout.bounds.max().x,
        lat_min = layout.bounds.min().y,
        lat_max = layout.bounds.max().y,
        scale = layout.scale,
    )?;
    writeln!(writer, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)
}

fn write_styles(writer: &mut impl Write) -> io::Result<()> {
    writeln!(
        writer,
        r##"<defs>
<style>
    .reg {{ stroke: #111827; stroke-width: 0.5; fill-rule: evenodd; }}
    .undef {{ fill: #bdbdbd; }}
    .title {{ font: bold 16px sans-serif; text-anchor: middle; }}
    .legend {{ font: 11px sans-serif; }}
</style>
</defs>"##
    )
}

fn write_region(writer: &mut impl Write, rr: &RegionRatio, layout: &MapLayout) -> io::Result<()> {
    let d = multipolygon_to_path(&rr.boundary, layout);
    let tooltip = match rr.ratio.value() {
        Some(x) => format!("{} ({}): {:.1}% Choice A", rr.name_reg, rr.code_reg, x * 100.0),
        None => format!("{} ({}): no expressed vote", rr.name_reg, rr.code_reg),
    };
    match rr.ratio.value() {
        Some(x) => writeln!(
            writer,
            r#"<path class="reg" data-code="{}" d="{}" style="fill:{}"><title>{}</title></path>"#,
            escape_xml(&rr.code_reg),
            d,
            ratio_color(x),
            escape_xml(&tooltip)
        ),
        None => writeln!(
            writer,
            r#"<path class="reg undef" data-code="{}" d="{}"><title>{}</title></path>"#,
            escape_xml(&rr.code_reg),
            d,
            escape_xml(&tooltip)
        ),
    }
}

fn write_legend(writer: &mut impl Write, layout: &MapLayout) -> io::Result<()> {
    let top = layout.legend_top() + 10.0;
    let swatch = 18.0;
    writeln!(writer, r#"<g class="legend">"#)?;
    for (idx, (stop, color)) in RAMP.iter().enumerate() {
        let x = MARGIN + idx as f64 * 60.0;
        writeln!(
            writer,
            r##"<rect x="{x:.1}" y="{top:.1}" width="{swatch}" height="{swatch}" style="fill:{color}" stroke="#111827" stroke-width="0.5"/>"##
        )?;
        writeln!(
            writer,
            r#"<text x="{:.1}" y="{:.1}">{:.0}%</text>"#,
            x + swatch + 4.0,
            top + swatch - 5.0,
            stop * 100.0
        )?;
    }
    let x = MARGIN + RAMP.len() as f64 * 60.0;
    writeln!(
        writer,
        r##"<rect class="undef" x="{x:.1}" y="{top:.1}" width="{swatch}" height="{swatch}" stroke="#111827" stroke-width="0.5"/>"##
    )?;
    writeln!(
        writer,
        r#"<text x="{:.1}" y="{:.1}">undefined</text>"#,
        x + swatch + 4.0,
        top + swatch - 5.0
    )?;
    writeln!(writer, "</g>")
}

/// Build a compact SVG path string for a MultiPolygon (exteriors + holes).
fn multipolygon_to_path(shape: &MultiPolygon<f64>, layout: &MapLayout) -> String {
    let mut out = String::new();
    for polygon in &shape.0 {
        ring_to_path(polygon.exterior(), layout, &mut out);
        for interior in polygon.interiors() {
            ring_to_path(interior, layout, &mut out);
        }
    }
    out
}

/// Append a ring as an SVG subpath: "M x,y L x,y ... Z"
fn ring_to_path(ring: &LineString<f64>, layout: &MapLayout, out: &mut String) {
    let mut coords = ring.coords_iter().map(|coord| layout.project(&coord));
    if let Some((x, y)) = coords.next() {
        out.push_str(&format!("M{x:.3},{y:.3}"));
        for (x, y) in coords {
            out.push_str(&format!(" L{x:.3},{y:.3}"));
        }
        out.push_str("Z ");
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
