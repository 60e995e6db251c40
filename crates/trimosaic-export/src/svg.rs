//! SVG export serializer.
//!
//! Converts a [`Frame`] into an SVG string with one `<polygon>` per
//! colored triangle, using the [`svg`] crate for document construction,
//! XML escaping, and attribute formatting.
//!
//! The `viewBox` spans the anchor hull `0 0 (w-1) (h-1)` so triangle
//! corners are written in pixel coordinates unchanged; the document's
//! `width` and `height` carry the output size and
//! `preserveAspectRatio="none"` stretches the hull onto it.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Text;
use svg::node::element::{Description, Polygon, Title};

use trimosaic_pipeline::{Frame, Point};

use crate::RenderOptions;

/// Metadata to embed in the SVG document.
///
/// Both fields are optional.  When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    ///
    /// Typically the run parameters and point count.
    pub description: Option<&'a str>,
}

/// `#rrggbb` hex notation.
fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// The `points` attribute of a triangle.
fn polygon_points(corners: &[Point; 3]) -> String {
    corners
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serialize a frame into an SVG document string.
///
/// Triangles without a color (no covered pixel) are omitted.  Each
/// remaining triangle is stroked in its own fill color with a
/// non-scaling one-unit stroke so neighboring triangles leave no
/// background seams.
#[must_use]
#[tracing::instrument(skip_all, fields(triangles = frame.triangulation().triangle_count()))]
pub fn to_svg(frame: &Frame, options: &RenderOptions, metadata: &SvgMetadata<'_>) -> String {
    let dims = frame.dimensions();
    let (width, height) = options.output_size(dims);
    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set(
            "viewBox",
            (
                0,
                0,
                dims.width.saturating_sub(1),
                dims.height.saturating_sub(1),
            ),
        )
        .set("preserveAspectRatio", "none");

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    for (corners, color) in frame.filled_triangles() {
        let color = hex_color(color);
        let polygon = Polygon::new()
            .set("points", polygon_points(&corners))
            .set("fill", color.as_str())
            .set("stroke", color)
            .set("stroke-width", 1)
            .set("stroke-linejoin", "round")
            .set("vector-effect", "non-scaling-stroke");
        doc = doc.add(polygon);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
