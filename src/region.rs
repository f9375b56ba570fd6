//! Spatial region of interest for obstacle (and optionally pose) positions.

use std::path::Path;

use nalgebra::Point2;
use serde::Deserialize;

use crate::error::ExportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Inside,
    Outside,
}

/// Immutable once built; construct through [`Region::bounding_box`],
/// [`Region::polygon`] or a [`RegionConfig`] so the shape is validated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RegionConfig")]
pub enum Region {
    Unrestricted,
    BoundingBox(BoundingBox),
    Polygon(Polygon),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        self.xmin <= p.x && p.x <= self.xmax && self.ymin <= p.y && p.y <= self.ymax
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point2<f64>>,
    bounds: BoundingBox,
}

impl Polygon {
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    fn edges(&self) -> impl Iterator<Item = (&Point2<f64>, &Point2<f64>)> {
        self.vertices
            .iter()
            .zip(self.vertices.iter().cycle().skip(1))
    }

    /// Even-odd ray casting from `p` toward +x. Points on an edge count as
    /// inside.
    ///
    /// Only points within `bounds` reach the crossing count, so every
    /// crossing right of `p` lies on the polygon and the ray needs no far
    /// endpoint.
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        if !self.bounds.contains(p) {
            return false;
        }
        if self.edges().any(|(a, b)| on_segment(a, p, b)) {
            return true;
        }

        let mut crossings = 0usize;
        for (a, b) in self.edges() {
            // Half-open in y so a ray through a shared vertex counts once.
            if (a.y > p.y) == (b.y > p.y) {
                continue;
            }
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x > p.x {
                crossings += 1;
            }
        }
        crossings % 2 == 1
    }
}

/// Twice the signed area of (p, q, r); zero when collinear.
fn cross(p: &Point2<f64>, q: &Point2<f64>, r: &Point2<f64>) -> f64 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

/// `q` is collinear with `p`-`r` and within the segment's extent.
fn on_segment(p: &Point2<f64>, q: &Point2<f64>, r: &Point2<f64>) -> bool {
    cross(p, q, r) == 0.0
        && q.x <= p.x.max(r.x)
        && q.x >= p.x.min(r.x)
        && q.y <= p.y.max(r.y)
        && q.y >= p.y.min(r.y)
}

impl Region {
    pub fn bounding_box(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, ExportError> {
        if ![xmin, xmax, ymin, ymax].iter().all(|v| v.is_finite()) {
            return Err(ExportError::Configuration(
                "bounding box bounds must be finite".to_string(),
            ));
        }
        if xmin > xmax || ymin > ymax {
            return Err(ExportError::Configuration(format!(
                "bounding box is empty: x [{xmin}, {xmax}], y [{ymin}, {ymax}]"
            )));
        }
        Ok(Region::BoundingBox(BoundingBox {
            xmin,
            xmax,
            ymin,
            ymax,
        }))
    }

    pub fn polygon(vertices: Vec<Point2<f64>>) -> Result<Self, ExportError> {
        if vertices.len() < 3 {
            return Err(ExportError::Configuration(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return Err(ExportError::Configuration(
                "polygon vertices must be finite".to_string(),
            ));
        }

        let mut bounds = BoundingBox {
            xmin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymin: f64::INFINITY,
            ymax: f64::NEG_INFINITY,
        };
        for v in &vertices {
            bounds.xmin = bounds.xmin.min(v.x);
            bounds.xmax = bounds.xmax.max(v.x);
            bounds.ymin = bounds.ymin.min(v.y);
            bounds.ymax = bounds.ymax.max(v.y);
        }
        Ok(Region::Polygon(Polygon { vertices, bounds }))
    }

    pub fn classify(&self, p: &Point2<f64>) -> Classification {
        let inside = match self {
            Region::Unrestricted => true,
            Region::BoundingBox(b) => b.contains(p),
            Region::Polygon(poly) => poly.contains(p),
        };
        if inside {
            Classification::Inside
        } else {
            Classification::Outside
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.classify(&Point2::new(x, y)) == Classification::Inside
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Region::Unrestricted)
    }

    pub fn describe(&self) -> String {
        match self {
            Region::Unrestricted => "unrestricted".to_string(),
            Region::BoundingBox(b) => format!(
                "bbox x [{}, {}] y [{}, {}]",
                b.xmin, b.xmax, b.ymin, b.ymax
            ),
            Region::Polygon(p) => format!("polygon with {} vertices", p.vertices.len()),
        }
    }

    /// Load a JSON region document.
    pub fn from_json_file(path: &Path) -> Result<Self, ExportError> {
        let text = std::fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            ExportError::Configuration(format!("region file '{}': {e}", path.display()))
        })
    }
}

/// On-disk shape of a region definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegionConfig {
    Unrestricted,
    BoundingBox {
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    },
    Polygon {
        vertices: Vec<[f64; 2]>,
    },
}

impl TryFrom<RegionConfig> for Region {
    type Error = ExportError;

    fn try_from(config: RegionConfig) -> Result<Self, Self::Error> {
        match config {
            RegionConfig::Unrestricted => Ok(Region::Unrestricted),
            RegionConfig::BoundingBox {
                xmin,
                xmax,
                ymin,
                ymax,
            } => Region::bounding_box(xmin, xmax, ymin, ymax),
            RegionConfig::Polygon { vertices } => Region::polygon(
                vertices
                    .into_iter()
                    .map(|[x, y]| Point2::new(x, y))
                    .collect(),
            ),
        }
    }
}

fn parse_f64(s: &str, what: &str) -> Result<f64, ExportError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| ExportError::Configuration(format!("failed to parse {what}: '{s}'")))
}

/// Parse `XMIN,XMAX,YMIN,YMAX`.
pub fn parse_bbox(s: &str) -> Result<Region, ExportError> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err(ExportError::Configuration(
            "the bounding box must contain exactly 4 comma-separated values \
             (xmin,xmax,ymin,ymax)"
                .to_string(),
        ));
    }
    Region::bounding_box(
        parse_f64(parts[0], "xmin")?,
        parse_f64(parts[1], "xmax")?,
        parse_f64(parts[2], "ymin")?,
        parse_f64(parts[3], "ymax")?,
    )
}

/// Parse `X1,Y1;X2,Y2;X3,Y3[;...]`.
pub fn parse_polygon(s: &str) -> Result<Region, ExportError> {
    let mut vertices = Vec::new();
    for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((x, y)) = pair.split_once(',') else {
            return Err(ExportError::Configuration(format!(
                "polygon vertex '{pair}' must be X,Y"
            )));
        };
        vertices.push(Point2::new(parse_f64(x, "vertex x")?, parse_f64(y, "vertex y")?));
    }
    Region::polygon(vertices)
}
