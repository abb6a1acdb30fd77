//! Case geometries, refinement regions and surface-file handling.
//!
//! Geometries are triangulated surfaces carrying a boundary-condition kind;
//! they are imported from and exported to the ASCII STL text format. A
//! [`GeometrySet`] validates every member once at construction so downstream
//! surface export cannot fail on malformed input.

use crate::models::document::is_valid_name;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt::Write as _;
use std::fs;
use thiserror::Error;

/// A point or direction in case coordinates.
pub type Point = [f64; 3];

/// Errors raised by geometry validation, surface parsing and surface export.
#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("invalid geometry name {0:?}: only letters, digits and underscores are allowed")]
    InvalidName(String),

    #[error("geometry {0:?} has no facets")]
    EmptySurface(String),

    #[error("failed to parse surface text: {0}")]
    SurfaceParse(String),

    #[error("tunnel parameter {name} must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("unrecognized refinement mode {0:?}")]
    UnknownRefinementMode(String),

    #[error("failed to write surface file {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Boundary-condition capability a geometry exposes to the field documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Inlet,
    Outlet,
    Wall,
    Symmetry,
    Ground,
    Generic,
}

/// One facet of a triangulated surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub normal: Point,
    pub vertices: [Point; 3],
}

/// A named triangulated surface with boundary metadata.
#[derive(Debug, Clone)]
pub struct SurfaceGeometry {
    name: String,
    boundary: BoundaryKind,
    triangles: Vec<Triangle>,
}

impl SurfaceGeometry {
    pub fn new(
        name: impl Into<String>,
        boundary: BoundaryKind,
        triangles: Vec<Triangle>,
    ) -> Self {
        Self {
            name: name.into(),
            boundary,
            triangles,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn boundary(&self) -> BoundaryKind {
        self.boundary
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.triangles.iter().flat_map(|t| t.vertices.into_iter())
    }

    /// Render this geometry as one ASCII STL `solid` block.
    pub fn to_surface_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "solid {}", self.name);
        for t in &self.triangles {
            let [nx, ny, nz] = t.normal;
            let _ = writeln!(out, "  facet normal {nx} {ny} {nz}");
            let _ = writeln!(out, "    outer loop");
            for [x, y, z] in t.vertices {
                let _ = writeln!(out, "      vertex {x} {y} {z}");
            }
            let _ = writeln!(out, "    endloop");
            let _ = writeln!(out, "  endfacet");
        }
        let _ = writeln!(out, "endsolid {}", self.name);
        out
    }

    /// Parse one or more `solid` blocks from an ASCII STL text.
    ///
    /// Reloaded geometries default to wall boundaries; boundary metadata lives
    /// in the field documents, not in the surface file.
    pub fn from_surface_text(text: &str) -> Result<Vec<SurfaceGeometry>, GeometryError> {
        let mut geometries = Vec::new();
        let mut current: Option<(String, Vec<Triangle>)> = None;
        let mut normal = [0.0; 3];
        let mut vertices: Vec<Point> = Vec::new();

        for (lineno, line) in text.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            let parse_err =
                |what: &str| GeometryError::SurfaceParse(format!("{what} at line {}", lineno + 1));

            match keyword {
                "solid" => {
                    let name = tokens.next().unwrap_or("surface").to_string();
                    current = Some((name, Vec::new()));
                }
                "facet" => {
                    // "facet normal nx ny nz"
                    let coords = parse_coords(tokens.skip(1))
                        .ok_or_else(|| parse_err("malformed facet normal"))?;
                    normal = coords;
                    vertices.clear();
                }
                "vertex" => {
                    let coords =
                        parse_coords(tokens).ok_or_else(|| parse_err("malformed vertex"))?;
                    vertices.push(coords);
                }
                "endfacet" => {
                    let solid = current
                        .as_mut()
                        .ok_or_else(|| parse_err("facet outside a solid"))?;
                    if vertices.len() != 3 {
                        return Err(parse_err("facet without exactly three vertices"));
                    }
                    solid.1.push(Triangle {
                        normal,
                        vertices: [vertices[0], vertices[1], vertices[2]],
                    });
                }
                "endsolid" => {
                    let (name, triangles) = current
                        .take()
                        .ok_or_else(|| parse_err("endsolid without a solid"))?;
                    geometries.push(SurfaceGeometry::new(name, BoundaryKind::Wall, triangles));
                }
                _ => {}
            }
        }

        if current.is_some() {
            return Err(GeometryError::SurfaceParse(
                "unterminated solid block".into(),
            ));
        }
        Ok(geometries)
    }
}

fn parse_coords<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<Point> {
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    let z = tokens.next()?.parse().ok()?;
    Some([x, y, z])
}

/// A validated, immutable collection of case geometries.
///
/// Validation runs once over the input; member geometries are never mutated
/// in place - build a new set when the geometry changes.
#[derive(Debug, Clone, Default)]
pub struct GeometrySet {
    geometries: Vec<SurfaceGeometry>,
}

impl GeometrySet {
    pub fn new(geometries: Vec<SurfaceGeometry>) -> Result<Self, GeometryError> {
        for geo in &geometries {
            if !is_valid_name(&geo.name) {
                return Err(GeometryError::InvalidName(geo.name.clone()));
            }
            if geo.triangles.is_empty() {
                return Err(GeometryError::EmptySurface(geo.name.clone()));
            }
        }
        Ok(Self { geometries })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SurfaceGeometry> {
        self.geometries.iter()
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SurfaceGeometry> {
        self.geometries.iter().find(|g| g.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.geometries.iter().map(|g| g.name.as_str()).collect()
    }

    /// Return a new set with `geometry` appended.
    pub fn with_geometry(&self, geometry: SurfaceGeometry) -> Result<GeometrySet, GeometryError> {
        let mut geometries = self.geometries.clone();
        geometries.push(geometry);
        GeometrySet::new(geometries)
    }

    /// Minimum and maximum corner points over every member geometry.
    ///
    /// With `x_axis` supplied the corners are expressed in the local frame
    /// spanned by that axis, world up, and their cross product.
    pub fn bounding_box(&self, x_axis: Option<Point>) -> Option<(Point, Point)> {
        let frame = x_axis.map(|x| {
            let x = normalize(x);
            let z = [0.0, 0.0, 1.0];
            let y = cross(z, x);
            (x, y, z)
        });

        let mut min: Option<Point> = None;
        let mut max: Option<Point> = None;
        for point in self.geometries.iter().flat_map(SurfaceGeometry::points) {
            let p = match frame {
                Some((x, y, z)) => [dot(point, x), dot(point, y), dot(point, z)],
                None => point,
            };
            match (&mut min, &mut max) {
                (Some(lo), Some(hi)) => {
                    for i in 0..3 {
                        lo[i] = lo[i].min(p[i]);
                        hi[i] = hi[i].max(p[i]);
                    }
                }
                _ => {
                    min = Some(p);
                    max = Some(p);
                }
            }
        }
        min.zip(max)
    }

    /// Concatenate every member's surface text into one merged file body.
    pub fn merged_surface_text(&self) -> String {
        self.geometries
            .iter()
            .map(SurfaceGeometry::to_surface_text)
            .collect()
    }
}

fn dot(a: Point, b: Point) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Point, b: Point) -> Point {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: Point) -> Point {
    let len = dot(v, v).sqrt();
    if len == 0.0 {
        v
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

/// Mesh-density policy of a refinement region.
#[derive(Debug, Clone, PartialEq)]
pub enum RefinementMode {
    /// Refine cells inside the region surface to the given level.
    Inside(u32),
    /// Refine cells outside the region surface to the given level.
    Outside(u32),
    /// Refine by distance bands: (distance, level) pairs.
    Distance(Vec<(f64, u32)>),
}

impl RefinementMode {
    pub fn mode_keyword(&self) -> &'static str {
        match self {
            RefinementMode::Inside(_) => "inside",
            RefinementMode::Outside(_) => "outside",
            RefinementMode::Distance(_) => "distance",
        }
    }

    /// Levels entry as written into the meshing document, e.g. `((1E15 4))`.
    pub fn levels_text(&self) -> String {
        match self {
            RefinementMode::Inside(level) | RefinementMode::Outside(level) => {
                format!("((1E15 {level}))")
            }
            RefinementMode::Distance(bands) => {
                let pairs: Vec<String> = bands
                    .iter()
                    .map(|(distance, level)| format!("({distance} {level})"))
                    .collect();
                format!("({})", pairs.join(" "))
            }
        }
    }

    /// Reconstruct a mode from the meshing document's `mode`/`levels` entries.
    pub fn from_entries(mode: &str, levels: &str) -> Result<RefinementMode, GeometryError> {
        let bands = parse_level_bands(levels)
            .ok_or_else(|| GeometryError::SurfaceParse(format!("malformed levels {levels:?}")))?;
        let first_level = bands.first().map(|(_, level)| *level).unwrap_or(0);
        match mode {
            "inside" => Ok(RefinementMode::Inside(first_level)),
            "outside" => Ok(RefinementMode::Outside(first_level)),
            "distance" => Ok(RefinementMode::Distance(bands)),
            other => Err(GeometryError::UnknownRefinementMode(other.to_string())),
        }
    }
}

fn parse_level_bands(levels: &str) -> Option<Vec<(f64, u32)>> {
    let numbers: Vec<&str> = levels
        .split(|c: char| c == '(' || c == ')' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if numbers.is_empty() || numbers.len() % 2 != 0 {
        return None;
    }
    numbers
        .chunks(2)
        .map(|pair| {
            let distance: f64 = pair[0].parse().ok()?;
            let level: u32 = pair[1].parse().ok()?;
            Some((distance, level))
        })
        .collect()
}

/// A named region with a refinement policy, exported to its own surface file
/// and registered by name inside the meshing document.
#[derive(Debug, Clone)]
pub struct RefinementRegion {
    name: String,
    mode: RefinementMode,
    triangles: Vec<Triangle>,
}

impl RefinementRegion {
    pub fn new(
        name: impl Into<String>,
        mode: RefinementMode,
        triangles: Vec<Triangle>,
    ) -> Result<Self, GeometryError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(GeometryError::InvalidName(name));
        }
        if triangles.is_empty() {
            return Err(GeometryError::EmptySurface(name));
        }
        Ok(Self {
            name,
            mode,
            triangles,
        })
    }

    pub fn from_geometry(
        geometry: &SurfaceGeometry,
        mode: RefinementMode,
    ) -> Result<Self, GeometryError> {
        Self::new(geometry.name(), mode, geometry.triangles().to_vec())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> &RefinementMode {
        &self.mode
    }

    pub fn to_surface_text(&self) -> String {
        SurfaceGeometry::new(self.name.clone(), BoundaryKind::Generic, self.triangles.clone())
            .to_surface_text()
    }

    /// Write this region's surface file as `<dir>/<name>.stl`.
    pub fn write_surface(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, GeometryError> {
        let path = dir.join(format!("{}.stl", self.name));
        fs::write(&path, self.to_surface_text()).map_err(|source| GeometryError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Wind-tunnel extension multipliers, each applied to the model height.
///
/// Only the validated parameter set lives here; deriving the tunnel geometry
/// itself is a geometry-kernel concern outside this crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunnelParameters {
    windward: f64,
    top: f64,
    side: f64,
    leeward: f64,
}

impl TunnelParameters {
    pub fn new(windward: f64, top: f64, side: f64, leeward: f64) -> Result<Self, GeometryError> {
        for (name, value) in [
            ("windward", windward),
            ("top", top),
            ("side", side),
            ("leeward", leeward),
        ] {
            if !(value > 0.0) {
                return Err(GeometryError::NonPositiveParameter { name, value });
            }
        }
        Ok(Self {
            windward,
            top,
            side,
            leeward,
        })
    }

    pub fn windward(&self) -> f64 {
        self.windward
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn side(&self) -> f64 {
        self.side
    }

    pub fn leeward(&self) -> f64 {
        self.leeward
    }
}

impl Default for TunnelParameters {
    fn default() -> Self {
        Self {
            windward: 3.0,
            top: 5.0,
            side: 5.0,
            leeward: 15.0,
        }
    }
}

/// Axis-aligned unit box used by tests and examples: two triangles per face.
pub fn box_triangles(min: Point, max: Point) -> Vec<Triangle> {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let v = [
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    let quads: [([usize; 4], Point); 6] = [
        ([0, 3, 2, 1], [0.0, 0.0, -1.0]),
        ([4, 5, 6, 7], [0.0, 0.0, 1.0]),
        ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
        ([2, 3, 7, 6], [0.0, 1.0, 0.0]),
        ([1, 2, 6, 5], [1.0, 0.0, 0.0]),
        ([0, 4, 7, 3], [-1.0, 0.0, 0.0]),
    ];
    quads
        .iter()
        .flat_map(|(idx, normal)| {
            [
                Triangle {
                    normal: *normal,
                    vertices: [v[idx[0]], v[idx[1]], v[idx[2]]],
                },
                Triangle {
                    normal: *normal,
                    vertices: [v[idx[0]], v[idx[2]], v[idx[3]]],
                },
            ]
        })
        .collect()
}
