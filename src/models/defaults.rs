//! Default-value tables and the document registry.
//!
//! Every recognized document type owns an immutable default table; documents
//! are built by merging caller values over those defaults through the shared
//! [`ConfigDocument`] constructor. The registry maps on-disk document names to
//! their defaults so [`document_from_file`] can reconstruct typed documents,
//! falling back to a generic key/value parse for unrecognized names.

use crate::models::document::{ConfigDocument, DocumentError, Location, ParsedDocument, Value};
use crate::models::geometry::{
    BoundaryKind, GeometrySet, Point, RefinementMode, RefinementRegion,
};
use camino::Utf8Path;
use indexmap::IndexMap;
use std::fs;

/// Patch name for the mesh-extent faces added alongside the user geometries.
pub const BOUNDING_BOX_PATCH: &str = "boundingBox";

/// Knobs shared by the mesh-extent and surface-refinement documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshingParameters {
    /// Target cell edge length per axis; cell counts are derived from it.
    pub cell_size_xyz: Option<[f64; 3]>,
    /// Expansion ratios per axis for the background mesh.
    pub grading: Option<[f64; 3]>,
    /// A point guaranteed to lie inside the flow volume.
    pub location_in_mesh: Option<Point>,
}

fn entries<const N: usize>(pairs: [(&str, &str); N]) -> IndexMap<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::entry(v)))
        .collect()
}

/// Defaults for a recognized document name: (class tag, location, default table).
///
/// This is the explicit name-to-defaults registry; parsing dispatches through
/// it and anything it does not list round-trips as a generic document.
pub fn registry_defaults(name: &str) -> Option<(&'static str, Location, IndexMap<String, Value>)> {
    let (class_tag, location, defaults) = match name {
        "U" => (
            "volVectorField",
            Location::Zero,
            entries([
                ("dimensions", "[0 1 -1 0 0 0 0]"),
                ("internalField", "uniform (0 0 0)"),
            ]),
        ),
        "p" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[0 2 -2 0 0 0 0]"),
                ("internalField", "uniform 0"),
            ]),
        ),
        "p_rgh" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[0 2 -2 0 0 0 0]"),
                ("internalField", "uniform 0"),
            ]),
        ),
        "k" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[0 2 -2 0 0 0 0]"),
                ("internalField", "uniform 0.1"),
            ]),
        ),
        "epsilon" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[0 2 -3 0 0 0 0]"),
                ("internalField", "uniform 0.01"),
            ]),
        ),
        "omega" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[0 0 -1 0 0 0 0]"),
                ("internalField", "uniform 0.01"),
            ]),
        ),
        "nut" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[0 2 -1 0 0 0 0]"),
                ("internalField", "uniform 0"),
            ]),
        ),
        "T" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[0 0 0 1 0 0 0]"),
                ("internalField", "uniform 300"),
            ]),
        ),
        "alphat" => (
            "volScalarField",
            Location::Zero,
            entries([
                ("dimensions", "[1 -1 -1 0 0 0 0]"),
                ("internalField", "uniform 0"),
            ]),
        ),
        "turbulenceProperties" => {
            let mut defaults = entries([("simulationType", "RAS")]);
            defaults.insert(
                "RAS".to_string(),
                Value::dict([
                    ("RASModel", Value::entry("kEpsilon")),
                    ("turbulence", Value::entry("on")),
                    ("printCoeffs", Value::entry("on")),
                ]),
            );
            ("dictionary", Location::Constant, defaults)
        }
        "transportProperties" => (
            "dictionary",
            Location::Constant,
            entries([
                ("transportModel", "Newtonian"),
                ("nu", "nu [0 2 -1 0 0 0 0] 1e-05"),
            ]),
        ),
        "g" => (
            "uniformDimensionedVectorField",
            Location::Constant,
            entries([
                ("dimensions", "[0 1 -2 0 0 0 0]"),
                ("value", "(0 0 -9.81)"),
            ]),
        ),
        "controlDict" => (
            "dictionary",
            Location::System,
            entries([
                ("application", "simpleFoam"),
                ("startFrom", "latestTime"),
                ("startTime", "0"),
                ("stopAt", "endTime"),
                ("endTime", "1000"),
                ("deltaT", "1"),
                ("writeControl", "timeStep"),
                ("writeInterval", "100"),
                ("purgeWrite", "0"),
                ("writeFormat", "ascii"),
                ("writePrecision", "8"),
                ("writeCompression", "off"),
                ("timeFormat", "general"),
                ("timePrecision", "6"),
                ("runTimeModifiable", "true"),
            ]),
        ),
        "fvSchemes" => {
            let mut defaults = IndexMap::new();
            defaults.insert(
                "ddtSchemes".to_string(),
                Value::dict([("default", Value::entry("steadyState"))]),
            );
            defaults.insert(
                "gradSchemes".to_string(),
                Value::dict([("default", Value::entry("cellLimited leastSquares 1"))]),
            );
            defaults.insert(
                "divSchemes".to_string(),
                Value::dict([
                    ("default", Value::entry("none")),
                    (
                        "div(phi,U)",
                        Value::entry("bounded Gauss linearUpwindV grad(U)"),
                    ),
                    ("div(phi,k)", Value::entry("bounded Gauss upwind")),
                    ("div(phi,epsilon)", Value::entry("bounded Gauss upwind")),
                    (
                        "div((nuEff*dev2(T(grad(U)))))",
                        Value::entry("Gauss linear"),
                    ),
                ]),
            );
            defaults.insert(
                "laplacianSchemes".to_string(),
                Value::dict([("default", Value::entry("Gauss linear limited 0.333"))]),
            );
            defaults.insert(
                "interpolationSchemes".to_string(),
                Value::dict([("default", Value::entry("linear"))]),
            );
            defaults.insert(
                "snGradSchemes".to_string(),
                Value::dict([("default", Value::entry("limited 0.333"))]),
            );
            ("dictionary", Location::System, defaults)
        }
        "fvSolution" => {
            let mut defaults = IndexMap::new();
            defaults.insert(
                "solvers".to_string(),
                Value::dict([
                    (
                        "p",
                        Value::dict([
                            ("solver", Value::entry("GAMG")),
                            ("smoother", Value::entry("GaussSeidel")),
                            ("tolerance", Value::entry("1e-7")),
                            ("relTol", Value::entry("0.1")),
                        ]),
                    ),
                    (
                        "U",
                        Value::dict([
                            ("solver", Value::entry("smoothSolver")),
                            ("smoother", Value::entry("GaussSeidel")),
                            ("tolerance", Value::entry("1e-8")),
                            ("relTol", Value::entry("0.1")),
                            ("nSweeps", Value::entry("1")),
                        ]),
                    ),
                    (
                        "\"(k|epsilon|omega)\"",
                        Value::dict([
                            ("solver", Value::entry("smoothSolver")),
                            ("smoother", Value::entry("GaussSeidel")),
                            ("tolerance", Value::entry("1e-8")),
                            ("relTol", Value::entry("0.1")),
                            ("nSweeps", Value::entry("1")),
                        ]),
                    ),
                ]),
            );
            defaults.insert(
                "SIMPLE".to_string(),
                Value::dict([
                    ("nNonOrthogonalCorrectors", Value::entry("2")),
                    (
                        "residualControl",
                        Value::dict([
                            ("p", Value::entry("1e-5")),
                            ("U", Value::entry("1e-5")),
                            ("\"(k|epsilon|omega)\"", Value::entry("1e-5")),
                        ]),
                    ),
                ]),
            );
            defaults.insert(
                "relaxationFactors".to_string(),
                Value::dict([
                    ("p", Value::entry("0.3")),
                    ("U", Value::entry("0.7")),
                    ("\"(k|epsilon|omega)\"", Value::entry("0.7")),
                ]),
            );
            ("dictionary", Location::System, defaults)
        }
        "probes" => (
            "dictionary",
            Location::System,
            entries([
                ("type", "probes"),
                ("functionObjectLibs", "(\"libsampling.so\")"),
                ("fields", "(p U)"),
                ("probeLocations", "()"),
                ("writeControl", "timeStep"),
                ("writeInterval", "1"),
            ]),
        ),
        "decomposeParDict" => (
            "dictionary",
            Location::System,
            entries([("numberOfSubdomains", "2"), ("method", "scotch")]),
        ),
        "blockMeshDict" => (
            "dictionary",
            Location::System,
            entries([
                ("convertToMeters", "1"),
                ("vertices", "()"),
                ("blocks", "()"),
                ("edges", "()"),
                ("boundary", "()"),
                ("mergePatchPairs", "()"),
            ]),
        ),
        "snappyHexMeshDict" => {
            let mut defaults = entries([
                ("castellatedMesh", "true"),
                ("snap", "true"),
                ("addLayers", "false"),
            ]);
            defaults.insert("geometry".to_string(), Value::Dict(IndexMap::new()));
            defaults.insert(
                "castellatedMeshControls".to_string(),
                Value::dict([
                    ("maxLocalCells", Value::entry("1000000")),
                    ("maxGlobalCells", Value::entry("2000000")),
                    ("minRefinementCells", Value::entry("10")),
                    ("maxLoadUnbalance", Value::entry("0.1")),
                    ("nCellsBetweenLevels", Value::entry("3")),
                    ("features", Value::entry("()")),
                    ("refinementSurfaces", Value::Dict(IndexMap::new())),
                    ("resolveFeatureAngle", Value::entry("30")),
                    ("refinementRegions", Value::Dict(IndexMap::new())),
                    ("locationInMesh", Value::entry("(0 0 0)")),
                    ("allowFreeStandingZoneFaces", Value::entry("true")),
                ]),
            );
            defaults.insert(
                "snapControls".to_string(),
                Value::dict([
                    ("nSmoothPatch", Value::entry("3")),
                    ("tolerance", Value::entry("2")),
                    ("nSolveIter", Value::entry("30")),
                    ("nRelaxIter", Value::entry("5")),
                ]),
            );
            defaults.insert(
                "addLayersControls".to_string(),
                Value::dict([
                    ("relativeSizes", Value::entry("true")),
                    ("layers", Value::Dict(IndexMap::new())),
                    ("expansionRatio", Value::entry("1.0")),
                    ("finalLayerThickness", Value::entry("0.3")),
                    ("minThickness", Value::entry("0.2")),
                ]),
            );
            defaults.insert(
                "meshQualityControls".to_string(),
                Value::dict([
                    ("maxNonOrtho", Value::entry("60")),
                    ("maxBoundarySkewness", Value::entry("20")),
                    ("maxInternalSkewness", Value::entry("4")),
                    ("minVol", Value::entry("1e-13")),
                    ("minTetQuality", Value::entry("1e-15")),
                ]),
            );
            defaults.insert("debug".to_string(), Value::entry("0"));
            defaults.insert("mergeTolerance".to_string(), Value::entry("1e-6"));
            ("dictionary", Location::System, defaults)
        }
        _ => return None,
    };
    Some((class_tag, location, defaults))
}

/// Parse an on-disk document, dispatching through the registry.
///
/// Recognized names are merged over their default table; anything else falls
/// back to a generic document with no default merging.
pub fn document_from_file(path: &Utf8Path) -> Result<ConfigDocument, DocumentError> {
    let text = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = ConfigDocument::parse(&text)?;

    let file_name = path.file_name().unwrap_or_default().to_string();
    let name = parsed.name.clone().unwrap_or(file_name);

    match registry_defaults(&name) {
        Some((class_tag, location, defaults)) => ConfigDocument::from_defaults(
            name,
            parsed.class_tag.as_deref().unwrap_or(class_tag),
            parsed.location.unwrap_or(location),
            defaults,
            Some(parsed.values),
        ),
        None => generic_from_parsed(name, path, parsed),
    }
}

fn generic_from_parsed(
    name: String,
    path: &Utf8Path,
    parsed: ParsedDocument,
) -> Result<ConfigDocument, DocumentError> {
    // header first, then the parent folder name, then the system folder
    let location = parsed
        .location
        .or_else(|| {
            path.parent()
                .and_then(Utf8Path::file_name)
                .and_then(Location::parse)
        })
        .unwrap_or(Location::System);
    ConfigDocument::generic(
        name,
        parsed.class_tag.unwrap_or_else(|| "dictionary".to_string()),
        location,
        parsed.values,
    )
}

/// Per-field boundary entry for one boundary kind.
fn boundary_entry(field: &str, kind: BoundaryKind) -> Value {
    use BoundaryKind::*;
    let (bc_type, bc_value): (&str, Option<&str>) = match field {
        "U" => match kind {
            Inlet => ("fixedValue", Some("uniform (1 0 0)")),
            Outlet => ("inletOutlet", Some("uniform (0 0 0)")),
            Wall | Ground => ("fixedValue", Some("uniform (0 0 0)")),
            Symmetry => ("symmetry", None),
            Generic => ("zeroGradient", None),
        },
        "p" | "p_rgh" => match kind {
            Outlet => ("fixedValue", Some("uniform 0")),
            Symmetry => ("symmetry", None),
            _ => ("zeroGradient", None),
        },
        "k" => match kind {
            Inlet => ("fixedValue", Some("uniform 0.1")),
            Wall | Ground => ("kqRWallFunction", Some("uniform 0.1")),
            Symmetry => ("symmetry", None),
            _ => ("zeroGradient", None),
        },
        "epsilon" => match kind {
            Inlet => ("fixedValue", Some("uniform 0.01")),
            Wall | Ground => ("epsilonWallFunction", Some("uniform 0.01")),
            Symmetry => ("symmetry", None),
            _ => ("zeroGradient", None),
        },
        "omega" => match kind {
            Inlet => ("fixedValue", Some("uniform 0.01")),
            Wall | Ground => ("omegaWallFunction", Some("uniform 0.01")),
            Symmetry => ("symmetry", None),
            _ => ("zeroGradient", None),
        },
        "nut" => match kind {
            Wall | Ground => ("nutkWallFunction", Some("uniform 0")),
            Symmetry => ("symmetry", None),
            _ => ("calculated", Some("uniform 0")),
        },
        "T" => match kind {
            Inlet => ("fixedValue", Some("uniform 300")),
            Symmetry => ("symmetry", None),
            _ => ("zeroGradient", None),
        },
        "alphat" => match kind {
            Wall | Ground => ("alphatJayatillekeWallFunction", Some("uniform 0")),
            Symmetry => ("symmetry", None),
            _ => ("calculated", Some("uniform 0")),
        },
        _ => ("zeroGradient", None),
    };

    let mut dict = IndexMap::new();
    dict.insert("type".to_string(), Value::entry(bc_type));
    if let Some(v) = bc_value {
        dict.insert("value".to_string(), Value::entry(v));
    }
    Value::Dict(dict)
}

/// Names of every field document built by [`field_documents`].
pub const FIELD_NAMES: [&str; 9] = [
    "U", "p", "k", "epsilon", "omega", "nut", "T", "alphat", "p_rgh",
];

/// Build one field document parameterized by the geometry set's boundary
/// metadata: one boundary entry per geometry plus the mesh-extent patch.
pub fn field_document(
    name: &str,
    geometries: &GeometrySet,
) -> Result<ConfigDocument, DocumentError> {
    let (class_tag, location, defaults) = registry_defaults(name)
        .unwrap_or(("volScalarField", Location::Zero, IndexMap::new()));

    let mut boundary = IndexMap::new();
    for geo in geometries.iter() {
        boundary.insert(geo.name().to_string(), boundary_entry(name, geo.boundary()));
    }
    boundary.insert(
        BOUNDING_BOX_PATCH.to_string(),
        boundary_entry(name, BoundaryKind::Generic),
    );

    let mut values = IndexMap::new();
    values.insert("boundaryField".to_string(), Value::Dict(boundary));
    ConfigDocument::from_defaults(name, class_tag, location, defaults, Some(values))
}

/// All recognized field documents for a geometry set.
pub fn field_documents(geometries: &GeometrySet) -> Result<Vec<ConfigDocument>, DocumentError> {
    FIELD_NAMES
        .iter()
        .map(|name| field_document(name, geometries))
        .collect()
}

/// A recognized document built purely from its default table.
pub fn default_document(name: &str) -> Result<ConfigDocument, DocumentError> {
    let (class_tag, location, defaults) = registry_defaults(name)
        .unwrap_or(("dictionary", Location::System, IndexMap::new()));
    ConfigDocument::from_defaults(name, class_tag, location, defaults, None)
}

/// Mesh-extent document covering `min`..`max` with one wall patch for the box.
pub fn block_mesh_dict(
    min: Point,
    max: Point,
    parameters: &MeshingParameters,
) -> Result<ConfigDocument, DocumentError> {
    let mut doc = default_document("blockMeshDict")?;

    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;
    let vertices = format!(
        "( ({x0} {y0} {z0}) ({x1} {y0} {z0}) ({x1} {y1} {z0}) ({x0} {y1} {z0}) \
         ({x0} {y0} {z1}) ({x1} {y0} {z1}) ({x1} {y1} {z1}) ({x0} {y1} {z1}) )"
    );

    let cell_size = parameters.cell_size_xyz.unwrap_or([1.0, 1.0, 1.0]);
    let counts: Vec<usize> = [x1 - x0, y1 - y0, z1 - z0]
        .iter()
        .zip(cell_size)
        .map(|(extent, size)| ((extent / size).ceil().max(1.0)) as usize)
        .collect();
    let grading = parameters.grading.unwrap_or([1.0, 1.0, 1.0]);

    doc.set("vertices", Value::entry(vertices));
    doc.set(
        "blocks",
        Value::entry(format!(
            "( hex (0 1 2 3 4 5 6 7) ({} {} {}) simpleGrading ({} {} {}) )",
            counts[0], counts[1], counts[2], grading[0], grading[1], grading[2]
        )),
    );
    doc.set(
        "boundary",
        Value::entry(format!(
            "( {BOUNDING_BOX_PATCH} {{ type wall; faces ( (0 3 2 1) (4 5 6 7) (0 1 5 4) \
             (2 3 7 6) (1 2 6 5) (0 4 7 3) ); }} )"
        )),
    );
    Ok(doc)
}

/// Surface-refinement document declaring the merged surface file and one
/// refinement-surface entry per geometry.
pub fn snappy_hex_mesh_dict(
    surface_name: &str,
    geometries: &GeometrySet,
    parameters: &MeshingParameters,
) -> Result<ConfigDocument, DocumentError> {
    let mut doc = default_document("snappyHexMeshDict")?;

    doc.insert_at(
        &["geometry"],
        format!("{surface_name}.stl"),
        Value::dict([
            ("type", Value::entry("triSurfaceMesh")),
            ("name", Value::entry(surface_name)),
        ]),
    )?;

    for geo in geometries.iter() {
        doc.insert_at(
            &["castellatedMeshControls", "refinementSurfaces"],
            geo.name(),
            Value::dict([("level", Value::entry("(2 2)"))]),
        )?;
    }

    if let Some([x, y, z]) = parameters.location_in_mesh {
        doc.insert_at(
            &["castellatedMeshControls"],
            "locationInMesh",
            Value::entry(format!("({x} {y} {z})")),
        )?;
    }
    Ok(doc)
}

/// Surface file base names declared by the meshing document's geometry block.
pub fn declared_surface_names(meshing: &ConfigDocument) -> Vec<String> {
    meshing
        .get("geometry")
        .and_then(Value::as_dict)
        .map(|dict| {
            dict.keys()
                .map(|key| key.trim_end_matches(".stl").to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Refinement-region names declared by the meshing document.
pub fn declared_refinement_names(meshing: &ConfigDocument) -> Vec<String> {
    meshing
        .lookup(&["castellatedMeshControls", "refinementRegions"])
        .and_then(Value::as_dict)
        .map(|dict| dict.keys().cloned().collect())
        .unwrap_or_default()
}

/// The declared refinement mode of a region, when present and well-formed.
pub fn declared_refinement_mode(meshing: &ConfigDocument, name: &str) -> Option<RefinementMode> {
    let region = meshing
        .lookup(&["castellatedMeshControls", "refinementRegions", name])?
        .as_dict()?;
    let mode = region.get("mode")?.as_entry()?;
    let levels = region.get("levels")?.as_entry()?;
    RefinementMode::from_entries(mode, levels).ok()
}

/// Register a refinement region in the meshing document: one geometry entry
/// for its surface file plus one refinementRegions entry carrying its mode.
pub fn register_refinement_region(
    meshing: &mut ConfigDocument,
    region: &RefinementRegion,
) -> Result<(), DocumentError> {
    meshing.insert_at(
        &["geometry"],
        format!("{}.stl", region.name()),
        Value::dict([
            ("type", Value::entry("triSurfaceMesh")),
            ("name", Value::entry(region.name())),
        ]),
    )?;
    meshing.insert_at(
        &["castellatedMeshControls", "refinementRegions"],
        region.name(),
        Value::dict([
            ("mode", Value::entry(region.mode().mode_keyword())),
            ("levels", Value::entry(region.mode().levels_text())),
        ]),
    )
}

/// Subdomain count declared by a decomposition document.
pub fn declared_subdomains(decompose: &ConfigDocument) -> Option<usize> {
    decompose
        .get("numberOfSubdomains")
        .and_then(Value::as_entry)
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geometry::{box_triangles, SurfaceGeometry};
    use tempfile::TempDir;

    fn sample_set() -> GeometrySet {
        GeometrySet::new(vec![
            SurfaceGeometry::new(
                "inlet",
                BoundaryKind::Inlet,
                box_triangles([0.0; 3], [1.0; 3]),
            ),
            SurfaceGeometry::new(
                "body",
                BoundaryKind::Wall,
                box_triangles([1.0; 3], [2.0; 3]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_field_document_has_entry_per_geometry() {
        let doc = field_document("U", &sample_set()).unwrap();
        let boundary = doc.get("boundaryField").unwrap().as_dict().unwrap();

        assert!(boundary.contains_key("inlet"));
        assert!(boundary.contains_key("body"));
        assert!(boundary.contains_key(BOUNDING_BOX_PATCH));

        let inlet = boundary.get("inlet").unwrap().as_dict().unwrap();
        assert_eq!(inlet.get("type").unwrap().as_entry(), Some("fixedValue"));
        let body = boundary.get("body").unwrap().as_dict().unwrap();
        assert_eq!(body.get("type").unwrap().as_entry(), Some("fixedValue"));
    }

    #[test]
    fn test_registry_covers_every_field() {
        for name in FIELD_NAMES {
            assert!(registry_defaults(name).is_some(), "missing defaults: {name}");
        }
    }

    #[test]
    fn test_block_mesh_dict_cell_counts() {
        let parameters = MeshingParameters {
            cell_size_xyz: Some([0.5, 0.5, 0.5]),
            ..Default::default()
        };
        let doc = block_mesh_dict([0.0, 0.0, 0.0], [2.0, 1.0, 1.0], &parameters).unwrap();
        let blocks = doc.get("blocks").unwrap().as_entry().unwrap();
        assert!(blocks.contains("(4 2 2)"), "unexpected blocks: {blocks}");
    }

    #[test]
    fn test_snappy_dict_declares_surfaces_and_regions() {
        let set = sample_set();
        let mut doc = snappy_hex_mesh_dict("duct", &set, &MeshingParameters::default()).unwrap();
        assert_eq!(declared_surface_names(&doc), vec!["duct"]);

        let region = RefinementRegion::new(
            "wake",
            RefinementMode::Inside(4),
            box_triangles([0.0; 3], [1.0; 3]),
        )
        .unwrap();
        register_refinement_region(&mut doc, &region).unwrap();

        assert!(declared_refinement_names(&doc).contains(&"wake".to_string()));
        assert_eq!(
            declared_refinement_mode(&doc, "wake"),
            Some(RefinementMode::Inside(4))
        );
        // the region surface is also declared as loadable geometry
        assert!(declared_surface_names(&doc).contains(&"wake".to_string()));
    }

    #[test]
    fn test_document_from_file_recognized_and_generic() {
        let temp = TempDir::new().unwrap();
        let root = camino::Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let saved = default_document("controlDict").unwrap();
        let path = saved.save(&root).unwrap();
        let loaded = document_from_file(&path).unwrap();
        assert_eq!(loaded.name(), "controlDict");
        assert_eq!(loaded.location(), Location::System);
        assert_eq!(
            loaded.get("application").unwrap().as_entry(),
            Some("simpleFoam")
        );

        // unrecognized name round-trips as an opaque key/value blob
        let zero = root.join("0");
        fs::create_dir_all(&zero).unwrap();
        let custom = zero.join("customThing");
        fs::write(&custom, "answer 42;\n").unwrap();
        let generic = document_from_file(&custom).unwrap();
        assert_eq!(generic.name(), "customThing");
        assert_eq!(generic.location(), Location::Zero);
        assert!(generic.default_values().is_empty());
        assert_eq!(generic.get("answer").unwrap().as_entry(), Some("42"));
    }

    #[test]
    fn test_declared_subdomains() {
        let mut doc = default_document("decomposeParDict").unwrap();
        assert_eq!(declared_subdomains(&doc), Some(2));
        doc.set("numberOfSubdomains", Value::entry("8"));
        assert_eq!(declared_subdomains(&doc), Some(8));
    }
}
