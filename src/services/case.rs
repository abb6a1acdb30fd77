//! The case aggregate: one simulation project on disk.
//!
//! A [`CaseModel`] owns a geometry set, a refinement-region list and an
//! ordered document map, and knows the canonical folder layout it saves
//! into. Solver tools run against the saved folder through the execution
//! engine; mesh snapshots are managed through the snapshot functions with
//! the case supplying the paths.

use crate::models::defaults::{self, MeshingParameters};
use crate::models::document::{is_valid_name, ConfigDocument, Location};
use crate::models::geometry::{GeometrySet, Point, RefinementRegion, SurfaceGeometry};
use crate::services::execution::{ExecutionEngine, ParallelSpec, RunReport};
use crate::services::snapshot::{
    self, CleanupOutcome, MESH_DESCRIPTION_DIR,
};
use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::sync::LazyLock;
use thiserror::Error;

/// Canonical sub-folders of a saved case, created in this order.
pub const SUBFOLDERS: [&str; 6] = [
    "0",
    "constant",
    "constant/polyMesh",
    "constant/triSurface",
    "system",
    "log",
];

const MESHING_DOC: &str = "snappyHexMeshDict";
const DECOMPOSE_DOC: &str = "decomposeParDict";
const POST_PROCESSING_DIR: &str = "postProcessing";
/// Entry count of a background mesh description: points, faces, owner,
/// neighbour, boundary.
const PLAIN_MESH_FILES: usize = 5;

#[derive(Error, Debug)]
pub enum CaseError {
    /// Project names become folder names and patch prefixes, so they are
    /// restricted to ASCII alphanumerics and underscores.
    #[error("invalid project name: {0:?}")]
    InvalidProjectName(String),

    #[error("case has no document named {0:?}")]
    MissingDocument(String),

    #[error("{command} failed: {error}")]
    CommandFailed { command: String, error: String },

    #[error("marker {marker:?} not found in {path}")]
    LogParse { marker: String, path: Utf8PathBuf },
}

/// Which artifact groups [`CaseModel::purge`] removes.
///
/// The default clears the live mesh content and the mesh snapshots while
/// keeping solver results and post-processing output.
#[derive(Debug, Clone, Copy)]
pub struct PurgeOptions {
    pub mesh_content: bool,
    pub mesh_snapshots: bool,
    pub result_folders: bool,
    pub post_processing: bool,
}

impl Default for PurgeOptions {
    fn default() -> Self {
        Self {
            mesh_content: true,
            mesh_snapshots: true,
            result_folders: false,
            post_processing: false,
        }
    }
}

/// An in-memory simulation case.
#[derive(Debug, Clone)]
pub struct CaseModel {
    project_name: String,
    working_dir: Utf8PathBuf,
    geometries: GeometrySet,
    refinement_regions: Vec<RefinementRegion>,
    documents: IndexMap<String, ConfigDocument>,
    /// Base name of the surface file the case was loaded from, when it
    /// differs from the project name. Saving reuses it so the meshing
    /// document's geometry entry keeps pointing at the right file.
    original_name: Option<String>,
}

impl CaseModel {
    /// Low-level constructor from an explicit document list.
    pub fn new(
        project_name: impl Into<String>,
        geometries: GeometrySet,
        documents: Vec<ConfigDocument>,
    ) -> Result<Self> {
        let project_name = project_name.into();
        if !is_valid_name(&project_name) {
            bail!(CaseError::InvalidProjectName(project_name));
        }
        let documents = documents
            .into_iter()
            .map(|doc| (doc.name().to_string(), doc))
            .collect();
        Ok(Self {
            project_name,
            working_dir: default_working_dir(),
            geometries,
            refinement_regions: Vec::new(),
            documents,
            original_name: None,
        })
    }

    /// Build a complete case from a geometry set: every recognized field
    /// document parameterized by the geometries' boundary metadata, the
    /// solver and scheme documents from their default tables, and the two
    /// meshing documents. The mesh extent falls back to the set's bounding
    /// box when not supplied. The result is runnable without further edits.
    pub fn from_geometries(
        project_name: impl Into<String>,
        geometries: GeometrySet,
        mesh_extent: Option<(Point, Point)>,
        parameters: &MeshingParameters,
    ) -> Result<Self> {
        let project_name = project_name.into();
        let mut documents = defaults::field_documents(&geometries)?;
        for name in [
            "turbulenceProperties",
            "transportProperties",
            "g",
            "controlDict",
            "fvSchemes",
            "fvSolution",
            "probes",
            DECOMPOSE_DOC,
        ] {
            documents.push(defaults::default_document(name)?);
        }
        if let Some((min, max)) = mesh_extent.or_else(|| geometries.bounding_box(None)) {
            documents.push(defaults::block_mesh_dict(min, max, parameters)?);
        }
        documents.push(defaults::snappy_hex_mesh_dict(
            &project_name,
            &geometries,
            parameters,
        )?);
        Self::new(project_name, geometries, documents)
    }

    /// Reconstruct a case from a saved folder.
    ///
    /// Documents are read from the `0`, `constant` and `system` folders
    /// through the registry; unparsable files are logged and skipped. The
    /// meshing document must be present: surface files are split into
    /// refinement regions and plain geometries using its declarations, with
    /// refinement names checked first. `name` overrides the folder name as
    /// the project name.
    pub fn from_folder(folder: &Utf8Path, name: Option<&str>) -> Result<Self> {
        let project_name = name
            .map(str::to_string)
            .unwrap_or_else(|| folder.file_name().unwrap_or_default().to_string());
        if !is_valid_name(&project_name) {
            bail!(CaseError::InvalidProjectName(project_name));
        }

        let mut documents = IndexMap::new();
        for location in [Location::Zero, Location::Constant, Location::System] {
            let dir = folder.join(location.as_str());
            if !dir.is_dir() {
                continue;
            }
            let entries = dir
                .read_dir_utf8()
                .with_context(|| format!("failed to list {dir}"))?;
            for entry in entries {
                let entry = entry.with_context(|| format!("failed to read an entry of {dir}"))?;
                if !entry.path().is_file() {
                    continue;
                }
                match defaults::document_from_file(entry.path()) {
                    Ok(doc) => {
                        documents.insert(doc.name().to_string(), doc);
                    }
                    Err(err) => {
                        tracing::warn!("skipping unreadable document {}: {}", entry.path(), err);
                    }
                }
            }
        }

        let Some(meshing) = documents.get(MESHING_DOC) else {
            bail!(CaseError::MissingDocument(MESHING_DOC.to_string()));
        };
        let refinement_names = defaults::declared_refinement_names(meshing);
        let surface_names = defaults::declared_surface_names(meshing);

        let mut geometries = Vec::new();
        let mut refinement_regions = Vec::new();
        let mut original_name = None;
        let trisurface = folder.join("constant/triSurface");
        if trisurface.is_dir() {
            let entries = trisurface
                .read_dir_utf8()
                .with_context(|| format!("failed to list {trisurface}"))?;
            for entry in entries {
                let entry =
                    entry.with_context(|| format!("failed to read an entry of {trisurface}"))?;
                let path = entry.path();
                if path.extension() != Some("stl") {
                    continue;
                }
                let stem = path.file_stem().unwrap_or_default().to_string();
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read surface file {path}"))?;
                let solids = SurfaceGeometry::from_surface_text(&text)
                    .with_context(|| format!("failed to parse surface file {path}"))?;

                if refinement_names.contains(&stem) {
                    let mode = documents
                        .get(MESHING_DOC)
                        .and_then(|doc| defaults::declared_refinement_mode(doc, &stem))
                        .unwrap_or(crate::models::geometry::RefinementMode::Inside(3));
                    let triangles = solids
                        .iter()
                        .flat_map(|geo| geo.triangles().iter().cloned())
                        .collect();
                    refinement_regions.push(RefinementRegion::new(stem, mode, triangles)?);
                } else if surface_names.contains(&stem) {
                    if stem != project_name {
                        original_name = Some(stem);
                    }
                    geometries.extend(solids);
                } else {
                    // only surfaces the meshing document declares belong to
                    // the case
                    tracing::warn!("skipping undeclared surface file {}", path);
                }
            }
        }

        let working_dir = folder
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(default_working_dir);

        Ok(Self {
            project_name,
            working_dir,
            geometries: GeometrySet::new(geometries)?,
            refinement_regions,
            documents,
            original_name,
        })
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn geometries(&self) -> &GeometrySet {
        &self.geometries
    }

    pub fn refinement_regions(&self) -> &[RefinementRegion] {
        &self.refinement_regions
    }

    /// Folder the saved case lives in: `<working_dir>/<project_name>`.
    pub fn project_dir(&self) -> Utf8PathBuf {
        self.working_dir.join(&self.project_name)
    }

    pub fn set_working_dir(&mut self, dir: impl Into<Utf8PathBuf>) {
        self.working_dir = dir.into();
    }

    pub fn zero_folder(&self) -> Utf8PathBuf {
        self.project_dir().join("0")
    }

    pub fn constant_folder(&self) -> Utf8PathBuf {
        self.project_dir().join("constant")
    }

    pub fn system_folder(&self) -> Utf8PathBuf {
        self.project_dir().join("system")
    }

    pub fn log_folder(&self) -> Utf8PathBuf {
        self.project_dir().join("log")
    }

    pub fn polymesh_folder(&self) -> Utf8PathBuf {
        self.constant_folder().join(MESH_DESCRIPTION_DIR)
    }

    pub fn trisurface_folder(&self) -> Utf8PathBuf {
        self.constant_folder().join("triSurface")
    }

    pub fn post_processing_folder(&self) -> Utf8PathBuf {
        self.project_dir().join(POST_PROCESSING_DIR)
    }

    pub fn document(&self, name: &str) -> Option<&ConfigDocument> {
        self.documents.get(name)
    }

    pub fn document_mut(&mut self, name: &str) -> Option<&mut ConfigDocument> {
        self.documents.get_mut(name)
    }

    pub fn documents(&self) -> impl Iterator<Item = &ConfigDocument> {
        self.documents.values()
    }

    pub fn documents_in(&self, location: Location) -> impl Iterator<Item = &ConfigDocument> {
        self.documents
            .values()
            .filter(move |doc| doc.location() == location)
    }

    /// Base name of the merged surface file this case saves.
    pub fn surface_file_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.project_name)
    }

    /// Register a refinement region: its surface file is written next to the
    /// geometries on save, and the meshing document gains matching geometry
    /// and refinement entries.
    pub fn add_refinement_region(&mut self, region: RefinementRegion) -> Result<()> {
        let Some(meshing) = self.documents.get_mut(MESHING_DOC) else {
            bail!(CaseError::MissingDocument(MESHING_DOC.to_string()));
        };
        defaults::register_refinement_region(meshing, &region)?;
        self.refinement_regions.push(region);
        Ok(())
    }

    /// Write the case to `<working_dir>/<project_name>`.
    ///
    /// With `overwrite` the existing project folder is removed first, best
    /// effort; otherwise documents are rewritten in place and everything
    /// else in the folder is left alone.
    pub fn save(&self, overwrite: bool) -> Result<Utf8PathBuf> {
        let project_dir = self.project_dir();
        if overwrite && project_dir.exists() {
            if let Err(err) = fs::remove_dir_all(&project_dir) {
                tracing::warn!("failed to remove {}: {}", project_dir, err);
            }
        }
        for sub in SUBFOLDERS {
            let dir = project_dir.join(sub);
            fs::create_dir_all(&dir).with_context(|| format!("failed to create {dir}"))?;
        }

        if !self.geometries.is_empty() {
            let surface = self
                .trisurface_folder()
                .join(format!("{}.stl", self.surface_file_name()));
            fs::write(&surface, self.geometries.merged_surface_text())
                .with_context(|| format!("failed to write surface file {surface}"))?;
        }
        for region in &self.refinement_regions {
            region.write_surface(&self.trisurface_folder())?;
        }

        for doc in self.documents.values() {
            doc.save(&project_dir)
                .with_context(|| format!("failed to save document {}", doc.name()))?;
        }

        tracing::info!("saved case {} to {}", self.project_name, project_dir);
        Ok(project_dir)
    }

    /// Best-effort removal of generated artifacts, one outcome per entry.
    pub fn purge(&self, options: &PurgeOptions) -> Result<Vec<CleanupOutcome>> {
        let project_dir = self.project_dir();
        let mut outcomes = Vec::new();

        if options.mesh_content {
            outcomes.extend(snapshot::clear_mesh_content(&self.polymesh_folder()));
        }
        if options.mesh_snapshots {
            // frozen snapshots come back under their numeric names first so
            // one pass removes them all
            if let Err(err) = snapshot::restore_snapshots(&project_dir) {
                tracing::warn!("failed to restore frozen snapshots: {}", err);
            }
            let folders = snapshot::numbered_mesh_folders(&project_dir)?;
            outcomes.extend(snapshot::remove_folders(&project_dir, &folders));
        }
        if options.result_folders {
            let folders = snapshot::numbered_result_folders(&project_dir)?;
            outcomes.extend(snapshot::remove_folders(&project_dir, &folders));
        }
        if options.post_processing {
            let dir = self.post_processing_folder();
            if dir.exists() {
                outcomes.push(match fs::remove_dir_all(&dir) {
                    Ok(()) => CleanupOutcome::removed(dir),
                    Err(err) => CleanupOutcome::failed(dir, err),
                });
            }
        }
        Ok(outcomes)
    }

    /// Execution engine bound to this case's folders.
    pub fn engine(&self) -> ExecutionEngine {
        ExecutionEngine::new(self.project_dir(), self.log_folder())
    }

    /// Parallel run specification from the decomposition document, when the
    /// case carries one with a usable subdomain count.
    pub fn parallel_spec(&self) -> Option<ParallelSpec> {
        let subdomains = defaults::declared_subdomains(self.documents.get(DECOMPOSE_DOC)?)?;
        (subdomains > 1).then_some(ParallelSpec { subdomains })
    }

    /// Numbered mesh-snapshot folders of the saved case.
    pub fn mesh_snapshot_folders(&self) -> Result<Vec<String>> {
        snapshot::numbered_mesh_folders(&self.project_dir())
    }

    /// Numbered result folders of the saved case.
    pub fn result_folders(&self) -> Result<Vec<String>> {
        snapshot::numbered_result_folders(&self.project_dir())
    }

    /// Whether the live mesh description came from surface refinement.
    ///
    /// A plain background mesh writes exactly five description files
    /// (points, faces, owner, neighbour, boundary); refinement leaves extra
    /// level files alongside them. Read-only: a missing live mesh folder
    /// simply means no refined mesh.
    pub fn has_refined_mesh(&self) -> Result<bool> {
        let dir = self.polymesh_folder();
        if !dir.is_dir() {
            return Ok(false);
        }
        let entries = dir
            .read_dir_utf8()
            .with_context(|| format!("failed to list {dir}"))?;
        let mut count = 0usize;
        for entry in entries {
            entry.with_context(|| format!("failed to read an entry of {dir}"))?;
            count += 1;
        }
        Ok(count > PLAIN_MESH_FILES)
    }

    /// Freeze mesh snapshots so result discovery cannot mistake them for
    /// solver output.
    pub fn freeze_mesh_snapshots(&self) -> Result<Vec<Utf8PathBuf>> {
        snapshot::freeze_snapshots(&self.project_dir())
    }

    pub fn restore_mesh_snapshots(&self) -> Result<Vec<Utf8PathBuf>> {
        snapshot::restore_snapshots(&self.project_dir())
    }

    /// Copy a snapshot's mesh description into the live mesh folder; the
    /// highest-numbered snapshot when `folder` is `None`.
    pub fn promote_mesh_snapshot(
        &self,
        folder: Option<u64>,
        clear_first: bool,
    ) -> Result<Utf8PathBuf> {
        snapshot::promote_latest(
            &self.project_dir(),
            &self.polymesh_folder(),
            folder,
            clear_first,
        )
    }

    /// Run the background-mesh tool. With `overwrite` the live mesh content
    /// is cleared first so stale descriptions cannot leak through.
    pub async fn block_mesh(&self, overwrite: bool) -> Result<RunReport> {
        if overwrite {
            for outcome in snapshot::clear_mesh_content(&self.polymesh_folder()) {
                if let Some(error) = &outcome.error {
                    tracing::warn!("failed to clear {}: {}", outcome.path, error);
                }
            }
        }
        self.engine().run("blockMesh", &[], None).await
    }

    /// Run the surface-refinement mesher, decomposed per the decomposition
    /// document when it declares more than one subdomain.
    pub async fn snappy_hex_mesh(&self) -> Result<RunReport> {
        self.engine()
            .run("snappyHexMesh", &[], self.parallel_spec())
            .await
    }

    /// Run the mesh checker with the given extra arguments, decomposed the
    /// same way as the mesher.
    pub async fn check_mesh(&self, args: &[&str]) -> Result<RunReport> {
        self.engine()
            .run("checkMesh", args, self.parallel_spec())
            .await
    }

    /// Extract `(max, average)` mesh non-orthogonality from the mesh
    /// checker's log. With `use_current_log` an existing log is parsed as
    /// is; otherwise the checker is run first and must succeed.
    pub async fn mesh_orthogonality(&self, use_current_log: bool) -> Result<(f64, f64)> {
        let log_file = self.log_folder().join("checkMesh.log");
        let log = if use_current_log && log_file.is_file() {
            fs::read_to_string(&log_file)
                .with_context(|| format!("failed to read log file {log_file}"))?
        } else {
            let report = self.check_mesh(&["-latestTime"]).await?;
            if !report.success() {
                bail!(CaseError::CommandFailed {
                    command: report.command,
                    error: report.error.unwrap_or_default(),
                });
            }
            report.log_contents()?
        };
        match parse_orthogonality(&log) {
            Some(values) => Ok(values),
            None => bail!(CaseError::LogParse {
                marker: ORTHOGONALITY_MARKER.to_string(),
                path: log_file,
            }),
        }
    }
}

const ORTHOGONALITY_MARKER: &str = "Mesh non-orthogonality Max:";

static ORTHOGONALITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Mesh non-orthogonality Max:\s*([0-9.eE+-]+)\s+average:\s*([0-9.eE+-]+)")
        .expect("orthogonality pattern is valid")
});

/// Extract `(max, average)` non-orthogonality from a mesh-checker log.
fn parse_orthogonality(log: &str) -> Option<(f64, f64)> {
    let captures = ORTHOGONALITY_PATTERN.captures(log)?;
    let max = captures[1].parse().ok()?;
    let average = captures[2].parse().ok()?;
    Some((max, average))
}

/// `$HOME/foamcase`, the folder new cases save into unless redirected.
fn default_working_dir() -> Utf8PathBuf {
    std::env::var("HOME")
        .map(|home| Utf8PathBuf::from(home).join("foamcase"))
        .unwrap_or_else(|_| Utf8PathBuf::from("foamcase"))
}
