// foamcase - OpenFOAM case lifecycle and execution engine
//
// This is the library crate: structured configuration documents, geometry
// bookkeeping, snapshot management and external solver dispatch. There is no
// binary; callers embed the library.

pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use models::{
    BoundaryKind, ConfigDocument, GeometrySet, Location, MeshingParameters, RefinementMode,
    RefinementRegion, SurfaceGeometry, TunnelParameters, Value,
};
pub use services::{
    CaseModel, CleanupOutcome, ExecutionEngine, ParallelSpec, PurgeOptions, RunReport, RunStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
