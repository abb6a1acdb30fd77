//! Data models for OpenFOAM cases.
//!
//! This module contains the building blocks the case services are assembled from:
//! - [`ConfigDocument`]: one structured dictionary file (field, constant or system
//!   folder) with declared defaults, merge semantics and lossless serialization
//! - [`GeometrySet`]: validated collection of boundary-carrying surface geometries
//! - [`RefinementRegion`]: named geometric region with a mesh-density policy
//! - [`defaults`]: the per-document default tables and the name-to-defaults
//!   registry used when parsing on-disk documents
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Ordered**: every key/value mapping is an `IndexMap` so serialization
//!   reproduces the declared key order
//! - **Validated at construction**: invalid names, empty surfaces and
//!   non-positive tunnel parameters are rejected before any file is touched
//! - **Cloneable**: a case is duplicated by cloning its documents and geometries

pub mod defaults;
pub mod document;
pub mod geometry;

pub use defaults::MeshingParameters;
pub use document::{ConfigDocument, DocumentError, Location, Value};
pub use geometry::{
    box_triangles, BoundaryKind, GeometryError, GeometrySet, Point, RefinementMode,
    RefinementRegion, SurfaceGeometry, Triangle, TunnelParameters,
};
