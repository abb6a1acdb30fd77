//! Integration tests for the execution engine
//!
//! These tests verify:
//! - Log and error file placement under the case log folder
//! - Success classification from the error file alone
//! - The parallel command-line wrapper
//! - Fire-and-forget dispatch

#![cfg(unix)]

use camino::Utf8PathBuf;
use foamcase::models::{box_triangles, MeshingParameters};
use foamcase::{
    BoundaryKind, CaseModel, ExecutionEngine, GeometrySet, ParallelSpec, RunStatus,
    SurfaceGeometry,
};
use std::fs;
use tempfile::TempDir;

fn engine_in(temp: &TempDir) -> ExecutionEngine {
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    ExecutionEngine::new(root.clone(), root.join("log"))
}

#[tokio::test]
async fn test_run_places_log_files_in_log_folder() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    let report = engine.run("echo", &["hello"], None).await.unwrap();
    assert_eq!(report.status, RunStatus::Succeeded);
    assert!(report.log_file.as_str().ends_with("log/echo.log"));
    assert!(report.error_file.as_str().ends_with("log/echo.err"));
    assert_eq!(fs::read_to_string(&report.log_file).unwrap(), "hello\n");
    assert_eq!(fs::read_to_string(&report.error_file).unwrap(), "");
}

#[tokio::test]
async fn test_stderr_output_fails_the_run() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    let report = engine
        .run("sh", &["-c", "echo progress; echo 'FOAM FATAL ERROR' 1>&2"], None)
        .await
        .unwrap();

    assert!(!report.success());
    assert_eq!(report.error.as_deref(), Some("FOAM FATAL ERROR\n"));
    // stdout is still captured for inspection
    assert!(report.log_contents().unwrap().contains("progress"));
}

#[tokio::test]
async fn test_rerun_truncates_previous_logs() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    engine.run("echo", &["first run output"], None).await.unwrap();
    let report = engine.run("echo", &["second"], None).await.unwrap();

    let log = report.log_contents().unwrap();
    assert_eq!(log, "second\n");
}

#[tokio::test]
async fn test_commands_run_in_working_directory() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    fs::write(temp.path().join("controlDict"), "").unwrap();
    let report = engine.run("ls", &[], None).await.unwrap();
    assert!(report.log_contents().unwrap().contains("controlDict"));
}

#[tokio::test]
async fn test_dispatch_leaves_child_to_caller() {
    let temp = TempDir::new().unwrap();
    let engine = engine_in(&temp);

    let mut dispatched = engine.dispatch("sh", &["-c", "echo done"], None).unwrap();
    let status = dispatched.child.wait().await.unwrap();
    assert!(status.success());
    assert_eq!(fs::read_to_string(&dispatched.log_file).unwrap(), "done\n");
}

#[test]
fn test_case_engine_uses_case_folders() {
    let temp = TempDir::new().unwrap();
    let mut case = CaseModel::from_geometries(
        "duct",
        GeometrySet::new(vec![SurfaceGeometry::new(
            "walls",
            BoundaryKind::Wall,
            box_triangles([0.0; 3], [1.0; 3]),
        )])
        .unwrap(),
        None,
        &MeshingParameters::default(),
    )
    .unwrap();
    case.set_working_dir(Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap());

    let engine = case.engine();
    assert_eq!(engine.log_dir(), case.log_folder());
}

#[test]
fn test_parallel_spec_reflects_decomposition() {
    let case = CaseModel::from_geometries(
        "duct",
        GeometrySet::new(vec![SurfaceGeometry::new(
            "walls",
            BoundaryKind::Wall,
            box_triangles([0.0; 3], [1.0; 3]),
        )])
        .unwrap(),
        None,
        &MeshingParameters::default(),
    )
    .unwrap();

    // default decomposition declares two subdomains
    assert_eq!(case.parallel_spec(), Some(ParallelSpec { subdomains: 2 }));
}
