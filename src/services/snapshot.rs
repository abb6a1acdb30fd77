//! Numbered-folder discovery and mesh-snapshot lifecycle.
//!
//! Pure functions over a project root. Meshing steps leave integer-named
//! folders containing a `polyMesh` subfolder (mesh snapshots); solver steps
//! leave integer-named folders without one (result folders). Listings are
//! ordered numerically, never lexically, and are snapshots of the directory
//! state - callers must re-validate existence before acting on them.

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Suffix appended to a mesh-snapshot folder to protect it from cleanup.
pub const FROZEN_SUFFIX: &str = ".org";

/// Subfolder that marks a numbered folder as a mesh snapshot.
pub const MESH_DESCRIPTION_DIR: &str = "polyMesh";

/// The authoritative mesh-recipe document spared by every content clear.
pub const MESH_RECIPE_DOC: &str = "blockMeshDict";

/// Structural errors of the snapshot lifecycle.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("{path} does not contain a mesh description")]
    MissingMeshDescription { path: Utf8PathBuf },

    #[error("no mesh snapshot folders under {path}")]
    NoSnapshots { path: Utf8PathBuf },

    #[error("cannot restore {from}: {to} already exists")]
    RestoreCollision { from: Utf8PathBuf, to: Utf8PathBuf },
}

/// Per-item result of a best-effort cleanup pass.
#[derive(Debug, Clone)]
pub struct CleanupOutcome {
    pub path: Utf8PathBuf,
    pub error: Option<String>,
}

impl CleanupOutcome {
    pub(crate) fn removed(path: Utf8PathBuf) -> Self {
        Self { path, error: None }
    }

    pub(crate) fn failed(path: Utf8PathBuf, error: impl ToString) -> Self {
        Self {
            path,
            error: Some(error.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

fn is_mesh_snapshot(path: &Utf8Path) -> bool {
    path.join(MESH_DESCRIPTION_DIR).is_dir()
}

/// Integer-named subfolders of `root`, numerically ascending.
fn numbered_dirs(root: &Utf8Path) -> Result<Vec<(u64, Utf8PathBuf)>> {
    let mut found = Vec::new();
    let entries =
        fs::read_dir(root).with_context(|| format!("failed to list project root {root}"))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read an entry of {root}"))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Ok(number) = name.parse::<u64>() else {
            continue;
        };
        let path = root.join(&name);
        if path.is_dir() {
            found.push((number, path));
        }
    }
    found.sort_by_key(|(number, _)| *number);
    Ok(found)
}

/// Numbered mesh-snapshot folders as strings, numerically ascending.
pub fn numbered_mesh_folders(root: &Utf8Path) -> Result<Vec<String>> {
    Ok(numbered_dirs(root)?
        .into_iter()
        .filter(|(_, path)| is_mesh_snapshot(path))
        .map(|(number, _)| number.to_string())
        .collect())
}

/// Numbered result folders as strings, numerically ascending.
///
/// Excludes the reserved initial folder `0` and every mesh snapshot; together
/// with [`numbered_mesh_folders`] this partitions all numbered folders.
pub fn numbered_result_folders(root: &Utf8Path) -> Result<Vec<String>> {
    Ok(numbered_dirs(root)?
        .into_iter()
        .filter(|(number, path)| *number != 0 && !is_mesh_snapshot(path))
        .map(|(number, _)| number.to_string())
        .collect())
}

/// Rename every mesh-snapshot folder to its frozen name (`N` -> `N.org`).
///
/// Frozen folders are invisible to numbered-folder discovery, protecting them
/// from being mistaken for active result folders during cleanup.
pub fn freeze_snapshots(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut frozen = Vec::new();
    for name in numbered_mesh_folders(root)? {
        let from = root.join(&name);
        let to = root.join(format!("{name}{FROZEN_SUFFIX}"));
        fs::rename(&from, &to).with_context(|| format!("failed to freeze {from} as {to}"))?;
        frozen.push(to);
    }
    Ok(frozen)
}

fn frozen_dirs(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    let entries =
        fs::read_dir(root).with_context(|| format!("failed to list project root {root}"))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read an entry of {root}"))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let Some(stem) = name.strip_suffix(FROZEN_SUFFIX) else {
            continue;
        };
        if stem.parse::<u64>().is_err() {
            continue;
        }
        let path = root.join(&name);
        if path.is_dir() && is_mesh_snapshot(&path) {
            found.push(path);
        }
    }
    Ok(found)
}

/// Rename frozen mesh-snapshot folders back to their numeric names.
///
/// A frozen folder whose numeric name already exists on disk is a structural
/// error; nothing is overwritten.
pub fn restore_snapshots(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let mut restored = Vec::new();
    for from in frozen_dirs(root)? {
        let name = from
            .file_name()
            .and_then(|n| n.strip_suffix(FROZEN_SUFFIX))
            .unwrap_or_default()
            .to_string();
        let to = root.join(&name);
        if to.exists() {
            bail!(SnapshotError::RestoreCollision { from, to });
        }
        fs::rename(&from, &to).with_context(|| format!("failed to restore {from} as {to}"))?;
        restored.push(to);
    }
    Ok(restored)
}

/// Copy a mesh description into the live mesh folder.
///
/// Takes the `polyMesh` of the explicitly named numbered folder, or of the
/// highest-numbered mesh snapshot when `folder` is `None`. With `clear_first`
/// the live folder is emptied (sparing the mesh-recipe document) before the
/// copy; clear failures are logged and do not abort the promotion.
pub fn promote_latest(
    root: &Utf8Path,
    live_mesh_dir: &Utf8Path,
    folder: Option<u64>,
    clear_first: bool,
) -> Result<Utf8PathBuf> {
    let source_folder = match folder {
        Some(number) => root.join(number.to_string()),
        None => {
            let snapshots = numbered_mesh_folders(root)?;
            let Some(last) = snapshots.last() else {
                bail!(SnapshotError::NoSnapshots {
                    path: root.to_path_buf(),
                });
            };
            root.join(last)
        }
    };

    let source = source_folder.join(MESH_DESCRIPTION_DIR);
    if !source.is_dir() {
        bail!(SnapshotError::MissingMeshDescription {
            path: source_folder,
        });
    }

    if clear_first {
        for outcome in clear_mesh_content(live_mesh_dir) {
            if let Some(error) = &outcome.error {
                tracing::warn!("failed to clear {}: {}", outcome.path, error);
            }
        }
    }

    fs::create_dir_all(live_mesh_dir)
        .with_context(|| format!("failed to create {live_mesh_dir}"))?;
    copy_tree(&source, live_mesh_dir)
        .with_context(|| format!("failed to copy {source} into {live_mesh_dir}"))?;

    tracing::info!("promoted mesh description from {}", source);
    Ok(source)
}

/// Best-effort removal of everything inside the live mesh folder except the
/// mesh-recipe document. Returns one outcome per entry.
pub fn clear_mesh_content(live_mesh_dir: &Utf8Path) -> Vec<CleanupOutcome> {
    let mut outcomes = Vec::new();
    let entries = match fs::read_dir(live_mesh_dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                return outcomes;
            }
            outcomes.push(CleanupOutcome::failed(live_mesh_dir.to_path_buf(), err));
            return outcomes;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name == MESH_RECIPE_DOC {
            continue;
        }
        let path = live_mesh_dir.join(&name);
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        outcomes.push(match result {
            Ok(()) => CleanupOutcome::removed(path),
            Err(err) => CleanupOutcome::failed(path, err),
        });
    }
    outcomes
}

/// Best-effort recursive removal of the named folders under `root`.
pub fn remove_folders(root: &Utf8Path, names: &[String]) -> Vec<CleanupOutcome> {
    names
        .iter()
        .map(|name| {
            let path = root.join(name);
            match fs::remove_dir_all(&path) {
                Ok(()) => CleanupOutcome::removed(path),
                Err(err) => CleanupOutcome::failed(path, err),
            }
        })
        .collect()
}

fn copy_tree(source: &Utf8Path, target: &Utf8Path) -> std::io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in source.read_dir_utf8()? {
        let entry = entry?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        if from.is_dir() {
            copy_tree(from, &to)?;
        } else {
            fs::copy(from, &to)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap()
    }

    fn make_mesh_folder(root: &Utf8Path, name: &str) {
        let dir = root.join(name).join(MESH_DESCRIPTION_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("points"), "()").unwrap();
    }

    fn make_result_folder(root: &Utf8Path, name: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("U"), "").unwrap();
    }

    #[test]
    fn test_numeric_ordering_not_lexical() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        for name in ["3", "10", "2"] {
            make_mesh_folder(&root, name);
        }

        assert_eq!(numbered_mesh_folders(&root).unwrap(), vec!["2", "3", "10"]);
    }

    #[test]
    fn test_mesh_and_result_folders_partition() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        make_mesh_folder(&root, "1");
        make_mesh_folder(&root, "2");
        make_result_folder(&root, "0");
        make_result_folder(&root, "5");
        make_result_folder(&root, "12");

        assert_eq!(numbered_mesh_folders(&root).unwrap(), vec!["1", "2"]);
        // "0" is reserved and never a result folder
        assert_eq!(numbered_result_folders(&root).unwrap(), vec!["5", "12"]);
    }

    #[test]
    fn test_freeze_then_restore_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        make_mesh_folder(&root, "1");
        make_mesh_folder(&root, "4");

        let frozen = freeze_snapshots(&root).unwrap();
        assert_eq!(frozen.len(), 2);
        assert!(numbered_mesh_folders(&root).unwrap().is_empty());
        assert!(root.join("1.org").is_dir());

        let restored = restore_snapshots(&root).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(numbered_mesh_folders(&root).unwrap(), vec!["1", "4"]);

        // nothing frozen left: restoring again is a no-op
        assert!(restore_snapshots(&root).unwrap().is_empty());
    }

    #[test]
    fn test_restore_collision_is_an_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        make_mesh_folder(&root, "1");
        freeze_snapshots(&root).unwrap();
        // a new folder reclaims the numeric name while the snapshot is frozen
        make_mesh_folder(&root, "1");

        let err = restore_snapshots(&root).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SnapshotError>(),
            Some(SnapshotError::RestoreCollision { .. })
        ));
        // the frozen folder is untouched
        assert!(root.join("1.org").is_dir());
    }

    #[test]
    fn test_promote_latest_copies_highest_snapshot() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        make_mesh_folder(&root, "2");
        make_mesh_folder(&root, "10");
        fs::write(
            root.join("10").join(MESH_DESCRIPTION_DIR).join("points"),
            "(latest)",
        )
        .unwrap();

        let live = root.join("constant").join(MESH_DESCRIPTION_DIR);
        fs::create_dir_all(&live).unwrap();
        fs::write(live.join(MESH_RECIPE_DOC), "recipe").unwrap();
        fs::write(live.join("stale"), "old").unwrap();

        promote_latest(&root, &live, None, true).unwrap();

        assert_eq!(fs::read_to_string(live.join("points")).unwrap(), "(latest)");
        // the recipe survives the clear, stale content does not
        assert!(live.join(MESH_RECIPE_DOC).is_file());
        assert!(!live.join("stale").exists());
    }

    #[test]
    fn test_promote_requires_mesh_description() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        make_result_folder(&root, "5");
        let live = root.join("constant").join(MESH_DESCRIPTION_DIR);

        let err = promote_latest(&root, &live, Some(5), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SnapshotError>(),
            Some(SnapshotError::MissingMeshDescription { .. })
        ));

        let err = promote_latest(&root, &live, None, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SnapshotError>(),
            Some(SnapshotError::NoSnapshots { .. })
        ));
    }

    #[test]
    fn test_clear_mesh_content_spares_recipe() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let live = root.join(MESH_DESCRIPTION_DIR);
        fs::create_dir_all(live.join("sets")).unwrap();
        fs::write(live.join(MESH_RECIPE_DOC), "recipe").unwrap();
        fs::write(live.join("faces"), "").unwrap();

        let outcomes = clear_mesh_content(&live);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(CleanupOutcome::succeeded));
        assert!(live.join(MESH_RECIPE_DOC).is_file());
        assert!(!live.join("faces").exists());
        assert!(!live.join("sets").exists());
    }

    #[test]
    fn test_remove_folders_reports_missing() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        make_result_folder(&root, "5");

        let outcomes = remove_folders(&root, &["5".to_string(), "7".to_string()]);
        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());
        assert!(!root.join("5").exists());
    }
}
