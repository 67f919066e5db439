use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::demand::DemandPanel;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the panel as a JSON object, replacing `path` only once the whole
/// document has been written.
pub fn write_panel(panel: &DemandPanel, path: impl AsRef<Path>, pretty: bool) -> Result<(), PersistError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
    }

    let staging = staging_path(path);
    let file = File::create(&staging).map_err(|e| PersistError::io(&staging, e))?;
    let mut writer = BufWriter::new(file);

    let written = if pretty {
        serde_json::to_writer_pretty(&mut writer, panel)
    } else {
        serde_json::to_writer(&mut writer, panel)
    };

    if let Err(e) = written {
        drop(writer);
        let _ = fs::remove_file(&staging);
        return Err(PersistError::json(path, e));
    }

    let flushed = writer.flush();
    drop(writer);

    flushed
        .and_then(|_| fs::rename(&staging, path))
        .map_err(|e| {
            let _ = fs::remove_file(&staging);
            PersistError::io(path, e)
        })
}

/// Write the panel and report the outcome. Never fails the caller.
pub fn persist_panel(panel: &DemandPanel, path: impl AsRef<Path>, pretty: bool) -> bool {
    let path = path.as_ref();

    match write_panel(panel, path, pretty) {
        Ok(()) => {
            info!("Demand panel for {} bidders saved to {}", panel.len(), path.display());
            true
        }
        Err(e) => {
            error!("Failed to save demand panel: {}", e);
            false
        }
    }
}

pub fn read_panel(path: impl AsRef<Path>) -> Result<DemandPanel, PersistError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PersistError::io(path, e))?;

    serde_json::from_reader(BufReader::new(file)).map_err(|e| PersistError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::RoundDemand;

    fn sample_panel() -> DemandPanel {
        let mut panel = DemandPanel::new();
        panel.insert(
            "X".to_string(),
            vec![
                RoundDemand {
                    round: 1,
                    quantities: vec![10, 3],
                    prices: vec![500, 200],
                    rivals_quantities: vec![0, 4],
                },
                RoundDemand {
                    round: 2,
                    quantities: vec![8, 0],
                    prices: vec![400, 0],
                    rivals_quantities: vec![1, 0],
                },
            ],
        );
        panel.insert("A".to_string(), vec![RoundDemand::empty(3, 1)]);
        panel
    }

    #[test]
    fn test_written_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demand.json");

        write_panel(&sample_panel(), &path, false).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            r#"{"X":[[1,[10,3],[500,200],[0,4]],[2,[8,0],[400,0],[1,0]]],"A":[[3,[0],[0],[0]]]}"#
        );
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn test_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("demand.json");
        let panel = sample_panel();

        write_panel(&panel, &path, true).unwrap();
        let loaded = read_panel(&path).unwrap();

        assert_eq!(loaded, panel);
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["X", "A"]);
    }

    #[test]
    fn test_persist_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        assert!(!persist_panel(&sample_panel(), blocker.join("demand.json"), false));
        assert!(persist_panel(&sample_panel(), dir.path().join("ok.json"), false));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_panel("/nonexistent/demand.json").unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }
}
