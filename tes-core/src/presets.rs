//! Disk persistence for named spline presets: `POST /api/spline/preset/store`
//! writes `<presets_dir>/<name>.yaml`; `AppState::builder().build()` loads
//! whatever is already on disk back into memory at startup.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::error::Result;
use crate::spline::Point;

fn preset_path(dir: &str, name: &str) -> PathBuf {
    Path::new(dir).join(format!("{name}.yaml"))
}

/// Writes `points` to `<dir>/<name>.yaml`, creating `dir` if it doesn't
/// exist yet.
pub fn save(dir: &str, name: &str, points: &[Point]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let yaml = serde_yaml::to_string(points).map_err(|e| crate::error::Error::internal(format!("preset encode: {e}")))?;
    std::fs::write(preset_path(dir, name), yaml)?;
    Ok(())
}

/// Loads every `<dir>/*.yaml` file into a fresh map, keyed by file stem.
/// A missing `dir` (first boot, nothing stored yet) yields an empty map
/// rather than an error; a present-but-unparseable file is skipped and
/// logged rather than failing startup over one corrupt preset.
#[must_use]
pub fn load_all(dir: &str) -> DashMap<String, Vec<Point>> {
    let map = DashMap::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return map;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match std::fs::read_to_string(&path).map(|s| serde_yaml::from_str::<Vec<Point>>(&s)) {
            Ok(Ok(points)) => {
                map.insert(name.to_string(), points);
            }
            _ => tracing::warn!(path = %path.display(), "skipping unreadable spline preset"),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_preset_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap();
        let points = vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 2.0 }];

        save(dir_path, "demo", &points).unwrap();
        let loaded = load_all(dir_path);
        assert_eq!(loaded.get("demo").unwrap().value(), &points);
    }

    #[test]
    fn missing_directory_loads_as_empty() {
        let loaded = load_all("/nonexistent/path/that/should/not/exist");
        assert!(loaded.is_empty());
    }
}
