//! # Space Reclamation
//!
//! Keeps enough free storage for a flight log by deleting the oldest IGC
//! files, primary data directory first, then the log directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::{debug, info, warn};

use crate::config::LoggerConfig;
use crate::igc::filename::{log_file_age, log_file_is_older};

/// Free space query, in whole kilobytes
#[cfg_attr(test, mockall::automock)]
pub trait FreeSpace: Send + Sync {
    fn free_kb(&self, path: &Path) -> io::Result<u64>;
}

/// Free space of the mounted disk holding `path`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFreeSpace;

impl FreeSpace for SystemFreeSpace {
    fn free_kb(&self, path: &Path) -> io::Result<u64> {
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let disks = Disks::new_with_refreshed_list();

        // Deepest mount point containing the path
        disks
            .list()
            .iter()
            .filter(|disk| target.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().components().count())
            .map(|disk| disk.available_space() / 1024)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no disk found for {}", target.display()),
                )
            })
    }
}

/// Deletes old flight logs until a free space threshold is met
#[derive(Debug, Clone)]
pub struct SpaceReclaimer {
    data_dir: PathBuf,
    log_dir: PathBuf,
    min_free_kb: u64,
    max_attempts: u32,
}

impl SpaceReclaimer {
    pub fn new(data_dir: PathBuf, log_dir: PathBuf, min_free_kb: u64, max_attempts: u32) -> Self {
        Self {
            data_dir,
            log_dir,
            min_free_kb,
            max_attempts,
        }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(
            config.data_dir.clone(),
            config.log_dir.clone(),
            config.min_free_kb,
            config.max_reclaim_attempts,
        )
    }

    /// Free space until `min_free_kb` is available in the data directory
    ///
    /// Returns `false` when the threshold is still not met after running out
    /// of candidate files or attempts, or when free space cannot be queried.
    pub fn clear_free_space(&self, space: &dyn FreeSpace, reference_year: i32) -> bool {
        let mut attempts = 0;

        loop {
            let free_kb = match space.free_kb(&self.data_dir) {
                Ok(kb) => kb,
                Err(e) => {
                    warn!(target: "startup", "Free space query failed for {}: {}", self.data_dir.display(), e);
                    return false;
                }
            };

            if free_kb >= self.min_free_kb {
                debug!(free_kb, "Logger free space ok");
                return true;
            }

            if attempts >= self.max_attempts {
                break;
            }
            attempts += 1;

            let deleted = Self::delete_oldest_log(&self.data_dir, reference_year)
                || Self::delete_oldest_log(&self.log_dir, reference_year);
            if !deleted {
                break;
            }
        }

        warn!(
            target: "startup",
            min_free_kb = self.min_free_kb,
            attempts,
            "Logger free space not available"
        );
        false
    }

    /// Delete the oldest `*.igc` file of `dir`
    ///
    /// Returns `true` only when a file was actually removed.
    pub fn delete_oldest_log(dir: &Path, reference_year: i32) -> bool {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return false,
        };

        let mut oldest: Option<(String, PathBuf)> = None;
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_igc = Path::new(&name)
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("igc"))
                .unwrap_or(false);
            if !is_igc {
                continue;
            }

            let replace = match &oldest {
                None => true,
                Some((current, _)) => log_file_is_older(current, &name, reference_year),
            };
            if replace {
                oldest = Some((name, entry.path()));
            }
        }

        let Some((name, path)) = oldest else {
            return false;
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                info!(
                    file = %name,
                    dated = ?log_file_age(&name, reference_year),
                    "Deleted oldest flight log"
                );
                true
            }
            Err(e) => {
                warn!(target: "startup", "Could not delete {}: {}", path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"B\r\n").unwrap();
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_delete_oldest_mixed_grammars() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2023-06-01-XLK-ABC-02.IGC");
        touch(dir.path(), "35VXABC1.IGC"); // 2023-05-31, flight 1
        touch(dir.path(), "2023-06-02-XLK-ABC-01.IGC");
        touch(dir.path(), "readme.txt");

        assert!(SpaceReclaimer::delete_oldest_log(dir.path(), 2023));
        assert_eq!(
            names(dir.path()),
            vec![
                "2023-06-01-XLK-ABC-02.IGC",
                "2023-06-02-XLK-ABC-01.IGC",
                "readme.txt"
            ]
        );
    }

    #[test]
    fn test_unparseable_log_goes_first() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2001-01-01-XLK-ABC-01.IGC");
        touch(dir.path(), "mystery.igc");

        assert!(SpaceReclaimer::delete_oldest_log(dir.path(), 2023));
        assert_eq!(names(dir.path()), vec!["2001-01-01-XLK-ABC-01.IGC"]);
    }

    #[test]
    fn test_delete_oldest_without_candidates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "notes.txt");
        assert!(!SpaceReclaimer::delete_oldest_log(dir.path(), 2023));
        assert!(!SpaceReclaimer::delete_oldest_log(&dir.path().join("missing"), 2023));
    }

    #[test]
    fn test_enough_space_deletes_nothing() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2023-06-01-XLK-ABC-01.IGC");

        let mut space = MockFreeSpace::new();
        space.expect_free_kb().times(1).returning(|_| Ok(10_000));

        let reclaimer =
            SpaceReclaimer::new(dir.path().to_path_buf(), dir.path().join("logs"), 750, 100);
        assert!(reclaimer.clear_free_space(&space, 2023));
        assert_eq!(names(dir.path()).len(), 1);
    }

    #[test]
    fn test_reclaims_until_threshold() {
        let data = TempDir::new().unwrap();
        let logs = TempDir::new().unwrap();
        touch(logs.path(), "2023-06-01-XLK-ABC-01.IGC");
        touch(logs.path(), "2023-06-01-XLK-ABC-02.IGC");
        touch(logs.path(), "2023-06-01-XLK-ABC-03.IGC");

        // Each deletion frees 400 KB
        let free = Arc::new(AtomicU64::new(100));
        let mut space = MockFreeSpace::new();
        let counter = free.clone();
        space
            .expect_free_kb()
            .returning(move |_| Ok(counter.fetch_add(400, Ordering::SeqCst)));

        let reclaimer = SpaceReclaimer::new(
            data.path().to_path_buf(),
            logs.path().to_path_buf(),
            750,
            100,
        );
        assert!(reclaimer.clear_free_space(&space, 2023));
        // 100 -> 500 -> 900: two deletions, newest file kept
        assert_eq!(names(logs.path()), vec!["2023-06-01-XLK-ABC-03.IGC"]);
    }

    #[test]
    fn test_gives_up_when_nothing_left() {
        let data = TempDir::new().unwrap();
        let logs = TempDir::new().unwrap();
        touch(data.path(), "2023-06-01-XLK-ABC-01.IGC");

        let mut space = MockFreeSpace::new();
        space.expect_free_kb().returning(|_| Ok(10));

        let reclaimer = SpaceReclaimer::new(
            data.path().to_path_buf(),
            logs.path().to_path_buf(),
            750,
            100,
        );
        assert!(!reclaimer.clear_free_space(&space, 2023));
        assert!(names(data.path()).is_empty());
    }

    #[test]
    fn test_attempts_are_bounded() {
        let data = TempDir::new().unwrap();
        for day in 1..=5 {
            touch(data.path(), &format!("2023-06-{:02}-XLK-ABC-01.IGC", day));
        }

        let mut space = MockFreeSpace::new();
        space.expect_free_kb().returning(|_| Ok(0));

        let reclaimer =
            SpaceReclaimer::new(data.path().to_path_buf(), data.path().join("logs"), 750, 2);
        assert!(!reclaimer.clear_free_space(&space, 2023));
        assert_eq!(
            names(data.path()),
            vec![
                "2023-06-03-XLK-ABC-01.IGC",
                "2023-06-04-XLK-ABC-01.IGC",
                "2023-06-05-XLK-ABC-01.IGC"
            ]
        );
    }

    #[test]
    fn test_query_failure_reports_false() {
        let dir = TempDir::new().unwrap();
        let mut space = MockFreeSpace::new();
        space
            .expect_free_kb()
            .returning(|_| Err(io::Error::new(io::ErrorKind::Other, "statvfs failed")));

        let reclaimer =
            SpaceReclaimer::new(dir.path().to_path_buf(), dir.path().to_path_buf(), 750, 100);
        assert!(!reclaimer.clear_free_space(&space, 2023));
    }

    #[test]
    fn test_system_free_space_for_temp_dir() {
        let dir = TempDir::new().unwrap();
        // Some sandboxes expose no disks; only check the value when one is found
        if let Ok(kb) = SystemFreeSpace.free_kb(dir.path()) {
            assert!(kb < u64::MAX / 1024);
        }
    }
}
