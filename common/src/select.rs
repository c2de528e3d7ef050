//! Deciding which directory entries get collected

use chrono::{DateTime, Utc};

use crate::window::TimeWindow;

/// Suffix of log files the producing process is still writing to
pub const ACTIVE_LOG_SUFFIX: &str = ".tmp";

/// Modification and creation time of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
}

impl FileTimes {
    /// Reads both timestamps from `metadata`.
    ///
    /// Not every platform (or filesystem) records a birth time; in that case the creation time
    /// falls back to the modification time. A file is then selected as long as it was last
    /// written inside the window, which only loses precision for files created after the window
    /// ended but still modified.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> std::io::Result<Self> {
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);
        Ok(Self {
            modified: modified.into(),
            created: created.into(),
        })
    }
}

/// A directory entry considered for collection
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: std::ffi::OsString,
    pub is_dir: bool,
    pub times: FileTimes,
}

impl Candidate {
    pub fn from_metadata(
        name: std::ffi::OsString,
        metadata: &std::fs::Metadata,
    ) -> std::io::Result<Self> {
        Ok(Self {
            name,
            is_dir: metadata.is_dir(),
            times: FileTimes::from_metadata(metadata)?,
        })
    }

    /// True if the file was being written during `window` and hasn't been finalized yet.
    ///
    /// The file must have been modified after the window started and created before it ended.
    /// Both comparisons are strict. Directories never qualify.
    pub fn qualifies(&self, window: &TimeWindow) -> bool {
        !self.is_dir
            && self.times.modified > window.start()
            && self.times.created < window.end()
            && self.name.to_string_lossy().ends_with(ACTIVE_LOG_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    const HOUR: std::time::Duration = std::time::Duration::from_secs(3600);

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn candidate(name: &str, modified: DateTime<Utc>, created: DateTime<Utc>) -> Candidate {
        Candidate {
            name: name.into(),
            is_dir: false,
            times: FileTimes { modified, created },
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::parse("2024-01-01 00:00:00", HOUR).unwrap()
    }

    #[test]
    fn active_log_written_during_window_is_selected() {
        let file = candidate(
            "app.tmp",
            utc(2024, 1, 1, 0, 30, 0),
            utc(2023, 12, 31, 23, 0, 0),
        );
        assert!(file.qualifies(&window()));
    }

    #[test]
    fn finalized_log_is_not_selected() {
        let file = candidate(
            "app.log",
            utc(2024, 1, 1, 0, 30, 0),
            utc(2023, 12, 31, 23, 0, 0),
        );
        assert!(!file.qualifies(&window()));
    }

    #[test]
    fn suffix_must_be_at_the_end() {
        let file = candidate(
            "app.tmp.log",
            utc(2024, 1, 1, 0, 30, 0),
            utc(2023, 12, 31, 23, 0, 0),
        );
        assert!(!file.qualifies(&window()));
    }

    #[test]
    fn bounds_are_strict() {
        let window = window();
        // modified exactly at the start
        assert!(!candidate("a.tmp", window.start(), window.start()).qualifies(&window));
        // created exactly at the end
        assert!(!candidate("a.tmp", window.end(), window.end()).qualifies(&window));
    }

    #[test]
    fn file_untouched_since_before_window_is_not_selected() {
        let file = candidate(
            "app.tmp",
            utc(2023, 12, 31, 23, 59, 59),
            utc(2023, 12, 31, 23, 0, 0),
        );
        assert!(!file.qualifies(&window()));
    }

    #[test]
    fn file_created_after_window_is_not_selected() {
        let file = candidate(
            "app.tmp",
            utc(2024, 1, 1, 2, 0, 0),
            utc(2024, 1, 1, 1, 30, 0),
        );
        assert!(!file.qualifies(&window()));
    }

    #[test]
    fn directories_are_never_selected() {
        let mut dir = candidate(
            "logs.tmp",
            utc(2024, 1, 1, 0, 30, 0),
            utc(2023, 12, 31, 23, 0, 0),
        );
        dir.is_dir = true;
        assert!(!dir.qualifies(&window()));
    }

    #[test]
    fn times_come_from_metadata() -> Result<(), anyhow::Error> {
        let tmp_dir = std::env::temp_dir().join(format!("rlogsync_select{}", std::process::id()));
        std::fs::create_dir_all(&tmp_dir)?;
        let path = tmp_dir.join("times.tmp");
        std::fs::write(&path, "x")?;
        let modified = filetime::FileTime::from_unix_time(1_704_069_000, 0);
        filetime::set_file_mtime(&path, modified)?;
        let times = FileTimes::from_metadata(&std::fs::metadata(&path)?)?;
        assert_eq!(times.modified, utc(2024, 1, 1, 0, 30, 0));
        std::fs::remove_dir_all(&tmp_dir)?;
        Ok(())
    }

    proptest! {
        #[test]
        fn selected_iff_all_conditions_hold(
            modified_offset in -7200i64..7200,
            created_offset in -7200i64..7200,
            is_dir in any::<bool>(),
            stem in "[a-z]{1,8}",
            ext in prop::sample::select(vec![".tmp", ".log", ".tmp.gz", ""]),
        ) {
            let window = window();
            let modified = window.start() + chrono::TimeDelta::seconds(modified_offset);
            let created = window.start() + chrono::TimeDelta::seconds(created_offset);
            let name = format!("{stem}{ext}");
            let file = Candidate {
                name: name.clone().into(),
                is_dir,
                times: FileTimes { modified, created },
            };
            let expected = !is_dir
                && name.ends_with(".tmp")
                && modified > window.start()
                && created < window.end();
            prop_assert_eq!(file.qualifies(&window), expected);
        }
    }
}
