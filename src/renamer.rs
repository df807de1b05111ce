//! Directory renamer — acquires one fix and tags every direct child file.
//!
//! Best-effort: a per-file failure is recorded in the report and the run
//! moves on. Only a bad target directory or a failed location acquisition
//! aborts the whole run, and acquisition failure happens before any rename.

use crate::location::{LocationError, LocationFix, LocationResolver};
use crate::tag;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fatal errors: nothing has been renamed when one of these comes back.
#[derive(Debug)]
pub enum RunError {
    InvalidTarget(PathBuf),
    Location(LocationError),
    Io(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(path) => write!(f, "Not a directory: {}", path.display()),
            Self::Location(e) => write!(f, "{}", e),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for RunError {}

impl From<LocationError> for RunError {
    fn from(e: LocationError) -> Self {
        Self::Location(e)
    }
}

/// Why a single rename failed. Never aborts the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameError {
    /// The target name already exists.
    Collision,
    PermissionDenied(String),
    Io(String),
}

impl fmt::Display for RenameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collision => write!(f, "target name already exists"),
            Self::PermissionDenied(msg) => write!(f, "permission denied: {}", msg),
            Self::Io(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Renamed { to: String },
    WouldRename { to: String },
    SkippedTagged,
    SkippedHidden,
    Failed { to: String, reason: RenameError },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Everything one invocation did (or, under dry-run, would have done).
#[derive(Debug, Serialize)]
pub struct RenameReport {
    pub directory: PathBuf,
    pub fix: LocationFix,
    pub tag: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<FileEntry>,
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RenameReport {
    fn new(directory: &Path, fix: LocationFix, tag: String, dry_run: bool) -> Self {
        Self {
            directory: directory.to_path_buf(),
            fix,
            tag,
            dry_run,
            started_at: Utc::now(),
            entries: Vec::new(),
            renamed: 0,
            skipped: 0,
            failed: 0,
        }
    }

    fn record(&mut self, name: String, outcome: Outcome) {
        match outcome {
            Outcome::Renamed { .. } | Outcome::WouldRename { .. } => self.renamed += 1,
            Outcome::SkippedTagged | Outcome::SkippedHidden => self.skipped += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
        self.entries.push(FileEntry { name, outcome });
    }

    /// Human-readable summary, one line per file plus the final counts.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Location: {}", self.fix.display_line());
        let _ = writeln!(out, "Tag: {}", self.tag);
        if self.dry_run {
            let _ = writeln!(out, "--- DRY RUN: no files will be modified ---");
        }
        for entry in &self.entries {
            let _ = match &entry.outcome {
                Outcome::Renamed { to } => writeln!(out, "  {} -> {}", entry.name, to),
                Outcome::WouldRename { to } => {
                    writeln!(out, "  {} -> {}  (dry-run)", entry.name, to)
                }
                Outcome::SkippedTagged => {
                    writeln!(out, "  {}  (skipped: already tagged)", entry.name)
                }
                Outcome::SkippedHidden => writeln!(out, "  {}  (skipped: hidden)", entry.name),
                Outcome::Failed { to, reason } => {
                    writeln!(out, "  {} -> {}  FAILED: {}", entry.name, to, reason)
                }
            };
        }
        let _ = writeln!(out, "{}", "-".repeat(40));
        let verb = if self.dry_run { "Would rename" } else { "Renamed" };
        let _ = writeln!(
            out,
            "{}: {}   Skipped: {}   Failed: {}",
            verb, self.renamed, self.skipped, self.failed
        );
        out
    }
}

/// The orchestrator: validate, acquire once, tag every file.
pub struct Renamer {
    resolver: LocationResolver,
    dry_run: bool,
    timeout: Duration,
}

impl Renamer {
    pub fn new(resolver: LocationResolver, dry_run: bool, timeout: Duration) -> Self {
        Self {
            resolver,
            dry_run,
            timeout,
        }
    }

    pub fn run(&self, directory: &Path) -> Result<RenameReport, RunError> {
        if !directory.is_dir() {
            return Err(RunError::InvalidTarget(directory.to_path_buf()));
        }

        // One fix per invocation, shared by every file. No fix, no renames.
        let fix = self.resolver.acquire(self.timeout)?;
        let suffix = tag::format_tag(&fix);

        let names = list_regular_files(directory)?;
        let mut report = RenameReport::new(directory, fix, suffix.clone(), self.dry_run);

        for name in names {
            if name.starts_with('.') {
                report.record(name, Outcome::SkippedHidden);
                continue;
            }
            if tag::is_already_tagged(&name) {
                report.record(name, Outcome::SkippedTagged);
                continue;
            }

            let (stem, ext) = tag::split_name(&name);
            let new_name = format!("{}{}{}", stem, suffix, ext);
            let target = directory.join(&new_name);

            if target.exists() {
                report.record(
                    name,
                    Outcome::Failed {
                        to: new_name,
                        reason: RenameError::Collision,
                    },
                );
                continue;
            }

            if self.dry_run {
                report.record(name, Outcome::WouldRename { to: new_name });
                continue;
            }

            let outcome = match fs::rename(directory.join(&name), &target) {
                Ok(()) => Outcome::Renamed { to: new_name },
                Err(e) => Outcome::Failed {
                    to: new_name,
                    reason: classify_io_error(&e),
                },
            };
            report.record(name, outcome);
        }

        Ok(report)
    }
}

fn classify_io_error(e: &io::Error) -> RenameError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        RenameError::PermissionDenied(e.to_string())
    } else {
        RenameError::Io(e.to_string())
    }
}

/// Direct children only, regular files only, sorted for stable reports.
fn list_regular_files(directory: &Path) -> Result<Vec<String>, RunError> {
    let mut names = Vec::new();
    let iter = fs::read_dir(directory).map_err(|e| RunError::Io(e.to_string()))?;
    for entry in iter {
        let entry = entry.map_err(|e| RunError::Io(e.to_string()))?;
        let file_type = entry.file_type().map_err(|e| RunError::Io(e.to_string()))?;
        if !file_type.is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
