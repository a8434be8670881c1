//! Snapshot writer: deterministic, filesystem-safe paths for catalog objects.
//!
//! Every object maps to exactly one file:
//! `<root>/<owner>/<type>/<name>.sql`, each segment sanitized independently.
//! Files are always fully overwritten with the latest definition and are
//! never deleted here.
//!
//! # Collisions
//! Sanitization is lossy. `A/B` and `A:B` both become `A_B`, and `CON`
//! becomes `_CON`, so two distinct objects can share a file. The later write
//! wins; nothing fails.

use crate::{Result, error::DdlSnapError, models::CatalogObject};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Replacement for characters that are illegal in a path component.
pub const PLACEHOLDER: char = '_';

/// Extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "sql";

/// Windows device names, reserved with or without an extension.
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters illegal in a path component on Windows or POSIX.
fn illegal_component_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap_or_else(|_| unreachable!())
    })
}

fn replace_illegal(segment: &str) -> String {
    illegal_component_chars()
        .replace_all(segment, PLACEHOLDER.to_string().as_str())
        .into_owned()
}

/// Returns true when Windows would open a device instead of this component.
///
/// Only the part before the first dot counts, and trailing spaces in it are
/// ignored, so `nul.txt` and `COM1 ` are reserved too.
pub fn is_reserved_device_name(component: &str) -> bool {
    let base = component.split('.').next().unwrap_or(component);
    let base = base.trim_end_matches(' ');
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(base))
}

fn prefix_reserved(segment: String) -> String {
    if is_reserved_device_name(&segment) {
        format!("{}{}", PLACEHOLDER, segment)
    } else {
        segment
    }
}

/// Windows strips trailing dots and spaces from a component.
fn replace_trailing_dots_and_spaces(segment: &str) -> String {
    let kept = segment.trim_end_matches(['.', ' ']);
    let stripped = segment.len() - kept.len();
    format!("{}{}", kept, PLACEHOLDER.to_string().repeat(stripped))
}

/// Sanitizes a directory-level segment (owner or type).
///
/// Trailing dots and spaces are replaced, which also turns `.` and `..` into
/// placeholders so a segment cannot escape the root. Device names get a
/// leading placeholder.
pub fn sanitize_directory_segment(segment: &str) -> String {
    if segment.is_empty() {
        return PLACEHOLDER.to_string();
    }
    prefix_reserved(replace_trailing_dots_and_spaces(&replace_illegal(segment)))
}

/// Sanitizes the file stem (object name). The extension is appended afterwards,
/// so trailing dots and spaces in the stem are harmless. Device names get a
/// leading placeholder.
pub fn sanitize_file_stem(stem: &str) -> String {
    if stem.is_empty() {
        return PLACEHOLDER.to_string();
    }
    prefix_reserved(replace_illegal(stem))
}

/// Persists extracted definitions under a root directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    root: PathBuf,
}

impl SnapshotWriter {
    /// Creates a writer rooted at the snapshot repository's working tree.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the snapshot tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination of an object's snapshot. Pure function of the triple and root.
    pub fn path_for(&self, object: &CatalogObject) -> PathBuf {
        self.root
            .join(sanitize_directory_segment(object.owner()))
            .join(sanitize_directory_segment(object.object_type()))
            .join(format!(
                "{}.{}",
                sanitize_file_stem(object.name()),
                SNAPSHOT_EXTENSION
            ))
    }

    /// Writes `ddl` to the object's snapshot file, replacing prior content.
    ///
    /// Returns the written path, or `None` when there was nothing to write.
    ///
    /// # Errors
    /// Returns an I/O error naming the path if directories or the file cannot
    /// be written.
    pub async fn save(
        &self,
        object: &CatalogObject,
        ddl: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        let Some(ddl) = ddl else {
            tracing::trace!("No definition to write for {}", object);
            return Ok(None);
        };

        let path = self.path_for(object);
        if let Some(parent) = path.parent() {
            // create_dir_all tolerates concurrent creation of shared parents
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DdlSnapError::io("Failed to create directory", parent, e))?;
        }

        tokio::fs::write(&path, ddl.as_bytes())
            .await
            .map_err(|e| DdlSnapError::io("Failed to write", &path, e))?;

        tracing::debug!("Wrote {} ({} bytes)", path.display(), ddl.len());
        Ok(Some(path))
    }
}
