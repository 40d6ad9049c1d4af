//! Working-tree relative paths.
//!
//! Every path stored in the index is relative to the working tree root and
//! uses `/` as separator regardless of platform. [`RelPath`] is the only way
//! user-supplied paths enter the index, so the traversal guard lives here.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A normalized, forward-slash path relative to the working tree root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelPath(String);

impl RelPath {
    /// Parse a relative path string such as `notes/a.md` or `./a.md`.
    ///
    /// Backslashes are treated as separators, `.` segments are dropped and
    /// `..` segments are resolved lexically. A path that climbs above the
    /// root, or an absolute path, is rejected.
    pub fn new(path: &str) -> Result<Self, TypeError> {
        let unified = path.replace('\\', "/");
        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return Err(TypeError::PathTraversal {
                path: path.to_string(),
            });
        }

        let mut parts: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(TypeError::PathTraversal {
                            path: path.to_string(),
                        });
                    }
                }
                other => parts.push(other),
            }
        }

        if parts.is_empty() {
            return Err(TypeError::InvalidPath {
                path: path.to_string(),
                reason: "path is empty".into(),
            });
        }
        Ok(Self(parts.join("/")))
    }

    /// Relativize `path` against `root`.
    ///
    /// Relative inputs are taken as relative to `root`. Absolute inputs must
    /// live under `root`.
    pub fn from_path(root: &Path, path: &Path) -> Result<Self, TypeError> {
        let relative = if path.is_absolute() {
            path.strip_prefix(root).map_err(|_| TypeError::PathTraversal {
                path: path.display().to_string(),
            })?
        } else {
            path
        };

        let mut parts: Vec<String> = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(TypeError::PathTraversal {
                            path: path.display().to_string(),
                        });
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(TypeError::PathTraversal {
                        path: path.display().to_string(),
                    });
                }
            }
        }

        if parts.is_empty() {
            return Err(TypeError::InvalidPath {
                path: path.display().to_string(),
                reason: "path names the working tree root".into(),
            });
        }
        Ok(Self(parts.join("/")))
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve back to a filesystem path under `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut full = root.to_path_buf();
        for part in self.0.split('/') {
            full.push(part);
        }
        full
    }

    /// Returns `true` if the final path segment ends with `.{ext}`.
    pub fn has_extension(&self, ext: &str) -> bool {
        Path::new(&self.0)
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
