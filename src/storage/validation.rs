//! Path validation
//!
//! Confines every client-supplied path to the media root. Resolution is
//! lexical (`.`/`..` folding, `/` and `\` both treated as separators) and,
//! when enabled, additionally checks that symlinks do not lead outside the
//! root.

use log::{debug, warn};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// An absolute path proven to lie inside the media root.
///
/// Only `PathResolver` constructs these, so holding one is the proof that the
/// confinement check ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Root-relative form using `/` separators, empty for the root itself
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Root-relative path in the `/a/b` form handed back to clients
    pub fn client_path(&self) -> String {
        format!("/{}", self.relative)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.relative.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

/// Resolves untrusted relative paths against a fixed media root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    confine_symlinks: bool,
}

impl PathResolver {
    /// Canonicalizes `root` (which must exist) and enables symlink confinement
    /// when `confine_symlinks` is set.
    pub fn new(root: &Path, confine_symlinks: bool) -> io::Result<Self> {
        let root = root.canonicalize()?;
        Ok(Self {
            root,
            confine_symlinks,
        })
    }

    /// Purely lexical resolver. `root` must already be absolute and normalized;
    /// the filesystem is never consulted.
    #[cfg(test)]
    pub fn lexical(root: PathBuf) -> Self {
        Self {
            root,
            confine_symlinks: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` against the root.
    ///
    /// An empty request addresses the root. Every request is root-relative,
    /// including ones with a leading separator: `/a/b` is `<root>/a/b`.
    pub fn resolve(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        if relative.contains('\0') {
            warn!("Rejected path containing NUL byte: {:?}", relative);
            return Err(PathError::Forbidden);
        }

        let segments = fold_segments(strip_leading_parents(relative)).ok_or_else(|| {
            warn!("Path traversal attempt: {:?}", relative);
            PathError::Forbidden
        })?;

        let mut absolute = self.root.clone();
        for segment in &segments {
            if !is_single_component(segment) {
                warn!("Rejected path segment {:?} in {:?}", segment, relative);
                return Err(PathError::Forbidden);
            }
            absolute.push(segment);
        }

        if !self.is_within_root(&absolute) {
            warn!("Path traversal attempt: {:?}", relative);
            return Err(PathError::Forbidden);
        }

        if self.confine_symlinks && !self.symlinks_stay_inside(&absolute) {
            warn!("Symlink escape attempt: {:?}", relative);
            return Err(PathError::Forbidden);
        }

        let resolved = ResolvedPath {
            absolute,
            relative: segments.join("/"),
        };
        debug!("Resolved {:?} to /{}", relative, resolved.relative);
        Ok(resolved)
    }

    /// Re-check a host path that should already lie inside the root, such as
    /// the parent of a `ResolvedPath`. Resolving `resolved.as_path()` yields
    /// `resolved` again.
    pub fn resolve_absolute(&self, path: &Path) -> Result<ResolvedPath, PathError> {
        let rest = path.strip_prefix(&self.root).map_err(|_| {
            warn!("Host path outside the media root: {}", path.display());
            PathError::Forbidden
        })?;

        let mut segments = Vec::new();
        for component in rest.components() {
            match component {
                Component::Normal(segment) => match segment.to_str() {
                    Some(segment) => segments.push(segment),
                    None => return Err(PathError::Forbidden),
                },
                Component::CurDir => {}
                _ => {
                    warn!("Unnormalized host path: {}", path.display());
                    return Err(PathError::Forbidden);
                }
            }
        }
        self.resolve(&segments.join("/"))
    }

    /// Resolve `name` as a direct child of `parent`. `name` must be a single
    /// path component.
    pub fn resolve_child(
        &self,
        parent: &ResolvedPath,
        name: &str,
    ) -> Result<ResolvedPath, PathError> {
        let name = validate_name(name)?;
        if parent.is_root() {
            self.resolve(name)
        } else {
            self.resolve(&format!("{}/{}", parent.relative(), name))
        }
    }

    /// Separator-aware containment: equal to the root, or the root followed by
    /// a separator. `/media-evil` is not inside `/media`.
    fn is_within_root(&self, candidate: &Path) -> bool {
        candidate == self.root || candidate.starts_with(&self.root)
    }


    /// The deepest existing ancestor of `candidate`, with symlinks resolved,
    /// must still be inside the root.
    fn symlinks_stay_inside(&self, candidate: &Path) -> bool {
        let mut probe = candidate;
        loop {
            if probe.symlink_metadata().is_ok() {
                return match probe.canonicalize() {
                    Ok(real) => self.is_within_root(&real),
                    // dangling link: judge by the directory holding it
                    Err(_) => probe
                        .parent()
                        .map(|parent| self.symlinks_stay_inside(parent))
                        .unwrap_or(false),
                };
            }
            match probe.parent() {
                Some(parent) if parent.starts_with(&self.root) => probe = parent,
                _ => return false,
            }
        }
    }
}

/// Validate a single-component name (upload file name, folder name, new name)
pub fn validate_name(name: &str) -> Result<&str, PathError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
        || !is_single_component(trimmed)
    {
        return Err(PathError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

/// Drops any run of leading `../`, `..\` and separators at the string level.
fn strip_leading_parents(mut request: &str) -> &str {
    loop {
        let next = request
            .trim_start_matches(['/', '\\'])
            .strip_prefix("..")
            .filter(|rest| rest.is_empty() || rest.starts_with(['/', '\\']));
        match next {
            Some(rest) => request = rest,
            None => return request.trim_start_matches(['/', '\\']),
        }
    }
}

/// Folds `.`/`..` and empty segments. Returns `None` when a `..` would climb
/// above the starting point.
fn fold_segments(request: &str) -> Option<Vec<String>> {
    let mut segments: Vec<String> = Vec::new();
    for segment in request.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other.to_string()),
        }
    }
    Some(segments)
}

fn is_single_component(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
