/// Path canonicalization.
///
/// A canonical path is absolute, uses `/` as its only separator, and never
/// contains `.` or `..` segments or empty segments. Resolution is pure: it
/// never touches the file store.
use core::fmt;

use heapless::{String, Vec};

use crate::config::{MAX_DEPTH, MAX_PATH};

/// Separator used in canonical output.
pub const SEPARATOR: char = '/';

/// Firmware-native separator, accepted on input.
pub const NATIVE_SEPARATOR: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// The resolved path would exceed `MAX_PATH` bytes.
    TooLong,
    /// The resolved path would exceed `MAX_DEPTH` segments.
    TooDeep,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::TooLong => write!(f, "path too long (max {} bytes)", MAX_PATH),
            PathError::TooDeep => write!(f, "path too deep (max {} levels)", MAX_DEPTH),
        }
    }
}

fn is_separator(c: char) -> bool {
    c == SEPARATOR || c == NATIVE_SEPARATOR
}

/// An absolute, normalized path. Only produced by [`resolve`] or derived
/// from another canonical path, so the invariants always hold.
#[derive(Clone, PartialEq, Eq)]
pub struct CanonicalPath {
    text: String<MAX_PATH>,
}

impl CanonicalPath {
    pub fn root() -> Self {
        let mut text = String::new();
        let _ = text.push(SEPARATOR);
        Self { text }
    }

    /// Copy of a slice already known to be canonical (a prefix of one).
    fn from_canonical(s: &str) -> Self {
        let mut text = String::new();
        // Never longer than the canonical path it was cut from.
        let _ = text.push_str(s);
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_root(&self) -> bool {
        self.text.len() == 1
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.text.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Last segment, or `None` at the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Containing directory. The root is its own parent.
    pub fn parent(&self) -> CanonicalPath {
        match self.text.rfind(SEPARATOR) {
            Some(0) | None => Self::root(),
            Some(idx) => Self::from_canonical(&self.text[..idx]),
        }
    }

    /// Append a single name below this path.
    pub fn join(&self, name: &str) -> Result<CanonicalPath, PathError> {
        resolve(self, name)
    }

    /// Whether `self` is `other` or lies somewhere below it.
    pub fn starts_with(&self, other: &CanonicalPath) -> bool {
        if other.is_root() {
            return true;
        }
        match self.text.strip_prefix(other.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }

    /// Every non-root prefix, shortest first: `/a/b` yields `/a`, `/a/b`.
    pub fn prefixes(&self) -> Prefixes<'_> {
        let pos = if self.is_root() { self.text.len() } else { 0 };
        Prefixes { path: &self.text, pos }
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalPath({:?})", self.text.as_str())
    }
}

pub struct Prefixes<'a> {
    path: &'a str,
    pos: usize,
}

impl Iterator for Prefixes<'_> {
    type Item = CanonicalPath;

    fn next(&mut self) -> Option<CanonicalPath> {
        if self.pos >= self.path.len() {
            return None;
        }
        let rest = &self.path[self.pos + 1..];
        let end = match rest.find(SEPARATOR) {
            Some(idx) => self.pos + 1 + idx,
            None => self.path.len(),
        };
        self.pos = end;
        Some(CanonicalPath::from_canonical(&self.path[..end]))
    }
}

/// Resolve `input` against `cwd`.
///
/// Input starting with a separator is absolute; anything else is appended
/// to `cwd`. `.` segments are dropped, `..` pops the previous segment and
/// is a no-op at the root. Both `/` and `\` split segments. Length and
/// depth are checked as segments are pushed, and any overflow fails the
/// whole resolution.
pub fn resolve(cwd: &CanonicalPath, input: &str) -> Result<CanonicalPath, PathError> {
    let input = input.trim();
    let base = if input.starts_with(is_separator) { "" } else { cwd.as_str() };

    let mut stack: Vec<&str, MAX_DEPTH> = Vec::new();
    // Bytes the joined output would take: one separator plus the segment.
    let mut len = 0usize;

    for segment in base.split(is_separator).chain(input.split(is_separator)) {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                if let Some(last) = stack.pop() {
                    len -= last.len() + 1;
                }
            }
            segment => {
                len += segment.len() + 1;
                if len > MAX_PATH {
                    return Err(PathError::TooLong);
                }
                stack.push(segment).map_err(|_| PathError::TooDeep)?;
            }
        }
    }

    if stack.is_empty() {
        return Ok(CanonicalPath::root());
    }

    let mut text: String<MAX_PATH> = String::new();
    for segment in &stack {
        text.push(SEPARATOR).map_err(|_| PathError::TooLong)?;
        text.push_str(segment).map_err(|_| PathError::TooLong)?;
    }
    Ok(CanonicalPath { text })
}
