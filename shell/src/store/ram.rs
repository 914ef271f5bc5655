/// RAM-backed volume.
///
/// Behaves like the boot volume as far as the shell can tell: nodes keyed
/// by canonical path, handles with their own position, directory listing
/// in name order. Used when no boot file system can be opened, and by the
/// tests, which also use the fault switches (write limit, write protect)
/// and the open-handle counter.
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use super::{DirEntry, FileHandle, FileStore, FsError, NodeKind, OpenMode};
use crate::path::{resolve, CanonicalPath};
use crate::platform::DateTime;

struct Node {
    kind: NodeKind,
    data: Vec<u8>,
    modified: Option<DateTime>,
}

struct Volume {
    nodes: BTreeMap<String, Node>,
    open_handles: usize,
    write_limit: Option<usize>,
    read_only: bool,
    clock: Option<DateTime>,
}

impl Volume {
    fn node(&self, path: &str) -> Result<&Node, FsError> {
        self.nodes.get(path).ok_or(FsError::NotFound)
    }

    fn node_mut(&mut self, path: &str) -> Result<&mut Node, FsError> {
        self.nodes.get_mut(path).ok_or(FsError::NotFound)
    }

    fn has_children(&self, path: &str) -> bool {
        self.nodes.keys().any(|key| is_child_of(key, path))
    }
}

fn is_child_of(key: &str, dir: &str) -> bool {
    let rest = if dir == "/" {
        key.strip_prefix('/')
    } else {
        key.strip_prefix(dir).and_then(|r| r.strip_prefix('/'))
    };
    matches!(rest, Some(name) if !name.is_empty() && !name.contains('/'))
}

/// In-memory volume.
pub struct RamStore {
    volume: Rc<RefCell<Volume>>,
}

impl RamStore {
    /// Empty volume holding only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            String::from("/"),
            Node {
                kind: NodeKind::Directory,
                data: Vec::new(),
                modified: None,
            },
        );
        Self {
            volume: Rc::new(RefCell::new(Volume {
                nodes,
                open_handles: 0,
                write_limit: None,
                read_only: false,
                clock: None,
            })),
        }
    }

    /// Place a file at `path`, creating missing parent directories.
    pub fn insert_file(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let path = resolve(&CanonicalPath::root(), path).map_err(|_| FsError::InvalidName)?;
        let mut vol = self.volume.borrow_mut();
        let stamp = vol.clock;
        for prefix in path.parent().prefixes() {
            let dir = vol.nodes.entry(String::from(prefix.as_str())).or_insert(Node {
                kind: NodeKind::Directory,
                data: Vec::new(),
                modified: stamp,
            });
            if dir.kind != NodeKind::Directory {
                return Err(FsError::NotADirectory);
            }
        }
        vol.nodes.insert(
            String::from(path.as_str()),
            Node {
                kind: NodeKind::File,
                data: Vec::from(data),
                modified: stamp,
            },
        );
        Ok(())
    }

    /// File contents, if `path` names a file.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let vol = self.volume.borrow();
        match vol.nodes.get(path) {
            Some(node) if node.kind == NodeKind::File => Some(node.data.clone()),
            _ => None,
        }
    }

    pub fn kind(&self, path: &str) -> Option<NodeKind> {
        self.volume.borrow().nodes.get(path).map(|node| node.kind)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.kind(path).is_some()
    }

    /// Handles currently open against this volume.
    pub fn open_handles(&self) -> usize {
        self.volume.borrow().open_handles
    }

    /// Cap every write call at `limit` bytes, simulating short writes.
    pub fn set_write_limit(&mut self, limit: Option<usize>) {
        self.volume.borrow_mut().write_limit = limit;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.volume.borrow_mut().read_only = read_only;
    }

    /// Timestamp stamped on created and written nodes.
    pub fn set_clock(&mut self, clock: Option<DateTime>) {
        self.volume.borrow_mut().clock = clock;
    }
}

impl Default for RamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore for RamStore {
    type File = RamFile;

    fn open(&mut self, path: &CanonicalPath, mode: OpenMode, kind: NodeKind) -> Result<RamFile, FsError> {
        let mut vol = self.volume.borrow_mut();
        let key = path.as_str();

        if mode.intersects(OpenMode::WRITE | OpenMode::CREATE) && vol.read_only {
            return Err(FsError::WriteProtected);
        }

        if !vol.nodes.contains_key(key) {
            if !mode.contains(OpenMode::CREATE) {
                return Err(FsError::NotFound);
            }
            match vol.nodes.get(path.parent().as_str()) {
                Some(parent) if parent.kind == NodeKind::Directory => {}
                Some(_) => return Err(FsError::NotADirectory),
                None => return Err(FsError::NotFound),
            }
            let modified = vol.clock;
            vol.nodes.insert(
                String::from(key),
                Node {
                    kind,
                    data: Vec::new(),
                    modified,
                },
            );
        }

        vol.open_handles += 1;
        Ok(RamFile {
            volume: Rc::clone(&self.volume),
            path: String::from(key),
            mode,
            pos: 0,
            last_listed: None,
        })
    }
}

/// Handle into a [`RamStore`].
pub struct RamFile {
    volume: Rc<RefCell<Volume>>,
    path: String,
    mode: OpenMode,
    pos: usize,
    last_listed: Option<String>,
}

impl RamFile {
    fn writable(&self) -> bool {
        self.mode.intersects(OpenMode::WRITE | OpenMode::CREATE)
    }
}

impl Drop for RamFile {
    fn drop(&mut self) {
        self.volume.borrow_mut().open_handles -= 1;
    }
}

impl FileHandle for RamFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let vol = self.volume.borrow();
        let node = vol.node(&self.path)?;
        if node.kind == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }
        if self.pos >= node.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(node.data.len() - self.pos);
        buf[..n].copy_from_slice(&node.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        if !self.writable() {
            return Err(FsError::AccessDenied);
        }
        let mut vol = self.volume.borrow_mut();
        let limit = vol.write_limit.unwrap_or(usize::MAX);
        let stamp = vol.clock;
        let node = vol.node_mut(&self.path)?;
        if node.kind == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }

        let n = buf.len().min(limit);
        let end = self.pos + n;
        if node.data.len() < end {
            node.data.resize(end, 0);
        }
        node.data[self.pos..end].copy_from_slice(&buf[..n]);
        node.modified = stamp;
        self.pos = end;
        Ok(n)
    }

    fn stat(&mut self) -> Result<DirEntry, FsError> {
        let vol = self.volume.borrow();
        let node = vol.node(&self.path)?;
        let name = match self.path.rfind('/') {
            Some(idx) if self.path.len() > 1 => &self.path[idx + 1..],
            _ => "/",
        };
        Ok(DirEntry::new(node.kind, node.data.len() as u64, node.modified).with_name(name))
    }

    fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError> {
        let vol = self.volume.borrow();
        if vol.node(&self.path)?.kind != NodeKind::Directory {
            return Err(FsError::NotADirectory);
        }

        let after = self.last_listed.as_deref();
        let next = vol
            .nodes
            .iter()
            .filter(|(key, _)| is_child_of(key, &self.path))
            .find(|(key, _)| after.map_or(true, |last| key.as_str() > last));

        match next {
            Some((key, node)) => {
                let name = key.rsplit('/').next().unwrap_or("");
                let entry = DirEntry::new(node.kind, node.data.len() as u64, node.modified).with_name(name);
                let key = key.clone();
                drop(vol);
                self.last_listed = Some(key);
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        if !self.writable() {
            return Err(FsError::AccessDenied);
        }
        let mut vol = self.volume.borrow_mut();
        let node = vol.node_mut(&self.path)?;
        if node.kind == NodeKind::Directory {
            return Err(FsError::IsADirectory);
        }
        let size = usize::try_from(size).map_err(|_| FsError::VolumeFull)?;
        node.data.resize(size, 0);
        self.pos = self.pos.min(size);
        Ok(())
    }

    fn delete(self) -> Result<(), FsError> {
        if !self.writable() {
            return Err(FsError::AccessDenied);
        }
        let mut vol = self.volume.borrow_mut();
        vol.node(&self.path)?;
        if self.path == "/" || vol.has_children(&self.path) {
            return Err(FsError::DeleteFailed);
        }
        vol.nodes.remove(&self.path);
        Ok(())
    }
}
