/// File store adapter.
///
/// `FileStore` opens nodes on the single boot volume; everything else is
/// done through the returned `FileHandle`. Handles release the underlying
/// firmware resource when dropped, so every exit path of a caller,
/// including `?` returns, closes what it opened.
///
/// The firmware binding and the RAM store both implement these traits.
/// Copy, directory creation and listing are built on top of them here.
mod ram;

pub use ram::{RamFile, RamStore};

use core::fmt;

use bitflags::bitflags;
use heapless::String;

use crate::config::{COPY_CHUNK, NAME_MAX};
use crate::path::CanonicalPath;
use crate::platform::DateTime;

bitflags! {
    /// How a node is opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        /// Create the node if it does not exist (implies read/write).
        const CREATE = 1 << 2;
    }
}

impl OpenMode {
    pub const READ_WRITE: OpenMode = OpenMode::READ.union(OpenMode::WRITE);
    pub const CREATE_READ_WRITE: OpenMode = OpenMode::READ_WRITE.union(OpenMode::CREATE);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// File service errors, named after the firmware statuses they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AccessDenied,
    WriteProtected,
    VolumeFull,
    DeviceError,
    MediaChanged,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    /// A name could not be expressed in the firmware's character set.
    InvalidName,
    /// Delete was refused (non-empty directory, or the volume root).
    DeleteFailed,
    /// Fewer bytes written than requested.
    ShortWrite,
    /// End of file reached before the requested bytes were read.
    ShortRead,
    Unsupported,
    /// Any other firmware status.
    Firmware(usize),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "Not Found"),
            FsError::AccessDenied => write!(f, "Access Denied"),
            FsError::WriteProtected => write!(f, "Write Protected"),
            FsError::VolumeFull => write!(f, "Volume Full"),
            FsError::DeviceError => write!(f, "Device Error"),
            FsError::MediaChanged => write!(f, "Media Changed"),
            FsError::AlreadyExists => write!(f, "Already Exists"),
            FsError::NotADirectory => write!(f, "Not a Directory"),
            FsError::IsADirectory => write!(f, "Is a Directory"),
            FsError::InvalidName => write!(f, "Invalid Name"),
            FsError::DeleteFailed => write!(f, "Delete Failed"),
            FsError::ShortWrite => write!(f, "Short Write"),
            FsError::ShortRead => write!(f, "Short Read"),
            FsError::Unsupported => write!(f, "Unsupported"),
            FsError::Firmware(status) => write!(f, "Firmware Status {:#x}", status),
        }
    }
}

/// One node as seen by `stat` or a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Printable rendering of the firmware name.
    pub name: String<NAME_MAX>,
    pub kind: NodeKind,
    pub size: u64,
    /// Absent when the firmware reports no valid time.
    pub modified: Option<DateTime>,
}

/// Stand-in for name characters outside printable ASCII.
pub const NAME_PLACEHOLDER: char = '?';

impl DirEntry {
    pub fn new(kind: NodeKind, size: u64, modified: Option<DateTime>) -> Self {
        Self {
            name: String::new(),
            kind,
            size,
            modified,
        }
    }

    /// Render a name from code units, replacing anything that is not
    /// printable ASCII. Names longer than `NAME_MAX` are cut short.
    pub fn with_name_units<I: IntoIterator<Item = u32>>(mut self, units: I) -> Self {
        self.name.clear();
        for unit in units {
            let c = match unit {
                0x20..=0x7E => unit as u8 as char,
                _ => NAME_PLACEHOLDER,
            };
            if self.name.push(c).is_err() {
                break;
            }
        }
        self
    }

    pub fn with_name(self, name: &str) -> Self {
        self.with_name_units(name.chars().map(|c| c as u32))
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Renders an optional timestamp, `unknown` when absent.
pub struct Modified<'a>(pub &'a Option<DateTime>);

impl fmt::Display for Modified<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "{}", t),
            None => f.pad("unknown"),
        }
    }
}

/// An open node.
pub trait FileHandle {
    /// Read from the current position. `Ok(0)` means end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Write at the current position, returning the bytes accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError>;

    fn stat(&mut self) -> Result<DirEntry, FsError>;

    /// Next entry of an open directory, `Ok(None)` once exhausted. The
    /// position only moves forward.
    fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError>;

    /// Set the file size, keeping the first `size` bytes.
    fn truncate(&mut self, size: u64) -> Result<(), FsError>;

    /// Delete the node. The handle is consumed either way.
    fn delete(self) -> Result<(), FsError>;
}

/// The boot volume.
pub trait FileStore {
    type File: FileHandle;

    /// Open `path`. With `OpenMode::CREATE`, a missing node is created as
    /// `kind`; an existing node is opened whatever its kind.
    fn open(&mut self, path: &CanonicalPath, mode: OpenMode, kind: NodeKind) -> Result<Self::File, FsError>;
}

pub fn stat_path<S: FileStore>(store: &mut S, path: &CanonicalPath) -> Result<DirEntry, FsError> {
    let mut node = store.open(path, OpenMode::READ, NodeKind::File)?;
    node.stat()
}

/// Make sure `path` exists as a directory. An existing directory is fine.
pub fn create_dir<S: FileStore>(store: &mut S, path: &CanonicalPath) -> Result<(), FsError> {
    let mut dir = store.open(path, OpenMode::CREATE_READ_WRITE, NodeKind::Directory)?;
    match dir.stat()?.kind {
        NodeKind::Directory => Ok(()),
        NodeKind::File => Err(FsError::NotADirectory),
    }
}

/// Create `path` and every missing ancestor.
pub fn create_dir_all<S: FileStore>(store: &mut S, path: &CanonicalPath) -> Result<(), FsError> {
    for prefix in path.prefixes() {
        create_dir(store, &prefix)?;
    }
    Ok(())
}

/// Write all of `buf`; a short write is an error.
pub fn write_all<H: FileHandle>(file: &mut H, buf: &[u8]) -> Result<(), FsError> {
    let written = file.write(buf)?;
    if written != buf.len() {
        return Err(FsError::ShortWrite);
    }
    Ok(())
}

/// Fill `buf` completely; hitting end of file first is an error.
pub fn read_exact<H: FileHandle>(file: &mut H, buf: &mut [u8]) -> Result<(), FsError> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => return Err(FsError::ShortRead),
            n => filled += n,
        }
    }
    Ok(())
}

/// Single-pass iterator over a directory, skipping `.` and `..`.
pub struct Entries<'a, H> {
    dir: &'a mut H,
    done: bool,
}

pub fn entries<H: FileHandle>(dir: &mut H) -> Entries<'_, H> {
    Entries { dir, done: false }
}

impl<H: FileHandle> Iterator for Entries<'_, H> {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.dir.next_entry() {
                Ok(Some(entry)) if matches!(entry.name.as_str(), "." | "..") => continue,
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => self.done = true,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Stream `src` into `dst` in `COPY_CHUNK` pieces, returning the bytes
/// copied.
///
/// The source is opened and checked before the destination is touched, so
/// a bad source never truncates an existing destination.
pub fn copy_file<S: FileStore>(store: &mut S, src: &CanonicalPath, dst: &CanonicalPath) -> Result<u64, FsError> {
    let mut source = store.open(src, OpenMode::READ, NodeKind::File)?;
    if source.stat()?.is_dir() {
        return Err(FsError::IsADirectory);
    }

    let mut dest = store.open(dst, OpenMode::CREATE_READ_WRITE, NodeKind::File)?;
    if dest.stat()?.is_dir() {
        return Err(FsError::IsADirectory);
    }
    dest.truncate(0)?;

    let mut chunk = [0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = source.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        write_all(&mut dest, &chunk[..n])?;
        total += n as u64;
    }
    log::debug!("[store] copied {} bytes {} -> {}", total, src, dst);
    Ok(total)
}

/// Copy, then delete the source. The source is only removed once the
/// copy has fully succeeded.
pub fn move_file<S: FileStore>(store: &mut S, src: &CanonicalPath, dst: &CanonicalPath) -> Result<u64, FsError> {
    let total = copy_file(store, src, dst)?;
    let source = store.open(src, OpenMode::READ_WRITE, NodeKind::File)?;
    source.delete()?;
    Ok(total)
}

#[cfg(test)]
mod tests;
