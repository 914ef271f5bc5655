/// Boot volume through the firmware `SimpleFileSystem` protocol.
///
/// Paths are absolute `/`-separated strings on our side and
/// backslash-separated UCS-2 on the firmware side. Every `open` starts from
/// a fresh volume root; the returned handle is closed by its `Drop`.
use heapless::Vec;
use uefi::boot::{self, ScopedProtocol};
use uefi::proto::media::file::{
    Directory, File, FileAttribute, FileInfo, FileMode, FileType, RegularFile,
};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::{CStr16, Status};

use hatteros_shell::config::MAX_PATH;
use hatteros_shell::path::CanonicalPath;
use hatteros_shell::platform::DateTime;
use hatteros_shell::store::{DirEntry, FileHandle, FileStore, FsError, NodeKind, OpenMode};

/// Scratch for `FileInfo` records, which need 8-byte alignment.
#[repr(C, align(8))]
struct InfoBuf([u8; 1024]);

impl InfoBuf {
    const fn new() -> Self {
        Self([0; 1024])
    }
}

fn fs_error(status: Status) -> FsError {
    match status {
        Status::NOT_FOUND => FsError::NotFound,
        Status::ACCESS_DENIED => FsError::AccessDenied,
        Status::WRITE_PROTECTED => FsError::WriteProtected,
        Status::VOLUME_FULL => FsError::VolumeFull,
        Status::DEVICE_ERROR | Status::VOLUME_CORRUPTED | Status::NO_MEDIA => FsError::DeviceError,
        Status::MEDIA_CHANGED => FsError::MediaChanged,
        Status::UNSUPPORTED => FsError::Unsupported,
        Status::WARN_DELETE_FAILURE => FsError::DeleteFailed,
        other => FsError::Firmware(other.0),
    }
}

fn err<T: core::fmt::Debug>(e: uefi::Error<T>) -> FsError {
    fs_error(e.status())
}

/// `/a/b` as `a\b`, nul-terminated. Only ASCII names are accepted.
fn firmware_path(path: &CanonicalPath) -> Result<Vec<u16, { MAX_PATH + 1 }>, FsError> {
    let mut units: Vec<u16, { MAX_PATH + 1 }> = Vec::new();
    for (i, segment) in path.segments().enumerate() {
        if i > 0 {
            units.push(u16::from(b'\\')).map_err(|_| FsError::InvalidName)?;
        }
        for c in segment.chars() {
            if !c.is_ascii() || c.is_ascii_control() {
                return Err(FsError::InvalidName);
            }
            units.push(c as u16).map_err(|_| FsError::InvalidName)?;
        }
    }
    units.push(0).map_err(|_| FsError::InvalidName)?;
    Ok(units)
}

fn file_mode(mode: OpenMode) -> FileMode {
    if mode.contains(OpenMode::CREATE) {
        FileMode::CreateReadWrite
    } else if mode.contains(OpenMode::WRITE) {
        FileMode::ReadWrite
    } else {
        FileMode::Read
    }
}

fn to_entry(info: &FileInfo) -> DirEntry {
    let kind = if info.is_directory() { NodeKind::Directory } else { NodeKind::File };
    let t = info.modification_time();
    let modified = (t.year() != 0 && (1..=12).contains(&t.month())).then(|| DateTime {
        year: t.year(),
        month: t.month(),
        day: t.day(),
        hour: t.hour(),
        minute: t.minute(),
        second: t.second(),
    });
    DirEntry::new(kind, info.file_size(), modified)
        .with_name_units(info.file_name().iter().map(|&c| u32::from(u16::from(c))))
}

pub struct UefiStore {
    fs: ScopedProtocol<SimpleFileSystem>,
}

impl UefiStore {
    /// The file system the image was loaded from.
    pub fn open_boot_volume() -> Result<Self, FsError> {
        let fs = boot::get_image_file_system(boot::image_handle()).map_err(err)?;
        let mut store = Self { fs };
        // Fail here rather than on the first command.
        store.fs.open_volume().map_err(err)?;
        Ok(store)
    }
}

pub enum UefiFile {
    Regular(RegularFile),
    Dir(Directory),
}

impl FileStore for UefiStore {
    type File = UefiFile;

    fn open(&mut self, path: &CanonicalPath, mode: OpenMode, kind: NodeKind) -> Result<UefiFile, FsError> {
        let mut root = self.fs.open_volume().map_err(err)?;
        if path.is_root() {
            return Ok(UefiFile::Dir(root));
        }
        let units = firmware_path(path)?;
        let name = CStr16::from_u16_with_nul(&units).map_err(|_| FsError::InvalidName)?;
        let attributes = match kind {
            NodeKind::Directory if mode.contains(OpenMode::CREATE) => FileAttribute::DIRECTORY,
            _ => FileAttribute::empty(),
        };
        let handle = root.open(name, file_mode(mode), attributes).map_err(err)?;
        match handle.into_type().map_err(err)? {
            FileType::Regular(file) => Ok(UefiFile::Regular(file)),
            FileType::Dir(dir) => Ok(UefiFile::Dir(dir)),
        }
    }
}

impl UefiFile {
    fn info<'b>(&mut self, buf: &'b mut InfoBuf) -> Result<&'b mut FileInfo, FsError> {
        let result = match self {
            UefiFile::Regular(f) => f.get_info::<FileInfo>(&mut buf.0),
            UefiFile::Dir(d) => d.get_info::<FileInfo>(&mut buf.0),
        };
        result.map_err(err)
    }
}

impl FileHandle for UefiFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        match self {
            UefiFile::Regular(f) => f.read(buf).map_err(err),
            UefiFile::Dir(_) => Err(FsError::IsADirectory),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        match self {
            UefiFile::Regular(f) => f.write(buf).map(|()| buf.len()).map_err(err),
            UefiFile::Dir(_) => Err(FsError::IsADirectory),
        }
    }

    fn stat(&mut self) -> Result<DirEntry, FsError> {
        let mut buf = InfoBuf::new();
        let info = self.info(&mut buf)?;
        Ok(to_entry(info))
    }

    fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError> {
        let UefiFile::Dir(dir) = self else {
            return Err(FsError::NotADirectory);
        };
        let mut buf = InfoBuf::new();
        match dir.read_entry(&mut buf.0).map_err(err)? {
            Some(info) => Ok(Some(to_entry(info))),
            None => Ok(None),
        }
    }

    fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        let mut current = InfoBuf::new();
        let mut updated = InfoBuf::new();
        let info = self.info(&mut current)?;
        if info.is_directory() {
            return Err(FsError::IsADirectory);
        }
        let resized = FileInfo::new(
            &mut updated.0,
            size,
            info.physical_size(),
            *info.create_time(),
            *info.last_access_time(),
            *info.modification_time(),
            info.attribute(),
            info.file_name(),
        )
        .map_err(|_| FsError::Unsupported)?;
        match self {
            UefiFile::Regular(f) => {
                f.set_info(&*resized).map_err(err)?;
                let position = f.get_position().map_err(err)?;
                f.set_position(position.min(size)).map_err(err)
            }
            UefiFile::Dir(_) => Err(FsError::IsADirectory),
        }
    }

    fn delete(self) -> Result<(), FsError> {
        let result = match self {
            UefiFile::Regular(f) => f.delete(),
            UefiFile::Dir(d) => d.delete(),
        };
        result.map_err(err)
    }
}
