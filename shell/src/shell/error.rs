/// Command failures.
///
/// Every handler returns `Result<(), ShellError>`; the REPL prints the
/// error after the command name and reads the next line. Nothing here is
/// fatal.
use core::fmt;

use crate::bmp::BmpError;
use crate::path::PathError;
use crate::platform::PlatformError;
use crate::store::FsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellError {
    /// Missing or extra arguments. Carries the usage line.
    Usage(&'static str),
    Path(PathError),
    Fs(FsError),
    Image(BmpError),
    Platform(PlatformError),
    /// A scratch buffer could not be allocated.
    OutOfResources,
    /// File larger than the command will load.
    TooLarge(u64),
    /// Source and destination are the same node.
    SameFile,
    /// Operation not allowed on this target.
    Refused(&'static str),
    UnknownTheme,
}

/// Broad failure classes used when reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before anything was changed.
    Validation,
    /// Reported by the file service.
    FileService,
    OutOfResources,
    Usage,
    /// Reported by another firmware service.
    Firmware,
}

impl ShellError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShellError::Usage(_) => ErrorKind::Usage,
            ShellError::Path(_)
            | ShellError::Image(_)
            | ShellError::TooLarge(_)
            | ShellError::SameFile
            | ShellError::Refused(_)
            | ShellError::UnknownTheme => ErrorKind::Validation,
            ShellError::Fs(_) => ErrorKind::FileService,
            ShellError::OutOfResources => ErrorKind::OutOfResources,
            ShellError::Platform(_) => ErrorKind::Firmware,
        }
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Usage(usage) => write!(f, "usage: {}", usage),
            ShellError::Path(e) => write!(f, "{}", e),
            ShellError::Fs(e) => write!(f, "{}", e),
            ShellError::Image(e) => write!(f, "{}", e),
            ShellError::Platform(e) => write!(f, "{}", e),
            ShellError::OutOfResources => write!(f, "out of resources"),
            ShellError::TooLarge(size) => write!(f, "file too large ({} bytes)", size),
            ShellError::SameFile => write!(f, "source and destination are the same file"),
            ShellError::Refused(why) => write!(f, "{}", why),
            ShellError::UnknownTheme => write!(f, "unknown theme (try 'theme' for the list)"),
        }
    }
}

impl From<PathError> for ShellError {
    fn from(e: PathError) -> Self {
        ShellError::Path(e)
    }
}

impl From<FsError> for ShellError {
    fn from(e: FsError) -> Self {
        ShellError::Fs(e)
    }
}

impl From<BmpError> for ShellError {
    fn from(e: BmpError) -> Self {
        ShellError::Image(e)
    }
}

impl From<PlatformError> for ShellError {
    fn from(e: PlatformError) -> Self {
        ShellError::Platform(e)
    }
}
