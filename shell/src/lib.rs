//! HatterOS console core.
//!
//! Everything the pre-boot shell does that is not raw firmware plumbing
//! lives here: path canonicalization, the file store adapter, the bitmap
//! decoder, the settings record, the line editor and the command REPL.
//! Firmware surfaces (framebuffer, keyboard, file system, clock) are
//! reached only through the traits in [`console`], [`platform`] and
//! [`store`], so the whole crate builds and tests on the host target.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bmp;
pub mod config;
pub mod console;
pub mod path;
pub mod platform;
pub mod settings;
pub mod shell;
pub mod store;

#[cfg(test)]
mod testing;

pub use console::{Console, PixelSurface, Rect};
pub use path::{CanonicalPath, PathError};
pub use platform::{Key, Keyboard, Platform, PlatformError};
pub use shell::{Session, Shell, ShellError};
pub use store::{FileHandle, FileStore, FsError};
