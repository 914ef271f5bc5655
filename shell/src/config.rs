//! Compile-time limits and well-known locations.
//!
//! Every buffer in the shell is sized from these constants. Nothing grows
//! at runtime; an operation that would exceed a bound fails instead.

/// Longest canonical path, in bytes, including the leading separator.
pub const MAX_PATH: usize = 256;

/// Deepest canonical path, in segments.
pub const MAX_DEPTH: usize = 32;

/// Input line capacity of the line editor and of each history slot.
pub const LINE_MAX: usize = 256;

/// Number of history entries kept.
pub const HISTORY_CAP: usize = 32;

/// Longest directory entry name rendered by listings.
pub const NAME_MAX: usize = 128;

/// Chunk size for stream copies and text dumps.
pub const COPY_CHUNK: usize = 4096;

/// Largest image file `view` will load into memory.
pub const MAX_IMAGE_BYTES: u64 = 32 * 1024 * 1024;

/// Directory holding the persisted settings record.
pub const SETTINGS_DIR: &str = "/hatteros/config";

/// The persisted settings record.
pub const SETTINGS_FILE: &str = "/hatteros/config/settings.bin";

/// Directory tree created by `bootstrap`.
pub const RESERVED_TREE: [&str; 4] = [
    "/hatteros",
    "/hatteros/config",
    "/hatteros/images",
    "/hatteros/logs",
];

/// Default foreground color (0xRRGGBB).
pub const DEFAULT_FG: u32 = 0xE8E8E8;

/// Default background color (0xRRGGBB).
pub const DEFAULT_BG: u32 = 0x10161E;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
