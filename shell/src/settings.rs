/// Persisted settings record.
///
/// One fixed 20-byte little-endian record at `SETTINGS_FILE`:
///
/// ```text
/// offset  size  field
///      0     4  magic "HTCF"
///      4     4  version
///      8     4  foreground 0xXXRRGGBB, kept as written
///     12     4  background 0xXXRRGGBB, kept as written
///     16     1  prompt mode (0 = full path, 1 = short)
///     17     3  reserved, zero
/// ```
///
/// A record is applied whole or not at all.
use core::fmt;

use static_assertions::const_assert_eq;

use crate::config::{DEFAULT_BG, DEFAULT_FG, SETTINGS_DIR, SETTINGS_FILE};
use crate::path::{resolve, CanonicalPath};
use crate::store::{self, FileHandle, FileStore, FsError, NodeKind, OpenMode};

pub const MAGIC: u32 = u32::from_le_bytes(*b"HTCF");
pub const VERSION: u32 = 1;
pub const RECORD_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PromptMode {
    /// Whole working directory.
    Full = 0,
    /// Last segment only.
    Short = 1,
}

impl PromptMode {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(PromptMode::Full),
            1 => Some(PromptMode::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SettingsRecord {
    pub magic: u32,
    pub version: u32,
    pub fg: u32,
    pub bg: u32,
    pub prompt_mode: u8,
    pub reserved: [u8; 3],
}

const_assert_eq!(core::mem::size_of::<SettingsRecord>(), RECORD_LEN);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    Truncated(usize),
    BadMagic(u32),
    BadVersion(u32),
    BadPromptMode(u8),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Truncated(n) => write!(f, "record is {} bytes, need {}", n, RECORD_LEN),
            SettingsError::BadMagic(m) => write!(f, "bad magic {:#010x}", m),
            SettingsError::BadVersion(v) => write!(f, "unsupported version {}", v),
            SettingsError::BadPromptMode(b) => write!(f, "bad prompt mode {}", b),
        }
    }
}

impl SettingsRecord {
    pub fn new(fg: u32, bg: u32, prompt_mode: PromptMode) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            fg,
            bg,
            prompt_mode: prompt_mode as u8,
            reserved: [0; 3],
        }
    }

    pub fn prompt_mode(&self) -> PromptMode {
        PromptMode::from_byte(self.prompt_mode).unwrap_or(PromptMode::Full)
    }

    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..12].copy_from_slice(&self.fg.to_le_bytes());
        out[12..16].copy_from_slice(&self.bg.to_le_bytes());
        out[16] = self.prompt_mode;
        out[17..20].copy_from_slice(&self.reserved);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SettingsError> {
        if bytes.len() < RECORD_LEN {
            return Err(SettingsError::Truncated(bytes.len()));
        }
        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

        let magic = word(0);
        if magic != MAGIC {
            return Err(SettingsError::BadMagic(magic));
        }
        let version = word(4);
        if version != VERSION {
            return Err(SettingsError::BadVersion(version));
        }
        let prompt_mode = bytes[16];
        if PromptMode::from_byte(prompt_mode).is_none() {
            return Err(SettingsError::BadPromptMode(prompt_mode));
        }

        Ok(Self {
            magic,
            version,
            fg: word(8),
            bg: word(12),
            prompt_mode,
            reserved: [bytes[17], bytes[18], bytes[19]],
        })
    }
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self::new(DEFAULT_FG, DEFAULT_BG, PromptMode::Full)
    }
}

/// A named color pair selectable with `theme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub fg: u32,
    pub bg: u32,
}

pub const THEMES: [Theme; 5] = [
    Theme { name: "default", fg: DEFAULT_FG, bg: DEFAULT_BG },
    Theme { name: "light", fg: 0x1E2228, bg: 0xF2F2EE },
    Theme { name: "amber", fg: 0xFFB000, bg: 0x1A1200 },
    Theme { name: "green", fg: 0x33FF66, bg: 0x001A08 },
    Theme { name: "ocean", fg: 0xCDEBFF, bg: 0x0B2540 },
];

pub fn find_theme(name: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.name == name)
}

fn settings_path() -> CanonicalPath {
    resolve(&CanonicalPath::root(), SETTINGS_FILE).unwrap_or_else(|_| CanonicalPath::root())
}

/// Write `record` to the settings file, creating the directory tree first.
pub fn save<S: FileStore>(store: &mut S, record: &SettingsRecord) -> Result<(), FsError> {
    let dir = resolve(&CanonicalPath::root(), SETTINGS_DIR).map_err(|_| FsError::InvalidName)?;
    store::create_dir_all(store, &dir)?;

    let mut file = store.open(&settings_path(), OpenMode::CREATE_READ_WRITE, NodeKind::File)?;
    file.truncate(0)?;
    store::write_all(&mut file, &record.encode())?;
    log::info!("[settings] saved to {}", SETTINGS_FILE);
    Ok(())
}

/// Read the settings file. A missing, short or malformed record yields
/// `None` so the caller keeps its defaults.
pub fn load<S: FileStore>(store: &mut S) -> Option<SettingsRecord> {
    let mut file = match store.open(&settings_path(), OpenMode::READ, NodeKind::File) {
        Ok(file) => file,
        Err(FsError::NotFound) => {
            log::debug!("[settings] no settings file, using defaults");
            return None;
        }
        Err(e) => {
            log::warn!("[settings] open failed: {}", e);
            return None;
        }
    };

    let mut buf = [0u8; RECORD_LEN];
    if let Err(e) = store::read_exact(&mut file, &mut buf) {
        log::warn!("[settings] read failed: {}", e);
        return None;
    }
    match SettingsRecord::decode(&buf) {
        Ok(record) => Some(record),
        Err(e) => {
            log::warn!("[settings] ignoring record: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RamStore;

    #[test]
    fn record_round_trips() {
        let record = SettingsRecord::new(0x123456, 0xABCDEF, PromptMode::Short);
        let bytes = record.encode();
        assert_eq!(&bytes[0..4], b"HTCF");
        assert_eq!(SettingsRecord::decode(&bytes), Ok(record));

        // Colour words are stored whole, high byte included.
        let wide = SettingsRecord::new(0xFF112233, 0x80445566, PromptMode::Full);
        assert_eq!(SettingsRecord::decode(&wide.encode()), Ok(wide));
    }

    #[test]
    fn fixed_little_endian_layout() {
        let bytes = SettingsRecord::new(0x00112233, 0x00445566, PromptMode::Full).encode();
        assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[0x33, 0x22, 0x11, 0x00]);
        assert_eq!(&bytes[12..16], &[0x66, 0x55, 0x44, 0x00]);
        assert_eq!(&bytes[16..20], &[0, 0, 0, 0]);
    }

    #[test]
    fn rejects_bad_magic_version_and_mode() {
        let good = SettingsRecord::default().encode();

        let mut bad = good;
        bad[0] = b'X';
        assert!(matches!(SettingsRecord::decode(&bad), Err(SettingsError::BadMagic(_))));

        let mut bad = good;
        bad[4] = 2;
        assert_eq!(SettingsRecord::decode(&bad), Err(SettingsError::BadVersion(2)));

        let mut bad = good;
        bad[16] = 7;
        assert_eq!(SettingsRecord::decode(&bad), Err(SettingsError::BadPromptMode(7)));

        assert_eq!(SettingsRecord::decode(&good[..12]), Err(SettingsError::Truncated(12)));
    }

    #[test]
    fn save_then_load() {
        let mut store = RamStore::new();
        let record = SettingsRecord::new(0xFFB000, 0x1A1200, PromptMode::Short);
        save(&mut store, &record).unwrap();

        assert_eq!(store.kind(SETTINGS_DIR), Some(NodeKind::Directory));
        assert_eq!(load(&mut store), Some(record));
        assert_eq!(store.open_handles(), 0);
    }

    #[test]
    fn save_overwrites_previous_record() {
        let mut store = RamStore::new();
        store.insert_file(SETTINGS_FILE, &[0xAA; 64]).unwrap();
        save(&mut store, &SettingsRecord::default()).unwrap();
        assert_eq!(store.contents(SETTINGS_FILE).unwrap().len(), RECORD_LEN);
    }

    #[test]
    fn missing_or_malformed_file_loads_nothing() {
        let mut store = RamStore::new();
        assert_eq!(load(&mut store), None);

        store.insert_file(SETTINGS_FILE, b"short").unwrap();
        assert_eq!(load(&mut store), None);

        let mut wrong = SettingsRecord::default().encode();
        wrong[0] = 0;
        store.insert_file(SETTINGS_FILE, &wrong).unwrap();
        assert_eq!(load(&mut store), None);
        assert_eq!(store.open_handles(), 0);
    }

    #[test]
    fn every_theme_is_findable() {
        for theme in THEMES.iter() {
            assert_eq!(find_theme(theme.name), Some(theme));
        }
        assert_eq!(find_theme("DEFAULT"), None);
    }
}
