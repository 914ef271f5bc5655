/// Keyboard, clock, power and memory-map services.
///
/// The firmware binding implements these; tests script them.
use core::fmt;

/// A decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Printable ASCII (0x20..=0x7E).
    Char(u8),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// The service is not available on this machine.
    Unsupported,
    /// Firmware returned a failure status.
    Firmware(usize),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Unsupported => write!(f, "unsupported by firmware"),
            PlatformError::Firmware(status) => write!(f, "firmware status {:#x}", status),
        }
    }
}

pub trait Keyboard {
    /// Block until the next key is available.
    fn read_key(&mut self) -> Result<Key, PlatformError>;
}

/// Wall-clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Memory region classes reported by `memmap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Conventional,
    LoaderCode,
    LoaderData,
    BootServicesCode,
    BootServicesData,
    RuntimeServicesCode,
    RuntimeServicesData,
    AcpiReclaim,
    AcpiNvs,
    Mmio,
    Reserved,
    Unusable,
    Other,
}

impl RegionKind {
    pub const COUNT: usize = 13;

    pub const ALL: [RegionKind; Self::COUNT] = [
        RegionKind::Conventional,
        RegionKind::LoaderCode,
        RegionKind::LoaderData,
        RegionKind::BootServicesCode,
        RegionKind::BootServicesData,
        RegionKind::RuntimeServicesCode,
        RegionKind::RuntimeServicesData,
        RegionKind::AcpiReclaim,
        RegionKind::AcpiNvs,
        RegionKind::Mmio,
        RegionKind::Reserved,
        RegionKind::Unusable,
        RegionKind::Other,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            RegionKind::Conventional => "conventional",
            RegionKind::LoaderCode => "loader code",
            RegionKind::LoaderData => "loader data",
            RegionKind::BootServicesCode => "boot code",
            RegionKind::BootServicesData => "boot data",
            RegionKind::RuntimeServicesCode => "runtime code",
            RegionKind::RuntimeServicesData => "runtime data",
            RegionKind::AcpiReclaim => "acpi reclaim",
            RegionKind::AcpiNvs => "acpi nvs",
            RegionKind::Mmio => "mmio",
            RegionKind::Reserved => "reserved",
            RegionKind::Unusable => "unusable",
            RegionKind::Other => "other",
        }
    }
}

/// Framebuffer facts shown by `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub width: usize,
    pub height: usize,
    pub framebuffer_base: u64,
    pub framebuffer_size: usize,
}

/// Machine services beyond the console and the file store.
pub trait Platform: Keyboard {
    fn now(&mut self) -> Result<DateTime, PlatformError>;

    /// Request a warm reset. Returns only if the firmware refused.
    fn warm_reset(&mut self);

    /// Visit every memory map descriptor as (kind, page count).
    fn memory_map(&mut self, visit: &mut dyn FnMut(RegionKind, u64)) -> Result<(), PlatformError>;

    fn display_info(&self) -> DisplayInfo;

    /// Pause briefly before retrying a failed service. No-op by default.
    fn idle(&mut self) {}
}
