/// Keyboard, clock, reset and memory map from UEFI services.
use uefi::boot::{self, EventType, TimerTrigger, Tpl};
use uefi::mem::memory_map::{MemoryMap, MemoryType};
use uefi::proto::console::text::{Key as UefiKey, ScanCode};
use uefi::runtime::{self, ResetType};
use uefi::Status;

use hatteros_shell::platform::{
    DateTime, DisplayInfo, Key, Keyboard, Platform, PlatformError, RegionKind,
};

/// Back-off between keyboard retries once reads keep failing.
const IDLE_MICROS: usize = 100_000;

fn firmware<T: core::fmt::Debug>(e: uefi::Error<T>) -> PlatformError {
    match e.status() {
        Status::UNSUPPORTED => PlatformError::Unsupported,
        status => PlatformError::Firmware(status.0),
    }
}

/// Translate a firmware keystroke; `None` for keys the shell ignores.
fn translate(key: UefiKey) -> Option<Key> {
    match key {
        UefiKey::Printable(c) => match u16::from(c) {
            0x0D | 0x0A => Some(Key::Enter),
            0x08 => Some(Key::Backspace),
            unit @ 0x20..=0x7E => Some(Key::Char(unit as u8)),
            _ => None,
        },
        UefiKey::Special(ScanCode::UP) => Some(Key::Up),
        UefiKey::Special(ScanCode::DOWN) => Some(Key::Down),
        UefiKey::Special(ScanCode::LEFT) => Some(Key::Left),
        UefiKey::Special(ScanCode::RIGHT) => Some(Key::Right),
        UefiKey::Special(ScanCode::HOME) => Some(Key::Home),
        UefiKey::Special(ScanCode::END) => Some(Key::End),
        UefiKey::Special(ScanCode::DELETE) => Some(Key::Delete),
        UefiKey::Special(ScanCode::ESCAPE) => Some(Key::Escape),
        UefiKey::Special(_) => None,
    }
}

fn region_kind(ty: MemoryType) -> RegionKind {
    match ty {
        MemoryType::CONVENTIONAL => RegionKind::Conventional,
        MemoryType::LOADER_CODE => RegionKind::LoaderCode,
        MemoryType::LOADER_DATA => RegionKind::LoaderData,
        MemoryType::BOOT_SERVICES_CODE => RegionKind::BootServicesCode,
        MemoryType::BOOT_SERVICES_DATA => RegionKind::BootServicesData,
        MemoryType::RUNTIME_SERVICES_CODE => RegionKind::RuntimeServicesCode,
        MemoryType::RUNTIME_SERVICES_DATA => RegionKind::RuntimeServicesData,
        MemoryType::ACPI_RECLAIM => RegionKind::AcpiReclaim,
        MemoryType::ACPI_NON_VOLATILE => RegionKind::AcpiNvs,
        MemoryType::MMIO | MemoryType::MMIO_PORT_SPACE => RegionKind::Mmio,
        MemoryType::RESERVED => RegionKind::Reserved,
        MemoryType::UNUSABLE => RegionKind::Unusable,
        _ => RegionKind::Other,
    }
}

/// Wait until a key is pressed or `timeout_ms` passes, whichever is first.
/// A pressed key is consumed. Returns whether a key ended the wait.
pub fn wait_for_key_or_timeout(timeout_ms: u64) -> bool {
    let timer = match unsafe { boot::create_event(EventType::TIMER, Tpl::CALLBACK, None, None) } {
        Ok(timer) => timer,
        Err(e) => {
            log::warn!("[boot] no timer event ({:?}), skipping splash wait", e.status());
            return false;
        }
    };
    let pressed = uefi::system::with_stdin(|input| {
        let Some(key_event) = input.wait_for_key_event() else {
            return false;
        };
        if boot::set_timer(&timer, TimerTrigger::Relative(timeout_ms * 10_000)).is_err() {
            return false;
        }
        let mut events = [key_event, unsafe { timer.unsafe_clone() }];
        match boot::wait_for_event(&mut events) {
            Ok(0) => {
                let _ = input.read_key();
                true
            }
            _ => false,
        }
    });
    let _ = boot::close_event(timer);
    pressed
}

pub struct UefiPlatform {
    display: DisplayInfo,
}

impl UefiPlatform {
    pub fn new(display: DisplayInfo) -> Self {
        Self { display }
    }
}

impl Keyboard for UefiPlatform {
    fn read_key(&mut self) -> Result<Key, PlatformError> {
        uefi::system::with_stdin(|input| loop {
            if let Some(key) = input.read_key().map_err(firmware)? {
                match translate(key) {
                    Some(key) => return Ok(key),
                    None => continue,
                }
            }
            let event = input.wait_for_key_event().ok_or(PlatformError::Unsupported)?;
            boot::wait_for_event(&mut [event]).map_err(firmware)?;
        })
    }
}

impl Platform for UefiPlatform {
    fn now(&mut self) -> Result<DateTime, PlatformError> {
        let t = runtime::get_time().map_err(firmware)?;
        Ok(DateTime {
            year: t.year(),
            month: t.month(),
            day: t.day(),
            hour: t.hour(),
            minute: t.minute(),
            second: t.second(),
        })
    }

    fn warm_reset(&mut self) {
        crate::serial_println!("[boot] warm reset");
        runtime::reset(ResetType::WARM, Status::SUCCESS, None)
    }

    fn memory_map(&mut self, visit: &mut dyn FnMut(RegionKind, u64)) -> Result<(), PlatformError> {
        let map = boot::memory_map(MemoryType::LOADER_DATA).map_err(firmware)?;
        for desc in map.entries() {
            visit(region_kind(desc.ty), desc.page_count);
        }
        Ok(())
    }

    fn idle(&mut self) {
        boot::stall(IDLE_MICROS);
    }

    fn display_info(&self) -> DisplayInfo {
        self.display
    }
}

