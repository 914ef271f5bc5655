//! HatterOS boot application.
//!
//! Loaded by the firmware boot manager. Brings up serial diagnostics and
//! the GOP framebuffer, shows the splash until a key or the timeout, then
//! hands the screen, the boot volume and the firmware services to the shell.
#![no_std]
#![no_main]

extern crate alloc;

mod arch;
mod fbcon;
mod firmware;
mod font;
mod gfx;
mod logger;
mod splash;
mod volume;

use core::fmt::Write;
use core::panic::PanicInfo;

use log::LevelFilter;
use uefi::{boot, entry, Status};

use hatteros_shell::config::{DEFAULT_BG, DEFAULT_FG, VERSION};
use hatteros_shell::store::RamStore;
use hatteros_shell::{con_println, Shell};

use arch::x86_64::{hlt, serial};
use fbcon::FbConsole;
use firmware::UefiPlatform;
use volume::UefiStore;

/// Preferred graphics mode; the nearest available one is used.
const TARGET_MODE: (usize, usize) = (1024, 768);
const SPLASH_TIMEOUT_MS: u64 = 2000;

/// Text on the firmware console, for failures before the framebuffer is up.
fn firmware_text(msg: &str) {
    uefi::system::with_stdout(|out| {
        let _ = out.write_str(msg);
    });
}

#[entry]
fn main() -> Status {
    serial::SERIAL.lock().init();
    logger::init(LevelFilter::Info);
    serial_println!("HatterOS v{} booting...", VERSION);
    firmware_text("HatterOS: entry\r\n");

    // The shell waits on the operator for as long as it takes.
    if let Err(e) = boot::set_watchdog_timer(0, 0x10000, None) {
        log::warn!("[boot] watchdog still armed: {:?}", e.status());
    }
    uefi::system::with_stdin(|input| {
        let _ = input.reset(false);
    });

    let Some(mut display) = gfx::init(TARGET_MODE) else {
        serial_println!("[gop] init failed");
        firmware_text("HatterOS: GOP init failed, cannot start framebuffer shell.\r\n");
        return Status::SUCCESS;
    };
    serial_println!("[gop] initialized");

    splash::draw(&mut display.fb);
    let by_key = firmware::wait_for_key_or_timeout(SPLASH_TIMEOUT_MS);
    serial_println!("[boot] splash done ({})", if by_key { "key" } else { "timeout" });

    let platform = UefiPlatform::new(display.fb.info());
    let console = FbConsole::new(display, DEFAULT_FG, DEFAULT_BG);

    match UefiStore::open_boot_volume() {
        Ok(store) => {
            serial_println!("[fs] boot volume opened");
            let mut shell = Shell::new(console, store, platform);
            shell.start();
            shell.run()
        }
        Err(e) => {
            serial_println!("[fs] boot volume unavailable: {}", e);
            let mut shell = Shell::new(console, RamStore::new(), platform);
            shell.start();
            con_println!(shell.console_mut(), "Boot volume unavailable ({}).", e);
            con_println!(shell.console_mut(), "Using a RAM volume; changes are lost on reset.");
            con_println!(shell.console_mut());
            shell.run()
        }
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("!!! PANIC !!!");
    serial_println!("{}", info);
    loop {
        hlt();
    }
}
