/// COM1 (0x3F8) diagnostic output.
///
/// Boot markers and log records go here; the framebuffer console is the
/// user surface. Machines without a UART are detected through the scratch
/// register and every write becomes a no-op.
use core::fmt;
use spin::Mutex;

const COM1: u16 = 0x3F8;

/// Bounded wait for the transmitter, so a wedged UART cannot hang boot.
const TX_SPIN_LIMIT: usize = 100_000;

pub static SERIAL: Mutex<Serial> = Mutex::new(Serial::new(COM1));

pub struct Serial {
    port: u16,
    present: bool,
}

impl Serial {
    pub const fn new(port: u16) -> Self {
        Self { port, present: false }
    }

    /// Detect the UART and program 8N1 at 115200 baud.
    pub fn init(&mut self) {
        super::outb(self.port + 7, 0xA5);
        if super::inb(self.port + 7) != 0xA5 {
            self.present = false;
            return;
        }

        super::outb(self.port + 1, 0x00); // Disable interrupts
        super::outb(self.port + 3, 0x80); // Enable DLAB
        super::outb(self.port, 0x01); // Divisor 1, low byte
        super::outb(self.port + 1, 0x00); // Divisor 1, high byte
        super::outb(self.port + 3, 0x03); // 8 bits, no parity, one stop bit
        super::outb(self.port + 2, 0xC7); // FIFO on, cleared, 14-byte threshold
        super::outb(self.port + 4, 0x03); // DTR + RTS, no IRQs
        self.present = true;
    }

    fn is_transmit_empty(&self) -> bool {
        super::inb(self.port + 5) & 0x20 != 0
    }

    pub fn write_byte(&self, byte: u8) {
        if !self.present {
            return;
        }
        for _ in 0..TX_SPIN_LIMIT {
            if self.is_transmit_empty() {
                break;
            }
            core::hint::spin_loop();
        }
        super::outb(self.port, byte);
    }

    /// Write a string, expanding `\n` to CRLF.
    pub fn write_str_raw(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }
}

impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_str_raw(s);
        Ok(())
    }
}

/// Print to serial console.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        {
            use core::fmt::Write;
            let mut serial = $crate::arch::x86_64::serial::SERIAL.lock();
            let _ = write!(serial, $($arg)*);
        }
    };
}

/// Print to serial console with a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => {
        $crate::serial_print!("{}\n", format_args!($($arg)*))
    };
}
