/// Output surfaces the shell draws on.
///
/// The console owns line wrap and vertical scroll: the shell only writes
/// bytes and moves the cursor. Colors are 0xRRGGBB; converting to the
/// framebuffer's native layout is the implementer's job.
use core::fmt;

/// A pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }
}

/// Linear pixel surface. Writes outside the surface are clipped silently.
pub trait PixelSurface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn put_pixel(&mut self, x: usize, y: usize, rgb: u32);
    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, rgb: u32);
}

/// Text console sink.
pub trait Console: PixelSurface {
    /// Write one byte at the cursor. `\n` moves to column zero of the next
    /// row; passing the last row scrolls the text area up by one row.
    fn put_char(&mut self, c: u8);

    fn put_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.put_char(byte);
        }
    }

    /// Fill with the background color and home the cursor.
    fn clear(&mut self);

    fn columns(&self) -> usize;
    fn rows(&self) -> usize;

    /// Cursor as (column, row).
    fn cursor(&self) -> (usize, usize);
    fn set_cursor(&mut self, col: usize, row: usize);

    fn set_colors(&mut self, fg: u32, bg: u32);

    /// Show or hide the caret indicator on a cell.
    fn set_caret(&mut self, col: usize, row: usize, visible: bool);

    /// Pixel area covered by the text grid.
    fn viewport(&self) -> Rect;
}

/// `fmt::Write` adapter so consoles work with `write!`.
pub struct Writer<'a, C: ?Sized>(pub &'a mut C);

impl<C: Console + ?Sized> fmt::Write for Writer<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.put_str(s);
        Ok(())
    }
}

/// Print to a console.
#[macro_export]
macro_rules! con_print {
    ($con:expr, $($arg:tt)*) => {
        {
            use core::fmt::Write;
            let _ = write!($crate::console::Writer(&mut *$con), $($arg)*);
        }
    };
}

/// Print to a console with a newline.
#[macro_export]
macro_rules! con_println {
    ($con:expr) => ($crate::con_print!($con, "\n"));
    ($con:expr, $($arg:tt)*) => {
        $crate::con_print!($con, "{}\n", format_args!($($arg)*))
    };
}
