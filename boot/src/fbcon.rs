/// Text console on the GOP framebuffer.
///
/// 8x16 cells inside an 8px margin. Glyphs come from the 8x8 font with each
/// row drawn twice. Passing the last row copies the text area up one cell
/// and clears the vacated row. The caret is an underline XORed with
/// `fg ^ bg`, so drawing it twice leaves the cell as it was.
use hatteros_shell::console::{Console, PixelSurface, Rect};

use crate::font::{self, GLYPH_ROWS, GLYPH_WIDTH};
use crate::gfx::Display;

pub const CELL_WIDTH: usize = 8;
pub const CELL_HEIGHT: usize = 16;
pub const MARGIN: usize = 8;

/// Height of the caret underline in pixels.
const CARET_HEIGHT: usize = 2;

/// Draw `text` at (x, y) with every glyph pixel scaled to `sx` by `sy`.
/// With `bg` unset only the set bits are painted.
pub fn draw_text<S: PixelSurface + ?Sized>(
    surface: &mut S,
    x: usize,
    y: usize,
    text: &str,
    fg: u32,
    bg: Option<u32>,
    (sx, sy): (usize, usize),
) {
    for (i, c) in text.bytes().enumerate() {
        let gx = x + i * GLYPH_WIDTH * sx;
        for (row, bits) in font::glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                let on = bits & (0x80 >> col) != 0;
                let color = match (on, bg) {
                    (true, _) => fg,
                    (false, Some(bg)) => bg,
                    (false, None) => continue,
                };
                surface.fill_rect(gx + col * sx, y + row * sy, sx, sy, color);
            }
        }
    }
}

/// Pixel width of `text` at horizontal scale `sx`.
pub fn text_width(text: &str, sx: usize) -> usize {
    text.len() * GLYPH_WIDTH * sx
}

pub struct FbConsole {
    display: Display,
    cols: usize,
    rows: usize,
    col: usize,
    row: usize,
    fg: u32,
    bg: u32,
    /// Visible caret cell and the mask it was drawn with.
    caret: Option<(usize, usize, u32)>,
}

impl FbConsole {
    pub fn new(display: Display, fg: u32, bg: u32) -> Self {
        let fb = &display.fb;
        let cols = (fb.width().saturating_sub(2 * MARGIN) / CELL_WIDTH).max(1);
        let rows = (fb.height().saturating_sub(2 * MARGIN) / CELL_HEIGHT).max(1);
        Self {
            display,
            cols,
            rows,
            col: 0,
            row: 0,
            fg,
            bg,
            caret: None,
        }
    }

    fn cell_origin(&self, col: usize, row: usize) -> (usize, usize) {
        (MARGIN + col * CELL_WIDTH, MARGIN + row * CELL_HEIGHT)
    }

    fn draw_cell(&mut self, col: usize, row: usize, c: u8) {
        let (x, y) = self.cell_origin(col, row);
        let (fg, bg) = (self.fg, self.bg);
        draw_text(&mut self.display.fb, x, y, byte_str(&c), fg, Some(bg), (1, CELL_HEIGHT / GLYPH_ROWS));
        if matches!(self.caret, Some((cc, cr, _)) if (cc, cr) == (col, row)) {
            self.caret = None;
        }
    }

    fn toggle_caret(&mut self, col: usize, row: usize, mask: u32) {
        let (x, y) = self.cell_origin(col, row);
        self.display
            .fb
            .xor_rect(x, y + CELL_HEIGHT - CARET_HEIGHT, CELL_WIDTH, CARET_HEIGHT, mask);
    }

    fn scroll(&mut self) {
        let area = self.viewport();
        self.display
            .fb
            .scroll_up(area.x, area.width, area.y, area.y + area.height, CELL_HEIGHT);
        let (x, y) = self.cell_origin(0, self.rows - 1);
        let bg = self.bg;
        self.display.fb.fill_rect(x, y, area.width, CELL_HEIGHT, bg);
        self.caret = match self.caret {
            Some((c, r, m)) if r > 0 => Some((c, r - 1, m)),
            _ => None,
        };
    }

    fn newline(&mut self) {
        self.col = 0;
        self.row += 1;
        if self.row >= self.rows {
            self.scroll();
            self.row = self.rows - 1;
        }
    }
}

/// One printable byte as a string; anything else becomes the replacement
/// glyph through `font::glyph`.
fn byte_str(c: &u8) -> &str {
    core::str::from_utf8(core::slice::from_ref(c)).unwrap_or("\u{7f}")
}

impl PixelSurface for FbConsole {
    fn width(&self) -> usize {
        self.display.fb.width()
    }

    fn height(&self) -> usize {
        self.display.fb.height()
    }

    fn put_pixel(&mut self, x: usize, y: usize, rgb: u32) {
        self.display.fb.put_pixel(x, y, rgb);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, rgb: u32) {
        self.display.fb.fill_rect(x, y, w, h, rgb);
    }
}

impl Console for FbConsole {
    fn put_char(&mut self, c: u8) {
        match c {
            b'\n' => self.newline(),
            b'\r' => self.col = 0,
            _ => {
                self.draw_cell(self.col, self.row, c);
                self.col += 1;
                if self.col >= self.cols {
                    self.newline();
                }
            }
        }
    }

    fn clear(&mut self) {
        let (w, h, bg) = (self.display.fb.width(), self.display.fb.height(), self.bg);
        self.display.fb.fill_rect(0, 0, w, h, bg);
        self.col = 0;
        self.row = 0;
        self.caret = None;
    }

    fn columns(&self) -> usize {
        self.cols
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cursor(&self) -> (usize, usize) {
        (self.col, self.row)
    }

    fn set_cursor(&mut self, col: usize, row: usize) {
        self.col = col.min(self.cols - 1);
        self.row = row.min(self.rows - 1);
    }

    fn set_colors(&mut self, fg: u32, bg: u32) {
        self.fg = fg;
        self.bg = bg;
    }

    fn set_caret(&mut self, col: usize, row: usize, visible: bool) {
        if col >= self.cols || row >= self.rows {
            return;
        }
        match (self.caret, visible) {
            (Some((c, r, _)), true) if (c, r) == (col, row) => {}
            (current, true) => {
                if let Some((c, r, m)) = current {
                    self.toggle_caret(c, r, m);
                }
                let mask = self.fg ^ self.bg;
                self.toggle_caret(col, row, mask);
                self.caret = Some((col, row, mask));
            }
            (Some((c, r, m)), false) if (c, r) == (col, row) => {
                self.toggle_caret(c, r, m);
                self.caret = None;
            }
            (_, false) => {}
        }
    }

    fn viewport(&self) -> Rect {
        Rect::new(MARGIN, MARGIN, self.cols * CELL_WIDTH, self.rows * CELL_HEIGHT)
    }
}
