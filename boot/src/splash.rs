/// Startup splash: gradient, hat, title and a key hint.
use hatteros_shell::console::PixelSurface;

use crate::fbcon::{draw_text, text_width};
use crate::gfx::Framebuffer;

const TOP: u32 = 0x0E1B2C;
const BOTTOM: u32 = 0x253C59;
const TITLE: &str = "HatterOS";
const TITLE_COLOR: u32 = 0xF3F7FF;
const HINT: &str = "Press any key to continue...";
const HINT_COLOR: u32 = 0xDCE5F2;

const HAT_DARK: u32 = 0x101010;
const HAT_BAND: u32 = 0xB04A00;
const HAT_HIGHLIGHT: u32 = 0x3A3A3A;

fn draw_hat(fb: &mut Framebuffer, cx: usize, cy: usize, scale: usize) {
    let (brim_w, brim_h) = (120 * scale, 18 * scale);
    let (crown_w, crown_h) = (70 * scale, 70 * scale);

    let brim_x = cx.saturating_sub(brim_w / 2);
    let brim_y = cy + 20 * scale;
    let crown_x = cx.saturating_sub(crown_w / 2);
    let crown_y = (brim_y + 6 * scale).saturating_sub(crown_h);

    fb.fill_rect(brim_x, brim_y, brim_w, brim_h, HAT_DARK);
    fb.fill_rect(crown_x, crown_y, crown_w, crown_h, HAT_DARK);
    fb.fill_rect(crown_x, crown_y + crown_h / 2, crown_w, 8 * scale, HAT_BAND);
    fb.fill_rect(crown_x + 8 * scale, crown_y + 10 * scale, 8 * scale, crown_h - 20 * scale, HAT_HIGHLIGHT);
}

/// Centered x for a run `w` pixels wide, or `fallback` when it does not fit.
fn centered(screen: usize, w: usize, fallback: usize) -> usize {
    if screen > w { (screen - w) / 2 } else { fallback }
}

pub fn draw(fb: &mut Framebuffer) {
    let (w, h) = (fb.width(), fb.height());
    fb.gradient(TOP, BOTTOM);

    draw_hat(fb, w / 2, (h / 2).saturating_sub(40), 1);

    // Glyph rows are doubled to match the 8x16 console cells.
    let title_scale = 8;
    let title_x = centered(w, text_width(TITLE, title_scale), 16);
    let title_y = (h / 2).saturating_sub(16 * title_scale);
    draw_text(fb, title_x, title_y, TITLE, TITLE_COLOR, None, (title_scale, 2 * title_scale));

    let hint_scale = 2;
    let hint_x = centered(w, text_width(HINT, hint_scale), 8);
    let hint_y = h.saturating_sub(80);
    draw_text(fb, hint_x, hint_y, HINT, HINT_COLOR, None, (hint_scale, 2 * hint_scale));
}
