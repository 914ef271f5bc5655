/// GOP linear framebuffer.
///
/// Takes the mode closest to the requested resolution among the 32-bit
/// direct-color formats, then draws with volatile stores. Colors come in
/// as 0xRRGGBB and are converted to the mode's byte order here.
use uefi::boot::{self, ScopedProtocol};
use uefi::proto::console::gop::{GraphicsOutput, PixelFormat};

use hatteros_shell::console::PixelSurface;
use hatteros_shell::platform::DisplayInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    /// Bytes in memory: R, G, B, reserved.
    Rgb,
    /// Bytes in memory: B, G, R, reserved.
    Bgr,
}

pub struct Framebuffer {
    base: *mut u32,
    size: usize,
    width: usize,
    height: usize,
    stride: usize,
    order: PixelOrder,
}

/// Keeps the GOP open for as long as the framebuffer is in use.
pub struct Display {
    _gop: ScopedProtocol<GraphicsOutput>,
    pub fb: Framebuffer,
}

/// Open the GOP, switch to the mode nearest `target`, and map its
/// framebuffer. `None` when there is no usable graphics output.
pub fn init(target: (usize, usize)) -> Option<Display> {
    let handle = boot::get_handle_for_protocol::<GraphicsOutput>().ok()?;
    let mut gop = boot::open_protocol_exclusive::<GraphicsOutput>(handle).ok()?;

    let score = |(w, h): (usize, usize)| w.abs_diff(target.0) + h.abs_diff(target.1);
    let current = gop.current_mode_info();
    let mut best: Option<(usize, _)> = None;
    for mode in gop.modes() {
        let info = mode.info();
        if !matches!(info.pixel_format(), PixelFormat::Rgb | PixelFormat::Bgr) {
            continue;
        }
        let s = score(info.resolution());
        if best.as_ref().map_or(true, |(b, _)| s < *b) {
            best = Some((s, mode));
        }
    }
    if let Some((_, mode)) = best {
        if mode.info().resolution() != current.resolution() {
            if let Err(e) = gop.set_mode(&mode) {
                log::warn!("[gop] set_mode failed ({:?}), keeping current mode", e.status());
            }
        }
    }

    let info = gop.current_mode_info();
    let order = match info.pixel_format() {
        PixelFormat::Rgb => PixelOrder::Rgb,
        PixelFormat::Bgr => PixelOrder::Bgr,
        other => {
            log::warn!("[gop] unsupported pixel format {:?}", other);
            return None;
        }
    };
    let (width, height) = info.resolution();
    let stride = info.stride();
    let (base, size) = {
        let mut fb = gop.frame_buffer();
        (fb.as_mut_ptr(), fb.size())
    };
    crate::serial_println!("[gop] {}x{} stride {} {:?} fb {:p} ({} bytes)", width, height, stride, order, base, size);

    Some(Display {
        _gop: gop,
        fb: Framebuffer {
            base: base.cast::<u32>(),
            size,
            width,
            height,
            stride,
            order,
        },
    })
}

fn scale(from: u8, to: u8, num: usize, den: usize) -> u32 {
    let (from, to) = (from as i64, to as i64);
    (from + (to - from) * num as i64 / den as i64) as u32
}

impl Framebuffer {
    fn native(&self, rgb: u32) -> u32 {
        match self.order {
            PixelOrder::Bgr => rgb & 0x00FF_FFFF,
            PixelOrder::Rgb => (rgb & 0xFF) << 16 | (rgb & 0xFF00) | (rgb >> 16) & 0xFF,
        }
    }

    fn store(&mut self, x: usize, y: usize, native: u32) {
        unsafe { self.base.add(y * self.stride + x).write_volatile(native) }
    }

    fn load(&self, x: usize, y: usize) -> u32 {
        unsafe { self.base.add(y * self.stride + x).read_volatile() }
    }

    pub fn info(&self) -> DisplayInfo {
        DisplayInfo {
            width: self.width,
            height: self.height,
            framebuffer_base: self.base as u64,
            framebuffer_size: self.size,
        }
    }

    /// Clip a rectangle to the screen, as (x_end, y_end).
    fn clip(&self, x: usize, y: usize, w: usize, h: usize) -> (usize, usize) {
        (x.saturating_add(w).min(self.width), y.saturating_add(h).min(self.height))
    }

    /// Invert the color bits selected by `mask` inside a rectangle. Applying
    /// the same call twice restores the original pixels.
    pub fn xor_rect(&mut self, x: usize, y: usize, w: usize, h: usize, mask: u32) {
        let native = self.native(mask);
        let (x_end, y_end) = self.clip(x, y, w, h);
        for yy in y..y_end {
            for xx in x..x_end {
                let v = self.load(xx, yy);
                self.store(xx, yy, v ^ native);
            }
        }
    }

    /// Move the band `[top + dy, bottom)` up by `dy` rows within columns
    /// `[x, x + w)`.
    pub fn scroll_up(&mut self, x: usize, w: usize, top: usize, bottom: usize, dy: usize) {
        let (x_end, bottom) = self.clip(x, top, w, bottom.saturating_sub(top));
        for yy in top..bottom.saturating_sub(dy) {
            for xx in x..x_end {
                let v = self.load(xx, yy + dy);
                self.store(xx, yy, v);
            }
        }
    }

    /// Vertical linear gradient over the whole screen.
    pub fn gradient(&mut self, top: u32, bottom: u32) {
        let den = self.height.saturating_sub(1).max(1);
        let channel = |c: u32, shift: u32| (c >> shift) as u8;
        for y in 0..self.height {
            let r = scale(channel(top, 16), channel(bottom, 16), y, den);
            let g = scale(channel(top, 8), channel(bottom, 8), y, den);
            let b = scale(channel(top, 0), channel(bottom, 0), y, den);
            let native = self.native(r << 16 | g << 8 | b);
            for x in 0..self.width {
                self.store(x, y, native);
            }
        }
    }
}

impl PixelSurface for Framebuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn put_pixel(&mut self, x: usize, y: usize, rgb: u32) {
        if x < self.width && y < self.height {
            let native = self.native(rgb);
            self.store(x, y, native);
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, rgb: u32) {
        let native = self.native(rgb);
        let (x_end, y_end) = self.clip(x, y, w, h);
        for yy in y..y_end {
            for xx in x..x_end {
                self.store(xx, yy, native);
            }
        }
    }
}
