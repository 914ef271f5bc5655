/// Uncompressed BMP decoder.
///
/// Accepts BITMAPINFOHEADER (or larger) images at 24 or 32 bits per pixel
/// with no compression. Everything is validated before the first pixel is
/// drawn: a rejected image leaves the surface untouched.
///
/// Layout of the fields read here:
/// ```text
///  0  u16  'BM'
/// 10  u32  pixel data offset
/// 14  u32  DIB header size (>= 40)
/// 18  i32  width  (> 0)
/// 22  i32  height (!= 0, negative = top-down rows)
/// 26  u16  planes (== 1)
/// 28  u16  bits per pixel (24 | 32)
/// 30  u32  compression (== 0)
/// ```
use core::fmt;

use crate::console::{PixelSurface, Rect};

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: u32 = 40;
const HEADER_LEN: usize = FILE_HEADER_LEN + INFO_HEADER_LEN as usize;
const SIGNATURE: [u8; 2] = *b"BM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmpError {
    /// Fewer bytes than the headers need.
    Truncated,
    BadSignature,
    BadHeaderSize(u32),
    BadDimensions,
    BadPlanes(u16),
    UnsupportedDepth(u16),
    Compressed(u32),
    /// Pixel data would start inside the headers.
    BadPixelOffset(u32),
    /// Stride or image size does not fit the address space.
    Overflow,
    /// Declared pixel data runs past the end of the buffer.
    PixelDataOutOfBounds,
}

impl fmt::Display for BmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BmpError::Truncated => write!(f, "file too short for a bitmap header"),
            BmpError::BadSignature => write!(f, "not a BMP file"),
            BmpError::BadHeaderSize(n) => write!(f, "unsupported header size {}", n),
            BmpError::BadDimensions => write!(f, "invalid image dimensions"),
            BmpError::BadPlanes(n) => write!(f, "invalid plane count {}", n),
            BmpError::UnsupportedDepth(bpp) => write!(f, "unsupported depth {} bpp (need 24 or 32)", bpp),
            BmpError::Compressed(c) => write!(f, "compressed bitmaps not supported (method {})", c),
            BmpError::BadPixelOffset(off) => write!(f, "pixel data offset {} inside header", off),
            BmpError::Overflow => write!(f, "image size overflows"),
            BmpError::PixelDataOutOfBounds => write!(f, "pixel data truncated"),
        }
    }
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn i32_at(bytes: &[u8], at: usize) -> i32 {
    u32_at(bytes, at) as i32
}

/// Bytes per row, padded to a multiple of four.
pub fn row_stride(width: usize, bpp: usize) -> Option<usize> {
    let bits = width.checked_mul(bpp)?.checked_add(31)?;
    Some(bits / 32 * 4)
}

/// A validated image borrowing the file bytes.
#[derive(Debug)]
pub struct BmpImage<'a> {
    pixels: &'a [u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
    stride: usize,
    top_down: bool,
}

impl<'a> BmpImage<'a> {
    /// Validate headers and bounds. No arithmetic is done unchecked.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, BmpError> {
        if bytes.len() < HEADER_LEN {
            return Err(BmpError::Truncated);
        }
        if bytes[..2] != SIGNATURE {
            return Err(BmpError::BadSignature);
        }

        let offset = u32_at(bytes, 10);
        let header_size = u32_at(bytes, 14);
        let width = i32_at(bytes, 18);
        let height = i32_at(bytes, 22);
        let planes = u16_at(bytes, 26);
        let bpp = u16_at(bytes, 28);
        let compression = u32_at(bytes, 30);

        if header_size < INFO_HEADER_LEN {
            return Err(BmpError::BadHeaderSize(header_size));
        }
        if width <= 0 || height == 0 || height == i32::MIN {
            return Err(BmpError::BadDimensions);
        }
        if planes != 1 {
            return Err(BmpError::BadPlanes(planes));
        }
        if bpp != 24 && bpp != 32 {
            return Err(BmpError::UnsupportedDepth(bpp));
        }
        if compression != 0 {
            return Err(BmpError::Compressed(compression));
        }
        if (offset as usize) < HEADER_LEN {
            return Err(BmpError::BadPixelOffset(offset));
        }

        let width = width as usize;
        let rows = height.unsigned_abs() as usize;
        let stride = row_stride(width, bpp as usize).ok_or(BmpError::Overflow)?;
        let needed = stride.checked_mul(rows).ok_or(BmpError::Overflow)?;
        let end = (offset as usize).checked_add(needed).ok_or(BmpError::Overflow)?;
        if end > bytes.len() {
            return Err(BmpError::PixelDataOutOfBounds);
        }

        Ok(Self {
            pixels: &bytes[offset as usize..end],
            width,
            height: rows,
            bytes_per_pixel: bpp as usize / 8,
            stride,
            top_down: height < 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at (x, y), y counted from the top, as 0xRRGGBB.
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        let row = if self.top_down { y } else { self.height - 1 - y };
        let at = row * self.stride + x * self.bytes_per_pixel;
        let (b, g, r) = (self.pixels[at], self.pixels[at + 1], self.pixels[at + 2]);
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }
}

/// Source window and destination origin for one blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub src_x: usize,
    pub src_y: usize,
    pub dst_x: usize,
    pub dst_y: usize,
    pub width: usize,
    pub height: usize,
}

/// Center an image in a viewport. Each axis is handled on its own: an
/// oversized axis is cropped equally from both sides, a smaller one is
/// padded equally.
pub fn placement(image_w: usize, image_h: usize, viewport: Rect) -> Placement {
    let (src_x, dst_x, width) = center(image_w, viewport.width);
    let (src_y, dst_y, height) = center(image_h, viewport.height);
    Placement {
        src_x,
        src_y,
        dst_x: viewport.x + dst_x,
        dst_y: viewport.y + dst_y,
        width,
        height,
    }
}

fn center(image: usize, view: usize) -> (usize, usize, usize) {
    if image > view {
        ((image - view) / 2, 0, view)
    } else {
        (0, (view - image) / 2, image)
    }
}

pub fn blit<S: PixelSurface + ?Sized>(image: &BmpImage<'_>, surface: &mut S, at: &Placement) {
    for y in 0..at.height {
        for x in 0..at.width {
            let rgb = image.pixel(at.src_x + x, at.src_y + y);
            surface.put_pixel(at.dst_x + x, at.dst_y + y, rgb);
        }
    }
}

/// Validate `bytes` and draw the image centered in `viewport`.
pub fn decode_and_blit<S: PixelSurface + ?Sized>(
    bytes: &[u8],
    surface: &mut S,
    viewport: Rect,
) -> Result<Placement, BmpError> {
    let image = BmpImage::parse(bytes)?;
    let at = placement(image.width(), image.height(), viewport);
    log::debug!(
        "[bmp] {}x{} -> {}x{} at ({}, {})",
        image.width(),
        image.height(),
        at.width,
        at.height,
        at.dst_x,
        at.dst_y
    );
    blit(&image, surface, &at);
    Ok(at)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::RecordingSurface;

    /// Build a BMP. `rows` are given top row first as 0xRRGGBB.
    pub(crate) fn build(rows: &[&[u32]], bpp: u16, top_down: bool) -> std::vec::Vec<u8> {
        let width = rows[0].len();
        let height = rows.len();
        let stride = row_stride(width, bpp as usize).unwrap();
        let mut out = std::vec![0u8; HEADER_LEN];
        out[..2].copy_from_slice(b"BM");
        out[10..14].copy_from_slice(&(HEADER_LEN as u32).to_le_bytes());
        out[14..18].copy_from_slice(&INFO_HEADER_LEN.to_le_bytes());
        out[18..22].copy_from_slice(&(width as i32).to_le_bytes());
        let h = if top_down { -(height as i32) } else { height as i32 };
        out[22..26].copy_from_slice(&h.to_le_bytes());
        out[26..28].copy_from_slice(&1u16.to_le_bytes());
        out[28..30].copy_from_slice(&bpp.to_le_bytes());

        let ordered: std::vec::Vec<&[u32]> = if top_down {
            rows.to_vec()
        } else {
            rows.iter().rev().copied().collect()
        };
        for row in ordered {
            let start = out.len();
            for &rgb in row {
                out.extend_from_slice(&[rgb as u8, (rgb >> 8) as u8, (rgb >> 16) as u8]);
                if bpp == 32 {
                    out.push(0xFF);
                }
            }
            out.resize(start + stride, 0);
        }
        let size = out.len() as u32;
        out[2..6].copy_from_slice(&size.to_le_bytes());
        out
    }

    const R: u32 = 0xFF0000;
    const G: u32 = 0x00FF00;
    const B: u32 = 0x0000FF;
    const W: u32 = 0xFFFFFF;

    #[test]
    fn stride_pads_to_four_bytes() {
        assert_eq!(row_stride(1, 24), Some(4));
        assert_eq!(row_stride(3, 24), Some(12));
        assert_eq!(row_stride(5, 24), Some(16));
        assert_eq!(row_stride(3, 32), Some(12));
        assert_eq!(row_stride(usize::MAX, 32), None);
    }

    #[test]
    fn bottom_up_rows_are_flipped() {
        let bytes = build(&[&[R, G], &[B, W]], 24, false);
        let image = BmpImage::parse(&bytes).unwrap();
        assert_eq!(image.pixel(0, 0), R);
        assert_eq!(image.pixel(1, 0), G);
        assert_eq!(image.pixel(0, 1), B);
        assert_eq!(image.pixel(1, 1), W);
    }

    #[test]
    fn top_down_rows_keep_order() {
        let bytes = build(&[&[R, G, B], &[W, R, G]], 32, true);
        let image = BmpImage::parse(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.pixel(2, 0), B);
        assert_eq!(image.pixel(0, 1), W);
    }

    #[test]
    fn truncated_pixel_data_draws_nothing() {
        let mut bytes = build(&[&[R, G], &[B, W]], 24, false);
        bytes.truncate(bytes.len() - 3);
        let mut surface = RecordingSurface::new(16, 16);
        let result = decode_and_blit(&bytes, &mut surface, Rect::new(0, 0, 16, 16));
        assert_eq!(result, Err(BmpError::PixelDataOutOfBounds));
        assert!(surface.writes.is_empty());
    }

    #[test]
    fn compressed_image_draws_nothing() {
        let mut bytes = build(&[&[R]], 24, false);
        bytes[30] = 1;
        let mut surface = RecordingSurface::new(4, 4);
        assert_eq!(
            decode_and_blit(&bytes, &mut surface, Rect::new(0, 0, 4, 4)),
            Err(BmpError::Compressed(1))
        );
        assert!(surface.writes.is_empty());
    }

    #[test]
    fn palette_image_draws_nothing() {
        let mut bytes = build(&[&[R]], 24, false);
        bytes[28] = 8;
        let mut surface = RecordingSurface::new(4, 4);
        assert_eq!(
            decode_and_blit(&bytes, &mut surface, Rect::new(0, 0, 4, 4)),
            Err(BmpError::UnsupportedDepth(8))
        );
        assert!(surface.writes.is_empty());
    }

    #[test]
    fn header_fields_are_validated() {
        let good = build(&[&[R]], 24, false);

        assert_eq!(BmpImage::parse(&good[..20]).err(), Some(BmpError::Truncated));

        let mut bad = good.clone();
        bad[0] = b'X';
        assert_eq!(BmpImage::parse(&bad).err(), Some(BmpError::BadSignature));

        let mut bad = good.clone();
        bad[14] = 12;
        assert_eq!(BmpImage::parse(&bad).err(), Some(BmpError::BadHeaderSize(12)));

        let mut bad = good.clone();
        bad[18..22].copy_from_slice(&0i32.to_le_bytes());
        assert_eq!(BmpImage::parse(&bad).err(), Some(BmpError::BadDimensions));

        let mut bad = good.clone();
        bad[26] = 2;
        assert_eq!(BmpImage::parse(&bad).err(), Some(BmpError::BadPlanes(2)));

        let mut bad = good.clone();
        bad[10] = 4;
        assert_eq!(BmpImage::parse(&bad).err(), Some(BmpError::BadPixelOffset(4)));
    }

    #[test]
    fn huge_dimensions_fail_closed() {
        let mut bytes = build(&[&[R]], 32, false);
        bytes[18..22].copy_from_slice(&i32::MAX.to_le_bytes());
        bytes[22..26].copy_from_slice(&i32::MAX.to_le_bytes());
        let err = BmpImage::parse(&bytes).unwrap_err();
        assert!(matches!(err, BmpError::Overflow | BmpError::PixelDataOutOfBounds));
    }

    #[test]
    fn small_image_is_centered() {
        let at = placement(10, 4, Rect::new(100, 50, 20, 10));
        assert_eq!(at, Placement { src_x: 0, src_y: 0, dst_x: 105, dst_y: 53, width: 10, height: 4 });
    }

    #[test]
    fn axes_crop_and_pad_independently() {
        // Too wide, too short: cropped horizontally, padded vertically.
        let at = placement(30, 4, Rect::new(0, 0, 20, 10));
        assert_eq!(at, Placement { src_x: 5, src_y: 0, dst_x: 0, dst_y: 3, width: 20, height: 4 });
    }

    #[test]
    fn blit_writes_cropped_center() {
        let bytes = build(&[&[R, G, B], &[W, W, W], &[B, G, R]], 24, true);
        let mut surface = RecordingSurface::new(1, 1);
        let at = decode_and_blit(&bytes, &mut surface, Rect::new(0, 0, 1, 1)).unwrap();
        assert_eq!((at.src_x, at.src_y), (1, 1));
        assert_eq!(surface.writes, [(0, 0, W)]);
    }
}
