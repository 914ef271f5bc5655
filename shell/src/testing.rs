/// Host test doubles for the firmware surfaces.
use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use crate::console::{Console, PixelSurface, Rect};
use crate::path::{resolve, CanonicalPath};
use crate::platform::{DateTime, DisplayInfo, Key, Keyboard, Platform, PlatformError, RegionKind};
use crate::store::{DirEntry, FileHandle, FileStore, FsError, NodeKind, OpenMode, RamFile, RamStore};

/// Pixel surface that records every in-bounds write.
pub struct RecordingSurface {
    width: usize,
    height: usize,
    pub writes: Vec<(usize, usize, u32)>,
}

impl RecordingSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, writes: Vec::new() }
    }
}

impl PixelSurface for RecordingSurface {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn put_pixel(&mut self, x: usize, y: usize, rgb: u32) {
        if x < self.width && y < self.height {
            self.writes.push((x, y, rgb));
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, rgb: u32) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.put_pixel(xx, yy, rgb);
            }
        }
    }
}

pub const CELL_W: usize = 8;
pub const CELL_H: usize = 16;

/// Character-grid console. Keeps the visible grid, a transcript of every
/// byte written since the last `take_output`, and the caret state.
pub struct MockConsole {
    cols: usize,
    rows: usize,
    grid: Vec<Vec<u8>>,
    col: usize,
    row: usize,
    transcript: String,
    pub caret: Option<(usize, usize)>,
    pub fg: u32,
    pub bg: u32,
    pub clears: usize,
    pub pixels: usize,
}

impl MockConsole {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            grid: std::vec![std::vec![b' '; cols]; rows],
            col: 0,
            row: 0,
            transcript: String::new(),
            caret: None,
            fg: 0,
            bg: 0,
            clears: 0,
            pixels: 0,
        }
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.transcript)
    }

    /// One grid row with trailing blanks removed.
    pub fn line(&self, row: usize) -> String {
        let text: String = self.grid[row].iter().map(|&b| b as char).collect();
        String::from(text.trim_end())
    }

    fn scroll(&mut self) {
        self.grid.remove(0);
        self.grid.push(std::vec![b' '; self.cols]);
    }

    fn newline(&mut self) {
        self.col = 0;
        if self.row + 1 < self.rows {
            self.row += 1;
        } else {
            self.scroll();
        }
    }
}

impl PixelSurface for MockConsole {
    fn width(&self) -> usize {
        self.cols * CELL_W
    }

    fn height(&self) -> usize {
        self.rows * CELL_H
    }

    fn put_pixel(&mut self, x: usize, y: usize, _rgb: u32) {
        if x < self.width() && y < self.height() {
            self.pixels += 1;
        }
    }

    fn fill_rect(&mut self, _x: usize, _y: usize, _w: usize, _h: usize, _rgb: u32) {}
}

impl Console for MockConsole {
    fn put_char(&mut self, c: u8) {
        self.transcript.push(c as char);
        if c == b'\n' {
            self.newline();
            return;
        }
        if self.col >= self.cols {
            self.newline();
        }
        self.grid[self.row][self.col] = c;
        self.col += 1;
    }

    fn clear(&mut self) {
        for row in self.grid.iter_mut() {
            row.fill(b' ');
        }
        self.col = 0;
        self.row = 0;
        self.clears += 1;
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
        self.col = col.min(self.cols);
        self.row = row.min(self.rows - 1);
    }

    fn set_colors(&mut self, fg: u32, bg: u32) {
        self.fg = fg;
        self.bg = bg;
    }

    fn set_caret(&mut self, col: usize, row: usize, visible: bool) {
        self.caret = if visible { Some((col, row)) } else { None };
    }

    fn viewport(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }
}

/// Scripted keyboard plus canned clock, memory map and display facts.
/// Running out of keys reports `Unsupported` instead of blocking.
pub struct MockPlatform {
    pub keys: VecDeque<Key>,
    pub clock: Option<DateTime>,
    pub regions: Vec<(RegionKind, u64)>,
    pub resets: usize,
    pub idles: usize,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            keys: VecDeque::new(),
            clock: None,
            regions: Vec::new(),
            resets: 0,
            idles: 0,
        }
    }

    pub fn type_str(&mut self, s: &str) {
        self.keys.extend(s.bytes().map(Key::Char));
    }

    pub fn type_line(&mut self, s: &str) {
        self.type_str(s);
        self.keys.push_back(Key::Enter);
    }
}

impl Keyboard for MockPlatform {
    fn read_key(&mut self) -> Result<Key, PlatformError> {
        self.keys.pop_front().ok_or(PlatformError::Unsupported)
    }
}

impl Platform for MockPlatform {
    fn now(&mut self) -> Result<DateTime, PlatformError> {
        self.clock.ok_or(PlatformError::Unsupported)
    }

    fn warm_reset(&mut self) {
        self.resets += 1;
    }

    fn memory_map(&mut self, visit: &mut dyn FnMut(RegionKind, u64)) -> Result<(), PlatformError> {
        for &(kind, pages) in &self.regions {
            visit(kind, pages);
        }
        Ok(())
    }

    fn idle(&mut self) {
        self.idles += 1;
    }

    fn display_info(&self) -> DisplayInfo {
        DisplayInfo {
            width: 1024,
            height: 768,
            framebuffer_base: 0x8000_0000,
            framebuffer_size: 1024 * 768 * 4,
        }
    }
}

/// [`RamStore`] seen through the quirks of a real volume: names that match
/// without regard to ASCII case, and a size reported by `stat` that need
/// not match the bytes held.
pub struct QuirkStore {
    pub inner: RamStore,
    pub fold_case: bool,
    pub reported_size: Option<u64>,
}

impl QuirkStore {
    pub fn new() -> Self {
        Self {
            inner: RamStore::new(),
            fold_case: false,
            reported_size: None,
        }
    }
}

impl FileStore for QuirkStore {
    type File = QuirkFile;

    fn open(&mut self, path: &CanonicalPath, mode: OpenMode, kind: NodeKind) -> Result<QuirkFile, FsError> {
        let file = if self.fold_case {
            let folded = resolve(&CanonicalPath::root(), &path.as_str().to_ascii_lowercase())
                .map_err(|_| FsError::InvalidName)?;
            self.inner.open(&folded, mode, kind)?
        } else {
            self.inner.open(path, mode, kind)?
        };
        Ok(QuirkFile {
            inner: file,
            reported_size: self.reported_size,
        })
    }
}

pub struct QuirkFile {
    inner: RamFile,
    reported_size: Option<u64>,
}

impl FileHandle for QuirkFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        self.inner.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        self.inner.write(buf)
    }

    fn stat(&mut self) -> Result<DirEntry, FsError> {
        let mut info = self.inner.stat()?;
        if let (Some(size), false) = (self.reported_size, info.is_dir()) {
            info.size = size;
        }
        Ok(info)
    }

    fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError> {
        self.inner.next_entry()
    }

    fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        self.inner.truncate(size)
    }

    fn delete(self) -> Result<(), FsError> {
        self.inner.delete()
    }
}
