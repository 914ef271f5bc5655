/// Built-in shell commands.
///
/// Each handler gets the session context and the raw argument text. Paths
/// are resolved against the working directory before anything touches the
/// volume, and every handle is dropped on the way out, error or not.
use alloc::vec::Vec;

use heapless::String;

use super::{Command, Context, Handler, Registry, ShellError};
use crate::bmp;
use crate::config::{COPY_CHUNK, MAX_IMAGE_BYTES, NAME_MAX, RESERVED_TREE, VERSION};
use crate::console::Console;
use crate::path::{resolve, CanonicalPath};
use crate::platform::{Platform, PlatformError, RegionKind};
use crate::settings::{self, find_theme, PromptMode, THEMES};
use crate::store::{self, DirEntry, FileHandle, FileStore, FsError, Modified, NodeKind, OpenMode};
use crate::{con_print, con_println};

/// Build the command table. Entries with an empty summary are aliases and
/// stay out of `help`.
pub(super) fn registry<C: Console, F: FileStore, P: Platform>() -> Registry<C, F, P> {
    let table: [(&'static str, Handler<C, F, P>, &'static str); 31] = [
        ("help", cmd_help, "help                 list commands"),
        ("?", cmd_help, ""),
        ("clear", cmd_clear, "clear                clear the screen"),
        ("cls", cmd_clear, ""),
        ("echo", cmd_echo, "echo <text>          print text"),
        ("info", cmd_info, "info                 show system info"),
        ("pwd", cmd_pwd, "pwd                  print working directory"),
        ("cd", cmd_cd, "cd [dir]             change directory"),
        ("ls", cmd_ls, "ls [-l] [path]       list a directory"),
        ("dir", cmd_ls, ""),
        ("cat", cmd_cat, "cat <file>           print a file"),
        ("mkdir", cmd_mkdir, "mkdir [-p] <dir>     create a directory"),
        ("touch", cmd_touch, "touch <file>         create an empty file"),
        ("cp", cmd_cp, "cp <src> <dst>       copy a file"),
        ("mv", cmd_mv, "mv <src> <dst>       move or rename a file"),
        ("ren", cmd_mv, ""),
        ("rm", cmd_rm, "rm <path>            delete a file or empty directory"),
        ("del", cmd_rm, ""),
        ("hexdump", cmd_hexdump, "hexdump <file>       hex dump a file"),
        ("xxd", cmd_hexdump, ""),
        ("view", cmd_view, "view <file.bmp>      show a 24/32-bit BMP image"),
        ("history", cmd_history, "history              list previous commands"),
        ("bootstrap", cmd_bootstrap, "bootstrap            create the /hatteros tree"),
        ("theme", cmd_theme, "theme [name]         list or select a color theme"),
        ("prompt", cmd_prompt, "prompt [full|short]  show or set the prompt style"),
        ("date", cmd_date, "date                 show the firmware clock"),
        ("time", cmd_date, ""),
        ("memmap", cmd_memmap, "memmap               summarize the memory map"),
        ("mem", cmd_memmap, ""),
        ("reboot", cmd_reboot, "reboot               warm reset the machine"),
        ("reset", cmd_reboot, ""),
    ];

    let mut map = Registry::new();
    for (name, handler, help) in table {
        if map.insert(name, Command { handler, help }).is_err() {
            log::warn!("[shell] command table full, dropping {}", name);
        }
    }
    map
}

fn one_arg<'a>(args: &'a str, usage: &'static str) -> Result<&'a str, ShellError> {
    match args.trim() {
        "" => Err(ShellError::Usage(usage)),
        arg => Ok(arg),
    }
}

/// Split on the first whitespace run. Both halves must be present.
fn two_args<'a>(args: &'a str, usage: &'static str) -> Result<(&'a str, &'a str), ShellError> {
    let args = args.trim();
    let idx = args.find(char::is_whitespace).ok_or(ShellError::Usage(usage))?;
    let (first, second) = (&args[..idx], args[idx..].trim());
    if second.is_empty() {
        return Err(ShellError::Usage(usage));
    }
    Ok((first, second))
}

fn is_text(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

fn cmd_help<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    let table: Registry<C, F, P> = registry();
    con_println!(ctx.console, "Commands:");
    for (_, command) in table.iter().filter(|(_, c)| !c.help.is_empty()) {
        con_println!(ctx.console, "  {}", command.help);
    }
    con_println!(ctx.console);
    con_println!(ctx.console, "Aliases: ? cls dir ren del xxd time mem reset");
    con_println!(ctx.console, "Keys: Left/Right/Home/End move, Up/Down history, Esc clears");
    Ok(())
}

fn cmd_clear<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    ctx.console.clear();
    Ok(())
}

fn cmd_echo<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    con_println!(ctx.console, "{}", args);
    Ok(())
}

fn cmd_info<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    let display = ctx.platform.display_info();
    let (cols, rows) = (ctx.console.columns(), ctx.console.rows());
    con_println!(ctx.console, "HatterOS stage-0 shell");
    con_println!(ctx.console, "Version: {}", VERSION);
    con_println!(ctx.console, "Resolution: {}x{}", display.width, display.height);
    con_println!(ctx.console, "Framebuffer: {:#x}", display.framebuffer_base);
    con_println!(ctx.console, "Framebuffer size: {} bytes", display.framebuffer_size);
    con_println!(ctx.console, "Text grid: {}x{}", cols, rows);
    Ok(())
}

fn cmd_pwd<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    con_println!(ctx.console, "{}", ctx.session.cwd);
    Ok(())
}

fn cmd_cd<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let target = match args.trim() {
        "" => CanonicalPath::root(),
        arg => resolve(&ctx.session.cwd, arg)?,
    };
    if !store::stat_path(ctx.store, &target)?.is_dir() {
        return Err(FsError::NotADirectory.into());
    }
    ctx.session.cwd = target;
    Ok(())
}

/// Entry name with a trailing `/` for directories.
fn display_name(entry: &DirEntry) -> String<{ NAME_MAX + 1 }> {
    let mut name = String::new();
    let _ = name.push_str(&entry.name);
    if entry.is_dir() {
        let _ = name.push('/');
    }
    name
}

fn print_entry<C: Console + ?Sized>(console: &mut C, entry: &DirEntry, long: bool) {
    let name = display_name(entry);
    match (long, entry.is_dir()) {
        (false, true) => con_println!(console, "{:<32} {:>10}", name.as_str(), "<DIR>"),
        (false, false) => con_println!(console, "{:<32} {:>10}", name.as_str(), entry.size),
        (true, dir) => con_println!(
            console,
            "{:<4} {:>10}  {:<19}  {}",
            if dir { "dir" } else { "file" },
            entry.size,
            Modified(&entry.modified),
            name.as_str()
        ),
    }
}

fn cmd_ls<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    const USAGE: &str = "ls [-l] [path]";
    let mut long = false;
    let mut target = None;
    for word in args.split_whitespace() {
        match word {
            "-l" => long = true,
            _ if target.is_none() => target = Some(word),
            _ => return Err(ShellError::Usage(USAGE)),
        }
    }
    let path = resolve(&ctx.session.cwd, target.unwrap_or("."))?;

    let mut dir = ctx.store.open(&path, OpenMode::READ, NodeKind::Directory)?;
    let info = dir.stat()?;
    if !info.is_dir() {
        let entry = info.with_name(path.file_name().unwrap_or("/"));
        print_entry(ctx.console, &entry, long);
        return Ok(());
    }

    let (mut files, mut dirs, mut bytes) = (0usize, 0usize, 0u64);
    for entry in store::entries(&mut dir) {
        let entry = entry?;
        if entry.is_dir() {
            dirs += 1;
        } else {
            files += 1;
            bytes += entry.size;
        }
        print_entry(ctx.console, &entry, long);
    }
    con_println!(ctx.console, "{} file(s), {} dir(s), {} bytes", files, dirs, bytes);
    Ok(())
}

fn cmd_cat<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let path = resolve(&ctx.session.cwd, one_arg(args, "cat <file>")?)?;
    let mut file = ctx.store.open(&path, OpenMode::READ, NodeKind::File)?;
    if file.stat()?.is_dir() {
        return Err(FsError::IsADirectory.into());
    }

    let mut chunk = [0u8; COPY_CHUNK];
    let mut last = b'\n';
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        for &b in &chunk[..n] {
            match b {
                b'\n' => ctx.console.put_char(b'\n'),
                b'\r' => {}
                b if is_text(b) => ctx.console.put_char(b),
                _ => ctx.console.put_char(b'.'),
            }
        }
        last = chunk[n - 1];
    }
    if last != b'\n' {
        ctx.console.put_char(b'\n');
    }
    Ok(())
}

fn cmd_mkdir<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    const USAGE: &str = "mkdir [-p] <dir>";
    let mut parents = false;
    let mut target = None;
    for word in args.split_whitespace() {
        match word {
            "-p" => parents = true,
            _ if target.is_none() => target = Some(word),
            _ => return Err(ShellError::Usage(USAGE)),
        }
    }
    let path = resolve(&ctx.session.cwd, target.ok_or(ShellError::Usage(USAGE))?)?;

    if parents {
        store::create_dir_all(ctx.store, &path)?;
        return Ok(());
    }
    match store::stat_path(ctx.store, &path) {
        Ok(_) => Err(FsError::AlreadyExists.into()),
        Err(FsError::NotFound) => Ok(store::create_dir(ctx.store, &path)?),
        Err(e) => Err(e.into()),
    }
}

fn cmd_touch<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let path = resolve(&ctx.session.cwd, one_arg(args, "touch <file>")?)?;
    ctx.store.open(&path, OpenMode::CREATE_READ_WRITE, NodeKind::File)?;
    Ok(())
}

/// Resolve a copy or move. A destination naming an existing directory
/// receives the source's name.
fn transfer_paths<C: Console, F: FileStore, P: Platform>(
    ctx: &mut Context<'_, C, F, P>,
    args: &str,
    usage: &'static str,
) -> Result<(CanonicalPath, CanonicalPath), ShellError> {
    let (src, dst) = two_args(args, usage)?;
    let src = resolve(&ctx.session.cwd, src)?;
    let mut dst = resolve(&ctx.session.cwd, dst)?;

    let name = src.file_name().ok_or(ShellError::Refused("cannot copy the root directory"))?;
    match store::stat_path(ctx.store, &dst) {
        Ok(entry) if entry.is_dir() => dst = dst.join(name)?,
        Ok(_) | Err(FsError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }
    // Volume names compare without regard to ASCII case.
    if src.as_str().eq_ignore_ascii_case(dst.as_str()) {
        return Err(ShellError::SameFile);
    }
    Ok((src, dst))
}

fn cmd_cp<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let (src, dst) = transfer_paths(ctx, args, "cp <src> <dst>")?;
    let n = store::copy_file(ctx.store, &src, &dst)?;
    con_println!(ctx.console, "copied {} bytes to {}", n, dst);
    Ok(())
}

fn cmd_mv<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let (src, dst) = transfer_paths(ctx, args, "mv <src> <dst>")?;
    store::move_file(ctx.store, &src, &dst)?;
    con_println!(ctx.console, "moved {} -> {}", src, dst);
    Ok(())
}

fn cmd_rm<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let path = resolve(&ctx.session.cwd, one_arg(args, "rm <path>")?)?;
    if path.is_root() {
        return Err(ShellError::Refused("refusing to remove the root directory"));
    }
    if ctx.session.cwd.starts_with(&path) {
        return Err(ShellError::Refused("cannot remove the current directory"));
    }
    let node = ctx.store.open(&path, OpenMode::READ_WRITE, NodeKind::File)?;
    node.delete()?;
    Ok(())
}

const HEX_ROW: usize = 16;

fn hex_row<C: Console + ?Sized>(console: &mut C, offset: u64, row: &[u8]) {
    con_print!(console, "{:08x}  ", offset);
    for i in 0..HEX_ROW {
        match row.get(i) {
            Some(b) => con_print!(console, "{:02x} ", b),
            None => console.put_str("   "),
        }
        if i == 7 {
            console.put_char(b' ');
        }
    }
    console.put_str(" |");
    for &b in row {
        console.put_char(if is_text(b) { b } else { b'.' });
    }
    console.put_str("|\n");
}

fn cmd_hexdump<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let path = resolve(&ctx.session.cwd, one_arg(args, "hexdump <file>")?)?;
    let mut file = ctx.store.open(&path, OpenMode::READ, NodeKind::File)?;
    if file.stat()?.is_dir() {
        return Err(FsError::IsADirectory.into());
    }

    let mut chunk = [0u8; COPY_CHUNK];
    let mut row = [0u8; HEX_ROW];
    let mut fill = 0usize;
    let mut offset = 0u64;
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        for &b in &chunk[..n] {
            row[fill] = b;
            fill += 1;
            if fill == HEX_ROW {
                hex_row(ctx.console, offset, &row);
                offset += HEX_ROW as u64;
                fill = 0;
            }
        }
    }
    if fill > 0 {
        hex_row(ctx.console, offset, &row[..fill]);
    }
    con_println!(ctx.console, "{:08x}", offset + fill as u64);
    Ok(())
}

fn cmd_view<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let path = resolve(&ctx.session.cwd, one_arg(args, "view <file.bmp>")?)?;
    let data = {
        let mut file = ctx.store.open(&path, OpenMode::READ, NodeKind::File)?;
        let info = file.stat()?;
        if info.is_dir() {
            return Err(FsError::IsADirectory.into());
        }
        if info.size > MAX_IMAGE_BYTES {
            return Err(ShellError::TooLarge(info.size));
        }
        let size = usize::try_from(info.size).map_err(|_| ShellError::TooLarge(info.size))?;

        let mut data: Vec<u8> = Vec::new();
        data.try_reserve_exact(size).map_err(|_| ShellError::OutOfResources)?;
        data.resize(size, 0);
        store::read_exact(&mut file, &mut data)?;
        data
    };

    let viewport = ctx.console.viewport();
    let at = bmp::decode_and_blit(&data, ctx.console, viewport)?;
    log::info!("[shell] view {} ({}x{} shown)", path, at.width, at.height);

    ctx.platform.read_key()?;
    ctx.console.clear();
    Ok(())
}

fn cmd_history<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    for (i, line) in ctx.session.history.iter().enumerate() {
        con_println!(ctx.console, "{:>4}  {}", i + 1, line);
    }
    Ok(())
}

fn cmd_bootstrap<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    for dir in RESERVED_TREE {
        let path = resolve(&CanonicalPath::root(), dir)?;
        let existed = store::stat_path(ctx.store, &path).is_ok();
        store::create_dir(ctx.store, &path)?;
        con_println!(ctx.console, "  {:<8} {}", if existed { "exists" } else { "created" }, path);
    }
    Ok(())
}

/// Persist the session's preferences. A failure is reported but the new
/// preferences stay in effect.
fn persist<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>) {
    if let Err(e) = settings::save(ctx.store, &ctx.session.settings()) {
        log::warn!("[settings] save failed: {}", e);
        con_println!(ctx.console, "(not saved: {})", e);
    }
}

fn cmd_theme<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let name = args.trim();
    if name.is_empty() {
        for theme in THEMES.iter() {
            let current = theme.fg == ctx.session.fg && theme.bg == ctx.session.bg;
            con_println!(ctx.console, "{} {:<8} fg {:06x} bg {:06x}", if current { '*' } else { ' ' }, theme.name, theme.fg, theme.bg);
        }
        return Ok(());
    }

    let theme = find_theme(name).ok_or(ShellError::UnknownTheme)?;
    ctx.session.fg = theme.fg;
    ctx.session.bg = theme.bg;
    ctx.console.set_colors(theme.fg, theme.bg);
    ctx.console.clear();
    con_println!(ctx.console, "theme: {}", theme.name);
    persist(ctx);
    Ok(())
}

fn cmd_prompt<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, args: &str) -> Result<(), ShellError> {
    let mode = match args.trim() {
        "" => {
            let current = match ctx.session.prompt_mode {
                PromptMode::Full => "full",
                PromptMode::Short => "short",
            };
            con_println!(ctx.console, "prompt: {}", current);
            return Ok(());
        }
        "full" => PromptMode::Full,
        "short" => PromptMode::Short,
        _ => return Err(ShellError::Usage("prompt [full|short]")),
    };
    ctx.session.prompt_mode = mode;
    persist(ctx);
    Ok(())
}

fn cmd_date<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    let now = ctx.platform.now()?;
    con_println!(ctx.console, "{}", now);
    Ok(())
}

fn cmd_memmap<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    let mut regions = [0usize; RegionKind::COUNT];
    let mut pages = [0u64; RegionKind::COUNT];
    ctx.platform.memory_map(&mut |kind, count| {
        regions[kind.index()] += 1;
        pages[kind.index()] += count;
    })?;

    con_println!(ctx.console, "{:<14} {:>7} {:>10} {:>10}", "type", "regions", "pages", "KiB");
    let mut total = 0u64;
    for kind in RegionKind::ALL {
        let i = kind.index();
        if regions[i] == 0 {
            continue;
        }
        total += pages[i];
        con_println!(ctx.console, "{:<14} {:>7} {:>10} {:>10}", kind.label(), regions[i], pages[i], pages[i] * 4);
    }
    con_println!(ctx.console, "{:<14} {:>7} {:>10} {:>10}", "total", regions.iter().sum::<usize>(), total, total * 4);
    Ok(())
}

fn cmd_reboot<C: Console, F: FileStore, P: Platform>(ctx: &mut Context<'_, C, F, P>, _args: &str) -> Result<(), ShellError> {
    con_println!(ctx.console, "Rebooting...");
    ctx.platform.warm_reset();
    Err(PlatformError::Unsupported.into())
}
