/// HatterOS interactive shell.
///
/// Reads one line at a time through the line editor, looks the first word
/// up in the command registry and runs the handler against the session,
/// the console, the boot volume and the platform services. A failing
/// command prints its error and the loop goes on; only `reboot` leaves.
mod commands;
mod error;
mod history;
mod line;


pub use error::{ErrorKind, ShellError};
pub use history::History;
pub use line::{Edit, LineEditor};

use heapless::{FnvIndexMap, String};

use crate::config::{DEFAULT_BG, DEFAULT_FG, LINE_MAX, VERSION};
use crate::console::Console;
use crate::path::CanonicalPath;
use crate::platform::{Platform, PlatformError};
use crate::settings::{self, PromptMode, SettingsRecord};
use crate::store::FileStore;
use crate::{con_print, con_println};

const PROMPT_HOST: &str = "hatteros";
const REGISTRY_CAP: usize = 64;
/// Consecutive keyboard failures before the loop starts idling.
const INPUT_RETRY_LIMIT: u32 = 3;

/// Mutable state of one shell run.
pub struct Session {
    pub cwd: CanonicalPath,
    pub fg: u32,
    pub bg: u32,
    pub prompt_mode: PromptMode,
    pub history: History,
}

impl Session {
    pub fn new() -> Self {
        Self {
            cwd: CanonicalPath::root(),
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            prompt_mode: PromptMode::Full,
            history: History::new(),
        }
    }

    /// Record to persist for the current preferences.
    pub fn settings(&self) -> SettingsRecord {
        SettingsRecord::new(self.fg, self.bg, self.prompt_mode)
    }

    pub fn apply_settings(&mut self, record: &SettingsRecord) {
        self.fg = record.fg;
        self.bg = record.bg;
        self.prompt_mode = record.prompt_mode();
    }

    pub fn write_prompt<C: Console + ?Sized>(&self, console: &mut C) {
        match self.prompt_mode {
            PromptMode::Full => con_print!(console, "{}:{}> ", PROMPT_HOST, self.cwd),
            PromptMode::Short => {
                con_print!(console, "{}:{}> ", PROMPT_HOST, self.cwd.file_name().unwrap_or("/"))
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a command handler may touch.
pub struct Context<'a, C, F, P> {
    pub session: &'a mut Session,
    pub console: &'a mut C,
    pub store: &'a mut F,
    pub platform: &'a mut P,
}

/// A command handler. The argument is the raw remainder of the line after
/// the command word, with leading whitespace removed.
pub type Handler<C, F, P> = fn(&mut Context<'_, C, F, P>, &str) -> Result<(), ShellError>;

pub struct Command<C, F, P> {
    pub handler: Handler<C, F, P>,
    /// One-line summary for `help`; empty for aliases.
    pub help: &'static str,
}

impl<C, F, P> Clone for Command<C, F, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, F, P> Copy for Command<C, F, P> {}

pub type Registry<C, F, P> = FnvIndexMap<&'static str, Command<C, F, P>, REGISTRY_CAP>;

pub struct Shell<C, F, P> {
    session: Session,
    console: C,
    store: F,
    platform: P,
    editor: LineEditor,
    commands: Registry<C, F, P>,
    /// The prompt is written before the next read.
    prompt_pending: bool,
}

/// Split a line into the command word and the rest.
fn split_command(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    }
}

impl<C: Console, F: FileStore, P: Platform> Shell<C, F, P> {
    pub fn new(console: C, store: F, platform: P) -> Self {
        Self {
            session: Session::new(),
            console,
            store,
            platform,
            editor: LineEditor::new(),
            commands: commands::registry(),
            prompt_pending: true,
        }
    }

    /// Load persisted settings, paint the screen and print the banner.
    pub fn start(&mut self) {
        if let Some(record) = settings::load(&mut self.store) {
            log::info!("[shell] settings loaded");
            self.session.apply_settings(&record);
        }
        self.console.set_colors(self.session.fg, self.session.bg);
        self.console.clear();
        con_println!(&mut self.console, "HatterOS {} pre-boot shell", VERSION);
        con_println!(&mut self.console, "Type 'help' for commands.");
        con_println!(&mut self.console);
    }

    /// Read and execute lines forever. Call `start` first.
    pub fn run(&mut self) -> ! {
        let mut failures = 0u32;
        loop {
            self.poll(&mut failures);
        }
    }

    /// One turn of the read loop. `failures` counts consecutive keyboard
    /// errors: the first is reported and re-prompts, later ones stay
    /// quiet, and from `INPUT_RETRY_LIMIT` on the platform idles between
    /// attempts.
    pub fn poll(&mut self, failures: &mut u32) {
        match self.step() {
            Ok(()) => *failures = 0,
            Err(e) => {
                *failures = failures.saturating_add(1);
                if *failures == 1 {
                    log::warn!("[shell] keyboard: {}", e);
                    if self.console.cursor().0 != 0 {
                        self.console.put_char(b'\n');
                    }
                    con_println!(&mut self.console, "Input error.");
                    self.prompt_pending = true;
                }
                if *failures == INPUT_RETRY_LIMIT {
                    log::warn!("[shell] keyboard still failing, backing off");
                }
                if *failures >= INPUT_RETRY_LIMIT {
                    self.platform.idle();
                }
            }
        }
    }

    /// Prompt if needed, read one line, execute it.
    pub fn step(&mut self) -> Result<(), PlatformError> {
        if self.prompt_pending {
            self.session.write_prompt(&mut self.console);
            self.prompt_pending = false;
        }
        let line = self
            .editor
            .read_line(&mut self.platform, &mut self.console, &self.session.history)?;
        let mut owned: String<LINE_MAX> = String::new();
        // The editor never holds more than LINE_MAX bytes.
        let _ = owned.push_str(line);
        self.prompt_pending = true;
        self.execute(&owned);
        Ok(())
    }

    /// Execute one command line.
    pub fn execute(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.session.history.push(line);
        log::debug!("[shell] {}", line);

        let (name, rest) = split_command(line);
        let command = match self.commands.get(name) {
            Some(command) => *command,
            None => {
                con_println!(&mut self.console, "Unknown command: {}", name);
                con_println!(&mut self.console, "Type 'help' for available commands.");
                return;
            }
        };

        let mut ctx = Context {
            session: &mut self.session,
            console: &mut self.console,
            store: &mut self.store,
            platform: &mut self.platform,
        };
        if let Err(e) = (command.handler)(&mut ctx, rest) {
            log::debug!("[shell] {} failed ({:?}): {:?}", name, e.kind(), e);
            match e {
                ShellError::Usage(_) => con_println!(&mut self.console, "{}", e),
                _ => con_println!(&mut self.console, "{}: {}", name, e),
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn store(&self) -> &F {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut F {
        &mut self.store
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
