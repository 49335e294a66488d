//! Terminal logging with colored module prefixes and a batch progress bar.
//!
//! ```ignore
//! log!("process"; "{} pages under {}", count, dir.display());
//!
//! let progress = Progress::new("pages", count);
//! progress.inc();
//! progress.finish();
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::{
        OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Cached terminal width, falls back to 120 columns.
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

// Bar layout: "[pages] [████░░░░] 42/100"
const BRACKET_LEN: usize = 2;
const SPACE_AFTER_PREFIX: usize = 1;
const BAR_WRAPPER_LEN: usize = 3;
const SPACE_BEFORE_COUNT: usize = 1;
const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;

#[inline]
const fn prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

fn terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

/// Log a message with a colored module prefix.
///
/// ```ignore
/// log!("git"; "history index covers {} paths", len);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::utils::log::log($module, &format!($($arg)*))
    }};
}

/// Single in-place progress bar for the batch walk.
///
/// Safe to bump from rayon workers; redraws are serialized by a mutex.
pub struct Progress {
    prefix: ColoredString,
    prefix_len: usize,
    total: usize,
    current: AtomicUsize,
    lock: Mutex<()>,
}

impl Progress {
    pub fn new(module: &'static str, total: usize) -> Self {
        let mut out = stdout().lock();
        writeln!(out).ok();
        out.flush().ok();

        Self {
            prefix: colorize_prefix(module),
            prefix_len: prefix_len(module.len()),
            total,
            current: AtomicUsize::new(0),
            lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn inc(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        self.draw(current);
    }

    fn draw(&self, current: usize) {
        let _guard = self.lock.lock();

        let count = format!("{current}/{}", self.total);
        let overhead = self.prefix_len + BAR_WRAPPER_LEN + SPACE_BEFORE_COUNT + count.len();
        let bar_width = bar_width(terminal_width() as usize, overhead);
        let filled = filled_cells(current, self.total, bar_width);
        let bar = "█".repeat(filled) + &"░".repeat(bar_width - filled);

        let mut out = stdout().lock();
        execute!(out, cursor::MoveUp(1), Clear(ClearType::CurrentLine)).ok();
        write!(out, "{} [{bar}] {count}", self.prefix).ok();
        execute!(out, cursor::MoveDown(1)).ok();
        write!(out, "\r").ok();
        out.flush().ok();
    }

    /// Erase the bar line.
    pub fn finish(&self) {
        let _guard = self.lock.lock();
        let mut out = stdout().lock();
        execute!(out, cursor::MoveUp(1), Clear(ClearType::CurrentLine)).ok();
        out.flush().ok();
    }
}

/// Space left on the line after `overhead`, kept within the bar bounds.
#[inline]
fn bar_width(term_width: usize, overhead: usize) -> usize {
    term_width
        .saturating_sub(overhead)
        .clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH)
}

#[inline]
fn filled_cells(current: usize, total: usize, width: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (current.min(total) * width) / total
}

/// Write one prefixed line, cut to the terminal width.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let max_len = (terminal_width() as usize).saturating_sub(prefix_len(module.len()));
    let message = truncate_str(message, max_len);

    let mut out = stdout().lock();
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{prefix} {message}").ok();
    out.flush().ok();
}

fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        "page" => prefix.bright_green().bold(),
        "git" => prefix.bright_blue().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Cut `s` to at most `max_len` bytes on a char boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
