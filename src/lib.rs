//! A minimal cell based abstraction over a Unix terminal: a double
//! buffered character grid flushed with [`Term::present`], and a
//! unified event stream merging key presses with window resizes.
//!
//! [`Term::init`] opens the controlling terminal, switches it to raw
//! mode and takes over the screen with the alternate-screen and keypad
//! modes; everything is restored when the handle is dropped. Output
//! control sequences come from a small capability table selected from
//! `$TERM`, and input bytes are decoded against the same table.
//!
//! Only one [`Term`] may exist in a process at a time; initializing a
//! second one without dropping the first is not supported.

mod cellbuf;
mod input;
mod ringbuf;
mod term;
mod utf8;


use std::env;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::os::unix::io::{AsRawFd, RawFd};

use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::select::{select, FdSet};
use nix::sys::time::TimeVal;
use signal_hook::consts::SIGWINCH;
use signal_hook::SigId;

use crate::ringbuf::RingBuf;
use crate::term::{Func, TermEntry};

pub use crate::cellbuf::{Cell, CellBuf};

pub const BLACK: u16 = 0x00;
pub const RED: u16 = 0x01;
pub const GREEN: u16 = 0x02;
pub const YELLOW: u16 = 0x03;
pub const BLUE: u16 = 0x04;
pub const MAGENTA: u16 = 0x05;
pub const CYAN: u16 = 0x06;
pub const WHITE: u16 = 0x07;

/// Foreground attribute flag. On a background attribute the same bit
/// renders as blink.
pub const BOLD: u16 = 0x10;
pub const UNDERLINE: u16 = 0x20;

// Functional keys, `0xFFFF - index` of the capability table's key
// array. This is a safe subset of terminfo keys that exists on all
// popular terminals.
pub const KEY_F1: u16 = 0xFFFF;
pub const KEY_F2: u16 = 0xFFFF - 1;
pub const KEY_F3: u16 = 0xFFFF - 2;
pub const KEY_F4: u16 = 0xFFFF - 3;
pub const KEY_F5: u16 = 0xFFFF - 4;
pub const KEY_F6: u16 = 0xFFFF - 5;
pub const KEY_F7: u16 = 0xFFFF - 6;
pub const KEY_F8: u16 = 0xFFFF - 7;
pub const KEY_F9: u16 = 0xFFFF - 8;
pub const KEY_F10: u16 = 0xFFFF - 9;
pub const KEY_F11: u16 = 0xFFFF - 10;
pub const KEY_F12: u16 = 0xFFFF - 11;
pub const KEY_INSERT: u16 = 0xFFFF - 12;
pub const KEY_DELETE: u16 = 0xFFFF - 13;
pub const KEY_HOME: u16 = 0xFFFF - 14;
pub const KEY_END: u16 = 0xFFFF - 15;
pub const KEY_PGUP: u16 = 0xFFFF - 16;
pub const KEY_PGDN: u16 = 0xFFFF - 17;
pub const KEY_ARROW_UP: u16 = 0xFFFF - 18;
pub const KEY_ARROW_DOWN: u16 = 0xFFFF - 19;
pub const KEY_ARROW_LEFT: u16 = 0xFFFF - 20;
pub const KEY_ARROW_RIGHT: u16 = 0xFFFF - 21;

// Keys below the space character plus backspace, delivered as the raw
// byte value. Some of these are the same byte under two names.
pub const KEY_CTRL_TILDE: u16 = 0x00;
pub const KEY_CTRL_2: u16 = 0x00;
pub const KEY_CTRL_A: u16 = 0x01;
pub const KEY_CTRL_B: u16 = 0x02;
pub const KEY_CTRL_C: u16 = 0x03;
pub const KEY_CTRL_D: u16 = 0x04;
pub const KEY_CTRL_E: u16 = 0x05;
pub const KEY_CTRL_F: u16 = 0x06;
pub const KEY_CTRL_G: u16 = 0x07;
pub const KEY_BACKSPACE: u16 = 0x08;
pub const KEY_CTRL_H: u16 = 0x08;
pub const KEY_TAB: u16 = 0x09;
pub const KEY_CTRL_I: u16 = 0x09;
pub const KEY_CTRL_J: u16 = 0x0A;
pub const KEY_CTRL_K: u16 = 0x0B;
pub const KEY_CTRL_L: u16 = 0x0C;
pub const KEY_ENTER: u16 = 0x0D;
pub const KEY_CTRL_M: u16 = 0x0D;
pub const KEY_CTRL_N: u16 = 0x0E;
pub const KEY_CTRL_O: u16 = 0x0F;
pub const KEY_CTRL_P: u16 = 0x10;
pub const KEY_CTRL_Q: u16 = 0x11;
pub const KEY_CTRL_R: u16 = 0x12;
pub const KEY_CTRL_S: u16 = 0x13;
pub const KEY_CTRL_T: u16 = 0x14;
pub const KEY_CTRL_U: u16 = 0x15;
pub const KEY_CTRL_V: u16 = 0x16;
pub const KEY_CTRL_W: u16 = 0x17;
pub const KEY_CTRL_X: u16 = 0x18;
pub const KEY_CTRL_Y: u16 = 0x19;
pub const KEY_CTRL_Z: u16 = 0x1A;
pub const KEY_ESC: u16 = 0x1B;
pub const KEY_CTRL_LSQ_BRACKET: u16 = 0x1B;
pub const KEY_CTRL_3: u16 = 0x1B;
pub const KEY_CTRL_4: u16 = 0x1C;
pub const KEY_CTRL_BACKSLASH: u16 = 0x1C;
pub const KEY_CTRL_5: u16 = 0x1D;
pub const KEY_CTRL_RSQ_BRACKET: u16 = 0x1D;
pub const KEY_CTRL_6: u16 = 0x1E;
pub const KEY_CTRL_7: u16 = 0x1F;
pub const KEY_CTRL_SLASH: u16 = 0x1F;
pub const KEY_CTRL_UNDERSCORE: u16 = 0x1F;
pub const KEY_SPACE: u16 = 0x20;
pub const KEY_BACKSPACE2: u16 = 0x7F;
pub const KEY_CTRL_8: u16 = 0x7F;

/// A decoded key press. Exactly one of `key` (a `KEY_*` code, nonzero)
/// or `ch` (a Unicode scalar, non-NUL) is meaningful. `alt` is set
/// when the key arrived behind an ESC prefix in [`InputMode::Alt`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u16,
    pub ch: char,
    pub alt: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    /// The terminal window changed size. The grids are reshaped at the
    /// next [`Term::present`] or [`Term::clear`].
    Resize { w: u16, h: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// A lone ESC byte is reported as the ESC key.
    Esc,
    /// A lone ESC byte marks the next decoded key with the ALT
    /// modifier.
    Alt,
}

/// Fatal initialization failures. After any of these the library is
/// not usable.
#[derive(Debug)]
pub enum InitError {
    /// `$TERM` is unset or names a terminal the registry cannot match.
    UnsupportedTerminal,
    FailedToOpenTty(io::Error),
    PipeTrapError(io::Error),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InitError::UnsupportedTerminal => write!(f, "unsupported terminal"),
            InitError::FailedToOpenTty(err) => write!(f, "failed to open /dev/tty: {}", err),
            InitError::PipeTrapError(err) => {
                write!(f, "failed to set up the resize notification pipe: {}", err)
            }
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::UnsupportedTerminal => None,
            InitError::FailedToOpenTty(err) | InitError::PipeTrapError(err) => Some(err),
        }
    }
}

/// More input arrived than the ring buffer could hold. The arriving
/// bytes were dropped; already buffered bytes are intact and the
/// library remains usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputOverflow;

impl fmt::Display for InputOverflow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "terminal input buffer overflow, input dropped")
    }
}

impl std::error::Error for InputOverflow {}

const INBUF_SIZE: usize = 4096;
const READ_CHUNK: usize = 128;

/// Sentinel for the cached last-emitted attribute pair; no attribute
/// pair the renderer emits compares equal to it, so the first cell
/// always writes attributes.
const LAST_ATTR_INIT: u16 = 0xFFFF;

pub struct Term {
    // Not available in test instances.
    tty: Option<File>,
    orig_tios: libc::termios,
    entry: &'static TermEntry,
    // Self-pipe (read end, write end); the SIGWINCH handler writes one
    // byte per signal into the write end.
    winch: Option<(OwnedFd, OwnedFd)>,
    sig_id: Option<SigId>,

    width: u16,
    height: u16,
    back: CellBuf,
    front: CellBuf,
    resize_pending: bool,

    input_mode: InputMode,
    inbuf: RingBuf,

    clear_fg: u16,
    clear_bg: u16,
    last_fg: u16,
    last_bg: u16,
    // User-visible cursor; `None` when hidden.
    cursor: Option<(u16, u16)>,
    // Where the terminal cursor landed after the last cell emission.
    // `None` forces an explicit move next time.
    last_pos: Option<(u16, u16)>,
    out: Vec<u8>,

    #[cfg(test)]
    pub(crate) flushed: Vec<u8>,
}

impl Term {
    /// Opens the controlling terminal, selects the capability table
    /// from `$TERM`, switches to raw mode and takes over the screen.
    /// The terminal is restored when the returned handle is dropped.
    pub fn init() -> Result<Term, InitError> {
        let tty = termion::get_tty().map_err(InitError::FailedToOpenTty)?;

        let term_name = env::var("TERM").map_err(|_| InitError::UnsupportedTerminal)?;
        let entry = term::select_entry(&term_name).ok_or(InitError::UnsupportedTerminal)?;
        term::debug_assert_keys_unambiguous(entry);
        debug!("TERM={} matched entry {}", term_name, entry.name);

        let (winch_r, winch_w) =
            nix::unistd::pipe().map_err(|errno| InitError::PipeTrapError(errno.into()))?;
        // The handler must never block on a full pipe.
        unsafe {
            let flags = libc::fcntl(winch_w.as_raw_fd(), libc::F_GETFL);
            libc::fcntl(winch_w.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
        let sig_id = signal_hook::low_level::pipe::register_raw(SIGWINCH, winch_w.as_raw_fd())
            .map_err(InitError::PipeTrapError)?;

        // Raw mode with TCSAFLUSH, keeping a snapshot to restore on
        // drop. VMIN/VTIME zero makes tty reads return immediately
        // with whatever is available.
        let mut orig_tios: libc::termios = unsafe { std::mem::zeroed() };
        unsafe {
            libc::tcgetattr(tty.as_raw_fd(), &mut orig_tios);
        }
        let mut tios = orig_tios;
        tios.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL
            | libc::IXON);
        tios.c_oflag &= !libc::OPOST;
        tios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
        tios.c_cflag &= !(libc::CSIZE | libc::PARENB);
        tios.c_cflag |= libc::CS8;
        tios.c_cc[libc::VMIN] = 0;
        tios.c_cc[libc::VTIME] = 0;
        unsafe { libc::tcsetattr(tty.as_raw_fd(), libc::TCSAFLUSH, &tios) };

        let (width, height) = term_size(tty.as_raw_fd());
        let mut term = Term {
            tty: Some(tty),
            orig_tios,
            entry,
            winch: Some((winch_r, winch_w)),
            sig_id: Some(sig_id),
            width,
            height,
            back: CellBuf::new(width, height),
            front: CellBuf::new(width, height),
            resize_pending: false,
            input_mode: InputMode::Esc,
            inbuf: RingBuf::new(INBUF_SIZE),
            clear_fg: WHITE,
            clear_bg: BLACK,
            last_fg: LAST_ATTR_INIT,
            last_bg: LAST_ATTR_INIT,
            cursor: None,
            last_pos: None,
            out: Vec::with_capacity(32 * 1024),
            #[cfg(test)]
            flushed: Vec::new(),
        };
        term.back.clear(term.clear_fg, term.clear_bg);
        term.front.clear(term.clear_fg, term.clear_bg);

        term.put_func(Func::EnterCa);
        term.put_func(Func::EnterKeypad);
        term.put_func(Func::HideCursor);
        term.send_clear();

        Ok(term)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Resets every back-buffer cell to a space with the clear colors.
    /// Consumes a pending resize first.
    pub fn clear(&mut self) {
        if self.resize_pending {
            self.update_size();
            self.resize_pending = false;
        }
        self.back.clear(self.clear_fg, self.clear_bg);
    }

    /// Sets the colors used by subsequent [`Term::clear`] calls. Does
    /// not repaint.
    pub fn set_clear_attributes(&mut self, fg: u16, bg: u16) {
        self.clear_fg = fg;
        self.clear_bg = bg;
    }

    /// Writes one cell into the back buffer. Out-of-range coordinates
    /// are ignored.
    pub fn put_cell(&mut self, x: u16, y: u16, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.back.cells[usize::from(y) * usize::from(self.width) + usize::from(x)] = cell;
    }

    pub fn change_cell(&mut self, x: u16, y: u16, ch: char, fg: u16, bg: u16) {
        self.put_cell(x, y, Cell { ch, fg, bg });
    }

    /// Copies a `w` x `h` rectangle of `cells` into the back buffer at
    /// `(x, y)`. The rectangle must fit inside the grid and `cells`
    /// must hold at least `w * h` cells, otherwise nothing is copied.
    pub fn blit(&mut self, x: u16, y: u16, w: u16, h: u16, cells: &[Cell]) {
        let (w_, h_) = (usize::from(w), usize::from(h));
        if u32::from(x) + u32::from(w) > u32::from(self.width)
            || u32::from(y) + u32::from(h) > u32::from(self.height)
            || cells.len() < w_ * h_
        {
            return;
        }
        for sy in 0..h_ {
            let dst = (usize::from(y) + sy) * usize::from(self.width) + usize::from(x);
            self.back.cells[dst..dst + w_].copy_from_slice(&cells[sy * w_..(sy + 1) * w_]);
        }
    }

    /// Flushes the changed cells of the back buffer to the terminal.
    pub fn present(&mut self) {
        // Force an explicit move for the first emission.
        self.last_pos = None;

        if self.resize_pending {
            self.update_size();
            self.resize_pending = false;
        }

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = usize::from(y) * usize::from(self.width) + usize::from(x);
                let back = self.back.cells[idx];
                if self.front.cells[idx] == back {
                    continue;
                }
                self.front.cells[idx] = back;
                self.send_attr(back.fg, back.bg);
                self.send_char(x, y, back.ch);
            }
        }

        if let Some((cx, cy)) = self.cursor {
            self.move_cursor(cx, cy);
        }
        self.flush_output();
    }

    /// Moves the user-visible cursor; `None` hides it.
    pub fn set_cursor(&mut self, pos: Option<(u16, u16)>) {
        if self.cursor.is_none() && pos.is_some() {
            self.put_func(Func::ShowCursor);
        }
        if self.cursor.is_some() && pos.is_none() {
            self.put_func(Func::HideCursor);
        }
        self.cursor = pos;
        if let Some((cx, cy)) = pos {
            self.move_cursor(cx, cy);
        }
    }

    pub fn hide_cursor(&mut self) {
        self.set_cursor(None);
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.input_mode = mode;
    }

    /// Waits for the next event indefinitely.
    pub fn poll_event(&mut self) -> Result<Event, InputOverflow> {
        debug_assert!(self.tty.is_some());
        loop {
            if let Some(ev) = self.wait_fill_event(None)? {
                return Ok(ev);
            }
        }
    }

    /// Waits for the next event for at most `timeout_ms` milliseconds;
    /// `None` on expiry.
    pub fn peek_event(&mut self, timeout_ms: u32) -> Result<Option<Event>, InputOverflow> {
        let mut tv = TimeVal::new(
            (timeout_ms / 1000) as libc::time_t,
            ((timeout_ms % 1000) * 1000) as libc::suseconds_t,
        );
        self.wait_fill_event(Some(&mut tv))
    }

    fn wait_fill_event(
        &mut self,
        mut timeout: Option<&mut TimeVal>,
    ) -> Result<Option<Event>, InputOverflow> {
        // The ALT modifier of an already-consumed ESC prefix lives for
        // the duration of this call.
        let mut alt_pending = false;

        // Try the bytes buffered by earlier calls first.
        if let Some(ev) = self.extract(&mut alt_pending) {
            return Ok(Some(Event::Key(ev)));
        }

        // The buffered input was incomplete; try the short path. The
        // tty is in VMIN/VTIME zero mode so this read cannot block.
        let mut chunk = [0; READ_CHUNK];
        let n = self.read_tty(&mut chunk);
        if n > 0 {
            if self.inbuf.free_space() < n {
                warn!("input buffer overflow, dropping {} bytes", n);
                return Err(InputOverflow);
            }
            self.inbuf.push(&chunk[..n]);
            if let Some(ev) = self.extract(&mut alt_pending) {
                return Ok(Some(Event::Key(ev)));
            }
        }

        // Still nothing; block on the tty and the resize pipe.
        loop {
            let (tty_ready, winch_ready) = {
                let (tty, winch_r) = match (&self.tty, &self.winch) {
                    (Some(tty), Some((winch_r, _))) => (tty, winch_r),
                    _ => return Ok(None),
                };
                let mut fds = FdSet::new();
                fds.insert(tty.as_fd());
                fds.insert(winch_r.as_fd());
                match select(None, Some(&mut fds), None, None, timeout.as_deref_mut()) {
                    Ok(0) => return Ok(None),
                    Ok(_) => (fds.contains(tty.as_fd()), fds.contains(winch_r.as_fd())),
                    // A signal interrupted the wait; its pipe write
                    // will show up in the next round.
                    Err(Errno::EINTR) => continue,
                    Err(_) => return Ok(None),
                }
            };

            if tty_ready {
                let n = self.read_tty(&mut chunk);
                if n == 0 {
                    continue;
                }
                if self.inbuf.free_space() < n {
                    warn!("input buffer overflow, dropping {} bytes", n);
                    return Err(InputOverflow);
                }
                self.inbuf.push(&chunk[..n]);
                if let Some(ev) = self.extract(&mut alt_pending) {
                    return Ok(Some(Event::Key(ev)));
                }
            }

            if winch_ready {
                // One notification per resize signal.
                let mut byte = [0; 1];
                if let Some((winch_r, _)) = &self.winch {
                    let _ = nix::unistd::read(winch_r.as_raw_fd(), &mut byte);
                }
                self.resize_pending = true;
                let (w, h) = match &self.tty {
                    Some(tty) => term_size(tty.as_raw_fd()),
                    None => (self.width, self.height),
                };
                return Ok(Some(Event::Resize { w, h }));
            }
        }
    }

    fn extract(&mut self, alt_pending: &mut bool) -> Option<KeyEvent> {
        input::extract_event(&mut self.inbuf, self.entry.keys, self.input_mode, alt_pending)
    }

    fn read_tty(&self, buf: &mut [u8]) -> usize {
        match &self.tty {
            Some(tty) => nix::unistd::read(tty.as_raw_fd(), buf).unwrap_or(0),
            None => 0,
        }
    }

    fn update_size(&mut self) {
        let (w, h) = match &self.tty {
            Some(tty) => term_size(tty.as_raw_fd()),
            None => (self.width, self.height),
        };
        let (old_w, old_h) = (self.width, self.height);
        self.width = w;
        self.height = h;
        self.back
            .resize(old_w, old_h, w, h, self.clear_fg, self.clear_bg);
        self.front
            .resize(old_w, old_h, w, h, self.clear_fg, self.clear_bg);
        // Blank the front buffer so the next present repaints in full.
        self.front.clear(self.clear_fg, self.clear_bg);
        self.send_clear();
    }

    fn send_clear(&mut self) {
        self.send_attr(self.clear_fg, self.clear_bg);
        self.put_func(Func::ClearScreen);
        if let Some((cx, cy)) = self.cursor {
            self.move_cursor(cx, cy);
        }
        self.flush_output();

        // The physical cursor moved; force an explicit move on the
        // next cell emission.
        self.last_pos = None;
    }

    fn send_attr(&mut self, fg: u16, bg: u16) {
        if fg == self.last_fg && bg == self.last_bg {
            return;
        }
        self.last_fg = fg;
        self.last_bg = bg;

        self.put_func(Func::Sgr0);
        term::write_param2(
            &mut self.out,
            self.entry.funcs[Func::Sgr as usize],
            fg & 0x0F,
            bg & 0x0F,
        );
        if fg & BOLD != 0 {
            self.put_func(Func::Bold);
        }
        // BOLD on a background attribute is the blink bit.
        if bg & BOLD != 0 {
            self.put_func(Func::Blink);
        }
        if fg & UNDERLINE != 0 {
            self.put_func(Func::Underline);
        }
    }

    fn send_char(&mut self, x: u16, y: u16, ch: char) {
        // Writing the previous cell already advanced the terminal
        // cursor to (x, y); any other cached position needs a move.
        if !(x > 0 && self.last_pos == Some((x - 1, y))) {
            self.move_cursor(x, y);
        }
        self.last_pos = Some((x, y));

        let mut buf = [0; 6];
        let n = utf8::unicode_to_char(&mut buf, ch as u32);
        self.out.extend_from_slice(&buf[..n]);
    }

    // Inputs are 0-based; the control sequence wants 1-based row;col.
    fn move_cursor(&mut self, x: u16, y: u16) {
        term::write_param2(
            &mut self.out,
            self.entry.funcs[Func::MoveCursor as usize],
            y + 1,
            x + 1,
        );
    }

    fn put_func(&mut self, f: Func) {
        self.out
            .extend_from_slice(self.entry.funcs[f as usize].as_bytes());
    }

    fn flush_output(&mut self) {
        if let Some(tty) = &mut self.tty {
            tty.write_all(&self.out).unwrap();
        }
        #[cfg(test)]
        self.flushed.extend_from_slice(&self.out);
        self.out.clear();
    }
}

impl Drop for Term {
    fn drop(&mut self) {
        if let Some(sig_id) = self.sig_id.take() {
            signal_hook::low_level::unregister(sig_id);
        }

        if self.tty.is_none() {
            return;
        }
        self.put_func(Func::ShowCursor);
        self.put_func(Func::Sgr0);
        self.put_func(Func::ClearScreen);
        self.put_func(Func::ExitCa);
        self.put_func(Func::ExitKeypad);
        self.flush_output();
        if let Some(tty) = &self.tty {
            unsafe {
                libc::tcsetattr(tty.as_raw_fd(), libc::TCSAFLUSH, &self.orig_tios);
            }
        }
    }
}

//
// Testing API
//

impl Term {
    /// Creates a grid-only instance that does not touch a terminal,
    /// with xterm capability tables. Useful when testing.
    pub fn init_test(w: u16, h: u16) -> Term {
        let mut term = Term {
            tty: None,
            orig_tios: unsafe { std::mem::zeroed() },
            entry: term::xterm_entry(),
            winch: None,
            sig_id: None,
            width: w,
            height: h,
            back: CellBuf::new(w, h),
            front: CellBuf::new(w, h),
            resize_pending: false,
            input_mode: InputMode::Esc,
            inbuf: RingBuf::new(INBUF_SIZE),
            clear_fg: WHITE,
            clear_bg: BLACK,
            last_fg: LAST_ATTR_INIT,
            last_bg: LAST_ATTR_INIT,
            cursor: None,
            last_pos: None,
            out: Vec::with_capacity(32 * 1024),
            #[cfg(test)]
            flushed: Vec::new(),
        };
        term.back.clear(term.clear_fg, term.clear_bg);
        term.front.clear(term.clear_fg, term.clear_bg);
        term
    }

    /// Returns a copy of the front buffer. Useful when testing.
    pub fn get_front_buffer(&self) -> CellBuf {
        self.front.clone()
    }

    /// Sets the size of the buffers directly, bypassing the terminal
    /// size query. Useful when testing.
    pub fn set_buffer_size(&mut self, w: u16, h: u16) {
        let (old_w, old_h) = (self.width, self.height);
        self.width = w;
        self.height = h;
        self.back
            .resize(old_w, old_h, w, h, self.clear_fg, self.clear_bg);
        self.front
            .resize(old_w, old_h, w, h, self.clear_fg, self.clear_bg);
        self.front.clear(self.clear_fg, self.clear_bg);
    }
}

fn term_size(fd: RawFd) -> (u16, u16) {
    let mut sz: libc::winsize = unsafe { std::mem::zeroed() };
    unsafe {
        libc::ioctl(fd, libc::TIOCGWINSZ, &mut sz);
    }
    (sz.ws_col, sz.ws_row)
}
