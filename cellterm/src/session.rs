//! Terminal session lifecycle: acquiring the tty, raw mode, alt-screen,
//! resize handling, and the single-threaded event loop.

use std::os::fd::{BorrowedFd, IntoRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cellterm_core::error::{Error, Result};
use cellterm_core::{
    attr, builtin, present, Attr, ByteBuffer, CapId, CapabilityStore, CellBuffer, OutputMode,
    RenderState,
};
use cellterm_input::{build_trie, Decoded, Decoder, EscHook, Event, InputMode};

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::termios::{self, SetArg, Termios};
use nix::unistd;

const TTY_TOKEN: Token = Token(0);
const RESIZE_TOKEN: Token = Token(1);

static mut RESIZE_WRITE_FD: RawFd = -1;

/// Enforces spec.md §5's singleton contract: exactly one live `Session` per
/// process. Claimed at the top of `init_with_rw_fds`, released by
/// `shutdown`.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Installed as the SIGWINCH handler. Async-signal-safe: saves and restores
/// errno around the one `write(2)` call, touches nothing else.
extern "C" fn handle_resize(_sig: libc::c_int) {
    let errno_copy = unsafe { *libc::__errno_location() };
    unsafe {
        let fd = RESIZE_WRITE_FD;
        if fd >= 0 {
            let byte: u8 = 0;
            libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
        }
        *libc::__errno_location() = errno_copy;
    }
}

/// A terminal's lifecycle state: fds, raw-mode snapshot, both cell
/// buffers, capability table, input trie, and the bookkeeping `present`
/// needs to emit minimal diffs.
pub struct Session {
    rfd: RawFd,
    wfd: RawFd,
    owned_tty_fd: Option<RawFd>,
    orig_termios: Option<Termios>,
    resize_read_fd: RawFd,
    resize_write_fd: RawFd,

    caps: CapabilityStore,
    decoder: Decoder,
    collisions: Vec<cellterm_input::Collision>,

    back: CellBuffer,
    front: CellBuffer,
    out: ByteBuffer,
    input_buf: Vec<u8>,
    render_state: RenderState,

    output_mode: OutputMode,
    default_fg: Attr,
    default_bg: Attr,
    cursor: Option<(u16, u16)>,

    last_errno: Option<i32>,

    pre_hook: Option<Box<EscHook<'static>>>,
    post_hook: Option<Box<EscHook<'static>>>,

    poll: Poll,
}

impl Session {
    pub fn init() -> Result<Session> {
        Session::init_with_path("/dev/tty")
    }

    pub fn init_with_path(path: &str) -> Result<Session> {
        let owned = nix::fcntl::open(path, OFlag::O_RDWR, nix::sys::stat::Mode::empty())
            .map_err(|e| Error::InitOpen(std::io::Error::from(e)))?;
        let fd = owned.into_raw_fd();
        let mut session = Session::init_with_rw_fds(fd, fd)?;
        session.owned_tty_fd = Some(fd);
        Ok(session)
    }

    pub fn init_with_fd(fd: RawFd) -> Result<Session> {
        Session::init_with_rw_fds(fd, fd)
    }

    /// Claims the process-wide singleton slot, then delegates to
    /// `init_with_rw_fds_inner`, releasing the slot again if setup fails
    /// partway through so a later `init` isn't permanently locked out.
    pub fn init_with_rw_fds(rfd: RawFd, wfd: RawFd) -> Result<Session> {
        if SESSION_ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::InitAlready);
        }
        let result = Self::init_with_rw_fds_inner(rfd, wfd);
        if result.is_err() {
            SESSION_ACTIVE.store(false, Ordering::SeqCst);
        }
        result
    }

    fn init_with_rw_fds_inner(rfd: RawFd, wfd: RawFd) -> Result<Session> {
        let is_tty = rfd == wfd && unistd::isatty(rfd).unwrap_or(false);
        let orig_termios = if is_tty {
            let tios = termios::tcgetattr(unsafe { BorrowedFd::borrow_raw(rfd) })
                .map_err(|e| Error::TcGetAttr(std::io::Error::from(e)))?;
            let mut raw = tios.clone();
            termios::cfmakeraw(&mut raw);
            raw.control_chars[libc::VMIN as usize] = 1;
            raw.control_chars[libc::VTIME as usize] = 0;
            termios::tcsetattr(unsafe { BorrowedFd::borrow_raw(rfd) }, SetArg::TCSAFLUSH, &raw)
                .map_err(|e| Error::TcSetAttr(std::io::Error::from(e)))?;
            Some(tios)
        } else {
            None
        };

        let term_name = std::env::var("TERM").map_err(|_| Error::NoTerm)?;
        let caps = cellterm_core::resolve_capabilities(&term_name)?;
        let (trie, collisions) = build_trie(&caps);

        let (resize_read_owned, resize_write_owned) =
            unistd::pipe().map_err(|e| Error::ResizePipe(std::io::Error::from(e)))?;
        let resize_read_fd = resize_read_owned.into_raw_fd();
        let resize_write_fd = resize_write_owned.into_raw_fd();
        fcntl(resize_write_fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK))
            .map_err(|e| Error::ResizePipe(std::io::Error::from(e)))?;

        unsafe {
            RESIZE_WRITE_FD = resize_write_fd;
        }
        let sa = SigAction::new(
            SigHandler::Handler(handle_resize),
            SaFlags::empty(),
            SigSet::empty(),
        );
        unsafe {
            signal::sigaction(Signal::SIGWINCH, &sa)
                .map_err(|e| Error::ResizeSigaction(std::io::Error::from(e)))?;
        }

        let mut out = ByteBuffer::new();
        out.append_cstr(caps.get(CapId::EnterCa));
        out.append_cstr(caps.get(CapId::EnterKeypad));
        out.append_cstr(caps.get(CapId::HideCursor));

        let (width, height) = query_size(rfd, wfd, is_tty)?;

        let mut session = Session {
            rfd,
            wfd,
            owned_tty_fd: None,
            orig_termios,
            resize_read_fd,
            resize_write_fd,
            caps,
            decoder: Decoder::new(trie, InputMode::ESC),
            collisions,
            back: CellBuffer::new(width, height),
            front: CellBuffer::new(width, height),
            out,
            input_buf: Vec::new(),
            render_state: RenderState::default(),
            output_mode: OutputMode::Normal,
            default_fg: attr::ATTR_DEFAULT_BIT,
            default_bg: attr::ATTR_DEFAULT_BIT,
            cursor: None,
            last_errno: None,
            pre_hook: None,
            post_hook: None,
            poll: Poll::new().map_err(|e| Error::Poll(e))?,
        };

        session
            .poll
            .registry()
            .register(&mut SourceFd(&session.rfd), TTY_TOKEN, Interest::READABLE)
            .map_err(|e| Error::Poll(e))?;
        session
            .poll
            .registry()
            .register(&mut SourceFd(&session.resize_read_fd), RESIZE_TOKEN, Interest::READABLE)
            .map_err(|e| Error::Poll(e))?;

        session.flush_output()?;
        session.back.clear(session.default_fg, session.default_bg);
        session.front.clear(session.default_fg, session.default_bg);

        Ok(session)
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.out.append_cstr(self.caps.get(CapId::ShowCursor));
        self.out.append_cstr(self.caps.get(CapId::Sgr0));
        self.out.append_cstr(self.caps.get(CapId::ClearScreen));
        self.out.append_cstr(self.caps.get(CapId::ExitCa));
        self.out.append_cstr(self.caps.get(CapId::ExitKeypad));
        self.out.append_bytes(builtin::EXIT_MOUSE_SEQUENCE.as_bytes());
        let _ = self.flush_output();

        if let Some(tios) = &self.orig_termios {
            let _ = termios::tcsetattr(
                unsafe { BorrowedFd::borrow_raw(self.rfd) },
                SetArg::TCSAFLUSH,
                tios,
            );
        }
        if let Some(fd) = self.owned_tty_fd.take() {
            let _ = unistd::close(fd);
        }

        let default_sa =
            SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        unsafe {
            let _ = signal::sigaction(Signal::SIGWINCH, &default_sa);
        }
        unsafe {
            RESIZE_WRITE_FD = -1;
        }
        let _ = unistd::close(self.resize_read_fd);
        let _ = unistd::close(self.resize_write_fd);

        SESSION_ACTIVE.store(false, Ordering::SeqCst);

        Ok(())
    }

    pub fn width(&self) -> u16 {
        self.back.width()
    }

    pub fn height(&self) -> u16 {
        self.back.height()
    }

    pub fn clear(&mut self) {
        self.back.clear(self.default_fg, self.default_bg);
    }

    pub fn set_clear_attrs(&mut self, fg: Attr, bg: Attr) {
        self.default_fg = fg;
        self.default_bg = bg;
    }

    pub fn set_cell(&mut self, x: u16, y: u16, ch: char, fg: Attr, bg: Attr) -> Result<()> {
        self.back.set(x, y, &[ch], fg, bg)
    }

    pub fn set_cell_ex(&mut self, x: u16, y: u16, cluster: &[char], fg: Attr, bg: Attr) -> Result<()> {
        self.back.set(x, y, cluster, fg, bg)
    }

    pub fn extend_cell(&mut self, x: u16, y: u16, ch: char) -> Result<()> {
        self.back.extend(x, y, ch)
    }

    pub fn set_cursor(&mut self, x: u16, y: u16) {
        self.cursor = Some((x, y));
    }

    pub fn hide_cursor(&mut self) {
        self.cursor = None;
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
        self.render_state.force_attrs_dirty();
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        let was_mouse = self.decoder.mode().contains(InputMode::MOUSE);
        let now_mouse = mode.normalized().contains(InputMode::MOUSE);
        if now_mouse && !was_mouse {
            self.out.append_bytes(builtin::ENTER_MOUSE_SEQUENCE.as_bytes());
            let _ = self.flush_output();
        } else if was_mouse && !now_mouse {
            self.out.append_bytes(builtin::EXIT_MOUSE_SEQUENCE.as_bytes());
            let _ = self.flush_output();
        }
        self.decoder.set_mode(mode);
    }

    pub fn cell_buffer(&self) -> &CellBuffer {
        &self.back
    }

    pub fn last_errno(&self) -> Option<i32> {
        self.last_errno
    }

    /// Capability strings that collided during trie construction (§4.4/§12
    /// point 3), kept for introspection. Never fatal: the first insertion
    /// always wins.
    pub fn trie_collisions(&self) -> &[cellterm_input::Collision] {
        &self.collisions
    }

    pub fn has_truecolor(&self) -> bool {
        cfg!(feature = "truecolor")
    }

    pub fn has_grapheme_clusters(&self) -> bool {
        cfg!(feature = "grapheme-clusters")
    }

    pub fn set_func(&mut self, pre: Option<Box<EscHook<'static>>>, post: Option<Box<EscHook<'static>>>) {
        self.pre_hook = pre;
        self.post_hook = post;
    }

    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.append_bytes(bytes);
        self.flush_output()
    }

    /// Write `s` starting at `(x,y)` one display-width unit at a time,
    /// returning the total width written.
    pub fn print(&mut self, x: u16, y: u16, fg: Attr, bg: Attr, s: &str) -> Result<u16> {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.back.width() {
                break;
            }
            self.back.set(cx, y, &[ch], fg, bg)?;
            cx += 1;
        }
        Ok(cx - x)
    }

    pub fn present(&mut self) -> Result<()> {
        present(
            &self.caps,
            self.output_mode,
            &self.back,
            &mut self.front,
            &mut self.render_state,
            self.cursor,
            &mut self.out,
        );
        self.flush_output()
    }

    pub fn get_fds(&self) -> (RawFd, RawFd) {
        (self.rfd, self.resize_read_fd)
    }

    pub fn peek_event(&mut self, timeout_ms: i64) -> Result<Event> {
        self.wait_event(Some(timeout_ms))
    }

    pub fn poll_event(&mut self) -> Result<Event> {
        self.wait_event(None)
    }

    fn flush_output(&mut self) -> Result<()> {
        let fd = self.wfd;
        struct FdWriter(RawFd);
        impl std::io::Write for FdWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                unistd::write(unsafe { BorrowedFd::borrow_raw(self.0) }, buf)
                    .map_err(std::io::Error::from)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut w = FdWriter(fd);
        self.out.flush(&mut w)
    }

    fn try_decode_one(&mut self) -> Result<Option<Event>> {
        if self.input_buf.is_empty() {
            return Ok(None);
        }
        let pre = self.pre_hook.as_deref();
        let post = self.post_hook.as_deref();
        match self.decoder.decode(&self.input_buf, pre, post)? {
            Decoded::Event(event, consumed) => {
                self.input_buf.drain(..consumed);
                Ok(Some(event))
            }
            Decoded::NeedMore => Ok(None),
        }
    }

    fn wait_event(&mut self, timeout_ms: Option<i64>) -> Result<Event> {
        if let Some(event) = self.try_decode_one()? {
            return Ok(event);
        }

        let mut events = Events::with_capacity(4);
        let timeout = timeout_ms.map(|ms| Duration::from_millis(ms.max(0) as u64));

        loop {
            match self.poll.poll(&mut events, timeout) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.last_errno = e.raw_os_error();
                    return Err(Error::Poll(e));
                }
            }

            if events.is_empty() {
                return Err(Error::NoEvent);
            }

            let mut resized = false;
            let mut tty_readable = false;
            for ev in events.iter() {
                match ev.token() {
                    RESIZE_TOKEN => resized = true,
                    TTY_TOKEN => tty_readable = true,
                    _ => {}
                }
            }

            if resized {
                let mut drain = [0u8; 64];
                while unistd::read(self.resize_read_fd, &mut drain).unwrap_or(0) > 0 {}

                let (w, h) = query_size(self.rfd, self.wfd, self.orig_termios.is_some())?;
                self.back.resize(w, h, self.default_fg, self.default_bg);
                self.front.resize(w, h, self.default_fg, self.default_bg);
                self.front.clear(self.default_fg, self.default_bg);
                self.render_state.force_attrs_dirty();
                return Ok(Event::Resize { width: w, height: h });
            }

            if tty_readable {
                let mut chunk = [0u8; 4096];
                match unistd::read(self.rfd, &mut chunk) {
                    Ok(0) => {
                        return Err(Error::Read(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "tty closed",
                        )))
                    }
                    Ok(n) => self.input_buf.extend_from_slice(&chunk[..n]),
                    Err(nix::errno::Errno::EAGAIN) | Err(nix::errno::Errno::EINTR) => {}
                    Err(e) => {
                        let io_err = std::io::Error::from(e);
                        self.last_errno = io_err.raw_os_error();
                        return Err(Error::Read(io_err));
                    }
                }

                if let Some(event) = self.try_decode_one()? {
                    return Ok(event);
                }
            }

            if timeout_ms.is_some() {
                return Err(Error::NoEvent);
            }
        }
    }
}

fn query_size(rfd: RawFd, wfd: RawFd, is_tty: bool) -> Result<(u16, u16)> {
    if !is_tty {
        return Ok((80, 24));
    }

    match ioctl_winsize(rfd) {
        Ok(size) => return Ok(size),
        Err(ioctl_err) => {
            if let Ok(size) = query_size_via_escape(rfd, wfd) {
                return Ok(size);
            }
            return Err(Error::ResizeIoctl(ioctl_err));
        }
    }
}

fn ioctl_winsize(fd: RawFd) -> std::result::Result<(u16, u16), std::io::Error> {
    #[repr(C)]
    #[derive(Default)]
    struct Winsize {
        ws_row: libc::c_ushort,
        ws_col: libc::c_ushort,
        ws_xpixel: libc::c_ushort,
        ws_ypixel: libc::c_ushort,
    }
    let mut ws = Winsize::default();
    let rv = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws as *mut Winsize) };
    if rv != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok((ws.ws_col, ws.ws_row))
}

/// Fallback per §4.8: move the cursor far off-grid, request a Cursor
/// Position Report, and parse the `CSI row;col R` reply with a 1-second
/// bound. A short read here is a final failure, not retried.
fn query_size_via_escape(rfd: RawFd, wfd: RawFd) -> Result<(u16, u16)> {
    let seq = b"\x1b[9999;9999H\x1b[6n";
    let n = unistd::write(unsafe { BorrowedFd::borrow_raw(wfd) }, seq)
        .map_err(|e| Error::ResizeWrite(std::io::Error::from(e)))?;
    if n != seq.len() {
        return Err(Error::ResizeWrite(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            "partial write of cursor position query",
        )));
    }

    let mut poll_fds = [libc::pollfd { fd: rfd, events: libc::POLLIN, revents: 0 }];
    let rv = unsafe { libc::poll(poll_fds.as_mut_ptr(), 1, 1000) };
    if rv != 1 {
        return Err(Error::ResizePoll(std::io::Error::last_os_error()));
    }

    let mut buf = [0u8; 256];
    let n = unistd::read(rfd, &mut buf)
        .map_err(|e| Error::ResizeRead(std::io::Error::from(e)))?;
    if n < 1 {
        return Err(Error::ResizeRead(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "empty cursor position report",
        )));
    }

    let text = String::from_utf8_lossy(&buf[..n]);
    parse_cpr(&text).ok_or(Error::ResizeSscanf)
}

/// Parse `"\x1b[<row>;<col>R"` out of a (possibly noisy) read buffer.
fn parse_cpr(text: &str) -> Option<(u16, u16)> {
    let start = text.find("\x1b[")? + 2;
    let rest = &text[start..];
    let end = rest.find('R')?;
    let body = &rest[..end];
    let mut parts = body.splitn(2, ';');
    let row: u16 = parts.next()?.parse().ok()?;
    let col: u16 = parts.next()?.parse().ok()?;
    Some((col, row))
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
