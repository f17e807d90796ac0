//! The error kinds a `cellterm` operation can fail with.
//!
//! One variant per kind enumerated in the spec: the kind names which syscall
//! or invariant failed. Operations that wrap a syscall carry the raw errno
//! so callers (and `Session::last_errno`) can recover it without a second
//! lookup.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The decoder consumed a prefix of the input buffer that could still be
    /// extended into a longer match; the caller should read more bytes.
    #[error("need more input")]
    NeedMore,
    #[error("session already initialized")]
    InitAlready,
    #[error("failed to open tty: {0}")]
    InitOpen(#[source] io::Error),
    #[error("allocation failed")]
    Mem,
    #[error("no event available")]
    NoEvent,
    #[error("TERM is not set")]
    NoTerm,
    #[error("session not initialized")]
    NotInit,
    #[error("cell coordinates out of bounds")]
    OutOfBounds,
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("ioctl(TIOCGWINSZ) failed: {0}")]
    ResizeIoctl(#[source] io::Error),
    #[error("failed to create resize pipe: {0}")]
    ResizePipe(#[source] io::Error),
    #[error("sigaction(SIGWINCH) failed: {0}")]
    ResizeSigaction(#[source] io::Error),
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),
    #[error("tcgetattr failed: {0}")]
    TcGetAttr(#[source] io::Error),
    #[error("tcsetattr failed: {0}")]
    TcSetAttr(#[source] io::Error),
    #[error("unsupported terminal type")]
    UnsupportedTerm,
    #[error("write to resize pipe failed: {0}")]
    ResizeWrite(#[source] io::Error),
    #[error("poll on cursor position report failed: {0}")]
    ResizePoll(#[source] io::Error),
    #[error("read of cursor position report failed: {0}")]
    ResizeRead(#[source] io::Error),
    #[error("failed to parse cursor position report")]
    ResizeSscanf,
    /// A capability string collided with one already in the trie. Reported,
    /// never fatal: the first insertion wins.
    #[error("capability collision inserting {0:?}")]
    CapCollision(Vec<u8>),
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The latched OS errno behind this error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::InitOpen(e)
            | Error::Read(e)
            | Error::ResizeIoctl(e)
            | Error::ResizePipe(e)
            | Error::ResizeSigaction(e)
            | Error::Poll(e)
            | Error::TcGetAttr(e)
            | Error::TcSetAttr(e)
            | Error::ResizeWrite(e)
            | Error::ResizePoll(e)
            | Error::ResizeRead(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// `strerror`-equivalent: the libc message for the latched errno, or the
    /// `Display` text when this error isn't syscall-shaped.
    pub fn strerror(&self) -> String {
        match self.raw_os_error() {
            Some(errno) => io::Error::from_raw_os_error(errno).to_string(),
            None => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
