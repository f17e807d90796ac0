//! Session-level integration tests, driven over pipe fds instead of a real
//! tty so the raw-mode switch and ioctl size query never run (`is_tty` is
//! false whenever the read and write fds differ), per SPEC_FULL.md §10.3's
//! `init_with_rw_fds` seam.
//!
//! `Session` enforces spec.md §5's one-session-per-process contract via a
//! static flag, and these tests share a process-wide `$TERM`, so they're
//! serialized through `TEST_LOCK` rather than left to cargo's default
//! parallel test execution.

use std::os::fd::IntoRawFd;
use std::sync::Mutex;

use cellterm::{Event, KeyEvent, Session};

static TEST_LOCK: Mutex<()> = Mutex::new(());

fn isolated<R>(f: impl FnOnce() -> R) -> R {
    let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let prev = std::env::var("TERM").ok();
    std::env::set_var("TERM", "xterm");
    let r = f();
    match prev {
        Some(v) => std::env::set_var("TERM", v),
        None => std::env::remove_var("TERM"),
    }
    r
}

/// Scenario 1 from spec.md §8 ("raw echo"), exercised through the full
/// `Session` rather than the bare decoder: feeding `"A"` over the session's
/// read fd yields one plain character key event.
#[test]
fn feeding_a_yields_char_event() {
    isolated(|| {
        let (in_read, in_write) = nix::unistd::pipe().unwrap();
        let (_out_read, out_write) = nix::unistd::pipe().unwrap();
        let in_write = in_write.into_raw_fd();

        let mut session =
            Session::init_with_rw_fds(in_read.into_raw_fd(), out_write.into_raw_fd()).unwrap();

        nix::unistd::write(unsafe { std::os::fd::BorrowedFd::borrow_raw(in_write) }, b"A")
            .unwrap();

        match session.poll_event().unwrap() {
            Event::Key { key: KeyEvent::Char('A'), modifiers } => {
                assert!(modifiers.is_empty());
            }
            other => panic!("expected plain char event, got {other:?}"),
        }

        let _ = nix::unistd::close(in_write);
    });
}

/// A session with no real tty behind it reports a fixed 80x24 size, per
/// `query_size`'s non-tty short circuit.
#[test]
fn non_tty_session_reports_default_size() {
    isolated(|| {
        let (in_read, _in_write) = nix::unistd::pipe().unwrap();
        let (_out_read, out_write) = nix::unistd::pipe().unwrap();
        let session =
            Session::init_with_rw_fds(in_read.into_raw_fd(), out_write.into_raw_fd()).unwrap();
        assert_eq!((session.width(), session.height()), (80, 24));
    });
}

/// A second concurrent `init` while one session is still live is rejected
/// with `InitAlready`, per spec.md §5's singleton contract.
#[test]
fn reentrant_init_is_rejected() {
    isolated(|| {
        let (in_read, _in_write) = nix::unistd::pipe().unwrap();
        let (_out_read, out_write) = nix::unistd::pipe().unwrap();
        let first =
            Session::init_with_rw_fds(in_read.into_raw_fd(), out_write.into_raw_fd()).unwrap();

        let (in_read2, _in_write2) = nix::unistd::pipe().unwrap();
        let (_out_read2, out_write2) = nix::unistd::pipe().unwrap();
        let (in_read2_raw, out_write2_raw) = (in_read2.into_raw_fd(), out_write2.into_raw_fd());
        let second = Session::init_with_rw_fds(in_read2_raw, out_write2_raw);
        assert!(matches!(second, Err(cellterm::Error::InitAlready)));
        let _ = nix::unistd::close(in_read2_raw);
        let _ = nix::unistd::close(out_write2_raw);

        drop(first);

        let (in_read3, _in_write3) = nix::unistd::pipe().unwrap();
        let (_out_read3, out_write3) = nix::unistd::pipe().unwrap();
        let third = Session::init_with_rw_fds(in_read3.into_raw_fd(), out_write3.into_raw_fd());
        assert!(third.is_ok(), "slot should be released after the first session shuts down");
    });
}
