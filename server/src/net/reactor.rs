/*
 * This file is a part of the Patricia project
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The readiness-notification wrapper (spec §1, §5: "treated as an
//! external collaborator with a minimal interface"). This is a thin,
//! direct `epoll` binding -- the Rust equivalent of the original's
//! `lib/ew_epoll.c` -- not a general-purpose reactor. It registers every
//! socket for both readable and writable edge-triggered interest, the
//! same way `ew_add` always ORs in `EW_IN | EW_OUT`, and leaves it to
//! each connection's own state to decide which syscall to retry on
//! wake-up.
//!
//! Only the Linux `epoll` backend is implemented, matching the subset of
//! the original's `ew.c` (`#ifdef __linux__ ... #else ew_kqueue.c`) this
//! crate is built and exercised against; a BSD/kqueue backend would slot
//! in behind the same three methods.

use std::io;
use std::os::unix::io::RawFd;

/// A readiness event: which file descriptor became ready, and in which
/// direction(s). `token` is the raw fd itself -- the original uses the
/// task pointer as `ew_data`; a listening socket is told apart by the
/// caller comparing `token` against the known listener fd, the same way
/// `connOpen`/`connIO` tell them apart by a null `ew_data`.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub token: RawFd,
    pub readable: bool,
    pub writable: bool,
}

/// An `epoll` instance plus its scratch event buffer.
pub struct Reactor {
    epfd: RawFd,
    events: Vec<libc::epoll_event>,
}

impl Reactor {
    pub fn new(max_events: usize) -> io::Result<Self> {
        let epfd = unsafe { libc::epoll_create1(0) };
        if epfd == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            epfd,
            events: vec![unsafe { std::mem::zeroed() }; max_events.max(1)],
        })
    }

    /// Register `fd` for both directions, edge-triggered. Interest never
    /// changes afterwards -- exactly the original's always-both-ways
    /// registration.
    pub fn add(&self, fd: RawFd) -> io::Result<()> {
        let mut ev = libc::epoll_event {
            events: (libc::EPOLLIN | libc::EPOLLOUT | libc::EPOLLET) as u32,
            u64: fd as u64,
        };
        let rc = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_ADD, fd, &mut ev) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn remove(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { libc::epoll_ctl(self.epfd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Block for up to `timeout_ms` (`-1` blocks indefinitely, matching
    /// the original's `towait = -1`/`0` convention) and return the
    /// ready set. `EINTR` (e.g. a caught `SIGINT`) is reported as an
    /// empty set rather than an error, the same way `ew_wait` swallows
    /// it for its caller to notice the shutdown flag instead.
    pub fn wait(&mut self, timeout_ms: i32) -> io::Result<&[libc::epoll_event]> {
        let n = unsafe {
            libc::epoll_wait(
                self.epfd,
                self.events.as_mut_ptr(),
                self.events.len() as i32,
                timeout_ms,
            )
        };
        if n == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(&[]);
            }
            return Err(err);
        }
        Ok(&self.events[..n as usize])
    }
}

/// Translate a raw `epoll_event` into an [`Event`].
pub fn decode(raw: &libc::epoll_event) -> Event {
    Event {
        token: raw.u64 as RawFd,
        readable: raw.events & (libc::EPOLLIN as u32) != 0,
        writable: raw.events & (libc::EPOLLOUT as u32) != 0,
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epfd);
        }
    }
}
