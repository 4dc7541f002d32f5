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

//! The event loop (spec §5, §4.5): accepts connections off the listen
//! socket, drives every connection's [`connection::Connection`] on
//! readiness, and observes a `SIGINT`-set shutdown flag between waits --
//! the Rust shape of the original's `server.c` `mainLoop`.
//!
//! The listen socket, the readiness wrapper and signal handling are all
//! spec §1 "external collaborators with minimal interfaces"; this module
//! wires them together rather than reinventing any of them.

pub mod connection;
pub mod listener;
pub mod reactor;

use crate::config::Config;
use crate::engine::Storage;
use crate::proto;
use connection::{Connection, PumpResult};
use listener::Listener;
use reactor::Reactor;
use std::collections::{HashMap, HashSet};
use std::io;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set by [`handle_sigint`]; observed by the event loop after every
/// `wait` (spec §5: "the event loop observes it after each wait, then
/// calls closeVM").
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signo: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

fn install_sigint_handler() -> io::Result<()> {
    let rc = unsafe { libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t) };
    if rc == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Scheduler steps granted to a runnable connection per pass, matching
/// the original's `processGo(vm, NULL, 1000)`.
const STEP_BUDGET: usize = 1000;

/// Run the server until `SIGINT`. Consumes the listen socket's own
/// lifetime; never returns `Ok` except on clean shutdown.
pub fn run(cfg: &Config, storage: Rc<Storage>) -> crate::error::Result<()> {
    install_sigint_handler()?;

    log::info!("opening listen socket at {}:{}", cfg.host, cfg.port);
    let listener = Listener::bind(cfg.host, cfg.port, cfg.backlog)?;
    let listen_fd = listener.fd();

    let mut reactor = Reactor::new(cfg.max_events)?;
    reactor.add(listen_fd)?;

    let mut connections: HashMap<RawFd, Connection> = HashMap::new();
    let mut runnable: HashSet<RawFd> = HashSet::new();
    let mut timeout_ms: i32 = -1;

    // The wire protocol's own ceiling (`proto::MAX_KEY_LEN`) always wins
    // over a looser configured bound; a tighter configured bound narrows
    // it further.
    let max_key_len = cfg.max_key_len.min(proto::MAX_KEY_LEN);

    log::info!("server ready");

    while !SHUTDOWN.load(Ordering::SeqCst) {
        let events = reactor.wait(timeout_ms)?;
        let tokens: Vec<_> = events.iter().map(reactor::decode).collect();

        if SHUTDOWN.load(Ordering::SeqCst) {
            break;
        }

        for ev in tokens {
            if ev.token == listen_fd {
                for stream in listener.accept_all()? {
                    if connections.len() >= cfg.max_connections {
                        log::warn!(
                            "refusing connection: at max_connections limit ({})",
                            cfg.max_connections
                        );
                        drop(stream);
                        continue;
                    }
                    let conn = Connection::new(
                        stream,
                        storage.clone(),
                        max_key_len,
                        cfg.buf_size,
                        cfg.buf_size,
                    );
                    if let Err(e) = conn.register(&reactor) {
                        log::error!("failed to register connection fd={}: {e}", conn.fd);
                        continue;
                    }
                    log::debug!("open connection socket fd={}", conn.fd);
                    connections.insert(conn.fd, conn);
                }
            } else if connections.contains_key(&ev.token) {
                runnable.insert(ev.token);
            }
        }

        timeout_ms = pump(&mut connections, &mut runnable, &reactor);
    }

    log::info!("shutdown server by caught SIGINT");
    close_all(&mut connections, &reactor);
    storage.drain();
    Ok(())
}

/// Pump every runnable connection once; a connection that exhausts its
/// step budget stays runnable for the next pass (so the loop polls again
/// with a zero timeout instead of blocking), matching the original's
/// `towait = processGo(...) ? 0 : -1`.
fn pump(
    connections: &mut HashMap<RawFd, Connection>,
    runnable: &mut HashSet<RawFd>,
    reactor: &Reactor,
) -> i32 {
    let mut still_runnable = HashSet::new();
    let mut closed = Vec::new();

    for fd in runnable.drain() {
        let Some(conn) = connections.get_mut(&fd) else {
            continue;
        };
        match conn.pump(STEP_BUDGET) {
            PumpResult::Waiting => {}
            PumpResult::Runnable => {
                still_runnable.insert(fd);
            }
            PumpResult::Closed => closed.push(fd),
        }
    }

    for fd in closed {
        log::debug!("close connection socket fd={fd}");
        let _ = reactor.remove(fd);
        connections.remove(&fd);
    }

    *runnable = still_runnable;
    if runnable.is_empty() {
        -1
    } else {
        0
    }
}

fn close_all(connections: &mut HashMap<RawFd, Connection>, reactor: &Reactor) {
    log::debug!("closing {} connections on shutdown", connections.len());
    for (fd, _) in connections.drain() {
        let _ = reactor.remove(fd);
    }
}
