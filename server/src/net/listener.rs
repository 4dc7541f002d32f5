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
 * GNU Affero License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Listen-socket setup and accept (spec §1: "listen/accept socket setup
//! ... treated as an external collaborator with a minimal interface").
//! A thin wrapper over `std::net::TcpListener`/`TcpStream` that only
//! adds what the original's `io_createListenSocket`/
//! `io_createConnectionSocket` do beyond the stdlib defaults: `SO_REUSEADDR`
//! (`TcpListener` sets this itself) and non-blocking mode on both the
//! listener and every accepted socket.

use std::io;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};

pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    pub fn bind(host: IpAddr, port: u16, backlog: i32) -> io::Result<Self> {
        let addr = SocketAddr::new(host, port);
        let inner = Self::bind_with_backlog(addr, backlog)?;
        inner.set_nonblocking(true)?;
        Ok(Self { inner })
    }

    /// `std::net::TcpListener::bind` hardcodes a backlog of 128; the
    /// protocol's default of 50 (spec §6) is a deliberate, much smaller
    /// figure, so bind through a raw `socket`/`bind`/`listen` instead of
    /// going through the stdlib's one-call convenience.
    fn bind_with_backlog(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
        use socket2::{Domain, Socket, Type};
        let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
        let socket = Socket::new(domain, Type::STREAM, None)?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(backlog)?;
        Ok(socket.into())
    }

    pub fn fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }

    /// Accept every pending connection (spec's `connOpen`: "cycle on all
    /// pending requests"), stopping at the first `WouldBlock`. Returns
    /// the accepted, already non-blocking streams.
    pub fn accept_all(&self) -> io::Result<Vec<TcpStream>> {
        let mut out = Vec::new();
        loop {
            match self.inner.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(true)?;
                    stream.set_nodelay(true).ok();
                    out.push(stream);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}
