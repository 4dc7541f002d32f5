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

//! The exception taxonomy carried by `CONTINUE`/`ABORT` yields.
//!
//! Distinct from [`crate::error::Error`]: that one is the process-level
//! error type `main` deals in, this one travels between tasks on the
//! scheduler's stack and is cheap enough to build on every starved read.

use std::fmt;

/// What kind of condition interrupted a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// The underlying socket isn't ready yet (`EAGAIN`/`EWOULDBLOCK`) or a
    /// real I/O error occurred.
    Io,
    /// A wire-protocol violation (bad version, unknown command, oversized
    /// key, malformed framing) or a scheduler/engine invariant break;
    /// always fatal to the connection.
    Run,
    /// A user-level semantic error (spec §7's `USR`, e.g. "key not
    /// found"). These never actually reach the scheduler as an exception
    /// in this build -- a command task reports them as an ordinary
    /// scalar reply (see `proto::commands::GetTask`) instead of
    /// aborting -- but the variant is kept so `Kind` still names every
    /// member of the spec's taxonomy.
    Usr,
    /// The peer closed the connection.
    Clo,
}

/// A lightweight, cloneable condition value. A task yields `CONTINUE`
/// with one of these to mean "not ready yet, come back to this state
/// when more input is available"; it yields `ABORT` with one to mean
/// "this task (and usually its whole connection) is done for".
#[derive(Debug, Clone)]
pub struct Exception {
    pub kind: Kind,
    pub code: i32,
    pub msg: &'static str,
    pub data: Vec<u8>,
}

/// Discriminants for the specific wire-protocol violations spec §7's `RUN`
/// taxonomy names. `error::Error`'s `From<Exception>` impl matches on these
/// to reconstruct the matching `proto::ProtocolError` variant instead of
/// collapsing every abort into the generic `Violation(&'static str)` catch-all.
pub mod run_code {
    pub const UNSUPPORTED_VERSION: i32 = 1;
    pub const UNKNOWN_COMMAND: i32 = 2;
    pub const KEY_TOO_LONG: i32 = 3;
    pub const EMPTY_KEY: i32 = 4;
    pub const EMPTY_VALUE: i32 = 5;
    pub const UNEXPECTED_EOF: i32 = 6;
}

impl Exception {
    pub fn new(kind: Kind, code: i32, msg: &'static str) -> Self {
        Self {
            kind,
            code,
            msg,
            data: Vec::new(),
        }
    }
    pub fn with_data(kind: Kind, code: i32, msg: &'static str, data: Vec<u8>) -> Self {
        Self {
            kind,
            code,
            msg,
            data,
        }
    }
    pub fn io_not_ready() -> Self {
        Self::new(Kind::Io, 0, "would block")
    }
    pub fn closed() -> Self {
        Self::new(Kind::Clo, 0, "connection closed")
    }

    /// Spec §6: a request whose version header isn't the one this build
    /// understands.
    pub fn unsupported_version(version: u32) -> Self {
        Self::with_data(
            Kind::Run,
            run_code::UNSUPPORTED_VERSION,
            "unsupported protocol version",
            version.to_be_bytes().to_vec(),
        )
    }
    /// Spec §4.6 `CMD`: no command kind matches the fetched byte.
    pub fn unknown_command(byte: u8) -> Self {
        Self::with_data(Kind::Run, run_code::UNKNOWN_COMMAND, "unknown command byte", vec![byte])
    }
    /// Spec §6: key length bounded to `[1, max_key_len]`.
    pub fn key_too_long(len: u64, max: usize) -> Self {
        let mut data = len.to_be_bytes().to_vec();
        data.extend_from_slice(&(max as u64).to_be_bytes());
        Self::with_data(Kind::Run, run_code::KEY_TOO_LONG, "key length exceeds bound", data)
    }
    pub fn empty_key() -> Self {
        Self::new(Kind::Run, run_code::EMPTY_KEY, "zero-length key")
    }
    pub fn empty_value() -> Self {
        Self::new(Kind::Run, run_code::EMPTY_VALUE, "zero-length value")
    }
    pub fn unexpected_eof() -> Self {
        Self::new(Kind::Run, run_code::UNEXPECTED_EOF, "unexpected end of field")
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?} {}] {}", self.kind, self.code, self.msg)
    }
}

impl std::error::Error for Exception {}
