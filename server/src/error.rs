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

//! The process-level error type. Distinct from [`crate::rt::exception::Exception`],
//! which travels between tasks on a single connection's scheduler stack --
//! this one is what `main` and the config loader deal in.

use crate::config::ConfigError;
use crate::proto::ProtocolError;
use crate::rt::exception::{run_code, Exception, Kind};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Config(ConfigError),
    Protocol(ProtocolError),
    /// An uncaught scheduler `ABORT` outside the wire-protocol taxonomy
    /// (I/O failure, orderly close, or an invariant violation).
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// A connection's uncaught abort, classified the same way `rt::exception::Kind`
/// classifies it: a `Run` exception is a protocol violation, everything else
/// (`Io`, `Clo`) is process-level runtime noise worth a plain string.
///
/// `Kind::Run` exceptions built via `Exception::{unsupported_version,
/// unknown_command, key_too_long, empty_key, empty_value, unexpected_eof}`
/// carry one of `run_code`'s discriminants plus their payload in `data`;
/// those are unpacked back into the matching named `ProtocolError` variant.
/// Anything else (an invariant-violation abort with no `run_code`) falls
/// back to the generic `Violation(&'static str)`.
impl From<Exception> for Error {
    fn from(exc: Exception) -> Self {
        match exc.kind {
            Kind::Run => Self::Protocol(decode_protocol_error(&exc)),
            Kind::Io | Kind::Clo | Kind::Usr => Self::Runtime(exc.to_string()),
        }
    }
}

fn decode_protocol_error(exc: &Exception) -> ProtocolError {
    match exc.code {
        run_code::UNSUPPORTED_VERSION => {
            let v = u32::from_be_bytes(exc.data[..4].try_into().unwrap_or_default());
            ProtocolError::UnsupportedVersion(v)
        }
        run_code::UNKNOWN_COMMAND => ProtocolError::UnknownCommand(exc.data.first().copied().unwrap_or(0)),
        run_code::KEY_TOO_LONG => {
            let len = u64::from_be_bytes(exc.data[..8].try_into().unwrap_or_default());
            ProtocolError::KeyTooLong(len as usize)
        }
        run_code::EMPTY_KEY => ProtocolError::EmptyKey,
        run_code::EMPTY_VALUE => ProtocolError::EmptyValue,
        run_code::UNEXPECTED_EOF => ProtocolError::UnexpectedEof,
        _ => ProtocolError::Violation(exc.msg),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
