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

//! The request subtask (spec §4.6): reads the fixed request header,
//! dispatches the per-command subtask, and hands the reply back to the
//! connection task, then loops for the next request on the same
//! connection.

use super::commands::{GetTask, LevTask, SetTask};
use super::fetcher::{FetchMode, SharedFetcher};
use super::{CommandKind, VERSION};
use crate::engine::Storage;
use crate::rt::argz::{Argz, Value};
use crate::rt::exception::{Exception, Kind};
use crate::rt::task::{self, Label, Task, Yield};
use std::rc::Rc;

const REQ: Label = "REQ";
const VER: Label = "VER";
const CMD: Label = "CMD";
const RES: Label = "RES";

/// The label the connection task resumes at once a request has produced
/// its framed reply. Defined here (rather than imported from `net`, which
/// depends on `proto`) to avoid a module cycle; the two must agree by
/// name, checked by `proto::tests`.
pub const RESP_LABEL: Label = "RESP";

pub struct RequestTask {
    state: Label,
    fetcher: SharedFetcher,
    storage: Rc<Storage>,
    max_key_len: usize,
    version: u32,
    cmd: u8,
}

impl RequestTask {
    pub fn new(fetcher: SharedFetcher, storage: Rc<Storage>, max_key_len: usize) -> Self {
        Self {
            state: task::INIT,
            fetcher,
            storage,
            max_key_len,
            version: 0,
            cmd: 0,
        }
    }
}

impl Task for RequestTask {
    fn poll(&mut self, input: Argz) -> Yield {
        match self.state {
            task::INIT => Yield::Goto(REQ),
            REQ => match self.fetcher.borrow_mut().fetch(FetchMode::Int32) {
                Ok(Some(v)) => {
                    self.version = v.into_int() as u32;
                    Yield::Goto(VER)
                }
                Ok(None) => Yield::Continue(Exception::io_not_ready(), REQ),
                Err(e) => Yield::Abort(e),
            },
            VER => {
                if self.version != VERSION {
                    return Yield::Abort(Exception::unsupported_version(self.version));
                }
                match self.fetcher.borrow_mut().fetch(FetchMode::Int8) {
                    Ok(Some(v)) => {
                        self.cmd = v.into_int() as u8;
                        Yield::Goto(CMD)
                    }
                    Ok(None) => Yield::Continue(Exception::io_not_ready(), VER),
                    Err(e) => Yield::Abort(e),
                }
            }
            CMD => match CommandKind::from_byte(self.cmd) {
                Some(CommandKind::Get) => Yield::Sub(
                    Box::new(GetTask::new(self.fetcher.clone(), self.storage.clone(), self.max_key_len)),
                    RES,
                ),
                Some(CommandKind::Set) => Yield::Sub(
                    Box::new(SetTask::new(self.fetcher.clone(), self.storage.clone(), self.max_key_len)),
                    RES,
                ),
                Some(CommandKind::Lev) => Yield::Sub(
                    Box::new(LevTask::new(self.fetcher.clone(), self.storage.clone(), self.max_key_len)),
                    RES,
                ),
                None => Yield::Abort(Exception::unknown_command(self.cmd)),
            },
            RES => {
                // The command subtask hands back [kind:Int, payload:Bytes].
                let kind = input[0].as_int().unwrap_or(0);
                let payload = input[1].as_bytes().unwrap_or(&[]).to_vec();
                let reply = if kind == 0 {
                    super::Reply::scalar(payload)
                } else {
                    super::Reply::list(payload)
                };
                Yield::Caller(RESP_LABEL, vec![Value::Bytes(reply.frame())])
            }
            other => Yield::Abort(Exception::with_data(
                Kind::Run,
                0,
                "invalid request state",
                other.as_bytes().to_vec(),
            )),
        }
    }

    fn state(&self) -> Label {
        self.state
    }

    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

/// The key-fetching helper shared by every command subtask (spec §4.7:
/// "KeyStr helper"). Fetches an INT32 length, validates it against the
/// protocol's key bound, then fetches that many raw bytes.
///
/// `done_label` is the state the caller resumes at: since a sub-task
/// that finishes via `Yield::Caller` picks its own resume label (the
/// label given to the original `Yield::Sub` call is only used when the
/// sub-task instead finishes via plain `Yield::Done`), a reusable helper
/// like this one has to be told what its particular caller wants to be
/// called back at -- the Rust stand-in for the spec's `SU(machine,
/// initdata, parentdata)` carrying caller-specific data into a fresh
/// subtask instance.
pub struct KeyFetchTask {
    state: Label,
    fetcher: SharedFetcher,
    len: u32,
    done_label: Label,
    max_key_len: usize,
}

const LEN: Label = "LEN";
const KEY: Label = "KEY";

impl KeyFetchTask {
    /// `max_key_len` is the effective bound for this connection: the
    /// configured `Config::max_key_len`, already clamped to the wire
    /// protocol's absolute ceiling (`proto::MAX_KEY_LEN`) by the caller.
    pub fn new(fetcher: SharedFetcher, done_label: Label, max_key_len: usize) -> Self {
        Self {
            state: task::INIT,
            fetcher,
            len: 0,
            done_label,
            max_key_len,
        }
    }
}

impl Task for KeyFetchTask {
    fn poll(&mut self, _input: Argz) -> Yield {
        match self.state {
            task::INIT => Yield::Goto(LEN),
            LEN => match self.fetcher.borrow_mut().fetch(FetchMode::Int32) {
                Ok(Some(v)) => {
                    let len = v.into_int();
                    if len == 0 {
                        return Yield::Abort(Exception::empty_key());
                    }
                    if len > self.max_key_len as u64 {
                        return Yield::Abort(Exception::key_too_long(len, self.max_key_len));
                    }
                    self.len = len as u32;
                    Yield::Goto(KEY)
                }
                Ok(None) => Yield::Continue(Exception::io_not_ready(), LEN),
                Err(e) => Yield::Abort(e),
            },
            KEY => match self
                .fetcher
                .borrow_mut()
                .fetch(FetchMode::Str(self.len as usize))
            {
                Ok(Some(v)) => Yield::Caller(self.done_label, vec![Value::Bytes(v.into_bytes())]),
                Ok(None) => Yield::Continue(Exception::io_not_ready(), KEY),
                Err(e) => Yield::Abort(e),
            },
            other => Yield::Abort(Exception::with_data(
                Kind::Run,
                0,
                "invalid key-fetch state",
                other.as_bytes().to_vec(),
            )),
        }
    }

    fn state(&self) -> Label {
        self.state
    }

    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}
