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

//! The per-command subtasks (spec §4.7): GET, SET, and LEV. Each is
//! instantiated fresh by the request task's `CMD` state, sub-calls the
//! shared `KeyFetchTask` helper for its key argument, then does whatever
//! else its own payload needs before handing a `(kind, payload)` reply
//! back to the request task's `RES` state.

use super::fetcher::{FetchMode, SharedFetcher};
use super::request::KeyFetchTask;
use crate::engine::Storage;
use crate::rt::argz::{Argz, Value};
use crate::rt::exception::Exception;
use crate::rt::task::{self, Label, Task, Yield};
use std::rc::Rc;

/// The label every command subtask hands its reply back to the request
/// task under; matched against `request::RequestTask`'s `RES` state.
const RES: Label = "RES";

/// The label `KeyFetchTask` resumes its caller at once the key bytes are
/// in hand. Every command task below uses the same name, so there's
/// nothing subtask-specific to configure beyond passing it through.
const GOT_KEY: Label = "GOT_KEY";

fn reply_scalar(text: impl Into<Vec<u8>>) -> Yield {
    Yield::Caller(RES, vec![Value::Int(0), Value::Bytes(text.into())])
}

fn reply_list(payload: Vec<u8>) -> Yield {
    Yield::Caller(RES, vec![Value::Int(1), Value::Bytes(payload)])
}

// ---------------------------------------------------------------- GET ---

const GET_KEY: Label = "KEY";

pub struct GetTask {
    state: Label,
    fetcher: SharedFetcher,
    storage: Rc<Storage>,
    max_key_len: usize,
}

impl GetTask {
    pub fn new(fetcher: SharedFetcher, storage: Rc<Storage>, max_key_len: usize) -> Self {
        Self {
            state: task::INIT,
            fetcher,
            storage,
            max_key_len,
        }
    }
}

impl Task for GetTask {
    fn poll(&mut self, input: Argz) -> Yield {
        match self.state {
            task::INIT => Yield::Goto(GET_KEY),
            GET_KEY => Yield::Sub(
                Box::new(KeyFetchTask::new(self.fetcher.clone(), GOT_KEY, self.max_key_len)),
                GOT_KEY,
            ),
            GOT_KEY => {
                let key = input[0].as_bytes().unwrap_or(&[]).to_vec();
                match self.storage.get(&key) {
                    Some(value) => {
                        let mut payload = Vec::with_capacity(1 + value.len());
                        payload.push(b'@');
                        payload.extend_from_slice(&value);
                        reply_scalar(payload)
                    }
                    None => reply_scalar(&b"!key not found"[..]),
                }
            }
            other => unreachable_state(other),
        }
    }

    fn state(&self) -> Label {
        self.state
    }
    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

// ---------------------------------------------------------------- SET ---

const SET_KEY: Label = "KEY";
const VAL_LEN: Label = "VAL_LEN";
const VAL: Label = "VAL";

pub struct SetTask {
    state: Label,
    fetcher: SharedFetcher,
    storage: Rc<Storage>,
    max_key_len: usize,
    key: Vec<u8>,
    val_len: u32,
}

impl SetTask {
    pub fn new(fetcher: SharedFetcher, storage: Rc<Storage>, max_key_len: usize) -> Self {
        Self {
            state: task::INIT,
            fetcher,
            storage,
            max_key_len,
            key: Vec::new(),
            val_len: 0,
        }
    }
}

impl Task for SetTask {
    fn poll(&mut self, input: Argz) -> Yield {
        match self.state {
            task::INIT => Yield::Goto(SET_KEY),
            SET_KEY => Yield::Sub(
                Box::new(KeyFetchTask::new(self.fetcher.clone(), GOT_KEY, self.max_key_len)),
                GOT_KEY,
            ),
            GOT_KEY => {
                self.key = input[0].as_bytes().unwrap_or(&[]).to_vec();
                Yield::Goto(VAL_LEN)
            }
            VAL_LEN => match self.fetcher.borrow_mut().fetch(FetchMode::Int32) {
                Ok(Some(v)) => {
                    let len = v.into_int();
                    if len == 0 {
                        return Yield::Abort(Exception::empty_value());
                    }
                    self.val_len = len as u32;
                    Yield::Goto(VAL)
                }
                Ok(None) => Yield::Continue(Exception::io_not_ready(), VAL_LEN),
                Err(e) => Yield::Abort(e),
            },
            VAL => match self
                .fetcher
                .borrow_mut()
                .fetch(FetchMode::Str(self.val_len as usize))
            {
                Ok(Some(v)) => {
                    self.storage.set(&self.key, v.into_bytes());
                    reply_scalar(&b"OK"[..])
                }
                Ok(None) => Yield::Continue(Exception::io_not_ready(), VAL),
                Err(e) => Yield::Abort(e),
            },
            other => unreachable_state(other),
        }
    }

    fn state(&self) -> Label {
        self.state
    }
    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

// ---------------------------------------------------------------- LEV ---

const LEV_KEY: Label = "KEY";
const PARAMS: Label = "PARAMS";

pub struct LevTask {
    state: Label,
    fetcher: SharedFetcher,
    storage: Rc<Storage>,
    max_key_len: usize,
    query: Vec<u8>,
}

impl LevTask {
    pub fn new(fetcher: SharedFetcher, storage: Rc<Storage>, max_key_len: usize) -> Self {
        Self {
            state: task::INIT,
            fetcher,
            storage,
            max_key_len,
            query: Vec::new(),
        }
    }
}

impl Task for LevTask {
    fn poll(&mut self, input: Argz) -> Yield {
        match self.state {
            task::INIT => Yield::Goto(LEV_KEY),
            LEV_KEY => Yield::Sub(
                Box::new(KeyFetchTask::new(self.fetcher.clone(), GOT_KEY, self.max_key_len)),
                GOT_KEY,
            ),
            GOT_KEY => {
                self.query = input[0].as_bytes().unwrap_or(&[]).to_vec();
                Yield::Goto(PARAMS)
            }
            PARAMS => match self.fetcher.borrow_mut().fetch(FetchMode::Int16) {
                Ok(Some(v)) => {
                    let params = v.into_int() as u16;
                    let max_edits = (params & 0xff) as usize;
                    let suffix_len = (params >> 8) as usize;
                    let suffix_budget = if suffix_len == 0 {
                        None
                    } else {
                        Some(suffix_len)
                    };
                    let matches = self.storage.search_approx(&self.query, max_edits, suffix_budget);
                    reply_list(serialize_lev(&matches))
                }
                Ok(None) => Yield::Continue(Exception::io_not_ready(), PARAMS),
                Err(e) => Yield::Abort(e),
            },
            other => unreachable_state(other),
        }
    }

    fn state(&self) -> Label {
        self.state
    }
    fn set_state(&mut self, label: Label) {
        self.state = label;
    }
}

/// 4-byte count, then per result: 1-byte distance, 1-byte suffix flag,
/// 4-byte key length + key bytes, 4-byte value length + value bytes
/// (spec §4.7).
fn serialize_lev(matches: &[crate::engine::ApproxMatch]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(matches.len() as u32).to_be_bytes());
    for m in matches {
        out.push(m.distance.min(u8::MAX as usize) as u8);
        out.push(m.suffix as u8);
        out.extend_from_slice(&(m.key.len() as u32).to_be_bytes());
        out.extend_from_slice(&m.key);
        out.extend_from_slice(&(m.value.len() as u32).to_be_bytes());
        out.extend_from_slice(&m.value);
    }
    out
}

fn unreachable_state(label: Label) -> Yield {
    Yield::Abort(Exception::with_data(
        crate::rt::exception::Kind::Run,
        0,
        "invalid command state",
        label.as_bytes().to_vec(),
    ))
}
