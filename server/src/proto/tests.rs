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

use super::fetcher::Fetcher;
use super::request::RequestTask;
use crate::buf::ChunkList;
use crate::engine::Storage;
use crate::rt::argz::Argz;
use crate::rt::sched::{RunOutcome, Scheduler};
use bytes::BytesMut;
use std::cell::RefCell;
use std::rc::Rc;

fn get_request(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u32.to_be_bytes());
    out.push(2); // GET
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(key);
    out
}

fn set_request(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u32.to_be_bytes());
    out.push(1); // SET
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(key);
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(value);
    out
}

fn lev_request(key: &[u8], max_lev: u8, max_suflen: u8) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u32.to_be_bytes());
    out.push(3); // LEV
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(key);
    let params = (max_lev as u16) | ((max_suflen as u16) << 8);
    out.extend_from_slice(&params.to_be_bytes());
    out
}

/// Runs a single request to completion, driving a fresh `Scheduler` with
/// `RequestTask` as its *root*. A root task's `Yield::Caller` pops an
/// empty stack, which the scheduler reports as plain `Done` -- so this
/// needs no connection-task stand-in to observe whether the request
/// completed, aborted, or starved.
fn run_request(storage: Rc<Storage>, bytes: &[u8]) -> RunOutcome {
    let chunks = Rc::new(RefCell::new(ChunkList::new()));
    chunks.borrow_mut().push(BytesMut::from(bytes));
    let fetcher = Fetcher::new(chunks);
    let mut sched = Scheduler::new(Box::new(RequestTask::new(fetcher, storage, super::MAX_KEY_LEN)));
    sched.run(10_000, Argz::new())
}

#[test]
fn set_then_get_round_trip() {
    let storage = Rc::new(Storage::new());
    let outcome1 = run_request(storage.clone(), &set_request(b"k", b"v1"));
    assert!(matches!(outcome1, RunOutcome::Done));
    assert_eq!(storage.get(b"k"), Some(b"v1".to_vec()));

    let outcome2 = run_request(storage.clone(), &get_request(b"k"));
    assert!(matches!(outcome2, RunOutcome::Done));
}

#[test]
fn get_missing_key_completes_without_aborting() {
    let storage = Rc::new(Storage::new());
    let outcome = run_request(storage, &get_request(b"absent"));
    assert!(matches!(outcome, RunOutcome::Done));
}

#[test]
fn unsupported_version_aborts() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1u32.to_be_bytes()); // version 1, not 0
    bytes.push(2);
    bytes.extend_from_slice(&4u32.to_be_bytes());
    bytes.extend_from_slice(b"key1");
    let outcome = run_request(Rc::new(Storage::new()), &bytes);
    assert!(matches!(outcome, RunOutcome::Aborted(_)));
}

#[test]
fn zero_length_value_on_set_aborts() {
    let storage = Rc::new(Storage::new());
    let outcome = run_request(storage, &set_request(b"k", b""));
    assert!(matches!(outcome, RunOutcome::Aborted(_)));
}

#[test]
fn zero_length_key_on_get_aborts() {
    let storage = Rc::new(Storage::new());
    let outcome = run_request(storage, &get_request(b""));
    assert!(matches!(outcome, RunOutcome::Aborted(_)));
}

#[test]
fn split_request_across_reads_needs_input_then_completes() {
    let storage = Rc::new(Storage::new());
    let full = set_request(b"splitkey", b"splitvalue");
    // Cut mid-way through the key length field so the very first fetch
    // starves.
    let (first, second) = full.split_at(3);

    let chunks = Rc::new(RefCell::new(ChunkList::new()));
    chunks.borrow_mut().push(BytesMut::from(first));
    let fetcher = Fetcher::new(chunks.clone());
    let mut sched = Scheduler::new(Box::new(RequestTask::new(
        fetcher,
        storage.clone(),
        super::MAX_KEY_LEN,
    )));

    match sched.run(10_000, Argz::new()) {
        RunOutcome::NeedsInput(_) => {}
        _ => panic!("expected the scheduler to starve on a truncated request"),
    }

    chunks.borrow_mut().push(BytesMut::from(second));
    match sched.run(10_000, Argz::new()) {
        RunOutcome::Done => {}
        _ => panic!("expected the scheduler to finish once the rest of the bytes arrive"),
    }
    assert_eq!(storage.get(b"splitkey"), Some(b"splitvalue".to_vec()));
}

#[test]
fn lev_command_runs_to_completion_over_a_populated_trie() {
    let storage = Rc::new(Storage::new());
    for (k, v) in [
        ("sitting", "1"),
        ("kitten", "2"),
        ("kitchen", "3"),
        ("mitten", "4"),
        ("sun", "5"),
    ] {
        storage.set(k.as_bytes(), v.as_bytes().to_vec());
    }
    let outcome = run_request(storage, &lev_request(b"kitten", 2, 0));
    assert!(matches!(outcome, RunOutcome::Done));
}
