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

//! `ChunkList`: a FIFO queue of inbound byte chunks, read from the socket
//! in fixed-size pieces and consumed byte-by-byte by the protocol
//! fetcher. Keeping chunks separate instead of appending into one
//! ever-growing buffer means a fully consumed chunk is dropped for free
//! (no `Vec::drain`/memmove over already-read bytes).

use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;

/// An accumulating queue of read chunks with a cursor into the front one.
#[derive(Default)]
pub struct ChunkList {
    chunks: VecDeque<Bytes>,
    total: usize,
}

impl ChunkList {
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            total: 0,
        }
    }

    /// Total unconsumed bytes across every chunk.
    pub fn len(&self) -> usize {
        self.total
    }
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Push a freshly read chunk onto the back of the queue.
    pub fn push(&mut self, chunk: BytesMut) {
        if chunk.is_empty() {
            return;
        }
        self.total += chunk.len();
        self.chunks.push_back(chunk.freeze());
    }

    /// Consume and return up to `n` bytes, draining fully-read chunks as
    /// it goes. Returns fewer than `n` bytes (never zero, unless `n` is
    /// zero) if the queue runs dry first.
    pub fn take(&mut self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n.min(self.total));
        let mut remaining = n;
        while remaining > 0 {
            let Some(front) = self.chunks.front_mut() else {
                break;
            };
            let take = remaining.min(front.remaining());
            out.extend_from_slice(&front[..take]);
            front.advance(take);
            self.total -= take;
            remaining -= take;
            if !front.has_remaining() {
                self.chunks.pop_front();
            }
        }
        out
    }

    /// Copy out up to `n` bytes without consuming them, for a writer that
    /// needs to know how much actually went out over the socket before
    /// deciding what to drop (spec §4.5 SEND: "on short write, shift the
    /// chunk").
    pub fn peek(&self, n: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(n.min(self.total));
        let mut remaining = n;
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(chunk.len());
            out.extend_from_slice(&chunk[..take]);
            remaining -= take;
        }
        out
    }

    /// Drop every buffered chunk (used when a connection is torn down).
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_spans_multiple_chunks() {
        let mut list = ChunkList::new();
        list.push(BytesMut::from(&b"ab"[..]));
        list.push(BytesMut::from(&b"cde"[..]));
        assert_eq!(list.len(), 5);
        assert_eq!(list.take(4), b"abcd".to_vec());
        assert_eq!(list.len(), 1);
        assert_eq!(list.take(10), b"e".to_vec());
        assert!(list.is_empty());
    }

}
