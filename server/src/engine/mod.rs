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

//! The storage engine: the compressed radix trie keyed store.

pub mod idx;

use idx::trie::Trie;
use std::sync::Mutex;

/// One approximate-search match, owned: the key bytes, the cloned value,
/// the Levenshtein distance, and whether it was reached in suffix mode.
/// See `engine::idx::approx` for how these are computed.
pub struct ApproxMatch {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub distance: usize,
    pub suffix: bool,
}

/// The process-wide keyspace. A single [`Trie`] behind a mutex: the
/// cooperative scheduler drives one connection task at a time, but
/// `Storage` is shared across every connection, so ordinary exclusion is
/// enough -- there is no concurrent-reader fast path to preserve.
pub struct Storage {
    trie: Mutex<Trie<Vec<u8>>>,
}

impl Storage {
    pub fn new() -> Self {
        Self {
            trie: Mutex::new(Trie::new()),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.trie.lock().unwrap().get(key).cloned()
    }

    pub fn set(&self, key: &[u8], value: Vec<u8>) -> Option<Vec<u8>> {
        self.trie.lock().unwrap().insert(key, value)
    }

    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.trie.lock().unwrap().remove(key)
    }

    pub fn search_approx(
        &self,
        query: &[u8],
        max_edits: usize,
        suffix_budget: Option<usize>,
    ) -> Vec<ApproxMatch> {
        self.trie
            .lock()
            .unwrap()
            .search_approx(query, max_edits, suffix_budget)
            .into_iter()
            .map(|hit| ApproxMatch {
                key: hit.key,
                value: hit.value.clone(),
                distance: hit.distance,
                suffix: hit.suffix,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trie.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.lock().unwrap().is_empty()
    }

    /// Walk the whole trie deleting every key so owned values are freed
    /// deterministically rather than left to the allocator at process
    /// exit. Called once, on clean shutdown.
    pub fn drain(&self) {
        self.trie.lock().unwrap().drain();
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
