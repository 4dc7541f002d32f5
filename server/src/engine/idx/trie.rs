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

//! Trie orchestration: `insert`/`lookup`/`delete`.
//!
//! `lookup` is served by [`super::look::Look`]. `insert` and `delete`
//! walk the trie themselves, recursing over `&mut Wood<V>` -- the Rust
//! call stack supplies the ancestor access the original crumb-replay
//! design needed, so there is no separate path-history structure here.

use super::look::Look;
use super::{Branch, Node, Wood};

/// An ordered key/value trie over byte-string keys.
pub struct Trie<V> {
    root: Option<Box<Wood<V>>>,
    len: usize,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Walk the trie against `key`, without mutating anything.
    pub fn look<'a>(&'a self, key: &'a [u8]) -> Look<'a, V> {
        match &self.root {
            None => Look::empty(key),
            Some(w) => Look::walk(w, key),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.look(key).value()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Insert `value` at `key`, returning the previous value if the key
    /// already carried one. `key` must be non-empty.
    pub fn insert(&mut self, key: &[u8], value: V) -> Option<V> {
        assert!(!key.is_empty(), "key must not be empty");
        let old = match self.root.as_deref_mut() {
            None => {
                self.root = Some(Box::new(Wood::new_branch(key, Box::new(value))));
                None
            }
            Some(w) => insert_into(w, key, value),
        };
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Remove the value at `key`, if any, returning it.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        if key.is_empty() {
            return None;
        }
        let (removed, empty) = match self.root.as_deref_mut() {
            None => (None, false),
            Some(w) => {
                let r = remove_into(w, key);
                (r.removed, r.empty)
            }
        };
        if empty {
            self.root = None;
        }
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Walk the whole trie deleting every key, so owned values are freed
    /// immediately rather than left for the destructor. Used on clean
    /// shutdown.
    pub fn drain(&mut self) {
        self.root = None;
        self.len = 0;
    }

    /// Approximate (Levenshtein-bounded) search; see [`super::approx`].
    pub fn search_approx<'a>(
        &'a self,
        query: &[u8],
        max_edits: usize,
        suffix_budget: Option<usize>,
    ) -> Vec<super::approx::ApproxHit<'a, V>> {
        match &self.root {
            None => Vec::new(),
            Some(w) => super::approx::search(w, query, max_edits, suffix_budget),
        }
    }

    /// Every `(key, value)` pair in ascending lexicographic key order
    /// (spec §8: "enumerating all keys via cursor in-order yields
    /// lexicographically sorted byte strings"), walked with the external
    /// [`super::look::Cursor`] API rather than a private recursive
    /// descent -- this is the read-only traversal the Cursor exists for.
    pub fn iter(&self) -> Vec<(Vec<u8>, &V)> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            let mut prefix = Vec::new();
            walk_cursor(super::look::Cursor::root(root), &mut prefix, &mut out);
        }
        out
    }
}

/// Depth-first, left-to-right walk over a [`super::look::Cursor`]: a
/// branch's single current letter is visited, then `forward()` either
/// advances within the same branch or descends; a node's items are
/// visited in their already-sorted order via `seek_next()`.
fn walk_cursor<'a, V>(
    cursor: super::look::Cursor<'a, V>,
    prefix: &mut Vec<u8>,
    out: &mut Vec<(Vec<u8>, &'a V)>,
) {
    match &cursor {
        super::look::Cursor::Branch { .. } => {
            prefix.push(cursor.letter());
            if let Some(v) = cursor.value() {
                out.push((prefix.clone(), v));
            }
            if let Some(next) = cursor.forward() {
                walk_cursor(next, prefix, out);
            }
            prefix.pop();
        }
        super::look::Cursor::NodeItem { .. } => {
            let mut item = Some(cursor);
            while let Some(cur) = item {
                prefix.push(cur.letter());
                if let Some(v) = cur.value() {
                    out.push((prefix.clone(), v));
                }
                if let Some(next) = cur.forward() {
                    walk_cursor(next, prefix, out);
                }
                prefix.pop();
                item = cur.seek_next();
            }
        }
    }
}

/// Recursively insert `key`/`value` under `wood`, which is assumed to be
/// reached after already consuming any bytes that led to it. Returns the
/// previous value at an exact match, if any.
fn insert_into<V>(wood: &mut Wood<V>, key: &[u8], value: V) -> Option<V> {
    let (old, replacement) = match wood {
        Wood::Branch(b) => {
            let kd_len = b.kdata.len();
            let common = key
                .iter()
                .zip(b.kdata.iter())
                .take_while(|(a, c)| a == c)
                .count();
            if common == kd_len && common == key.len() {
                // BRANCH exact hit: replace or attach the value in place.
                (b.value.replace(Box::new(value)).map(|v| *v), None)
            } else if common == kd_len {
                // BRANCH_OVER: kdata fully consumed, key continues.
                let rest = &key[common..];
                if let Some(sub) = b.sub.as_deref_mut() {
                    (insert_into(sub, rest, value), None)
                } else {
                    b.sub = Some(Box::new(Wood::new_branch(rest, Box::new(value))));
                    (None, None)
                }
            } else if common == key.len() {
                // BRANCH_INTO: key exhausted partway through kdata; cut
                // the branch into a value-bearing prefix and a tail that
                // continues the old content.
                let tail_kdata: Vec<u8> = b.kdata[common..].to_vec();
                let tail = Wood::Branch(Branch::new(tail_kdata, b.value.take(), b.sub.take()));
                let prefix_kdata: Vec<u8> = b.kdata[..common].to_vec();
                let replacement = Wood::Branch(Branch::new(
                    prefix_kdata,
                    Some(Box::new(value)),
                    Some(Box::new(tail)),
                ));
                (None, Some(replacement))
            } else {
                // BRANCH_DIFF: both the key and kdata have bytes left and
                // they disagree at `common`. The disagreeing byte itself
                // becomes the fork node's item letter (it is consumed by
                // the node decision, not stored again in a child); only
                // whatever follows it is wrapped into a tail branch.
                let old_letter = b.kdata[common];
                let old_rest: Vec<u8> = b.kdata[common + 1..].to_vec();
                let old_value = b.value.take();
                let old_sub = b.sub.take();

                let new_letter = key[common];
                let new_rest: Vec<u8> = key[common + 1..].to_vec();

                let mut fork = Node::new_fork(old_letter, new_letter);
                let old_idx = fork.find(old_letter).expect("just inserted");
                if old_rest.is_empty() {
                    if let Some(v) = old_value {
                        fork.attach_val(old_idx, v);
                    }
                    if let Some(s) = old_sub {
                        fork.attach_sub(old_idx, s);
                    }
                } else {
                    let tail = Wood::Branch(Branch::new(old_rest, old_value, old_sub));
                    fork.attach_sub(old_idx, Box::new(tail));
                }

                let new_idx = fork.find(new_letter).expect("just inserted");
                if new_rest.is_empty() {
                    fork.attach_val(new_idx, Box::new(value));
                } else {
                    let tail = Wood::Branch(Branch::new(new_rest, Some(Box::new(value)), None));
                    fork.attach_sub(new_idx, Box::new(tail));
                }

                let fork_wood = Wood::Node(fork);
                let replacement = if common == 0 {
                    fork_wood
                } else {
                    let prefix_kdata: Vec<u8> = b.kdata[..common].to_vec();
                    Wood::Branch(Branch::new(prefix_kdata, None, Some(Box::new(fork_wood))))
                };
                (None, Some(replacement))
            }
        }
        Wood::Node(n) => {
            if key.is_empty() {
                (None, None)
            } else {
                let byte = key[0];
                match n.find(byte) {
                    Err(_) => {
                        // NODE_NOITEM: no item for this byte yet.
                        let idx = n.insert_bare(byte);
                        if key.len() == 1 {
                            n.attach_val(idx, Box::new(value));
                        } else {
                            n.attach_sub(idx, Box::new(Wood::new_branch(&key[1..], Box::new(value))));
                        }
                        (None, None)
                    }
                    Ok(idx) => {
                        if key.len() == 1 {
                            let old = if n.item_at(idx).has_val() {
                                let existing = n.value_at_mut(idx).expect("has_val");
                                Some(std::mem::replace(existing, value))
                            } else {
                                n.attach_val(idx, Box::new(value));
                                None
                            };
                            (old, None)
                        } else if n.item_at(idx).has_sub() {
                            let sub = n.sub_at_mut(idx).expect("has_sub");
                            (insert_into(sub, &key[1..], value), None)
                        } else {
                            // NODE_NOSUB: the item exists but has no child yet.
                            n.attach_sub(idx, Box::new(Wood::new_branch(&key[1..], Box::new(value))));
                            (None, None)
                        }
                    }
                }
            }
        }
    };
    if let Some(w) = replacement {
        *wood = w;
    }
    old
}

struct RemoveResult<V> {
    removed: Option<V>,
    /// True iff `wood` now holds nothing at all and should be dropped by
    /// its parent (or, at the root, replaced with `None`).
    empty: bool,
}

impl<V> RemoveResult<V> {
    fn none() -> Self {
        Self {
            removed: None,
            empty: false,
        }
    }
}

/// Recursively remove `key` from `wood`. See [`RemoveResult`] for how a
/// now-empty subtree is signalled back up to the caller, which owns the
/// slot `wood` lives in and is the only one that can drop it.
fn remove_into<V>(wood: &mut Wood<V>, key: &[u8]) -> RemoveResult<V> {
    let (result, replacement) = match wood {
        Wood::Branch(b) => {
            let kd_len = b.kdata.len();
            if key.len() < kd_len || key[..kd_len] != b.kdata[..] {
                return RemoveResult::none();
            }
            let rest = &key[kd_len..];
            if rest.is_empty() {
                let removed = b.value.take();
                if removed.is_none() {
                    return RemoveResult::none();
                }
                let empty = collapse_branch(b);
                (
                    RemoveResult {
                        removed: removed.map(|v| *v),
                        empty,
                    },
                    None,
                )
            } else {
                let child_result = match b.sub.as_deref_mut() {
                    None => return RemoveResult::none(),
                    Some(sub) => remove_into(sub, rest),
                };
                if child_result.removed.is_none() {
                    return RemoveResult::none();
                }
                if child_result.empty {
                    b.sub = None;
                }
                let empty = collapse_branch(b);
                (
                    RemoveResult {
                        removed: child_result.removed,
                        empty,
                    },
                    None,
                )
            }
        }
        Wood::Node(n) => {
            if key.is_empty() {
                return RemoveResult::none();
            }
            let byte = key[0];
            let idx = match n.find(byte) {
                Err(_) => return RemoveResult::none(),
                Ok(idx) => idx,
            };
            let rest = &key[1..];
            let (removed, outcome) = if rest.is_empty() {
                if !n.item_at(idx).has_val() {
                    return RemoveResult::none();
                }
                let val = *n.take_val(idx);
                collapse_node_item(n, idx, Some(val))
            } else {
                if !n.item_at(idx).has_sub() {
                    return RemoveResult::none();
                }
                let child_result = {
                    let sub = n.sub_at_mut(idx).expect("has_sub");
                    remove_into(sub, rest)
                };
                if child_result.removed.is_none() {
                    return RemoveResult::none();
                }
                if child_result.empty {
                    n.take_sub(idx);
                }
                collapse_node_item(n, idx, child_result.removed)
            };
            match outcome {
                NodeOutcome::Keep => (RemoveResult { removed, empty: false }, None),
                NodeOutcome::Empty => (RemoveResult { removed, empty: true }, None),
                NodeOutcome::Shrink(nb) => (RemoveResult { removed, empty: false }, Some(nb)),
            }
        }
    };
    if let Some(nb) = replacement {
        *wood = Wood::Branch(nb);
    }
    result
}

/// A valueless branch whose sole child is itself a branch collapses into
/// one branch (edge compression); a valueless, childless branch has
/// nothing left at all.
fn collapse_branch<V>(b: &mut Branch<V>) -> bool {
    if b.value.is_some() {
        return false;
    }
    match b.sub.take() {
        None => true,
        Some(sub) => match *sub {
            Wood::Branch(cb) => {
                let mut merged = Vec::with_capacity(b.kdata.len() + cb.kdata.len());
                merged.extend_from_slice(&b.kdata);
                merged.extend_from_slice(&cb.kdata);
                b.kdata = merged.into_boxed_slice();
                b.value = cb.value;
                b.sub = cb.sub;
                false
            }
            other @ Wood::Node(_) => {
                b.sub = Some(Box::new(other));
                false
            }
        },
    }
}

enum NodeOutcome<V> {
    Keep,
    Empty,
    Shrink(Branch<V>),
}

/// After a value or sub is removed from the item at `idx`, check whether
/// that item is now entirely dead (neither value nor sub) and, if so,
/// remove it from the array and shrink the node if needed. Returns the
/// value being propagated up unchanged, plus the resulting node-level
/// outcome.
fn collapse_node_item<V>(
    n: &mut Node<V>,
    idx: usize,
    removed: Option<V>,
) -> (Option<V>, NodeOutcome<V>) {
    if n.item_at(idx).is_on() {
        return (removed, NodeOutcome::Keep);
    }
    n.remove_item(idx);
    match n.size() {
        0 => (removed, NodeOutcome::Empty),
        1 => {
            let it = *n.item_at(0);
            let value = it.has_val().then(|| n.take_val(0));
            let sub = it.has_sub().then(|| n.take_sub(0));
            let mut nb = Branch::new(vec![it.letter], value, sub);
            // the lone surviving item may itself have been a valueless
            // edge into another branch; fold that back into one branch
            // the same way a direct delete would.
            collapse_branch(&mut nb);
            (removed, NodeOutcome::Shrink(nb))
        }
        _ => (removed, NodeOutcome::Keep),
    }
}
