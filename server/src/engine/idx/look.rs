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

//! Read-only lookup state (`Look`) and the external navigation handle
//! (`Cursor`).
//!
//! `insert`/`delete` do their own descent (see `trie.rs`) because Rust's
//! ownership rules make a recursive walk over `&mut Option<Box<Wood<V>>>`
//! the natural way to reach a parent/grandparent for the post-delete
//! merge-up -- the call stack *is* the path history, so there is no need
//! to replay a manually maintained crumb ring during a mutation. `Look`
//! instead backs the read-only query path (`Trie::look`, used by `GET`
//! and by `Cursor`), where it plays the role the spec describes: a cursor
//! over the trie that remembers a few trailing ancestors.

use super::{Branch, Node, Wood};

/// The outcome of descending a [`Look`] to the end of the query key (or
/// to the point where the trie and the key disagree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookStatus {
    /// No lookup has been attempted yet.
    Init,
    /// The trie and the walked path are out of sync (reserved for future
    /// incremental re-use of a `Look`; never produced by `Trie::look`).
    Unsync,
    /// The trie has no root.
    Empty,
    /// The query key matches exactly and the matched wood carries a value.
    Found,
    /// The query key matches exactly but the matched wood carries no value.
    NoVal,
    /// The branch was exhausted but the query still has trailing bytes,
    /// and the branch has no child to descend into.
    BranchOver,
    /// The query was exhausted partway through a branch's `kdata`.
    BranchInto,
    /// The query and the branch disagree at some byte inside `kdata`.
    BranchDiff,
    /// A node was reached but has no item for the query's current byte.
    NodeNoItem,
    /// A node item matched the query's current byte but has no child to
    /// continue the descent and the query is not yet exhausted.
    NodeNoSub,
}

/// One step of ancestry recorded while walking a [`Look`].
pub enum Crumb<'a, V> {
    Branch(&'a Branch<V>),
    NodeItem { node: &'a Node<V>, idx: usize },
}

/// The most recent ancestors of a lookup, oldest evicted first. Three
/// slots are enough to reach the grandparent needed by a delete-driven
/// shrink+merge (see the spec's design notes); in the read path this is
/// purely informational (no mutation happens through a `Look`).
#[derive(Default)]
pub struct CrumbRing<'a, V> {
    buf: [Option<Crumb<'a, V>>; 3],
}

impl<'a, V> CrumbRing<'a, V> {
    fn push(&mut self, c: Crumb<'a, V>) {
        self.buf.swap(0, 1);
        self.buf.swap(1, 2);
        self.buf[2] = Some(c);
    }
    /// The grandparent crumb, if the walk is at least two steps deep.
    pub fn grandparent(&self) -> Option<&Crumb<'a, V>> {
        self.buf[0].as_ref()
    }
    pub fn parent(&self) -> Option<&Crumb<'a, V>> {
        self.buf[1].as_ref()
    }
    pub fn immediate(&self) -> Option<&Crumb<'a, V>> {
        self.buf[2].as_ref()
    }
    pub fn depth(&self) -> usize {
        self.buf.iter().filter(|c| c.is_some()).count()
    }
}

/// The position a [`Look`] landed on when it stopped.
pub enum LookAt<'a, V> {
    Branch {
        branch: &'a Branch<V>,
        /// Offset into `branch.kdata()` where matching stopped (used by
        /// insert to decide cut/fork position; always `kdata.len()` on
        /// `Found`/`NoVal`/`BranchOver`).
        atindex: usize,
    },
    Node {
        node: &'a Node<V>,
        idx: usize,
    },
}

/// A read-only lookup cursor, produced by walking a trie against a query
/// key. Carries the terminal [`LookStatus`], the current key position and
/// a bounded ancestor history.
pub struct Look<'a, V> {
    key: &'a [u8],
    kpos: usize,
    status: LookStatus,
    at: Option<LookAt<'a, V>>,
    crumbs: CrumbRing<'a, V>,
}

impl<'a, V> Look<'a, V> {
    pub(super) fn empty(key: &'a [u8]) -> Self {
        Self {
            key,
            kpos: 0,
            status: LookStatus::Empty,
            at: None,
            crumbs: CrumbRing::default(),
        }
    }

    /// Walk `root` against `key`, starting at the trie's root wood.
    pub(super) fn walk(root: &'a Wood<V>, key: &'a [u8]) -> Self {
        let mut crumbs = CrumbRing::default();
        let mut wood = root;
        let mut kpos = 0usize;
        loop {
            match wood {
                Wood::Branch(b) => {
                    let kd = b.kdata();
                    let remaining = &key[kpos..];
                    let common = remaining
                        .iter()
                        .zip(kd.iter())
                        .take_while(|(a, b)| a == b)
                        .count();
                    if common < kd.len() {
                        // mismatch inside kdata, or query ran out mid-branch
                        if common == remaining.len() {
                            // query exhausted before the branch did
                            kpos += common;
                            return Self {
                                key,
                                kpos,
                                status: LookStatus::BranchInto,
                                at: Some(LookAt::Branch {
                                    branch: b,
                                    atindex: common,
                                }),
                                crumbs,
                            };
                        }
                        kpos += common;
                        return Self {
                            key,
                            kpos,
                            status: LookStatus::BranchDiff,
                            at: Some(LookAt::Branch {
                                branch: b,
                                atindex: common,
                            }),
                            crumbs,
                        };
                    }
                    // full branch match
                    kpos += kd.len();
                    if kpos == key.len() {
                        let status = if b.value().is_some() {
                            LookStatus::Found
                        } else {
                            LookStatus::NoVal
                        };
                        return Self {
                            key,
                            kpos,
                            status,
                            at: Some(LookAt::Branch {
                                branch: b,
                                atindex: kd.len(),
                            }),
                            crumbs,
                        };
                    }
                    match b.sub() {
                        Some(sub) => {
                            crumbs.push(Crumb::Branch(b));
                            wood = sub;
                        }
                        None => {
                            return Self {
                                key,
                                kpos,
                                status: LookStatus::BranchOver,
                                at: Some(LookAt::Branch {
                                    branch: b,
                                    atindex: kd.len(),
                                }),
                                crumbs,
                            };
                        }
                    }
                }
                Wood::Node(n) => {
                    if kpos == key.len() {
                        // a node is never itself terminal; this only
                        // happens if the caller passed an empty key at a
                        // node, which cannot occur from the root (a root
                        // node always has a non-empty incoming key by
                        // construction), but guard defensively.
                        return Self {
                            key,
                            kpos,
                            status: LookStatus::NodeNoItem,
                            at: Some(LookAt::Node { node: n, idx: 0 }),
                            crumbs,
                        };
                    }
                    let byte = key[kpos];
                    match n.find(byte) {
                        Err(_) => {
                            return Self {
                                key,
                                kpos,
                                status: LookStatus::NodeNoItem,
                                at: Some(LookAt::Node { node: n, idx: 0 }),
                                crumbs,
                            };
                        }
                        Ok(idx) => {
                            kpos += 1;
                            if kpos == key.len() {
                                let status = if n.value_at(idx).is_some() {
                                    LookStatus::Found
                                } else {
                                    LookStatus::NoVal
                                };
                                return Self {
                                    key,
                                    kpos,
                                    status,
                                    at: Some(LookAt::Node { node: n, idx }),
                                    crumbs,
                                };
                            }
                            match n.sub_at(idx) {
                                Some(sub) => {
                                    crumbs.push(Crumb::NodeItem { node: n, idx });
                                    wood = sub;
                                }
                                None => {
                                    return Self {
                                        key,
                                        kpos,
                                        status: LookStatus::NodeNoSub,
                                        at: Some(LookAt::Node { node: n, idx }),
                                        crumbs,
                                    };
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    pub fn status(&self) -> LookStatus {
        self.status
    }
    pub fn kpos(&self) -> usize {
        self.kpos
    }
    pub fn key(&self) -> &'a [u8] {
        self.key
    }
    pub fn crumbs(&self) -> &CrumbRing<'a, V> {
        &self.crumbs
    }
    pub fn at(&self) -> Option<&LookAt<'a, V>> {
        self.at.as_ref()
    }
    /// The value at the terminal position, if `status()` is `Found`.
    pub fn value(&self) -> Option<&'a V> {
        match (&self.status, &self.at) {
            (LookStatus::Found, Some(LookAt::Branch { branch, .. })) => branch.value(),
            (LookStatus::Found, Some(LookAt::Node { node, idx })) => node.value_at(*idx),
            _ => None,
        }
    }
}

/// A point-to-position external navigation handle over the trie,
/// distinct from [`Look`]: a `Cursor` is a plain `(wood, index)` pair
/// with no path history, meant for callers walking the trie
/// breadth/depth-first (e.g. the in-order enumeration in
/// [`super::trie::Trie::iter`]).
///
/// `Branch`'s `atindex` is the offset of the byte this cursor currently
/// sits on within `kdata` -- a multi-byte branch is walked one logical
/// position at a time externally (spec §4.2: "along a Branch advance
/// atindex"), even though internally the whole run is one compressed
/// edge.
pub enum Cursor<'a, V> {
    Branch { branch: &'a Branch<V>, atindex: usize },
    NodeItem { node: &'a Node<V>, idx: usize },
}

impl<'a, V> Cursor<'a, V> {
    pub fn root(wood: &'a Wood<V>) -> Self {
        match wood {
            Wood::Branch(b) => Cursor::Branch { branch: b, atindex: 0 },
            Wood::Node(n) => Cursor::NodeItem { node: n, idx: 0 },
        }
    }
    /// The byte at the current position (the branch byte at `atindex`,
    /// or the node item's letter).
    pub fn letter(&self) -> u8 {
        match self {
            Cursor::Branch { branch, atindex } => branch.kdata()[*atindex],
            Cursor::NodeItem { node, idx } => node.item_at(*idx).letter,
        }
    }
    /// True iff the current position is terminal; returns the value.
    /// A branch only carries a value at its last byte; every earlier
    /// position within `kdata` is mid-edge and never terminal.
    pub fn value(&self) -> Option<&'a V> {
        match self {
            Cursor::Branch { branch, atindex } => {
                (*atindex == branch.kdata().len() - 1).then(|| branch.value()).flatten()
            }
            Cursor::NodeItem { node, idx } => node.value_at(*idx),
        }
    }
    /// Letters choosable from the current wood: 1 for a branch (the byte
    /// at `atindex`), `size` for a node.
    pub fn choices(&self, out: &mut Vec<u8>) -> usize {
        out.clear();
        match self {
            Cursor::Branch { branch, atindex } => {
                out.push(branch.kdata()[*atindex]);
            }
            Cursor::NodeItem { node, .. } => {
                out.extend(node.items().iter().map(|it| it.letter));
            }
        }
        out.len()
    }
    /// Move to a specific letter at the current wood.
    pub fn seek(&self, letter: u8) -> Option<Self> {
        match self {
            Cursor::Branch { branch, atindex } => (branch.kdata()[*atindex] == letter)
                .then(|| Cursor::Branch { branch, atindex: *atindex }),
            Cursor::NodeItem { node, .. } => node
                .find(letter)
                .ok()
                .map(|idx| Cursor::NodeItem { node, idx }),
        }
    }
    /// Advance to the next sibling item in a node; fails (returns `None`)
    /// on a branch, which has no siblings.
    pub fn seek_next(&self) -> Option<Self> {
        match self {
            Cursor::Branch { .. } => None,
            Cursor::NodeItem { node, idx } => {
                let next = idx + 1;
                (next < node.size()).then(|| Cursor::NodeItem { node, idx: next })
            }
        }
    }
    /// Positional variant of [`Cursor::seek`].
    pub fn seek_at(&self, index: usize) -> Option<Self> {
        match self {
            Cursor::Branch { .. } => (index == 0).then(|| self.clone_ref()),
            Cursor::NodeItem { node, .. } => {
                (index < node.size()).then(|| Cursor::NodeItem { node, idx: index })
            }
        }
    }
    fn clone_ref(&self) -> Self {
        match self {
            Cursor::Branch { branch, atindex } => Cursor::Branch { branch, atindex: *atindex },
            Cursor::NodeItem { node, idx } => Cursor::NodeItem { node, idx: *idx },
        }
    }
    /// Descend one position: along a branch this advances `atindex` by
    /// one; at a branch's last byte, or at a node item, this descends
    /// into the child subtree instead.
    pub fn forward(&self) -> Option<Self> {
        match self {
            Cursor::Branch { branch, atindex } => {
                if *atindex + 1 < branch.kdata().len() {
                    Some(Cursor::Branch { branch, atindex: atindex + 1 })
                } else {
                    branch.sub().map(Cursor::root)
                }
            }
            Cursor::NodeItem { node, idx } => node.sub_at(*idx).map(Cursor::root),
        }
    }
}
