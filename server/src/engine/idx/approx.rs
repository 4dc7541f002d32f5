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

//! Approximate (Levenshtein-bounded) search over the trie (the `LEV`
//! command).
//!
//! The walk keeps a single Levenshtein DP row per trie depth and prunes
//! any subtree whose row minimum already exceeds the edit budget -- the
//! standard trie/automaton fuzzy-search trick, since the edit distance of
//! any completion of the current path can only be at least that minimum.
//!
//! Once a path has consumed exactly as many bytes as the query (the
//! query has been fully matched against, with some edit distance), an
//! optional "suffix mode" keeps descending for a bounded number of extra
//! bytes regardless of further edits, so a caller can ask for completions
//! of an approximately-matched key rather than only exact-length matches.
//! The key at the exact crossing depth is reported normally (not as a
//! suffix hit); only keys strictly longer than the query, reached by
//! continuing past that point, are suffix hits.

use super::Wood;

/// One match produced by [`search`]: the key and value it matched, the
/// Levenshtein distance from the query at the point the key's own
/// content ended, and whether it was reached only by extending past the
/// query in suffix mode.
pub struct ApproxHit<'a, V> {
    pub key: Vec<u8>,
    pub value: &'a V,
    pub distance: usize,
    pub suffix: bool,
}

fn next_row(prev: &[usize], query: &[u8], ch: u8) -> Vec<usize> {
    let mut row = vec![0usize; prev.len()];
    row[0] = prev[0] + 1;
    for i in 1..prev.len() {
        let sub_cost = if query[i - 1] == ch { 0 } else { 1 };
        row[i] = (prev[i] + 1).min(row[i - 1] + 1).min(prev[i - 1] + sub_cost);
    }
    row
}

struct Ctx<'q> {
    query: &'q [u8],
    max_edits: usize,
    suffix_extra: Option<usize>,
}

/// Search `root` for keys within `max_edits` of `query`. If `suffix_extra`
/// is `Some(n)`, once a path has consumed exactly `query.len()` bytes the
/// walk may keep going for up to `n` more bytes unconditionally (instead
/// of stopping or continuing to require edit-budget headroom), collecting
/// every terminal found past that point as a fuzzy-prefix completion of
/// the anchor.
pub fn search<'a, V>(
    root: &'a Wood<V>,
    query: &[u8],
    max_edits: usize,
    suffix_extra: Option<usize>,
) -> Vec<ApproxHit<'a, V>> {
    let ctx = Ctx {
        query,
        max_edits,
        suffix_extra,
    };
    let initial_row: Vec<usize> = (0..=query.len()).collect();
    let mut path = Vec::new();
    let mut out = Vec::new();
    walk(root, &ctx, &initial_row, None, &mut path, &mut out);
    out
}

fn row_min(row: &[usize]) -> usize {
    *row.iter().min().unwrap_or(&0)
}

/// Whether this row's distance to the *whole* query is within budget --
/// the gate a terminal must clear to be reported while still in the
/// normal (non-suffix) walk.
fn within_budget(ctx: &Ctx, row: &[usize]) -> bool {
    row[ctx.query.len()] <= ctx.max_edits
}

/// Suffix-mode state once the query has been fully consumed along a path:
/// the distance anchored at the crossing point, and how many more bytes
/// remain in the suffix budget.
#[derive(Clone, Copy)]
struct Suffix {
    remaining: usize,
    distance: usize,
}

/// If we are not yet in suffix mode, sitting exactly at depth
/// `query.len()`, and suffix mode is enabled, decide whether the *next*
/// byte may be pushed at all (an empty suffix budget forbids it) and
/// return the `Suffix` state to promote to if so.
fn try_enter_suffix(ctx: &Ctx, suf: Option<Suffix>, path_len: usize, row: &[usize]) -> Enter {
    if suf.is_some() || path_len != ctx.query.len() {
        return Enter::Unchanged;
    }
    match ctx.suffix_extra {
        None => Enter::Unchanged,
        Some(0) => Enter::Forbidden,
        Some(budget) => Enter::Promote(Suffix {
            remaining: budget,
            distance: row_min(row),
        }),
    }
}

enum Enter {
    Unchanged,
    Forbidden,
    Promote(Suffix),
}

/// `suf` is `None` while still computing Levenshtein rows; `Some` once the
/// path has consumed more than `query.len()` bytes and suffix mode has
/// taken over.
fn walk<'a, V>(
    wood: &'a Wood<V>,
    ctx: &Ctx,
    row_in: &[usize],
    suf_in: Option<Suffix>,
    path: &mut Vec<u8>,
    out: &mut Vec<ApproxHit<'a, V>>,
) {
    match wood {
        Wood::Branch(b) => {
            let mut row = row_in.to_vec();
            let mut suf = suf_in;
            let mut pushed = 0usize;
            for &byte in b.kdata.iter() {
                if matches!(suf, Some(Suffix { remaining: 0, .. })) {
                    break;
                }
                match try_enter_suffix(ctx, suf, path.len(), &row) {
                    Enter::Unchanged => {}
                    Enter::Forbidden => break,
                    Enter::Promote(s) => suf = Some(s),
                }
                path.push(byte);
                pushed += 1;
                match suf {
                    None => {
                        row = next_row(&row, ctx.query, byte);
                        if row_min(&row) > ctx.max_edits {
                            path.truncate(path.len() - pushed);
                            return;
                        }
                    }
                    Some(ref mut s) => {
                        s.remaining -= 1;
                    }
                }
            }
            if pushed == b.kdata.len() {
                if let Some(v) = b.value() {
                    match suf {
                        Some(s) => out.push(ApproxHit {
                            key: path.clone(),
                            value: v,
                            distance: s.distance,
                            suffix: true,
                        }),
                        None if within_budget(ctx, &row) => out.push(ApproxHit {
                            key: path.clone(),
                            value: v,
                            distance: row[ctx.query.len()],
                            suffix: false,
                        }),
                        None => {}
                    }
                }
                if !matches!(suf, Some(Suffix { remaining: 0, .. })) {
                    if let Some(sub) = b.sub() {
                        walk(sub, ctx, &row, suf, path, out);
                    }
                }
            }
            path.truncate(path.len() - pushed);
        }
        Wood::Node(n) => {
            for (idx, item) in n.items().iter().enumerate() {
                if matches!(suf_in, Some(Suffix { remaining: 0, .. })) {
                    break;
                }
                let byte = item.letter;
                let mut suf = suf_in;
                let entry = try_enter_suffix(ctx, suf, path.len(), row_in);
                if matches!(entry, Enter::Forbidden) {
                    continue;
                }
                if let Enter::Promote(s) = entry {
                    suf = Some(s);
                }
                let row = match suf {
                    None => {
                        let row = next_row(row_in, ctx.query, byte);
                        if row_min(&row) > ctx.max_edits {
                            continue;
                        }
                        row
                    }
                    Some(ref mut s) => {
                        s.remaining -= 1;
                        row_in.to_vec()
                    }
                };
                path.push(byte);
                if let Some(v) = n.value_at(idx) {
                    match suf {
                        Some(s) => out.push(ApproxHit {
                            key: path.clone(),
                            value: v,
                            distance: s.distance,
                            suffix: true,
                        }),
                        None if within_budget(ctx, &row) => out.push(ApproxHit {
                            key: path.clone(),
                            value: v,
                            distance: row[ctx.query.len()],
                            suffix: false,
                        }),
                        None => {}
                    }
                }
                if !matches!(suf, Some(Suffix { remaining: 0, .. })) {
                    if let Some(sub) = n.sub_at(idx) {
                        walk(sub, ctx, &row, suf, path, out);
                    }
                }
                path.pop();
            }
        }
    }
}
