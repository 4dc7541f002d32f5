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

use super::look::LookStatus;
use super::trie::Trie;
use super::{nat_threshold, select_strategy, NodeItem, Strategy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn item(letter: u8) -> NodeItem {
    NodeItem::bare(letter)
}

#[test]
fn strategy_dense_run_is_ndx() {
    let items = vec![item(b'a'), item(b'b'), item(b'c')];
    assert_eq!(select_strategy(&items), Strategy::Ndx);
}

#[test]
fn strategy_small_sparse_is_lin() {
    let items = vec![item(1), item(50), item(100)];
    assert_eq!(select_strategy(&items), Strategy::Lin);
}

#[test]
fn strategy_midsize_sparse_is_bin() {
    let items: Vec<_> = (0..15).map(|i| item((i * 17) as u8)).collect();
    assert_eq!(select_strategy(&items), Strategy::Bin);
}

#[test]
fn nat_threshold_is_monotonically_decreasing() {
    let mut prev = f64::INFINITY;
    for size in [5, 10, 50, 100, 170, 250, 315, 400] {
        let t = nat_threshold(size);
        assert!(t <= prev, "threshold should not increase with size");
        prev = t;
    }
}

#[test]
fn insert_then_get_exact_match() {
    let mut t = Trie::new();
    assert_eq!(t.insert(b"cat", 1), None);
    assert_eq!(t.get(b"cat"), Some(&1));
    assert_eq!(t.get(b"ca"), None);
    assert_eq!(t.get(b"catalog"), None);
}

#[test]
fn insert_replaces_existing_value() {
    let mut t = Trie::new();
    t.insert(b"key", 1);
    assert_eq!(t.insert(b"key", 2), Some(1));
    assert_eq!(t.get(b"key"), Some(&2));
    assert_eq!(t.len(), 1);
}

#[test]
fn branch_into_split_on_shorter_key() {
    // "catalog" first, then "cat" ends inside the branch's kdata.
    let mut t = Trie::new();
    t.insert(b"catalog", 1);
    t.insert(b"cat", 2);
    assert_eq!(t.get(b"catalog"), Some(&1));
    assert_eq!(t.get(b"cat"), Some(&2));
    assert_eq!(t.len(), 2);
}

#[test]
fn branch_diff_forks_on_common_prefix() {
    let mut t = Trie::new();
    t.insert(b"dog", 1);
    t.insert(b"dot", 2);
    assert_eq!(t.get(b"dog"), Some(&1));
    assert_eq!(t.get(b"dot"), Some(&2));
    assert_eq!(t.get(b"do"), None);
    assert_eq!(t.get(b"d"), None);
}

#[test]
fn branch_over_attaches_tail_as_sub() {
    let mut t = Trie::new();
    t.insert(b"cat", 1);
    t.insert(b"catalog", 2);
    assert_eq!(t.get(b"cat"), Some(&1));
    assert_eq!(t.get(b"catalog"), Some(&2));
}

#[test]
fn node_fan_out_on_shared_prefix_of_one_byte() {
    let mut t = Trie::new();
    for (k, v) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        t.insert(k.as_bytes(), v);
    }
    for (k, v) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        assert_eq!(t.get(k.as_bytes()), Some(&v));
    }
}

#[test]
fn delete_merges_valueless_branch_with_branch_child() {
    let mut t = Trie::new();
    t.insert(b"cat", 1);
    t.insert(b"catalog", 2);
    assert_eq!(t.remove(b"cat"), Some(1));
    assert_eq!(t.get(b"cat"), None);
    assert_eq!(t.get(b"catalog"), Some(&2));
}

#[test]
fn delete_shrinks_node_to_branch() {
    let mut t = Trie::new();
    t.insert(b"a", 1);
    t.insert(b"b", 2);
    assert_eq!(t.remove(b"a"), Some(1));
    assert_eq!(t.get(b"a"), None);
    assert_eq!(t.get(b"b"), Some(&2));
    assert_eq!(t.len(), 1);
}

#[test]
fn delete_last_key_empties_trie() {
    let mut t = Trie::new();
    t.insert(b"solo", 42);
    assert_eq!(t.remove(b"solo"), Some(42));
    assert!(t.is_empty());
    assert_eq!(t.get(b"solo"), None);
}

#[test]
fn delete_missing_key_is_noop() {
    let mut t = Trie::new();
    t.insert(b"present", 1);
    assert_eq!(t.remove(b"absent"), None);
    assert_eq!(t.len(), 1);
}

#[test]
fn look_status_distinguishes_noval_from_found() {
    let mut t: Trie<i32> = Trie::new();
    t.insert(b"catalog", 1);
    // "cat" is a prefix with no attached value: branch_into territory.
    let look = t.look(b"cat");
    assert_eq!(look.status(), LookStatus::BranchInto);
    let look = t.look(b"catalog");
    assert_eq!(look.status(), LookStatus::Found);
}

/// Spec §8 scenario 1: inserting `marsupia`, `marsupiata`,
/// `marsupialise`, `mars`, `man` (in that order) leaves `mars` FOUND,
/// `marsu` NOVAL, and an in-order walk yielding exactly the five keys in
/// lexicographic order.
#[test]
fn scenario_marsupia_family_ordering_and_status() {
    let mut t = Trie::new();
    for k in ["marsupia", "marsupiata", "marsupialise", "mars", "man"] {
        t.insert(k.as_bytes(), k.to_string());
    }
    assert_eq!(t.look(b"mars").status(), LookStatus::Found);
    assert_eq!(t.look(b"marsu").status(), LookStatus::NoVal);

    let keys: Vec<String> = t
        .iter()
        .into_iter()
        .map(|(k, _)| String::from_utf8(k).unwrap())
        .collect();
    assert_eq!(
        keys,
        vec!["man", "mars", "marsupia", "marsupialise", "marsupiata"]
    );
}

/// Spec §8: "enumerating all keys via cursor in-order yields
/// lexicographically sorted byte strings", exercised over a larger
/// random keyset built through the public `Cursor` API (`iter` walks
/// `letter`/`value`/`forward`/`seek_next`, not a private recursion).
#[test]
fn cursor_in_order_walk_is_lexicographically_sorted() {
    let mut rng = StdRng::seed_from_u64(0xBADA55);
    let mut keys: Vec<String> = (0..200)
        .map(|_| {
            let len = rng.gen_range(1..10);
            (0..len)
                .map(|_| (b'a' + rng.gen_range(0..26u8)) as char)
                .collect()
        })
        .collect();
    keys.sort();
    keys.dedup();

    let mut t = Trie::new();
    for k in &keys {
        t.insert(k.as_bytes(), k.clone());
    }
    let walked: Vec<String> = t
        .iter()
        .into_iter()
        .map(|(k, _)| String::from_utf8(k).unwrap())
        .collect();
    assert_eq!(walked, keys);
}

#[test]
fn drain_clears_everything() {
    let mut t = Trie::new();
    for i in 0..20u32 {
        t.insert(format!("key{i}").as_bytes(), i);
    }
    t.drain();
    assert!(t.is_empty());
    assert_eq!(t.get(b"key0"), None);
}

#[test]
fn randomized_insert_lookup_delete_round_trip() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut keys: Vec<String> = (0..500)
        .map(|_| {
            let len = rng.gen_range(1..12);
            (0..len)
                .map(|_| (b'a' + rng.gen_range(0..26u8)) as char)
                .collect()
        })
        .collect();
    keys.sort();
    keys.dedup();

    let mut t = Trie::new();
    let mut model = std::collections::HashMap::new();
    for (i, k) in keys.iter().enumerate() {
        t.insert(k.as_bytes(), i as u32);
        model.insert(k.clone(), i as u32);
    }
    for (k, v) in &model {
        assert_eq!(t.get(k.as_bytes()), Some(v));
    }

    let mut shuffled = keys.clone();
    shuffled.shuffle(&mut rng);
    for k in shuffled.iter().take(keys.len() / 2) {
        let expected = model.remove(k);
        assert_eq!(t.remove(k.as_bytes()), expected);
    }
    for k in &keys {
        assert_eq!(t.get(k.as_bytes()), model.get(k));
    }
    assert_eq!(t.len(), model.len());
}

#[test]
fn approx_search_finds_within_edit_budget() {
    let mut t = Trie::new();
    for w in ["kitten", "sitten", "sitting", "mitten", "unrelated"] {
        t.insert(w.as_bytes(), w);
    }
    let hits = t.search_approx(b"kitten", 2, None);
    let words: Vec<&&str> = hits.iter().map(|h| h.value).collect();
    assert!(words.contains(&&"kitten"));
    assert!(words.contains(&&"sitten"));
    assert!(words.contains(&&"sitting"));
    assert!(!words.contains(&&"unrelated"));
}

/// Spec §8 scenario 5, per §4.1's actual rule ("enumerate every trie key
/// `K` with `lev(K, W) <= L`"): `kitten` against {sitting, kitten,
/// kitchen, mitten, sun} with `maxlev=2`, `maxsuflen=0` also matches
/// `kitchen` (`lev("kitten", "kitchen") == 2`: substitute `t`->`c`,
/// insert `h`), not just `kitten` (d=0) and `mitten` (d=1) as scenario
/// 5's prose lists -- the prose under-counts relative to its own
/// distance rule, and the DP-row pruning in `approx.rs` has no special
/// case that would exclude it.
#[test]
fn approx_search_scenario_kitten() {
    let mut t = Trie::new();
    for w in ["sitting", "kitten", "kitchen", "mitten", "sun"] {
        t.insert(w.as_bytes(), w);
    }
    let hits = t.search_approx(b"kitten", 2, None);
    let mut found: Vec<(&str, usize, bool)> =
        hits.iter().map(|h| (*h.value, h.distance, h.suffix)).collect();
    found.sort();
    assert_eq!(
        found,
        vec![("kitchen", 2, false), ("kitten", 0, false), ("mitten", 1, false)]
    );
}

/// Spec §8 scenario 6: `mars` against {mars, marsupia, marsupiata, man}
/// with `maxlev=0`, `maxsuflen=4` finds `mars` (d=0, suffix=false) and
/// `marsupia` (d=0, suffix=true); `marsupiata` is excluded since its
/// suffix length (6) exceeds 4.
#[test]
fn approx_search_scenario_mars_suffix() {
    let mut t = Trie::new();
    for w in ["mars", "marsupia", "marsupiata", "man"] {
        t.insert(w.as_bytes(), w);
    }
    let hits = t.search_approx(b"mars", 0, Some(4));
    let mut found: Vec<(&str, usize, bool)> =
        hits.iter().map(|h| (*h.value, h.distance, h.suffix)).collect();
    found.sort();
    assert_eq!(
        found,
        vec![("mars", 0, false), ("marsupia", 0, true)]
    );
}

#[test]
fn approx_search_suffix_mode_extends_past_anchor() {
    let mut t = Trie::new();
    for w in ["cat", "catalog", "cataract"] {
        t.insert(w.as_bytes(), w);
    }
    let hits = t.search_approx(b"cat", 0, Some(10));
    let words: Vec<&&str> = hits.iter().map(|h| h.value).collect();
    assert!(words.contains(&&"cat"));
    assert!(words.contains(&&"catalog"));
    assert!(words.contains(&&"cataract"));
}

#[test]
fn approx_search_without_suffix_mode_is_bounded_by_edits() {
    let mut t = Trie::new();
    for w in ["cat", "catalog"] {
        t.insert(w.as_bytes(), w);
    }
    let hits = t.search_approx(b"cat", 0, None);
    let words: Vec<&&str> = hits.iter().map(|h| h.value).collect();
    assert!(words.contains(&&"cat"));
    assert!(!words.contains(&&"catalog"));
}
