//! Hierarchical composition integration tests

mod common;

use common::fixtures::{load_fixture, load_groups_fixture};
use common::{explicit, path, sample_entries, sample_tree};
use impress_groups::{
    parse_tree, Entry, EntryMatcher, GroupTree, HierarchyContext, IndexPath, MatcherKind,
};
use proptest::prelude::*;
use rstest::rstest;

fn keys_matching(tree: &GroupTree, at: &[usize], entries: &[Entry]) -> Vec<String> {
    tree.matching_entries(&path(at), entries)
        .unwrap()
        .into_iter()
        .filter_map(|entry| entry.primary_key().map(str::to_string))
        .collect()
}

// === Scenario C: refining against the all-entries root ===

#[rstest]
#[case("x", true)]
#[case("y", true)]
#[case("w", false)]
fn test_refining_below_root_is_noop(#[case] key: &str, #[case] expected: bool) {
    let mut tree = GroupTree::new();
    tree.add_child(
        &IndexPath::root(),
        explicit("A", HierarchyContext::Independent, &["x"]),
    )
    .unwrap();
    tree.add_child(
        &IndexPath::root(),
        explicit("B", HierarchyContext::Refining, &["x", "y"]),
    )
    .unwrap();

    let entry = Entry::new(key);
    assert_eq!(tree.effective_contains(&path(&[1]), &entry).unwrap(), expected);
    assert_eq!(
        tree.effective_contains(&path(&[1]), &entry).unwrap(),
        tree.contains(&path(&[1]), &entry).unwrap()
    );
}

// === Sample tree ===

#[rstest]
#[case(&[0], &["x"])]
#[case(&[0, 0], &["x"])]
#[case(&[0, 1], &["z"])]
#[case(&[1], &["x", "y"])]
#[case(&[1, 0], &["x"])]
#[case(&[], &["x", "y", "z"])]
fn test_effective_membership(#[case] at: &[usize], #[case] expected: &[&str]) {
    let tree = sample_tree();
    assert_eq!(keys_matching(&tree, at, &sample_entries()), expected);
}

#[test]
fn test_groups_containing() {
    let tree = sample_tree();
    let entries = sample_entries();
    assert_eq!(
        tree.groups_containing(&entries[0]),
        vec![
            IndexPath::root(),
            path(&[0]),
            path(&[0, 0]),
            path(&[1]),
            path(&[1, 0]),
        ]
    );
    assert_eq!(
        tree.groups_containing(&entries[1]),
        vec![IndexPath::root(), path(&[1])]
    );
    assert_eq!(
        tree.groups_containing(&entries[2]),
        vec![IndexPath::root(), path(&[0, 1])]
    );
}

#[rstest]
#[case(&[&[0, 0][..], &[1]], MatcherKind::And, false, &["x"])]
#[case(&[&[0, 0][..], &[1]], MatcherKind::Or, false, &["x", "y"])]
#[case(&[&[0, 0][..], &[1]], MatcherKind::And, true, &["y", "z"])]
#[case(&[&[0, 1][..], &[1]], MatcherKind::Or, true, &[])]
#[case(&[], MatcherKind::And, false, &[])]
#[case(&[], MatcherKind::Or, true, &["x", "y", "z"])]
fn test_selection_matcher(
    #[case] selected: &[&[usize]],
    #[case] kind: MatcherKind,
    #[case] invert: bool,
    #[case] expected: &[&str],
) {
    let tree = sample_tree();
    let selected: Vec<IndexPath> = selected.iter().map(|at| path(at)).collect();
    let matcher = tree.selection_matcher(&selected, kind, invert).unwrap();
    let matched: Vec<String> = sample_entries()
        .iter()
        .filter(|entry| matcher.is_match(entry))
        .filter_map(|entry| entry.primary_key().map(str::to_string))
        .collect();
    assert_eq!(matched, expected);
}

#[test]
fn test_selection_with_stale_path() {
    let tree = sample_tree();
    assert!(tree
        .selection_matcher(&[path(&[5])], MatcherKind::Or, false)
        .is_err());
}

#[test]
fn test_fixture_library_counts() {
    let tree = parse_tree(&load_groups_fixture("library.groups")).unwrap();
    let entries: Vec<Entry> =
        serde_json::from_str(&load_fixture("groups/entries.json")).unwrap();

    // Reviewed holds Smith2020 and Lee2021; the refining child keeps only Smith2020.
    assert_eq!(keys_matching(&tree, &[0], &entries), vec!["Smith2020", "Lee2021"]);
    assert_eq!(keys_matching(&tree, &[0, 0], &entries), vec!["Smith2020"]);
    // Neural includes its "Deep" search child.
    assert_eq!(keys_matching(&tree, &[1], &entries), vec!["Smith2020", "Jones2019"]);
    assert_eq!(keys_matching(&tree, &[2], &entries), vec!["Smith2020"]);
}

// === Laws ===

fn arb_keys() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]", 0..5)
}

proptest! {
    #[test]
    fn test_refining_is_intersection(
        parent_keys in arb_keys(),
        child_keys in arb_keys(),
        key in "[a-e]",
    ) {
        let mut tree = GroupTree::new();
        let parent = tree
            .add_child(&IndexPath::root(), explicit_owned("P", HierarchyContext::Independent, &parent_keys))
            .unwrap();
        let child = tree
            .add_child(&parent, explicit_owned("C", HierarchyContext::Refining, &child_keys))
            .unwrap();

        let entry = Entry::new(key);
        let expected = tree.contains(&child, &entry).unwrap() && tree.contains(&parent, &entry).unwrap();
        prop_assert_eq!(tree.effective_contains(&child, &entry).unwrap(), expected);
    }

    #[test]
    fn test_including_is_union(
        parent_keys in arb_keys(),
        child_keys in arb_keys(),
        grandchild_keys in arb_keys(),
        key in "[a-e]",
    ) {
        let mut tree = GroupTree::new();
        let parent = tree
            .add_child(&IndexPath::root(), explicit_owned("P", HierarchyContext::Including, &parent_keys))
            .unwrap();
        let child = tree
            .add_child(&parent, explicit_owned("C", HierarchyContext::Including, &child_keys))
            .unwrap();
        tree.add_child(&child, explicit_owned("G", HierarchyContext::Independent, &grandchild_keys))
            .unwrap();

        let entry = Entry::new(key);
        let expected = tree.contains(&parent, &entry).unwrap()
            || tree.effective_contains(&child, &entry).unwrap();
        prop_assert_eq!(tree.effective_contains(&parent, &entry).unwrap(), expected);
    }
}

fn explicit_owned(name: &str, context: HierarchyContext, keys: &[String]) -> impress_groups::Group {
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    explicit(name, context, &keys)
}
