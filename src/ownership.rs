//! Provides the `OwnershipMap`, which remembers which archive first provided
//! each class file, and the `Violation`s it reports.
use anyhow::Result;
use fxhash::FxBuildHasher;
use indexmap::{IndexMap, IndexSet};
use std::fmt;

use crate::allowlist::Allowlist;
use crate::archive::ArchiveListing;

/// A class file provided by more than one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The entry name, e.g. `com/example/Foo.class`
    pub name: String,
    /// Label of the first archive that provided `name`
    pub owner: String,
    /// Label of the archive that provided `name` again
    pub duplicate: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found duplicate file: '{}', originally provided by '{}', also provided by '{}'.",
            self.name, self.owner, self.duplicate
        )
    }
}

/// An `OwnershipMap` maps each class file name to the label of the archive
/// that owns it.
/// * Labels are interned: the map's values are indexes into `labels`, so we
///   don't clone a label for every class in a large jar.
/// * A name that isn't allowlisted keeps its first owner forever; later
///   providers are reported as violations.
/// * An allowlisted name is never a violation, and its owner is whichever
///   archive provided it most recently.
pub struct OwnershipMap<'a> {
    allowlist: &'a Allowlist,
    owners: IndexMap<String, usize, FxBuildHasher>,
    labels: IndexSet<String, FxBuildHasher>,
}

impl<'a> OwnershipMap<'a> {
    /// An empty map that exempts the names in `allowlist`
    #[must_use]
    pub fn new(allowlist: &'a Allowlist) -> Self {
        OwnershipMap { allowlist, owners: IndexMap::default(), labels: IndexSet::default() }
    }

    /// Record that the archive labeled `label` provides `name`. Returns the
    /// `Violation` if `name` already has an owner and isn't allowlisted.
    pub fn record(&mut self, name: &str, label: &str) -> Option<Violation> {
        if let Some(&owner) = self.owners.get(name) {
            if !self.allowlist.contains(name) {
                return Some(Violation {
                    name: name.to_owned(),
                    owner: self.label(owner).to_owned(),
                    duplicate: label.to_owned(),
                });
            }
        }
        let (id, _) = self.labels.insert_full(label.to_owned());
        self.owners.insert(name.to_owned(), id);
        None
    }

    /// The label of the archive that currently owns `name`
    #[must_use]
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.owners.get(name).map(|&id| self.label(id))
    }

    /// The number of distinct class files seen
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// True if no class file has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    // Every id in `owners` came from `labels.insert_full`
    fn label(&self, id: usize) -> &str {
        &self.labels[id]
    }
}

/// Runs every listing in `listings` through an `OwnershipMap` and returns the
/// violations in the order they were found: archives in the order given,
/// entries in each archive's listing order. Violations never stop the scan,
/// but an error in producing a listing does.
pub fn find_duplicates(
    allowlist: &Allowlist,
    listings: impl IntoIterator<Item = Result<ArchiveListing>>,
) -> Result<Vec<Violation>> {
    let mut map = OwnershipMap::new(allowlist);
    let mut violations = Vec::new();
    let mut archives = 0_usize;
    for listing in listings {
        let ArchiveListing { label, class_entries } = listing?;
        archives += 1;
        for name in &class_entries {
            if let Some(violation) = map.record(name, &label) {
                violations.push(violation);
            }
        }
    }
    tracing::info!(
        archives,
        classes = map.len(),
        violations = violations.len(),
        "finished scanning"
    );
    Ok(violations)
}

#[allow(clippy::pedantic)]
#[cfg(test)]
mod test {
    use super::*;
    use anyhow::anyhow;

    fn listing(label: &str, names: &[&str]) -> Result<ArchiveListing> {
        Ok(ArchiveListing {
            label: label.to_string(),
            class_entries: names.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn allow(names: &[&str]) -> Allowlist {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn lines(violations: &[Violation]) -> Vec<String> {
        violations.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn violation_message_format() {
        let v = Violation {
            name: "com/Foo.class".to_string(),
            owner: "//a".to_string(),
            duplicate: "//b".to_string(),
        };
        assert_eq!(
            v.to_string(),
            "Found duplicate file: 'com/Foo.class', originally provided by '//a', also provided by '//b'."
        );
    }

    #[test]
    fn disjoint_archives_have_no_violations() {
        let found = find_duplicates(
            &Allowlist::default(),
            vec![listing("//a", &["a/A.class", "a/B.class"]), listing("//b", &["b/A.class"])],
        )
        .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn second_provider_is_the_duplicate() {
        let found = find_duplicates(
            &Allowlist::default(),
            vec![listing("//a", &["com/Foo.class"]), listing("//b", &["com/Foo.class"])],
        )
        .unwrap();
        assert_eq!(
            lines(&found),
            vec!["Found duplicate file: 'com/Foo.class', originally provided by '//a', also provided by '//b'."]
        );
    }

    #[test]
    fn every_later_provider_cites_the_first_owner() {
        let found = find_duplicates(
            &Allowlist::default(),
            vec![
                listing("A", &["X.class"]),
                listing("B", &["X.class"]),
                listing("C", &["X.class"]),
            ],
        )
        .unwrap();
        let pairs: Vec<_> = found.iter().map(|v| (v.owner.as_str(), v.duplicate.as_str())).collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C")]);
    }

    #[test]
    fn violations_follow_archive_order_then_entry_order() {
        let found = find_duplicates(
            &Allowlist::default(),
            vec![
                listing("//a", &["Z.class", "Y.class", "X.class"]),
                listing("//b", &["X.class", "Z.class"]),
                listing("//c", &["Y.class"]),
            ],
        )
        .unwrap();
        let order: Vec<_> = found.iter().map(|v| (v.name.as_str(), v.duplicate.as_str())).collect();
        assert_eq!(order, vec![("X.class", "//b"), ("Z.class", "//b"), ("Y.class", "//c")]);
    }

    #[test]
    fn allowlisted_names_are_never_violations() {
        let allowlist = allow(&["X.class"]);
        let found = find_duplicates(
            &allowlist,
            vec![
                listing("A", &["X.class", "Y.class"]),
                listing("B", &["X.class", "Y.class"]),
                listing("C", &["X.class"]),
            ],
        )
        .unwrap();
        assert_eq!(lines(&found), vec![Violation {
            name: "Y.class".to_string(),
            owner: "A".to_string(),
            duplicate: "B".to_string(),
        }
        .to_string()]);
    }

    // Documented quirk: an allowlisted name's owner moves to its most recent
    // provider, while other names keep their first owner.
    #[test]
    fn allowlisted_owner_is_the_most_recent_provider() {
        let allowlist = allow(&["X.class"]);
        let mut map = OwnershipMap::new(&allowlist);
        for label in ["A", "B", "C"] {
            assert_eq!(map.record("X.class", label), None);
            map.record("Y.class", label);
        }
        assert_eq!(map.owner("X.class"), Some("C"));
        assert_eq!(map.owner("Y.class"), Some("A"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn a_violation_leaves_the_owner_alone() {
        let allowlist = Allowlist::default();
        let mut map = OwnershipMap::new(&allowlist);
        assert_eq!(map.record("X.class", "A"), None);
        assert!(map.record("X.class", "B").is_some());
        assert_eq!(map.owner("X.class"), Some("A"));
        assert_eq!(map.owner("W.class"), None);
    }

    #[test]
    fn owners_keep_their_own_labels_as_labels_accumulate() {
        let allowlist = Allowlist::default();
        let mut map = OwnershipMap::new(&allowlist);
        let labels: Vec<String> = (0..50).map(|n| format!("//lib{n}")).collect();
        for (n, label) in labels.iter().enumerate() {
            assert_eq!(map.record(&format!("C{n}.class"), label), None);
            assert_eq!(map.record("Shared.class", label).is_some(), n > 0);
        }
        for (n, label) in labels.iter().enumerate() {
            assert_eq!(map.owner(&format!("C{n}.class")), Some(label.as_str()));
        }
        let late = map.record("C7.class", "//late").unwrap();
        assert_eq!((late.owner.as_str(), late.duplicate.as_str()), ("//lib7", "//late"));
        assert_eq!(map.owner("Shared.class"), Some("//lib0"));
    }

    #[test]
    fn a_failed_listing_stops_the_scan() {
        let listings = vec![
            listing("//a", &["X.class"]),
            Err(anyhow!("corrupt archive")),
            listing("//c", &["X.class"]),
        ];
        let err = find_duplicates(&Allowlist::default(), listings).unwrap_err();
        assert_eq!(err.to_string(), "corrupt archive");
    }
}
