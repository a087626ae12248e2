//! Property-based testing for savevault
//!
//! Uses proptest to verify the naming and digest invariants across randomly
//! generated file trees.

use ::savevault::paths::{anchor_of, archive_name};
use ::savevault::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Generate random relative file paths
fn path_strategy() -> impl Strategy<Value = String> {
    let dir_strategy = prop::collection::vec("[a-z]{1,6}", 0..=3);
    let filename_strategy = "[a-z]{1,8}\\.(sav|dat|cfg)";

    (dir_strategy, filename_strategy).prop_map(|(dirs, filename)| {
        let mut parts = dirs;
        parts.push(filename);
        parts.join("/")
    })
}

/// Generate random file content
fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-zA-Z0-9 \n]{0,200}".prop_map(|s| s.into_bytes()),
        prop::collection::vec(any::<u8>(), 1..2000),
        (any::<u8>(), 1..500usize).prop_map(|(byte, count)| vec![byte; count]),
    ]
}

/// Generate a file tree where no file path is also a directory path
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(path_strategy(), content_strategy(), 1..12).prop_filter(
        "a file cannot also be a directory",
        |tree| {
            tree.keys()
                .all(|a| tree.keys().all(|b| !b.starts_with(&format!("{}/", a))))
        },
    )
}

fn materialize(root: &Path, tree: &BTreeMap<String, Vec<u8>>) -> Vec<PathBuf> {
    for (rel, content) in tree {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
    }
    FileSetResolver::new().resolve(&[root]).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The same contents under different roots produce the same digest
    #[test]
    fn digest_is_location_independent(tree in tree_strategy()) {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let files_a = materialize(&first.path().join("x"), &tree);
        let files_b = materialize(&second.path().join("deeper/y"), &tree);

        let builder = SnapshotBuilder::new(CompressionLevel::Fast);
        let a = builder.build("p", &files_a, false).unwrap();
        let b = builder.build("p", &files_b, false).unwrap();

        prop_assert_eq!(&a.manifest.digest, &b.manifest.digest);
        prop_assert_eq!(a.manifest.digest.len(), 32);
        let names_a: Vec<_> = a.manifest.members.iter().map(|m| &m.archive_path).collect();
        let names_b: Vec<_> = b.manifest.members.iter().map(|m| &m.archive_path).collect();
        prop_assert_eq!(names_a, names_b);
    }

    /// Every resolved file is archived exactly once, under a relative forward-slash name
    #[test]
    fn archive_names_are_relative_and_unique(tree in tree_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        let files = materialize(temp_dir.path(), &tree);
        prop_assert_eq!(files.len(), tree.len());

        let anchor = anchor_of(&files);
        let mut seen = std::collections::HashSet::new();
        for file in &files {
            prop_assert!(file.starts_with(&anchor));
            let name = archive_name(file, &anchor).unwrap();
            prop_assert!(!name.is_empty());
            prop_assert!(!name.starts_with('/'));
            prop_assert!(!name.ends_with('/'));
            prop_assert!(!name.contains('\\'));
            prop_assert!(seen.insert(name));
        }
    }

    /// The anchor is the tightest common ancestor
    #[test]
    fn anchor_is_tightest(tree in tree_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        let files = materialize(temp_dir.path(), &tree);
        let anchor = anchor_of(&files);

        prop_assert!(files.iter().all(|f| f.starts_with(&anchor)));
        // No child of the anchor contains every file
        let first_rel = files[0].strip_prefix(&anchor).unwrap();
        if let Some(child) = first_rel.components().next() {
            let narrower = anchor.join(child);
            prop_assert!(!files.iter().all(|f| f.starts_with(&narrower) && f != &narrower));
        }
    }

    /// Restoring brings back exactly the archived bytes
    #[test]
    fn restore_reproduces_content(tree in tree_strategy(), garbage in content_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        let live = temp_dir.path().join("live");
        materialize(&live, &tree);

        let vault = Vault::open(temp_dir.path().join("vault")).unwrap();
        vault.create_profile("p").unwrap();
        vault.add_tracked_paths("p", &[&live]).unwrap();
        let snapshot = vault.backup("p").unwrap();

        for rel in tree.keys() {
            fs::write(live.join(rel), &garbage).unwrap();
        }
        fs::write(live.join("stray.tmp"), &garbage).unwrap();

        vault.restore("p", &snapshot.name).unwrap();
        for (rel, content) in &tree {
            prop_assert_eq!(&fs::read(live.join(rel)).unwrap(), content);
        }
        prop_assert!(!live.join("stray.tmp").exists());
    }
}
