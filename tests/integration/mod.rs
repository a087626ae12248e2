//! Integration tests for savevault
//!
//! Realistic multi-step scenarios: several profiles side by side, chains of
//! backups and restores, archive management between restores.

use ::savevault::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Test harness holding a vault and a fake "game install" tree
pub struct VaultTestHarness {
    pub vault_dir: TempDir,
    pub live_dir: TempDir,
    pub vault: Vault,
}

impl VaultTestHarness {
    /// Create a new test harness
    pub fn new() -> Self {
        let vault_dir = TempDir::new().unwrap();
        let live_dir = TempDir::new().unwrap();
        let vault = VaultBuilder::new()
            .compression_level(CompressionLevel::Fast)
            .build(vault_dir.path())
            .unwrap();

        Self {
            vault_dir,
            live_dir,
            vault,
        }
    }

    /// Absolute path of `rel` inside the live tree
    pub fn live(&self, rel: &str) -> PathBuf {
        self.live_dir.path().join(rel)
    }

    /// Write a live file, creating parents
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.live(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Current content of every file under `rel`, keyed by relative path
    pub fn snapshot_state(&self, rel: &str) -> BTreeMap<String, String> {
        let root = self.live(rel);
        let mut state = BTreeMap::new();
        collect(&root, &root, &mut state);
        state
    }
}

fn collect(root: &Path, dir: &Path, state: &mut BTreeMap<String, String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, state);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            state.insert(rel, fs::read_to_string(&path).unwrap());
        }
    }
}

#[test]
fn test_backup_restore_chain() -> anyhow::Result<()> {
    let h = VaultTestHarness::new();
    h.vault.create_profile("rpg")?;
    h.vault.add_tracked_paths("rpg", &[h.live("rpg/saves")])?;

    let mut archives = Vec::new();
    let mut states = Vec::new();
    for round in 0..4 {
        h.write(&format!("rpg/saves/slot{}.sav", round), &format!("slot {}", round));
        h.write("rpg/saves/meta/last.txt", &format!("round {}", round));
        states.push(h.snapshot_state("rpg/saves"));
        archives.push(h.vault.backup("rpg")?.name);
        info!("Round {} archived as {}", round, archives[round]);
    }

    // Walk back through history in a scrambled order
    for round in [1usize, 3, 0, 2] {
        h.vault.restore("rpg", &archives[round])?;
        assert_eq!(h.snapshot_state("rpg/saves"), states[round], "state of round {}", round);
    }

    let listed = h.vault.list_archives("rpg")?;
    assert_eq!(listed.iter().filter(|a| !a.is_auto).count(), 4);
    assert!(listed.iter().filter(|a| a.is_auto).count() >= 1);
    Ok(())
}

#[test]
fn test_profiles_are_isolated() {
    let h = VaultTestHarness::new();
    h.write("a/save.dat", "a1");
    h.write("b/save.dat", "b1");

    for name in ["a", "b"] {
        h.vault.create_profile(name).unwrap();
        h.vault.add_tracked_paths(name, &[h.live(name)]).unwrap();
    }
    let a1 = h.vault.backup("a").unwrap();
    h.vault.backup("b").unwrap();

    h.write("a/save.dat", "a2");
    h.write("b/save.dat", "b2");
    h.vault.restore("a", &a1.name).unwrap();

    assert_eq!(fs::read_to_string(h.live("a/save.dat")).unwrap(), "a1");
    assert_eq!(fs::read_to_string(h.live("b/save.dat")).unwrap(), "b2");
    assert_eq!(h.vault.list_archives("b").unwrap().len(), 1);

    // Archives of one profile are invisible to the other
    let err = h.vault.restore("b", &a1.name).unwrap_err();
    assert!(matches!(err, VaultError::ArchiveNotFound(_)));
}

#[test]
fn test_identical_content_shares_digest() {
    let h = VaultTestHarness::new();
    h.write("saves/one.sav", "same bytes");
    h.write("saves/two.sav", "other bytes");
    h.vault.create_profile("p").unwrap();
    h.vault.add_tracked_paths("p", &[h.live("saves")]).unwrap();

    let first = h.vault.backup("p").unwrap();
    let second = h.vault.backup("p").unwrap();
    assert_eq!(first.digest, second.digest);

    let strip_ts = |name: &str| {
        let parts: Vec<&str> = name.split('_').collect();
        (parts[0].to_string(), parts[3..].join("_"))
    };
    assert_eq!(strip_ts(&first.name), strip_ts(&second.name));

    h.write("saves/two.sav", "changed");
    let third = h.vault.backup("p").unwrap();
    assert_ne!(first.digest, third.digest);
}

#[test]
fn test_rename_then_restore() {
    let h = VaultTestHarness::new();
    h.write("saves/progress.sav", "before boss");
    h.vault.create_profile("p").unwrap();
    h.vault.add_tracked_paths("p", &[h.live("saves/progress.sav")]).unwrap();
    let snapshot = h.vault.backup("p").unwrap();

    let renamed = h.vault.rename_archive("p", &snapshot.name, "before-boss").unwrap();
    assert_eq!(renamed, "before-boss.zip");

    h.write("saves/progress.sav", "after boss");
    let result = h.vault.restore("p", &renamed).unwrap();
    assert_eq!(result.archive, "before-boss.zip");
    assert_eq!(fs::read_to_string(h.live("saves/progress.sav")).unwrap(), "before boss");

    // The renamed archive keeps its manifest
    let manifest = h.vault.inspect_archive("p", &renamed).unwrap();
    assert_eq!(manifest.digest, snapshot.digest);
    assert!(!manifest.auto);
}

#[test]
fn test_rename_collision_keeps_both() {
    let h = VaultTestHarness::new();
    h.write("s.sav", "1");
    h.vault.create_profile("p").unwrap();
    h.vault.add_tracked_paths("p", &[h.live("s.sav")]).unwrap();

    let first = h.vault.backup("p").unwrap();
    h.write("s.sav", "2");
    let second = h.vault.backup("p").unwrap();

    let a = h.vault.rename_archive("p", &first.name, "keep").unwrap();
    let b = h.vault.rename_archive("p", &second.name, "keep").unwrap();
    assert_eq!(a, "keep.zip");
    assert_ne!(a, b);

    let names: Vec<_> = h.vault.list_archives("p").unwrap().into_iter().map(|a| a.name).collect();
    assert!(names.contains(&a));
    assert!(names.contains(&b));
}

#[test]
fn test_remove_archive() {
    let h = VaultTestHarness::new();
    h.write("s.sav", "1");
    h.vault.create_profile("p").unwrap();
    h.vault.add_tracked_paths("p", &[h.live("s.sav")]).unwrap();
    let snapshot = h.vault.backup("p").unwrap();

    h.vault.remove_archive("p", &snapshot.name).unwrap();
    assert!(h.vault.list_archives("p").unwrap().is_empty());
    assert!(h.live("s.sav").exists());
}

#[test]
fn test_safeguard_written_before_failed_extraction() {
    let h = VaultTestHarness::new();
    h.write("s.sav", "live");
    h.vault.create_profile("p").unwrap();
    h.vault.add_tracked_paths("p", &[h.live("s.sav")]).unwrap();

    // Not a zip at all
    let bogus = h.vault.profile_dir("p").unwrap().join("bogus.zip");
    fs::write(&bogus, b"definitely not a zip").unwrap();

    let err = h.vault.restore("p", "bogus.zip").unwrap_err();
    assert!(matches!(err, VaultError::Zip(_)));

    let archives = h.vault.list_archives("p").unwrap();
    assert_eq!(archives.iter().filter(|a| a.is_auto).count(), 1);
    assert_eq!(fs::read_to_string(h.live("s.sav")).unwrap(), "live");
}
