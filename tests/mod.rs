//! Main test module for savevault
//!
//! This module includes all test suites:
//! - Integration tests for multi-profile, multi-restore scenarios
//! - Property-based tests for digest and naming invariants
//! - Edge cases around odd file names and failing safeguards

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::savevault::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn vault_with_profile(temp_dir: &TempDir) -> Vault {
        let vault = Vault::open(temp_dir.path().join("vault")).unwrap();
        vault.create_profile("p").unwrap();
        vault
    }

    #[test]
    fn test_vanished_tracked_paths() {
        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let live = temp_dir.path().join("live");
        fs::create_dir_all(&live).unwrap();
        fs::write(live.join("keep.sav"), "keep").unwrap();

        vault
            .add_tracked_paths("p", &[live.join("keep.sav"), live.join("never-existed.sav")])
            .unwrap();

        let snapshot = vault.backup("p").unwrap();
        assert_eq!(snapshot.member_count, 1);

        // Everything tracked disappears: restore still works, without safeguard
        fs::remove_file(live.join("keep.sav")).unwrap();
        let result = vault.restore("p", &snapshot.name).unwrap();
        assert!(result.safeguard.is_none());
        assert!(!result.warnings.is_empty());
        assert_eq!(fs::read_to_string(live.join("keep.sav")).unwrap(), "keep");
    }

    #[test]
    fn test_special_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let live = temp_dir.path().join("live");
        fs::create_dir_all(&live).unwrap();

        // Create files with special characters
        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file_with_underscores.txt",
            "file.with.dots.txt",
            "file@with#special$chars.txt",
            "file(with)parens.txt",
            "file[with]brackets.txt",
            "file{with}braces.txt",
        ];

        let mut created = Vec::new();
        for name in &special_names {
            if fs::write(live.join(name), format!("Content of {}", name)).is_ok() {
                created.push(*name);
            }
        }
        vault.add_tracked_paths("p", &[&live]).unwrap();
        let snapshot = vault.backup("p").unwrap();
        assert_eq!(snapshot.member_count, created.len());

        // Delete all files
        for name in &created {
            fs::remove_file(live.join(name)).unwrap();
        }

        vault.restore("p", &snapshot.name).unwrap();
        for name in &created {
            let content = fs::read_to_string(live.join(name)).unwrap();
            assert_eq!(content, format!("Content of {}", name));
        }
    }

    #[test]
    fn test_unicode_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let live = temp_dir.path().join("セーブ");
        fs::create_dir_all(&live).unwrap();

        let unicode_names = vec![
            "файл.txt",     // Russian
            "文件.txt",     // Chinese
            "ファイル.txt", // Japanese
            "αρχείο.txt",   // Greek
            "🚀🌟💾.txt",   // Emojis
        ];

        let mut created = Vec::new();
        for name in &unicode_names {
            if fs::write(live.join(name), format!("Unicode content: {}", name)).is_ok() {
                created.push(*name);
            }
        }
        if created.is_empty() {
            // No unicode support on this system
            return;
        }

        vault.add_tracked_paths("p", &[&live]).unwrap();
        let snapshot = vault.backup("p").unwrap();
        let manifest = vault.inspect_archive("p", &snapshot.name).unwrap();
        for name in &created {
            assert!(manifest.target_of(name).is_some(), "missing member {}", name);
        }

        for name in &created {
            fs::write(live.join(name), "overwritten").unwrap();
        }
        vault.restore("p", &snapshot.name).unwrap();
        for name in &created {
            let content = fs::read_to_string(live.join(name)).unwrap();
            assert_eq!(content, format!("Unicode content: {}", name));
        }
    }

    #[test]
    fn test_overlapping_tracked_directories() {
        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let live = temp_dir.path().join("live");
        fs::create_dir_all(live.join("profiles/slot1")).unwrap();
        fs::write(live.join("profiles/slot1/data.sav"), "1").unwrap();
        fs::write(live.join("profiles/global.cfg"), "g").unwrap();

        vault
            .add_tracked_paths(
                "p",
                &[
                    live.join("profiles"),
                    live.join("profiles/slot1"),
                    live.join("profiles/slot1/data.sav"),
                ],
            )
            .unwrap();

        let snapshot = vault.backup("p").unwrap();
        assert_eq!(snapshot.member_count, 2);

        let manifest = vault.inspect_archive("p", &snapshot.name).unwrap();
        let names: Vec<_> = manifest.members.iter().map(|m| m.archive_path.as_str()).collect();
        assert_eq!(names, vec!["global.cfg", "slot1/data.sav"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_safeguard_touches_nothing() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let live = temp_dir.path().join("live");
        fs::create_dir_all(live.join("a")).unwrap();
        fs::write(live.join("a/b"), "nested").unwrap();
        vault.add_tracked_paths("p", &[live.join("a")]).unwrap();
        let snapshot = vault.backup("p").unwrap();

        // A file name that is not valid UTF-8 cannot be recorded in a manifest
        let odd = live.join("a").join(OsStr::from_bytes(b"slot\xff.sav"));
        fs::write(&odd, "odd").unwrap();

        let err = vault.restore("p", &snapshot.name).unwrap_err();
        assert!(matches!(err, VaultError::PathConversion(_)));
        assert!(err.is_structural());

        // No safeguard written, live files intact
        let archives = vault.list_archives("p").unwrap();
        assert_eq!(archives.len(), 1);
        assert!(!archives[0].is_auto);
        assert_eq!(fs::read_to_string(live.join("a/b")).unwrap(), "nested");
        assert_eq!(fs::read_to_string(&odd).unwrap(), "odd");
    }

    #[cfg(unix)]
    #[test]
    fn test_colons_and_backslashes_in_unix_names() {
        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let live = temp_dir.path().join("live");
        fs::create_dir_all(&live).unwrap();
        let names = ["save_12:30.sav", "save_1230.sav", "a\\b", "a_b"];
        for name in names {
            fs::write(live.join(name), format!("content of {}", name)).unwrap();
        }
        vault.add_tracked_paths("p", &[&live]).unwrap();

        let snapshot = vault.backup("p").unwrap();
        assert_eq!(snapshot.member_count, names.len());
        let manifest = vault.inspect_archive("p", &snapshot.name).unwrap();
        for name in names {
            assert!(manifest.target_of(name).is_some(), "missing member {}", name);
        }

        for name in names {
            fs::write(live.join(name), "overwritten").unwrap();
        }
        let result = vault.restore("p", &snapshot.name).unwrap();
        assert!(result.safeguard.is_some());
        for name in names {
            assert_eq!(
                fs::read_to_string(live.join(name)).unwrap(),
                format!("content of {}", name)
            );
        }
    }

    #[test]
    fn test_profile_removal_deletes_archives() {
        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let file = temp_dir.path().join("save.dat");
        fs::write(&file, "x").unwrap();
        vault.add_tracked_paths("p", &[&file]).unwrap();
        let snapshot = vault.backup("p").unwrap();
        assert!(snapshot.path.exists());

        vault.remove_profile("p").unwrap();
        assert!(!snapshot.path.exists());
        assert!(vault.list_profiles().unwrap().is_empty());
        assert!(file.exists(), "tracked files are never touched by profile removal");
    }

    #[test]
    fn test_untracking_never_added_path() {
        let temp_dir = TempDir::new().unwrap();
        let vault = vault_with_profile(&temp_dir);
        let config = vault.profile_dir("p").unwrap().join("config");

        let err = vault.remove_tracked_path("p", PathBuf::from("/nowhere")).unwrap_err();
        assert!(matches!(err, VaultError::TrackedPathNotFound(_)));
        assert!(!config.exists());

        let err = vault.remove_tracked_path("", "/nowhere").unwrap_err();
        assert!(err.is_validation());
    }
}
