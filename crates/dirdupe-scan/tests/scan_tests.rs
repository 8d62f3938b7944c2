use dirdupe_scan::{
    DirectoryOracle, FsOracle, GroupId, InsertOutcome, MemoryOracle, ProgressTracker, TreeBuilder,
    WarningKind, build_from_reader, build_from_str,
};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

const LISTING: &str = "\
/home/user/photos/a.jpg
/home/user/backup/photos/a.jpg

/home/user/photos/b.jpg
/home/user/backup/photos/b.jpg
/home/user/old/b.jpg

";

#[test]
fn test_build_from_fdupes_listing() {
    let mut progress = ProgressTracker::new();
    let built = build_from_str(LISTING, &mut progress).unwrap();

    assert_eq!(built.tree.file_count(), 5);
    // home, user, photos, backup, backup/photos, old
    assert_eq!(built.tree.dir_count(), 6);
    assert_eq!(built.stats.paths, 5);
    assert_eq!(built.stats.groups, 2);
    assert_eq!(built.stats.discarded, 0);
    assert!(built.warnings.is_empty());
    built.tree.validate().unwrap();

    let group_of = |p: &str| built.tree.node(built.tree.find(p).unwrap()).kind.group();
    assert_eq!(group_of("/home/user/photos/a.jpg"), group_of("/home/user/backup/photos/a.jpg"));
    assert_ne!(group_of("/home/user/photos/a.jpg"), group_of("/home/user/old/b.jpg"));
}

#[test]
fn test_reader_and_str_agree() {
    let mut progress = ProgressTracker::new();
    let from_str = build_from_str(LISTING, &mut progress).unwrap();
    let from_reader = build_from_reader(Cursor::new(LISTING), &mut progress).unwrap();

    assert_eq!(from_str.stats, from_reader.stats);
    assert_eq!(from_str.tree.arena_len(), from_reader.tree.arena_len());
}

#[test]
fn test_crlf_and_garbage_lines() {
    let listing = "/a/x\r\n/b/x\r\n\r\nWarning: something odd\r\n/a/y\r\n/b/y\r\n";
    let built = build_from_str(listing, &mut ProgressTracker::new()).unwrap();

    assert_eq!(built.tree.file_count(), 4);
    assert_eq!(built.stats.discarded, 1);
    assert_eq!(built.warnings.len(), 1);
    assert_eq!(built.warnings[0].kind, WarningKind::MalformedLine);
    assert!(built.tree.find("/a/x").is_some());
}

#[test]
fn test_consecutive_separators_skip_group_ids() {
    let built = build_from_str("/a/x\n\n\n/a/y\n", &mut ProgressTracker::new()).unwrap();
    let group_of = |p: &str| built.tree.node(built.tree.find(p).unwrap()).kind.group();

    assert_eq!(group_of("/a/x"), Some(GroupId::new(0)));
    assert_eq!(group_of("/a/y"), Some(GroupId::new(2)));
    assert_eq!(built.stats.groups, 2);
}

#[test]
fn test_reinsert_is_idempotent() {
    let mut builder = TreeBuilder::new();
    builder.insert_path("/a/b/c", GroupId::new(0)).unwrap();
    let before = builder.stats();
    let outcome = builder.insert_path("//a//b/c", GroupId::new(0)).unwrap();

    assert!(matches!(outcome, InsertOutcome::Restamped(_)));
    let built = builder.finish();
    assert_eq!(built.tree.arena_len(), 4);
    assert_eq!(built.stats.paths, before.paths + 1);
}

#[test]
fn test_conflicts_become_warnings() {
    let built = build_from_str("/a/x\n/a/x/y\n", &mut ProgressTracker::new()).unwrap();

    assert_eq!(built.stats.conflicts, 1);
    assert_eq!(built.warnings[0].kind, WarningKind::KindConflict);
    assert!(built.tree.node(built.tree.find("/a/x").unwrap()).is_file());
}

#[test]
fn test_memory_oracle_matches_listing() {
    let oracle = MemoryOracle::from_files([
        "/home/user/photos/a.jpg",
        "/home/user/photos/b.jpg",
        "/home/user/photos/c.jpg",
    ]);

    let names = oracle.list_entries(Path::new("/home/user/photos")).unwrap();
    let names: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
}

#[test]
fn test_memory_oracle_unreadable() {
    let mut oracle = MemoryOracle::from_files(["/a/x"]);
    oracle.mark_unreadable("/a");

    let err = oracle.list_entries(Path::new("/a")).unwrap_err();
    assert!(!err.is_not_found());
    assert!(oracle.list_entries(Path::new("/")).is_ok());
}

#[test]
fn test_fs_oracle_sees_unlisted_files() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    fs::create_dir(root.join("a")).unwrap();
    fs::write(root.join("a/x"), "dup").unwrap();
    fs::write(root.join("a/extra"), "unique").unwrap();

    let listing = format!("{}\n", root.join("a/x").display());
    let built = build_from_str(&listing, &mut ProgressTracker::new()).unwrap();
    let a = built.tree.find(root.join("a")).unwrap();

    let real = FsOracle::new().list_entries(&root.join("a")).unwrap();
    assert_eq!(built.tree.children(a).len(), 1);
    assert_eq!(real.len(), 2);
}

#[cfg(unix)]
#[test]
fn test_fs_oracle_symlinked_directory_is_not_found() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    fs::create_dir(root.join("real")).unwrap();
    std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

    let err = FsOracle::new().list_entries(&root.join("link")).unwrap_err();
    assert!(err.is_not_found());
}
