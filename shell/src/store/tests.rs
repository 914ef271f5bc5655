/// Unit tests for the file store adapter: stream copy, move, directory
/// creation and listing, all against the in-memory volume.
use super::*;
use crate::path::resolve;

fn p(s: &str) -> CanonicalPath {
    resolve(&CanonicalPath::root(), s).unwrap()
}

fn pattern(len: usize) -> std::vec::Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

fn listing(store: &mut RamStore, dir: &str) -> std::vec::Vec<std::string::String> {
    let mut handle = store.open(&p(dir), OpenMode::READ, NodeKind::Directory).unwrap();
    entries(&mut handle)
        .map(|e| std::string::String::from(e.unwrap().name.as_str()))
        .collect()
}

// ---- stream copy ----

#[test]
fn copy_odd_sized_file_is_byte_identical() {
    let mut store = RamStore::new();
    let data = pattern(COPY_CHUNK * 2 + 17);
    store.insert_file("/f", &data).unwrap();

    let n = copy_file(&mut store, &p("/f"), &p("/g")).unwrap();
    assert_eq!(n, data.len() as u64);
    assert_eq!(store.contents("/g").unwrap(), data);
    assert_eq!(store.open_handles(), 0);
}

#[test]
fn copy_exact_chunk_boundary() {
    let mut store = RamStore::new();
    let data = pattern(COPY_CHUNK);
    store.insert_file("/f", &data).unwrap();

    copy_file(&mut store, &p("/f"), &p("/g")).unwrap();
    assert_eq!(store.contents("/g").unwrap(), data);
}

#[test]
fn copy_empty_file() {
    let mut store = RamStore::new();
    store.insert_file("/empty", b"").unwrap();

    assert_eq!(copy_file(&mut store, &p("/empty"), &p("/g")).unwrap(), 0);
    assert_eq!(store.contents("/g").unwrap(), b"");
}

#[test]
fn copy_truncates_longer_destination() {
    let mut store = RamStore::new();
    store.insert_file("/src", b"short").unwrap();
    store.insert_file("/dst", b"a much longer previous body").unwrap();

    copy_file(&mut store, &p("/src"), &p("/dst")).unwrap();
    assert_eq!(store.contents("/dst").unwrap(), b"short");
}

#[test]
fn copy_refuses_directory_source() {
    let mut store = RamStore::new();
    create_dir(&mut store, &p("/d")).unwrap();

    assert_eq!(copy_file(&mut store, &p("/d"), &p("/g")), Err(FsError::IsADirectory));
    assert!(!store.exists("/g"));
    assert_eq!(store.open_handles(), 0);
}

#[test]
fn missing_source_leaves_destination_alone() {
    let mut store = RamStore::new();
    store.insert_file("/dst", b"keep me").unwrap();

    assert_eq!(copy_file(&mut store, &p("/nope"), &p("/dst")), Err(FsError::NotFound));
    assert_eq!(store.contents("/dst").unwrap(), b"keep me");
    assert_eq!(store.open_handles(), 0);
}

#[test]
fn short_write_is_an_error() {
    let mut store = RamStore::new();
    store.insert_file("/f", &pattern(100)).unwrap();
    store.set_write_limit(Some(10));

    assert_eq!(copy_file(&mut store, &p("/f"), &p("/g")), Err(FsError::ShortWrite));
    assert_eq!(store.open_handles(), 0);
}

#[test]
fn write_protected_volume_refuses_copy() {
    let mut store = RamStore::new();
    store.insert_file("/f", b"x").unwrap();
    store.set_read_only(true);

    assert_eq!(copy_file(&mut store, &p("/f"), &p("/g")), Err(FsError::WriteProtected));
    assert!(!store.exists("/g"));
}

// ---- move ----

#[test]
fn move_removes_source_after_copy() {
    let mut store = RamStore::new();
    store.insert_file("/a/f", b"payload").unwrap();

    move_file(&mut store, &p("/a/f"), &p("/g")).unwrap();
    assert!(!store.exists("/a/f"));
    assert_eq!(store.contents("/g").unwrap(), b"payload");
}

#[test]
fn failed_move_keeps_source() {
    let mut store = RamStore::new();
    store.insert_file("/f", &pattern(64)).unwrap();
    store.set_write_limit(Some(8));

    assert!(move_file(&mut store, &p("/f"), &p("/g")).is_err());
    assert_eq!(store.contents("/f").unwrap(), pattern(64));
    assert_eq!(store.open_handles(), 0);
}

// ---- directories ----

#[test]
fn create_dir_all_is_idempotent() {
    let mut store = RamStore::new();
    create_dir_all(&mut store, &p("/a/b/c")).unwrap();
    create_dir_all(&mut store, &p("/a/b/c")).unwrap();

    for dir in ["/a", "/a/b", "/a/b/c"] {
        assert_eq!(store.kind(dir), Some(NodeKind::Directory));
    }
}

#[test]
fn create_dir_over_file_fails() {
    let mut store = RamStore::new();
    store.insert_file("/a", b"").unwrap();

    assert_eq!(create_dir(&mut store, &p("/a")), Err(FsError::NotADirectory));
    assert_eq!(create_dir_all(&mut store, &p("/a/b")), Err(FsError::NotADirectory));
}

#[test]
fn create_without_parent_is_not_found() {
    let mut store = RamStore::new();
    let result = store.open(&p("/x/y"), OpenMode::CREATE_READ_WRITE, NodeKind::File);
    assert_eq!(result.err(), Some(FsError::NotFound));
}

#[test]
fn listing_is_direct_children_in_order() {
    let mut store = RamStore::new();
    store.insert_file("/d/b", b"1").unwrap();
    store.insert_file("/d/a", b"22").unwrap();
    store.insert_file("/d/sub/deep", b"").unwrap();
    store.insert_file("/other", b"").unwrap();

    assert_eq!(listing(&mut store, "/d"), ["a", "b", "sub"]);
    assert_eq!(listing(&mut store, "/"), ["d", "other"]);
}

#[test]
fn listing_reports_kind_and_size() {
    let mut store = RamStore::new();
    store.insert_file("/f", b"hello").unwrap();
    create_dir(&mut store, &p("/d")).unwrap();

    let mut root = store.open(&p("/"), OpenMode::READ, NodeKind::Directory).unwrap();
    let all: std::vec::Vec<DirEntry> = entries(&mut root).map(Result::unwrap).collect();
    assert!(all[0].is_dir());
    assert_eq!(all[1].size, 5);
    assert_eq!(all[1].modified, None);
}

#[test]
fn delete_refuses_non_empty_directory_and_root() {
    let mut store = RamStore::new();
    store.insert_file("/d/f", b"").unwrap();

    let dir = store.open(&p("/d"), OpenMode::READ_WRITE, NodeKind::Directory).unwrap();
    assert_eq!(dir.delete(), Err(FsError::DeleteFailed));
    let root = store.open(&p("/"), OpenMode::READ_WRITE, NodeKind::Directory).unwrap();
    assert_eq!(root.delete(), Err(FsError::DeleteFailed));
    assert_eq!(store.open_handles(), 0);
}

#[test]
fn read_only_handle_cannot_write() {
    let mut store = RamStore::new();
    store.insert_file("/f", b"abc").unwrap();

    let mut handle = store.open(&p("/f"), OpenMode::READ, NodeKind::File).unwrap();
    assert_eq!(handle.write(b"x"), Err(FsError::AccessDenied));
    assert_eq!(handle.truncate(0), Err(FsError::AccessDenied));
}

#[test]
fn read_exact_reports_early_eof() {
    let mut store = RamStore::new();
    store.insert_file("/f", b"abc").unwrap();

    let mut handle = store.open(&p("/f"), OpenMode::READ, NodeKind::File).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(read_exact(&mut handle, &mut buf), Err(FsError::ShortRead));
}

// ---- names ----

#[test]
fn unprintable_names_get_placeholder() {
    let entry = DirEntry::new(NodeKind::File, 0, None).with_name_units([0x41, 0x00E9, 0x42, 0x07]);
    assert_eq!(entry.name.as_str(), "A?B?");
}

#[test]
fn missing_timestamp_renders_unknown() {
    assert_eq!(std::format!("{}", Modified(&None)), "unknown");
    let t = DateTime { year: 2024, month: 3, day: 9, hour: 7, minute: 5, second: 0 };
    assert_eq!(std::format!("{}", Modified(&Some(t))), "2024-03-09 07:05:00");
}
