use haf::{append, concatenate, create, delete, extract, list, ArchiveError, HammingOptions};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::tempdir;

// `extract` writes into the process's current working directory, so any
// test exercising it must not run concurrently with another.
static CWD_LOCK: Mutex<()> = Mutex::new(());

fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(data).unwrap();
    path
}

#[test]
fn create_and_list_reports_exact_sizes() {
    let dir = tempdir().unwrap();
    let small = vec![0xAAu8; 64 * 1024];
    let large = vec![0x55u8; 96 * 1024];
    let f1 = write_file(dir.path(), "small.bin", &small);
    let f2 = write_file(dir.path(), "large.bin", &large);

    let archive_path = dir.path().join("archive.haf");
    create(&archive_path, HammingOptions::default(), &[f1, f2]).unwrap();

    let listed = list(&archive_path).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].display_name(), "small.bin");
    assert_eq!(listed[0].original_size, 64 * 1024);
    assert_eq!(listed[1].display_name(), "large.bin");
    assert_eq!(listed[1].original_size, 96 * 1024);
}

#[test]
fn multiple_single_bit_flips_across_payload_are_repaired() {
    let _guard = CWD_LOCK.lock().unwrap();
    let dir = tempdir().unwrap();
    let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7) as u8).collect();
    let f1 = write_file(dir.path(), "payload.bin", &data);
    let archive_path = dir.path().join("archive.haf");
    create(&archive_path, HammingOptions::default(), &[f1]).unwrap();

    let header_size = {
        let mut f = File::open(&archive_path).unwrap();
        haf::ArchiveHeader::read(&mut f).unwrap().header_size()
    };
    let mut bytes = fs::read(&archive_path).unwrap();
    let payload_len = bytes.len() as u64 - header_size;
    let flip_positions = [100u64, payload_len / 2, payload_len - 1];
    for pos in flip_positions {
        let idx = (header_size + pos) as usize;
        bytes[idx] ^= 0x01;
    }
    fs::write(&archive_path, &bytes).unwrap();

    let extract_dir = tempdir().unwrap();
    std::env::set_current_dir(extract_dir.path()).unwrap();
    extract(&archive_path, HammingOptions::default(), &[]).unwrap();
    assert_eq!(fs::read(extract_dir.path().join("payload.bin")).unwrap(), data);
}

#[test]
fn deleting_absent_file_exits_with_error_and_leaves_archive_untouched() {
    let dir = tempdir().unwrap();
    let f1 = write_file(dir.path(), "keep.bin", b"unchanged");
    let archive_path = dir.path().join("archive.haf");
    create(&archive_path, HammingOptions::default(), &[f1]).unwrap();

    let before = fs::read(&archive_path).unwrap();
    let err = delete(&archive_path, &[b"absent.bin".to_vec()]).unwrap_err();
    assert!(matches!(err, ArchiveError::NameNotFound(_)));

    let after = fs::read(&archive_path).unwrap();
    assert_eq!(before, after);

    let listed = list(&archive_path).unwrap();
    assert_eq!(listed[0].display_name(), "keep.bin");
}

#[test]
fn corrupted_magic_byte_fails_listing() {
    let dir = tempdir().unwrap();
    let f1 = write_file(dir.path(), "a.bin", b"data");
    let archive_path = dir.path().join("archive.haf");
    create(&archive_path, HammingOptions::default(), &[f1]).unwrap();

    let mut bytes = fs::read(&archive_path).unwrap();
    bytes[0] ^= 0x01;
    fs::write(&archive_path, &bytes).unwrap();

    assert!(list(&archive_path).is_err());
}

#[test]
fn concatenating_archives_with_shared_name_renames_the_second() {
    let _guard = CWD_LOCK.lock().unwrap();
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir_all(&sub).unwrap();

    let f1 = write_file(dir.path(), "dup.bin", b"from-first");
    let f2 = write_file(&sub, "dup.bin", b"from-second");

    let archive1 = dir.path().join("one.haf");
    let archive2 = dir.path().join("two.haf");
    create(&archive1, HammingOptions::default(), &[f1]).unwrap();
    create(&archive2, HammingOptions::default(), &[f2]).unwrap();

    let target = dir.path().join("merged.haf");
    concatenate(&target, &[archive1, archive2]).unwrap();

    let listed = list(&target).unwrap();
    let names: Vec<String> = listed.iter().map(|i| i.display_name()).collect();
    assert_eq!(names, vec!["dup.bin", "dup.bin(2)"]);

    let extract_dir = tempdir().unwrap();
    std::env::set_current_dir(extract_dir.path()).unwrap();
    extract(&target, HammingOptions::default(), &[]).unwrap();
    assert_eq!(fs::read(extract_dir.path().join("dup.bin")).unwrap(), b"from-first");
    assert_eq!(fs::read(extract_dir.path().join("dup.bin(2)")).unwrap(), b"from-second");
}

#[test]
fn custom_parameters_survive_a_single_bit_flip() {
    let _guard = CWD_LOCK.lock().unwrap();
    let dir = tempdir().unwrap();
    let data: Vec<u8> = (0..500u32).map(|i| i as u8).collect();
    let f1 = write_file(dir.path(), "custom.bin", &data);
    let archive_path = dir.path().join("archive.haf");
    let opts = HammingOptions::new(4, 3).unwrap();
    create(&archive_path, opts, &[f1]).unwrap();

    let header_size = {
        let mut f = File::open(&archive_path).unwrap();
        haf::ArchiveHeader::read(&mut f).unwrap().header_size()
    };
    let mut bytes = fs::read(&archive_path).unwrap();
    bytes[header_size as usize + 3] ^= 0x04;
    fs::write(&archive_path, &bytes).unwrap();

    let extract_dir = tempdir().unwrap();
    std::env::set_current_dir(extract_dir.path()).unwrap();
    extract(&archive_path, opts, &[]).unwrap();
    assert_eq!(fs::read(extract_dir.path().join("custom.bin")).unwrap(), data);
}

#[test]
fn append_is_commutative_with_extract() {
    let _guard = CWD_LOCK.lock().unwrap();
    let dir = tempdir().unwrap();
    let f1 = write_file(dir.path(), "f1.bin", b"first file contents");
    let f2 = write_file(dir.path(), "f2.bin", b"second file contents, a bit longer");

    let incremental = dir.path().join("incremental.haf");
    create(&incremental, HammingOptions::default(), &[f1.clone()]).unwrap();
    append(&incremental, HammingOptions::default(), &[f2.clone()]).unwrap();

    let bulk = dir.path().join("bulk.haf");
    create(&bulk, HammingOptions::default(), &[f1, f2]).unwrap();

    for archive_path in [&incremental, &bulk] {
        let extract_dir = tempdir().unwrap();
        std::env::set_current_dir(extract_dir.path()).unwrap();
        extract(archive_path, HammingOptions::default(), &[]).unwrap();
        assert_eq!(fs::read(extract_dir.path().join("f1.bin")).unwrap(), b"first file contents");
        assert_eq!(
            fs::read(extract_dir.path().join("f2.bin")).unwrap(),
            b"second file contents, a bit longer"
        );
    }
}

#[test]
fn delete_recomputes_offsets_and_archive_size() {
    let dir = tempdir().unwrap();
    let f1 = write_file(dir.path(), "f1.bin", b"aaaa");
    let f2 = write_file(dir.path(), "f2.bin", b"bbbbbbbb");
    let f3 = write_file(dir.path(), "f3.bin", b"cc");

    let archive_path = dir.path().join("archive.haf");
    create(&archive_path, HammingOptions::default(), &[f1, f2, f3]).unwrap();
    delete(&archive_path, &[b"f2.bin".to_vec()]).unwrap();

    let listed = list(&archive_path).unwrap();
    let names: Vec<String> = listed.iter().map(|i| i.display_name()).collect();
    assert_eq!(names, vec!["f1.bin", "f3.bin"]);

    let header_size = {
        let mut f = File::open(&archive_path).unwrap();
        haf::ArchiveHeader::read(&mut f).unwrap().header_size()
    };
    let expected = header_size + listed[0].encoded_size + listed[1].encoded_size;
    assert_eq!(fs::metadata(&archive_path).unwrap().len(), expected);
}
