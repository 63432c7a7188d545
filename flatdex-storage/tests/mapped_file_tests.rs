use flatdex_result::Error;
use flatdex_storage::file::{BufferedIndexFile, MappedIndexFile};
use flatdex_storage::{IndexFile, IndexSlot, OpenMode};
use std::path::Path;
use tempfile::TempDir;

fn write_with_buffered(path: &Path, slot: IndexSlot, mode: OpenMode, payload: &[u8]) {
    let mut file = BufferedIndexFile::new();
    file.open(path, slot, mode).unwrap();
    file.write(payload).unwrap();
    file.close(path, slot).unwrap();
}

#[test]
fn mapped_reads_dedicated_file() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("t.dnx");
    let payload: Vec<u8> = (0..=255u8).cycle().take(1500).collect();
    write_with_buffered(&path, IndexSlot::Dedicated, OpenMode::Write, &payload);

    let mut file = MappedIndexFile::new();
    file.open(&path, IndexSlot::Dedicated, OpenMode::Read).unwrap();
    assert_eq!(file.remaining(), payload.len());
    let mut head = vec![0u8; 1000];
    file.read(&mut head).unwrap();
    assert_eq!(head, payload[..1000]);
    assert_eq!(file.remaining(), 500);

    file.seek(1490).unwrap();
    let mut tail = [0u8; 16];
    let err = file.read(&mut tail).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err:?}");
    file.close(&path, IndexSlot::Dedicated).unwrap();
    assert!(!file.is_open());
}

#[test]
fn mapped_reads_shared_slots() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("shared.dnx");
    let slot0 = IndexSlot::shared(0).unwrap();
    let slot7 = IndexSlot::shared(7).unwrap();
    write_with_buffered(&path, slot0, OpenMode::Write, b"zero");
    write_with_buffered(&path, slot7, OpenMode::Insert, b"seven!");

    let mut file = MappedIndexFile::new();
    for (slot, expected) in [(slot7, &b"seven!"[..]), (slot0, &b"zero"[..])] {
        file.open(&path, slot, OpenMode::Read).unwrap();
        let mut buf = vec![0u8; expected.len()];
        file.read(&mut buf).unwrap();
        assert_eq!(buf, expected);
        file.close(&path, slot).unwrap();
    }

    let err = file
        .open(&path, IndexSlot::shared(4).unwrap(), OpenMode::Read)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound));
}

#[test]
fn mapped_files_are_read_only() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("t.dnx");
    write_with_buffered(&path, IndexSlot::Dedicated, OpenMode::Write, b"data");

    let mut file = MappedIndexFile::new();
    for mode in [OpenMode::Write, OpenMode::Insert] {
        let err = file.open(&path, IndexSlot::Dedicated, mode).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)), "{err:?}");
    }
    file.open(&path, IndexSlot::Dedicated, OpenMode::Read).unwrap();
    assert!(file.write(b"x").is_err());
    file.close(&path, IndexSlot::Dedicated).unwrap();

    // Discard goes through the same path as the writable backends.
    file.discard(&path, IndexSlot::Dedicated).unwrap();
    assert!(!path.exists());
}
