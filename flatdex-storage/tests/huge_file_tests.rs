use flatdex_storage::file::HugeIndexFile;
use tempfile::TempDir;

use file_harness::{
    run_dedicated_roundtrip, run_discard, run_read_leaves_directory, run_rewrite_resets_directory,
    run_shared_slots,
};

#[test]
fn huge_dedicated_roundtrip() {
    let tmp = TempDir::new().expect("tempdir");
    run_dedicated_roundtrip(HugeIndexFile::new, &tmp.path().join("t.fnx"));
}

#[test]
fn huge_shared_slots() {
    let tmp = TempDir::new().expect("tempdir");
    run_shared_slots(HugeIndexFile::new, &tmp.path().join("shared.fnx"));
}

#[test]
fn huge_rewrite_resets_directory() {
    let tmp = TempDir::new().expect("tempdir");
    run_rewrite_resets_directory(HugeIndexFile::new, &tmp.path().join("shared.fnx"));
}

#[test]
fn huge_discard() {
    let tmp = TempDir::new().expect("tempdir");
    run_discard(
        HugeIndexFile::new,
        &tmp.path().join("one.fnx"),
        &tmp.path().join("many.fnx"),
    );
}

#[test]
fn huge_read_leaves_directory() {
    let tmp = TempDir::new().expect("tempdir");
    run_read_leaves_directory(HugeIndexFile::new, &tmp.path().join("shared.dnx"));
}
