//! Upload tree flows against a real filesystem.

use std::fs;

use httpentry::uploads::{
    DescriptorEntry, OneOrMany, UploadDescriptor, UploadErrorCode, UploadedFile,
    UploadedFileTree,
};
use httpentry::Error;

#[test]
fn test_batch_field_normalizes_and_moves_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let src_a = dir.path().join("upload-a.tmp");
    let src_b = dir.path().join("upload-b.tmp");
    fs::write(&src_a, b"alpha").unwrap();
    fs::write(&src_b, b"beta").unwrap();

    let entry = DescriptorEntry {
        name: Some(OneOrMany::Many(vec![
            String::from("a.txt"),
            String::from("b.txt"),
        ])),
        size: Some(OneOrMany::Many(vec![5, 4])),
        ..DescriptorEntry::parallel(
            vec![
                src_a.to_str().unwrap().to_owned(),
                src_b.to_str().unwrap().to_owned(),
            ],
            vec![0, 0],
        )
    };
    let mut tree = UploadedFileTree::normalize([("docs", UploadDescriptor::Entry(entry))]);

    let group = tree.get("docs").unwrap().as_group().unwrap();
    assert_eq!(group.keys(), vec!["0", "1"]);
    assert!(group.files().iter().all(|f| f.error().is_ok()));

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    for file in tree.files_mut() {
        let target = out.join(file.client_filename().unwrap());
        file.move_to(target).unwrap();
    }

    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(out.join("b.txt")).unwrap(), b"beta");
    assert!(!src_a.exists());
    assert!(!src_b.exists());
    assert!(tree.files().iter().all(|f| f.is_moved()));
}

#[test]
fn test_nested_fields_resolve_by_path() {
    let tree = UploadedFileTree::normalize([(
        "profile",
        UploadDescriptor::Group(vec![
            (
                String::from("avatar"),
                UploadDescriptor::Entry(DescriptorEntry::single("/tmp/u-avatar", 0)),
            ),
            (
                String::from("banner"),
                UploadDescriptor::Entry(DescriptorEntry::single("/tmp/u-banner", 4)),
            ),
        ]),
    )]);

    let profile = tree.get("profile").unwrap().as_group().unwrap();
    assert_eq!(profile.len(), 2);

    let banner = profile.get("banner").unwrap().as_file().unwrap();
    assert_eq!(banner.error(), UploadErrorCode::NoFile);
    assert!(!banner.error().is_ok());

    // Leaves walk depth-first in field order.
    let paths: Vec<_> = tree.files().iter().map(|f| f.path().to_owned()).collect();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("u-avatar"));
    assert!(paths[1].ends_with("u-banner"));
}

#[test]
fn test_failed_entry_refuses_to_move() {
    let dir = tempfile::tempdir().unwrap();
    let mut tree = UploadedFileTree::normalize([(
        "missing",
        UploadDescriptor::Entry(DescriptorEntry::single("", 4)),
    )]);

    let file = tree.get_mut("missing").unwrap().as_file_mut().unwrap();
    assert_eq!(file.error(), UploadErrorCode::NoFile);

    // There is no source behind the entry, so the gateway validation trips.
    let err = file.move_to(dir.path().join("never")).unwrap_err();
    assert!(matches!(err, Error::InvalidUploadSource { .. }));
    assert!(!file.is_moved());
}

#[test]
fn test_gateway_file_streams_then_moves_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("incoming.tmp");
    fs::write(&source, b"scanned bytes").unwrap();

    let mut tree = UploadedFileTree::normalize([(
        "scan",
        UploadDescriptor::Entry(DescriptorEntry::single(source.to_str().unwrap(), 0)),
    )]);
    let file = tree.get_mut("scan").unwrap().as_file_mut().unwrap();

    let stream = file.stream().unwrap();
    assert_eq!(stream.borrow_mut().to_string_lossy(), "scanned bytes");

    let target = dir.path().join("archived.bin");
    file.move_to(&target).unwrap();
    assert_eq!(fs::read(&target).unwrap(), b"scanned bytes");
    assert!(!source.exists());

    // The handle is spent: no second move, no new stream.
    assert!(matches!(
        file.move_to(dir.path().join("again")),
        Err(Error::UploadAlreadyMoved { .. })
    ));
    assert!(matches!(file.stream(), Err(Error::UploadAlreadyMoved { .. })));
}

#[test]
fn test_scheme_marked_target_is_written_by_copy() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("upload.tmp");
    fs::write(&source, b"payload").unwrap();
    // A directory whose name ends in a colon makes `tag://` a resolvable
    // path that still carries the scheme marker.
    fs::create_dir(dir.path().join("tag:")).unwrap();

    let mut file = UploadedFile::new(
        &source,
        Some(String::from("payload.bin")),
        None,
        Some(7),
        UploadErrorCode::Ok,
    );
    let target = format!("{}/tag://payload.bin", dir.path().display());
    file.move_to(&target).unwrap();

    assert!(file.is_moved());
    assert_eq!(
        fs::read(dir.path().join("tag:").join("payload.bin")).unwrap(),
        b"payload"
    );
    assert!(!source.exists());
}

#[test]
fn test_failed_rename_leaves_the_handle_pending() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = UploadedFile::new(
        dir.path().join("vanished.tmp"),
        Some(String::from("v.bin")),
        None,
        None,
        UploadErrorCode::Ok,
    );

    let err = file.move_to(dir.path().join("target.bin")).unwrap_err();
    assert!(matches!(err, Error::UploadMoveFailed { .. }));
    assert!(!file.is_moved());
    assert!(err.to_string().contains("v.bin"));
}
