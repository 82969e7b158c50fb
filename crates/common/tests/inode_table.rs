//! Integration tests for InodeTable mapping operations

mod common;

use std::path::PathBuf;

use ::common::inode::{InodeError, TableState, ROOT_HANDLE};

#[test]
fn test_root_persistence() {
    let table = common::setup_table();

    assert_eq!(table.root_handle(), ROOT_HANDLE);
    assert_eq!(table.root_path(), PathBuf::from(common::ROOT).as_path());
    assert_eq!(
        table.lookup_handle(&PathBuf::from(common::ROOT)).unwrap(),
        ROOT_HANDLE
    );
    assert_eq!(
        table.lookup_path(ROOT_HANDLE).unwrap(),
        PathBuf::from(common::ROOT)
    );
    assert_eq!(table.len(), 1);
}

#[test]
fn test_handle_zero_is_never_issued() {
    let table = common::setup_table();
    for _ in 0..64 {
        assert_ne!(table.allocate().unwrap(), 0);
    }
}

#[test]
fn test_rename_scenario() {
    let table = common::setup_table();
    let file = common::path("file.txt");
    let other = common::path("other.txt");
    let renamed = common::path("renamed.txt");

    table.map(2, &file).unwrap();

    // Handle 2 is busy
    let err = table.map(2, &other).unwrap_err();
    assert_eq!(err, InodeError::AlreadyMappedHandle(2));
    assert_eq!(table.lookup_path(2).unwrap(), file);
    assert!(table.lookup_handle(&other).unwrap_err().is_not_found());

    table.remap(2, &file, &renamed).unwrap();
    assert_eq!(
        table.lookup_handle(&file),
        Err(InodeError::NotFoundPath(file.clone()))
    );
    assert_eq!(table.lookup_handle(&renamed).unwrap(), 2);
    assert_eq!(table.lookup_path(2).unwrap(), renamed);

    table.unmap(2, &renamed, true).unwrap();
    assert_eq!(table.lookup_path(2), Err(InodeError::NotFoundHandle(2)));
    assert_eq!(table.free_handles(), 1);
    assert_eq!(table.allocate().unwrap(), 2);
}

#[test]
fn test_duplicate_map_leaves_table_unchanged() {
    let table = common::setup_table();
    let a = common::path("a");
    let b = common::path("b");
    table.map(2, &a).unwrap();
    table.map(3, &b).unwrap();

    assert!(table.map(2, &common::path("c")).unwrap_err().is_already_mapped());
    assert!(table.map(3, &a).unwrap_err().is_already_mapped());

    assert_eq!(table.len(), 3);
    assert_eq!(table.lookup_path(2).unwrap(), a);
    assert_eq!(table.lookup_path(3).unwrap(), b);
    assert!(table.lookup_handle(&common::path("c")).is_err());
}

#[test]
fn test_rollback_on_path_conflict() {
    let table = common::setup_table();
    let shared = common::path("shared");
    table.map(2, &shared).unwrap();

    let err = table.map(5, &shared).unwrap_err();
    assert_eq!(err, InodeError::AlreadyMappedPath(shared.clone()));

    // The partial forward insert was undone, the original pair is intact
    assert_eq!(table.lookup_path(5), Err(InodeError::NotFoundHandle(5)));
    assert_eq!(table.lookup_handle(&shared).unwrap(), 2);
    assert_eq!(table.lookup_path(2).unwrap(), shared);
    assert_eq!(table.len(), 2);

    // And handle 5 is still free to use
    table.map(5, &common::path("other")).unwrap();
}

#[test]
fn test_handle_not_recycled_before_unmap() {
    let table = common::setup_table();
    let a = common::path("a");
    let handle = table.get_or_map(&a).unwrap();

    for _ in 0..32 {
        assert_ne!(table.allocate().unwrap(), handle);
    }

    table.unmap(handle, &a, true).unwrap();
    assert_eq!(table.allocate().unwrap(), handle);
}

#[test]
fn test_unmap_stale_view_is_invalid_mapping() {
    let table = common::setup_table();
    let a = common::path("a");
    table.map(2, &a).unwrap();
    table.unmap(2, &a, true).unwrap();

    let err = table.unmap(2, &a, true).unwrap_err();
    assert_eq!(
        err,
        InodeError::InvalidMapping {
            handle: 2,
            path: a.clone()
        }
    );
    // The failed unmap did not release the handle a second time
    assert_eq!(table.free_handles(), 1);
}

#[test]
fn test_remap_to_same_path_is_noop() {
    let table = common::setup_table();
    let a = common::path("a");
    table.map(2, &a).unwrap();
    table.remap(2, &a, &a).unwrap();
    assert_eq!(table.lookup_handle(&a).unwrap(), 2);
    assert_eq!(table.len(), 2);
}

#[test]
fn test_remap_with_stale_old_path_fails() {
    let table = common::setup_table();
    let a = common::path("a");
    table.map(2, &a).unwrap();

    let err = table
        .remap(2, &common::path("wrong"), &common::path("b"))
        .unwrap_err();
    assert!(matches!(err, InodeError::InvalidMapping { handle: 2, .. }));
    assert_eq!(table.lookup_path(2).unwrap(), a);
}

#[test]
fn test_get_or_map_is_stable() {
    let table = common::setup_table();
    let a = common::path("a");
    let first = table.get_or_map(&a).unwrap();
    let second = table.get_or_map(&a).unwrap();
    assert_eq!(first, second);
    assert_eq!(table.get_or_map(&PathBuf::from(common::ROOT)).unwrap(), ROOT_HANDLE);
}

#[test]
fn test_evict_recycles_handle() {
    let table = common::setup_table();
    let a = common::path("a");
    let handle = table.get_or_map(&a).unwrap();

    assert_eq!(table.evict(&a).unwrap(), handle);
    assert!(table.lookup_handle(&a).unwrap_err().is_not_found());
    assert_eq!(table.get_or_map(&common::path("b")).unwrap(), handle);
    assert_eq!(
        table.evict(&a),
        Err(InodeError::NotFoundPath(a.clone()))
    );
}

#[test]
fn test_bijection_over_mixed_sequence() {
    let table = common::setup_table();
    let mut live = Vec::new();

    for i in 0..50 {
        let path = common::path(&format!("f{}", i));
        let handle = table.get_or_map(&path).unwrap();
        live.push((handle, path));
    }
    // Rename the even ones, drop every third
    for (i, (handle, path)) in live.iter_mut().enumerate() {
        if i % 2 == 0 {
            let renamed = common::path(&format!("renamed-{}", i));
            table.remap(*handle, path, &renamed).unwrap();
            *path = renamed;
        }
    }
    let mut kept = Vec::new();
    for (i, (handle, path)) in live.into_iter().enumerate() {
        if i % 3 == 0 {
            table.unmap(handle, &path, true).unwrap();
        } else {
            kept.push((handle, path));
        }
    }

    assert_eq!(table.len(), kept.len() + 1);
    for (handle, path) in &kept {
        assert_eq!(&table.lookup_path(*handle).unwrap(), path);
        assert_eq!(table.lookup_handle(path).unwrap(), *handle);
        assert_eq!(
            &table.lookup_path(table.lookup_handle(path).unwrap()).unwrap(),
            path
        );
    }
}

#[test]
fn test_close_lifecycle() {
    let table = common::setup_table();
    assert_eq!(table.state(), TableState::Rooted);
    table.get_or_map(&common::path("a")).unwrap();
    assert_eq!(table.state(), TableState::Active);

    table.close();
    assert_eq!(table.state(), TableState::Closed);
    assert_eq!(
        table.lookup_path(ROOT_HANDLE),
        Err(InodeError::TableClosed)
    );
    assert_eq!(
        table.map(9, &common::path("z")),
        Err(InodeError::TableClosed)
    );
}
