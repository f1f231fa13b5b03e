// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The Backend Adapter: one interface (open/snapshot/batch/close/destroy)
//! over the B+-tree (LMDB, via `heed`) and LSM (RocksDB) stores.

mod backend;
mod bplus;
mod error;
mod lsm;

pub use backend::{destroy_path, open, Backend, Batch, Kind, OpenOptions, Snapshot};
pub use error::StorageError;

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_for(kind: Kind) {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(kind, dir.path(), &OpenOptions::default()).unwrap();

        {
            let mut batch = backend.begin_batch().unwrap();
            batch.put(b"a", b"1");
            batch.put(b"b", b"2");
            batch.commit().unwrap();
        }

        let snap = backend.new_snapshot().unwrap();
        assert_eq!(snap.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(snap.get(b"missing").unwrap(), None);

        let mut items: Vec<_> = snap.iter().unwrap().collect();
        items.sort();
        assert_eq!(items, vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())]);

        drop(snap);
        backend.destroy().unwrap();
        assert!(!dir.path().exists());
    }

    #[test]
    fn bplus_roundtrip() {
        roundtrip_for(Kind::BPlus);
    }

    #[test]
    fn lsm_roundtrip() {
        roundtrip_for(Kind::Lsm);
    }

    #[test]
    fn snapshot_is_point_in_time() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(Kind::Lsm, dir.path(), &OpenOptions::default()).unwrap();

        {
            let mut batch = backend.begin_batch().unwrap();
            batch.put(b"a", b"1");
            batch.commit().unwrap();
        }

        let snap = backend.new_snapshot().unwrap();

        {
            let mut batch = backend.begin_batch().unwrap();
            batch.put(b"a", b"2");
            batch.commit().unwrap();
        }

        // The snapshot was taken before the second write, so it must still
        // observe the old value.
        assert_eq!(snap.get(b"a").unwrap(), Some(b"1".to_vec()));

        let fresh = backend.new_snapshot().unwrap();
        assert_eq!(fresh.get(b"a").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn rebuild_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let backend = open(Kind::Lsm, dir.path(), &OpenOptions::default()).unwrap();
        {
            let mut batch = backend.begin_batch().unwrap();
            batch.put(b"a", b"1");
            batch.commit().unwrap();
        }
        let backend = backend.rebuild().unwrap();
        let snap = backend.new_snapshot().unwrap();
        assert_eq!(snap.get(b"a").unwrap(), None);
    }

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(Kind::from_str(Kind::BPlus.as_str()), Some(Kind::BPlus));
        assert_eq!(Kind::from_str(Kind::Lsm.as_str()), Some(Kind::Lsm));
        assert_eq!(Kind::from_str("nonsense"), None);
    }
}
