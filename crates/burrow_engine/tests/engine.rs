//! Integration tests for the bundled engine over real directories.

use burrow_engine::{
    Db, Engine, EngineCursor, EngineError, EngineOptions, MemoryLog, WriteBatchRep,
    PROPERTY_NUM_ENTRIES, PROPERTY_SEQUENCE,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::tempdir;

fn forward(cursor: &mut dyn EngineCursor) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    cursor.seek_to_first();
    while cursor.valid() {
        out.push((cursor.key().unwrap().to_vec(), cursor.value().unwrap().to_vec()));
        cursor.next();
    }
    out
}

fn backward(cursor: &mut dyn EngineCursor) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    cursor.seek_to_last();
    while cursor.valid() {
        out.push((cursor.key().unwrap().to_vec(), cursor.value().unwrap().to_vec()));
        cursor.prev();
    }
    out
}

#[test]
fn data_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    {
        let db = Db::open(&path, EngineOptions::default()).unwrap();
        db.put(b"a", b"1").unwrap();
        db.put(b"b", b"2").unwrap();
        db.delete(b"a").unwrap();
        db.close().unwrap();
    }

    let db = Db::open(&path, EngineOptions::default()).unwrap();
    assert_eq!(db.get(b"a").unwrap(), None);
    assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(db.path(), Some(path.as_path()));
}

#[test]
fn data_survives_drop_without_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    {
        let db = Db::open(&path, EngineOptions::default()).unwrap();
        let mut batch = WriteBatchRep::new();
        batch.put(b"x", b"1");
        batch.put(b"y", b"2");
        db.apply(&batch).unwrap();
    }

    let db = Db::open(&path, EngineOptions::default()).unwrap();
    assert_eq!(db.property(PROPERTY_NUM_ENTRIES).as_deref(), Some("2"));
}

#[test]
fn writes_after_reopen_continue_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    {
        let db = Db::open(&path, EngineOptions::default()).unwrap();
        db.put(b"k", b"v1").unwrap();
        db.put(b"k", b"v2").unwrap();
    }

    let db = Db::open(&path, EngineOptions::default()).unwrap();
    let before: u64 = db.property(PROPERTY_SEQUENCE).unwrap().parse().unwrap();
    db.put(b"k", b"v3").unwrap();
    assert_eq!(db.sequence(), before + 1);
    drop(db);

    let db = Db::open(&path, EngineOptions::default()).unwrap();
    assert_eq!(db.get(b"k").unwrap(), Some(b"v3".to_vec()));
}

#[test]
fn second_connection_is_locked_out() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    let first = Db::open(&path, EngineOptions::default()).unwrap();
    let second = Db::open(&path, EngineOptions::default());
    assert!(matches!(second, Err(EngineError::Locked { .. })));

    first.close().unwrap();
    assert!(Db::open(&path, EngineOptions::default()).is_ok());
}

#[test]
fn open_flags_are_honoured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    let no_create = EngineOptions {
        create_if_missing: false,
        ..EngineOptions::default()
    };
    assert!(matches!(
        Db::open(&path, no_create.clone()),
        Err(EngineError::NotFound { .. })
    ));

    drop(Db::open(&path, EngineOptions::default()).unwrap());
    assert!(Db::open(&path, no_create).is_ok());

    let exclusive = EngineOptions {
        error_if_exists: true,
        ..EngineOptions::default()
    };
    assert!(matches!(
        Db::open(&path, exclusive),
        Err(EngineError::AlreadyExists { .. })
    ));
}

#[test]
fn torn_tail_is_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store");

    {
        let db = Db::open(&path, EngineOptions::default()).unwrap();
        db.put(b"kept", b"v").unwrap();
        db.close().unwrap();
    }
    let mut log = OpenOptions::new()
        .append(true)
        .open(path.join("LOG"))
        .unwrap();
    log.write_all(b"BLOG\x01\x00\x01\xff\x00").unwrap();
    drop(log);

    let db = Db::open(&path, EngineOptions::default()).unwrap();
    assert_eq!(db.get(b"kept").unwrap(), Some(b"v".to_vec()));
    db.put(b"after", b"w").unwrap();
    drop(db);

    let db = Db::open(&path, EngineOptions::default()).unwrap();
    assert_eq!(db.get(b"after").unwrap(), Some(b"w".to_vec()));
}

#[test]
fn paranoid_checks_refuse_damaged_log() {
    let mut raw = {
        let log = MemoryLog::new();
        let db = Db::open_with_log(EngineOptions::default(), Box::new(log.clone())).unwrap();
        db.put(b"k", b"v").unwrap();
        db.close().unwrap();
        log.data()
    };
    let last = raw.len() - 1;
    raw[last] ^= 0xff;

    let paranoid = EngineOptions {
        paranoid_checks: true,
        ..EngineOptions::default()
    };
    let result = Db::open_with_log(paranoid, Box::new(MemoryLog::with_data(raw.clone())));
    assert!(matches!(result, Err(EngineError::Corruption(_))));

    let db = Db::open_with_log(EngineOptions::default(), Box::new(MemoryLog::with_data(raw))).unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);
}

#[test]
fn snapshot_survives_heavy_overwrites() {
    let db = Db::open_in_memory(EngineOptions::default()).unwrap();
    for i in 0..50u32 {
        db.put(&i.to_be_bytes(), b"before").unwrap();
    }

    let snapshot = db.snapshot().unwrap();
    for round in 0..5u8 {
        for i in 0..50u32 {
            if i % 2 == 0 {
                db.delete(&i.to_be_bytes()).unwrap();
            } else {
                db.put(&i.to_be_bytes(), &[round]).unwrap();
            }
        }
    }

    let mut cursor = snapshot.cursor();
    let seen = forward(cursor.as_mut());
    assert_eq!(seen.len(), 50);
    assert!(seen.iter().all(|(_, v)| v == b"before"));
    assert_eq!(db.property(PROPERTY_NUM_ENTRIES).as_deref(), Some("25"));
}

#[derive(Debug, Clone)]
enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
    Batch(Vec<(Vec<u8>, Option<Vec<u8>>)>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 0..3)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let value = prop::collection::vec(any::<u8>(), 0..4);
    prop_oneof![
        (key_strategy(), value.clone()).prop_map(|(k, v)| Op::Put(k, v)),
        key_strategy().prop_map(Op::Delete),
        prop::collection::vec((key_strategy(), prop::option::of(value)), 0..5).prop_map(Op::Batch),
    ]
}

fn apply_to_model(model: &mut BTreeMap<Vec<u8>, Vec<u8>>, op: &Op) {
    match op {
        Op::Put(k, v) => {
            model.insert(k.clone(), v.clone());
        }
        Op::Delete(k) => {
            model.remove(k);
        }
        Op::Batch(ops) => {
            for (k, v) in ops {
                match v {
                    Some(v) => model.insert(k.clone(), v.clone()),
                    None => model.remove(k),
                };
            }
        }
    }
}

fn apply_to_db(db: &Db, op: &Op) {
    match op {
        Op::Put(k, v) => db.put(k, v).unwrap(),
        Op::Delete(k) => db.delete(k).unwrap(),
        Op::Batch(ops) => {
            let mut batch = WriteBatchRep::new();
            for (k, v) in ops {
                match v {
                    Some(v) => batch.put(k, v),
                    None => batch.delete(k),
                }
            }
            db.apply(&batch).unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_ordered_map_model(
        before in prop::collection::vec(op_strategy(), 0..30),
        after in prop::collection::vec(op_strategy(), 0..30),
    ) {
        let log = MemoryLog::new();
        let db = Db::open_with_log(EngineOptions::default(), Box::new(log.clone())).unwrap();
        let mut model = BTreeMap::new();

        for op in &before {
            apply_to_db(&db, op);
            apply_to_model(&mut model, op);
        }

        let mut cursor = db.cursor_open().unwrap();
        let frozen: Vec<_> = model.clone().into_iter().collect();

        for op in &after {
            apply_to_db(&db, op);
            apply_to_model(&mut model, op);
        }

        prop_assert_eq!(forward(cursor.as_mut()), frozen.clone());
        let mut reversed = frozen;
        reversed.reverse();
        prop_assert_eq!(backward(cursor.as_mut()), reversed);

        let current: Vec<_> = model.clone().into_iter().collect();
        let mut fresh = db.cursor_open().unwrap();
        prop_assert_eq!(forward(fresh.as_mut()), current.clone());
        for (k, v) in &model {
            prop_assert_eq!(db.get(k).unwrap(), Some(v.clone()));
        }

        drop(cursor);
        drop(fresh);
        db.close().unwrap();
        let reopened = Db::open_with_log(EngineOptions::default(), Box::new(log)).unwrap();
        let mut cursor = reopened.cursor_open().unwrap();
        prop_assert_eq!(forward(cursor.as_mut()), current);
    }
}
