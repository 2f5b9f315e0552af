//! Multi-version ordered map.
//!
//! Every write is stamped with a sequence number. A reader pinned at
//! sequence `s` sees, for each key, the newest version with `seq <= s`.
//! A version is dropped once no pinned reader can still select it.

use crate::batch::BatchOp;
use crate::Sequence;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// One version of a key. `None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Version {
    seq: Sequence,
    value: Option<Vec<u8>>,
}

/// Ordered map from key to its versions, oldest first.
#[derive(Debug, Default)]
pub(crate) struct VersionedMap {
    entries: BTreeMap<Vec<u8>, Vec<Version>>,
    /// Keys holding versions that a higher floor would release.
    stale: BTreeSet<Vec<u8>>,
}

impl VersionedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write of `key` at `seq`.
    ///
    /// `floor` is the oldest sequence any reader may still be pinned at.
    /// Among the versions at or below it only the newest is kept.
    pub fn insert(&mut self, key: &[u8], seq: Sequence, value: Option<Vec<u8>>, floor: Sequence) {
        let versions = self.entries.entry(key.to_vec()).or_default();
        match versions.last_mut() {
            // Same batch touching the key again: last operation wins.
            Some(last) if last.seq == seq => last.value = value,
            _ => versions.push(Version { seq, value }),
        }

        let gone = prune(versions, floor);
        let stale = !gone && reclaimable(versions);
        if gone {
            self.entries.remove(key);
        }
        if stale {
            self.stale.insert(key.to_vec());
        } else {
            self.stale.remove(key);
        }
    }

    /// Prunes every key whose old versions `floor` no longer protects.
    ///
    /// Called when the oldest reader goes away. Returns the number of
    /// versions released.
    pub fn sweep(&mut self, floor: Sequence) -> usize {
        let entries = &mut self.entries;
        let mut freed = 0;
        self.stale.retain(|key| {
            let Some(versions) = entries.get_mut(key) else {
                return false;
            };
            let before = versions.len();
            if prune(versions, floor) {
                entries.remove(key);
                freed += before;
                return false;
            }
            freed += before - versions.len();
            reclaimable(versions)
        });
        freed
    }

    /// Applies a batch at one sequence.
    pub fn apply(&mut self, ops: &[BatchOp], seq: Sequence, floor: Sequence) {
        for op in ops {
            match op {
                BatchOp::Put { key, value } => self.insert(key, seq, Some(value.clone()), floor),
                BatchOp::Delete { key } => self.insert(key, seq, None, floor),
            }
        }
    }

    /// Value of `key` as of `seq`.
    pub fn get(&self, key: &[u8], seq: Sequence) -> Option<&[u8]> {
        self.entries
            .get(key)
            .and_then(|versions| visible(versions, seq))
    }

    /// Smallest visible entry with key `>= target`.
    pub fn seek(&self, target: &[u8], seq: Sequence) -> Option<(&[u8], &[u8])> {
        self.first_visible(
            self.entries
                .range::<[u8], _>((Bound::Included(target), Bound::Unbounded)),
            seq,
        )
    }

    /// Smallest visible entry with key `> key`.
    pub fn after(&self, key: &[u8], seq: Sequence) -> Option<(&[u8], &[u8])> {
        self.first_visible(
            self.entries
                .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded)),
            seq,
        )
    }

    /// Largest visible entry with key `< key`.
    pub fn before(&self, key: &[u8], seq: Sequence) -> Option<(&[u8], &[u8])> {
        self.first_visible(
            self.entries
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
                .rev(),
            seq,
        )
    }

    /// Smallest visible entry.
    pub fn first(&self, seq: Sequence) -> Option<(&[u8], &[u8])> {
        self.first_visible(self.entries.iter(), seq)
    }

    /// Largest visible entry.
    pub fn last(&self, seq: Sequence) -> Option<(&[u8], &[u8])> {
        self.first_visible(self.entries.iter().rev(), seq)
    }

    /// Every visible entry in key order.
    pub fn live_entries(&self, seq: Sequence) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .filter_map(move |(key, versions)| {
                visible(versions, seq).map(|value| (key.as_slice(), value))
            })
    }

    fn first_visible<'a>(
        &'a self,
        iter: impl Iterator<Item = (&'a Vec<u8>, &'a Vec<Version>)>,
        seq: Sequence,
    ) -> Option<(&'a [u8], &'a [u8])> {
        iter.filter_map(|(key, versions)| {
            visible(versions, seq).map(|value| (key.as_slice(), value))
        })
        .next()
    }

    #[cfg(test)]
    fn version_count(&self, key: &[u8]) -> usize {
        self.entries.get(key).map_or(0, Vec::len)
    }

    /// Versions held across all keys, tombstones included.
    #[cfg(test)]
    pub(crate) fn total_versions(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Drops versions no reader at or above `floor` can select.
///
/// Returns true when what is left is a tombstone nobody can see past,
/// so the whole key can go.
fn prune(versions: &mut Vec<Version>, floor: Sequence) -> bool {
    if let Some(keep_from) = versions.iter().rposition(|v| v.seq <= floor) {
        versions.drain(..keep_from);
    }
    matches!(versions.as_slice(), [only] if only.value.is_none() && only.seq <= floor)
}

/// Whether a later floor could release any of these versions.
fn reclaimable(versions: &[Version]) -> bool {
    versions.len() > 1 || versions.iter().any(|v| v.value.is_none())
}

fn visible(versions: &[Version], seq: Sequence) -> Option<&[u8]> {
    versions
        .iter()
        .rev()
        .find(|v| v.seq <= seq)
        .and_then(|v| v.value.as_deref())
}

/// Reference-counted set of pinned sequences.
#[derive(Debug, Default)]
pub(crate) struct Pins {
    counts: BTreeMap<Sequence, usize>,
}

impl Pins {
    pub fn pin(&mut self, seq: Sequence) {
        *self.counts.entry(seq).or_insert(0) += 1;
    }

    pub fn unpin(&mut self, seq: Sequence) {
        if let Some(count) = self.counts.get_mut(&seq) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&seq);
            }
        }
    }

    /// Oldest pinned sequence.
    pub fn oldest(&self) -> Option<Sequence> {
        self.counts.keys().next().copied()
    }

    /// Number of live pins.
    pub fn len(&self) -> usize {
        self.counts.values().sum()
    }
}
