//! Path-keyed sample table shared by every context of a `TimeBlock`

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Separator used when a path is rendered for humans and in the report.
pub const PATH_SEPARATOR: &str = " > ";

/// Ordered labels from the outermost to the innermost scope, root excluded.
///
/// Ordering is lexicographic over the label sequence, which is the order rows
/// appear in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallPath(Vec<String>);

impl CallPath {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The path one level up. Empty for top-level and empty paths.
    pub fn parent(&self) -> Self {
        let end = self.0.len().saturating_sub(1);
        Self(self.0[..end].to_vec())
    }

    /// The first two labels: the "root call" percent-of-total is taken against.
    pub fn root_call(&self) -> Self {
        let end = self.0.len().min(2);
        Self(self.0[..end].to_vec())
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(PATH_SEPARATOR))
    }
}

impl<S: Into<String>> FromIterator<S> for CallPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// One observation taken when a scope exits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock seconds between enter and exit
    pub duration: f64,
    /// Resident memory at exit minus at entry, in bytes
    pub mem_delta: i64,
}

impl Sample {
    pub fn new(duration: f64, mem_delta: i64) -> Self {
        Self {
            duration,
            mem_delta,
        }
    }
}

/// Deep copy of a store's contents, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<StatsEntry>", into = "Vec<StatsEntry>")]
pub struct StatsSnapshot(BTreeMap<CallPath, Vec<Sample>>);

/// Wire form of one snapshot row. Paths are sequences, so the map is carried
/// as a list for formats that only allow string keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsEntry {
    pub path: CallPath,
    pub samples: Vec<Sample>,
}

impl From<Vec<StatsEntry>> for StatsSnapshot {
    fn from(entries: Vec<StatsEntry>) -> Self {
        let mut map: BTreeMap<CallPath, Vec<Sample>> = BTreeMap::new();
        for entry in entries {
            map.entry(entry.path).or_default().extend(entry.samples);
        }
        Self(map)
    }
}

impl From<StatsSnapshot> for Vec<StatsEntry> {
    fn from(snapshot: StatsSnapshot) -> Self {
        snapshot
            .0
            .into_iter()
            .map(|(path, samples)| StatsEntry { path, samples })
            .collect()
    }
}

impl StatsSnapshot {
    pub fn get(&self, path: &CallPath) -> Option<&[Sample]> {
        self.0.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &CallPath) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CallPath, &[Sample])> {
        self.0.iter().map(|(path, samples)| (path, samples.as_slice()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &CallPath> {
        self.0.keys()
    }

    /// Number of distinct paths
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total samples across all paths
    pub fn sample_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Append `sample` under `path`; used to assemble snapshots by hand.
    pub fn push(&mut self, path: CallPath, sample: Sample) {
        self.0.entry(path).or_default().push(sample);
    }
}

impl FromIterator<(CallPath, Vec<Sample>)> for StatsSnapshot {
    fn from_iter<I: IntoIterator<Item = (CallPath, Vec<Sample>)>>(iter: I) -> Self {
        let mut snapshot = Self::default();
        for (path, samples) in iter {
            snapshot.0.entry(path).or_default().extend(samples);
        }
        snapshot
    }
}

/// Thread-safe `CallPath -> [Sample]` table.
///
/// Every operation takes the one lock, so a `snapshot` sees a `record` or
/// `merge` either entirely or not at all.
#[derive(Debug, Default)]
pub struct StatsStore {
    inner: Mutex<FxHashMap<CallPath, Vec<Sample>>>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample; samples keep completion order per path.
    pub fn record(&self, path: CallPath, sample: Sample) {
        self.inner.lock().entry(path).or_default().push(sample);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let stats = self.inner.lock();
        StatsSnapshot(
            stats
                .iter()
                .map(|(path, samples)| (path.clone(), samples.clone()))
                .collect(),
        )
    }

    /// Append foreign samples under their own paths, after any existing ones.
    pub fn merge(&self, other: &StatsSnapshot) {
        let mut stats = self.inner.lock();
        for (path, samples) in other.iter() {
            stats
                .entry(path.clone())
                .or_default()
                .extend_from_slice(samples);
        }
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Replace the whole table with `snapshot`.
    pub fn restore(&self, snapshot: StatsSnapshot) {
        let mut stats = self.inner.lock();
        stats.clear();
        stats.extend(snapshot.0);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
