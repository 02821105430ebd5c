use prost_reflect::FileDescriptor;
use std::collections::BTreeMap;
use std::collections::btree_map::{Keys, Values};

/// File name fragments identifying the schema of the reflection protocol itself.
///
/// Covers the upstream layout (`grpc/reflection/v1/reflection.proto`) as well as the flat
/// names used by `tonic-reflection` (`reflection_v1.proto`, `reflection_v1alpha.proto`).
/// A bare `reflection.proto` is not a marker: user files may carry that name.
pub const DEFAULT_REFLECTION_MARKERS: &[&str] = &[
    "grpc/reflection/",
    "reflection_v1.proto",
    "reflection_v1alpha.proto",
];

const REFLECTION_PACKAGE_PREFIX: &str = "grpc.reflection.";

/// Decides which files must never be part of a merged [`FileSet`].
///
/// A file is excluded when its name contains any of the configured markers, or when it declares
/// a package under `grpc.reflection`. Every service answers through reflection messages, so
/// these files are always structurally reachable and have to be dropped explicitly.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    markers: Vec<String>,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self {
            markers: DEFAULT_REFLECTION_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl ExclusionFilter {
    /// Adds an extra file name fragment to exclude, on top of the reflection defaults.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !marker.is_empty() && !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    /// Returns `true` if the file registered under `name` must be left out.
    pub fn is_excluded(&self, name: &str, file: &FileDescriptor) -> bool {
        self.markers.iter().any(|m| name.contains(m.as_str()))
            || file.package_name().starts_with(REFLECTION_PACKAGE_PREFIX)
    }
}

/// A set of schema files keyed by file name.
///
/// The file name is the only deduplication key: inserting a file whose name is already present
/// replaces the previous entry. Entries are kept ordered by name so that everything derived from
/// the set (listings, routing rules) is reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct FileSet(BTreeMap<String, FileDescriptor>);

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `file` under its own name.
    ///
    /// # Returns
    ///
    /// * `true` - If no file with that name was present yet.
    /// * `false` - If an existing entry was overwritten.
    pub fn insert(&mut self, file: FileDescriptor) -> bool {
        self.0.insert(file.name().to_string(), file).is_none()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FileDescriptor> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File names, in ascending order.
    pub fn names(&self) -> Keys<'_, String, FileDescriptor> {
        self.0.keys()
    }

    pub fn files(&self) -> Values<'_, String, FileDescriptor> {
        self.0.values()
    }

    /// Combines any number of partial results into a single set.
    ///
    /// Entries are visited in order and written under their name, so the last write wins.
    /// Entries rejected by `filter` are skipped.
    pub fn merge<I>(sets: I, filter: &ExclusionFilter) -> FileSet
    where
        I: IntoIterator<Item = FileSet>,
    {
        sets.into_iter()
            .flat_map(|set| set.0)
            .fold(FileSet::new(), |mut acc, (name, file)| {
                if filter.is_excluded(&name, &file) {
                    tracing::debug!(file = %name, "Skipping excluded file");
                } else {
                    acc.0.insert(name, file);
                }
                acc
            })
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = (&'a String, &'a FileDescriptor);
    type IntoIter = std::collections::btree_map::Iter<'a, String, FileDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
