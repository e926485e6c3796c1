use rand::{rngs::StdRng, seq::index, SeedableRng};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, ClusterId},
};

/// Read-only table of songs tagged with their cluster
///
/// Loaded once at startup and shared by every request. Rows keep their file
/// order, and each cluster keeps the row indices that belong to it so sampling
/// does not rescan the table.
#[derive(Debug)]
pub struct CatalogDataset {
    entries: Vec<CatalogEntry>,
    by_cluster: HashMap<ClusterId, Vec<usize>>,
    fingerprint: u64,
}

impl CatalogDataset {
    /// Loads a JSON array of `{name, artists, cluster}` records
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ResourceUnavailable(format!(
                "A required file was not found: {}: {}",
                path.display(),
                e
            ))
        })?;

        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw).map_err(|e| {
            AppError::ResourceUnavailable(format!(
                "Dataset {} could not be parsed: {}",
                path.display(),
                e
            ))
        })?;

        if entries.is_empty() {
            return Err(AppError::ResourceUnavailable(format!(
                "Dataset {} has no rows",
                path.display()
            )));
        }

        let dataset = Self::from_entries(entries);

        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            clusters = dataset.by_cluster.len(),
            "Loaded catalog dataset"
        );

        Ok(dataset)
    }

    /// Builds a dataset from rows already in memory
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut by_cluster: HashMap<ClusterId, Vec<usize>> = HashMap::new();
        let mut hasher = Sha256::new();

        for (i, entry) in entries.iter().enumerate() {
            by_cluster.entry(entry.cluster).or_default().push(i);
            // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
            for field in [entry.name.as_bytes(), entry.artists.as_bytes()] {
                hasher.update((field.len() as u64).to_le_bytes());
                hasher.update(field);
            }
            hasher.update(entry.cluster.0.to_le_bytes());
        }

        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);

        Self {
            entries,
            by_cluster,
            fingerprint: u64::from_be_bytes(prefix),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 prefix over every row, used to address cached results
    ///
    /// Stable across builds and platforms, so Redis entries written by one
    /// deployment stay addressable from the next.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Row count per cluster, ordered by cluster id
    pub fn cluster_sizes(&self) -> BTreeMap<ClusterId, usize> {
        self.by_cluster
            .iter()
            .map(|(cluster, rows)| (*cluster, rows.len()))
            .collect()
    }

    pub fn contains_cluster(&self, cluster: ClusterId) -> bool {
        self.by_cluster.contains_key(&cluster)
    }

    /// All rows assigned to `cluster`, in file order
    pub fn in_cluster(&self, cluster: ClusterId) -> Vec<&CatalogEntry> {
        self.by_cluster
            .get(&cluster)
            .map(|rows| rows.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Picks `count` distinct rows of `cluster`
    ///
    /// The generator is seeded with `seed`, so the same (dataset, cluster,
    /// count, seed) always yields the same rows in the same order. Never
    /// returns a partial sample.
    pub fn sample(
        &self,
        cluster: ClusterId,
        count: usize,
        seed: u64,
    ) -> AppResult<Vec<&CatalogEntry>> {
        let candidates = self.in_cluster(cluster);

        if candidates.len() < count {
            return Err(AppError::InsufficientCandidates {
                cluster,
                requested: count,
                available: candidates.len(),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let picked = index::sample(&mut rng, candidates.len(), count);

        Ok(picked.into_iter().map(|i| candidates[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    fn create_test_dataset() -> CatalogDataset {
        let mut entries = Vec::new();
        for i in 0..25 {
            entries.push(CatalogEntry::new(
                format!("Song A{}", i),
                format!("['Artist {}']", i),
                ClusterId(0),
            ));
        }
        for i in 0..3 {
            entries.push(CatalogEntry::new(
                format!("Song B{}", i),
                "['Solo']",
                ClusterId(1),
            ));
        }
        CatalogDataset::from_entries(entries)
    }

    #[test]
    fn test_in_cluster_filters_rows() {
        let dataset = create_test_dataset();
        assert_eq!(dataset.in_cluster(ClusterId(0)).len(), 25);
        assert_eq!(dataset.in_cluster(ClusterId(1)).len(), 3);
        assert!(dataset.in_cluster(ClusterId(9)).is_empty());
        assert!(dataset
            .in_cluster(ClusterId(1))
            .iter()
            .all(|e| e.cluster == ClusterId(1)));
    }

    #[test]
    fn test_cluster_sizes() {
        let dataset = create_test_dataset();
        let sizes = dataset.cluster_sizes();
        assert_eq!(sizes.get(&ClusterId(0)), Some(&25));
        assert_eq!(sizes.get(&ClusterId(1)), Some(&3));
        assert_eq!(dataset.len(), 28);
    }

    #[test]
    fn test_sample_is_deterministic() {
        let dataset = create_test_dataset();
        let first = dataset.sample(ClusterId(0), 10, 42).unwrap();
        let second = dataset.sample(ClusterId(0), 10, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sample_has_no_duplicates() {
        let dataset = create_test_dataset();
        let sample = dataset.sample(ClusterId(0), 25, 42).unwrap();
        let names: HashSet<&str> = sample.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names.len(), 25);
    }

    #[test]
    fn test_sample_stays_in_cluster() {
        let dataset = create_test_dataset();
        let sample = dataset.sample(ClusterId(1), 3, 42).unwrap();
        assert_eq!(sample.len(), 3);
        assert!(sample.iter().all(|e| e.cluster == ClusterId(1)));
    }

    #[test]
    fn test_sample_insufficient_candidates() {
        let dataset = create_test_dataset();
        let err = dataset.sample(ClusterId(1), 10, 42).unwrap_err();
        match err {
            AppError::InsufficientCandidates {
                cluster,
                requested,
                available,
            } => {
                assert_eq!(cluster, ClusterId(1));
                assert_eq!(requested, 10);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sample_unknown_cluster() {
        let dataset = create_test_dataset();
        assert!(matches!(
            dataset.sample(ClusterId(5), 1, 42),
            Err(AppError::InsufficientCandidates { available: 0, .. })
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = create_test_dataset();
        let b = create_test_dataset();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = CatalogDataset::from_entries(vec![CatalogEntry::new(
            "Other",
            "['Someone']",
            ClusterId(0),
        )]);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_stable_across_builds() {
        let dataset = CatalogDataset::from_entries(vec![CatalogEntry::new(
            "Jumpman",
            "['Drake', 'Future']",
            ClusterId(2),
        )]);

        let mut hasher = Sha256::new();
        hasher.update(7u64.to_le_bytes());
        hasher.update(b"Jumpman");
        hasher.update(19u64.to_le_bytes());
        hasher.update(b"['Drake', 'Future']");
        hasher.update(2u32.to_le_bytes());
        let digest = hasher.finalize();

        let expected = u64::from_be_bytes(digest[..8].try_into().unwrap());
        assert_eq!(dataset.fingerprint(), expected);
    }

    #[test]
    fn test_fingerprint_separates_fields() {
        let a = CatalogDataset::from_entries(vec![CatalogEntry::new("ab", "c", ClusterId(0))]);
        let b = CatalogDataset::from_entries(vec![CatalogEntry::new("a", "bc", ClusterId(0))]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"name": "Jumpman", "artists": "['Drake', 'Future']", "cluster": 2}},
                {{"name": "Hotline Bling", "artists": ["Drake"], "cluster": 2, "energy": 0.62}}
            ]"#
        )
        .unwrap();

        let dataset = CatalogDataset::load(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(dataset.contains_cluster(ClusterId(2)));
        assert_eq!(dataset.in_cluster(ClusterId(2))[1].artists, "Drake");
    }

    #[test]
    fn test_load_missing_file() {
        let err = CatalogDataset::load("/nonexistent/catalog.json").unwrap_err();
        assert!(matches!(err, AppError::ResourceUnavailable(_)));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = CatalogDataset::load(file.path()).unwrap_err();
        assert!(matches!(err, AppError::ResourceUnavailable(_)));
    }

    #[test]
    fn test_load_empty_dataset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        let err = CatalogDataset::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }
}
