//! Herb ordering table.
//!
//! Final dispensing lists are printed in herb-catalog order. The table maps
//! herb names to their catalog id; herbs missing from it sort last.

use crate::types::UNMATCHED_SORT_KEY;
use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Row of the herb table export (`id,name`)
#[derive(Debug, Deserialize)]
struct HerbRow {
    id: i64,
    name: String,
}

/// Maps herb names to sort keys
#[derive(Clone, Debug, Default)]
pub struct HerbOrder {
    keys: HashMap<String, i64>,
}

impl HerbOrder {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            keys: pairs
                .into_iter()
                .map(|(name, id)| (name.into(), id))
                .collect(),
        }
    }

    /// Load the table from a CSV file with `id,name` headers
    ///
    /// A name listed twice keeps its first id, as lookups in the herb
    /// table return the lowest id first.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

        let mut keys = HashMap::new();
        for row in reader.deserialize::<HerbRow>() {
            let row = row?;
            keys.entry(row.name).or_insert(row.id);
        }

        tracing::info!("Loaded {} herbs from {:?}", keys.len(), path);
        Ok(Self { keys })
    }

    /// Sort key for a herb, `UNMATCHED_SORT_KEY` if unknown
    pub fn sort_key(&self, name: &str) -> i64 {
        self.keys.get(name).copied().unwrap_or(UNMATCHED_SORT_KEY)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_herb_sorts_last() {
        let order = HerbOrder::from_pairs([("인삼", 3)]);
        assert_eq!(order.sort_key("인삼"), 3);
        assert_eq!(order.sort_key("녹용"), UNMATCHED_SORT_KEY);
    }

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,name").unwrap();
        writeln!(file, "1, 감초").unwrap();
        writeln!(file, "2,인삼").unwrap();
        writeln!(file, "9,감초").unwrap();

        let order = HerbOrder::load_csv(file.path()).unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order.sort_key("감초"), 1);
        assert_eq!(order.sort_key("인삼"), 2);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = HerbOrder::load_csv(Path::new("/nonexistent/herbs.csv"));
        assert!(result.is_err());
    }
}
