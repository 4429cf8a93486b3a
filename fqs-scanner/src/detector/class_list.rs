//! Class id to label lookup
//!
//! Loaded once at startup from a YOLO dataset file (`data.yaml`), whose
//! `names` entry is either a list or an id-keyed map.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use super::DetectorError;

const BUILTIN_FRUITS: &[&str] = &["Banana", "Mango", "Cashew", "Cacao", "Pineapple"];
const BUILTIN_STAGES: &[&str] = &["Unripe", "Ripe", "Overripe"];

#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    names: Option<Names>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Names {
    List(Vec<String>),
    Map(BTreeMap<i64, String>),
}

/// Detector class labels indexed by class id
#[derive(Debug, Clone, PartialEq)]
pub struct ClassList {
    names: BTreeMap<i64, String>,
}

impl ClassList {
    /// 15 classes: each fruit in Unripe, Ripe, Overripe order
    pub fn builtin() -> Self {
        let names = BUILTIN_FRUITS
            .iter()
            .flat_map(|fruit| BUILTIN_STAGES.iter().map(move |stage| format!("{} {}", fruit, stage)))
            .enumerate()
            .map(|(id, name)| (id as i64, name))
            .collect();
        Self { names }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (id as i64, name.into()))
                .collect(),
        }
    }

    /// Parse a dataset YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self, DetectorError> {
        let dataset: DatasetFile = serde_yaml::from_str(content)
            .map_err(|e| DetectorError::ClassList(format!("Invalid YAML: {}", e)))?;

        let names = match dataset.names {
            Some(Names::List(list)) => Self::from_names(list).names,
            Some(Names::Map(map)) => map,
            None => return Err(DetectorError::ClassList("Missing 'names' entry".to_string())),
        };

        if names.is_empty() {
            return Err(DetectorError::ClassList("Empty 'names' entry".to_string()));
        }
        Ok(Self { names })
    }

    /// Load the class list, falling back to [`ClassList::builtin`]
    pub fn load_or_builtin(path: &Path) -> Self {
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| DetectorError::ClassList(format!("Read {} failed: {}", path.display(), e)))
            .and_then(|content| Self::from_yaml_str(&content));

        match loaded {
            Ok(list) => {
                info!("Loaded {} classes from {}", list.len(), path.display());
                list
            }
            Err(e) => {
                warn!("{}; using built-in 15-class table", e);
                Self::builtin()
            }
        }
    }

    /// Label for a class id, `Class_<id>` when unknown
    pub fn name(&self, class_id: i64) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| format!("Class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let classes = ClassList::builtin();
        assert_eq!(classes.len(), 15);
        assert_eq!(classes.name(0), "Banana Unripe");
        assert_eq!(classes.name(4), "Mango Ripe");
        assert_eq!(classes.name(14), "Pineapple Overripe");
        assert_eq!(classes.name(15), "Class_15");
    }

    #[test]
    fn test_yaml_list() {
        let classes = ClassList::from_yaml_str("nc: 2\nnames: ['Apple Ripe', 'Apple Rotten']\n").unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes.name(1), "Apple Rotten");
    }

    #[test]
    fn test_yaml_map() {
        let classes = ClassList::from_yaml_str("names:\n  0: Kiwi Unripe\n  3: Kiwi Ripe\n").unwrap();
        assert_eq!(classes.name(0), "Kiwi Unripe");
        assert_eq!(classes.name(3), "Kiwi Ripe");
        assert_eq!(classes.name(1), "Class_1");
    }

    #[test]
    fn test_yaml_without_names_is_error() {
        assert!(ClassList::from_yaml_str("nc: 3\n").is_err());
        assert!(ClassList::from_yaml_str("names: []\n").is_err());
        assert!(ClassList::from_yaml_str("names: [unclosed").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let classes = ClassList::load_or_builtin(Path::new("/nonexistent/data.yaml"));
        assert_eq!(classes, ClassList::builtin());
    }
}
