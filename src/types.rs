use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::read_to_string;
use std::path::Path;

use crate::config::Options;
use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Item {
    pub id: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bin {
    pub id: String,
    /// Informational unless capacities are enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
}

/// A bottleneck assignment instance: place every item in exactly one bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub items: Vec<Item>,
    pub bins: Vec<Bin>,
    #[serde(default)]
    pub options: Options,
}

impl Item {
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Item {
            id: id.into(),
            weight,
        }
    }
}

impl Bin {
    pub fn new(id: impl Into<String>) -> Self {
        Bin {
            id: id.into(),
            capacity: None,
        }
    }

    pub fn with_capacity(id: impl Into<String>, capacity: f64) -> Self {
        Bin {
            id: id.into(),
            capacity: Some(capacity),
        }
    }
}

impl Problem {
    pub fn new(items: Vec<Item>, bins: Vec<Bin>) -> Self {
        Problem {
            items,
            bins,
            options: Options::default(),
        }
    }

    /// Items named `item1..` with the given weights, and `count` bins named `bin1..`.
    pub fn from_weights(weights: &[f64], count: usize) -> Self {
        let items = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Item::new(format!("item{}", i + 1), w))
            .collect();
        let bins = (1..=count).map(|n| Bin::new(format!("bin{n}"))).collect();
        Problem::new(items, bins)
    }

    /// Load a problem document. `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let buf = read_to_string(path).map_err(|err| ConfigurationError::Unreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Problem::from_json(&buf)
        } else {
            Problem::from_yaml(&buf)
        }
    }

    pub fn from_yaml(buf: &str) -> Result<Self, ConfigurationError> {
        serde_yaml::from_str(buf).map_err(|err| ConfigurationError::Malformed {
            reason: err.to_string(),
        })
    }

    pub fn from_json(buf: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(buf).map_err(|err| ConfigurationError::Malformed {
            reason: err.to_string(),
        })
    }

    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(|item| item.weight).sum()
    }

    /// Check the instance before a model is built from it.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.items.is_empty() {
            return Err(ConfigurationError::NoItems);
        }
        if self.bins.is_empty() {
            return Err(ConfigurationError::NoBins);
        }

        let mut seen = BTreeSet::new();
        for item in &self.items {
            if item.id.is_empty() {
                return Err(ConfigurationError::EmptyIdentifier);
            }
            if !seen.insert(item.id.as_str()) {
                return Err(ConfigurationError::DuplicateItem(item.id.clone()));
            }
            if !item.weight.is_finite() || item.weight < 0.0 {
                return Err(ConfigurationError::InvalidWeight {
                    item: item.id.clone(),
                    weight: item.weight,
                });
            }
        }

        // Item and bin identifiers live in separate namespaces
        let mut seen = BTreeSet::new();
        for bin in &self.bins {
            if bin.id.is_empty() {
                return Err(ConfigurationError::EmptyIdentifier);
            }
            if !seen.insert(bin.id.as_str()) {
                return Err(ConfigurationError::DuplicateBin(bin.id.clone()));
            }
            if let Some(capacity) = bin.capacity {
                if !capacity.is_finite() || capacity < 0.0 {
                    return Err(ConfigurationError::InvalidCapacity {
                        bin: bin.id.clone(),
                        capacity,
                    });
                }
            }
        }

        self.options.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Bottleneck;

    #[test]
    fn test_parse_yaml_with_options() {
        let yaml = r#"
items:
  - { id: box1, weight: 34 }
  - { id: box2, weight: 6.5 }
bins:
  - { id: truck1, capacity: 100 }
  - { id: truck2 }
options:
  objective: maximin
  enforce_capacities: true
"#;
        let problem = Problem::from_yaml(yaml).unwrap();
        assert_eq!(problem.items.len(), 2);
        assert_eq!(problem.items[1], Item::new("box2", 6.5));
        assert_eq!(problem.bins[0].capacity, Some(100.0));
        assert_eq!(problem.bins[1].capacity, None);
        assert_eq!(problem.options.objective, Bottleneck::Maximin);
        assert!(problem.options.enforce_capacities);
        assert!(problem.options.tighten_bounds);
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"items": [{"id": "a", "weight": 1}], "bins": [{"id": "x"}]}"#;
        let problem = Problem::from_json(json).unwrap();
        assert_eq!(problem.items[0].id, "a");
        assert_eq!(problem.options, Options::default());
    }

    #[test]
    fn test_malformed_document() {
        let err = Problem::from_yaml("items: 3").unwrap_err();
        assert_eq!(err.code(), "CONFIG_MALFORMED");
    }

    #[test]
    fn test_misspelled_bin_field_rejected() {
        let yaml = r#"
items:
  - { id: piano, weight: 250 }
bins:
  - { id: van, capacty: 200 }
options:
  enforce_capacities: true
"#;
        let err = Problem::from_yaml(yaml).unwrap_err();
        assert_eq!(err.code(), "CONFIG_MALFORMED");
        assert!(err.to_string().contains("capacty"));
    }

    #[test]
    fn test_misspelled_item_field_rejected() {
        let json = r#"{"items": [{"id": "a", "wieght": 1}], "bins": [{"id": "x"}]}"#;
        let err = Problem::from_json(json).unwrap_err();
        assert_eq!(err.code(), "CONFIG_MALFORMED");
    }

    #[test]
    fn test_missing_file() {
        let err = Problem::from_path("test_data/does-not-exist.yaml").unwrap_err();
        assert_eq!(err.code(), "CONFIG_UNREADABLE");
    }

    #[test]
    fn test_from_weights_names() {
        let problem = Problem::from_weights(&[1.0, 2.0], 3);
        assert_eq!(problem.items[1].id, "item2");
        assert_eq!(problem.bins.len(), 3);
        assert_eq!(problem.bins[2].id, "bin3");
        assert_eq!(problem.total_weight(), 3.0);
    }

    #[test]
    fn test_validate_rejects_empty_sets() {
        let problem = Problem::from_weights(&[], 2);
        assert_eq!(problem.validate(), Err(ConfigurationError::NoItems));

        let problem = Problem::from_weights(&[1.0], 0);
        assert_eq!(problem.validate(), Err(ConfigurationError::NoBins));
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let problem = Problem::from_weights(&[1.0, -0.5], 2);
        assert!(matches!(
            problem.validate(),
            Err(ConfigurationError::InvalidWeight { ref item, .. }) if item == "item2"
        ));

        let problem = Problem::from_weights(&[f64::NAN], 2);
        assert!(matches!(
            problem.validate(),
            Err(ConfigurationError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let problem = Problem::new(
            vec![Item::new("a", 1.0), Item::new("a", 2.0)],
            vec![Bin::new("x")],
        );
        assert_eq!(
            problem.validate(),
            Err(ConfigurationError::DuplicateItem("a".to_string()))
        );

        let problem = Problem::new(
            vec![Item::new("a", 1.0)],
            vec![Bin::new("x"), Bin::new("x")],
        );
        assert_eq!(
            problem.validate(),
            Err(ConfigurationError::DuplicateBin("x".to_string()))
        );
    }

    #[test]
    fn test_validate_allows_shared_item_and_bin_names() {
        let problem = Problem::new(vec![Item::new("a", 1.0)], vec![Bin::new("a")]);
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_id_and_bad_capacity() {
        let problem = Problem::new(vec![Item::new("", 1.0)], vec![Bin::new("x")]);
        assert_eq!(problem.validate(), Err(ConfigurationError::EmptyIdentifier));

        let problem = Problem::new(
            vec![Item::new("a", 1.0)],
            vec![Bin::with_capacity("x", f64::INFINITY)],
        );
        assert!(matches!(
            problem.validate(),
            Err(ConfigurationError::InvalidCapacity { .. })
        ));
    }
}
