//! Document loader: flattens folders of JSON record files into [`Record`]s.
//!
//! Each `.json` file holds either a list or a single object of categorical
//! values, e.g. `{"company_type": "Private Limited Company"}` becomes one
//! record with text `"Private Limited Company"`, source `company_type.json`
//! and key `company_type`. Short categorical values are not chunked.

use crate::types::{Record, RecordMetadata};
use ragchat_core::{AppError, AppResult};
use serde_json::Value;
use std::path::Path;
use walkdir::WalkDir;

/// Load every `.json` file directly inside `data_folder`.
///
/// A file that cannot be read or parsed is logged and skipped; the remaining
/// files still load. Files are visited in name order.
///
/// # Errors
/// Returns an error only when `data_folder` is not a readable directory.
pub fn load_json_records(data_folder: &Path) -> AppResult<Vec<Record>> {
    if !data_folder.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Data folder does not exist or is not a directory: {:?}",
            data_folder
        )));
    }

    let mut records = Vec::new();

    for entry in WalkDir::new(data_folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!("Error listing {:?}: {}", data_folder, e);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json")
        {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        match load_file(path, &file_name) {
            Ok(mut file_records) => {
                tracing::debug!("Loaded {} records from {}", file_records.len(), file_name);
                records.append(&mut file_records);
            }
            Err(e) => tracing::error!("Error reading {}: {}", file_name, e),
        }
    }

    tracing::info!(
        "Loaded {} clean records from {:?}",
        records.len(),
        data_folder
    );
    Ok(records)
}

fn load_file(path: &Path, file_name: &str) -> AppResult<Vec<Record>> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    Ok(records_from_value(file_name, &value))
}

/// Flatten one parsed file into records.
///
/// Lists yield one record per string value of each object element (tagged
/// with key and list index) and one per bare string element (tagged with the
/// index). Objects yield one record per string value. Everything else is
/// skipped.
pub fn records_from_value(file_name: &str, value: &Value) -> Vec<Record> {
    let mut records = Vec::new();

    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Object(map) => {
                        for (key, value) in map {
                            if let Some(text) = value.as_str() {
                                let metadata = RecordMetadata {
                                    source: file_name.to_string(),
                                    key: Some(key.clone()),
                                    index: Some(i),
                                };
                                records.extend(Record::new(text, metadata));
                            }
                        }
                    }
                    Value::String(text) => {
                        let metadata = RecordMetadata {
                            source: file_name.to_string(),
                            key: None,
                            index: Some(i),
                        };
                        records.extend(Record::new(text, metadata));
                    }
                    _ => {}
                }
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                if let Some(text) = value.as_str() {
                    let metadata = RecordMetadata {
                        source: file_name.to_string(),
                        key: Some(key.clone()),
                        index: None,
                    };
                    records.extend(Record::new(text, metadata));
                }
            }
        }
        _ => tracing::warn!("Skipping {}: top level is neither a list nor an object", file_name),
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_object_file_skips_empty_values() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("single.json"), r#"{"a": "x", "b": ""}"#).unwrap();

        let records = load_json_records(temp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "x");
        assert_eq!(records[0].metadata.source, "single.json");
        assert_eq!(records[0].metadata.key.as_deref(), Some("a"));
        assert_eq!(records[0].metadata.index, None);
    }

    #[test]
    fn test_list_file_tags_key_and_index() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("company_type.json"),
            r#"[
                {"company_type": "Private Limited Company", "employees": 40},
                {"company_type": "  LLP  ", "active": true},
                "Sole Proprietorship",
                42
            ]"#,
        )
        .unwrap();

        let records = load_json_records(temp.path()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].text, "Private Limited Company");
        assert_eq!(records[0].metadata.index, Some(0));
        assert_eq!(records[1].text, "LLP");
        assert_eq!(records[1].metadata.key.as_deref(), Some("company_type"));
        assert_eq!(records[1].metadata.index, Some(1));
        assert_eq!(records[2].text, "Sole Proprietorship");
        assert_eq!(records[2].metadata.key, None);
        assert_eq!(records[2].metadata.index, Some(2));
    }

    #[test]
    fn test_malformed_file_does_not_stop_loading() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a_broken.json"), r#"{"a": "x""#).unwrap();
        fs::write(temp.path().join("b_good.json"), r#"{"industry": "Fintech"}"#).unwrap();

        let records = load_json_records(temp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata.source, "b_good.json");
    }

    #[test]
    fn test_non_json_files_and_subdirs_are_ignored() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "Fintech").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested/inner.json"), r#"{"a": "x"}"#).unwrap();

        let records = load_json_records(temp.path()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_scalar_top_level_yields_nothing() {
        assert!(records_from_value("n.json", &serde_json::json!(7)).is_empty());
    }

    #[test]
    fn test_missing_folder_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(load_json_records(&temp.path().join("missing")).is_err());
    }
}
