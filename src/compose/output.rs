//! Staged output documents
//!
//! Each resolved component becomes one fragment document under
//! `fragments/`, named after the component; a top-level include document
//! lists them in resolved order.

use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

use super::component::ResolvedEntry;
use crate::error::{Error, Result};

/// File name of the top-level include document
pub const INCLUDE_FILE: &str = "compose.yaml";

/// Directory, relative to the staging root, holding one fragment per component
pub const FRAGMENTS_DIR: &str = "fragments";

/// Path, relative to the staging root, of the fragment of `component`
pub fn fragment_file_name(component: &str) -> String {
    let safe: String = component
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    format!("{FRAGMENTS_DIR}/{safe}.yaml")
}

/// Staged fragment paths in resolved order
///
/// Fails when two components would be written to the same file.
pub fn staged_paths(entries: &[ResolvedEntry]) -> Result<Vec<String>> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut paths = Vec::with_capacity(entries.len());

    for entry in entries {
        let path = fragment_file_name(&entry.name);
        if let Some(first) = owners.insert(path.clone(), &entry.name) {
            return Err(Error::StagingCollision {
                component: entry.name.clone(),
                other: first.to_string(),
                path,
            });
        }
        paths.push(path);
    }

    Ok(paths)
}

/// `{include: [<fragment path>, ...]}` in resolved order
pub fn include_document(entries: &[ResolvedEntry]) -> Result<Value> {
    let files = staged_paths(entries)?
        .into_iter()
        .map(Value::String)
        .collect();

    let mut document = Mapping::new();
    document.insert(Value::String("include".to_string()), Value::Sequence(files));
    Ok(Value::Mapping(document))
}
