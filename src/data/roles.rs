//! Assign uploaded files to their semantic roles by filename.
//!
//! Rules (deterministic, single left-to-right pass):
//! - a filename is lower-cased and tested against each role's token in
//!   `FileRole::ALL` order; the first contained token decides its role
//! - files matching no token are ignored
//! - when several files land on the same role, the last one wins
//!
//! Only names are inspected; contents are passed through untouched.

use crate::domain::{FileRole, RoleFiles, UploadedFile};
use crate::error::ClassificationError;

/// Role a single filename maps to, if any.
pub fn role_for_name(name: &str) -> Option<FileRole> {
    let lower = name.to_lowercase();
    FileRole::ALL
        .into_iter()
        .find(|role| lower.contains(role.token()))
}

/// Classify a batch of uploads into a complete role mapping.
pub fn classify(files: &[UploadedFile]) -> Result<RoleFiles, ClassificationError> {
    let mut births = None;
    let mut deaths = None;
    let mut population = None;
    let mut migration = None;

    for file in files {
        let slot = match role_for_name(&file.name) {
            Some(FileRole::Births) => &mut births,
            Some(FileRole::Deaths) => &mut deaths,
            Some(FileRole::Population) => &mut population,
            Some(FileRole::Migration) => &mut migration,
            None => {
                tracing::debug!("ignoring upload '{}': no role token in name", file.name);
                continue;
            }
        };
        *slot = Some(file);
    }

    match (births, deaths, population, migration) {
        (Some(b), Some(d), Some(p), Some(m)) => Ok(RoleFiles {
            births: b.clone(),
            deaths: d.clone(),
            population: p.clone(),
            migration: m.clone(),
        }),
        (b, d, p, m) => {
            let missing_roles = [
                (FileRole::Births, b.is_none()),
                (FileRole::Deaths, d.is_none()),
                (FileRole::Population, p.is_none()),
                (FileRole::Migration, m.is_none()),
            ]
            .into_iter()
            .filter_map(|(role, missing)| missing.then_some(role))
            .collect();
            Err(ClassificationError { missing_roles })
        }
    }
}
