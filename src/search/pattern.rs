use std::collections::{HashMap, HashSet};

use regex::RegexBuilder;
use tracing::instrument;

use crate::{db::PackageStore, error::Error, models::package::PackageMetadata};

/// Case-insensitive regex search over package names and readmes.
///
/// Name hits come first (every version of each matching package), followed
/// by readme hits from packages the name pass did not already capture.
#[instrument(name = "search_by_pattern", skip(store))]
pub async fn search_by_pattern<S>(store: &S, pattern: &str) -> Result<Vec<PackageMetadata>, Error>
where
    S: PackageStore + ?Sized,
{
    let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;

    let packages = store.list_packages().await?;
    let names: HashMap<i64, &str> = packages
        .iter()
        .map(|package| (package.id, package.name.as_str()))
        .collect();

    let mut results = Vec::new();
    let mut captured = HashSet::new();
    for package in packages.iter().filter(|package| regex.is_match(&package.name)) {
        captured.insert(package.id);
        for version in store.list_versions_for_package(package.id).await? {
            results.push(PackageMetadata {
                id: version.id,
                name: package.name.clone(),
                version: version.version,
            });
        }
    }

    let mut seen = HashSet::new();
    for version in store.list_versions_with_readme().await? {
        if captured.contains(&version.package_id) || !seen.insert(version.id) {
            continue;
        }
        let Some(readme) = version.readme.as_deref() else {
            continue;
        };
        if !regex.is_match(readme) {
            continue;
        }
        let Some(name) = names.get(&version.package_id) else {
            tracing::warn!(version_id = version.id, "Version without a package");
            continue;
        };

        results.push(PackageMetadata {
            id: version.id,
            name: name.to_string(),
            version: version.version,
        });
    }

    tracing::debug!(results = results.len(), "Pattern search finished");

    Ok(results)
}
