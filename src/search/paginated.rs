use std::collections::HashMap;

use tracing::instrument;

use crate::{
    db::PackageStore,
    error::Error,
    models::{package::PackageMetadata, version::VersionFilter},
    search::{Cursor, PackageQuery, WILDCARD},
    version_range::VersionRange,
};

/// Rows per storage round-trip, and the most results a single call returns.
pub const PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Still pulling batches.
    Scanning,
    /// Results filled up with a page that matched on every row; resume on the next page.
    PageFullAdvancing,
    /// Results filled up part way through a page; resume inside it.
    PageFullStatic,
    /// Storage ran out of rows.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub cursor: Cursor,
    pub results: Vec<PackageMetadata>,
}

/// Request-scoped pagination bookkeeping, kept apart from storage access.
#[derive(Debug)]
struct Scan {
    start_page: i64,
    already_returned: i64,
    page: i64,
    page_matches: i64,
    results: Vec<PackageMetadata>,
    state: ScanState,
}

impl Scan {
    fn new(cursor: Cursor) -> Self {
        Self {
            start_page: cursor.page_offset,
            already_returned: cursor.within_page_offset,
            page: cursor.page_offset,
            page_matches: 0,
            results: Vec::with_capacity(PAGE_SIZE),
            state: ScanState::Scanning,
        }
    }

    /// Feeds one matching row; matches the caller saw on a previous call are
    /// counted but not emitted.
    fn accept(&mut self, hit: PackageMetadata) -> ScanState {
        debug_assert_eq!(self.state, ScanState::Scanning);

        let seen_before = self.page == self.start_page && self.page_matches < self.already_returned;
        if !seen_before {
            self.results.push(hit);
        }
        self.page_matches += 1;

        if self.results.len() == PAGE_SIZE {
            self.state = if self.page_matches == PAGE_SIZE as i64 {
                ScanState::PageFullAdvancing
            } else {
                ScanState::PageFullStatic
            };
        }

        self.state
    }

    fn next_page(&mut self) {
        self.page += 1;
        self.page_matches = 0;
    }

    fn exhaust(&mut self) {
        self.state = ScanState::Exhausted;
    }

    fn row_offset(&self) -> Result<i64, Error> {
        self.page
            .checked_mul(PAGE_SIZE as i64)
            .ok_or_else(|| Error::InvalidQuery(format!("Page offset {} is too large", self.page)))
    }

    fn finish(self) -> SearchPage {
        let cursor = match self.state {
            ScanState::PageFullAdvancing => Cursor::new(self.page + 1, 0),
            ScanState::PageFullStatic => Cursor::new(self.page, self.page_matches),
            ScanState::Exhausted => Cursor::EXHAUSTED,
            ScanState::Scanning => Cursor::new(self.page, self.page_matches),
        };

        SearchPage {
            cursor,
            results: self.results,
        }
    }
}

#[derive(Debug)]
struct CompiledQuery {
    name: String,
    range: VersionRange,
}

/// Which rows to scan and which query judges each of them.
#[derive(Debug)]
enum ScanPlan {
    /// Leading `*`: every row, judged and labelled by the first query.
    Everything(CompiledQuery),
    Packages(HashMap<i64, CompiledQuery>),
}

impl ScanPlan {
    fn filter(&self) -> VersionFilter {
        match self {
            ScanPlan::Everything(_) => VersionFilter::All,
            ScanPlan::Packages(queries) => {
                let mut ids: Vec<i64> = queries.keys().copied().collect();
                ids.sort_unstable();
                VersionFilter::Packages(ids)
            }
        }
    }

    fn query_for(&self, package_id: i64) -> Option<&CompiledQuery> {
        match self {
            ScanPlan::Everything(query) => Some(query),
            ScanPlan::Packages(queries) => queries.get(&package_id),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, ScanPlan::Packages(queries) if queries.is_empty())
    }
}

fn compile(queries: &[PackageQuery]) -> Result<Vec<CompiledQuery>, Error> {
    if queries.is_empty() {
        return Err(Error::InvalidQuery(
            "At least one package query is required".to_string(),
        ));
    }

    queries
        .iter()
        .map(|query| {
            let range = query
                .version
                .parse::<VersionRange>()
                .map_err(|err| Error::InvalidQuery(err.to_string()))?;
            tracing::debug!(name = %query.name, range = %range, "Compiled package query");
            Ok(CompiledQuery {
                name: query.name.clone(),
                range,
            })
        })
        .collect()
}

async fn plan<S>(store: &S, queries: Vec<CompiledQuery>) -> Result<ScanPlan, Error>
where
    S: PackageStore + ?Sized,
{
    let mut queries = queries.into_iter();
    let Some(first) = queries.next() else {
        return Ok(ScanPlan::Packages(HashMap::new()));
    };
    if first.name == WILDCARD {
        return Ok(ScanPlan::Everything(first));
    }

    let mut by_package = HashMap::new();
    for query in std::iter::once(first).chain(queries) {
        match store.find_package_id_by_name(&query.name).await? {
            Some(package_id) => {
                by_package.insert(package_id, query);
            }
            None => tracing::debug!(name = %query.name, "Dropping query for unknown package"),
        }
    }

    Ok(ScanPlan::Packages(by_package))
}

/// Returns at most [`PAGE_SIZE`] versions matching `queries`, resuming from
/// `cursor`, along with the cursor for the next call.
///
/// `caller_group` is carried for access-level filtering but does not change
/// which rows match.
#[instrument(
    name = "search",
    skip(store, queries),
    fields(queries = queries.len(), cursor = %cursor, caller_group = %caller_group)
)]
pub async fn search<S>(
    store: &S,
    queries: &[PackageQuery],
    cursor: Cursor,
    caller_group: &str,
) -> Result<SearchPage, Error>
where
    S: PackageStore + ?Sized,
{
    if cursor.is_negative() {
        return Ok(SearchPage {
            cursor,
            results: Vec::new(),
        });
    }

    let plan = plan(store, compile(queries)?).await?;
    if plan.is_empty() {
        return Ok(SearchPage {
            cursor: Cursor::EXHAUSTED,
            results: Vec::new(),
        });
    }
    let filter = plan.filter();

    let mut scan = Scan::new(cursor);
    'batches: loop {
        let rows = store
            .fetch_versions(&filter, scan.row_offset()?, PAGE_SIZE as i64)
            .await?;
        tracing::debug!(page = scan.page, rows = rows.len(), "Scanned version batch");

        if rows.is_empty() {
            scan.exhaust();
            break 'batches;
        }

        for row in rows {
            let Some(query) = plan.query_for(row.package_id) else {
                continue;
            };
            if !query.range.matches_str(&row.version) {
                continue;
            }

            let hit = PackageMetadata {
                id: row.id,
                name: query.name.clone(),
                version: row.version,
            };
            if scan.accept(hit) != ScanState::Scanning {
                break 'batches;
            }
        }

        scan.next_page();
    }

    let page = scan.finish();
    tracing::debug!(next = %page.cursor, results = page.results.len(), "Search finished");

    Ok(page)
}
