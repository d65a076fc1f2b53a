use tracing::info;

use crate::cover::CoverNormalizer;
use crate::merge::{merge, MergeMode};
use crate::store::{CatalogStore, IgnoreList};
use crate::{CandidateBatch, Result};

/// Counts from one synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub found: usize,
    pub added: usize,
    pub known: usize,
    pub ignored: usize,
    pub rejected: usize,
    pub total: usize,
}

/// Load, merge, save. A catalog that fails to load aborts before anything is written.
pub async fn synchronize<N>(
    store: &CatalogStore,
    ignore: &IgnoreList,
    normalizer: &N,
    batch: CandidateBatch,
    mode: MergeMode,
) -> Result<SyncReport>
where
    N: CoverNormalizer + ?Sized,
{
    let existing = store.load()?;
    let found = batch.len();
    info!(
        "Merging {} candidates into {} catalogued albums ({:?} mode)",
        found,
        existing.len(),
        mode
    );

    let outcome = merge(existing, batch.into_chronological(), mode, ignore, normalizer).await?;
    store.save(&outcome.catalog)?;

    let report = SyncReport {
        found,
        added: outcome.added,
        known: outcome.known,
        ignored: outcome.ignored,
        rejected: outcome.rejected,
        total: outcome.catalog.len(),
    };
    info!(
        "Added {} albums ({} known, {} ignored, {} rejected), catalog now holds {}",
        report.added, report.known, report.ignored, report.rejected, report.total
    );
    Ok(report)
}
