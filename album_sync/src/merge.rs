use std::collections::HashSet;

use clap::ValueEnum;
use tracing::{debug, info, warn};

use crate::cover::CoverNormalizer;
use crate::store::{Catalog, IgnoreList};
use crate::{Album, AlbumIdentity, RawCandidate, Result};

/// How new candidates are told apart from albums already in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MergeMode {
    /// Look every candidate up by `(title, album_url)`.
    #[default]
    Identity,
    /// Trust the source to be an append-only log and take only the entries
    /// past the current catalog length. Breaks if the source ever reorders
    /// or drops entries.
    Positional,
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    pub added: usize,
    pub known: usize,
    pub ignored: usize,
    /// Candidates whose entry or cover failed; they stay absent until a later sync.
    pub rejected: usize,
}

/// Appends the genuinely new `candidates` (oldest first) to `existing`.
///
/// Prior entries keep their values and positions. Each new identity gets
/// exactly one cover normalization; a candidate whose cover fails is left
/// out and the rest are still merged, except in positional mode, where the
/// merge stops at the failed candidate so the catalog stays a prefix of the
/// source. Errors other than per-candidate ones abort the merge.
pub async fn merge<N>(
    existing: Catalog,
    candidates: Vec<RawCandidate>,
    mode: MergeMode,
    ignore: &IgnoreList,
    normalizer: &N,
) -> Result<MergeOutcome>
where
    N: CoverNormalizer + ?Sized,
{
    let mut seen: HashSet<AlbumIdentity> = existing.iter().map(Album::identity).collect();
    let mut outcome = MergeOutcome {
        known: 0,
        added: 0,
        ignored: 0,
        rejected: 0,
        catalog: existing,
    };

    let pending = match mode {
        MergeMode::Identity => candidates,
        MergeMode::Positional => {
            let skip = outcome.catalog.len().min(candidates.len());
            outcome.known += skip;
            debug!("Positional merge: {} of {} candidates are past the catalog end", candidates.len() - skip, candidates.len());
            candidates.into_iter().skip(skip).collect()
        }
    };

    for candidate in pending {
        let identity = candidate.identity();
        if seen.contains(&identity) {
            if mode == MergeMode::Positional {
                warn!("{:?} is already catalogued at another position, not appending", candidate.title);
            }
            outcome.known += 1;
            continue;
        }
        if ignore.contains(&identity) {
            debug!("{:?} is on the ignore list", candidate.title);
            outcome.ignored += 1;
            continue;
        }

        match normalizer.cover_for(&candidate.title, &candidate.cover_ref).await {
            Ok(cover) => {
                info!("Adding album {:?}", candidate.title);
                outcome.catalog.push(Album::new(
                    candidate.title,
                    candidate.elements,
                    candidate.album_url,
                    cover,
                ));
                seen.insert(identity);
                outcome.added += 1;
            }
            Err(e) if e.is_per_candidate() => {
                warn!("Rejecting album {:?}: {}", candidate.title, e);
                outcome.rejected += 1;
                if mode == MergeMode::Positional {
                    // Appending past a gap would shift every later position by one.
                    warn!(
                        "Positional merge stops at {:?}; it and the entries after it are retried next sync",
                        candidate.title
                    );
                    break;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Ok(outcome)
}
