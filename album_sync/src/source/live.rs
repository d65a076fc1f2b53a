use std::collections::HashSet;

use tracing::info;
use url::Url;

use super::Acquired;
use crate::browser::{login_actions, BrowserSession};
use crate::config::Settings;
use crate::cover::BaseLocation;
use crate::extract::AlbumSelectors;
use crate::{CandidateBatch, Error, RawCandidate, Result, SourceOrder};

/// Logs in, then scrolls the albums page until a pass turns up nothing new.
///
/// The browser is closed on every exit path before the result is returned.
pub async fn scrape_albums(settings: &Settings, selectors: &AlbumSelectors) -> Result<Acquired> {
    let base = Url::parse(&settings.albums_page_url)
        .map_err(|e| Error::Usage(format!("invalid albums page url {:?}: {}", settings.albums_page_url, e)))?;

    let session = BrowserSession::launch(settings).await?;
    let collected = collect(&session, settings, selectors).await;
    session.close().await;

    let candidates = collected?;
    Ok(Acquired {
        batch: CandidateBatch::new(SourceOrder::NewestFirst, candidates),
        base: BaseLocation::Url(base),
    })
}

async fn collect(
    session: &BrowserSession,
    settings: &Settings,
    selectors: &AlbumSelectors,
) -> Result<Vec<RawCandidate>> {
    info!("Going to albums page");
    session
        .perform_all(&login_actions(settings, selectors.entry_css()))
        .await?;

    let mut accumulator = Accumulator::default();
    info!("Retrieving first set of album elements");
    let mut markup = session.content().await?;
    loop {
        let visible = selectors.extract_markup(&markup);
        info!("Found {} albums", visible.len());

        let added = accumulator.absorb(visible);
        if added == 0 {
            break;
        }
        info!("Added {} albums", added);

        if !session.scroll_to_last(selectors.entry_css()).await? {
            break;
        }
        // The page gives no signal when the next batch has rendered.
        info!("Sleeping for {} seconds", settings.scroll_settle.as_secs());
        tokio::time::sleep(settings.scroll_settle).await;
        markup = session.content().await?;
    }

    info!("Collected {} albums", accumulator.albums.len());
    Ok(accumulator.albums)
}

/// Albums in first-seen order, one per identity.
#[derive(Default)]
struct Accumulator {
    seen: HashSet<crate::AlbumIdentity>,
    albums: Vec<RawCandidate>,
}

impl Accumulator {
    /// Returns how many of `visible` were not seen before.
    fn absorb(&mut self, visible: Vec<RawCandidate>) -> usize {
        let before = self.albums.len();
        for candidate in visible {
            if self.seen.insert(candidate.identity()) {
                self.albums.push(candidate);
            }
        }
        self.albums.len() - before
    }
}
