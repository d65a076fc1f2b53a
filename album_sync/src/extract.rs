use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::{Error, RawCandidate, Result};

/// Host names that come back concatenated from some saved captures.
const HOST_REPAIRS: &[(&str, &str)] = &[("photosgooglecom", "photos.google.com")];

const BACKGROUND_IMAGE_PATTERN: &str =
    r#"background-image:\s*url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))\s*\)"#;

/// CSS selectors describing one album entry on the listing page.
#[derive(Debug, Clone)]
pub struct AlbumSelectors {
    entry_css: String,
    entry: Selector,
    title: Selector,
    count: Option<Selector>,
    cover: Selector,
    nested_image: Selector,
    background: Regex,
}

impl AlbumSelectors {
    /// `count` is optional: a listing without count labels yields albums with an unknown element count.
    pub fn new(entry: &str, title: &str, count: Option<&str>, cover: &str) -> Result<Self> {
        Ok(Self {
            entry_css: entry.to_string(),
            entry: parse_selector(entry)?,
            title: parse_selector(title)?,
            count: count.map(parse_selector).transpose()?,
            cover: parse_selector(cover)?,
            nested_image: parse_selector("img[src]")?,
            background: Regex::new(BACKGROUND_IMAGE_PATTERN)
                .map_err(|e| Error::Usage(format!("invalid background pattern: {}", e)))?,
        })
    }

    /// Markup of the Google Photos albums page.
    pub fn google_photos() -> Result<Self> {
        Self::new("a.MTmRkb", "div.mfQCMe", Some("div.UV4Xae"), "div.FLmEnf")
    }

    pub fn entry_css(&self) -> &str {
        &self.entry_css
    }

    /// Every album entry in document order. Malformed entries are logged and skipped.
    pub fn extract(&self, doc: &Html) -> Vec<RawCandidate> {
        let mut candidates = Vec::new();
        for (index, entry) in doc.select(&self.entry).enumerate() {
            match self.extract_entry(entry) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!("Skipping album entry #{}: {}", index, e),
            }
        }
        debug!("Extracted {} album entries", candidates.len());
        candidates
    }

    /// Convenience over [`AlbumSelectors::extract`] for raw markup.
    pub fn extract_markup(&self, markup: &str) -> Vec<RawCandidate> {
        self.extract(&Html::parse_document(markup))
    }

    fn extract_entry(&self, entry: ElementRef) -> Result<RawCandidate> {
        let title = entry
            .select(&self.title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::malformed("missing title"))?;

        let elements = match &self.count {
            Some(selector) => {
                let label = entry
                    .select(selector)
                    .next()
                    .map(|el| el.text().collect::<String>())
                    .ok_or_else(|| Error::malformed(format!("{}: missing element count", title)))?;
                Some(parse_element_count(&label)?)
            }
            None => None,
        };

        let album_url = entry
            .value()
            .attr("href")
            .map(repair_host)
            .ok_or_else(|| Error::malformed(format!("{}: missing link", title)))?;

        let cover_ref = entry
            .select(&self.cover)
            .next()
            .and_then(|el| self.cover_reference(el))
            .ok_or_else(|| Error::malformed(format!("{}: missing cover image", title)))?;

        Ok(RawCandidate {
            title,
            elements,
            album_url,
            cover_ref,
        })
    }

    fn cover_reference(&self, el: ElementRef) -> Option<String> {
        if let Some(style) = el.value().attr("style") {
            if let Some(caps) = self.background.captures(style) {
                let url = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
                if !url.as_str().is_empty() {
                    return Some(decode_reference(url.as_str()));
                }
            }
        }
        if let Some(src) = el.value().attr("src") {
            return Some(decode_reference(src));
        }
        el.select(&self.nested_image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(decode_reference)
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Usage(format!("invalid selector {:?}: {:?}", css, e)))
}

/// Strips every non-digit from a label such as "1,204 items" and parses the rest.
pub fn parse_element_count(label: &str) -> Result<i64> {
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(Error::malformed(format!("no digits in count label {:?}", label)));
    }
    digits
        .parse()
        .map_err(|_| Error::malformed(format!("count label {:?} out of range", label)))
}

pub fn repair_host(link: &str) -> String {
    HOST_REPAIRS
        .iter()
        .fold(link.to_string(), |acc, (broken, host)| acc.replace(broken, host))
}

/// Decodes the escaped space and percent characters saved captures leave in paths.
pub fn decode_reference(raw: &str) -> String {
    raw.replace("%20", " ").replace("%25", "%")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <a class="MTmRkb" href="https://photosgooglecom/album/AF1">
            <div class="FLmEnf" style="background-image: url(&quot;Albums_files/Summer%20Trip%2520x.jpg&quot;);"></div>
            <div class="mfQCMe">Summer Trip</div>
            <div class="UV4Xae">1,204 items</div>
          </a>
          <a class="MTmRkb" href="https://photos.google.com/album/AF2">
            <div class="FLmEnf"><img src="https://lh3.example.com/cover2"></div>
            <div class="mfQCMe">Winter</div>
            <div class="UV4Xae">Shared</div>
          </a>
          <a class="MTmRkb" href="https://photos.google.com/album/AF3">
            <div class="FLmEnf" style="background-image: url('https://lh3.example.com/cover3');"></div>
            <div class="UV4Xae">7 items</div>
          </a>
          <a class="MTmRkb" href="https://photos.google.com/album/AF4">
            <div class="FLmEnf" style="background-image: url(https://lh3.example.com/cover4);"></div>
            <div class="mfQCMe">Garden</div>
            <div class="UV4Xae">12 items</div>
          </a>
          <a class="MTmRkb">
            <div class="FLmEnf" style="background-image: url(https://lh3.example.com/cover5);"></div>
            <div class="mfQCMe">No Link</div>
            <div class="UV4Xae">5 items</div>
          </a>
          <a class="MTmRkb" href="https://photos.google.com/album/AF6">
            <div class="mfQCMe">No Cover</div>
            <div class="UV4Xae">6 items</div>
          </a>
          <a class="MTmRkb" href="https://photos.google.com/album/AF7">
            <div class="FLmEnf"></div>
            <div class="mfQCMe">Empty Cover</div>
            <div class="UV4Xae">8 items</div>
          </a>
        </body></html>
    "#;

    #[test]
    fn extracts_entries_in_document_order() {
        let selectors = AlbumSelectors::google_photos().unwrap();
        let found = selectors.extract_markup(LISTING);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "Summer Trip");
        assert_eq!(found[0].elements, Some(1204));
        assert_eq!(found[0].album_url, "https://photos.google.com/album/AF1");
        assert_eq!(found[0].cover_ref, "Albums_files/Summer Trip%20x.jpg");
        assert_eq!(found[1].title, "Garden");
        assert_eq!(found[1].cover_ref, "https://lh3.example.com/cover4");
    }

    #[test]
    fn img_source_is_used_without_background() {
        let selectors = AlbumSelectors::new("a.MTmRkb", "div.mfQCMe", None, "div.FLmEnf").unwrap();
        let found = selectors.extract_markup(LISTING);

        let winter = found.iter().find(|c| c.title == "Winter").unwrap();
        assert_eq!(winter.cover_ref, "https://lh3.example.com/cover2");
        assert_eq!(winter.elements, None);
    }

    #[test]
    fn entries_without_link_or_cover_are_skipped() {
        for selectors in [
            AlbumSelectors::google_photos().unwrap(),
            AlbumSelectors::new("a.MTmRkb", "div.mfQCMe", None, "div.FLmEnf").unwrap(),
        ] {
            let titles: Vec<_> = selectors
                .extract_markup(LISTING)
                .into_iter()
                .map(|c| c.title)
                .collect();
            for skipped in ["No Link", "No Cover", "Empty Cover"] {
                assert!(!titles.iter().any(|t| t == skipped), "{} should be skipped", skipped);
            }
        }
    }

    #[test]
    fn count_label_parsing() {
        assert_eq!(parse_element_count("42 items").unwrap(), 42);
        assert_eq!(parse_element_count("1.234 Elemente").unwrap(), 1234);
        assert!(matches!(
            parse_element_count("Shared album"),
            Err(Error::MalformedCandidate { .. })
        ));
    }

    #[test]
    fn repairs_concatenated_host() {
        assert_eq!(
            repair_host("https://photosgooglecom/share/x"),
            "https://photos.google.com/share/x"
        );
        assert_eq!(repair_host("https://example.com/a"), "https://example.com/a");
    }

    #[test]
    fn invalid_selector_is_usage_error() {
        assert!(matches!(
            AlbumSelectors::new("a[", "div", None, "div"),
            Err(Error::Usage(_))
        ));
    }
}
