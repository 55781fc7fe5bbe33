//! Source discovery from the site's index pages.
//!
//! Each index page lists the sources of one kind in a `table.inf`, one
//! source per row, as an `a.z0` anchor whose text is the source name and
//! whose `href` is the detail page relative to the site base.
//!
//! # URL Pattern
//!
//! Detail links are relative (`cg42.htm`) and are resolved against the
//! configured base URL, e.g. `http://94.72.18.202:8083/cg42.htm`.

use crate::api::PageFetcher;
use crate::config::SiteConfig;
use crate::models::{LinkCatalog, Section, SourceEntry, SourceKind, SourceList};
use crate::scrapers::codec::fetch_text;
use crate::scrapers::{DATA_TABLE, ROW, element_text, prepare_document};
use crate::utils::truncate_utf16;
use futures::future;
use once_cell::sync::Lazy;
use scraper::Selector;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Longest display name, in UTF-16 code units, that fits in chat callback data.
pub const MAX_DISPLAY_NAME_UNITS: usize = 28;

static SOURCE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.z0").expect("valid source link selector"));

/// Parse the base URL so that relative links are appended to it rather than
/// replacing its last path segment.
pub fn parse_base(base: &str) -> Result<Url, url::ParseError> {
    if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{}/", base))
    }
}

/// Extract the sources listed on one index page.
///
/// Rows without an anchor, with empty anchor text or with an unusable
/// `href` are skipped.
pub fn parse_index(html: &str, base: &Url) -> SourceList {
    let document = prepare_document(html);
    let Some(table) = document.select(&DATA_TABLE).next() else {
        warn!("Index page has no source table");
        return SourceList::default();
    };

    let mut sources = SourceList::default();
    for row in table.select(&ROW).skip(1) {
        let Some(anchor) = row.select(&SOURCE_LINK).next() else {
            continue;
        };
        let name = element_text(&anchor);
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        match base.join(href) {
            Ok(detail) => sources.insert(SourceEntry {
                display_name: truncate_utf16(name, MAX_DISPLAY_NAME_UNITS).to_string(),
                detail_url: detail.to_string(),
            }),
            Err(e) => debug!(%href, error = %e, "Skipping unresolvable source link"),
        }
    }
    sources
}

/// Fetch and parse one index page. Any failure yields an empty list.
#[instrument(level = "info", skip(fetcher, base))]
pub async fn fetch_index<F: PageFetcher>(fetcher: &F, url: &str, base: &Url) -> SourceList {
    let Some(html) = fetch_text(fetcher, url).await else {
        warn!(%url, "Index page unavailable; no sources for this kind");
        return SourceList::default();
    };
    let sources = parse_index(&html, base);
    info!(count = sources.len(), source = url, "Indexed sources");
    sources
}

/// Build a complete catalog from every configured index page.
///
/// All index pages are fetched concurrently. A page that fails only
/// empties its own kind; every configured kind is present in the result.
#[instrument(level = "info", skip_all)]
pub async fn build_catalog<F: PageFetcher>(fetcher: &F, site: &SiteConfig) -> LinkCatalog {
    let mut catalog = LinkCatalog::default();
    let base = match parse_base(&site.base) {
        Ok(base) => base,
        Err(e) => {
            warn!(base = %site.base, error = %e, "Invalid base URL; catalog left empty");
            for section in [Section::Schedule, Section::Records] {
                for (kind, _) in site.links(section).iter() {
                    catalog.section_mut(section).insert(kind, SourceList::default());
                }
            }
            return catalog;
        }
    };

    let targets: Vec<(Section, SourceKind, &str)> = [Section::Schedule, Section::Records]
        .into_iter()
        .flat_map(|section| {
            site.links(section)
                .iter()
                .map(move |(kind, url)| (section, kind, url))
        })
        .collect();

    let lists = future::join_all(
        targets
            .iter()
            .map(|(_, _, url)| fetch_index(fetcher, url, &base)),
    )
    .await;

    for ((section, kind, _), list) in targets.into_iter().zip(lists) {
        catalog.section_mut(section).insert(kind, list);
    }

    info!(
        groups = catalog.schedules.get(&SourceKind::Group).map_or(0, SourceList::len),
        lecturers = catalog.schedules.get(&SourceKind::Lecturer).map_or(0, SourceList::len),
        rooms = catalog.schedules.get(&SourceKind::Room).map_or(0, SourceList::len),
        "Catalog built"
    );
    catalog
}
