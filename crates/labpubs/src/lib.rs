#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::missing_safety_doc,
    clippy::missing_const_for_fn
)]
#![warn(missing_docs, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]

//! # labpubs
//!
//! labpubs collects the publications of a research lab from its Zotero group library, attaches
//! PubMed ids by DOI, formats citations and writes the list out as JSON, CSV and a README
//! section.

pub mod api;
pub mod cite;
mod config;
mod error;
pub mod export;
pub mod item;

pub use api::Client;
pub use config::{Config, FetchMode, CONFIG_FILE, MAX_PAGE_SIZE};
pub use error::{Error, ErrorKind};
pub use export::Publication;

use indicatif::ProgressBar;
use log::{info, trace};

use api::{idconv, zotero};
use item::{ensure_disjoint, Item};

/// Fetch the publications and preprints collections, resolve PubMed ids and sort newest first.
///
/// Nothing is written here, so a failure leaves any previous output untouched.
///
/// # Errors
///
/// An `Err` is returned when a collection or the id converter cannot be reached, a record fails
/// validation or an item is found in both collections.
pub fn fetch_publications<C: Client>(
    client: &C,
    config: &Config,
    progress: &ProgressBar,
) -> Result<Vec<Publication>, Error> {
    let (publications, preprints) = match config.fetch_mode {
        FetchMode::Paged => {
            let publications =
                zotero::collection_items(client, config, &config.publications, progress)?;
            let preprints = zotero::collection_items(client, config, &config.preprints, progress)?;
            ensure_disjoint(
                publications.iter().map(|i| i.key.as_str()),
                preprints.iter().map(|i| i.key.as_str()),
            )?;
            (publications, preprints)
        }
        FetchMode::PerItem => {
            let publication_keys = zotero::collection_keys(client, config, &config.publications)?;
            let preprint_keys = zotero::collection_keys(client, config, &config.preprints)?;
            ensure_disjoint(
                publication_keys.iter().map(String::as_str),
                preprint_keys.iter().map(String::as_str),
            )?;

            progress.set_length((publication_keys.len() + preprint_keys.len()) as u64);
            (
                zotero::items_by_key(client, config, &publication_keys, progress)?,
                zotero::items_by_key(client, config, &preprint_keys, progress)?,
            )
        }
    };
    info!(
        "Fetched {} publications and {} preprints",
        publications.len(),
        preprints.len()
    );

    let items: Vec<Item> = publications.into_iter().chain(preprints).collect();
    let pmids = idconv::resolve_pmids(
        client,
        config,
        items.iter().filter_map(|i| i.doi.as_deref()),
    )?;

    let mut publications = export::enrich(items, &pmids);
    trace!("Sorting {} publications by date", publications.len());
    export::sort_by_date(&mut publications);
    Ok(publications)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::api::MockClient;

    fn record(key: &str, item_type: &str, year: i32, doi: &str) -> Value {
        json!({
            "key": key,
            "data": {
                "itemType": item_type,
                "title": format!("Title {key}"),
                "creators": [{ "creatorType": "author", "firstName": "Jane", "lastName": "Doe" }],
                "DOI": doi,
            },
            "csljson": { "issued": { "date-parts": [[year]] } },
        })
    }

    fn config(fetch_mode: FetchMode) -> Config {
        Config {
            zotero_url: "http://zotero.test".to_owned(),
            group: "1".to_owned(),
            publications: "PUBS".to_owned(),
            preprints: "PRE".to_owned(),
            idconv_url: "http://idconv.test/".to_owned(),
            fetch_mode,
            ..Config::default()
        }
    }

    #[test]
    fn paged_run_enriches_and_sorts() {
        let pubs = json!([record("P1", "journalArticle", 2021, "10.1/p1")]).to_string();
        let preprints = json!([record("R1", "preprint", 2023, "")]).to_string();
        let idconv = r#"{"records": [{"doi": "10.1/p1", "pmid": "111"}]}"#;
        let client = MockClient::ok([pubs, preprints, idconv.to_owned()]);

        let publications =
            fetch_publications(&client, &config(FetchMode::Paged), &ProgressBar::hidden())
                .unwrap();

        let keys: Vec<_> = publications.iter().map(|p| p.item.key.as_str()).collect();
        assert_eq!(vec!["R1", "P1"], keys);
        assert_eq!(Some("111"), publications[1].pmid.as_deref());
        assert_eq!(None, publications[0].pmid);
    }

    #[test]
    fn overlapping_collections_abort() {
        let pubs = json!([record("SAME", "journalArticle", 2021, "")]).to_string();
        let preprints = json!([record("SAME", "preprint", 2023, "")]).to_string();
        let client = MockClient::ok([pubs, preprints]);

        let err = fetch_publications(&client, &config(FetchMode::Paged), &ProgressBar::hidden())
            .unwrap_err();

        assert_eq!(ErrorKind::Invariant, err.kind());
        // the id converter is never asked
        assert_eq!(2, client.urls().len());
    }

    #[test]
    fn per_item_overlap_aborts_before_fetching_items() {
        let client = MockClient::ok(["A\nB\n", "B\n"]);

        let err = fetch_publications(&client, &config(FetchMode::PerItem), &ProgressBar::hidden())
            .unwrap_err();

        assert_eq!(ErrorKind::Invariant, err.kind());
        assert_eq!(2, client.urls().len());
    }

    #[test]
    fn per_item_run_drops_failed_items() {
        let client = MockClient::new([
            Ok("A\nB\n".to_owned()),
            Ok("C\n".to_owned()),
            Ok(record("A", "thesis", 2020, "").to_string()),
            Err(MockClient::network_error()),
            Err(MockClient::network_error()),
            Ok(record("C", "preprint", 2022, "").to_string()),
        ]);

        let publications =
            fetch_publications(&client, &config(FetchMode::PerItem), &ProgressBar::hidden())
                .unwrap();

        let keys: Vec<_> = publications.iter().map(|p| p.item.key.as_str()).collect();
        assert_eq!(vec!["C", "A"], keys);
    }
}
