//! Retrieval of collection items from the Zotero Web API.

use indicatif::ProgressBar;
use log::{debug, info, trace, warn};
use serde_json::Value;

use crate::{
    item::{is_note, Item},
    Config, Error,
};

use super::Client;

/// Sub-documents embedded in every item envelope.
const INCLUDE: &str = "data,csljson";

/// Fetch every bibliographic item of `collection`, a page at a time.
///
/// Notes are dropped, attachments are excluded by the request itself. The loop stops at the
/// first page holding fewer raw records than the page size.
///
/// # Errors
///
/// A failed page request aborts the fetch, as does a record that fails validation.
pub fn collection_items<C: Client>(
    client: &C,
    config: &Config,
    collection: &str,
    progress: &ProgressBar,
) -> Result<Vec<Item>, Error> {
    info!("Fetching items of collection '{collection}'");
    let base = config.collection_url(collection);
    let mut items = Vec::new();
    let mut start = 0;

    loop {
        let url = format!(
            "{base}?format=json&include={INCLUDE}&itemType=-attachment&limit={}&start={start}",
            config.page_size
        );
        trace!("Requesting page at '{url}'");

        let page: Vec<Value> = client.get_json(&url)?;
        let raw_len = page.len();
        debug!("Page at offset {start} holds {raw_len} records");

        for value in page.into_iter().filter(|v| !is_note(v)) {
            items.push(Item::from_value(value)?);
            progress.inc(1);
        }

        if raw_len < config.page_size {
            break;
        }
        start += config.page_size;
    }

    info!("Collection '{collection}' has {} items", items.len());
    Ok(items)
}

/// List the keys of every non-attachment item in `collection`.
///
/// # Errors
///
/// An `Err` is returned when the listing cannot be retrieved.
pub fn collection_keys<C: Client>(
    client: &C,
    config: &Config,
    collection: &str,
) -> Result<Vec<String>, Error> {
    let url = format!(
        "{}?format=keys&itemType=-attachment",
        config.collection_url(collection)
    );
    trace!("Listing keys at '{url}'");

    let text = client.get_text(&url)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Fetch a single item, `None` when the key belongs to a note.
///
/// # Errors
///
/// An `Err` is returned when the request fails or the record fails validation.
pub fn item<C: Client>(client: &C, config: &Config, key: &str) -> Result<Option<Item>, Error> {
    let url = format!("{}?format=json&include={INCLUDE}", config.item_url(key));
    trace!("Requesting item at '{url}'");

    let value: Value = client.get_json(&url)?;
    if is_note(&value) {
        debug!("Skipping note '{key}'");
        return Ok(None);
    }
    Item::from_value(value).map(Some)
}

fn item_with_retry<C: Client>(
    client: &C,
    config: &Config,
    key: &str,
) -> Result<Option<Item>, Error> {
    match item(client, config, key) {
        Err(err) if err.is_fetch() => {
            debug!("Fetching item '{key}' failed, retrying: {err}");
            match item(client, config, key) {
                Err(err) if err.is_fetch() => {
                    warn!("Dropping item '{key}' after a failed retry: {err}");
                    Ok(None)
                }
                res => res,
            }
        }
        res => res,
    }
}

/// Fetch the items for `keys` one at a time.
///
/// A request that fails is retried once, an item whose retry also fails is dropped and the run
/// continues.
///
/// # Errors
///
/// A record that fails validation aborts the fetch.
pub fn items_by_key<C: Client>(
    client: &C,
    config: &Config,
    keys: &[String],
    progress: &ProgressBar,
) -> Result<Vec<Item>, Error> {
    let mut items = Vec::with_capacity(keys.len());
    for key in keys {
        if let Some(item) = item_with_retry(client, config, key)? {
            items.push(item);
        }
        progress.inc(1);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{api::MockClient, ErrorKind};

    const ARTICLE_JSON: &str = include_str!("../../tests/data/journal_article.json");
    const NOTE_JSON: &str = include_str!("../../tests/data/note.json");

    fn config(page_size: usize) -> Config {
        Config {
            zotero_url: "http://zotero.test".to_owned(),
            group: "1".to_owned(),
            page_size,
            ..Config::default()
        }
    }

    fn record(key: &str) -> Value {
        json!({
            "key": key,
            "data": {
                "itemType": "preprint",
                "title": format!("Title {key}"),
                "creators": [],
                "url": "https://arxiv.org/abs/1",
            },
            "csljson": { "issued": { "date-parts": [[2022, 1]] } },
        })
    }

    fn note() -> Value {
        serde_json::from_str(NOTE_JSON).unwrap()
    }

    fn page(values: &[Value]) -> String {
        serde_json::to_string(values).unwrap()
    }

    #[test]
    fn pages_until_a_short_page() {
        let client = MockClient::ok([
            page(&[record("A"), record("B")]),
            page(&[record("C"), note()]),
            page(&[record("D")]),
        ]);

        let items =
            collection_items(&client, &config(2), "COLL", &ProgressBar::hidden()).unwrap();

        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(vec!["A", "B", "C", "D"], keys);
        assert_eq!(
            vec![
                "http://zotero.test/groups/1/collections/COLL/items?format=json&include=data,csljson&itemType=-attachment&limit=2&start=0",
                "http://zotero.test/groups/1/collections/COLL/items?format=json&include=data,csljson&itemType=-attachment&limit=2&start=2",
                "http://zotero.test/groups/1/collections/COLL/items?format=json&include=data,csljson&itemType=-attachment&limit=2&start=4",
            ],
            client.urls()
        );
    }

    #[test]
    fn short_page_of_notes_still_ends_the_loop() {
        let client = MockClient::ok([page(&[record("A"), record("B")]), page(&[note()])]);

        let items =
            collection_items(&client, &config(2), "COLL", &ProgressBar::hidden()).unwrap();

        assert_eq!(2, items.len());
        assert_eq!(2, client.urls().len());
    }

    #[test]
    fn empty_collection_is_one_request() {
        let client = MockClient::ok(["[]"]);

        let items =
            collection_items(&client, &config(100), "COLL", &ProgressBar::hidden()).unwrap();

        assert!(items.is_empty());
        assert_eq!(1, client.urls().len());
    }

    #[test]
    fn page_failure_aborts() {
        let client = MockClient::new([
            Ok(page(&[record("A")])),
            Err(MockClient::network_error()),
        ]);

        let err = collection_items(&client, &config(1), "COLL", &ProgressBar::hidden())
            .unwrap_err();
        assert_eq!(ErrorKind::IO, err.kind());
    }

    #[test]
    fn invalid_record_aborts() {
        let mut bad = record("A");
        bad["csljson"]["issued"]["date-parts"] = json!([[2020], [2021]]);
        let client = MockClient::ok([page(&[bad])]);

        let err = collection_items(&client, &config(10), "COLL", &ProgressBar::hidden())
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidDateRange, err.kind());
    }

    #[test]
    fn keys_are_listed_one_per_line() {
        let client = MockClient::ok(["AAAA1111\nBBBB2222\n\n"]);

        let keys = collection_keys(&client, &config(100), "COLL").unwrap();

        assert_eq!(vec!["AAAA1111", "BBBB2222"], keys);
        assert_eq!(
            vec!["http://zotero.test/groups/1/collections/COLL/items?format=keys&itemType=-attachment"],
            client.urls()
        );
    }

    #[test]
    fn single_item_fixture() {
        let client = MockClient::ok([ARTICLE_JSON]);

        let item = item(&client, &config(100), "QX7H2JLM").unwrap().unwrap();

        assert_eq!("QX7H2JLM", item.key);
        assert_eq!(
            vec!["http://zotero.test/groups/1/items/QX7H2JLM?format=json&include=data,csljson"],
            client.urls()
        );
    }

    #[test]
    fn single_note_is_none() {
        let client = MockClient::ok([NOTE_JSON]);
        assert_eq!(None, item(&client, &config(100), "NOTE0001").unwrap());
    }

    #[test]
    fn failed_item_is_retried_once() {
        let client = MockClient::new([
            Err(MockClient::network_error()),
            Ok(record("A").to_string()),
            Ok(record("B").to_string()),
        ]);
        let keys = ["A".to_owned(), "B".to_owned()];

        let items = items_by_key(&client, &config(100), &keys, &ProgressBar::hidden()).unwrap();

        assert_eq!(2, items.len());
        assert_eq!(3, client.urls().len());
    }

    #[test]
    fn item_failing_twice_is_dropped() {
        let client = MockClient::new([
            Err(MockClient::network_error()),
            Err(MockClient::network_error()),
            Ok(record("B").to_string()),
        ]);
        let keys = ["A".to_owned(), "B".to_owned()];

        let items = items_by_key(&client, &config(100), &keys, &ProgressBar::hidden()).unwrap();

        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(vec!["B"], keys);
    }

    #[test]
    fn invalid_item_is_not_retried() {
        let mut bad = record("A");
        bad["data"]["title"] = json!("");
        let client = MockClient::ok([bad.to_string()]);

        let err = items_by_key(
            &client,
            &config(100),
            &["A".to_owned()],
            &ProgressBar::hidden(),
        )
        .unwrap_err();

        assert_eq!(ErrorKind::Schema, err.kind());
        assert_eq!(1, client.urls().len());
    }
}
