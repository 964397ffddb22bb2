//! Run configuration.
//!
//! A [`Config`] is loaded in layers: built-in defaults, then a `labpubs.toml` file in the working
//! directory (when present), then `LABPUBS_*` environment variables, e.g. `LABPUBS_GROUP=12345`.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, ErrorKind};

/// Name of the optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "labpubs.toml";

/// Largest `limit` the Zotero Web API honours for a single page.
pub const MAX_PAGE_SIZE: usize = 100;

/// How items are retrieved from a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    /// Request full item records a page at a time.
    Paged,
    /// List the item keys of a collection, then request each item on its own.
    PerItem,
}

/// Everything the fetchers need to know about the remote services.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Zotero Web API.
    pub zotero_url: String,
    /// Zotero group library id.
    #[serde(deserialize_with = "string_or_number")]
    pub group: String,
    /// Collection holding peer reviewed publications.
    #[serde(deserialize_with = "string_or_number")]
    pub publications: String,
    /// Collection holding preprints.
    #[serde(deserialize_with = "string_or_number")]
    pub preprints: String,
    /// Sent as the `Zotero-API-Key` header when set.
    pub api_key: Option<String>,
    /// Items requested per page, at most [`MAX_PAGE_SIZE`].
    pub page_size: usize,
    /// Whether collections are fetched a page at a time or item by item.
    pub fetch_mode: FetchMode,
    /// NCBI PMC ID converter endpoint.
    pub idconv_url: String,
    /// Number of DOIs sent per converter request.
    pub idconv_batch: usize,
    /// `tool` parameter identifying this program to NCBI.
    pub idconv_tool: String,
    /// Contact address sent as the `email` parameter.
    pub idconv_email: Option<String>,
    /// README to splice the generated publication tables into.
    pub readme: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zotero_url: "https://api.zotero.org".to_owned(),
            group: String::new(),
            publications: String::new(),
            preprints: String::new(),
            api_key: None,
            page_size: 100,
            fetch_mode: FetchMode::Paged,
            idconv_url: "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/".to_owned(),
            idconv_batch: 100,
            idconv_tool: "labpubs".to_owned(),
            idconv_email: None,
            readme: None,
        }
    }
}

impl Config {
    /// Load the configuration, reading `labpubs.toml` from `dir` if it exists.
    ///
    /// The group and both collection ids have no default and must be set by a layer.
    ///
    /// # Errors
    ///
    /// An `Err` is returned when a layer cannot be extracted into a [`Config`] or the resulting
    /// values are out of range.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        Self::load_with_env(dir, Env::prefixed("LABPUBS_"))
    }

    fn load_with_env(dir: &Path, env: Env) -> Result<Self, Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = dir.join(CONFIG_FILE);
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }

        figment = figment.merge(env);

        let config: Self = figment
            .extract()
            .map_err(|e| Error::new(ErrorKind::Deserialize, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("group", &self.group),
            ("publications", &self.publications),
            ("preprints", &self.preprints),
        ] {
            if value.is_empty() {
                return Err(Error::new(ErrorKind::Schema, format!("{name} is not set")));
            }
        }
        if self.page_size == 0 {
            return Err(Error::new(ErrorKind::Schema, "page_size must be at least 1"));
        }
        // a larger limit is served as a short page, which would end paging early
        if self.page_size > MAX_PAGE_SIZE {
            return Err(Error::new(
                ErrorKind::Schema,
                format!("page_size must be at most {MAX_PAGE_SIZE}"),
            ));
        }
        if self.idconv_batch == 0 {
            return Err(Error::new(
                ErrorKind::Schema,
                "idconv_batch must be at least 1",
            ));
        }
        Ok(())
    }

    /// URL of the items endpoint for one collection of the configured group.
    #[must_use]
    pub fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/groups/{}/collections/{collection}/items",
            self.zotero_url.trim_end_matches('/'),
            self.group
        )
    }

    /// URL of a single item in the configured group.
    #[must_use]
    pub fn item_url(&self, key: &str) -> String {
        format!(
            "{}/groups/{}/items/{key}",
            self.zotero_url.trim_end_matches('/'),
            self.group
        )
    }
}

// Zotero ids are numeric, and the environment layer hands digits over as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
