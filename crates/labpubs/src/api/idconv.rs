//! DOI to PubMed id resolution through the NCBI PMC ID converter.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, trace};
use reqwest::Url;
use serde::Deserialize;

use crate::{Config, Error, ErrorKind};

use super::Client;

/// DOI to PMID lookup table. Keys are lower-cased DOIs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PmidMap(BTreeMap<String, String>);

impl PmidMap {
    /// The PMID of `doi`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, doi: &str) -> Option<&str> {
        self.0.get(&doi.to_lowercase()).map(String::as_str)
    }

    /// Number of DOIs with a PMID.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no DOI was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `doi` has a PMID, matched case-insensitively.
    #[must_use]
    pub fn contains(&self, doi: &str) -> bool {
        self.get(doi).is_some()
    }
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct Record {
    doi: Option<String>,
    #[serde(rename = "requested-id")]
    requested_id: Option<String>,
    pmid: Option<String>,
}

/// Resolve `dois` to PubMed ids, `config.idconv_batch` DOIs per request.
///
/// DOIs the service has no PMID for are left out of the map.
///
/// # Errors
///
/// A failed request aborts the resolution.
pub fn resolve_pmids<'a, C, I>(client: &C, config: &Config, dois: I) -> Result<PmidMap, Error>
where
    C: Client,
    I: IntoIterator<Item = &'a str>,
{
    let dois: Vec<String> = dois
        .into_iter()
        .map(str::to_lowercase)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    info!("Resolving PubMed ids for {} DOIs", dois.len());

    let mut map = BTreeMap::new();
    for batch in dois.chunks(config.idconv_batch) {
        let mut params = vec![
            ("ids", batch.join(",")),
            ("format", "json".to_owned()),
            ("tool", config.idconv_tool.clone()),
        ];
        if let Some(email) = &config.idconv_email {
            params.push(("email", email.clone()));
        }
        // DOIs may contain `#`, `+` or `&`
        let url = Url::parse_with_params(&config.idconv_url, &params)
            .map_err(|e| Error::wrap(ErrorKind::Schema, e))?;
        trace!("Requesting id conversion at '{url}'");

        let Response { records } = client.get_json(url.as_str())?;
        for record in records {
            let Record {
                doi,
                requested_id,
                pmid,
            } = record;
            match (doi.or(requested_id), pmid.filter(|p| !p.is_empty())) {
                (Some(doi), Some(pmid)) => {
                    map.insert(doi.to_lowercase(), pmid);
                }
                (Some(doi), None) => debug!("No PubMed id for '{doi}'"),
                (None, _) => {}
            }
        }
    }

    info!("Resolved {} PubMed ids", map.len());
    Ok(PmidMap(map))
}
