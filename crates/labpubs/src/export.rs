//! Enriched publications and the artifacts written from them.

use std::{fs, path::Path};

use log::{info, trace};
use serde::Serialize;

use crate::{
    api::idconv::PmidMap,
    cite::{Formatted, Style},
    item::Item,
    Error, ErrorKind,
};

/// Full enriched list.
pub const PAPERS_JSON: &str = "papers.json";
/// Table of everything that is not a preprint.
pub const PUBS_CSV: &str = "pubs.csv";
/// Table of the preprints.
pub const PREPRINTS_CSV: &str = "preprints.csv";

const CSV_HEADERS: [&str; 5] = ["Month", "Year", "Citation", "PubMed ID", "DOI"];

const PAPERS_HEADER: &str = "## Papers";
const PUBLICATIONS_HEADER: &str = "### Publications";
const PREPRINTS_HEADER: &str = "### Preprints";

/// An item with its PubMed id attached, when one was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publication {
    /// The validated Zotero item.
    pub item: Item,
    /// PubMed id resolved from the item DOI.
    pub pmid: Option<String>,
}

impl Publication {
    /// The citation of the item in `style`.
    #[must_use]
    pub fn citation(&self, style: Style) -> String {
        crate::cite::citation(&self.item, style)
    }
}

/// Attach PubMed ids to items by DOI.
#[must_use]
pub fn enrich(items: Vec<Item>, pmids: &PmidMap) -> Vec<Publication> {
    items
        .into_iter()
        .map(|item| {
            let pmid = item
                .doi
                .as_deref()
                .and_then(|doi| pmids.get(doi))
                .map(str::to_owned);
            Publication { item, pmid }
        })
        .collect()
}

/// Newest first by year and month. Ties keep their input order.
pub fn sort_by_date(publications: &mut [Publication]) {
    publications.sort_by(|a, b| b.item.date.sort_key().cmp(&a.item.date.sort_key()));
}

/// Split into (publications, preprints).
#[must_use]
pub fn partition(publications: &[Publication]) -> (Vec<&Publication>, Vec<&Publication>) {
    publications
        .iter()
        .partition(|p| !p.item.kind.is_preprint())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonRecord<'a> {
    key: &'a str,
    item_type: &'a str,
    #[serde(flatten)]
    formatted: Formatted,
    #[serde(skip_serializing_if = "Option::is_none")]
    month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doi: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pmid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    citation: String,
}

impl<'a> From<&'a Publication> for JsonRecord<'a> {
    fn from(publication: &'a Publication) -> Self {
        let Publication { item, pmid } = publication;
        let formatted = Formatted::new(item, Style::Plain);
        let citation = formatted.citation();
        Self {
            key: &item.key,
            item_type: item.kind.name(),
            formatted,
            month: item.date.month,
            day: item.date.day,
            doi: item.doi.as_deref(),
            pmid: pmid.as_deref(),
            url: item.url.as_deref(),
            citation,
        }
    }
}

/// The full list as a pretty printed JSON array.
///
/// # Errors
///
/// An `Err` is returned when serialization fails.
pub fn to_json(publications: &[Publication]) -> Result<String, Error> {
    let records: Vec<JsonRecord<'_>> = publications.iter().map(JsonRecord::from).collect();
    serde_json::to_string_pretty(&records).map_err(|e| Error::wrap(ErrorKind::Deserialize, e))
}

#[derive(Serialize)]
struct CsvRow<'a> {
    month: Option<u32>,
    year: i32,
    citation: String,
    pmid: Option<&'a str>,
    doi: Option<&'a str>,
}

/// One row per publication under the `Month, Year, Citation, PubMed ID, DOI` header.
///
/// # Errors
///
/// An `Err` is returned when a row cannot be written.
pub fn to_csv<'a, I>(publications: I) -> Result<String, Error>
where
    I: IntoIterator<Item = &'a Publication>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    writer
        .write_record(CSV_HEADERS)
        .map_err(|e| Error::wrap(ErrorKind::IO, e))?;

    for publication in publications {
        let row = CsvRow {
            month: publication.item.date.month,
            year: publication.item.date.year,
            citation: publication.citation(Style::Plain),
            pmid: publication.pmid.as_deref(),
            doi: publication.item.doi.as_deref(),
        };
        writer
            .serialize(row)
            .map_err(|e| Error::wrap(ErrorKind::IO, e))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::new(ErrorKind::IO, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::wrap(ErrorKind::Deserialize, e))
}

fn markdown_table(publications: &[&Publication]) -> String {
    let mut table = String::from("| Year | Citation | PubMed |\n| --- | --- | --- |\n");
    for publication in publications {
        let pubmed = publication
            .pmid
            .as_deref()
            .map(|pmid| format!("[{pmid}](https://pubmed.ncbi.nlm.nih.gov/{pmid}/)"))
            .unwrap_or_default();
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            publication.item.date.year,
            publication.citation(Style::Rich).replace('|', "\\|"),
            pubmed
        ));
    }
    table
}

/// The `## Papers` Markdown section with one table for publications and one for preprints.
#[must_use]
pub fn readme_section(publications: &[Publication]) -> String {
    let (pubs, preprints) = partition(publications);
    format!(
        "{PAPERS_HEADER}\n\n{PUBLICATIONS_HEADER}\n\n{}\n{PREPRINTS_HEADER}\n\n{}",
        markdown_table(&pubs),
        markdown_table(&preprints)
    )
}

/// Replace the `## Papers` section of `readme` with `section`, or append it when missing.
///
/// The replaced section runs up to the next level two header.
#[must_use]
pub fn splice_readme(readme: &str, section: &str) -> String {
    let lines: Vec<&str> = readme.lines().collect();
    let start = match lines.iter().position(|l| l.trim_end() == PAPERS_HEADER) {
        Some(start) => start,
        None => {
            let mut out = readme.trim_end().to_owned();
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(section);
            return out;
        }
    };
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with("## "))
        .map_or(lines.len(), |i| start + 1 + i);

    let mut out = String::new();
    for line in &lines[..start] {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(section);
    if end < lines.len() {
        out.push('\n');
        for line in &lines[end..] {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

fn write(path: &Path, contents: &str) -> Result<(), Error> {
    trace!("Writing '{}'", path.display());
    fs::write(path, contents).map_err(|e| {
        Error::new(
            ErrorKind::IO,
            format!("cannot write '{}': {e}", path.display()),
        )
    })
}

/// Write `papers.json`, `pubs.csv` and `preprints.csv` into `dir`, creating it if needed.
///
/// # Errors
///
/// An `Err` is returned when the directory or a file cannot be written.
pub fn write_all(dir: &Path, publications: &[Publication]) -> Result<(), Error> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::new(
            ErrorKind::IO,
            format!("cannot create '{}': {e}", dir.display()),
        )
    })?;

    let (pubs, preprints) = partition(publications);
    write(&dir.join(PAPERS_JSON), &to_json(publications)?)?;
    write(&dir.join(PUBS_CSV), &to_csv(pubs)?)?;
    write(&dir.join(PREPRINTS_CSV), &to_csv(preprints)?)?;

    info!(
        "Wrote {} publications to '{}'",
        publications.len(),
        dir.display()
    );
    Ok(())
}

/// Splice the publication tables into the README at `path`, creating it when missing.
///
/// # Errors
///
/// An `Err` is returned when the README exists but cannot be read, or cannot be written.
pub fn write_readme(path: &Path, publications: &[Publication]) -> Result<(), Error> {
    let readme = if path.exists() {
        fs::read_to_string(path).map_err(|e| {
            Error::new(
                ErrorKind::IO,
                format!("cannot read '{}': {e}", path.display()),
            )
        })?
    } else {
        String::new()
    };

    write(path, &splice_readme(&readme, &readme_section(publications)))
}
