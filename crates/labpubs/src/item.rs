//! Normalized bibliographic items and the validation of raw Zotero records into them.
//!
//! A raw record is the item envelope the Zotero API returns with `include=data,csljson`. The
//! `data` document supplies the fields, the `csljson` document supplies the date parts.

use std::collections::HashSet;

use log::trace;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{Error, ErrorKind};

/// A validated bibliographic item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    /// Stable identifier assigned by Zotero.
    pub key: String,
    /// Title as entered in Zotero.
    pub title: String,
    /// Creators in citation order.
    pub creators: Vec<Creator>,
    /// Issue date taken from the CSL JSON `issued` parts.
    pub date: Date,
    /// DOI without a resolver prefix.
    pub doi: Option<String>,
    /// Landing page of the item.
    pub url: Option<String>,
    /// Item type and its venue fields.
    pub kind: ItemKind,
}

/// The item type together with the venue fields that are meaningful for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
    /// `journalArticle`
    JournalArticle {
        /// Journal name.
        publication_title: Option<String>,
        /// Journal volume.
        volume: Option<String>,
        /// Journal issue.
        issue: Option<String>,
        /// Page range or article number.
        pages: Option<String>,
    },
    /// The server is inferred from the item `url`.
    Preprint,
    /// `thesis`, which has no venue.
    Thesis,
    /// `conferencePaper`
    ConferencePaper {
        /// Title of the proceedings volume.
        proceedings_title: Option<String>,
    },
    /// `bookSection`
    BookSection {
        /// Title of the book the section appears in.
        book_title: Option<String>,
    },
    /// `report`
    Report {
        /// Publishing institution.
        institution: Option<String>,
        /// Page count or range.
        pages: Option<String>,
    },
    /// Any item type the formatter has no rule for.
    Other(String),
}

impl ItemKind {
    /// The Zotero `itemType` name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::JournalArticle { .. } => "journalArticle",
            Self::Preprint => "preprint",
            Self::Thesis => "thesis",
            Self::ConferencePaper { .. } => "conferencePaper",
            Self::BookSection { .. } => "bookSection",
            Self::Report { .. } => "report",
            Self::Other(name) => name,
        }
    }

    /// Preprints are exported apart from the other publications.
    #[must_use]
    pub const fn is_preprint(&self) -> bool {
        matches!(self, Self::Preprint)
    }
}

/// A creator of an item and the role it was credited with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Creator {
    /// Zotero `creatorType`, e.g. `author` or `editor`.
    pub role: String,
    /// Personal or organizational name.
    pub name: CreatorName,
}

impl Creator {
    /// Only authors appear in a citation.
    #[must_use]
    pub fn is_author(&self) -> bool {
        self.role == "author"
    }
}

/// The name of a creator as Zotero stores it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreatorName {
    /// A two field name.
    Person {
        /// Given names, may be empty.
        first: String,
        /// Family name.
        last: String,
    },
    /// Consortium or organizational author, kept as a single string.
    Organization(String),
}

/// Publication date, only the year is required.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Date {
    /// Four digit year.
    pub year: i32,
    /// Month from 1 to 12.
    pub month: Option<u32>,
    /// Day of the month.
    pub day: Option<u32>,
}

impl Date {
    /// Key used to order items, a missing month sorts as month 0.
    #[must_use]
    pub fn sort_key(&self) -> (i32, u32) {
        (self.year, self.month.unwrap_or(0))
    }
}

impl Item {
    /// Validate a raw item envelope.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Schema`] when a required field is missing or malformed and
    /// [`ErrorKind::InvalidDateRange`] when the date holds more than one range.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let raw: RawEnvelope = serde_json::from_value(value)
            .map_err(|e| Error::new(ErrorKind::Schema, e.to_string()))?;
        raw.try_into()
    }
}

/// Returns `true` for raw envelopes that hold a note rather than a bibliographic record.
#[must_use]
pub fn is_note(value: &Value) -> bool {
    value
        .pointer("/data/itemType")
        .and_then(Value::as_str)
        .map_or(false, |t| t == "note")
}

/// Check that no key appears in both collections.
///
/// # Errors
///
/// [`ErrorKind::Invariant`] naming the first shared key.
pub fn ensure_disjoint<'a, A, B>(publications: A, preprints: B) -> Result<(), Error>
where
    A: IntoIterator<Item = &'a str>,
    B: IntoIterator<Item = &'a str>,
{
    let seen: HashSet<&str> = publications.into_iter().collect();
    match preprints.into_iter().find(|key| seen.contains(key)) {
        Some(key) => Err(Error::new(
            ErrorKind::Invariant,
            format!("item '{key}' is in both the publications and preprints collections"),
        )),
        None => Ok(()),
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    key: String,
    data: RawData,
    csljson: Option<RawCsl>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawData {
    item_type: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    title: Option<String>,
    creators: Vec<RawCreator>,
    #[serde(rename = "DOI", default, deserialize_with = "empty_as_none")]
    doi: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    url: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    publication_title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    volume: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    issue: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pages: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    proceedings_title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    book_title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    institution: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCreator {
    creator_type: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    first_name: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    last_name: Option<String>,
}

#[derive(Deserialize)]
struct RawCsl {
    issued: Option<RawIssued>,
}

#[derive(Deserialize)]
struct RawIssued {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<DatePart>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatePart {
    Number(i64),
    Text(String),
}

impl DatePart {
    fn to_int(&self) -> Result<i64, Error> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                Error::new(ErrorKind::Schema, format!("date part '{s}' is not a number"))
            }),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

impl TryFrom<RawCreator> for Creator {
    type Error = Error;

    fn try_from(raw: RawCreator) -> Result<Self, Error> {
        let RawCreator {
            creator_type,
            name,
            first_name,
            last_name,
        } = raw;

        let name = match (name, last_name) {
            (Some(name), _) => CreatorName::Organization(name),
            (None, Some(last)) => CreatorName::Person {
                first: first_name.unwrap_or_default(),
                last,
            },
            (None, None) => {
                return Err(Error::new(
                    ErrorKind::Schema,
                    "creator has neither a name nor a last name",
                ))
            }
        };

        Ok(Self {
            role: creator_type,
            name,
        })
    }
}

impl TryFrom<RawIssued> for Date {
    type Error = Error;

    fn try_from(issued: RawIssued) -> Result<Self, Error> {
        let RawIssued { mut date_parts } = issued;
        if date_parts.len() != 1 {
            return Err(Error::new(
                ErrorKind::InvalidDateRange,
                format!("expected a single date range but found {}", date_parts.len()),
            ));
        }

        let parts = date_parts.remove(0);
        if parts.is_empty() || parts.len() > 3 {
            return Err(Error::new(
                ErrorKind::Schema,
                format!("date range has {} parts", parts.len()),
            ));
        }

        let parts = parts
            .iter()
            .map(DatePart::to_int)
            .collect::<Result<Vec<_>, _>>()?;

        let year = i32::try_from(parts[0])
            .map_err(|_| Error::new(ErrorKind::Schema, "year is out of range"))?;
        let part = |i: usize| {
            parts
                .get(i)
                .map(|&p| {
                    u32::try_from(p).map_err(|_| {
                        Error::new(ErrorKind::Schema, format!("date part '{p}' is negative"))
                    })
                })
                .transpose()
        };

        Ok(Self {
            year,
            month: part(1)?,
            day: part(2)?,
        })
    }
}

impl TryFrom<RawEnvelope> for Item {
    type Error = Error;

    fn try_from(raw: RawEnvelope) -> Result<Self, Error> {
        // Deconstruct to take ownership of the fields.
        let RawEnvelope { key, data, csljson } = raw;
        trace!("Validating item '{key}' of type '{}'", data.item_type);

        let title = data.title.ok_or_else(|| {
            Error::new(ErrorKind::Schema, format!("item '{key}' has no title"))
        })?;

        let date: Date = csljson
            .and_then(|csl| csl.issued)
            .ok_or_else(|| Error::new(ErrorKind::Schema, format!("item '{key}' has no date")))?
            .try_into()?;

        let creators = data
            .creators
            .into_iter()
            .map(Creator::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let kind = match data.item_type.as_str() {
            "journalArticle" => ItemKind::JournalArticle {
                publication_title: data.publication_title,
                volume: data.volume,
                issue: data.issue,
                pages: data.pages,
            },
            "preprint" => ItemKind::Preprint,
            "thesis" => ItemKind::Thesis,
            "conferencePaper" => ItemKind::ConferencePaper {
                proceedings_title: data.proceedings_title,
            },
            "bookSection" => ItemKind::BookSection {
                book_title: data.book_title,
            },
            "report" => ItemKind::Report {
                institution: data.institution,
                pages: data.pages,
            },
            _ => ItemKind::Other(data.item_type.clone()),
        };

        Ok(Self {
            key,
            title,
            creators,
            date,
            doi: data.doi,
            url: data.url,
            kind,
        })
    }
}
