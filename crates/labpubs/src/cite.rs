//! Citation formatting.
//!
//! A citation has the shape `<authors>, "<title>", <venue> (<year>).` where the venue depends on
//! the item type. Formatting never fails: an item type without a venue rule gets an empty venue
//! and a warning.

use log::warn;
use serde::Serialize;

use crate::item::{Creator, CreatorName, Item, ItemKind};

/// Known preprint servers, matched in order against the lower-cased item URL.
const PREPRINT_SERVERS: [(&str, &str); 5] = [
    ("arxiv", "arXiv"),
    ("biorxiv", "bioRxiv"),
    ("medrxiv", "medRxiv"),
    ("osf", "OSF"),
    ("ssrn", "SSRN"),
];

/// How a citation is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    /// No markup, used for the JSON and CSV exports.
    Plain,
    /// Markdown emphasis on the journal name (`*Nature*`) and volume (`**600**`).
    Rich,
}

/// The displayable parts of an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Formatted {
    /// Item title.
    pub title: String,
    /// Joined author names.
    pub authors: String,
    /// Journal, server or other venue, empty when unknown.
    pub venue: String,
    /// Publication year.
    pub year: i32,
}

impl Formatted {
    /// Format each part of `item` in `style`.
    #[must_use]
    pub fn new(item: &Item, style: Style) -> Self {
        Self {
            title: item.title.clone(),
            authors: format_authors(&item.creators),
            venue: venue(item, style),
            year: item.date.year,
        }
    }

    /// Render the parts as one citation string.
    #[must_use]
    pub fn citation(&self) -> String {
        if self.venue.is_empty() {
            format!("{}, \"{}\" ({}).", self.authors, self.title, self.year)
        } else {
            format!(
                "{}, \"{}\", {} ({}).",
                self.authors, self.title, self.venue, self.year
            )
        }
    }
}

/// Format an item as a citation string.
#[must_use]
pub fn citation(item: &Item, style: Style) -> String {
    Formatted::new(item, style).citation()
}

/// The capital letters of a first name, in order and without separators.
#[must_use]
pub fn initials(first: &str) -> String {
    first.chars().filter(|c| c.is_uppercase()).collect()
}

fn format_creator(name: &CreatorName) -> String {
    match name {
        CreatorName::Organization(name) => name.clone(),
        CreatorName::Person { first, last } => {
            let initials = initials(first);
            if initials.is_empty() {
                last.clone()
            } else {
                format!("{initials} {last}")
            }
        }
    }
}

/// Join the `author` creators, two authors are joined with `and`, any other count with commas.
#[must_use]
pub fn format_authors(creators: &[Creator]) -> String {
    let authors: Vec<String> = creators
        .iter()
        .filter(|c| c.is_author())
        .map(|c| format_creator(&c.name))
        .collect();

    if authors.len() == 2 {
        authors.join(" and ")
    } else {
        authors.join(", ")
    }
}

fn preprint_server(url: Option<&str>) -> &'static str {
    let url = url.map(str::to_lowercase).unwrap_or_default();
    PREPRINT_SERVERS
        .iter()
        .find(|(needle, _)| url.contains(needle))
        .map_or("Preprint", |&(_, name)| name)
}

fn journal(
    publication_title: &str,
    volume: Option<&str>,
    issue: Option<&str>,
    pages: Option<&str>,
    style: Style,
) -> String {
    let mut venue = match style {
        Style::Plain => publication_title.to_owned(),
        Style::Rich => format!("*{publication_title}*"),
    };

    if let Some(volume) = volume {
        venue.push(' ');
        match style {
            Style::Plain => venue.push_str(volume),
            Style::Rich => venue.push_str(&format!("**{volume}**")),
        }
    }
    if let Some(issue) = issue {
        venue.push_str(&format!("({issue})"));
    }
    if let Some(pages) = pages {
        venue.push(if volume.is_some() || issue.is_some() {
            ':'
        } else {
            ' '
        });
        venue.push_str(pages);
    }
    venue
}

/// The venue part of a citation.
#[must_use]
pub fn venue(item: &Item, style: Style) -> String {
    match &item.kind {
        ItemKind::Thesis => "Thesis".to_owned(),
        ItemKind::Preprint => preprint_server(item.url.as_deref()).to_owned(),
        ItemKind::JournalArticle {
            publication_title: Some(title),
            volume,
            issue,
            pages,
        } => journal(
            title,
            volume.as_deref(),
            issue.as_deref(),
            pages.as_deref(),
            style,
        ),
        ItemKind::JournalArticle {
            publication_title: None,
            ..
        } => String::new(),
        ItemKind::ConferencePaper { proceedings_title } => {
            proceedings_title.clone().unwrap_or_default()
        }
        ItemKind::BookSection { book_title } => book_title
            .as_ref()
            .map(|t| format!("{t} (Book)"))
            .unwrap_or_default(),
        ItemKind::Report { institution, pages } => {
            let parts: Vec<&str> = [institution.as_deref(), pages.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            parts.join(" ")
        }
        ItemKind::Other(name) => {
            warn!(
                "No citation rule for item '{}' of type '{name}', leaving the venue empty",
                item.key
            );
            String::new()
        }
    }
}
