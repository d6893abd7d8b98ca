//! Toolkit-free description of what the dashboard shows.
//!
//! [`render`] turns a [`Session`] into a [`View`]; front ends draw the view however they
//! like. The `Display` impl is the terminal rendering used by `resdash-console`.

use std::borrow::Cow;
use std::fmt;
use url::Url;

use crate::api::models::links::PortalLinks;
use crate::api::models::resources::{NAME_FIELD, Resource};
use crate::ui::filter::filter_records;
use crate::ui::state::{RecordKey, Session, ViewState};

pub const CHECKING_MESSAGE: &str = "Checking API connection...";
pub const UNAVAILABLE_MESSAGE: &str = "Could not connect to the backend or database.";
pub const MISSING_FIELD: &str = "N/A";
pub const UNNAMED_RECORD: &str = "Unnamed User";
pub const NO_LINK_MARKER: &str = "(No direct link available)";

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Current search term; `None` when the search bar is hidden
    pub search_bar: Option<String>,
    pub panel: Panel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Checking,
    Error {
        message: String,
    },
    ReadyEmpty {
        loading: bool,
        notice: Option<Notice>,
    },
    ReadyWithData {
        featured: Option<FeaturedLink>,
        rows: Vec<RowView>,
        notice: Option<Notice>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedLink {
    pub name: String,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub key: RecordKey,
    pub title: String,
    /// Present only for the expanded record
    pub details: Option<RowDetails>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowDetails {
    pub resource_group: String,
    pub subscription: String,
    pub location: String,
    pub portal_link: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A load finished and the table was empty
    NoData,
    NoMatches { term: String },
}

pub fn render(session: &Session, links: &PortalLinks) -> View {
    let state = session.view_state();
    let search_bar = (state == ViewState::ReadyWithData).then(|| session.search.clone());

    let panel = match state {
        ViewState::Checking => Panel::Checking,
        ViewState::Error => Panel::Error {
            message: session.error.clone().unwrap_or_else(|| UNAVAILABLE_MESSAGE.to_string()),
        },
        ViewState::ReadyEmpty => Panel::ReadyEmpty {
            loading: session.loading,
            notice: (session.loaded && !session.loading).then_some(Notice::NoData),
        },
        ViewState::ReadyWithData => {
            let rows: Vec<RowView> = filter_records(&session.records, &session.search)
                .into_iter()
                .map(|(key, record)| row_view(key, record, session.expanded == Some(key), links))
                .collect();
            let notice = (rows.is_empty() && !session.search.is_empty()).then(|| Notice::NoMatches {
                term: session.search.clone(),
            });
            Panel::ReadyWithData {
                featured: links.featured_link().map(|(name, url)| FeaturedLink {
                    name: name.to_string(),
                    url: url.clone(),
                }),
                rows,
                notice,
            }
        }
    };

    View { search_bar, panel }
}

fn row_view(key: RecordKey, record: &Resource, expanded: bool, links: &PortalLinks) -> RowView {
    let details = expanded.then(|| RowDetails {
        resource_group: or_missing(record.resource_group(), MISSING_FIELD),
        subscription: or_missing(record.subscription(), MISSING_FIELD),
        location: or_missing(record.location(), MISSING_FIELD),
        portal_link: record.name().and_then(|name| links.link_for(name)).cloned(),
    });

    RowView {
        key,
        title: or_missing(record.display(NAME_FIELD), UNNAMED_RECORD),
        details,
    }
}

fn or_missing(value: Option<Cow<'_, str>>, placeholder: &str) -> String {
    value.map_or_else(|| placeholder.to_string(), Cow::into_owned)
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoData => write!(f, "No records found in the resources table."),
            Notice::NoMatches { term } => write!(f, "No users found matching \"{term}\"."),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(term) = &self.search_bar {
            writeln!(f, "Search: {term}")?;
        }

        match &self.panel {
            Panel::Checking => writeln!(f, "{CHECKING_MESSAGE}"),
            Panel::Error { message } => {
                writeln!(f, "API / Database Unavailable")?;
                writeln!(f, "  {message}")?;
                writeln!(f, "  [retry] Retry Connection")
            }
            Panel::ReadyEmpty { loading, notice } => {
                writeln!(f, "API Ready")?;
                if *loading {
                    writeln!(f, "  Loading users...")?;
                } else {
                    writeln!(f, "  Backend API is connected. Ready to load user data.")?;
                    writeln!(f, "  [load] Load Users")?;
                }
                if let Some(notice) = notice {
                    writeln!(f, "  {notice}")?;
                }
                Ok(())
            }
            Panel::ReadyWithData { featured, rows, notice } => {
                if let Some(featured) = featured {
                    writeln!(f, "Manage {}'s Resources: {}", featured.name, featured.url)?;
                }
                for row in rows {
                    let marker = if row.details.is_some() { '-' } else { '+' };
                    writeln!(f, "{marker} [{}] {}", row.key.0 + 1, row.title)?;
                    if let Some(details) = &row.details {
                        writeln!(f, "      Resource Group: {}", details.resource_group)?;
                        writeln!(f, "      Subscription:   {}", details.subscription)?;
                        writeln!(f, "      Location:       {}", details.location)?;
                        match &details.portal_link {
                            Some(url) => writeln!(f, "      Open Resource Group: {url}")?,
                            None => writeln!(f, "      {NO_LINK_MARKER}")?,
                        }
                    }
                }
                if let Some(notice) = notice {
                    writeln!(f, "{notice}")?;
                }
                Ok(())
            }
        }
    }
}
