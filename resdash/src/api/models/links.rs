//! Outbound portal links shown next to records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use utoipa::ToSchema;

/// Mapping from a record's display name to its cloud portal page.
///
/// Purely presentational: the dashboard renders a link when a record's `Name`
/// matches a key exactly, and shows a "no direct link" marker otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct PortalLinks {
    /// Display name to portal URL
    #[schema(value_type = BTreeMap<String, String>)]
    pub links: BTreeMap<String, Url>,
    /// Name whose link is promoted to the "manage resources" action above the list
    pub featured: Option<String>,
}

impl PortalLinks {
    pub fn link_for(&self, name: &str) -> Option<&Url> {
        self.links.get(name)
    }

    /// The featured name and its link, if both are configured.
    pub fn featured_link(&self) -> Option<(&str, &Url)> {
        let name = self.featured.as_deref()?;
        self.links.get(name).map(|url| (name, url))
    }
}
