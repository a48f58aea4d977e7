//! Row structs for the `documents` table. Internal to the adapter.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::domain::ports::DocPath;

use super::schema::documents;

/// Columns read back for queries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DocumentRow {
    pub path: String,
    pub data: Value,
}

/// Insertable row derived from a [`DocPath`].
#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub(crate) struct NewDocumentRow<'a> {
    pub path: &'a str,
    pub parent: String,
    pub collection_name: String,
    pub doc_id: &'a str,
    pub data: &'a Value,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewDocumentRow<'a> {
    pub fn new(path: &'a DocPath, data: &'a Value, updated_at: DateTime<Utc>) -> Self {
        let parent = path.parent();
        Self {
            path: path.as_str(),
            collection_name: parent.name().to_owned(),
            parent: parent.as_str().to_owned(),
            doc_id: path.id(),
            data,
            updated_at,
        }
    }
}
