use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::{Connection, DieselResult};
use crate::schema::locations;

#[derive(Clone, Debug, Queryable, Identifiable)]
#[table_name = "locations"]
pub struct Location {
    pub id: i32,
    pub name: String,
    /// Whether the location may be shown on post pages
    pub is_published: bool,
    pub created_at: NaiveDateTime,
}

/// All published locations, for the post form's location picker.
pub fn published(connection: &Connection) -> DieselResult<Vec<Location>> {
    use crate::schema::locations::dsl;

    dsl::locations
        .filter(dsl::is_published.eq(true))
        .order(dsl::name.asc())
        .load(connection)
}
