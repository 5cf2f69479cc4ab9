use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::{Connection, DieselResult};
use crate::schema::categories;

#[derive(Clone, Debug, Queryable, Identifiable)]
#[table_name = "categories"]
pub struct Category {
    pub id: i32,
    /// The display name of the category
    pub title: String,
    /// The unique url fragment the category is reached under
    pub slug: String,
    pub description: String,
    /// Whether posts in this category are visible to the public
    pub is_published: bool,
    pub created_at: NaiveDateTime,
}

/// Get the published category with the given slug. Unpublished categories are
/// treated as missing.
pub fn by_slug(connection: &Connection, slug: &str) -> DieselResult<Option<Category>> {
    use crate::schema::categories::dsl;

    dsl::categories
        .filter(dsl::slug.eq(slug))
        .filter(dsl::is_published.eq(true))
        .first(connection)
        .optional()
}

/// All published categories, for the post form's category picker.
pub fn published(connection: &Connection) -> DieselResult<Vec<Category>> {
    use crate::schema::categories::dsl;

    dsl::categories
        .filter(dsl::is_published.eq(true))
        .order(dsl::title.asc())
        .load(connection)
}
