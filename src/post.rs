use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;

use std::collections::HashMap;

use crate::category::Category;
use crate::db::{Connection, DieselResult};
use crate::location::Location;
use crate::schema::{categories, comments, locations, posts};

/// Number of posts shown per feed page.
pub const PAGE_SIZE: i64 = 10;

#[derive(Clone, Debug, Queryable, Identifiable)]
pub struct Post {
    /// The post's numeric id
    pub id: i32,
    /// The title of the post
    pub title: String,
    /// The post's content/body
    pub text: String,
    /// The time of publishing. May lie in the future for scheduled posts.
    pub pub_date: NaiveDateTime,
    /// Username of the post's author
    pub author: String,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
    /// Whether the author has published the post
    pub is_published: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "posts"]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub author: String,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
    pub is_published: bool,
}

#[derive(AsChangeset)]
#[table_name = "posts"]
#[changeset_options(treat_none_as_null = "true")]
pub struct PostChanges {
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
    pub is_published: bool,
}

/// A post joined with its category and location, annotated with the number of
/// comments it has received.
pub struct Entry {
    pub post: Post,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comment_count: i64,
}

type Row = (Post, Option<Category>, Option<Location>);

impl Post {
    /// Whether the post is visible to the general public: the post is
    /// published, files under a published category, and its publication date
    /// has passed. A post without a category is never public.
    pub fn is_public(&self, category: Option<&Category>, now: NaiveDateTime) -> bool {
        self.is_published
            && category.map(|c| c.is_published).unwrap_or(false)
            && self.pub_date <= now
    }

    /// Whether `viewer` may see the post. Authors always see their own posts,
    /// everyone else only published ones.
    pub fn visible_to(&self, category: Option<&Category>, viewer: Option<&str>) -> bool {
        viewer == Some(self.author.as_str()) || self.is_public(category, Utc::now().naive_utc())
    }
}

/// Outcome of the ownership check on a write request (post or comment
/// edit/delete).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WriteAccess {
    /// The requester is the author.
    Allowed,
    /// Nobody is logged in; send them to the login page.
    LoginRequired,
    /// Someone else's row; bounce to the detail page without touching it.
    NotOwner,
    /// The row doesn't exist.
    Missing,
}

/// Decide whether `viewer` may modify a row written by `author`. `author` is
/// `None` when the row was not found.
pub fn write_access(author: Option<&str>, viewer: Option<&str>) -> WriteAccess {
    match (viewer, author) {
        (None, _) => WriteAccess::LoginRequired,
        (Some(_), None) => WriteAccess::Missing,
        (Some(viewer), Some(author)) if viewer == author => WriteAccess::Allowed,
        _ => WriteAccess::NotOwner,
    }
}

/// Number of feed pages needed for `total` posts. An empty feed still has one
/// (empty) page.
pub fn page_count(total: i64) -> i64 {
    std::cmp::max(1, (total + PAGE_SIZE - 1) / PAGE_SIZE)
}

fn offset(page: i64) -> i64 {
    (std::cmp::max(page, 1) - 1) * PAGE_SIZE
}

/// Attach comment tallies to a page of joined post rows.
fn into_entries(connection: &Connection, rows: Vec<Row>) -> DieselResult<Vec<Entry>> {
    let ids: Vec<i32> = rows.iter().map(|(post, _, _)| post.id).collect();
    let mut tally: HashMap<i32, i64> = HashMap::new();
    for id in comments::table
        .filter(comments::post_id.eq_any(&ids))
        .select(comments::post_id)
        .load::<i32>(connection)?
    {
        *tally.entry(id).or_insert(0) += 1;
    }

    Ok(rows
        .into_iter()
        .map(|(post, category, location)| Entry {
            comment_count: tally.get(&post.id).copied().unwrap_or(0),
            post,
            category,
            location,
        })
        .collect())
}

/// One page of the public feed: published posts in published categories whose
/// publication date has passed, newest first.
pub fn published_page(connection: &Connection, page: i64) -> DieselResult<Vec<Entry>> {
    let now = Utc::now().naive_utc();
    let rows = posts::table
        .inner_join(categories::table)
        .left_join(locations::table)
        .filter(posts::is_published.eq(true))
        .filter(categories::is_published.eq(true))
        .filter(posts::pub_date.le(now))
        .order(posts::pub_date.desc())
        .limit(PAGE_SIZE)
        .offset(offset(page))
        .select((
            posts::all_columns,
            categories::all_columns.nullable(),
            locations::all_columns.nullable(),
        ))
        .load::<Row>(connection)?;
    into_entries(connection, rows)
}

pub fn published_count(connection: &Connection) -> DieselResult<i64> {
    let now = Utc::now().naive_utc();
    posts::table
        .inner_join(categories::table)
        .filter(posts::is_published.eq(true))
        .filter(categories::is_published.eq(true))
        .filter(posts::pub_date.le(now))
        .count()
        .get_result(connection)
}

/// One page of the public feed restricted to a single category.
pub fn category_page(
    connection: &Connection,
    category: &Category,
    page: i64,
) -> DieselResult<Vec<Entry>> {
    let now = Utc::now().naive_utc();
    let rows = posts::table
        .inner_join(categories::table)
        .left_join(locations::table)
        .filter(posts::category_id.eq(category.id))
        .filter(posts::is_published.eq(true))
        .filter(categories::is_published.eq(true))
        .filter(posts::pub_date.le(now))
        .order(posts::pub_date.desc())
        .limit(PAGE_SIZE)
        .offset(offset(page))
        .select((
            posts::all_columns,
            categories::all_columns.nullable(),
            locations::all_columns.nullable(),
        ))
        .load::<Row>(connection)?;
    into_entries(connection, rows)
}

pub fn category_count(connection: &Connection, category: &Category) -> DieselResult<i64> {
    let now = Utc::now().naive_utc();
    posts::table
        .filter(posts::category_id.eq(category.id))
        .filter(posts::is_published.eq(true))
        .filter(posts::pub_date.le(now))
        .count()
        .get_result(connection)
}

/// One page of a user's posts. When the profile owner is looking at their own
/// page every post is included, drafts and scheduled posts alike; anyone else
/// gets the published subset.
pub fn profile_page(
    connection: &Connection,
    username: &str,
    include_unpublished: bool,
    page: i64,
) -> DieselResult<Vec<Entry>> {
    let rows = if include_unpublished {
        posts::table
            .left_join(categories::table)
            .left_join(locations::table)
            .filter(posts::author.eq(username))
            .order(posts::pub_date.desc())
            .limit(PAGE_SIZE)
            .offset(offset(page))
            .select((
                posts::all_columns,
                categories::all_columns.nullable(),
                locations::all_columns.nullable(),
            ))
            .load::<Row>(connection)?
    } else {
        let now = Utc::now().naive_utc();
        posts::table
            .inner_join(categories::table)
            .left_join(locations::table)
            .filter(posts::author.eq(username))
            .filter(posts::is_published.eq(true))
            .filter(categories::is_published.eq(true))
            .filter(posts::pub_date.le(now))
            .order(posts::pub_date.desc())
            .limit(PAGE_SIZE)
            .offset(offset(page))
            .select((
                posts::all_columns,
                categories::all_columns.nullable(),
                locations::all_columns.nullable(),
            ))
            .load::<Row>(connection)?
    };
    into_entries(connection, rows)
}

pub fn profile_count(
    connection: &Connection,
    username: &str,
    include_unpublished: bool,
) -> DieselResult<i64> {
    if include_unpublished {
        posts::table
            .filter(posts::author.eq(username))
            .count()
            .get_result(connection)
    } else {
        let now = Utc::now().naive_utc();
        posts::table
            .inner_join(categories::table)
            .filter(posts::author.eq(username))
            .filter(posts::is_published.eq(true))
            .filter(categories::is_published.eq(true))
            .filter(posts::pub_date.le(now))
            .count()
            .get_result(connection)
    }
}

/// Get a single post with its category and location. Visibility is the
/// caller's concern.
pub fn find(connection: &Connection, id: i32) -> DieselResult<Option<Row>> {
    posts::table
        .left_join(categories::table)
        .left_join(locations::table)
        .filter(posts::id.eq(id))
        .select((
            posts::all_columns,
            categories::all_columns.nullable(),
            locations::all_columns.nullable(),
        ))
        .first::<Row>(connection)
        .optional()
}

/// Get the username of a post's author.
pub fn author(connection: &Connection, id: i32) -> DieselResult<Option<String>> {
    posts::table
        .find(id)
        .select(posts::author)
        .first(connection)
        .optional()
}

pub fn submit(connection: &Connection, post: &NewPost) -> DieselResult<usize> {
    diesel::insert_into(posts::table)
        .values(post)
        .execute(connection)
}

pub fn edit(connection: &Connection, id: i32, changes: &PostChanges) -> DieselResult<usize> {
    diesel::update(posts::table.find(id))
        .set(changes)
        .execute(connection)
}

/// Remove a post. Its comments go with it via the foreign key cascade.
pub fn delete(connection: &Connection, id: i32) -> DieselResult<usize> {
    diesel::delete(posts::table.find(id)).execute(connection)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{page_count, write_access, Post, WriteAccess, PAGE_SIZE};
    use crate::category::Category;

    fn post(is_published: bool, days_from_now: i64) -> Post {
        let now = Utc::now().naive_utc();
        Post {
            id: 1,
            title: String::from("Test post"),
            text: String::from("Test content"),
            pub_date: now + Duration::days(days_from_now),
            author: String::from("alice"),
            category_id: Some(1),
            location_id: None,
            is_published,
            created_at: now,
        }
    }

    fn category(is_published: bool) -> Category {
        Category {
            id: 1,
            title: String::from("General"),
            slug: String::from("general"),
            description: String::new(),
            is_published,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn published_post_is_public() {
        let now = Utc::now().naive_utc();
        assert!(post(true, -1).is_public(Some(&category(true)), now));
    }

    #[test]
    fn unpublished_post_is_hidden() {
        let now = Utc::now().naive_utc();
        assert!(!post(false, -1).is_public(Some(&category(true)), now));
    }

    #[test]
    fn future_post_is_hidden() {
        let now = Utc::now().naive_utc();
        assert!(!post(true, 1).is_public(Some(&category(true)), now));
    }

    #[test]
    fn unpublished_category_hides_post() {
        let now = Utc::now().naive_utc();
        assert!(!post(true, -1).is_public(Some(&category(false)), now));
    }

    #[test]
    fn uncategorized_post_is_hidden() {
        let now = Utc::now().naive_utc();
        assert!(!post(true, -1).is_public(None, now));
    }

    #[test]
    fn author_sees_own_draft() {
        let draft = post(false, 1);
        assert!(draft.visible_to(None, Some("alice")));
        assert!(!draft.visible_to(None, Some("bob")));
        assert!(!draft.visible_to(None, None));
    }

    #[test]
    fn author_may_write() {
        assert_eq!(
            write_access(Some("alice"), Some("alice")),
            WriteAccess::Allowed
        );
    }

    #[test]
    fn non_author_writes_are_bounced() {
        assert_eq!(
            write_access(Some("alice"), Some("bob")),
            WriteAccess::NotOwner
        );
    }

    #[test]
    fn anonymous_writes_go_to_login() {
        assert_eq!(write_access(Some("alice"), None), WriteAccess::LoginRequired);
        assert_eq!(write_access(None, None), WriteAccess::LoginRequired);
    }

    #[test]
    fn missing_rows_are_not_found() {
        assert_eq!(write_access(None, Some("alice")), WriteAccess::Missing);
    }

    #[test]
    fn pages() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(PAGE_SIZE), 1);
        assert_eq!(page_count(PAGE_SIZE + 1), 2);
    }
}
