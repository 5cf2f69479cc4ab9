use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::db::{Connection, DieselResult};
use crate::schema::comments;

#[derive(Clone, Debug, Queryable, Identifiable)]
pub struct Comment {
    /// The unique id of this comment
    pub id: i32,
    /// The id of the post this comment belongs to
    pub post_id: i32,
    /// The user who submitted the comment
    pub author: String,
    /// The comment's content
    pub text: String,
    /// The time of the comment's submission
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "comments"]
pub struct NewComment {
    pub post_id: i32,
    pub author: String,
    pub text: String,
}

#[derive(Clone, Debug, AsChangeset)]
#[table_name = "comments"]
pub struct CommentChanges {
    pub text: String,
}

/// Get a post's comments, oldest first.
pub fn for_post(connection: &Connection, post: i32) -> DieselResult<Vec<Comment>> {
    use crate::schema::comments::dsl;

    dsl::comments
        .filter(dsl::post_id.eq(post))
        .order(dsl::created_at.asc())
        .load(connection)
}

pub fn find(connection: &Connection, id: i32) -> DieselResult<Option<Comment>> {
    use crate::schema::comments::dsl;

    dsl::comments.find(id).first(connection).optional()
}

pub fn submit(connection: &Connection, comment: &NewComment) -> DieselResult<usize> {
    diesel::insert_into(comments::table)
        .values(comment)
        .execute(connection)
}

pub fn edit(connection: &Connection, id: i32, changes: &CommentChanges) -> DieselResult<usize> {
    use crate::schema::comments::dsl;

    diesel::update(dsl::comments.find(id))
        .set(changes)
        .execute(connection)
}

pub fn delete(connection: &Connection, id: i32) -> DieselResult<usize> {
    use crate::schema::comments::dsl;

    diesel::delete(dsl::comments.find(id)).execute(connection)
}
