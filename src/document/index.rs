//! The feed pages: front page, category feeds and user profiles.

use askama::Template;
use gotham::state::{FromState, State};

use super::{pages, DocumentResult, TemplateExt};
use crate::{
    category,
    db::DbConnection,
    handler::{PageQuery, SlugPath, UserPath},
    post::{self, Entry},
    user::{self, Session, User},
};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    entries: Vec<Entry>,
    page: i64,
    pages: i64,
    session: Option<&'a Session>,
}

/// The front page: every post the public may see, newest first.
pub fn index(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let page = PageQuery::borrow_from(state).page();

    let entries = post::published_page(connection, page)?;
    let total = post::published_count(connection)?;

    let template = IndexTemplate {
        entries,
        page,
        pages: post::page_count(total),
        session: Session::try_borrow_from(state),
    };
    Ok(template.to_response(state))
}

#[derive(Template)]
#[template(path = "category.html")]
struct CategoryTemplate<'a> {
    category: category::Category,
    entries: Vec<Entry>,
    page: i64,
    pages: i64,
    session: Option<&'a Session>,
}

/// A single category's feed. Unpublished or unknown categories 404.
pub fn category(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let slug = &SlugPath::borrow_from(state).slug;
    let page = PageQuery::borrow_from(state).page();

    let category = match category::by_slug(connection, slug)? {
        Some(category) => category,
        None => return Ok(pages::not_found(state)),
    };

    let entries = post::category_page(connection, &category, page)?;
    let total = post::category_count(connection, &category)?;

    let template = CategoryTemplate {
        category,
        entries,
        page,
        pages: post::page_count(total),
        session: Session::try_borrow_from(state),
    };
    Ok(template.to_response(state))
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate<'a> {
    profile: User,
    is_owner: bool,
    entries: Vec<Entry>,
    page: i64,
    pages: i64,
    session: Option<&'a Session>,
}

/// A user's posts. The owner sees all of them, drafts included; everyone
/// else only the published subset.
pub fn profile(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let username = &UserPath::borrow_from(state).username;
    let page = PageQuery::borrow_from(state).page();
    let session = Session::try_borrow_from(state);

    let profile = match user::find(connection, username)? {
        Some(user) => user,
        None => return Ok(pages::not_found(state)),
    };
    let is_owner = session.map(|s| s.user == profile.id).unwrap_or(false);

    let entries = post::profile_page(connection, &profile.id, is_owner, page)?;
    let total = post::profile_count(connection, &profile.id, is_owner)?;

    let template = ProfileTemplate {
        profile,
        is_owner,
        entries,
        page,
        pages: post::page_count(total),
        session,
    };
    Ok(template.to_response(state))
}
