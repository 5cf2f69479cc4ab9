//! Post pages: detail view and the create/edit/delete flows.

use askama::Template;
use chrono::Utc;
use gotham::state::{FromState, State};
use hyper::{Body, Response};

use super::{pages, redirect_to_login, see_other, DocumentResult, TemplateExt};
use crate::{
    category::{self, Category},
    comment::{self, Comment},
    csrf::{self, CsrfToken},
    db::{Connection, DbConnection},
    form::{FormErrors, PostForm, DATETIME_FORMAT},
    handler::PostPath,
    location::{self, Location},
    post::{self, Post, PostChanges},
    user::Session,
};

#[derive(Template)]
#[template(path = "detail.html")]
pub struct DetailTemplate<'a> {
    pub post: Post,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comments: Vec<Comment>,
    pub is_author: bool,
    pub comment_errors: FormErrors,
    pub comment_text: String,
    pub session: Option<&'a Session>,
    pub csrf: &'a str,
}

/// A post's page with its comments and the comment form. Hidden posts are a
/// 404 for everyone but their author.
pub fn detail(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    let session = Session::try_borrow_from(state);

    let (post, category, location) = match post::find(connection, id)? {
        Some(row) => row,
        None => return Ok(pages::not_found(state)),
    };
    if !post.visible_to(category.as_ref(), session.map(|s| s.user.as_str())) {
        return Ok(pages::not_found(state));
    }

    let comments = comment::for_post(connection, post.id)?;
    let template = DetailTemplate {
        is_author: session.map(|s| s.user == post.author).unwrap_or(false),
        post,
        category,
        location,
        comments,
        comment_errors: FormErrors::default(),
        comment_text: String::new(),
        session,
        csrf: CsrfToken::from_state(state),
    };
    Ok(template.to_response(state))
}

#[derive(Template)]
#[template(path = "create.html")]
struct PostFormTemplate<'a> {
    form: PostForm,
    errors: FormErrors,
    categories: Vec<Category>,
    locations: Vec<Location>,
    /// Set when editing an existing post
    post_id: Option<i32>,
    session: Option<&'a Session>,
    csrf: &'a str,
}

fn render_form(
    state: &State,
    connection: &Connection,
    form: PostForm,
    errors: FormErrors,
    post_id: Option<i32>,
) -> DocumentResult {
    let template = PostFormTemplate {
        form,
        errors,
        categories: category::published(connection)?,
        locations: location::published(connection)?,
        post_id,
        session: Session::try_borrow_from(state),
        csrf: CsrfToken::from_state(state),
    };
    Ok(template.to_response(state))
}

/// Answers the request with a redirect when the requester may not touch the
/// post: login page for the anonymous, the post's detail page for everyone
/// who isn't its author, a 404 for posts that don't exist.
fn deny_non_author(
    state: &State,
    connection: &Connection,
    id: i32,
) -> Result<Option<Response<Body>>, failure::Error> {
    let viewer = Session::try_borrow_from(state).map(|s| s.user.as_str());
    let author = post::author(connection, id)?;
    Ok(match post::write_access(author.as_deref(), viewer) {
        post::WriteAccess::Allowed => None,
        post::WriteAccess::LoginRequired => Some(redirect_to_login(state)),
        post::WriteAccess::NotOwner => Some(see_other(state, format!("/posts/{}", id))),
        post::WriteAccess::Missing => Some(pages::not_found(state)),
    })
}

/// Blank post form
pub fn create(state: &State) -> DocumentResult {
    if Session::try_borrow_from(state).is_none() {
        return Ok(redirect_to_login(state));
    }
    let connection = &DbConnection::from_state(state)?;
    let form = PostForm {
        pub_date: Utc::now().naive_utc().format(DATETIME_FORMAT).to_string(),
        ..PostForm::default()
    };
    render_form(state, connection, form, FormErrors::default(), None)
}

/// Create a post. The author is always the logged in user, whatever the form
/// says.
pub fn create_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let session = match Session::try_borrow_from(state) {
        Some(session) => session,
        None => return Ok(redirect_to_login(state)),
    };
    let connection = &DbConnection::from_state(state)?;
    let form: PostForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    match form.validate() {
        Ok(input) => {
            post::submit(connection, &input.into_post(session.user.clone()))?;
            Ok(see_other(state, format!("/profile/{}", session.user)))
        }
        Err(errors) => render_form(state, connection, form, errors, None),
    }
}

/// Post form prefilled with the existing post
pub fn edit(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    if let Some(response) = deny_non_author(state, connection, id)? {
        return Ok(response);
    }
    let post = match post::find(connection, id)? {
        Some((post, _, _)) => post,
        None => return Ok(pages::not_found(state)),
    };
    render_form(
        state,
        connection,
        PostForm::from_post(&post),
        FormErrors::default(),
        Some(id),
    )
}

pub fn edit_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    if let Some(response) = deny_non_author(state, connection, id)? {
        return Ok(response);
    }
    let form: PostForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    match form.validate() {
        Ok(input) => {
            let changes = PostChanges {
                title: input.title,
                text: input.text,
                pub_date: input.pub_date,
                category_id: input.category_id,
                location_id: input.location_id,
                is_published: input.is_published,
            };
            post::edit(connection, id, &changes)?;
            Ok(see_other(state, format!("/posts/{}", id)))
        }
        Err(errors) => render_form(state, connection, form, errors, Some(id)),
    }
}

#[derive(Template)]
#[template(path = "delete.html")]
struct DeleteTemplate<'a> {
    post: Post,
    session: Option<&'a Session>,
    csrf: &'a str,
}

/// Deletion confirmation page
pub fn delete(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    if let Some(response) = deny_non_author(state, connection, id)? {
        return Ok(response);
    }
    let post = match post::find(connection, id)? {
        Some((post, _, _)) => post,
        None => return Ok(pages::not_found(state)),
    };
    let template = DeleteTemplate {
        post,
        session: Session::try_borrow_from(state),
        csrf: CsrfToken::from_state(state),
    };
    Ok(template.to_response(state))
}

pub fn delete_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;
    if let Some(response) = deny_non_author(state, connection, id)? {
        return Ok(response);
    }
    let form: crate::form::ConfirmForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }
    // deny_non_author passed, so this is the requester's own username.
    let author = post::author(connection, id)?.unwrap_or_default();

    post::delete(connection, id)?;
    Ok(see_other(state, format!("/profile/{}", author)))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::form::PostForm;

    fn post() -> Post {
        let now = Utc::now().naive_utc();
        Post {
            id: 1,
            title: String::from("A post"),
            text: String::from("Body"),
            pub_date: now,
            author: String::from("alice"),
            category_id: None,
            location_id: Some(7),
            is_published: true,
            created_at: now,
        }
    }

    fn category(id: i32) -> Category {
        Category {
            id,
            title: format!("Category {}", id),
            slug: format!("category-{}", id),
            description: String::new(),
            is_published: true,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn location(id: i32, is_published: bool) -> Location {
        Location {
            id,
            name: String::from("Springfield"),
            is_published,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn edit_form_preselects_category_and_location() {
        let form = PostForm {
            category: String::from("3"),
            location: String::from("7"),
            ..PostForm::default()
        };
        let html = PostFormTemplate {
            form,
            errors: FormErrors::default(),
            categories: vec![category(2), category(3)],
            locations: vec![location(7, true)],
            post_id: Some(1),
            session: None,
            csrf: "",
        }
        .render()
        .unwrap();
        assert!(html.contains(r#"<option value="3" selected>"#));
        assert!(html.contains(r#"<option value="7" selected>"#));
        assert!(!html.contains(r#"<option value="2" selected>"#));
    }

    #[test]
    fn unselected_edit_form_keeps_the_empty_choice() {
        let html = PostFormTemplate {
            form: PostForm::default(),
            errors: FormErrors::default(),
            categories: vec![category(2)],
            locations: vec![],
            post_id: None,
            session: None,
            csrf: "",
        }
        .render()
        .unwrap();
        assert!(!html.contains("selected"));
    }

    #[test]
    fn unpublished_location_is_not_shown() {
        let html = DetailTemplate {
            post: post(),
            category: None,
            location: Some(location(7, false)),
            comments: vec![],
            is_author: false,
            comment_errors: FormErrors::default(),
            comment_text: String::new(),
            session: None,
            csrf: "",
        }
        .render()
        .unwrap();
        assert!(!html.contains("Springfield"));
    }

    #[test]
    fn published_location_is_shown() {
        let html = DetailTemplate {
            post: post(),
            category: None,
            location: Some(location(7, true)),
            comments: vec![],
            is_author: false,
            comment_errors: FormErrors::default(),
            comment_text: String::new(),
            session: None,
            csrf: "",
        }
        .render()
        .unwrap();
        assert!(html.contains("Springfield"));
    }
}
