//! Comment submission and the comment edit/delete flows.

use askama::Template;
use gotham::state::{FromState, State};
use hyper::{Body, Response};

use super::{pages, post::DetailTemplate, redirect_to_login, see_other, DocumentResult, TemplateExt};
use crate::{
    comment::{self, Comment, NewComment},
    csrf::{self, CsrfToken},
    db::{Connection, DbConnection},
    form::{CommentForm, ConfirmForm, FormErrors},
    handler::{CommentPath, PostPath},
    post,
    user::Session,
};

/// Attach a comment to a post. Login required; the post must be visible to
/// the commenter. An empty comment re-renders the post page with the error.
pub fn add(state: &State, body: Vec<u8>) -> DocumentResult {
    let session = match Session::try_borrow_from(state) {
        Some(session) => session,
        None => return Ok(redirect_to_login(state)),
    };
    let connection = &DbConnection::from_state(state)?;
    let id = PostPath::borrow_from(state).id;

    let (post, category, location) = match post::find(connection, id)? {
        Some(row) => row,
        None => return Ok(pages::not_found(state)),
    };
    if !post.visible_to(category.as_ref(), Some(session.user.as_str())) {
        return Ok(pages::not_found(state));
    }

    let form: CommentForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    match form.validate() {
        Ok(changes) => {
            let new = NewComment {
                post_id: post.id,
                author: session.user.clone(),
                text: changes.text,
            };
            comment::submit(connection, &new)?;
            Ok(see_other(state, format!("/posts/{}", post.id)))
        }
        Err(errors) => {
            let comments = comment::for_post(connection, post.id)?;
            let template = DetailTemplate {
                is_author: session.user == post.author,
                post,
                category,
                location,
                comments,
                comment_errors: errors,
                comment_text: form.text,
                session: Some(session),
                csrf: CsrfToken::from_state(state),
            };
            Ok(template.to_response(state))
        }
    }
}

/// Answers the request with a redirect when the requester may not touch the
/// comment, mirroring the post rules: login page for the anonymous, the
/// parent post for non-authors, a 404 for missing comments. On success the
/// comment itself is returned.
fn load_for_author(
    state: &State,
    connection: &Connection,
    id: i32,
) -> Result<Result<Comment, Response<Body>>, failure::Error> {
    let viewer = Session::try_borrow_from(state).map(|s| s.user.as_str());
    let comment = comment::find(connection, id)?;
    let access = post::write_access(comment.as_ref().map(|c| c.author.as_str()), viewer);
    Ok(match (access, comment) {
        (post::WriteAccess::Allowed, Some(comment)) => Ok(comment),
        (post::WriteAccess::NotOwner, Some(comment)) => {
            Err(see_other(state, format!("/posts/{}", comment.post_id)))
        }
        (post::WriteAccess::LoginRequired, _) => Err(redirect_to_login(state)),
        _ => Err(pages::not_found(state)),
    })
}

#[derive(Template)]
#[template(path = "comment-edit.html")]
struct CommentEditTemplate<'a> {
    comment: Comment,
    form_text: String,
    errors: FormErrors,
    session: Option<&'a Session>,
    csrf: &'a str,
}

pub fn edit(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = CommentPath::borrow_from(state).id;
    let comment = match load_for_author(state, connection, id)? {
        Ok(comment) => comment,
        Err(response) => return Ok(response),
    };
    let template = CommentEditTemplate {
        form_text: comment.text.clone(),
        comment,
        errors: FormErrors::default(),
        session: Session::try_borrow_from(state),
        csrf: CsrfToken::from_state(state),
    };
    Ok(template.to_response(state))
}

pub fn edit_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = CommentPath::borrow_from(state).id;
    let comment = match load_for_author(state, connection, id)? {
        Ok(comment) => comment,
        Err(response) => return Ok(response),
    };
    let form: CommentForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    match form.validate() {
        Ok(changes) => {
            comment::edit(connection, id, &changes)?;
            Ok(see_other(state, format!("/posts/{}", comment.post_id)))
        }
        Err(errors) => {
            let template = CommentEditTemplate {
                comment,
                form_text: form.text,
                errors,
                session: Session::try_borrow_from(state),
                csrf: CsrfToken::from_state(state),
            };
            Ok(template.to_response(state))
        }
    }
}

#[derive(Template)]
#[template(path = "comment-delete.html")]
struct CommentDeleteTemplate<'a> {
    comment: Comment,
    session: Option<&'a Session>,
    csrf: &'a str,
}

/// Deletion confirmation page
pub fn delete(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = CommentPath::borrow_from(state).id;
    let comment = match load_for_author(state, connection, id)? {
        Ok(comment) => comment,
        Err(response) => return Ok(response),
    };
    let template = CommentDeleteTemplate {
        comment,
        session: Session::try_borrow_from(state),
        csrf: CsrfToken::from_state(state),
    };
    Ok(template.to_response(state))
}

pub fn delete_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let id = CommentPath::borrow_from(state).id;
    let comment = match load_for_author(state, connection, id)? {
        Ok(comment) => comment,
        Err(response) => return Ok(response),
    };
    let form: ConfirmForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    comment::delete(connection, id)?;
    Ok(see_other(state, format!("/posts/{}", comment.post_id)))
}
