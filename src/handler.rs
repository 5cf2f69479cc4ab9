//! Request plumbing shared by every route: body collection, the fallback
//! error responder, and the path/query string extractors.

use futures::{future, Future, Stream};
use gotham::{
    handler::{HandlerFuture, IntoHandlerError},
    state::{FromState, State},
};
use gotham_derive::{StateData, StaticResponseExtender};
use http::Response;
use hyper::Body;

use crate::document::pages;

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct PostPath {
    pub id: i32,
}

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct CommentPath {
    pub id: i32,
}

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct SlugPath {
    pub slug: String,
}

#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct UserPath {
    pub username: String,
}

/// The `?page=N` query string of the feed pages.
#[derive(Deserialize, StateData, StaticResponseExtender)]
pub struct PageQuery {
    page: Option<i64>,
}

impl PageQuery {
    /// The requested page, clamped to 1 and up.
    pub fn page(&self) -> i64 {
        std::cmp::max(self.page.unwrap_or(1), 1)
    }
}

/// Creates a `HandlerFuture` that collects the request body and runs the
/// given function
pub fn body_handler<F>(mut state: State, op: F) -> Box<HandlerFuture>
where
    F: FnOnce(&State, Vec<u8>) -> Response<Body> + Send + 'static,
{
    let f = Body::take_from(&mut state)
        .concat2()
        .then(|result| match result {
            Ok(body) => {
                let response = op(&state, body.to_vec());
                future::ok((state, response))
            }
            Err(e) => future::err((state, e.into_handler_error())),
        });

    Box::new(f)
}

/// Turns an error that escaped a handler into the 500 page.
pub fn error_response(state: &State, error: impl std::fmt::Display) -> Response<Body> {
    log::error!("handler error: {}", error);
    pages::server_error(state)
}

pub fn response(state: &State, result: Result<Response<Body>, failure::Error>) -> Response<Body> {
    match result {
        Ok(response) => response,
        Err(error) => error_response(state, error),
    }
}

#[macro_export]
macro_rules! handler {
    ($handler_fn:path) => {
        |state| {
            let r = crate::handler::response(&state, $handler_fn(&state));
            (state, r)
        }
    };
}

#[macro_export]
macro_rules! body_handler {
    ($handler_fn:path) => {
        |state| {
            crate::handler::body_handler(state, |state, post| {
                crate::handler::response(&state, $handler_fn(state, post))
            })
        }
    };
}
