use gotham::helpers::http::response::{create_response, create_temporary_redirect};
use gotham::state::State;
use http::StatusCode;
use hyper::{Body, Response};

use std::borrow::Cow;

pub mod comment;
pub mod index;
pub mod pages;
pub mod post;
pub mod user;

pub type DocumentResult = Result<Response<Body>, failure::Error>;

pub trait TemplateExt {
    fn to_response(&self, state: &State) -> Response<Body> {
        self.to_response_status(state, StatusCode::OK)
    }

    fn to_response_status(&self, state: &State, status: StatusCode) -> Response<Body>;
}

impl<T: askama::Template> TemplateExt for T {
    fn to_response_status(&self, state: &State, status: StatusCode) -> Response<Body> {
        match self.render() {
            Ok(string) => create_response(state, status, mime::TEXT_HTML, string),
            Err(e) => create_response(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                mime::TEXT_PLAIN,
                format!("Template error: {}", e),
            ),
        }
    }
}

/// A redirect that forces the follow-up request to be a GET.
pub fn see_other<L: Into<Cow<'static, str>>>(state: &State, location: L) -> Response<Body> {
    let mut response = create_temporary_redirect(state, location);
    *response.status_mut() = StatusCode::SEE_OTHER;
    response
}

/// Where unauthenticated requests to author-only routes end up.
pub fn redirect_to_login(state: &State) -> Response<Body> {
    see_other(state, "/login")
}
