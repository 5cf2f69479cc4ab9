//! The static informational pages and the site's error pages.

use askama::Template;
use gotham::{
    router::response::extender::ResponseExtender,
    state::{FromState, State},
};
use http::{
    header::{HeaderValue, CONTENT_TYPE},
    StatusCode,
};
use hyper::{Body, Response};

use super::{DocumentResult, TemplateExt};
use crate::user::Session;

#[derive(Template)]
#[template(path = "about.html")]
struct AboutTemplate<'a> {
    session: Option<&'a Session>,
}

pub fn about(state: &State) -> DocumentResult {
    Ok(AboutTemplate {
        session: Session::try_borrow_from(state),
    }
    .to_response(state))
}

#[derive(Template)]
#[template(path = "rules.html")]
struct RulesTemplate<'a> {
    session: Option<&'a Session>,
}

pub fn rules(state: &State) -> DocumentResult {
    Ok(RulesTemplate {
        session: Session::try_borrow_from(state),
    }
    .to_response(state))
}

// The error pages carry no dynamic data, so they can also be rendered from
// router response extenders where no session is available.

#[derive(Template)]
#[template(path = "404.html")]
struct NotFoundTemplate;

#[derive(Template)]
#[template(path = "500.html")]
struct ServerErrorTemplate;

#[derive(Template)]
#[template(path = "403csrf.html")]
struct CsrfFailureTemplate;

pub fn not_found(state: &State) -> Response<Body> {
    NotFoundTemplate.to_response_status(state, StatusCode::NOT_FOUND)
}

pub fn server_error(state: &State) -> Response<Body> {
    ServerErrorTemplate.to_response_status(state, StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn csrf_failure(state: &State) -> Response<Body> {
    CsrfFailureTemplate.to_response_status(state, StatusCode::FORBIDDEN)
}

fn extend_with(template: impl Template, response: &mut Response<Body>) {
    if let Ok(page) = template.render() {
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        *response.body_mut() = page.into();
    }
}

/// Response extender giving unrouted requests the 404 page
pub struct NotFoundPage;

impl ResponseExtender<Body> for NotFoundPage {
    fn extend(&self, _state: &mut State, response: &mut Response<Body>) {
        extend_with(NotFoundTemplate, response);
    }
}

/// Response extender giving faulted requests the 500 page
pub struct ServerErrorPage;

impl ResponseExtender<Body> for ServerErrorPage {
    fn extend(&self, _state: &mut State, response: &mut Response<Body>) {
        extend_with(ServerErrorTemplate, response);
    }
}
