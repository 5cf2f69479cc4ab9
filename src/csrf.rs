//! Cross-site request forgery protection.
//!
//! Every browser gets a random token in a `csrf` cookie; forms echo it back in
//! a hidden `csrf_token` field. POST handlers compare the two and answer with
//! the 403 page on a mismatch.

use cookie::CookieJar;
use futures::Future;
use gotham::{
    handler::HandlerFuture,
    middleware::Middleware,
    state::{FromState, State},
};
use gotham_derive::{NewMiddleware, StateData};
use hyper::header;
use rand::prelude::*;

const TOKEN_LEN: usize = 24;

/// The token the current request's forms must carry.
#[derive(Clone, StateData)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    pub fn from_state(state: &State) -> &str {
        &Self::borrow_from(state).0
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    StdRng::from_entropy().fill(&mut bytes[..]);
    base64::encode(&bytes)
}

/// Checks the token a form submitted against the browser's cookie.
pub fn verify(state: &State, submitted: &str) -> bool {
    !submitted.is_empty() && submitted == CsrfToken::from_state(state)
}

/// Ensures a csrf token exists for the request, minting one and setting the
/// cookie when the browser doesn't have one yet.
#[derive(Clone, NewMiddleware)]
pub struct CsrfMiddleware;

impl Middleware for CsrfMiddleware {
    fn call<C>(self, mut state: State, chain: C) -> Box<HandlerFuture>
    where
        C: FnOnce(State) -> Box<HandlerFuture>,
    {
        let existing = CookieJar::borrow_from(&state)
            .get("csrf")
            .map(|cookie| cookie.value().to_owned());

        match existing {
            Some(token) => {
                state.put(CsrfToken(token));
                chain(state)
            }
            None => {
                let token = generate_token();
                state.put(CsrfToken(token.clone()));
                let set_cookie = cookie::Cookie::build("csrf", token).finish();
                Box::new(chain(state).map(move |(state, mut response)| {
                    if let Ok(value) = set_cookie.to_string().parse() {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                    (state, response)
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generate_token;

    #[test]
    fn tokens_are_random() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
