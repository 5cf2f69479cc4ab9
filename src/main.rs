//! A server-rendered blogging application.
//!
//! It has the following address scheme:
//! * `/` - Published posts, newest first
//! * `/posts/<id>` - A post with its comments
//!     * `/posts/create` - Write a post
//!     * `/posts/<id>/edit`, `/posts/<id>/delete` - Author-only changes
//!     * `/posts/<id>/comment` - Attach a comment
//! * `/comments/<id>/edit`, `/comments/<id>/delete` - Author-only changes
//! * `/category/<slug>` - One category's published posts
//! * `/profile/<username>` - A user's posts; owners also see their drafts
//!     * `/profile/edit` - Edit one's own profile
//! * `/registration`, `/login`, `/logout` - Account handling
//! * `/about`, `/rules` - Static pages

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate serde;

pub mod category;
pub mod comment;
pub mod config;
pub mod csrf;
pub mod db;
pub mod document;
pub mod form;
pub mod handler;
pub mod location;
pub mod post;
pub mod schema;
pub mod user;

use gotham::{
    middleware::cookie::CookieParser,
    middleware::state::StateMiddleware,
    pipeline::new_pipeline,
    pipeline::single::single_pipeline,
    router::builder::{build_router, DefineSingleRoute, DrawRoutes},
    router::Router,
};
use http::status::StatusCode;

use std::path::Path;

use crate::{
    config::Settings,
    csrf::CsrfMiddleware,
    db::DbConnection,
    document::pages::{NotFoundPage, ServerErrorPage},
    handler::{CommentPath, PageQuery, PostPath, SlugPath, UserPath},
    user::SessionMiddleware,
};

/// Builds the request router
fn router(settings: &Settings) -> Router {
    // Set up shared state
    let connection = DbConnection::from_url(&settings.database_url);
    // Build pipeline
    let (chain, pipelines) = single_pipeline(
        new_pipeline()
            .add(StateMiddleware::new(settings.clone()))
            .add(StateMiddleware::new(connection))
            .add(CookieParser)
            .add(SessionMiddleware)
            .add(CsrfMiddleware)
            .build(),
    );

    build_router(chain, pipelines, |route| {
        route
            .get("/")
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(document::index::index));

        route
            .get("/category/:slug")
            .with_path_extractor::<SlugPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(document::index::category));

        route
            .get("/profile/:username")
            .with_path_extractor::<UserPath>()
            .with_query_string_extractor::<PageQuery>()
            .to(handler!(document::index::profile));

        route
            .get("/profile/edit")
            .to(handler!(document::user::edit_profile));
        route
            .post("/profile/edit")
            .to(body_handler!(document::user::edit_profile_post));

        route
            .get("/posts/create")
            .to(handler!(document::post::create));
        route
            .post("/posts/create")
            .to(body_handler!(document::post::create_post));

        route
            .get("/posts/:id")
            .with_path_extractor::<PostPath>()
            .to(handler!(document::post::detail));

        route
            .get("/posts/:id/edit")
            .with_path_extractor::<PostPath>()
            .to(handler!(document::post::edit));
        route
            .post("/posts/:id/edit")
            .with_path_extractor::<PostPath>()
            .to(body_handler!(document::post::edit_post));

        route
            .get("/posts/:id/delete")
            .with_path_extractor::<PostPath>()
            .to(handler!(document::post::delete));
        route
            .post("/posts/:id/delete")
            .with_path_extractor::<PostPath>()
            .to(body_handler!(document::post::delete_post));

        route
            .post("/posts/:id/comment")
            .with_path_extractor::<PostPath>()
            .to(body_handler!(document::comment::add));

        route
            .get("/comments/:id/edit")
            .with_path_extractor::<CommentPath>()
            .to(handler!(document::comment::edit));
        route
            .post("/comments/:id/edit")
            .with_path_extractor::<CommentPath>()
            .to(body_handler!(document::comment::edit_post));

        route
            .get("/comments/:id/delete")
            .with_path_extractor::<CommentPath>()
            .to(handler!(document::comment::delete));
        route
            .post("/comments/:id/delete")
            .with_path_extractor::<CommentPath>()
            .to(body_handler!(document::comment::delete_post));

        route
            .get("/registration")
            .to(handler!(document::user::registration));
        route
            .post("/registration")
            .to(body_handler!(document::user::registration_post));

        route.get("/login").to(handler!(document::user::login));
        route
            .post("/login")
            .to(body_handler!(document::user::login_post));
        route.get("/logout").to(handler!(document::user::logout));

        route.get("/about").to(handler!(document::pages::about));
        route.get("/rules").to(handler!(document::pages::rules));

        // Error responders
        route.add_response_extender(StatusCode::NOT_FOUND, NotFoundPage);
        route.add_response_extender(StatusCode::INTERNAL_SERVER_ERROR, ServerErrorPage);
    })
}

fn main() -> Result<(), failure::Error> {
    env_logger::init();

    // Read settings
    let path = if Path::new("/etc/quill/quill.toml").is_file() {
        Path::new("/etc/quill/quill.toml")
    } else {
        Path::new("quill.toml")
    };
    let data = std::fs::read(path)?;
    let settings = Settings::from_slice(&data)?;
    let address = settings.host_address.clone();

    log::info!("Running at {}", address);
    gotham::start(address, router(&settings));
    Ok(())
}
