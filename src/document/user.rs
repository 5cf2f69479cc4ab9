//! Login, logout, registration and profile editing.

use askama::Template;
use cookie::{Cookie, SameSite};
use gotham::state::{FromState, State};
use hyper::header;

use super::{pages, redirect_to_login, see_other, DocumentResult, TemplateExt};
use crate::{
    config::Settings,
    csrf::{self, CsrfToken},
    db::DbConnection,
    form::{FormErrors, LoginForm, ProfileForm, RegistrationForm},
    user::{self, Session, User},
};

fn session_cookie<'a>(state: &State, id: &str) -> Cookie<'a> {
    let settings = Settings::borrow_from(state);
    let mut cookie = Cookie::build("session", id.to_owned())
        .same_site(SameSite::Strict)
        .http_only(true)
        .finish();
    if settings.cookie.secure {
        cookie.set_secure(true);
    }
    if let Some(ref domain) = settings.cookie.domain {
        cookie.set_domain(domain.to_owned());
    }
    cookie
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    username: String,
    failed: bool,
    session: Option<&'a Session>,
    csrf: &'a str,
}

/// Login form
pub fn login(state: &State) -> DocumentResult {
    Ok(LoginTemplate {
        username: String::new(),
        failed: false,
        session: Session::try_borrow_from(state),
        csrf: CsrfToken::from_state(state),
    }
    .to_response(state))
}

/// Login post. Sets session cookie if login was successful.
pub fn login_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let form: LoginForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    match form.credentials().login(connection)? {
        Some(session) => {
            let mut response = see_other(state, "/");
            let cookie = session_cookie(state, &session.id);
            response
                .headers_mut()
                .append(header::SET_COOKIE, cookie.to_string().parse()?);
            Ok(response)
        }
        None => Ok(LoginTemplate {
            username: form.username,
            failed: true,
            session: Session::try_borrow_from(state),
            csrf: CsrfToken::from_state(state),
        }
        .to_response(state)),
    }
}

/// Drops the session row and clears the cookie.
pub fn logout(state: &State) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;

    if let Some(session) = Session::try_borrow_from(state) {
        user::logout(connection, &session.id)?;
    }

    let mut response = see_other(state, "/");
    // Delete session cookie with Max-Age=0
    let cookie = Cookie::build("session", "")
        .max_age(time::Duration::zero())
        .finish();
    response
        .headers_mut()
        .append(header::SET_COOKIE, cookie.to_string().parse()?);
    Ok(response)
}

#[derive(Template)]
#[template(path = "registration.html")]
struct RegistrationTemplate<'a> {
    form: RegistrationForm,
    errors: FormErrors,
    session: Option<&'a Session>,
    csrf: &'a str,
}

/// Sign-up form
pub fn registration(state: &State) -> DocumentResult {
    Ok(RegistrationTemplate {
        form: RegistrationForm::default(),
        errors: FormErrors::default(),
        session: Session::try_borrow_from(state),
        csrf: CsrfToken::from_state(state),
    }
    .to_response(state))
}

/// Create the account, log it in and land on the front page.
pub fn registration_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let connection = &DbConnection::from_state(state)?;
    let form: RegistrationForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    let result = match form.validate() {
        Ok(new_user) => {
            if user::exists(connection, &new_user.id)? {
                let mut errors = FormErrors::default();
                errors.push("username", "A user with that username already exists");
                Err(errors)
            } else {
                Ok(new_user)
            }
        }
        Err(errors) => Err(errors),
    };

    match result {
        Ok(new_user) => {
            let credentials = crate::user::Login {
                user: new_user.id.clone(),
                password: new_user.password.clone(),
            };
            user::create(connection, new_user)?;
            let session = credentials
                .login(connection)?
                .ok_or_else(|| failure::err_msg("fresh account failed to log in"))?;

            let mut response = see_other(state, "/");
            let cookie = session_cookie(state, &session.id);
            response
                .headers_mut()
                .append(header::SET_COOKIE, cookie.to_string().parse()?);
            Ok(response)
        }
        Err(errors) => Ok(RegistrationTemplate {
            form,
            errors,
            session: Session::try_borrow_from(state),
            csrf: CsrfToken::from_state(state),
        }
        .to_response(state)),
    }
}

#[derive(Template)]
#[template(path = "profile-edit.html")]
struct ProfileEditTemplate<'a> {
    user: User,
    form: ProfileForm,
    errors: FormErrors,
    session: Option<&'a Session>,
    csrf: &'a str,
}

/// Edit one's own profile. Always operates on the logged in user.
pub fn edit_profile(state: &State) -> DocumentResult {
    let session = match Session::try_borrow_from(state) {
        Some(session) => session,
        None => return Ok(redirect_to_login(state)),
    };
    let connection = &DbConnection::from_state(state)?;
    let user = match user::find(connection, &session.user)? {
        Some(user) => user,
        None => return Ok(pages::not_found(state)),
    };
    Ok(ProfileEditTemplate {
        form: ProfileForm::from_user(&user),
        user,
        errors: FormErrors::default(),
        session: Some(session),
        csrf: CsrfToken::from_state(state),
    }
    .to_response(state))
}

pub fn edit_profile_post(state: &State, body: Vec<u8>) -> DocumentResult {
    let session = match Session::try_borrow_from(state) {
        Some(session) => session,
        None => return Ok(redirect_to_login(state)),
    };
    let connection = &DbConnection::from_state(state)?;
    let form: ProfileForm = serde_urlencoded::from_bytes(&body)?;
    if !csrf::verify(state, &form.csrf_token) {
        return Ok(pages::csrf_failure(state));
    }

    match form.validate() {
        Ok(profile) => {
            user::edit_profile(connection, &session.user, &profile)?;
            Ok(see_other(state, format!("/profile/{}", session.user)))
        }
        Err(errors) => {
            let user = match user::find(connection, &session.user)? {
                Some(user) => user,
                None => return Ok(pages::not_found(state)),
            };
            Ok(ProfileEditTemplate {
                user,
                form,
                errors,
                session: Some(session),
                csrf: CsrfToken::from_state(state),
            }
            .to_response(state))
        }
    }
}
