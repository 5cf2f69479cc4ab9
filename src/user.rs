use bcrypt::BcryptError;
use chrono::{Duration, NaiveDateTime, Utc};
use cookie::CookieJar;
use diesel::prelude::*;
use futures::future;
use gotham::{
    handler::HandlerFuture,
    helpers::http::response::create_response,
    middleware::Middleware,
    state::{FromState, State},
};
use gotham_derive::{NewMiddleware, StateData};
use rand::prelude::*;
use sha2::{Digest, Sha256};

use crate::{
    db::{Connection, DbConnection, DieselResult},
    schema::{sessions, users},
};

const SALT_LEN: usize = 16;
const SESSION_LEN: usize = 24;

#[derive(Debug, Queryable, Identifiable, Insertable)]
pub struct User {
    /// The unique username/login
    pub id: String,
    /// The hashed password
    hash: String,
    /// The salt for the password
    salt: Vec<u8>,
    /// The user's email address
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Verify the supplied password matches the user's
    pub fn verify(&self, password: &str) -> Result<bool, BcryptError> {
        verify(password, &self.salt, &self.hash)
    }
}

/// A to be created user.
///
/// NOTE: This structure contains the user's unencrypted password, handle it
/// with great care!
#[derive(Clone)]
pub struct NewUser {
    /// The username
    pub id: String,
    /// The user's raw password
    pub password: String,
    /// The user's email address
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl std::fmt::Debug for NewUser {
    // Keeps the raw password out of logs and test output.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("id", &self.id)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

impl NewUser {
    /// Converts the structure into a proper user, generating a salt and
    /// hashing the password.
    fn into_user(self) -> Result<User, BcryptError> {
        let salt: Box<[u8]> = Box::new(generate_salt());
        Ok(User {
            id: self.id,
            hash: hash(&self.password, &salt)?,
            salt: salt.into_vec(),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

/// Changes to the editable part of a user's profile. The username itself is
/// fixed, posts and comments reference it.
#[derive(AsChangeset)]
#[table_name = "users"]
pub struct UserProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login credentials
pub struct Login {
    pub user: String,
    pub password: String,
}

impl Login {
    /// Create a session if username and password is valid
    pub fn login(&self, connection: &Connection) -> Result<Option<Session>, failure::Error> {
        let user: Option<User> = users::dsl::users
            .find(&self.user)
            .first(connection)
            .optional()?;
        match user {
            Some(ref user) if user.verify(&self.password)? => {
                let session = Session::new(&self.user);
                diesel::insert_into(sessions::table)
                    .values(&session)
                    .execute(connection)?;
                Ok(Some(session))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Clone, Queryable, Insertable, StateData)]
pub struct Session {
    pub id: String,
    pub user: String,
    pub expires: NaiveDateTime,
}

impl Session {
    /// Generates a new session.
    ///
    /// NB: Must be inserted into the database for the session to be valid.
    pub fn new(user: &str) -> Session {
        // Fill array with random data
        let mut id = [0u8; SESSION_LEN];
        StdRng::from_entropy().fill(&mut id[..]);
        Session {
            id: base64::encode(&id),
            user: user.to_owned(),
            expires: Utc::now().naive_utc() + Duration::days(30),
        }
    }

    /// Get the unexpired session with the specified id
    pub fn from_id(id: &str, connection: &Connection) -> DieselResult<Option<Session>> {
        let session: Option<Session> = sessions::dsl::sessions
            .find(id)
            .first(connection)
            .optional()?;
        Ok(session.filter(|session| session.expires > Utc::now().naive_utc()))
    }
}

/// Resolves the session cookie to a `Session` and stores it in request state.
#[derive(Clone, NewMiddleware)]
pub struct SessionMiddleware;

impl Middleware for SessionMiddleware {
    fn call<C>(self, mut state: State, chain: C) -> Box<HandlerFuture>
    where
        C: FnOnce(State) -> Box<HandlerFuture>,
    {
        let put_session = |state: &mut State| -> Result<(), failure::Error> {
            let connection = DbConnection::borrow_from(state).lock()?;
            let cookie = CookieJar::borrow_from(state)
                .get("session")
                .map(|cookie| cookie.value());
            if let Some(id) = cookie {
                if let Some(session) = Session::from_id(id, &connection)? {
                    std::mem::drop(connection);
                    state.put(session);
                }
            }
            Ok(())
        };
        match put_session(&mut state) {
            Ok(()) => Box::new(chain(state)),
            Err(e) => {
                log::error!("session lookup failed: {}", e);
                let response = create_response(
                    &state,
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    mime::TEXT_PLAIN,
                    e.to_string(),
                );
                Box::new(future::ok((state, response)))
            }
        }
    }
}

/// Password hashing function. Inspired by [Dropbox's password storage policy][1].
///
/// First the password and salt are combined, then hashed with SHA256 to prevent
/// DoS attacks. The password is then hashed with bcrypt.
///
/// [1]: https://blogs.dropbox.com/tech/2016/09/how-dropbox-securely-stores-your-passwords/
fn hash(key: &str, salt: &[u8]) -> Result<String, BcryptError> {
    // digest the password and salt
    let digest = Sha256::new().chain(key).chain(salt).finalize();
    // Hash the password with bcrypt (base64 encode to avoid zero-bytes).
    let hash = bcrypt::hash(base64::encode(&digest), bcrypt::DEFAULT_COST)?;
    Ok(hash)
}

fn verify(key: &str, salt: &[u8], hash: &str) -> Result<bool, BcryptError> {
    let digest = Sha256::new().chain(key).chain(salt).finalize();
    let matches = bcrypt::verify(&base64::encode(&digest), hash)?;
    Ok(matches)
}

/// Generates a new salt of length `SALT_LEN`
fn generate_salt() -> [u8; SALT_LEN] {
    let mut bytes = [0u8; SALT_LEN];

    StdRng::from_entropy().fill(&mut bytes[..]);

    bytes
}

/// Creates a user
pub fn create(connection: &Connection, user: NewUser) -> Result<usize, failure::Error> {
    let count = diesel::insert_into(users::table)
        .values(&user.into_user()?)
        .execute(connection)?;
    Ok(count)
}

/// Whether the given username is taken.
pub fn exists(connection: &Connection, id: &str) -> DieselResult<bool> {
    use crate::schema::users::dsl;

    let count: i64 = dsl::users.find(id).count().get_result(connection)?;
    Ok(count > 0)
}

pub fn find(connection: &Connection, id: &str) -> DieselResult<Option<User>> {
    use crate::schema::users::dsl;

    dsl::users.find(id).first(connection).optional()
}

pub fn logout(connection: &Connection, session: &str) -> DieselResult<usize> {
    use crate::schema::sessions::dsl;

    diesel::delete(dsl::sessions.find(session)).execute(connection)
}

pub fn edit_profile(
    connection: &Connection,
    id: &str,
    profile: &UserProfile,
) -> DieselResult<usize> {
    use crate::schema::users::dsl;

    diesel::update(dsl::users.find(id))
        .set(profile)
        .execute(connection)
}

#[cfg(test)]
mod tests {
    use super::{generate_salt, hash, verify, NewUser, Session};

    #[test]
    fn password_roundtrip() {
        let salt = generate_salt();
        let hashed = hash("hunter2hunter2", &salt).unwrap();
        assert!(verify("hunter2hunter2", &salt, &hashed).unwrap());
        assert!(!verify("*******", &salt, &hashed).unwrap());
    }

    #[test]
    fn debug_output_redacts_the_password() {
        let new = NewUser {
            id: String::from("alice"),
            password: String::from("hunter2hunter2"),
            email: String::from("alice@example.com"),
            first_name: String::new(),
            last_name: String::new(),
        };
        let printed = format!("{:?}", new);
        assert!(!printed.contains("hunter2hunter2"));
        assert!(printed.contains("alice"));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = Session::new("alice");
        let b = Session::new("alice");
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
    }
}
