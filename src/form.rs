//! Form binding and validation for the site's POST endpoints.
//!
//! Bodies are decoded into raw string fields first (so a bad submission can be
//! re-rendered exactly as the user sent it), then validated into typed values.
//! Every validation failure is recorded per field and shown inline.

use chrono::NaiveDateTime;

use crate::comment::CommentChanges;
use crate::post::NewPost;
use crate::user::{Login, NewUser, UserProfile};

/// Input format of the post form's datetime field.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

const PASSWORD_MIN_LEN: usize = 8;
const USERNAME_MAX_LEN: usize = 150;

/// A single validation failure, keyed by the form field it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Validation errors collected while binding a form.
#[derive(Clone, Debug, Default)]
pub struct FormErrors {
    errors: Vec<FieldError>,
}

impl FormErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn all(&self) -> &[FieldError] {
        &self.errors
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// The post create/edit form as submitted by the browser.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pub_date: String,
    /// Selected category id, empty for none
    #[serde(default)]
    pub category: String,
    /// Selected location id, empty for none
    #[serde(default)]
    pub location: String,
    /// Checkbox, present when checked
    #[serde(default)]
    pub is_published: Option<String>,
    #[serde(default)]
    pub csrf_token: String,
}

/// A validated post submission, author still to be filled in by the handler.
#[derive(Debug)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,
    pub is_published: bool,
}

impl PostInput {
    /// The insertable row. The author is the passed username, never form data.
    pub fn into_post(self, author: String) -> NewPost {
        NewPost {
            title: self.title,
            text: self.text,
            pub_date: self.pub_date,
            author,
            category_id: self.category_id,
            location_id: self.location_id,
            is_published: self.is_published,
        }
    }
}

fn optional_id(raw: &str, field: &'static str, errors: &mut FormErrors) -> Option<i32> {
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(field, "Select a valid choice");
            None
        }
    }
}

impl PostForm {
    /// Prefill the form with an existing post for editing.
    pub fn from_post(post: &crate::post::Post) -> Self {
        PostForm {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format(DATETIME_FORMAT).to_string(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            is_published: if post.is_published {
                Some(String::from("on"))
            } else {
                None
            },
            csrf_token: String::new(),
        }
    }

    pub fn validate(&self) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::default();
        if self.title.trim().is_empty() {
            errors.push("title", "This field is required");
        }
        if self.text.trim().is_empty() {
            errors.push("text", "This field is required");
        }
        let pub_date = match NaiveDateTime::parse_from_str(&self.pub_date, DATETIME_FORMAT) {
            Ok(date) => date,
            Err(_) => {
                errors.push("pub_date", "Enter a valid date/time");
                NaiveDateTime::from_timestamp(0, 0)
            }
        };
        let category_id = optional_id(&self.category, "category", &mut errors);
        let location_id = optional_id(&self.location, "location", &mut errors);

        errors.into_result(PostInput {
            title: self.title.trim().to_owned(),
            text: self.text.clone(),
            pub_date,
            category_id,
            location_id,
            is_published: self.is_published.is_some(),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub csrf_token: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<CommentChanges, FormErrors> {
        let mut errors = FormErrors::default();
        if self.text.trim().is_empty() {
            errors.push("text", "This field is required");
        }
        errors.into_result(CommentChanges {
            text: self.text.clone(),
        })
    }
}

fn validate_username(username: &str, errors: &mut FormErrors) {
    if username.is_empty() {
        errors.push("username", "This field is required");
    } else if username.len() > USERNAME_MAX_LEN {
        errors.push("username", "Ensure this value has at most 150 characters");
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c))
    {
        errors.push("username", "Letters, digits and @/./+/-/_ only");
    }
}

fn validate_email(email: &str, errors: &mut FormErrors) {
    if email.is_empty() {
        errors.push("email", "This field is required");
    } else if !email.contains('@') {
        errors.push("email", "Enter a valid email address");
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    pub csrf_token: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::default();
        validate_username(&self.username, &mut errors);
        validate_email(&self.email, &mut errors);
        if self.password1.len() < PASSWORD_MIN_LEN {
            errors.push("password1", "This password is too short");
        }
        if self.password1 != self.password2 {
            errors.push("password2", "The two password fields didn't match");
        }
        errors.into_result(NewUser {
            id: self.username.clone(),
            password: self.password1.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub csrf_token: String,
}

impl ProfileForm {
    /// Prefill the form with the user's current profile.
    pub fn from_user(user: &crate::user::User) -> Self {
        ProfileForm {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            csrf_token: String::new(),
        }
    }

    pub fn validate(&self) -> Result<UserProfile, FormErrors> {
        let mut errors = FormErrors::default();
        validate_email(&self.email, &mut errors);
        errors.into_result(UserProfile {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        })
    }
}

/// The confirmation forms (post/comment deletion) carry nothing but the
/// csrf token.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
}

impl LoginForm {
    pub fn credentials(&self) -> Login {
        Login {
            user: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_form() -> PostForm {
        PostForm {
            title: String::from("A title"),
            text: String::from("Body text"),
            pub_date: String::from("2021-06-01T12:30"),
            category: String::from("3"),
            location: String::new(),
            is_published: Some(String::from("on")),
            csrf_token: String::new(),
        }
    }

    #[test]
    fn valid_post_form() {
        let input = post_form().validate().unwrap();
        assert_eq!(input.category_id, Some(3));
        assert_eq!(input.location_id, None);
        assert!(input.is_published);
        assert_eq!(input.pub_date.format(DATETIME_FORMAT).to_string(), "2021-06-01T12:30");
    }

    #[test]
    fn post_form_requires_title_and_text() {
        let mut form = post_form();
        form.title = String::from("   ");
        form.text = String::new();
        let errors = form.validate().unwrap_err();
        let fields: Vec<&str> = errors.all().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "text"]);
    }

    #[test]
    fn post_form_rejects_bad_date() {
        let mut form = post_form();
        form.pub_date = String::from("yesterday");
        assert!(!form.validate().unwrap_err().is_empty());
    }

    #[test]
    fn post_form_rejects_bad_choice() {
        let mut form = post_form();
        form.category = String::from("first");
        assert!(!form.validate().unwrap_err().is_empty());
    }

    #[test]
    fn unchecked_checkbox_is_unpublished() {
        let mut form = post_form();
        form.is_published = None;
        assert!(!form.validate().unwrap().is_published);
    }

    #[test]
    fn prefilled_edit_form_keeps_category_and_location() {
        let now = chrono::Utc::now().naive_utc();
        let post = crate::post::Post {
            id: 1,
            title: String::from("A title"),
            text: String::from("Body text"),
            pub_date: now,
            author: String::from("alice"),
            category_id: Some(3),
            location_id: Some(7),
            is_published: true,
            created_at: now,
        };
        let input = PostForm::from_post(&post).validate().unwrap();
        assert_eq!(input.category_id, Some(3));
        assert_eq!(input.location_id, Some(7));
        assert!(input.is_published);
    }

    #[test]
    fn post_author_comes_from_the_session() {
        let new = post_form()
            .validate()
            .unwrap()
            .into_post(String::from("alice"));
        assert_eq!(new.author, "alice");
    }

    fn registration_form() -> RegistrationForm {
        RegistrationForm {
            username: String::from("alice"),
            email: String::from("alice@example.com"),
            first_name: String::from("Alice"),
            last_name: String::new(),
            password1: String::from("correct horse"),
            password2: String::from("correct horse"),
            csrf_token: String::new(),
        }
    }

    #[test]
    fn valid_registration() {
        let user = registration_form().validate().unwrap();
        assert_eq!(user.id, "alice");
    }

    #[test]
    fn registration_rejects_password_mismatch() {
        let mut form = registration_form();
        form.password2 = String::from("correct  horse");
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.all()[0].field, "password2");
    }

    #[test]
    fn registration_rejects_short_password() {
        let mut form = registration_form();
        form.password1 = String::from("short");
        form.password2 = form.password1.clone();
        assert_eq!(form.validate().unwrap_err().all()[0].field, "password1");
    }

    #[test]
    fn registration_rejects_bad_username() {
        let mut form = registration_form();
        form.username = String::from("al ice");
        assert_eq!(form.validate().unwrap_err().all()[0].field, "username");
    }

    #[test]
    fn registration_rejects_bad_email() {
        let mut form = registration_form();
        form.email = String::from("not-an-address");
        assert_eq!(form.validate().unwrap_err().all()[0].field, "email");
    }

    #[test]
    fn empty_comment_rejected() {
        let form = CommentForm::default();
        assert_eq!(form.validate().unwrap_err().all()[0].field, "text");
    }

    #[test]
    fn form_decodes_from_urlencoded() {
        let form: PostForm = serde_urlencoded::from_bytes(
            b"title=Hello&text=World&pub_date=2021-06-01T12%3A30&category=1&is_published=on&csrf_token=t",
        )
        .unwrap();
        assert_eq!(form.title, "Hello");
        assert!(form.validate().is_ok());
    }
}
