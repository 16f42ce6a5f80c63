//! Input preparation and per-flow field rules.

use super::Error;
use regex::Regex;

pub const PASSWORD_MIN_CHARS: usize = 8;
/// Limits apply to prepared values, escapes included.
pub const NAME_MAX_CHARS: usize = 255;
pub const EMAIL_MAX_CHARS: usize = 255;

/// Which flow a payload is validated for; each has its own rule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Register,
    Login,
    UpdateProfile,
    ChangePassword,
    ForgetPassword,
}

/// Trim surrounding whitespace and HTML-escape `& < > " '`.
#[must_use]
pub fn prepare(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.trim().chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Fields of a request, already prepared; `None` means absent for this flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fields<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
}

fn required(value: Option<&str>, field: &str) -> Result<(), Error> {
    if value.map_or(true, str::is_empty) {
        return Err(Error::Validation(format!("required {field}")));
    }
    Ok(())
}

fn email_format(email: Option<&str>) -> Result<(), Error> {
    if !valid_email(email.unwrap_or_default()) {
        return Err(Error::Validation("invalid email format".to_string()));
    }
    Ok(())
}

fn max_length(value: Option<&str>, field: &str, max: usize) -> Result<(), Error> {
    if value.unwrap_or_default().chars().count() > max {
        return Err(Error::Validation(format!("{field} maximum is {max} characters")));
    }
    Ok(())
}

fn password_length(password: Option<&str>) -> Result<(), Error> {
    if password.unwrap_or_default().chars().count() < PASSWORD_MIN_CHARS {
        return Err(Error::Validation(format!(
            "password minimum is {PASSWORD_MIN_CHARS} characters"
        )));
    }
    Ok(())
}

/// Check `fields` against the rules of `flow`; the first failure wins.
///
/// # Errors
/// Returns [`Error::Validation`] naming the first rule that failed.
pub fn validate(flow: Flow, fields: Fields<'_>) -> Result<(), Error> {
    match flow {
        Flow::Register => {
            required(fields.name, "name")?;
            max_length(fields.name, "name", NAME_MAX_CHARS)?;
            required(fields.email, "email")?;
            email_format(fields.email)?;
            max_length(fields.email, "email", EMAIL_MAX_CHARS)?;
            required(fields.password, "password")?;
            password_length(fields.password)
        }
        Flow::Login => {
            required(fields.password, "password")?;
            required(fields.email, "email")?;
            email_format(fields.email)
        }
        Flow::UpdateProfile => {
            required(fields.name, "name")?;
            max_length(fields.name, "name", NAME_MAX_CHARS)
        }
        Flow::ChangePassword => {
            required(fields.password, "password")?;
            password_length(fields.password)
        }
        Flow::ForgetPassword => {
            required(fields.email, "email")?;
            email_format(fields.email)
        }
    }
}
