//! Route handlers.

pub mod forget_password;
pub mod health;
pub mod login;
pub mod mail;
pub mod register;
pub mod root;
pub mod secret;
pub mod user;

/// Query flags are on only when literally `true`.
pub(crate) fn flag(value: Option<&str>) -> bool {
    value == Some("true")
}

#[cfg(test)]
mod tests {
    use super::flag;

    #[test]
    fn test_flag() {
        assert!(flag(Some("true")));
        assert!(!flag(Some("1")));
        assert!(!flag(Some("TRUE")));
        assert!(!flag(None));
    }
}
