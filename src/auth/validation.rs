use regex::Regex;

pub const LOGIN_MIN_CHARS: usize = 3;
pub const LOGIN_MAX_CHARS: usize = 20;
pub const PASSWORD_MIN_CHARS: usize = 1;
pub const PASSWORD_MAX_CHARS: usize = 128;

#[must_use]
pub fn normalize_login(login: &str) -> String {
    login.trim().to_string()
}

/// Check an already normalized login.
///
/// # Errors
/// Returns a client-facing message describing the rule that failed.
pub fn validate_login(login: &str) -> Result<(), String> {
    let chars = login.chars().count();
    if !(LOGIN_MIN_CHARS..=LOGIN_MAX_CHARS).contains(&chars) {
        return Err(format!(
            "login must be between {LOGIN_MIN_CHARS} and {LOGIN_MAX_CHARS} characters"
        ));
    }
    if !Regex::new(r"^[A-Za-z0-9_.\-]+$").is_ok_and(|re| re.is_match(login)) {
        return Err("login may only contain letters, digits, '_', '.' and '-'".to_string());
    }
    Ok(())
}

/// Passwords are taken as-is, surrounding whitespace included.
///
/// # Errors
/// Returns a client-facing message describing the rule that failed.
pub fn validate_password(password: &str) -> Result<(), String> {
    let chars = password.chars().count();
    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&chars) {
        return Err(format!(
            "password must be between {PASSWORD_MIN_CHARS} and {PASSWORD_MAX_CHARS} characters"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_rules() {
        assert!(validate_login("alice").is_ok());
        assert!(validate_login("a.b-c_9").is_ok());
        assert!(validate_login("abc").is_ok());
        assert!(validate_login(&"x".repeat(20)).is_ok());

        assert!(validate_login("ab").is_err());
        assert!(validate_login(&"x".repeat(21)).is_err());
        assert!(validate_login("al ice").is_err());
        assert!(validate_login("alice@home").is_err());
        assert!(validate_login("").is_err());
    }

    #[test]
    fn login_is_trimmed() {
        assert_eq!(normalize_login("  alice\t"), "alice");
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("pw1").is_ok());
        assert!(validate_password(" ").is_ok());
        assert!(validate_password(&"p".repeat(128)).is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
        // multibyte characters count once
        assert!(validate_password(&"é".repeat(128)).is_ok());
    }
}
