use std::borrow::Cow;

use validator::{ValidateEmail, ValidationError};

use super::UserEmail;

/// Maximum number of email addresses stored for one user
const MAX_EMAILS_COUNT: usize = 50;

/// Validate a user's email list.
///
/// Ensures that:
/// - No more than MAX_EMAILS_COUNT addresses are provided
/// - Every address is a syntactically valid email
/// - At most one address is flagged primary
pub fn validate_emails(emails: &[UserEmail]) -> Result<(), ValidationError> {
    if emails.len() > MAX_EMAILS_COUNT {
        let mut err = ValidationError::new("too_many_emails");
        err.message = Some(Cow::Owned(format!(
            "Maximum {} email addresses allowed",
            MAX_EMAILS_COUNT
        )));
        return Err(err);
    }

    for email in emails {
        if !email.address.validate_email() {
            let mut err = ValidationError::new("invalid_email");
            err.message = Some(Cow::Owned(format!(
                "'{}' is not a valid email address",
                email.address
            )));
            return Err(err);
        }
    }

    if emails.iter().filter(|e| e.is_primary).count() > 1 {
        let mut err = ValidationError::new("multiple_primary_emails");
        err.message = Some(Cow::Borrowed("At most one email may be primary"));
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(address: &str, is_primary: bool) -> UserEmail {
        UserEmail {
            address: address.to_string(),
            is_primary,
            verified: false,
        }
    }

    #[test]
    fn test_validate_emails_accepts_single_primary() {
        let emails = vec![email("a@example.com", true), email("b@example.com", false)];
        assert!(validate_emails(&emails).is_ok());
    }

    #[test]
    fn test_validate_emails_rejects_invalid_address() {
        let err = validate_emails(&[email("not-an-email", false)]).unwrap_err();
        assert_eq!(err.code, "invalid_email");
    }

    #[test]
    fn test_validate_emails_rejects_two_primaries() {
        let emails = vec![email("a@example.com", true), email("b@example.com", true)];
        let err = validate_emails(&emails).unwrap_err();
        assert_eq!(err.code, "multiple_primary_emails");
    }

    #[test]
    fn test_validate_emails_empty_is_ok() {
        assert!(validate_emails(&[]).is_ok());
    }
}
