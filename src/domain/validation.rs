use super::errors::{DomainError, FieldErrors};

/// Collects field errors; the first message recorded for a field wins.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.errors
                .entry(field.into())
                .or_insert_with(|| message.into());
        }
    }

    pub fn require(&mut self, value: &str, field: impl Into<String>, message: impl Into<String>) {
        self.check(!value.trim().is_empty(), field, message);
    }

    pub fn email(&mut self, value: &str, field: impl Into<String>, message: impl Into<String>) {
        self.check(is_valid_email(value), field, message);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), DomainError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.errors))
        }
    }
}

/// `local@domain.tld` with a conservative character set and an alphabetic
/// TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_per_field_wins() {
        let mut v = Validator::new();
        v.require("", "email", "email must be provided");
        v.email("", "email", "email must be valid");

        match v.finish() {
            Err(DomainError::Validation(errors)) => {
                assert_eq!(errors["email"], "email must be provided")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn passes_when_nothing_failed() {
        let mut v = Validator::new();
        v.require("Ama", "name", "name must be provided");
        v.check(true, "password", "too short");
        assert!(v.is_valid());
        assert!(v.finish().is_ok());
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("ama.mensah+shop@example.com"));
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ama@example"));
        assert!(!is_valid_email("ama@example.c"));
        assert!(!is_valid_email("ama mensah@example.com"));
    }
}
