//! Password hashing, verification, and acceptance policy.
//!
//! Hashes are Argon2id PHC strings, so the algorithm and work factor travel
//! with each hash and can be raised without a migration.

use anyhow::{anyhow, Context, Result};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Syntactically valid Argon2id hash that matches no password. Used when the
/// email is unknown so unknown-email and wrong-password take the same time.
pub(super) const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password for storage.
///
/// # Errors
///
/// Returns an error if hashing fails (salt generation or parameter issues).
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify `candidate` against a stored PHC hash. Deliberately slow; callers
/// must check lockout state first so locked accounts never reach this.
pub(super) fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

/// Burn the same Argon2 work as a real verification without revealing
/// anything. Called when the email does not exist.
pub(super) fn verify_dummy_password(candidate: &str) {
    let _ = verify_password(DUMMY_HASH, candidate);
}

/// Check the password acceptance policy, returning one message per unmet
/// rule so callers can report field-level detail.
pub(super) fn password_policy_violations(password: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push("must be at least 8 characters long");
    }
    if !password.chars().any(char::is_uppercase) {
        violations.push("must contain an uppercase letter");
    }
    if !password.chars().any(char::is_lowercase) {
        violations.push("must contain a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("must contain a digit");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        violations.push("must contain a symbol");
    }
    violations
}

/// Validate the dummy hash parses at startup; a typo here would silently
/// break the unknown-email timing equalization.
///
/// # Errors
///
/// Returns an error if the constant is not a valid PHC string.
pub(crate) fn check_dummy_hash() -> Result<()> {
    PasswordHash::new(DUMMY_HASH)
        .map(|_| ())
        .map_err(|err| anyhow!("{err}"))
        .context("invalid dummy password hash")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_correct_password() -> Result<()> {
        let hash = hash_password("Str0ng!Pass")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "Str0ng!Pass"));
        assert!(!verify_password(&hash, "Str0ng!Pass2"));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash_password("Str0ng!Pass")?;
        let second = hash_password("Str0ng!Pass")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn dummy_hash_parses_and_matches_nothing() -> Result<()> {
        check_dummy_hash()?;
        assert!(!verify_password(DUMMY_HASH, "Str0ng!Pass"));
        assert!(!verify_password(DUMMY_HASH, ""));
        Ok(())
    }

    #[test]
    fn corrupt_stored_hash_rejects() {
        assert!(!verify_password("not-a-phc-string", "Str0ng!Pass"));
    }

    #[test]
    fn policy_accepts_compliant_password() {
        assert!(password_policy_violations("Str0ng!Pass").is_empty());
    }

    #[test]
    fn policy_reports_each_missing_rule() {
        let violations = password_policy_violations("short");
        assert!(violations.contains(&"must be at least 8 characters long"));
        assert!(violations.contains(&"must contain an uppercase letter"));
        assert!(violations.contains(&"must contain a digit"));
        assert!(violations.contains(&"must contain a symbol"));

        assert_eq!(
            password_policy_violations("alllowercase1!"),
            vec!["must contain an uppercase letter"]
        );
        assert_eq!(
            password_policy_violations("NoDigits!!"),
            vec!["must contain a digit"]
        );
        assert_eq!(
            password_policy_violations("NoSymbol123"),
            vec!["must contain a symbol"]
        );
    }
}
