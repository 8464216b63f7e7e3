//! Credential wrapper that never appears in logs.

use serde::Deserialize;

/// An API key, token or password.
///
/// `Debug` and `Display` always print `[REDACTED]`, so notifiers can derive
/// or hand-write `Debug` without leaking credentials into `tracing` output.
///
/// # Example
///
/// ```
/// use herald::config::SecretString;
///
/// let token = SecretString::new("xoxb-123456".to_string());
/// assert_eq!(format!("{:?}", token), "[REDACTED]");
/// assert_eq!(token.expose(), "xoxb-123456");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        SecretString(s)
    }

    /// The raw credential. Only for building requests and identifiers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_in_debug_and_display() {
        let secret = SecretString::new("T1JJ3T3L2/A1BRTD4JD".to_string());

        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "T1JJ3T3L2/A1BRTD4JD");
    }

    #[test]
    fn no_credential_leaks_through_containers() {
        let apikey = SecretString::new("a".repeat(48));
        let password = SecretString::new("hunter2".to_string());

        let representations = [
            format!("{:?}", Some(&apikey)),
            format!("{:?}", vec![&apikey, &password]),
            format!("{:?}", (&password, 1)),
        ];

        for repr in &representations {
            assert!(!repr.contains("aaaa"), "leaked apikey: {}", repr);
            assert!(!repr.contains("hunter2"), "leaked password: {}", repr);
        }
    }

    #[test]
    fn deserializes_from_plain_string() {
        let secret: SecretString = serde_yaml::from_str("\"abc\"").unwrap();
        assert_eq!(secret.expose(), "abc");
    }
}
