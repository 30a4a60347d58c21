use super::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Validated target of one investigation run.
///
/// Construct with [`InvestigationInput::new`]; every present field is already
/// normalised (lowercased email domain, E.164 phone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInput")]
pub struct InvestigationInput {
    email: Option<String>,
    phone: Option<String>,
}

/// Wire shape of [`InvestigationInput`]; deserialisation goes through
/// [`InvestigationInput::new`] so stored records cannot bypass validation.
#[derive(Deserialize)]
struct RawInput {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
}

impl TryFrom<RawInput> for InvestigationInput {
    type Error = AppError;

    fn try_from(raw: RawInput) -> Result<Self> {
        Self::new(raw.email.as_deref(), raw.phone.as_deref())
    }
}

impl InvestigationInput {
    /// Validate and normalise raw user input.
    ///
    /// All validation problems are collected and reported together.
    pub fn new(email: Option<&str>, phone: Option<&str>) -> Result<Self> {
        let email = email.map(str::trim).filter(|s| !s.is_empty());
        let phone = phone.map(str::trim).filter(|s| !s.is_empty());

        if email.is_none() && phone.is_none() {
            return Err(AppError::InvalidInput(vec![
                "at least one of email or phone is required".to_string(),
            ]));
        }

        let mut errors = Vec::new();

        let email = match email.map(normalize_email).transpose() {
            Ok(email) => email,
            Err(e) => {
                errors.push(format!("Invalid email: {}", e));
                None
            }
        };

        let phone = match phone.map(normalize_phone).transpose() {
            Ok(phone) => phone,
            Err(e) => {
                errors.push(format!("Invalid phone: {}", e));
                None
            }
        };

        if !errors.is_empty() {
            return Err(AppError::InvalidInput(errors));
        }

        Ok(Self { email, phone })
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// The part of the email before `@`.
    pub fn email_local_part(&self) -> Option<&str> {
        self.email().and_then(|e| e.split_once('@')).map(|(local, _)| local)
    }

    /// The lowercased domain of the email.
    pub fn email_domain(&self) -> Option<&str> {
        self.email().and_then(|e| e.split_once('@')).map(|(_, domain)| domain)
    }
}

fn normalize_email(raw: &str) -> std::result::Result<String, String> {
    let (local, domain) = raw
        .split_once('@')
        .ok_or_else(|| "missing '@'".to_string())?;

    if domain.contains('@') {
        return Err("more than one '@'".to_string());
    }
    if local.is_empty() {
        return Err("empty local part".to_string());
    }
    if local.len() > 64 {
        return Err("local part longer than 64 characters".to_string());
    }
    if local.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("local part contains whitespace".to_string());
    }

    let domain = domain.to_ascii_lowercase();
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(format!("domain '{}' has no top-level label", domain));
    }
    for label in &labels {
        let valid = !label.is_empty()
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-');
        if !valid {
            return Err(format!("domain '{}' has an invalid label", domain));
        }
    }

    Ok(format!("{}@{}", local, domain))
}

fn normalize_phone(raw: &str) -> std::result::Result<String, String> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')' | '\t'))
        .collect();

    let digits = if let Some(rest) = compact.strip_prefix('+') {
        rest
    } else if let Some(rest) = compact.strip_prefix("00") {
        rest
    } else {
        return Err("expected an international number starting with '+' or '00'".to_string());
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("contains non-digit characters".to_string());
    }
    if !(7..=15).contains(&digits.len()) {
        return Err(format!("{} digits, E.164 allows 7 to 15", digits.len()));
    }
    if digits.starts_with('0') {
        return Err("country calling code cannot start with 0".to_string());
    }

    let parsed = phonenumber::parse(None, format!("+{}", digits)).map_err(|e| e.to_string())?;
    Ok(parsed.format().mode(phonenumber::Mode::E164).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_domain_is_lowercased() {
        let input = InvestigationInput::new(Some("  Jane.Doe@Example.COM "), None).unwrap();
        assert_eq!(input.email(), Some("Jane.Doe@example.com"));
        assert_eq!(input.email_local_part(), Some("Jane.Doe"));
        assert_eq!(input.email_domain(), Some("example.com"));
        assert_eq!(input.phone(), None);
    }

    #[test]
    fn test_phone_is_normalised_to_e164() {
        let input = InvestigationInput::new(None, Some("+1 (555) 123-4567")).unwrap();
        assert_eq!(input.phone(), Some("+15551234567"));

        let input = InvestigationInput::new(None, Some("0044 7700 900123")).unwrap();
        assert_eq!(input.phone(), Some("+447700900123"));
    }

    #[test]
    fn test_requires_at_least_one_field() {
        let err = InvestigationInput::new(None, Some("   ")).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref e) if e.len() == 1));
    }

    #[test]
    fn test_collects_every_validation_error() {
        let err = InvestigationInput::new(Some("not-an-email"), Some("5551234")).unwrap_err();
        match err {
            AppError::InvalidInput(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].starts_with("Invalid email"));
                assert!(errors[1].starts_with("Invalid phone"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_emails() {
        for raw in ["a@b", "a@@b.com", "@b.com", "a b@c.com", "a@-b.com", "a@b..com"] {
            assert!(
                InvestigationInput::new(Some(raw), None).is_err(),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let input: InvestigationInput =
            serde_json::from_str(r#"{"email":"Jane@Example.COM","phone":null}"#).unwrap();
        assert_eq!(input.email(), Some("Jane@example.com"));

        assert!(serde_json::from_str::<InvestigationInput>("{}").is_err());
        assert!(serde_json::from_str::<InvestigationInput>(r#"{"email":"nope"}"#).is_err());
    }

    #[test]
    fn test_unassigned_calling_code_is_rejected() {
        let err = InvestigationInput::new(None, Some("+9991234567")).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref e) if e[0].starts_with("Invalid phone")));
    }

    #[test]
    fn test_rejects_malformed_phones() {
        for raw in ["+0123456789", "+12", "+1234567890123456", "+1-555-CALL-NOW"] {
            assert!(
                InvestigationInput::new(None, Some(raw)).is_err(),
                "{raw} should be rejected"
            );
        }
    }
}
