//! Manager identity resolution.
//!
//! Chooses the manager name attributed to a write when the caller did not
//! supply one, and resolves the deprecated manager attribute stored on
//! the object's metadata.

use crate::error::{Error, Result};
use crate::object::Object;

/// Longest accepted manager name, in bytes.
pub const FIELD_MANAGER_MAX_LENGTH: usize = 128;

/// Name attributed to writes with no manager and no usable client string.
pub const DEFAULT_FIELD_MANAGER: &str = "unknown";

/// Truncates to at most `FIELD_MANAGER_MAX_LENGTH` bytes, never splitting
/// a character.
fn truncated(s: &str) -> &str {
    if s.len() <= FIELD_MANAGER_MAX_LENGTH {
        return s;
    }
    let mut end = FIELD_MANAGER_MAX_LENGTH;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Derives a manager name from a client's identifying string: everything
/// up to the first `/`, truncated to the maximum length.
///
/// `"Mozilla/5.0 ..."` becomes `"Mozilla"`.
pub fn prefix_from_user_agent(user_agent: &str) -> &str {
    let prefix = user_agent.split('/').next().unwrap_or(user_agent);
    truncated(prefix)
}

/// Picks the acting manager name: the explicit name if present, else the
/// user-agent prefix, else the fixed default.
pub fn field_manager_or_user_agent(manager: &str, user_agent: &str) -> String {
    if !manager.is_empty() {
        return manager.to_string();
    }
    let prefix = prefix_from_user_agent(user_agent);
    if prefix.is_empty() {
        return DEFAULT_FIELD_MANAGER.to_string();
    }
    prefix.to_string()
}

/// Validates an explicitly supplied manager name.
pub fn validate_field_manager(manager: &str) -> Result<&str> {
    if manager.len() > FIELD_MANAGER_MAX_LENGTH {
        return Err(Error::validation("manager name too long"));
    }
    Ok(manager)
}

/// Resolves the manager recorded on the object's metadata (the deprecated
/// single-string attribute) against a `field` argument from the request.
///
/// With no stored value the `field` argument wins. With no `field`
/// argument the stored value wins, after length validation. When both
/// are present and differ, no legacy manager applies and the mismatch is
/// a validation error.
pub fn object_field_manager(obj: &Object, field: &str) -> Result<String> {
    let stored = obj.field_manager().unwrap_or("");
    if stored.is_empty() {
        return Ok(field.to_string());
    }
    if field.is_empty() {
        validate_field_manager(stored)?;
        return Ok(stored.to_string());
    }
    if stored == field {
        return Ok(stored.to_string());
    }
    Err(Error::validation(format!(
        "conflicting manager names: object has {:?}, request has {:?}",
        stored, field
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;

    fn object_with_manager(manager: &str) -> Object {
        let json = format!(
            r#"{{"metadata":{{"fieldManager":"{}"}}}}"#,
            manager
        );
        Object::new(from_json(&json).unwrap()).unwrap()
    }

    #[test]
    fn test_manager_or_user_agent() {
        let cases = [
            (
                "",
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/72.0.3626.121 Safari/537.36",
                "Mozilla",
            ),
            ("", "userAgent", "userAgent"),
            ("manager", "userAgent", "manager"),
            ("", "", DEFAULT_FIELD_MANAGER),
        ];
        for (manager, user_agent, expected) in cases {
            assert_eq!(field_manager_or_user_agent(manager, user_agent), expected);
        }
    }

    #[test]
    fn test_user_agent_prefix_truncated() {
        let long = "f".repeat(FIELD_MANAGER_MAX_LENGTH + 3) + "/Something";
        let got = field_manager_or_user_agent("", &long);
        assert_eq!(got, "f".repeat(FIELD_MANAGER_MAX_LENGTH));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // 60 four-byte characters; 32 of them fit in 128 bytes.
        let emoji = "\u{1F354}".repeat(60);
        let got = prefix_from_user_agent(&emoji);
        assert_eq!(got.chars().count(), 32);
        assert_eq!(got.len(), FIELD_MANAGER_MAX_LENGTH);
    }

    #[test]
    fn test_validate_field_manager() {
        assert!(validate_field_manager("manager").is_ok());
        let too_long = "f".repeat(FIELD_MANAGER_MAX_LENGTH + 1);
        let err = validate_field_manager(&too_long).unwrap_err();
        assert!(err.is_bad_request());
    }

    #[test]
    fn test_object_field_manager_precedence() {
        // No stored value: the field argument wins.
        let none = Object::empty();
        assert_eq!(object_field_manager(&none, "").unwrap(), "");
        assert_eq!(object_field_manager(&none, "field").unwrap(), "field");

        // Stored value wins when no field argument is given.
        let stored = object_with_manager("manager");
        assert_eq!(object_field_manager(&stored, "").unwrap(), "manager");
        assert_eq!(object_field_manager(&stored, "manager").unwrap(), "manager");

        // Both present and differing: validation error.
        let err = object_field_manager(&stored, "field").unwrap_err();
        assert!(err.is_bad_request());
    }

    #[test]
    fn test_object_field_manager_too_long() {
        let stored = object_with_manager(&"f".repeat(FIELD_MANAGER_MAX_LENGTH + 1));
        let err = object_field_manager(&stored, "").unwrap_err();
        assert!(err.is_bad_request());
    }
}
