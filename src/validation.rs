use crate::error::{Result, TabError};

/// Returns the trimmed value, or `InvalidInput` naming `field` when it is
/// empty or whitespace-only.
pub fn require_non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(TabError::invalid(format!("{field} must not be blank")))
    } else {
        Ok(trimmed)
    }
}

pub fn is_valid_slug(string: &str) -> Result<()> {
    let cmp = !string.is_empty()
        && string
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    match cmp {
        true => Ok(()),
        false => Err(TabError::invalid(format!(
            "invalid slug `{string}` (use ascii letters, digits, `-` and `_`)"
        ))),
    }
}

/// Treats a missing or blank optional field as absent.
pub fn non_blank_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[test]
fn test_blank_names() {
    assert!(require_non_blank("speaker name", "  \t").is_err());
    assert_eq!(require_non_blank("speaker name", " Ana ").unwrap(), "Ana");
    assert!(is_valid_slug("eds-cup_2025").is_ok());
    assert!(is_valid_slug("eds cup").is_err());
    assert_eq!(non_blank_opt(Some("  ".into())), None);
}
