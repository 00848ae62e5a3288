//! Upload metadata validation
//!
//! Provides validation for caller-supplied document metadata:
//! - Filename validation: non-empty, no path components, allowed extension
//! - Tag normalization: trimmed, lowercased, empties dropped
//! - Attribute validation: key pattern, key/value length, key count limits

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::models::DocumentCreate;

/// Maximum length for attribute key names (64 characters)
pub const MAX_ATTRIBUTE_KEY_LENGTH: usize = 64;

/// Maximum length for attribute values (512 characters)
pub const MAX_ATTRIBUTE_VALUE_LENGTH: usize = 512;

/// Maximum number of attribute keys per document (50 keys)
pub const MAX_ATTRIBUTES: usize = 50;

fn attribute_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_\-\.:]+$").expect("attribute key pattern must compile")
    })
}

/// Validate a filename.
///
/// Rules: non-empty after trimming, no path separators or `..` (filenames
/// become storage key segments), and when `allowed_extensions` is non-empty
/// the extension must be listed.
pub fn validate_filename(filename: &str, allowed_extensions: &[String]) -> Result<()> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Filename cannot be empty");
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") {
        anyhow::bail!("Filename '{}' contains path components", trimmed);
    }

    if !allowed_extensions.is_empty() {
        let extension = trimmed
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        if !allowed_extensions.contains(&extension) {
            anyhow::bail!(
                "File type '{}' is not allowed. Allowed types: {:?}",
                extension,
                allowed_extensions
            );
        }
    }

    Ok(())
}

/// Normalize a tag list: trim, lowercase, drop empties.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Validate an attribute key name.
///
/// Rules:
/// - Must match pattern: `^[a-zA-Z0-9_\-\.:]+$`
/// - Maximum 64 characters
pub fn validate_attribute_key(key: &str) -> Result<()> {
    if key.is_empty() {
        anyhow::bail!("Attribute key cannot be empty");
    }
    if key.len() > MAX_ATTRIBUTE_KEY_LENGTH {
        anyhow::bail!(
            "Attribute key '{}' exceeds maximum length of {} characters",
            key,
            MAX_ATTRIBUTE_KEY_LENGTH
        );
    }
    if !attribute_key_pattern().is_match(key) {
        anyhow::bail!(
            "Attribute key '{}' contains invalid characters. Allowed: letters, digits, underscore (_), hyphen (-), dot (.), colon (:)",
            key
        );
    }
    Ok(())
}

/// Validate the full attribute map (keys, values, count).
pub fn validate_attributes(attributes: &HashMap<String, String>) -> Result<()> {
    if attributes.len() > MAX_ATTRIBUTES {
        anyhow::bail!(
            "Document has {} attributes, but maximum allowed is {}",
            attributes.len(),
            MAX_ATTRIBUTES
        );
    }

    for (key, value) in attributes {
        validate_attribute_key(key).with_context(|| format!("Invalid attribute key: '{}'", key))?;
        if value.len() > MAX_ATTRIBUTE_VALUE_LENGTH {
            anyhow::bail!(
                "Attribute value for '{}' exceeds maximum length of {} characters",
                key,
                MAX_ATTRIBUTE_VALUE_LENGTH
            );
        }
    }

    Ok(())
}

/// Validate and normalize upload metadata in place.
pub fn validate_create(create: &mut DocumentCreate, allowed_extensions: &[String]) -> Result<()> {
    validate_filename(&create.filename, allowed_extensions)?;
    create.filename = create.filename.trim().to_string();

    if create.content_type.trim().is_empty() {
        anyhow::bail!("Content type cannot be empty");
    }

    create.tags = normalize_tags(&create.tags);
    validate_attributes(&create.attributes)?;
    Ok(())
}
