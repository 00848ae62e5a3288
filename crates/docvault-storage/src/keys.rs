//! Shared key generation for storage backends.
//!
//! Key format: `documents/{tenant_id}/{document_id}/{upload_session}`. The
//! upload-session segment is the caller's idempotency key, so a retried put
//! lands on the same object key.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Generate the object key for one upload attempt.
///
/// The session id is sanitized to a safe charset before use; anything else
/// is rejected rather than silently rewritten.
pub fn document_key(
    tenant_id: Uuid,
    document_id: Uuid,
    upload_session: &str,
) -> StorageResult<String> {
    validate_session_segment(upload_session)?;
    Ok(format!(
        "documents/{}/{}/{}",
        tenant_id, document_id, upload_session
    ))
}

fn validate_session_segment(segment: &str) -> StorageResult<()> {
    if segment.is_empty() || segment.len() > 128 {
        return Err(StorageError::InvalidKey(
            "Upload session id must be 1-128 characters".to_string(),
        ));
    }
    if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(StorageError::InvalidKey(format!(
            "Upload session id '{}' contains invalid characters",
            segment
        )));
    }
    if segment.contains("..") {
        return Err(StorageError::InvalidKey(
            "Upload session id must not contain '..'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_is_tenant_scoped() {
        let tenant = Uuid::new_v4();
        let doc = Uuid::new_v4();
        let key = document_key(tenant, doc, "session-1").unwrap();
        assert_eq!(key, format!("documents/{}/{}/session-1", tenant, doc));
    }

    #[test]
    fn same_session_same_key() {
        let tenant = Uuid::new_v4();
        let doc = Uuid::new_v4();
        let a = document_key(tenant, doc, "retry-me").unwrap();
        let b = document_key(tenant, doc, "retry-me").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hostile_session_ids_rejected() {
        let tenant = Uuid::new_v4();
        let doc = Uuid::new_v4();
        assert!(document_key(tenant, doc, "").is_err());
        assert!(document_key(tenant, doc, "a/b").is_err());
        assert!(document_key(tenant, doc, "..").is_err());
        assert!(document_key(tenant, doc, &"x".repeat(129)).is_err());
    }
}
