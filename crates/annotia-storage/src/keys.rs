//! Shared key generation for storage backends.
//!
//! Key format: `orgs/{org_id}/projects/{project_id}/files/{stored_name}`.
//! The same layout is used for the local staging directory and for cloud
//! object keys so a file's identity is backend-independent.

use annotia_core::models::FileScope;

/// Generate the storage key for a file in the given scope.
pub fn file_key(scope: &FileScope, stored_name: &str) -> String {
    format!(
        "orgs/{}/projects/{}/files/{}",
        scope.org_id, scope.project_id, stored_name
    )
}

/// The server-relative upload endpoint for a file (local backend only).
pub fn upload_endpoint(scope: &FileScope, file_id: uuid::Uuid) -> String {
    format!(
        "/orgs/{}/projects/{}/files/{}/upload",
        scope.org_id, scope.project_id, file_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn key_layout_is_scope_prefixed() {
        let scope = FileScope::new(Uuid::nil(), Uuid::nil());
        let key = file_key(&scope, "abc.png");
        assert_eq!(
            key,
            "orgs/00000000-0000-0000-0000-000000000000/projects/00000000-0000-0000-0000-000000000000/files/abc.png"
        );
    }

    #[test]
    fn upload_endpoint_targets_file_id() {
        let scope = FileScope::new(Uuid::nil(), Uuid::nil());
        let id = Uuid::nil();
        assert!(upload_endpoint(&scope, id).ends_with(&format!("/files/{}/upload", id)));
    }
}
