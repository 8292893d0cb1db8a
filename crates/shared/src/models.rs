use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Resource types, mirroring the legacy backend's wire format
// ============================================================================
//
// The backend predates this client and uses Portuguese field names
// (`usuarioid`, `projetoid`, `datahora`, ...). Rust-side names are English;
// serde renames keep the wire format intact.

/// Account status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    #[serde(rename = "Ativo")]
    Active,
    #[serde(rename = "Bloqueado")]
    Blocked,
    #[serde(rename = "Cancelado")]
    Cancelled,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserStatus::Active => "Ativo",
            UserStatus::Blocked => "Bloqueado",
            UserStatus::Cancelled => "Cancelado",
        };
        f.write_str(s)
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "Ativo")]
    Active,
    #[serde(rename = "Encerrado")]
    Closed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectStatus::Active => "Ativo",
            ProjectStatus::Closed => "Encerrado",
        };
        f.write_str(s)
    }
}

/// Role reference data (read-only on this client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserType {
    #[serde(rename = "tipoid")]
    pub id: u32,
    #[serde(rename = "tipo")]
    pub name: String,
}

/// Policy text attached to a permission record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "descricao")]
    pub description: String,
}

/// Role-to-policy mapping (read-only on this client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "tipoid")]
    pub type_id: u32,
    #[serde(rename = "politica")]
    pub policy: Policy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "usuarioid")]
    pub id: u32,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    /// Present on some endpoints only (e.g. `/usuarios/me`).
    #[serde(rename = "tipoid", default)]
    pub type_id: Option<u32>,
    /// Nested type object, when the endpoint expands it.
    #[serde(rename = "tipou", default)]
    pub user_type: Option<UserType>,
}

/// Payload for creating or updating a user. The backend expects the full
/// record on update as well, including the password.
#[derive(Debug, Clone, Serialize)]
pub struct UserPayload {
    pub email: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipoid")]
    pub type_id: u32,
    pub status: UserStatus,
    #[serde(rename = "senha")]
    pub password: String,
}

/// Returned by the password-reset endpoint; carries the freshly generated
/// credential so the operator can hand it over.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetOutcome {
    #[serde(rename = "usuarioid")]
    pub id: u32,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "projetoid")]
    pub id: u32,
    #[serde(rename = "projeto")]
    pub name: String,
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPayload {
    #[serde(rename = "projeto")]
    pub name: String,
    pub status: ProjectStatus,
}

/// One ingested document, tied to exactly one project. Entries are created
/// by the attach workflow and deleted explicitly, never updated in place.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEntry {
    #[serde(rename = "repositorioid")]
    pub id: u32,
    pub markdown: String,
    #[serde(rename = "tipoarquivo")]
    pub file_type: String,
    #[serde(rename = "datahora")]
    pub attached_at: DateTime<Utc>,
    #[serde(rename = "projeto", default)]
    pub project: Option<Project>,
    #[serde(rename = "usuario", default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRepositoryEntry {
    pub markdown: String,
    #[serde(rename = "tipoarquivo")]
    pub file_type: String,
    #[serde(rename = "projetoid")]
    pub project_id: u32,
    #[serde(rename = "usuarioid")]
    pub user_id: u32,
    #[serde(rename = "datahora")]
    pub attached_at: DateTime<Utc>,
}

/// The single shared instruction template prepended to every generation
/// request. Addressed by id; the backend keeps one record.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralPrompt {
    #[serde(rename = "promptid")]
    pub id: u32,
    pub prompt: String,
    #[serde(rename = "datahora")]
    pub edited_at: DateTime<Utc>,
    #[serde(rename = "usuario", default)]
    pub editor: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneralPromptUpdate {
    pub prompt: String,
    #[serde(rename = "usuarioid")]
    pub user_id: u32,
    #[serde(rename = "datahora")]
    pub edited_at: DateTime<Utc>,
}

/// Append-only history of free-text prompts users supplied for earlier
/// generation runs. The same shape is used for listing and appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPromptEntry {
    pub prompt: String,
    #[serde(rename = "usuarioid")]
    pub user_id: u32,
    #[serde(rename = "datahora")]
    pub recorded_at: DateTime<Utc>,
}

/// Body of a successful `POST /token` exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_user_wire_field_names() {
        let json = r#"{
            "usuarioid": 3,
            "nome": "Ana",
            "email": "ana@example.pt",
            "status": "Ativo",
            "tipoid": 2,
            "tipou": {"tipoid": 2, "tipo": "Supervisor"}
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.user_type.unwrap().name, "Supervisor");
    }

    #[test]
    fn test_user_without_nested_type() {
        let json = r#"{"usuarioid": 1, "nome": "B", "email": "b@x", "status": "Bloqueado"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.status, UserStatus::Blocked);
        assert!(user.type_id.is_none());
        assert!(user.user_type.is_none());
    }

    #[test]
    fn test_user_payload_serializes_legacy_names() {
        let payload = UserPayload {
            email: "c@x".to_string(),
            name: "C".to_string(),
            type_id: 1,
            status: UserStatus::Cancelled,
            password: "s3cret".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"nome\":\"C\""));
        assert!(json.contains("\"tipoid\":1"));
        assert!(json.contains("\"status\":\"Cancelado\""));
        assert!(json.contains("\"senha\":\"s3cret\""));
    }

    #[test]
    fn test_repository_entry_parses_utc_timestamp() {
        let json = r##"{
            "repositorioid": 9,
            "markdown": "# body",
            "tipoarquivo": "pdf",
            "datahora": "2025-10-26T12:34:56.789Z"
        }"##;
        let entry: RepositoryEntry = serde_json::from_str(json).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 10, 26, 12, 34, 56).unwrap();
        assert_eq!(entry.attached_at.date_naive(), expected.date_naive());
        assert!(entry.project.is_none());
    }

    #[test]
    fn test_new_repository_entry_timestamp_has_z_suffix() {
        let entry = NewRepositoryEntry {
            markdown: "m".to_string(),
            file_type: "docx".to_string(),
            project_id: 4,
            user_id: 0,
            attached_at: Utc.with_ymd_and_hms(2025, 10, 26, 8, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"projetoid\":4"));
        assert!(json.contains("\"datahora\":\"2025-10-26T08:00:00Z\""));
    }

    #[test]
    fn test_project_status_wire_values() {
        let active: Project =
            serde_json::from_str(r#"{"projetoid": 1, "projeto": "Apollo", "status": "Ativo"}"#)
                .unwrap();
        assert_eq!(active.status, ProjectStatus::Active);
        let closed: Project =
            serde_json::from_str(r#"{"projetoid": 2, "projeto": "Hermes", "status": "Encerrado"}"#)
                .unwrap();
        assert_eq!(closed.status, ProjectStatus::Closed);
    }

    #[test]
    fn test_token_response_tolerates_missing_token() {
        let body: TokenResponse = serde_json::from_str("{}").unwrap();
        assert!(body.access_token.is_none());
    }
}
