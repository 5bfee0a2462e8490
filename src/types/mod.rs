//! Core data types for the Codespaces API.

use crate::errors::{CodespacesError, CodespacesResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Codespace is running and reachable.
pub const CODESPACE_STATE_AVAILABLE: &str = "Available";
/// Codespace is stopped.
pub const CODESPACE_STATE_SHUTDOWN: &str = "Shutdown";
/// Codespace is booting.
pub const CODESPACE_STATE_STARTING: &str = "Starting";

/// Account owning a codespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Username (login).
    #[serde(default)]
    pub login: String,
    /// Account type (User, Organization, Bot).
    #[serde(rename = "type", default)]
    pub user_type: String,
}

/// Repository a codespace was created from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository ID.
    #[serde(default)]
    pub id: u64,
    /// Full name (owner/repo).
    #[serde(default)]
    pub full_name: String,
    /// Default branch.
    #[serde(default)]
    pub default_branch: String,
}

/// Git state of the codespace working tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodespaceGitStatus {
    /// Commits ahead of upstream.
    pub ahead: u32,
    /// Commits behind upstream.
    pub behind: u32,
    /// Checked-out ref.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Local commits not pushed.
    pub has_unpushed_changes: bool,
    /// Working tree changes not committed.
    pub has_uncommited_changes: bool,
}

/// Hardware the codespace runs on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodespaceMachine {
    /// Machine type name.
    pub name: String,
    /// Human-readable machine name.
    pub display_name: String,
    /// Operating system.
    pub operating_system: String,
    /// Storage size.
    pub storage_in_bytes: u64,
    /// Memory size.
    pub memory_in_bytes: u64,
    /// CPU count.
    pub cpus: u32,
}

/// Live-share connection details, present when requested with the fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodespaceConnection {
    /// Session ID.
    pub session_id: String,
    /// Session token.
    pub session_token: String,
    /// Relay endpoint.
    pub relay_endpoint: String,
    /// Relay shared access signature.
    #[serde(rename = "relaySas")]
    pub relay_sas: String,
    /// Host public keys.
    pub host_public_keys: Vec<String>,
}

/// A cloud development environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Codespace {
    /// Unique codespace name.
    pub name: String,
    /// Creation time.
    #[serde(deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Display name.
    pub display_name: String,
    /// Last use time.
    #[serde(deserialize_with = "optional_timestamp")]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Owner.
    pub owner: User,
    /// Source repository.
    pub repository: Repository,
    /// Lifecycle state (see the `CODESPACE_STATE_*` constants).
    pub state: String,
    /// Git status.
    pub git_status: CodespaceGitStatus,
    /// Connection details.
    pub connection: CodespaceConnection,
    /// Machine.
    pub machine: CodespaceMachine,
    /// Target environment of the backing service.
    pub vscs_target: String,
}

/// Field names accepted by [`Codespace::export_data`].
pub const CODESPACE_EXPORT_FIELDS: &[&str] = &[
    "displayName",
    "name",
    "owner",
    "repository",
    "state",
    "gitStatus",
    "createdAt",
    "lastUsedAt",
    "machineName",
    "vscsTarget",
];

/// Reads an RFC 3339 timestamp where `null` and `""` both mean unset.
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn timestamp(value: &Option<DateTime<Utc>>) -> Value {
    value
        .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .unwrap_or(Value::Null)
}

impl Codespace {
    /// Returns true when the codespace is running.
    pub fn is_available(&self) -> bool {
        self.state == CODESPACE_STATE_AVAILABLE
    }

    /// Projects the requested fields into a JSON object.
    ///
    /// Nested values are flattened: `owner` is the owner's login, `repository`
    /// the full name and `machineName` the machine type. Unknown field names
    /// are rejected.
    pub fn export_data(&self, fields: &[&str]) -> CodespacesResult<Map<String, Value>> {
        let mut data = Map::with_capacity(fields.len());

        for &field in fields {
            let value = match field {
                "name" => json!(self.name),
                "displayName" => json!(self.display_name),
                "createdAt" => timestamp(&self.created_at),
                "lastUsedAt" => timestamp(&self.last_used_at),
                "owner" => json!(self.owner.login),
                "repository" => json!(self.repository.full_name),
                "state" => json!(self.state),
                "gitStatus" => json!({
                    "ref": self.git_status.git_ref,
                    "hasUnpushedChanges": self.git_status.has_unpushed_changes,
                    "hasUncommitedChanges": self.git_status.has_uncommited_changes,
                }),
                "machineName" => json!(self.machine.name),
                "vscsTarget" => json!(self.vscs_target),
                unknown => {
                    return Err(CodespacesError::invalid_parameter(format!(
                        "Unknown codespace field {:?}; available fields: {}",
                        unknown,
                        CODESPACE_EXPORT_FIELDS.join(", ")
                    )))
                }
            };
            data.insert(field.to_string(), value);
        }

        Ok(data)
    }
}

/// Body of a codespace collection page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodespaceList {
    /// Codespaces on this page.
    #[serde(default)]
    pub codespaces: Vec<Codespace>,
    /// Total codespaces reported by the server.
    #[serde(default)]
    pub total_count: u64,
}

/// Changes applied by an edit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditCodespaceParams {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New idle timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_minutes: Option<u32>,
    /// New machine type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
}

impl EditCodespaceParams {
    /// Edit that only renames the codespace.
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Returns true when nothing would change.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.idle_timeout_minutes.is_none() && self.machine.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CodespacesErrorKind;
    use pretty_assertions::assert_eq;

    fn project(codespace: &Codespace, fields: &[&str]) -> Value {
        Value::Object(codespace.export_data(fields).unwrap())
    }

    #[test]
    fn test_export_name() {
        let codespace = Codespace {
            name: "test".to_string(),
            ..Default::default()
        };
        assert_eq!(project(&codespace, &["name"]), json!({"name": "test"}));
    }

    #[test]
    fn test_export_owner() {
        let codespace = Codespace {
            owner: User {
                login: "test".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(project(&codespace, &["owner"]), json!({"owner": "test"}));
    }

    #[test]
    fn test_export_machine_name() {
        let codespace = Codespace {
            machine: CodespaceMachine {
                name: "test".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            project(&codespace, &["machineName"]),
            json!({"machineName": "test"})
        );
    }

    #[test]
    fn test_export_git_status_and_timestamps() {
        let codespace = Codespace {
            git_status: CodespaceGitStatus {
                git_ref: "main".to_string(),
                has_unpushed_changes: true,
                ..Default::default()
            },
            created_at: Some("2021-09-22T18:23:45Z".parse().unwrap()),
            ..Default::default()
        };

        assert_eq!(
            project(&codespace, &["gitStatus", "createdAt", "lastUsedAt"]),
            json!({
                "gitStatus": {
                    "ref": "main",
                    "hasUnpushedChanges": true,
                    "hasUncommitedChanges": false,
                },
                "createdAt": "2021-09-22T18:23:45Z",
                "lastUsedAt": null,
            })
        );
    }

    #[test]
    fn test_export_unknown_field() {
        let err = Codespace::default()
            .export_data(&["name", "bogus"])
            .unwrap_err();
        assert_eq!(*err.kind(), CodespacesErrorKind::InvalidParameter);
        assert!(err.message().contains("bogus"));
    }

    #[test]
    fn test_every_listed_field_exports() {
        let data = Codespace::default()
            .export_data(CODESPACE_EXPORT_FIELDS)
            .unwrap();
        assert_eq!(data.len(), CODESPACE_EXPORT_FIELDS.len());
    }

    #[test]
    fn test_deserialize_sparse_codespace() {
        let codespace: Codespace = serde_json::from_value(json!({
            "name": "monalisa-abc",
            "state": "Available",
            "owner": {"login": "monalisa"},
            "git_status": {"ref": "main", "has_uncommited_changes": true},
            "connection": {"sessionId": "s1", "relaySas": "sig"},
            "unknown_field": 1,
        }))
        .unwrap();

        assert!(codespace.is_available());
        assert_eq!(codespace.owner.login, "monalisa");
        assert!(codespace.git_status.has_uncommited_changes);
        assert_eq!(codespace.connection.session_id, "s1");
        assert_eq!(codespace.connection.relay_sas, "sig");
    }

    #[test]
    fn test_deserialize_blank_timestamps() {
        let codespace: Codespace = serde_json::from_value(json!({
            "name": "test_codespace",
            "created_at": "",
            "display_name": "",
            "last_used_at": "",
            "owner": {"login": "", "type": ""},
            "state": "",
            "vscs_target": "",
        }))
        .unwrap();

        assert_eq!(codespace.name, "test_codespace");
        assert_eq!(codespace.created_at, None);
        assert_eq!(codespace.last_used_at, None);
        assert_eq!(
            project(&codespace, &["createdAt", "lastUsedAt"]),
            json!({ "createdAt": null, "lastUsedAt": null })
        );
    }

    #[test]
    fn test_deserialize_timestamps() {
        let codespace: Codespace = serde_json::from_value(json!({
            "created_at": "2021-09-22T18:23:45Z",
            "last_used_at": null,
        }))
        .unwrap();

        assert_eq!(
            codespace.created_at,
            Some("2021-09-22T18:23:45Z".parse().unwrap())
        );
        assert_eq!(codespace.last_used_at, None);
        assert!(serde_json::from_value::<Codespace>(json!({ "created_at": "yesterday" })).is_err());
    }

    #[test]
    fn test_edit_params_skip_unset() {
        let body = serde_json::to_value(EditCodespaceParams::display_name("changeTo")).unwrap();
        assert_eq!(body, json!({"display_name": "changeTo"}));
        assert!(EditCodespaceParams::default().is_empty());
    }
}
