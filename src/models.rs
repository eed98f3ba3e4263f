// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase on
//! the wire to match the browser client.
//!
//! Incoming requests are deserialized leniently (every field optional) and
//! then validated into [`NewUser`] / [`UserDeletion`], so a missing field
//! yields the same `400` message as an empty one.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 20;
const PASSWORD_MIN_LEN: usize = 6;

// =============================================================================
// Requests
// =============================================================================

/// Request to create a user on Sapphire and register their ENS subdomain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Subdomain label and on-chain username (3-20 chars, `[A-Za-z0-9_]`).
    #[serde(default)]
    pub username: Option<String>,
    /// Secret stored in the confidential contract (min 6 chars).
    #[serde(default)]
    pub password: Option<String>,
    /// Identity of the signed-in account creating the user.
    #[serde(default)]
    pub auth_username: Option<String>,
    /// Accepted for compatibility; the parent domain comes from configuration.
    #[serde(default)]
    pub domain: Option<String>,
}

/// Request to delete a user from Sapphire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub auth_username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// A validated user-creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub auth_username: String,
}

/// A validated deletion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeletion {
    pub auth_username: String,
    pub password: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<NewUser, String> {
        let (Some(username), Some(password), Some(auth_username)) = (
            present(&self.username),
            present(&self.password),
            present(&self.auth_username),
        ) else {
            return Err("Missing required fields: username, password, authUsername".to_string());
        };

        if !is_valid_username(username) {
            return Err(format!(
                "Username must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters (alphanumeric and underscore only)"
            ));
        }

        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(format!(
                "Password must be at least {PASSWORD_MIN_LEN} characters"
            ));
        }

        Ok(NewUser {
            username: username.to_string(),
            password: password.to_string(),
            auth_username: auth_username.to_string(),
        })
    }
}

impl DeleteUserRequest {
    pub fn validate(&self) -> Result<UserDeletion, String> {
        match (present(&self.auth_username), present(&self.password)) {
            (Some(auth_username), Some(password)) => Ok(UserDeletion {
                auth_username: auth_username.to_string(),
                password: password.to_string(),
            }),
            _ => Err("Missing required fields: authUsername, password".to_string()),
        }
    }
}

/// `^[a-zA-Z0-9_]{3,20}$`
pub fn is_valid_username(username: &str) -> bool {
    (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Responses
// =============================================================================

/// Sapphire side of a user creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OasisResult {
    pub tx_hash: String,
    /// Wallet address the contract derived for the user.
    pub user_address: String,
    pub block_number: u64,
    pub contract_address: String,
}

/// Hoodi ENS side of a user creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnsResult {
    pub subdomain: String,
    /// Hash of the `registerSubnodeRecord` transaction, absent when skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Hash of the `setAddr` transaction, absent when skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_addr_tx_hash: Option<String>,
    pub success: bool,
    /// Failure reason when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for a successful user creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub success: bool,
    pub message: String,
    pub oasis: OasisResult,
    pub ens: EnsResult,
    pub auth_username: String,
    pub username: String,
}

/// Response for a successful user deletion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub success: bool,
    pub message: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub auth_username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(username: &str, password: &str, auth: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: Some(username.into()),
            password: Some(password.into()),
            auth_username: Some(auth.into()),
            domain: None,
        }
    }

    #[test]
    fn username_rules() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("user_name_123"));
        assert!(is_valid_username(&"a".repeat(20)));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username(&"a".repeat(21)));
        assert!(!is_valid_username("bad-name"));
        assert!(!is_valid_username("émile"));
    }

    #[test]
    fn create_request_validation() {
        let user = create("alice_1", "secret1", "alice@example.com").validate().unwrap();
        assert_eq!(user.username, "alice_1");
        assert_eq!(user.auth_username, "alice@example.com");

        let err = CreateUserRequest::default().validate().unwrap_err();
        assert!(err.starts_with("Missing required fields"));

        let err = create("", "secret1", "a").validate().unwrap_err();
        assert!(err.starts_with("Missing required fields"));

        let err = create("a!", "secret1", "a").validate().unwrap_err();
        assert!(err.starts_with("Username must be"));

        let err = create("alice", "12345", "a").validate().unwrap_err();
        assert_eq!(err, "Password must be at least 6 characters");
    }

    #[test]
    fn delete_request_validation() {
        let ok = DeleteUserRequest {
            auth_username: Some("alice".into()),
            password: Some("pw".into()),
        };
        assert_eq!(ok.validate().unwrap().auth_username, "alice");

        let missing = DeleteUserRequest {
            auth_username: Some("alice".into()),
            password: None,
        };
        assert_eq!(
            missing.validate().unwrap_err(),
            "Missing required fields: authUsername, password"
        );
    }

    #[test]
    fn requests_use_camel_case() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username":"alice","password":"secret1","authUsername":"a@b.c"}"#,
        )
        .unwrap();
        assert_eq!(req.auth_username.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn ens_result_omits_absent_fields() {
        let ens = EnsResult {
            subdomain: "alice.authdemo.global".into(),
            tx_hash: None,
            block_number: None,
            set_addr_tx_hash: None,
            success: false,
            error: Some("boom".into()),
        };
        let json = serde_json::to_value(&ens).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "subdomain": "alice.authdemo.global",
                "success": false,
                "error": "boom"
            })
        );
    }
}
