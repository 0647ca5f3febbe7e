// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config-backed implementations of the credential and identity seams.

use wicket_core::traits::{CredentialProvider, ViewerIdentity};
use wicket_core::types::UserId;

use crate::model::{AuthConfig, ClientConfig};

/// Credential provider reading the bearer token from configuration.
#[derive(Debug, Clone)]
pub struct ConfigCredentials {
    token: Option<String>,
}

impl ConfigCredentials {
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            token: auth.token.clone(),
        }
    }
}

impl CredentialProvider for ConfigCredentials {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Viewer identity resolved from configuration.
#[derive(Debug, Clone)]
pub struct ConfigIdentity {
    user_id: Option<UserId>,
    display_name: String,
}

impl ConfigIdentity {
    pub fn new(client: &ClientConfig) -> Self {
        Self {
            user_id: client.user_id.map(UserId),
            display_name: client.display_name.clone(),
        }
    }
}

impl ViewerIdentity for ConfigIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }
}
