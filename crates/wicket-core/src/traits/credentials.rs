// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential provider trait for connection-time authentication.

/// Supplies the bearer token attached once at connect time.
///
/// `None` means "do not attempt to connect" -- the caller stays
/// disconnected rather than sending an unauthenticated CONNECT.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}
