// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Viewer identity trait, used for self-message suppression and for
//! labeling optimistic rows.

use crate::types::UserId;

/// Identifies the user currently viewing the session.
pub trait ViewerIdentity: Send + Sync {
    /// The viewer's user id, or `None` when not authenticated.
    fn current_user_id(&self) -> Option<UserId>;

    /// Display name used on optimistically inserted rows.
    fn display_name(&self) -> String;
}
