//! Permission Request Descriptors
//!
//! A [`PermissionGroup`] bundles the permission identifiers requested together
//! with their shared abort policy and an optional pre-request explanation.
//! Groups are immutable once built; construction goes through
//! [`PermissionGroupBuilder`].

use serde::{Deserialize, Serialize};

use crate::error::{PermFlowError, Result};

/// Title used when an explanation message is set without an explicit title.
pub const DEFAULT_EXPLANATION_TITLE: &str = "Permission request";

/// Accept-button label used when none is configured.
pub const DEFAULT_ACCEPT_LABEL: &str = "OK";

/// Pre-request rationale shown to the user before the platform dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    /// Dialog title
    pub title: String,
    /// Rationale text
    pub message: String,
    /// Label of the button that proceeds to the platform request
    pub accept_label: String,
    /// Label of the decline button. When absent the explanation is
    /// informational only: a single dismiss action that proceeds to the
    /// actual request.
    pub decline_label: Option<String>,
}

impl Explanation {
    /// True when the prompt has no decline option.
    pub fn is_informational(&self) -> bool {
        self.decline_label.is_none()
    }
}

/// A set of permission identifiers requested together as one platform batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGroup {
    permissions: Vec<String>,
    abort_on_deny: bool,
    explanation: Option<Explanation>,
}

impl PermissionGroup {
    /// Start building a group from permission identifiers.
    pub fn builder<I, S>(permissions: I) -> PermissionGroupBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionGroupBuilder::new(permissions)
    }

    /// Permission identifiers, in input order, de-duplicated.
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Whether denial of any permission in this group cancels all
    /// subsequent group requests.
    pub fn abort_on_deny(&self) -> bool {
        self.abort_on_deny
    }

    /// Explanation to surface before the platform request, if any.
    pub fn explanation(&self) -> Option<&Explanation> {
        self.explanation.as_ref()
    }
}

/// Builder for [`PermissionGroup`]. No side effects until `build()`.
#[derive(Debug, Clone, Default)]
pub struct PermissionGroupBuilder {
    permissions: Vec<String>,
    abort_on_deny: bool,
    explanation_title: Option<String>,
    explanation_message: Option<String>,
    accept_label: Option<String>,
    decline_label: Option<String>,
}

impl PermissionGroupBuilder {
    /// Create a builder seeded with permission identifiers.
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Abort all subsequent groups when any permission here is denied.
    pub fn abort_on_deny(mut self, abort: bool) -> Self {
        self.abort_on_deny = abort;
        self
    }

    /// Title of the explanation dialog.
    pub fn explanation_title(mut self, title: impl Into<String>) -> Self {
        self.explanation_title = Some(title.into());
        self
    }

    /// Rationale text of the explanation dialog. An explanation is only
    /// attached to the group when a message is set.
    pub fn explanation_message(mut self, message: impl Into<String>) -> Self {
        self.explanation_message = Some(message.into());
        self
    }

    /// Label of the accept button.
    pub fn accept_label(mut self, label: impl Into<String>) -> Self {
        self.accept_label = Some(label.into());
        self
    }

    /// Label of the decline button. Without it the prompt is informational.
    pub fn decline_label(mut self, label: impl Into<String>) -> Self {
        self.decline_label = Some(label.into());
        self
    }

    /// Build the immutable group.
    ///
    /// Fails with [`PermFlowError::InvalidArgument`] when no non-empty
    /// permission identifier was supplied. Duplicate identifiers within the
    /// group are dropped, keeping the first occurrence.
    pub fn build(self) -> Result<PermissionGroup> {
        let mut permissions: Vec<String> = Vec::with_capacity(self.permissions.len());
        for permission in self.permissions {
            if permission.is_empty() {
                return Err(PermFlowError::InvalidArgument(
                    "permission identifier must not be empty".into(),
                ));
            }
            if !permissions.contains(&permission) {
                permissions.push(permission);
            }
        }
        if permissions.is_empty() {
            return Err(PermFlowError::InvalidArgument(
                "permission group needs at least one permission".into(),
            ));
        }

        let explanation = self.explanation_message.map(|message| Explanation {
            title: self
                .explanation_title
                .unwrap_or_else(|| DEFAULT_EXPLANATION_TITLE.to_string()),
            message,
            accept_label: self
                .accept_label
                .unwrap_or_else(|| DEFAULT_ACCEPT_LABEL.to_string()),
            decline_label: self.decline_label,
        });

        Ok(PermissionGroup {
            permissions,
            abort_on_deny: self.abort_on_deny,
            explanation,
        })
    }
}
