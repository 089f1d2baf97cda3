//! Transport errors and Sentry helpers.
//!
//! [`ApiError`] is what every remote call fails with. The stores above it
//! turn it into their own discriminated errors, but always keep the
//! user-facing message the server sent along.

use thiserror::Error;

use shopfront_core::Identity;

/// Errors returned by a remote API call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent or the connection failed.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected the credential (HTTP 401).
    #[error("unauthorized{}", format_message(.message))]
    Unauthorized {
        /// The `error` field of the response payload, if any.
        message: Option<String>,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status}{}", format_message(.message))]
    Status {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the response payload, if any.
        message: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),
}

fn format_message(message: &Option<String>) -> String {
    message
        .as_deref()
        .map_or_else(String::new, |m| format!(": {m}"))
}

impl ApiError {
    /// The message the server put in its error payload.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message } | Self::Status { message, .. } => message.as_deref(),
            Self::Timeout | Self::Network(_) | Self::Decode(_) => None,
        }
    }

    /// The server's message, or `default` when there is none.
    #[must_use]
    pub fn message_or(&self, default: &str) -> String {
        self.server_message().unwrap_or(default).to_string()
    }

    /// Whether this is a rejected credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Set the Sentry user context from the logged-in identity.
///
/// Call this after a successful login to associate errors with users.
pub fn set_sentry_user(identity: &Identity) {
    let email = (!identity.email.is_empty()).then(|| identity.email.clone());
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(identity.id.to_string()),
            email,
            ..Default::default()
        }));
        scope.set_tag("role", identity.role.as_str());
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
        scope.remove_tag("role");
    });
}

/// Add a breadcrumb for a state transition.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
