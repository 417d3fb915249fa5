// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

use thiserror::Error;

/// Failures surfaced by the exposed thing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThingError {
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("property '{0}' is read-only")]
    ReadOnly(String),

    #[error("Writing the property '{property}' failed due to an invalid input value: {reason}")]
    Validation { property: String, reason: String },

    #[error("invalid thing description: {0}")]
    InvalidDescription(String),
}

impl ThingError {
    pub fn validation(property: impl Into<String>, reason: impl Into<String>) -> Self {
        ThingError::Validation {
            property: property.into(),
            reason: reason.into(),
        }
    }
}
