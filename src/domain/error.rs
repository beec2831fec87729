use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core domain errors
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainError {
    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Numerical instability in '{quantity}': {message}")]
    NumericalInstability { quantity: String, message: String },
}

impl DomainError {
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub fn numerical_instability(quantity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NumericalInstability {
            quantity: quantity.into(),
            message: message.into(),
        }
    }

    /// Name of the parameter or quantity the error refers to, if any
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::InvalidParameter { name, .. } => Some(name),
            Self::NumericalInstability { quantity, .. } => Some(quantity),
            Self::InsufficientData { .. } => None,
        }
    }
}
