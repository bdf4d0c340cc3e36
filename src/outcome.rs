//! Tagged results for stages that carry a fallback chain
//!
//! PDF extraction (direct → OCR → placeholder) and reranking (cross-encoder →
//! passthrough) never fail the caller. Instead they report which branch
//! produced the value so callers and tests can tell them apart.

use serde::{Deserialize, Serialize};

/// Which branch of a fallback chain produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Primary strategy succeeded
    Success,
    /// Primary strategy failed, a fallback produced a usable value
    Degraded,
    /// Every strategy failed, the value is a placeholder
    Failed,
}

/// Result of a stage that recovers from its own failures
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Success(T),
    Degraded { value: T, reason: String },
    Failed { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn failed(value: T, reason: impl Into<String>) -> Self {
        Self::Failed {
            value,
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StageStatus {
        match self {
            Self::Success(_) => StageStatus::Success,
            Self::Degraded { .. } => StageStatus::Degraded,
            Self::Failed { .. } => StageStatus::Failed,
        }
    }

    /// Reason the primary strategy was abandoned, if it was
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Degraded { reason, .. } | Self::Failed { reason, .. } => Some(reason),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Success(value) | Self::Degraded { value, .. } | Self::Failed { value, .. } => {
                value
            }
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Success(value) | Self::Degraded { value, .. } | Self::Failed { value, .. } => {
                value
            }
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> StageOutcome<U> {
        match self {
            Self::Success(value) => StageOutcome::Success(f(value)),
            Self::Degraded { value, reason } => StageOutcome::Degraded {
                value: f(value),
                reason,
            },
            Self::Failed { value, reason } => StageOutcome::Failed {
                value: f(value),
                reason,
            },
        }
    }
}
