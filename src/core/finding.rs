use crate::core::CheckStatus;
use serde::{Deserialize, Serialize};

/// One evaluated rule outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: String,
    pub check: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Finding {
    pub fn pass(
        category: impl Into<String>,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(CheckStatus::Pass, category, check, message)
    }

    pub fn fail(
        category: impl Into<String>,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(CheckStatus::Fail, category, check, message)
    }

    pub fn warning(
        category: impl Into<String>,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(CheckStatus::Warning, category, check, message)
    }

    fn new(
        status: CheckStatus,
        category: impl Into<String>,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            check: check.into(),
            status,
            message: message.into(),
            value: None,
            remediation: None,
        }
    }

    pub fn with_value(mut self, value: Option<impl Into<String>>) -> Self {
        self.value = value.map(Into::into);
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}
