use serde::{Deserialize, Serialize};

use crate::models::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    Error,
}

/// Per-file outcome of a batch ingestion. One entry per input, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub file_name: String,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<Asset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl BatchResult {
    pub fn success(file_name: impl Into<String>, asset: Asset) -> Self {
        Self {
            file_name: file_name.into(),
            status: BatchStatus::Success,
            asset: Some(asset),
            error_message: None,
            error_code: None,
        }
    }

    pub fn failure(
        file_name: impl Into<String>,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            status: BatchStatus::Error,
            asset: None,
            error_message: Some(error_message.into()),
            error_code: Some(error_code.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_camel_case_without_asset() {
        let result = BatchResult::failure("big.png", "too-large", "File too large");
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["fileName"], "big.png");
        assert_eq!(value["status"], "error");
        assert_eq!(value["errorMessage"], "File too large");
        assert_eq!(value["errorCode"], "too-large");
        assert!(value.get("asset").is_none());
        assert!(!result.is_success());
    }
}
