use serde::{Deserialize, Serialize};

// Structured error body for rejections and upstream transport failures.
// Each outcome keeps a distinct, stable "type" so clients can branch on it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorBody {
    pub fn cooldown(retry_after: u64) -> Self {
        Self {
            error: ErrorDetail {
                kind: "cooldown".to_string(),
                message: format!("Please wait {retry_after} seconds."),
                retry_after: Some(retry_after),
            },
        }
    }

    pub fn busy() -> Self {
        Self {
            error: ErrorDetail {
                kind: "busy".to_string(),
                message: "Concurrent use is not allowed. Please wait a moment.".to_string(),
                retry_after: None,
            },
        }
    }

    pub fn upstream(message: &str) -> Self {
        Self {
            error: ErrorDetail {
                kind: "upstream".to_string(),
                message: message.to_string(),
                retry_after: None,
            },
        }
    }
}
