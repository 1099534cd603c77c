pub mod generate;
pub mod health;
pub mod timelines;

use serde::Serialize;

/// Success envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            cached: None,
        }
    }

    pub fn generated(data: T, cached: bool) -> Self {
        Self {
            success: true,
            data,
            cached: Some(cached),
        }
    }
}
