use serde::{Deserialize, Serialize};

/// Per-student outcome of a batch. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub student_name: String,
    pub contact_address: String,
    pub success: bool,
    pub failure_reason: Option<String>,
}

impl DeliveryResult {
    pub fn delivered(student_name: &str, contact_address: &str) -> Self {
        Self {
            student_name: student_name.to_string(),
            contact_address: contact_address.to_string(),
            success: true,
            failure_reason: None,
        }
    }

    pub fn failed(student_name: &str, contact_address: &str, reason: impl Into<String>) -> Self {
        Self {
            student_name: student_name.to_string(),
            contact_address: contact_address.to_string(),
            success: false,
            failure_reason: Some(reason.into()),
        }
    }
}
