//! Plate provisioning port: Trait for the Ishihara plate service.

use serde::{Deserialize, Serialize};

use super::ServiceError;

/// One plate as described by the provisioning service.
///
/// The type is kept as a raw integer here; the session manager validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateRecord {
    pub id: u32,
    pub filename: String,
    #[serde(rename = "type")]
    pub colour_type: i64,
}

/// Plates issued for one test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedPlates {
    #[serde(default)]
    pub test_id: String,
    #[serde(default)]
    pub total_images: usize,
    #[serde(default)]
    pub images: Vec<PlateRecord>,
}

/// Trait for the plate provisioning collaborator.
pub trait PlateProvider: Send + Sync {
    /// Request `count` plates for a new test.
    ///
    /// # Errors
    /// Returns error if the service is unreachable or answers garbage.
    fn provision(&self, count: usize) -> Result<ProvisionedPlates, ServiceError>;

    /// Fetch the image bytes of one plate (display only).
    ///
    /// # Errors
    /// Returns error if the image cannot be retrieved.
    fn fetch_image(&self, filename: &str) -> Result<Vec<u8>, ServiceError>;
}
