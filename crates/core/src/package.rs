//! The `Package` entity (spec §3): projected from an image's SBOM blob.

use crate::digest::Digest;

/// A single `(image, name, version, type)` package row, reprojected
/// atomically every time a new SBOM is stored for the image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Package {
    /// Store-assigned row id; `package_details` keys off this.
    pub id: i64,
    pub image_digest: Digest,
    pub name: String,
    pub version: String,
    pub package_type: String,
    /// Number of times this `(name, version, type)` triple occurs in the SBOM.
    pub number_of_instances: i64,
}

/// One entry parsed out of an SBOM artifact, prior to aggregation into a [`Package`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SbomArtifact {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub package_type: String,
}

impl Package {
    /// Identity triple used for de-dup/aggregation during projection.
    pub fn identity_key(&self) -> (&str, &str, &str) {
        (&self.name, &self.version, &self.package_type)
    }
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
