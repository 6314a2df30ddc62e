//! Pulls the OS fields the Image projection needs out of a syft-shaped SBOM
//! document, without depending on the full syft JSON schema — only the
//! `distro.name`/`distro.version` object the worker actually reads.

pub fn extract_os_fields(sbom_json: &str) -> (Option<String>, Option<String>) {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(sbom_json) else {
        return (None, None);
    };
    let distro = parsed.get("distro");
    let os_name = distro.and_then(|d| d.get("name")).and_then(|v| v.as_str()).map(str::to_string);
    let os_version = distro.and_then(|d| d.get("version")).and_then(|v| v.as_str()).map(str::to_string);
    (os_name, os_version)
}

#[cfg(test)]
#[path = "sbom_meta_tests.rs"]
mod tests;
