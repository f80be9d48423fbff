//! OCI image layout / index.json structural checks (§4.8).

use serde_json::Value;

#[derive(Clone, Debug, Default)]
pub struct OciManifestRef {
    pub digest_hex: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct OciIndexParseResult {
    pub layout_version_present: bool,
    pub manifests: Vec<OciManifestRef>,
    pub index_is_valid_shape: bool,
}

/// Validate `oci-layout`'s JSON text: requires `imageLayoutVersion`.
pub fn parse_oci_layout(text: &str) -> bool {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map.contains_key("imageLayoutVersion"),
        _ => false,
    }
}

/// Validate `index.json`'s JSON text: `manifests` must be a
/// non-empty array, each entry carrying a `digest: sha256:<hex>`
/// (§4.8).
pub fn parse_index(text: &str) -> OciIndexParseResult {
    let mut result = OciIndexParseResult::default();
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return result,
    };
    let manifests = match value.get("manifests").and_then(Value::as_array) {
        Some(arr) if !arr.is_empty() => arr,
        _ => return result,
    };
    result.index_is_valid_shape = true;
    for entry in manifests {
        let digest = entry.get("digest").and_then(Value::as_str);
        let digest_hex = digest.and_then(|d| d.strip_prefix("sha256:")).map(str::to_string);
        result.manifests.push(OciManifestRef { digest_hex });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_requires_version_field() {
        assert!(parse_oci_layout(r#"{"imageLayoutVersion":"1.0.0"}"#));
        assert!(!parse_oci_layout(r#"{}"#));
    }

    #[test]
    fn index_extracts_digest_hex() {
        let text = r#"{"manifests":[{"digest":"sha256:abc123"}]}"#;
        let result = parse_index(text);
        assert!(result.index_is_valid_shape);
        assert_eq!(result.manifests[0].digest_hex.as_deref(), Some("abc123"));
    }

    #[test]
    fn empty_manifests_is_invalid_shape() {
        let result = parse_index(r#"{"manifests":[]}"#);
        assert!(!result.index_is_valid_shape);
    }
}
