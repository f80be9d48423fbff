//! Docker image tarball `manifest.json`/`repositories` structural
//! checks (§4.8).

use serde_json::Value;

#[derive(Clone, Debug, Default)]
pub struct DockerManifestEntry {
    pub config: Option<String>,
    pub layers: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DockerManifestParseResult {
    pub is_valid_shape: bool,
    pub entries: Vec<DockerManifestEntry>,
}

/// Validate `manifest.json`'s JSON text: a non-empty array of objects
/// each with `Config: string` and `Layers: string[]` (§4.8).
pub fn parse_manifest(text: &str) -> DockerManifestParseResult {
    let mut result = DockerManifestParseResult::default();
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return result,
    };
    let array = match value.as_array() {
        Some(arr) if !arr.is_empty() => arr,
        _ => return result,
    };

    let mut entries = Vec::new();
    for item in array {
        let Some(obj) = item.as_object() else { return result };
        let config = obj.get("Config").and_then(Value::as_str).map(str::to_string);
        let layers = match obj.get("Layers").and_then(Value::as_array) {
            Some(arr) => {
                let mut out = Vec::new();
                for layer in arr {
                    match layer.as_str() {
                        Some(s) => out.push(s.to_string()),
                        None => return result,
                    }
                }
                out
            }
            None => return result,
        };
        if config.is_none() {
            return result;
        }
        entries.push(DockerManifestEntry { config, layers });
    }

    result.is_valid_shape = true;
    result.entries = entries;
    result
}

/// Validate `repositories`'s JSON text: an object mapping repo name
/// to a non-empty map of tag -> layer id string (§4.8).
pub fn parse_repositories(text: &str) -> bool {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return false,
    };
    let Some(repos) = value.as_object() else { return false };
    if repos.is_empty() {
        return false;
    }
    for tags in repos.values() {
        let Some(tag_map) = tags.as_object() else { return false };
        if tag_map.is_empty() {
            return false;
        }
        for tag_value in tag_map.values() {
            if tag_value.as_str().is_none() {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_manifest_shape() {
        let text = r#"[{"Config":"config.json","Layers":["layer.tar"]}]"#;
        let result = parse_manifest(text);
        assert!(result.is_valid_shape);
        assert_eq!(result.entries[0].layers, vec!["layer.tar".to_string()]);
    }

    #[test]
    fn invalid_manifest_missing_config() {
        let text = r#"[{"Layers":["layer.tar"]}]"#;
        assert!(!parse_manifest(text).is_valid_shape);
    }

    #[test]
    fn valid_repositories_shape() {
        let text = r#"{"demo":{"latest":"sha256:abc"}}"#;
        assert!(parse_repositories(text));
    }

    #[test]
    fn empty_repositories_invalid() {
        assert!(!parse_repositories("{}"));
    }
}
