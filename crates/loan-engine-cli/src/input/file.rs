use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a JSON or YAML file (by extension) and deserialise into a typed struct.
pub fn read_structured<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let is_yaml = matches!(
        canonical.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value: T = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

/// Resolve and validate the path.
fn resolve_path(path: &str) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    #[test]
    fn test_reads_yaml_and_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("a.yaml");
        writeln!(fs::File::create(&yaml).unwrap(), "term: 12").unwrap();
        let json = dir.path().join("a.json");
        writeln!(fs::File::create(&json).unwrap(), r#"{{"term": 24}}"#).unwrap();

        let y: BTreeMap<String, u32> = read_structured(yaml.to_str().unwrap()).unwrap();
        let j: BTreeMap<String, u32> = read_structured(json.to_str().unwrap()).unwrap();
        assert_eq!(y["term"], 12);
        assert_eq!(j["term"], 24);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_structured::<BTreeMap<String, u32>>("/nonexistent/loan.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
