//! Persisted model artifacts.
//!
//! An artifact is a JSON document holding a [`TfidfClassifier`] together with a
//! format version and the SHA-256 of the serialized model, so a truncated or edited
//! file is rejected at load time instead of serving a damaged model.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::ClassifierError;
use super::model::TfidfClassifier;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ArtifactFile {
    format_version: u32,
    checksum: String,
    model: serde_json::Value,
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn model_checksum(model: &serde_json::Value) -> Result<String, ClassifierError> {
    let bytes = serde_json::to_vec(model)
        .map_err(|e| ClassifierError::Internal(format!("failed to serialize model: {}", e)))?;
    Ok(sha256_hex(&bytes))
}

/// Reads, verifies and deserializes an artifact.
///
/// # Errors
/// `ClassifierError::ModelLoad` if the file cannot be read, is not a valid artifact,
/// fails the checksum, or describes an inconsistent model.
pub fn load(path: &Path) -> Result<TfidfClassifier, ClassifierError> {
    let bytes = fs::read(path).map_err(|e| {
        ClassifierError::ModelLoad(format!("cannot read artifact {}: {}", path.display(), e))
    })?;
    let file: ArtifactFile = serde_json::from_slice(&bytes)?;

    if file.format_version != FORMAT_VERSION {
        return Err(ClassifierError::ModelLoad(format!(
            "unsupported artifact format version {} (expected {})",
            file.format_version, FORMAT_VERSION
        )));
    }

    let actual = model_checksum(&file.model)?;
    if actual != file.checksum {
        return Err(ClassifierError::ModelLoad(format!(
            "checksum mismatch for {}: expected {}, got {}",
            path.display(),
            file.checksum,
            actual
        )));
    }

    let model: TfidfClassifier = serde_json::from_value(file.model)?;
    model
        .validate()
        .map_err(|e| ClassifierError::ModelLoad(format!("incompatible model: {}", e)))?;
    Ok(model)
}

/// Writes an artifact next to `path` and renames it into place.
pub fn save(model: &TfidfClassifier, path: &Path) -> Result<(), ClassifierError> {
    let value = serde_json::to_value(model)
        .map_err(|e| ClassifierError::Internal(format!("failed to serialize model: {}", e)))?;
    let file = ArtifactFile {
        format_version: FORMAT_VERSION,
        checksum: model_checksum(&value)?,
        model: value,
    };
    let bytes = serde_json::to_vec_pretty(&file)
        .map_err(|e| ClassifierError::Internal(format!("failed to serialize artifact: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = temp_path(path);
    fs::write(&tmp, &bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::corpus::bundled_builder;
    use crate::classifier::TextClassifier;

    fn trained() -> TfidfClassifier {
        bundled_builder().unwrap().build().unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");
        let model = trained();

        save(&model, &path).unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());

        let restored = load(&path).unwrap();
        assert_eq!(restored.labels(), model.labels());
        assert_eq!(restored.feature_count(), model.feature_count());
        assert_eq!(restored.description("positivo"), model.description("positivo"));
        assert!(restored.description("positivo").is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ClassifierError::ModelLoad(_))));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "corrupted data").unwrap();
        assert!(matches!(load(&path), Err(ClassifierError::ModelLoad(_))));
    }

    #[test]
    fn test_load_rejects_tampered_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save(&trained(), &path).unwrap();

        let mut file: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        file["model"]["labels"][0] = serde_json::json!("otro");
        fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    /// Applies `edit` to the stored model and re-signs it, so only structural checks can catch it.
    fn resign_with(path: &Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let mut file: ArtifactFile = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        edit(&mut file.model);
        file.checksum = model_checksum(&file.model).unwrap();
        fs::write(path, serde_json::to_vec(&file).unwrap()).unwrap();
    }

    fn assert_incompatible(path: &Path) {
        match load(path) {
            Err(ClassifierError::ModelLoad(message)) => {
                assert!(message.contains("incompatible model"), "{}", message)
            }
            other => panic!("expected ModelLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_resigned_incompatible_models() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = trained();
        let n_features = model.feature_count() as u64;

        // Weight matrix one column short of the vocabulary
        save(&model, &path).unwrap();
        resign_with(&path, |m| {
            let weights = &mut m["regression"]["weights"];
            weights["dim"] = serde_json::json!([2, n_features - 1]);
            let data = weights["data"].as_array_mut().unwrap();
            data.truncate(2 * (n_features as usize - 1));
        });
        assert_incompatible(&path);

        // One intercept for two labels
        save(&model, &path).unwrap();
        resign_with(&path, |m| {
            let intercepts = &mut m["regression"]["intercepts"];
            intercepts["dim"] = serde_json::json!([1]);
            intercepts["data"].as_array_mut().unwrap().truncate(1);
        });
        assert_incompatible(&path);

        // N-gram ranges that cannot produce any terms
        for range in [serde_json::json!([0, 2]), serde_json::json!([2, 1])] {
            save(&model, &path).unwrap();
            resign_with(&path, |m| m["vectorizer"]["config"]["ngram_range"] = range);
            assert_incompatible(&path);
        }
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save(&trained(), &path).unwrap();

        let mut file: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        file["format_version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();

        assert!(matches!(load(&path), Err(ClassifierError::ModelLoad(_))));
    }
}
