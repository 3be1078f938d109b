use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::env;
use sha2::{Sha256, Digest};

/// Model file names, in lookup order. The precompiled flat-buffer format wins
/// when both are present.
pub const MODEL_FILE_NAMES: [&str; 2] = ["model.ort", "model.onnx"];

/// Label dictionary file name, stored next to the model.
pub const LABELS_FILE_NAME: &str = "dict.txt";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Expected digests for a named model directory.
#[derive(Debug, Clone, Default)]
pub struct ModelInfo {
    pub name: String,
    /// Lowercase hex SHA-256 of the model file, if it should be checked
    pub model_hash: Option<String>,
    /// Lowercase hex SHA-256 of the label file, if it should be checked
    pub labels_hash: Option<String>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Locates model artifacts on disk.
///
/// Each model lives in its own directory under the models directory:
///
/// ```text
/// <models_dir>/<name>/model.ort   (or model.onnx)
/// <models_dir>/<name>/dict.txt
/// ```
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("image-classifier").join("models");
        }

        // 2. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("image-classifier").join("models");
        }

        // 3. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("image-classifier").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_dir(&self, name: &str) -> PathBuf {
        self.models_dir.join(name)
    }

    /// Returns the model file for `name`, preferring `model.ort` over
    /// `model.onnx`. When neither exists the `.ort` path is returned.
    pub fn get_model_path(&self, name: &str) -> PathBuf {
        let dir = self.get_model_dir(name);
        MODEL_FILE_NAMES
            .iter()
            .map(|file| dir.join(file))
            .find(|path| path.exists())
            .unwrap_or_else(|| dir.join(MODEL_FILE_NAMES[0]))
    }

    pub fn get_labels_path(&self, name: &str) -> PathBuf {
        self.get_model_dir(name).join(LABELS_FILE_NAME)
    }

    pub fn is_model_present(&self, name: &str) -> bool {
        let model_path = self.get_model_path(name);
        let labels_path = self.get_labels_path(name);
        log::debug!("Checking if model {} is present:", name);
        log::debug!("  Model path: {:?} (exists: {})", model_path, model_path.exists());
        log::debug!("  Labels path: {:?} (exists: {})", labels_path, labels_path.exists());
        model_path.exists() && labels_path.exists()
    }

    /// Returns the model and label paths for `name`, failing if either is missing.
    pub fn resolve(&self, name: &str) -> Result<(PathBuf, PathBuf), ModelError> {
        if !self.is_model_present(name) {
            return Err(ModelError::NotFound(format!(
                "{} (looked in {:?})",
                name,
                self.get_model_dir(name)
            )));
        }
        Ok((self.get_model_path(name), self.get_labels_path(name)))
    }

    /// Verifies the files of a model against the digests in `info`.
    ///
    /// Returns `Ok(false)` when the files are missing or a digest differs.
    /// Digests that are `None` are not checked.
    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(&info.name);
        let labels_path = self.get_labels_path(&info.name);

        log::info!("Verifying model files:");
        log::info!("  Model path: {:?}", model_path);
        log::info!("  Labels path: {:?}", labels_path);

        if !model_path.exists() || !labels_path.exists() {
            log::info!("One or both files do not exist");
            return Ok(false);
        }

        let model_ok = match &info.model_hash {
            Some(hash) => verify_file(&model_path, hash)?,
            None => true,
        };
        let labels_ok = match &info.labels_hash {
            Some(hash) => verify_file(&labels_path, hash)?,
            None => true,
        };

        log::info!("Verification results:");
        log::info!("  Model hash verification: {}", model_ok);
        log::info!("  Labels hash verification: {}", labels_ok);

        Ok(model_ok && labels_ok)
    }
}

/// Computes the lowercase hex SHA-256 of a file.
pub fn file_sha256(path: &Path) -> Result<String, ModelError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Returns whether the file's SHA-256 matches `expected_hash` (case-insensitive hex).
pub fn verify_file(path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
    log::debug!("Verifying file: {:?}", path);
    let hash = file_sha256(path)?;
    log::debug!("Calculated hash: {}", hash);
    log::debug!("Expected hash:   {}", expected_hash);
    Ok(hash.eq_ignore_ascii_case(expected_hash))
}

/// Like [`verify_file`], but reports a mismatch as [`ModelError::HashMismatch`].
pub fn ensure_file_hash(
    path: &Path,
    expected_hash: &str,
    file_type: &str,
) -> Result<(), ModelError> {
    let actual = file_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected_hash) {
        log::error!("{} hash mismatch: expected {}, got {}", file_type, expected_hash, actual);
        return Err(ModelError::HashMismatch {
            file_type: file_type.to_string(),
            expected: expected_hash.to_string(),
            actual,
        });
    }
    Ok(())
}
