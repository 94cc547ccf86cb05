use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

/// Résumé formats accepted by the profile form.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}

fn strip_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static pattern compiles"))
}

/// Reduces a client-supplied name to a flat ASCII filename that cannot escape the upload root.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped = strip_pattern().replace_all(&joined, "");
    stripped.trim_matches(|c: char| c == '.' || c == '_').to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Extensión de archivo no permitida")]
    DisallowedExtension,
    #[error("nombre de archivo vacío")]
    EmptyFilename,
    #[error("no se pudo guardar el archivo: {0}")]
    Io(#[from] std::io::Error),
}

/// Local directory holding candidate résumés.
#[derive(Debug, Clone)]
pub struct CvStore {
    directory: PathBuf,
}

impl CvStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub async fn ensure_directory(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.directory).await
    }

    /// Name under which a candidate's upload is stored.
    pub fn stored_name(candidate_id: i64, original: &str) -> String {
        secure_filename(&format!("postulante_{candidate_id}_cv_{original}"))
    }

    /// Saves the upload and returns the path recorded on the candidate profile.
    pub async fn save(
        &self,
        candidate_id: i64,
        original: &str,
        contents: &[u8],
    ) -> Result<String, UploadError> {
        if !allowed_file(original) {
            return Err(UploadError::DisallowedExtension);
        }
        let name = Self::stored_name(candidate_id, original);
        if name.is_empty() {
            return Err(UploadError::EmptyFilename);
        }

        self.ensure_directory().await?;
        let path = self.directory.join(&name);
        tokio::fs::write(&path, contents).await?;
        info!(candidate_id, file = %name, bytes = contents.len(), "résumé stored");

        Ok(path.to_string_lossy().into_owned())
    }
}
