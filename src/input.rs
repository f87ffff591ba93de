//! Loading a program model from a source file.

use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::frontend::{ExtractError, Extractor};
use crate::model::ProgramModel;

/// Fatal failure to obtain a program model.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot extract a model")]
    Extract(#[from] ExtractError),
}

/// Reads `path` and extracts its program model with `extractor`.
pub fn load_model<X: Extractor>(extractor: &X, path: &Path) -> Result<ProgramModel, InputError> {
    let source = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", source.len(), path.display());

    let model = extractor.extract(&source)?;
    debug!(
        "Extracted {} statements over {} parameters",
        model.statements().len(),
        model.num_parameters()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::frontend::ScopExtractor;

    #[test]
    fn test_missing_file() {
        let err = load_model(&ScopExtractor, Path::new("/nonexistent/input.c")).unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
        assert_eq!(err.to_string(), "cannot read '/nonexistent/input.c'");
    }

    #[test]
    fn test_extract_error_is_wrapped() {
        let path = std::env::temp_dir().join(format!("flops-rs-input-{}.c", std::process::id()));
        std::fs::write(&path, "int x;\n").unwrap();
        let err = load_model(&ScopExtractor, &path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, InputError::Extract(ExtractError::NoScop)));
    }
}
