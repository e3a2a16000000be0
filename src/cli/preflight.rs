//! Pre-flight checks before model-backed operations.
//!
//! Fails fast with a readable hint instead of erroring on the first request.

use crate::config::Settings;
use crate::error::{MuseError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Agent turns need the OpenAI key and a writable menu directory.
    Agent,
    /// Streaming services only need the OpenAI key.
    Stream,
    /// Direct menu edits have no external requirements.
    Menu,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Agent => {
            check_api_key()?;
            check_menu_dir(settings)?;
        }
        Operation::Stream => {
            check_api_key()?;
        }
        Operation::Menu => {
            check_menu_dir(settings)?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(MuseError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(MuseError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

fn check_menu_dir(settings: &Settings) -> Result<()> {
    let path = settings.menu_path();
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| {
                MuseError::Config(format!(
                    "Menu directory {} is not writable: {}",
                    dir.display(),
                    e
                ))
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_menu_check_creates_directory() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.menu.path = format!("{}/nested/menu.json", dir.path().display());

        assert!(check(Operation::Menu, &settings).is_ok());
        assert!(dir.path().join("nested").is_dir());
    }
}
