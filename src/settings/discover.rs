//! Settings file discovery.
//!
//! Each [`SearchPath`] resolves to one directory. Directories are checked in
//! order for the settings file; every file found is returned so later ones
//! override earlier ones when merged. Missing files and unresolvable
//! directories are skipped. Other I/O errors are propagated.

use std::path::PathBuf;

use crate::error::MatrixError;

use super::APP_NAME;

/// Where to look for settings files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory of the home directory, e.g. `Home(".buildmatrix")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory, e.g. the one holding the model file.
    Path(PathBuf),
}

impl SearchPath {
    /// The concrete directory, or `None` when it cannot be determined.
    pub fn resolve(&self) -> Option<PathBuf> {
        match self {
            SearchPath::Platform => {
                let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
                Some(dirs.config_dir().to_path_buf())
            }
            SearchPath::Home(subdir) => {
                let user = directories::UserDirs::new()?;
                Some(user.home_dir().join(subdir))
            }
            SearchPath::Cwd => std::env::current_dir().ok(),
            SearchPath::Path(p) => Some(p.clone()),
        }
    }
}

/// Read `file_name` from every search path that has one, in search order.
pub fn load_settings_files(
    search_paths: &[SearchPath],
    file_name: &str,
) -> Result<Vec<(PathBuf, String)>, MatrixError> {
    let mut found = Vec::new();
    for dir in search_paths.iter().filter_map(SearchPath::resolve) {
        let path = dir.join(file_name);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "settings file found");
                found.push((path, content));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(MatrixError::IoError { path, source: e }),
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_resolves_to_itself() {
        let sp = SearchPath::Path(PathBuf::from("/etc/buildmatrix"));
        assert_eq!(sp.resolve(), Some(PathBuf::from("/etc/buildmatrix")));
    }

    #[test]
    fn platform_path_ends_with_app_name() {
        if let Some(dir) = SearchPath::Platform.resolve() {
            assert!(dir.to_string_lossy().contains("buildmatrix"));
        }
    }

    #[test]
    fn home_path_joins_subdir() {
        if let Some(dir) = SearchPath::Home(".buildmatrix").resolve() {
            assert!(dir.ends_with(".buildmatrix"));
        }
    }

    #[test]
    fn files_are_returned_in_search_order() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("s.toml"), "strict = true\n").unwrap();
        fs::write(b.path().join("s.toml"), "strict = false\n").unwrap();

        let files = load_settings_files(
            &[
                SearchPath::Path(a.path().to_path_buf()),
                SearchPath::Path(b.path().to_path_buf()),
            ],
            "s.toml",
        )
        .unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, a.path().join("s.toml"));
        assert_eq!(files[1].1, "strict = false\n");
    }

    #[test]
    fn missing_files_are_skipped() {
        let a = TempDir::new().unwrap();
        let files =
            load_settings_files(&[SearchPath::Path(a.path().to_path_buf())], "s.toml").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn unreadable_entry_is_an_error() {
        // A directory where the file should be cannot be read as a string.
        let a = TempDir::new().unwrap();
        fs::create_dir(a.path().join("s.toml")).unwrap();
        let err = load_settings_files(&[SearchPath::Path(a.path().to_path_buf())], "s.toml")
            .unwrap_err();
        assert_eq!(err.kind(), "IoError");
    }
}
