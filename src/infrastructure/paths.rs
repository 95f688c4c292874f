//! Well-known local paths.

use std::path::{Path, PathBuf};

/// Per-user state directory, relative to the home directory.
pub const STATE_DIR: &str = ".tofuhub";
/// Catalog token file inside [`STATE_DIR`], `{"token": "..."}`.
pub const TOKEN_FILE: &str = "token.json";
/// Repository host token file inside [`STATE_DIR`], `{"access_token": "..."}`.
pub const GITHUB_TOKEN_FILE: &str = "github-token.json";

/// `~/.tofuhub`, if a home directory is known.
#[must_use]
pub fn state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(STATE_DIR))
}

/// Expand a leading `~` to the home directory. Other paths are returned as is.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_are_untouched() {
        assert_eq!(expand_tilde(Path::new("/etc/keys")), PathBuf::from("/etc/keys"));
        assert_eq!(expand_tilde(Path::new("rel/keys")), PathBuf::from("rel/keys"));
    }

    #[test]
    fn tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/.ssh")), home.join(".ssh"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
    }

    #[test]
    fn tilde_inside_a_name_is_literal() {
        assert_eq!(expand_tilde(Path::new("~user/x")), PathBuf::from("~user/x"));
    }
}
