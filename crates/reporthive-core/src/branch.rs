//! Branch name encoding for filesystem- and URL-safe path segments.
//!
//! Git branch names may contain slashes (`feature/login`). Those cannot be
//! used as a single URL segment or directory name, so every `/` is replaced
//! with a literal `--` on the way out and restored symmetrically on the way
//! in.

/// Encode a branch name for use as a URL segment / directory name.
pub fn encode_branch(branch: &str) -> String {
    branch.replace('/', "--")
}

/// Decode an encoded branch name back to its human-readable form.
pub fn decode_branch(branch: &str) -> String {
    branch.replace("--", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_slashes() {
        assert_eq!(encode_branch("feature/login"), "feature--login");
        assert_eq!(encode_branch("a/b/c"), "a--b--c");
    }

    #[test]
    fn test_decode_double_hyphen() {
        assert_eq!(decode_branch("feature--login"), "feature/login");
        assert_eq!(decode_branch("main"), "main");
    }

    #[test]
    fn test_round_trip() {
        for name in ["main", "develop", "release/2.4", "bugfix/ui/panel"] {
            assert_eq!(decode_branch(&encode_branch(name)), name);
        }
    }
}
