/// How an import path is compared against the origin path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The whole path must equal the origin. Subpackages of the origin are left alone.
    Exact,
    /// The first occurrence of the origin anywhere in the path is replaced, keeping whatever
    /// surrounds it (`a/b/sub` becomes `x/y/sub`).
    Substring,
}

impl MatchPolicy {
    /// Rewritten path, or `None` when `path` does not match `origin`.
    pub fn rewrite(self, path: &str, origin: &str, new_path: &str) -> Option<String> {
        if origin.is_empty() {
            return None;
        }
        match self {
            MatchPolicy::Exact => (path == origin).then(|| new_path.to_string()),
            MatchPolicy::Substring => path
                .contains(origin)
                .then(|| path.replacen(origin, new_path, 1)),
        }
    }
}
