/// Names found directly inside one directory, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    /// Relative paths of regular files.
    pub files: Vec<String>,
    /// Relative paths of subdirectories.
    pub dirs: Vec<String>,
}

impl DirListing {
    /// Sort both lists so enumeration order is stable.
    pub fn sorted(mut self) -> Self {
        self.files.sort();
        self.dirs.sort();
        self
    }
}

/// Join a relative directory and a child name with `/`.
pub fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Parent of a relative path, or `None` at the root.
pub fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent).filter(|p| !p.is_empty())
}
