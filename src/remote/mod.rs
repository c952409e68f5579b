pub mod backend;
pub mod github;
pub mod types;

pub use backend::{RemoteEntry, RemoteFile, RemoteRepository, RemoteSet};
pub use github::GitHubRemote;
pub use types::{Branch, Repository, User};
