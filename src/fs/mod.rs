pub mod backend;
pub mod local;
pub mod types;

pub use backend::LocalStorage;
pub use local::LocalBackend;
pub use types::*;
