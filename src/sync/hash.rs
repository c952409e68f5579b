//! Git blob ids for local content.
//!
//! The remote's update token for a file is the SHA-1 of its git blob object,
//! so hashing local bytes the same way tells us whether an upload would be a
//! no-op.

use sha1::{Digest, Sha1};

/// Compute the git blob id (`sha1("blob <len>\0" + data)`) as lowercase hex.
pub fn git_blob_id(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", data.len()).as_bytes());
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Check whether `data` is exactly the blob identified by `token`.
pub fn matches_token(data: &[u8], token: &str) -> bool {
    git_blob_id(data).eq_ignore_ascii_case(token)
}
