pub mod http;

use crate::error::InstallerResult;
use std::path::Path;

pub use http::{HttpTransport, classify_status};

/// Blocking transfer operations the pipeline needs.
///
/// Every implementation must refuse non-HTTPS URLs before sending anything.
pub trait Transport {
    /// Lightweight reachability check (HEAD, redirects followed)
    fn probe(&self, url: &str) -> InstallerResult<()>;

    /// Fetch a resource body as text
    fn fetch_text(&self, url: &str) -> InstallerResult<String>;

    /// Stream a resource into `dest`, returning the number of bytes written
    fn download(&self, url: &str, dest: &Path) -> InstallerResult<u64>;
}
