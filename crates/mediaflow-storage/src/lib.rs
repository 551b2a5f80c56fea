//! Mediaflow Storage Library
//!
//! Remote storage abstraction (`RemoteUploader`, `AssetCatalog`) and the HTTP
//! implementation used in production.

pub mod http;
pub mod traits;

// Re-export commonly used types
pub use http::HttpUploader;
pub use traits::{AssetCatalog, RemoteUploader, UploadFile};
