pub mod cache;
pub mod db;
pub mod gemini;
pub mod storage;

pub use cache::MokaCacheAdapter;
pub use db::DbAdapter;
pub use gemini::GeminiAdapter;
pub use storage::LocalStorageAdapter;
