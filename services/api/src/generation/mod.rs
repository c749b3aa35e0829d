pub mod gateway;
pub mod job;
pub mod memo;
pub mod pipeline;

pub use gateway::{RetryPolicy, RetryingGateway};
pub use job::{GenerationJob, JobOrchestrator, JobQueue};
pub use memo::Memoizer;
pub use pipeline::{resolve_attachment, ContentGenerator};
