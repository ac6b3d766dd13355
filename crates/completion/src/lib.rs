mod gateway;
pub use gateway::{CompletionErrorKind, CompletionGateway, CompletionRequest, CompletionResponse, ModelDescriptor};

mod failover;
pub use failover::{complete_with_failover, FailoverPolicy};
