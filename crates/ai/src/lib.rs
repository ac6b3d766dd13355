mod env;
pub use env::{AppEnv, APP_ENV};

mod gateway;
pub use gateway::OpenAiCompletionGateway;
