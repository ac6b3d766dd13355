mod error;
pub use error::{AppError, MemoryErrorKind};

mod identity;
pub use identity::GLOBAL_IDENTITY_SCOPE;

mod heartbeat;
pub use heartbeat::is_heartbeat;

mod tokens;
pub use tokens::estimate_tokens;

mod repetition;
pub use repetition::truncate_repetitive;

pub mod relative_time;
pub use relative_time::relative_time_label;
