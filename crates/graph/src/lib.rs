mod episode;
pub use episode::{AuthorRole, Episode};

mod memory_result;
pub use memory_result::{MemoryResult, MemoryResultKind};

mod adapter;
pub use adapter::GraphAdapter;

mod sanitize;
pub use sanitize::sanitize_query;
