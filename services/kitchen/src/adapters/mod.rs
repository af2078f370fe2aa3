pub mod clock;
pub mod kv_file;
pub mod kv_memory;

pub use clock::{ManualClock, SystemClock};
pub use kv_file::FileStore;
pub use kv_memory::MemoryStore;
