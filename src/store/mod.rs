pub mod memory;
pub mod records;

pub use memory::MemoryCache;
pub use records::{InMemoryManualPrices, InMemoryParticipants};
