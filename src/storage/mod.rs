pub mod bulk;
pub mod memory;
pub mod reader;
pub mod traits;

pub use bulk::{BulkWriter, ClusteringCounts};
pub use memory::{MemoryStore, StoreCounts};
pub use reader::ClusteringStoreReader;
pub use traits::{BulkOutcome, ChunkedReader, VariantStore};
