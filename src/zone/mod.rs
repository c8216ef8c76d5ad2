pub mod codec;
pub mod parser;
pub mod record;
pub mod store;

pub use codec::encode;
pub use parser::ZoneParser;
pub use record::{RecordClass, RecordType, ResourceRecord, Zone, absolute_name};
pub use store::ZoneFileStore;

/// Zone constants
pub mod constants {
    /// Default TTL if not specified (1 hour)
    pub const DEFAULT_TTL: u32 = 3600;

    /// Maximum zone file size (10MB)
    pub const MAX_ZONE_FILE_SIZE: usize = 10 * 1024 * 1024;

    /// Suffix of zone files inside the zone directory
    pub const ZONE_FILE_SUFFIX: &str = ".zone";
}
