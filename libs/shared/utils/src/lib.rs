pub mod dates;
pub mod extractor;
pub mod jwt;
pub mod ttl_cache;
