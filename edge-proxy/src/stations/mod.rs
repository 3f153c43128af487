//! UK railway station catalog.
//!
//! The dataset is fetched on demand and cached in memory for a TTL, then
//! searched by CRS code (radius search) or free text.

mod catalog;
mod client;
mod search;

pub use catalog::{Clock, Snapshot, StationCatalog, StationCatalogConfig, SystemClock};
pub use client::{StationDto, StationSource, parse_catalog};
pub use search::{
    DEFAULT_LIMIT, MAX_LIMIT, NEARBY_RADIUS_KM, NearbyStation, SearchResult, StationQuery,
    parse_limit, search,
};
