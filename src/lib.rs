#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Matches OpenStreetMap and Overture Maps features that describe the same place.

pub mod candidate_search;
pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod format;
pub mod ingest;
pub mod models;
pub mod projection;
pub mod sampler;
pub mod tag_filter;

pub use config::MatchConfig;
pub use engine::FeatureMatcher;
pub use error::FinderError;
pub use models::{Feature, Match, Source};
pub use tag_filter::TagQuery;
