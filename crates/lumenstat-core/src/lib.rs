//! Time-range and comparison-range resolution for analytics queries.
//!
//! Everything here is a pure function of its inputs plus the timezone rules
//! handed to [`calendar::Calendar`]. Nothing performs I/O or holds shared
//! state, so a calendar can be used from any number of request tasks.

pub mod buckets;
pub mod calendar;
pub mod compare;
pub mod config;
pub mod error;
pub mod granularity;
pub mod period;
pub mod plan;
pub mod query;
pub mod zone;

pub use buckets::{align, AlignedBucket, BucketSequence, Buckets};
pub use calendar::Calendar;
pub use compare::{CompareMode, ComparisonMetadata};
pub use error::RangeError;
pub use granularity::{auto_granularity, Granularity, SpanBounds};
pub use period::Period;
pub use plan::{QueryPlan, Selection};
pub use query::{AnalyticsQuery, AuxParams, FilterOperator, QueryFilter, SiteQueries, SiteQuery};
pub use zone::{parse_timezone, FixedRuleZone, ZoneRules};
