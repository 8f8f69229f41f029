//! End-to-end resolution: raw selection in, store payloads and bucket
//! sequences out.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::buckets::BucketSequence;
use crate::calendar::Calendar;
use crate::compare::{CompareMode, ComparisonMetadata};
use crate::error::RangeError;
use crate::granularity::Granularity;
use crate::query::{build, AnalyticsQuery, AuxParams, QueryFilter, SiteQueries};
use crate::zone::ZoneRules;

/// What the user picked, before any alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub granularity: Granularity,
    pub compare: CompareMode,
    pub filters: Vec<QueryFilter>,
    pub aux: AuxParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    pub queries: SiteQueries,
    pub main_buckets: BucketSequence,
    pub compare_buckets: Option<BucketSequence>,
    pub comparison: Option<ComparisonMetadata>,
}

impl<Z: ZoneRules> Calendar<Z> {
    pub fn analytics_query(&self, selection: Selection) -> Result<AnalyticsQuery, RangeError> {
        for filter in &selection.filters {
            filter.validate()?;
        }

        let main = self.normalize(selection.start, selection.end, selection.granularity)?;
        let compare = self.resolve_comparison(&main, selection.granularity, &selection.compare)?;

        Ok(AnalyticsQuery {
            main,
            compare,
            granularity: selection.granularity,
            filters: selection.filters,
            timezone: self.timezone().to_string(),
            aux: selection.aux,
        })
    }

    pub fn plan(&self, site_id: &str, selection: Selection) -> Result<QueryPlan, RangeError> {
        let mode = selection.compare.clone();
        let query = self.analytics_query(selection)?;

        let main_buckets = self.bucket_sequence(&query.main, query.granularity);
        let compare_buckets = query
            .compare
            .as_ref()
            .map(|period| self.bucket_sequence(period, query.granularity));
        let comparison = query.compare.as_ref().map(|compare| {
            self.comparison_metadata(&mode, &query.main, compare, query.granularity)
        });

        Ok(QueryPlan {
            queries: build(site_id, &query),
            main_buckets,
            compare_buckets,
            comparison,
        })
    }
}
