//! Aggregated report endpoints

use crate::gateway::Gateway;
use gymdesk_core::types::{BucketCount, BucketTotal, DateRange, PaymentMethod, ReportBucket};
use gymdesk_core::{Result, validate};

fn report_query(range: &DateRange, bucket: ReportBucket) -> Result<Vec<(&'static str, String)>> {
    let range = validate::date_range(range)?;
    Ok(vec![
        ("start", range.start.to_string()),
        ("end", range.end.to_string()),
        ("bucket", bucket.as_str().to_string()),
    ])
}

impl Gateway {
    /// Check-ins per bucket
    pub async fn attendance_report(
        &self,
        range: &DateRange,
        bucket: ReportBucket,
    ) -> Result<Vec<BucketCount>> {
        let query = report_query(range, bucket)?;
        self.get_json("reports/attendance", &query).await
    }

    /// Clients joined per bucket
    pub async fn new_clients_report(
        &self,
        range: &DateRange,
        bucket: ReportBucket,
    ) -> Result<Vec<BucketCount>> {
        let query = report_query(range, bucket)?;
        self.get_json("reports/new_clients", &query).await
    }

    /// Payment totals per bucket, optionally for a single payment method
    pub async fn revenue_report(
        &self,
        range: &DateRange,
        bucket: ReportBucket,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<BucketTotal>> {
        let mut query = report_query(range, bucket)?;
        if let Some(method) = method {
            query.push(("method", method.as_str().to_string()));
        }
        self.get_json("reports/revenue", &query).await
    }
}
