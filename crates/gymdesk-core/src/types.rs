//! Domain records exchanged with the gym backend
//!
//! These mirror the backend's JSON payloads. Timestamps are accepted either
//! as RFC 3339 strings or as naive ISO-8601 strings (interpreted as UTC),
//! since the backend emits both depending on the column.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A gym member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub join_date: DateTime<Utc>,
}

/// Payload for `POST /clients/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCreate {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Payload for `PATCH /clients/{id}`; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Payment standing of a client for the current period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub client_id: String,
    pub full_name: String,
    pub is_up_to_date: bool,
    #[serde(default)]
    pub last_payment_month: Option<u8>,
    #[serde(default)]
    pub last_payment_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    #[serde(other)]
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }
}

/// A recorded monthly fee payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub client_id: String,
    pub amount: f64,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub method_channel: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub period_month: u8,
    pub period_year: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Payload for `POST /payments/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCreate {
    pub client_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub period_month: u8,
    pub period_year: i32,
}

/// A single gym check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: String,
    pub client_id: String,
    #[serde(default)]
    pub coach_id: Option<String>,
    #[serde(with = "timestamp")]
    pub checkin_at: DateTime<Utc>,
}

/// Response of `POST /attendance/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckinReceipt {
    pub ok: bool,
    pub id: String,
}

/// Secondary statistics shown next to a search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientStats {
    pub last_payment: Option<Payment>,
    pub attendance_count: u64,
}

/// Time bucket used by the report endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportBucket {
    #[default]
    Day,
    Week,
    Month,
}

impl ReportBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::str::FromStr for ReportBucket {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(crate::Error::ValidationFailure(format!(
                "unknown report bucket '{}' (expected day, week or month)",
                other
            ))),
        }
    }
}

/// Count row of the attendance and new-client reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    #[serde(with = "timestamp")]
    pub bucket: DateTime<Utc>,
    pub count: u64,
}

/// Amount row of the revenue report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketTotal {
    #[serde(with = "timestamp")]
    pub bucket: DateTime<Utc>,
    pub total: f64,
}

/// Inclusive calendar date range for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// `limit`/`offset` pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// One page of a list endpoint together with the backend's total count
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn default_true() -> bool {
    true
}

/// Serde adapter accepting RFC 3339 and naive ISO-8601 timestamps
pub mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    /// Parse a backend timestamp, assuming UTC when no offset is present
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_client_deserialize_naive_join_date() {
        let client: Client = serde_json::from_value(json!({
            "id": "c-1",
            "full_name": "Anabella Ruiz",
            "email": null,
            "phone": "+54 11 5555 0000",
            "is_active": true,
            "join_date": "2024-03-05T18:30:00"
        }))
        .unwrap();

        assert_eq!(client.full_name, "Anabella Ruiz");
        assert_eq!(client.email, None);
        assert_eq!(client.join_date.month(), 3);
        assert_eq!(client.join_date.hour(), 18);
    }

    #[test]
    fn test_payment_method_unknown_value() {
        let payment: Payment = serde_json::from_value(json!({
            "id": "p-1",
            "client_id": "c-1",
            "amount": 24000.0,
            "method": "mercadopago",
            "period_month": 4,
            "period_year": 2025,
            "created_at": "2025-04-02T10:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(payment.method, Some(PaymentMethod::Other));
        assert_eq!(payment.note, None);
    }

    #[test]
    fn test_client_update_skips_unset_fields() {
        let update = ClientUpdate {
            phone: Some("123".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({"phone": "123"}));
    }

    #[test]
    fn test_report_bucket_parse() {
        assert_eq!("WEEK".parse::<ReportBucket>().unwrap(), ReportBucket::Week);
        assert!("year".parse::<ReportBucket>().is_err());
        assert_eq!(ReportBucket::default().as_str(), "day");
    }

    #[test]
    fn test_timestamp_parse_variants() {
        assert!(timestamp::parse("2025-01-01T00:00:00Z").is_some());
        assert!(timestamp::parse("2025-01-01T00:00:00.123456").is_some());
        assert!(timestamp::parse("2025-01-01").is_some());
        assert!(timestamp::parse("yesterday").is_none());
    }
}
