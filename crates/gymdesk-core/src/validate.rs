//! Client-side input validation
//!
//! Rejects obviously malformed input before it reaches the backend, using
//! the same bounds the backend schemas enforce. Validators return a
//! normalized copy (trimmed strings) on success.

use crate::types::{ClientCreate, ClientUpdate, DateRange, PaymentCreate};
use crate::{Error, Result};

pub const MAX_FULL_NAME_CHARS: usize = 120;
pub const MAX_PHONE_CHARS: usize = 30;
pub const MAX_NOTE_CHARS: usize = 500;
pub const MIN_PAYMENT_AMOUNT: f64 = 0.01;
pub const PERIOD_YEARS: std::ops::RangeInclusive<i32> = 2020..=2100;

fn invalid(msg: impl Into<String>) -> Error {
    Error::ValidationFailure(msg.into())
}

fn full_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(invalid("full_name must not be empty"));
    }
    if name.chars().count() > MAX_FULL_NAME_CHARS {
        return Err(invalid(format!(
            "full_name must be at most {} characters",
            MAX_FULL_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

fn phone(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(p) if p.chars().count() > MAX_PHONE_CHARS => Err(invalid(format!(
            "phone must be at most {} characters",
            MAX_PHONE_CHARS
        ))),
        Some(p) => Ok(Some(p.to_string())),
    }
}

fn email(raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(e) => {
            // Minimal shape check; the backend does full validation.
            let valid = e
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
                .unwrap_or(false);
            if valid {
                Ok(Some(e.to_string()))
            } else {
                Err(invalid(format!("'{}' is not a valid email address", e)))
            }
        }
    }
}

pub fn client_create(input: &ClientCreate) -> Result<ClientCreate> {
    Ok(ClientCreate {
        full_name: full_name(&input.full_name)?,
        email: email(input.email.as_deref())?,
        phone: phone(input.phone.as_deref())?,
        is_active: input.is_active,
    })
}

pub fn client_update(input: &ClientUpdate) -> Result<ClientUpdate> {
    Ok(ClientUpdate {
        full_name: input.full_name.as_deref().map(full_name).transpose()?,
        email: email(input.email.as_deref())?,
        phone: phone(input.phone.as_deref())?,
        is_active: input.is_active,
    })
}

pub fn payment_create(input: &PaymentCreate) -> Result<PaymentCreate> {
    if input.client_id.trim().is_empty() {
        return Err(invalid("client_id must not be empty"));
    }
    if !input.amount.is_finite() || input.amount < MIN_PAYMENT_AMOUNT {
        return Err(invalid(format!(
            "amount must be at least {}",
            MIN_PAYMENT_AMOUNT
        )));
    }
    if !(1..=12).contains(&input.period_month) {
        return Err(invalid("period_month must be between 1 and 12"));
    }
    if !PERIOD_YEARS.contains(&input.period_year) {
        return Err(invalid(format!(
            "period_year must be between {} and {}",
            PERIOD_YEARS.start(),
            PERIOD_YEARS.end()
        )));
    }
    let note = match input.note.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(n) if n.chars().count() > MAX_NOTE_CHARS => {
            return Err(invalid(format!(
                "note must be at most {} characters",
                MAX_NOTE_CHARS
            )));
        }
        Some(n) => Some(n.to_string()),
    };

    Ok(PaymentCreate {
        client_id: input.client_id.trim().to_string(),
        note,
        method_channel: input
            .method_channel
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        ..input.clone()
    })
}

pub fn date_range(range: &DateRange) -> Result<DateRange> {
    if range.start > range.end {
        return Err(invalid(format!(
            "start {} is after end {}",
            range.start, range.end
        )));
    }
    Ok(*range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::NaiveDate;

    fn payment() -> PaymentCreate {
        PaymentCreate {
            client_id: "c-1".to_string(),
            amount: 24000.0,
            method: PaymentMethod::Cash,
            method_channel: None,
            note: Some("  march fee ".to_string()),
            period_month: 3,
            period_year: 2025,
        }
    }

    #[test]
    fn test_client_create_trims() {
        let input = ClientCreate {
            full_name: "  Anabella Ruiz ".to_string(),
            email: Some(" ana@example.com ".to_string()),
            phone: Some("   ".to_string()),
            is_active: true,
        };
        let out = client_create(&input).unwrap();
        assert_eq!(out.full_name, "Anabella Ruiz");
        assert_eq!(out.email.as_deref(), Some("ana@example.com"));
        assert_eq!(out.phone, None);
    }

    #[test]
    fn test_client_create_rejects_blank_and_long_names() {
        let mut input = ClientCreate {
            full_name: "   ".to_string(),
            email: None,
            phone: None,
            is_active: true,
        };
        assert!(matches!(
            client_create(&input),
            Err(Error::ValidationFailure(_))
        ));

        input.full_name = "x".repeat(MAX_FULL_NAME_CHARS + 1);
        assert!(client_create(&input).is_err());
    }

    #[test]
    fn test_client_create_rejects_bad_email() {
        let input = ClientCreate {
            full_name: "Ana".to_string(),
            email: Some("not-an-email".to_string()),
            phone: None,
            is_active: true,
        };
        assert!(client_create(&input).is_err());
    }

    #[test]
    fn test_client_update_partial() {
        let update = ClientUpdate {
            phone: Some(" 123 ".to_string()),
            ..Default::default()
        };
        let out = client_update(&update).unwrap();
        assert_eq!(out.full_name, None);
        assert_eq!(out.phone.as_deref(), Some("123"));
    }

    #[test]
    fn test_payment_create_bounds() {
        assert_eq!(payment_create(&payment()).unwrap().note.as_deref(), Some("march fee"));

        let mut p = payment();
        p.amount = 0.0;
        assert!(payment_create(&p).is_err());

        let mut p = payment();
        p.period_month = 13;
        assert!(payment_create(&p).is_err());

        let mut p = payment();
        p.period_year = 2019;
        assert!(payment_create(&p).is_err());

        let mut p = payment();
        p.note = Some("n".repeat(MAX_NOTE_CHARS + 1));
        assert!(payment_create(&p).is_err());
    }

    #[test]
    fn test_date_range_order() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 5, day).unwrap();
        assert!(date_range(&DateRange { start: d(1), end: d(31) }).is_ok());
        assert!(date_range(&DateRange { start: d(1), end: d(1) }).is_ok());
        assert!(date_range(&DateRange { start: d(2), end: d(1) }).is_err());
    }
}
