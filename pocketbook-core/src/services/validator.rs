//! Record validation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CandidateRecord, RowError, ValidationErrors};

/// Whether negative amounts are importable
///
/// Bank exports carry debits as negative amounts, so they are accepted by
/// default. `PositiveOnly` keeps the stricter expense-only rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmountPolicy {
    #[default]
    AllowNegative,
    PositiveOnly,
}

/// Fractional digits the expense table stores (`DECIMAL(15, 2)`)
pub const AMOUNT_SCALE: u32 = 2;

/// Collect the errors of every invalid record, keyed by row index
pub fn validate(records: &[CandidateRecord], policy: AmountPolicy) -> ValidationErrors {
    records
        .iter()
        .filter_map(|record| {
            let errors = record_errors(record, policy);
            (!errors.is_empty()).then_some((record.source_row_index, errors))
        })
        .collect()
}

/// Errors for a single record: amount first, then date
pub fn record_errors(record: &CandidateRecord, policy: AmountPolicy) -> Vec<RowError> {
    let mut errors = Vec::new();

    match record.amount {
        None if record.raw_amount.is_some() => errors.push(RowError::InvalidAmount),
        None => errors.push(RowError::MissingAmount),
        // Would be rounded on insert
        Some(amount) if amount.normalize().scale() > AMOUNT_SCALE => {
            errors.push(RowError::InvalidAmount)
        }
        Some(amount) if policy == AmountPolicy::PositiveOnly && amount <= Decimal::ZERO => {
            errors.push(RowError::NonPositiveAmount)
        }
        Some(_) => {}
    }

    if record.date.is_none() {
        if record.raw_date.is_some() {
            errors.push(RowError::InvalidDate);
        } else {
            errors.push(RowError::MissingDate);
        }
    }

    errors
}
