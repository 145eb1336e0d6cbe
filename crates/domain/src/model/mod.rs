//! Data structures shared across the API binary and the vendor bootstraps.

use serde::Serialize;
use thiserror::Error;

/// A purchasable bundle of usage credits at a fixed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceEntry {
    /// Payment-provider price identifier.
    pub identifier: &'static str,
    /// Price in the currency's minor unit (cents for USD).
    pub amount_minor_units: i64,
    /// Lowercase ISO 4217 code, as the payment provider expects it.
    pub currency_code: &'static str,
    pub credit_units: i64,
}

/// Credit packs offered for purchase, cheapest first. Changing a price
/// requires a redeploy.
pub const CREDIT_PACKS: [PriceEntry; 4] = [
    PriceEntry {
        identifier: "price_credits_starter",
        amount_minor_units: 500,
        currency_code: "usd",
        credit_units: 100,
    },
    PriceEntry {
        identifier: "price_credits_standard",
        amount_minor_units: 1_000,
        currency_code: "usd",
        credit_units: 250,
    },
    PriceEntry {
        identifier: "price_credits_pro",
        amount_minor_units: 2_500,
        currency_code: "usd",
        credit_units: 750,
    },
    PriceEntry {
        identifier: "price_credits_studio",
        amount_minor_units: 5_000,
        currency_code: "usd",
        credit_units: 2_000,
    },
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceTableError {
    #[error("price `{0}` must have a positive amount")]
    NonPositiveAmount(&'static str),
    #[error("price `{0}` must grant a positive number of credits")]
    NonPositiveCredits(&'static str),
    #[error("price `{0}` has a currency code that is not three ascii letters")]
    InvalidCurrency(&'static str),
    #[error("price identifier `{0}` appears more than once")]
    DuplicateIdentifier(&'static str),
    #[error("price `{0}` does not cost and grant more than the tier before it")]
    NotIncreasing(&'static str),
}

/// Checks the ordering and uniqueness contract of a price table.
pub fn validate_price_table(entries: &[PriceEntry]) -> Result<(), PriceTableError> {
    for (index, entry) in entries.iter().enumerate() {
        if entry.amount_minor_units <= 0 {
            return Err(PriceTableError::NonPositiveAmount(entry.identifier));
        }
        if entry.credit_units <= 0 {
            return Err(PriceTableError::NonPositiveCredits(entry.identifier));
        }
        if entry.currency_code.len() != 3
            || !entry.currency_code.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(PriceTableError::InvalidCurrency(entry.identifier));
        }
        if entries[..index]
            .iter()
            .any(|earlier| earlier.identifier == entry.identifier)
        {
            return Err(PriceTableError::DuplicateIdentifier(entry.identifier));
        }
        if let Some(previous) = index.checked_sub(1).map(|i| &entries[i]) {
            if entry.amount_minor_units <= previous.amount_minor_units
                || entry.credit_units <= previous.credit_units
            {
                return Err(PriceTableError::NotIncreasing(entry.identifier));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_packs_satisfy_table_contract() {
        assert_eq!(CREDIT_PACKS.len(), 4);
        assert_eq!(validate_price_table(&CREDIT_PACKS), Ok(()));
    }

    #[test]
    fn credit_packs_strictly_increase() {
        for pair in CREDIT_PACKS.windows(2) {
            assert!(pair[1].amount_minor_units > pair[0].amount_minor_units);
            assert!(pair[1].credit_units > pair[0].credit_units);
        }
    }

    #[test]
    fn larger_packs_are_cheaper_per_credit() {
        for pair in CREDIT_PACKS.windows(2) {
            let (small, large) = (pair[0], pair[1]);
            assert!(
                large.amount_minor_units * small.credit_units
                    < small.amount_minor_units * large.credit_units
            );
        }
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let mut table = CREDIT_PACKS;
        table[2].identifier = table[0].identifier;
        assert_eq!(
            validate_price_table(&table),
            Err(PriceTableError::DuplicateIdentifier("price_credits_starter"))
        );
    }

    #[test]
    fn flat_tiers_are_rejected() {
        let mut table = CREDIT_PACKS;
        table[1].credit_units = table[0].credit_units;
        assert_eq!(
            validate_price_table(&table),
            Err(PriceTableError::NotIncreasing("price_credits_standard"))
        );
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let mut table = CREDIT_PACKS;
        table[0].amount_minor_units = 0;
        assert_eq!(
            validate_price_table(&table),
            Err(PriceTableError::NonPositiveAmount("price_credits_starter"))
        );

        let mut table = CREDIT_PACKS;
        table[3].currency_code = "us";
        assert_eq!(
            validate_price_table(&table),
            Err(PriceTableError::InvalidCurrency("price_credits_studio"))
        );
    }
}
