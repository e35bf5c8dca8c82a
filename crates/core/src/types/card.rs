//! Card-like payment input: formatting and format validation.
//!
//! The storefront simulates payments, so nothing here talks to a card
//! network. The rules only check shape: a 16-digit number, a cardholder name,
//! an `MM/YY` expiry with a real month, and a 3-4 digit CVV. Only the last
//! four digits ever leave [`CardInput::validate`].

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::CardType;

/// Number of digits a card number must have.
pub const CARD_NUMBER_DIGITS: usize = 16;

/// Errors reported by [`CardInput::validate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    /// Card number is not exactly 16 digits.
    #[error("invalid card number")]
    InvalidNumber,
    /// Cardholder name is blank.
    #[error("cardholder name is required")]
    MissingCardholder,
    /// Expiry is not in `MM/YY` form.
    #[error("invalid expiration date")]
    InvalidExpiry,
    /// Expiry month is outside 1-12.
    #[error("invalid expiration month")]
    InvalidMonth,
    /// CVV is not 3 or 4 digits.
    #[error("invalid CVV")]
    InvalidCvv,
}

/// Group a card number in blocks of four, dropping any whitespace.
///
/// ```
/// use motostore_core::format_card_number;
///
/// assert_eq!(format_card_number("1234567890123456"), "1234 5678 9012 3456");
/// assert_eq!(format_card_number("1234 56"), "1234 56");
/// ```
#[must_use]
pub fn format_card_number(raw: &str) -> String {
    let cleaned: Vec<char> = raw.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format free-form expiry input as `MM/YY`.
///
/// Non-digits are dropped; once two digits are present a slash is inserted
/// and at most two more digits are kept.
///
/// ```
/// use motostore_core::format_expiry;
///
/// assert_eq!(format_expiry("1225"), "12/25");
/// assert_eq!(format_expiry("12/25"), "12/25");
/// assert_eq!(format_expiry("1"), "1");
/// ```
#[must_use]
pub fn format_expiry(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 2 {
        return digits;
    }
    let (month, rest) = digits.split_at(2);
    let year: String = rest.chars().take(2).collect();
    format!("{month}/{year}")
}

/// Card expiry month and two-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    /// Month, 1-12.
    pub month: u8,
    /// Two-digit year.
    pub year: u8,
}

impl Expiry {
    /// Parse `MM/YY` (or raw digits such as `1225`).
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidExpiry`] if the input does not normalize to
    /// five characters and [`CardError::InvalidMonth`] if the month is not 1-12.
    pub fn parse(raw: &str) -> Result<Self, CardError> {
        let formatted = format_expiry(raw);
        if formatted.len() != 5 {
            return Err(CardError::InvalidExpiry);
        }
        let (month, year) = formatted
            .split_once('/')
            .ok_or(CardError::InvalidExpiry)?;
        let month: u8 = month.parse().map_err(|_| CardError::InvalidExpiry)?;
        let year: u8 = year.parse().map_err(|_| CardError::InvalidExpiry)?;
        if !(1..=12).contains(&month) {
            return Err(CardError::InvalidMonth);
        }
        Ok(Self { month, year })
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.year)
    }
}

/// Raw card input as submitted by the payment form.
#[derive(Clone, Deserialize)]
pub struct CardInput {
    /// Credit or debit.
    #[serde(default)]
    pub card_type: CardType,
    /// Card number, with or without grouping spaces.
    pub number: String,
    /// Name printed on the card.
    pub cardholder_name: String,
    /// Expiry, `MM/YY` or `MMYY`.
    pub expiry: String,
    /// Security code.
    pub cvv: String,
}

impl fmt::Debug for CardInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInput")
            .field("card_type", &self.card_type)
            .field("number", &"[REDACTED]")
            .field("cardholder_name", &self.cardholder_name)
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

impl CardInput {
    /// Check the input's format and reduce it to what may be stored.
    ///
    /// Checks run in form order, so the first problem is the one reported.
    ///
    /// # Errors
    ///
    /// Returns the first [`CardError`] found.
    pub fn validate(&self) -> Result<ValidatedCard, CardError> {
        let number: String = self.number.chars().filter(|c| !c.is_whitespace()).collect();
        if number.len() != CARD_NUMBER_DIGITS || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(CardError::InvalidNumber);
        }

        let cardholder_name = self.cardholder_name.trim();
        if cardholder_name.is_empty() {
            return Err(CardError::MissingCardholder);
        }

        let expiry = Expiry::parse(&self.expiry)?;

        let cvv = self.cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(CardError::InvalidCvv);
        }

        let last_four = number
            .get(CARD_NUMBER_DIGITS - 4..)
            .ok_or(CardError::InvalidNumber)?
            .to_owned();

        Ok(ValidatedCard {
            card_type: self.card_type,
            last_four,
            cardholder_name: cardholder_name.to_owned(),
            expiry,
        })
    }
}

/// Card details that survived validation. Holds no full number and no CVV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedCard {
    /// Credit or debit.
    pub card_type: CardType,
    /// Last four digits of the card number.
    pub last_four: String,
    /// Trimmed cardholder name.
    pub cardholder_name: String,
    /// Parsed expiry.
    pub expiry: Expiry,
}

impl ValidatedCard {
    /// Masked suffix for receipts, e.g. `****3456`.
    #[must_use]
    pub fn masked(&self) -> String {
        format!("****{}", self.last_four)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> CardInput {
        CardInput {
            card_type: CardType::Credit,
            number: "1234 5678 9012 3456".to_string(),
            cardholder_name: "  Juan Pérez ".to_string(),
            expiry: "12/25".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn test_format_card_number_groups_of_four() {
        assert_eq!(format_card_number("1234567890123456"), "1234 5678 9012 3456");
        assert_eq!(format_card_number("12345"), "1234 5");
        assert_eq!(format_card_number(""), "");
    }

    #[test]
    fn test_format_expiry() {
        assert_eq!(format_expiry("1225"), "12/25");
        assert_eq!(format_expiry("12"), "12/");
        assert_eq!(format_expiry("122599"), "12/25");
        assert_eq!(format_expiry("ab"), "");
    }

    #[test]
    fn test_valid_card_keeps_only_last_four() {
        let card = input().validate().unwrap();
        assert_eq!(card.last_four, "3456");
        assert_eq!(card.masked(), "****3456");
        assert_eq!(card.cardholder_name, "Juan Pérez");
        assert_eq!(card.expiry, Expiry { month: 12, year: 25 });
    }

    #[test]
    fn test_rejects_wrong_length_number() {
        for number in ["123456789012345", "12345678901234567", "", "1234 5678 9012 345x"] {
            let card = CardInput {
                number: number.to_string(),
                ..input()
            };
            assert_eq!(card.validate(), Err(CardError::InvalidNumber), "{number}");
        }
    }

    #[test]
    fn test_rejects_blank_name() {
        let card = CardInput {
            cardholder_name: "   ".to_string(),
            ..input()
        };
        assert_eq!(card.validate(), Err(CardError::MissingCardholder));
    }

    #[test]
    fn test_rejects_month_out_of_range() {
        for expiry in ["00/25", "13/25", "1325"] {
            let card = CardInput {
                expiry: expiry.to_string(),
                ..input()
            };
            assert_eq!(card.validate(), Err(CardError::InvalidMonth), "{expiry}");
        }
    }

    #[test]
    fn test_rejects_short_expiry() {
        let card = CardInput {
            expiry: "12/2".to_string(),
            ..input()
        };
        assert_eq!(card.validate(), Err(CardError::InvalidExpiry));
    }

    #[test]
    fn test_accepts_unformatted_expiry() {
        let card = CardInput {
            expiry: "0127".to_string(),
            ..input()
        };
        assert_eq!(card.validate().unwrap().expiry.to_string(), "01/27");
    }

    #[test]
    fn test_cvv_length() {
        for (cvv, ok) in [("12", false), ("123", true), ("1234", true), ("12345", false), ("12a", false)] {
            let card = CardInput {
                cvv: cvv.to_string(),
                ..input()
            };
            assert_eq!(card.validate().is_ok(), ok, "{cvv}");
        }
    }

    #[test]
    fn test_debug_redacts_number_and_cvv() {
        let debug = format!("{:?}", input());
        assert!(!debug.contains("9012"));
        assert!(!debug.contains("123\""));
        assert!(debug.contains("[REDACTED]"));
    }
}
