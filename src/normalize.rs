//! Normalization of raw remnants feed tokens into marketplace integers
//!
//! Both rules are fixed business policy of the feed provider, not configuration.

use crate::error::{Result, SyncError};

/// Feed marker for "more than ten items in stock"
pub const MORE_THAN_TEN: &str = ">10";

/// Stock published for [`MORE_THAN_TEN`]. A display cap, not the real count.
pub const MORE_THAN_TEN_STOCK: u64 = 100;

/// Map a raw quantity token to a stock count.
///
/// - `">10"` becomes [`MORE_THAN_TEN_STOCK`]
/// - `"1"` becomes `0`
/// - anything else must be a non-negative base-10 integer
///
/// The `"1"` rule is a deliberate convention inherited from the feed provider: a lone
/// unit is treated as reserved or unreliable and published as out of stock. Do not
/// "fix" it.
pub fn normalize_quantity(token: &str) -> Result<u64> {
    let token = token.trim();
    match token {
        MORE_THAN_TEN => Ok(MORE_THAN_TEN_STOCK),
        "1" => Ok(0),
        _ => token.parse::<u64>().map_err(|_| SyncError::InvalidQuantity {
            code: String::new(),
            token: token.to_string(),
        }),
    }
}

/// Map a decorated price token (`"5'990.00 руб"`) to its integer part.
///
/// Everything from the first `.` on is dropped, then every non-digit character
/// (currency, thousands separators, whitespace) is stripped from what is left.
pub fn normalize_price(token: &str) -> Result<u64> {
    let integer_part = token.split('.').next().unwrap_or_default();
    let digits: String = integer_part
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    digits.parse::<u64>().map_err(|_| SyncError::InvalidPrice {
        code: String::new(),
        token: token.to_string(),
    })
}
