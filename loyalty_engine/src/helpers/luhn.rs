use crate::db_types::OrderNumber;

/// Checks `number` against the Luhn (mod 10) checksum.
///
/// Only ASCII digits are accepted. Empty strings are not valid.
pub fn is_valid_luhn(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Trims the submitted text and returns it as an [`OrderNumber`] if it passes the Luhn check.
pub fn validate_order_number(raw: &str) -> Result<OrderNumber, String> {
    let number = raw.trim();
    if is_valid_luhn(number) {
        Ok(OrderNumber::from(number))
    } else {
        Err(number.to_string())
    }
}
