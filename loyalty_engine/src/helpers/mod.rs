mod luhn;

pub use luhn::{is_valid_luhn, validate_order_number};
