//! Customer contact repair before outbound pushes
//!
//! The remote platform rejects order updates whose billing email does not
//! parse, so a configured fallback address is substituted first.

use shared::order::Customer;
use validator::ValidateEmail;

/// Basic email format check
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Returns a copy of the customer whose email is guaranteed usable remotely.
///
/// The second element is `true` when the fallback was substituted.
pub fn repair_customer_email(customer: &Customer, fallback: &str) -> (Customer, bool) {
    let mut repaired = customer.clone();
    match customer.email.as_deref().map(str::trim) {
        Some(email) if is_valid_email(email) => {
            repaired.email = Some(email.to_string());
            (repaired, false)
        }
        _ => {
            repaired.email = Some(fallback.to_string());
            (repaired, true)
        }
    }
}
