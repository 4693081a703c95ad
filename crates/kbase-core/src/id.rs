//! Opaque record identifiers.
//!
//! Ids are minted by clients, never by the server, and the server does not
//! check them for uniqueness. The format is base-36 milliseconds since the
//! Unix epoch followed by base-36 random digits, e.g. `lx2k9a0f3q8z1m4c7`.

use chrono::Utc;
use uuid::Uuid;

/// Generate a new lowercase alphanumeric id.
#[must_use]
pub fn generate_id() -> String {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let (_, random) = Uuid::new_v4().as_u64_pair();
    let mut id = to_base36(millis);
    id.push_str(&to_base36(random));
    id
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}
