//! Session id generation and validation

use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Generate a session id of the form `session_<epochMillis>_<9 base36 chars>`
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "session_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

/// Whether `id` has the shape produced by [`generate_session_id`]
pub fn is_session_id(id: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^session_\d+_[0-9a-z]{9}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(id))
}
