//! Shared utility functions

/// Maximum number of characters of a payload included in log records.
pub const LOG_BODY_LIMIT: usize = 256;

/// Truncate `body` to at most `limit` characters for logging.
///
/// Cuts on a char boundary and appends `…` when anything was dropped.
///
/// # Examples
///
/// ```
/// use emit_server::util::truncate_for_log;
///
/// assert_eq!(truncate_for_log("hello", 10), "hello");
/// assert_eq!(truncate_for_log("hello world", 5), "hello…");
/// assert_eq!(truncate_for_log("ééé", 2), "éé…");
/// ```
pub fn truncate_for_log(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}
