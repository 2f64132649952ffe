//! Human-readable code generation.

/// Prefix for user codes.
pub const USER_CODE_PREFIX: &str = "KRY";

/// Code built from the first three lowercase characters of `name` and a
/// zero-padded id, e.g. `eng-007`.
pub fn name_code(name: &str, id: i64) -> String {
    let prefix: String = name.trim().to_lowercase().chars().take(3).collect();
    format!("{prefix}-{id:03}")
}

/// User code, e.g. `KRY0042`.
pub fn user_code(id: i64) -> String {
    format!("{USER_CODE_PREFIX}{id:04}")
}

/// Code that only carries the id.
pub fn id_code(id: i64) -> String {
    id.to_string()
}

/// Replacement code for a soft-deleted row, freeing its unique code.
pub fn tombstone_code(table: &str, id: i64, unix_secs: i64) -> String {
    format!("{table}-deleted-{id}-{unix_secs}")
}

/// Returns whether `code` was produced by [`tombstone_code`] for `table`.
pub fn is_tombstone(table: &str, code: &str) -> bool {
    code.strip_prefix(table)
        .is_some_and(|rest| rest.starts_with("-deleted-"))
}
