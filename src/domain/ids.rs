//! Identifier helpers.
//!
//! Post and account identifiers are 26-character, lexicographically sortable strings whose prefix
//! encodes creation time, so comparing two ids also compares their ages.

/// Lowest possible identifier; the implicit lower bound of ascending pages.
pub const MIN_ID: &str = "00000000000000000000000000";

/// Highest possible identifier; the implicit upper bound of descending pages.
pub const MAX_ID: &str = "ZZZZZZZZZZZZZZZZZZZZZZZZZZ";

/// Returns true when `id` lies strictly between `min` and `max`.
pub fn within_exclusive(id: &str, min: &str, max: &str) -> bool {
    id > min && id < max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_sort_around_real_ids() {
        let id = "01HQ7ZK4Y5V3N2R1B0XWJ8CDEF";
        assert!(MIN_ID < id);
        assert!(id < MAX_ID);
    }

    #[test]
    fn within_exclusive_rejects_edges() {
        assert!(within_exclusive("02", "01", "03"));
        assert!(!within_exclusive("01", "01", "03"));
        assert!(!within_exclusive("03", "01", "03"));
    }
}
