// Centralized ingestion limits for client-supplied datasets

pub const MAX_RECORDS: usize = 200_000;
pub const MAX_TEXT_LEN: usize = 4_096;

// Search text is compared against every record on each recompute
pub const MAX_SEARCH_LEN: usize = 256;

#[inline]
pub fn clamp_text(s: &str) -> &str {
    if s.len() <= MAX_TEXT_LEN {
        return s;
    }
    let mut end = MAX_TEXT_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
