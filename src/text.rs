/// Length in UTF-16 code units, the unit LINE applies to its field limits.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Keep at most `max` UTF-16 code units of `s`. Cuts only on char
/// boundaries, so an astral character that would straddle the limit is
/// dropped whole.
pub fn truncate_utf16(s: &str, max: usize) -> &str {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        used += c.len_utf16();
        if used > max {
            return &s[..idx];
        }
    }
    s
}

/// Shorten a quick-reply label so the result, ellipsis included, fits in
/// `max` code units.
pub fn shorten_label(s: &str, max: usize) -> String {
    if utf16_len(s) <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = truncate_utf16(s, max - 1).to_string();
    out.push('…');
    out
}
