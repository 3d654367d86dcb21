/// Normalize an arbitrary line-item label into an identifier-safe column name.
///
/// The output contains only `[a-z0-9_]`: any run of disallowed characters
/// collapses to a single underscore, and leading/trailing underscores are
/// stripped. Normalizing an already-normalized name returns it unchanged, so
/// the function can be applied blindly to provider labels and stored columns
/// alike. The empty string is a valid (degenerate) output.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
