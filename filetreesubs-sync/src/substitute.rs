//! Single-pass multi-key substitution.
//!
//! All keys are searched simultaneously. At every step the occurrence with the
//! smallest start index wins; when several keys start at the same index the
//! longest key wins. Scanning resumes right after the inserted replacement, so
//! replacement text is never rescanned and the pass always terminates, even for
//! a key whose replacement contains the key itself.
//!
//! An empty key matches at the scan position. After inserting its replacement
//! one character of the input is copied verbatim before searching again; an
//! empty key never matches at the end of the text.

/// Apply `replacements` (key, replacement) to `text`.
///
/// The result does not depend on the order of `replacements`.
pub fn substitute<'a, I>(text: &str, replacements: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut keys: Vec<(&str, &str)> = replacements.into_iter().collect();
    // Longest first: the first candidate seen at a given index is the winner.
    keys.sort_by(|a, b| {
        b.0.len()
            .cmp(&a.0.len())
            .then_with(|| a.0.cmp(b.0))
            .then_with(|| a.1.cmp(b.1))
    });
    keys.dedup_by(|later, earlier| later.0 == earlier.0);

    if keys.is_empty() {
        return text.to_string();
    }

    // Cached start of each key's next occurrence; stale once it falls behind `pos`.
    let mut next: Vec<Option<usize>> = keys.iter().map(|(key, _)| text.find(key)).collect();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while pos < text.len() {
        let mut best: Option<(usize, usize)> = None;
        for (i, (key, _)) in keys.iter().enumerate() {
            if matches!(next[i], Some(at) if at < pos) {
                next[i] = text[pos..].find(key).map(|offset| pos + offset);
            }
            if let Some(at) = next[i] {
                if best.map_or(true, |(best_at, _)| at < best_at) {
                    best = Some((at, i));
                }
            }
        }

        let Some((start, i)) = best else {
            break;
        };
        let (key, replacement) = keys[i];
        out.push_str(&text[pos..start]);
        out.push_str(replacement);
        pos = start + key.len();

        if key.is_empty() {
            let Some(c) = text[pos..].chars().next() else {
                break;
            };
            out.push(c);
            pos += c.len_utf8();
        }
    }

    out.push_str(&text[pos..]);
    out
}
