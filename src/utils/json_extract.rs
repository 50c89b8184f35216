use serde::de::DeserializeOwned;

/// Returns the first balanced `{...}` or `[...]` span in `text`, skipping
/// brackets that appear inside JSON string literals.
pub fn extract_json_span(text: &str) -> Option<&str> {
    json_spans(text).next()
}

/// All balanced top-level spans in order of their opening bracket.
pub fn json_spans(text: &str) -> impl Iterator<Item = &str> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        while cursor < text.len() {
            let offset = text[cursor..].find(|c: char| c == '{' || c == '[')?;
            let open = cursor + offset;
            match balanced_end(text.as_bytes(), open) {
                Some(end) => {
                    cursor = end + 1;
                    return Some(&text[open..=end]);
                }
                None => cursor = open + 1,
            }
        }
        None
    })
}

/// Decodes the first span that deserializes as `T`. Free-form model output
/// often carries a bracketed aside before the payload, so a span that fails to
/// decode does not end the search.
pub fn decode_embedded<T: DeserializeOwned>(text: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str::<T>(text.trim()) {
        return Some(value);
    }
    json_spans(text).find_map(|span| serde_json::from_str::<T>(span).ok())
}

fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut expected: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => expected.push(b'}'),
            b'[' => expected.push(b']'),
            b'}' | b']' => {
                if expected.pop() != Some(b) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
