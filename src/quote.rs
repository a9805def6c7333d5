//! Quote-aware word splitting and colon escaping for legend and path text.

use std::borrow::Cow;

/// Split the next word off `input`.
///
/// A word starting with `"` or `'` runs to the matching unescaped quote, with
/// `\\` and `\<quote>` unescaped; anything between the closing quote and the
/// next `stop` is discarded. Otherwise the word runs verbatim up to `stop`.
/// One trailing `stop` is consumed. Returns `("", "")` on empty input.
pub fn split_quoted(input: &str, stop: char) -> (String, &str) {
    let mut chars = input.char_indices().peekable();
    let Some(&(_, first)) = chars.peek() else {
        return (String::new(), input);
    };

    let mut word = String::new();
    let end;

    if first == '"' || first == '\'' {
        chars.next();
        let mut closed_at = None;
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                if let Some(&(_, next)) = chars.peek() {
                    if next == first || next == '\\' {
                        word.push(next);
                        chars.next();
                        continue;
                    }
                }
                word.push(c);
            } else if c == first {
                closed_at = Some(i + c.len_utf8());
                break;
            } else {
                word.push(c);
            }
        }
        let after = closed_at.unwrap_or(input.len());
        end = input[after..]
            .find(stop)
            .map(|i| after + i)
            .unwrap_or(input.len());
    } else {
        end = input.find(stop).unwrap_or(input.len());
        word.push_str(&input[..end]);
    }

    let rest = &input[end..];
    let rest = rest.strip_prefix(stop).unwrap_or(rest);
    (word, rest)
}

/// Split off everything up to the first `stop`, consuming it. No quoting.
pub fn split_word(input: &str, stop: char) -> (&str, &str) {
    match input.split_once(stop) {
        Some((word, rest)) => (word, rest),
        None => (input, ""),
    }
}

/// Prefix every `:` with a backslash so the engine does not read it as a
/// field separator. Borrows when there is nothing to escape.
pub fn colon_escape(s: &str) -> Cow<'_, str> {
    if !s.contains(':') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c == ':' {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}
