//! Placeholder substitution and markup helpers.

use crate::types::PlaceholderFormat;

/// Substitutes positional placeholders in `text` with `params`.
///
/// Recognised forms (each only when enabled in `formats`):
/// - `{n}`: `params[n]`
/// - `%n$s`: `params[n]`
///
/// The text is scanned once, so a substituted value is never expanded again.
/// Placeholders without a matching parameter are kept verbatim. When `escape` is
/// set, substituted values are HTML-escaped; the catalog text itself is not.
#[must_use]
pub fn substitute<P: AsRef<str>>(
    text: &str,
    params: &[P],
    formats: &[PlaceholderFormat],
    escape: bool,
) -> String {
    if params.is_empty() || formats.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['{', '%']) {
        let (literal, tail) = rest.split_at(pos);
        out.push_str(literal);

        let substitution = parse_placeholder(tail, formats)
            .and_then(|(index, len)| params.get(index).map(|param| (param.as_ref(), len)));

        if let Some((value, len)) = substitution {
            if escape {
                out.push_str(&escape_html(value));
            } else {
                out.push_str(value);
            }
            rest = tail.get(len..).unwrap_or_default();
        } else {
            let mut chars = tail.chars();
            if let Some(marker) = chars.next() {
                out.push(marker);
            }
            rest = chars.as_str();
        }
    }

    out.push_str(rest);
    out
}

/// Parses a placeholder at the start of `input`.
///
/// Returns the parameter index and the byte length of the placeholder.
fn parse_placeholder(input: &str, formats: &[PlaceholderFormat]) -> Option<(usize, usize)> {
    if let Some(body) = input.strip_prefix('{')
        && formats.contains(&PlaceholderFormat::Braced)
    {
        let (index, digits) = leading_index(body)?;
        return body.get(digits..)?.starts_with('}').then_some((index, digits + 2));
    }

    if let Some(body) = input.strip_prefix('%')
        && formats.contains(&PlaceholderFormat::Numbered)
    {
        let (index, digits) = leading_index(body)?;
        return body.get(digits..)?.starts_with("$s").then_some((index, digits + 3));
    }

    None
}

/// Leading decimal number of `input` and its length in bytes.
fn leading_index(input: &str) -> Option<(usize, usize)> {
    let digits = input.bytes().take_while(u8::is_ascii_digit).count();
    let index = input.get(..digits)?.parse().ok()?;
    Some((index, digits))
}

/// Escapes `& < > " '` for insertion into markup.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Converts literal newlines into line-break markup.
#[must_use]
pub fn newlines_to_br(text: &str) -> String {
    text.replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    const BOTH: &[PlaceholderFormat] = &[PlaceholderFormat::Braced, PlaceholderFormat::Numbered];

    #[rstest]
    fn mixed_placeholder_syntaxes() {
        let result = substitute(
            "Hello {0}, you have %2$s new items from {1}",
            &["Ann", "Bob", "3"],
            BOTH,
            false,
        );

        assert_that!(result, eq("Hello Ann, you have 3 new items from Bob"));
    }

    #[rstest]
    #[case::braced_repeated("{0} and {0}", &["x"], "x and x")]
    #[case::out_of_range("{0} {5}", &["a"], "a {5}")]
    #[case::numbered_out_of_range("%9$s", &["a"], "%9$s")]
    #[case::numbered_shares_braced_index("{2}/%2$s %1$s", &["a", "b", "c"], "c/c b")]
    #[case::unterminated("{0", &["a"], "{0")]
    #[case::not_a_number("{a} %s", &["a"], "{a} %s")]
    #[case::percent_literal("100% {0}", &["done"], "100% done")]
    #[case::multibyte("こんにちは {0}！", &["Sam"], "こんにちは Sam！")]
    fn substitute_cases(#[case] text: &str, #[case] params: &[&str], #[case] expected: &str) {
        assert_that!(substitute(text, params, BOTH, false), eq(expected));
    }

    #[rstest]
    fn substituted_values_are_not_rescanned() {
        let result = substitute("{0} {1}", &["{1}", "b"], BOTH, false);

        assert_that!(result, eq("{1} b"));
    }

    #[rstest]
    #[case::braced_only(&[PlaceholderFormat::Braced], "a %0$s")]
    #[case::numbered_only(&[PlaceholderFormat::Numbered], "{0} a")]
    fn disabled_formats_stay_literal(#[case] formats: &[PlaceholderFormat], #[case] expected: &str) {
        assert_that!(substitute("{0} %0$s", &["a"], formats, false), eq(expected));
    }

    #[rstest]
    fn escape_applies_to_values_only() {
        let result = substitute("<b>{0}</b>", &["<script>'x' & \"y\"</script>"], BOTH, true);

        assert_that!(
            result,
            eq("<b>&lt;script&gt;&#039;x&#039; &amp; &quot;y&quot;&lt;/script&gt;</b>")
        );
    }

    #[rstest]
    fn no_params_returns_text() {
        assert_that!(substitute::<&str>("{0}", &[], BOTH, true), eq("{0}"));
    }

    #[rstest]
    fn newlines_become_line_breaks() {
        assert_that!(newlines_to_br("a\nb\n"), eq("a<br>b<br>"));
    }
}
