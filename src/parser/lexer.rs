// Shared lexical helpers for attribute and data value parsing

use nom::{
    character::complete::multispace0,
    combinator::{all_consuming, verify},
    number::complete::double,
    sequence::delimited,
    IResult,
};

/// Wrap a parser so it tolerates surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse a finite floating point literal (e.g. `3`, `-0.5`, `1e3`)
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    verify(double, |n: &f64| n.is_finite())(input)
}

/// Parse a whole string as a number, as extracted style and data values arrive as text.
/// Empty and whitespace-only strings are not numbers.
pub fn parse_number(input: &str) -> Option<f64> {
    if input.trim().is_empty() {
        return None;
    }
    all_consuming(ws(number_literal))(input)
        .ok()
        .map(|(_, n)| n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_plain() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("-3.25"), Some(-3.25));
        assert_eq!(parse_number("1e3"), Some(1000.0));
    }

    #[test]
    fn test_parse_number_whitespace() {
        assert_eq!(parse_number("  7.5 "), Some(7.5));
    }

    #[test]
    fn test_parse_number_rejects_text() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("12px"), None);
        assert_eq!(parse_number("apple"), None);
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }
}
