// Color parser for computed style values

use super::lexer::ws;
use crate::ir::Rgb;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::char,
    combinator::{all_consuming, map, map_res},
    sequence::{delimited, preceded, tuple},
    IResult,
};

fn channel(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(1, 3, |c: char| c.is_ascii_digit()), |s: &str| {
        s.parse::<u8>()
    })(input)
}

/// Parse `rgb(r, g, b)`
pub fn parse_rgb(input: &str) -> IResult<&str, Rgb> {
    let (input, _) = tag("rgb")(input)?;
    let (input, (r, _, g, _, b)) = delimited(
        ws(char('(')),
        tuple((ws(channel), char(','), ws(channel), char(','), ws(channel))),
        char(')'),
    )(input)?;
    Ok((input, Rgb { r, g, b }))
}

fn hex_pair(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |s: &str| {
        u8::from_str_radix(s, 16)
    })(input)
}

fn hex_digit(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(1, 1, |c: char| c.is_ascii_hexdigit()), |s: &str| {
        u8::from_str_radix(s, 16).map(|v| v * 17)
    })(input)
}

/// Parse `#rrggbb` or the short `#rgb` form
pub fn parse_hex(input: &str) -> IResult<&str, Rgb> {
    preceded(
        char('#'),
        alt((
            map(tuple((hex_pair, hex_pair, hex_pair)), |(r, g, b)| Rgb { r, g, b }),
            map(tuple((hex_digit, hex_digit, hex_digit)), |(r, g, b)| Rgb { r, g, b }),
        )),
    )(input)
}

/// Parse a whole string as a color. Returns None for anything else.
pub fn parse_color(input: &str) -> Option<Rgb> {
    all_consuming(ws(alt((parse_rgb, parse_hex))))(input)
        .ok()
        .map(|(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_color("rgb(31,119,180)"), Some(Rgb { r: 31, g: 119, b: 180 }));
    }

    #[test]
    fn test_parse_rgb_with_whitespace() {
        assert_eq!(parse_color("rgb(31, 119, 180)"), Some(Rgb { r: 31, g: 119, b: 180 }));
        assert_eq!(parse_color(" rgb( 1 ,2, 3 ) "), Some(Rgb { r: 1, g: 2, b: 3 }));
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_color("#ff0000"), Some(Rgb { r: 255, g: 0, b: 0 }));
        assert_eq!(parse_color("#0f0"), Some(Rgb { r: 0, g: 255, b: 0 }));
    }

    #[test]
    fn test_parse_color_rejects() {
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("rgb(300,0,0)"), None);
        assert_eq!(parse_color("rgba(1,2,3,0.5)"), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("12"), None);
    }
}
