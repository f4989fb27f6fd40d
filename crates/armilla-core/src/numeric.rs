//! Classification of numeric literals.
//!
//! Literals keep their exact source text in the tree; this module parses that
//! text into value, base, signedness and width when consumers need it.
//! Integer literals are decimal, `0b`/`0o`/`0x` based, with an optional
//! `_i`/`_ui` suffix and width (`8|16|32|64`). Float literals carry an
//! optional `_f` suffix with width (`32|64`). Without a suffix, integers are
//! `_i32` and floats `_f32`.

/// Description of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerInfo {
    pub value: i128,
    pub is_bin: bool,
    pub is_oct: bool,
    pub is_hex: bool,
    pub is_dec: bool,
    pub is_signed: bool,
    pub size: u8,
}

/// Description of a float literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatInfo {
    pub value: f64,
    pub size: u8,
}

fn split_int_suffix(text: &str) -> (&str, Option<(bool, u8)>) {
    for (marker, signed) in [("_ui", false), ("_i", true)] {
        if let Some(pos) = text.find(marker) {
            let size_str = &text[pos + marker.len()..];
            if let Ok(size) = size_str.parse::<u8>() {
                if matches!(size, 8 | 16 | 32 | 64) {
                    return (&text[..pos], Some((signed, size)));
                }
            }
            return (text, None);
        }
    }
    (text, None)
}

/// Parse a string representing an integer literal, `minus` set when the value
/// is preceded by a `-` operator. Returns `None` when the text is not an
/// integer literal.
pub fn parse_integer(text: &str, minus: bool) -> Option<IntegerInfo> {
    let (digits, suffix) = split_int_suffix(text);

    let (radix, body, is_bin, is_oct, is_hex) = if let Some(body) = digits.strip_prefix("0b") {
        (2, body, true, false, false)
    } else if let Some(body) = digits.strip_prefix("0o") {
        (8, body, false, true, false)
    } else if let Some(body) = digits.strip_prefix("0x") {
        (16, body, false, false, true)
    } else {
        (10, digits, false, false, false)
    };

    if body.is_empty() {
        return None;
    }
    let value = i128::from_str_radix(body, radix).ok()?;
    let (is_signed, size) = match suffix {
        // an unsigned literal cannot be negated
        Some((false, _)) if minus => return None,
        Some((signed, size)) => (signed || minus, size),
        None => (true, 32),
    };

    Some(IntegerInfo {
        value: if minus { -value } else { value },
        is_bin,
        is_oct,
        is_hex,
        is_dec: radix == 10,
        is_signed,
        size,
    })
}

/// Check whether a string is an integer literal.
pub fn is_integer(text: &str) -> bool {
    parse_integer(text, false).is_some()
}

/// Parse a string representing a float literal, `minus` set when the value is
/// preceded by a `-` operator. Returns `None` when the text is not a float
/// literal.
pub fn parse_float(text: &str, minus: bool) -> Option<FloatInfo> {
    let (body, size) = if let Some(pos) = text.find("_f") {
        let size = text[pos + 2..].parse::<u8>().ok()?;
        if !matches!(size, 32 | 64) {
            return None;
        }
        (&text[..pos], size)
    } else {
        (text, 32)
    };

    // mantissa must contain a '.' with digits on at least one side
    let mantissa_end = body.find(['e', 'E']).unwrap_or(body.len());
    let mantissa = &body[..mantissa_end];
    let dot = mantissa.find('.')?;
    let (int_part, frac_part) = (&mantissa[..dot], &mantissa[dot + 1..]);
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let value: f64 = body.parse().ok()?;
    Some(FloatInfo {
        value: if minus { -value } else { value },
        size,
    })
}

/// Check whether a string is a float literal.
pub fn is_float(text: &str) -> bool {
    parse_float(text, false).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_integer() {
        let info = parse_integer("42", false).unwrap();
        assert_eq!(info.value, 42);
        assert!(info.is_dec);
        assert!(info.is_signed);
        assert_eq!(info.size, 32);
    }

    #[test]
    fn test_parse_based_integers() {
        assert_eq!(parse_integer("0b101", false).unwrap().value, 5);
        assert!(parse_integer("0b101", false).unwrap().is_bin);
        assert_eq!(parse_integer("0o17", false).unwrap().value, 15);
        assert_eq!(parse_integer("0xff", false).unwrap().value, 255);
        assert!(parse_integer("0xff", false).unwrap().is_hex);
    }

    #[test]
    fn test_parse_typed_integer() {
        let info = parse_integer("8_ui16", false).unwrap();
        assert_eq!(info.value, 8);
        assert!(!info.is_signed);
        assert_eq!(info.size, 16);

        let info = parse_integer("5_i64", false).unwrap();
        assert!(info.is_signed);
        assert_eq!(info.size, 64);
    }

    #[test]
    fn test_minus_rejects_unsigned() {
        assert!(parse_integer("8_ui16", true).is_none());
        assert_eq!(parse_integer("8_i16", true).unwrap().value, -8);
    }

    #[test]
    fn test_not_an_integer() {
        assert!(parse_integer("abc", false).is_none());
        assert!(parse_integer("0b", false).is_none());
        assert!(!is_integer("1.5"));
    }

    #[test]
    fn test_parse_float() {
        let info = parse_float("1.5", false).unwrap();
        assert_eq!(info.value, 1.5);
        assert_eq!(info.size, 32);

        let info = parse_float("2.5e-3_f64", false).unwrap();
        assert_eq!(info.value, 2.5e-3);
        assert_eq!(info.size, 64);

        assert_eq!(parse_float(".5", false).unwrap().value, 0.5);
        assert_eq!(parse_float("5.", false).unwrap().value, 5.0);
    }

    #[test]
    fn test_not_a_float() {
        assert!(parse_float("42", false).is_none());
        assert!(parse_float("1.5_f16", false).is_none());
        assert!(!is_float("abc"));
    }
}
