//! Integer and float parsing for both YAML dialects, plus the formatting
//! that writes a number back in the shape it was read in.

use memchr::memchr;

use crate::options::YamlVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Radix {
    #[default]
    Decimal,
    Binary,
    Octal,
    Hex,
    /// Hexadecimal written with upper case digits.
    HexUpper,
}

impl Radix {
    fn prefix(self) -> &'static str {
        match self {
            Radix::Decimal => "",
            Radix::Binary => "0b",
            Radix::Octal => "0o",
            Radix::Hex | Radix::HexUpper => "0x",
        }
    }
}

/// Underscore grouping of the digits: `group` digits per group counted from
/// the right, and whether an underscore leads or trails the digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Underscore {
    pub group: usize,
    pub leading: bool,
    pub trailing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntFormat {
    pub radix: Radix,
    /// Digit count including zero padding.
    pub width: Option<usize>,
    pub underscore: Option<Underscore>,
    pub plus_sign: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExponentFormat {
    pub upper: bool,
    pub plus_sign: bool,
    /// Exponent digits including zero padding, sign excluded.
    pub digits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FloatFormat {
    /// The mantissa contains a `.`.
    pub dot: bool,
    /// Digits after the dot.
    pub fraction_digits: usize,
    /// The mantissa starts with the dot, as in `.5`.
    pub leading_dot: bool,
    pub plus_sign: bool,
    pub exponent: Option<ExponentFormat>,
}

fn split_sign(text: &str) -> (bool, bool, &str) {
    match text.as_bytes().first() {
        Some(b'-') => (true, false, &text[1..]),
        Some(b'+') => (false, true, &text[1..]),
        _ => (false, false, text),
    }
}

fn strip_underscores(text: &str) -> String {
    if memchr(b'_', text.as_bytes()).is_none() {
        return text.to_owned();
    }
    text.chars().filter(|ch| *ch != '_').collect()
}

fn underscore_of(digits: &str) -> Option<Underscore> {
    memchr(b'_', digits.as_bytes())?;
    let trimmed = digits.trim_end_matches('_');
    let group = trimmed
        .rfind('_')
        .map(|pos| trimmed.len() - pos - 1)
        .unwrap_or(0);
    Some(Underscore {
        group,
        leading: digits.starts_with('_'),
        trailing: digits.len() > 1 && digits.ends_with('_'),
    })
}

fn apply_sign(negative: bool, magnitude: i128) -> Option<i128> {
    if negative {
        magnitude.checked_neg()
    } else {
        Some(magnitude)
    }
}

/// Parses an integer the resolver tagged `int`. Returns `None` when the
/// digits do not form a number that fits an `i128`.
pub fn parse_int(text: &str, version: YamlVersion) -> Option<(i128, IntFormat)> {
    let (negative, plus_sign, body) = split_sign(text);
    let mut format = IntFormat {
        plus_sign,
        ..IntFormat::default()
    };
    let digits = strip_underscores(body);
    if digits.is_empty() {
        return None;
    }
    if digits == "0" {
        return Some((0, format));
    }
    for (prefix, radix, base) in [
        ("0b", Radix::Binary, 2),
        ("0x", Radix::Hex, 16),
        ("0o", Radix::Octal, 8),
    ] {
        let Some(rest) = body.strip_prefix(prefix) else {
            continue;
        };
        let plain = strip_underscores(rest);
        if plain.is_empty() {
            return None;
        }
        format.radix = radix;
        if radix == Radix::Hex {
            if let Some(letter) = plain.chars().find(|ch| ch.is_ascii_alphabetic()) {
                if letter.is_ascii_uppercase() {
                    format.radix = Radix::HexUpper;
                }
            }
        }
        if version == YamlVersion::V1_2 && plain.starts_with('0') {
            format.width = Some(plain.len());
        }
        format.underscore = underscore_of(rest);
        let magnitude = i128::from_str_radix(&plain, base).ok()?;
        return Some((apply_sign(negative, magnitude)?, format));
    }
    if version == YamlVersion::V1_1 {
        if digits.starts_with('0') {
            let magnitude = i128::from_str_radix(&digits, 8).ok()?;
            return Some((apply_sign(negative, magnitude)?, format));
        }
        if memchr(b':', digits.as_bytes()).is_some() {
            let mut magnitude: i128 = 0;
            for part in digits.split(':') {
                let part: i128 = part.parse().ok()?;
                magnitude = magnitude.checked_mul(60)?.checked_add(part)?;
            }
            return Some((apply_sign(negative, magnitude)?, format));
        }
    }
    if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    if version == YamlVersion::V1_2 && digits.starts_with('0') {
        format.width = Some(digits.len());
    }
    format.underscore = underscore_of(body);
    let magnitude: i128 = digits.parse().ok()?;
    Some((apply_sign(negative, magnitude)?, format))
}

fn insert_underscores(digits: String, underscore: Option<Underscore>) -> String {
    let Some(underscore) = underscore else {
        return digits;
    };
    let mut out = String::with_capacity(digits.len() * 2);
    if underscore.leading {
        out.push('_');
    }
    if underscore.group == 0 {
        out.push_str(&digits);
    } else {
        let len = digits.len();
        for (index, ch) in digits.chars().enumerate() {
            if index > 0 && (len - index) % underscore.group == 0 {
                out.push('_');
            }
            out.push(ch);
        }
    }
    if underscore.trailing {
        out.push('_');
    }
    out
}

/// Writes `value` using the radix, padding and grouping in `format`.
pub fn format_int(value: i128, format: &IntFormat) -> String {
    let magnitude = value.unsigned_abs();
    let mut digits = match format.radix {
        Radix::Decimal => {
            let mut buffer = itoa::Buffer::new();
            buffer.format(magnitude).to_owned()
        }
        Radix::Binary => format!("{magnitude:b}"),
        Radix::Octal => format!("{magnitude:o}"),
        Radix::Hex => format!("{magnitude:x}"),
        Radix::HexUpper => format!("{magnitude:X}"),
    };
    if let Some(width) = format.width {
        if digits.len() < width {
            digits.insert_str(0, &"0".repeat(width - digits.len()));
        }
    }
    let digits = insert_underscores(digits, format.underscore);
    let mut out = String::with_capacity(digits.len() + 3);
    if value < 0 {
        out.push('-');
    } else if format.plus_sign {
        out.push('+');
    }
    out.push_str(format.radix.prefix());
    out.push_str(&digits);
    out
}

/// Parses a float the resolver tagged `float`.
pub fn parse_float(text: &str, version: YamlVersion) -> Option<(f64, FloatFormat)> {
    let cleaned = strip_underscores(text);
    let (negative, plus_sign, body) = split_sign(&cleaned);
    let lower = body.to_ascii_lowercase();
    let signed = |magnitude: f64| if negative { -magnitude } else { magnitude };
    let mut format = FloatFormat {
        plus_sign,
        ..FloatFormat::default()
    };
    match lower.as_str() {
        ".inf" => return Some((signed(f64::INFINITY), format)),
        ".nan" => return Some((f64::NAN, format)),
        _ => {}
    }
    if version == YamlVersion::V1_1 && memchr(b':', lower.as_bytes()).is_some() {
        let mut magnitude = 0.0;
        for part in lower.split(':') {
            let part: f64 = part.parse().ok()?;
            magnitude = magnitude * 60.0 + part;
        }
        return Some((signed(magnitude), format));
    }
    let (mantissa, exponent) = match memchr(b'e', lower.as_bytes()) {
        Some(pos) => (&lower[..pos], Some(&body[pos + 1..])),
        None => (lower.as_str(), None),
    };
    if let Some(dot) = memchr(b'.', mantissa.as_bytes()) {
        format.dot = true;
        format.fraction_digits = mantissa.len() - dot - 1;
        format.leading_dot = dot == 0;
    }
    if let Some(exponent) = exponent {
        let marker_pos = body.len() - exponent.len() - 1;
        let (_, exp_plus, exp_digits) = split_sign(exponent);
        format.exponent = Some(ExponentFormat {
            upper: body.as_bytes()[marker_pos] == b'E',
            plus_sign: exp_plus,
            digits: exp_digits.len(),
        });
    }
    let magnitude: f64 = lower.parse().ok()?;
    Some((signed(magnitude), format))
}

/// The shortest text that reads back as `value`, in the spelling the given
/// dialect resolves as a float.
pub fn format_float_default(value: f64, version: YamlVersion) -> String {
    if let Some(special) = special_float(value) {
        return special.to_owned();
    }
    let mut buffer = ryu::Buffer::new();
    let raw = buffer.format(value);
    let mut out = raw.to_ascii_lowercase();
    if version == YamlVersion::V1_1 && memchr(b'.', out.as_bytes()).is_none() {
        if let Some(pos) = memchr(b'e', out.as_bytes()) {
            out.insert_str(pos, ".0");
        }
    }
    out
}

fn special_float(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some(".nan")
    } else if value == f64::INFINITY {
        Some(".inf")
    } else if value == f64::NEG_INFINITY {
        Some("-.inf")
    } else {
        None
    }
}

/// Writes `value` with the precision and exponent shape in `format`.
pub fn format_float(value: f64, format: &FloatFormat) -> String {
    if let Some(special) = special_float(value) {
        return special.to_owned();
    }
    let magnitude = value.abs();
    let mut body = match format.exponent {
        None => {
            let mut text = format!("{:.*}", format.fraction_digits, magnitude);
            if format.dot && format.fraction_digits == 0 {
                text.push('.');
            }
            if format.leading_dot && text.starts_with("0.") {
                text.remove(0);
            }
            text
        }
        Some(exponent) => {
            let raw = format!("{:.*e}", format.fraction_digits, magnitude);
            let (mantissa, power) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
            let power: i32 = power.parse().unwrap_or(0);
            let mut text = mantissa.to_owned();
            if format.dot && format.fraction_digits == 0 {
                text.push('.');
            }
            text.push(if exponent.upper { 'E' } else { 'e' });
            if power < 0 {
                text.push('-');
            } else if exponent.plus_sign {
                text.push('+');
            }
            let digits = power.unsigned_abs().to_string();
            if digits.len() < exponent.digits {
                text.push_str(&"0".repeat(exponent.digits - digits.len()));
            }
            text.push_str(&digits);
            text
        }
    };
    if value.is_sign_negative() {
        body.insert(0, '-');
    } else if format.plus_sign {
        body.insert(0, '+');
    }
    body
}

/// Bool spellings of both dialects, matched case-insensitively the way the
/// resolver already narrowed them down.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "on" => Some(true),
        "no" | "n" | "false" | "off" => Some(false),
        _ => None,
    }
}
