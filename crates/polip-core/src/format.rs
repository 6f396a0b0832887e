//! Compact JSON text as the ingest service produces it.
//!
//! The service tags `JSON.stringify` output, so numbers must be written the
//! way ECMAScript's `Number.prototype.toString` writes them: integral
//! floats without a fraction (`21`, not `21.0`), plain decimals down to
//! `1e-7` (`0.000005`), and a signed exponent from `1e21` up (`1e+21`).
//! Everything else is serde_json's compact output.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};

/// serde_json formatter with ECMAScript number text.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcmaScriptFormatter;

impl Formatter for EcmaScriptFormatter {
    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(number_to_string(f64::from(value)).as_bytes())
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(number_to_string(value).as_bytes())
    }
}

/// Compact JSON bytes of an object.
pub fn to_compact_vec(map: &Map<String, Value>) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(128);
    let mut serializer = Serializer::with_formatter(&mut out, EcmaScriptFormatter);
    map.serialize(&mut serializer)?;
    Ok(out)
}

/// ECMAScript `Number::toString(x)` for a double.
pub fn number_to_string(x: f64) -> String {
    if x.is_nan() {
        return "NaN".into();
    }
    if x == 0.0 {
        return "0".into();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-Infinity" } else { "Infinity" }.into();
    }

    // `{:e}` gives the shortest round-tripping digits, e.g. "-2.15e1".
    let sci = format!("{:e}", x.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let exp: i32 = exp.parse().unwrap_or(0);

    let k = digits.len() as i32;
    // x = 0.d1d2..dk * 10^n
    let n = exp + 1;

    let mut out = String::with_capacity(digits.len() + 8);
    if x < 0.0 {
        out.push('-');
    }

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if n - 1 < 0 { '-' } else { '+' });
        out.push_str(&(n - 1).abs().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_numbers_match_ecmascript() {
        let cases: &[(f64, &str)] = &[
            (21.0, "21"),
            (-21.0, "-21"),
            (21.5, "21.5"),
            (0.1, "0.1"),
            (0.000005, "0.000005"),
            (0.000001, "0.000001"),
            (1e-7, "1e-7"),
            (1.5e-7, "1.5e-7"),
            (123456.789, "123456.789"),
            (1e20, "100000000000000000000"),
            (1e21, "1e+21"),
            (1.25e22, "1.25e+22"),
            (-0.0, "0"),
            (f64::MAX, "1.7976931348623157e+308"),
            (5e-324, "5e-324"),
            (4294967296.0, "4294967296"),
        ];
        for (x, expected) in cases {
            assert_eq!(number_to_string(*x), *expected, "{x:?}");
        }
    }

    #[test]
    fn test_compact_string_uses_ecmascript_numbers() {
        let value = json!({"t": 21.0, "v": 0.000005, "big": 1e21, "n": 7, "s": "x"});
        let Value::Object(map) = value else {
            unreachable!()
        };
        let text = String::from_utf8(to_compact_vec(&map).unwrap()).unwrap();
        assert_eq!(text, r#"{"t":21,"v":0.000005,"big":1e+21,"n":7,"s":"x"}"#);
    }

    proptest! {
        #[test]
        fn number_text_parses_back_to_the_same_double(x in any::<f64>()) {
            prop_assume!(x.is_finite());
            let text = number_to_string(x);
            let parsed: f64 = text.parse().unwrap();
            prop_assert_eq!(parsed, if x == 0.0 { 0.0 } else { x });
        }
    }
}
