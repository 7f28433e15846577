//! Currency string parsing.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::PRICE;
use crate::error::ExtractionError;

/// Parse a price cell such as "R 12,50", "12.50", "R1 234,56" or "R 1,234.56".
///
/// Currency symbols and footnote markers are stripped. The last `,` or `.` is
/// the decimal separator when it occurs once; a lone `,` followed by exactly
/// three digits is a thousands separator instead. Every other separator
/// (space, `,`, `.` or `'`) must group thousands: one kind only, three digits
/// per group. Anything else, such as two prices fused into one cell, is
/// malformed.
pub fn parse_price(raw: &str) -> Result<Decimal, ExtractionError> {
    let malformed = || ExtractionError::MalformedPrice(raw.to_string());

    let caps = PRICE.captures(raw.trim()).ok_or_else(malformed)?;
    let body = caps[1].trim();
    let (negative, body) = match body.strip_prefix(['+', '-']) {
        Some(rest) => (body.starts_with('-'), rest.trim_start()),
        None => (false, body),
    };

    let (groups, separators) = split_groups(body).ok_or_else(malformed)?;
    let normalized = join_groups(&groups, &separators).ok_or_else(malformed)?;

    let value = Decimal::from_str(&normalized).map_err(|_| malformed())?;
    Ok(if negative { -value } else { value })
}

/// Separator between two digit groups. Whitespace runs count as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    Space,
    Comma,
    Dot,
    Apostrophe,
}

fn split_groups(body: &str) -> Option<(Vec<&str>, Vec<Separator>)> {
    let mut groups = Vec::new();
    let mut separators = Vec::new();
    let mut start = None;
    let mut pending: Option<Separator> = None;

    for (i, c) in body.char_indices() {
        if c.is_ascii_digit() {
            if start.is_none() {
                if groups.is_empty() != pending.is_none() {
                    return None;
                }
                separators.extend(pending.take());
                start = Some(i);
            }
            continue;
        }

        if let Some(s) = start.take() {
            groups.push(&body[s..i]);
        }
        let separator = match c {
            ',' => Separator::Comma,
            '.' => Separator::Dot,
            '\'' => Separator::Apostrophe,
            c if c.is_whitespace() => Separator::Space,
            _ => return None,
        };
        pending = match pending {
            None => Some(separator),
            Some(Separator::Space) if separator == Separator::Space => pending,
            Some(_) => return None,
        };
    }

    match start {
        Some(s) if pending.is_none() => groups.push(&body[s..]),
        _ => return None,
    }
    Some((groups, separators))
}

fn join_groups(groups: &[&str], separators: &[Separator]) -> Option<String> {
    let Some((&last, rest)) = separators.split_last() else {
        return Some(groups.concat());
    };

    let decimal = match last {
        Separator::Comma | Separator::Dot if !rest.contains(&last) => {
            let lone_comma = last == Separator::Comma && !rest.contains(&Separator::Dot);
            let digits_after = groups[groups.len() - 1].len();
            !(lone_comma && digits_after == 3)
        }
        _ => false,
    };

    let (integer, fraction) = if decimal {
        (&groups[..groups.len() - 1], Some(groups[groups.len() - 1]))
    } else {
        (groups, None)
    };
    let grouping = if decimal { rest } else { separators };

    if let Some(&kind) = grouping.first() {
        if grouping.iter().any(|s| *s != kind) {
            return None;
        }
        if integer[0].len() > 3 || integer[1..].iter().any(|g| g.len() != 3) {
            return None;
        }
    }

    let mut out = integer.concat();
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    Some(out)
}

/// Check whether a cell holds a "no value" placeholder such as "-" or "N/A".
pub fn is_placeholder(raw: &str, placeholders: &[String]) -> bool {
    let lower = raw.trim().to_lowercase();
    placeholders.iter().any(|p| *p == lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_equivalent_price_spellings() {
        for raw in ["R 12,50", "12.50", " 12,50 ", "R12.50", "12,50 R", "ZAR 12.50", "12.50*"] {
            assert_eq!(parse_price(raw).unwrap(), dec("12.50"), "input {:?}", raw);
        }
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_price("R1 234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_price("R 1,234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_price("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_price("R5,234").unwrap(), dec("5234"));
        assert_eq!(parse_price("1\u{00a0}234 567,00").unwrap(), dec("1234567.00"));
        assert_eq!(parse_price("1,234,567").unwrap(), dec("1234567"));
        assert_eq!(parse_price("1.234.567").unwrap(), dec("1234567"));
        assert_eq!(parse_price("1'234.50").unwrap(), dec("1234.50"));
    }

    #[test]
    fn test_fused_prices_are_malformed() {
        for raw in ["12,50 13,00", "12.50 13.00", "95 99", "R 12,50 R 13,00", "1.23.456", "1 2345"] {
            assert!(
                matches!(parse_price(raw), Err(ExtractionError::MalformedPrice(_))),
                "input {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_malformed_prices() {
        for raw in ["N/A", "-", "", "abc", "12 apples", "R", "1.2.3,4,5"] {
            assert!(
                matches!(parse_price(raw), Err(ExtractionError::MalformedPrice(_))),
                "input {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_negative_price_parses() {
        // Sign is kept; the record invariant rejects it later.
        assert_eq!(parse_price("-3,00").unwrap(), dec("-3.00"));
    }

    #[test]
    fn test_placeholders() {
        let placeholders = vec!["".to_string(), "-".to_string(), "n/a".to_string()];
        assert!(is_placeholder(" N/A ", &placeholders));
        assert!(is_placeholder("", &placeholders));
        assert!(!is_placeholder("12", &placeholders));
    }
}
