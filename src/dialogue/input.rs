//! Interpretation of raw user input: blank detection, branch keywords and amounts.

use super::record::RecordType;

const EXPENSE_KEYWORD: &str = "gasto";
const GOAL_KEYWORD: &str = "meta";

/// Returns `None` for empty or whitespace-only input, otherwise the text untouched.
pub fn normalize(raw: &str) -> Option<&str> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Case-insensitive substring match; the expense keyword wins when both appear.
pub fn match_branch(input: &str) -> Option<RecordType> {
    let lower = input.to_lowercase();
    if lower.contains(EXPENSE_KEYWORD) {
        Some(RecordType::Expense)
    } else if lower.contains(GOAL_KEYWORD) {
        Some(RecordType::Goal)
    } else {
        None
    }
}

/// Why an amount was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountRejection {
    NotNumeric,
    Negative,
    NotPositive,
}

/// Extracts a positive amount from free text.
///
/// Every character that is not an ASCII digit or `.` is dropped, then the
/// longest leading `digits[.digits]` prefix is parsed. A `-` appearing before
/// the first digit marks the value as negative.
pub fn parse_amount(input: &str) -> Result<f64, AmountRejection> {
    let negative = input
        .chars()
        .take_while(|ch| !ch.is_ascii_digit())
        .any(|ch| ch == '-');

    let stripped: String = input
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    for (idx, ch) in stripped.char_indices() {
        if ch == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        end = idx + ch.len_utf8();
    }
    let candidate = &stripped[..end];
    if !candidate.chars().any(|ch| ch.is_ascii_digit()) {
        return Err(AmountRejection::NotNumeric);
    }

    let value: f64 = candidate
        .parse()
        .map_err(|_| AmountRejection::NotNumeric)?;
    if !value.is_finite() {
        return Err(AmountRejection::NotNumeric);
    }
    if negative && value > 0.0 {
        return Err(AmountRejection::Negative);
    }
    if value <= 0.0 {
        return Err(AmountRejection::NotPositive);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_dropped() {
        assert_eq!(normalize("   \t"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize(" Comida "), Some(" Comida "));
    }

    #[test]
    fn branch_keywords_match_anywhere() {
        assert_eq!(match_branch("Registrar Gasto"), Some(RecordType::Expense));
        assert_eq!(match_branch("nuevo GASTO ya"), Some(RecordType::Expense));
        assert_eq!(match_branch("Definir Meta"), Some(RecordType::Goal));
        assert_eq!(match_branch("metas"), Some(RecordType::Goal));
        assert_eq!(match_branch("hola"), None);
    }

    #[test]
    fn expense_keyword_takes_precedence() {
        assert_eq!(match_branch("meta de gasto"), Some(RecordType::Expense));
    }

    #[test]
    fn valid_numbers_parse_to_same_value() {
        assert_eq!(parse_amount("50"), Ok(50.0));
        assert_eq!(parse_amount("50.00"), Ok(50.0));
        assert_eq!(parse_amount("$1,200"), Ok(1200.0));
    }

    #[test]
    fn trailing_garbage_is_stripped() {
        assert_eq!(parse_amount("15.5abc"), Ok(15.5));
        assert_eq!(parse_amount("1.2.3"), Ok(1.2));
    }

    #[test]
    fn non_positive_and_non_numeric_are_rejected() {
        assert_eq!(parse_amount("0"), Err(AmountRejection::NotPositive));
        assert_eq!(parse_amount("0.000"), Err(AmountRejection::NotPositive));
        assert_eq!(parse_amount("-5"), Err(AmountRejection::Negative));
        assert_eq!(parse_amount("$-5"), Err(AmountRejection::Negative));
        assert_eq!(parse_amount("abc"), Err(AmountRejection::NotNumeric));
        assert_eq!(parse_amount("."), Err(AmountRejection::NotNumeric));
        assert_eq!(parse_amount(""), Err(AmountRejection::NotNumeric));
    }

    #[test]
    fn overflowing_digits_are_rejected() {
        let huge = "9".repeat(400);
        assert_eq!(parse_amount(&huge), Err(AmountRejection::NotNumeric));
    }
}
