//! Peephole-упрощение текста выражения.
//!
//! Работает только с формой `<операнд> <оператор> <операнд>` из трех слов,
//! все остальное возвращается как есть.

use log::trace;

/// Сначала тождества (`a + 0`, `a * 1`, `a * 0`), потом свертка констант
/// над целыми. Деление на ноль и переполнение не сворачиваются.
pub fn simplify_expression(expr: &str) -> String {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    let &[lhs, op, rhs] = parts.as_slice() else {
        return expr.to_string();
    };

    let simplified = apply_identity(lhs, op, rhs).or_else(|| fold_constants(lhs, op, rhs));
    match simplified {
        Some(result) => {
            trace!("simplified '{}' -> '{}'", expr, result);
            result
        }
        None => expr.to_string(),
    }
}

fn apply_identity(lhs: &str, op: &str, rhs: &str) -> Option<String> {
    match (lhs, op, rhs) {
        ("0", "+", "0") => Some("0".to_string()),
        (a, "+", "0") | ("0", "+", a) => Some(a.to_string()),
        (a, "*", "1") | ("1", "*", a) => Some(a.to_string()),
        (_, "*", "0") | ("0", "*", _) => Some("0".to_string()),
        _ => None,
    }
}

fn fold_constants(lhs: &str, op: &str, rhs: &str) -> Option<String> {
    let lhs: i64 = lhs.parse().ok()?;
    let rhs: i64 = rhs.parse().ok()?;
    let value = match op {
        "+" => lhs.checked_add(rhs)?,
        "-" => lhs.checked_sub(rhs)?,
        "*" => lhs.checked_mul(rhs)?,
        "/" => lhs.checked_div(rhs)?,
        _ => return None,
    };
    Some(value.to_string())
}
