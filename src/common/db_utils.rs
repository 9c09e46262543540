// src/common/db_utils.rs

use crate::common::error::AppError;

/// Se o erro for violação de unicidade numa constraint cujo nome contém `hint`,
/// devolve o erro de domínio montado por `conflict`; caso contrário, o erro de banco.
pub(crate) fn map_unique_violation(
    err: sqlx::Error,
    hint: &str,
    conflict: impl FnOnce() -> AppError,
) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            if constraint.contains(hint) {
                return conflict();
            }
        }
    }
    err.into()
}

/// Telefone normalizado: só dígitos, com o `+` inicial preservado.
pub(crate) fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        format!("+{}", digits)
    } else {
        digits
    }
}

pub(crate) fn is_valid_phone(normalized: &str) -> bool {
    let digits = normalized.trim_start_matches('+');
    (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalization_strips_separators() {
        assert_eq!(normalize_phone(" 081-234 5678 "), "0812345678");
        assert_eq!(normalize_phone("+66 81 234 5678"), "+66812345678");
        assert!(is_valid_phone("0812345678"));
        assert!(is_valid_phone("+66812345678"));
        assert!(!is_valid_phone("1234"));
        assert!(!is_valid_phone(""));
    }
}
