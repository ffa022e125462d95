use std::fmt;

use serde::Deserialize;

use crate::error::{AppError, Res};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserRole {
    Admin,
    Supplier,
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Supplier => "supplier",
            UserRole::Customer => "customer",
        }
    }

    /// Roles given to an account created without a password.
    pub fn default_set() -> Vec<String> {
        vec![UserRole::Customer.as_str().to_string()]
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalizes a phone number to `+` followed by 10 to 15 digits.
///
/// Spaces, dashes, dots and parentheses are ignored; anything else is rejected.
pub fn normalize_phone(raw: &str) -> Res<String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for ch in rest.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Malformed phone number: {}",
                    raw
                )));
            }
        }
    }

    if !(10..=15).contains(&digits.len()) || (!plus && digits.starts_with('0')) {
        return Err(AppError::BadRequest(format!(
            "Malformed phone number: {}",
            raw
        )));
    }

    Ok(format!("+{}", digits))
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset pagination query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Validates the bounds and returns `(limit, offset)`.
    pub fn limit_offset(&self) -> Res<(i64, i64)> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 1 {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::BadRequest(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| AppError::BadRequest(format!("page {} is out of range", page)))?;

        Ok((page_size, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_page_of_ten_starts_at_ten() {
        assert_eq!(Pagination::new(2, 10).limit_offset().unwrap(), (10, 10));
    }

    #[test]
    fn missing_parameters_use_defaults() {
        let p = Pagination {
            page: None,
            page_size: None,
        };
        assert_eq!(p.limit_offset().unwrap(), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn out_of_range_pagination_is_rejected() {
        assert!(matches!(
            Pagination::new(1, 101).limit_offset(),
            Err(AppError::BadRequest(_))
        ));
        assert!(Pagination::new(1, 0).limit_offset().is_err());
        assert!(Pagination::new(0, 10).limit_offset().is_err());
    }

    #[test]
    fn page_too_large_for_an_offset_is_rejected() {
        assert!(matches!(
            Pagination::new(i64::MAX / 10, 100).limit_offset(),
            Err(AppError::BadRequest(_))
        ));
        assert!(Pagination::new(i64::MAX, 1).limit_offset().is_ok());
    }

    #[test]
    fn phone_numbers_are_normalized() {
        assert_eq!(
            normalize_phone(" +380 (50) 111-22-33 ").unwrap(),
            "+380501112233"
        );
        assert_eq!(normalize_phone("380501112233").unwrap(), "+380501112233");
    }

    #[test]
    fn malformed_phone_numbers_are_rejected() {
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("+38050abc2233").is_err());
        assert!(normalize_phone("0501112233").is_err());
    }
}
