use super::FieldErrors;

/// Record `error` under `field` if present. The first error for a field wins.
pub fn check(errors: &mut FieldErrors, field: &str, error: Option<String>) {
    if let Some(message) = error {
        errors.entry(field.to_string()).or_insert(message);
    }
}

/// Required text with a character-count window.
pub fn validate_text(value: &str, field_name: &str, min_len: usize, max_len: usize) -> Option<String> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Some(format!("{field_name} is required"));
    }
    if len < min_len {
        return Some(format!("{field_name} must be at least {min_len} characters"));
    }
    if len > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Validate an email: something@something.something, no whitespace, max 254 chars.
pub fn validate_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some("Email is required".to_string());
    }
    if trimmed.len() > 254 || trimmed.chars().any(char::is_whitespace) {
        return Some("Email is invalid".to_string());
    }
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    };
    if valid { None } else { Some("Email is invalid".to_string()) }
}

pub fn validate_range(value: Option<u64>, field_name: &str, min: u64, max: u64) -> Option<String> {
    match value {
        None => Some(format!("{field_name} is required")),
        Some(v) if v < min || v > max => {
            Some(format!("{field_name} must be between {min} and {max}"))
        }
        Some(_) => None,
    }
}

/// Value must be one of `options`, compared case-insensitively.
pub fn validate_choice(value: &str, message: &str, options: &[&str]) -> Option<String> {
    let value = value.trim();
    if options.iter().any(|o| o.eq_ignore_ascii_case(value)) {
        None
    } else {
        Some(message.to_string())
    }
}
