pub const DEFAULT_COUNTRY_CODE: &str = "92";

/// Canonicalizes local and international spellings of a phone number into
/// digits-only international form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneNormalizer {
    country_code: String,
}

impl Default for PhoneNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_CODE)
    }
}

impl PhoneNormalizer {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self { country_code: country_code.into() }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn normalize(&self, raw: Option<&str>) -> Option<String> {
        let digits = raw?.chars().filter(char::is_ascii_digit).collect::<String>();
        if digits.is_empty() {
            return None;
        }

        if let Some(local) = digits.strip_prefix('0') {
            return Some(format!("{}{local}", self.country_code));
        }
        if digits.starts_with(&self.country_code) {
            return Some(digits);
        }
        if digits.len() == 10 {
            return Some(format!("{}{digits}", self.country_code));
        }

        Some(digits)
    }
}

pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    PhoneNormalizer::default().normalize(raw)
}
