//! Shipping address form.

use serde::{Deserialize, Serialize};

/// Shipping details entered at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Street address.
    pub address: String,
    pub city: String,
    /// State or province.
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

/// A problem with one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ShippingForm {
    /// Get full name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        [
            self.address.trim(),
            self.city.trim(),
            self.state.trim(),
            self.postal_code.trim(),
            self.country.trim(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Field-level problems; empty when the form can be submitted.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "Email is required"));
        } else if !is_valid_email(self.email.trim()) {
            errors.push(FieldError::new("email", "Enter a valid email address"));
        }

        let required = [
            ("first_name", "First name", &self.first_name),
            ("last_name", "Last name", &self.last_name),
            ("address", "Address", &self.address),
            ("city", "City", &self.city),
            ("state", "State / province", &self.state),
            ("postal_code", "Postal code", &self.postal_code),
            ("country", "Country", &self.country),
            ("phone", "Phone", &self.phone),
        ];
        for (field, label, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, format!("{label} is required")));
            }
        }

        errors
    }

    /// Whether every field passes validation.
    pub fn is_complete(&self) -> bool {
        self.validate().is_empty()
    }
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ShippingForm {
        ShippingForm {
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Smith".into(),
            address: "456 Oak Ave".into(),
            city: "Los Angeles".into(),
            state: "CA".into(),
            postal_code: "90001".into(),
            country: "US".into(),
            phone: "555-0100".into(),
        }
    }

    #[test]
    fn test_complete_form_passes() {
        assert!(complete().validate().is_empty());
        assert_eq!(complete().full_name(), "Jane Smith");
        assert!(complete().one_line().contains("Los Angeles"));
    }

    #[test]
    fn test_missing_fields_reported_individually() {
        let form = ShippingForm {
            city: "  ".into(),
            phone: String::new(),
            ..complete()
        };
        let fields: Vec<_> = form.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["city", "phone"]);
    }

    #[test]
    fn test_email_checks() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b..co"));

        let form = ShippingForm {
            email: "nope".into(),
            ..complete()
        };
        assert_eq!(
            form.validate(),
            vec![FieldError::new("email", "Enter a valid email address")]
        );
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(complete()).unwrap();
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["postalCode"], "90001");
    }
}
