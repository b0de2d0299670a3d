//! Closed numeric ranges for dialogue fields.

use crate::error::ValidationError;

/// An inclusive integer range for a named field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericBounds {
    pub field: &'static str,
    pub unit: &'static str,
    pub min: u32,
    pub max: u32,
}

pub const AGE: NumericBounds = NumericBounds {
    field: "age",
    unit: "years",
    min: 15,
    max: 100,
};

pub const WEIGHT: NumericBounds = NumericBounds {
    field: "weight",
    unit: "kg",
    min: 30,
    max: 180,
};

pub const HEIGHT: NumericBounds = NumericBounds {
    field: "height",
    unit: "cm",
    min: 140,
    max: 200,
};

pub const CALORIES: NumericBounds = NumericBounds {
    field: "calories",
    unit: "kcal",
    min: 1000,
    max: 5000,
};

impl NumericBounds {
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Check an already-typed value.
    pub fn check(&self, value: u32) -> Result<u32, ValidationError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(self.out_of_range(i64::from(value)))
        }
    }

    /// Parse user text as an integer inside the range.
    ///
    /// Surrounding whitespace is ignored. A leading `+`, decimals and
    /// anything else non-numeric are rejected as not a number; negative
    /// numbers parse and fail the range check.
    pub fn parse(&self, input: &str) -> Result<u32, ValidationError> {
        let trimmed = input.trim();
        let not_a_number = || ValidationError::NotANumber {
            field: self.field.to_string(),
            min: self.min,
            max: self.max,
        };
        if trimmed.starts_with('+') {
            return Err(not_a_number());
        }
        let value: i64 = trimmed.parse().map_err(|_| not_a_number())?;
        if value < i64::from(self.min) || value > i64::from(self.max) {
            return Err(self.out_of_range(value));
        }
        // In range, so it fits.
        Ok(value as u32)
    }

    /// Range hint shown in prompts, e.g. `15-100 years`.
    pub fn hint(&self) -> String {
        format!("{}-{} {}", self.min, self.max, self.unit)
    }

    fn out_of_range(&self, value: i64) -> ValidationError {
        ValidationError::OutOfRange {
            field: self.field.to_string(),
            min: self.min,
            max: self.max,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive() {
        for bounds in [AGE, WEIGHT, HEIGHT, CALORIES] {
            assert_eq!(bounds.parse(&bounds.min.to_string()).unwrap(), bounds.min);
            assert_eq!(bounds.parse(&bounds.max.to_string()).unwrap(), bounds.max);
            assert!(matches!(
                bounds.parse(&(bounds.min - 1).to_string()),
                Err(ValidationError::OutOfRange { .. })
            ));
            assert!(matches!(
                bounds.parse(&(bounds.max + 1).to_string()),
                Err(ValidationError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn age_edges() {
        assert_eq!(AGE.parse("15").unwrap(), 15);
        assert_eq!(AGE.parse("100").unwrap(), 100);
        assert!(AGE.parse("14").is_err());
        assert!(AGE.parse("101").is_err());
    }

    #[test]
    fn non_numeric_input_rejected() {
        for input in ["", "abc", "25.5", "2 5", "twenty", "25kg", "+30", " +30 "] {
            assert!(
                matches!(AGE.parse(input), Err(ValidationError::NotANumber { .. })),
                "{input:?} should be rejected as non-numeric"
            );
        }
    }

    #[test]
    fn negative_and_huge_values_are_out_of_range() {
        assert!(matches!(
            AGE.parse("-20"),
            Err(ValidationError::OutOfRange { value: -20, .. })
        ));
        assert!(matches!(
            CALORIES.parse("99999999999"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(HEIGHT.parse("  180\n").unwrap(), 180);
    }

    #[test]
    fn hint_names_range_and_unit() {
        assert_eq!(WEIGHT.hint(), "30-180 kg");
    }
}
