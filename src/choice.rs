//! Closed selection sets announced to the user as keyboard buttons.
//!
//! Every enum the user picks from (gender, goal, diet, meal type, plan)
//! implements [`Choice`]. Tokens have the form `<field>:<key>`, e.g.
//! `goal:maintain`, and are parsed back into the enum at the boundary.

use crate::error::ValidationError;

/// A closed set of options selectable from a keyboard.
pub trait Choice: Sized + Copy + PartialEq + 'static {
    /// Token prefix and field name used in validation messages.
    const FIELD: &'static str;

    /// Every option, in keyboard order.
    const ALL: &'static [Self];

    /// Stable machine name (also the storage representation).
    fn key(&self) -> &'static str;

    /// Human-readable button label.
    fn label(&self) -> &'static str;

    /// Keyboard token, `<field>:<key>`.
    fn token(&self) -> String {
        format!("{}:{}", Self::FIELD, self.key())
    }

    /// Look up an option by its machine name.
    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.key() == key)
    }

    /// Parse a full keyboard token. Anything not announced by
    /// [`Choice::ALL`] is rejected.
    fn from_token(token: &str) -> Result<Self, ValidationError> {
        let unknown = || ValidationError::UnknownToken {
            field: Self::FIELD.to_string(),
            token: token.to_string(),
        };
        let key = token
            .trim()
            .strip_prefix(Self::FIELD)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(unknown)?;
        Self::from_key(key).ok_or_else(unknown)
    }
}
