//! Slash-command parsing.

use crate::generation::PlanScope;

/// A recognized (or unrecognized) slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Profile,
    Generate(PlanScope),
    Subscribe,
    Analytics,
    DetailedAnalytics,
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parse a message as a command. `None` when the text is not a command.
    ///
    /// Accepts Telegram's `/command@botname` form and ignores arguments.
    pub fn parse(content: &str) -> Option<Self> {
        let trimmed = content.trim();
        let rest = trimmed.strip_prefix('/')?;
        let word = rest.split_whitespace().next().unwrap_or("");
        let name = word.split('@').next().unwrap_or("").to_lowercase();

        let command = match name.as_str() {
            "start" => Self::Start,
            "help" | "?" => Self::Help,
            "profile" => Self::Profile,
            "generateforday" => Self::Generate(PlanScope::Daily),
            "generateforweek" => Self::Generate(PlanScope::Weekly),
            "subscribe" => Self::Subscribe,
            "analytics" => Self::Analytics,
            "detailed_analytics" => Self::DetailedAnalytics,
            "cancel" => Self::Cancel,
            _ => Self::Unknown(format!("/{name}")),
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("/profile"), Some(Command::Profile));
        assert_eq!(
            Command::parse("/generateforday"),
            Some(Command::Generate(PlanScope::Daily))
        );
        assert_eq!(
            Command::parse("/generateforweek"),
            Some(Command::Generate(PlanScope::Weekly))
        );
        assert_eq!(Command::parse("/subscribe"), Some(Command::Subscribe));
        assert_eq!(Command::parse("/analytics"), Some(Command::Analytics));
        assert_eq!(
            Command::parse("/detailed_analytics"),
            Some(Command::DetailedAnalytics)
        );
        assert_eq!(Command::parse("/cancel"), Some(Command::Cancel));
    }

    #[test]
    fn parse_is_lenient_about_case_whitespace_and_bot_suffix() {
        assert_eq!(Command::parse("  /PROFILE  "), Some(Command::Profile));
        assert_eq!(Command::parse("/start@meal_bot"), Some(Command::Start));
        assert_eq!(Command::parse("/cancel now"), Some(Command::Cancel));
    }

    #[test]
    fn parse_unknown_and_plain_text() {
        assert_eq!(
            Command::parse("/dance"),
            Some(Command::Unknown("/dance".into()))
        );
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("30"), None);
    }
}
