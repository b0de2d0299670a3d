//! Static and rendered reply texts.

use chrono::{DateTime, Utc};

use crate::analytics::{self, DetailedUsage, TIMES_OF_DAY, UsageSummary, WEEKDAYS};
use crate::channels::{Button, Keyboard, OutgoingResponse};
use crate::choice::Choice;
use crate::generation::PlanScope;
use crate::profile::UserProfile;
use crate::profile::bounds::{AGE, CALORIES, HEIGHT, WEIGHT};
use crate::subscription::{Currency, Subscription, SubscriptionPlan};

pub const NO_SESSION_HINT: &str = "I didn't get that. Use /help to see what I can do.";

pub const EXPIRED_BUTTON: &str =
    "This button is no longer active. Use /help to see what I can do.";

pub fn welcome(user_name: Option<&str>) -> OutgoingResponse {
    let greeting = match user_name {
        Some(name) => format!("👋 Hi, {name}!"),
        None => "👋 Hi!".to_string(),
    };
    OutgoingResponse::text(format!(
        "{greeting}\n\
         I build personal meal plans from your profile and goals.\n\n\
         /profile - create or update your profile\n\
         /generateforday - meal plan for one day\n\
         /generateforweek - meal plan for a week (subscribers)\n\
         /subscribe - get a subscription\n\
         /analytics - your statistics\n\
         /help - how it works"
    ))
}

pub fn help(currency: Currency) -> OutgoingResponse {
    let prices: Vec<String> = SubscriptionPlan::ALL
        .iter()
        .map(|plan| format!("  • {}", plan.priced_label(currency)))
        .collect();

    OutgoingResponse::text(format!(
        "ℹ️ How it works\n\n\
         1. /profile asks for your age ({}), gender, weight ({}), height ({}), \
         goal and dietary restriction.\n\
         2. /generateforday builds a one-day plan for a calorie target ({}).\n\
         3. /generateforweek builds a seven-day plan and needs a subscription.\n\n\
         Subscription prices:\n{}\n\n\
         Other commands:\n\
         /analytics - usage summary\n\
         /detailed_analytics - when you generate plans\n\
         /cancel - stop the current dialogue",
        AGE.hint(),
        WEIGHT.hint(),
        HEIGHT.hint(),
        CALORIES.hint(),
        prices.join("\n"),
    ))
}

pub fn unknown_command(command: &str) -> OutgoingResponse {
    OutgoingResponse::text(format!(
        "Unknown command {command}. Use /help to see the available commands."
    ))
}

pub fn cancelled(had_session: bool) -> OutgoingResponse {
    if had_session {
        OutgoingResponse::text("Cancelled. Nothing was saved.")
    } else {
        OutgoingResponse::text("There is nothing to cancel.")
    }
}

fn subscription_line(subscription: Option<&Subscription>, now: DateTime<Utc>) -> String {
    match subscription {
        Some(sub) if sub.is_active_at(now) => format!(
            "✅ Subscription active until {}",
            sub.expires_at.format("%Y-%m-%d")
        ),
        Some(sub) => format!("⌛ Subscription expired on {}", sub.expires_at.format("%Y-%m-%d")),
        None => "No subscription".to_string(),
    }
}

pub fn subscribe_menu(
    currency: Currency,
    current: Option<&Subscription>,
    now: DateTime<Utc>,
) -> OutgoingResponse {
    let keyboard = Keyboard::column(
        SubscriptionPlan::ALL
            .iter()
            .map(|plan| Button::new(plan.priced_label(currency), plan.token())),
    );
    let status = match current {
        Some(_) => format!("{}\n\n", subscription_line(current, now)),
        None => String::new(),
    };
    OutgoingResponse::text(format!(
        "{status}💳 A subscription unlocks weekly meal plans.\nChoose a plan:"
    ))
    .with_keyboard(keyboard)
}

pub fn subscription_confirmed(subscription: &Subscription) -> OutgoingResponse {
    OutgoingResponse::text(format!(
        "🎉 Thank you! Your {} subscription is active until {}.\n\
         Use /generateforweek to get a weekly plan.",
        subscription.plan.label(),
        subscription.expires_at.format("%Y-%m-%d")
    ))
}

pub fn analytics_summary(
    profile: &UserProfile,
    subscription: Option<&Subscription>,
    summary: &UsageSummary,
    now: DateTime<Utc>,
) -> OutgoingResponse {
    OutgoingResponse::text(format!(
        "📊 Your statistics\n\n\
         {}\n\n\
         {}\n\n\
         Meal plans generated: {}\n\
         In the last 7 days: {}\n\
         Daily plans: {}\n\
         Weekly plans: {}",
        profile.summary(),
        subscription_line(subscription, now),
        summary.total,
        summary.last_7_days,
        analytics::scope_count(summary, PlanScope::Daily),
        analytics::scope_count(summary, PlanScope::Weekly),
    ))
}

pub fn detailed_analytics(usage: &DetailedUsage) -> OutgoingResponse {
    let mut text = String::from("📈 Detailed statistics\n\nBy weekday:\n");
    for (day, count) in WEEKDAYS.iter().zip(usage.by_weekday) {
        text.push_str(&format!("  {day}: {count}\n"));
    }
    text.push_str("\nBy time of day:\n");
    for (bucket, count) in TIMES_OF_DAY.iter().zip(usage.by_time_of_day) {
        text.push_str(&format!("  {bucket}: {count}\n"));
    }
    match usage.average_days_between {
        Some(days) => text.push_str(&format!(
            "\nOn average you generate a plan every {days:.1} days."
        )),
        None => text.push_str("\nNot enough plans yet to compute an average interval."),
    }
    OutgoingResponse::text(text)
}
