//! End-to-end flows through `Bot` with a stub provider.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};

use common::*;
use mealplan_bot::dialogue::DialogueState;
use mealplan_bot::generation::{ERROR_SENTINEL, MAX_CHUNK_CHARS, PlanScope};
use mealplan_bot::profile::{DietaryRestriction, Gender, Goal};
use mealplan_bot::store::{Database, LibSqlBackend};
use mealplan_bot::subscription::{Subscription, SubscriptionPlan};

const PLAN_WITH_MEALS: &str = "🍳 Breakfast: oatmeal with berries\n🥗 Lunch: lentil soup\n\
```meals\n\
[{\"slot\":\"breakfast\",\"name\":\"Oatmeal with berries\",\"calories\":450},\
{\"slot\":\"lunch\",\"name\":\"Lentil soup\",\"calories\":600}]\n\
```";

async fn memory_store() -> Arc<LibSqlBackend> {
    Arc::new(LibSqlBackend::new_memory().await.unwrap())
}

async fn order_daily(bot: &mealplan_bot::bot::Bot, user_id: i64, calories: &str) -> String {
    say(bot, text(user_id, "/generateforday")).await;
    say(bot, select(user_id, "meal:balanced")).await;
    say(bot, text(user_id, calories)).await
}

#[tokio::test]
async fn daily_plan_is_delivered_and_recorded_once() {
    let db = memory_store().await;
    let generator = StubGenerator::replying(PLAN_WITH_MEALS);
    let bot = new_bot(db.clone(), generator.clone());

    create_profile(&bot, 1).await;
    let reply = order_daily(&bot, 1, "2000").await;

    assert!(reply.contains("Breakfast: oatmeal"));
    assert!(!reply.contains("```meals"));

    let history = db.list_generations(1, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].scope, PlanScope::Daily);
    assert_eq!(history[0].calories, 2000);

    let meals = db.recent_meals(1, 10).await.unwrap();
    assert_eq!(meals.len(), 2);

    let request = generator.requests.lock().unwrap()[0].clone();
    assert_eq!(request.target_calories, 2000);
    assert_eq!(request.day_count, 1);
    assert_eq!(request.gender, Some(Gender::Female));
    assert_eq!(request.dietary_restriction, DietaryRestriction::GlutenFree);
    assert_eq!(bot.dialogue().state_of(1).await, None);
}

#[tokio::test]
async fn previous_meals_are_fed_into_the_next_request() {
    let db = memory_store().await;
    let generator = StubGenerator::replying(PLAN_WITH_MEALS);
    let bot = new_bot(db.clone(), generator.clone());

    create_profile(&bot, 1).await;
    order_daily(&bot, 1, "2000").await;
    order_daily(&bot, 1, "1800").await;

    let requests = generator.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].existing_meals.is_empty());
    assert_eq!(requests[1].existing_meals.len(), 2);
}

#[tokio::test]
async fn error_sentinel_is_shown_but_not_recorded() {
    let db = memory_store().await;
    let generator = StubGenerator::replying(format!("{ERROR_SENTINEL} quota exceeded"));
    let bot = new_bot(db.clone(), generator);

    create_profile(&bot, 1).await;
    let reply = order_daily(&bot, 1, "2000").await;

    assert!(reply.starts_with(ERROR_SENTINEL));
    assert!(db.list_generations(1, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn provider_failure_hides_details_and_records_nothing() {
    let db = memory_store().await;
    let generator = StubGenerator::failing("upstream 503 secret");
    let bot = new_bot(db.clone(), generator);

    create_profile(&bot, 1).await;
    let reply = order_daily(&bot, 1, "2000").await;

    assert!(reply.contains("Could not generate"));
    assert!(!reply.contains("secret"));
    assert!(db.list_generations(1, None).await.unwrap().is_empty());
    assert_eq!(bot.dialogue().state_of(1).await, None);
}

#[tokio::test]
async fn long_plan_is_chunked_in_order() {
    let db = memory_store().await;
    let payload = format!("{}{}{}", "a".repeat(4000), "b".repeat(4000), "c".repeat(1000));
    let generator = StubGenerator::replying(payload.clone());
    let bot = new_bot(db.clone(), generator);

    create_profile(&bot, 1).await;
    say(&bot, text(1, "/generateforday")).await;
    say(&bot, select(1, "meal:mediterranean")).await;
    let responses = bot.process(&text(1, "2500")).await;

    let chunks = &responses.last().unwrap().chunks;
    let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
    assert_eq!(lengths, vec![MAX_CHUNK_CHARS, MAX_CHUNK_CHARS, 1000]);
    assert_eq!(chunks.concat(), payload);
}

#[tokio::test]
async fn generation_without_profile_is_refused() {
    let db = memory_store().await;
    let generator = StubGenerator::replying(PLAN_WITH_MEALS);
    let bot = new_bot(db.clone(), generator.clone());

    let reply = say(&bot, text(1, "/generateforday")).await;
    assert!(reply.contains("/profile"));
    assert_eq!(bot.dialogue().state_of(1).await, None);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn weekly_requires_subscription_and_payment_unlocks_it() {
    let db = memory_store().await;
    let generator = StubGenerator::replying(PLAN_WITH_MEALS);
    let bot = new_bot(db.clone(), generator);

    create_profile(&bot, 1).await;
    let refused = say(&bot, text(1, "/generateforweek")).await;
    assert!(refused.contains("/subscribe"));
    assert_eq!(bot.dialogue().state_of(1).await, None);

    let invoice = bot
        .handle_message(&select(1, "subscribe:month"))
        .await
        .responses[0]
        .invoice
        .clone()
        .unwrap();
    let paid = mealplan_bot::channels::IncomingMessage::payment(
        "test",
        1,
        invoice.payload,
        invoice.currency,
    );
    assert!(say(&bot, paid).await.contains("active until"));

    say(&bot, text(1, "/generateforweek")).await;
    say(&bot, select(1, "meal:high_protein")).await;
    say(&bot, text(1, "2200")).await;

    let history = db.list_generations(1, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].scope, PlanScope::Weekly);
}

#[tokio::test]
async fn weekly_refused_when_subscription_lapses_mid_dialogue() {
    let db = memory_store().await;
    let generator = StubGenerator::replying(PLAN_WITH_MEALS);
    let bot = new_bot(db.clone(), generator.clone());
    create_profile(&bot, 1).await;

    let t0 = Utc::now();
    // Month subscription that runs out twelve hours after t0.
    db.put_subscription(&Subscription::activate(
        1,
        SubscriptionPlan::Month,
        "RUB",
        t0 - Duration::days(30) + Duration::hours(12),
    ))
    .await
    .unwrap();

    say(&bot, text_at(1, "/generateforweek", t0)).await;
    assert_eq!(
        bot.dialogue().state_of(1).await,
        Some(DialogueState::AwaitingMealType)
    );
    say(&bot, select_at(1, "meal:balanced", t0 + Duration::hours(1))).await;
    let reply = say(&bot, text_at(1, "2000", t0 + Duration::hours(13))).await;

    assert!(reply.contains("subscribers only"));
    assert!(db.list_generations(1, None).await.unwrap().is_empty());
    assert_eq!(generator.calls(), 0);
    assert_eq!(bot.dialogue().state_of(1).await, None);
}

#[tokio::test]
async fn repeated_profile_keeps_identical_fields() {
    let db = memory_store().await;
    let bot = new_bot(db.clone(), StubGenerator::replying(PLAN_WITH_MEALS));

    create_profile(&bot, 1).await;
    let first = db.get_profile(1).await.unwrap().unwrap();

    let opening = say(&bot, text(1, "/profile")).await;
    assert!(opening.contains("already have a profile"));
    say(&bot, select(1, "goal:lose_weight")).await;
    say(&bot, select(1, "diet:gluten_free")).await;

    let second = db.get_profile(1).await.unwrap().unwrap();
    assert_eq!(
        (second.age, second.gender, second.weight_kg, second.height_cm),
        (first.age, first.gender, first.weight_kg, first.height_cm)
    );
    assert_eq!(second.goal, Goal::LoseWeight);
    assert_eq!(second.dietary_restriction, first.dietary_restriction);
}

#[tokio::test]
async fn out_of_range_input_reprompts_without_advancing() {
    let db = memory_store().await;
    let bot = new_bot(db.clone(), StubGenerator::replying(PLAN_WITH_MEALS));

    say(&bot, text(1, "/profile")).await;
    let reply = say(&bot, text(1, "101")).await;
    assert!(reply.contains("15 to 100"));
    assert_eq!(bot.dialogue().state_of(1).await, Some(DialogueState::AwaitingAge));

    // Typed text where a button is expected.
    say(&bot, text(1, "100")).await;
    let reply = say(&bot, text(1, "female")).await;
    assert!(reply.contains("choose one of the options"));
    assert_eq!(
        bot.dialogue().state_of(1).await,
        Some(DialogueState::AwaitingGender)
    );
}

#[tokio::test]
async fn concurrent_events_for_one_user_make_one_transition() {
    let db = memory_store().await;
    let bot = Arc::new(new_bot(db.clone(), StubGenerator::replying(PLAN_WITH_MEALS)));

    for _ in 0..20 {
        say(&bot, text(1, "/profile")).await;

        let valid = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.handle_message(&text(1, "42")).await })
        };
        let invalid = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.handle_message(&text(1, "forty")).await })
        };
        valid.await.unwrap();
        invalid.await.unwrap();

        assert_eq!(
            bot.dialogue().state_of(1).await,
            Some(DialogueState::AwaitingGender)
        );
    }
}

#[tokio::test]
async fn users_do_not_share_sessions() {
    let db = memory_store().await;
    let bot = new_bot(db.clone(), StubGenerator::replying(PLAN_WITH_MEALS));

    say(&bot, text(1, "/profile")).await;
    say(&bot, text(2, "/profile")).await;
    say(&bot, text(1, "30")).await;

    assert_eq!(bot.dialogue().state_of(1).await, Some(DialogueState::AwaitingGender));
    assert_eq!(bot.dialogue().state_of(2).await, Some(DialogueState::AwaitingAge));
}

#[tokio::test]
async fn storage_failure_on_profile_commit_tears_down() {
    let store = FlakyStore::new().await;
    let bot = new_bot(store.clone(), StubGenerator::replying(PLAN_WITH_MEALS));

    say(&bot, text(1, "/profile")).await;
    say(&bot, text(1, "30")).await;
    say(&bot, select(1, "gender:skip")).await;
    say(&bot, text(1, "60")).await;
    say(&bot, text(1, "165")).await;
    say(&bot, select(1, "goal:maintain")).await;

    store.fail_writes(true);
    let reply = say(&bot, select(1, "diet:vegan")).await;
    store.fail_writes(false);

    assert!(reply.contains("Something went wrong"));
    assert_eq!(bot.dialogue().state_of(1).await, None);
    assert!(store.get_profile(1).await.unwrap().is_none());
}

#[tokio::test]
async fn storage_failure_after_generation_withholds_plan() {
    let store = FlakyStore::new().await;
    let bot = new_bot(store.clone(), StubGenerator::replying(PLAN_WITH_MEALS));
    create_profile(&bot, 1).await;

    say(&bot, text(1, "/generateforday")).await;
    say(&bot, select(1, "meal:low_carb")).await;
    store.fail_writes(true);
    let reply = say(&bot, text(1, "2000")).await;
    store.fail_writes(false);

    assert!(!reply.contains("Breakfast"));
    assert!(reply.contains("Something went wrong"));
    assert!(store.list_generations(1, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_meal_insert_withholds_plan_and_leaves_no_record() {
    let store = FlakyStore::new().await;
    let bot = new_bot(store.clone(), StubGenerator::replying(PLAN_WITH_MEALS));
    create_profile(&bot, 1).await;

    say(&bot, text(1, "/generateforday")).await;
    say(&bot, select(1, "meal:balanced")).await;
    store.fail_meals(true);
    let reply = say(&bot, text(1, "2000")).await;
    store.fail_meals(false);

    assert!(!reply.contains("Breakfast"));
    assert!(reply.contains("Something went wrong"));
    assert!(store.list_generations(1, None).await.unwrap().is_empty());
    assert!(store.recent_meals(1, 10).await.unwrap().is_empty());
    assert!(say(&bot, text(1, "/analytics")).await.contains("Meal plans generated: 0"));
}

#[tokio::test]
async fn storage_read_failure_refuses_commands_without_session() {
    let store = FlakyStore::new().await;
    let bot = new_bot(store.clone(), StubGenerator::replying(PLAN_WITH_MEALS));
    create_profile(&bot, 1).await;

    store.fail_reads(true);
    let generate = say(&bot, text(1, "/generateforday")).await;
    let profile = say(&bot, text(1, "/profile")).await;
    let weekly = say(&bot, text(1, "/generateforweek")).await;
    store.fail_reads(false);

    for reply in [&generate, &profile, &weekly] {
        assert!(reply.contains("Something went wrong"), "{reply}");
    }
    assert_eq!(bot.dialogue().state_of(1).await, None);

    // Reads recover and the dialogue starts normally.
    assert!(!say(&bot, text(1, "/generateforday")).await.contains("Something went wrong"));
    assert!(bot.dialogue().state_of(1).await.is_some());
}

#[tokio::test]
async fn cancel_discards_dialogue() {
    let db = memory_store().await;
    let bot = new_bot(db.clone(), StubGenerator::replying(PLAN_WITH_MEALS));

    say(&bot, text(1, "/profile")).await;
    say(&bot, text(1, "30")).await;
    assert!(say(&bot, text(1, "/cancel")).await.contains("Cancelled"));
    assert_eq!(bot.dialogue().state_of(1).await, None);
    assert!(db.get_profile(1).await.unwrap().is_none());
    assert!(say(&bot, text(1, "/cancel")).await.contains("nothing to cancel"));
}

#[tokio::test]
async fn analytics_reflect_generations() {
    let db = memory_store().await;
    let bot = new_bot(db.clone(), StubGenerator::replying(PLAN_WITH_MEALS));

    create_profile(&bot, 1).await;
    order_daily(&bot, 1, "2000").await;
    order_daily(&bot, 1, "2100").await;

    let summary = say(&bot, text(1, "/analytics")).await;
    assert!(summary.contains("Meal plans generated: 2"));
    assert!(summary.contains("In the last 7 days: 2"));
    assert!(summary.contains("Daily plans: 2"));
    assert!(summary.contains("No subscription"));

    let detailed = say(&bot, text(1, "/detailed_analytics")).await;
    assert!(detailed.contains("By weekday"));
    assert!(detailed.contains("every 0.0 days"));
}
