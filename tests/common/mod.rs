//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mealplan_bot::bot::Bot;
use mealplan_bot::channels::{IncomingMessage, OutgoingResponse};
use mealplan_bot::config::BotConfig;
use mealplan_bot::error::{DatabaseError, GenerationError};
use mealplan_bot::generation::{
    GenerationRecord, GenerationRequest, MealPlanGenerator, MealRecord, NewGeneration, NewMeal,
};
use mealplan_bot::profile::{UserId, UserProfile};
use mealplan_bot::store::{Database, LibSqlBackend};
use mealplan_bot::subscription::Subscription;

/// Returns a scripted reply and remembers every request.
pub struct StubGenerator {
    reply: Mutex<Result<String, String>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl StubGenerator {
    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Ok(text.into())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(reason: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Err(reason.into())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reply(&self, text: impl Into<String>) {
        *self.reply.lock().unwrap() = Ok(text.into());
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl MealPlanGenerator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply
            .lock()
            .unwrap()
            .clone()
            .map_err(|reason| GenerationError::RequestFailed {
                provider: "stub".into(),
                reason,
            })
    }
}

/// Delegates to an in-memory store until told to fail.
pub struct FlakyStore {
    inner: LibSqlBackend,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_meals: AtomicBool,
}

impl FlakyStore {
    pub async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LibSqlBackend::new_memory().await.unwrap(),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_meals: AtomicBool::new(false),
        })
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Fail only plan records that carry meals, the way a rejected meal
    /// insert rolls back the whole record.
    pub fn fail_meals(&self, fail: bool) {
        self.fail_meals.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), DatabaseError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query("injected write failure".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), DatabaseError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Database for FlakyStore {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.inner.run_migrations().await
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.inner.put_profile(profile).await
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, DatabaseError> {
        self.check_read()?;
        self.inner.get_profile(user_id).await
    }

    async fn put_subscription(&self, subscription: &Subscription) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.inner.put_subscription(subscription).await
    }

    async fn get_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, DatabaseError> {
        self.check_read()?;
        self.inner.get_subscription(user_id).await
    }

    async fn append_generation(&self, generation: &NewGeneration) -> Result<i64, DatabaseError> {
        self.check_write()?;
        self.inner.append_generation(generation).await
    }

    async fn list_generations(
        &self,
        user_id: UserId,
        limit: Option<usize>,
    ) -> Result<Vec<GenerationRecord>, DatabaseError> {
        self.check_read()?;
        self.inner.list_generations(user_id, limit).await
    }

    async fn record_generation(
        &self,
        generation: &NewGeneration,
        meals: &[NewMeal],
    ) -> Result<(i64, Vec<i64>), DatabaseError> {
        self.check_write()?;
        if !meals.is_empty() && self.fail_meals.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query("injected meal insert failure".into()));
        }
        self.inner.record_generation(generation, meals).await
    }

    async fn recent_meals(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MealRecord>, DatabaseError> {
        self.check_read()?;
        self.inner.recent_meals(user_id, limit).await
    }
}

pub fn new_bot(store: Arc<dyn Database>, generator: Arc<dyn MealPlanGenerator>) -> Bot {
    Bot::new(store, generator, &BotConfig::default())
}

/// A text event received at `at`.
pub fn text_at(user_id: UserId, content: &str, at: DateTime<Utc>) -> IncomingMessage {
    let mut msg = IncomingMessage::new("test", user_id, content);
    msg.received_at = at;
    msg
}

/// A button press received at `at`.
pub fn select_at(user_id: UserId, token: &str, at: DateTime<Utc>) -> IncomingMessage {
    let mut msg = IncomingMessage::selection("test", user_id, token);
    msg.received_at = at;
    msg
}

pub fn text(user_id: UserId, content: &str) -> IncomingMessage {
    IncomingMessage::new("test", user_id, content)
}

pub fn select(user_id: UserId, token: &str) -> IncomingMessage {
    IncomingMessage::selection("test", user_id, token)
}

/// All replies to one event joined into one string.
pub async fn say(bot: &Bot, msg: IncomingMessage) -> String {
    bot.process(&msg)
        .await
        .iter()
        .map(OutgoingResponse::content)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Walk a user through the whole profile dialogue.
pub async fn create_profile(bot: &Bot, user_id: UserId) {
    say(bot, text(user_id, "/profile")).await;
    say(bot, text(user_id, "30")).await;
    say(bot, select(user_id, "gender:female")).await;
    say(bot, text(user_id, "60")).await;
    say(bot, text(user_id, "165")).await;
    say(bot, select(user_id, "goal:lose_weight")).await;
    say(bot, select(user_id, "diet:gluten_free")).await;
}
