//! Test context for unified test setup
//!
//! Wires the full engine against the test database with a manual clock and a
//! recording ban sink.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use HelpChain::config::Settings;
use HelpChain::database::DatabaseService;
use HelpChain::models::{CreateUserRequest, HelpActivity, Package, User};
use HelpChain::services::{Clock, ManualClock, ServiceFactory};

use super::database_helper::TestDatabase;
use super::test_data::{dollars, test_epoch, RecordingBanSink, OPERATOR_ID};

pub struct TestContext {
    pub database: TestDatabase,
    pub db: DatabaseService,
    pub services: ServiceFactory,
    pub clock: ManualClock,
    pub ban_events: Arc<RecordingBanSink>,
    pub settings: Settings,
}

impl TestContext {
    /// `None` when no database is available
    pub async fn new() -> Option<Self> {
        Self::with_settings(|_| {}).await
    }

    /// Same as `new`, with engine settings adjusted before wiring
    pub async fn with_settings(adjust: impl FnOnce(&mut Settings)) -> Option<Self> {
        let database = TestDatabase::new().await?;

        let mut settings = Settings::default();
        settings.database.url = database.database_url.clone();
        settings.operators.ids = vec![OPERATOR_ID];
        adjust(&mut settings);

        let clock = ManualClock::new(test_epoch());
        let ban_events = Arc::new(RecordingBanSink::default());
        let db = DatabaseService::new(database.pool.clone());
        let services = ServiceFactory::new(db.clone(), &settings, Arc::new(clock.clone()), ban_events.clone());

        Some(Self {
            database,
            db,
            services,
            clock,
            ban_events,
            settings,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub async fn user(&self, name: &str) -> User {
        self.db
            .users
            .create(
                CreateUserRequest {
                    email: format!("{}@example.com", name.to_lowercase()),
                    name: name.to_string(),
                },
                self.clock.now(),
            )
            .await
            .expect("Failed to create user")
    }

    pub async fn package(&self, amount: i64) -> Package {
        self.db
            .packages
            .create(&format!("Package {}", amount), dollars(amount), 15, self.clock.now())
            .await
            .expect("Failed to create package")
    }

    /// Register an offer and move the clock a minute so pool order is stable
    pub async fn offer(&self, user: &User, package: &Package) -> HelpActivity {
        let activity = self
            .services
            .obligation_service
            .register_offer(user.id, package.id)
            .await
            .expect("Failed to register offer");
        self.advance(Duration::minutes(1));
        activity
    }

    /// Register a request (the user must already hold an offer)
    pub async fn request(&self, user: &User, package: &Package) -> HelpActivity {
        let activity = self
            .services
            .obligation_service
            .register_request(user.id, package.id)
            .await
            .expect("Failed to register request");
        self.advance(Duration::minutes(1));
        activity
    }

    pub async fn activity(&self, id: i64) -> HelpActivity {
        self.db
            .activities
            .find_by_id(id)
            .await
            .expect("Failed to load activity")
            .expect("Activity missing")
    }
}
