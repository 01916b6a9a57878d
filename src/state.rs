use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::bookings::repo::{BookingRepo, PgBookingRepo};
use crate::config::AppConfig;
use crate::mailer::{HttpMailer, LogMailer, Notifier};
use crate::memory::{MemoryBookingRepo, MemoryUserRepo};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Option<PgPool>,
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub bookings: Arc<dyn BookingRepo>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (db, users, bookings) = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .acquire_timeout(config.upstream_timeout)
                    .connect(url)
                    .await?;
                (
                    Some(db.clone()),
                    Arc::new(PgUserRepo::new(db.clone())) as Arc<dyn UserRepo>,
                    Arc::new(PgBookingRepo::new(db)) as Arc<dyn BookingRepo>,
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
                (
                    None,
                    Arc::new(MemoryUserRepo::default()) as Arc<dyn UserRepo>,
                    Arc::new(MemoryBookingRepo::default()) as Arc<dyn BookingRepo>,
                )
            }
        };

        let notifier = match &config.mail.api_url {
            Some(url) => Arc::new(HttpMailer::new(&config.mail, url, config.upstream_timeout)?)
                as Arc<dyn Notifier>,
            None => {
                tracing::info!("MAIL_API_URL not set; mail is logged instead of sent");
                Arc::new(LogMailer::new(&config.mail)) as Arc<dyn Notifier>
            }
        };

        Ok(Self {
            db,
            config,
            users,
            bookings,
            notifier,
        })
    }

    /// In-memory store, recording notifier and test JWT settings.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_notifier(Arc::new(crate::mailer::RecordingNotifier::default()))
    }

    #[cfg(test)]
    pub fn fake_with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db: None,
            config: Arc::new(AppConfig::for_tests()),
            users: Arc::new(MemoryUserRepo::default()),
            bookings: Arc::new(MemoryBookingRepo::default()),
            notifier,
        }
    }
}
