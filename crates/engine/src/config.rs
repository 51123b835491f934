use std::str::FromStr;

use tracing::warn;

/// Engine settings sourced from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// `None` opens an in-memory database.
    pub database_path: Option<String>,
    pub default_page_size: u64,
    pub bookings_page_size: u64,
    pub sessions_page_size: u64,
    pub session_ttl_days: i64,
    pub invite_link_ttl_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            default_page_size: 20,
            bookings_page_size: 5,
            sessions_page_size: 3,
            session_ttl_days: 30,
            invite_link_ttl_days: 7,
        }
    }
}

impl EngineConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Reads `KENNEL_*` variables. Unparseable or non-positive values are
    /// ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let database_path = lookup("KENNEL_DATABASE_PATH").filter(|p| !p.trim().is_empty());
        Self {
            database_path,
            default_page_size: positive(&lookup, "KENNEL_PAGE_SIZE", defaults.default_page_size),
            bookings_page_size: positive(
                &lookup,
                "KENNEL_BOOKINGS_PAGE_SIZE",
                defaults.bookings_page_size,
            ),
            sessions_page_size: positive(
                &lookup,
                "KENNEL_SESSIONS_PAGE_SIZE",
                defaults.sessions_page_size,
            ),
            session_ttl_days: ttl_days(&lookup, "KENNEL_SESSION_TTL_DAYS", defaults.session_ttl_days),
            invite_link_ttl_days: ttl_days(
                &lookup,
                "KENNEL_INVITE_LINK_TTL_DAYS",
                defaults.invite_link_ttl_days,
            ),
        }
    }
}

/// Longest accepted session or invite link lifetime.
pub const MAX_TTL_DAYS: i64 = 3650;

fn ttl_days(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> i64 {
    let days = positive(lookup, key, default);
    if days > MAX_TTL_DAYS {
        warn!(key, days, max = MAX_TTL_DAYS, "ignoring oversized lifetime");
        return default;
    }
    days
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            warn!(key, value = %raw, "ignoring invalid setting");
            default
        }
    }
}
