use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::schema::settings;

pub const ADMIN_PIN_KEY: &str = "admin_pin";
pub const VOTING_ENABLED_KEY: &str = "voting_enabled";
pub const LEAGUE_CONFIG_KEY: &str = "league_config";

pub const DEFAULT_ADMIN_PIN: &str = "1234";

pub fn get(
    key: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Option<String> {
    settings::table
        .filter(settings::key.eq(key))
        .select(settings::value)
        .first::<String>(&mut *conn)
        .optional()
        .unwrap()
}

pub fn set(
    key: &str,
    value: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) {
    let n = diesel::insert_into(settings::table)
        .values((
            settings::key.eq(key),
            settings::value.eq(value),
            settings::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .on_conflict(settings::key)
        .do_update()
        .set((
            settings::value.eq(value),
            settings::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)
        .unwrap();
    assert_eq!(n, 1);
}

pub fn voting_enabled(
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> bool {
    get(VOTING_ENABLED_KEY, conn).as_deref() != Some("false")
}

pub fn set_voting_enabled(
    enabled: bool,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) {
    set(VOTING_ENABLED_KEY, if enabled { "true" } else { "false" }, conn);
}

/// PINs are stored as argon2 hashes, never plaintext.
pub fn set_admin_pin(
    pin: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .unwrap()
        .to_string();
    set(ADMIN_PIN_KEY, &hash, conn);
}

pub fn verify_admin_pin(
    pin: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> bool {
    let Some(stored) = get(ADMIN_PIN_KEY, conn) else {
        return false;
    };
    let Ok(parsed) = PasswordHash::new(&stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}

/// Season shape and naming, stored as a TOML document so the admin page
/// can round-trip it through a textarea.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LeagueConfig {
    pub name: String,
    pub abbrv: String,
    /// Weeks 1..=regular_weeks count toward standings.
    pub regular_weeks: i64,
    /// The playoffs run from `regular_weeks + 1` to `total_weeks`; the
    /// final week is championship week.
    pub total_weeks: i64,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        LeagueConfig {
            name: "Midweek Basketball League".to_string(),
            abbrv: "MWBL".to_string(),
            regular_weeks: 7,
            total_weeks: 9,
        }
    }
}

impl LeagueConfig {
    pub fn load(conn: &mut impl LoadConnection<Backend = Sqlite>) -> Self {
        get(LEAGUE_CONFIG_KEY, conn)
            .and_then(|raw| toml::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn store(&self, conn: &mut impl LoadConnection<Backend = Sqlite>) {
        set(LEAGUE_CONFIG_KEY, &toml::to_string(self).unwrap(), conn);
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() || self.abbrv.trim().is_empty() {
            return Err("name and abbrv must not be empty".to_string());
        }
        if self.regular_weeks < 1 {
            return Err("regular_weeks must be at least 1".to_string());
        }
        if self.total_weeks < self.regular_weeks {
            return Err(
                "total_weeks must not be less than regular_weeks".to_string()
            );
        }
        Ok(())
    }

    pub fn is_playoff_week(&self, week: i64) -> bool {
        week > self.regular_weeks
    }

    /// Pages and feeds treat any out-of-range week request as the
    /// nearest real one.
    pub fn clamp_week(&self, week: i64) -> i64 {
        week.clamp(1, self.total_weeks)
    }

    /// Short label for the week pills: "Wk 3", "Semis", "Finals".
    pub fn week_label(&self, week: i64) -> String {
        if week >= self.total_weeks {
            "Finals".to_string()
        } else if week > self.regular_weeks {
            "Semis".to_string()
        } else {
            format!("Wk {week}")
        }
    }

    /// Long header above a week's games.
    pub fn week_header(&self, week: i64) -> String {
        if week >= self.total_weeks {
            "Championship Week".to_string()
        } else if week > self.regular_weeks {
            format!("Week {week} — Play-in & Semifinals")
        } else if week == self.regular_weeks {
            format!("Week {week} — Final Regular Season")
        } else {
            format!("Week {week}")
        }
    }
}

/// Seeds the settings table on first startup. Existing values are left
/// alone, so a changed PIN survives restarts.
pub fn ensure_defaults(conn: &mut impl LoadConnection<Backend = Sqlite>) {
    if get(ADMIN_PIN_KEY, conn).is_none() {
        set_admin_pin(DEFAULT_ADMIN_PIN, conn);
    }
    if get(VOTING_ENABLED_KEY, conn).is_none() {
        set(VOTING_ENABLED_KEY, "true", conn);
    }
    if get(LEAGUE_CONFIG_KEY, conn).is_none() {
        LeagueConfig::default().store(conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_labels() {
        let config = LeagueConfig::default();
        assert_eq!(config.week_label(3), "Wk 3");
        assert_eq!(config.week_label(8), "Semis");
        assert_eq!(config.week_label(9), "Finals");
        assert_eq!(config.week_header(7), "Week 7 — Final Regular Season");
        assert_eq!(config.week_header(9), "Championship Week");
    }

    #[test]
    fn test_clamp_week() {
        let config = LeagueConfig::default();
        assert_eq!(config.clamp_week(0), 1);
        assert_eq!(config.clamp_week(-2), 1);
        assert_eq!(config.clamp_week(4), 4);
        assert_eq!(config.clamp_week(999), config.total_weeks);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = LeagueConfig::default();
        let raw = toml::to_string(&config).unwrap();
        assert_eq!(toml::from_str::<LeagueConfig>(&raw).unwrap(), config);
    }

    #[test]
    fn test_validate() {
        let mut config = LeagueConfig::default();
        assert!(config.validate().is_ok());
        config.total_weeks = 3;
        assert!(config.validate().is_err());
    }
}
