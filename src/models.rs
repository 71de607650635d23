use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub price: f64,
    pub discount_percent: u8,
    pub release_date: String,
    pub developers: Vec<String>,
    pub platforms: BTreeSet<String>,
    pub genres: Vec<String>,
    pub background_image_url: String,
}

impl GameSummary {
    /// True when any field a listing card needs is still missing.
    pub fn needs_enrichment(&self) -> bool {
        self.price <= 0.0
            || self.developers.is_empty()
            || self.platforms.is_empty()
            || self.genres.is_empty()
    }

    /// Publisher shown on the detail screen: the first developer, or empty.
    pub fn publisher(&self) -> &str {
        self.developers.first().map(String::as_str).unwrap_or_default()
    }

    /// Merges a detail record into a listing record.
    ///
    /// Detail fields win, except image and price/discount which keep the
    /// listing's values when they are set.
    pub fn merge_details(self, details: GameSummary) -> GameSummary {
        let (price, discount_percent) = if self.price > 0.0 {
            (self.price, self.discount_percent)
        } else {
            (details.price, details.discount_percent)
        };

        GameSummary {
            id: self.id,
            name: if details.name.is_empty() {
                self.name
            } else {
                details.name
            },
            image_url: if self.image_url.is_empty() {
                details.image_url
            } else {
                self.image_url
            },
            price,
            discount_percent,
            release_date: if details.release_date.is_empty() {
                self.release_date
            } else {
                details.release_date
            },
            developers: if details.developers.is_empty() {
                self.developers
            } else {
                details.developers
            },
            platforms: if details.platforms.is_empty() {
                self.platforms
            } else {
                details.platforms
            },
            genres: if details.genres.is_empty() {
                self.genres
            } else {
                details.genres
            },
            background_image_url: if details.background_image_url.is_empty() {
                self.background_image_url
            } else {
                details.background_image_url
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGame {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub total_achievements: u32,
    pub unlocked_achievements: u32,
    pub total_playtime_minutes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub avatar_url: String,
    pub steam_id: String,
    pub is_private: bool,
    pub owned_games: Vec<UserGame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Public,
    /// The profile exists but is not public; no library data was requested.
    Private,
    NotFound,
}

impl UserProfile {
    /// Profile returned when the upstream has no readable summary.
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ProfileStatus {
        if self.is_private {
            ProfileStatus::Private
        } else if self.steam_id.is_empty() {
            ProfileStatus::NotFound
        } else {
            ProfileStatus::Public
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub user_id: String,
    pub total_games: usize,
    pub total_playtime_minutes: u64,
    pub favorite_game: String,
    pub total_achievements: u64,
    pub unlocked_achievements: u64,
}

impl LibraryStats {
    pub fn from_profile(profile: &UserProfile) -> Self {
        let favorite_game = profile
            .owned_games
            .iter()
            .filter(|g| g.total_playtime_minutes > 0)
            .max_by_key(|g| g.total_playtime_minutes)
            .map(|g| g.name.clone())
            .unwrap_or_default();

        Self {
            user_id: profile.id.clone(),
            total_games: profile.owned_games.len(),
            total_playtime_minutes: profile
                .owned_games
                .iter()
                .map(|g| g.total_playtime_minutes)
                .sum(),
            favorite_game,
            total_achievements: profile
                .owned_games
                .iter()
                .map(|g| u64::from(g.total_achievements))
                .sum(),
            unlocked_achievements: profile
                .owned_games
                .iter()
                .map(|g| u64::from(g.unlocked_achievements))
                .sum(),
        }
    }
}
