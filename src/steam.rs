//! Pure parsers from upstream Steam payloads to domain records.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::AppError;
use crate::models::{GameSummary, UserGame};
use crate::normalize::{
    clamp_discount, discount_from_prices, effective_price, parse_app_id, value_to_f64,
    value_to_i64, value_to_string,
};

/// `communityvisibilitystate` value of a public profile.
const VISIBILITY_PUBLIC: i64 = 3;

/// Returns the `items` array of a featured-categories collection such as
/// `specials` or `top_sellers`.
pub fn featured_collection<'a>(root: &'a Value, key: &str) -> &'a [Value] {
    root.get(key)
        .and_then(|c| c.get("items"))
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Parses one item of a featured-categories collection.
pub fn parse_listing_item(item: &Value) -> Result<GameSummary, AppError> {
    let id = item_id(item)
        .ok_or_else(|| AppError::Decode("listing item without id".to_string()))?;
    let name = item
        .get("name")
        .and_then(value_to_string)
        .ok_or_else(|| AppError::Decode(format!("listing item {id} without name")))?;

    let image_url = ["large_capsule_image", "small_capsule_image", "header_image"]
        .iter()
        .find_map(|key| item.get(*key).and_then(value_to_string))
        .unwrap_or_default();

    let final_price = item.get("final_price").and_then(value_to_f64);
    let original_price = item.get("original_price").and_then(value_to_f64);

    let mut platforms = BTreeSet::new();
    for (flag, platform) in [
        ("windows_available", "windows"),
        ("mac_available", "mac"),
        ("linux_available", "linux"),
    ] {
        if item.get(flag).and_then(|v| v.as_bool()).unwrap_or(false) {
            platforms.insert(platform.to_string());
        }
    }

    Ok(GameSummary {
        price: effective_price(final_price, original_price),
        discount_percent: discount(item.get("discount_percent"), original_price, final_price),
        id,
        name,
        image_url,
        platforms,
        ..Default::default()
    })
}

/// Parses an item-detail payload (`{"<id>": {"success": .., "data": {..}}}`).
pub fn parse_app_details(id: &str, root: &Value) -> Result<GameSummary, AppError> {
    let obj = root
        .get(id)
        .ok_or_else(|| AppError::Decode(format!("appid {id} key missing in appdetails")))?;

    let success = obj
        .get("success")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !success {
        return Err(AppError::NotFound(format!("appid {id} not found")));
    }

    let data = obj
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| AppError::Decode("appdetails data missing".to_string()))?;

    let name = data
        .get("name")
        .and_then(value_to_string)
        .ok_or_else(|| AppError::Decode(format!("appid {id} without name")))?;

    let overview = data.get("price_overview");
    let final_price = overview.and_then(|p| p.get("final")).and_then(value_to_f64);
    let initial = overview.and_then(|p| p.get("initial")).and_then(value_to_f64);

    Ok(GameSummary {
        id: id.to_string(),
        name,
        image_url: data
            .get("header_image")
            .and_then(value_to_string)
            .unwrap_or_default(),
        price: effective_price(final_price, initial),
        discount_percent: discount(
            overview.and_then(|p| p.get("discount_percent")),
            initial,
            final_price,
        ),
        release_date: data
            .get("release_date")
            .and_then(|v| v.get("date"))
            .and_then(value_to_string)
            .unwrap_or_default(),
        developers: parse_string_list(data.get("developers")),
        platforms: parse_platforms(data.get("platforms")),
        genres: parse_genres(data.get("genres")),
        background_image_url: data
            .get("background")
            .and_then(value_to_string)
            .unwrap_or_default(),
    })
}

/// Returns the `items` array of a store-search response.
pub fn search_items(root: &Value) -> &[Value] {
    root.get("items")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Parses a search hit; hits without id or name are dropped.
pub fn parse_search_item(item: &Value) -> Option<GameSummary> {
    let id = item_id(item)?;
    let name = item.get("name").and_then(value_to_string)?;

    let price = item.get("price");
    let final_price = price
        .and_then(|p| p.get("final"))
        .or_else(|| item.get("final_price"))
        .and_then(value_to_f64);
    let initial = price
        .and_then(|p| p.get("initial"))
        .or_else(|| item.get("original_price"))
        .and_then(value_to_f64);
    let discount_field = price
        .and_then(|p| p.get("discount_percent"))
        .or_else(|| item.get("discount_percent"));

    Some(GameSummary {
        id,
        name,
        image_url: ["tiny_image", "header_image"]
            .iter()
            .find_map(|key| item.get(*key).and_then(value_to_string))
            .unwrap_or_default(),
        price: effective_price(final_price, initial),
        discount_percent: discount(discount_field, initial, final_price),
        release_date: item
            .get("release_date")
            .and_then(value_to_string)
            .unwrap_or_default(),
        developers: parse_string_list(item.get("developers").or_else(|| item.get("developer"))),
        platforms: parse_platforms(item.get("platforms")),
        genres: parse_genres(item.get("genres")),
        background_image_url: item
            .get("background")
            .and_then(value_to_string)
            .unwrap_or_default(),
    })
}

/// Identity fields of a player-summary response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub steam_id: String,
    pub username: String,
    pub avatar_url: String,
    pub visibility_state: i64,
}

impl PlayerSummary {
    pub fn is_public(&self) -> bool {
        self.visibility_state == VISIBILITY_PUBLIC
    }
}

/// Parses the first player of a player-summary response.
pub fn parse_player_summary(root: &Value) -> Option<PlayerSummary> {
    let player = root
        .get("response")
        .and_then(|r| r.get("players"))
        .and_then(|v| v.as_array())
        .and_then(|players| players.first())?;

    let steam_id = player.get("steamid").and_then(value_to_string)?;

    Some(PlayerSummary {
        steam_id,
        username: player
            .get("personaname")
            .and_then(value_to_string)
            .unwrap_or_default(),
        avatar_url: player
            .get("avatarfull")
            .and_then(value_to_string)
            .unwrap_or_default(),
        visibility_state: player
            .get("communityvisibilitystate")
            .and_then(value_to_i64)
            .unwrap_or_default(),
    })
}

/// Parses an owned-games response into games with zeroed achievement counts.
///
/// A response without a `games` array (library details hidden) is an empty
/// library, not an error.
pub fn parse_owned_games(root: &Value, media_base_url: &str) -> Result<Vec<UserGame>, AppError> {
    let response = root
        .get("response")
        .ok_or_else(|| AppError::Decode("owned games response missing".to_string()))?;
    let Some(games) = response.get("games").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(games.len());
    for g in games {
        let Some(appid) = g.get("appid").and_then(parse_app_id) else {
            continue;
        };
        if appid == "0" {
            continue;
        }

        let icon_hash = g
            .get("img_icon_url")
            .and_then(value_to_string)
            .unwrap_or_default();

        out.push(UserGame {
            image_url: game_icon_url(media_base_url, &appid, &icon_hash),
            name: g
                .get("name")
                .and_then(value_to_string)
                .unwrap_or_default(),
            total_playtime_minutes: g
                .get("playtime_forever")
                .and_then(value_to_i64)
                .unwrap_or_default()
                .max(0) as u64,
            total_achievements: 0,
            unlocked_achievements: 0,
            id: appid,
        });
    }

    Ok(out)
}

/// Counts `(total, unlocked)` achievements of a player-achievements response.
///
/// Games without stats report no `achievements` array and count as `(0, 0)`.
pub fn count_achievements(root: &Value) -> (u32, u32) {
    let Some(achievements) = root
        .get("playerstats")
        .and_then(|s| s.get("achievements"))
        .and_then(|v| v.as_array())
    else {
        return (0, 0);
    };

    let unlocked = achievements
        .iter()
        .filter(|a| a.get("achieved").and_then(value_to_i64) == Some(1))
        .count();

    (achievements.len() as u32, unlocked as u32)
}

/// Community icon URL for an owned game; empty when the hash is unknown.
pub fn game_icon_url(media_base_url: &str, appid: &str, icon_hash: &str) -> String {
    if icon_hash.is_empty() {
        return String::new();
    }
    format!(
        "{}/steamcommunity/public/images/apps/{appid}/{icon_hash}.jpg",
        media_base_url.trim_end_matches('/')
    )
}

fn item_id(item: &Value) -> Option<String> {
    item.get("id")
        .and_then(parse_app_id)
        .or_else(|| item.get("appid").and_then(parse_app_id))
}

fn discount(field: Option<&Value>, initial: Option<f64>, final_price: Option<f64>) -> u8 {
    if let Some(pct) = field.and_then(value_to_i64) {
        return clamp_discount(pct);
    }
    match (initial, final_price) {
        (Some(i), Some(f)) => discount_from_prices(i, f),
        _ => 0,
    }
}

/// Platforms from a `{"windows": true, ..}` flag map or a list of names.
/// Only flags set to `true` contribute.
fn parse_platforms(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Object(flags)) => flags
            .iter()
            .filter(|(_, v)| v.as_bool().unwrap_or(false))
            .map(|(k, _)| k.clone())
            .collect(),
        Some(Value::Array(names)) => names.iter().filter_map(value_to_string).collect(),
        _ => BTreeSet::new(),
    }
}

/// Genres from `[{"id": .., "description": ..}]` or a list of names.
fn parse_genres(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => item.get("description").and_then(value_to_string),
            other => value_to_string(other),
        })
        .collect()
}

fn parse_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_to_string).collect(),
        Some(other) => value_to_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn listing_item_prefers_large_capsule_and_final_price() {
        let item = json!({
            "id": 620,
            "name": "Portal 2",
            "discounted": true,
            "discount_percent": 90,
            "original_price": 99900,
            "final_price": 10000,
            "large_capsule_image": "https://cdn/large.jpg",
            "small_capsule_image": "https://cdn/small.jpg",
            "windows_available": true,
            "mac_available": false,
            "linux_available": true
        });

        let game = parse_listing_item(&item).unwrap();
        assert_eq!(game.id, "620");
        assert_eq!(game.name, "Portal 2");
        assert_eq!(game.image_url, "https://cdn/large.jpg");
        assert_eq!(game.price, 100.0);
        assert_eq!(game.discount_percent, 90);
        assert_eq!(
            game.platforms.into_iter().collect::<Vec<_>>(),
            vec!["linux".to_string(), "windows".to_string()]
        );
    }

    #[test]
    fn listing_item_falls_back_to_small_capsule_and_original_price() {
        let item = json!({
            "id": "20",
            "name": "Fallback",
            "final_price": 0,
            "original_price": 2000,
            "large_capsule_image": "",
            "small_capsule_image": "https://cdn/small.jpg"
        });

        let game = parse_listing_item(&item).unwrap();
        assert_eq!(game.image_url, "https://cdn/small.jpg");
        assert_eq!(game.price, 20.0);
        assert_eq!(game.discount_percent, 0);
    }

    #[test]
    fn listing_item_without_id_is_decode_error() {
        let err = parse_listing_item(&json!({"name": "No id"})).unwrap_err();
        assert_eq!(err.code(), "DECODE");
    }

    #[test]
    fn featured_collection_tolerates_missing_sections() {
        let root = json!({"specials": {"items": [{"id": 1}]}});
        assert_eq!(featured_collection(&root, "specials").len(), 1);
        assert!(featured_collection(&root, "top_sellers").is_empty());
    }

    fn details_payload() -> Value {
        json!({
            "570": {
                "success": true,
                "data": {
                    "name": "Dota 2",
                    "header_image": "https://cdn/header.jpg",
                    "background": "https://cdn/bg.jpg",
                    "price_overview": {"initial": 4000, "final": 0, "discount_percent": 0},
                    "release_date": {"coming_soon": false, "date": "Jul 9, 2013"},
                    "developers": ["Valve"],
                    "platforms": {"windows": true, "mac": true, "linux": false},
                    "genres": [
                        {"id": "1", "description": "Action"},
                        {"id": "37", "description": "Free to Play"}
                    ]
                }
            }
        })
    }

    #[test]
    fn app_details_extracts_full_record() {
        let game = parse_app_details("570", &details_payload()).unwrap();

        assert_eq!(game.name, "Dota 2");
        assert_eq!(game.price, 40.0);
        assert_eq!(game.release_date, "Jul 9, 2013");
        assert_eq!(game.developers, vec!["Valve".to_string()]);
        assert!(game.platforms.contains("windows"));
        assert!(game.platforms.contains("mac"));
        assert!(!game.platforms.contains("linux"));
        assert_eq!(game.genres, vec!["Action".to_string(), "Free to Play".to_string()]);
        assert_eq!(game.background_image_url, "https://cdn/bg.jpg");
    }

    #[test]
    fn app_details_unsuccessful_is_not_found() {
        let root = json!({"570": {"success": false}});
        let err = parse_app_details("570", &root).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn app_details_missing_key_is_decode_error() {
        let err = parse_app_details("1", &details_payload()).unwrap_err();
        assert_eq!(err.code(), "DECODE");
    }

    #[test]
    fn search_item_reads_inline_fields() {
        let item = json!({
            "type": "app",
            "appid": 400,
            "name": "Portal",
            "tiny_image": "https://cdn/tiny.jpg",
            "price": {"currency": "USD", "initial": 3000, "final": 1500},
            "platforms": {"windows": true, "mac": false, "linux": false}
        });

        let game = parse_search_item(&item).unwrap();
        assert_eq!(game.id, "400");
        assert_eq!(game.image_url, "https://cdn/tiny.jpg");
        assert_eq!(game.price, 15.0);
        assert_eq!(game.discount_percent, 50);
        assert_eq!(game.platforms.len(), 1);
        assert!(game.needs_enrichment());
    }

    #[test]
    fn search_item_prefers_id_over_appid() {
        let item = json!({"id": 1, "appid": 2, "name": "Both"});
        assert_eq!(parse_search_item(&item).unwrap().id, "1");
    }

    #[test]
    fn search_item_without_name_is_dropped() {
        assert!(parse_search_item(&json!({"id": 1})).is_none());
        assert!(parse_search_item(&json!({"name": "No id"})).is_none());
    }

    #[test]
    fn player_summary_visibility() {
        let root = json!({"response": {"players": [{
            "steamid": "76561197960287930",
            "personaname": "gabe",
            "avatarfull": "https://cdn/avatar.jpg",
            "communityvisibilitystate": 3
        }]}});

        let summary = parse_player_summary(&root).unwrap();
        assert_eq!(summary.username, "gabe");
        assert!(summary.is_public());

        let private = json!({"response": {"players": [{
            "steamid": "76561197960287930",
            "communityvisibilitystate": 1
        }]}});
        assert!(!parse_player_summary(&private).unwrap().is_public());

        assert!(parse_player_summary(&json!({"response": {"players": []}})).is_none());
    }

    #[test]
    fn owned_games_build_icon_urls() {
        let root = json!({"response": {"game_count": 2, "games": [
            {"appid": 10, "name": "Counter-Strike", "playtime_forever": 120, "img_icon_url": "abc"},
            {"appid": 20, "name": "No Icon", "playtime_forever": 0},
            {"appid": 0, "name": "Bogus"}
        ]}});

        let games = parse_owned_games(&root, "https://media.example/").unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(
            games[0].image_url,
            "https://media.example/steamcommunity/public/images/apps/10/abc.jpg"
        );
        assert_eq!(games[0].total_playtime_minutes, 120);
        assert_eq!(games[1].image_url, "");
    }

    #[test]
    fn owned_games_without_games_array_is_empty() {
        let games = parse_owned_games(&json!({"response": {}}), "https://m").unwrap();
        assert!(games.is_empty());
        assert!(parse_owned_games(&json!({}), "https://m").is_err());
    }

    #[test]
    fn achievements_are_counted() {
        let root = json!({"playerstats": {"achievements": [
            {"apiname": "a", "achieved": 1},
            {"apiname": "b", "achieved": 0},
            {"apiname": "c", "achieved": 1}
        ]}});
        assert_eq!(count_achievements(&root), (3, 2));

        let no_stats = json!({"playerstats": {"error": "Requested app has no stats", "success": false}});
        assert_eq!(count_achievements(&no_stats), (0, 0));
    }
}
