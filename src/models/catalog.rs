//! Catalog item model and related types.
//!
//! Every item shares a common envelope (title, creator, copy count) and
//! carries a kind-specific payload in [`ItemDetails`]. Persistence keeps all
//! kinds in one `catalog_items` table, discriminated by `media_type`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::{error::AppError, lending::Availability};

/// Kind of catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Book,
    Video,
    Audio,
    BoardGame,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Book => "book",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::BoardGame => "board_game",
        }
    }

    /// Board games are consult-only
    pub fn is_lendable(&self) -> bool {
        !matches!(self, MediaType::BoardGame)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "book" => Ok(MediaType::Book),
            "video" | "dvd" => Ok(MediaType::Video),
            "audio" | "cd" => Ok(MediaType::Audio),
            "board_game" => Ok(MediaType::BoardGame),
            _ => Err(format!("Invalid media type: {}", s)),
        }
    }
}

/// Kind-specific attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "media_type", rename_all = "snake_case")]
pub enum ItemDetails {
    Book,
    Video {
        /// Runtime in minutes
        runtime_minutes: i32,
    },
    Audio {
        track_count: i32,
        performer: String,
    },
    BoardGame {
        publisher: String,
        min_players: i32,
        max_players: i32,
    },
}

impl ItemDetails {
    pub fn media_type(&self) -> MediaType {
        match self {
            ItemDetails::Book => MediaType::Book,
            ItemDetails::Video { .. } => MediaType::Video,
            ItemDetails::Audio { .. } => MediaType::Audio,
            ItemDetails::BoardGame { .. } => MediaType::BoardGame,
        }
    }
}

fn validate_details(details: &ItemDetails) -> Result<(), ValidationError> {
    match details {
        ItemDetails::Book => Ok(()),
        ItemDetails::Video { runtime_minutes } if *runtime_minutes <= 0 => {
            Err(ValidationError::new("runtime_minutes must be positive"))
        }
        ItemDetails::Audio { track_count, .. } if *track_count <= 0 => {
            Err(ValidationError::new("track_count must be positive"))
        }
        ItemDetails::Audio { performer, .. } if performer.trim().is_empty() => {
            Err(ValidationError::new("performer is required"))
        }
        ItemDetails::BoardGame { publisher, .. } if publisher.trim().is_empty() => {
            Err(ValidationError::new("publisher is required"))
        }
        ItemDetails::BoardGame { min_players, max_players, .. }
            if *min_players < 1 || max_players < min_players =>
        {
            Err(ValidationError::new("player range is invalid"))
        }
        _ => Ok(()),
    }
}

/// Catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogItem {
    pub id: i32,
    pub title: String,
    /// Author, director or composer, depending on the kind
    pub creator: String,
    pub total_copies: i32,
    pub created_at: NaiveDate,
    #[schema(value_type = Object)]
    pub details: ItemDetails,
}

impl CatalogItem {
    pub fn media_type(&self) -> MediaType {
        self.details.media_type()
    }

    pub fn is_lendable(&self) -> bool {
        self.media_type().is_lendable()
    }
}

impl std::fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            ItemDetails::BoardGame { min_players, max_players, .. } => {
                write!(f, "{} ({}-{} players)", self.title, min_players, max_players)
            }
            _ if self.creator.is_empty() => write!(f, "{}", self.title),
            _ => write!(f, "{} - {}", self.title, self.creator),
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct CatalogItemRow {
    pub id: i32,
    pub media_type: String,
    pub title: String,
    pub creator: String,
    pub total_copies: i32,
    pub created_at: NaiveDate,
    pub runtime_minutes: Option<i32>,
    pub track_count: Option<i32>,
    pub performer: Option<String>,
    pub publisher: Option<String>,
    pub min_players: Option<i32>,
    pub max_players: Option<i32>,
}

impl TryFrom<CatalogItemRow> for CatalogItem {
    type Error = AppError;

    fn try_from(row: CatalogItemRow) -> Result<Self, Self::Error> {
        let missing = |column: &str| {
            AppError::Internal(format!("Catalog item {} has no {}", row.id, column))
        };

        let media_type: MediaType = row.media_type.parse().map_err(AppError::Internal)?;
        let details = match media_type {
            MediaType::Book => ItemDetails::Book,
            MediaType::Video => ItemDetails::Video {
                runtime_minutes: row.runtime_minutes.ok_or_else(|| missing("runtime_minutes"))?,
            },
            MediaType::Audio => ItemDetails::Audio {
                track_count: row.track_count.ok_or_else(|| missing("track_count"))?,
                performer: row.performer.clone().ok_or_else(|| missing("performer"))?,
            },
            MediaType::BoardGame => ItemDetails::BoardGame {
                publisher: row.publisher.clone().ok_or_else(|| missing("publisher"))?,
                min_players: row.min_players.ok_or_else(|| missing("min_players"))?,
                max_players: row.max_players.ok_or_else(|| missing("max_players"))?,
            },
        };

        Ok(CatalogItem {
            id: row.id,
            title: row.title,
            creator: row.creator,
            total_copies: row.total_copies,
            created_at: row.created_at,
            details,
        })
    }
}

/// Catalog item with live availability, for lists
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogItemSummary {
    #[serde(flatten)]
    pub item: CatalogItem,
    pub available_copies: i64,
    pub is_available: bool,
}

impl CatalogItemSummary {
    pub fn new(item: CatalogItem, open_loans: i64) -> Self {
        let availability = Availability::new(&item, open_loans);
        Self {
            available_copies: availability.available_copies(),
            is_available: availability.is_available(),
            item,
        }
    }
}

/// Availability of one item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub item_id: i32,
    pub lendable: bool,
    pub total_copies: i32,
    pub open_loans: i64,
    pub available_copies: i64,
    pub is_available: bool,
}

impl From<Availability> for AvailabilityResponse {
    fn from(a: Availability) -> Self {
        Self {
            item_id: a.item_id,
            lendable: a.lendable,
            total_copies: a.total_copies,
            open_loans: a.open_loans,
            available_copies: a.available_copies(),
            is_available: a.is_available(),
        }
    }
}

/// Catalog query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct CatalogQuery {
    pub media_type: Option<MediaType>,
    pub title: Option<String>,
    /// Only items with at least one copy available for loan
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCatalogItem {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 200, message = "Creator must be at most 200 characters"))]
    pub creator: String,
    #[serde(default = "default_copies")]
    #[validate(range(min = 1, message = "An item needs at least one copy"))]
    pub total_copies: i32,
    #[schema(value_type = Object)]
    #[validate(custom(function = "validate_details"))]
    pub details: ItemDetails,
}

fn default_copies() -> i32 {
    1
}

/// Update item request. The kind of an item cannot change.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCatalogItem {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 200, message = "Creator must be at most 200 characters"))]
    pub creator: Option<String>,
    #[validate(range(min = 1, message = "An item needs at least one copy"))]
    pub total_copies: Option<i32>,
    #[schema(value_type = Option<Object>)]
    #[validate(custom(function = "validate_details"))]
    pub details: Option<ItemDetails>,
}
