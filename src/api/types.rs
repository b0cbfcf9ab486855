use serde::Deserialize;
use std::collections::HashMap;

/// Envelope every warframe.market v2 endpoint wraps its payload in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub api_version: String,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Payload of `orders/item/{name}/top`: the current best offers on each
/// side of the book, in the order the market ranks them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopOrders {
    pub sell: Vec<OrderWithUser>,
    pub buy: Vec<OrderWithUser>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithUser {
    pub id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub platinum: u32,
    pub quantity: u32,
    pub visible: bool,
    pub item_id: String,
    #[serde(default)]
    pub rank: Option<u32>,
    pub user: UserShort,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserShort {
    pub id: String,
    pub ingame_name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub status: UserStatus,
    #[serde(default)]
    pub reputation: i64,
}

/// Seller presence as the market reports it. Only `Ingame` sellers can
/// actually trade, so that is what the acceptance predicate requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Ingame,
    Online,
    Offline,
    #[serde(other)]
    Unknown,
}

/// Payload of `item/{id}`, used only when formatting notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInfo {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub max_rank: Option<u32>,
    #[serde(default)]
    pub i18n: HashMap<String, ItemI18n>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemI18n {
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub wiki_link: Option<String>,
}

impl ItemInfo {
    /// English display name, when the API sent one.
    pub fn display_name(&self) -> Option<&str> {
        self.i18n.get("en").map(|l| l.name.as_str())
    }
}
