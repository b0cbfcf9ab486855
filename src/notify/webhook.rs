use anyhow::Result;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::api::{ItemInfo, OrderWithUser};

const EMBED_COLOR: u32 = 0xe362ab;
const ASSETS_BASE_URL: &str = "https://warframe.market/static/assets/";
const PROFILE_BASE_URL: &str = "https://warframe.market/profile/";
const ITEMS_BASE_URL: &str = "https://warframe.market/items/";

/// Posts a Discord-style embed for each claimed order. One post per
/// claim, no retries; a failed delivery is the caller's to log.
pub struct WebhookClient {
    url: String,
    client: Client,
}

impl WebhookClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    pub async fn send(
        &self,
        order: &OrderWithUser,
        item: &ItemInfo,
        ping_ids: &[u64],
    ) -> Result<()> {
        let payload = build_payload(order, item, ping_ids);

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

pub fn build_payload(
    order: &OrderWithUser,
    item: &ItemInfo,
    ping_ids: &[u64],
) -> serde_json::Value {
    let en = item.i18n.get("en");
    let item_name = en.map(|l| l.name.as_str()).unwrap_or(item.slug.as_str());
    let rank_fmt = order
        .rank
        .map(|rank| format!(" (rank {})", rank))
        .unwrap_or_default();
    let avatar = order
        .user
        .avatar
        .as_deref()
        .unwrap_or("user/default-avatar.webp");

    let mut fields = vec![json!({
        "name": "Platinum",
        "value": order.platinum.to_string(),
        "inline": true,
    })];
    if order.quantity > 1 {
        fields.push(json!({
            "name": "Quantity",
            "value": order.quantity.to_string(),
            "inline": true,
        }));
    }

    let mut embed = json!({
        "title": format!("{}{}", item_name, rank_fmt),
        "url": format!("{}{}?type={}", ITEMS_BASE_URL, item.slug, order.order_type),
        "color": EMBED_COLOR,
        "timestamp": Utc::now().to_rfc3339(),
        "author": {
            "name": order.user.ingame_name,
            "url": format!("{}{}", PROFILE_BASE_URL, order.user.slug),
            "icon_url": format!("{}{}", ASSETS_BASE_URL, avatar),
        },
        "fields": fields,
    });

    if let Some(en) = en {
        embed["thumbnail"] = json!({
            "url": format!("{}{}", ASSETS_BASE_URL, en.icon),
        });
    }

    let content = ping_ids
        .iter()
        .map(|id| format!("<@{}>", id))
        .collect::<Vec<_>>()
        .join(" ");

    json!({
        "content": content,
        "embeds": [embed],
    })
}
