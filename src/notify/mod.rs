pub mod message;
pub mod sound;
pub mod webhook;

pub use webhook::WebhookClient;

use anyhow::Result;
use std::sync::Arc;

use crate::api::{OrderSource, OrderWithUser, RateLimiter};
use crate::core::config::NotifyConfig;
use crate::core::WatchedItem;
use crate::sniper::AcceptanceHandoff;

/// Everything that happens after a claim: audio cue, item lookup,
/// whisper to the clipboard, webhook post, console line. All of it runs
/// on a detached task, so the scheduler never waits on a notification
/// and a failed sink only produces a log line.
pub struct Notifier {
    inner: Arc<Inner>,
}

struct Inner {
    config: NotifyConfig,
    source: Arc<dyn OrderSource>,
    limiter: Arc<RateLimiter>,
    webhook: Option<WebhookClient>,
}

impl Notifier {
    pub fn new(
        config: NotifyConfig,
        source: Arc<dyn OrderSource>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let webhook = match config.webhook_url.as_deref() {
            Some(url) if !url.is_empty() => Some(WebhookClient::new(url)?),
            _ => None,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                source,
                limiter,
                webhook,
            }),
        })
    }
}

impl AcceptanceHandoff for Notifier {
    fn handoff(&self, order: OrderWithUser, item: WatchedItem) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.deliver(order, item).await;
        });
    }
}

impl Inner {
    async fn deliver(&self, order: OrderWithUser, item: WatchedItem) {
        if self.config.do_audio_notification {
            sound::play(&self.config.sound_path);
        }

        // The item lookup goes through the same request gate as the
        // monitors; notifications get no priority over coverage.
        self.limiter.acquire().await;
        let detail = match self.source.item_detail(&order.item_id).await {
            Ok(detail) => Some(detail),
            Err(err) => {
                tracing::error!("❌ Item lookup failed for order {}: {}", order.id, err);
                None
            }
        };

        let item_name = detail
            .as_ref()
            .and_then(|d| d.display_name())
            .unwrap_or(&item.name);

        let whisper = message::format_whisper(&order, item_name);
        tracing::info!("💰 {}", whisper);

        if self.config.copy_to_clipboard {
            copy_to_clipboard(whisper).await;
        }

        if let (Some(webhook), Some(detail)) = (&self.webhook, &detail) {
            if let Err(err) = webhook
                .send(&order, detail, &self.config.ping_discord_ids)
                .await
            {
                tracing::error!("❌ Failed to send webhook: {}", err);
            }
        }
    }
}

async fn copy_to_clipboard(text: String) {
    let result = tokio::task::spawn_blocking(move || -> Result<(), arboard::Error> {
        arboard::Clipboard::new()?.set_text(text)
    })
    .await;

    match result {
        Ok(Ok(())) => tracing::debug!("📋 Whisper copied to clipboard"),
        Ok(Err(err)) => tracing::error!("❌ Clipboard write failed: {}", err),
        Err(err) => tracing::error!("❌ Clipboard task failed: {}", err),
    }
}
