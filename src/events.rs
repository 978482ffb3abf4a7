use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use poise::serenity_prelude::{Context, FullEvent};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

#[async_trait]
pub trait EventHandler: Send + Sync + Debug {
    fn name(&self) -> &str;
    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Default)]
pub struct EventManager {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_handler(&self, handler: impl EventHandler + 'static) {
        debug!("Registering event handler {}", handler.name());
        self.handlers.write().await.push(Arc::new(handler));
    }

    /// Runs every registered handler on its own task. Handler failures are
    /// logged and never reach the gateway loop.
    pub async fn handle_event(&self, ctx: &Context, event: &FullEvent) {
        let handlers = self.handlers.read().await.clone();
        let mut tasks = FuturesUnordered::new();

        for handler in handlers {
            let ctx = ctx.clone();
            let event = event.clone();

            tasks.push(tokio::spawn(async move {
                if let Err(e) = handler.handle(&ctx, &event).await {
                    error!("Error in event handler {}: {}", handler.name(), e);
                }
            }));
        }

        while let Some(joined) = tasks.next().await {
            if let Err(e) = joined {
                error!("Event handler task panicked: {}", e);
            }
        }
    }
}
