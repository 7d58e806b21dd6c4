//! Routes decoded events to exactly one handler each.

use std::sync::Arc;

use tracing::info;

use crate::BoxFuture;
use crate::event::{Event, Module, Release};
use crate::notify::{NotificationSink, NotifyError, content};

/// One async callback per event kind.
pub trait EventHandler: Send + Sync {
    fn on_module_created<'a>(&'a self, module: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>>;

    fn on_release_created<'a>(
        &'a self,
        module: &'a Module,
        release: &'a Release,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;

    fn on_module_deleted<'a>(&'a self, module: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>>;
}

/// Hand `event` to the one handler for its kind and wait for it to finish.
pub async fn dispatch(event: &Event, handler: &dyn EventHandler) -> Result<(), NotifyError> {
    info!(kind = %event.kind(), module = %event.module().name, "Dispatching event");
    match event {
        Event::ModuleCreated { module } => handler.on_module_created(module).await,
        Event::ReleaseCreated { module, release } => {
            handler.on_release_created(module, release).await
        }
        Event::ModuleDeleted { module } => handler.on_module_deleted(module).await,
    }
}

/// Renders events into notifications and forwards them to a sink.
pub struct NotifyingHandler {
    sink: Arc<dyn NotificationSink>,
    module_url_base: String,
}

impl NotifyingHandler {
    pub fn new(sink: Arc<dyn NotificationSink>, module_url_base: impl Into<String>) -> Self {
        Self {
            sink,
            module_url_base: module_url_base.into(),
        }
    }
}

impl EventHandler for NotifyingHandler {
    fn on_module_created<'a>(&'a self, module: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let n = content::module_created(module, &self.module_url_base);
            self.sink.send(&n).await
        })
    }

    fn on_release_created<'a>(
        &'a self,
        module: &'a Module,
        release: &'a Release,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let n = content::release_created(module, release, &self.module_url_base);
            self.sink.send(&n).await
        })
    }

    fn on_module_deleted<'a>(&'a self, module: &'a Module) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            let n = content::module_deleted(module);
            self.sink.send(&n).await
        })
    }
}
