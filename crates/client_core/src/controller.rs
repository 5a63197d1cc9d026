//! The resource lifecycle controller: two independent lanes (users, products)
//! kept in sync with their backend collections, plus the shared success banner.
//!
//! Ordering guarantees are deliberately thin. The two lanes never wait on each
//! other, so their fetches may complete in either order. Within a lane the
//! post-create refresh starts only after the create succeeded, but nothing
//! serializes separate user actions: whichever fetch *response* lands last
//! owns the list.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use shared::{
    domain::{Product, ProductDraft, User, UserDraft},
    protocol::{parse_created, Created},
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::{PricePolicy, ServiceEndpoints, Settings},
    error::{ConfigError, CreateError, FetchError},
    lane::{LaneKind, LaneStatus, Resource},
    store::{ControllerEvent, ControllerSnapshot, StateStore, SuccessBanner},
    transport::HttpTransport,
};

pub struct ResourceController {
    transport: HttpTransport,
    endpoints: ServiceEndpoints,
    price_policy: PricePolicy,
    banner_ttl: Duration,
    store: Arc<StateStore>,
    banner_generation: AtomicU64,
    banner_timer: Mutex<Option<JoinHandle<()>>>,
    mount_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ResourceController {
    pub fn new(
        settings: &Settings,
        endpoints: &ServiceEndpoints,
    ) -> Result<Arc<Self>, ConfigError> {
        let transport = HttpTransport::new(settings.request_timeout)?;
        Ok(Self::with_transport(transport, settings, endpoints))
    }

    pub fn with_transport(
        transport: HttpTransport,
        settings: &Settings,
        endpoints: &ServiceEndpoints,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            endpoints: endpoints.clone(),
            price_policy: settings.price_policy,
            banner_ttl: settings.banner_ttl,
            store: Arc::new(StateStore::new()),
            banner_generation: AtomicU64::new(0),
            banner_timer: Mutex::new(None),
            mount_tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.store.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.store.subscribe_events()
    }

    /// Starts the initial load: one detached task per lane, no ordering
    /// between them. Failures land in the lane state.
    pub fn mount(self: &Arc<Self>) {
        self.store.update(|s| s.mounted = true);
        self.store.emit(ControllerEvent::Mounted);

        let users = {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let _ = this.fetch_users().await;
            })
        };
        let products = {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let _ = this.fetch_products().await;
            })
        };

        let mut tasks = self
            .mount_tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.extend([users, products]);
    }

    /// Tears the view down: discards lists and drafts, then cancels the banner
    /// timer and any in-flight mount loads. Fetches and creates still running
    /// elsewhere finish without touching the discarded state.
    pub fn unmount(&self) {
        self.store.reset();
        self.cancel_background_tasks();
        self.store.emit(ControllerEvent::Unmounted);
        info!("controller unmounted");
    }

    /// Fetches both lanes concurrently and returns each lane's outcome.
    pub async fn fetch_all(&self) -> (Result<(), FetchError>, Result<(), FetchError>) {
        tokio::join!(self.fetch_users(), self.fetch_products())
    }

    pub async fn fetch_users(&self) -> Result<(), FetchError> {
        self.fetch_lane::<User>().await
    }

    pub async fn fetch_products(&self) -> Result<(), FetchError> {
        self.fetch_lane::<Product>().await
    }

    pub async fn retry(&self, lane: LaneKind) -> Result<(), FetchError> {
        debug!(%lane, "retry requested");
        match lane {
            LaneKind::Users => self.fetch_users().await,
            LaneKind::Products => self.fetch_products().await,
        }
    }

    pub fn set_user_draft(&self, draft: UserDraft) {
        self.store.update(|s| s.users.draft = draft);
    }

    pub fn edit_user_draft(&self, edit: impl FnOnce(&mut UserDraft)) {
        self.store.update(|s| edit(&mut s.users.draft));
    }

    pub fn set_product_draft(&self, draft: ProductDraft) {
        self.store.update(|s| s.products.draft = draft);
    }

    pub fn edit_product_draft(&self, edit: impl FnOnce(&mut ProductDraft)) {
        self.store.update(|s| edit(&mut s.products.draft));
    }

    /// Submits the current user draft, then refreshes the user list.
    ///
    /// A refresh failure after a successful write does not turn this into an
    /// error; it shows up as the lane's error instead.
    pub async fn create_user(&self) -> Result<Created<User>, CreateError> {
        self.create_lane::<User>().await
    }

    /// Submits the current product draft, then refreshes the product list.
    pub async fn create_product(&self) -> Result<Created<Product>, CreateError> {
        self.create_lane::<Product>().await
    }

    async fn fetch_lane<R: Resource>(&self) -> Result<(), FetchError> {
        self.fetch_lane_in::<R>(self.store.epoch()).await
    }

    /// Fetches one lane on behalf of work started in `epoch`. The outcome is
    /// still returned after an unmount, but the store is left alone.
    async fn fetch_lane_in<R: Resource>(&self, epoch: u64) -> Result<(), FetchError> {
        let lane = R::LANE;
        if self.store.update_in(epoch, |s| {
            let state = R::lane_mut(s);
            state.loading = true;
            state.status = LaneStatus::Loading;
            state.error = None;
        }) {
            self.store.emit(ControllerEvent::LaneLoading { lane });
        }

        match self.transport.fetch_list::<R>(R::url(&self.endpoints)).await {
            Ok(items) => {
                let count = items.len();
                let applied = self.store.update_in(epoch, |s| {
                    let state = R::lane_mut(s);
                    state.items = items;
                    state.loading = false;
                    state.status = LaneStatus::Loaded;
                });
                if applied {
                    info!(%lane, count, "lane loaded");
                    self.store.emit(ControllerEvent::LaneLoaded { lane, count });
                } else {
                    debug!(%lane, count, "lane loaded after unmount, discarded");
                }
                Ok(())
            }
            Err(source) => {
                let message = source.to_string();
                warn!(%lane, status = ?source.status(), %message, "lane fetch failed");
                if self.store.update_in(epoch, |s| {
                    let state = R::lane_mut(s);
                    state.loading = false;
                    state.status = LaneStatus::Failed;
                    state.error = Some(message.clone());
                }) {
                    self.store.emit(ControllerEvent::LaneFailed { lane, message });
                }
                Err(FetchError { lane, source })
            }
        }
    }

    async fn create_lane<R: Resource>(&self) -> Result<Created<R>, CreateError> {
        let lane = R::LANE;
        let epoch = self.store.epoch();
        let draft = self.store.read(|s| R::lane(s).draft.clone());

        let outcome = match R::build_request(&draft, self.price_policy) {
            Ok(request) => {
                self.store.update_in(epoch, |s| {
                    let state = R::lane_mut(s);
                    state.submitting = true;
                    state.error = None;
                });
                self.transport
                    .post_json(R::url(&self.endpoints), &request)
                    .await
            }
            Err(err) => Err(err),
        };

        let body = match outcome {
            Ok(body) => body,
            Err(source) => {
                let message = source.to_string();
                warn!(%lane, status = ?source.status(), %message, "create failed");
                if self.store.update_in(epoch, |s| {
                    let state = R::lane_mut(s);
                    state.submitting = false;
                    state.error = Some(message.clone());
                }) {
                    self.store.emit(ControllerEvent::CreateFailed { lane, message });
                }
                return Err(CreateError { lane, source });
            }
        };

        let created = parse_created::<R>(&body, R::ENVELOPE_KEY).unwrap_or_else(|err| {
            warn!(%lane, error = %err, "create response envelope did not decode");
            Created::Acknowledged(None)
        });
        let message = success_message::<R>(&created);

        info!(%lane, %message, "entry created");
        let applied = self.store.update_in(epoch, |s| {
            let state = R::lane_mut(s);
            state.submitting = false;
            state.draft = R::Draft::default();
        });
        if !applied {
            debug!(%lane, "controller unmounted during create, skipping banner and refresh");
            return Ok(created);
        }
        self.store.emit(ControllerEvent::Created {
            lane,
            message: message.clone(),
        });
        self.show_banner_in(epoch, lane, message);

        if let Err(err) = self.fetch_lane_in::<R>(epoch).await {
            warn!(%lane, error = %err, "refresh after create failed");
        }
        Ok(created)
    }

    /// Shows `message` and (re)starts the expiry window. Must run inside a
    /// tokio runtime.
    pub(crate) fn show_banner(&self, lane: LaneKind, message: String) {
        self.show_banner_in(self.store.epoch(), lane, message);
    }

    fn show_banner_in(&self, epoch: u64, lane: LaneKind, message: String) {
        let generation = self.banner_generation.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.store.update_in(epoch, |s| {
            s.banner = Some(SuccessBanner {
                lane,
                message: message.clone(),
                generation,
            })
        }) {
            return;
        }
        self.store.emit(ControllerEvent::BannerShown { message });

        let store = Arc::clone(&self.store);
        let ttl = self.banner_ttl;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            store.clear_banner(generation);
        });

        let previous = self
            .banner_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(expiry);
        if let Some(previous) = previous {
            previous.abort();
        }
        // unmount resets before it cancels, so a timer stored after the
        // cancel still sees the new epoch here.
        if self.store.epoch() != epoch {
            if let Some(expiry) = self
                .banner_timer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
            {
                expiry.abort();
            }
        }
    }

    fn cancel_background_tasks(&self) {
        if let Some(timer) = self
            .banner_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
        for task in self
            .mount_tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
    }
}

impl Drop for ResourceController {
    fn drop(&mut self) {
        self.cancel_background_tasks();
    }
}

fn success_message<R: Resource>(created: &Created<R>) -> String {
    match created {
        Created::Record(record) => {
            format!("{} \"{}\" created successfully", R::NOUN, record.name())
        }
        Created::Acknowledged(Some(message)) if !message.trim().is_empty() => message.clone(),
        Created::Acknowledged(_) => format!("{} created successfully", R::NOUN),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
