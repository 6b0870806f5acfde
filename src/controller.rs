//! Settings synchronization between the watch face and the settings page.
//!
//! The controller owns the pending-display flag and the handshake state.
//! Every transition runs to completion inside [`SyncController::handle`], and
//! [`SyncController::run`] feeds it one [`BridgeEvent`] at a time, so
//! transitions never interleave.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::BridgeError;
use crate::page::{SettingsPage, settings_url};
use crate::protocol::{
    ConfigurationResult, DeviceMessage, DeviceMessenger, DeviceObserver, OutboundMessage,
    ProtocolVariant, SettingsMessage, make_settings_message, make_setup_info_request,
};
use crate::store::{KeyValueStorage, SettingsStore};

const TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The device channel is open.
    Ready,
    /// The user asked to configure the watch face.
    ShowConfiguration,
    /// The device pushed a message.
    DeviceMessage(DeviceMessage),
    /// The settings page closed, with its raw (still encoded) response.
    WebviewClosed(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    AwaitingSetupInfo,
    ShowingSettingsPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Cancelled,
    Applied(SettingsMessage),
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub variant: ProtocolVariant,
    pub settings_page: Url,
    /// Callback URL handed to the page so it can report its result.
    pub return_to: Option<String>,
    /// How long to wait for setup info before opening the page anyway.
    pub setup_info_timeout: Option<Duration>,
}

pub struct SyncController<S, M, P>
where
    S: KeyValueStorage,
    M: DeviceMessenger,
    P: SettingsPage,
{
    store: SettingsStore<S>,
    messenger: M,
    page: P,
    options: SyncOptions,
    state: SyncState,
    pending_display: bool,
    requested_at: Option<Instant>,
}

impl<S, M, P> SyncController<S, M, P>
where
    S: KeyValueStorage,
    M: DeviceMessenger,
    P: SettingsPage,
{
    pub fn new(store: SettingsStore<S>, messenger: M, page: P, options: SyncOptions) -> Self {
        Self {
            store,
            messenger,
            page,
            options,
            state: SyncState::Idle,
            pending_display: false,
            requested_at: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn pending_display(&self) -> bool {
        self.pending_display
    }

    pub fn store(&self) -> &SettingsStore<S> {
        &self.store
    }

    pub fn settings_url(&self) -> Url {
        settings_url(
            &self.options.settings_page,
            &self.store,
            self.options.variant,
            self.options.return_to.as_deref(),
        )
    }

    pub async fn handle(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Ready => self.ready(),
            BridgeEvent::ShowConfiguration => self.show_configuration().await,
            BridgeEvent::DeviceMessage(message) => self.device_message(&message),
            BridgeEvent::WebviewClosed(response) => {
                if let Err(e) = self.webview_closed(response.as_deref()).await {
                    error!("Discarding settings page response: {}", e);
                }
            }
        }
    }

    /// The device channel (re)opened. A request still waiting for setup info
    /// may never be answered, so the page opens with the stored values.
    pub fn ready(&mut self) {
        info!("Device channel ready");
        if self.pending_display {
            warn!("Device channel reopened during setup info request, showing stored settings");
            self.clear_pending();
            self.show_settings();
        }
    }

    pub async fn show_configuration(&mut self) {
        info!("Show configuration requested");
        if !self.options.variant.requests_setup_info() {
            self.show_settings();
            return;
        }

        self.pending_display = true;
        self.requested_at = Some(Instant::now());
        self.state = SyncState::AwaitingSetupInfo;
        match self.messenger.send(&make_setup_info_request()).await {
            Ok(()) => info!("Setup info request sent to device"),
            Err(e) => {
                warn!(
                    "Setup info request failed, showing stored settings: {}",
                    e
                );
                self.clear_pending();
                self.show_settings();
            }
        }
    }

    pub fn device_message(&mut self, message: &DeviceMessage) {
        let fields = message.fields();
        if fields.is_empty() {
            debug!("Ignoring device message without known fields");
            return;
        }
        for (preference, value) in fields {
            if preference.accepts(value) {
                info!("Device reported {}={}", preference, value);
                self.store.set(preference, value);
            } else {
                warn!("Ignoring out of range {}={} from device", preference, value);
            }
        }

        if message.clock_24_hour.is_some() {
            if self.pending_display {
                self.clear_pending();
                self.show_settings();
            } else {
                debug!("Setup info stored without a pending configuration request");
            }
        }
    }

    /// Applies the settings page result. Cancelling or a malformed payload
    /// leave the store untouched; the settings are sent fire-and-forget.
    pub async fn webview_closed(
        &mut self,
        response: Option<&str>,
    ) -> Result<CloseOutcome, BridgeError> {
        self.state = SyncState::Idle;
        let configuration = match ConfigurationResult::from_response(response)? {
            Some(configuration) => configuration,
            None => {
                info!("Settings cancelled by user");
                return Ok(CloseOutcome::Cancelled);
            }
        };
        debug!("Configuration window returned: {:?}", configuration);

        configuration.persist(&self.store);
        let settings = make_settings_message(&self.store, self.options.variant);
        match self
            .messenger
            .send(&OutboundMessage::Settings(settings.clone()))
            .await
        {
            Ok(()) => info!("Settings sent to device"),
            Err(e) => error!("Error sending settings to device: {}", e),
        }
        Ok(CloseOutcome::Applied(settings))
    }

    /// Opens the page with stored values when setup info did not arrive in
    /// time. Returns whether the request expired.
    pub fn expire_setup_request(&mut self, now: Instant) -> bool {
        let (Some(timeout), Some(requested_at)) =
            (self.options.setup_info_timeout, self.requested_at)
        else {
            return false;
        };
        if !self.pending_display || now.duration_since(requested_at) < timeout {
            return false;
        }
        warn!(
            "No setup info after {:?}, showing stored settings",
            timeout
        );
        self.clear_pending();
        self.show_settings();
        true
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<BridgeEvent>) {
        let mut tick = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                _ = tick.tick() => {
                    self.expire_setup_request(Instant::now());
                }
            }
        }
        info!("Sync controller stopped");
    }

    fn clear_pending(&mut self) {
        self.pending_display = false;
        self.requested_at = None;
    }

    fn show_settings(&mut self) {
        let url = self.settings_url();
        info!("Opening settings page {}", url);
        match self.page.open(&url) {
            Ok(()) => self.state = SyncState::ShowingSettingsPage,
            Err(e) => {
                error!("Failed to open settings page: {}", e);
                self.state = SyncState::Idle;
            }
        }
    }
}

/// Forwards device callbacks into the controller's event queue.
#[derive(Clone)]
pub struct EventForwarder {
    events: mpsc::Sender<BridgeEvent>,
}

impl EventForwarder {
    pub fn new(events: mpsc::Sender<BridgeEvent>) -> Self {
        Self { events }
    }

    async fn forward(&self, event: BridgeEvent) {
        if self.events.send(event).await.is_err() {
            warn!("Sync controller is gone, dropping event");
        }
    }
}

#[async_trait]
impl DeviceObserver for EventForwarder {
    async fn on_receive(&self, message: DeviceMessage) {
        self.forward(BridgeEvent::DeviceMessage(message)).await
    }

    async fn on_ready(&self) {
        self.forward(BridgeEvent::Ready).await
    }
}
