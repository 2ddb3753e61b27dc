//! Unix domain socket server for IPC
//!
//! Provides request-response communication with the widget registry and
//! pushes outbound events and platform commands to subscribed clients.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::WidgetConfig;
use crate::events::OutboundEvent;
use crate::widget::{Widget, WidgetError};

use super::protocol::{
    encode_frame, HostCapabilities, Notification, PlatformInput, Request, Response, MAX_FRAME_LEN,
};
use super::remote::remote_platform;

/// A widget and the receiving end of its outbound channel
struct Entry {
    widget: Widget,
    events: broadcast::Receiver<OutboundEvent>,
}

/// Every widget hosted by the daemon, keyed by element id
pub struct Registry {
    widgets: HashMap<String, Entry>,
    defaults: WidgetConfig,
    notify_tx: broadcast::Sender<Notification>,
}

impl Registry {
    pub fn new(defaults: WidgetConfig) -> Self {
        let (notify_tx, _) = broadcast::channel(256);
        Self {
            widgets: HashMap::new(),
            defaults,
            notify_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Create a widget, or re-attach one that was detached
    ///
    /// A re-attached widget keeps its transcript and original configuration.
    pub fn attach(
        &mut self,
        id: String,
        config: Option<WidgetConfig>,
        capabilities: HostCapabilities,
    ) {
        if let Some(entry) = self.widgets.get_mut(&id) {
            entry.widget.attach();
            return;
        }

        let (event_tx, events) = broadcast::channel(64);
        let platform = remote_platform(&id, capabilities, self.notify_tx.clone());
        let config = config.unwrap_or_else(|| self.defaults.clone());
        let widget = Widget::new(id.clone(), config, platform, event_tx);
        self.widgets.insert(id, Entry { widget, events });
    }

    /// Run `f` on one widget, then forward what it emitted
    pub fn dispatch<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Widget) -> Result<T, WidgetError>,
    ) -> Result<T, WidgetError> {
        let entry = self
            .widgets
            .get_mut(id)
            .ok_or_else(|| WidgetError::UnknownWidget(id.to_string()))?;

        let result = f(&mut entry.widget);
        Self::forward_outbound(id, entry, &self.notify_tx);
        result
    }

    /// Advance recording clocks
    pub fn tick(&mut self, now: Instant) {
        for (id, entry) in self.widgets.iter_mut() {
            if entry.widget.is_attached() {
                entry.widget.tick(now);
                Self::forward_outbound(id, entry, &self.notify_tx);
            }
        }
    }

    /// Teardown every widget; active captures are cancelled
    pub fn detach_all(&mut self) {
        for entry in self.widgets.values_mut() {
            entry.widget.detach();
        }
    }

    fn forward_outbound(id: &str, entry: &mut Entry, notify_tx: &broadcast::Sender<Notification>) {
        loop {
            match entry.events.try_recv() {
                Ok(event) => {
                    let _ = notify_tx.send(Notification::Outbound {
                        widget: id.to_string(),
                        event,
                    });
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(widget = id, skipped = n, "outbound events lagged");
                }
                Err(_) => break,
            }
        }
    }
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    registry: Arc<Mutex<Registry>>,
    notify_tx: broadcast::Sender<Notification>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, defaults: WidgetConfig) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = Registry::new(defaults);
        let notify_tx = registry.notify_tx.clone();

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            registry: Arc::new(Mutex::new(registry)),
            notify_tx,
            shutdown_tx,
        })
    }

    /// Drive the recording clock of every widget
    pub async fn tick(&self, now: Instant) {
        self.registry.lock().await.tick(now);
    }

    pub async fn detach_all(&self) {
        let mut registry = self.registry.lock().await;
        info!(widgets = registry.len(), "detaching all widgets");
        registry.detach_all();
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let registry = Arc::clone(&self.registry);
                    let notify_tx = self.notify_tx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, registry, notify_tx) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    ///
    /// Responses and notifications share one writer task so a push never
    /// interleaves with a response frame. Notifications raised while serving
    /// a request are written before its response. Widgets attached over this
    /// connection are detached when it closes.
    async fn handle_client(
        stream: UnixStream,
        registry: Arc<Mutex<Registry>>,
        notify_tx: broadcast::Sender<Notification>,
    ) -> Result<()> {
        let (reader, writer) = stream.into_split();
        let (frame_tx, frame_rx) = mpsc::channel::<Vec<u8>>(64);
        let writer_task = tokio::spawn(Self::write_frames(writer, frame_rx));
        let (body_tx, mut bodies) = mpsc::channel::<Vec<u8>>(16);
        let reader_task = tokio::spawn(Self::read_frames(reader, body_tx));

        let mut subscription: Option<broadcast::Receiver<Notification>> = None;
        let mut attached: HashSet<String> = HashSet::new();

        let result: Result<()> = async {
            loop {
                tokio::select! {
                    body = bodies.recv() => {
                        let Some(body) = body else { break };
                        let response = match serde_json::from_slice::<Request>(&body) {
                            Ok(request) => {
                                debug!(request = request.name(), "received request");
                                match &request {
                                    Request::Attach { widget, .. } => {
                                        attached.insert(widget.clone());
                                    }
                                    Request::Detach { widget } => {
                                        attached.remove(widget);
                                    }
                                    _ => {}
                                }
                                let (response, subscribe) = Self::process_request(request, &registry).await;
                                if subscribe && subscription.is_none() {
                                    debug!("client subscribed to notifications");
                                    subscription = Some(notify_tx.subscribe());
                                }
                                response
                            }
                            Err(e) => {
                                warn!(error = %e, "failed to parse request");
                                Response::error("bad_request", e)
                            }
                        };

                        if let Some(rx) = subscription.as_mut() {
                            while let Ok(notification) = rx.try_recv() {
                                if !Self::push(&frame_tx, &notification).await {
                                    return Ok(());
                                }
                            }
                        }
                        if frame_tx.send(encode_frame(&response)?).await.is_err() {
                            break;
                        }
                    }
                    notification = next_notification(&mut subscription) => match notification {
                        Ok(notification) => {
                            if !Self::push(&frame_tx, &notification).await {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => subscription = None,
                    },
                }
            }
            debug!("client disconnected");
            Ok(())
        }
        .await;

        if !attached.is_empty() {
            let mut registry = registry.lock().await;
            for id in &attached {
                info!(widget = %id, "detaching widget of closed connection");
                let _ = registry.dispatch(id, |w| {
                    w.detach();
                    Ok(())
                });
            }
        }

        reader_task.abort();
        let read_result = reader_task.await.unwrap_or(Ok(()));
        drop(frame_tx);
        if let Ok(Err(e)) = writer_task.await {
            debug!(?e, "client writer closed");
        }
        result.and(read_result)
    }

    async fn read_frames(mut reader: OwnedReadHalf, bodies: mpsc::Sender<Vec<u8>>) -> Result<()> {
        while let Some(body) = read_frame(&mut reader).await? {
            if bodies.send(body).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn write_frames(mut writer: OwnedWriteHalf, mut frames: mpsc::Receiver<Vec<u8>>) -> Result<()> {
        while let Some(frame) = frames.recv().await {
            writer.write_all(&frame).await?;
        }
        Ok(())
    }

    /// Queue a notification; false once the writer is gone
    async fn push(frames: &mpsc::Sender<Vec<u8>>, notification: &Notification) -> bool {
        match encode_frame(notification) {
            Ok(frame) => frames.send(frame).await.is_ok(),
            Err(e) => {
                error!(error = %e, "failed to encode notification");
                true
            }
        }
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, registry: &Mutex<Registry>) -> (Response, bool) {
        let now = Instant::now();
        let mut registry = registry.lock().await;

        let result = match request {
            Request::Ping => return (Response::Pong, false),

            Request::Subscribe => return (Response::Subscribed, true),

            Request::Attach {
                widget,
                config,
                capabilities,
            } => {
                registry.attach(widget, config, capabilities);
                Ok(())
            }

            Request::Detach { widget } => registry.dispatch(&widget, |w| {
                w.detach();
                Ok(())
            }),

            Request::Signal { widget, signal } => {
                registry.dispatch(&widget, |w| w.handle_signal(signal))
            }

            Request::Input { widget, event } => registry.dispatch(&widget, |w| w.handle_input(event)),

            Request::Interact {
                widget,
                target,
                trigger,
            } => registry.dispatch(&widget, |w| w.interact(target, trigger)),

            Request::Capture { widget, command } => {
                registry.dispatch(&widget, |w| w.handle_capture_command(command, now))
            }

            Request::Platform { widget, event } => match PlatformInput::try_from(event) {
                Ok(input) => registry.dispatch(&widget, |w| {
                    apply_platform_input(w, input, now);
                    Ok(())
                }),
                Err(e) => {
                    warn!(widget = %widget, error = %e, "malformed platform event");
                    return (Response::error("invalid_event", e), false);
                }
            },

            Request::Snapshot { widget } => {
                return match registry.dispatch(&widget, |w| Ok(w.snapshot())) {
                    Ok(snapshot) => (Response::Snapshot(snapshot), false),
                    Err(e) => (Response::error(e.code(), &e), false),
                };
            }
        };

        match result {
            Ok(()) => (Response::Ok, false),
            Err(e) => (Response::error(e.code(), &e), false),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

fn apply_platform_input(widget: &mut Widget, input: PlatformInput, now: Instant) {
    match input {
        PlatformInput::Capture(event) => widget.handle_capture_event(event, now),
        PlatformInput::Clipboard {
            message_index,
            result,
        } => widget.clipboard_result(message_index, result, now),
        PlatformInput::Link { url, answer } => widget.link_confirmed(url, answer),
        PlatformInput::Render(event) => widget.render_event(event),
    }
}

/// Next notification for a subscribed client; pends forever otherwise
async fn next_notification(
    subscription: &mut Option<broadcast::Receiver<Notification>>,
) -> Result<Notification, broadcast::error::RecvError> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read one length-prefixed frame; `None` on a clean disconnect or an
/// oversized frame
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    // Read message length (4-byte little-endian)
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}
