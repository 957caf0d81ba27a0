//! Applied Motion motor driver
//!
//! A [`Motor`] owns one connection to one drive. Foreground calls block the
//! caller for a socket round trip. A background heartbeat, running on its
//! own thread with a single-threaded tokio runtime, polls the drive status.
//! Both sides share the socket through a mutex, since the drive answers one
//! command at a time and replies carry no request id.

use bapsf_motion_core::{
    ConnectionError, ConnectionState, EventBus, EventFilter, MotorEvent, MotorStatus,
    ProtocolError, Result, StatusField, SubscriptionId, ValidationError,
};

pub use bapsf_motion_core::validate_ip;
use parking_lot::{Mutex, RwLock};
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::alarm_decoder::alarm_message;
use super::commands::{command, Reply};
use super::config::MotorSettings;
use super::status_parser::StatusParser;
use crate::communication::{
    is_connection_level, is_timeout, read_frame, write_frame, Connector, ReadWrite, TcpConnector,
};

/// Parameters read from the drive after connecting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorParameters {
    /// Steps per revolution (`EG`)
    pub gearing: Option<i64>,
    /// Encoder counts per revolution (`ER`)
    pub encoder_resolution: Option<i64>,
}

struct MotorShared {
    name: String,
    ip: String,
    settings: MotorSettings,
    connector: Arc<dyn Connector>,
    link: Mutex<Option<Box<dyn ReadWrite>>>,
    state: RwLock<ConnectionState>,
    status: RwLock<MotorStatus>,
    parameters: RwLock<MotorParameters>,
    events: EventBus,
}

struct Heartbeat {
    shutdown: mpsc::UnboundedSender<()>,
    thread: JoinHandle<()>,
}

/// Driver for one Applied Motion drive
pub struct Motor {
    shared: Arc<MotorShared>,
    heartbeat: Mutex<Option<Heartbeat>>,
}

impl Motor {
    /// Connect to a drive over TCP with default settings
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Result<Self> {
        Self::with_connector(name, ip, MotorSettings::default(), Arc::new(TcpConnector))
    }

    /// Connect through a custom connector.
    ///
    /// Reads the drive gearing and encoder resolution, switches immediate
    /// replies to decimal and fetches an initial status. The heartbeat is
    /// not started; call [`Motor::run`].
    pub fn with_connector(
        name: impl Into<String>,
        ip: impl Into<String>,
        settings: MotorSettings,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let ip = ip.into();
        validate_ip(&ip)?;
        if settings.max_connection_attempts == 0 {
            return Err(ValidationError::invalid(
                "max_connection_attempts",
                "at least one attempt is required",
            )
            .into());
        }

        let shared = Arc::new(MotorShared {
            name: name.into(),
            ip,
            settings,
            connector,
            link: Mutex::new(None),
            state: RwLock::new(ConnectionState::Disconnected),
            status: RwLock::new(MotorStatus::default()),
            parameters: RwLock::new(MotorParameters::default()),
            events: EventBus::new(),
        });

        shared.connect()?;
        shared.read_parameters()?;
        shared.send_raw_command("IFD")?;
        shared.retrieve_status()?;

        Ok(Self {
            shared,
            heartbeat: Mutex::new(None),
        })
    }

    /// Given name of the motor
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// IP address of the drive
    pub fn ip(&self) -> &str {
        &self.shared.ip
    }

    /// Driver settings
    pub fn settings(&self) -> &MotorSettings {
        &self.shared.settings
    }

    /// Snapshot of the last known status
    pub fn status(&self) -> MotorStatus {
        self.shared.status.read().clone()
    }

    /// Current socket state
    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    /// Parameters read from the drive
    pub fn parameters(&self) -> MotorParameters {
        *self.shared.parameters.read()
    }

    /// Steps per revolution reported by the drive
    pub fn steps_per_rev(&self) -> Option<f64> {
        self.parameters().gearing.map(|g| g as f64)
    }

    /// Event bus carrying this motor's status changes
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Register a status-change handler
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(MotorEvent) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(EventFilter::All, handler)
    }

    /// Remove a status-change handler
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    /// True when the last status reported motion
    pub fn is_moving(&self) -> bool {
        self.shared.is_moving()
    }

    /// Send a named command from the command table
    pub fn send_command(&self, name: &str, arg: Option<f64>) -> Result<Reply> {
        self.shared.send_command(name, arg)
    }

    /// Send a raw SCL payload and return the raw reply
    pub fn send_raw_command(&self, payload: &str) -> Result<String> {
        self.shared.send_raw_command(payload)
    }

    /// Poll and fold the full drive status
    pub fn retrieve_status(&self) -> Result<MotorStatus> {
        self.shared.retrieve_status()
    }

    /// Read and decode the drive alarm register
    pub fn retrieve_alarm(&self) -> Result<String> {
        self.shared.retrieve_alarm(false)
    }

    /// Current position in steps
    pub fn position(&self) -> Result<i64> {
        self.shared.position()
    }

    /// Move to an absolute position in steps
    pub fn move_to(&self, steps: i64) -> Result<()> {
        debug!(motor = %self.shared.name, steps, "move_to");
        self.send_command("set_position", Some(steps as f64))?;
        self.send_command("feed_to_position", None)?;
        Ok(())
    }

    /// Stop motion immediately
    pub fn stop(&self) -> Result<()> {
        self.send_command("stop", None).map(|_| ())
    }

    /// Enable the motor and refresh the status
    pub fn enable(&self) -> Result<()> {
        self.send_command("enable", None)?;
        self.retrieve_status().map(|_| ())
    }

    /// Disable the motor and refresh the status
    pub fn disable(&self) -> Result<()> {
        self.send_command("disable", None)?;
        self.retrieve_status().map(|_| ())
    }

    /// Clear the drive alarm and refresh the status
    pub fn alarm_reset(&self) -> Result<()> {
        self.send_command("alarm_reset", None)?;
        self.retrieve_status().map(|_| ())
    }

    /// Zero the encoder and the commanded position at the current location
    pub fn set_zero(&self) -> Result<()> {
        self.send_command("set_encoder_zero", None)?;
        self.send_command("set_position_zero", None)?;
        let steps = self.position()?;
        if steps != 0 {
            warn!(motor = %self.shared.name, steps, "Position did not read back as zero");
        }
        Ok(())
    }

    /// True while the heartbeat thread is alive
    pub fn is_running(&self) -> bool {
        self.heartbeat.lock().is_some()
    }

    /// Start the heartbeat. Calling it again is a no-op.
    pub fn run(&self) -> Result<()> {
        let mut heartbeat = self.heartbeat.lock();
        if heartbeat.is_some() {
            return Ok(());
        }

        let (shutdown, shutdown_rx) = mpsc::unbounded_channel();
        let shared = Arc::clone(&self.shared);
        let thread = std::thread::Builder::new()
            .name(format!("motor-{}", self.shared.name))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!(motor = %shared.name, "Failed to start heartbeat runtime: {}", err);
                        return;
                    }
                };
                runtime.block_on(heartbeat_loop(shared, shutdown_rx));
            })
            .map_err(|e| ConnectionError::Io {
                reason: format!("failed to spawn heartbeat thread: {e}"),
            })?;

        info!(motor = %self.shared.name, ip = %self.shared.ip, "Heartbeat started");
        *heartbeat = Some(Heartbeat { shutdown, thread });
        Ok(())
    }

    /// Stop the heartbeat, join its thread and close the socket
    pub fn stop_running(&self) {
        if let Some(heartbeat) = self.heartbeat.lock().take() {
            let _ = heartbeat.shutdown.send(());
            if heartbeat.thread.join().is_err() {
                error!(motor = %self.shared.name, "Heartbeat thread panicked");
            }
            info!(motor = %self.shared.name, "Heartbeat stopped");
        }
        self.shared.disconnect();
    }
}

impl Drop for Motor {
    fn drop(&mut self) {
        self.stop_running();
    }
}

impl std::fmt::Debug for Motor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Motor")
            .field("name", &self.shared.name)
            .field("ip", &self.shared.ip)
            .field("state", &self.connection_state())
            .finish()
    }
}

async fn heartbeat_loop(shared: Arc<MotorShared>, mut shutdown: mpsc::UnboundedReceiver<()>) {
    loop {
        if let Err(err) = shared.retrieve_status() {
            warn!(motor = %shared.name, "Heartbeat status poll failed: {}", err);
        }

        let heartrate = shared.settings.heartrate(shared.is_moving());
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = tokio::time::sleep(heartrate) => {}
        }
    }
}

impl MotorShared {
    /// Record a state change, returning the event to publish once no
    /// lock is held
    fn store_state(&self, state: ConnectionState) -> Option<MotorEvent> {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        (previous != state).then(|| MotorEvent::ConnectionChanged {
            motor: self.name.clone(),
            state,
        })
    }

    fn set_state(&self, state: ConnectionState) {
        if let Some(event) = self.store_state(state) {
            self.events.publish(event);
        }
    }

    fn publish_all(&self, pending: Vec<MotorEvent>) {
        for event in pending {
            self.events.publish(event);
        }
    }

    fn is_moving(&self) -> bool {
        self.status.read().moving
    }

    /// Dial the drive, retrying up to the configured attempt count.
    ///
    /// State changes are queued on `pending` since callers may hold the
    /// link mutex.
    fn open_link(&self, pending: &mut Vec<MotorEvent>) -> Result<Box<dyn ReadWrite>> {
        let attempts = self.settings.max_connection_attempts;
        let address = format!("{}:{}", self.ip, self.settings.port);
        pending.extend(self.store_state(ConnectionState::Connecting));

        let mut last_error = String::new();
        for attempt in 1..=attempts {
            debug!(motor = %self.name, "Connecting to {} ...", address);
            match self
                .connector
                .connect(&self.ip, self.settings.port, self.settings.timeout)
            {
                Ok(stream) => {
                    debug!(motor = %self.name, "...connected to {}", address);
                    pending.extend(self.store_state(ConnectionState::Connected));
                    return Ok(stream);
                }
                Err(err) => {
                    last_error = err.to_string();
                    if attempt < attempts {
                        warn!(motor = %self.name, "...attempt {} of {} failed: {}", attempt, attempts, err);
                    } else {
                        error!(motor = %self.name, "...attempt {} of {} failed: {}", attempt, attempts, err);
                    }
                }
            }
        }

        pending.extend(self.store_state(ConnectionState::Disconnected));
        Err(ConnectionError::ConnectFailed {
            address,
            attempts,
            reason: last_error,
        }
        .into())
    }

    fn connect(&self) -> Result<()> {
        let mut pending = Vec::new();
        let opened = self.open_link(&mut pending);
        self.publish_all(pending);

        *self.link.lock() = Some(opened?);
        self.update_status(|status| status.connected = true);
        Ok(())
    }

    fn disconnect(&self) {
        *self.link.lock() = None;
        self.set_state(ConnectionState::Disconnected);
        self.update_status(|status| status.connected = false);
    }

    fn exchange(&self, stream: &mut dyn ReadWrite, payload: &str) -> io::Result<Vec<u8>> {
        write_frame(stream, payload)?;
        read_frame(stream, self.settings.read_chunk_size)
    }

    fn io_error(&self, err: &io::Error) -> ConnectionError {
        if is_timeout(err) {
            ConnectionError::Timeout {
                timeout_ms: self.settings.timeout.as_millis() as u64,
            }
        } else {
            ConnectionError::Io {
                reason: err.to_string(),
            }
        }
    }

    /// Send one payload and wait for its reply.
    ///
    /// A connection-level failure triggers one reconnect (bounded by the
    /// attempt count) and one resend. Any other failure drops the link so
    /// a late reply is never read as the answer to a later command; the
    /// next call dials again.
    fn send_raw_command(&self, payload: &str) -> Result<String> {
        let mut pending = Vec::new();
        let (reply, linked) = {
            let mut link = self.link.lock();
            let reply = self.exchange_on_link(&mut link, payload, &mut pending);
            (reply, link.is_some())
        };
        self.publish_all(pending);
        self.update_status(|status| status.connected = linked);

        let bytes = reply?;
        if !bytes.is_ascii() {
            return Err(ProtocolError::InvalidEncoding.into());
        }
        String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidEncoding.into())
    }

    fn exchange_on_link(
        &self,
        link: &mut Option<Box<dyn ReadWrite>>,
        payload: &str,
        pending: &mut Vec<MotorEvent>,
    ) -> Result<Vec<u8>> {
        let first = match link.as_mut() {
            Some(stream) => self.exchange(stream.as_mut(), payload),
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        };
        let err = match first {
            Ok(bytes) => return Ok(bytes),
            Err(err) => err,
        };

        // replies carry no request id, so a stream with an unanswered
        // request is never reused
        *link = None;
        if !is_connection_level(&err) {
            warn!(motor = %self.name, "Sending '{}' failed: {}, dropping the connection", payload, err);
            pending.extend(self.store_state(ConnectionState::Disconnected));
            return Err(self.io_error(&err).into());
        }

        warn!(motor = %self.name, "Connection lost sending '{}' ({}), reconnecting", payload, err);
        let mut stream = self.open_link(pending)?;
        match self.exchange(stream.as_mut(), payload) {
            Ok(bytes) => {
                *link = Some(stream);
                Ok(bytes)
            }
            Err(retry_err) => {
                pending.extend(self.store_state(ConnectionState::Disconnected));
                error!(motor = %self.name, "Resend of '{}' failed: {}", payload, retry_err);
                Err(ConnectionError::ConnectionLost {
                    reason: retry_err.to_string(),
                }
                .into())
            }
        }
    }

    fn send_command(&self, name: &str, arg: Option<f64>) -> Result<Reply> {
        let spec = command(name)?;
        let payload = spec.render(arg)?;
        let raw = self.send_raw_command(&payload)?;

        spec.parse_reply(&raw).inspect_err(|err| {
            error!(motor = %self.name, "Bad reply to '{}': {}", payload, err);
        })
    }

    fn integer_reply(&self, name: &str) -> Result<i64> {
        let reply = self.send_command(name, None)?;
        reply.as_integer().ok_or_else(|| {
            ProtocolError::NotNumeric {
                command: name.to_string(),
                value: reply.to_string(),
            }
            .into()
        })
    }

    fn text_reply(&self, name: &str) -> Result<String> {
        match self.send_command(name, None)? {
            Reply::Text(text) => Ok(text),
            other => Err(ProtocolError::UnexpectedReply {
                command: name.to_string(),
                reply: other.to_string(),
            }
            .into()),
        }
    }

    fn read_parameters(&self) -> Result<()> {
        let gearing = self.integer_reply("gearing")?;
        let encoder_resolution = self.integer_reply("encoder_resolution")?;
        debug!(motor = %self.name, gearing, encoder_resolution, "Drive parameters");

        *self.parameters.write() = MotorParameters {
            gearing: Some(gearing),
            encoder_resolution: Some(encoder_resolution),
        };
        Ok(())
    }

    fn position(&self) -> Result<i64> {
        let position = self.integer_reply("get_position")?;
        self.update_status(|status| status.position = Some(position));
        Ok(position)
    }

    fn retrieve_alarm(&self, defer_status_update: bool) -> Result<String> {
        let code = self.text_reply("alarm")?;
        let message = alarm_message(&code);

        if !message.is_empty() {
            error!(motor = %self.name, "Motor returned alarm(s): {}", message);
            self.events.publish(MotorEvent::Alarm {
                motor: self.name.clone(),
                message: message.clone(),
            });
            if !defer_status_update {
                let text = message.clone();
                self.update_status(|status| status.alarm_message = Some(text));
            }
        }
        Ok(message)
    }

    fn retrieve_status(&self) -> Result<MotorStatus> {
        let letters = self.text_reply("request_status")?;
        let mut decoded = StatusParser::parse(&letters);
        decoded.position = Some(self.integer_reply("get_position")?);
        if decoded.alarm {
            let message = self.retrieve_alarm(true)?;
            decoded.alarm_message = (!message.is_empty()).then_some(message);
        }

        Ok(self.update_status(move |status| {
            *status = MotorStatus {
                connected: true,
                ..decoded
            };
        }))
    }

    /// Apply `change`, then publish one event when any field differs
    fn update_status<F>(&self, change: F) -> MotorStatus
    where
        F: FnOnce(&mut MotorStatus),
    {
        let (changed, snapshot) = {
            let mut status = self.status.write();
            let old = status.clone();
            change(&mut *status);
            (old.changed_fields(&*status), status.clone())
        };

        if !changed.is_empty() {
            let names: Vec<&str> = changed.iter().map(StatusField::as_str).collect();
            debug!(motor = %self.name, "Motor status changed: {}", names.join(", "));
            self.events.publish(MotorEvent::StatusChanged {
                motor: self.name.clone(),
                changed,
                status: snapshot.clone(),
            });
        }
        snapshot
    }
}
