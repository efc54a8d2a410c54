//! # Drone Link
//!
//! Async driver that connects a [`CommandProtocolEngine`] to the drone.
//!
//! One connection runs these tasks:
//! - **Sender**: calls `tick()` every `send_interval_ms` and sends the batch
//!   on the command channel
//! - **Telemetry**: decodes NavData datagrams, filters bursts and stale
//!   sequences, feeds the engine and raises events
//! - **Configuration**: reports lines from the TCP configuration channel
//! - **Video** (optional): decodes UVLC pictures, raw over UDP or
//!   PaVE-framed over TCP
//!
//! Any command or telemetry transport error, a telemetry timeout, or the
//! drone reporting lost communication disconnects the engine, stops every
//! task and raises a single `CommunicationFailure` event. Reconnecting is
//! left to the caller.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::BytesMut;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::at::command::{AtCommandKind, FlightAnimation, LedAnimation};
use crate::at::config::ConfigEntry;
use crate::config::{Config, VideoTransport};
use crate::engine::{CommandProtocolEngine, CommandState, ConnectionState, EngineEvent, FlightInput};
use crate::error::{DroneError, Result};
use crate::events::{DroneEvent, EventBus};
use crate::navdata::decoder::verify_checksum;
use crate::navdata::protocol::NAVDATA_WAKE_UP;
use crate::navdata::{decode_navdata, SequenceGuard};
use crate::transport::{Channel, ChannelKind, Connector, TokioConnector};
use crate::video::protocol::VIDEO_WAKE_UP;
use crate::video::{PaveDepacketizer, UvlcDecoder};

fn lock_engine(engine: &Mutex<CommandProtocolEngine>) -> MutexGuard<'_, CommandProtocolEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the tasks of one connection
struct SessionShared {
    engine: Arc<Mutex<CommandProtocolEngine>>,
    events: Arc<EventBus>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl SessionShared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop all tasks without notification; returns false if already closed
    fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        self.cancel.cancel();
        first
    }

    /// Tear down after a transport failure, notifying listeners once
    fn fail(&self, reason: &DroneError) {
        if !self.close() {
            return;
        }
        error!("Communication failure: {}", reason);
        lock_engine(&self.engine).disconnect();
        self.events.emit(&DroneEvent::CommunicationFailure);
    }
}

struct VideoStream {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Session {
    shared: Arc<SessionShared>,
    tasks: Vec<JoinHandle<()>>,
    video: Option<VideoStream>,
}

/// Connection to one drone
pub struct DroneLink {
    config: Config,
    connector: Arc<dyn Connector>,
    engine: Arc<Mutex<CommandProtocolEngine>>,
    events: Arc<EventBus>,
    session: Option<Session>,
}

impl DroneLink {
    /// Link using tokio sockets
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, Arc::new(TokioConnector))
    }

    pub fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            engine: Arc::new(Mutex::new(CommandProtocolEngine::new())),
            events: Arc::new(EventBus::new()),
            session: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register an event listener
    ///
    /// Listeners run on the link's tasks and must not block. They may call
    /// the synchronous command methods of the link.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&DroneEvent<'_>) + Send + Sync + 'static,
    {
        self.events.subscribe(listener);
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock_engine(&self.engine).connection_state()
    }

    pub fn command_state(&self) -> CommandState {
        lock_engine(&self.engine).command_state()
    }

    pub fn is_connected(&self) -> bool {
        lock_engine(&self.engine).is_connected()
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut CommandProtocolEngine) -> R) -> R {
        f(&mut lock_engine(&self.engine))
    }

    /// Open the channels and start the link tasks
    ///
    /// An existing connection is closed first. The engine stays in
    /// `Bootstrapping` until the first valid telemetry datagram arrives.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the command or telemetry channel cannot be
    /// opened. The configuration and video channels only log failures.
    pub async fn connect(&mut self) -> Result<()> {
        self.disconnect().await;

        info!("Connecting to drone at {}", self.config.network.host);
        lock_engine(&self.engine).connect();

        match self.open_session().await {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                lock_engine(&self.engine).disconnect();
                Err(e)
            }
        }
    }

    async fn open_session(&self) -> Result<Session> {
        let network = &self.config.network;
        let control = &self.config.control;

        let command = self.open(ChannelKind::Udp, network.command_port).await?;
        let navdata = self.open(ChannelKind::Udp, network.navdata_port).await?;
        navdata
            .send(&NAVDATA_WAKE_UP)
            .await
            .map_err(|e| transport_error("navdata wake-up", e))?;

        let config_channel = if control.enable_control_channel {
            match self.open(ChannelKind::Tcp, network.control_port).await {
                Ok(channel) => Some(channel),
                Err(e) => {
                    error!("Configuration channel unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let shared = Arc::new(SessionShared {
            engine: Arc::clone(&self.engine),
            events: Arc::clone(&self.events),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });

        let mut tasks = vec![
            tokio::spawn(run_sender(
                Arc::clone(&shared),
                command,
                control.send_interval(),
                network.send_timeout(),
            )),
            tokio::spawn(run_navdata(
                Arc::clone(&shared),
                navdata,
                network.navdata_timeout(),
                control.burst_window(),
            )),
        ];
        if let Some(channel) = config_channel {
            tasks.push(tokio::spawn(run_config_channel(Arc::clone(&shared), channel)));
        }

        let mut session = Session {
            shared,
            tasks,
            video: None,
        };

        if self.config.video.enabled {
            match self.open_video(Arc::clone(&session.shared)).await {
                Ok(video) => session.video = Some(video),
                Err(e) => error!("Video unavailable: {}", e),
            }
        }

        Ok(session)
    }

    async fn open(&self, kind: ChannelKind, port: u16) -> Result<Box<dyn Channel>> {
        let host = &self.config.network.host;
        self.connector
            .connect(kind, host, port)
            .await
            .map_err(|e| transport_error(&format!("{} channel {}:{}", kind, host, port), e))
    }

    /// Stop all tasks and reset the engine
    ///
    /// Idempotent. When this returns the sender loop has exited and no
    /// further command is sent. No `CommunicationFailure` is raised.
    pub async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            lock_engine(&self.engine).disconnect();
            return;
        };

        session.shared.close();
        lock_engine(&self.engine).disconnect();

        if let Some(video) = session.video {
            video.cancel.cancel();
            if let Err(e) = video.task.await {
                warn!("Video task ended abnormally: {}", e);
            }
        }
        for task in session.tasks {
            if let Err(e) = task.await {
                warn!("Link task ended abnormally: {}", e);
            }
        }

        info!("Disconnected from drone");
    }

    /// Open the video channel and start decoding
    ///
    /// A running stream is restarted.
    ///
    /// # Errors
    ///
    /// - `NotConnected` without an active connection
    /// - `Transport` if the video channel cannot be opened
    pub async fn start_video(&mut self) -> Result<()> {
        self.stop_video().await;

        let shared = match &self.session {
            Some(session) if !session.shared.is_closed() => Arc::clone(&session.shared),
            _ => return Err(DroneError::NotConnected),
        };

        let video = self.open_video(shared).await?;
        if let Some(session) = self.session.as_mut() {
            session.video = Some(video);
        }
        Ok(())
    }

    /// Close the video channel; the drone cannot be told to stop streaming
    pub async fn stop_video(&mut self) {
        let Some(video) = self.session.as_mut().and_then(|session| session.video.take()) else {
            return;
        };

        video.cancel.cancel();
        if let Err(e) = video.task.await {
            warn!("Video task ended abnormally: {}", e);
        }
        info!("Video stopped");
    }

    async fn open_video(&self, shared: Arc<SessionShared>) -> Result<VideoStream> {
        let video = &self.config.video;
        let channel = self.open(video.transport.into(), self.config.network.video_port).await?;

        if video.transport == VideoTransport::Udp {
            channel
                .send(&VIDEO_WAKE_UP)
                .await
                .map_err(|e| transport_error("video wake-up", e))?;
        }

        let cancel = shared.cancel.child_token();
        let task = tokio::spawn(run_video(
            shared,
            cancel.clone(),
            channel,
            video.transport,
            video.timeout(),
        ));

        info!("Video started over {}", ChannelKind::from(video.transport));
        Ok(VideoStream { cancel, task })
    }

    pub fn takeoff(&self) -> Result<()> {
        self.with_engine(|engine| engine.takeoff())
    }

    pub fn land(&self) -> Result<()> {
        self.with_engine(|engine| engine.land())
    }

    pub fn hover(&self) -> Result<()> {
        self.with_engine(|engine| engine.hover())
    }

    pub fn flat_trim(&self) -> Result<()> {
        self.with_engine(|engine| engine.flat_trim())
    }

    /// Request the configuration dump on the configuration channel
    pub fn request_configuration(&self) -> Result<()> {
        self.with_engine(|engine| engine.request_configuration())
    }

    pub fn play_animation(&self, animation: FlightAnimation, duration: Duration) -> Result<()> {
        self.with_engine(|engine| engine.play_animation(animation, duration))
    }

    pub fn play_led_animation(&self, animation: LedAnimation, frequency: f32, duration: Duration) -> Result<()> {
        self.with_engine(|engine| engine.play_led_animation(animation, frequency, duration))
    }

    pub fn set_emergency(&self) -> Result<()> {
        self.with_engine(|engine| engine.set_emergency())
    }

    pub fn reset_emergency(&self) -> Result<()> {
        self.with_engine(|engine| engine.reset_emergency())
    }

    pub fn send_command(&self, kind: AtCommandKind) -> Result<u32> {
        self.with_engine(|engine| engine.enqueue_command(kind))
    }

    /// Queue one configuration entry
    pub fn configure(&self, entry: ConfigEntry) -> Result<()> {
        self.with_engine(|engine| engine.enqueue_config(entry))
    }

    /// Queue several configuration entries in order
    pub fn configure_all(&self, entries: impl IntoIterator<Item = ConfigEntry>) -> Result<()> {
        self.with_engine(|engine| entries.into_iter().try_for_each(|entry| engine.enqueue_config(entry)))
    }

    pub fn configure_multi(&self, application: &str, user: &str) -> Result<()> {
        self.with_engine(|engine| engine.configure_multi(application, user))
    }

    /// Attach or detach the progressive input source
    pub fn set_flight_input(&self, input: Option<Arc<dyn FlightInput>>) {
        self.with_engine(|engine| engine.set_flight_input(input));
    }
}

impl Drop for DroneLink {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.shared.close();
            lock_engine(&self.engine).disconnect();
        }
    }
}

fn transport_error(context: &str, error: io::Error) -> DroneError {
    DroneError::Transport(format!("{}: {}", context, error))
}

async fn run_sender(
    shared: Arc<SessionShared>,
    channel: Box<dyn Channel>,
    period: Duration,
    send_timeout: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let tick = lock_engine(&shared.engine).tick();
        let batch = match tick {
            Ok(batch) => batch,
            Err(_) => {
                debug!("Engine disconnected, sender loop exiting");
                break;
            }
        };

        debug!("Sending command(s): {}", batch.escape_debug());
        match timeout(send_timeout, channel.send(batch.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                shared.fail(&transport_error("command send", e));
                break;
            }
            Err(_) => {
                shared.fail(&DroneError::TransportTimeout(format!(
                    "command send exceeded {:?}",
                    send_timeout
                )));
                break;
            }
        }
    }
}

async fn run_navdata(
    shared: Arc<SessionShared>,
    channel: Box<dyn Channel>,
    recv_timeout: Duration,
    burst_window: Duration,
) {
    let mut guard = SequenceGuard::new(burst_window);

    loop {
        let received = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            received = timeout(recv_timeout, channel.recv()) => received,
        };

        match received {
            Ok(Ok(data)) => handle_navdata(&shared, &mut guard, &data),
            Ok(Err(e)) => {
                shared.fail(&transport_error("navdata receive", e));
                break;
            }
            Err(_) => {
                warn!("Network timeout detected");
                shared.fail(&DroneError::TransportTimeout(format!(
                    "no telemetry within {:?}",
                    recv_timeout
                )));
                break;
            }
        }

        if shared.is_closed() {
            break;
        }
    }
}

/// Decode, filter and dispatch one telemetry datagram
///
/// Events are raised in this order: engine events (connection,
/// configuration complete, status edges), the status word, the demo
/// sample, and detected vision tags.
fn handle_navdata(shared: &SessionShared, guard: &mut SequenceGuard, data: &[u8]) {
    let navdata = match decode_navdata(data) {
        Ok(navdata) => navdata,
        Err(e) => {
            warn!("Dropping telemetry: {}", e);
            return;
        }
    };
    if let Err(e) = verify_checksum(&navdata, data) {
        error!("Received invalid navdata from drone: {}", e);
        return;
    }
    if guard.accept(navdata.sequence(), Instant::now().into_std()).is_err() {
        return;
    }

    let status = navdata.status();
    debug!("Drone status 0x{:08X} (sequence {})", status.raw(), navdata.sequence());

    let engine_events = match lock_engine(&shared.engine).on_telemetry(status) {
        Ok(events) => events,
        Err(e) => {
            debug!("Telemetry ignored: {}", e);
            return;
        }
    };

    for event in engine_events {
        match event {
            EngineEvent::ConnectionEstablished => shared.events.emit(&DroneEvent::Connected),
            EngineEvent::ConfigurationComplete => shared.events.emit(&DroneEvent::ConfigurationComplete),
            EngineEvent::Transition(transition) => shared.events.emit(&DroneEvent::Transition(transition)),
            EngineEvent::CommunicationLost => {
                shared.fail(&DroneError::Transport("drone reported communication lost".to_string()));
                return;
            }
        }
    }

    shared.events.emit(&DroneEvent::Status(status));
    if let Some(sample) = navdata.sample() {
        shared.events.emit(&DroneEvent::Telemetry(&sample));
    }
    if !navdata.vision_tags.is_empty() {
        shared.events.emit(&DroneEvent::VisionDetect(&navdata.vision_tags));
    }
}

async fn run_config_channel(shared: Arc<SessionShared>, channel: Box<dyn Channel>) {
    let mut pending = BytesMut::new();

    loop {
        let received = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            received = channel.recv() => received,
        };

        match received {
            Ok(data) => {
                pending.extend_from_slice(&data);
                emit_config_lines(&shared.events, &mut pending);
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!("Configuration channel closed by drone");
                break;
            }
            Err(e) => {
                shared.fail(&transport_error("configuration receive", e));
                break;
            }
        }
    }
}

/// Emit every complete line in `pending`, keeping a trailing partial line
fn emit_config_lines(events: &EventBus, pending: &mut BytesMut) {
    while let Some(end) = pending.iter().position(|&byte| byte == b'\n') {
        let line = pending.split_to(end + 1);
        let text = String::from_utf8_lossy(&line[..end]);
        let text = text.trim_end_matches('\r');
        if text.is_empty() {
            continue;
        }

        info!("Config: {}", text);
        events.emit(&DroneEvent::ConfigLine(text));
    }
}

async fn run_video(
    shared: Arc<SessionShared>,
    cancel: CancellationToken,
    channel: Box<dyn Channel>,
    transport: VideoTransport,
    recv_timeout: Duration,
) {
    let mut decoder = UvlcDecoder::new();
    let mut depacketizer = PaveDepacketizer::new();

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = timeout(recv_timeout, channel.recv()) => received,
        };

        let data = match received {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                error!("Video channel failed: {}", e);
                break;
            }
            Err(_) => {
                debug!("No video data within {:?}", recv_timeout);
                continue;
            }
        };

        match transport {
            VideoTransport::Udp => decode_picture(&shared.events, &mut decoder, &data),
            VideoTransport::Tcp => {
                depacketizer.push(&data);
                loop {
                    match depacketizer.next_frame() {
                        Ok(Some(frame)) => decode_picture(&shared.events, &mut decoder, &frame.payload),
                        Ok(None) => break,
                        Err(e) => debug!("Resynchronizing video stream: {}", e),
                    }
                }
            }
        }
    }
}

fn decode_picture(events: &EventBus, decoder: &mut UvlcDecoder, data: &[u8]) {
    debug!("Got drone image ({} bytes)", data.len());
    match decoder.decode(data) {
        Ok(frame) => events.emit_frame(frame),
        Err(e) => warn!("Dropping video picture: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navdata::decoder::fixtures::NavDataBuilder;
    use crate::navdata::status::mask;
    use crate::transport::mocks::MockConnector;
    use crate::video::decoder::fixtures::empty_cif_picture;
    use tokio::time::sleep;

    const COMMAND: u16 = 5556;
    const NAVDATA: u16 = 5554;
    const VIDEO: u16 = 5555;
    const CONTROL: u16 = 5559;

    type EventLog = Arc<Mutex<Vec<String>>>;

    fn describe(event: &DroneEvent<'_>) -> String {
        match event {
            DroneEvent::Connected => "connected".to_string(),
            DroneEvent::Status(status) => format!("status:{:08x}", status.raw()),
            DroneEvent::Telemetry(sample) => format!("telemetry:{}", sample.battery_percentage),
            DroneEvent::VisionDetect(tags) => format!("vision:{}", tags.len()),
            DroneEvent::Transition(transition) => format!("transition:{:?}", transition),
            DroneEvent::ConfigurationComplete => "config-complete".to_string(),
            DroneEvent::ConfigLine(line) => format!("config:{}", line),
            DroneEvent::Frame(frame) => format!("frame:{}x{}#{}", frame.width, frame.height, frame.frame_index),
            DroneEvent::CommunicationFailure => "failure".to_string(),
        }
    }

    fn test_link(config: Config) -> (DroneLink, MockConnector, EventLog) {
        let connector = MockConnector::new();
        let link = DroneLink::with_connector(config, Arc::new(connector.clone()));
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        link.subscribe(move |event| sink.lock().unwrap().push(describe(event)));
        (link, connector, log)
    }

    fn count(log: &EventLog, entry: &str) -> usize {
        log.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_opens_channels_and_wakes_telemetry() {
        let (mut link, connector, _log) = test_link(Config::default());
        link.connect().await.unwrap();

        assert_eq!(
            connector.get_connections(),
            vec![
                (ChannelKind::Udp, COMMAND),
                (ChannelKind::Udp, NAVDATA),
                (ChannelKind::Tcp, CONTROL)
            ]
        );
        assert_eq!(connector.channel(NAVDATA).get_sent_data(), vec![NAVDATA_WAKE_UP.to_vec()]);
        assert_eq!(link.connection_state(), ConnectionState::Bootstrapping);

        link.disconnect().await;
        assert_eq!(link.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_stops_after_disconnect() {
        let (mut link, connector, _log) = test_link(Config::default());
        link.connect().await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let sent = connector.channel(COMMAND).get_sent_text();
        assert!(sent.len() >= 3, "only {} batches", sent.len());
        assert_eq!(sent[0], "AT*REF=1,290717696\r");
        assert_eq!(sent[1], "AT*REF=2,290717696\r");

        link.disconnect().await;
        let after_disconnect = connector.channel(COMMAND).get_sent_data().len();
        sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.channel(COMMAND).get_sent_data().len(), after_disconnect);

        // Idempotent
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_establishes_connection() {
        let (mut link, connector, log) = test_link(Config::default());
        link.connect().await.unwrap();

        connector
            .channel(NAVDATA)
            .push(NavDataBuilder::new(0, 1).demo(80, 1500, 0.0, 0.0, 0.0).finish());
        sleep(Duration::from_millis(50)).await;

        assert_eq!(link.connection_state(), ConnectionState::Connected);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["connected", "status:00000000", "telemetry:80"]
        );
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_checksum_dropped() {
        let (mut link, connector, log) = test_link(Config::default());
        link.connect().await.unwrap();

        connector
            .channel(NAVDATA)
            .push(NavDataBuilder::new(0, 1).finish_with_checksum(Some(0xDEAD)));
        connector.channel(NAVDATA).push(vec![0u8; 8]);
        sleep(Duration::from_millis(50)).await;

        assert_eq!(link.connection_state(), ConnectionState::Bootstrapping);
        assert!(log.lock().unwrap().is_empty());
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_telemetry_dropped() {
        let (mut link, connector, log) = test_link(Config::default());
        link.connect().await.unwrap();
        let navdata = connector.channel(NAVDATA);

        navdata.push(NavDataBuilder::new(0, 5).finish());
        sleep(Duration::from_millis(50)).await;
        navdata.push(NavDataBuilder::new(0, 4).finish());
        sleep(Duration::from_millis(50)).await;
        navdata.push(NavDataBuilder::new(0, 1).finish());
        sleep(Duration::from_millis(50)).await;

        assert_eq!(count(&log, "status:00000000"), 2);
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_navdata_timeout_fails_once() {
        let (mut link, _connector, log) = test_link(Config::default());
        link.connect().await.unwrap();

        sleep(Duration::from_secs(3)).await;

        assert_eq!(count(&log, "failure"), 1);
        assert!(!link.is_connected());
        link.disconnect().await;
        assert_eq!(count(&log, "failure"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_error_fails_link() {
        let (mut link, connector, log) = test_link(Config::default());
        connector.channel(COMMAND).set_send_error(io::ErrorKind::BrokenPipe);
        link.connect().await.unwrap();

        sleep(Duration::from_millis(100)).await;

        assert_eq!(count(&log, "failure"), 1);
        assert_eq!(link.connection_state(), ConnectionState::Disconnected);
        assert!(matches!(link.takeoff(), Err(DroneError::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_communication_lost_fails_link() {
        let (mut link, connector, log) = test_link(Config::default());
        link.connect().await.unwrap();
        let navdata = connector.channel(NAVDATA);

        navdata.push(NavDataBuilder::new(0, 1).finish());
        sleep(Duration::from_millis(50)).await;
        navdata.push(NavDataBuilder::new(mask::COM_LOST, 2).finish());
        sleep(Duration::from_millis(50)).await;

        assert_eq!(count(&log, "failure"), 1);
        assert!(!link.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_configuration_acknowledged_over_link() {
        let (mut link, connector, log) = test_link(Config::default());
        link.connect().await.unwrap();
        let navdata = connector.channel(NAVDATA);

        navdata.push(NavDataBuilder::new(0, 1).finish());
        sleep(Duration::from_millis(50)).await;
        link.configure(ConfigEntry::navdata_demo()).unwrap();

        navdata.push(NavDataBuilder::new(0, 2).finish());
        sleep(Duration::from_millis(50)).await;
        navdata.push(NavDataBuilder::new(mask::COMMAND, 3).finish());
        sleep(Duration::from_millis(50)).await;

        let sent = connector.channel(COMMAND).get_sent_text().concat();
        assert!(sent.contains("\"general:navdata_demo\",\"TRUE\"\r"));
        assert!(sent.contains(",5,0\r"));
        assert_eq!(count(&log, "config-complete"), 1);
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_lines_reported() {
        let (mut link, connector, log) = test_link(Config::default());
        link.connect().await.unwrap();
        let control = connector.channel(CONTROL);

        control.push(&b"general:navdata_demo = TRUE\ncontrol:outdoor = "[..]);
        control.push(&b"FALSE\r\n\n"[..]);
        sleep(Duration::from_millis(10)).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["config:general:navdata_demo = TRUE", "config:control:outdoor = FALSE"]
        );
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_channel_failure_not_fatal() {
        let (mut link, connector, _log) = test_link(Config::default());
        connector.set_connect_error(CONTROL);

        link.connect().await.unwrap();
        assert_eq!(connector.get_connections().len(), 2);
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_channel_failure() {
        let (mut link, connector, _log) = test_link(Config::default());
        connector.set_connect_error(COMMAND);

        assert!(matches!(link.connect().await, Err(DroneError::Transport(_))));
        assert_eq!(link.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_require_connection() {
        let (mut link, _connector, _log) = test_link(Config::default());

        assert!(matches!(link.takeoff(), Err(DroneError::NotConnected)));
        assert!(matches!(link.configure(ConfigEntry::outdoor(true)), Err(DroneError::NotConnected)));
        assert!(matches!(link.start_video().await, Err(DroneError::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_restarts_sequence() {
        let (mut link, connector, _log) = test_link(Config::default());
        link.connect().await.unwrap();
        sleep(Duration::from_millis(100)).await;

        link.connect().await.unwrap();
        let before = connector.channel(COMMAND).get_sent_data().len();
        sleep(Duration::from_millis(10)).await;

        let sent = connector.channel(COMMAND).get_sent_text();
        assert_eq!(sent[before], "AT*REF=1,290717696\r");
        assert_eq!(connector.channel(NAVDATA).get_sent_data().len(), 2);
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_udp_video_emits_frames() {
        let (mut link, connector, log) = test_link(Config::default());
        link.connect().await.unwrap();
        link.start_video().await.unwrap();

        let video = connector.channel(VIDEO);
        assert_eq!(video.get_sent_data(), vec![VIDEO_WAKE_UP.to_vec()]);

        video.push(empty_cif_picture(3));
        video.push(vec![0xFFu8; 8]);
        video.push(empty_cif_picture(4));
        sleep(Duration::from_millis(10)).await;

        assert_eq!(count(&log, "frame:88x72#3"), 1);
        assert_eq!(count(&log, "frame:88x72#4"), 1);

        link.stop_video().await;
        video.push(empty_cif_picture(5));
        sleep(Duration::from_millis(10)).await;
        assert_eq!(count(&log, "frame:88x72#5"), 0);
        link.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_tcp_video_reassembles_pave_frames() {
        let mut config = Config::default();
        config.video.enabled = true;
        config.video.transport = VideoTransport::Tcp;
        let (mut link, connector, log) = test_link(config);
        link.connect().await.unwrap();
        assert!(connector.get_connections().contains(&(ChannelKind::Tcp, VIDEO)));

        let picture = empty_cif_picture(9);
        let mut stream = b"junk".to_vec();
        stream.extend_from_slice(b"PaVE");
        stream.push(2);
        stream.push(1);
        stream.extend_from_slice(&12u16.to_le_bytes());
        stream.extend_from_slice(&(picture.len() as u32).to_le_bytes());
        stream.extend_from_slice(&picture);

        let (first, second) = stream.split_at(10);
        let video = connector.channel(VIDEO);
        video.push(first.to_vec());
        video.push(second.to_vec());
        sleep(Duration::from_millis(10)).await;

        assert_eq!(count(&log, "frame:88x72#9"), 1);
        assert!(video.get_sent_data().is_empty());
        link.disconnect().await;
    }
}
