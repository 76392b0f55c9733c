// ── MQTT transport ──
//
// Publishes router replies through rumqttc and feeds inbound publishes
// into the router's bounded queue. The event loop reconnects on its own;
// each ConnAck re-subscribes because sessions are clean.

use std::time::Duration;

use lvibridge_config::MqttConfig;
use lvibridge_core::{BusEvent, BusPublisher, ConnectionState, CoreError, FimpMessage, Inbound};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use secrecy::ExposeSecret;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Reply side of the broker connection.
#[derive(Debug, Clone)]
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Build the client and its (not yet polled) event loop.
    pub fn connect(config: &MqttConfig) -> (Self, EventLoop) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive());
        if let Some(username) = &config.username {
            let password = config
                .password()
                .map(|p| p.expose_secret().to_owned())
                .unwrap_or_default();
            options.set_credentials(username, password);
        }
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        (Self { client }, eventloop)
    }

    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "disconnect request not delivered");
        }
    }
}

impl BusPublisher for MqttBus {
    async fn publish(&self, topic: &str, message: &FimpMessage) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| CoreError::Internal(format!("encode {}: {e}", message.msg_type)))?;
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| CoreError::Bus {
                message: e.to_string(),
            })
    }
}

/// Poll the broker until cancelled, forwarding parsed messages to `tx`.
///
/// A full queue drops the message with a warning rather than stalling
/// keep-alives.
pub async fn pump_events(
    mut eventloop: EventLoop,
    client: AsyncClient,
    topics: Vec<String>,
    tx: mpsc::Sender<BusEvent>,
    cancel: CancellationToken,
) {
    let mut connected = false;
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(topics = topics.len(), "connected to broker");
                for topic in &topics {
                    if let Err(e) = client.try_subscribe(topic, QoS::AtLeastOnce) {
                        warn!(%topic, error = %e, "subscribe failed");
                    }
                }
                connected = true;
                notify(&tx, ConnectionState::Connected);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let inbound = match Inbound::parse(&publish.topic, &publish.payload) {
                    Ok(inbound) => inbound,
                    Err(e) => {
                        debug!(topic = %publish.topic, error = %e, "ignoring unparseable message");
                        continue;
                    }
                };
                match tx.try_send(BusEvent::Message(inbound)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(topic = %publish.topic, "inbound queue full, message dropped");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
            Ok(_) => {}
            Err(e) => {
                if connected {
                    warn!(error = %e, "broker connection lost");
                    connected = false;
                    notify(&tx, ConnectionState::Disconnected);
                } else {
                    debug!(error = %e, "broker still unreachable");
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }
    debug!("broker pump stopped");
}

fn notify(tx: &mpsc::Sender<BusEvent>, state: ConnectionState) {
    if tx.try_send(BusEvent::Connection(state)).is_err() {
        debug!(?state, "connection state change not queued");
    }
}
