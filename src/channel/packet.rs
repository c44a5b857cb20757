//! Engine.IO v4 / Socket.IO v4 text framing for the websocket transport.
//!
//! Only the default namespace is used. Binary events and acknowledgements
//! are not produced; an ack id on an incoming event is skipped.

use serde_json::Value;

use crate::error::ChannelError;

// Namespace connect, sent once the transport is open
pub const CONNECT: &str = "40";

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Transport handshake (`0{...}`).
    Open(String),
    Close,
    /// Heartbeat from the server; must be answered with a pong.
    Ping(String),
    Pong(String),
    /// Namespace connected (`40`).
    Connected,
    /// Namespace disconnected (`41`).
    Disconnected,
    Event { name: String, payload: Value },
    ConnectError(String),
    /// Anything this client does not act on.
    Other(String),
}

pub fn decode(frame: &str) -> Result<Packet, ChannelError> {
    let mut chars = frame.chars();
    let packet = match chars.next() {
        Some('0') => Packet::Open(frame[1..].to_string()),
        Some('1') => Packet::Close,
        Some('2') => Packet::Ping(frame[1..].to_string()),
        Some('3') => Packet::Pong(frame[1..].to_string()),
        Some('4') => decode_message(&frame[1..])?,
        Some(_) => Packet::Other(frame.to_string()),
        None => return Err(ChannelError::Malformed("empty frame".to_string())),
    };
    Ok(packet)
}

fn decode_message(body: &str) -> Result<Packet, ChannelError> {
    let mut chars = body.chars();
    let packet = match chars.next() {
        Some('0') => Packet::Connected,
        Some('1') => Packet::Disconnected,
        Some('2') => decode_event(&body[1..])?,
        Some('4') => Packet::ConnectError(body[1..].to_string()),
        _ => Packet::Other(format!("4{}", body)),
    };
    Ok(packet)
}

fn decode_event(body: &str) -> Result<Packet, ChannelError> {
    let mut rest = body;
    // Optional namespace: "/name,"
    if rest.starts_with('/') {
        rest = match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => return Err(ChannelError::Malformed(format!("namespace without payload: {}", body))),
        };
    }
    // Optional ack id
    rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    let mut items = match serde_json::from_str::<Value>(rest)? {
        Value::Array(items) => items.into_iter(),
        other => return Err(ChannelError::Malformed(format!("event is not an array: {}", other))),
    };
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(ChannelError::Malformed(format!("event without a name: {}", body))),
    };
    let payload = items.next().unwrap_or(Value::Null);
    Ok(Packet::Event { name, payload })
}

pub fn encode_event(name: &str, payload: Value) -> Result<String, ChannelError> {
    let body = serde_json::to_string(&Value::Array(vec![Value::String(name.to_string()), payload]))?;
    Ok(format!("42{}", body))
}

pub fn pong(data: &str) -> String {
    format!("3{}", data)
}
