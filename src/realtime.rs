use crate::models::{ChangeEvent, Task};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const TASKS_TOPIC: &str = "realtime:public:tasks";
const JOIN_REF: &str = "1";
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

#[derive(Debug, PartialEq)]
pub enum RealtimeMessage {
    Change(ChangeEvent),
    Status(ChannelStatus),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChannelStatus {
    Connected,
    Joined,
    Closed,
}

/// Runs the change-notification channel until the socket drops or the
/// receiving side goes away. There is no reconnect: the periodic full
/// refresh keeps the list honest if the channel dies.
pub async fn listen(url: String, access_token: String, tx: UnboundedSender<RealtimeMessage>) {
    if let Err(err) = run(&url, &access_token, &tx).await {
        eprintln!("Realtime channel error: {}", err);
    }
    let _ = tx.send(RealtimeMessage::Status(ChannelStatus::Closed));
}

async fn run(
    url: &str,
    access_token: &str,
    tx: &UnboundedSender<RealtimeMessage>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (socket, _) = connect_async(url).await?;
    let _ = tx.send(RealtimeMessage::Status(ChannelStatus::Connected));
    let (mut write, mut read) = socket.split();

    // Phoenix-channel join, asking for every change on the tasks table.
    let join = json!({
        "topic": TASKS_TOPIC,
        "event": "phx_join",
        "ref": JOIN_REF,
        "payload": {
            "access_token": access_token,
            "config": {
                "postgres_changes": [
                    { "event": "*", "schema": "public", "table": "tasks" }
                ]
            }
        }
    });
    write.send(Message::text(join.to_string())).await?;

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut message_ref: u64 = 2;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let beat = json!({
                    "topic": "phoenix",
                    "event": "heartbeat",
                    "ref": message_ref.to_string(),
                    "payload": {}
                });
                message_ref += 1;
                write.send(Message::text(beat.to_string())).await?;
            }
            incoming = read.next() => {
                let message = match incoming {
                    Some(message) => message?,
                    None => break,
                };
                if let Message::Text(text) = message {
                    if let Some(decoded) = decode_message(text.as_str()) {
                        if tx.send(decoded).is_err() {
                            // The UI loop is gone; stop listening.
                            break;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Decodes one raw channel frame. Frames that carry no state for us
/// (heartbeat replies, presence noise, unknown event kinds) map to None.
pub fn decode_message(raw: &str) -> Option<RealtimeMessage> {
    let frame: Value = serde_json::from_str(raw).ok()?;
    match frame.get("event")?.as_str()? {
        "phx_reply" => {
            let joined = frame.get("ref").and_then(Value::as_str) == Some(JOIN_REF)
                && frame["payload"]["status"].as_str() == Some("ok");
            joined.then_some(RealtimeMessage::Status(ChannelStatus::Joined))
        }
        "postgres_changes" => {
            decode_change(&frame["payload"]["data"]).map(RealtimeMessage::Change)
        }
        _ => None,
    }
}

fn decode_change(data: &Value) -> Option<ChangeEvent> {
    match data.get("type")?.as_str()? {
        "INSERT" => {
            let new = serde_json::from_value::<Task>(data["record"].clone()).ok()?;
            Some(ChangeEvent::Insert { new })
        }
        "UPDATE" => {
            let new = serde_json::from_value::<Task>(data["record"].clone()).ok()?;
            Some(ChangeEvent::Update { new })
        }
        // Delete notifications only carry the old row's primary key.
        "DELETE" => {
            let id = data["old_record"]["id"].as_i64()?;
            Some(ChangeEvent::Delete { id })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change_frame(data: Value) -> String {
        json!({
            "topic": TASKS_TOPIC,
            "event": "postgres_changes",
            "ref": null,
            "payload": { "ids": [1], "data": data }
        })
        .to_string()
    }

    #[test]
    fn test_decode_insert_notification() {
        let raw = change_frame(json!({
            "type": "INSERT",
            "record": {
                "id": 7,
                "title": "Buy milk",
                "description": "Two litres",
                "image_url": null,
                "created_at": "2024-01-01T12:00:00+00:00",
                "email": "a@b.com"
            }
        }));
        let decoded = decode_message(&raw);
        match decoded {
            Some(RealtimeMessage::Change(ChangeEvent::Insert { new })) => {
                assert_eq!(new.id, 7);
                assert_eq!(new.title, "Buy milk");
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_update_notification() {
        let raw = change_frame(json!({
            "type": "UPDATE",
            "record": {
                "id": 7,
                "title": "Buy oat milk",
                "description": "Two litres",
                "created_at": "2024-01-01T12:00:00+00:00"
            },
            "old_record": { "id": 7 }
        }));
        let decoded = decode_message(&raw);
        match decoded {
            Some(RealtimeMessage::Change(ChangeEvent::Update { new })) => {
                assert_eq!(new.title, "Buy oat milk");
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_delete_notification() {
        let raw = change_frame(json!({
            "type": "DELETE",
            "old_record": { "id": 9 }
        }));
        assert_eq!(
            decode_message(&raw),
            Some(RealtimeMessage::Change(ChangeEvent::Delete { id: 9 }))
        );
    }

    #[test]
    fn test_unknown_change_kind_is_dropped() {
        let raw = change_frame(json!({ "type": "TRUNCATE" }));
        assert_eq!(decode_message(&raw), None);
    }

    #[test]
    fn test_join_reply_reports_joined() {
        let raw = json!({
            "topic": TASKS_TOPIC,
            "event": "phx_reply",
            "ref": "1",
            "payload": { "status": "ok", "response": {} }
        })
        .to_string();
        assert_eq!(
            decode_message(&raw),
            Some(RealtimeMessage::Status(ChannelStatus::Joined))
        );
    }

    #[test]
    fn test_heartbeat_reply_is_dropped() {
        let raw = json!({
            "topic": "phoenix",
            "event": "phx_reply",
            "ref": "2",
            "payload": { "status": "ok", "response": {} }
        })
        .to_string();
        assert_eq!(decode_message(&raw), None);
    }
}
