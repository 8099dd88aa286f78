//! Structured JSON event trace
//!
//! A broker subscriber that renders every signaling message and a
//! configurable fraction of the voice frames as one JSON object per line,
//! appended to the configured trace file.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use callstream_config::CfgTracer;
use callstream_logapi::fields::descr_to_string;
use callstream_logapi::messages::*;
use callstream_logapi::voice::stream_originator_name;

use crate::broker::{Broker, Event, EventContent, Subscription};

fn message_name(body: &LogApiBody) -> &'static str {
    match body {
        LogApiBody::KeepAlive(_) => "LOG_API_ALIVE",
        LogApiBody::DuplexCallChange(_) => "LOG_API_DUPLEX_CALL_CHANGE",
        LogApiBody::DuplexCallRelease(_) => "LOG_API_DUPLEX_CALL_RELEASE",
        LogApiBody::SimplexCallStartChange(_) => "LOG_API_SIMPLEX_CALL_CHANGE",
        LogApiBody::SimplexCallPttChange(_) => "LOG_API_SIMPLEX_CALL_PTT_CHANGE",
        LogApiBody::SimplexCallRelease(_) => "LOG_API_SIMPLEX_CALL_RELEASE",
        LogApiBody::GroupCallStartChange(_) => "LOG_API_GROUP_CALL_CHANGE",
        LogApiBody::GroupCallPttActive(_) => "LOG_API_GROUP_CALL_PTT_ACTIVE",
        LogApiBody::GroupCallPttIdle(_) => "LOG_API_GROUP_CALL_PTT_IDLE",
        LogApiBody::GroupCallRelease(_) => "LOG_API_GROUP_CALL_RELEASE",
        LogApiBody::StatusSds(_) => "LOG_API_SDS_STATUS",
        LogApiBody::TextSds(_) => "LOG_API_SDS_TEXT",
    }
}

fn parties_json(parties: &SdsParties) -> Value {
    json!({
        "a_tsi": parties.a_tsi.to_string(),
        "a_number": parties.a_number.to_digits(),
        "a_descr": descr_to_string(&parties.a_descr),
        "b_tsi": parties.b_tsi.to_string(),
        "b_number": parties.b_number.to_digits(),
        "b_descr": descr_to_string(&parties.b_descr),
    })
}

fn body_json(body: &LogApiBody) -> Value {
    match body {
        LogApiBody::KeepAlive(m) => json!({
            "server_no": m.server_no,
            "timeout": m.timeout,
            "sw_ver_string": String::from_utf8_lossy(&m.sw_ver_string).trim_end_matches('\0'),
            "descr": descr_to_string(&m.descr),
        }),
        LogApiBody::DuplexCallChange(m) | LogApiBody::SimplexCallStartChange(m) => json!({
            "call_id": m.call_id,
            "action": indi_action_name(m.action),
            "timeout": m.timeout,
            "a_tsi": m.a_tsi.to_string(),
            "a_number": m.a_number.to_digits(),
            "a_descr": descr_to_string(&m.a_descr),
            "b_tsi": m.b_tsi.to_string(),
            "b_number": m.b_number.to_digits(),
            "b_descr": descr_to_string(&m.b_descr),
        }),
        LogApiBody::DuplexCallRelease(m) | LogApiBody::SimplexCallRelease(m) => json!({
            "call_id": m.call_id,
            "release_cause": indi_release_cause_name(m.release_cause),
        }),
        LogApiBody::GroupCallRelease(m) => json!({
            "call_id": m.call_id,
            "release_cause": group_release_cause_name(m.release_cause),
        }),
        LogApiBody::SimplexCallPttChange(m) => json!({
            "call_id": m.call_id,
            "talking_party": talking_party_name(m.talking_party),
        }),
        LogApiBody::GroupCallStartChange(m) => json!({
            "call_id": m.call_id,
            "action": group_action_name(m.action),
            "timeout": m.timeout,
            "group_tsi": m.group_tsi.to_string(),
            "group_number": m.group_number.to_digits(),
            "group_descr": descr_to_string(&m.group_descr),
        }),
        LogApiBody::GroupCallPttActive(m) => json!({
            "call_id": m.call_id,
            "tp_tsi": m.tp_tsi.to_string(),
            "tp_number": m.tp_number.to_digits(),
            "tp_descr": descr_to_string(&m.tp_descr),
        }),
        LogApiBody::GroupCallPttIdle(m) => json!({
            "call_id": m.call_id,
        }),
        LogApiBody::StatusSds(m) => {
            let mut value = parties_json(&m.parties);
            value["precoded_status"] = json!(m.precoded_status);
            value
        }
        LogApiBody::TextSds(m) => {
            let mut value = parties_json(&m.parties);
            let end = m.text.iter().position(|&b| b == 0).unwrap_or(m.text.len());
            value["text"] = json!(String::from_utf8_lossy(&m.text[..end]));
            value
        }
    }
}

/// Render one published event as the JSON object written to the trace
pub fn render_event_json(event: &Event) -> Value {
    match &event.content {
        EventContent::Signaling(msg) => {
            let mut value = json!({
                "type": "S",
                "timestamp": event.timestamp,
                "message_type": message_name(&msg.body),
                "sequence": msg.header.sequence,
                "api_version": msg.header.version,
                "msg_id": msg.header.msg_id,
            });
            if let Value::Object(body) = body_json(&msg.body) {
                for (key, field) in body {
                    value[key] = field;
                }
            }
            value
        }
        EventContent::Voice { header, .. } => json!({
            "type": "V",
            "timestamp": event.timestamp,
            "message_type": "VOICE",
            "originator": stream_originator_name(header.originator),
            "node": header.node,
            "call_id": header.call_id,
            "source_and_index": header.source_and_index,
            "stream_random_id": header.stream_random_id,
            "packet_seq": header.packet_seq,
            "payload1_kind": header.payload1_kind,
        }),
    }
}

pub struct Tracer {
    subscription: Subscription,
    writer: Box<dyn Write + Send>,
    /// Write only every n-th voice line, 0 = every frame
    voice_every: u32,
    voice_counter: u32,
}

impl Tracer {
    /// Build the tracer per configuration; None when no trace file is set
    pub fn from_config(broker: &Broker, cfg: &CfgTracer) -> io::Result<Option<Self>> {
        let Some(ref path) = cfg.trace_file else {
            return Ok(None);
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!("tracing events to {}", path);
        Ok(Some(Self::with_writer(broker, cfg, Box::new(BufWriter::new(file)))))
    }

    pub fn with_writer(broker: &Broker, cfg: &CfgTracer, writer: Box<dyn Write + Send>) -> Self {
        let subscription = broker.subscribe(vec!["S_".to_string(), "V_".to_string()]);
        Self {
            subscription,
            writer,
            voice_every: cfg.publish_one_json_voice_msg_every,
            voice_counter: 0,
        }
    }

    /// Write the trace line for one event, applying voice thinning
    pub fn trace_event(&mut self, event: &Event) -> io::Result<()> {
        if matches!(event.content, EventContent::Voice { .. }) {
            self.voice_counter += 1;
            if self.voice_counter <= self.voice_every {
                return Ok(());
            }
            self.voice_counter = 0;
        }

        let line = render_event_json(event);
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()
    }

    /// Consume events until `running` goes false
    pub fn run(&mut self, running: Arc<AtomicBool>) {
        while running.load(Ordering::SeqCst) {
            match self.subscription.receiver.recv_timeout(Duration::from_millis(250)) {
                Ok(event) => {
                    if let Err(e) = self.trace_event(&event) {
                        tracing::error!("trace write failed: {}", e);
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::info!("tracer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callstream_logapi::LogApiMessage;
    use callstream_logapi::fields::{Number, Tsi, descr_from_str};
    use callstream_logapi::voice::{PAYLOAD_INFO_G711, STREAM_ORG_A_SUB, VoiceHeader};

    fn group_setup_event() -> Event {
        Event::signaling(
            1700000000,
            LogApiMessage::new(
                12,
                LogApiBody::GroupCallStartChange(GroupCallChange {
                    call_id: 9001,
                    action: GROUPCALL_NEWCALLSETUP,
                    timeout: 30,
                    group_tsi: Tsi { ssi: 2600, mnc: 1337, mcc: 204 },
                    group_number: Number::from_digits("2600"),
                    group_descr: descr_from_str("Dispatch"),
                }),
            ),
        )
    }

    fn voice_event() -> Event {
        let header = VoiceHeader {
            version: 1,
            originator: STREAM_ORG_A_SUB,
            node: 3,
            call_id: 9001,
            payload1_kind: PAYLOAD_INFO_G711,
            ..VoiceHeader::default()
        };
        Event::voice(1700000001, header, vec![0u8; 480])
    }

    #[test]
    fn test_signaling_json_fields() {
        let value = render_event_json(&group_setup_event());
        assert_eq!(value["type"], "S");
        assert_eq!(value["message_type"], "LOG_API_GROUP_CALL_CHANGE");
        assert_eq!(value["msg_id"], 0x30);
        assert_eq!(value["sequence"], 12);
        assert_eq!(value["call_id"], 9001);
        assert_eq!(value["action"], "NewCallSetup");
        assert_eq!(value["group_tsi"], "204:1337:2600");
        assert_eq!(value["group_number"], "2600");
        assert_eq!(value["group_descr"], "Dispatch");
    }

    #[test]
    fn test_voice_json_fields() {
        let value = render_event_json(&voice_event());
        assert_eq!(value["type"], "V");
        assert_eq!(value["message_type"], "VOICE");
        assert_eq!(value["call_id"], 9001);
        assert_eq!(value["originator"], "ASub");
        assert_eq!(value["payload1_kind"], 7);
    }

    #[test]
    fn test_voice_thinning() {
        let broker = Broker::new();
        let sink = std::sync::Arc::new(std::sync::Mutex::new(Vec::<u8>::new()));

        struct SharedSink(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for SharedSink {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let cfg = CfgTracer {
            trace_file: None,
            publish_one_json_voice_msg_every: 4,
        };
        let mut tracer = Tracer::with_writer(&broker, &cfg, Box::new(SharedSink(sink.clone())));

        for _ in 0..10 {
            tracer.trace_event(&voice_event()).unwrap();
        }
        // Signaling is never thinned
        tracer.trace_event(&group_setup_event()).unwrap();

        let written = sink.lock().unwrap();
        let lines = String::from_utf8_lossy(&written);
        let voice_lines = lines.lines().filter(|l| l.contains("\"V\"")).count();
        let signaling_lines = lines.lines().filter(|l| l.contains("\"S\"")).count();
        // Every 5th voice frame gets through with a thinning value of 4
        assert_eq!(voice_lines, 2);
        assert_eq!(signaling_lines, 1);
    }
}
