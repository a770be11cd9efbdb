//! In-memory fakes for exercising the engine without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::AttemptError;
use crate::events::{FetchEvent, FetchEvents};
use crate::store::Record;
use crate::task::UnitTask;
use crate::transport::Transport;

pub type Reply = Result<Vec<Record>, AttemptError>;

/// `n` records for a successful reply
pub fn ok_body(n: usize) -> Reply {
    Ok((0..n)
        .map(|i| {
            let value = json!({ "countryName": format!("country-{i}"), "carbon": i as f64 });
            match value {
                serde_json::Value::Object(map) => map,
                _ => Record::new(),
            }
        })
        .collect())
}

/// A bare status error reply
pub fn status(code: u16) -> Reply {
    Err(AttemptError::Status {
        code,
        message: String::new(),
    })
}

/// Transport that replays a per-year script. Once a script runs dry the last
/// reply repeats; years without a script get one record.
#[derive(Debug)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<u16, VecDeque<Reply>>>,
    last: Mutex<HashMap<u16, Reply>>,
    calls: Mutex<HashMap<u16, u32>>,
    default: Reply,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::default(),
            last: Mutex::default(),
            calls: Mutex::default(),
            default: ok_body(1),
            latency: Duration::ZERO,
        }
    }

    pub fn with_script(self, year: u16, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(year, replies.into_iter().collect());
        self
    }

    /// Simulated time each request takes
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self, year: u16) -> u32 {
        self.calls.lock().unwrap().get(&year).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn next_reply(&self, year: u16) -> Reply {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&year)
            .and_then(|q| q.pop_front());
        let mut last = self.last.lock().unwrap();
        match scripted {
            Some(reply) => {
                last.insert(year, reply.clone());
                reply
            }
            None => last.get(&year).cloned().unwrap_or_else(|| self.default.clone()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, task: &UnitTask) -> Result<Vec<Record>, AttemptError> {
        *self.calls.lock().unwrap().entry(task.year).or_default() += 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.next_reply(task.year)
    }
}

/// Event sink that keeps everything it receives.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<(u16, FetchEvent)>>,
}

impl RecordingEvents {
    pub fn all(&self) -> Vec<(u16, FetchEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn for_year(&self, year: u16) -> Vec<FetchEvent> {
        self.all()
            .into_iter()
            .filter(|(y, _)| *y == year)
            .map(|(_, e)| e)
            .collect()
    }

    pub fn backoff_delays(&self, year: u16) -> Vec<Duration> {
        self.for_year(year)
            .into_iter()
            .filter_map(|e| match e {
                FetchEvent::BackoffScheduled { delay, .. } => Some(delay),
                _ => None,
            })
            .collect()
    }

    pub fn backoff_count(&self, year: u16) -> usize {
        self.backoff_delays(year).len()
    }
}

impl FetchEvents for RecordingEvents {
    fn emit(&self, year: u16, event: FetchEvent) {
        self.events.lock().unwrap().push((year, event));
    }
}
