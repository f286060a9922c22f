// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Console log forwarding
//
// `ConsoleLayer` is installed into the host's tracing subscriber. It formats
// each event into a `ConsoleLine` and pushes it onto a bounded lock-free
// queue; the plugin drains the queue from `poll_one` and publishes the lines
// on `<topic>/trunk_recorder/console`.

use crate::protocol::ConsoleLine;
use crossbeam::queue::ArrayQueue;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const DEFAULT_CAPACITY: usize = 1000;

// Our own publish path logs through tracing as well; forwarding those
// lines would feed back into the queue on every failed publish.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Shared buffer between the tracing layer and the plugin
#[derive(Clone)]
pub struct ConsoleBuffer {
    queue: Arc<ArrayQueue<ConsoleLine>>,
}

impl ConsoleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
        }
    }

    /// Enqueue a line, dropping it when the buffer is full
    pub fn push(&self, line: ConsoleLine) -> bool {
        self.queue.push(line).is_ok()
    }

    /// Take every pending line in arrival order
    pub fn drain(&self) -> Vec<ConsoleLine> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Tracing layer feeding this buffer
    pub fn layer(&self) -> ConsoleLayer {
        ConsoleLayer {
            buffer: self.clone(),
        }
    }
}

impl Default for ConsoleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

pub struct ConsoleLayer {
    buffer: ConsoleBuffer,
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

fn severity(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warning",
        Level::ERROR => "error",
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(OWN_TARGET) || metadata.target().starts_with("rumqttc") {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let line = ConsoleLine {
            time: chrono::Local::now().to_rfc3339(),
            severity: severity(metadata.level()).to_string(),
            log_msg: format!("{}{}", visitor.message, visitor.fields),
        };

        self.buffer.push(line);
    }
}
