//! Plain-text report stream consumed by the external report generator
//!
//! Each submitted exchange produces one `Scenario: ... - Request: ...` line
//! followed by one `Response: ...` line. Diagnostics go through `tracing` on
//! stderr and never reach this stream.

use crate::error::HarnessResult;
use crate::rpc::compact;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Destination for report lines
pub trait ReportSink: Send + Sync {
    fn write_line(&self, line: &str) -> HarnessResult<()>;
}

/// Line-buffered writer sink over stdout or a file
pub struct WriterSink {
    inner: Mutex<Box<dyn Write + Send>>,
}

impl WriterSink {
    pub fn stdout() -> Self {
        Self {
            inner: Mutex::new(Box::new(io::stdout())),
        }
    }

    pub fn file(path: &Path) -> HarnessResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Mutex::new(Box::new(BufWriter::new(file))),
        })
    }
}

impl ReportSink for WriterSink {
    fn write_line(&self, line: &str) -> HarnessResult<()> {
        let mut out = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("report writer poisoned"))?;
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

/// Extra context appended to a response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// The pre-send hook failed; the primary was still sent
    CompanionFailed(String),
    /// The pre-send hook produced information rather than a transaction
    Note(String),
}

/// Formats scenario exchanges onto a sink
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ReportSink>,
    max_request_len: usize,
}

impl Reporter {
    pub fn new(sink: Arc<dyn ReportSink>, max_request_len: usize) -> Self {
        Self {
            sink,
            max_request_len,
        }
    }

    pub fn header(&self, run_id: &str, network: &str, started: &str) -> HarnessResult<()> {
        self.sink.write_line(&format!(
            "Run: {} Network: {} Started: {}",
            run_id, network, started
        ))
    }

    pub fn test_case(&self, name: &str) -> HarnessResult<()> {
        self.sink.write_line(&format!("Test: {}", name))
    }

    pub fn request(&self, description: &str, request_json: &str) -> HarnessResult<()> {
        self.sink.write_line(&format!(
            "Scenario: {}  - Request: {}",
            description,
            truncate(request_json, self.max_request_len)
        ))
    }

    pub fn response(&self, body: &str, annotation: Option<&Annotation>) -> HarnessResult<()> {
        let mut line = format!("Response: {}", compact(body));
        match annotation {
            Some(Annotation::CompanionFailed(msg)) => {
                line.push_str(&format!(", PreSend Error: {}", msg))
            }
            Some(Annotation::Note(msg)) => line.push_str(&format!(", PreSend Note: {}", msg)),
            None => {}
        }
        self.sink.write_line(&line)
    }

    /// Transport-level failure in place of a response
    pub fn failure(&self, message: &str) -> HarnessResult<()> {
        self.sink.write_line(&format!("Error: {}", message))
    }
}

/// Cut `s` to at most `max` characters, marking the cut with `...`
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
