//! Fault reporting channel
//!
//! Any component (commands, periodic callbacks, the scheduler itself) can
//! report a [`Fault`]. Faults reported between two calls to
//! [`FaultLog::update`] become the *active* set on the next update and are
//! accumulated into the *total* history.

use crate::commands::{self, ProxyCommand};
use crate::core::{Command, CommandId};
use crate::scheduling::Scheduler;
use crate::trigger::Trigger;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// How bad a fault is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// A free-form fault descriptor
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fault {
    pub source: String,
    pub description: String,
    pub severity: Severity,
}

impl Fault {
    pub fn new(source: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            source: source.into(),
            description: description.into(),
            severity,
        }
    }

    pub fn error(source: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(source, description, Severity::Error)
    }

    pub fn warning(source: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(source, description, Severity::Warning)
    }

    pub fn info(source: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(source, description, Severity::Info)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity.as_str(), self.source, self.description)
    }
}

/// History entry for a fault that has been reported at least once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultRecord {
    pub count: u64,
    pub first_reported: DateTime<Local>,
    pub last_reported: DateTime<Local>,
}

#[derive(Default)]
struct FaultLogInner {
    pending: Vec<Fault>,
    active: Vec<Fault>,
    total: BTreeMap<Fault, FaultRecord>,
}

/// Shared handle to the process fault registry. Cloning is cheap and every
/// clone observes the same faults.
#[derive(Clone, Default)]
pub struct FaultLog {
    inner: Arc<Mutex<FaultLogInner>>,
}

impl fmt::Debug for FaultLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FaultLog")
            .field("pending", &inner.pending.len())
            .field("active", &inner.active.len())
            .field("total", &inner.total.len())
            .finish()
    }
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fault. It becomes visible in [`active`](Self::active) after
    /// the next [`update`](Self::update).
    pub fn report(&self, fault: Fault) {
        match fault.severity {
            Severity::Error => tracing::error!(source = %fault.source, "{}", fault.description),
            Severity::Warning => tracing::warn!(source = %fault.source, "{}", fault.description),
            Severity::Info => tracing::info!(source = %fault.source, "{}", fault.description),
        }

        let now = Local::now();
        let mut inner = self.inner.lock();
        inner
            .total
            .entry(fault.clone())
            .and_modify(|record| {
                record.count += 1;
                record.last_reported = now;
            })
            .or_insert(FaultRecord {
                count: 1,
                first_reported: now,
                last_reported: now,
            });
        inner.pending.push(fault);
    }

    pub fn report_error(&self, source: impl Into<String>, description: impl Into<String>) {
        self.report(Fault::error(source, description));
    }

    pub fn report_warning(&self, source: impl Into<String>, description: impl Into<String>) {
        self.report(Fault::warning(source, description));
    }

    /// Publish faults reported since the previous update as the active set
    pub fn update(&self) {
        let mut inner = self.inner.lock();
        let mut pending = std::mem::take(&mut inner.pending);
        let mut seen = Vec::with_capacity(pending.len());
        pending.retain(|fault| {
            if seen.contains(fault) {
                false
            } else {
                seen.push(fault.clone());
                true
            }
        });
        inner.active = pending;
    }

    /// Faults published by the last update, in report order
    pub fn active(&self) -> Vec<Fault> {
        self.inner.lock().active.clone()
    }

    /// Every distinct fault ever reported
    pub fn total(&self) -> BTreeMap<Fault, FaultRecord> {
        self.inner.lock().total.clone()
    }

    pub fn has_active_failures(&self) -> bool {
        self.inner
            .lock()
            .active
            .iter()
            .any(|f| f.severity == Severity::Error)
    }

    /// Most recent active fault of error severity
    pub fn latest_failure(&self) -> Option<Fault> {
        self.inner
            .lock()
            .active
            .iter()
            .rev()
            .find(|f| f.severity == Severity::Error)
            .cloned()
    }

    /// Bind a handler to the rising edge of "active error faults present".
    ///
    /// The handler is built by `factory` from the latest failure each time
    /// the edge fires, so it always describes the fault that caused it.
    pub fn on_failing(
        &self,
        scheduler: &mut Scheduler,
        mut factory: impl FnMut(&Fault) -> Box<dyn Command> + Send + 'static,
    ) -> CommandId {
        let source = self.clone();
        let handler = ProxyCommand::new(move || match source.latest_failure() {
            Some(fault) => factory(&fault),
            None => Box::new(commands::none()),
        })
        .with_name("FaultHandler");
        let id = scheduler.register(Box::new(handler));

        let watched = self.clone();
        scheduler.bind(
            Trigger::new(move || watched.has_active_failures())
                .named("faults")
                .on_true(id),
        );
        id
    }

    /// Drop every recorded fault
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.pending.clear();
        inner.active.clear();
        inner.total.clear();
    }
}
