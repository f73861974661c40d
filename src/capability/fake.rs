//! Scripted in-process host used by unit tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::capability::kinds::{Availability, CapabilityKind};
use crate::capability::progress::ProgressMonitor;
use crate::capability::provider::{
    CapabilityFactory, CapabilityProvider, CreateOptions, DetectionCandidate, HostError,
    HostFuture, HostResult, LanguageDetector, ModelHandle, Summarizer, Translator,
};

#[derive(Default)]
struct FakeState {
    availability: HashMap<CapabilityKind, Availability>,
    removed: HashSet<CapabilityKind>,
    availability_calls: HashMap<CapabilityKind, usize>,
    create_calls: HashMap<CapabilityKind, usize>,
    invoke_calls: HashMap<CapabilityKind, usize>,
    download_steps: HashMap<CapabilityKind, Vec<(u64, u64)>>,
    create_delay: HashMap<CapabilityKind, Duration>,
    invoke_delay: HashMap<CapabilityKind, Duration>,
    create_none: HashSet<CapabilityKind>,
    create_error: HashMap<CapabilityKind, String>,
    invoke_error: HashMap<CapabilityKind, String>,
    mismatched: HashSet<CapabilityKind>,
    monitors: Vec<(CapabilityKind, ProgressMonitor)>,
    last_pair: Option<(String, String)>,
    detections: HashMap<String, Vec<DetectionCandidate>>,
    translations: HashMap<(String, String), String>,
    summary: Option<String>,
}

/// Scriptable host: every capability is readily available unless told otherwise.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(&self) -> Arc<dyn CapabilityProvider> {
        Arc::new(self.clone())
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_availability(&self, kind: CapabilityKind, availability: Availability) {
        self.with(|s| s.availability.insert(kind, availability));
    }

    pub fn remove(&self, kind: CapabilityKind) {
        self.with(|s| s.removed.insert(kind));
    }

    pub fn set_download_steps(&self, kind: CapabilityKind, steps: Vec<(u64, u64)>) {
        self.with(|s| {
            s.availability.insert(kind, Availability::AfterDownload);
            s.download_steps.insert(kind, steps)
        });
    }

    pub fn set_create_delay(&self, kind: CapabilityKind, delay: Duration) {
        self.with(|s| s.create_delay.insert(kind, delay));
    }

    pub fn set_invoke_delay(&self, kind: CapabilityKind, delay: Duration) {
        self.with(|s| s.invoke_delay.insert(kind, delay));
    }

    pub fn set_create_returns_none(&self, kind: CapabilityKind, value: bool) {
        self.with(|s| {
            if value {
                s.create_none.insert(kind);
            } else {
                s.create_none.remove(&kind);
            }
        });
    }

    pub fn set_create_error(&self, kind: CapabilityKind, message: Option<&str>) {
        self.with(|s| match message {
            Some(message) => s.create_error.insert(kind, message.to_string()),
            None => s.create_error.remove(&kind),
        });
    }

    pub fn set_invoke_error(&self, kind: CapabilityKind, message: Option<&str>) {
        self.with(|s| match message {
            Some(message) => s.invoke_error.insert(kind, message.to_string()),
            None => s.invoke_error.remove(&kind),
        });
    }

    pub fn set_mismatched_kind(&self, kind: CapabilityKind, value: bool) {
        self.with(|s| {
            if value {
                s.mismatched.insert(kind);
            } else {
                s.mismatched.remove(&kind);
            }
        });
    }

    pub fn set_detection(&self, text: &str, candidates: Vec<DetectionCandidate>) {
        self.with(|s| s.detections.insert(text.to_string(), candidates));
    }

    pub fn set_translation(&self, text: &str, target: &str, output: &str) {
        self.with(|s| {
            s.translations
                .insert((text.to_string(), target.to_string()), output.to_string())
        });
    }

    pub fn set_summary(&self, summary: &str) {
        self.with(|s| s.summary = Some(summary.to_string()));
    }

    pub fn availability_calls(&self, kind: CapabilityKind) -> usize {
        self.with(|s| s.availability_calls.get(&kind).copied().unwrap_or(0))
    }

    pub fn create_calls(&self, kind: CapabilityKind) -> usize {
        self.with(|s| s.create_calls.get(&kind).copied().unwrap_or(0))
    }

    pub fn invoke_calls(&self, kind: CapabilityKind) -> usize {
        self.with(|s| s.invoke_calls.get(&kind).copied().unwrap_or(0))
    }

    pub fn monitors_seen(&self, kind: CapabilityKind) -> usize {
        self.with(|s| s.monitors.iter().filter(|(k, _)| *k == kind).count())
    }

    pub fn last_monitor_subscribed(&self, kind: CapabilityKind) -> Option<bool> {
        self.with(|s| {
            s.monitors
                .iter()
                .rev()
                .find(|(k, _)| *k == kind)
                .map(|(_, monitor)| monitor.is_subscribed())
        })
    }

    pub fn last_pair(&self) -> Option<(String, String)> {
        self.with(|s| s.last_pair.clone())
    }

    fn invoke_setup(&self, kind: CapabilityKind) -> (Option<Duration>, Option<String>) {
        self.with(|s| {
            *s.invoke_calls.entry(kind).or_default() += 1;
            (
                s.invoke_delay.get(&kind).copied(),
                s.invoke_error.get(&kind).cloned(),
            )
        })
    }
}

impl CapabilityProvider for FakeHost {
    fn factory(&self, kind: CapabilityKind) -> Option<Arc<dyn CapabilityFactory>> {
        if self.with(|s| s.removed.contains(&kind)) {
            return None;
        }
        Some(Arc::new(FakeFactory {
            kind,
            host: self.clone(),
        }))
    }
}

struct FakeFactory {
    kind: CapabilityKind,
    host: FakeHost,
}

impl CapabilityFactory for FakeFactory {
    fn availability(&self) -> HostFuture<'_, HostResult<Availability>> {
        Box::pin(async move {
            Ok(self.host.with(|s| {
                *s.availability_calls.entry(self.kind).or_default() += 1;
                s.availability
                    .get(&self.kind)
                    .copied()
                    .unwrap_or(Availability::Readily)
            }))
        })
    }

    fn create(&self, options: CreateOptions) -> HostFuture<'_, HostResult<Option<ModelHandle>>> {
        Box::pin(async move {
            let kind = self.kind;
            let (steps, delay, none, error, mismatched) = self.host.with(|s| {
                *s.create_calls.entry(kind).or_default() += 1;
                if let (Some(source), Some(target)) =
                    (&options.source_language, &options.target_language)
                {
                    s.last_pair = Some((source.to_string(), target.to_string()));
                }
                if let Some(monitor) = &options.monitor {
                    s.monitors.push((kind, monitor.clone()));
                }
                (
                    s.download_steps.get(&kind).cloned().unwrap_or_default(),
                    s.create_delay.get(&kind).copied(),
                    s.create_none.contains(&kind),
                    s.create_error.get(&kind).cloned(),
                    s.mismatched.contains(&kind),
                )
            });

            if let Some(monitor) = &options.monitor {
                for (loaded, total) in steps {
                    monitor.emit(loaded, total);
                }
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(error) = error {
                return Err(HostError::new(error));
            }
            if none {
                return Ok(None);
            }

            let host = self.host.clone();
            let handle = match (kind, mismatched) {
                (CapabilityKind::Detector, false) | (CapabilityKind::Summarizer, true) => {
                    ModelHandle::Detector(Arc::new(FakeDetector { host }))
                }
                (CapabilityKind::Summarizer, false) | (CapabilityKind::Translator, true) => {
                    ModelHandle::Summarizer(Arc::new(FakeSummarizer { host }))
                }
                (CapabilityKind::Translator, false) | (CapabilityKind::Detector, true) => {
                    ModelHandle::Translator(Arc::new(FakeTranslator {
                        host,
                        target: options
                            .target_language
                            .map(|code| code.to_string())
                            .unwrap_or_default(),
                    }))
                }
            };
            Ok(Some(handle))
        })
    }
}

async fn invoke<T>(
    host: &FakeHost,
    kind: CapabilityKind,
    output: impl FnOnce(&mut FakeState) -> T,
) -> HostResult<T> {
    let (delay, error) = host.invoke_setup(kind);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(error) = error {
        return Err(HostError::new(error));
    }
    Ok(host.with(output))
}

struct FakeDetector {
    host: FakeHost,
}

impl LanguageDetector for FakeDetector {
    fn detect(&self, text: &str) -> HostFuture<'_, HostResult<Vec<DetectionCandidate>>> {
        let text = text.to_string();
        Box::pin(async move {
            invoke(&self.host, CapabilityKind::Detector, |s| {
                s.detections
                    .get(&text)
                    .cloned()
                    .unwrap_or_else(|| vec![DetectionCandidate::new("en", 0.9)])
            })
            .await
        })
    }
}

struct FakeSummarizer {
    host: FakeHost,
}

impl Summarizer for FakeSummarizer {
    fn summarize(&self, text: &str) -> HostFuture<'_, HostResult<String>> {
        let words = text.split_whitespace().count();
        Box::pin(async move {
            invoke(&self.host, CapabilityKind::Summarizer, |s| {
                s.summary
                    .clone()
                    .unwrap_or_else(|| format!("Summary of {words} words."))
            })
            .await
        })
    }
}

struct FakeTranslator {
    host: FakeHost,
    target: String,
}

impl Translator for FakeTranslator {
    fn translate(&self, text: &str) -> HostFuture<'_, HostResult<String>> {
        let text = text.to_string();
        Box::pin(async move {
            invoke(&self.host, CapabilityKind::Translator, |s| {
                s.translations
                    .get(&(text.clone(), self.target.clone()))
                    .cloned()
                    .unwrap_or_else(|| format!("[{}] {text}", self.target))
            })
            .await
        })
    }
}
