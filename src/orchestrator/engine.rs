//! Task orchestration for conversation items.
//!
//! Each request runs the same pipeline for one (item, operation) pair:
//! probe the tier, fetch or acquire the model through the cache, invoke it,
//! and merge the outcome back into the item. Every failure is converted into
//! the item's transient error; nothing escapes to other items.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capability::acquirer::{AcquireParams, ModelAcquirer};
use crate::capability::cache::{CacheKey, CapabilityCache};
use crate::capability::kinds::CapabilityKind;
use crate::capability::prober::AvailabilityProber;
use crate::capability::progress::{DownloadProgress, ProgressBoard};
use crate::capability::provider::{CapabilityProvider, ModelHandle};
use crate::conversation::store::{ConversationStore, ItemPatch};
use crate::core::config::OrchestratorConfig;
use crate::core::errors::{CapabilityError, CapabilityResult};
use crate::core::ids::ItemId;
use crate::core::item::ConversationItem;
use crate::core::language::LanguageCode;
use crate::orchestrator::dwell::ErrorDwell;

/// A freshly submitted item and its detection task.
#[derive(Debug)]
pub struct Submitted {
    /// Identifier of the new item.
    pub id: ItemId,
    /// Detection started for the item.
    pub detection: JoinHandle<CapabilityResult<()>>,
}

/// Owns the conversation store and drives every capability request.
///
/// Cloning is cheap; clones share the store, cache and scope.
#[derive(Clone)]
pub struct TaskOrchestrator {
    config: Arc<OrchestratorConfig>,
    store: Arc<ConversationStore>,
    prober: AvailabilityProber,
    acquirer: Arc<ModelAcquirer>,
    cache: Arc<CapabilityCache>,
    progress: Arc<ProgressBoard>,
    dwell: ErrorDwell,
    scope: CancellationToken,
}

impl TaskOrchestrator {
    /// Create an orchestrator over the injected host provider.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: OrchestratorConfig,
        provider: Arc<dyn CapabilityProvider>,
    ) -> CapabilityResult<Self> {
        config.validate()?;
        let store = Arc::new(ConversationStore::new());
        let progress = Arc::new(ProgressBoard::new());
        let scope = CancellationToken::new();
        let dwell = ErrorDwell::new(
            Arc::clone(&store),
            config.error_dwell(),
            config.dwell_policy,
            scope.clone(),
        );

        info!(
            dwell_ms = config.error_dwell_ms,
            default_target = %config.default_target_language,
            "Capability orchestrator ready"
        );

        Ok(Self {
            prober: AvailabilityProber::new(Arc::clone(&provider)),
            acquirer: Arc::new(ModelAcquirer::new(provider, Arc::clone(&progress))),
            cache: Arc::new(CapabilityCache::new()),
            config: Arc::new(config),
            store,
            progress,
            dwell,
            scope,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Read-only access to the conversation store.
    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Current copy of the ordered item list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConversationItem> {
        self.store.snapshot()
    }

    /// Receiver notified after every item transition.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Vec<ConversationItem>> {
        self.store.subscribe()
    }

    /// Current copy of one item.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<ConversationItem> {
        self.store.get(id)
    }

    /// Latest download progress for `kind`, while a download is running.
    #[must_use]
    pub fn download_progress(&self, kind: CapabilityKind) -> Option<DownloadProgress> {
        self.progress.get(kind)
    }

    /// Number of model acquisitions started so far.
    #[must_use]
    pub fn acquisition_count(&self) -> usize {
        self.acquirer.acquisition_count()
    }

    /// Whether a model for `key` is cached.
    #[must_use]
    pub fn has_model(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Whether the owning scope was torn down.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Tear down the owning scope.
    ///
    /// In-flight downloads are abandoned and their progress subscriptions
    /// released, no further result reaches the store, and cached models are
    /// dropped.
    pub fn shutdown(&self) {
        if self.scope.is_cancelled() {
            return;
        }
        self.scope.cancel();
        self.cache.clear();
        info!("Capability orchestrator shut down");
    }

    /// Append `text` as a new item and start its detection.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`CapabilityError::EmptyText`] for blank input or
    /// [`CapabilityError::Cancelled`] after shutdown.
    pub fn submit_text(&self, text: &str) -> CapabilityResult<Submitted> {
        self.ensure_open()?;
        if text.trim().is_empty() {
            return Err(CapabilityError::EmptyText);
        }

        let item = self.store.append(text, self.config.default_target()?);
        let id = item.id;
        info!(item = %id, units = item.text_units(), "Submitted text");

        let claimed = self.store.begin(id, CapabilityKind::Detector, |_| Ok(()))?;
        let this = self.clone();
        let detection = tokio::spawn(async move { this.detect_item(&claimed).await });
        Ok(Submitted { id, detection })
    }

    /// Change the translation target of an item.
    ///
    /// # Errors
    /// Returns [`CapabilityError::UnsupportedLanguage`] if the picker does
    /// not offer `language`, or [`CapabilityError::UnknownItem`].
    pub fn select_target_language(
        &self,
        id: ItemId,
        language: &str,
    ) -> CapabilityResult<ConversationItem> {
        self.ensure_open()?;
        let target = LanguageCode::new(language)?;
        if !target.is_pickable() {
            return Err(CapabilityError::UnsupportedLanguage(target.to_string()));
        }
        debug!(item = %id, target = %target, "Selected target language");
        self.store.apply(
            id,
            ItemPatch {
                target_language: Some(target),
                ..ItemPatch::default()
            },
        )
    }

    /// Start summarization of an item in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request_summarize(&self, id: ItemId) -> JoinHandle<CapabilityResult<()>> {
        let this = self.clone();
        tokio::spawn(async move { this.run_summarize(id).await })
    }

    /// Start translation of an item in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request_translate(&self, id: ItemId) -> JoinHandle<CapabilityResult<()>> {
        let this = self.clone();
        tokio::spawn(async move { this.run_translate(id).await })
    }

    /// Detect the language of an item.
    ///
    /// Runs once per item; a language already recorded is never revised.
    ///
    /// # Errors
    /// Returns the failure that was written onto the item,
    /// [`CapabilityError::OperationInProgress`] while detection is running,
    /// or [`CapabilityError::Cancelled`] / [`CapabilityError::UnknownItem`].
    pub async fn run_detection(&self, id: ItemId) -> CapabilityResult<()> {
        self.ensure_open()?;
        let begun = self.store.begin(id, CapabilityKind::Detector, |item| {
            if item.detected_language.is_some() {
                return Err(CapabilityError::NotEligible(
                    "language is already detected".to_string(),
                ));
            }
            Ok(())
        });
        match begun {
            Ok(item) => self.detect_item(&item).await,
            Err(CapabilityError::NotEligible(_)) => {
                debug!(item = %id, "Language already detected");
                Ok(())
            }
            Err(err) => self.finish(id, CapabilityKind::Detector, Err(err)),
        }
    }

    /// Detect the language of an item whose detection flag is already raised.
    async fn detect_item(&self, item: &ConversationItem) -> CapabilityResult<()> {
        let id = item.id;
        let outcome = self
            .cancellable(self.detect(&item.text))
            .await
            .map(|(language, confidence)| {
                info!(item = %id, language = %language, confidence, "Language detected");
                ItemPatch {
                    detection: Some((language, confidence)),
                    ..ItemPatch::succeeded(CapabilityKind::Detector)
                }
            });
        self.finish(id, CapabilityKind::Detector, outcome)
    }

    /// Summarize an item once.
    ///
    /// # Errors
    /// Returns [`CapabilityError::NotEligible`] if the item already has a
    /// summary or its text is too short, otherwise the pipeline failure that
    /// was written onto the item.
    pub async fn run_summarize(&self, id: ItemId) -> CapabilityResult<()> {
        self.ensure_open()?;
        let min_units = self.config.summarize_min_units;
        let begun = self.store.begin(id, CapabilityKind::Summarizer, |item| {
            if item.summary.is_some() {
                return Err(CapabilityError::NotEligible(
                    "message is already summarized".to_string(),
                ));
            }
            if item.text_units() < min_units {
                return Err(CapabilityError::NotEligible(format!(
                    "message must be at least {min_units} characters to summarize"
                )));
            }
            Ok(())
        });
        let item = match begun {
            Ok(item) => item,
            Err(err) => return self.finish(id, CapabilityKind::Summarizer, Err(err)),
        };

        let outcome = self
            .cancellable(self.summarize(&item.text))
            .await
            .map(|summary| ItemPatch {
                summary: Some(summary),
                ..ItemPatch::succeeded(CapabilityKind::Summarizer)
            });
        self.finish(id, CapabilityKind::Summarizer, outcome)
    }

    /// Translate an item into its current target language.
    ///
    /// # Errors
    /// Returns [`CapabilityError::LanguageNotDetected`] or
    /// [`CapabilityError::SameLanguage`] before any host call, otherwise the
    /// pipeline failure that was written onto the item.
    pub async fn run_translate(&self, id: ItemId) -> CapabilityResult<()> {
        self.ensure_open()?;
        let begun = self.store.begin(id, CapabilityKind::Translator, |item| {
            let source = item
                .detected_language
                .as_ref()
                .ok_or(CapabilityError::LanguageNotDetected)?;
            if *source == item.target_language {
                return Err(CapabilityError::SameLanguage);
            }
            Ok(())
        });
        let item = match begun {
            Ok(item) => item,
            Err(err) => return self.finish(id, CapabilityKind::Translator, Err(err)),
        };

        let params = AcquireParams {
            source_language: item.detected_language.clone(),
            target_language: Some(item.target_language.clone()),
        };
        let outcome = self
            .cancellable(self.translate(&item.text, &params))
            .await
            .map(|translation| ItemPatch {
                translation: Some(translation),
                ..ItemPatch::succeeded(CapabilityKind::Translator)
            });
        self.finish(id, CapabilityKind::Translator, outcome)
    }

    async fn detect(&self, text: &str) -> CapabilityResult<(LanguageCode, f64)> {
        let ModelHandle::Detector(detector) = self
            .obtain(CapabilityKind::Detector, &AcquireParams::default())
            .await?
        else {
            return Err(mismatched(CapabilityKind::Detector));
        };

        debug!(capability = "detector", phase = "invoking");
        let candidates = detector
            .detect(text)
            .await
            .map_err(|err| invocation_failed(CapabilityKind::Detector, &err))?;
        let top = candidates
            .into_iter()
            .next()
            .ok_or(CapabilityError::DetectionEmpty)?;
        if !top.confidence.is_finite() {
            return Err(CapabilityError::InvalidDetection(format!(
                "confidence {} for {}",
                top.confidence, top.detected_language
            )));
        }
        let language = LanguageCode::new(&top.detected_language)?;
        Ok((language, top.confidence.clamp(0.0, 1.0)))
    }

    async fn summarize(&self, text: &str) -> CapabilityResult<String> {
        let ModelHandle::Summarizer(summarizer) = self
            .obtain(CapabilityKind::Summarizer, &AcquireParams::default())
            .await?
        else {
            return Err(mismatched(CapabilityKind::Summarizer));
        };

        debug!(capability = "summarizer", phase = "invoking");
        summarizer
            .summarize(text)
            .await
            .map_err(|err| invocation_failed(CapabilityKind::Summarizer, &err))
    }

    async fn translate(&self, text: &str, params: &AcquireParams) -> CapabilityResult<String> {
        let ModelHandle::Translator(translator) =
            self.obtain(CapabilityKind::Translator, params).await?
        else {
            return Err(mismatched(CapabilityKind::Translator));
        };

        debug!(capability = "translator", phase = "invoking");
        translator
            .translate(text)
            .await
            .map_err(|err| invocation_failed(CapabilityKind::Translator, &err))
    }

    /// Probe, then fetch the model from the cache or acquire it.
    async fn obtain(
        &self,
        kind: CapabilityKind,
        params: &AcquireParams,
    ) -> CapabilityResult<ModelHandle> {
        let key = CacheKey::for_request(kind, params)?;

        debug!(capability = kind.as_str(), phase = "probing");
        let tier = self.prober.probe(kind).await?;

        debug!(key = %key, tier = tier.as_str(), phase = "acquiring");
        let acquirer = Arc::clone(&self.acquirer);
        let params = params.clone();
        self.cache
            .get_or_create(&key, move || async move {
                acquirer.acquire(kind, tier, &params).await
            })
            .await
    }

    async fn cancellable<T>(
        &self,
        operation: impl Future<Output = CapabilityResult<T>>,
    ) -> CapabilityResult<T> {
        tokio::select! {
            biased;
            () = self.scope.cancelled() => Err(CapabilityError::Cancelled),
            result = operation => result,
        }
    }

    fn ensure_open(&self) -> CapabilityResult<()> {
        if self.scope.is_cancelled() {
            return Err(CapabilityError::Cancelled);
        }
        Ok(())
    }

    /// Merge the outcome of one operation into its item.
    fn finish(
        &self,
        id: ItemId,
        kind: CapabilityKind,
        outcome: CapabilityResult<ItemPatch>,
    ) -> CapabilityResult<()> {
        if self.scope.is_cancelled() {
            debug!(item = %id, capability = kind.as_str(), "Dropping result after shutdown");
            return Err(CapabilityError::Cancelled);
        }

        match outcome {
            Ok(patch) => {
                self.store.apply(id, patch)?;
                debug!(item = %id, capability = kind.as_str(), phase = "succeeded");
                Ok(())
            }
            Err(err) => {
                if err.marks_item() {
                    self.mark_failed(id, kind, &err);
                } else {
                    debug!(item = %id, capability = kind.as_str(), error = %err, "Request rejected");
                }
                Err(err)
            }
        }
    }

    fn mark_failed(&self, id: ItemId, kind: CapabilityKind, err: &CapabilityError) {
        warn!(item = %id, capability = kind.as_str(), error = %err, phase = "failed");
        match self.store.apply(id, ItemPatch::failed(kind, err.to_string())) {
            Ok(item) => self.dwell.arm(id, item.error_generation),
            Err(missing) => debug!(item = %id, error = %missing, "Could not record failure"),
        }
    }
}

fn invocation_failed(kind: CapabilityKind, err: &impl std::fmt::Display) -> CapabilityError {
    CapabilityError::InvocationFailed {
        kind,
        reason: err.to_string(),
    }
}

fn mismatched(kind: CapabilityKind) -> CapabilityError {
    CapabilityError::AcquisitionFailed {
        kind,
        reason: "cached instance has the wrong kind".to_string(),
    }
}
