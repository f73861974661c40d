//! Model acquisition with download monitoring.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::capability::cache::CacheKey;
use crate::capability::kinds::{CapabilityKind, Tier};
use crate::capability::progress::ProgressBoard;
use crate::capability::provider::{CapabilityProvider, CreateOptions, ModelHandle};
use crate::core::errors::{CapabilityError, CapabilityResult};
use crate::core::language::LanguageCode;

/// Validated source → target pair for translation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TranslationPair {
    /// Language translated from.
    pub source: LanguageCode,
    /// Language translated into.
    pub target: LanguageCode,
}

impl TranslationPair {
    /// Build a pair, rejecting missing sides and identity pairs.
    ///
    /// # Errors
    /// Returns [`CapabilityError::InvalidLanguagePair`] if either side is
    /// unset or both sides are equal.
    pub fn new(
        source: Option<&LanguageCode>,
        target: Option<&LanguageCode>,
    ) -> CapabilityResult<Self> {
        let source = source.ok_or_else(|| {
            CapabilityError::InvalidLanguagePair("source language is not set".to_string())
        })?;
        let target = target.ok_or_else(|| {
            CapabilityError::InvalidLanguagePair("target language is not set".to_string())
        })?;
        if source == target {
            return Err(CapabilityError::InvalidLanguagePair(format!(
                "{source} -> {target}"
            )));
        }
        Ok(Self {
            source: source.clone(),
            target: target.clone(),
        })
    }
}

/// Parameters passed alongside an acquisition.
#[derive(Clone, Debug, Default)]
pub struct AcquireParams {
    /// Source language, translation only.
    pub source_language: Option<LanguageCode>,
    /// Target language, translation only.
    pub target_language: Option<LanguageCode>,
}

impl AcquireParams {
    /// Parameters for a translation pair.
    #[must_use]
    pub fn translation(source: LanguageCode, target: LanguageCode) -> Self {
        Self {
            source_language: Some(source),
            target_language: Some(target),
        }
    }

    /// Validated pair, for translator acquisitions.
    ///
    /// # Errors
    /// Returns [`CapabilityError::InvalidLanguagePair`] if the pair is invalid.
    pub fn pair(&self) -> CapabilityResult<TranslationPair> {
        TranslationPair::new(self.source_language.as_ref(), self.target_language.as_ref())
    }

    fn create_options(&self, kind: CapabilityKind) -> CapabilityResult<CreateOptions> {
        if kind != CapabilityKind::Translator {
            return Ok(CreateOptions::default());
        }
        let pair = self.pair()?;
        Ok(CreateOptions {
            source_language: Some(pair.source),
            target_language: Some(pair.target),
            monitor: None,
        })
    }
}

/// Creates model instances from a probed tier.
pub struct ModelAcquirer {
    provider: Arc<dyn CapabilityProvider>,
    progress: Arc<ProgressBoard>,
    acquisitions: AtomicUsize,
}

impl ModelAcquirer {
    /// Create an acquirer publishing download progress to `progress`.
    #[must_use]
    pub fn new(provider: Arc<dyn CapabilityProvider>, progress: Arc<ProgressBoard>) -> Self {
        Self {
            provider,
            progress,
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Number of acquisitions started so far.
    #[must_use]
    pub fn acquisition_count(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Create a model instance for `kind`.
    ///
    /// Downloadable tiers are created with a progress subscription that is
    /// released when this future completes or is dropped.
    ///
    /// # Errors
    /// Returns [`CapabilityError::InvalidLanguagePair`] for bad translator
    /// parameters, [`CapabilityError::CapabilityUnavailable`] for the
    /// unavailable tier, [`CapabilityError::CapabilityUnsupported`] if the
    /// host lost the capability, and [`CapabilityError::AcquisitionFailed`]
    /// if creation is rejected or yields nothing usable.
    pub async fn acquire(
        &self,
        kind: CapabilityKind,
        tier: Tier,
        params: &AcquireParams,
    ) -> CapabilityResult<ModelHandle> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let mut options = params.create_options(kind)?;

        if tier == Tier::Unavailable {
            return Err(CapabilityError::CapabilityUnavailable(kind));
        }

        let factory = self
            .provider
            .factory(kind)
            .ok_or(CapabilityError::CapabilityUnsupported(kind))?;

        let created = if tier == Tier::Readily {
            debug!(capability = kind.as_str(), "Creating model directly");
            factory.create(options).await
        } else {
            let key = CacheKey::for_request(kind, params)?;
            info!(key = %key, "Creating model with download");
            let (monitor, mut subscription) = self.progress.subscribe(key);
            options.monitor = Some(monitor);
            let mut creation = factory.create(options);
            let result = loop {
                tokio::select! {
                    result = &mut creation => break result,
                    Some(_) = subscription.next() => {}
                }
            };
            subscription.drain();
            result
        };

        let handle = created
            .map_err(|err| CapabilityError::AcquisitionFailed {
                kind,
                reason: err.to_string(),
            })?
            .ok_or_else(|| CapabilityError::AcquisitionFailed {
                kind,
                reason: "host returned no instance".to_string(),
            })?;

        if handle.kind() != kind {
            return Err(CapabilityError::AcquisitionFailed {
                kind,
                reason: format!("host returned a {} instance", handle.kind().as_str()),
            });
        }

        info!(capability = kind.as_str(), tier = tier.as_str(), "Model ready");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::capability::fake::FakeHost;
    use crate::capability::progress::DownloadProgress;

    fn code(value: &str) -> LanguageCode {
        LanguageCode::new(value).unwrap()
    }

    fn acquirer(host: &FakeHost) -> (ModelAcquirer, Arc<ProgressBoard>) {
        let board = Arc::new(ProgressBoard::new());
        (ModelAcquirer::new(host.provider(), Arc::clone(&board)), board)
    }

    #[tokio::test]
    async fn test_unavailable_never_creates() {
        let host = FakeHost::new();
        let (acquirer, _) = acquirer(&host);
        let result = acquirer
            .acquire(CapabilityKind::Summarizer, Tier::Unavailable, &AcquireParams::default())
            .await;
        assert!(matches!(
            result,
            Err(CapabilityError::CapabilityUnavailable(CapabilityKind::Summarizer))
        ));
        assert_eq!(host.create_calls(CapabilityKind::Summarizer), 0);
    }

    #[tokio::test]
    async fn test_readily_creates_without_monitor() {
        let host = FakeHost::new();
        let (acquirer, board) = acquirer(&host);
        let handle = acquirer
            .acquire(CapabilityKind::Detector, Tier::Readily, &AcquireParams::default())
            .await
            .unwrap();
        assert_eq!(handle.kind(), CapabilityKind::Detector);
        assert_eq!(host.monitors_seen(CapabilityKind::Detector), 0);
        assert_eq!(board.released_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_download_streams_progress_then_unsubscribes() {
        let host = FakeHost::new();
        host.set_download_steps(CapabilityKind::Summarizer, vec![(10, 100), (60, 100), (100, 100)]);
        let (acquirer, board) = acquirer(&host);

        acquirer
            .acquire(CapabilityKind::Summarizer, Tier::Downloadable, &AcquireParams::default())
            .await
            .unwrap();

        assert_eq!(host.monitors_seen(CapabilityKind::Summarizer), 1);
        assert_eq!(host.last_monitor_subscribed(CapabilityKind::Summarizer), Some(false));
        assert_eq!(board.released_subscriptions(), 1);
        assert_eq!(board.get(CapabilityKind::Summarizer), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_visible_while_downloading() {
        let host = FakeHost::new();
        host.set_download_steps(CapabilityKind::Detector, vec![(25, 100)]);
        host.set_create_delay(CapabilityKind::Detector, Duration::from_secs(5));
        let (acquirer, board) = acquirer(&host);
        let acquirer = Arc::new(acquirer);

        let task = {
            let acquirer = Arc::clone(&acquirer);
            tokio::spawn(async move {
                acquirer
                    .acquire(CapabilityKind::Detector, Tier::Downloadable, &AcquireParams::default())
                    .await
                    .map(|handle| handle.kind())
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            board.get(CapabilityKind::Detector),
            Some(DownloadProgress::new(25, 100))
        );

        assert_eq!(task.await.unwrap().unwrap(), CapabilityKind::Detector);
        assert_eq!(board.get(CapabilityKind::Detector), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_download_unsubscribes() {
        let host = FakeHost::new();
        host.set_download_steps(CapabilityKind::Translator, vec![(1, 10)]);
        host.set_create_delay(CapabilityKind::Translator, Duration::from_secs(60));
        let (acquirer, board) = acquirer(&host);
        let params = AcquireParams::translation(code("fr"), code("en"));

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            acquirer.acquire(CapabilityKind::Translator, Tier::Downloadable, &params),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(host.last_monitor_subscribed(CapabilityKind::Translator), Some(false));
        assert_eq!(board.released_subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_invalid_pair_rejected_before_host() {
        let host = FakeHost::new();
        let (acquirer, _) = acquirer(&host);

        let same = AcquireParams::translation(code("en"), code("en"));
        let missing = AcquireParams {
            source_language: None,
            target_language: Some(code("en")),
        };
        for params in [same, missing] {
            let result = acquirer
                .acquire(CapabilityKind::Translator, Tier::Readily, &params)
                .await;
            assert!(matches!(result, Err(CapabilityError::InvalidLanguagePair(_))));
        }
        assert_eq!(host.create_calls(CapabilityKind::Translator), 0);
    }

    #[tokio::test]
    async fn test_translator_receives_pair() {
        let host = FakeHost::new();
        let (acquirer, _) = acquirer(&host);
        acquirer
            .acquire(
                CapabilityKind::Translator,
                Tier::Readily,
                &AcquireParams::translation(code("fr"), code("en")),
            )
            .await
            .unwrap();
        assert_eq!(
            host.last_pair(),
            Some(("fr".to_string(), "en".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_or_mismatched_instance_fails() {
        let host = FakeHost::new();
        host.set_create_returns_none(CapabilityKind::Detector, true);
        host.set_mismatched_kind(CapabilityKind::Summarizer, true);
        let (acquirer, _) = acquirer(&host);

        for kind in [CapabilityKind::Detector, CapabilityKind::Summarizer] {
            let result = acquirer
                .acquire(kind, Tier::Readily, &AcquireParams::default())
                .await;
            assert!(matches!(result, Err(CapabilityError::AcquisitionFailed { .. })));
        }
        assert_eq!(acquirer.acquisition_count(), 2);
    }
}
