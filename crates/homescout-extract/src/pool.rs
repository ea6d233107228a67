use std::sync::Arc;

use futures::stream::{self, StreamExt};
use homescout_core::PropertyRecord;

use crate::error::ExtractError;
use crate::orchestrator::Extractor;

/// Runs independent extractions with bounded concurrency.
pub struct ExtractionPool {
    extractor: Arc<Extractor>,
    max_concurrent: usize,
}

impl ExtractionPool {
    pub fn new(extractor: Arc<Extractor>, max_concurrent: usize) -> Self {
        Self {
            extractor,
            max_concurrent: max_concurrent.max(1),
        }
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Extract every input; results come back in input order.
    pub async fn extract_many<I, S>(&self, inputs: I) -> Vec<Result<PropertyRecord, ExtractError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results: Vec<(usize, Result<PropertyRecord, ExtractError>)> =
            stream::iter(inputs.into_iter().enumerate())
                .map(|(index, input)| {
                    let extractor = Arc::clone(&self.extractor);
                    async move { (index, extractor.extract(input.as_ref()).await) }
                })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::StrategyError;
    use crate::orchestrator::ExtractorConfig;
    use crate::strategy::{Strategy, StrategyContext, StrategyKind, StrategyOutput, UrlHeuristicStrategy};

    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Strategy for Gauge {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Browser
        }

        fn budget(&self) -> Duration {
            Duration::from_secs(5)
        }

        async fn attempt(&self, _ctx: &StrategyContext) -> Result<StrategyOutput, StrategyError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(StrategyOutput::default())
        }
    }

    #[tokio::test]
    async fn results_keep_input_order_and_concurrency_is_bounded() {
        let gauge = Arc::new(Gauge {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let extractor = Extractor::with_strategies(
            ExtractorConfig::default(),
            vec![
                Arc::clone(&gauge) as Arc<dyn Strategy>,
                Arc::new(UrlHeuristicStrategy::new()),
            ],
        );
        let pool = ExtractionPool::new(Arc::new(extractor), 2);

        let inputs = [
            "https://www.zillow.com/homedetails/1-A-St-Reno-NV-89501/1_zpid/",
            "not a listing",
            "https://www.zillow.com/homedetails/2-B-St-Reno-NV-89502/2_zpid/",
            "https://www.zillow.com/homedetails/3-C-St-Reno-NV-89503/3_zpid/",
            "https://www.zillow.com/homedetails/4-D-St-Reno-NV-89504/4_zpid/",
        ];
        let results = pool.extract_many(inputs).await;

        assert_eq!(results.len(), 5);
        assert_eq!(results[0].as_ref().unwrap().zip.as_deref(), Some("89501"));
        assert!(results[1].is_err());
        assert_eq!(results[4].as_ref().unwrap().zip.as_deref(), Some("89504"));
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    }
}
