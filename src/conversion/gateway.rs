//! Lazily initialized, serialized access to a transcoding engine.

use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use gifforge_av::filter::{INPUT_FILE, OUTPUT_FILE};
use gifforge_av::{TranscodeArgs, TranscodeEngine};
use gifforge_common::{Error, Result};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Progress listener taking a whole percentage (`0..=100`).
pub type PercentFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Runs conversion jobs against a transcoding engine.
#[async_trait]
pub trait ConversionGateway: Send + Sync {
    /// Make the engine ready. Concurrent callers share a single attempt, and a
    /// failed attempt may be retried by a later call.
    async fn initialize(&self) -> Result<()>;

    /// Convert `input` using `job`, returning the produced GIF bytes.
    ///
    /// Progress is reported as non-decreasing whole percentages.
    async fn convert(&self, input: &[u8], job: &TranscodeArgs, on_progress: PercentFn<'_>)
        -> Result<Vec<u8>>;
}

/// [`ConversionGateway`] over one engine instance created on first use.
pub struct EngineGateway<E> {
    factory: Box<dyn Fn() -> E + Send + Sync>,
    engine: OnceCell<Mutex<E>>,
}

impl<E: TranscodeEngine> EngineGateway<E> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            engine: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }

    async fn engine(&self) -> Result<&Mutex<E>> {
        self.engine
            .get_or_try_init(|| async {
                let mut engine = (self.factory)();
                info!(engine = engine.name(), "Initializing transcoding engine");
                engine.load().await.map_err(|e| {
                    warn!(
                        engine = engine.name(),
                        error = %e,
                        transient = e.is_transient(),
                        "Engine initialization failed"
                    );
                    Error::engine_init(e.to_string())
                })?;
                Ok::<_, Error>(Mutex::new(engine))
            })
            .await
    }
}

#[async_trait]
impl<E: TranscodeEngine + 'static> ConversionGateway for EngineGateway<E> {
    async fn initialize(&self) -> Result<()> {
        self.engine().await.map(|_| ())
    }

    async fn convert(
        &self,
        input: &[u8],
        job: &TranscodeArgs,
        on_progress: PercentFn<'_>,
    ) -> Result<Vec<u8>> {
        let cell = self.engine().await?;
        // One job at a time per engine instance.
        let mut engine = cell.lock().await;

        let last = AtomicU8::new(0);
        let forward = |fraction: f64| {
            let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
            let previous = last.fetch_max(percent, Ordering::Relaxed);
            if percent >= previous {
                on_progress(percent);
            }
        };

        let result = run_job(&mut *engine, input, job, &forward).await;

        for name in [INPUT_FILE, OUTPUT_FILE] {
            if let Err(e) = engine.delete_file(name).await {
                debug!(entry = name, error = %e, "Failed to remove engine entry");
            }
        }

        result
    }
}

async fn run_job<E: TranscodeEngine>(
    engine: &mut E,
    input: &[u8],
    job: &TranscodeArgs,
    forward: &(dyn Fn(f64) + Send + Sync),
) -> Result<Vec<u8>> {
    engine
        .write_file(INPUT_FILE, input)
        .await
        .map_err(|e| Error::engine_exec(e.to_string()))?;

    debug!(filter = %job.filter, loop_forever = job.loop_forever, "Executing conversion job");
    engine
        .exec(&job.args, forward)
        .await
        .map_err(|e| Error::engine_exec(e.to_string()))?;

    let output = engine
        .read_file(OUTPUT_FILE)
        .await
        .map_err(|e| Error::engine_exec(e.to_string()))?;
    if output.is_empty() {
        return Err(Error::engine_exec("engine produced an empty output"));
    }
    Ok(output)
}
