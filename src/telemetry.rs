use std::fmt;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, Instrument};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

use crate::error::{EtlError, EtlResult};

/// `DD/MM/YYYY HH:MM:SS` in local time.
struct LogTimer;

impl FormatTime for LogTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%d/%m/%Y %H:%M:%S"))
    }
}

/// The process-wide log file. Created once at start-up and closed at exit.
pub struct RunLog {
    path: PathBuf,
    file: Arc<File>,
}

impl RunLog {
    pub fn init(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| EtlError::from_io(parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EtlError::from_io(&path, e))?;
        let file = Arc::new(file);

        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
            )
            .with_ansi(false)
            .with_target(false)
            .with_timer(LogTimer)
            .with_writer(file.clone())
            .try_init()
            .map_err(|e| EtlError::Logging(e.to_string()))?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(self) -> EtlResult<()> {
        self.file
            .sync_all()
            .map_err(|e| EtlError::from_io(&self.path, e))
    }

    /// Close the log and hand back the run's result. A failed close only
    /// surfaces when the run itself succeeded.
    pub fn finish<T>(self, result: EtlResult<T>) -> EtlResult<T> {
        settle(result, self.close())
    }
}

fn settle<T>(result: EtlResult<T>, closed: EtlResult<()>) -> EtlResult<T> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) | (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            error!("Failed to close log: {close_err}");
            Err(err)
        }
    }
}

/// Run one pipeline stage inside a span, logging its start, its duration
/// and any error. The result is returned unchanged.
pub async fn observe<T, E, F>(stage: &'static str, work: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let span = tracing::info_span!("stage", name = stage);
    async move {
        info!("Running {stage}");
        let started = Instant::now();
        match work.await {
            Ok(value) => {
                info!(
                    "{stage} finished in {:.2} seconds",
                    started.elapsed().as_secs_f64()
                );
                Ok(value)
            }
            Err(err) => {
                error!("{stage} failed: {err}");
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}
