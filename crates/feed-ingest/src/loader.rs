//! Source loading: fetch a payload and normalize it, inline or on a worker thread.
//!
//! A worker only publishes its [`RecordSet`] once normalization has finished
//! and no cancellation was requested, so callers never observe a partial set.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Instant;

use feed_model::RecordSet;
use tracing::{debug, info, info_span, warn};

use crate::error::{FetchError, LoadError};
use crate::normalize::normalize;
use crate::source::{DEFAULT_CONTAINER, Payload, Source, SourceFormat};

/// What to load and how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub location: String,
    /// Declared format; resolved from the location's extension when absent.
    pub format: Option<SourceFormat>,
    /// Unit-of-record element (hierarchical) or wrapping key (key-value).
    pub container: String,
    /// Field delimiter for tabular text.
    pub delimiter: u8,
}

impl LoadRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            format: None,
            container: DEFAULT_CONTAINER.to_string(),
            delimiter: b',',
        }
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Declared format, or the one implied by the location.
    pub fn resolve_format(&self) -> Result<SourceFormat, LoadError> {
        match self.format {
            Some(format) => Ok(format),
            None => Ok(SourceFormat::from_path(&self.location)?),
        }
    }
}

/// Retrieves raw payloads. Implementations must be shareable across workers.
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, location: &str, format: SourceFormat) -> Result<Payload, FetchError>;
}

/// Reads payloads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl SourceFetcher for FileFetcher {
    fn fetch(&self, location: &str, format: SourceFormat) -> Result<Payload, FetchError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            return Err(FetchError::new(location, "remote locations are not supported"));
        }
        if format == SourceFormat::Spreadsheet {
            return Err(FetchError::new(
                location,
                "spreadsheet files must be converted to a cell grid before loading",
            ));
        }
        let bytes =
            std::fs::read(location).map_err(|error| FetchError::new(location, error.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|error| FetchError::new(location, format!("payload is not UTF-8: {error}")))?;
        Ok(Payload::Text(text))
    }
}

/// Progress messages from a load worker.
#[derive(Debug)]
pub enum LoadUpdate {
    Fetched { bytes: usize },
    Complete { records: RecordSet },
    Failed { error: LoadError },
    Cancelled,
}

/// Handle to a running load.
#[derive(Debug)]
pub struct LoadHandle {
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl LoadHandle {
    /// Request cancellation. The worker stops at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker to exit.
    pub fn join(self) {
        if self.thread.join().is_err() {
            warn!("load worker panicked");
        }
    }
}

/// Start loading `request` on a background thread.
///
/// The outcome arrives on `sender` as exactly one of
/// [`LoadUpdate::Complete`], [`LoadUpdate::Failed`] or [`LoadUpdate::Cancelled`].
pub fn spawn_load(
    request: LoadRequest,
    fetcher: Arc<dyn SourceFetcher>,
    sender: Sender<LoadUpdate>,
) -> LoadHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let thread = std::thread::spawn(move || {
        let result = execute_load(&request, fetcher.as_ref(), &flag, |bytes| {
            let _ = sender.send(LoadUpdate::Fetched { bytes });
        });
        let update = match result {
            Ok(_) if flag.load(Ordering::SeqCst) => LoadUpdate::Cancelled,
            Ok(records) => LoadUpdate::Complete { records },
            Err(LoadError::Cancelled { .. }) => LoadUpdate::Cancelled,
            Err(error) => LoadUpdate::Failed { error },
        };
        let _ = sender.send(update);
    });
    LoadHandle { cancel, thread }
}

/// Load `request` on the calling thread.
pub fn load_blocking(
    request: &LoadRequest,
    fetcher: &dyn SourceFetcher,
) -> Result<RecordSet, LoadError> {
    let never = AtomicBool::new(false);
    execute_load(request, fetcher, &never, |_| {})
}

fn execute_load(
    request: &LoadRequest,
    fetcher: &dyn SourceFetcher,
    cancel: &AtomicBool,
    on_fetched: impl FnOnce(usize),
) -> Result<RecordSet, LoadError> {
    let span = info_span!("load", location = %request.location);
    let _guard = span.enter();
    let start = Instant::now();
    let cancelled = || LoadError::Cancelled {
        location: request.location.clone(),
    };

    let format = request.resolve_format()?;
    debug!(%format, "fetching source");
    let payload = fetcher.fetch(&request.location, format)?;
    on_fetched(payload.size_hint());
    if cancel.load(Ordering::SeqCst) {
        return Err(cancelled());
    }

    let source = Source::from_payload(format, payload, &request.container, request.delimiter)?;
    let records = normalize(&source)?;
    if cancel.load(Ordering::SeqCst) {
        return Err(cancelled());
    }
    info!(
        records = records.len(),
        duration_ms = start.elapsed().as_millis(),
        "source loaded"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Fixed(&'static str);

    impl SourceFetcher for Fixed {
        fn fetch(&self, _location: &str, _format: SourceFormat) -> Result<Payload, FetchError> {
            Ok(Payload::Text(self.0.to_string()))
        }
    }

    #[test]
    fn blocking_load_normalizes() {
        let request = LoadRequest::new("feed.csv");
        let set = load_blocking(&request, &Fixed("SKU,price\nA,1\n")).expect("load");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let request = LoadRequest::new("feed.parquet");
        assert!(matches!(
            load_blocking(&request, &Fixed("")),
            Err(LoadError::Normalize(
                crate::error::NormalizeError::UnsupportedFormat { .. }
            ))
        ));
    }

    #[test]
    fn worker_reports_completion() {
        let (sender, receiver) = mpsc::channel();
        let handle = spawn_load(
            LoadRequest::new("feed.csv"),
            Arc::new(Fixed("SKU\nA\nB\n")),
            sender,
        );
        handle.join();
        let updates: Vec<_> = receiver.try_iter().collect();
        assert!(matches!(updates.first(), Some(LoadUpdate::Fetched { .. })));
        match updates.last() {
            Some(LoadUpdate::Complete { records }) => assert_eq!(records.len(), 2),
            other => panic!("unexpected final update: {other:?}"),
        }
    }

    #[test]
    fn remote_locations_are_rejected_by_file_fetcher() {
        let error = FileFetcher
            .fetch("https://shop.example/feed.xml", SourceFormat::Hierarchical)
            .expect_err("remote");
        assert_eq!(error.location, "https://shop.example/feed.xml");
    }
}
