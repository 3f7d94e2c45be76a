//! Integration tests for the source loader.

use std::fs;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use feed_ingest::{
    FetchError, FileFetcher, LoadError, LoadRequest, LoadUpdate, Payload, SourceFetcher,
    SourceFormat, load_blocking, spawn_load,
};

/// Fetcher that blocks until the test releases it.
struct Gated {
    gate: Mutex<Receiver<()>>,
    text: String,
}

impl SourceFetcher for Gated {
    fn fetch(&self, _location: &str, _format: SourceFormat) -> Result<Payload, FetchError> {
        let gate = self.gate.lock().expect("gate lock");
        gate.recv().expect("gate released");
        Ok(Payload::Text(self.text.clone()))
    }
}

#[test]
fn loads_local_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("feed.xml");
    fs::write(
        &path,
        "<offers><offer id=\"1\"><price>10</price></offer></offers>",
    )
    .expect("write feed");

    let request = LoadRequest::new(path.to_string_lossy());
    let set = load_blocking(&request, &FileFetcher).expect("load");
    assert_eq!(set.get(0, "price"), Some("10"));
}

#[test]
fn missing_file_is_a_fetch_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.csv");
    let request = LoadRequest::new(path.to_string_lossy());
    assert!(matches!(
        load_blocking(&request, &FileFetcher),
        Err(LoadError::Fetch(_))
    ));
}

#[test]
fn declared_format_overrides_extension() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("export.txt");
    fs::write(&path, "[{\"SKU\": \"A1\"}]").expect("write feed");
    let request = LoadRequest::new(path.to_string_lossy()).with_format(SourceFormat::KeyValueDocument);
    let set = load_blocking(&request, &FileFetcher).expect("load");
    assert_eq!(set.get(0, "SKU"), Some("A1"));
}

#[test]
fn cancelled_load_never_publishes_records() {
    let (release, gate) = mpsc::channel();
    let fetcher = Arc::new(Gated {
        gate: Mutex::new(gate),
        text: "SKU\nA\n".to_string(),
    });
    let (sender, receiver) = mpsc::channel();
    let handle = spawn_load(LoadRequest::new("feed.csv"), fetcher, sender);

    handle.cancel();
    assert!(handle.is_cancelled());
    release.send(()).expect("release fetch");
    handle.join();

    let updates: Vec<_> = receiver.try_iter().collect();
    assert!(
        updates
            .iter()
            .all(|update| !matches!(update, LoadUpdate::Complete { .. }))
    );
    assert!(matches!(updates.last(), Some(LoadUpdate::Cancelled)));
}

#[test]
fn concurrent_loads_are_independent() {
    let (sender, receiver) = mpsc::channel();
    let fetcher: Arc<dyn SourceFetcher> = Arc::new(FileFetcher);
    let dir = tempfile::tempdir().expect("temp dir");
    let mut handles = Vec::new();
    for count in 1..=3 {
        let path = dir.path().join(format!("feed{count}.csv"));
        let mut text = String::from("SKU\n");
        for row in 0..count {
            text.push_str(&format!("S{row}\n"));
        }
        fs::write(&path, text).expect("write feed");
        handles.push(spawn_load(
            LoadRequest::new(path.to_string_lossy()),
            Arc::clone(&fetcher),
            sender.clone(),
        ));
    }
    drop(sender);
    for handle in handles {
        handle.join();
    }
    let mut sizes: Vec<_> = receiver
        .iter()
        .filter_map(|update| match update {
            LoadUpdate::Complete { records } => Some(records.len()),
            _ => None,
        })
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, [1, 2, 3]);
}
