//! Registry persistence behavior against real files.

use std::fs;
use std::path::Path;

use paywall_sentry::registry::{DomainRegistry, JsonFileStore, RegistryStore};

#[tokio::test]
async fn seed_file_bootstraps_and_persists_on_first_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let domains_file = dir.path().join("paywalled_domains.json");
    let seed_file = dir.path().join("domains.txt");
    fs::write(&seed_file, "NYTimes\nwsj\n\n  economist\n").expect("write seed");

    let registry = DomainRegistry::open(Box::new(JsonFileStore::new(&domains_file)), &seed_file)
        .expect("open");

    assert_eq!(registry.list().await, vec!["economist", "nytimes", "wsj"]);

    // Seed was mirrored to the JSON file before open returned.
    let raw = fs::read_to_string(&domains_file).expect("read json");
    let persisted: Vec<String> = serde_json::from_str(&raw).expect("parse json");
    assert_eq!(persisted, vec!["economist", "nytimes", "wsj"]);
}

#[tokio::test]
async fn every_mutation_is_immediately_durable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let domains_file = dir.path().join("paywalled_domains.json");

    let registry = DomainRegistry::open(
        Box::new(JsonFileStore::new(&domains_file)),
        Path::new("no-seed"),
    )
    .expect("open");

    registry.add(["wsj", "ft"]).await.expect("add");
    let on_disk = || -> Vec<String> {
        serde_json::from_str(&fs::read_to_string(&domains_file).expect("read")).expect("parse")
    };
    assert_eq!(on_disk(), vec!["ft", "wsj"]);

    registry.remove(["ft"]).await.expect("remove");
    assert_eq!(on_disk(), vec!["wsj"]);
}

#[test]
fn save_load_round_trip_is_byte_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("paywalled_domains.json");
    let store = JsonFileStore::new(&path);

    let domains = ["wsj", "nytimes", "bloomberg"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    store.save(&domains).expect("save");
    let first = fs::read(&path).expect("read");

    let loaded = store.load().expect("load").expect("present");
    store.save(&loaded).expect("save again");
    let second = fs::read(&path).expect("read again");

    assert_eq!(first, second);
}

#[tokio::test]
async fn directory_at_storage_path_is_self_healed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let domains_file = dir.path().join("paywalled_domains.json");
    fs::create_dir(&domains_file).expect("create obstruction");

    let registry = DomainRegistry::open(
        Box::new(JsonFileStore::new(&domains_file)),
        Path::new("no-seed"),
    )
    .expect("open treats directory as absent");
    assert!(registry.is_empty().await);

    // First mutation replaces the directory with a real file.
    registry.add(["wsj"]).await.expect("add");
    assert!(domains_file.is_file());
    assert_eq!(registry.list().await, vec!["wsj"]);
}
