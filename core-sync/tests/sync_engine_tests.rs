//! Integration tests for the SyncEngine
//!
//! These tests run complete sync passes against:
//! - An in-memory remote row store with switchable fetch failures
//! - Fake blob store and HTTP client that count downloads
//! - A real file system under a temp directory with controllable free space
//! - An in-memory SQLite local store

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::remote::{
    Mix, MixRepository, MixTag, MixType, SavedView, SavedViewRepository, Tag, TagRepository,
};
use bridge_traits::storage::{BlobStore, FileMetadata, FileSystemAccess};
use bridge_traits::time::FixedClock;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use core_cache::{FileStoreConfig, MediaFileStore};
use core_library::db::create_test_pool;
use core_library::repositories::{
    LocalMixRepository, LocalMixTagRepository, LocalSavedViewRepository, LocalTagRepository,
};
use core_library::{LocalMixTag, LocalStore, LocalTag, MediaField};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_sync::{SyncConfig, SyncEngine, SyncError, SyncStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::Receiver;
use tokio::sync::Notify;

const AMPLE_SPACE: u64 = 1024 * 1024 * 1024 * 1024;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeRemote {
    mixes: Mutex<Vec<Mix>>,
    tags: Mutex<Vec<Tag>>,
    mix_tags: Mutex<Vec<MixTag>>,
    saved_views: Mutex<Vec<SavedView>>,
    fail_mixes: AtomicBool,
    fail_tags: AtomicBool,
}

impl FakeRemote {
    fn set_mixes(&self, mixes: Vec<Mix>) {
        *self.mixes.lock().unwrap() = mixes;
    }

    fn set_tags(&self, tags: Vec<Tag>, rows: Vec<MixTag>) {
        *self.tags.lock().unwrap() = tags;
        *self.mix_tags.lock().unwrap() = rows;
    }

    fn set_saved_views(&self, views: Vec<SavedView>) {
        *self.saved_views.lock().unwrap() = views;
    }
}

#[async_trait]
impl MixRepository for FakeRemote {
    async fn list_mixes(&self) -> BridgeResult<Vec<Mix>> {
        if self.fail_mixes.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("offline".to_string()));
        }
        Ok(self.mixes.lock().unwrap().clone())
    }

    async fn get_mix(&self, id: &str) -> BridgeResult<Option<Mix>> {
        Ok(self.mixes.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn create_mix(&self, mix: &Mix) -> BridgeResult<Mix> {
        self.mixes.lock().unwrap().insert(0, mix.clone());
        Ok(mix.clone())
    }

    async fn update_mix(&self, mix: &Mix) -> BridgeResult<Mix> {
        let mut mixes = self.mixes.lock().unwrap();
        let slot = mixes
            .iter_mut()
            .find(|m| m.id == mix.id)
            .ok_or_else(|| BridgeError::NotFound(mix.id.clone()))?;
        *slot = mix.clone();
        Ok(mix.clone())
    }

    async fn delete_mix(&self, id: &str) -> BridgeResult<()> {
        self.mixes.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }
}

#[async_trait]
impl TagRepository for FakeRemote {
    async fn list_tags(&self) -> BridgeResult<Vec<Tag>> {
        if self.fail_tags.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("tags unavailable".to_string()));
        }
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn create_tag(&self, name: &str) -> BridgeResult<Tag> {
        let tag = remote_tag(&format!("tag-{}", name), name);
        self.tags.lock().unwrap().push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, tag: &Tag) -> BridgeResult<Tag> {
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: &str) -> BridgeResult<()> {
        self.tags.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn list_mix_tags(&self) -> BridgeResult<Vec<MixTag>> {
        if self.fail_tags.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("tags unavailable".to_string()));
        }
        Ok(self.mix_tags.lock().unwrap().clone())
    }

    async fn add_tag_to_mix(&self, mix_id: &str, tag_id: &str) -> BridgeResult<()> {
        self.mix_tags.lock().unwrap().push(MixTag::new(mix_id, tag_id));
        Ok(())
    }

    async fn remove_tag_from_mix(&self, mix_id: &str, tag_id: &str) -> BridgeResult<()> {
        self.mix_tags
            .lock()
            .unwrap()
            .retain(|row| !(row.mix_id == mix_id && row.tag_id == tag_id));
        Ok(())
    }
}

#[async_trait]
impl SavedViewRepository for FakeRemote {
    async fn list_saved_views(&self) -> BridgeResult<Vec<SavedView>> {
        Ok(self.saved_views.lock().unwrap().clone())
    }

    async fn create_saved_view(&self, name: &str, tag_ids: &[String]) -> BridgeResult<SavedView> {
        let view = SavedView {
            id: format!("view-{}", name),
            name: name.to_string(),
            tag_ids: tag_ids.to_vec(),
            created_at: at(1),
        };
        self.saved_views.lock().unwrap().push(view.clone());
        Ok(view)
    }

    async fn update_saved_view(&self, view: &SavedView) -> BridgeResult<SavedView> {
        Ok(view.clone())
    }

    async fn delete_saved_view(&self, id: &str) -> BridgeResult<()> {
        self.saved_views.lock().unwrap().retain(|v| v.id != id);
        Ok(())
    }
}

/// Blob store serving a fixed object map. Optionally blocks every download
/// until the gate is notified.
#[derive(Default)]
struct FakeBlobs {
    objects: Mutex<HashMap<String, Bytes>>,
    downloads: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeBlobs {
    fn put(&self, path: &str, body: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::from_static(body));
    }

    fn remove(&self, path: &str) {
        self.objects.lock().unwrap().remove(path);
    }

    fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn upload(&self, path: &str, data: Bytes, _content_type: &str) -> BridgeResult<String> {
        self.objects.lock().unwrap().insert(path.to_string(), data);
        Ok(path.to_string())
    }

    async fn download(&self, path: &str) -> BridgeResult<Bytes> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(path.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://project.test/storage/v1/object/public/media/{}", path)
    }
}

/// HTTP client answering 200 for known URLs and 404 otherwise.
#[derive(Default)]
struct FakeHttp {
    bodies: Mutex<HashMap<String, Bytes>>,
    requests: AtomicUsize,
}

impl FakeHttp {
    fn put(&self, url: &str, body: &'static [u8]) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), Bytes::from_static(body));
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies.lock().unwrap().get(&request.url).cloned();
        Ok(match body {
            Some(body) => HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body,
            },
            None => HttpResponse {
                status: 404,
                headers: HashMap::new(),
                body: Bytes::new(),
            },
        })
    }

    async fn download_stream(
        &self,
        url: String,
    ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        Err(BridgeError::NotAvailable(format!("streaming {}", url)))
    }
}

/// Real disk I/O with a settable free-space answer. With `crash_writes` set,
/// every write stops halfway and fails, like a process killed mid-write.
struct ControlledFs {
    inner: TokioFileSystem,
    free: AtomicU64,
    crash_writes: AtomicBool,
}

impl ControlledFs {
    fn set_free(&self, bytes: u64) {
        self.free.store(bytes, Ordering::SeqCst);
    }

    fn set_crash_writes(&self, crash: bool) {
        self.crash_writes.store(crash, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileSystemAccess for ControlledFs {
    async fn get_cache_directory(&self) -> BridgeResult<PathBuf> {
        self.inner.get_cache_directory().await
    }

    async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
        self.inner.get_data_directory().await
    }

    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        self.inner.exists(path).await
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        self.inner.metadata(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
        self.inner.create_dir_all(path).await
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        if self.crash_writes.load(Ordering::SeqCst) {
            let half = data.slice(..data.len() / 2);
            self.inner.write_file(path, half).await?;
            return Err(BridgeError::OperationFailed("interrupted".to_string()));
        }
        self.inner.write_file(path, data).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> BridgeResult<()> {
        self.inner.rename(from, to).await
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.inner.delete_file(path).await
    }

    async fn delete_dir_all(&self, path: &Path) -> BridgeResult<()> {
        self.inner.delete_dir_all(path).await
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        self.inner.list_directory(path).await
    }

    async fn available_space(&self, _path: &Path) -> BridgeResult<u64> {
        Ok(self.free.load(Ordering::SeqCst))
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    remote: Arc<FakeRemote>,
    blobs: Arc<FakeBlobs>,
    http: Arc<FakeHttp>,
    fs: Arc<ControlledFs>,
    file_store: Arc<MediaFileStore>,
    store: LocalStore,
    engine: SyncEngine,
    events: Receiver<CoreEvent>,
}

async fn harness() -> Harness {
    harness_with_blobs(FakeBlobs::default()).await
}

async fn harness_with_blobs(blobs: FakeBlobs) -> Harness {
    let root = std::env::temp_dir().join(format!("mix-sync-test-{}", uuid::Uuid::new_v4()));
    let fs = Arc::new(ControlledFs {
        inner: TokioFileSystem::with_directories(root.join("cache"), root.clone()),
        free: AtomicU64::new(AMPLE_SPACE),
        crash_writes: AtomicBool::new(false),
    });
    let remote = Arc::new(FakeRemote::default());
    let blobs = Arc::new(blobs);
    let http = Arc::new(FakeHttp::default());

    let file_store = Arc::new(MediaFileStore::new(
        FileStoreConfig::default().with_safety_margin(0),
        root.join("media"),
        fs.clone(),
        http.clone(),
        blobs.clone(),
    ));
    file_store.initialize().await.unwrap();

    let store = LocalStore::new(create_test_pool().await.unwrap());

    let bus = EventBus::new(256);
    let events = bus.subscribe();

    let engine = SyncEngine::new(
        SyncConfig::default(),
        remote.clone(),
        remote.clone(),
        file_store.clone(),
    )
    .with_saved_views(remote.clone())
    .with_event_bus(bus)
    .with_clock(Arc::new(FixedClock::new(at(1_700_000_000_000))));

    Harness {
        remote,
        blobs,
        http,
        fs,
        file_store,
        store,
        engine,
        events,
    }
}

impl Harness {
    async fn sync(&self) -> SyncStatus {
        self.engine.sync(&self.store).await;
        self.engine.status()
    }

    fn drain_events(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn at(millis: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

fn photo_mix(id: &str, photo: &str) -> Mix {
    let mut mix = Mix::new(id, MixType::Photo, at(1_000));
    mix.photo_url = Some(photo.to_string());
    mix
}

fn text_mix(id: &str, tts: Option<&str>) -> Mix {
    let mut mix = Mix::new(id, MixType::Text, at(2_000));
    mix.text_content = Some("hello".to_string());
    mix.tts_audio_url = tts.map(str::to_string);
    mix
}

fn remote_tag(id: &str, name: &str) -> Tag {
    Tag {
        id: id.to_string(),
        name: name.to_string(),
        created_at: at(500),
    }
}

fn not_enough_space() -> SyncStatus {
    SyncStatus::Failed {
        reason: "Not enough storage space".to_string(),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_first_sync_mirrors_mixes_media_and_tags() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.http.put("https://cdn.test/b.mp3", b"mp3");
    h.remote.set_mixes(vec![
        photo_mix("A", "photos/a.jpg"),
        text_mix("B", Some("https://cdn.test/b.mp3")),
    ]);
    h.remote.set_tags(
        vec![remote_tag("t1", "Travel"), remote_tag("t2", "Food")],
        vec![MixTag::new("A", "t1"), MixTag::new("B", "t2")],
    );

    assert_eq!(h.sync().await, SyncStatus::Completed);

    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(a.is_synced);
    assert_eq!(a.local_path(MediaField::Photo), Some("storage/photos/a.jpg"));
    assert!(h.file_store.file_exists("storage/photos/a.jpg").await);
    assert_eq!(a.last_synced_at, Some(1_700_000_000_000));

    let b = h.store.mixes().find_by_id("B").await.unwrap().unwrap();
    assert!(b.is_synced);
    let b_audio = b.local_path(MediaField::SpeechAudio).unwrap();
    assert!(b_audio.starts_with("external/"));
    assert!(b_audio.ends_with(".mp3"));
    assert!(h.file_store.file_exists(b_audio).await);

    let tags = h.store.tags().find_all().await.unwrap();
    assert_eq!(tags.len(), 2);
    let rows = h.store.mix_tags().find_all().await.unwrap();
    assert_eq!(
        rows,
        vec![
            LocalMixTag {
                mix_id: "A".to_string(),
                tag_id: "t1".to_string()
            },
            LocalMixTag {
                mix_id: "B".to_string(),
                tag_id: "t2".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_failed_download_leaves_mix_unsynced_but_pass_completes() {
    let h = harness().await;
    h.http.put("https://cdn.test/b.mp3", b"mp3");
    h.remote.set_mixes(vec![
        photo_mix("A", "photos/missing.jpg"),
        text_mix("B", Some("https://cdn.test/b.mp3")),
    ]);

    assert_eq!(h.sync().await, SyncStatus::Completed);

    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(!a.is_synced);
    assert_eq!(a.local_path(MediaField::Photo), None);

    let b = h.store.mixes().find_by_id("B").await.unwrap().unwrap();
    assert!(b.is_synced);
}

#[tokio::test]
async fn test_mix_without_media_is_synced() {
    let h = harness().await;
    h.remote.set_mixes(vec![text_mix("plain", None)]);

    assert_eq!(h.sync().await, SyncStatus::Completed);

    let plain = h.store.mixes().find_by_id("plain").await.unwrap().unwrap();
    assert!(plain.is_synced);
    assert!(plain.paths.all().is_empty());
}

#[tokio::test]
async fn test_second_pass_without_remote_changes_is_idempotent() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.http.put("https://cdn.test/b.mp3", b"mp3");
    h.remote.set_mixes(vec![
        photo_mix("A", "photos/a.jpg"),
        text_mix("B", Some("https://cdn.test/b.mp3")),
    ]);
    h.remote
        .set_tags(vec![remote_tag("t1", "Travel")], vec![MixTag::new("A", "t1")]);

    assert_eq!(h.sync().await, SyncStatus::Completed);
    let mixes_before = h.store.mixes().find_all().await.unwrap();
    let tags_before = h.store.tags().find_all().await.unwrap();
    let usage_before = h.file_store.media_usage_bytes().await.unwrap();

    assert_eq!(h.sync().await, SyncStatus::Completed);

    assert_eq!(h.store.mixes().find_all().await.unwrap(), mixes_before);
    assert_eq!(h.store.tags().find_all().await.unwrap(), tags_before);
    assert_eq!(h.file_store.media_usage_bytes().await.unwrap(), usage_before);
    assert_eq!(h.blobs.downloads(), 1);
    assert_eq!(h.http.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_passes_converge_once_downloads_succeed() {
    let h = harness().await;
    let mut mix = photo_mix("A", "photos/a.jpg");
    mix.photo_thumbnail_url = Some("photos/a-thumb.jpg".to_string());
    h.remote.set_mixes(vec![mix]);

    // Pass 1: nothing available
    assert_eq!(h.sync().await, SyncStatus::Completed);
    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(!a.is_synced);

    // Pass 2: only the thumbnail
    h.blobs.put("photos/a-thumb.jpg", b"thumb");
    assert_eq!(h.sync().await, SyncStatus::Completed);
    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(!a.is_synced);
    assert_eq!(
        a.local_path(MediaField::PhotoThumbnail),
        Some("storage/photos/a-thumb.jpg")
    );
    assert_eq!(a.local_path(MediaField::Photo), None);

    // Pass 3: everything
    h.blobs.put("photos/a.jpg", b"jpeg");
    assert_eq!(h.sync().await, SyncStatus::Completed);
    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(a.is_synced);
    for path in a.paths.all() {
        assert!(h.file_store.file_exists(path).await);
    }
}

#[tokio::test]
async fn test_externally_removed_file_is_downloaded_again() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.remote.set_mixes(vec![photo_mix("A", "photos/a.jpg")]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    h.file_store.delete_file("storage/photos/a.jpg").await.unwrap();
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(a.is_synced);
    assert!(h.file_store.file_exists("storage/photos/a.jpg").await);
    assert_eq!(h.blobs.downloads(), 2);
}

#[tokio::test]
async fn test_replaced_media_url_swaps_local_file() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"old");
    h.blobs.put("photos/a2.jpg", b"new");
    h.remote.set_mixes(vec![photo_mix("A", "photos/a.jpg")]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    h.remote.set_mixes(vec![photo_mix("A", "photos/a2.jpg")]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(a.is_synced);
    assert_eq!(a.local_path(MediaField::Photo), Some("storage/photos/a2.jpg"));
    assert!(h.file_store.file_exists("storage/photos/a2.jpg").await);
    assert!(!h.file_store.file_exists("storage/photos/a.jpg").await);
}

#[tokio::test]
async fn test_cleared_media_url_removes_local_file() {
    let h = harness().await;
    h.http.put("https://cdn.test/b.mp3", b"mp3");
    h.remote
        .set_mixes(vec![text_mix("B", Some("https://cdn.test/b.mp3"))]);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    let before = h.store.mixes().find_by_id("B").await.unwrap().unwrap();
    let old_path = before.local_path(MediaField::SpeechAudio).unwrap().to_string();

    h.remote.set_mixes(vec![text_mix("B", None)]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let b = h.store.mixes().find_by_id("B").await.unwrap().unwrap();
    assert!(b.is_synced);
    assert_eq!(b.local_path(MediaField::SpeechAudio), None);
    assert!(!h.file_store.file_exists(&old_path).await);
}

#[tokio::test]
async fn test_shared_file_survives_when_one_mix_switches_url() {
    let h = harness().await;
    h.blobs.put("photos/shared.jpg", b"shared");
    h.blobs.put("photos/b2.jpg", b"b2");
    h.remote.set_mixes(vec![
        photo_mix("A", "photos/shared.jpg"),
        photo_mix("B", "photos/shared.jpg"),
    ]);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    assert_eq!(h.blobs.downloads(), 1);

    h.remote.set_mixes(vec![
        photo_mix("A", "photos/shared.jpg"),
        photo_mix("B", "photos/b2.jpg"),
    ]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(a.is_synced);
    assert_eq!(a.local_path(MediaField::Photo), Some("storage/photos/shared.jpg"));
    assert!(h.file_store.file_exists("storage/photos/shared.jpg").await);

    let b = h.store.mixes().find_by_id("B").await.unwrap().unwrap();
    assert_eq!(b.local_path(MediaField::Photo), Some("storage/photos/b2.jpg"));

    // Once nothing maps to the shared file, it goes
    h.remote.set_mixes(vec![
        photo_mix("A", "photos/b2.jpg"),
        photo_mix("B", "photos/b2.jpg"),
    ]);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    assert!(!h.file_store.file_exists("storage/photos/shared.jpg").await);
    assert!(h.file_store.file_exists("storage/photos/b2.jpg").await);
}

#[tokio::test]
async fn test_interrupted_write_leaves_mix_unsynced_until_retry() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"complete-jpeg");
    h.remote.set_mixes(vec![photo_mix("A", "photos/a.jpg")]);
    h.fs.set_crash_writes(true);

    assert_eq!(h.sync().await, SyncStatus::Completed);
    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(!a.is_synced);
    assert_eq!(a.local_path(MediaField::Photo), None);
    assert!(!h.file_store.file_exists("storage/photos/a.jpg").await);

    h.fs.set_crash_writes(false);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(a.is_synced);
    let on_disk = std::fs::read(h.file_store.file_url("storage/photos/a.jpg")).unwrap();
    assert_eq!(on_disk, b"complete-jpeg");
    assert_eq!(h.blobs.downloads(), 2);
}

// =============================================================================
// Deletion and admission
// =============================================================================

#[tokio::test]
async fn test_remote_deletion_removes_files_even_when_admission_rejects() {
    let h = harness().await;
    h.blobs.put("photos/c.jpg", b"full");
    h.blobs.put("photos/c-thumb.jpg", b"thumb");
    let mut c = photo_mix("C", "photos/c.jpg");
    c.photo_thumbnail_url = Some("photos/c-thumb.jpg".to_string());
    h.remote.set_mixes(vec![c]);
    h.remote
        .set_tags(vec![remote_tag("t1", "Travel")], vec![MixTag::new("C", "t1")]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let cached = h.store.mixes().find_by_id("C").await.unwrap().unwrap();
    let files: Vec<String> = cached.paths.all().into_iter().map(str::to_string).collect();
    assert_eq!(files.len(), 2);

    // C disappears, D needs a download that cannot fit
    h.remote.set_mixes(vec![photo_mix("D", "photos/d.jpg")]);
    h.blobs.put("photos/d.jpg", b"d");
    h.fs.set_free(0);

    assert_eq!(h.sync().await, not_enough_space());

    assert!(h.store.mixes().find_by_id("C").await.unwrap().is_none());
    for file in &files {
        assert!(!h.file_store.file_exists(file).await);
    }
    assert!(h.store.mixes().find_by_id("D").await.unwrap().is_none());
    assert!(h
        .store
        .mix_tags()
        .tag_ids_for_mix("C")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_remote_deletion_keeps_file_shared_with_surviving_mix() {
    let h = harness().await;
    h.blobs.put("photos/shared.jpg", b"shared");
    h.remote.set_mixes(vec![
        photo_mix("A", "photos/shared.jpg"),
        photo_mix("C", "photos/shared.jpg"),
    ]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    h.remote.set_mixes(vec![
        photo_mix("A", "photos/shared.jpg"),
        photo_mix("D", "photos/d.jpg"),
    ]);
    h.blobs.put("photos/d.jpg", b"d");
    h.fs.set_free(0);

    assert_eq!(h.sync().await, not_enough_space());

    assert!(h.store.mixes().find_by_id("C").await.unwrap().is_none());
    let a = h.store.mixes().find_by_id("A").await.unwrap().unwrap();
    assert!(a.is_synced);
    assert!(h.file_store.file_exists("storage/photos/shared.jpg").await);
}

#[tokio::test]
async fn test_remote_deletion_keeps_file_an_incoming_mix_maps_to() {
    let mut h = harness().await;
    h.blobs.put("photos/shared.jpg", b"shared");
    h.remote.set_mixes(vec![photo_mix("C", "photos/shared.jpg")]);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    h.drain_events();

    h.remote.set_mixes(vec![photo_mix("E", "photos/shared.jpg")]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let e = h.store.mixes().find_by_id("E").await.unwrap().unwrap();
    assert!(e.is_synced);
    assert!(h.file_store.file_exists("storage/photos/shared.jpg").await);
    assert_eq!(h.blobs.downloads(), 1);

    let files_deleted = h
        .drain_events()
        .into_iter()
        .find_map(|event| match event {
            CoreEvent::Sync(SyncEvent::Completed { stats, .. }) => Some(stats.files_deleted),
            _ => None,
        });
    assert_eq!(files_deleted, Some(0));
}

#[tokio::test]
async fn test_zero_headroom_rejects_new_mixes_before_download() {
    let mut h = harness().await;
    h.fs.set_free(0);
    h.blobs.put("photos/1.jpg", b"1");
    h.blobs.put("photos/2.jpg", b"2");
    h.http.put("https://cdn.test/3.mp3", b"3");
    h.remote.set_mixes(vec![
        photo_mix("m1", "photos/1.jpg"),
        photo_mix("m2", "photos/2.jpg"),
        text_mix("m3", Some("https://cdn.test/3.mp3")),
    ]);

    assert_eq!(h.sync().await, not_enough_space());

    assert_eq!(h.store.mixes().count().await.unwrap(), 0);
    assert_eq!(h.blobs.downloads(), 0);
    assert_eq!(h.http.requests.load(Ordering::SeqCst), 0);

    let failed = h.drain_events().into_iter().find_map(|event| match event {
        CoreEvent::Sync(SyncEvent::Failed {
            storage_rejected, ..
        }) => Some(storage_rejected),
        _ => None,
    });
    assert_eq!(failed, Some(true));
}

#[tokio::test]
async fn test_admission_uses_flat_per_file_estimate() {
    let h = harness().await;
    h.blobs.put("photos/1.jpg", b"1");
    h.blobs.put("photos/2.jpg", b"2");
    h.remote.set_mixes(vec![
        photo_mix("m1", "photos/1.jpg"),
        photo_mix("m2", "photos/2.jpg"),
    ]);

    // Two pending files need 10 MiB; one byte short is rejected
    h.fs.set_free(10 * 1024 * 1024 - 1);
    assert_eq!(h.sync().await, not_enough_space());

    h.fs.set_free(10 * 1024 * 1024);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    assert_eq!(h.store.mixes().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_nothing_to_download_passes_with_zero_headroom() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.remote.set_mixes(vec![photo_mix("A", "photos/a.jpg")]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    h.fs.set_free(0);
    h.remote
        .set_mixes(vec![photo_mix("A", "photos/a.jpg"), text_mix("B", None)]);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    assert_eq!(h.store.mixes().count().await.unwrap(), 2);
}

// =============================================================================
// Tags
// =============================================================================

#[tokio::test]
async fn test_tag_associations_match_remote_exactly() {
    let h = harness().await;
    h.remote.set_mixes(vec![text_mix("A", None), text_mix("B", None)]);
    h.remote.set_tags(
        vec![
            remote_tag("t1", "Travel"),
            remote_tag("t2", "Food"),
            remote_tag("t3", "Work"),
        ],
        vec![
            MixTag::new("A", "t1"),
            MixTag::new("A", "t2"),
            MixTag::new("B", "t3"),
        ],
    );
    assert_eq!(h.sync().await, SyncStatus::Completed);

    h.remote.set_tags(
        vec![remote_tag("t1", "Trips"), remote_tag("t2", "Food")],
        vec![MixTag::new("A", "t2"), MixTag::new("B", "t1")],
    );
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let rows = h.store.mix_tags().find_all().await.unwrap();
    assert_eq!(
        rows,
        vec![
            LocalMixTag {
                mix_id: "A".to_string(),
                tag_id: "t2".to_string()
            },
            LocalMixTag {
                mix_id: "B".to_string(),
                tag_id: "t1".to_string()
            },
        ]
    );

    let tags = h.store.tags().find_all().await.unwrap();
    let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Food", "Trips"]);
}

#[tokio::test]
async fn test_tag_failure_does_not_block_mix_sync() {
    let mut h = harness().await;
    h.store
        .tags()
        .upsert(&LocalTag {
            id: "old".to_string(),
            name: "Kept".to_string(),
            created_at: 1,
        })
        .await
        .unwrap();
    h.remote.set_mixes(vec![text_mix("A", None)]);
    h.remote
        .set_tags(vec![remote_tag("t1", "Travel")], vec![MixTag::new("A", "t1")]);
    h.remote.fail_tags.store(true, Ordering::SeqCst);

    assert_eq!(h.sync().await, SyncStatus::Completed);

    assert!(h.store.mixes().find_by_id("A").await.unwrap().is_some());
    let tags = h.store.tags().find_all().await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, "old");
    assert_eq!(h.store.mix_tags().count().await.unwrap(), 0);

    let warned = h.drain_events().into_iter().any(|event| {
        matches!(
            event,
            CoreEvent::Sync(SyncEvent::Warning { ref message, .. }) if message.contains("tags")
        )
    });
    assert!(warned);
}

// =============================================================================
// Failures and lifecycle
// =============================================================================

#[tokio::test]
async fn test_remote_fetch_failure_fails_pass() {
    let h = harness().await;
    h.remote.set_mixes(vec![text_mix("A", None)]);
    h.remote.fail_mixes.store(true, Ordering::SeqCst);

    match h.sync().await {
        SyncStatus::Failed { reason } => assert!(reason.contains("mixes")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(h.store.mixes().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_persist_failure_keeps_downloaded_files_for_next_pass() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.remote.set_mixes(vec![
        photo_mix("A", "photos/a.jpg"),
        text_mix("B", None),
    ]);

    sqlx::query(
        "CREATE TRIGGER reject_b BEFORE INSERT ON local_mixes WHEN NEW.id = 'B' \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .execute(h.store.pool())
    .await
    .unwrap();

    assert!(matches!(h.sync().await, SyncStatus::Failed { .. }));
    assert_eq!(h.store.mixes().count().await.unwrap(), 0);
    assert!(h.file_store.file_exists("storage/photos/a.jpg").await);
    assert_eq!(h.blobs.downloads(), 1);

    sqlx::query("DROP TRIGGER reject_b")
        .execute(h.store.pool())
        .await
        .unwrap();

    assert_eq!(h.sync().await, SyncStatus::Completed);
    assert_eq!(h.store.mixes().count().await.unwrap(), 2);
    assert_eq!(h.blobs.downloads(), 1);
}

#[tokio::test]
async fn test_progress_counts_every_remote_mix() {
    let mut h = harness().await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.remote.set_mixes(vec![text_mix("A", None), text_mix("B", None)]);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    h.drain_events();

    h.remote.set_mixes(vec![
        photo_mix("new", "photos/a.jpg"),
        text_mix("A", None),
        text_mix("B", None),
    ]);
    assert_eq!(h.sync().await, SyncStatus::Completed);

    let progress: Vec<(u64, u64)> = h
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            CoreEvent::Sync(SyncEvent::Progress { current, total, .. }) => Some((current, total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_status_walks_through_lifecycle() {
    let h = harness().await;
    let mut status = h.engine.subscribe_status();
    assert_eq!(*status.borrow(), SyncStatus::Idle);

    h.remote.set_mixes(vec![text_mix("A", None)]);
    h.engine.sync(&h.store).await;

    assert!(status.has_changed().unwrap());
    assert_eq!(*status.borrow_and_update(), SyncStatus::Completed);
}

#[tokio::test]
async fn test_sync_while_running_is_ignored() {
    let gate = Arc::new(Notify::new());
    let mut h = harness_with_blobs(FakeBlobs {
        gate: Some(gate.clone()),
        ..FakeBlobs::default()
    })
    .await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.remote.set_mixes(vec![photo_mix("A", "photos/a.jpg")]);

    let mut status = h.engine.subscribe_status();
    let first = h.engine.sync(&h.store);
    let second = async {
        status
            .wait_for(|s| matches!(s, SyncStatus::Downloading { .. }))
            .await
            .unwrap();
        h.engine.sync(&h.store).await;
        assert!(h.engine.status().is_active());
        gate.notify_one();
    };
    tokio::join!(first, second);

    assert_eq!(h.engine.status(), SyncStatus::Completed);
    assert_eq!(h.blobs.downloads(), 1);

    let started = h
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, CoreEvent::Sync(SyncEvent::Started { .. })))
        .count();
    assert_eq!(started, 1);
}

#[tokio::test]
async fn test_exclusive_access_refused_during_pass() {
    let gate = Arc::new(Notify::new());
    let h = harness_with_blobs(FakeBlobs {
        gate: Some(gate.clone()),
        ..FakeBlobs::default()
    })
    .await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.remote.set_mixes(vec![photo_mix("A", "photos/a.jpg")]);

    let mut status = h.engine.subscribe_status();
    let pass = h.engine.sync(&h.store);
    let maintenance = async {
        status
            .wait_for(|s| matches!(s, SyncStatus::Downloading { .. }))
            .await
            .unwrap();
        assert!(matches!(
            h.engine.try_exclusive(),
            Err(SyncError::AlreadyRunning)
        ));
        gate.notify_one();
    };
    tokio::join!(pass, maintenance);

    assert_eq!(h.engine.status(), SyncStatus::Completed);
    assert!(h.engine.try_exclusive().is_ok());
}

#[tokio::test]
async fn test_pass_waits_for_exclusive_holder() {
    let h = harness().await;
    h.blobs.put("photos/a.jpg", b"jpeg");
    h.remote.set_mixes(vec![photo_mix("A", "photos/a.jpg")]);

    let exclusive = h.engine.try_exclusive().unwrap();
    let mut status = h.engine.subscribe_status();
    let pass = h.engine.sync(&h.store);
    let maintenance = async {
        status
            .wait_for(|s| matches!(s, SyncStatus::Syncing))
            .await
            .unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.blobs.downloads(), 0);
        assert_eq!(h.engine.status(), SyncStatus::Syncing);
        assert!(h.store.mixes().find_by_id("A").await.unwrap().is_none());
        drop(exclusive);
    };
    tokio::join!(pass, maintenance);

    assert_eq!(h.engine.status(), SyncStatus::Completed);
    assert_eq!(h.blobs.downloads(), 1);
    assert!(h.file_store.file_exists("storage/photos/a.jpg").await);
}

// =============================================================================
// Saved views
// =============================================================================

#[tokio::test]
async fn test_saved_views_are_mirrored_after_pass() {
    let h = harness().await;
    h.remote.set_saved_views(vec![
        SavedView {
            id: "v1".to_string(),
            name: "Trips".to_string(),
            tag_ids: vec!["t1".to_string()],
            created_at: at(10),
        },
        SavedView {
            id: "v2".to_string(),
            name: "Meals".to_string(),
            tag_ids: vec![],
            created_at: at(20),
        },
    ]);
    assert_eq!(h.sync().await, SyncStatus::Completed);
    assert_eq!(h.store.saved_views().find_all().await.unwrap().len(), 2);

    h.remote.set_saved_views(vec![SavedView {
        id: "v2".to_string(),
        name: "Dinners".to_string(),
        tag_ids: vec!["t9".to_string()],
        created_at: at(20),
    }]);
    assert_eq!(h.engine.sync_saved_views(&h.store).await.unwrap(), 1);

    let views = h.store.saved_views().find_all().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].name, "Dinners");
    assert_eq!(views[0].tag_ids, vec!["t9"]);
}
