use feed_stream::{FieldRole, FontSpec, Token};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A run of tokens laid out contiguously with one bounding rectangle.
///
/// Carries everything the renderer needs to draw it without further layout
/// decisions: accumulated text, geometry, face, and semantic role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    /// Accumulated text of every token placed in this block.
    pub content: String,
    /// Face shared by the block's tokens.
    pub font: FontSpec,
    /// Semantic role of the originating field.
    pub role: FieldRole,
}

impl Block {
    pub(crate) fn open(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        font: FontSpec,
        role: FieldRole,
    ) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            content: String::new(),
            font,
            role,
        }
    }

    /// Horizontal extent; always `right - left`.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Vertical extent; always `bottom - top`.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True until the first token is placed.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Append a token: the right edge advances by the token width and the
    /// bottom edge grows to the tallest token placed so far. The top edge
    /// never moves and the block never shrinks.
    pub(crate) fn push_token(&mut self, token: &Token) {
        self.content.push_str(&token.content);
        self.right += token.width_px;
        if self.bottom - self.top < token.height_px {
            self.bottom = self.top + token.height_px;
        }
    }
}

/// Ordered blocks within one page: left-to-right in scrolling layout,
/// top-to-bottom in paged layout. Append-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub blocks: Vec<Block>,
}

impl Line {
    pub(crate) fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The top-level unit handed to the renderer. In scrolling layout one page
/// is one ticker frame. Append-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub lines: Vec<Line>,
}

impl Page {
    pub(crate) fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterate every block on this page in layout order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.lines.iter().flat_map(|line| line.blocks.iter())
    }
}

/// Stable pagination profile id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PaginationProfileId(pub [u8; 32]);

impl PaginationProfileId {
    /// Build a deterministic profile id from arbitrary payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut out = [0u8; 32];
        let h0 = fnv64(0xcbf29ce484222325, bytes).to_le_bytes();
        let h1 = fnv64(0x9e3779b97f4a7c15, bytes).to_le_bytes();
        let h2 = fnv64(0xd6e8feb86659fd93, bytes).to_le_bytes();
        let h3 = fnv64(0xa0761d6478bd642f, bytes).to_le_bytes();
        out[0..8].copy_from_slice(&h0);
        out[8..16].copy_from_slice(&h1);
        out[16..24].copy_from_slice(&h2);
        out[24..32].copy_from_slice(&h3);
        Self(out)
    }

    fn hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }
}

fn fnv64(seed: u64, payload: &[u8]) -> u64 {
    let mut hash = seed;
    for b in payload {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Persistence hooks for laid-out pages, keyed by pagination profile and
/// generation key.
pub trait PageCacheStore {
    /// Load cached pages for `key` under `profile`, if available.
    fn load_pages(&self, _profile: PaginationProfileId, _key: &str) -> Option<Vec<Page>> {
        None
    }

    /// Persist pages for `key` under `profile`.
    fn store_pages(&self, _profile: PaginationProfileId, _key: &str, _pages: &[Page]) {}
}

const CACHE_SCHEMA_VERSION: u8 = 1;
const DEFAULT_MAX_CACHE_FILE_BYTES: usize = 2 * 1024 * 1024;
static CACHE_WRITE_NONCE: AtomicUsize = AtomicUsize::new(0);

#[derive(Serialize, Deserialize)]
struct PersistedCacheEnvelope {
    schema_version: u8,
    pages: Vec<Page>,
}

impl PersistedCacheEnvelope {
    fn from_pages(pages: &[Page]) -> Self {
        Self {
            schema_version: CACHE_SCHEMA_VERSION,
            pages: pages.to_vec(),
        }
    }

    fn into_pages(self) -> Option<Vec<Page>> {
        if self.schema_version != CACHE_SCHEMA_VERSION {
            return None;
        }
        Some(self.pages)
    }
}

/// File-backed page cache store.
///
/// Cache paths are deterministic by pagination profile and key:
/// `<root>/<profile-hex>/pages-<key-hash>.json`.
///
/// The store uses a JSON envelope with a schema version and enforces
/// `max_file_bytes` on both reads and writes. When I/O, decode, or size
/// checks fail, operations return `None`/no-op instead of bubbling errors.
#[derive(Clone, Debug)]
pub struct FilePageCacheStore {
    root: PathBuf,
    max_file_bytes: usize,
}

impl FilePageCacheStore {
    /// Create a new cache store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: DEFAULT_MAX_CACHE_FILE_BYTES,
        }
    }

    /// Set the maximum allowed cache file size in bytes.
    ///
    /// Values of `0` are treated as `1` to keep the cap explicit.
    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes.max(1);
        self
    }

    /// Root directory for cache files.
    pub fn cache_root(&self) -> &Path {
        &self.root
    }

    /// Maximum allowed cache file size in bytes.
    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    /// Deterministic cache path for a profile/key payload.
    pub fn page_cache_path(&self, profile: PaginationProfileId, key: &str) -> PathBuf {
        let profile_dir = profile.hex();
        let key_hash = fnv64(0xcbf29ce484222325, key.as_bytes());
        self.root
            .join(profile_dir)
            .join(format!("pages-{:016x}.json", key_hash))
    }
}

impl PageCacheStore for FilePageCacheStore {
    fn load_pages(&self, profile: PaginationProfileId, key: &str) -> Option<Vec<Page>> {
        let path = self.page_cache_path(profile, key);
        let max_file_bytes = self.max_file_bytes as u64;
        if fs::metadata(&path).ok()?.len() > max_file_bytes {
            return None;
        }

        let file = File::open(path).ok()?;
        let mut reader = file.take(max_file_bytes.saturating_add(1));
        let mut payload = Vec::new();
        if reader.read_to_end(&mut payload).is_err() {
            return None;
        }
        if payload.len() > self.max_file_bytes {
            return None;
        }
        let envelope: PersistedCacheEnvelope = serde_json::from_slice(&payload).ok()?;
        envelope.into_pages()
    }

    fn store_pages(&self, profile: PaginationProfileId, key: &str, pages: &[Page]) {
        let final_path = self.page_cache_path(profile, key);
        let Some(parent) = final_path.parent() else {
            return;
        };
        if fs::create_dir_all(parent).is_err() {
            return;
        }

        let nonce = CACHE_WRITE_NONCE.fetch_add(1, Ordering::Relaxed);
        let temp_path = parent.join(format!(
            "pages.json.tmp-{}-{}",
            std::process::id(),
            nonce
        ));

        let envelope = PersistedCacheEnvelope::from_pages(pages);
        let Ok(payload) = serde_json::to_vec(&envelope) else {
            return;
        };
        if payload.len() > self.max_file_bytes {
            return;
        }
        let Ok(mut file) = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        else {
            return;
        };
        if file.write_all(&payload).is_err() || file.sync_all().is_err() {
            let _ = fs::remove_file(&temp_path);
            return;
        }
        drop(file);
        if fs::rename(&temp_path, &final_path).is_err() {
            let _ = fs::remove_file(&temp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_stream::Rgba;

    fn token(content: &str, width_px: f32, height_px: f32) -> Token {
        Token {
            content: content.to_string(),
            font: FontSpec::default(),
            color: Rgba::default(),
            width_px,
            height_px,
        }
    }

    #[test]
    fn block_append_extends_right_and_grows_bottom() {
        let mut block = Block::open(0.0, 10.0, 0.0, 20.0, FontSpec::default(), FieldRole::Body);
        block.push_token(&token("a", 7.0, 8.0));
        assert_eq!(block.right, 7.0);
        assert_eq!(block.bottom, 20.0);
        block.push_token(&token("b", 3.0, 14.0));
        assert_eq!(block.right, 10.0);
        // Taller token grows the bottom edge; top stays fixed.
        assert_eq!(block.top, 10.0);
        assert_eq!(block.bottom, 24.0);
        assert_eq!(block.content, "ab");
    }

    #[test]
    fn block_extent_accessors_track_edges() {
        let mut block = Block::open(5.0, 0.0, 5.0, 16.0, FontSpec::default(), FieldRole::Title);
        for step in 1..=4 {
            block.push_token(&token("x", 2.5, 16.0));
            assert_eq!(block.width(), block.right - block.left);
            assert_eq!(block.height(), block.bottom - block.top);
            assert_eq!(block.width(), 2.5 * step as f32);
        }
    }

    #[test]
    fn profile_id_is_deterministic_and_input_sensitive() {
        let a = PaginationProfileId::from_bytes(b"config-a");
        let b = PaginationProfileId::from_bytes(b"config-a");
        let c = PaginationProfileId::from_bytes(b"config-b");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.hex().len(), 64);
    }

    #[test]
    fn file_store_round_trips_pages() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePageCacheStore::new(dir.path());
        let profile = PaginationProfileId::from_bytes(b"opts");

        let mut block = Block::open(0.0, 0.0, 0.0, 0.0, FontSpec::default(), FieldRole::Body);
        block.push_token(&token("hello", 40.0, 16.0));
        let mut line = Line::default();
        line.push(block);
        let mut page = Page::default();
        page.push(line);

        store.store_pages(profile, "ticker/frame", &[page.clone()]);
        let loaded = store.load_pages(profile, "ticker/frame").unwrap();
        assert_eq!(loaded, vec![page]);
    }

    #[test]
    fn file_store_misses_on_unknown_key_and_corrupt_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePageCacheStore::new(dir.path());
        let profile = PaginationProfileId::from_bytes(b"opts");
        assert!(store.load_pages(profile, "absent").is_none());

        let path = store.page_cache_path(profile, "broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json").unwrap();
        assert!(store.load_pages(profile, "broken").is_none());
    }

    #[test]
    fn file_store_enforces_size_cap_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePageCacheStore::new(dir.path()).with_max_file_bytes(8);
        let profile = PaginationProfileId::from_bytes(b"opts");
        store.store_pages(profile, "big", &[Page::default()]);
        assert!(!store.page_cache_path(profile, "big").exists());
    }
}
