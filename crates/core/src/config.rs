//! Global configuration constants for retrieval.
//!
//! All tuning parameters, input validation limits, and server defaults are defined here.
//! These are compile-time constants; runtime configuration is handled via
//! [`IndexOptions`](crate::index::IndexOptions) and CLI arguments in the server binary.

/// Number of neighbors returned when a search request does not specify `top_k`.
pub const DEFAULT_TOP_K: usize = 20;

/// Maximum number of results (`top_k`) accepted by the HTTP layer.
pub const MAX_TOP_K: usize = 10_000;

/// Default number of long-lived worker threads used to fan out bucket scans.
pub const DEFAULT_WORKER_THREADS: usize = 10;

/// Default signature capacity (in bits) of the binary index.
///
/// Must be at least the feature dimension. ResNet-50 pooled features are 2048 wide.
pub const DEFAULT_SIGNATURE_BITS: usize = 2048;

/// Vector width (f32 lanes) of the vectorized distance kernels.
///
/// Dimensions that are not a multiple of this width use the scalar kernels.
pub const SIMD_LANES: usize = 8;

/// Largest serialized record accepted from a feature file (4 MB).
pub const MAX_FRAME_BYTES: u64 = 4 * 1024 * 1024;

/// Number of ingested records between two build progress log lines.
pub const BUILD_PROGRESS_INTERVAL: u64 = 1000;

/// Default number of bidirectional links per HNSW node.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–64. Default: 16.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default ef parameter during HNSW index construction.
///
/// Controls the size of the dynamic candidate list during insertion.
/// Higher values produce a better graph but slow down build time.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default ef parameter during HNSW search.
///
/// Controls the size of the dynamic candidate list during query.
/// Higher values improve recall at the cost of latency.
pub const HNSW_DEFAULT_EF_SEARCH: usize = 50;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_DEFAULT_MAX_LAYERS: usize = 16;

/// Maximum number of nodes an HNSW graph accepts; sized for the ImageNet train split.
pub const HNSW_DEFAULT_MAX_ELEMENTS: usize = 1_300_000;

/// Seed of the level generator used when building an HNSW graph.
///
/// A fixed seed makes repeated builds over the same input produce the same graph.
pub const HNSW_DEFAULT_SEED: u64 = 100;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum HTTP request body size in bytes (10 MB).
pub const MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Maximum number of concurrent in-flight requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 512;
