//! # Darkroom
//!
//! The photo ingestion pipeline behind a portfolio site. Every upload becomes
//! a consistent set of renditions, with duplicates caught at the door, capture
//! metadata extracted, and the original kept on a tiered storage backend.
//!
//! # Pipeline
//!
//! ```text
//! upload ─▶ (HEIC → JPEG) ─▶ decode ─▶ duplicate check ─▶ EXIF / GPS
//!        ─▶ original → storage ─▶ record (processing)
//!        ─▶ display.avif + thumbnail.webp + watermarked.{avif,webp}
//!        ─▶ hashes ─▶ location name ─▶ enrichment ─▶ draft
//! ```
//!
//! Photo records themselves belong to the surrounding application; the
//! pipeline reads and writes them through the [`catalog::PhotoRepository`]
//! seam. The bundled [`catalog::JsonCatalog`] keeps them in a JSON file.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ingest`] | Upload orchestration, quick upload and deferred processing |
//! | [`reoptimize`] | Rendition regeneration with a source fallback chain; photo deletion |
//! | [`imaging`] | Decode/encode backend, sizing, quality mapping, watermarking, renditions |
//! | [`dedupe`] | SHA-256 file hashes, dHash perceptual hashes, Hamming search |
//! | [`metadata`] | EXIF fields, GPS conversion, reverse geocoding |
//! | [`storage`] | Local / remote (S3-compatible) tiers behind one gateway |
//! | [`heic`] | HEIC/HEIF conversion through an external tool |
//! | [`enrich`] | Optional caption/title enrichment seam |
//! | [`catalog`] | Photo repository trait and JSON-file implementation |
//! | [`photo`] | The `Photo` record and `StorageLocation` |
//! | [`config`] | `darkroom.toml` loading, merging, validation |
//! | [`slug`] | URL-safe unique slugs |
//! | [`report`] | Per-item batch outcomes |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit storage tiers
//!
//! Where an original lives is recorded as a [`photo::StorageLocation`]
//! variant, never as a marker prefix inside a path string.
//!
//! ## Failure tolerance
//!
//! Only three things abort an upload: an undecodable image, a failed HEIC
//! conversion and a failed rendition write. Everything else (EXIF, geocoding,
//! storage tiers, enrichment, the duplicate scan) logs and degrades. Batch
//! operations report per item and never stop at the first failure.
//!
//! ## Single-threaded processing
//!
//! An upload is processed synchronously in the calling thread. Bulk work goes
//! through the quick-upload queue and an external worker calling
//! [`ingest::IngestionCoordinator::process_pending`].

pub mod catalog;
pub mod config;
pub mod dedupe;
pub mod enrich;
pub mod heic;
pub mod imaging;
pub mod ingest;
pub mod metadata;
pub mod output;
pub mod photo;
pub mod reoptimize;
pub mod report;
pub mod slug;
pub mod storage;
