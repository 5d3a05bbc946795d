//! Data models for image analysis

pub mod comparison;
pub mod detection;
pub mod run;
pub mod sku;

pub use comparison::{ComparisonResult, NearMiss};
pub use detection::{Confidence, DetectedItem, DetectionReport};
pub use run::AnalysisRun;
pub use sku::{
    CatalogEntrySpec, CatalogError, CatalogExport, ImportMode, ImportOutcome, SkuCatalog,
    SkuEntry, DEFAULT_SKU_ITEMS,
};
