// src/types/mod.rs
pub mod analysis;

pub use analysis::{
    AnalysisKind, AnalysisRecord, AnalysisRequest, IcebreakerRequest, TranscriptRequest,
};
