// src/types/analysis.rs
//! Submission payloads and persisted analysis records

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// ===== Analysis Kinds =====

/// The two analysis flavours the API accepts. Each kind owns a table, a queue
/// task and a prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Transcript,
    Icebreaker,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 2] = [AnalysisKind::Transcript, AnalysisKind::Icebreaker];

    /// Queue task name used when enqueueing work for this kind
    pub fn task_name(self) -> &'static str {
        match self {
            AnalysisKind::Transcript => "analyze_transcript_task",
            AnalysisKind::Icebreaker => "analyze_linkedin_icebreaker_task",
        }
    }

    pub fn from_task_name(task_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.task_name() == task_name)
    }

    pub fn table(self) -> &'static str {
        match self {
            AnalysisKind::Transcript => "transcripts",
            AnalysisKind::Icebreaker => "linkedin_icebreakers",
        }
    }

    /// Column (and JSON field) holding the generated analysis
    pub fn analysis_field(self) -> &'static str {
        match self {
            AnalysisKind::Transcript => "analysis",
            AnalysisKind::Icebreaker => "icebreaker_analysis",
        }
    }

    /// Name of the entity id in submission responses
    pub fn id_field(self) -> &'static str {
        match self {
            AnalysisKind::Transcript => "transcript_id",
            AnalysisKind::Icebreaker => "icebreaker_id",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Transcript => "Transcript",
            AnalysisKind::Icebreaker => "LinkedIn icebreaker",
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ===== Requests =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRequest {
    pub company_name: String,
    pub attendees: String,
    pub date: String,
    pub transcript_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcebreakerRequest {
    pub linkedin_bio: String,
    pub pitch_deck: String,
}

/// Immutable client payload. Never mutated after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    Transcript(TranscriptRequest),
    Icebreaker(IcebreakerRequest),
}

impl AnalysisRequest {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisRequest::Transcript(_) => AnalysisKind::Transcript,
            AnalysisRequest::Icebreaker(_) => AnalysisKind::Icebreaker,
        }
    }

    /// First analysed text field that is blank, if any
    pub fn blank_field(&self) -> Option<&'static str> {
        match self {
            AnalysisRequest::Transcript(t) if t.transcript_text.trim().is_empty() => {
                Some("transcript_text")
            }
            AnalysisRequest::Icebreaker(i) if i.linkedin_bio.trim().is_empty() => {
                Some("linkedin_bio")
            }
            AnalysisRequest::Icebreaker(i) if i.pitch_deck.trim().is_empty() => {
                Some("pitch_deck")
            }
            _ => None,
        }
    }

    /// Serialize the variant's own fields for a queue payload
    pub fn to_payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            AnalysisRequest::Transcript(t) => serde_json::to_value(t),
            AnalysisRequest::Icebreaker(i) => serde_json::to_value(i),
        };
        value.context("Failed to serialize analysis request")
    }

    pub fn from_payload(kind: AnalysisKind, payload: serde_json::Value) -> Result<Self> {
        match kind {
            AnalysisKind::Transcript => serde_json::from_value(payload)
                .map(AnalysisRequest::Transcript)
                .context("Invalid transcript payload"),
            AnalysisKind::Icebreaker => serde_json::from_value(payload)
                .map(AnalysisRequest::Icebreaker)
                .context("Invalid icebreaker payload"),
        }
    }
}

impl From<TranscriptRequest> for AnalysisRequest {
    fn from(request: TranscriptRequest) -> Self {
        AnalysisRequest::Transcript(request)
    }
}

impl From<IcebreakerRequest> for AnalysisRequest {
    fn from(request: IcebreakerRequest) -> Self {
        AnalysisRequest::Icebreaker(request)
    }
}

// ===== Records =====

/// Persisted submission. `analysis` starts empty and is filled once by the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub id: String,
    pub request: AnalysisRequest,
    pub analysis: String,
    pub job_id: String,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn pending(id: String, job_id: String, request: AnalysisRequest) -> Self {
        Self {
            id,
            request,
            analysis: String::new(),
            job_id,
            // Stored with microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        self.request.kind()
    }
}

impl Serialize for AnalysisRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        match &self.request {
            AnalysisRequest::Transcript(t) => {
                map.serialize_entry("company_name", &t.company_name)?;
                map.serialize_entry("attendees", &t.attendees)?;
                map.serialize_entry("date", &t.date)?;
                map.serialize_entry("transcript_text", &t.transcript_text)?;
            }
            AnalysisRequest::Icebreaker(i) => {
                map.serialize_entry("linkedin_bio", &i.linkedin_bio)?;
                map.serialize_entry("pitch_deck", &i.pitch_deck)?;
            }
        }
        map.serialize_entry(self.kind().analysis_field(), &self.analysis)?;
        map.serialize_entry("job_id", &self.job_id)?;
        map.serialize_entry("created_at", &self.created_at.to_rfc3339())?;
        map.end()
    }
}
