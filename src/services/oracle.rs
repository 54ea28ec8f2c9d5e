// src/services/oracle.rs
//! Structured-data extraction oracle: contract, response validation and
//! normalization. The network client lives in `services::openai`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Candidate fields extracted from resume text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredCandidate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub designations: Vec<String>,
    pub domain_knowledge: Option<String>,
}

impl StructuredCandidate {
    pub fn has_identity(&self) -> bool {
        self.email.is_some() || self.phone.is_some()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("Extraction service is not configured")]
    NotConfigured,

    #[error("Extraction request failed: {0}")]
    RequestFailed(String),

    #[error("Extraction service rate limit exceeded")]
    RateLimited,

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    #[error("Document is not a resume ({document_type}): {reason}")]
    NotAResume { document_type: String, reason: String },
}

impl OracleError {
    /// Everything except a classification rejection may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        !matches!(self, OracleError::NotAResume { .. })
    }
}

/// Which prompt/response contract the oracle speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OracleMode {
    /// Classify first, extract only from resumes
    #[default]
    Validating,
    /// Extract fields without classification
    Legacy,
}

impl FromStr for OracleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "validating" => Ok(OracleMode::Validating),
            "legacy" => Ok(OracleMode::Legacy),
            other => Err(format!("unknown oracle mode '{}'", other)),
        }
    }
}

/// External text → structured candidate service
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract_structured(&self, resume_text: &str) -> Result<StructuredCandidate, OracleError>;
}

#[derive(Debug, Deserialize)]
struct RawFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    skills: Option<Vec<String>>,
    #[serde(default)]
    designations: Option<Vec<String>>,
    #[serde(default)]
    domain_knowledge: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidatingEnvelope {
    document_type: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    candidate: Option<RawFields>,
}

/// Validate a raw oracle reply against the contract for `mode`
pub fn parse_oracle_response(raw: &str, mode: OracleMode) -> Result<StructuredCandidate, OracleError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| OracleError::MalformedResponse("no JSON object in response".to_string()))?;

    match mode {
        OracleMode::Legacy => {
            let fields: RawFields = serde_json::from_str(json)
                .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
            Ok(normalize(fields))
        }
        OracleMode::Validating => {
            let envelope: ValidatingEnvelope = serde_json::from_str(json)
                .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;

            let document_type = envelope.document_type.trim().to_lowercase();
            if document_type != "resume" {
                return Err(OracleError::NotAResume {
                    document_type,
                    reason: envelope
                        .reason
                        .unwrap_or_else(|| "classified as non-resume".to_string()),
                });
            }

            let fields = envelope.candidate.ok_or_else(|| {
                OracleError::MalformedResponse("resume response without candidate data".to_string())
            })?;
            Ok(normalize(fields))
        }
    }
}

/// Strip markdown fences and surrounding prose, keep the outermost object
fn extract_json_object(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed).trim();

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

fn normalize(fields: RawFields) -> StructuredCandidate {
    StructuredCandidate {
        name: clean_string(fields.name),
        email: clean_string(fields.email),
        phone: clean_string(fields.phone),
        skills: clean_list(fields.skills),
        designations: clean_list(fields.designations),
        domain_knowledge: clean_string(fields.domain_knowledge),
    }
}

fn clean_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn clean_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub const VALIDATING_SYSTEM_PROMPT: &str = "You are a professional candidate resume parser. \
You first decide whether a document is a resume, and only then extract structured data from it.";

pub const LEGACY_SYSTEM_PROMPT: &str =
    "You are a professional candidate resume parser that extracts structured data from resumes.";

/// User prompt for the given mode
pub fn build_prompt(mode: OracleMode, resume_text: &str) -> String {
    match mode {
        OracleMode::Validating => format!(
            r#"Step 1: classify the document below as one of "resume", "job_description", "invoice" or "other".
Step 2: only if it is a resume, extract:
- name: full name of the candidate
- email: email address
- phone: phone number
- skills: array of technical and professional skills
- designations: array of ALL job titles the candidate has held
- domain_knowledge: summary of the candidate's domain expertise and industry knowledge

Never invent values. Use null for missing strings and [] for missing arrays.

Return ONLY a JSON object of this shape:
{{
    "document_type": "resume",
    "reason": "one sentence explaining the classification",
    "candidate": {{
        "name": "John Doe",
        "email": "john@example.com",
        "phone": "+1234567890",
        "skills": ["Python", "PostgreSQL"],
        "designations": ["Software Engineer", "Technical Lead"],
        "domain_knowledge": "5 years of backend development"
    }}
}}
For any other document_type, set "candidate" to null.

Document:
{}"#,
            resume_text
        ),
        OracleMode::Legacy => format!(
            r#"Extract the following information from the resume text and return it as a JSON object:
name, email, phone, skills (array), designations (array of all job titles held), domain_knowledge.
If a field is not found, use null for strings or an empty array for skills/designations.

Resume Text:
{}

Return ONLY a valid JSON object with the above fields."#,
            resume_text
        ),
    }
}

/// Deterministic oracle for tests
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results in order, then repeats `fallback`
    pub struct ScriptedOracle {
        script: Mutex<VecDeque<Result<StructuredCandidate, OracleError>>>,
        fallback: Result<StructuredCandidate, OracleError>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        pub fn always(result: Result<StructuredCandidate, OracleError>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: result,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn sequence(
            script: Vec<Result<StructuredCandidate, OracleError>>,
            fallback: Result<StructuredCandidate, OracleError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExtractionOracle for ScriptedOracle {
        async fn extract_structured(&self, _resume_text: &str) -> Result<StructuredCandidate, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    pub fn candidate(name: &str, email: Option<&str>, phone: Option<&str>, skills: &[&str]) -> StructuredCandidate {
        StructuredCandidate {
            name: Some(name.to_string()),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            designations: vec!["Engineer".to_string()],
            domain_knowledge: Some("Backend systems".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validating_resume_response_with_fences() {
        let raw = r#"```json
{
  "document_type": "resume",
  "reason": "Lists work history",
  "candidate": {
    "name": "  Jane Doe ",
    "email": "jane@example.com",
    "phone": null,
    "skills": ["Ruby on Rails", "ruby", "", "Ruby on Rails"],
    "designations": null,
    "domain_knowledge": ""
  }
}
```"#;

        let parsed = parse_oracle_response(raw, OracleMode::Validating).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Jane Doe"));
        assert_eq!(parsed.email.as_deref(), Some("jane@example.com"));
        assert_eq!(parsed.phone, None);
        // Duplicates and casing survive; blanks do not
        assert_eq!(parsed.skills, vec!["Ruby on Rails", "ruby", "Ruby on Rails"]);
        assert!(parsed.designations.is_empty());
        assert_eq!(parsed.domain_knowledge, None);
    }

    #[test]
    fn test_non_resume_is_rejected() {
        let raw = r#"{"document_type": "Job_Description", "reason": "Describes an open role", "candidate": null}"#;
        match parse_oracle_response(raw, OracleMode::Validating) {
            Err(OracleError::NotAResume { document_type, reason }) => {
                assert_eq!(document_type, "job_description");
                assert_eq!(reason, "Describes an open role");
            }
            other => panic!("expected NotAResume, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(
            parse_oracle_response("I could not parse this", OracleMode::Validating),
            Err(OracleError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_oracle_response(r#"{"document_type": "resume"}"#, OracleMode::Validating),
            Err(OracleError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_oracle_response(r#"{"name": "A", "skills": "Rust"}"#, OracleMode::Legacy),
            Err(OracleError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_legacy_mode_reads_bare_fields() {
        let raw = r#"Here you go: {"name": "John", "email": null, "phone": "+1 555", "skills": ["Go"]}"#;
        let parsed = parse_oracle_response(raw, OracleMode::Legacy).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("John"));
        assert_eq!(parsed.phone.as_deref(), Some("+1 555"));
        assert_eq!(parsed.skills, vec!["Go"]);
        assert!(parsed.has_identity());
    }

    #[test]
    fn test_retry_classification() {
        assert!(OracleError::MalformedResponse("x".into()).is_retryable());
        assert!(OracleError::RateLimited.is_retryable());
        assert!(!OracleError::NotAResume {
            document_type: "invoice".into(),
            reason: "x".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("LEGACY".parse::<OracleMode>().unwrap(), OracleMode::Legacy);
        assert_eq!(OracleMode::default(), OracleMode::Validating);
        assert!("strict".parse::<OracleMode>().is_err());
    }
}
