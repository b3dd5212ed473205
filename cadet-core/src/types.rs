//! Domain and wire types shared by the registry, workers and clients

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of an active learning session
///
/// Opaque to the server; the broker chooses it when it starts a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random session ID
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One unit to be ranked for annotation
///
/// A unit is either a whole communication or a single sentence inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationUnitIdentifier {
    pub communication_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_id: Option<String>,
}

impl AnnotationUnitIdentifier {
    /// A unit covering a whole communication
    pub fn new(communication_id: impl Into<String>) -> Self {
        Self {
            communication_id: communication_id.into(),
            sentence_id: None,
        }
    }

    /// A unit covering one sentence of a communication
    pub fn sentence(communication_id: impl Into<String>, sentence_id: impl Into<String>) -> Self {
        Self {
            communication_id: communication_id.into(),
            sentence_id: Some(sentence_id.into()),
        }
    }
}

/// Content of a communication as returned by the fetch service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Communication {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// User feedback on one annotation unit
///
/// The annotated communication carries the user's signal; only the ranking
/// policy interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationUnitIdentifier,
    pub communication: Communication,
}

impl Annotation {
    pub fn new(id: AnnotationUnitIdentifier, communication: Communication) -> Self {
        Self { id, communication }
    }
}

/// The units of a session and their language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationTask {
    pub units: Vec<AnnotationUnitIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl AnnotationTask {
    pub fn new(units: Vec<AnnotationUnitIdentifier>) -> Self {
        Self {
            units,
            language: None,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Distinct communication IDs of the units, in first-seen order
    pub fn communication_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            if !ids.contains(&unit.communication_id) {
                ids.push(unit.communication_id.clone());
            }
        }
        ids
    }
}

/// Where rankings for a session are delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub host: String,
    pub port: u16,
}

impl ContactInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// An ordering of a session's annotation units
pub type Ranking = Vec<AnnotationUnitIdentifier>;

/// Everything a worker needs to run one session
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub id: SessionId,
    pub task: AnnotationTask,
    pub contact: ContactInfo,
    /// Number of buffered annotations that triggers a retrain
    pub retrain_threshold: usize,
}

impl SessionSpec {
    pub fn new(
        id: SessionId,
        task: AnnotationTask,
        contact: ContactInfo,
        retrain_threshold: usize,
    ) -> Self {
        Self {
            id,
            task,
            contact,
            retrain_threshold: retrain_threshold.max(1),
        }
    }
}
