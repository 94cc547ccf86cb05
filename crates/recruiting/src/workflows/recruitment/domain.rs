use serde::{Deserialize, Serialize};
use std::fmt;

use crate::procedures::Record;

/// Value stored by the procedures when a list field (skills, requirements) is left blank.
pub const EMPTY_JSON_LIST: &str = "[]";
/// State assigned to a vacancy when an edit does not specify one.
pub const DEFAULT_VACANCY_STATE: &str = "abierta";
/// Role given to accounts created through self-registration.
pub const SELF_SERVICE_ROLE: Role = Role::Candidate;

/// Application role carried in the session and used to pick a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "reclutador")]
    Recruiter,
    #[serde(rename = "postulante")]
    Candidate,
    #[serde(rename = "auditor")]
    Auditor,
}

impl Role {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "admin" => Some(Self::Admin),
            "reclutador" => Some(Self::Recruiter),
            "postulante" => Some(Self::Candidate),
            "auditor" => Some(Self::Auditor),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Recruiter => "reclutador",
            Self::Candidate => "postulante",
            Self::Auditor => "auditor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity returned by the authentication procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Option<i64>,
    pub username: String,
    /// Raw role label as stored; unknown labels keep the user signed in without a dashboard.
    pub role: Option<String>,
}

impl SessionUser {
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::from_label)
    }
}

/// Profile edit submitted from the candidate form.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateUpdate {
    pub candidate_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub years_experience: i64,
    /// JSON list serialized as text.
    pub skills: String,
    pub cv_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VacancyDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub department_id: i64,
    /// JSON list serialized as text.
    pub requirements: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VacancyUpdate {
    pub vacancy_id: i64,
    pub draft: VacancyDraft,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Dashboard content, one shape per role.
#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard {
    Admin {
        stats: Record,
        recent: Vec<Record>,
    },
    Recruiter {
        vacancies: Vec<Record>,
        top: Vec<Record>,
    },
    Candidate {
        vacancies: Vec<Record>,
    },
    Auditor {
        logs: Vec<Record>,
    },
}
