//! Recruitment portal: vacancies, candidates, applications, and the web surface around them.
//!
//! Business rules (eligibility, scoring, audit trail) live in the database; this module
//! validates request shape, calls the matching procedure through [`RecruitmentService`],
//! and renders the result.

pub mod audit;
pub mod domain;
pub mod router;
pub mod service;
pub mod session;
pub mod uploads;
pub mod views;

#[cfg(test)]
mod tests;

pub use audit::{AuditFilter, AuditQuery};
pub use domain::{
    CandidateUpdate, Dashboard, Registration, Role, SessionUser, VacancyDraft, VacancyUpdate,
};
pub use router::{portal_router, PortalState};
pub use service::{RecruitmentService, ServiceSettings, RECRUITER_TOP_CANDIDATES};
pub use session::{Session, SessionKeys, SESSION_COOKIE_NAME};
pub use uploads::{CvStore, UploadError};
