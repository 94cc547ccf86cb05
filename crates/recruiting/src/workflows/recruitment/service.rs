use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::domain::{
    CandidateUpdate, Dashboard, Registration, Role, SessionUser, VacancyDraft, VacancyUpdate,
    SELF_SERVICE_ROLE,
};
use crate::procedures::{
    field_i64, field_text, ProcParam, ProcedureError, ProcedureGateway, Record,
};

const SP_LIST_VACANCIES: &str = "sp_listar_vacantes";
const SP_RANKING: &str = "sp_generar_ranking";
const SP_VACANCY_DETAIL: &str = "sp_vacante_detalle";
const SP_GENERAL_REPORT: &str = "vista_reporte_general";
const SP_AUDIT_LOGS: &str = "sp_listar_logs";
const SP_GET_CANDIDATE: &str = "sp_get_postulante";
const SP_UPDATE_CANDIDATE: &str = "sp_update_postulante";
const SP_CREATE_VACANCY: &str = "sp_create_vacante";
const SP_UPDATE_VACANCY: &str = "sp_update_vacante";
const SP_CLOSE_VACANCY: &str = "sp_cerrar_vacante";
const SP_TIMELINE: &str = "sp_postulacion_timeline";
const SP_RECALCULATE: &str = "sp_recalcular_score";
const SP_VACANCIES_BY_MONTH: &str = "sp_report_vacantes_por_mes";
const SP_APPLICANTS_BY_VACANCY: &str = "sp_report_postulantes_por_vacante";
const SP_CREATE_DEPARTMENT: &str = "sp_create_departamento";
const SP_LIST_USERS: &str = "sp_listar_usuarios";
const SP_APPLY: &str = "sp_crear_postulacion";
const SP_AUTHENTICATE: &str = "sp_authenticate_user";
const SP_CREATE_USER: &str = "sp_crear_usuario_ex";
const SP_REQUEST_RESET: &str = "sp_request_password_reset";
const SP_CHANGE_PASSWORD: &str = "sp_change_password_by_token";

const SQL_RECENT_APPLICATIONS: &str = "SELECT pt.nombre, v.titulo, po.fecha_postulacion \
     FROM postulaciones po \
     JOIN postulantes pt ON pt.id = po.postulante_id \
     JOIN vacantes v ON v.id = po.vacante_id \
     ORDER BY po.fecha_postulacion DESC LIMIT 10";

const SQL_CANDIDATE_APPLICATIONS: &str = "SELECT po.id AS postulacion_id, po.fecha_postulacion, \
     po.estado, v.id AS vacante_id, v.titulo, d.nombre AS departamento, e.score \
     FROM postulaciones po \
     JOIN vacantes v ON v.id = po.vacante_id \
     LEFT JOIN departamentos d ON d.id = v.departamento_id \
     LEFT JOIN evaluacion_ia e ON e.postulacion_id = po.id \
     WHERE po.postulante_id = ? \
     ORDER BY po.fecha_postulacion DESC";

const SQL_DEPARTMENTS: &str = "SELECT id, nombre FROM departamentos";
const SQL_DEPARTMENT_CATALOG: &str =
    "SELECT id, nombre, descripcion FROM departamentos ORDER BY nombre";
const SQL_INSERT_CANDIDATE: &str = "INSERT INTO postulantes (nombre, email) VALUES (?, ?)";

/// Number of ranked candidates shown on the recruiter dashboard.
pub const RECRUITER_TOP_CANDIDATES: usize = 5;

/// Knobs that are not owned by the database.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Actor recorded by procedures when neither the request nor the session names one.
    pub default_actor: String,
    pub reset_token_ttl_minutes: u32,
}

impl ServiceSettings {
    pub fn new(default_actor: impl Into<String>) -> Self {
        Self {
            default_actor: default_actor.into(),
            reset_token_ttl_minutes: 30,
        }
    }
}

/// Facade mapping each portal operation onto its stored procedure.
pub struct RecruitmentService<G> {
    gateway: Arc<G>,
    settings: ServiceSettings,
}

impl<G> RecruitmentService<G>
where
    G: ProcedureGateway + 'static,
{
    pub fn new(gateway: Arc<G>, settings: ServiceSettings) -> Self {
        Self { gateway, settings }
    }

    /// Actor for audit columns: the supplied value as given, otherwise the configured default.
    pub fn actor(&self, supplied: Option<&str>) -> String {
        supplied.map_or_else(|| self.settings.default_actor.clone(), str::to_string)
    }

    pub async fn list_vacancies(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.call(SP_LIST_VACANCIES, &[]).await
    }

    pub async fn ranking(&self, vacancy_id: i64) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.call(SP_RANKING, &[vacancy_id.into()]).await
    }

    pub async fn vacancy_detail(&self, vacancy_id: i64) -> Result<Option<Record>, ProcedureError> {
        let rows = self
            .gateway
            .call(SP_VACANCY_DETAIL, &[vacancy_id.into()])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Totals row; zeros when the view returns nothing.
    pub async fn general_report(&self) -> Result<Record, ProcedureError> {
        let rows = self.gateway.call(SP_GENERAL_REPORT, &[]).await?;
        Ok(rows.into_iter().next().unwrap_or_else(|| {
            let mut totals = Record::new();
            totals.insert("total_vacantes".to_string(), Value::from(0));
            totals.insert("total_postulantes".to_string(), Value::from(0));
            totals.insert("promedio_score".to_string(), Value::from(0));
            totals
        }))
    }

    pub async fn recent_applications(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.query(SQL_RECENT_APPLICATIONS, &[]).await
    }

    pub async fn audit_logs(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.call(SP_AUDIT_LOGS, &[]).await
    }

    pub async fn candidate(&self, candidate_id: i64) -> Result<Option<Record>, ProcedureError> {
        let rows = self
            .gateway
            .call(SP_GET_CANDIDATE, &[candidate_id.into()])
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn candidate_applications(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<Record>, ProcedureError> {
        self.gateway
            .query(SQL_CANDIDATE_APPLICATIONS, &[candidate_id.into()])
            .await
    }

    pub async fn update_candidate(&self, update: &CandidateUpdate) -> Result<(), ProcedureError> {
        let params: [ProcParam; 6] = [
            update.candidate_id.into(),
            update.name.clone().into(),
            update.email.clone().into(),
            update.years_experience.into(),
            update.skills.clone().into(),
            update.cv_path.clone().into(),
        ];
        self.gateway.call(SP_UPDATE_CANDIDATE, &params).await?;
        Ok(())
    }

    pub async fn departments(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.query(SQL_DEPARTMENTS, &[]).await
    }

    pub async fn department_catalog(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.query(SQL_DEPARTMENT_CATALOG, &[]).await
    }

    pub async fn create_vacancy(
        &self,
        draft: &VacancyDraft,
        actor: &str,
    ) -> Result<(), ProcedureError> {
        let params: [ProcParam; 5] = [
            draft.title.clone().into(),
            draft.description.clone().into(),
            draft.department_id.into(),
            draft.requirements.clone().into(),
            actor.into(),
        ];
        self.gateway.call(SP_CREATE_VACANCY, &params).await?;
        info!(department_id = draft.department_id, actor, "vacancy created");
        Ok(())
    }

    pub async fn update_vacancy(
        &self,
        update: &VacancyUpdate,
        actor: &str,
    ) -> Result<(), ProcedureError> {
        let params: [ProcParam; 7] = [
            update.vacancy_id.into(),
            update.draft.title.clone().into(),
            update.draft.description.clone().into(),
            update.draft.department_id.into(),
            update.draft.requirements.clone().into(),
            update.state.clone().into(),
            actor.into(),
        ];
        self.gateway.call(SP_UPDATE_VACANCY, &params).await?;
        Ok(())
    }

    pub async fn close_vacancy(
        &self,
        vacancy_id: ProcParam,
        actor: impl Into<ProcParam>,
    ) -> Result<(), ProcedureError> {
        self.gateway
            .call(SP_CLOSE_VACANCY, &[vacancy_id, actor.into()])
            .await?;
        Ok(())
    }

    pub async fn application_timeline(
        &self,
        application_id: i64,
    ) -> Result<Vec<Record>, ProcedureError> {
        self.gateway
            .call(SP_TIMELINE, &[application_id.into()])
            .await
    }

    pub async fn recalculate_score(&self, application_id: i64) -> Result<(), ProcedureError> {
        self.gateway
            .call(SP_RECALCULATE, &[application_id.into()])
            .await?;
        Ok(())
    }

    pub async fn vacancies_by_month(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.call(SP_VACANCIES_BY_MONTH, &[]).await
    }

    pub async fn applicants_by_vacancy(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.call(SP_APPLICANTS_BY_VACANCY, &[]).await
    }

    pub async fn create_department(
        &self,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<(), ProcedureError> {
        self.gateway
            .call(SP_CREATE_DEPARTMENT, &[name.into(), description.into()])
            .await?;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<Record>, ProcedureError> {
        self.gateway.call(SP_LIST_USERS, &[]).await
    }

    /// Links a candidate to a vacancy; ids are passed through as received.
    pub async fn apply(
        &self,
        candidate_id: ProcParam,
        vacancy_id: ProcParam,
        actor: impl Into<ProcParam>,
    ) -> Result<(), ProcedureError> {
        self.gateway
            .call(SP_APPLY, &[candidate_id, vacancy_id, actor.into()])
            .await?;
        Ok(())
    }

    /// Returns the signed-in identity, or `None` when the credentials are rejected.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<SessionUser>, ProcedureError> {
        let rows = self
            .gateway
            .call(SP_AUTHENTICATE, &[username.into(), password.into()])
            .await?;

        Ok(rows.into_iter().next().map(|row| {
            let stored_name = field_text(&row, "username");
            SessionUser {
                id: field_i64(&row, "id"),
                username: if stored_name.is_empty() {
                    username.to_string()
                } else {
                    stored_name
                },
                role: Some(field_text(&row, "rol_app")).filter(|role| !role.is_empty()),
            }
        }))
    }

    /// Creates the candidate row and its login; returns the new candidate id.
    pub async fn register(&self, registration: &Registration) -> Result<u64, ProcedureError> {
        let candidate_id = self
            .gateway
            .insert(
                SQL_INSERT_CANDIDATE,
                &[
                    registration.name.as_str().into(),
                    registration.email.as_str().into(),
                ],
            )
            .await?;

        let params: [ProcParam; 5] = [
            registration.username.as_str().into(),
            registration.password.as_str().into(),
            registration.name.as_str().into(),
            registration.email.as_str().into(),
            SELF_SERVICE_ROLE.label().into(),
        ];
        self.gateway.call(SP_CREATE_USER, &params).await?;
        info!(candidate_id, username = %registration.username, "candidate account registered");
        Ok(candidate_id)
    }

    /// Issues a reset token and returns it so the caller can build the link.
    pub async fn request_password_reset(&self, username: &str) -> Result<String, ProcedureError> {
        let token = Uuid::new_v4().simple().to_string();
        let params: [ProcParam; 3] = [
            username.into(),
            token.as_str().into(),
            self.settings.reset_token_ttl_minutes.into(),
        ];
        self.gateway.call(SP_REQUEST_RESET, &params).await?;
        Ok(token)
    }

    pub async fn change_password(&self, token: &str, password: &str) -> Result<(), ProcedureError> {
        self.gateway
            .call(SP_CHANGE_PASSWORD, &[token.into(), password.into()])
            .await?;
        Ok(())
    }

    pub async fn dashboard(&self, role: Role) -> Result<Dashboard, ProcedureError> {
        match role {
            Role::Admin => {
                let stats = self.general_report().await?;
                let recent = self.recent_applications().await?;
                Ok(Dashboard::Admin { stats, recent })
            }
            Role::Recruiter => {
                let vacancies = self.list_vacancies().await?;
                let top = match vacancies.first().and_then(|row| field_i64(row, "id")) {
                    Some(vacancy_id) => {
                        let mut ranking = self.ranking(vacancy_id).await?;
                        ranking.truncate(RECRUITER_TOP_CANDIDATES);
                        ranking
                    }
                    None => Vec::new(),
                };
                Ok(Dashboard::Recruiter { vacancies, top })
            }
            Role::Candidate => Ok(Dashboard::Candidate {
                vacancies: self.list_vacancies().await?,
            }),
            Role::Auditor => Ok(Dashboard::Auditor {
                logs: self.audit_logs().await?,
            }),
        }
    }
}
