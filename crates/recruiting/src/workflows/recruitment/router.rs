use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, FromRef, Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::audit::{write_csv, AuditFilter, AuditQuery};
use super::domain::{
    CandidateUpdate, Registration, VacancyDraft, VacancyUpdate, DEFAULT_VACANCY_STATE,
    EMPTY_JSON_LIST,
};
use super::service::RecruitmentService;
use super::session::{Session, SessionKeys};
use super::uploads::CvStore;
use super::views;
use crate::error::AppError;
use crate::procedures::{ProcParam, ProcedureError, ProcedureGateway, Record};

/// Shared state of the portal router.
pub struct PortalState<G> {
    pub service: Arc<RecruitmentService<G>>,
    pub uploads: Arc<CvStore>,
    pub sessions: SessionKeys,
    /// Absolute base used for links handed out of band (password reset).
    pub public_url: Option<String>,
    pub body_limit: usize,
}

impl<G> Clone for PortalState<G> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            uploads: Arc::clone(&self.uploads),
            sessions: self.sessions.clone(),
            public_url: self.public_url.clone(),
            body_limit: self.body_limit,
        }
    }
}

impl<G> FromRef<PortalState<G>> for SessionKeys {
    fn from_ref(state: &PortalState<G>) -> Self {
        state.sessions.clone()
    }
}

pub fn portal_router<G>(state: PortalState<G>) -> Router
where
    G: ProcedureGateway + 'static,
{
    let body_limit = state.body_limit;
    Router::new()
        .route("/", get(index::<G>))
        .route("/ranking/:vacancy_id", get(ranking::<G>))
        .route("/dashboard", get(dashboard::<G>))
        .route("/vacante/cerrar", post(close_vacancy::<G>))
        .route(
            "/vacante/crear",
            get(vacancy_create_form::<G>).post(vacancy_create::<G>),
        )
        .route(
            "/vacante/editar/:vacancy_id",
            get(vacancy_edit_form::<G>).post(vacancy_edit::<G>),
        )
        .route("/vacante/:vacancy_id", get(vacancy_detail::<G>))
        .route("/postulante/:candidate_id", get(candidate_profile::<G>))
        .route(
            "/postulante/editar/:candidate_id",
            get(candidate_edit_form::<G>).post(candidate_edit::<G>),
        )
        .route(
            "/postulacion/:application_id/timeline",
            get(application_timeline::<G>),
        )
        .route(
            "/postulacion/:application_id/recalcular",
            post(recalculate_score::<G>),
        )
        .route("/reportes", get(reports))
        .route("/api/report/vacantes_mes", get(vacancies_by_month::<G>))
        .route(
            "/api/report/postulantes_vacante",
            get(applicants_by_vacancy::<G>),
        )
        .route("/auditoria", get(audit_log::<G>))
        .route("/auditoria/export", get(audit_export::<G>))
        .route("/config/departamentos", get(department_catalog::<G>))
        .route(
            "/config/departamentos/crear",
            get(department_form).post(department_create::<G>),
        )
        .route("/config/usuarios", get(users::<G>))
        .route("/postular", post(apply_json::<G>))
        .route("/postular_ui", post(apply_form::<G>))
        .route("/login", get(login_form).post(login::<G>))
        .route("/logout", get(logout))
        .route("/register", get(register_form).post(register::<G>))
        .route(
            "/reset_request",
            get(reset_request_form).post(reset_request::<G>),
        )
        .route(
            "/reset/:token",
            get(reset_password_form).post(reset_password::<G>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

fn json_failure(error: ProcedureError) -> Response {
    warn!(error = %error, "procedure call failed");
    AppError::from(error).into_response()
}

fn flash_failure(session: Session, error: impl std::fmt::Display, location: &str) -> Response {
    warn!(error = %error, location, "request failed; redirecting");
    session.flash_redirect(error.to_string(), location)
}

fn referer_or_root(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("/")
        .to_string()
}

/// Mirrors JSON truthiness: missing, null, false, zero, and empty values are all absent.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().map_or(true, |n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(fields)) => !fields.is_empty(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

/// `usuario` from a JSON body; an explicit null or empty string is forwarded unchanged.
fn json_actor(payload: &Value) -> Option<ProcParam> {
    payload.get("usuario").map(ProcParam::from_json)
}

async fn index<G>(State(state): State<PortalState<G>>, session: Session) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.list_vacancies().await {
        Ok(vacancies) => session.render(|context| views::index(context, &vacancies)),
        Err(error) => json_failure(error),
    }
}

async fn ranking<G>(
    State(state): State<PortalState<G>>,
    Path(vacancy_id): Path<i64>,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let rows = match state.service.ranking(vacancy_id).await {
        Ok(rows) => rows,
        Err(error) => return json_failure(error),
    };
    let vacancy = match state.service.vacancy_detail(vacancy_id).await {
        Ok(vacancy) => vacancy.unwrap_or_default(),
        Err(error) => return json_failure(error),
    };
    session.render(|context| views::ranking(context, &vacancy, &rows))
}

async fn dashboard<G>(State(state): State<PortalState<G>>, session: Session) -> Response
where
    G: ProcedureGateway + 'static,
{
    let Some(role) = session.role() else {
        return session.redirect("/");
    };
    match state.service.dashboard(role).await {
        Ok(dashboard) => session.render(|context| views::dashboard(context, &dashboard)),
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn vacancy_detail<G>(
    State(state): State<PortalState<G>>,
    Path(vacancy_id): Path<i64>,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.vacancy_detail(vacancy_id).await {
        Ok(Some(vacancy)) => {
            session.render(|context| views::vacancy_detail(context, vacancy_id, &vacancy))
        }
        Ok(None) => (StatusCode::NOT_FOUND, "Vacante no encontrada").into_response(),
        Err(error) => json_failure(error),
    }
}

async fn candidate_profile<G>(
    State(state): State<PortalState<G>>,
    Path(candidate_id): Path<i64>,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let candidate = match state.service.candidate(candidate_id).await {
        Ok(Some(candidate)) => candidate,
        Ok(None) => return (StatusCode::NOT_FOUND, "Postulante no encontrado").into_response(),
        Err(error) => return flash_failure(session, error, "/"),
    };
    match state.service.candidate_applications(candidate_id).await {
        Ok(applications) => session.render(|context| {
            views::candidate_profile(context, candidate_id, &candidate, &applications)
        }),
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn candidate_edit_form<G>(
    State(state): State<PortalState<G>>,
    Path(candidate_id): Path<i64>,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.candidate(candidate_id).await {
        Ok(Some(candidate)) => {
            session.render(|context| views::candidate_form(context, candidate_id, &candidate))
        }
        Ok(None) => session.flash_redirect("Postulante no encontrado", "/"),
        Err(error) => flash_failure(session, error, "/"),
    }
}

struct UploadedFile {
    filename: String,
    contents: Bytes,
}

#[derive(Default)]
struct CandidateForm {
    name: Option<String>,
    email: Option<String>,
    years_experience: Option<String>,
    skills: Option<String>,
    cv: Option<UploadedFile>,
}

async fn read_candidate_form(mut multipart: Multipart) -> Result<CandidateForm, MultipartError> {
    let mut form = CandidateForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "nombre" => form.name = Some(field.text().await?),
            "email" => form.email = Some(field.text().await?),
            "anos_experiencia" => form.years_experience = Some(field.text().await?),
            "habilidades" => form.skills = Some(field.text().await?),
            "cv" => {
                let filename = field.file_name().map(str::to_string);
                let contents = field.bytes().await?;
                if let Some(filename) = filename.filter(|name| !name.is_empty()) {
                    form.cv = Some(UploadedFile { filename, contents });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn candidate_edit<G>(
    State(state): State<PortalState<G>>,
    Path(candidate_id): Path<i64>,
    session: Session,
    multipart: Multipart,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let edit_form = format!("/postulante/editar/{candidate_id}");
    let form = match read_candidate_form(multipart).await {
        Ok(form) => form,
        Err(error) => return flash_failure(session, error, &edit_form),
    };

    let years_experience = match non_empty(form.years_experience) {
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(years) => years,
            Err(_) => {
                return session.flash_redirect("Años de experiencia inválidos", &edit_form)
            }
        },
        None => 0,
    };

    let cv_path = match form.cv {
        Some(upload) => {
            match state
                .uploads
                .save(candidate_id, &upload.filename, &upload.contents)
                .await
            {
                Ok(path) => Some(path),
                Err(error) => return flash_failure(session, error, &edit_form),
            }
        }
        None => None,
    };

    let update = CandidateUpdate {
        candidate_id,
        name: form.name,
        email: form.email,
        years_experience,
        skills: non_empty(form.skills).unwrap_or_else(|| EMPTY_JSON_LIST.to_string()),
        cv_path,
    };
    match state.service.update_candidate(&update).await {
        Ok(()) => session.flash_redirect("Perfil actualizado", &format!("/postulante/{candidate_id}")),
        Err(error) => flash_failure(session, error, &edit_form),
    }
}

#[derive(Debug, Default, Deserialize)]
struct VacancyForm {
    titulo: Option<String>,
    descripcion: Option<String>,
    departamento_id: Option<String>,
    requerimientos: Option<String>,
    estado: Option<String>,
}

enum DraftError {
    MissingDepartment,
    InvalidDepartment,
}

impl VacancyForm {
    fn into_draft(self) -> Result<(VacancyDraft, Option<String>), DraftError> {
        let department_id = non_empty(self.departamento_id)
            .ok_or(DraftError::MissingDepartment)?
            .trim()
            .parse::<i64>()
            .map_err(|_| DraftError::InvalidDepartment)?;
        let draft = VacancyDraft {
            title: self.titulo,
            description: self.descripcion,
            department_id,
            requirements: non_empty(self.requerimientos)
                .unwrap_or_else(|| EMPTY_JSON_LIST.to_string()),
        };
        Ok((draft, non_empty(self.estado)))
    }
}

fn draft_error(session: Session, error: DraftError, location: &str) -> Response {
    let message = match error {
        DraftError::MissingDepartment => "Departamento es requerido",
        DraftError::InvalidDepartment => "Departamento inválido",
    };
    session.flash_redirect(message, location)
}

async fn vacancy_create_form<G>(State(state): State<PortalState<G>>, session: Session) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.departments().await {
        Ok(departments) => session.render(|context| views::vacancy_form(context, &departments, None)),
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn vacancy_create<G>(
    State(state): State<PortalState<G>>,
    session: Session,
    Form(form): Form<VacancyForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let (draft, _) = match form.into_draft() {
        Ok(parsed) => parsed,
        Err(error) => return draft_error(session, error, "/vacante/crear"),
    };
    let actor = state.service.actor(session.username());
    match state.service.create_vacancy(&draft, &actor).await {
        Ok(()) => session.flash_redirect("Vacante creada", "/"),
        Err(error) => flash_failure(session, error, "/vacante/crear"),
    }
}

async fn vacancy_edit_form<G>(
    State(state): State<PortalState<G>>,
    Path(vacancy_id): Path<i64>,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let departments = match state.service.departments().await {
        Ok(departments) => departments,
        Err(error) => return flash_failure(session, error, "/"),
    };
    match state.service.vacancy_detail(vacancy_id).await {
        Ok(Some(vacancy)) => session.render(|context| {
            views::vacancy_form(context, &departments, Some((vacancy_id, &vacancy)))
        }),
        Ok(None) => session.flash_redirect("Vacante no encontrada", "/"),
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn vacancy_edit<G>(
    State(state): State<PortalState<G>>,
    Path(vacancy_id): Path<i64>,
    session: Session,
    Form(form): Form<VacancyForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let edit_form = format!("/vacante/editar/{vacancy_id}");
    let (draft, state_label) = match form.into_draft() {
        Ok(parsed) => parsed,
        Err(error) => return draft_error(session, error, &edit_form),
    };
    let update = VacancyUpdate {
        vacancy_id,
        draft,
        state: state_label.unwrap_or_else(|| DEFAULT_VACANCY_STATE.to_string()),
    };
    let actor = state.service.actor(session.username());
    match state.service.update_vacancy(&update, &actor).await {
        Ok(()) => session.flash_redirect("Vacante actualizada", &format!("/vacante/{vacancy_id}")),
        Err(error) => flash_failure(session, error, &edit_form),
    }
}

async fn close_vacancy<G>(
    State(state): State<PortalState<G>>,
    Json(payload): Json<Value>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let vacancy_id = payload.get("vacante_id");
    if !is_truthy(vacancy_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "vacante_id requerido" })),
        )
            .into_response();
    }
    let vacancy_id = vacancy_id.map(ProcParam::from_json).unwrap_or(ProcParam::Null);
    let actor = json_actor(&payload).unwrap_or_else(|| state.service.actor(None).into());
    match state.service.close_vacancy(vacancy_id, actor).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(error) => json_failure(error),
    }
}

async fn application_timeline<G>(
    State(state): State<PortalState<G>>,
    Path(application_id): Path<i64>,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.application_timeline(application_id).await {
        Ok(rows) => {
            session.render(|context| views::application_timeline(context, application_id, &rows))
        }
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn recalculate_score<G>(
    State(state): State<PortalState<G>>,
    Path(application_id): Path<i64>,
    headers: HeaderMap,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let back = referer_or_root(&headers);
    match state.service.recalculate_score(application_id).await {
        Ok(()) => {
            info!(application_id, "score recalculated");
            session.flash_redirect("Score recalculado", &back)
        }
        Err(error) => flash_failure(session, error, &back),
    }
}

async fn reports(session: Session) -> Response {
    session.render(views::reports)
}

async fn vacancies_by_month<G>(State(state): State<PortalState<G>>) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.vacancies_by_month().await {
        Ok(rows) => Json(rows).into_response(),
        Err(error) => json_failure(error),
    }
}

async fn applicants_by_vacancy<G>(State(state): State<PortalState<G>>) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.applicants_by_vacancy().await {
        Ok(rows) => Json(rows).into_response(),
        Err(error) => json_failure(error),
    }
}

async fn filtered_logs<G>(
    service: &RecruitmentService<G>,
    query: &AuditQuery,
) -> Result<Vec<Record>, ProcedureError>
where
    G: ProcedureGateway + 'static,
{
    let logs = service.audit_logs().await?;
    Ok(AuditFilter::from(query.clone()).apply(logs))
}

async fn audit_log<G>(
    State(state): State<PortalState<G>>,
    Query(query): Query<AuditQuery>,
    session: Session,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    match filtered_logs(&state.service, &query).await {
        Ok(logs) => session.render(|context| views::audit_log(context, &query, &logs)),
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn audit_export<G>(
    State(state): State<PortalState<G>>,
    Query(query): Query<AuditQuery>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let logs = match filtered_logs(&state.service, &query).await {
        Ok(logs) => logs,
        Err(error) => return json_failure(error),
    };

    let mut buffer = Vec::new();
    if let Err(error) = write_csv(&logs, &mut buffer) {
        warn!(error = %error, "audit export failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"auditoria.csv\"",
            ),
        ],
        buffer,
    )
        .into_response()
}

async fn department_catalog<G>(State(state): State<PortalState<G>>, session: Session) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.department_catalog().await {
        Ok(departments) => {
            session.render(|context| views::department_catalog(context, &departments))
        }
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn department_form(session: Session) -> Response {
    session.render(views::department_form)
}

#[derive(Debug, Deserialize)]
struct DepartmentForm {
    nombre: Option<String>,
    descripcion: Option<String>,
}

async fn department_create<G>(
    State(state): State<PortalState<G>>,
    session: Session,
    Form(form): Form<DepartmentForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state
        .service
        .create_department(form.nombre, form.descripcion)
        .await
    {
        Ok(()) => session.flash_redirect("Departamento creado", "/config/departamentos"),
        Err(error) => flash_failure(session, error, "/config/departamentos/crear"),
    }
}

async fn users<G>(State(state): State<PortalState<G>>, session: Session) -> Response
where
    G: ProcedureGateway + 'static,
{
    match state.service.list_users().await {
        Ok(users) => session.render(|context| views::users(context, &users)),
        Err(error) => flash_failure(session, error, "/"),
    }
}

async fn apply_json<G>(
    State(state): State<PortalState<G>>,
    Json(payload): Json<Value>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let candidate_id = payload.get("postulante_id");
    let vacancy_id = payload.get("vacante_id");
    if !is_truthy(candidate_id) || !is_truthy(vacancy_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "postulante_id y vacante_id requeridos" })),
        )
            .into_response();
    }

    let candidate_id = candidate_id.map(ProcParam::from_json).unwrap_or(ProcParam::Null);
    let vacancy_id = vacancy_id.map(ProcParam::from_json).unwrap_or(ProcParam::Null);
    let actor = json_actor(&payload).unwrap_or_else(|| state.service.actor(None).into());
    match state.service.apply(candidate_id, vacancy_id, actor).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response(),
        Err(error) => json_failure(error),
    }
}

#[derive(Debug, Deserialize)]
struct ApplyForm {
    postulante_id: Option<String>,
    vacante_id: Option<String>,
    usuario: Option<String>,
}

async fn apply_form<G>(
    State(state): State<PortalState<G>>,
    headers: HeaderMap,
    session: Session,
    Form(form): Form<ApplyForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let back = referer_or_root(&headers);
    let (Some(candidate_raw), Some(vacancy_raw)) =
        (non_empty(form.postulante_id), non_empty(form.vacante_id))
    else {
        return session.flash_redirect("ID de postulante y vacante son requeridos", &back);
    };
    let (Ok(candidate_id), Ok(vacancy_id)) = (
        candidate_raw.trim().parse::<i64>(),
        vacancy_raw.trim().parse::<i64>(),
    ) else {
        return session.flash_redirect("ID de postulante o vacante inválido", &back);
    };

    let actor = state.service.actor(form.usuario.as_deref());
    let detail = format!("/vacante/{vacancy_id}");
    match state
        .service
        .apply(candidate_id.into(), vacancy_id.into(), &actor)
        .await
    {
        Ok(()) => {
            info!(candidate_id, vacancy_id, "application submitted");
            session.flash_redirect("Postulación enviada correctamente", &detail)
        }
        Err(error) => {
            warn!(error = %error, candidate_id, vacancy_id, "application rejected");
            session.flash_redirect(format!("Error: {error}"), &detail)
        }
    }
}

async fn login_form(session: Session) -> Response {
    session.render(views::login_form)
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

async fn login<G>(
    State(state): State<PortalState<G>>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let (Some(username), Some(password)) = (non_empty(form.username), non_empty(form.password))
    else {
        return session.flash_redirect("Usuario y contraseña requeridos", "/login");
    };

    match state.service.authenticate(&username, &password).await {
        Ok(Some(user)) => {
            info!(username = %user.username, role = ?user.role, "user signed in");
            let greeting = format!("Bienvenido {}", user.username);
            session.sign_in(user);
            session.flash_redirect(greeting, "/")
        }
        Ok(None) => session.flash_redirect("Error de autenticación", "/login"),
        Err(error) => flash_failure(session, error, "/login"),
    }
}

async fn logout(mut session: Session) -> Response {
    session.clear();
    session.flash_redirect("Sesión cerrada", "/")
}

async fn register_form(session: Session) -> Response {
    session.render(views::register_form)
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    nombre: Option<String>,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

async fn register<G>(
    State(state): State<PortalState<G>>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let (Some(name), Some(email), Some(username), Some(password)) = (
        non_empty(form.nombre),
        non_empty(form.email),
        non_empty(form.username),
        non_empty(form.password),
    ) else {
        return session.flash_redirect("Todos los campos son requeridos", "/register");
    };

    let registration = Registration {
        name,
        email,
        username,
        password,
    };
    match state.service.register(&registration).await {
        Ok(_) => session.flash_redirect("Cuenta creada. Puedes iniciar sesión", "/login"),
        Err(error) => flash_failure(session, error, "/register"),
    }
}

async fn reset_request_form(session: Session) -> Response {
    session.render(views::reset_request_form)
}

#[derive(Debug, Deserialize)]
struct ResetRequestForm {
    username: Option<String>,
}

fn reset_link(public_url: Option<&str>, headers: &HeaderMap, token: &str) -> String {
    let base = match public_url {
        Some(base) => base.to_string(),
        None => headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(|host| format!("http://{host}"))
            .unwrap_or_default(),
    };
    format!("{base}/reset/{token}")
}

async fn reset_request<G>(
    State(state): State<PortalState<G>>,
    headers: HeaderMap,
    session: Session,
    Form(form): Form<ResetRequestForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let Some(username) = non_empty(form.username) else {
        return session.flash_redirect("Usuario requerido", "/reset_request");
    };

    match state.service.request_password_reset(&username).await {
        Ok(token) => {
            let link = reset_link(state.public_url.as_deref(), &headers, &token);
            session.flash_redirect(
                format!("Enlace de restablecimiento (prueba): {link}"),
                "/login",
            )
        }
        Err(error) => flash_failure(session, error, "/reset_request"),
    }
}

async fn reset_password_form(Path(token): Path<String>, session: Session) -> Response {
    session.render(|context| views::reset_password_form(context, &token))
}

#[derive(Debug, Deserialize)]
struct ResetPasswordForm {
    password: Option<String>,
}

async fn reset_password<G>(
    State(state): State<PortalState<G>>,
    Path(token): Path<String>,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Response
where
    G: ProcedureGateway + 'static,
{
    let form_location = format!("/reset/{}", urlencoding::encode(&token));
    let Some(password) = non_empty(form.password) else {
        return session.flash_redirect("Contraseña requerida", &form_location);
    };

    match state.service.change_password(&token, &password).await {
        Ok(()) => session.flash_redirect("Contraseña actualizada. Inicia sesión.", "/login"),
        Err(error) => flash_failure(session, error, &form_location),
    }
}
