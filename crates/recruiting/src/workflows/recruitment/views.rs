//! Server-rendered pages for the recruitment portal.
//!
//! Result rows are rendered generically: tables show every field a procedure returns, in the
//! order it was selected, so a procedure can grow columns without touching this module.

use serde_json::Value;

use super::audit::AuditQuery;
use super::domain::{Dashboard, Role};
use crate::procedures::{field_i64, field_text, Record};

/// Per-request data every page needs: pending flashes and who is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub flashes: Vec<String>,
    pub username: Option<String>,
    pub role: Option<Role>,
}

const STYLES: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; color: #1f2933; background: #f5f7fa; }
header { background: #243b53; color: #fff; padding: 0.75rem 1.5rem; display: flex; flex-wrap: wrap; gap: 1rem; align-items: center; }
header a { color: #d9e2ec; text-decoration: none; font-size: 0.9rem; }
header .brand { font-weight: 600; color: #fff; margin-right: 1rem; }
header .session { margin-left: auto; font-size: 0.85rem; }
main { max-width: 1080px; margin: 1.5rem auto; padding: 0 1.5rem; }
.flashes { list-style: none; padding: 0; }
.flashes li { background: #fffbea; border: 1px solid #f0b429; padding: 0.5rem 0.75rem; border-radius: 4px; margin-bottom: 0.5rem; }
table { border-collapse: collapse; width: 100%; background: #fff; margin-bottom: 1.5rem; }
th, td { border: 1px solid #d9e2ec; padding: 0.4rem 0.6rem; text-align: left; font-size: 0.9rem; }
th { background: #e4e7eb; }
dl { display: grid; grid-template-columns: max-content auto; gap: 0.3rem 1rem; background: #fff; padding: 1rem; }
dt { font-weight: 600; }
form.card { background: #fff; padding: 1rem; max-width: 560px; margin-bottom: 1.5rem; }
form.card label { display: block; margin: 0.6rem 0 0.2rem; font-size: 0.85rem; }
form.card input, form.card textarea, form.card select { width: 100%; padding: 0.4rem; box-sizing: border-box; }
button { margin-top: 0.8rem; padding: 0.45rem 1rem; background: #334e68; color: #fff; border: none; border-radius: 4px; cursor: pointer; }
form.inline { display: inline; }
form.inline button { margin: 0; padding: 0.2rem 0.6rem; font-size: 0.8rem; }
.empty { color: #829ab1; font-style: italic; }
"#;

/// Simple HTML escaping to prevent XSS.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn page(context: &PageContext, title: &str, content: &str) -> String {
    let mut html = String::with_capacity(content.len() + 4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str("    <title>");
    html.push_str(&html_escape(title));
    html.push_str(" - Reclutamiento</title>\n    <style>");
    html.push_str(STYLES);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str(&navigation(context));
    html.push_str("<main>\n");

    if !context.flashes.is_empty() {
        html.push_str("<ul class=\"flashes\">\n");
        for message in &context.flashes {
            html.push_str("<li>");
            html.push_str(&html_escape(message));
            html.push_str("</li>\n");
        }
        html.push_str("</ul>\n");
    }

    html.push_str("<h1>");
    html.push_str(&html_escape(title));
    html.push_str("</h1>\n");
    html.push_str(content);
    html.push_str("\n</main>\n</body>\n</html>");
    html
}

fn navigation(context: &PageContext) -> String {
    let mut nav = String::from("<header>\n<a class=\"brand\" href=\"/\">Reclutamiento</a>\n");
    for (href, label) in [
        ("/dashboard", "Dashboard"),
        ("/vacante/crear", "Nueva vacante"),
        ("/reportes", "Reportes"),
        ("/auditoria", "Auditoría"),
        ("/config/departamentos", "Departamentos"),
        ("/config/usuarios", "Usuarios"),
    ] {
        nav.push_str(&format!("<a href=\"{href}\">{label}</a>\n"));
    }

    nav.push_str("<span class=\"session\">");
    match &context.username {
        Some(username) => {
            nav.push_str(&html_escape(username));
            if let Some(role) = context.role {
                nav.push_str(&format!(" ({})", role.label()));
            }
            nav.push_str(" · <a href=\"/logout\">Cerrar sesión</a>");
        }
        None => {
            nav.push_str("<a href=\"/login\">Iniciar sesión</a> · <a href=\"/register\">Registrarse</a>");
        }
    }
    nav.push_str("</span>\n</header>\n");
    nav
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Table over every field of the records; `link` adds a trailing action column.
fn record_table(records: &[Record], link: Option<&dyn Fn(&Record) -> Option<String>>) -> String {
    let Some(first) = records.first() else {
        return "<p class=\"empty\">Sin resultados.</p>\n".to_string();
    };

    let mut html = String::from("<table>\n<thead><tr>");
    for column in first.keys() {
        html.push_str("<th>");
        html.push_str(&html_escape(column));
        html.push_str("</th>");
    }
    if link.is_some() {
        html.push_str("<th></th>");
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for record in records {
        html.push_str("<tr>");
        for column in first.keys() {
            html.push_str("<td>");
            html.push_str(&html_escape(&record.get(column).map(display_value).unwrap_or_default()));
            html.push_str("</td>");
        }
        if let Some(link) = link {
            html.push_str("<td>");
            if let Some(markup) = link(record) {
                html.push_str(&markup);
            }
            html.push_str("</td>");
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    html
}

fn record_details(record: &Record) -> String {
    let mut html = String::from("<dl>\n");
    for (field, value) in record {
        html.push_str("<dt>");
        html.push_str(&html_escape(field));
        html.push_str("</dt><dd>");
        html.push_str(&html_escape(&display_value(value)));
        html.push_str("</dd>\n");
    }
    html.push_str("</dl>\n");
    html
}

fn anchor(href: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", html_escape(href), html_escape(label))
}

fn text_input(label: &str, name: &str, value: &str, kind: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n<input type=\"{kind}\" id=\"{name}\" name=\"{name}\" value=\"{}\">\n",
        html_escape(value)
    )
}

fn text_area(label: &str, name: &str, value: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n<textarea id=\"{name}\" name=\"{name}\" rows=\"4\">{}</textarea>\n",
        html_escape(value)
    )
}

pub fn index(context: &PageContext, vacancies: &[Record]) -> String {
    let link = |record: &Record| {
        field_i64(record, "id").map(|id| {
            format!(
                "{} · {}",
                anchor(&format!("/vacante/{id}"), "Ver"),
                anchor(&format!("/ranking/{id}"), "Ranking")
            )
        })
    };
    page(context, "Vacantes", &record_table(vacancies, Some(&link)))
}

pub fn ranking(context: &PageContext, vacancy: &Record, rows: &[Record]) -> String {
    let title = field_text(vacancy, "titulo");
    let title = if title.is_empty() { "Vacante".to_string() } else { title };

    let link = |record: &Record| {
        field_i64(record, "postulante_id").map(|id| anchor(&format!("/postulante/{id}"), "Perfil"))
    };
    page(
        context,
        &format!("Ranking · {title}"),
        &record_table(rows, Some(&link)),
    )
}

pub fn dashboard(context: &PageContext, dashboard: &Dashboard) -> String {
    let mut content = String::new();
    let title = match dashboard {
        Dashboard::Admin { stats, recent } => {
            content.push_str("<h2>Resumen general</h2>\n");
            content.push_str(&record_details(stats));
            content.push_str("<h2>Postulaciones recientes</h2>\n");
            content.push_str(&record_table(recent, None));
            "Panel de administración"
        }
        Dashboard::Recruiter { vacancies, top } => {
            content.push_str("<h2>Vacantes</h2>\n");
            let link = |record: &Record| {
                field_i64(record, "id").map(|id| anchor(&format!("/ranking/{id}"), "Ranking"))
            };
            content.push_str(&record_table(vacancies, Some(&link)));
            content.push_str("<h2>Mejores candidatos</h2>\n");
            content.push_str(&record_table(top, None));
            "Panel de reclutamiento"
        }
        Dashboard::Candidate { vacancies } => {
            content.push_str("<h2>Vacantes abiertas</h2>\n");
            let link = |record: &Record| {
                field_i64(record, "id").map(|id| anchor(&format!("/vacante/{id}"), "Postular"))
            };
            content.push_str(&record_table(vacancies, Some(&link)));
            "Mi panel"
        }
        Dashboard::Auditor { logs } => {
            content.push_str(&record_table(logs, None));
            "Panel de auditoría"
        }
    };
    page(context, title, &content)
}

pub fn vacancy_detail(context: &PageContext, vacancy_id: i64, vacancy: &Record) -> String {
    let mut content = record_details(vacancy);
    content.push_str("<p>");
    content.push_str(&anchor(&format!("/ranking/{vacancy_id}"), "Ver ranking"));
    content.push_str(" · ");
    content.push_str(&anchor(&format!("/vacante/editar/{vacancy_id}"), "Editar"));
    content.push_str("</p>\n");

    content.push_str("<form class=\"card\" method=\"post\" action=\"/postular_ui\">\n<h2>Postular</h2>\n");
    content.push_str(&format!(
        "<input type=\"hidden\" name=\"vacante_id\" value=\"{vacancy_id}\">\n"
    ));
    content.push_str(&text_input("ID de postulante", "postulante_id", "", "number"));
    content.push_str("<button type=\"submit\">Enviar postulación</button>\n</form>\n");

    content.push_str(&format!(
        "<button type=\"button\" onclick=\"fetch('/vacante/cerrar', {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: JSON.stringify({{vacante_id: {vacancy_id}}})}}).then(function () {{ window.location.reload(); }})\">Cerrar vacante</button>\n"
    ));

    let title = field_text(vacancy, "titulo");
    page(
        context,
        if title.is_empty() { "Vacante" } else { title.as_str() },
        &content,
    )
}

pub fn candidate_profile(
    context: &PageContext,
    candidate_id: i64,
    candidate: &Record,
    applications: &[Record],
) -> String {
    let mut content = record_details(candidate);
    content.push_str("<p>");
    content.push_str(&anchor(&format!("/postulante/editar/{candidate_id}"), "Editar perfil"));
    content.push_str("</p>\n<h2>Postulaciones</h2>\n");

    let actions = |record: &Record| {
        field_i64(record, "postulacion_id").map(|id| {
            format!(
                "{} <form class=\"inline\" method=\"post\" action=\"/postulacion/{id}/recalcular\"><button type=\"submit\">Recalcular</button></form>",
                anchor(&format!("/postulacion/{id}/timeline"), "Historial")
            )
        })
    };
    content.push_str(&record_table(applications, Some(&actions)));

    let name = field_text(candidate, "nombre");
    page(
        context,
        if name.is_empty() { "Postulante" } else { name.as_str() },
        &content,
    )
}

pub fn candidate_form(context: &PageContext, candidate_id: i64, candidate: &Record) -> String {
    let mut content = format!(
        "<form class=\"card\" method=\"post\" action=\"/postulante/editar/{candidate_id}\" enctype=\"multipart/form-data\">\n"
    );
    content.push_str(&text_input("Nombre", "nombre", &field_text(candidate, "nombre"), "text"));
    content.push_str(&text_input("Email", "email", &field_text(candidate, "email"), "email"));
    content.push_str(&text_input(
        "Años de experiencia",
        "anos_experiencia",
        &field_text(candidate, "anos_experiencia"),
        "number",
    ));
    content.push_str(&text_area(
        "Habilidades (JSON)",
        "habilidades",
        &field_text(candidate, "habilidades"),
    ));
    content.push_str("<label for=\"cv\">CV (pdf, doc, docx)</label>\n");
    content.push_str("<input type=\"file\" id=\"cv\" name=\"cv\" accept=\".pdf,.doc,.docx\">\n");
    content.push_str("<button type=\"submit\">Guardar</button>\n</form>\n");
    page(context, "Editar postulante", &content)
}

/// Create form when `vacancy` is `None`, edit form otherwise.
pub fn vacancy_form(
    context: &PageContext,
    departments: &[Record],
    vacancy: Option<(i64, &Record)>,
) -> String {
    let empty = Record::new();
    let (action, title, current) = match vacancy {
        Some((id, record)) => (format!("/vacante/editar/{id}"), "Editar vacante", record),
        None => ("/vacante/crear".to_string(), "Nueva vacante", &empty),
    };

    let mut content = format!("<form class=\"card\" method=\"post\" action=\"{action}\">\n");
    content.push_str(&text_input("Título", "titulo", &field_text(current, "titulo"), "text"));
    content.push_str(&text_area("Descripción", "descripcion", &field_text(current, "descripcion")));

    content.push_str("<label for=\"departamento_id\">Departamento</label>\n");
    content.push_str("<select id=\"departamento_id\" name=\"departamento_id\">\n");
    content.push_str("<option value=\"\">Seleccione…</option>\n");
    let selected_department = field_i64(current, "departamento_id");
    for department in departments {
        let Some(id) = field_i64(department, "id") else {
            continue;
        };
        let selected = if selected_department == Some(id) { " selected" } else { "" };
        content.push_str(&format!(
            "<option value=\"{id}\"{selected}>{}</option>\n",
            html_escape(&field_text(department, "nombre"))
        ));
    }
    content.push_str("</select>\n");

    content.push_str(&text_area(
        "Requerimientos (JSON)",
        "requerimientos",
        &field_text(current, "requerimientos"),
    ));

    if vacancy.is_some() {
        let state = field_text(current, "estado");
        content.push_str("<label for=\"estado\">Estado</label>\n<select id=\"estado\" name=\"estado\">\n");
        for option in ["abierta", "pausada", "cerrada"] {
            let selected = if state == option { " selected" } else { "" };
            content.push_str(&format!("<option value=\"{option}\"{selected}>{option}</option>\n"));
        }
        content.push_str("</select>\n");
    }

    content.push_str("<button type=\"submit\">Guardar</button>\n</form>\n");
    page(context, title, &content)
}

pub fn application_timeline(context: &PageContext, application_id: i64, rows: &[Record]) -> String {
    page(
        context,
        &format!("Historial de la postulación {application_id}"),
        &record_table(rows, None),
    )
}

pub fn reports(context: &PageContext) -> String {
    let content = r#"<h2>Vacantes por mes</h2>
<div id="vacantes-mes" class="empty">Cargando…</div>
<h2>Postulantes por vacante</h2>
<div id="postulantes-vacante" class="empty">Cargando…</div>
<script>
function renderRows(target, rows) {
  var node = document.getElementById(target);
  if (!Array.isArray(rows) || rows.length === 0) { node.textContent = 'Sin resultados.'; return; }
  var table = document.createElement('table');
  var columns = Object.keys(rows[0]);
  var head = table.createTHead().insertRow();
  columns.forEach(function (column) { var th = document.createElement('th'); th.textContent = column; head.appendChild(th); });
  var body = table.createTBody();
  rows.forEach(function (row) {
    var tr = body.insertRow();
    columns.forEach(function (column) { tr.insertCell().textContent = row[column] === null ? '' : row[column]; });
  });
  node.className = '';
  node.replaceChildren(table);
}
function load(url, target) {
  fetch(url).then(function (response) { return response.json(); })
    .then(function (rows) { renderRows(target, rows); })
    .catch(function (error) { document.getElementById(target).textContent = String(error); });
}
load('/api/report/vacantes_mes', 'vacantes-mes');
load('/api/report/postulantes_vacante', 'postulantes-vacante');
</script>
"#;
    page(context, "Reportes", content)
}

pub fn audit_log(context: &PageContext, query: &AuditQuery, logs: &[Record]) -> String {
    let value = |raw: &Option<String>| raw.clone().unwrap_or_default();
    let mut content = String::from("<form class=\"card\" method=\"get\" action=\"/auditoria\">\n");
    content.push_str(&text_input("Usuario", "user", &value(&query.user), "text"));
    content.push_str(&text_input("Acción", "accion", &value(&query.accion), "text"));
    content.push_str(&text_input("Desde", "from", &value(&query.from), "date"));
    content.push_str(&text_input("Hasta", "to", &value(&query.to), "date"));
    content.push_str("<button type=\"submit\">Filtrar</button>\n</form>\n");

    let export_query = [
        ("user", &query.user),
        ("accion", &query.accion),
        ("from", &query.from),
        ("to", &query.to),
    ]
    .iter()
    .filter_map(|(key, value)| {
        value
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(|value| format!("{key}={}", urlencoding::encode(value)))
    })
    .collect::<Vec<_>>()
    .join("&");
    content.push_str("<p>");
    content.push_str(&anchor(&format!("/auditoria/export?{export_query}"), "Exportar CSV"));
    content.push_str("</p>\n");

    content.push_str(&record_table(logs, None));
    page(context, "Auditoría", &content)
}

pub fn department_catalog(context: &PageContext, departments: &[Record]) -> String {
    let mut content = String::from("<p>");
    content.push_str(&anchor("/config/departamentos/crear", "Nuevo departamento"));
    content.push_str("</p>\n");
    content.push_str(&record_table(departments, None));
    page(context, "Departamentos", &content)
}

pub fn department_form(context: &PageContext) -> String {
    let mut content =
        String::from("<form class=\"card\" method=\"post\" action=\"/config/departamentos/crear\">\n");
    content.push_str(&text_input("Nombre", "nombre", "", "text"));
    content.push_str(&text_area("Descripción", "descripcion", ""));
    content.push_str("<button type=\"submit\">Crear</button>\n</form>\n");
    page(context, "Nuevo departamento", &content)
}

pub fn users(context: &PageContext, users: &[Record]) -> String {
    page(context, "Usuarios", &record_table(users, None))
}

pub fn login_form(context: &PageContext) -> String {
    let mut content = String::from("<form class=\"card\" method=\"post\" action=\"/login\">\n");
    content.push_str(&text_input("Usuario", "username", "", "text"));
    content.push_str(&text_input("Contraseña", "password", "", "password"));
    content.push_str("<button type=\"submit\">Entrar</button>\n</form>\n<p>");
    content.push_str(&anchor("/reset_request", "¿Olvidó su contraseña?"));
    content.push_str("</p>\n");
    page(context, "Iniciar sesión", &content)
}

pub fn register_form(context: &PageContext) -> String {
    let mut content = String::from("<form class=\"card\" method=\"post\" action=\"/register\">\n");
    content.push_str(&text_input("Nombre", "nombre", "", "text"));
    content.push_str(&text_input("Email", "email", "", "email"));
    content.push_str(&text_input("Usuario", "username", "", "text"));
    content.push_str(&text_input("Contraseña", "password", "", "password"));
    content.push_str("<button type=\"submit\">Crear cuenta</button>\n</form>\n");
    page(context, "Registro", &content)
}

pub fn reset_request_form(context: &PageContext) -> String {
    let mut content =
        String::from("<form class=\"card\" method=\"post\" action=\"/reset_request\">\n");
    content.push_str(&text_input("Usuario", "username", "", "text"));
    content.push_str("<button type=\"submit\">Enviar enlace</button>\n</form>\n");
    page(context, "Restablecer contraseña", &content)
}

pub fn reset_password_form(context: &PageContext, token: &str) -> String {
    let mut content = format!(
        "<form class=\"card\" method=\"post\" action=\"/reset/{}\">\n",
        html_escape(&urlencoding::encode(token))
    );
    content.push_str(&text_input("Nueva contraseña", "password", "", "password"));
    content.push_str("<button type=\"submit\">Cambiar contraseña</button>\n</form>\n");
    page(context, "Nueva contraseña", &content)
}
