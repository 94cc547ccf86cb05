use crate::cli::{RankingArgs, ReportCommand};
use crate::infra::recruitment_service;
use recruiting::config::AppConfig;
use recruiting::error::AppError;
use recruiting::procedures::Record;

pub(crate) async fn run_report(command: ReportCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = recruitment_service(&config);

    let rows = match command {
        ReportCommand::VacanciesByMonth => service.vacancies_by_month().await?,
        ReportCommand::ApplicantsByVacancy => service.applicants_by_vacancy().await?,
    };
    print_rows(&rows)
}

pub(crate) async fn run_ranking(args: RankingArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = recruitment_service(&config);

    let rows = service.ranking(args.vacancy_id).await?;
    print_rows(&rows)
}

fn print_rows(rows: &[Record]) -> Result<(), AppError> {
    println!("{}", render_rows(rows)?);
    Ok(())
}

fn render_rows(rows: &[Record]) -> Result<String, AppError> {
    serde_json::to_string_pretty(rows)
        .map_err(std::io::Error::from)
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_render_as_a_pretty_json_array_in_column_order() {
        let row = match json!({"vacante": "QA", "postulantes": 4}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };

        let rendered = render_rows(&[row]).expect("renders");

        assert_eq!(
            rendered,
            "[\n  {\n    \"vacante\": \"QA\",\n    \"postulantes\": 4\n  }\n]"
        );
        assert_eq!(render_rows(&[]).expect("renders"), "[]");
    }
}
