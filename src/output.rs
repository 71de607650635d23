use serde::Serialize;
use steamcheck_core::AppError;

use crate::cli::OutputFormat;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    SteamStore,
    SteamWebapi,
    Internal,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub returned: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub version: &'static str,
    pub source: DataSource,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub pagination: Option<Pagination>,
    pub meta: Meta,
    pub error: Option<ErrorBody>,
}

/// A full page suggests more may follow.
pub fn build_pagination(page: usize, page_size: usize, returned: usize) -> Pagination {
    Pagination {
        page,
        page_size,
        returned,
        has_more: returned > 0 && returned >= page_size,
    }
}

pub fn print_success<T: Serialize>(
    format: OutputFormat,
    data: T,
    pagination: Option<Pagination>,
    source: DataSource,
    human: impl FnOnce(&T),
) {
    match format {
        OutputFormat::Human => human(&data),
        OutputFormat::Json => {
            let envelope = Envelope {
                ok: true,
                data: Some(data),
                pagination,
                meta: meta(source),
                error: None,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }
}

pub fn print_error(format: OutputFormat, error: AppError) {
    match format {
        OutputFormat::Human => {
            eprintln!("Error [{}]: {}", error.code(), error);
        }
        OutputFormat::Json => {
            let envelope: Envelope<serde_json::Value> = Envelope {
                ok: false,
                data: None,
                pagination: None,
                meta: meta(DataSource::Internal),
                error: Some(ErrorBody {
                    code: error.code(),
                    message: error.to_string(),
                }),
            };
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }
}

fn meta(source: DataSource) -> Meta {
    Meta {
        version: env!("CARGO_PKG_VERSION"),
        source,
    }
}
