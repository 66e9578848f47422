//! Helpers shared by the `opshub` binary: tracing setup, role checks and
//! terminal rendering of upload rows and fetch progress.

use opshub_api_client::{UploadRow, UploadState};
use opshub_core::validation::format_bytes;
use opshub_core::{Area, Role};
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize tracing for the CLI. Logs go to stderr so command output on
/// stdout stays machine-readable. `OPSHUB_LOG_FORMAT=json` switches to JSON
/// lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("OPSHUB_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(Format::default().compact().with_target(false).without_time())
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Fail with an "unauthorized" message when `role` may not enter `area`.
pub fn require_area(role: Role, area: Area) -> anyhow::Result<()> {
    if role.can_access(area) {
        return Ok(());
    }
    let allowed: Vec<&str> = area.allowed_roles().iter().map(Role::as_str).collect();
    anyhow::bail!(
        "Unauthorized: the {} area requires role {} (you are {})",
        area.name(),
        allowed.join(" or "),
        role
    )
}

/// Fixed-width bar such as `[#####-----]  50%`.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100);
    let filled = width * percent as usize / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        percent
    )
}

/// One line of the upload table.
pub fn upload_row_line(row: &UploadRow) -> String {
    let status = match &row.state {
        UploadState::Completed => "done".to_string(),
        UploadState::Failed(reason) => format!("error: {}", reason),
        UploadState::Unassigned => "error: no upload destination".to_string(),
        UploadState::Pending => "pending".to_string(),
        UploadState::Uploading => "uploading".to_string(),
    };
    format!(
        "{:<32} {:>10} {} {}",
        truncate_string(&row.filename, 32),
        format_bytes(row.size),
        progress_bar(row.progress, 20),
        status
    )
}

/// Fetch progress line for a fractional percentage, e.g. `[Discovery]  42.5%`.
pub fn fetch_progress_line(stage: &str, progress: f64) -> String {
    format!("[{}] {:>5.1}%", stage, progress.clamp(0.0, 100.0))
}
