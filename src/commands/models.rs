use super::Session;
use crate::backend::ModelInfo;
use crate::ui;
use anyhow::Result;

/// List installed models, marking the default.
pub async fn run(session: &Session) -> Result<()> {
    let models = session.backend()?.list_models().await?;
    let default = session.config.ollama.default_model.as_str();

    if models.is_empty() {
        ui::info(format!(
            "No models installed. Pull one with: ollama pull {}",
            default
        ));
        return Ok(());
    }

    println!("{}", ui::heading("Installed models"));
    for model in &models {
        println!("{}", model_line(model, default));
    }
    if !models.iter().any(|m| m.name == default) {
        ui::warning(format!(
            "Default model '{}' is not installed. Pull it with: ollama pull {}",
            default, default
        ));
    }
    Ok(())
}

fn model_line(model: &ModelInfo, default: &str) -> String {
    let marker = if model.name == default { "*" } else { " " };
    let size = model
        .size
        .map(ui::format_size)
        .unwrap_or_else(|| "?".to_string());
    let modified = model.modified.as_deref().unwrap_or("?");
    format!("{} {} ({}) - {}", marker, model.name, size, modified)
}
