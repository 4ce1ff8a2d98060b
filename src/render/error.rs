use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to draw {figure}")]
    Draw {
        figure: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read map overlay '{0}'")]
    OverlayRead(std::path::PathBuf, #[source] std::io::Error),

    #[error("Failed to parse map overlay '{0}'")]
    OverlayParse(std::path::PathBuf, #[source] serde_json::Error),
}
