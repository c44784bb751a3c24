use crate::engine::context::ExecutionContext;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::integrations::FileStore;
use crate::models::{FileOutput, NodeOutput};
use crate::node::registry::{Component, ComponentSpec, ParameterKind, ParameterSpec, SocketSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Renders configured content (templates resolved against upstream outputs)
/// and uploads it to the external file store. The MIME type is guessed from
/// the target file name unless set explicitly.
pub struct FileWriteComponent {
    store: Arc<dyn FileStore>,
}

impl FileWriteComponent {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    fn render_content(context: &ExecutionContext) -> Result<String, EngineError> {
        let content = context.config.get("content").ok_or_else(|| {
            EngineError::Component(format!(
                "node {}: missing required config field 'content'",
                context.node_id
            ))
        })?;

        Ok(match context.interpolate_value(content) {
            Value::String(s) => s,
            other => serde_json::to_string_pretty(&other)
                .map_err(EngineError::component)?,
        })
    }
}

#[async_trait]
impl Component for FileWriteComponent {
    fn spec(&self) -> ComponentSpec {
        ComponentSpec {
            type_name: "file_write".to_string(),
            label: "File Write".to_string(),
            description: "Uploads rendered content to the file store".to_string(),
            parameters: vec![
                ParameterSpec::required("name", ParameterKind::String),
                ParameterSpec::required("content", ParameterKind::Json),
                ParameterSpec::optional("mime_type", ParameterKind::String, None),
                ParameterSpec::optional("folder", ParameterKind::String, None),
            ],
            inputs: vec![SocketSpec::new("content", "Templated content")],
            outputs: vec![SocketSpec::new("file", "Uploaded file descriptor")],
        }
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<ExecutionResult, EngineError> {
        let name = context.require_config_str("name")?.to_string();
        let folder = context.config_str("folder").map(|s| s.to_string());
        let content = Self::render_content(context)?;

        let mime_type = context
            .config_str("mime_type")
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                mime_guess::from_path(&name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

        let bytes = content.as_bytes();
        debug!(name = %name, mime_type = %mime_type, size = bytes.len(), "Uploading file");

        match self
            .store
            .upload(&name, bytes, &mime_type, folder.as_deref())
            .await
        {
            Ok(descriptor) => Ok(ExecutionResult::success(NodeOutput::File(FileOutput {
                file_id: descriptor.id,
                name: descriptor.name,
                mime_type,
                size_bytes: bytes.len(),
                url: descriptor.url,
            }))
            .with_log(format!("uploaded {name} ({} bytes)", bytes.len()))),
            Err(err) => Ok(ExecutionResult::failure(format!(
                "upload of {name} failed: {err}"
            ))),
        }
    }
}
