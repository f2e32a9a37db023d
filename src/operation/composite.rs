// dashboardtool/src/operation/composite.rs
use async_trait::async_trait;
use serde::Serialize;

use super::Operation;
use crate::errors::Result;
use crate::import::{ImportResult, ImportTemplateOperation};
use crate::publish::{PublishDashboardOperation, PublishResult};

/// Imports a template and publishes a dashboard from whatever template id the
/// import produced. The publish settings' own template id is ignored.
pub struct ImportAndPublishOperation {
    import: ImportTemplateOperation,
    publish: PublishDashboardOperation,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportAndPublishResult {
    pub import: ImportResult,
    pub publish: PublishResult,
}

impl ImportAndPublishOperation {
    pub fn new(import: ImportTemplateOperation, publish: PublishDashboardOperation) -> Self {
        Self { import, publish }
    }
}

#[async_trait]
impl Operation for ImportAndPublishOperation {
    type Output = ImportAndPublishResult;

    fn name(&self) -> &'static str {
        "import-and-publish"
    }

    async fn execute(&self) -> Result<ImportAndPublishResult> {
        let import = self.import.execute().await?;
        tracing::info!("Publishing dashboard from imported template {}", import.template.id);
        let publish = self.publish.for_template(&import.template.id).execute().await?;
        Ok(ImportAndPublishResult { import, publish })
    }
}
