// dashboardtool/src/publish/mod.rs
mod logic;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::Result;
use crate::gateway::object_store::ObjectStore;
use crate::operation::{Operation, OperationContext};

/// Where the publish result is persisted in the object store.
#[derive(Clone)]
pub struct ResultUpload {
    pub store: Arc<dyn ObjectStore>,
    pub bucket: String,
    pub key: String,
}

/// Builds a dashboard from a template whose datasets already live in the
/// target namespace, and opens it up to the default namespace and a group.
pub struct PublishDashboardOperation {
    context: OperationContext,
    template_id: String,
    target_namespace: String,
    group_name: String,
    output_json: Option<PathBuf>,
    upload: Option<ResultUpload>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublishResult {
    pub status: String,
    /// Template id mapped to the ARNs of the dashboards built from it.
    pub dashboard_info: BTreeMap<String, Vec<String>>,
}

impl PublishDashboardOperation {
    pub fn new(
        context: OperationContext,
        template_id: impl Into<String>,
        target_namespace: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Self {
        Self {
            context,
            template_id: template_id.into(),
            target_namespace: target_namespace.into(),
            group_name: group_name.into(),
            output_json: None,
            upload: None,
        }
    }

    pub fn with_output_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_json = Some(path.into());
        self
    }

    pub fn with_upload(mut self, upload: ResultUpload) -> Self {
        self.upload = Some(upload);
        self
    }

    /// Same settings, aimed at another template.
    pub(crate) fn for_template(&self, template_id: impl Into<String>) -> Self {
        Self {
            context: self.context.clone(),
            template_id: template_id.into(),
            target_namespace: self.target_namespace.clone(),
            group_name: self.group_name.clone(),
            output_json: self.output_json.clone(),
            upload: self.upload.clone(),
        }
    }
}

#[async_trait]
impl Operation for PublishDashboardOperation {
    type Output = PublishResult;

    fn name(&self) -> &'static str {
        "publish-dashboard"
    }

    async fn execute(&self) -> Result<PublishResult> {
        logic::perform_publish(self).await
    }
}
