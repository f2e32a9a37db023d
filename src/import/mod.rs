// dashboardtool/src/import/mod.rs
mod logic;
pub(crate) mod schedules;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::errors::Result;
use crate::operation::{Operation, OperationContext};
use crate::utils::layout::AssetLayout;

/// Recreates an exported template and its datasets inside a target namespace,
/// rebinding every dataset to the given data source.
pub struct ImportTemplateOperation {
    context: OperationContext,
    template_name: String,
    target_namespace: String,
    data_source_arn: String,
    layout: AssetLayout,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TemplateInfo {
    pub id: String,
    pub arn: String,
    pub version_arn: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataSetInfo {
    pub id: String,
    pub arn: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportResult {
    pub status: String,
    pub template: TemplateInfo,
    pub data_sets: Vec<DataSetInfo>,
}

impl ImportTemplateOperation {
    pub fn new(
        context: OperationContext,
        template_name: impl Into<String>,
        target_namespace: impl Into<String>,
        data_source_arn: impl Into<String>,
        input_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            context,
            template_name: template_name.into(),
            target_namespace: target_namespace.into(),
            data_source_arn: data_source_arn.into(),
            layout: AssetLayout::new(input_dir),
        }
    }
}

#[async_trait]
impl Operation for ImportTemplateOperation {
    type Output = ImportResult;

    fn name(&self) -> &'static str {
        "import-template"
    }

    async fn execute(&self) -> Result<ImportResult> {
        logic::perform_import(self, chrono::Utc::now()).await
    }
}
