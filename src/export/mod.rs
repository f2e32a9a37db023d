// dashboardtool/src/export/mod.rs
mod logic;

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::errors::Result;
use crate::operation::{Operation, OperationContext};
use crate::utils::layout::AssetLayout;

/// Snapshots one analysis as a template plus its datasets into the asset tree.
pub struct ExportAnalysisOperation {
    context: OperationContext,
    analysis_id: String,
    layout: AssetLayout,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportResult {
    pub status: String,
    /// Template file first, then per data set its definition plus, when the
    /// service has them, a refresh-properties and a non-empty refresh-schedules
    /// file. That is one to three files per data set, not at most two: both
    /// refresh documents are fetched independently. Each path is listed once.
    pub files_exported: Vec<PathBuf>,
}

impl ExportAnalysisOperation {
    pub fn new(context: OperationContext, analysis_id: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            context,
            analysis_id: analysis_id.into(),
            layout: AssetLayout::new(output_dir),
        }
    }
}

#[async_trait]
impl Operation for ExportAnalysisOperation {
    type Output = ExportResult;

    fn name(&self) -> &'static str {
        "export-analysis"
    }

    async fn execute(&self) -> Result<ExportResult> {
        logic::perform_export(&self.context, &self.analysis_id, &self.layout).await
    }
}
