// dashboardtool/src/gateway/mod.rs
pub(crate) mod http;
pub(crate) mod object_store;
#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::errors::{AppError, Result};

/// One request against the BI service. Path-bound identifiers are carried as
/// fields, everything else travels in `body` as an opaque JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    DescribeAnalysis { analysis_id: String },
    DescribeAnalysisDefinition { analysis_id: String },
    CreateTemplate { template_id: String, body: Value },
    DeleteTemplate { template_id: String },
    DescribeTemplate { template_id: String },
    DescribeTemplateDefinition { template_id: String, alias_name: String },
    CreateDataSet { body: Value },
    DeleteDataSet { data_set_id: String },
    DescribeDataSet { data_set_id: String },
    DescribeDataSetRefreshProperties { data_set_id: String },
    PutDataSetRefreshProperties { data_set_id: String, properties: Value },
    DeleteDataSetRefreshProperties { data_set_id: String },
    ListRefreshSchedules { data_set_id: String },
    CreateRefreshSchedule { data_set_id: String, schedule: Value },
    DeleteRefreshSchedule { data_set_id: String, schedule_id: String },
    DescribeNamespace { namespace: String },
    DescribeGroup { namespace: String, group_name: String },
    CreateDashboard { dashboard_id: String, body: Value },
    DeleteDashboard { dashboard_id: String },
    UpdateDashboardPermissions { dashboard_id: String, grant_permissions: Value },
}

impl ApiCall {
    pub fn name(&self) -> &'static str {
        match self {
            ApiCall::DescribeAnalysis { .. } => "describe_analysis",
            ApiCall::DescribeAnalysisDefinition { .. } => "describe_analysis_definition",
            ApiCall::CreateTemplate { .. } => "create_template",
            ApiCall::DeleteTemplate { .. } => "delete_template",
            ApiCall::DescribeTemplate { .. } => "describe_template",
            ApiCall::DescribeTemplateDefinition { .. } => "describe_template_definition",
            ApiCall::CreateDataSet { .. } => "create_data_set",
            ApiCall::DeleteDataSet { .. } => "delete_data_set",
            ApiCall::DescribeDataSet { .. } => "describe_data_set",
            ApiCall::DescribeDataSetRefreshProperties { .. } => {
                "describe_data_set_refresh_properties"
            }
            ApiCall::PutDataSetRefreshProperties { .. } => "put_data_set_refresh_properties",
            ApiCall::DeleteDataSetRefreshProperties { .. } => "delete_data_set_refresh_properties",
            ApiCall::ListRefreshSchedules { .. } => "list_refresh_schedules",
            ApiCall::CreateRefreshSchedule { .. } => "create_refresh_schedule",
            ApiCall::DeleteRefreshSchedule { .. } => "delete_refresh_schedule",
            ApiCall::DescribeNamespace { .. } => "describe_namespace",
            ApiCall::DescribeGroup { .. } => "describe_group",
            ApiCall::CreateDashboard { .. } => "create_dashboard",
            ApiCall::DeleteDashboard { .. } => "delete_dashboard",
            ApiCall::UpdateDashboardPermissions { .. } => "update_dashboard_permissions",
        }
    }
}

/// Status code and decoded JSON body of a completed call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub call: &'static str,
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(call: &'static str, status: u16, body: Value) -> Self {
        Self { call, status, body }
    }

    /// Fails with `UnexpectedResponse` unless the status is one of `accepted`.
    pub fn ensure_status(self, accepted: &[u16]) -> Result<Self> {
        if accepted.contains(&self.status) {
            Ok(self)
        } else {
            tracing::error!(
                "Unexpected response from {} request: http_status = {}",
                self.call,
                self.status
            );
            Err(AppError::UnexpectedResponse {
                call: self.call.to_string(),
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    /// Looks up a JSON pointer (e.g. `/Analysis/Arn`) in the body.
    pub fn pointer(&self, pointer: &str) -> Result<&Value> {
        self.body
            .pointer(pointer)
            .ok_or_else(|| AppError::MalformedResponse {
                call: self.call.to_string(),
                field: pointer.to_string(),
            })
    }

    /// Deserializes the value found at `pointer`.
    pub fn parse_at<T: DeserializeOwned>(&self, pointer: &str) -> Result<T> {
        serde_json::from_value(self.pointer(pointer)?.clone()).map_err(|e| {
            AppError::MalformedResponse {
                call: self.call.to_string(),
                field: format!("{} ({})", pointer, e),
            }
        })
    }

    pub fn str_at(&self, pointer: &str) -> Result<String> {
        self.pointer(pointer)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::MalformedResponse {
                call: self.call.to_string(),
                field: pointer.to_string(),
            })
    }
}

/// Typed failure signal from the BI service. Only the first three variants are
/// ever caught selectively.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    #[error("http_status = {status}, {code}: {message}")]
    AlreadyExists {
        status: u16,
        code: String,
        message: String,
    },

    #[error("http_status = {status}, {code}: {message}")]
    InvalidParameter {
        status: u16,
        code: String,
        message: String,
    },

    #[error("http_status = {status}, {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("credentials unavailable: {0}")]
    Credentials(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    /// Missing refresh properties are reported either as not-found or as an
    /// invalid-parameter fault, depending on the dataset.
    pub fn is_absent_refresh_properties(&self) -> bool {
        matches!(
            self,
            GatewayError::NotFound { .. } | GatewayError::InvalidParameter { .. }
        )
    }
}

/// Request/response gateway to the BI service.
#[async_trait]
pub trait QuickSightGateway: Send + Sync {
    async fn call(
        &self,
        account_id: &str,
        call: ApiCall,
    ) -> std::result::Result<ApiResponse, GatewayError>;
}
