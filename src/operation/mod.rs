// dashboardtool/src/operation/mod.rs
//! Shared plumbing for the export/import/publish workflows.

pub(crate) mod composite;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Timing;
use crate::errors::{AppError, Result};
use crate::gateway::{ApiCall, ApiResponse, GatewayError, QuickSightGateway};

pub const STATUS_SUCCESS: &str = "success";

/// Statuses accepted from `create_template`.
pub const TEMPLATE_ACCEPTED: &[u16] = &[202];
/// Statuses accepted from `create_data_set`.
pub const DATA_SET_CREATED: &[u16] = &[200, 201];
/// Statuses accepted from `create_dashboard` and `update_dashboard_permissions`.
pub const DASHBOARD_ACCEPTED: &[u16] = &[200, 202];

/// A single workflow run. Implementors sequence their remote calls inside
/// `execute` and hand back a serializable summary of what they produced.
#[async_trait]
pub trait Operation: Send + Sync {
    type Output: Serialize + Send;

    fn name(&self) -> &'static str;

    async fn execute(&self) -> Result<Self::Output>;
}

/// Client handle plus account and timing, shared by every workflow.
#[derive(Clone)]
pub struct OperationContext {
    gateway: Arc<dyn QuickSightGateway>,
    account_id: String,
    timing: Timing,
}

impl OperationContext {
    pub fn new(gateway: Arc<dyn QuickSightGateway>, account_id: impl Into<String>, timing: Timing) -> Self {
        Self {
            gateway,
            account_id: account_id.into(),
            timing,
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Issues `call` without interpreting the failure signal.
    pub async fn call_raw(&self, call: ApiCall) -> std::result::Result<ApiResponse, GatewayError> {
        self.gateway.call(&self.account_id, call).await
    }

    pub async fn call(&self, call: ApiCall) -> Result<ApiResponse> {
        let name = call.name();
        self.call_raw(call)
            .await
            .map_err(|e| AppError::from_gateway(name, e))
    }

    pub async fn call_expecting(&self, call: ApiCall, accepted: &[u16]) -> Result<ApiResponse> {
        self.call(call).await?.ensure_status(accepted)
    }

    /// Waits for the backend to finish processing a previous mutation.
    pub async fn settle(&self) {
        tokio::time::sleep(self.timing.settle_delay).await;
    }

    /// Runs a delete, treating a missing target as success. Returns whether
    /// anything was actually deleted.
    pub async fn delete_if_exists(&self, call: ApiCall) -> Result<bool> {
        let name = call.name();
        match self.call_raw(call).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(AppError::from_gateway(name, e)),
        }
    }

    /// Delete-then-recreate, the substitute for an upsert: delete the existing
    /// resource if there is one, let the deletion settle, then create afresh.
    pub async fn replace_resource(
        &self,
        resource: &str,
        delete: ApiCall,
        create: ApiCall,
        accepted: &[u16],
    ) -> Result<ApiResponse> {
        tracing::info!("Ready to delete {} if exists.", resource);
        if self.delete_if_exists(delete).await? {
            // deletion completes asynchronously on the backend
            self.settle().await;
            tracing::info!("Deletion complete for {}.", resource);
        } else {
            tracing::info!("No deletion necessary: {} does not exist.", resource);
        }

        let response = self.call_expecting(create, accepted).await?;
        tracing::info!(
            "{} created successfully: http_status = {}",
            resource,
            response.status
        );
        Ok(response)
    }

    pub async fn describe_data_set(&self, data_set_id: &str) -> Result<Value> {
        let response = self
            .call(ApiCall::DescribeDataSet {
                data_set_id: data_set_id.to_string(),
            })
            .await?;
        response.pointer("/DataSet").cloned()
    }
}

/// Identifier of a recreated dataset inside a target namespace.
pub fn resolve_data_set_id(namespace: &str, placeholder: &str) -> String {
    format!("{}-{}", namespace, placeholder)
}
