// dashboardtool/src/import/logic.rs
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;

use super::schedules::{apply_refresh_configuration, remove_refresh_configuration};
use super::{DataSetInfo, ImportResult, ImportTemplateOperation, TemplateInfo};
use crate::errors::{AppError, Result};
use crate::gateway::ApiCall;
use crate::operation::{
    DATA_SET_CREATED, OperationContext, STATUS_SUCCESS, TEMPLATE_ACCEPTED, resolve_data_set_id,
};
use crate::utils::layout::read_json;
use crate::utils::rewrite::rebind_data_source;

/// Fields the service computes itself and refuses on create.
const FORBIDDEN_DATA_SET_FIELDS: [&str; 2] = ["OutputColumns", "ConsumedSpiceCapacityInBytes"];

pub(super) async fn perform_import(op: &ImportTemplateOperation, now: DateTime<Utc>) -> Result<ImportResult> {
    let context = &op.context;
    let namespace = op.target_namespace.as_str();

    let template_path = op.layout.template_file(&op.template_name);
    let template = read_json(&template_path)?;
    let placeholders = template_placeholders(&template, &template_path)?;

    let template_name = format!("{}-{}", namespace, op.template_name);
    let template = recreate_template(context, &template_path, template, &template_name).await?;

    let mut data_sets = Vec::with_capacity(placeholders.len());
    for placeholder in &placeholders {
        let data_set_path = op.layout.data_set_file(placeholder);
        let data_set_id = resolve_data_set_id(namespace, placeholder);
        let data_set = prepare_data_set(
            &read_json(&data_set_path)?,
            &data_set_path,
            &data_set_id,
            &op.data_source_arn,
        )?;

        // stale schedules must not outlive the dataset they were attached to
        remove_refresh_configuration(context, &data_set_id).await?;
        data_sets.push(recreate_data_set(context, &data_set_id, data_set).await?);
        apply_refresh_configuration(context, &op.layout, placeholder, &data_set_id, now).await?;
    }

    Ok(ImportResult {
        status: STATUS_SUCCESS.to_string(),
        template,
        data_sets,
    })
}

/// Placeholders declared by `Definition.DataSetConfigurations`, in order.
fn template_placeholders(template: &Value, path: &Path) -> Result<Vec<String>> {
    let configurations = template
        .pointer("/Definition/DataSetConfigurations")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::MalformedDocument {
            path: path.to_path_buf(),
            reason: "Definition.DataSetConfigurations missing".to_string(),
        })?;

    configurations
        .iter()
        .map(|c| {
            c.get("Placeholder")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AppError::MalformedDocument {
                    path: path.to_path_buf(),
                    reason: "DataSetConfigurations entry without Placeholder".to_string(),
                })
        })
        .collect()
}

async fn recreate_template(
    context: &OperationContext,
    path: &Path,
    template: Value,
    template_name: &str,
) -> Result<TemplateInfo> {
    let Value::Object(mut body) = template else {
        return Err(AppError::MalformedDocument {
            path: path.to_path_buf(),
            reason: "template document is not an object".to_string(),
        });
    };
    // the identifier travels in the request path
    body.remove("TemplateId");
    body.remove("AwsAccountId");
    body.insert("Name".to_string(), Value::String(template_name.to_string()));

    let response = context
        .replace_resource(
            &format!("template {}", template_name),
            ApiCall::DeleteTemplate {
                template_id: template_name.to_string(),
            },
            ApiCall::CreateTemplate {
                template_id: template_name.to_string(),
                body: Value::Object(body),
            },
            TEMPLATE_ACCEPTED,
        )
        .await?;

    Ok(TemplateInfo {
        id: response.str_at("/TemplateId")?,
        arn: response.str_at("/Arn")?,
        version_arn: response.str_at("/VersionArn")?,
    })
}

/// Turns an exported dataset document into a create request for the target
/// environment.
pub(super) fn prepare_data_set(
    exported: &Value,
    path: &Path,
    data_set_id: &str,
    data_source_arn: &str,
) -> Result<Value> {
    let mut data_set = rebind_data_source(exported, data_source_arn);
    let fields = data_set
        .as_object_mut()
        .ok_or_else(|| AppError::MalformedDocument {
            path: path.to_path_buf(),
            reason: "data set document is not an object".to_string(),
        })?;
    for field in FORBIDDEN_DATA_SET_FIELDS {
        fields.remove(field);
    }
    fields.insert("DataSetId".to_string(), Value::String(data_set_id.to_string()));
    Ok(data_set)
}

async fn recreate_data_set(context: &OperationContext, data_set_id: &str, data_set: Value) -> Result<DataSetInfo> {
    let response = context
        .replace_resource(
            &format!("data set {}", data_set_id),
            ApiCall::DeleteDataSet {
                data_set_id: data_set_id.to_string(),
            },
            ApiCall::CreateDataSet { body: data_set },
            DATA_SET_CREATED,
        )
        .await?;

    Ok(DataSetInfo {
        id: response.str_at("/DataSetId")?,
        arn: response.str_at("/Arn")?,
    })
}
