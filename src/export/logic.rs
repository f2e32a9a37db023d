// dashboardtool/src/export/logic.rs
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::ExportResult;
use crate::errors::{AppError, Result};
use crate::gateway::{ApiCall, ApiResponse};
use crate::operation::{OperationContext, STATUS_SUCCESS, TEMPLATE_ACCEPTED};
use crate::utils::layout::{AssetLayout, write_json};
use crate::utils::retry::retry;
use crate::utils::rewrite::rebind_data_source;

const TEMPLATE_ID_SUFFIX: &str = "-template";
const LATEST_ALIAS: &str = "$LATEST";
/// Template fields kept on disk; enough to recreate it elsewhere.
const TEMPLATE_FIELDS: [&str; 3] = ["Name", "Definition", "TemplateId"];
/// Environment-specific dataset fields dropped before saving.
const DATA_SET_IDENTITY_FIELDS: [&str; 4] = ["Arn", "DataSetId", "CreatedTime", "LastUpdatedTime"];
const SCHEDULE_IDENTITY_FIELDS: [&str; 3] = ["ScheduleId", "StartAfterDateTime", "Arn"];

/// One `DataSetIdentifierDeclarations` entry of an analysis definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DataSetDeclaration {
    pub identifier: String,
    pub data_set_arn: String,
}

impl DataSetDeclaration {
    fn data_set_id(&self) -> Result<&str> {
        self.data_set_arn
            .split_once("dataset/")
            .map(|(_, id)| id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::MalformedResponse {
                call: "describe_analysis_definition".to_string(),
                field: format!("DataSetArn {}", self.data_set_arn),
            })
    }
}

pub(super) async fn perform_export(
    context: &OperationContext,
    analysis_id: &str,
    layout: &AssetLayout,
) -> Result<ExportResult> {
    layout.ensure_dirs()?;

    let description = context
        .call_expecting(
            ApiCall::DescribeAnalysis {
                analysis_id: analysis_id.to_string(),
            },
            &[200],
        )
        .await?;
    let analysis_name = description.str_at("/Analysis/Name")?;
    let analysis_arn = description.str_at("/Analysis/Arn")?;

    let definition = context
        .call(ApiCall::DescribeAnalysisDefinition {
            analysis_id: analysis_id.to_string(),
        })
        .await?;
    let declarations: Vec<DataSetDeclaration> =
        definition.parse_at("/Definition/DataSetIdentifierDeclarations")?;
    tracing::info!(
        "Analysis {} ({}) declares {} data set(s)",
        analysis_name,
        analysis_id,
        declarations.len()
    );

    let template_id = create_template_from_analysis(context, &analysis_name, &analysis_arn, &declarations).await?;
    let template_definition = await_template_build(context, &template_id).await?;

    tracing::info!("Writing template definition response to disk");
    let mut files_exported = vec![save_template(layout, &template_definition)?];

    for declaration in &declarations {
        let data_set_id = declaration.data_set_id()?;
        let placeholder = declaration.identifier.as_str();

        files_exported.push(save_data_set(context, layout, data_set_id, placeholder).await?);
        if let Some(path) = save_refresh_properties(context, layout, data_set_id, placeholder).await? {
            files_exported.push(path);
        }
        if let Some(path) = save_refresh_schedules(context, layout, data_set_id, placeholder).await? {
            files_exported.push(path);
        }
    }

    Ok(ExportResult {
        status: STATUS_SUCCESS.to_string(),
        files_exported,
    })
}

async fn create_template_from_analysis(
    context: &OperationContext,
    analysis_name: &str,
    analysis_arn: &str,
    declarations: &[DataSetDeclaration],
) -> Result<String> {
    let template_id = format!("{}{}", analysis_name, TEMPLATE_ID_SUFFIX);
    let data_set_references: Vec<Value> = declarations
        .iter()
        .map(|d| json!({ "DataSetPlaceholder": d.identifier, "DataSetArn": d.data_set_arn }))
        .collect();
    let body = json!({
        "Name": analysis_name,
        "SourceEntity": {
            "SourceAnalysis": {
                "Arn": analysis_arn,
                "DataSetReferences": data_set_references,
            }
        }
    });

    context
        .replace_resource(
            &format!("template {}", template_id),
            ApiCall::DeleteTemplate {
                template_id: template_id.clone(),
            },
            ApiCall::CreateTemplate {
                template_id: template_id.clone(),
                body,
            },
            TEMPLATE_ACCEPTED,
        )
        .await?;
    Ok(template_id)
}

/// Polls the template definition until its build reports success and returns
/// the last definition seen.
async fn await_template_build(context: &OperationContext, template_id: &str) -> Result<ApiResponse> {
    let latest: Mutex<Option<ApiResponse>> = Mutex::new(None);
    let latest_ref = &latest;

    retry(context.timing().retry_policy(), move || async move {
        let response = context
            .call(ApiCall::DescribeTemplateDefinition {
                template_id: template_id.to_string(),
                alias_name: LATEST_ALIAS.to_string(),
            })
            .await?;
        let status = response
            .body
            .get("ResourceStatus")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        tracing::debug!("Template {} status: {}", template_id, status);
        *latest_ref.lock().await = Some(response);
        Ok::<bool, AppError>(status.contains("SUCCESSFUL"))
    })
    .await?;

    latest.into_inner().ok_or_else(|| AppError::MalformedResponse {
        call: "describe_template_definition".to_string(),
        field: "/ResourceStatus".to_string(),
    })
}

fn save_template(layout: &AssetLayout, template_definition: &ApiResponse) -> Result<PathBuf> {
    let mut map_to_save = Map::new();
    for field in TEMPLATE_FIELDS {
        map_to_save.insert(field.to_string(), template_definition.pointer(&format!("/{}", field))?.clone());
    }
    let name = template_definition.str_at("/Name")?;
    let path = layout.template_file(&name);
    write_json(&path, &Value::Object(map_to_save))?;
    Ok(path)
}

async fn save_data_set(
    context: &OperationContext,
    layout: &AssetLayout,
    data_set_id: &str,
    logical_name: &str,
) -> Result<PathBuf> {
    let mut data_set = context.describe_data_set(data_set_id).await?;
    if let Some(fields) = data_set.as_object_mut() {
        for field in DATA_SET_IDENTITY_FIELDS {
            fields.remove(field);
        }
        // align the data set name with the placeholder
        fields.insert("Name".to_string(), Value::String(logical_name.to_string()));
    }
    // the target environment supplies its own data source on import
    let data_set = rebind_data_source(&data_set, "");

    let path = layout.data_set_file(logical_name);
    write_json(&path, &data_set)?;
    tracing::info!("Data set {} exported as {}", data_set_id, path.display());
    Ok(path)
}

async fn save_refresh_properties(
    context: &OperationContext,
    layout: &AssetLayout,
    data_set_id: &str,
    logical_name: &str,
) -> Result<Option<PathBuf>> {
    let call = ApiCall::DescribeDataSetRefreshProperties {
        data_set_id: data_set_id.to_string(),
    };
    let name = call.name();
    let response = match context.call_raw(call).await {
        Ok(response) => response,
        Err(e) if e.is_absent_refresh_properties() => {
            tracing::debug!("Data set {} has no refresh properties", data_set_id);
            return Ok(None);
        }
        Err(e) => return Err(AppError::from_gateway(name, e)),
    };

    let path = layout.refresh_properties_file(logical_name);
    write_json(&path, response.pointer("/DataSetRefreshProperties")?)?;
    Ok(Some(path))
}

async fn save_refresh_schedules(
    context: &OperationContext,
    layout: &AssetLayout,
    data_set_id: &str,
    logical_name: &str,
) -> Result<Option<PathBuf>> {
    let call = ApiCall::ListRefreshSchedules {
        data_set_id: data_set_id.to_string(),
    };
    let name = call.name();
    let response = match context.call_raw(call).await {
        Ok(response) => response,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(AppError::from_gateway(name, e)),
    };

    let mut schedules: Vec<Value> = response.parse_at("/RefreshSchedules")?;
    if schedules.is_empty() {
        return Ok(None);
    }
    // remove account specific info
    for schedule in schedules.iter_mut().filter_map(Value::as_object_mut) {
        for field in SCHEDULE_IDENTITY_FIELDS {
            schedule.remove(field);
        }
    }

    let path = layout.refresh_schedules_file(logical_name);
    write_json(&path, &json!({ "RefreshSchedules": schedules }))?;
    Ok(Some(path))
}
