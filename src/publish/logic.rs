// dashboardtool/src/publish/logic.rs
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use super::{PublishDashboardOperation, PublishResult};
use crate::errors::{AppError, Result};
use crate::gateway::ApiCall;
use crate::operation::{DASHBOARD_ACCEPTED, OperationContext, STATUS_SUCCESS, resolve_data_set_id};

const DEFAULT_NAMESPACE: &str = "default";

const READER_ACTIONS: [&str; 3] = [
    "quicksight:DescribeDashboard",
    "quicksight:ListDashboardVersions",
    "quicksight:QueryDashboard",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DataSetConfiguration {
    placeholder: String,
}

pub(super) async fn perform_publish(op: &PublishDashboardOperation) -> Result<PublishResult> {
    let context = &op.context;
    let dashboard_id = op.template_id.as_str();

    let template = context
        .call(ApiCall::DescribeTemplate {
            template_id: op.template_id.clone(),
        })
        .await?;
    let template_arn = template.str_at("/Template/Arn")?;
    let configurations: Vec<DataSetConfiguration> =
        template.parse_at("/Template/Version/DataSetConfigurations")?;

    let namespace_arn = context
        .call(ApiCall::DescribeNamespace {
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
        .await?
        .str_at("/Namespace/Arn")?;

    let mut references = Vec::with_capacity(configurations.len());
    for configuration in &configurations {
        let data_set_id = resolve_data_set_id(&op.target_namespace, &configuration.placeholder);
        let data_set = context.describe_data_set(&data_set_id).await?;
        let data_set_arn = data_set
            .get("Arn")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::MalformedResponse {
                call: "describe_data_set".to_string(),
                field: "/DataSet/Arn".to_string(),
            })?;
        references.push(json!({
            "DataSetPlaceholder": configuration.placeholder,
            "DataSetArn": data_set_arn,
        }));
    }

    let dashboard_arn = recreate_dashboard(context, dashboard_id, &template_arn, references).await?;

    // permissions cannot be granted until the dashboard is registered
    context.settle().await;
    grant_reader_permissions(context, dashboard_id, &namespace_arn, &op.group_name).await?;

    let result = PublishResult {
        status: STATUS_SUCCESS.to_string(),
        dashboard_info: BTreeMap::from([(op.template_id.clone(), vec![dashboard_arn])]),
    };
    persist_result(op, &result).await?;
    Ok(result)
}

async fn recreate_dashboard(
    context: &OperationContext,
    dashboard_id: &str,
    template_arn: &str,
    references: Vec<Value>,
) -> Result<String> {
    let response = context
        .replace_resource(
            &format!("dashboard {}", dashboard_id),
            ApiCall::DeleteDashboard {
                dashboard_id: dashboard_id.to_string(),
            },
            ApiCall::CreateDashboard {
                dashboard_id: dashboard_id.to_string(),
                body: json!({
                    "Name": dashboard_id,
                    "SourceEntity": {
                        "SourceTemplate": {
                            "DataSetReferences": references,
                            "Arn": template_arn,
                        }
                    }
                }),
            },
            DASHBOARD_ACCEPTED,
        )
        .await?;
    response.str_at("/Arn")
}

async fn grant_reader_permissions(
    context: &OperationContext,
    dashboard_id: &str,
    namespace_arn: &str,
    group_name: &str,
) -> Result<()> {
    let group_arn = context
        .call(ApiCall::DescribeGroup {
            namespace: DEFAULT_NAMESPACE.to_string(),
            group_name: group_name.to_string(),
        })
        .await?
        .str_at("/Group/Arn")?;

    let grants: Vec<Value> = [namespace_arn, group_arn.as_str()]
        .into_iter()
        .map(|principal| json!({ "Actions": READER_ACTIONS, "Principal": principal }))
        .collect();

    let response = context
        .call_expecting(
            ApiCall::UpdateDashboardPermissions {
                dashboard_id: dashboard_id.to_string(),
                grant_permissions: Value::Array(grants),
            },
            DASHBOARD_ACCEPTED,
        )
        .await?;
    tracing::info!(
        "Permissions granted on {} to default namespace and group {}: http_status = {}",
        dashboard_id,
        group_name,
        response.status
    );
    Ok(())
}

async fn persist_result(op: &PublishDashboardOperation, result: &PublishResult) -> Result<()> {
    if op.output_json.is_none() && op.upload.is_none() {
        return Ok(());
    }
    let body = serde_json::to_vec(result)?;

    if let Some(path) = &op.output_json {
        std::fs::write(path, &body).map_err(|e| AppError::io(path, e))?;
        tracing::info!("Output written to {}", path.display());
    }
    if let Some(upload) = &op.upload {
        upload.store.put_object(&upload.bucket, &upload.key, body).await?;
        tracing::info!("Output uploaded to {}/{}", upload.bucket, upload.key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timing;
    use crate::gateway::stub::{MemoryObjectStore, StubGateway};
    use crate::operation::Operation;
    use crate::publish::ResultUpload;
    use std::sync::Arc;

    const ACCOUNT: &str = "012345678910";
    const NAMESPACE: &str = "my_env";
    const TEMPLATE_ID: &str = "my_env-library";
    const TEMPLATE_ARN: &str = "arn:aws:quicksight:::template/my_env-library";
    const NAMESPACE_ARN: &str = "arn:quicksight:::namespace/default";
    const GROUP_ARN: &str = "arn:aws:quicksight:::group/my_group";
    const DASHBOARD_ARN: &str = "arn:aws:quicksight:us-west-2:128682227026:dashboard/my_env-library";

    fn data_set_arn(placeholder: &str) -> String {
        format!("arn:aws:quicksight:::dataset/my_env-{}", placeholder)
    }

    fn describe_template() -> Value {
        json!({
            "Template": {
                "Arn": TEMPLATE_ARN,
                "Version": {
                    "VersionNumber": 5,
                    "Status": "CREATION_SUCCESSFUL",
                    "DataSetConfigurations": [
                        { "Placeholder": "circulation_view", "DataSetSchema": { "ColumnSchemaList": [] } },
                        { "Placeholder": "patron_events", "DataSetSchema": { "ColumnSchemaList": [] } }
                    ]
                }
            }
        })
    }

    fn publish_script() -> StubGateway {
        StubGateway::new()
            .respond("describe_template", 200, describe_template())
            .respond("describe_namespace", 200, json!({ "Namespace": { "Arn": NAMESPACE_ARN } }))
            .respond("describe_data_set", 200, json!({ "DataSet": { "Arn": data_set_arn("circulation_view") } }))
            .respond("describe_data_set", 200, json!({ "DataSet": { "Arn": data_set_arn("patron_events") } }))
            .not_found("delete_dashboard")
            .respond(
                "create_dashboard",
                202,
                json!({
                    "Arn": DASHBOARD_ARN,
                    "VersionArn": "arn:aws:quicksight:::dashboard/my_env-library/version/6",
                    "DashboardId": TEMPLATE_ID,
                    "CreationStatus": "CREATION_IN_PROGRESS"
                }),
            )
            .respond("describe_group", 200, json!({ "Group": { "Arn": GROUP_ARN } }))
            .respond("update_dashboard_permissions", 200, json!({ "Status": 200 }))
    }

    fn operation(stub: &Arc<StubGateway>) -> PublishDashboardOperation {
        let context = OperationContext::new(stub.clone(), ACCOUNT, Timing::immediate());
        PublishDashboardOperation::new(context, TEMPLATE_ID, NAMESPACE, "my_group")
    }

    #[tokio::test]
    async fn test_publish_grants_readers_on_new_dashboard() -> Result<()> {
        let stub = Arc::new(publish_script());

        let result = operation(&stub).execute().await?;
        stub.assert_drained();

        assert_eq!(result.status, "success");
        assert_eq!(
            serde_json::to_value(&result)?["dashboard_info"],
            json!({ "my_env-library": [DASHBOARD_ARN] })
        );

        let calls = stub.calls();
        assert_eq!(
            calls[2],
            ApiCall::DescribeDataSet {
                data_set_id: "my_env-circulation_view".to_string()
            }
        );
        assert_eq!(
            calls[5],
            ApiCall::CreateDashboard {
                dashboard_id: TEMPLATE_ID.to_string(),
                body: json!({
                    "Name": TEMPLATE_ID,
                    "SourceEntity": {
                        "SourceTemplate": {
                            "DataSetReferences": [
                                { "DataSetPlaceholder": "circulation_view", "DataSetArn": data_set_arn("circulation_view") },
                                { "DataSetPlaceholder": "patron_events", "DataSetArn": data_set_arn("patron_events") }
                            ],
                            "Arn": TEMPLATE_ARN
                        }
                    }
                }),
            }
        );
        assert_eq!(
            calls[6],
            ApiCall::DescribeGroup {
                namespace: "default".to_string(),
                group_name: "my_group".to_string(),
            }
        );
        let actions = json!([
            "quicksight:DescribeDashboard",
            "quicksight:ListDashboardVersions",
            "quicksight:QueryDashboard"
        ]);
        assert_eq!(
            calls[7],
            ApiCall::UpdateDashboardPermissions {
                dashboard_id: TEMPLATE_ID.to_string(),
                grant_permissions: json!([
                    { "Actions": actions.clone(), "Principal": NAMESPACE_ARN },
                    { "Actions": actions, "Principal": GROUP_ARN }
                ]),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_missing_data_set_is_fatal() {
        let stub = Arc::new(
            StubGateway::new()
                .respond("describe_template", 200, describe_template())
                .respond("describe_namespace", 200, json!({ "Namespace": { "Arn": NAMESPACE_ARN } }))
                .not_found("describe_data_set"),
        );

        let result = operation(&stub).execute().await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        // no dashboard attempted
        assert_eq!(stub.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_publish_rejects_permission_status() {
        let stub = Arc::new(
            StubGateway::new()
                .respond("describe_template", 200, describe_template())
                .respond("describe_namespace", 200, json!({ "Namespace": { "Arn": NAMESPACE_ARN } }))
                .respond("describe_data_set", 200, json!({ "DataSet": { "Arn": data_set_arn("circulation_view") } }))
                .respond("describe_data_set", 200, json!({ "DataSet": { "Arn": data_set_arn("patron_events") } }))
                .respond("delete_dashboard", 200, json!({}))
                .respond("create_dashboard", 200, json!({ "Arn": DASHBOARD_ARN }))
                .respond("describe_group", 200, json!({ "Group": { "Arn": GROUP_ARN } }))
                .respond("update_dashboard_permissions", 204, json!({})),
        );

        let result = operation(&stub).execute().await;

        assert!(matches!(
            result,
            Err(AppError::UnexpectedResponse { status: 204, .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_writes_output_file_and_uploads() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| AppError::io("tempdir", e))?;
        let output = dir.path().join("publish.json");
        let store = Arc::new(MemoryObjectStore::default());
        let stub = Arc::new(publish_script());

        let result = operation(&stub)
            .with_output_json(&output)
            .with_upload(ResultUpload {
                store: store.clone(),
                bucket: "dashboards".to_string(),
                key: "my_env/library.json".to_string(),
            })
            .execute()
            .await?;

        let written: Value =
            serde_json::from_slice(&std::fs::read(&output).map_err(|e| AppError::io(&output, e))?)?;
        assert_eq!(written, serde_json::to_value(&result)?);

        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].0, "dashboards");
        assert_eq!(objects[0].1, "my_env/library.json");
        assert_eq!(serde_json::from_slice::<Value>(&objects[0].2)?, written);
        Ok(())
    }
}
