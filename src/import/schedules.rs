// dashboardtool/src/import/schedules.rs
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use crate::errors::{AppError, Result};
use crate::gateway::ApiCall;
use crate::operation::OperationContext;
use crate::utils::layout::{AssetLayout, read_optional_json};

/// Drops the refresh properties and every refresh schedule currently attached
/// to `data_set_id`. A dataset that does not exist yet has nothing to drop.
pub async fn remove_refresh_configuration(context: &OperationContext, data_set_id: &str) -> Result<()> {
    let call = ApiCall::DeleteDataSetRefreshProperties {
        data_set_id: data_set_id.to_string(),
    };
    let name = call.name();
    match context.call_raw(call).await {
        Ok(_) => tracing::info!("Refresh properties removed from {}", data_set_id),
        Err(e) if e.is_absent_refresh_properties() => {}
        Err(e) => return Err(AppError::from_gateway(name, e)),
    }

    let call = ApiCall::ListRefreshSchedules {
        data_set_id: data_set_id.to_string(),
    };
    let name = call.name();
    let schedule_ids: Vec<String> = match context.call_raw(call).await {
        Ok(response) => response
            .parse_at::<Vec<Value>>("/RefreshSchedules")?
            .iter()
            .filter_map(|s| s.get("ScheduleId").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(AppError::from_gateway(name, e)),
    };

    for schedule_id in schedule_ids {
        tracing::info!("Deleting refresh schedule {} of {}", schedule_id, data_set_id);
        context
            .call(ApiCall::DeleteRefreshSchedule {
                data_set_id: data_set_id.to_string(),
                schedule_id,
            })
            .await?;
    }
    Ok(())
}

/// Applies the exported refresh properties and schedules of `logical_name`
/// (when their files exist) to the freshly created `data_set_id`.
pub async fn apply_refresh_configuration(
    context: &OperationContext,
    layout: &AssetLayout,
    logical_name: &str,
    data_set_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(properties) = read_optional_json(&layout.refresh_properties_file(logical_name))? {
        context
            .call(ApiCall::PutDataSetRefreshProperties {
                data_set_id: data_set_id.to_string(),
                properties,
            })
            .await?;
        tracing::info!("Refresh properties applied to {}", data_set_id);
    }

    let schedules_path = layout.refresh_schedules_file(logical_name);
    let Some(document) = read_optional_json(&schedules_path)? else {
        return Ok(());
    };
    let schedules = document
        .get("RefreshSchedules")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::MalformedDocument {
            path: schedules_path.clone(),
            reason: "RefreshSchedules list missing".to_string(),
        })?;

    for (index, schedule) in schedules.iter().enumerate() {
        let schedule = prepare_schedule(schedule, data_set_id, index, now);
        let response = context
            .call(ApiCall::CreateRefreshSchedule {
                data_set_id: data_set_id.to_string(),
                schedule,
            })
            .await?;
        tracing::info!(
            "create_refresh_schedule {}-{}: http_status = {}",
            data_set_id,
            index,
            response.status
        );
    }
    Ok(())
}

/// Stamps a schedule with its target identifier and a start time one day
/// after `now`; the service rejects start times that are not in the future.
pub fn prepare_schedule(schedule: &Value, data_set_id: &str, index: usize, now: DateTime<Utc>) -> Value {
    let mut schedule = schedule.clone();
    if let Some(fields) = schedule.as_object_mut() {
        fields.insert("ScheduleId".to_string(), json!(format!("{}-{}", data_set_id, index)));
        fields.insert(
            "StartAfterDateTime".to_string(),
            json!((now + Duration::days(1)).timestamp()),
        );
    }
    schedule
}
