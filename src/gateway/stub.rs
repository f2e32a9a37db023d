// dashboardtool/src/gateway/stub.rs
//! Scripted gateways for tests. Responses are queued in the exact order the
//! orchestrator is expected to issue calls; any deviation panics.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::object_store::ObjectStore;
use super::{ApiCall, ApiResponse, GatewayError, QuickSightGateway};
use crate::errors::Result;

struct Expectation {
    call: &'static str,
    outcome: std::result::Result<(u16, Value), GatewayError>,
}

#[derive(Default)]
pub struct StubGateway {
    pending: Mutex<VecDeque<Expectation>>,
    received: Mutex<Vec<(String, ApiCall)>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, call: &'static str, status: u16, body: Value) -> Self {
        self.push(call, Ok((status, body)));
        self
    }

    pub fn fail(self, call: &'static str, error: GatewayError) -> Self {
        self.push(call, Err(error));
        self
    }

    pub fn not_found(self, call: &'static str) -> Self {
        self.fail(
            call,
            GatewayError::NotFound {
                code: "ResourceNotFoundException".to_string(),
                message: format!("{} target does not exist", call),
            },
        )
    }

    fn push(&self, call: &'static str, outcome: std::result::Result<(u16, Value), GatewayError>) {
        self.pending
            .lock()
            .unwrap()
            .push_back(Expectation { call, outcome });
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn accounts(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .map(|(account, _)| account.clone())
            .collect()
    }

    pub fn assert_drained(&self) {
        let pending: Vec<&str> = self.pending.lock().unwrap().iter().map(|e| e.call).collect();
        assert!(pending.is_empty(), "expected calls never made: {:?}", pending);
    }
}

#[async_trait]
impl QuickSightGateway for StubGateway {
    async fn call(
        &self,
        account_id: &str,
        call: ApiCall,
    ) -> std::result::Result<ApiResponse, GatewayError> {
        let name = call.name();
        self.received
            .lock()
            .unwrap()
            .push((account_id.to_string(), call.clone()));

        let expectation = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected call {}: {:?}", name, call));
        assert_eq!(expectation.call, name, "out-of-order call: {:?}", call);

        expectation
            .outcome
            .map(|(status, body)| ApiResponse::new(name, status, body))
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: Mutex<Vec<(String, String, Vec<u8>)>>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), body));
        Ok(())
    }
}

/// Service replies for the `library` analysis and its two datasets.
pub mod fixtures {
    use serde_json::{Value, json};

    pub const ACCOUNT: &str = "012345678910";
    pub const CIRCULATION_DS_ID: &str = "e9e15c78-0193-4e4c-9a49-ed005569297d";
    pub const PATRON_DS_ID: &str = "86eb4ca5-9552-4ba6-8b1b-7ef1b9b40f78";
    pub const SOURCE_DATA_SOURCE_ARN: &str =
        "arn:aws:quicksight:us-west-2:128682227026:datasource/source-env-redshift";

    pub fn data_set_arn(id: &str) -> String {
        format!("arn:aws:quicksight:us-west-2:128682227026:dataset/{}", id)
    }

    pub fn describe_analysis(analysis_id: &str) -> Value {
        json!({
            "Status": 200,
            "Analysis": {
                "AnalysisId": analysis_id,
                "Arn": "arn",
                "Name": "library",
                "Status": "CREATION_SUCCESSFUL",
                "DataSetArns": [data_set_arn(CIRCULATION_DS_ID), data_set_arn(PATRON_DS_ID)],
                "Sheets": [
                    { "SheetId": "9f2df4a8-21e2-4aa4-adcd-3fb32e86c4ba", "Name": "Circulation Summary" }
                ]
            }
        })
    }

    pub fn describe_analysis_definition() -> Value {
        json!({
            "Status": 200,
            "Name": "library",
            "ResourceStatus": "CREATION_SUCCESSFUL",
            "Definition": {
                "DataSetIdentifierDeclarations": [
                    { "Identifier": "circulation_view", "DataSetArn": data_set_arn(CIRCULATION_DS_ID) },
                    { "Identifier": "patron_events", "DataSetArn": data_set_arn(PATRON_DS_ID) }
                ],
                "Sheets": []
            }
        })
    }

    pub fn create_template(template_id: &str) -> Value {
        json!({
            "Status": 202,
            "TemplateId": template_id,
            "Arn": format!("arn:aws:quicksight:us-west-2:128682227026:template/{}", template_id),
            "VersionArn": format!("arn:aws:quicksight:us-west-2:128682227026:template/{}/version/4", template_id),
            "CreationStatus": "CREATION_IN_PROGRESS"
        })
    }

    pub fn template_definition_body() -> Value {
        json!({
            "DataSetConfigurations": [
                {
                    "Placeholder": "circulation_view",
                    "DataSetSchema": { "ColumnSchemaList": [] },
                    "ColumnGroupSchemaList": []
                },
                {
                    "Placeholder": "patron_events",
                    "DataSetSchema": { "ColumnSchemaList": [] },
                    "ColumnGroupSchemaList": []
                }
            ],
            "Sheets": [],
            "AnalysisDefaults": {
                "DefaultNewSheetConfiguration": { "SheetContentType": "INTERACTIVE" }
            }
        })
    }

    pub fn describe_template_definition(status: &str) -> Value {
        json!({
            "Status": 200,
            "Name": "library",
            "TemplateId": "library-template",
            "ResourceStatus": status,
            "Definition": template_definition_body()
        })
    }

    pub fn describe_data_set(id: &str, name: &str) -> Value {
        json!({
            "Status": 200,
            "DataSet": {
                "Arn": data_set_arn(id),
                "DataSetId": id,
                "Name": format!("{} (source)", name),
                "CreatedTime": 1693562779.376,
                "LastUpdatedTime": 1693562779.376,
                "PhysicalTableMap": {
                    "25046cd8-e08f-41e0-8af8-5259b64499fd": {
                        "CustomSql": {
                            "DataSourceArn": SOURCE_DATA_SOURCE_ARN,
                            "Name": name,
                            "SqlQuery": "sql query",
                            "Columns": [ { "Name": "time_stamp", "Type": "DATETIME" } ]
                        }
                    }
                },
                "LogicalTableMap": {
                    "6c80275e-d03d-417c-a8cd-57d93e58129b": {
                        "Alias": name,
                        "Source": { "PhysicalTableId": "25046cd8-e08f-41e0-8af8-5259b64499fd" }
                    }
                },
                "OutputColumns": [ { "Name": "time_stamp", "Type": "DATETIME" } ],
                "ImportMode": "DIRECT_QUERY",
                "ConsumedSpiceCapacityInBytes": 0
            }
        })
    }

    pub fn refresh_properties() -> Value {
        json!({
            "RefreshConfiguration": {
                "IncrementalRefresh": {
                    "LookbackWindow": { "ColumnName": "time_stamp", "Size": 1, "SizeUnit": "DAY" }
                }
            }
        })
    }

    pub fn list_refresh_schedules(data_set_id: &str) -> Value {
        json!({
            "Status": 200,
            "RefreshSchedules": [
                {
                    "ScheduleId": "nightly",
                    "Arn": format!("{}/refresh-schedule/nightly", data_set_arn(data_set_id)),
                    "StartAfterDateTime": 1693562779.0,
                    "RefreshType": "INCREMENTAL_REFRESH",
                    "ScheduleFrequency": { "Interval": "DAILY", "TimeOfTheDay": "02:00" }
                },
                {
                    "ScheduleId": "weekly",
                    "Arn": format!("{}/refresh-schedule/weekly", data_set_arn(data_set_id)),
                    "StartAfterDateTime": 1693562779.0,
                    "RefreshType": "FULL_REFRESH",
                    "ScheduleFrequency": { "Interval": "WEEKLY", "RefreshOnDay": { "DayOfWeek": "SUNDAY" } }
                }
            ]
        })
    }

    pub fn create_data_set(id: &str) -> Value {
        json!({ "Status": 201, "Arn": data_set_arn(id), "DataSetId": id })
    }
}
