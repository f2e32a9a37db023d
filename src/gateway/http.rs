// dashboardtool/src/gateway/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use reqwest::Method;
use serde_json::{Value, json};
use std::time::SystemTime;
use url::Url;

use super::{ApiCall, ApiResponse, GatewayError, QuickSightGateway};
use crate::config::AwsConfig;

const SERVICE_NAME: &str = "quicksight";

/// REST/JSON client for the QuickSight API, SigV4-signed with credentials
/// resolved through the regular AWS profile chain.
pub struct HttpQuickSightGateway {
    client: reqwest::Client,
    credentials: SharedCredentialsProvider,
    region: String,
    endpoint: Url,
}

impl HttpQuickSightGateway {
    pub async fn connect(aws_config: &AwsConfig) -> Result<Self> {
        let sdk_config = aws_config.load_sdk_config().await;
        let region = sdk_config
            .region()
            .map(|r| r.as_ref().to_string())
            .context("No AWS region configured. Set aws_region in config.json, --aws-region or AWS_REGION.")?;
        let credentials = sdk_config
            .credentials_provider()
            .context("No AWS credentials provider could be resolved from the profile chain")?;
        let endpoint = Url::parse(&format!("https://{}.{}.amazonaws.com", SERVICE_NAME, region))
            .context("Failed to build QuickSight endpoint URL")?;

        tracing::debug!("QuickSight endpoint: {}", endpoint);
        Ok(Self {
            client: reqwest::Client::new(),
            credentials,
            region,
            endpoint,
        })
    }

    fn url_for(&self, route: &Route) -> std::result::Result<Url, GatewayError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport(format!("endpoint {} cannot carry a path", self.endpoint)))?
            .pop_if_empty()
            .extend(route.segments.iter());
        if !route.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(route.query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn signed_headers(
        &self,
        method: &Method,
        url: &Url,
        body: &[u8],
    ) -> std::result::Result<Vec<(String, String)>, GatewayError> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| GatewayError::Credentials(e.to_string()))?;
        let identity: Identity = credentials.into();

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(GatewayError::Transport(format!("no host in {}", url))),
        };
        let mut headers = vec![
            ("host".to_string(), host),
            ("content-type".to_string(), "application/json".to_string()),
        ];

        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SERVICE_NAME)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| GatewayError::Signing(e.to_string()))?
            .into();
        let signable = SignableRequest::new(
            method.as_str(),
            url.as_str(),
            headers.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            SignableBody::Bytes(body),
        )
        .map_err(|e| GatewayError::Signing(e.to_string()))?;
        let (instructions, _signature) = sign(signable, &signing_params)
            .map_err(|e| GatewayError::Signing(e.to_string()))?
            .into_parts();

        for (name, value) in instructions.headers() {
            headers.push((name.to_string(), value.to_string()));
        }
        Ok(headers)
    }
}

#[async_trait]
impl QuickSightGateway for HttpQuickSightGateway {
    async fn call(
        &self,
        account_id: &str,
        call: ApiCall,
    ) -> std::result::Result<ApiResponse, GatewayError> {
        let name = call.name();
        let route = route(account_id, call);
        let url = self.url_for(&route)?;
        let body = match &route.body {
            Some(doc) => serde_json::to_vec(doc).map_err(|e| GatewayError::Transport(e.to_string()))?,
            None => Vec::new(),
        };
        let headers = self.signed_headers(&route.method, &url, &body).await?;

        tracing::debug!("{} {} ({})", route.method, url, name);
        let mut request = self.client.request(route.method.clone(), url);
        for (header, value) in headers.iter().filter(|(h, _)| h != "host") {
            request = request.header(header.as_str(), value.as_str());
        }
        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let doc = if bytes.is_empty() {
            json!({})
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        if (200..300).contains(&status) {
            Ok(ApiResponse::new(name, status, doc))
        } else {
            Err(classify_error(status, error_type.as_deref(), &doc))
        }
    }
}

/// HTTP binding of one call: method, path segments, query and JSON body.
#[derive(Debug, PartialEq)]
pub(crate) struct Route {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl Route {
    fn new(method: Method, account_id: &str, rest: &[&str]) -> Self {
        let mut segments = vec!["accounts".to_string(), account_id.to_string()];
        segments.extend(rest.iter().map(|s| s.to_string()));
        Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
        }
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub(crate) fn route(account_id: &str, call: ApiCall) -> Route {
    let a = account_id;
    match call {
        ApiCall::DescribeAnalysis { analysis_id } => {
            Route::new(Method::GET, a, &["analyses", &analysis_id])
        }
        ApiCall::DescribeAnalysisDefinition { analysis_id } => {
            Route::new(Method::GET, a, &["analyses", &analysis_id, "definition"])
        }
        ApiCall::CreateTemplate { template_id, body } => {
            Route::new(Method::POST, a, &["templates", &template_id]).with_body(body)
        }
        ApiCall::DeleteTemplate { template_id } => {
            Route::new(Method::DELETE, a, &["templates", &template_id])
        }
        ApiCall::DescribeTemplate { template_id } => {
            Route::new(Method::GET, a, &["templates", &template_id])
        }
        ApiCall::DescribeTemplateDefinition {
            template_id,
            alias_name,
        } => {
            let mut route = Route::new(Method::GET, a, &["templates", &template_id, "definition"]);
            route.query.push(("alias-name", alias_name));
            route
        }
        ApiCall::CreateDataSet { body } => Route::new(Method::POST, a, &["data-sets"]).with_body(body),
        ApiCall::DeleteDataSet { data_set_id } => {
            Route::new(Method::DELETE, a, &["data-sets", &data_set_id])
        }
        ApiCall::DescribeDataSet { data_set_id } => {
            Route::new(Method::GET, a, &["data-sets", &data_set_id])
        }
        ApiCall::DescribeDataSetRefreshProperties { data_set_id } => {
            Route::new(Method::GET, a, &["data-sets", &data_set_id, "refresh-properties"])
        }
        ApiCall::PutDataSetRefreshProperties {
            data_set_id,
            properties,
        } => Route::new(Method::PUT, a, &["data-sets", &data_set_id, "refresh-properties"])
            .with_body(json!({ "DataSetRefreshProperties": properties })),
        ApiCall::DeleteDataSetRefreshProperties { data_set_id } => {
            Route::new(Method::DELETE, a, &["data-sets", &data_set_id, "refresh-properties"])
        }
        ApiCall::ListRefreshSchedules { data_set_id } => {
            Route::new(Method::GET, a, &["data-sets", &data_set_id, "refresh-schedules"])
        }
        ApiCall::CreateRefreshSchedule {
            data_set_id,
            schedule,
        } => Route::new(Method::POST, a, &["data-sets", &data_set_id, "refresh-schedules"])
            .with_body(json!({ "Schedule": schedule })),
        ApiCall::DeleteRefreshSchedule {
            data_set_id,
            schedule_id,
        } => Route::new(
            Method::DELETE,
            a,
            &["data-sets", &data_set_id, "refresh-schedules", &schedule_id],
        ),
        ApiCall::DescribeNamespace { namespace } => {
            Route::new(Method::GET, a, &["namespaces", &namespace])
        }
        ApiCall::DescribeGroup {
            namespace,
            group_name,
        } => Route::new(Method::GET, a, &["namespaces", &namespace, "groups", &group_name]),
        ApiCall::CreateDashboard { dashboard_id, body } => {
            Route::new(Method::POST, a, &["dashboards", &dashboard_id]).with_body(body)
        }
        ApiCall::DeleteDashboard { dashboard_id } => {
            Route::new(Method::DELETE, a, &["dashboards", &dashboard_id])
        }
        ApiCall::UpdateDashboardPermissions {
            dashboard_id,
            grant_permissions,
        } => Route::new(Method::PUT, a, &["dashboards", &dashboard_id, "permissions"])
            .with_body(json!({ "GrantPermissions": grant_permissions })),
    }
}

/// Maps a non-2xx reply onto the typed error signal, using the
/// `x-amzn-ErrorType` header first and the body's `__type` second.
pub(crate) fn classify_error(status: u16, error_type: Option<&str>, body: &Value) -> GatewayError {
    let code = error_type
        .and_then(|t| t.split(':').next())
        .filter(|c| !c.is_empty())
        .or_else(|| {
            body.get("__type")
                .and_then(Value::as_str)
                .and_then(|t| t.rsplit('#').next())
        })
        .unwrap_or("UnknownError")
        .to_string();
    let message = body
        .get("Message")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match code.as_str() {
        "ResourceNotFoundException" => GatewayError::NotFound { code, message },
        "ResourceExistsException" => GatewayError::AlreadyExists {
            status,
            code,
            message,
        },
        "InvalidParameterValueException" | "InvalidParameterException" => {
            GatewayError::InvalidParameter {
                status,
                code,
                message,
            }
        }
        _ if status == 404 => GatewayError::NotFound { code, message },
        _ => GatewayError::Service {
            status,
            code,
            message,
        },
    }
}
