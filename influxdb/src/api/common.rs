use serde::Deserialize;

/// Error body returned by the InfluxDB v2 API
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Query string builder
#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }

        format!(
            "?{}",
            self.params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        )
    }
}

/// Offset pagination accepted by the orgs, buckets and users endpoints
#[derive(Debug, Clone, Copy)]
pub struct PaginationParams {
    pub offset: u32,
    pub limit: u32,
}

impl PaginationParams {
    /// Largest page the orgs and buckets endpoints accept
    pub const MAX_LIMIT: u32 = 100;

    pub fn first_page() -> Self {
        Self {
            offset: 0,
            limit: Self::MAX_LIMIT,
        }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }

    pub fn apply(&self, params: ApiQueryParams) -> ApiQueryParams {
        params.add("offset", self.offset).add("limit", self.limit)
    }
}

/// Links block attached to most InfluxDB objects
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Option<String>,
    pub labels: Option<String>,
    pub logs: Option<String>,
    pub members: Option<String>,
    pub owners: Option<String>,
    pub runs: Option<String>,
}
