//! Request bodies for the optimize endpoint and the search CLI.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use iv_data::Record;
use iv_models::ModelKind;
use iv_types::{validation_error, IvResult, PsoConfig, SearchConfig, SearchError};

/// Keys a `pso_config` block must carry, in the order they are checked.
const PSO_REQUIRED_KEYS: [&str; 10] = [
    "lb",
    "ub",
    "swarmsize",
    "maxiter",
    "omega",
    "phip",
    "phig",
    "n_solutions",
    "nprocessors",
    "max_rounds",
];

/// Everything a search needs apart from the dataset itself.
///
/// This is the shape of the CLI request file, and of an HTTP request body
/// without its `data` key.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub features: Vec<String>,
    pub target: String,
    pub target_value: f64,
    pub pso_config: PsoConfig,
    /// Predictor variants to search, by name. `None` means every variant.
    pub models: Option<Vec<String>>,
}

impl SearchRequest {
    pub fn from_value(value: Value) -> IvResult<Self> {
        let mut body = into_object(value)?;
        Self::from_object(&mut body)
    }

    fn from_object(body: &mut Map<String, Value>) -> IvResult<Self> {
        // Keys are checked in a fixed order so the first missing one is reported.
        let features: Vec<String> = field(take(body, "features")?, "features")?;
        let target: String = field(take(body, "target")?, "target")?;
        let pso_config = pso_config(take(body, "pso_config")?)?;
        let target_value = match take(body, "target_value")? {
            Value::Null => return Err(validation_error!("Missing 'target_value' in request data.")),
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| validation_error!("'target_value' must be a numeric value."))?,
            _ => return Err(validation_error!("'target_value' must be a numeric value.")),
        };
        let models = match body.remove("models") {
            None | Some(Value::Null) => None,
            Some(v) => Some(field(v, "models")?),
        };

        Ok(Self {
            features,
            target,
            target_value,
            pso_config,
            models,
        })
    }

    pub fn search_config(&self) -> IvResult<SearchConfig> {
        SearchConfig::from_pso(self.features.clone(), self.target_value, &self.pso_config)
    }

    /// Resolve the requested variant names, keeping the caller's order.
    pub fn model_kinds(&self) -> IvResult<Vec<ModelKind>> {
        match &self.models {
            None => Ok(ModelKind::ALL.to_vec()),
            Some(names) if names.is_empty() => Err(SearchError::NoVariants.into()),
            Some(names) => names.iter().map(|name| ModelKind::from_name(name)).collect(),
        }
    }
}

/// Body of `POST /api/optimize/`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeRequest {
    pub data: Vec<Record>,
    pub search: SearchRequest,
}

impl OptimizeRequest {
    pub fn from_value(value: Value) -> IvResult<Self> {
        let mut body = into_object(value)?;
        let data: Vec<Record> = field(take(&mut body, "data")?, "data")?;
        let search = SearchRequest::from_object(&mut body)?;
        Ok(Self { data, search })
    }
}

fn into_object(value: Value) -> IvResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(validation_error!(
            "Request body must be a JSON object, got {}",
            kind_of(&other)
        )),
    }
}

fn take(body: &mut Map<String, Value>, key: &str) -> IvResult<Value> {
    body.remove(key)
        .ok_or_else(|| validation_error!("Missing key in request data: '{}'", key))
}

fn field<T: DeserializeOwned>(value: Value, key: &str) -> IvResult<T> {
    serde_json::from_value(value).map_err(|e| validation_error!("Invalid '{}': {}", key, e))
}

fn pso_config(value: Value) -> IvResult<PsoConfig> {
    if let Value::Object(map) = &value {
        if let Some(key) = PSO_REQUIRED_KEYS.iter().find(|key| !map.contains_key(**key)) {
            return Err(validation_error!("Missing key in request data: '{}'", key));
        }
    }
    field(value, "pso_config")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
