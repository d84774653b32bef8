//! Function Registry
//!
//! Maps stable function names (e.g. "npv") to type-erased handlers and their
//! contracts. Registration happens on a [`RegistryBuilder`] during startup;
//! [`RegistryBuilder::build`] freezes it into a [`UdfRegistry`] that is never
//! mutated again, so lookups on the hot path take no locks.

use super::contract::{self, Contract, FieldError};
use super::types::ExecutionMode;
use crate::error::{UdfError, UdfResult};

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Generic description recorded when a successful handler's response cannot be serialized.
pub const INTERNAL_FAULT_MESSAGE: &str = "internal error while serializing the result";

/// Why a prepared call did not produce a response.
#[derive(Debug, Clone, PartialEq)]
pub enum CallFailure {
    /// The handler returned an error.
    Handler(String),
    /// The handler panicked.
    Panicked(String),
    /// The handler succeeded but the response contract rejected its output.
    Serialization(String),
}

impl CallFailure {
    /// The description exposed to callers. Serialization details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            CallFailure::Handler(message) => message.clone(),
            CallFailure::Panicked(message) => format!("handler panicked: {}", message),
            CallFailure::Serialization(_) => INTERNAL_FAULT_MESSAGE.to_string(),
        }
    }
}

/// A validated request bound to its handler, ready to run exactly once.
pub struct PreparedCall {
    /// Normalized JSON of the validated request.
    pub input: Value,
    run: Box<dyn FnOnce() -> Result<Value, CallFailure> + Send>,
}

impl PreparedCall {
    pub fn run(self) -> Result<Value, CallFailure> {
        (self.run)()
    }
}

impl std::fmt::Debug for PreparedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedCall")
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

type PrepareFn = Arc<dyn Fn(&Value) -> Result<PreparedCall, Vec<FieldError>> + Send + Sync>;

/// Optional descriptive metadata shown in the function catalogue.
#[derive(Debug, Clone, Default)]
pub struct UdfMeta {
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub version: Option<String>,
}

impl UdfMeta {
    pub fn described(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }
}

/// The registration record for one function.
pub struct UdfRecord {
    pub name: String,
    pub mode: ExecutionMode,
    pub description: String,
    pub tags: Vec<String>,
    pub version: Option<String>,
    /// Type name of the request contract.
    pub request_contract: &'static str,
    /// Type name of the response contract.
    pub response_contract: &'static str,
    prepare: PrepareFn,
}

impl UdfRecord {
    /// Validates raw input against the request contract and binds it to the handler.
    pub fn prepare(&self, raw: &Value) -> UdfResult<PreparedCall> {
        (self.prepare)(raw).map_err(|fields| UdfError::Validation {
            function: self.name.clone(),
            fields,
        })
    }
}

impl std::fmt::Debug for UdfRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdfRecord")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("request_contract", &self.request_contract)
            .field("response_contract", &self.response_contract)
            .finish_non_exhaustive()
    }
}

/// Collects registrations during startup.
#[derive(Default)]
pub struct RegistryBuilder {
    records: HashMap<String, UdfRecord>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name` with default metadata.
    pub fn register<Req, Resp, F>(
        &mut self,
        name: &str,
        mode: ExecutionMode,
        handler: F,
    ) -> UdfResult<&mut Self>
    where
        Req: Contract,
        Resp: Serialize + 'static,
        F: Fn(Req) -> anyhow::Result<Resp> + Send + Sync + 'static,
    {
        self.register_with_meta(name, mode, UdfMeta::default(), handler)
    }

    /// Registers `handler` under `name`.
    ///
    /// # Errors
    /// `DuplicateRegistration` if the name is already taken. Names are case-sensitive.
    pub fn register_with_meta<Req, Resp, F>(
        &mut self,
        name: &str,
        mode: ExecutionMode,
        meta: UdfMeta,
        handler: F,
    ) -> UdfResult<&mut Self>
    where
        Req: Contract,
        Resp: Serialize + 'static,
        F: Fn(Req) -> anyhow::Result<Resp> + Send + Sync + 'static,
    {
        if self.records.contains_key(name) {
            return Err(UdfError::DuplicateRegistration(name.to_string()));
        }

        let handler = Arc::new(handler);

        // Erase Req/Resp: validation yields a closure that owns the typed request.
        let prepare: PrepareFn = Arc::new(move |raw: &Value| {
            let request: Req = contract::validate(raw)?;
            let input = serde_json::to_value(&request).unwrap_or_else(|_| raw.clone());
            let handler = Arc::clone(&handler);

            Ok(PreparedCall {
                input,
                run: Box::new(move || {
                    let response = handler(request).map_err(|e| {
                        let message = format!("{:#}", e);
                        if message.is_empty() {
                            CallFailure::Handler("handler failed".to_string())
                        } else {
                            CallFailure::Handler(message)
                        }
                    })?;
                    contract::serialize(&response)
                        .map_err(|e| CallFailure::Serialization(e.to_string()))
                }),
            })
        });

        let record = UdfRecord {
            name: name.to_string(),
            mode,
            description: meta.description.unwrap_or_else(|| name.to_string()),
            tags: if meta.tags.is_empty() {
                vec![format!("udf:{}", name)]
            } else {
                meta.tags
            },
            version: meta.version,
            request_contract: std::any::type_name::<Req>(),
            response_contract: std::any::type_name::<Resp>(),
            prepare,
        };

        self.records.insert(name.to_string(), record);
        tracing::info!(udf = name, %mode, "Registered function");

        Ok(self)
    }

    /// Freezes the registrations.
    pub fn build(self) -> Arc<UdfRegistry> {
        tracing::info!("Registry frozen with {} functions", self.records.len());
        Arc::new(UdfRegistry {
            records: self.records,
        })
    }
}

/// Immutable name -> record mapping.
pub struct UdfRegistry {
    records: HashMap<String, UdfRecord>,
}

impl UdfRegistry {
    pub fn lookup(&self, name: &str) -> UdfResult<&UdfRecord> {
        self.records
            .get(name)
            .ok_or_else(|| UdfError::UnknownFunction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records sorted by name.
    pub fn records(&self) -> Vec<&UdfRecord> {
        let mut records: Vec<&UdfRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}
