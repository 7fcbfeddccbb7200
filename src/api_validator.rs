use crate::config::ValidatorConfig;
use crate::error::Error;
use crate::params::parse_query;
use crate::schema::{ValidationError, Validator};
use crate::validators::{
    ParametersValidator, RawRequest, RawResponse, RequestBodyValidator, ResponseValidator,
};
use crate::value::Value;
use indexmap::IndexMap;
use matchit::Router;
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// HTTP methods supported by OpenAPI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    TRACE,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        Self::GET,
        Self::PUT,
        Self::POST,
        Self::DELETE,
        Self::OPTIONS,
        Self::HEAD,
        Self::PATCH,
        Self::TRACE,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::DELETE => "DELETE",
            Self::PATCH => "PATCH",
            Self::HEAD => "HEAD",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
        }
    }

    /// Key of this method inside an OpenAPI path item.
    pub fn key(&self) -> &'static str {
        match self {
            Self::GET => "get",
            Self::POST => "post",
            Self::PUT => "put",
            Self::DELETE => "delete",
            Self::PATCH => "patch",
            Self::HEAD => "head",
            Self::OPTIONS => "options",
            Self::TRACE => "trace",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::GET),
            "POST" => Ok(Self::POST),
            "PUT" => Ok(Self::PUT),
            "DELETE" => Ok(Self::DELETE),
            "PATCH" => Ok(Self::PATCH),
            "HEAD" => Ok(Self::HEAD),
            "OPTIONS" => Ok(Self::OPTIONS),
            "TRACE" => Ok(Self::TRACE),
            _ => Err(()),
        }
    }
}

/// Parameters and body of a request after validation, in their typed form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRequest {
    pub params: IndexMap<String, Value>,
    pub body: Option<Value>,
}

/// Validator for a single API operation (path + method combination)
#[derive(Debug, Clone)]
pub struct OperationValidator {
    validator: Validator,
    pub request_body: Option<RequestBodyValidator>,
    pub responses: ResponseValidator,
    pub parameters: ParametersValidator,
}

impl OperationValidator {
    pub fn new(
        validator: Validator,
        request_body: Option<RequestBodyValidator>,
        responses: ResponseValidator,
        parameters: ParametersValidator,
    ) -> Self {
        Self {
            validator,
            request_body,
            responses,
            parameters,
        }
    }

    /// Validates parameters, then the body. `path_params` are the raw route matches.
    pub fn validate_request(
        &self,
        path_params: &IndexMap<String, String>,
        request: &RawRequest,
    ) -> Result<ValidatedRequest, Error> {
        let queries = parse_query(&request.query_string)
            .map_err(|e| ValidationError::new("cannot parse query string").with_cause(e))?;
        let params = self
            .parameters
            .validate(&self.validator, path_params, request, &queries)?;
        let body = match &self.request_body {
            Some(request_body) => request_body.validate(&self.validator, request)?,
            None => None,
        };
        Ok(ValidatedRequest { params, body })
    }

    pub fn validate_response(&self, response: &RawResponse) -> Result<(), Error> {
        self.responses.validate(&self.validator, response)
    }
}

/// Map of HTTP methods to their operation validators
type OperationMap = HashMap<HttpMethod, OperationValidator>;

/// Top-level API validator that validates requests/responses against an OpenAPI document
pub struct ApiValidator {
    router: Router<OperationMap>,
    config: ValidatorConfig,
    operations: usize,
}

impl ApiValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            router: Router::new(),
            config,
            operations: 0,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Number of (path, method) pairs registered.
    pub fn operation_count(&self) -> usize {
        self.operations
    }

    /// Adds all operations for a path at once
    pub fn add_path_operations(
        &mut self,
        path: &str,
        operations: HashMap<HttpMethod, OperationValidator>,
    ) -> Result<(), Error> {
        let count = operations.len();
        self.router
            .insert(path, operations)
            .map_err(|e| Error::Load(format!("failed to add route '{}': {}", path, e)))?;
        self.operations += count;
        Ok(())
    }

    /// Finds the operation for `path` and `method` with its percent-decoded path
    /// parameters. `None` for routes the document does not describe.
    pub fn find_operation(
        &self,
        path: &str,
        method: HttpMethod,
    ) -> Option<(&OperationValidator, IndexMap<String, String>)> {
        let matched = self.router.at(path).ok()?;
        let operation = matched.value.get(&method)?;
        let params = matched
            .params
            .iter()
            .map(|(name, raw)| {
                let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
                (name.to_owned(), decoded.into_owned())
            })
            .collect();
        Some((operation, params))
    }

    /// Validates a request; `None` when no operation matches, so the caller passes
    /// the request through untouched.
    pub fn validate_request(
        &self,
        method: HttpMethod,
        path: &str,
        request: &RawRequest,
    ) -> Option<Result<ValidatedRequest, Error>> {
        let Some((operation, path_params)) = self.find_operation(path, method) else {
            debug!(method = method.as_str(), path, "no operation matches request");
            return None;
        };
        Some(operation.validate_request(&path_params, request))
    }

    /// Validates a produced response when response validation is enabled; `None`
    /// when it is disabled or no operation matches.
    pub fn validate_response(
        &self,
        method: HttpMethod,
        path: &str,
        response: &RawResponse,
    ) -> Option<Result<(), Error>> {
        if !self.config.validate_response {
            return None;
        }
        let (operation, _) = self.find_operation(path, method)?;
        Some(operation.validate_response(response))
    }

    /// HTTP status the caller should answer with for `error`.
    pub fn status_code(&self, error: &Error) -> u16 {
        error.status_code(self.config.raise_422)
    }
}
