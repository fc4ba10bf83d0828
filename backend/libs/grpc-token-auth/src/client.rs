//! Client-side interceptor attaching credentials to outgoing calls

use token_auth_core::scheme::AUTHORIZATION_HEADER;
use token_auth_core::{encode_basic, AuthTokenType};
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// Adds a pre-formatted `authorization` value to every outgoing request
///
/// ```rust,no_run
/// use grpc_token_auth::ClientTokenInterceptor;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let interceptor = ClientTokenInterceptor::bearer("eyJhbGc...")?;
/// let channel = tonic::transport::Channel::from_static("http://[::1]:50051")
///     .connect()
///     .await?;
/// // let client = UserServiceClient::with_interceptor(channel, interceptor);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientTokenInterceptor {
    auth_header: AsciiMetadataValue,
}

impl ClientTokenInterceptor {
    /// ## Errors
    ///
    /// `Status::invalid_argument` if the formatted value is not valid ASCII
    /// metadata.
    pub fn new(token_type: AuthTokenType, credential: &str) -> Result<Self, Status> {
        let auth_header = AsciiMetadataValue::try_from(token_type.header_value(credential))
            .map_err(|_| Status::invalid_argument("credential is not valid ASCII metadata"))?;
        Ok(Self { auth_header })
    }

    pub fn bearer(token: &str) -> Result<Self, Status> {
        Self::new(AuthTokenType::Bearer, token)
    }

    pub fn basic(user: &str, password: &str) -> Result<Self, Status> {
        Self::new(AuthTokenType::Basic, &encode_basic(user, password))
    }

    pub fn from_header(auth_header: AsciiMetadataValue) -> Self {
        Self { auth_header }
    }
}

impl Interceptor for ClientTokenInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(AUTHORIZATION_HEADER, self.auth_header.clone());
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(mut interceptor: ClientTokenInterceptor) -> String {
        let request = interceptor.call(Request::new(())).unwrap();
        request
            .metadata()
            .get(AUTHORIZATION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_bearer() {
        let interceptor = ClientTokenInterceptor::bearer("test-token-123").unwrap();
        assert_eq!(header_of(interceptor), "Bearer test-token-123");
    }

    #[test]
    fn test_basic() {
        let interceptor = ClientTokenInterceptor::basic("user", "pass").unwrap();
        assert_eq!(header_of(interceptor), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_replaces_existing_value() {
        let mut interceptor = ClientTokenInterceptor::bearer("new").unwrap();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(AUTHORIZATION_HEADER, "Bearer old".parse().unwrap());

        let request = interceptor.call(request).unwrap();
        assert_eq!(request.metadata().get_all(AUTHORIZATION_HEADER).iter().count(), 1);
        assert_eq!(
            request.metadata().get(AUTHORIZATION_HEADER).unwrap().to_str().unwrap(),
            "Bearer new"
        );
    }

    #[test]
    fn test_non_ascii_rejected() {
        let err = ClientTokenInterceptor::bearer("tök\nen").unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }
}
