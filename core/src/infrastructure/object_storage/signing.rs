//! SigV4 query-string signing for requests the SDK cannot presign itself
//! (bucket listings and ACL updates).

use std::time::{Duration, SystemTime};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use aws_sdk_s3::config::Credentials;
use aws_sigv4::{
    http_request::{
        PercentEncodingMode, SignableBody, SignableRequest, SignatureLocation, SigningParams,
        SigningSettings, UriPathNormalizationMode, sign,
    },
    sign::v4,
};
use url::Url;

use crate::domain::common::entities::app_errors::CoreError;

/// SigV4 `UriEncode`: everything but `A-Za-z0-9-_.~` is escaped.
const URI_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Builds request URLs for a bucket endpoint, path-style or virtual-hosted.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    endpoint: Url,
    force_path_style: bool,
}

impl EndpointResolver {
    pub fn new(
        endpoint: Option<&str>,
        region: &str,
        force_path_style: bool,
    ) -> Result<Self, CoreError> {
        let raw = match endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://s3.{region}.amazonaws.com"),
        };
        let endpoint = Url::parse(&raw)
            .map_err(|e| CoreError::Configuration(format!("invalid endpoint '{raw}': {e}")))?;
        if endpoint.cannot_be_a_base() || endpoint.host_str().is_none() {
            return Err(CoreError::Configuration(format!(
                "endpoint '{raw}' has no host"
            )));
        }

        Ok(Self {
            endpoint,
            force_path_style,
        })
    }

    /// URL addressing `bucket`, or an object in it when `object_key` is set.
    /// Path segments are escaped the way SigV4 canonicalizes them, so the
    /// signed path is the one the store rebuilds.
    pub fn url(&self, bucket: &str, object_key: Option<&str>) -> Result<Url, CoreError> {
        let mut url = self.endpoint.clone();

        if !self.force_path_style {
            let host = url.host_str().unwrap_or_default().to_string();
            url.set_host(Some(&format!("{bucket}.{host}")))
                .map_err(|e| CoreError::Configuration(format!("invalid bucket host: {e}")))?;
        }

        let mut path = url.path().trim_end_matches('/').to_string();
        if self.force_path_style {
            path.push('/');
            path.extend(utf8_percent_encode(bucket, URI_SEGMENT));
        }
        match object_key {
            Some(object_key) => {
                for segment in object_key.split('/') {
                    path.push('/');
                    path.extend(utf8_percent_encode(segment, URI_SEGMENT));
                }
            }
            None if !self.force_path_style => path.push('/'),
            None => {}
        }
        url.set_path(&path);

        Ok(url)
    }
}

/// Appends SigV4 query parameters to `url` so it can be redeemed without
/// further credentials. Any query already on `url` is covered by the
/// signature.
pub fn presign_url(
    method: &str,
    mut url: Url,
    credentials: Credentials,
    region: &str,
    expires_in: Duration,
    now: SystemTime,
) -> Result<Url, CoreError> {
    let identity = credentials.into();

    let mut settings = SigningSettings::default();
    settings.signature_location = SignatureLocation::QueryParams;
    settings.expires_in = Some(expires_in);
    settings.percent_encoding_mode = PercentEncodingMode::Single;
    settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;

    let params: SigningParams<'_> = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name("s3")
        .time(now)
        .settings(settings)
        .build()
        .map_err(|e| CoreError::Configuration(format!("invalid signing parameters: {e}")))?
        .into();

    let instructions = {
        let signable = SignableRequest::new(
            method,
            url.as_str(),
            std::iter::empty::<(&str, &str)>(),
            SignableBody::UnsignedPayload,
        )
        .map_err(|e| CoreError::Invalid(format!("cannot sign request: {e}")))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| CoreError::Invalid(format!("cannot sign request: {e}")))?
            .into_parts();
        instructions
    };

    let (_headers, query) = instructions.into_parts();
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, &value);
        }
    }

    Ok(url)
}
