//! HTTP/JSON channel via reqwest.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use vexadb_common::error::{Error, Result};

use crate::ClientOptions;

pub(crate) struct HttpChannel {
    base_url: String,
    options: ClientOptions,
    client: reqwest::blocking::Client,
}

impl HttpChannel {
    pub(crate) fn new(address: &str, options: ClientOptions) -> Result<Self> {
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .build()
            .map_err(|_| Error::RuntimeError)?;
        Ok(HttpChannel {
            base_url,
            options,
            client,
        })
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.with_retry(|| self.client.get(format!("{}{}", self.base_url, path)).send())
    }

    pub(crate) fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.with_retry(|| {
            self.client
                .delete(format!("{}{}", self.base_url, path))
                .send()
        })
    }

    pub(crate) fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        self.with_retry(|| {
            self.client
                .post(format!("{}{}", self.base_url, path))
                .json(body)
                .send()
        })
    }

    fn with_retry<T: DeserializeOwned>(
        &self,
        send: impl Fn() -> reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<T> {
        let mut last_error = Error::RuntimeError;
        for attempt in 0..=self.options.retry_count {
            match send() {
                Ok(response) => {
                    return response.json::<T>().map_err(|_| Error::DeserializeError)
                }
                Err(err) => {
                    debug!(
                        "Http exchange failed. attempt[{}] url[{}] error[{}]",
                        attempt, self.base_url, err
                    );
                    last_error = Error::ReadData;
                }
            }
        }
        Err(last_error)
    }
}
