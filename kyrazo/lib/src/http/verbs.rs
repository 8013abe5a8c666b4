//! Method-shaped wrappers over [`HttpClient::execute`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{HttpClient, HttpMethod, QueryParams, RequestOptions, RequestSpec, ResponseEnvelope};
use crate::error::KyrazoError;

impl HttpClient {
    /// `GET path?query`.
    pub async fn get<T>(
        &self,
        path: &str,
        query: QueryParams,
        options: RequestOptions,
    ) -> Result<ResponseEnvelope<T>, KyrazoError>
    where
        T: DeserializeOwned,
    {
        let spec = RequestSpec::new(HttpMethod::Get, path)
            .query(query)
            .options(options);
        self.execute(spec).await
    }

    /// `POST path` with an optional JSON body.
    pub async fn post<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ResponseEnvelope<T>, KyrazoError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(with_body(HttpMethod::Post, path, body, options)?)
            .await
    }

    /// `PUT path` with an optional JSON body.
    pub async fn put<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ResponseEnvelope<T>, KyrazoError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(with_body(HttpMethod::Put, path, body, options)?)
            .await
    }

    /// `PATCH path` with an optional JSON body.
    pub async fn patch<T, B>(
        &self,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<ResponseEnvelope<T>, KyrazoError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(with_body(HttpMethod::Patch, path, body, options)?)
            .await
    }

    /// `DELETE path`.
    pub async fn delete<T>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseEnvelope<T>, KyrazoError>
    where
        T: DeserializeOwned,
    {
        self.execute(RequestSpec::new(HttpMethod::Delete, path).options(options))
            .await
    }
}

fn with_body<B: Serialize + ?Sized>(
    method: HttpMethod,
    path: &str,
    body: Option<&B>,
    options: RequestOptions,
) -> Result<RequestSpec, KyrazoError> {
    let spec = RequestSpec::new(method, path).options(options);
    match body {
        Some(body) => spec.body(body),
        None => Ok(spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    async fn client(server: &MockServer) -> HttpClient {
        let config = ClientConfig::builder("kz_verbs")
            .base_url(server.uri())
            .max_retries(0)
            .build()
            .unwrap();
        HttpClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_each_verb_reaches_the_right_method() {
        let server = MockServer::start().await;
        for verb in ["GET", "POST", "PUT", "PATCH", "DELETE"] {
            Mock::given(method(verb))
                .and(path("/v1/sources/p1/s1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "verb": verb })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let http = client(&server).await;
        let p = "/v1/sources/p1/s1";
        let none = None::<&Value>;

        let got: Value = http.get(p, QueryParams::new(), RequestOptions::new()).await.unwrap().into_data();
        assert_eq!(got["verb"], "GET");
        let got: Value = http.post(p, none, RequestOptions::new()).await.unwrap().into_data();
        assert_eq!(got["verb"], "POST");
        let got: Value = http.put(p, none, RequestOptions::new()).await.unwrap().into_data();
        assert_eq!(got["verb"], "PUT");
        let got: Value = http.patch(p, none, RequestOptions::new()).await.unwrap().into_data();
        assert_eq!(got["verb"], "PATCH");
        let got: Value = http.delete(p, RequestOptions::new()).await.unwrap().into_data();
        assert_eq!(got["verb"], "DELETE");
    }

    #[tokio::test]
    async fn test_post_without_body_sends_no_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/endpoints/p1/e1/secret"))
            .respond_with(|req: &Request| {
                ResponseTemplate::new(200).set_body_json(json!({ "len": req.body.len() }))
            })
            .mount(&server)
            .await;

        let http = client(&server).await;
        let got: Value = http
            .post("/v1/endpoints/p1/e1/secret", None::<&Value>, RequestOptions::new())
            .await
            .unwrap()
            .into_data();
        assert_eq!(got["len"], 0);
    }

    #[tokio::test]
    async fn test_patch_sends_body_and_call_headers() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/targets/p1/t1"))
            .and(header("x-trace", "t-1"))
            .and(body_json(json!({ "name": "primary" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
            .expect(1)
            .mount(&server)
            .await;

        let http = client(&server).await;
        let got: Value = http
            .patch(
                "/v1/targets/p1/t1",
                Some(&json!({ "name": "primary" })),
                RequestOptions::new().header("X-Trace", "t-1"),
            )
            .await
            .unwrap()
            .into_data();
        assert_eq!(got["updated"], true);
    }
}
