//! In-process stand-in for the Datadog API, used by submitter tests.

// External crates
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Incoming,
    header::CONTENT_TYPE,
    http::{Request, Response, StatusCode},
    service::service_fn,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder as HyperServerBuilder,
};
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};

/// What the fake API saw of one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub api_key: Option<String>,
    pub app_key: Option<String>,
    pub body: Vec<u8>,
}

/// Accepts every request, records it, and answers with a fixed status and body.
#[derive(Debug)]
pub struct FakeDatadog {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    accept_loop: JoinHandle<()>,
}

impl FakeDatadog {
    pub async fn start(status: u16, response_body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let status = StatusCode::from_u16(status).unwrap();

        let recorded = Arc::clone(&requests);
        let accept_loop = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let io = TokioIo::new(stream);
                let recorded = Arc::clone(&recorded);

                let service = service_fn(move |req: Request<Incoming>| {
                    let recorded = Arc::clone(&recorded);
                    async move {
                        let header = |name: &str| {
                            req.headers()
                                .get(name)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string)
                        };
                        let method = req.method().to_string();
                        let path = req.uri().path().to_string();
                        let api_key = header("DD-API-KEY");
                        let app_key = header("DD-APPLICATION-KEY");
                        let body = req.into_body().collect().await.unwrap().to_bytes();

                        recorded.lock().await.push(RecordedRequest {
                            method,
                            path,
                            api_key,
                            app_key,
                            body: body.to_vec(),
                        });

                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .header(CONTENT_TYPE, "application/json")
                                .body(Full::new(Bytes::from_static(response_body.as_bytes())))
                                .unwrap(),
                        )
                    }
                });

                tokio::spawn(async move {
                    let _ = HyperServerBuilder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        Self {
            addr,
            requests,
            accept_loop,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

impl Drop for FakeDatadog {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}
