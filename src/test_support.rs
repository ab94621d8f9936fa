// src/test_support.rs
// =============================================================================
// A tiny in-process HTTP responder for tests.
//
// It speaks just enough HTTP/1.1 for reqwest: read the request head, answer
// with a canned status line and close the connection. Each route can reply
// with a plain status, a redirect, or hang forever (for timeout tests).
// Every request head is recorded so tests can assert on method and headers.
//
// `start_tls` serves the same routes over HTTPS with a freshly generated
// self-signed certificate, which no client trusts unless told to skip
// verification.
// =============================================================================

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(u16),
    Redirect(u16, &'static str),
    Hang,
}

pub struct TestServer {
    scheme: &'static str,
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Binds 127.0.0.1 on a random port. Unknown paths get a 404.
    pub async fn start(routes: &[(&'static str, Reply)]) -> Self {
        Self::serve(routes, None).await
    }

    /// Like `start`, but every connection is wrapped in TLS with a
    /// self-signed certificate for localhost / 127.0.0.1.
    pub async fn start_tls(routes: &[(&'static str, Reply)]) -> Self {
        Self::serve(routes, Some(self_signed_acceptor())).await
    }

    async fn serve(routes: &[(&'static str, Reply)], tls: Option<TlsAcceptor>) -> Self {
        let scheme = if tls.is_some() { "https" } else { "http" };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<&'static str, Reply>> = Arc::new(routes.iter().copied().collect());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = requests.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let seen = seen.clone();
                let tls = tls.clone();
                tokio::spawn(async move {
                    // a client that rejects the certificate aborts the handshake
                    let _ = match tls {
                        Some(acceptor) => match acceptor.accept(stream).await {
                            Ok(stream) => handle(stream, &routes, &seen).await,
                            Err(e) => Err(e),
                        },
                        None => handle(stream, &routes, &seen).await,
                    };
                });
            }
        });

        Self {
            scheme,
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.addr, path)
    }

    /// Raw request heads received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn self_signed_acceptor() -> TlsAcceptor {
    let certified =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
            .unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![certified.cert.der().clone()], key)
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

async fn handle<S>(
    stream: S,
    routes: &HashMap<&'static str, Reply>,
    seen: &Mutex<Vec<String>>,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 || line == "\r\n" {
            break;
        }
        head.push_str(&line);
    }
    seen.lock().unwrap().push(head.clone());

    let mut parts = head.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or("/");

    let (code, location) = match routes.get(path).copied().unwrap_or(Reply::Status(404)) {
        Reply::Status(code) => (code, None),
        Reply::Redirect(code, to) => (code, Some(to)),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return Ok(());
        }
    };

    let body = if method == "HEAD" { "" } else { "ok" };
    let mut response = format!("HTTP/1.1 {code} Test\r\nContent-Length: 2\r\nConnection: close\r\n");
    if let Some(to) = location {
        response.push_str(&format!("Location: {to}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(body);

    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// A `Write` sink that can be read back after being moved into a task.
#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
