//! Stub servers and helpers shared by the tests.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use hyper::body::Incoming;
use hyper::header::LOCATION;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::{X509, X509NameBuilder};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket};
use tokio_native_tls::TlsAcceptor;

use crate::config::{setup_http_client, setup_resolver, setup_tls_connector};
use crate::http_probe::prelude::*;
use crate::reporter::Reporter;

pub fn checker() -> TargetChecker {
    checker_with(Duration::from_secs(10), true)
}

pub fn strict_checker() -> TargetChecker {
    checker_with(Duration::from_secs(10), false)
}

pub fn checker_with_timeout(timeout: Duration) -> TargetChecker {
    checker_with(timeout, true)
}

fn checker_with(timeout: Duration, accept_invalid_certs: bool) -> TargetChecker {
    TargetChecker::new(
        setup_http_client(timeout, accept_invalid_certs).unwrap(),
        setup_tls_connector(accept_invalid_certs).unwrap(),
        setup_resolver(&[]).unwrap(),
        timeout,
    )
}

/// Records reported urls in the order they arrived.
#[derive(Default)]
pub struct RecordingReporter {
    entries: Mutex<Vec<(String, Instant)>>,
}

impl RecordingReporter {
    pub fn entries(&self) -> Vec<(String, Instant)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries().into_iter().map(|(url, _)| url).collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, url: &str, _outcome: &Outcome) {
        self.entries
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
    }
}

pub struct SelfSigned {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
    pub der: Vec<u8>,
    pub not_after_unix: i64,
}

pub fn self_signed_expiring_in(days: i64) -> SelfSigned {
    self_signed_expiring_at(Utc::now().timestamp() + days * 86_400)
}

pub fn self_signed_expiring_at(not_after_unix: i64) -> SelfSigned {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "localhost").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(not_after_unix).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    SelfSigned {
        cert_pem: cert.to_pem().unwrap(),
        key_pem: key.private_key_to_pem_pkcs8().unwrap(),
        der: cert.to_der().unwrap(),
        not_after_unix,
    }
}

#[derive(Clone)]
struct Reply {
    status: u16,
    delay: Duration,
    location: Option<String>,
}

async fn serve<I>(io: I, reply: Reply)
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |_req: Request<Incoming>| {
        let reply = reply.clone();
        async move {
            tokio::time::sleep(reply.delay).await;
            let mut response = Response::new(String::from("ok"));
            *response.status_mut() = StatusCode::from_u16(reply.status).unwrap();
            if let Some(location) = reply.location {
                response
                    .headers_mut()
                    .insert(LOCATION, location.parse().unwrap());
            }
            Ok::<_, Infallible>(response)
        }
    });
    let _ = http1::Builder::new()
        .serve_connection(TokioIo::new(io), service)
        .await;
}

async fn spawn_plain(reply: Reply) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, reply.clone()));
        }
    });
    addr
}

/// Plain HTTP server answering every request with `status` after `delay`.
pub async fn spawn_http(status: u16, delay: Duration) -> SocketAddr {
    spawn_plain(Reply {
        status,
        delay,
        location: None,
    })
    .await
}

/// Plain HTTP server redirecting every request to `location`.
pub async fn spawn_redirect(location: String) -> SocketAddr {
    spawn_plain(Reply {
        status: 302,
        delay: Duration::ZERO,
        location: Some(location),
    })
    .await
}

fn acceptor(cert: &SelfSigned) -> TlsAcceptor {
    let identity = native_tls::Identity::from_pkcs8(&cert.cert_pem, &cert.key_pem).unwrap();
    TlsAcceptor::from(native_tls::TlsAcceptor::new(identity).unwrap())
}

/// HTTPS server presenting `cert` on every connection.
pub async fn spawn_https(status: u16, cert: &SelfSigned) -> SocketAddr {
    let acceptor = acceptor(cert);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = Reply {
        status,
        delay: Duration::ZERO,
        location: None,
    };
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let reply = reply.clone();
            tokio::spawn(async move {
                // The certificate probe hangs up right after the handshake.
                if let Ok(tls) = acceptor.accept(stream).await {
                    serve(tls, reply).await;
                }
            });
        }
    });
    addr
}

/// HTTPS server that accepts a single connection and then stops listening,
/// so any further dial is refused.
pub async fn spawn_https_single(status: u16, cert: &SelfSigned) -> SocketAddr {
    let acceptor = acceptor(cert);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reply = Reply {
        status,
        delay: Duration::ZERO,
        location: None,
    };
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        drop(listener);
        if let Ok(tls) = acceptor.accept(stream).await {
            serve(tls, reply).await;
        }
    });
    addr
}

/// A port that is bound but never listened on, so connects are refused.
/// The port stays reserved for as long as the value lives.
pub struct ClosedPort {
    pub addr: SocketAddr,
    _socket: TcpSocket,
}

pub fn closed_port() -> ClosedPort {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = socket.local_addr().unwrap();
    ClosedPort {
        addr,
        _socket: socket,
    }
}
