//! テスト用のHTTPサーバー
//!
//! パスの前方一致で固定の応答を返し、受け付けたリクエストを記録します。

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use reqwest::blocking::Client;

use crate::api::RenderConfig;

/// 固定の応答
#[derive(Debug, Clone)]
pub(crate) struct CannedResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl CannedResponse {
    pub fn new(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self::new(200, content_type, body)
    }

    pub fn error(status: u16) -> Self {
        Self::new(status, "text/plain", b"error".to_vec())
    }
}

pub(crate) struct StubServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// `routes`は(パスの接頭辞, 応答)の組。一致しないリクエストには404を返す
    pub fn start(routes: Vec<(&'static str, CannedResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                respond(stream, &routes, &log);
            }
        });

        Self { base, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// 受け付けたリクエスト（"METHOD /path"の形式、受信順）
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// `/chart`、`/kroki`、`/ink`をエンドポイントとする描画設定
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            chart_endpoint: self.url("/chart"),
            diagram_endpoint: self.url("/kroki"),
            diagram_fallback_endpoint: self.url("/ink"),
            timeout: Duration::from_secs(5),
            fallback_timeout: Duration::from_secs(5),
            ..RenderConfig::default()
        }
    }
}

/// システムのプロキシ設定を無視するクライアント
pub(crate) fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

/// 単色のPNG
pub(crate) fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([30, 144, 255, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn respond(mut stream: TcpStream, routes: &[(&str, CannedResponse)], log: &Mutex<Vec<String>>) {
    let Some((method, path)) = read_request(&mut stream) else {
        return;
    };
    log.lock().unwrap().push(format!("{} {}", method, path));

    let response = routes
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, response)| response.clone())
        .unwrap_or_else(|| CannedResponse::error(404));

    let head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
}

/// リクエストを本文まで読み取り、メソッドとパスを返す
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut received = buffer.len() - header_end;
    while received < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        received += n;
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    Some((method, path))
}
