#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod fixtures {
    use detectors::pipeline::{build_named, gateway_registrations, PipelineInstance, Registrations};
    use detectors::store::{ConnectionCatalog, MemoryStore};
    use std::sync::Arc;

    pub const CONNECTION: &str = "local";

    /// `local` connection with:
    /// - db 0: `mykey` = [A, B, C], `pair` = [A, B], `bin` = [ff 00]
    /// - db 2: `other` = [x]
    /// - db 0: `big` = 1000 elements
    pub fn seeded_catalog() -> Arc<ConnectionCatalog> {
        let store = MemoryStore::new();
        store.push(0, "mykey", ["A", "B", "C"]).unwrap();
        store.push(0, "pair", ["A", "B"]).unwrap();
        store.push(0, "bin", [vec![0xff_u8, 0x00]]).unwrap();
        store.push(2, "other", ["x"]).unwrap();
        store
            .push(0, "big", (0..1000).map(|i| format!("item-{i}")))
            .unwrap();
        Arc::new(ConnectionCatalog::new().with_connection(CONNECTION, Arc::new(store)))
    }

    pub fn registrations(
        catalog: &Arc<ConnectionCatalog>,
        default_media_type: Option<&str>,
    ) -> Registrations {
        super::test_server::setup_may_runtime();
        gateway_registrations(catalog, default_media_type)
    }

    pub fn instance(catalog: &Arc<ConnectionCatalog>, default_media_type: Option<&str>) -> PipelineInstance {
        build_named(&registrations(catalog, default_media_type), "test").unwrap()
    }

    pub fn list_path(key: &str, rest: &str) -> String {
        format!("/api/redis/connection/{CONNECTION}/list/{key}{rest}")
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    #[derive(Debug)]
    pub struct RawResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    /// Send a GET with `Connection: close` and read the full response.
    pub fn get(addr: &SocketAddr, path: &str, headers: &[(&str, &str)]) -> RawResponse {
        let mut req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
        for (k, v) in headers {
            req.push_str(&format!("{k}: {v}\r\n"));
        }
        req.push_str("\r\n");
        parse(&send_request(addr, &req))
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let mut buf = Vec::new();
        let mut tmp = [0u8; 4096];
        loop {
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&tmp[..n]);
                    if complete(&buf) {
                        break;
                    }
                }
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        buf
    }

    fn split_head(buf: &[u8]) -> Option<(usize, &[u8])> {
        let end = buf.windows(4).position(|w| w == b"\r\n\r\n")?;
        Some((end + 4, &buf[..end]))
    }

    fn content_length(head: &[u8]) -> usize {
        String::from_utf8_lossy(head)
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| v.trim().parse().ok())
                    .flatten()
            })
            .unwrap_or(0)
    }

    fn complete(buf: &[u8]) -> bool {
        match split_head(buf) {
            Some((body_start, head)) => buf.len() >= body_start + content_length(head),
            None => false,
        }
    }

    pub fn parse(buf: &[u8]) -> RawResponse {
        let (body_start, head) = split_head(buf).expect("incomplete HTTP response");
        let head = String::from_utf8_lossy(head);
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .expect("status line");
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        let length = content_length(head.as_bytes());
        let end = (body_start + length).min(buf.len());
        RawResponse {
            status,
            headers,
            body: buf[body_start..end].to_vec(),
        }
    }
}

pub mod tracing_capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Installs a test-writer subscriber for the current thread.
    pub struct TestTracing {
        _guard: tracing::subscriber::DefaultGuard,
    }

    /// Log lines written while a capturing [`TestTracing`] is active.
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl TestTracing {
        pub fn init() -> Self {
            let subscriber = tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            Self {
                _guard: tracing::subscriber::set_default(subscriber),
            }
        }

        /// Like [`init`](Self::init) but keeps the output for assertions.
        pub fn capture() -> (Self, CapturedLogs) {
            let logs = CapturedLogs::default();
            let writer = logs.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            let tracing = Self {
                _guard: tracing::subscriber::set_default(subscriber),
            };
            (tracing, logs)
        }
    }
}
