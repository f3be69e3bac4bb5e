use std::collections::HashMap;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::Directive;
use crate::DirectiveKind;
use crate::MdafError;
use crate::MdafResult;
use crate::Resolve;

/// Resolves file targets from disk and web targets from an in-memory map, so
/// tests never touch the network.
#[derive(Default)]
pub struct StubResolver {
	pages: HashMap<String, String>,
	delay: Option<Duration>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}

impl StubResolver {
	pub fn with_page(mut self, url: &str, body: &str) -> Self {
		self.pages.insert(url.to_string(), body.to_string());
		self
	}

	/// Make every resolution sleep before answering.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	/// Highest number of resolutions that were running at the same time.
	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	async fn lookup(&self, directive: &Directive, document_dir: &Path) -> MdafResult<String> {
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}

		match directive.kind {
			DirectiveKind::File => {
				let path = document_dir.join(&directive.target);
				tokio::fs::read_to_string(&path).await.map_err(|e| {
					MdafError::Resolution {
						target: path.display().to_string(),
						reason: e.to_string(),
					}
				})
			}
			DirectiveKind::Web => {
				self.pages.get(&directive.target).cloned().ok_or_else(|| {
					MdafError::Resolution {
						target: directive.target.clone(),
						reason: "HTTP 404".to_string(),
					}
				})
			}
		}
	}
}

impl Resolve for StubResolver {
	async fn resolve(&self, directive: &Directive, document_dir: &Path) -> MdafResult<String> {
		let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_in_flight.fetch_max(current, Ordering::SeqCst);
		let result = self.lookup(directive, document_dir).await;
		self.in_flight.fetch_sub(1, Ordering::SeqCst);
		result
	}
}

/// Write `content` to `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create {parent:?}: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {path:?}: {e}"));
	path
}

/// Serve `routes` (path, status, body) over plain HTTP on a local port and
/// return the base url. Unknown paths answer 404. The server thread lives
/// until the test process exits.
pub fn serve_http(routes: &[(&str, u16, &str)]) -> String {
	let listener =
		TcpListener::bind("127.0.0.1:0").unwrap_or_else(|e| panic!("bind test server: {e}"));
	let address = listener
		.local_addr()
		.unwrap_or_else(|e| panic!("test server address: {e}"));
	let routes: HashMap<String, (u16, String)> = routes
		.iter()
		.map(|(path, status, body)| ((*path).to_string(), (*status, (*body).to_string())))
		.collect();

	std::thread::spawn(move || {
		for stream in listener.incoming() {
			let Ok(mut stream) = stream else {
				continue;
			};
			let Ok(reader_stream) = stream.try_clone() else {
				continue;
			};

			let mut reader = BufReader::new(reader_stream);
			let mut request_line = String::new();
			if reader.read_line(&mut request_line).is_err() {
				continue;
			}
			// Drain the headers.
			let mut header = String::new();
			while reader.read_line(&mut header).is_ok_and(|read| read > 2) {
				header.clear();
			}

			let path = request_line.split_whitespace().nth(1).unwrap_or("/");
			let (status, body) = routes
				.get(path)
				.cloned()
				.unwrap_or_else(|| (404, "not found".to_string()));
			let response = format!(
				"HTTP/1.1 {status} Status\r\nContent-Type: text/plain\r\nContent-Length: \
				 {}\r\nConnection: close\r\n\r\n{body}",
				body.len()
			);
			let _ = stream.write_all(response.as_bytes());
		}
	});

	format!("http://{address}")
}

pub const CONCRETE_INPUT: &str = "line1\n<!-- add-file: sub/code.py -->\nline2";

pub const CONCRETE_OUTPUT: &str =
	"line1\n<!-- add-file: sub/code.py -->\n\n``` py markdown-add-files\nprint(1)\n```\nline2";
