use std::future::Future;
use std::path::Path;
use std::time::Duration;

use ureq::Agent;

use crate::Directive;
use crate::DirectiveKind;
use crate::MdafError;
use crate::MdafResult;

/// Default per-resolution timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns a directive into the raw text it points at.
///
/// Implementations must not touch the document being processed. The
/// returned future is spawned onto the runtime, so it must be `Send`.
pub trait Resolve: Send + Sync + 'static {
	/// Resolve `directive`. File targets are relative to `document_dir`, the
	/// directory holding the document that contains the directive.
	fn resolve(
		&self,
		directive: &Directive,
		document_dir: &Path,
	) -> impl Future<Output = MdafResult<String>> + Send;
}

/// Reads local files from disk and fetches web targets over HTTP(S).
#[derive(Clone)]
pub struct ContentResolver {
	/// HTTP agent shared by every fetch for connection pooling.
	agent: Agent,
}

impl Default for ContentResolver {
	fn default() -> Self {
		Self::new(DEFAULT_TIMEOUT)
	}
}

impl ContentResolver {
	pub fn new(timeout: Duration) -> Self {
		Self {
			agent: create_agent(timeout),
		}
	}

	/// Read a file target relative to `document_dir`.
	pub async fn read_file(&self, target: &str, document_dir: &Path) -> MdafResult<String> {
		let path = document_dir.join(target);
		tokio::fs::read_to_string(&path)
			.await
			.map_err(|e| {
				MdafError::Resolution {
					target: path.display().to_string(),
					reason: e.to_string(),
				}
			})
	}

	/// Fetch a web target and return the whole response body.
	///
	/// `ureq` is blocking, so the request runs on the blocking thread pool.
	pub async fn fetch(&self, url: &str) -> MdafResult<String> {
		let agent = self.agent.clone();
		let owned_url = url.to_string();

		tokio::task::spawn_blocking(move || fetch_blocking(&agent, &owned_url))
			.await
			.map_err(|e| {
				MdafError::Resolution {
					target: url.to_string(),
					reason: e.to_string(),
				}
			})?
	}
}

impl Resolve for ContentResolver {
	async fn resolve(&self, directive: &Directive, document_dir: &Path) -> MdafResult<String> {
		match directive.kind {
			DirectiveKind::File => self.read_file(&directive.target, document_dir).await,
			DirectiveKind::Web => self.fetch(&directive.target).await,
		}
	}
}

/// Create an HTTP agent with a global timeout. Status codes are checked by
/// the caller rather than turned into transport errors.
fn create_agent(timeout: Duration) -> Agent {
	Agent::config_builder()
		.timeout_global(Some(timeout))
		.http_status_as_error(false)
		.build()
		.into()
}

fn fetch_blocking(agent: &Agent, url: &str) -> MdafResult<String> {
	let failure = |reason: String| {
		MdafError::Resolution {
			target: url.to_string(),
			reason,
		}
	};

	let response = agent.get(url).call().map_err(|e| failure(e.to_string()))?;
	let status = response.status();
	if !status.is_success() {
		return Err(failure(format!("HTTP {}", status.as_u16())));
	}

	let mut body = response.into_body();
	body.read_to_string().map_err(|e| failure(e.to_string()))
}
