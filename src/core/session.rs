//! Directory session management.
//!
//! A session is an access token plus the delegated scopes it was granted.
//! [`establish_session`] always asks for the same configured scope set,
//! reusing a cached session only when it already covers every scope.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ConnectionError;

/// An authenticated session with the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    /// Granted scopes, short form (e.g. `User.ReadWrite.All`).
    pub scopes: Vec<String>,
    /// Expiry as seconds since the Unix epoch.
    pub expires_at: u64,
}

impl Session {
    /// Whether the session grants every scope in `required`.
    #[must_use]
    pub fn covers(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|r| self.scopes.iter().any(|s| s.eq_ignore_ascii_case(r)))
    }

    /// Whether the session expires within the safety margin of `now`.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now + constants::SESSION_EXPIRY_SLACK_SECS
    }
}

/// Source of directory sessions.
pub trait Authenticator {
    /// The session currently held, if any.
    fn current_session(&self) -> Option<Session>;

    /// Establishes a new session with exactly the given scopes.
    fn connect(&mut self, scopes: &[String]) -> Result<Session, ConnectionError>;

    /// Drops the current session.
    fn disconnect(&mut self) -> Result<(), ConnectionError>;
}

/// Returns a session holding `required`, creating one if needed.
///
/// # Errors
///
/// Returns [`ConnectionError`] if a new session cannot be established.
pub fn establish_session(
    auth: &mut dyn Authenticator,
    required: &[String],
) -> Result<Session, ConnectionError> {
    if let Some(current) = auth.current_session() {
        if current.covers(required) && !current.is_expired(unix_now()) {
            log::info!("Reusing existing directory session");
            return Ok(current);
        }
        log::info!("Existing session is expired or lacks scopes; reconnecting");
        auth.disconnect()?;
    }
    auth.connect(required)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

// ── Pre-issued token ────────────────────────────────────────────────────────

/// Uses a bearer token obtained outside skuctl.
///
/// The token's scopes cannot be inspected, so it is assumed to carry the
/// requested ones.
pub struct TokenAuthenticator {
    token: String,
    session: Option<Session>,
}

impl TokenAuthenticator {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            session: None,
        }
    }
}

impl Authenticator for TokenAuthenticator {
    fn current_session(&self) -> Option<Session> {
        self.session.clone()
    }

    fn connect(&mut self, scopes: &[String]) -> Result<Session, ConnectionError> {
        let session = Session {
            access_token: self.token.clone(),
            scopes: scopes.to_vec(),
            expires_at: u64::MAX,
        };
        self.session = Some(session.clone());
        Ok(session)
    }

    fn disconnect(&mut self) -> Result<(), ConnectionError> {
        self.session = None;
        Ok(())
    }
}

// ── Device code login ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    message: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    scope: String,
}

#[derive(Deserialize)]
struct TokenError {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Interactive OAuth2 device authorization grant.
///
/// The obtained session is cached on disk so later runs can reuse it.
pub struct DeviceCodeAuthenticator {
    http: Client,
    authority: String,
    tenant: String,
    client_id: String,
    cache_path: Option<PathBuf>,
    open_browser: bool,
    poll_interval: Duration,
}

impl DeviceCodeAuthenticator {
    /// Creates an authenticator for the given tenant and public client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        authority: &str,
        tenant: &str,
        client_id: &str,
        open_browser: bool,
    ) -> Result<Self, ConnectionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(constants::HTTP_TIMEOUT_SECS))
            .user_agent(format!("{}/{}", constants::APP_NAME, constants::APP_VERSION))
            .build()?;
        let cache_path = dirs::cache_dir().map(|d| {
            d.join(constants::APP_NAME)
                .join(format!("{tenant}-{}", constants::SESSION_FILE_NAME))
        });
        Ok(Self {
            http,
            authority: authority.trim_end_matches('/').to_string(),
            tenant: tenant.to_string(),
            client_id: client_id.to_string(),
            cache_path,
            open_browser,
            poll_interval: constants::DEVICE_POLL_INTERVAL,
        })
    }

    /// Overrides where the session is cached. `None` disables caching.
    #[must_use]
    pub fn with_cache_path(mut self, cache_path: Option<PathBuf>) -> Self {
        self.cache_path = cache_path;
        self
    }

    /// Overrides the polling interval used when the server does not send one.
    /// A `slow_down` reply adds this much to the current interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}/oauth2/v2.0/{name}", self.authority, self.tenant)
    }

    fn request_device_code(&self, scope: &str) -> Result<DeviceCodeResponse, ConnectionError> {
        let response = self
            .http
            .post(self.endpoint("devicecode"))
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope)])
            .send()?;
        if !response.status().is_success() {
            return Err(denied(response));
        }
        Ok(response.json()?)
    }

    fn poll_token(&self, code: &DeviceCodeResponse) -> Result<TokenResponse, ConnectionError> {
        let mut interval = code
            .interval
            .map_or(self.poll_interval, Duration::from_secs);
        let deadline = unix_now() + code.expires_in;

        while unix_now() < deadline {
            thread::sleep(interval);
            let response = self
                .http
                .post(self.endpoint("token"))
                .form(&[
                    ("grant_type", constants::DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", code.device_code.as_str()),
                ])
                .send()?;
            if response.status().is_success() {
                return Ok(response.json()?);
            }

            let err: TokenError = response.json()?;
            match err.error.as_str() {
                "authorization_pending" => {}
                "slow_down" => interval += self.poll_interval,
                "expired_token" => return Err(ConnectionError::Expired),
                _ => {
                    return Err(ConnectionError::Denied {
                        code: err.error,
                        description: err.error_description,
                    })
                }
            }
        }
        Err(ConnectionError::Expired)
    }

    fn save(&self, session: &Session) -> Result<(), ConnectionError> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConnectionError::Cache(e.to_string()))?;
        }
        let json =
            serde_json::to_string(session).map_err(|e| ConnectionError::Cache(e.to_string()))?;
        write_private(path, json.as_bytes()).map_err(|e| ConnectionError::Cache(e.to_string()))
    }
}

impl Authenticator for DeviceCodeAuthenticator {
    fn current_session(&self) -> Option<Session> {
        let content = std::fs::read_to_string(self.cache_path.as_ref()?).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("Ignoring unreadable session cache: {e}");
                None
            }
        }
    }

    fn connect(&mut self, scopes: &[String]) -> Result<Session, ConnectionError> {
        let scope = qualify_scopes(scopes);
        log::info!("Requesting device login for scopes: {scope}");

        let code = self.request_device_code(&scope)?;
        println!("\n{}\n", code.message);
        if self.open_browser && open::that(&code.verification_uri).is_err() {
            log::warn!("Could not open {}", code.verification_uri);
        }

        let token = self.poll_token(&code)?;
        let granted = if token.scope.is_empty() {
            scopes.to_vec()
        } else {
            short_scopes(&token.scope)
        };
        let session = Session {
            access_token: token.access_token,
            scopes: granted,
            expires_at: unix_now() + token.expires_in,
        };
        if let Err(e) = self.save(&session) {
            log::warn!("Session not cached: {e}");
        }
        Ok(session)
    }

    fn disconnect(&mut self) -> Result<(), ConnectionError> {
        if let Some(path) = &self.cache_path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ConnectionError::Cache(e.to_string())),
            }
        }
        Ok(())
    }
}

fn denied(response: reqwest::blocking::Response) -> ConnectionError {
    let status = response.status();
    match response.json::<TokenError>() {
        Ok(err) => ConnectionError::Denied {
            code: err.error,
            description: err.error_description,
        },
        Err(_) => ConnectionError::Denied {
            code: status.as_u16().to_string(),
            description: status.canonical_reason().unwrap_or("").to_string(),
        },
    }
}

/// Turns short scope names into resource-qualified Graph scopes.
fn qualify_scopes(scopes: &[String]) -> String {
    scopes
        .iter()
        .map(|s| {
            if s.contains("://") {
                s.clone()
            } else {
                format!("{}{s}", constants::GRAPH_SCOPE_PREFIX)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips the resource prefix from a space-separated scope list.
fn short_scopes(scope: &str) -> Vec<String> {
    scope
        .split_whitespace()
        .map(|s| s.trim_start_matches(constants::GRAPH_SCOPE_PREFIX).to_string())
        .collect()
}

/// Writes a file readable only by its owner.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // An existing file keeps its old mode on open.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Runtime;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    /// Authenticator that records its lifecycle calls.
    #[derive(Default)]
    struct FakeAuth {
        current: Option<Session>,
        log: Vec<String>,
        fail: bool,
    }

    impl Authenticator for FakeAuth {
        fn current_session(&self) -> Option<Session> {
            self.current.clone()
        }

        fn connect(&mut self, scopes: &[String]) -> Result<Session, ConnectionError> {
            self.log.push(format!("connect {}", scopes.join(",")));
            if self.fail {
                return Err(ConnectionError::Denied {
                    code: "access_denied".into(),
                    description: "user declined".into(),
                });
            }
            let session = Session {
                access_token: "new".into(),
                scopes: scopes.to_vec(),
                expires_at: u64::MAX,
            };
            self.current = Some(session.clone());
            Ok(session)
        }

        fn disconnect(&mut self) -> Result<(), ConnectionError> {
            self.log.push("disconnect".into());
            self.current = None;
            Ok(())
        }
    }

    fn required() -> Vec<String> {
        scopes(&constants::DEFAULT_SCOPES)
    }

    #[test]
    fn test_connects_when_no_session() {
        let mut auth = FakeAuth::default();
        let session = establish_session(&mut auth, &required()).unwrap();
        assert_eq!(session.scopes, required());
        assert_eq!(
            auth.log,
            vec!["connect User.ReadWrite.All,Organization.Read.All,Group.ReadWrite.All"]
        );
    }

    #[test]
    fn test_reconnects_with_same_scopes_when_session_lacks_one() {
        let mut auth = FakeAuth {
            current: Some(Session {
                access_token: "old".into(),
                scopes: scopes(&["User.ReadWrite.All", "Organization.Read.All"]),
                expires_at: u64::MAX,
            }),
            ..FakeAuth::default()
        };
        let session = establish_session(&mut auth, &required()).unwrap();
        assert_eq!(session.access_token, "new");
        assert_eq!(auth.log[0], "disconnect");
        assert_eq!(
            auth.log[1],
            "connect User.ReadWrite.All,Organization.Read.All,Group.ReadWrite.All"
        );
    }

    #[test]
    fn test_reuses_covering_session() {
        let mut auth = FakeAuth {
            current: Some(Session {
                access_token: "old".into(),
                scopes: scopes(&[
                    "user.readwrite.all",
                    "Organization.Read.All",
                    "Group.ReadWrite.All",
                    "openid",
                ]),
                expires_at: u64::MAX,
            }),
            ..FakeAuth::default()
        };
        let session = establish_session(&mut auth, &required()).unwrap();
        assert_eq!(session.access_token, "old");
        assert!(auth.log.is_empty());
    }

    #[test]
    fn test_reconnects_expired_session() {
        let mut auth = FakeAuth {
            current: Some(Session {
                access_token: "old".into(),
                scopes: required(),
                expires_at: 1,
            }),
            ..FakeAuth::default()
        };
        establish_session(&mut auth, &required()).unwrap();
        assert_eq!(auth.log.len(), 2);
    }

    #[test]
    fn test_connect_failure_is_connection_error() {
        let mut auth = FakeAuth {
            fail: true,
            ..FakeAuth::default()
        };
        let err = establish_session(&mut auth, &required()).unwrap_err();
        assert!(matches!(err, ConnectionError::Denied { .. }));
    }

    #[test]
    fn test_scope_qualification() {
        assert_eq!(
            qualify_scopes(&scopes(&["User.ReadWrite.All", "https://other/x"])),
            "https://graph.microsoft.com/User.ReadWrite.All https://other/x"
        );
        assert_eq!(
            short_scopes("https://graph.microsoft.com/User.ReadWrite.All openid"),
            scopes(&["User.ReadWrite.All", "openid"])
        );
    }

    #[test]
    fn test_token_authenticator() {
        let mut auth = TokenAuthenticator::new("abc".into());
        assert!(auth.current_session().is_none());
        let session = establish_session(&mut auth, &required()).unwrap();
        assert_eq!(session.access_token, "abc");
        assert!(session.covers(&required()));
    }

    // ── Device login against a mock token endpoint ──────────────────────────

    const TENANT: &str = "contoso";

    fn token_error(code: &str) -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": code,
            "error_description": format!("{code} from server"),
        }))
    }

    /// Starts a token server whose device code endpoint always succeeds.
    fn token_server(rt: &Runtime, expires_in: u64) -> MockServer {
        rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(format!("/{TENANT}/oauth2/v2.0/devicecode")))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "device_code": "dev-123",
                    "user_code": "ABCD-EFGH",
                    "message": "Enter ABCD-EFGH at the login page",
                    "verification_uri": "https://login.example/device",
                    "expires_in": expires_in,
                })))
                .mount(&server)
                .await;
            server
        })
    }

    /// Queues token endpoint replies; each is served once, in order.
    fn reply_sequence(rt: &Runtime, server: &MockServer, replies: Vec<ResponseTemplate>) {
        rt.block_on(async {
            for reply in replies {
                Mock::given(method("POST"))
                    .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
                    .and(body_string_contains("device_code=dev-123"))
                    .respond_with(reply)
                    .up_to_n_times(1)
                    .mount(server)
                    .await;
            }
        });
    }

    fn device_auth(server: &MockServer) -> DeviceCodeAuthenticator {
        DeviceCodeAuthenticator::new(&server.uri(), TENANT, "client-1", false)
            .unwrap()
            .with_cache_path(None)
            .with_poll_interval(Duration::from_millis(10))
    }

    fn token_requests(rt: &Runtime, server: &MockServer) -> usize {
        rt.block_on(server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with("/token"))
            .count()
    }

    #[test]
    fn test_device_login_polls_through_pending_and_slow_down() {
        let rt = Runtime::new().unwrap();
        let server = token_server(&rt, 60);
        reply_sequence(
            &rt,
            &server,
            vec![
                token_error("authorization_pending"),
                token_error("slow_down"),
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "token_type": "Bearer",
                    "access_token": "granted-token",
                    "expires_in": 3600,
                    "scope": "https://graph.microsoft.com/User.ReadWrite.All openid",
                })),
            ],
        );

        let mut auth = device_auth(&server);
        let session = auth.connect(&required()).unwrap();

        assert_eq!(session.access_token, "granted-token");
        assert_eq!(session.scopes, scopes(&["User.ReadWrite.All", "openid"]));
        assert!(!session.is_expired(unix_now()));
        assert_eq!(token_requests(&rt, &server), 3);
    }

    #[test]
    fn test_device_login_sends_qualified_scopes() {
        let rt = Runtime::new().unwrap();
        let server = token_server(&rt, 60);
        reply_sequence(&rt, &server, vec![token_error("expired_token")]);

        let _ = device_auth(&server).connect(&required());

        let requests = rt.block_on(server.received_requests()).unwrap_or_default();
        let body = String::from_utf8_lossy(&requests[0].body).into_owned();
        assert!(body.contains("client_id=client-1"));
        assert!(body.contains("Group.ReadWrite.All"));
        assert!(body.contains("https%3A%2F%2Fgraph.microsoft.com%2F"));
    }

    #[test]
    fn test_device_login_expired_token() {
        let rt = Runtime::new().unwrap();
        let server = token_server(&rt, 60);
        reply_sequence(
            &rt,
            &server,
            vec![token_error("authorization_pending"), token_error("expired_token")],
        );

        let err = device_auth(&server).connect(&required()).unwrap_err();
        assert!(matches!(err, ConnectionError::Expired));
        assert_eq!(token_requests(&rt, &server), 2);
    }

    #[test]
    fn test_device_login_gives_up_at_deadline() {
        let rt = Runtime::new().unwrap();
        let server = token_server(&rt, 0);

        let err = device_auth(&server).connect(&required()).unwrap_err();
        assert!(matches!(err, ConnectionError::Expired));
        assert_eq!(token_requests(&rt, &server), 0);
    }

    #[test]
    fn test_device_login_denied() {
        let rt = Runtime::new().unwrap();
        let server = token_server(&rt, 60);
        reply_sequence(&rt, &server, vec![token_error("access_denied")]);

        let err = device_auth(&server).connect(&required()).unwrap_err();
        match err {
            ConnectionError::Denied { code, description } => {
                assert_eq!(code, "access_denied");
                assert_eq!(description, "access_denied from server");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_device_code_request_rejected_without_json() {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
                .mount(&server)
                .await;
            server
        });

        let err = device_auth(&server).connect(&required()).unwrap_err();
        match err {
            ConnectionError::Denied { code, description } => {
                assert_eq!(code, "503");
                assert_eq!(description, "Service Unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_cached_session_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path =
            std::env::temp_dir().join(format!("skuctl-{}-session.json", std::process::id()));
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let auth = DeviceCodeAuthenticator::new("http://127.0.0.1:9", TENANT, "c", false)
            .unwrap()
            .with_cache_path(Some(path.clone()));
        let session = Session {
            access_token: "secret".into(),
            scopes: required(),
            expires_at: u64::MAX,
        };
        auth.save(&session).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(auth.current_session(), Some(session));
        let _ = std::fs::remove_file(&path);
    }
}
