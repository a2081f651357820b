//! In-memory backend speaking the Cirrus REST protocol.
//!
//! [`MockBackend`] implements [`HttpClient`], so it plugs into a
//! [`cirrus_transport::Transport`] in place of the network. It keeps
//! collections, files, users and sessions in memory, records every request
//! it receives, and can be told to fail the next matching request.
//!
//! Relation properties must be declared with
//! [`MockBackend::with_single_relation`] or
//! [`MockBackend::with_array_relation`]. They are stored as relation
//! wrappers holding identifiers and expanded on read when the request
//! carries `expanddepth`.

use crate::filter::Filter;
use crate::multipart::{self, ParsedPart};
use async_trait::async_trait;
use bytes::Bytes;
use cirrus_transport::{
    normalize_base_url, HttpClient, HttpRequest, HttpResponse, Method, TransportError,
    TransportResult, APP_KEY_HEADER, SESSION_HEADER,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Base URL the mock answers on by default.
pub const MOCK_BASE_URL: &str = "http://mock.cirrus.test/v1/";

/// Application key used by fixtures.
pub const MOCK_APP_KEY: &str = "test-app-key";

/// The only pin code accepted by the password reset endpoint.
pub const RESET_PIN: &str = "1234";

const ID: &str = "sysObjectId";
const USERNAME: &str = "sysUsername";
const PASSWORD: &str = "sysPassword";
const OBJECT_DATA: &str = "sysObjectData";
const USERS: &str = "users";
const DATATYPE: &str = "sysDatatype";
const RELATION_TYPE: &str = "sysRelationType";
const RELATION_COLLECTION: &str = "sysCollection";
const RELATION_OBJECTS: &str = "sysObjects";
const RELATION_CHANGES: &str = "sysRelationChanges";
const EXPAND_DEPTH: &str = "expanddepth";

type FileKey = (String, String, String, String);

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL as sent.
    pub url: String,
    /// Path relative to the base URL, without the query string.
    pub path: String,
    /// Percent-decoded path segments.
    pub segments: Vec<String>,
    /// Percent-decoded query parameters in order.
    pub query: Vec<(String, String)>,
    /// Headers as sent.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Bytes,
}

impl RecordedRequest {
    fn from_http(request: &HttpRequest, base_url: &str) -> Self {
        let relative = request
            .url
            .strip_prefix(base_url)
            .unwrap_or(request.url.as_str());
        let (path, query) = match relative.split_once('?') {
            Some((path, query)) => (path, query),
            None => (relative, ""),
        };

        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect();
        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect();

        Self {
            method: request.method,
            url: request.url.clone(),
            path: path.to_string(),
            segments,
            query,
            headers: request.headers.clone(),
            body: request.body.clone(),
        }
    }

    /// Returns the first header with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the first query parameter with the given name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Decodes the body as JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Decodes a `multipart/form-data` body.
    pub fn multipart(&self) -> Option<Vec<ParsedPart>> {
        multipart::parse(self.header("content-type")?, &self.body)
    }
}

/// A stored file attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    /// MIME type declared at upload.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

#[derive(Debug)]
enum Outcome {
    Status(u16, String),
    Network,
}

#[derive(Debug)]
struct Failure {
    method: Method,
    path_prefix: String,
    outcome: Outcome,
}

#[derive(Debug, Default)]
struct Collection {
    objects: Vec<Map<String, Value>>,
    next_id: u64,
}

#[derive(Debug)]
struct RelationSchema {
    single: bool,
    target: String,
}

#[derive(Debug, Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    relations: BTreeMap<(String, String), RelationSchema>,
    files: BTreeMap<FileKey, StoredFile>,
    permission_deltas: Vec<Value>,
    passwords: BTreeMap<String, String>,
    sessions: BTreeMap<String, String>,
    next_session: u64,
    reset_requests: Vec<String>,
    failures: Vec<Failure>,
    requests: Vec<RecordedRequest>,
}

/// In-memory Cirrus backend.
#[derive(Debug)]
pub struct MockBackend {
    base_url: String,
    app_key: Option<String>,
    require_session: bool,
    state: Mutex<State>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates an empty backend answering on [`MOCK_BASE_URL`].
    pub fn new() -> Self {
        Self {
            base_url: MOCK_BASE_URL.to_string(),
            app_key: None,
            require_session: false,
            state: Mutex::new(State::default()),
        }
    }

    /// Answers on a different base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    /// Rejects requests that do not carry this application key.
    pub fn with_app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = Some(app_key.into());
        self
    }

    /// Rejects object, file and permission requests without a live session.
    pub fn requiring_session(mut self) -> Self {
        self.require_session = true;
        self
    }

    /// Declares `collection.property` as a relation to at most one record
    /// of `target`.
    pub fn with_single_relation(self, collection: &str, property: &str, target: &str) -> Self {
        self.with_relation(collection, property, target, true)
    }

    /// Declares `collection.property` as a relation to any number of
    /// records of `target`.
    pub fn with_array_relation(self, collection: &str, property: &str, target: &str) -> Self {
        self.with_relation(collection, property, target, false)
    }

    fn with_relation(mut self, collection: &str, property: &str, target: &str, single: bool) -> Self {
        self.state.get_mut().relations.insert(
            (collection.to_string(), property.to_string()),
            RelationSchema {
                single,
                target: target.to_string(),
            },
        );
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Makes the next request matching `method` and `path_prefix` fail
    /// with `status` and `message`.
    pub fn fail_next(&self, method: Method, path_prefix: &str, status: u16, message: &str) {
        self.state.lock().failures.push(Failure {
            method,
            path_prefix: path_prefix.to_string(),
            outcome: Outcome::Status(status, message.to_string()),
        });
    }

    /// Makes the next request matching `method` and `path_prefix` fail as
    /// if the network were down.
    pub fn fail_next_network(&self, method: Method, path_prefix: &str) {
        self.state.lock().failures.push(Failure {
            method,
            path_prefix: path_prefix.to_string(),
            outcome: Outcome::Network,
        });
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    /// Returns a stored object.
    pub fn object(&self, collection: &str, id: &str) -> Option<Value> {
        self.state
            .lock()
            .find(collection, id)
            .cloned()
            .map(Value::Object)
    }

    /// Returns the objects of a collection in insertion order.
    pub fn objects(&self, collection: &str) -> Vec<Value> {
        self.state
            .lock()
            .collections
            .get(collection)
            .map(|c| c.objects.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Seeds an object and returns its identifier.
    ///
    /// A `sysObjectId` in `value` is kept; otherwise one is assigned.
    /// Non-object values are stored as an empty object.
    pub fn insert_object(&self, collection: &str, value: Value) -> String {
        let body = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.state.lock().insert(collection, body)
    }

    /// Returns a stored file.
    pub fn file(
        &self,
        collection: &str,
        id: &str,
        property: &str,
        filename: &str,
    ) -> Option<StoredFile> {
        let key = file_key(collection, id, property, filename);
        self.state.lock().files.get(&key).cloned()
    }

    /// Returns every permission delta received, oldest first.
    pub fn permission_deltas(&self) -> Vec<Value> {
        self.state.lock().permission_deltas.clone()
    }

    /// Registers a user and returns their record identifier.
    pub fn add_user(&self, username: &str, password: &str) -> String {
        let mut state = self.state.lock();
        state
            .passwords
            .insert(username.to_string(), password.to_string());
        let mut body = Map::new();
        body.insert(USERNAME.to_string(), json!(username));
        state.insert(USERS, body)
    }

    /// Returns the identifiers of open sessions.
    pub fn sessions(&self) -> Vec<String> {
        self.state.lock().sessions.keys().cloned().collect()
    }

    /// Returns the email addresses that asked for a password reset.
    pub fn reset_requests(&self) -> Vec<String> {
        self.state.lock().reset_requests.clone()
    }

    fn handle(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        let recorded = RecordedRequest::from_http(request, &self.base_url);
        debug!(method = %recorded.method, path = %recorded.path, "mock request");

        let mut state = self.state.lock();
        state.requests.push(recorded.clone());

        if let Some(outcome) = state.take_failure(recorded.method, &recorded.path) {
            return match outcome {
                Outcome::Network => Err(TransportError::network(format!(
                    "injected network failure for {} {}",
                    recorded.method, recorded.path
                ))),
                Outcome::Status(status, message) => Ok(error(status, message)),
            };
        }
        Ok(self.route(&mut state, &recorded))
    }

    fn route(&self, state: &mut State, request: &RecordedRequest) -> HttpResponse {
        if let Some(key) = &self.app_key {
            if request.header(APP_KEY_HEADER) != Some(key.as_str()) {
                return error(401, "invalid application key");
            }
        }

        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let protected = matches!(segments.first(), Some(&"objects" | &"files" | &"permissions"));
        if self.require_session && protected && !state.has_session(request) {
            return error(401, "session required");
        }

        match (request.method, segments.as_slice()) {
            (Method::Get, ["objects", collection]) => state.list(collection, request),
            (Method::Post, ["objects", collection]) => state.create(collection, request),
            (Method::Get, ["objects", collection, id]) => match expand_depth(request) {
                Ok(depth) => state.fetch(collection, id, depth),
                Err(response) => response,
            },
            (Method::Put, ["objects", collection, id]) => state.update(collection, id, request),
            (Method::Delete, ["objects", collection, id]) => state.remove(collection, id),
            (Method::Post, ["files", collection, id, property]) => {
                state.upload(collection, id, property, request)
            }
            (Method::Get, ["files", collection, id, property, filename]) => {
                state.download(collection, id, property, filename)
            }
            (Method::Post, ["permissions"]) => state.record_permissions(request),
            (Method::Post, ["users"]) => state.signup(request),
            (Method::Post, ["users", "reset", "email"]) => state.request_reset(request),
            (Method::Post, ["users", "reset", "password"]) => state.reset_password(request),
            (Method::Post, ["sessions"]) => state.login(request),
            (Method::Delete, ["sessions", id]) => state.logout(id),
            _ => error(404, format!("no route for {} {}", request.method, request.path)),
        }
    }
}

#[async_trait]
impl HttpClient for MockBackend {
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        self.handle(&request)
    }
}

impl State {
    fn take_failure(&mut self, method: Method, path: &str) -> Option<Outcome> {
        let index = self
            .failures
            .iter()
            .position(|f| f.method == method && path.starts_with(&f.path_prefix))?;
        Some(self.failures.remove(index).outcome)
    }

    fn has_session(&self, request: &RecordedRequest) -> bool {
        request
            .header(SESSION_HEADER)
            .map_or(false, |id| self.sessions.contains_key(id))
    }

    fn find(&self, collection: &str, id: &str) -> Option<&Map<String, Value>> {
        self.collections
            .get(collection)?
            .objects
            .iter()
            .find(|o| o.get(ID).and_then(Value::as_str) == Some(id))
    }

    fn find_mut(&mut self, collection: &str, id: &str) -> Option<&mut Map<String, Value>> {
        self.collections
            .get_mut(collection)?
            .objects
            .iter_mut()
            .find(|o| o.get(ID).and_then(Value::as_str) == Some(id))
    }

    fn find_user(&self, username: &str) -> Option<Map<String, Value>> {
        self.collections
            .get(USERS)?
            .objects
            .iter()
            .find(|o| o.get(USERNAME).and_then(Value::as_str) == Some(username))
            .cloned()
    }

    fn insert(&mut self, collection: &str, mut body: Map<String, Value>) -> String {
        let entry = self.collections.entry(collection.to_string()).or_default();
        let id = match body.get(ID).and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                entry.next_id += 1;
                let prefix = collection.chars().next().unwrap_or('o');
                format!("{}{}", prefix, entry.next_id)
            }
        };
        body.insert(ID.to_string(), json!(id));
        entry.objects.push(body);
        id
    }

    fn store_file(&mut self, collection: &str, id: &str, property: &str, part: ParsedPart) {
        let Some(filename) = part.filename else {
            return;
        };
        if let Some(object) = self.find_mut(collection, id) {
            object.insert(
                property.to_string(),
                json!({ "sysDatatype": "file", "filename": filename }),
            );
        }
        self.files.insert(
            file_key(collection, id, property, &filename),
            StoredFile {
                content_type: part.content_type,
                data: part.data,
            },
        );
    }

    fn open_session(&mut self, username: &str) -> String {
        self.next_session += 1;
        let id = format!("session-{}", self.next_session);
        self.sessions.insert(id.clone(), username.to_string());
        id
    }

    fn session_response(&mut self, username: &str) -> HttpResponse {
        let user = self.find_user(username).unwrap_or_default();
        let session = self.open_session(username);
        ok(json!({ "sysSessionId": session, "user": user }))
    }

    /// Copies an object with its relations replaced by the related
    /// objects, `depth` levels deep. Identifiers of missing objects stay.
    fn expanded(&self, object: &Map<String, Value>, depth: u32) -> Map<String, Value> {
        let mut out = object.clone();
        if depth == 0 {
            return out;
        }
        for value in out.values_mut() {
            if value.get(DATATYPE).and_then(Value::as_str) != Some("relation") {
                continue;
            }
            let Some(target) = value
                .get(RELATION_COLLECTION)
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                continue;
            };
            if let Some(Value::Array(items)) = value.get_mut(RELATION_OBJECTS) {
                for item in items.iter_mut() {
                    let found = item.as_str().and_then(|id| self.find(&target, id));
                    if let Some(found) = found {
                        *item = Value::Object(self.expanded(found, depth - 1));
                    }
                }
            }
        }
        out
    }

    /// Turns relation change sets in a write body into stored relations.
    fn apply_relation_changes(
        &self,
        collection: &str,
        current: Option<&Map<String, Value>>,
        body: &mut Map<String, Value>,
    ) -> Result<(), HttpResponse> {
        for (property, value) in body.iter_mut() {
            let Some(changes) = value.get(RELATION_CHANGES) else {
                continue;
            };
            let key = (collection.to_string(), property.clone());
            let Some(schema) = self.relations.get(&key) else {
                return Err(error(400, format!("{}.{} is not a relation", collection, property)));
            };

            let listed = |name: &str| -> Vec<String> {
                changes
                    .get(name)
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default()
            };
            let (additions, removals) = (listed("additions"), listed("removals"));

            let mut ids = current
                .and_then(|object| object.get(property))
                .map(stored_ids)
                .unwrap_or_default();
            ids.retain(|id| !removals.contains(id));
            for id in additions {
                if schema.single {
                    ids.clear();
                }
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }

            *value = json!({
                DATATYPE: "relation",
                RELATION_TYPE: if schema.single { "single" } else { "array" },
                RELATION_COLLECTION: schema.target,
                RELATION_OBJECTS: ids,
            });
        }
        Ok(())
    }

    fn list(&self, collection: &str, request: &RecordedRequest) -> HttpResponse {
        let filter = match request.query_param("filter").map(Filter::parse) {
            Some(Ok(filter)) => Some(filter),
            Some(Err(e)) => return error(400, format!("invalid filter: {}", e)),
            None => None,
        };
        let depth = match expand_depth(request) {
            Ok(depth) => depth,
            Err(response) => return response,
        };
        let objects: Vec<Value> = self
            .collections
            .get(collection)
            .map(|c| {
                c.objects
                    .iter()
                    .filter(|o| filter.as_ref().map_or(true, |f| f.matches(o)))
                    .map(|o| Value::Object(self.expanded(o, depth)))
                    .collect()
            })
            .unwrap_or_default();
        ok(json!({ "objects": objects }))
    }

    fn create(&mut self, collection: &str, request: &RecordedRequest) -> HttpResponse {
        let (mut body, files) = match request.multipart() {
            Some(parts) => {
                let mut body = Map::new();
                let mut files = Vec::new();
                for part in parts {
                    if part.name == OBJECT_DATA {
                        match part.text().and_then(|t| serde_json::from_str(t).ok()) {
                            Some(Value::Object(map)) => body = map,
                            _ => return error(400, "invalid sysObjectData"),
                        }
                    } else {
                        files.push(part);
                    }
                }
                (body, files)
            }
            None => match request.json() {
                Some(Value::Object(map)) => (map, Vec::new()),
                _ => return error(400, "expected a JSON object"),
            },
        };

        body.remove(ID);
        if let Err(response) = self.apply_relation_changes(collection, None, &mut body) {
            return response;
        }
        let id = self.insert(collection, body);
        for part in files {
            let property = part.name.clone();
            self.store_file(collection, &id, &property, part);
        }
        self.fetch(collection, &id, 0)
    }

    fn fetch(&self, collection: &str, id: &str, depth: u32) -> HttpResponse {
        match self.find(collection, id) {
            Some(object) => ok(Value::Object(self.expanded(object, depth))),
            None => not_found(collection, id),
        }
    }

    fn update(&mut self, collection: &str, id: &str, request: &RecordedRequest) -> HttpResponse {
        let Some(Value::Object(mut changes)) = request.json() else {
            return error(400, "expected a JSON object");
        };
        let Some(current) = self.find(collection, id) else {
            return not_found(collection, id);
        };
        if let Err(response) = self.apply_relation_changes(collection, Some(current), &mut changes) {
            return response;
        }
        let Some(object) = self.find_mut(collection, id) else {
            return not_found(collection, id);
        };
        for (key, value) in changes {
            if key != ID {
                object.insert(key, value);
            }
        }
        ok(Value::Object(object.clone()))
    }

    fn remove(&mut self, collection: &str, id: &str) -> HttpResponse {
        let Some(entry) = self.collections.get_mut(collection) else {
            return not_found(collection, id);
        };
        let Some(index) = entry
            .objects
            .iter()
            .position(|o| o.get(ID).and_then(Value::as_str) == Some(id))
        else {
            return not_found(collection, id);
        };
        entry.objects.remove(index);
        self.files
            .retain(|(c, i, _, _), _| !(c == collection && i == id));
        HttpResponse::new(200, Bytes::new())
    }

    fn upload(
        &mut self,
        collection: &str,
        id: &str,
        property: &str,
        request: &RecordedRequest,
    ) -> HttpResponse {
        if self.find(collection, id).is_none() {
            return not_found(collection, id);
        }
        let Some(parts) = request.multipart() else {
            return error(400, "expected multipart/form-data");
        };
        let mut filenames = Vec::new();
        for part in parts {
            if let Some(filename) = &part.filename {
                filenames.push(filename.clone());
                self.store_file(collection, id, property, part);
            }
        }
        if filenames.is_empty() {
            return error(400, "no file part");
        }
        ok(json!({ "filenames": filenames }))
    }

    fn download(&self, collection: &str, id: &str, property: &str, filename: &str) -> HttpResponse {
        match self.files.get(&file_key(collection, id, property, filename)) {
            Some(file) => HttpResponse::new(200, file.data.clone()),
            None => error(404, format!("file {} not found", filename)),
        }
    }

    fn record_permissions(&mut self, request: &RecordedRequest) -> HttpResponse {
        let Some(delta) = request.json() else {
            return error(400, "expected a JSON body");
        };
        self.permission_deltas.push(delta);
        ok(json!({}))
    }

    fn signup(&mut self, request: &RecordedRequest) -> HttpResponse {
        let Some(Value::Object(mut body)) = request.json() else {
            return error(400, "expected a JSON object");
        };
        let Some(username) = body.get(USERNAME).and_then(Value::as_str).map(str::to_string) else {
            return error(400, "username required");
        };
        let Some(password) = body
            .remove(PASSWORD)
            .and_then(|v| v.as_str().map(str::to_string))
        else {
            return error(400, "password required");
        };
        if self.passwords.contains_key(&username) {
            return error(409, format!("username {} already taken", username));
        }

        self.passwords.insert(username.clone(), password);
        body.remove(ID);
        self.insert(USERS, body);
        if request.query_param("login") == Some("false") {
            let user = self.find_user(&username).unwrap_or_default();
            return ok(json!({ "user": user }));
        }
        self.session_response(&username)
    }

    fn login(&mut self, request: &RecordedRequest) -> HttpResponse {
        let body = request.json().unwrap_or(Value::Null);
        let username = body.get(USERNAME).and_then(Value::as_str).unwrap_or_default();
        let password = body.get(PASSWORD).and_then(Value::as_str);
        if password.is_none() || self.passwords.get(username).map(String::as_str) != password {
            return error(401, "invalid username or password");
        }
        self.session_response(username)
    }

    fn logout(&mut self, id: &str) -> HttpResponse {
        match self.sessions.remove(id) {
            Some(_) => HttpResponse::new(200, Bytes::new()),
            None => error(404, "session not found"),
        }
    }

    fn request_reset(&mut self, request: &RecordedRequest) -> HttpResponse {
        let email = request
            .json()
            .and_then(|body| body.get("email").and_then(Value::as_str).map(str::to_string));
        let Some(email) = email else {
            return error(400, "email required");
        };
        self.reset_requests.push(email);
        ok(json!({}))
    }

    fn reset_password(&mut self, request: &RecordedRequest) -> HttpResponse {
        let body = request.json().unwrap_or(Value::Null);
        let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default();
        let (username, password, pin) = (field("username"), field("password"), field("pinCode"));

        if pin != RESET_PIN {
            return error(400, "invalid pin code");
        }
        if !self.passwords.contains_key(username) {
            return error(404, format!("user {} not found", username));
        }
        self.passwords
            .insert(username.to_string(), password.to_string());

        if body.get("login").and_then(Value::as_bool).unwrap_or(false) {
            return self.session_response(username);
        }
        ok(json!({}))
    }
}

fn file_key(collection: &str, id: &str, property: &str, filename: &str) -> FileKey {
    (
        collection.to_string(),
        id.to_string(),
        property.to_string(),
        filename.to_string(),
    )
}

/// Identifiers held by a stored relation.
fn stored_ids(value: &Value) -> Vec<String> {
    value
        .get(RELATION_OBJECTS)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().or_else(|| item.get(ID).and_then(Value::as_str)))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn expand_depth(request: &RecordedRequest) -> Result<u32, HttpResponse> {
    match request.query_param(EXPAND_DEPTH) {
        Some(depth) => depth
            .parse()
            .map_err(|_| error(400, format!("invalid {}: {}", EXPAND_DEPTH, depth))),
        None => Ok(0),
    }
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn ok(value: Value) -> HttpResponse {
    HttpResponse::new(200, value.to_string())
}

fn error(status: u16, message: impl Into<String>) -> HttpResponse {
    let message: String = message.into();
    HttpResponse::new(status, json!({ "errorMessage": message }).to_string())
}

fn not_found(collection: &str, id: &str) -> HttpResponse {
    error(404, format!("{}/{} not found", collection, id))
}
