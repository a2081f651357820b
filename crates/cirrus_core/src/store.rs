//! Collection-scoped CRUD and find operations.

use crate::error::{CoreError, CoreResult};
use crate::file::{FileManager, FileRef};
use crate::permissions::PermissionsService;
use crate::record::{Record, RecordStatus};
use crate::value::PropertyValue;
use cirrus_query::{Combinator, Operand, Query};
use cirrus_transport::{template, Method, Part, Transport};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Multipart field carrying the record body when creating with files.
const OBJECT_DATA_FIELD: &str = "sysObjectData";
/// Query parameter asking the server to inline related records.
const EXPAND_PARAM: &str = "expanddepth";

type SaveFuture<'a> = Pin<Box<dyn Future<Output = CoreResult<()>> + Send + 'a>>;

/// Reads and writes records.
///
/// This is the only place that decides HTTP verbs and endpoint shapes for
/// records. Every call issues its own requests; nothing is shared between
/// calls beyond the transport.
///
/// Finds return relations as identifiers unless the store was derived with
/// [`DataStore::with_expand`], in which case related records come back in
/// full down to the given depth.
#[derive(Debug, Clone)]
pub struct DataStore {
    transport: Transport,
    files: FileManager,
    permissions: PermissionsService,
    expand: Option<u32>,
}

impl DataStore {
    /// Creates a data store over a transport.
    pub fn new(transport: Transport) -> Self {
        Self {
            files: FileManager::new(transport.clone()),
            permissions: PermissionsService::new(transport.clone()),
            transport,
            expand: None,
        }
    }

    /// Returns a store whose finds and refreshes expand relations `depth`
    /// levels deep. A depth of zero turns expansion off.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn run(store: cirrus_core::DataStore) -> cirrus_core::CoreResult<()> {
    /// let invoices = store.with_expand(1).find_all("invoices").await?;
    /// for invoice in &invoices {
    ///     let customer = invoice.relation("customer").and_then(|r| r.record());
    ///     println!("{:?}", customer.and_then(|c| c.get("name")));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_expand(&self, depth: u32) -> Self {
        Self {
            expand: (depth > 0).then_some(depth),
            ..self.clone()
        }
    }

    /// Returns the expansion depth sent with finds, if any.
    pub fn expand_depth(&self) -> Option<u32> {
        self.expand
    }

    /// Returns the file manager used for attachments.
    pub fn files(&self) -> &FileManager {
        &self.files
    }

    /// Creates an unsaved record.
    pub fn create<I, K, V>(&self, collection: &str, properties: I) -> CoreResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        Record::with_properties(collection, properties)
    }

    /// Fetches every record of a collection.
    pub async fn find_all(&self, collection: &str) -> CoreResult<Vec<Record>> {
        debug!(collection, expand = ?self.expand, "find all");
        let url = self.objects_url("objects/:collection", &[("collection", collection)])?;
        let response = self.transport.request_url(Method::Get, &url, None).await?;
        self.hydrate_list(collection, &response)
    }

    /// Fetches one record by identifier.
    pub async fn find_by_id(&self, collection: &str, id: &str) -> CoreResult<Record> {
        debug!(collection, id, expand = ?self.expand, "find by id");
        let url = self.objects_url(
            "objects/:collection/:id",
            &[("collection", collection), ("id", id)],
        )?;
        let response = self.transport.request_url(Method::Get, &url, None).await?;
        Record::from_server(collection, &response, &self.files)
    }

    /// Fetches records whose properties equal all the given values.
    pub async fn find_where<I, K, V>(&self, collection: &str, properties: I) -> CoreResult<Vec<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        let mut query = Query::new();
        for (property, value) in properties {
            query.equals(property, value)?;
        }
        self.find_by_query(collection, &query).await
    }

    /// Fetches records where any of `properties` contains `text`.
    ///
    /// With no properties the result is empty and no request is sent.
    pub async fn search<I, S>(&self, collection: &str, text: &str, properties: I) -> CoreResult<Vec<Record>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Query::new().with_combinator(Combinator::Or)?;
        for property in properties {
            query.contains(property, text)?;
        }
        if query.is_empty() {
            debug!(collection, "search over no properties");
            return Ok(Vec::new());
        }
        self.find_by_query(collection, &query).await
    }

    /// Fetches records where any property contains its paired text.
    ///
    /// Like [`DataStore::search`], no pairs means an empty result.
    pub async fn search_values<I, K, S>(&self, collection: &str, values: I) -> CoreResult<Vec<Record>>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<String>,
    {
        let mut query = Query::new().with_combinator(Combinator::Or)?;
        for (property, text) in values {
            query.contains(property, text)?;
        }
        if query.is_empty() {
            debug!(collection, "search over no properties");
            return Ok(Vec::new());
        }
        self.find_by_query(collection, &query).await
    }

    /// Fetches records matching a query.
    ///
    /// A query without clauses fetches the whole collection.
    pub async fn find_by_query(&self, collection: &str, query: &Query) -> CoreResult<Vec<Record>> {
        if query.is_empty() {
            return self.find_all(collection).await;
        }
        let filter = query.compile();
        debug!(collection, filter = %filter, expand = ?self.expand, "find by query");
        let url = self.objects_url(
            "objects/:collection?filter=:filter",
            &[("collection", collection), ("filter", filter.as_str())],
        )?;
        let response = self.transport.request_url(Method::Get, &url, None).await?;
        self.hydrate_list(collection, &response)
    }

    /// Saves a record.
    ///
    /// New records are created with `POST`; saved ones send their dirty
    /// properties with `PUT`. Unsaved file properties are uploaded first.
    /// On failure the record returns to its pre-save status so the call
    /// can be retried. Pending permission changes are sent once the record
    /// itself is saved.
    ///
    /// A relation holding a record that was never saved fails with
    /// [`CoreError::UnsavedRelated`] before anything is sent; use
    /// [`DataStore::save_all`] to save related records along with it.
    pub async fn save(&self, record: &mut Record) -> CoreResult<()> {
        let previous = record.begin_save()?;
        if let Some(property) = record.unsaved_related() {
            let property = property.to_string();
            record.revert_save(previous);
            return Err(CoreError::UnsavedRelated { property });
        }
        debug!(collection = record.collection(), id = ?record.id(), "saving record");

        let result = match previous {
            RecordStatus::New => self.create_record(record).await,
            _ => self.update_record(record).await,
        };
        if let Err(e) = result {
            warn!(collection = record.collection(), error = %e, "save failed");
            record.revert_save(previous);
            return Err(e);
        }

        self.flush_permissions(record).await
    }

    /// Saves records one at a time, stopping at the first failure.
    ///
    /// Related records held in full that are not saved yet are saved
    /// first, depth first, so their identifiers exist when the relation is
    /// sent. Records before the failing one stay saved; the failing one is
    /// back in its pre-save status and later ones are not attempted. The
    /// error index counts top-level records only.
    pub async fn save_all(&self, records: &mut [Record]) -> CoreResult<()> {
        for (index, record) in records.iter_mut().enumerate() {
            self.save_with_related(record)
                .await
                .map_err(|source| CoreError::BatchAborted {
                    index,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    fn save_with_related<'a>(&'a self, record: &'a mut Record) -> SaveFuture<'a> {
        Box::pin(async move {
            for related in record.related_records_mut() {
                if related.status() != RecordStatus::Saved {
                    self.save_with_related(related).await?;
                }
            }
            self.save(record).await
        })
    }

    /// Deletes a record on the server and marks it `Deleted`.
    pub async fn delete(&self, record: &mut Record) -> CoreResult<()> {
        if record.status().is_terminal() {
            return Err(CoreError::StaleRecord {
                collection: record.collection().to_string(),
            });
        }
        let id = record.id().ok_or_else(|| CoreError::MissingIdentifier {
            collection: record.collection().to_string(),
        })?;

        debug!(collection = record.collection(), id, "deleting record");
        self.transport
            .request(
                Method::Delete,
                "objects/:collection/:id",
                &[("collection", record.collection()), ("id", id)],
                None,
            )
            .await?;
        record.mark_deleted();
        Ok(())
    }

    /// Re-fetches a record, discarding unsaved local edits.
    pub async fn refresh(&self, record: &mut Record) -> CoreResult<()> {
        if record.status().is_terminal() {
            return Err(CoreError::StaleRecord {
                collection: record.collection().to_string(),
            });
        }
        let id = record.id().ok_or_else(|| CoreError::MissingIdentifier {
            collection: record.collection().to_string(),
        })?;
        let fresh = self.find_by_id(record.collection(), id).await?;
        record.replace_with(fresh);
        Ok(())
    }

    /// Re-fetches a record with its relations expanded `depth` levels deep.
    pub async fn expand(&self, record: &mut Record, depth: u32) -> CoreResult<()> {
        self.with_expand(depth).refresh(record).await
    }

    /// Builds a record URL, adding the expansion depth when set.
    fn objects_url(&self, path: &str, params: &[(&str, &str)]) -> CoreResult<String> {
        let url = self.transport.url(path, params)?;
        let query: Vec<(&str, String)> = self
            .expand
            .map(|depth| (EXPAND_PARAM, depth.to_string()))
            .into_iter()
            .collect();
        Ok(template::append_query(&url, &query))
    }

    async fn create_record(&self, record: &mut Record) -> CoreResult<()> {
        let body = Value::Object(record.serialize_for_save()?);
        let unsaved = record.unsaved_files();
        if unsaved.is_empty() {
            let response = self
                .transport
                .request(
                    Method::Post,
                    "objects/:collection",
                    &[("collection", record.collection())],
                    Some(&body),
                )
                .await?;
            return record.apply_server_response(&response);
        }

        // No identifier yet, so files travel with the body in one request.
        let mut parts = Vec::with_capacity(unsaved.len() + 1);
        for property in &unsaved {
            if let Some(file) = record.file(property) {
                let data = file.read_local().await?;
                parts.push(Part::file(
                    property.as_str(),
                    file.filename(),
                    file.mime_type(),
                    data,
                ));
            }
        }
        parts.push(Part::data(OBJECT_DATA_FIELD, body.to_string()));

        self.set_file_states(record, &unsaved, |file| file.mark_saving());
        let collection = record.collection().to_string();
        let response = match self
            .transport
            .post_multipart("objects/:collection", &[("collection", collection.as_str())], &parts)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.set_file_states(record, &unsaved, |file| file.mark_failed());
                return Err(e.into());
            }
        };

        if let Err(e) = record.apply_server_response(&response) {
            self.set_file_states(record, &unsaved, |file| file.mark_failed());
            return Err(e);
        }

        let id = record.id().unwrap_or_default().to_string();
        for property in &unsaved {
            if let Some(file) = record.file_mut(property) {
                let url = self.files.url_for(&collection, &id, property, file.filename());
                file.mark_saved(url);
            }
        }
        Ok(())
    }

    async fn update_record(&self, record: &mut Record) -> CoreResult<()> {
        let collection = record.collection().to_string();
        let id = record
            .id()
            .ok_or_else(|| CoreError::MissingIdentifier {
                collection: collection.clone(),
            })?
            .to_string();

        for property in record.unsaved_files() {
            if let Some(file) = record.file_mut(&property) {
                self.files.upload(file, &collection, &id, &property).await?;
            }
        }

        let body = record.serialize_for_save()?;
        if body.is_empty() {
            debug!(collection = %collection, id = %id, "nothing to update");
        } else {
            self.transport
                .request(
                    Method::Put,
                    "objects/:collection/:id",
                    &[("collection", collection.as_str()), ("id", id.as_str())],
                    Some(&Value::Object(body)),
                )
                .await?;
        }
        record.apply_server_response(&Value::Null)
    }

    async fn flush_permissions(&self, record: &mut Record) -> CoreResult<()> {
        if record.permissions().is_empty() {
            return Ok(());
        }
        let Some(id) = record.id() else {
            return Ok(());
        };
        let delta = record.permissions().delta(id);
        self.permissions.send(&delta).await?;
        record.permissions_mut().clear();
        Ok(())
    }

    fn set_file_states(
        &self,
        record: &mut Record,
        properties: &[String],
        update: impl Fn(&mut FileRef),
    ) {
        for property in properties {
            if let Some(file) = record.file_mut(property) {
                update(file);
            }
        }
    }

    fn hydrate_list(&self, collection: &str, response: &Value) -> CoreResult<Vec<Record>> {
        let items = match response {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("objects") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(CoreError::unexpected_response(format!(
                        "{} list response without objects",
                        collection
                    )))
                }
            },
            Value::Null => return Ok(Vec::new()),
            other => {
                return Err(CoreError::unexpected_response(format!(
                    "{} list response was {}",
                    collection, other
                )))
            }
        };
        items
            .iter()
            .map(|item| Record::from_server(collection, item, &self.files))
            .collect()
    }
}
