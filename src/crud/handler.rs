use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::crud::access::{self, AccessDecision};
use crate::crud::config::ResourceConfig;
use crate::crud::error::{CrudError, CrudResult};
use crate::crud::mutation;
use crate::crud::projection::Projection;
use crate::crud::reply::{self, Reply};
use crate::hashing::SecretHasher;
use crate::store::{DocumentStore, StoreError};
use crate::types::{acknowledgment, CrudRequest, Document, Operation, Principal, OWNER_FIELD};
use crate::validation::{PayloadValidator, SchemaValidator};

/// The five handlers for one resource.
///
/// Each handler awaits its collaborators strictly in sequence: at most one
/// read followed by at most one write. Update and delete check existence and
/// ownership in one round-trip and mutate in another, with no version token
/// in between, so concurrent requests on the same id can interleave.
#[derive(Clone)]
pub struct Crud {
    config: Arc<ResourceConfig>,
    store: Arc<dyn DocumentStore>,
    validator: Arc<dyn PayloadValidator>,
    hasher: Arc<SecretHasher>,
}

impl Crud {
    pub fn new(config: ResourceConfig, store: Arc<dyn DocumentStore>, hasher: Arc<SecretHasher>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            validator: Arc::new(SchemaValidator),
            hasher,
        }
    }

    /// Swap the built-in schema validator for another implementation
    pub fn with_validator(mut self, validator: Arc<dyn PayloadValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    /// Run `op` and hand its outcome to `reply`
    pub async fn respond<R: Reply>(&self, op: Operation, req: CrudRequest, reply: R) -> R::Output {
        reply::send(reply, self.handle(op, req).await)
    }

    /// Run `op`, returning its reply body
    pub async fn handle(&self, op: Operation, req: CrudRequest) -> CrudResult<Value> {
        match op {
            Operation::Create => self.create(req).await.map(Value::Object),
            Operation::Read => self.read(req).await.map(Value::Object),
            Operation::Find => self
                .find(req)
                .await
                .map(|docs| Value::Array(docs.into_iter().map(Value::Object).collect())),
            Operation::Update => self.update(req).await,
            Operation::Delete => self.delete(req).await,
        }
    }

    /// Insert one document; the stored form is returned unprojected
    #[instrument(skip_all, fields(collection = %self.config.collection, op = "create"))]
    pub async fn create(&self, req: CrudRequest) -> CrudResult<Document> {
        let principal = req.principal.as_ref();
        self.gate(principal, Operation::Create)?;

        let create = &self.config.create;
        let payload = self
            .validator
            .validate(req.payload, create.payload.as_ref(), &self.config.validation_opts)
            .await
            .map_err(|e| {
                debug!("Create payload rejected: {}", e);
                CrudError::from(e)
            })?;

        let doc = mutation::prepare_insert(create, payload, principal, &self.hasher, Utc::now())?;
        let inserted = self.store.insert_one(doc).await.map_err(store_failure)?;

        info!("Inserted document {}", id_of(&inserted));
        Ok(inserted)
    }

    #[instrument(skip_all, fields(collection = %self.config.collection, op = "read"))]
    pub async fn read(&self, req: CrudRequest) -> CrudResult<Document> {
        let principal = req.principal.as_ref();
        self.gate(principal, Operation::Read)?;

        let id = self.require_id(req.id.as_deref())?;
        let doc = self.fetch_owned(principal, id, Operation::Read).await?;

        Ok(Projection::from_config(&self.config.read).apply(doc))
    }

    /// List documents matching the payload as an equality filter.
    ///
    /// Authenticated non-admins only ever see their own documents: the owner
    /// field of the filter is overwritten with their id.
    #[instrument(skip_all, fields(collection = %self.config.collection, op = "find"))]
    pub async fn find(&self, req: CrudRequest) -> CrudResult<Vec<Document>> {
        let principal = req.principal.as_ref();
        self.gate(principal, Operation::Find)?;

        let mut filter = req.payload;
        if let Some(owner) = access::scope_owner(principal) {
            filter.insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        }

        let docs = match self.store.find_many(&filter).await {
            Ok(docs) => docs,
            // An id the store cannot parse matches nothing
            Err(StoreError::InvalidId(id)) => {
                debug!("Filter id {} matches no document", id);
                Vec::new()
            }
            Err(e) => return Err(store_failure(e)),
        };
        debug!("Found {} documents", docs.len());

        Ok(Projection::from_config(&self.config.read).apply_all(docs))
    }

    #[instrument(skip_all, fields(collection = %self.config.collection, op = "update"))]
    pub async fn update(&self, req: CrudRequest) -> CrudResult<Value> {
        let principal = req.principal.as_ref();
        self.gate(principal, Operation::Update)?;

        let update = &self.config.update;
        let payload = self
            .validator
            .validate(req.payload, update.payload.as_ref(), &self.config.validation_opts)
            .await
            .map_err(|e| {
                debug!("Update payload rejected: {}", e);
                CrudError::from(e)
            })?;
        let patch = mutation::prepare_patch(update, payload, &self.hasher, Utc::now())?;

        let id = self.require_id(req.id.as_deref())?;
        self.fetch_owned(principal, id, Operation::Update).await?;

        self.store
            .update_by_id(id, &patch)
            .await
            .map_err(store_failure)?;

        info!("Updated document {} ({} fields)", id, patch.len());
        Ok(acknowledgment("Updated successfully"))
    }

    #[instrument(skip_all, fields(collection = %self.config.collection, op = "delete"))]
    pub async fn delete(&self, req: CrudRequest) -> CrudResult<Value> {
        let principal = req.principal.as_ref();
        self.gate(principal, Operation::Delete)?;

        let id = self.require_id(req.id.as_deref())?;
        self.fetch_owned(principal, id, Operation::Delete).await?;

        self.store.delete_by_id(id).await.map_err(store_failure)?;

        info!("Deleted document {}", id);
        Ok(acknowledgment("Deleted successfully"))
    }

    fn gate(&self, principal: Option<&Principal>, op: Operation) -> CrudResult<()> {
        let required = self.config.access_for(op);
        deny_unless(access::check_access(principal, required, op), principal)
    }

    fn require_id<'a>(&self, id: Option<&'a str>) -> CrudResult<&'a str> {
        id.ok_or_else(|| {
            debug!("No document id supplied");
            CrudError::not_found(&self.config.collection)
        })
    }

    /// Fetch by id and run the ownership check against the fetched document
    async fn fetch_owned(
        &self,
        principal: Option<&Principal>,
        id: &str,
        op: Operation,
    ) -> CrudResult<Document> {
        let doc = match self.store.find_by_id(id).await {
            Ok(Some(doc)) => doc,
            // A malformed id cannot name a document
            Ok(None) | Err(StoreError::InvalidId(_)) => {
                debug!("No document with id {}", id);
                return Err(CrudError::not_found(&self.config.collection));
            }
            Err(e) => return Err(store_failure(e)),
        };

        deny_unless(access::check_ownership(principal, &doc, op), principal)?;
        Ok(doc)
    }
}

fn deny_unless(decision: AccessDecision, principal: Option<&Principal>) -> CrudResult<()> {
    match decision {
        AccessDecision::Allow => Ok(()),
        AccessDecision::Deny(reason) => {
            if let Some(p) = principal {
                warn!("Access denied for principal {} ({}): {}", p.id, p.access, reason);
            }
            Err(CrudError::Unauthorized(reason))
        }
    }
}

fn store_failure(err: StoreError) -> CrudError {
    tracing::error!("Store operation failed: {}", err);
    CrudError::Store(err)
}

fn id_of(doc: &Document) -> String {
    doc.get(crate::types::ID_FIELD)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<unassigned>".to_string())
}
