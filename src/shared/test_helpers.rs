//! In-memory collaborators and fixtures shared by unit and route tests.

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, response::Response, Router};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use fake::faker::company::en::CompanyName;
use fake::faker::filesystem::en::FileName;
use fake::Fake;
use futures::TryStreamExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::core::config::FilesConfig;
use crate::core::error::{AppError, Result};
use crate::features::access::models::{
    EventAccess, Organization, ProjectAccess, Role, UserAccount,
};
use crate::features::access::repositories::{
    EventRepository, OrganizationRepository, ProjectRepository, UserRepository,
};
use crate::features::access::services::AuthorizationService;
use crate::features::auth::model::{AuthenticatedUser, Claims};
use crate::features::files::models::{File, NewFile, StorageUsage};
use crate::features::files::repositories::FileRepository;
use crate::features::files::services::{FileService, StorageState, UploadRequest};
use crate::modules::storage::naming::generate_object_key;
use crate::modules::storage::{
    MemoryProvider, ObjectReader, ObjectStream, StorageError, StorageProvider,
};

pub const TEST_JWT_SECRET: &str = "test-secret-with-at-least-32-characters!";
pub const TEST_BUCKET: &str = "pulse-files";

/// Sign an HS256 access token for `user_id` expiring `ttl_secs` from now
pub fn issue_token(user_id: Uuid, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: u64::try_from(now + ttl_secs).unwrap_or(0),
        iat: u64::try_from(now).ok(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Collect a download stream into memory
pub async fn body(stream: ObjectStream) -> Vec<u8> {
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    chunks.concat()
}

async fn inject_user_middleware(user_id: Uuid, mut request: Request, next: Next) -> Response {
    request
        .extensions_mut()
        .insert(AuthenticatedUser::new(user_id));
    next.run(request).await
}

/// Authenticate every request to `router` as `user_id`
pub fn with_user(router: Router, user_id: Uuid) -> Router {
    router.layer(axum::middleware::from_fn(move |request: Request, next: Next| {
        inject_user_middleware(user_id, request, next)
    }))
}

// =============================================================================
// Collaborator lookups
// =============================================================================

#[derive(Default)]
pub struct TestDirectory {
    users: Mutex<HashMap<Uuid, UserAccount>>,
    organizations: Mutex<HashMap<Uuid, Organization>>,
    projects: Mutex<HashMap<Uuid, ProjectAccess>>,
    events: Mutex<HashMap<Uuid, EventAccess>>,
}

impl TestDirectory {
    pub fn add_organization(&self) -> Uuid {
        let id = Uuid::new_v4();
        let name: String = CompanyName().fake();
        self.organizations
            .lock()
            .unwrap()
            .insert(id, Organization { id, name });
        id
    }

    pub fn add_user(&self, organization_id: Option<Uuid>, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            id,
            UserAccount {
                id,
                organization_id,
                role,
            },
        );
        id
    }
}

#[async_trait]
impl UserRepository for TestDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl OrganizationRepository for TestDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.organizations.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl ProjectRepository for TestDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectAccess>> {
        Ok(self.projects.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl EventRepository for TestDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventAccess>> {
        Ok(self.events.lock().unwrap().get(&id).cloned())
    }
}

// =============================================================================
// File metadata
// =============================================================================

/// File repository backed by a map, with switches for injecting failures
#[derive(Default)]
pub struct InMemoryFileRepository {
    rows: Mutex<HashMap<Uuid, File>>,
    fail_next_create: AtomicBool,
    failing_deletes: Mutex<HashSet<Uuid>>,
}

impl InMemoryFileRepository {
    pub fn insert(&self, file: File) {
        self.rows.lock().unwrap().insert(file.id, file);
    }

    pub fn get(&self, id: Uuid) -> Option<File> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Make every row delete of `id` fail
    pub fn fail_delete_of(&self, id: Uuid) {
        self.failing_deletes.lock().unwrap().insert(id);
    }

    pub fn deletion_pair_consistent(&self) -> bool {
        self.rows
            .lock()
            .unwrap()
            .values()
            .all(|file| file.is_deleted == file.deleted_at.is_some())
    }

    fn update<F>(&self, id: Uuid, apply: F) -> Option<File>
    where
        F: FnOnce(&mut File) -> bool,
    {
        let mut rows = self.rows.lock().unwrap();
        let file = rows.get_mut(&id)?;
        apply(file).then(|| file.clone())
    }

    fn sorted_newest_first(mut files: Vec<File>) -> Vec<File> {
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        files
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn create(&self, file: &NewFile) -> Result<File> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal("simulated insert failure".to_string()));
        }

        let mut rows = self.rows.lock().unwrap();
        if rows
            .values()
            .any(|row| row.bucket == file.bucket && row.object_key == file.object_key)
        {
            return Err(AppError::Internal("duplicate object key".to_string()));
        }

        let created = File {
            id: file.id,
            display_name: file.display_name.clone(),
            bucket: file.bucket.clone(),
            object_key: file.object_key.clone(),
            content_type: file.content_type.clone(),
            size_bytes: file.size_bytes,
            uploader_id: file.uploader_id,
            organization_id: file.organization_id,
            is_public: file.is_public,
            is_deleted: false,
            deleted_at: None,
            uploaded_at: Utc::now(),
        };
        rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<File>> {
        Ok(self.get(id))
    }

    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<Option<File>> {
        Ok(self.update(id, |file| {
            if file.is_deleted {
                return false;
            }
            file.is_deleted = true;
            file.deleted_at = Some(deleted_at);
            true
        }))
    }

    async fn restore(&self, id: Uuid) -> Result<Option<File>> {
        Ok(self.update(id, |file| {
            if !file.is_deleted {
                return false;
            }
            file.is_deleted = false;
            file.deleted_at = None;
            true
        }))
    }

    async fn update_visibility(&self, id: Uuid, is_public: bool) -> Result<Option<File>> {
        Ok(self.update(id, |file| {
            file.is_public = is_public;
            true
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        if self.failing_deletes.lock().unwrap().contains(&id) {
            return Err(AppError::Internal("simulated delete failure".to_string()));
        }
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn find_by_uploader(
        &self,
        uploader_id: Uuid,
        organization_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<File>> {
        let files = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.uploader_id == uploader_id && f.organization_id == organization_id)
            .filter(|f| include_deleted || !f.is_deleted)
            .cloned()
            .collect();
        Ok(Self::sorted_newest_first(files))
    }

    async fn find_by_organization(
        &self,
        organization_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<File>> {
        let files = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.organization_id == organization_id)
            .filter(|f| include_deleted || !f.is_deleted)
            .cloned()
            .collect();
        Ok(Self::sorted_newest_first(files))
    }

    async fn find_deleted_before(&self, threshold: DateTime<Utc>) -> Result<Vec<File>> {
        let mut files: Vec<File> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.is_deleted && f.deleted_at.is_some_and(|at| at <= threshold))
            .cloned()
            .collect();
        files.sort_by_key(|f| f.deleted_at);
        Ok(files)
    }

    async fn organization_usage(&self, organization_id: Uuid) -> Result<StorageUsage> {
        let rows = self.rows.lock().unwrap();
        let active = rows
            .values()
            .filter(|f| f.organization_id == organization_id && !f.is_deleted);

        let mut usage = StorageUsage::default();
        for file in active {
            usage.file_count += 1;
            usage.total_bytes += file.size_bytes;
        }
        Ok(usage)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Wraps the memory provider and fails on demand
pub struct FlakyProvider {
    inner: Arc<MemoryProvider>,
    fail_initialize: bool,
    remaining_delete_failures: AtomicU32,
    delete_calls: AtomicU32,
    upload_calls: AtomicU32,
    download_calls: AtomicU32,
    presign_calls: AtomicU32,
}

impl FlakyProvider {
    pub fn new(inner: Arc<MemoryProvider>, delete_failures: u32) -> Self {
        Self {
            inner,
            fail_initialize: false,
            remaining_delete_failures: AtomicU32::new(delete_failures),
            delete_calls: AtomicU32::new(0),
            upload_calls: AtomicU32::new(0),
            download_calls: AtomicU32::new(0),
            presign_calls: AtomicU32::new(0),
        }
    }

    pub fn unreachable(inner: Arc<MemoryProvider>) -> Self {
        Self {
            fail_initialize: true,
            ..Self::new(inner, 0)
        }
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> u32 {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn presign_calls(&self) -> u32 {
        self.presign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageProvider for FlakyProvider {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn default_bucket(&self) -> &str {
        self.inner.default_bucket()
    }

    async fn initialize(&self) -> std::result::Result<(), StorageError> {
        if self.fail_initialize {
            return Err(StorageError::configuration("connection refused"));
        }
        self.inner.initialize().await
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        reader: ObjectReader,
        size: u64,
        content_type: &str,
    ) -> std::result::Result<String, StorageError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .upload_object(bucket, key, reader, size, content_type)
            .await
    }

    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> std::result::Result<ObjectStream, StorageError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.download_object(bucket, key).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> std::result::Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .remaining_delete_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::operation("simulated delete failure"));
        }

        self.inner.delete_object(bucket, key).await
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> std::result::Result<String, StorageError> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.presigned_url(bucket, key, ttl).await
    }

    async fn bucket_exists(&self, bucket: &str) -> std::result::Result<bool, StorageError> {
        self.inner.bucket_exists(bucket).await
    }

    async fn create_bucket(&self, bucket: &str) -> std::result::Result<(), StorageError> {
        self.inner.create_bucket(bucket).await
    }
}

// =============================================================================
// Fixture
// =============================================================================

/// Two organizations, an initialized memory bucket and empty repositories
pub struct TestWorld {
    pub directory: Arc<TestDirectory>,
    pub files: Arc<InMemoryFileRepository>,
    pub storage: Arc<MemoryProvider>,
    pub org: Uuid,
    pub other_org: Uuid,
}

impl TestWorld {
    pub async fn new() -> Self {
        let directory = Arc::new(TestDirectory::default());
        let org = directory.add_organization();
        let other_org = directory.add_organization();

        let storage = Arc::new(MemoryProvider::new(TEST_BUCKET));
        storage.initialize().await.unwrap();

        Self {
            directory,
            files: Arc::new(InMemoryFileRepository::default()),
            storage,
            org,
            other_org,
        }
    }

    pub fn add_user(&self, organization_id: Uuid, role: Role) -> Uuid {
        self.directory.add_user(Some(organization_id), role)
    }

    pub fn add_orphan_user(&self) -> Uuid {
        self.directory.add_user(None, Role::User)
    }

    pub fn add_project(&self, organization_id: Uuid, owner_id: Uuid, participants: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        self.directory.projects.lock().unwrap().insert(
            id,
            ProjectAccess {
                id,
                organization_id,
                owner_id,
                participant_ids: participants.to_vec(),
            },
        );
        id
    }

    pub fn add_event(&self, organization_id: Uuid, creator_id: Uuid, participants: &[Uuid]) -> Uuid {
        let id = Uuid::new_v4();
        self.directory.events.lock().unwrap().insert(
            id,
            EventAccess {
                id,
                organization_id,
                creator_id,
                participant_ids: participants.to_vec(),
            },
        );
        id
    }

    /// Metadata row only; no object is written
    pub fn insert_file(&self, uploader_id: Uuid, organization_id: Uuid, is_public: bool) -> File {
        let display_name: String = FileName().fake();
        let file = File {
            id: Uuid::new_v4(),
            object_key: generate_object_key(organization_id, &display_name),
            display_name,
            bucket: TEST_BUCKET.to_string(),
            content_type: "application/octet-stream".to_string(),
            size_bytes: 64,
            uploader_id,
            organization_id,
            is_public,
            is_deleted: false,
            deleted_at: None,
            uploaded_at: Utc::now() - chrono::Duration::days(60),
        };
        self.files.insert(file.clone());
        file
    }

    /// A row soft-deleted `age` ago
    pub fn insert_deleted_file(
        &self,
        uploader_id: Uuid,
        organization_id: Uuid,
        age: chrono::Duration,
    ) -> File {
        let mut file = self.insert_file(uploader_id, organization_id, false);
        file.is_deleted = true;
        file.deleted_at = Some(Utc::now() - age);
        self.files.insert(file.clone());
        file
    }

    pub fn authorization(&self) -> Arc<AuthorizationService> {
        Arc::new(AuthorizationService::new(
            self.directory.clone(),
            self.directory.clone(),
            self.directory.clone(),
            self.directory.clone(),
            self.files.clone(),
        ))
    }

    pub fn file_service(&self) -> FileService {
        self.file_service_with(FilesConfig::default())
    }

    pub fn file_service_with(&self, config: FilesConfig) -> FileService {
        self.build_service(StorageState::Ready(self.storage.clone()), config)
    }

    pub fn file_service_on(&self, storage: StorageState) -> FileService {
        self.build_service(storage, FilesConfig::default())
    }

    fn build_service(&self, storage: StorageState, config: FilesConfig) -> FileService {
        FileService::new(
            self.files.clone(),
            self.authorization(),
            storage,
            config,
            chrono::Duration::days(30),
        )
    }

    /// Shares this world's bucket; the first `delete_failures` deletes fail
    pub fn flaky_storage(&self, delete_failures: u32) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider::new(self.storage.clone(), delete_failures))
    }

    pub fn broken_storage(&self) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider::unreachable(self.storage.clone()))
    }

    pub fn upload_request(&self, name: &str, data: &'static [u8]) -> UploadRequest {
        self.upload_request_owned(name, data.to_vec())
    }

    pub fn upload_request_owned(&self, name: &str, data: Vec<u8>) -> UploadRequest {
        UploadRequest {
            display_name: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            size: data.len() as u64,
            reader: Box::new(Cursor::new(data)),
            is_public: false,
        }
    }
}
